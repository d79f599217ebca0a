use std::thread;
use std::time::Duration;

use log::warn;
use reqwest::Client;

use crate::error::FetchError;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 15;

/// Default cap on a downloaded body, in bytes
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 1024;

/// Retrieves documents by URL.
///
/// The pipeline only talks to this trait, so tests can swap the network for
/// canned responses.
pub trait Fetcher {
    /// GET `url`, returning the body on a 2xx answer.
    fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, FetchError>;

    /// HEAD `url` and return its `subscription-userinfo` header, if any.
    ///
    /// A missing header is `Ok(None)`; only a failed request is an error.
    fn head_userinfo(&self, url: &str, user_agent: &str) -> Result<Option<String>, FetchError>;
}

/// [`Fetcher`] backed by reqwest.
///
/// Requests run on a throwaway current-thread tokio runtime so the rest of
/// the pipeline stays synchronous.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    max_body_size: u64,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher::new(Duration::from_secs(DEFAULT_TIMEOUT), DEFAULT_MAX_BODY_SIZE)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_body_size: u64) -> Self {
        HttpFetcher {
            timeout,
            max_body_size,
        }
    }

    fn client(&self, user_agent: &str) -> Result<Client, FetchError> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))
    }

    async fn get_async(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, FetchError> {
        let client = self.client(user_agent)?;
        let mut response = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_size)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_body_size,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response body: {}", e)))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_body_size {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_size,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    async fn head_userinfo_async(
        &self,
        url: &str,
        user_agent: &str,
    ) -> Result<Option<String>, FetchError> {
        let client = self.client(user_agent)?;
        let response = client
            .head(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to send HEAD request: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response
            .headers()
            .get("subscription-userinfo")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, FetchError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create tokio runtime: {}", e)))?;
        Ok(rt.block_on(future))
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, FetchError> {
        Self::block_on(self.get_async(url, user_agent))?
    }

    fn head_userinfo(&self, url: &str, user_agent: &str) -> Result<Option<String>, FetchError> {
        Self::block_on(self.head_userinfo_async(url, user_agent))?
    }
}

/// GET with up to `retry_times` extra attempts on transient failures.
pub fn get_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    user_agent: &str,
    retry_times: u32,
    retry_delay: Duration,
) -> Result<Vec<u8>, FetchError> {
    with_retry(url, retry_times, retry_delay, || fetcher.get(url, user_agent))
}

/// Run `request` against `url`, retrying transient failures up to
/// `retry_times` extra times.
pub fn with_retry<T>(
    url: &str,
    retry_times: u32,
    retry_delay: Duration,
    mut request: impl FnMut() -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let mut attempt = 0;
    loop {
        match request() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < retry_times => {
                attempt += 1;
                warn!(
                    "Fetching {} failed ({}), retry {}/{}",
                    url, err, attempt, retry_times
                );
                if !retry_delay.is_zero() {
                    thread::sleep(retry_delay);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Fails with the queued errors first, then succeeds.
    struct Flaky {
        errors: RefCell<Vec<FetchError>>,
        calls: RefCell<u32>,
    }

    impl Fetcher for Flaky {
        fn get(&self, _url: &str, _user_agent: &str) -> Result<Vec<u8>, FetchError> {
            *self.calls.borrow_mut() += 1;
            match self.errors.borrow_mut().pop() {
                Some(err) => Err(err),
                None => Ok(b"ok".to_vec()),
            }
        }

        fn head_userinfo(
            &self,
            _url: &str,
            _user_agent: &str,
        ) -> Result<Option<String>, FetchError> {
            Ok(None)
        }
    }

    fn flaky(errors: Vec<FetchError>) -> Flaky {
        Flaky {
            errors: RefCell::new(errors),
            calls: RefCell::new(0),
        }
    }

    #[test]
    fn test_retry_recovers_from_transient_errors() {
        let fetcher = flaky(vec![
            FetchError::Status(502),
            FetchError::Network("reset".to_string()),
        ]);
        let body = get_with_retry(&fetcher, "http://x", "ua", 3, Duration::ZERO).unwrap();
        assert_eq!(body, b"ok");
        assert_eq!(*fetcher.calls.borrow(), 3);
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        let fetcher = flaky(vec![
            FetchError::Status(503),
            FetchError::Status(503),
            FetchError::Status(503),
        ]);
        let err = get_with_retry(&fetcher, "http://x", "ua", 1, Duration::ZERO).unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(*fetcher.calls.borrow(), 2);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let fetcher = flaky(vec![FetchError::Status(404)]);
        let err = get_with_retry(&fetcher, "http://x", "ua", 3, Duration::ZERO).unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
        assert_eq!(*fetcher.calls.borrow(), 1);
    }
}
