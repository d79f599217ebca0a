//! URL encoding/decoding utilities

/// Decodes a URL-encoded string
///
/// # Returns
/// * String containing the decoded input
/// * Returns the original string if decoding fails
///
/// # Examples
/// ```
/// use sub2clash::utils::url::url_decode;
///
/// let decoded = url_decode("Hello%20World%21");
/// assert_eq!(decoded, "Hello World!");
/// ```
pub fn url_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

/// Checks whether a string looks like an http(s) link
pub fn is_link(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
