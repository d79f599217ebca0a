use base64::{engine::general_purpose, Engine as _};

/// Decodes Base64 the way subscription providers actually emit it.
///
/// Whitespace and line breaks inside the payload are ignored, padding is
/// optional and the URL-safe alphabet is accepted.
pub fn base64_decode(input: &str) -> Result<String, base64::DecodeError> {
    let mut cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    while cleaned.ends_with('=') {
        cleaned.pop();
    }
    let engine = if cleaned.contains('-') || cleaned.contains('_') {
        general_purpose::URL_SAFE_NO_PAD
    } else {
        general_purpose::STANDARD_NO_PAD
    };
    let decoded = engine.decode(cleaned.as_bytes())?;
    Ok(String::from_utf8_lossy(&decoded).to_string())
}
