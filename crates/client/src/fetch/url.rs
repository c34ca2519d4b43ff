//! URL resolution for intercepted requests.
//!
//! Requests from the application shell may be relative (`/login`) or
//! absolute (`https://firestore.googleapis.com/...`). Both are resolved to
//! an absolute URL so store keys are stable.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Schemes the controller intercepts. Anything else passes through.
pub const WEB_SCHEMES: &[&str] = &["http", "https"];

/// Resolve a request target against the shell's origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are kept with their scheme, relative ones are joined
///    onto `origin`
/// 3. Host is lowercased (by the URL parser for web schemes)
/// 4. Fragment (#...) is removed; it never reaches the network
/// 5. Query string is kept intact
///
/// Non-web schemes are accepted here; the router decides to bypass them.
pub fn resolve(input: &str, origin: &url::Url) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match url::Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether the URL uses a scheme the controller intercepts.
pub fn is_web_scheme(url: &url::Url) -> bool {
    WEB_SCHEMES.contains(&url.scheme())
}
