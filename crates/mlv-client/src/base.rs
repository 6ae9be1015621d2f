//! Base URL resolution.
//!
//! Every request is built relative to one base directory URL, computed once
//! when the client is constructed.

use mlv_core::ApiError;
use url::Url;

/// Resolve the base URL.
///
/// An explicit override wins and is normalised to end with `/`. Otherwise
/// the base is derived from the viewer's page URL: everything up to and
/// including the segment before `/assets/` when the path contains it, else
/// the page's own directory.
pub fn resolve_base_url(override_url: Option<&str>, page_url: &str) -> Result<Url, ApiError> {
    if let Some(raw) = override_url.map(str::trim).filter(|s| !s.is_empty()) {
        let normalised = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        return parse(&normalised);
    }

    let mut url = parse(page_url)?;
    let path = url.path().to_string();
    let dir = match path.find("/assets/") {
        Some(idx) => &path[..idx + 1],
        None => match path.rfind('/') {
            Some(idx) => &path[..idx + 1],
            None => "/",
        },
    };
    url.set_path(dir);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn parse(raw: &str) -> Result<Url, ApiError> {
    Url::parse(raw).map_err(|err| ApiError::Transport(format!("invalid base URL {raw:?}: {err}")))
}
