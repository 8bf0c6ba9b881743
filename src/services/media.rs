use url::Url;

use crate::config;

/// Render a stored relative path as an absolute URL under `base`. Paths that
/// are already absolute URLs are returned unchanged.
pub fn media_url_with_base(base: &str, path: Option<&str>) -> Option<String> {
    let path = path?.trim();
    if path.is_empty() {
        return None;
    }
    if let Ok(absolute) = Url::parse(path) {
        return Some(absolute.to_string());
    }

    // Url::join drops the last segment unless the base ends with a slash
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    match Url::parse(&base).and_then(|b| b.join(path.trim_start_matches('/'))) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::warn!("Cannot build media URL from '{}' and '{}': {}", base, path, e);
            None
        }
    }
}

pub fn media_url(path: Option<&str>) -> Option<String> {
    media_url_with_base(&config::config().media.base_url, path)
}
