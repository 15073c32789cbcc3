use reqwest::Url;

/// Join base url with another (possibly relative) url
pub fn join_url(current_url: &str, url: &str) -> Option<String> {
    let base = Url::parse(current_url).ok()?;
    base.join(url).ok().map(|u| u.to_string())
}

/// Absolute form of `url` without query string or fragment.
///
/// Boards decorate listing links with tracking parameters such as
/// `?from=list_hot`; these are not part of a posting's identity.
pub fn canonical_url(current_url: &str, url: &str) -> Option<String> {
    let joined = join_url(current_url, url)?;
    let mut u = Url::parse(&joined).ok()?;
    if u.scheme() != "http" && u.scheme() != "https" {
        return None;
    }
    u.set_query(None);
    u.set_fragment(None);
    Some(u.to_string())
}

/// Whether two urls point at the same resource, ignoring a trailing slash.
pub fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}
