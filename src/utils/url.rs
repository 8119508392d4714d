//! Endpoint URL helpers.

/// Join `base_url` and `endpoint` with exactly one slash between them.
///
/// ```
/// use jiuding::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://10.0.0.5:28001/", "/v1/query/semantic"),
///     "http://10.0.0.5:28001/v1/query/semantic"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

/// Keep the path and query of `url` but take scheme, host and port (plus
/// any path prefix) from `base_url`. Unparseable URLs keep nothing but the
/// base.
///
/// ```
/// use jiuding::utils::url::rebase_url;
///
/// assert_eq!(
///     rebase_url("http://10.17.49.217:28001/v1/query/interface", "https://gw.local/bss"),
///     "https://gw.local/bss/v1/query/interface"
/// );
/// ```
pub fn rebase_url(url: &str, base_url: &str) -> String {
    let tail = reqwest::Url::parse(url)
        .map(|parsed| match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        })
        .unwrap_or_default();
    construct_api_url(base_url, &tail)
}
