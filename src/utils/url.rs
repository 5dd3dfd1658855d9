//! URL encoding/decoding utilities

/// Encodes a string using URL encoding
///
/// # Examples
/// ```
/// use subcollector::utils::url::url_encode;
///
/// let encoded = url_encode("Hello World!");
/// assert_eq!(encoded, "Hello%20World%21");
/// ```
pub fn url_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Decodes a URL-encoded string
///
/// Returns the original string if decoding fails.
///
/// # Examples
/// ```
/// use subcollector::utils::url::url_decode;
///
/// let decoded = url_decode("Hello%20World%21");
/// assert_eq!(decoded, "Hello World!");
/// ```
pub fn url_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

/// Splits a raw `k=v&k2=v2` query into pairs without decoding the values.
///
/// Pairs without `=` yield an empty value.
pub fn split_query(query: &str) -> Vec<(&str, &str)> {
    query
        .split('&')
        .filter(|kv| !kv.is_empty())
        .map(|kv| kv.split_once('=').unwrap_or((kv, "")))
        .collect()
}

/// Rewrites a `raw.githubusercontent.com` URL to the jsDelivr fastly mirror.
///
/// `https://raw.githubusercontent.com/{user}/{repo}/{branch}/{path}` becomes
/// `https://fastly.jsdelivr.net/gh/{user}/{repo}@{branch}/{path}`.
pub fn raw_to_fastly(url: &str) -> String {
    const RAW_PREFIX: &str = "https://raw.githubusercontent.com/";
    let Some(rest) = url.strip_prefix(RAW_PREFIX) else {
        return url.to_string();
    };
    let parts: Vec<&str> = rest.splitn(4, '/').collect();
    match parts.as_slice() {
        [user, repo, branch, path] => {
            format!("https://fastly.jsdelivr.net/gh/{user}/{repo}@{branch}/{path}")
        }
        [user, repo, branch] => format!("https://fastly.jsdelivr.net/gh/{user}/{repo}@{branch}"),
        _ => url.to_string(),
    }
}
