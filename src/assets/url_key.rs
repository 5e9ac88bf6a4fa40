use url::Url;

/// Canonicalize a resource URL into a cache key.
///
/// Only used for keying: fetches always go to the caller's original URL. The result has a
/// lowercased scheme and host, no default port, no leading `www.`, no query or fragment and no
/// trailing slash. Inputs that do not parse as URLs with a host fall back to a lowercased copy of
/// the trimmed input. The function is idempotent.
pub fn normalize_cache_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.to_lowercase();
    };
    let Some(host) = parsed.host_str() else {
        return trimmed.to_lowercase();
    };

    let mut host = host.to_ascii_lowercase();
    while let Some(rest) = host.strip_prefix("www.") {
        if rest.is_empty() {
            break;
        }
        host = rest.to_string();
    }

    // `Url` already drops the scheme's default port, `port()` only reports explicit others.
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = parsed.path().trim_end_matches('/');

    format!("{}://{host}{port}{path}", parsed.scheme())
}
