// Same-origin check for update download URLs

use url::Url;

/// Parses `candidate` and returns it when it is an `https` URL on exactly
/// `host:port`.
///
/// Parsed structurally, so `https://host.evil.example/` and
/// `https://host@evil.example/` are both rejected. Raw input the parser
/// would silently rewrite (backslashes, whitespace, control bytes) is
/// rejected too; callers forward the returned `Url`, never the raw string.
pub fn trusted_url(candidate: &str, host: &str, port: u16) -> Option<Url> {
    if candidate
        .bytes()
        .any(|b| b == b'\\' || b.is_ascii_whitespace() || b.is_ascii_control())
    {
        log::warn!("Rejecting update URL with characters outside the URL grammar");
        return None;
    }

    let url = match Url::parse(candidate) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Rejecting unparsable update URL: {}", e);
            return None;
        }
    };

    let same_origin = url.scheme() == "https"
        && url.username().is_empty()
        && url.password().is_none()
        && url
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(host))
        && url.port_or_known_default() == Some(port);

    same_origin.then_some(url)
}
