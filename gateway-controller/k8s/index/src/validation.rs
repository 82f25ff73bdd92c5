use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static DNS1123_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("regex must compile")
});

static PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[^\s{};$]*$").expect("regex must compile"));

static SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}(k|m|g)?$").expect("regex must compile"));

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}(ms|s|m|h)?$").expect("regex must compile"));

const MAX_HOSTNAME_LEN: usize = 253;

/// Validates a listener or route hostname. Wildcards are not supported.
pub(crate) fn hostname(hostname: &str) -> Result<()> {
    if hostname.contains('*') {
        bail!("Wildcard hostnames are not supported: {hostname:?}");
    }
    if hostname.len() > MAX_HOSTNAME_LEN || !DNS1123_SUBDOMAIN.is_match(hostname) {
        bail!("{hostname:?} is not a valid DNS-1123 subdomain");
    }
    Ok(())
}

pub(crate) fn path(path: &str) -> Result<()> {
    if !PATH.is_match(path) {
        bail!(
            "path {path:?} must begin with '/' and must not contain whitespace, '{{', '}}', ';' or '$'"
        );
    }
    Ok(())
}

/// Validates a header or query parameter name or value.
pub(crate) fn match_part(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{what} cannot be empty");
    }
    if value.contains('$') {
        bail!("{what} {value:?} cannot contain '$'");
    }
    Ok(())
}

pub(crate) fn header_part(what: &str, value: &str) -> Result<()> {
    match_part(what, value)?;
    if value.contains(':') {
        bail!("{what} {value:?} cannot contain ':'");
    }
    Ok(())
}

pub(crate) fn size(value: &str) -> Result<()> {
    if !SIZE.is_match(value) {
        bail!("size {value:?} must be a number with an optional 'k', 'm' or 'g' suffix");
    }
    Ok(())
}

pub(crate) fn duration(value: &str) -> Result<()> {
    if !DURATION.is_match(value) {
        bail!("duration {value:?} must be a number with an optional 'ms', 's', 'm' or 'h' suffix");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    #[rstest]
    #[case("cafe.example.com", true)]
    #[case("localhost", true)]
    #[case("*.example.com", false)]
    #[case("Cafe.Example.com", false)]
    #[case("-cafe.example.com", false)]
    #[case("cafe..example.com", false)]
    fn hostnames(#[case] hostname: &str, #[case] valid: bool) {
        assert_eq!(super::hostname(hostname).is_ok(), valid, "{hostname}");
    }

    #[rstest]
    #[case("/", true)]
    #[case("/coffee/latte", true)]
    #[case("coffee", false)]
    #[case("/cof fee", false)]
    #[case("/coffee;", false)]
    #[case("/{coffee}", false)]
    #[case("/coffee$foo", false)]
    #[case("/coffee/$uri", false)]
    fn paths(#[case] path: &str, #[case] valid: bool) {
        assert_eq!(super::path(path).is_ok(), valid, "{path}");
    }

    #[rstest]
    #[case("version", true)]
    #[case("  ", false)]
    #[case("$version", false)]
    #[case("x:y", false)]
    fn header_parts(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(super::header_part("header name", value).is_ok(), valid);
    }

    #[rstest]
    #[case("10m", true)]
    #[case("1024", true)]
    #[case("10mb", false)]
    #[case("12345k", false)]
    fn sizes(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(super::size(value).is_ok(), valid);
    }

    #[rstest]
    #[case("30s", true)]
    #[case("500ms", true)]
    #[case("1h", true)]
    #[case("30sec", false)]
    fn durations(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(super::duration(value).is_ok(), valid);
    }
}
