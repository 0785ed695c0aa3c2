use log::debug;
use url::Url;

/// Hostnames on which every popup is suppressed.
///
/// Entries are normalized once on construction; matching then only compares
/// lowercase hostnames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    entries: Vec<String>,
}

impl Blacklist {
    pub fn new<I, S>(raw_entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = raw_entries
            .into_iter()
            .filter_map(|entry| normalize_entry(entry.as_ref()))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact match or subdomain match against any entry.
    pub fn matches(&self, hostname: &str) -> bool {
        let hostname = hostname.trim().to_lowercase();
        if hostname.is_empty() {
            return false;
        }

        self.entries.iter().any(|entry| {
            hostname == *entry
                || hostname
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

pub fn is_blacklisted(hostname: &str, blacklist: &Blacklist) -> bool {
    blacklist.matches(hostname)
}

/// Reduce a user-entered blacklist entry to a bare lowercase host.
///
/// Accepts full URLs (`https://example.com/path`) and plain domains
/// (`example.com`). Anything that parses as neither is kept as its trimmed
/// lowercase text. Returns `None` for blank entries.
pub fn normalize_entry(entry: &str) -> Option<String> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(host) = parse_host(trimmed) {
        return Some(host);
    }

    debug!("Blacklist entry {trimmed:?} is not a URL, comparing as raw text");
    Some(trimmed.to_lowercase())
}

/// Whether `entry` is usable as a blacklist entry: non-blank and parseable
/// as a URL, either as written or with an `https://` prefix.
pub fn validate_entry(entry: &str) -> bool {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return false;
    }
    Url::parse(trimmed).is_ok() || Url::parse(&format!("https://{trimmed}")).is_ok()
}

// Inputs like `localhost:3000` parse as a URL with scheme `localhost` and no
// host, so a host-less parse falls through to the `https://` attempt.
fn parse_host(entry: &str) -> Option<String> {
    let host_of = |url: Url| {
        url.host_str()
            .filter(|host| !host.is_empty())
            .map(str::to_lowercase)
    };

    Url::parse(entry)
        .ok()
        .and_then(host_of)
        .or_else(|| Url::parse(&format!("https://{entry}")).ok().and_then(host_of))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_forms_agree() {
        assert_eq!(normalize_entry("example.com").as_deref(), Some("example.com"));
        assert_eq!(
            normalize_entry("https://example.com/path").as_deref(),
            Some("example.com")
        );
        assert_eq!(normalize_entry("EXAMPLE.com").as_deref(), Some("example.com"));
        assert_eq!(
            normalize_entry("  http://Example.COM:8080/a?b#c ").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_host_with_port_without_scheme() {
        assert_eq!(normalize_entry("localhost:3000").as_deref(), Some("localhost"));
    }

    #[test]
    fn test_blank_entries_dropped() {
        let blacklist = Blacklist::new(["", "   ", "example.com"]);
        assert_eq!(blacklist.entries(), ["example.com".to_string()]);
    }

    #[test]
    fn test_malformed_entry_falls_back_to_raw_text() {
        assert_eq!(normalize_entry("Bad Host!").as_deref(), Some("bad host!"));
        let blacklist = Blacklist::new(["Bad Host!"]);
        assert!(!blacklist.matches("example.com"));
    }

    #[test]
    fn test_subdomain_matching() {
        let blacklist = Blacklist::new(["example.com"]);
        assert!(is_blacklisted("example.com", &blacklist));
        assert!(is_blacklisted("sub.example.com", &blacklist));
        assert!(is_blacklisted("a.b.EXAMPLE.com", &blacklist));
        assert!(!is_blacklisted("notexample.com", &blacklist));
        assert!(!is_blacklisted("example.com.evil.org", &blacklist));
        assert!(!is_blacklisted("", &blacklist));
    }

    #[test]
    fn test_empty_blacklist_matches_nothing() {
        let blacklist = Blacklist::default();
        assert!(blacklist.is_empty());
        assert!(!blacklist.matches("example.com"));
    }

    #[test]
    fn test_validate_entry() {
        assert!(validate_entry("example.com"));
        assert!(validate_entry("https://example.com/path"));
        assert!(validate_entry("  jisho.org "));
        assert!(!validate_entry(""));
        assert!(!validate_entry("   "));
        assert!(!validate_entry("exa mple.com"));
    }
}
