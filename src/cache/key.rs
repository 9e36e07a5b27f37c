//! Reverse-label domain-key canonicalization — the single
//! correctness-critical routine (spec §9, property P1).

/// Canonicalize a domain name: ensure a trailing dot, lowercase.
pub fn canonicalize(name: &str) -> String {
    let mut s = name.to_lowercase();
    if !s.ends_with('.') {
        s.push('.');
    }
    s
}

/// Compute the reverse-label cache key for a domain name, e.g.
/// `api.example.com.` -> `com.example.api`.
///
/// Grounded on `examples/original_source/dnsutils/dnsserver.go`'s `getKey`.
pub fn reverse_label_key(name: &str) -> String {
    let canonical = canonicalize(name);
    let trimmed = canonical.trim_end_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed.split('.').rev().collect::<Vec<_>>().join(".")
}

/// Invert a reverse-label key back to canonical display form. Used only by
/// tests and debugging; the handler never needs this in the hot path.
pub fn unreverse(key: &str) -> String {
    if key.is_empty() {
        return ".".to_string();
    }
    let mut s = key.split('.').rev().collect::<Vec<_>>().join(".");
    s.push('.');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverses_labels() {
        assert_eq!(reverse_label_key("api.example.com."), "com.example.api");
        assert_eq!(reverse_label_key("api.example.com"), "com.example.api");
    }

    #[test]
    fn lowercases() {
        assert_eq!(reverse_label_key("API.Example.COM."), "com.example.api");
    }

    #[test]
    fn roundtrip_with_unreverse() {
        let name = "a.test.";
        assert_eq!(unreverse(&reverse_label_key(name)), canonicalize(name));
    }

    #[test]
    fn root_key_is_empty() {
        assert_eq!(reverse_label_key("."), "");
    }

    // P1: reverse-label(reverse-label(name)) == canonicalize(name)
    #[test]
    fn property_p1_double_reverse_is_canonical() {
        for name in ["example.com.", "a.b.c.d.", "single.", "Mixed.Case.Example."] {
            let key = reverse_label_key(name);
            assert_eq!(unreverse(&key), canonicalize(name));
        }
    }
}
