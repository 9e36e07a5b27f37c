//! Hosts-file parser (C1).
//!
//! Grounded on `examples/original_source/common/fileutils.go`'s
//! `ParseHostFile`: `#` is a comment only at column 0, tabs normalize to
//! spaces, the first whitespace-separated token is the IP, and only the
//! first remaining token is kept as the hostname (spec §4.5/§6).

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::HostwardenError;

/// Parse a hosts-file into `hostname -> ip`. Duplicate hostnames across
/// lines are overwritten by later lines.
pub fn parse_hosts<R: BufRead>(reader: R) -> Result<HashMap<String, String>, HostwardenError> {
    let mut out = HashMap::new();

    for line in reader.lines() {
        let line = line.map_err(HostwardenError::Io)?;

        if line.starts_with('#') {
            continue;
        }

        let normalized = line.replace('\t', " ");
        let mut fields = normalized.split_whitespace().filter(|s| !s.is_empty());

        let ip = match fields.next() {
            Some(ip) => ip,
            None => continue,
        };

        if let Some(hostname) = fields.next() {
            out.insert(hostname.to_string(), ip.to_string());
        }
    }

    Ok(out)
}

pub fn parse_hosts_str(text: &str) -> Result<HashMap<String, String>, HostwardenError> {
    parse_hosts(std::io::Cursor::new(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_lines() {
        let parsed = parse_hosts_str("1.2.3.4 example.com\n9.9.9.9 b.test\n").unwrap();
        assert_eq!(parsed.get("example.com"), Some(&"1.2.3.4".to_string()));
        assert_eq!(parsed.get("b.test"), Some(&"9.9.9.9".to_string()));
    }

    #[test]
    fn comment_only_at_column_zero() {
        let parsed = parse_hosts_str("# a comment\n1.2.3.4 example.com\n").unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn only_first_hostname_retained() {
        let parsed = parse_hosts_str("1.2.3.4 example.com alias1 alias2\n").unwrap();
        assert_eq!(parsed.get("example.com"), Some(&"1.2.3.4".to_string()));
        assert!(!parsed.contains_key("alias1"));
    }

    #[test]
    fn tabs_normalize_to_spaces() {
        let parsed = parse_hosts_str("1.2.3.4\texample.com\n").unwrap();
        assert_eq!(parsed.get("example.com"), Some(&"1.2.3.4".to_string()));
    }

    #[test]
    fn later_duplicate_overwrites_earlier() {
        let parsed = parse_hosts_str("1.1.1.1 dup.test\n2.2.2.2 dup.test\n").unwrap();
        assert_eq!(parsed.get("dup.test"), Some(&"2.2.2.2".to_string()));
    }

    #[test]
    fn empty_line_is_skipped() {
        let parsed = parse_hosts_str("\n1.2.3.4 example.com\n\n").unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
