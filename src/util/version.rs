//! Lenient version parsing.
//!
//! Interpreter versions reported by Python tooling are frequently
//! incomplete (`"3.9"`) or carry trailing release tags (`"3.13.0rc1"`)
//! that strict semver rejects. These helpers normalize such strings so
//! they can be evaluated against a `VersionReq`.

use semver::Version;

/// Parse a version string, allowing for incomplete versions.
///
/// Missing minor/patch components default to zero; trailing non-numeric
/// release tags on a component are ignored (`"3.13.0rc1"` → `3.13.0`).
/// Returns `None` if no leading numeric component exists.
pub fn parse_lenient(s: &str) -> Option<Version> {
    // Try exact parse first
    if let Ok(v) = s.trim().parse() {
        return Some(v);
    }

    let mut numbers = s.trim().splitn(3, '.').map(leading_number);

    let major = numbers.next().flatten()?;
    let minor = numbers.next().flatten().unwrap_or(0);
    let patch = numbers.next().flatten().unwrap_or(0);

    Some(Version::new(major, minor, patch))
}

/// Extract the leading decimal digits of a version component.
fn leading_number(part: &str) -> Option<u64> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient_complete() {
        assert_eq!(parse_lenient("1.2.3"), Some(Version::new(1, 2, 3)));
    }

    #[test]
    fn test_parse_lenient_partial() {
        assert_eq!(parse_lenient("3"), Some(Version::new(3, 0, 0)));
        assert_eq!(parse_lenient("3.9"), Some(Version::new(3, 9, 0)));
    }

    #[test]
    fn test_parse_lenient_release_tag() {
        assert_eq!(parse_lenient("3.13.0rc1"), Some(Version::new(3, 13, 0)));
        assert_eq!(parse_lenient("2.7.18+"), Some(Version::new(2, 7, 18)));
    }

    #[test]
    fn test_parse_lenient_whitespace() {
        assert_eq!(parse_lenient(" 3.9 "), Some(Version::new(3, 9, 0)));
    }

    #[test]
    fn test_parse_lenient_garbage() {
        assert_eq!(parse_lenient("banana"), None);
        assert_eq!(parse_lenient(""), None);
    }
}
