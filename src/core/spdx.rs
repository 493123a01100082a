//! SPDX license identifier table.
//!
//! Manifest `license` fields name an SPDX identifier. Lookup is
//! case-insensitive and also accepts the full license name. An
//! unrecognized identifier is not an error at this level; callers decide
//! how to treat a miss.

use std::fmt;

/// A resolved license from the identifier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct License {
    /// Canonical SPDX identifier (e.g. "MIT", "Apache-2.0").
    pub id: &'static str,

    /// Full license name.
    pub name: &'static str,
}

impl License {
    /// Whether the identifier is a deprecated SPDX alias (e.g. "GPL-3.0+").
    pub fn is_deprecated(&self) -> bool {
        DEPRECATED_IDS.contains(&self.id)
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Identifier/name pairs for the licenses the table recognizes.
const LICENSES: &[(&str, &str)] = &[
    ("0BSD", "BSD Zero Clause License"),
    ("AGPL-3.0-only", "GNU Affero General Public License v3.0 only"),
    ("AGPL-3.0-or-later", "GNU Affero General Public License v3.0 or later"),
    ("Apache-2.0", "Apache License 2.0"),
    ("Artistic-2.0", "Artistic License 2.0"),
    ("BSD-2-Clause", "BSD 2-Clause \"Simplified\" License"),
    ("BSD-3-Clause", "BSD 3-Clause \"New\" or \"Revised\" License"),
    ("BSD-4-Clause", "BSD 4-Clause \"Original\" or \"Old\" License"),
    ("BSL-1.0", "Boost Software License 1.0"),
    ("CC-BY-4.0", "Creative Commons Attribution 4.0 International"),
    ("CC-BY-SA-4.0", "Creative Commons Attribution Share Alike 4.0 International"),
    ("CC0-1.0", "Creative Commons Zero v1.0 Universal"),
    ("CDDL-1.0", "Common Development and Distribution License 1.0"),
    ("EPL-2.0", "Eclipse Public License 2.0"),
    ("EUPL-1.2", "European Union Public License 1.2"),
    ("GPL-2.0-only", "GNU General Public License v2.0 only"),
    ("GPL-2.0-or-later", "GNU General Public License v2.0 or later"),
    ("GPL-3.0-only", "GNU General Public License v3.0 only"),
    ("GPL-3.0-or-later", "GNU General Public License v3.0 or later"),
    ("ISC", "ISC License"),
    ("LGPL-2.1-only", "GNU Lesser General Public License v2.1 only"),
    ("LGPL-2.1-or-later", "GNU Lesser General Public License v2.1 or later"),
    ("LGPL-3.0-only", "GNU Lesser General Public License v3.0 only"),
    ("LGPL-3.0-or-later", "GNU Lesser General Public License v3.0 or later"),
    ("MIT", "MIT License"),
    ("MPL-2.0", "Mozilla Public License 2.0"),
    ("PSF-2.0", "Python Software Foundation License 2.0"),
    ("Python-2.0", "Python License 2.0"),
    ("Unlicense", "The Unlicense"),
    ("WTFPL", "Do What The F*ck You Want To Public License"),
    ("Zlib", "zlib License"),
    // Deprecated aliases still common in the wild
    ("AGPL-3.0", "GNU Affero General Public License v3.0"),
    ("GPL-2.0", "GNU General Public License v2.0 only"),
    ("GPL-2.0+", "GNU General Public License v2.0 or later"),
    ("GPL-3.0", "GNU General Public License v3.0 only"),
    ("GPL-3.0+", "GNU General Public License v3.0 or later"),
    ("LGPL-2.1", "GNU Lesser General Public License v2.1 only"),
    ("LGPL-2.1+", "GNU Lesser General Public License v2.1 or later"),
    ("LGPL-3.0", "GNU Lesser General Public License v3.0 only"),
    ("LGPL-3.0+", "GNU Lesser General Public License v3.0 or later"),
];

const DEPRECATED_IDS: &[&str] = &[
    "AGPL-3.0", "GPL-2.0", "GPL-2.0+", "GPL-3.0", "GPL-3.0+", "LGPL-2.1",
    "LGPL-2.1+", "LGPL-3.0", "LGPL-3.0+",
];

/// Look up a license by SPDX identifier or full name, case-insensitively.
pub fn license_by_id(id: &str) -> Option<License> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }

    LICENSES
        .iter()
        .find(|(license_id, name)| {
            license_id.eq_ignore_ascii_case(id) || name.eq_ignore_ascii_case(id)
        })
        .map(|&(id, name)| License { id, name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        let license = license_by_id("MIT").unwrap();
        assert_eq!(license.id, "MIT");
        assert_eq!(license.name, "MIT License");
    }

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(license_by_id("mit").unwrap().id, "MIT");
        assert_eq!(license_by_id("apache-2.0").unwrap().id, "Apache-2.0");
    }

    #[test]
    fn test_lookup_by_full_name() {
        assert_eq!(license_by_id("Apache License 2.0").unwrap().id, "Apache-2.0");
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(license_by_id("NOT-A-REAL-LICENSE").is_none());
        assert!(license_by_id("").is_none());
        assert!(license_by_id("   ").is_none());
    }

    #[test]
    fn test_deprecated_alias() {
        let license = license_by_id("GPL-3.0+").unwrap();
        assert!(license.is_deprecated());
        assert!(!license_by_id("GPL-3.0-or-later").unwrap().is_deprecated());
    }
}
