//! Version parsing and matching for four-part platform versions.
//!
//! Platform and symbol versions are `major.minor.build.revision`. Feeds
//! sometimes normalize away a trailing `.0`, so three-part strings are accepted
//! with the revision defaulting to zero.

use std::cmp::Ordering;

/// A parsed `major.minor.build.revision` version.
///
/// Ordering is lexicographic over the four fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionParts {
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Build number.
    pub build: u64,
    /// Revision, zero when the source string had only three segments.
    pub revision: u64,
}

impl VersionParts {
    /// The `(build, revision)` pair used to rank candidates inside one major.minor.
    pub fn build_revision(&self) -> (u64, u64) {
        (self.build, self.revision)
    }

    /// Whether both versions share the same major and minor.
    pub fn same_minor(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl std::fmt::Display for VersionParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Parse a version with three or four numeric dot-separated segments.
///
/// Returns `None` for anything else, including pre-release suffixes.
pub fn parse_version_parts(version: &str) -> Option<VersionParts> {
    let parts: Vec<u64> = version
        .trim()
        .split('.')
        .map(|s| s.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [major, minor, build] => Some(VersionParts {
            major: *major,
            minor: *minor,
            build: *build,
            revision: 0,
        }),
        [major, minor, build, revision] => Some(VersionParts {
            major: *major,
            minor: *minor,
            build: *build,
            revision: *revision,
        }),
        _ => None,
    }
}

/// Check if a version string matches a coarse requirement by comparing segments.
/// "27.0" matches "27.0.1.2" but NOT "27.01.0" or "270.0".
pub fn version_matches_segments(version: &str, requirement: &str) -> bool {
    let v_parts: Vec<&str> = version.split('.').collect();
    let r_parts: Vec<&str> = requirement.split('.').collect();

    // Requirement must not have more segments than version
    if r_parts.len() > v_parts.len() {
        return false;
    }

    r_parts.iter().zip(v_parts.iter()).all(|(r, v)| r == v)
}

/// Select the version to download for `requested` out of `available`.
///
/// 1. A verbatim match wins outright.
/// 2. Otherwise only versions in the same major.minor are considered, and only
///    those whose `(build, revision)` is at or above the request.
/// 3. Among those the closest one (smallest `(build, revision)`) wins.
///
/// Unparseable versions on either side never match fuzzily. Ties between
/// spellings of the same version (e.g. "1.0.5" and "1.0.5.0") go to the
/// lexicographically smaller string so the choice does not depend on feed order.
pub fn find_compatible_version<'a>(available: &'a [String], requested: &str) -> Option<&'a str> {
    if let Some(exact) = available.iter().find(|v| v.as_str() == requested) {
        return Some(exact);
    }

    let target = parse_version_parts(requested)?;

    available
        .iter()
        .filter_map(|v| parse_version_parts(v).map(|parts| (v, parts)))
        .filter(|(_, parts)| parts.same_minor(&target))
        .filter(|(_, parts)| parts.build_revision() >= target.build_revision())
        .min_by(|(a_str, a), (b_str, b)| {
            match a.build_revision().cmp(&b.build_revision()) {
                Ordering::Equal => a_str.cmp(b_str),
                other => other,
            }
        })
        .map(|(v, _)| v.as_str())
}

/// Versions out of `available` that share the requested major.minor.
///
/// Used to build actionable error messages when nothing matches.
pub fn same_minor_versions(available: &[String], requested: &str) -> Vec<String> {
    let Some(target) = parse_version_parts(requested) else {
        return Vec::new();
    };

    available
        .iter()
        .filter(|v| parse_version_parts(v).is_some_and(|parts| parts.same_minor(&target)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_four_parts() {
        let parts = parse_version_parts("27.0.38460.40483").unwrap();
        assert_eq!(parts.major, 27);
        assert_eq!(parts.minor, 0);
        assert_eq!(parts.build, 38460);
        assert_eq!(parts.revision, 40483);
    }

    #[test]
    fn test_parse_three_parts_defaults_revision() {
        let parts = parse_version_parts("1.0.5").unwrap();
        assert_eq!(parts.revision, 0);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_version_parts("27.0").is_none());
        assert!(parse_version_parts("1.2.3.4.5").is_none());
        assert!(parse_version_parts("1.0.0-beta").is_none());
        assert!(parse_version_parts("").is_none());
    }

    #[test]
    fn test_parse_round_trip_matches_exactly() {
        for input in ["27.0.38460.40483", "1.0.5", "0.0.0.0", "26.5.1"] {
            let parts = parse_version_parts(input).unwrap();
            let segments = input.split('.').count();
            let rejoined = if segments == 3 {
                format!("{}.{}.{}", parts.major, parts.minor, parts.build)
            } else {
                parts.to_string()
            };
            let available = vec![rejoined.clone()];
            assert_eq!(find_compatible_version(&available, input), Some(rejoined.as_str()));
            assert_eq!(rejoined, input);
        }
    }

    #[test]
    fn test_exact_match_wins() {
        let available = versions(&["1.0.5", "1.0.9"]);
        assert_eq!(find_compatible_version(&available, "1.0.5"), Some("1.0.5"));
    }

    #[test]
    fn test_never_crosses_major_minor() {
        let available = versions(&["26.5.1", "27.0.5", "27.1.1"]);
        assert_eq!(find_compatible_version(&available, "27.0.0"), Some("27.0.5"));
    }

    #[test]
    fn test_only_eligible_higher_build() {
        let available = versions(&["27.0.5", "27.0.9"]);
        assert_eq!(find_compatible_version(&available, "27.0.6"), Some("27.0.9"));
    }

    #[test]
    fn test_closest_higher_build_wins() {
        let available = versions(&["27.0.5", "27.0.9", "27.0.20"]);
        assert_eq!(find_compatible_version(&available, "27.0.1"), Some("27.0.5"));
    }

    #[test]
    fn test_revision_breaks_build_ties() {
        let available = versions(&["27.0.100.9", "27.0.100.3", "27.0.99.50"]);
        assert_eq!(
            find_compatible_version(&available, "27.0.100.1"),
            Some("27.0.100.3")
        );
    }

    #[test]
    fn test_no_eligible_version() {
        let available = versions(&["27.0.5", "27.0.9"]);
        assert_eq!(find_compatible_version(&available, "28.0.0"), None);
        assert_eq!(find_compatible_version(&available, "27.0.10"), None);
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let forward = versions(&["27.0.5", "27.0.5.0", "27.0.9"]);
        let backward = versions(&["27.0.9", "27.0.5.0", "27.0.5"]);
        assert_eq!(
            find_compatible_version(&forward, "27.0.1"),
            find_compatible_version(&backward, "27.0.1")
        );
    }

    #[test]
    fn test_same_minor_versions() {
        let available = versions(&["26.5.1", "27.0.5", "27.0.9", "27.1.1"]);
        assert_eq!(
            same_minor_versions(&available, "27.0.20"),
            versions(&["27.0.5", "27.0.9"])
        );
    }

    #[test]
    fn test_version_matches_segments() {
        assert!(version_matches_segments("27.0.38460.40483", "27.0"));
        assert!(version_matches_segments("27.0.1.0", "27"));
        assert!(!version_matches_segments("27.01.0.0", "27.0"));
        assert!(!version_matches_segments("270.0.0.0", "27.0"));
        assert!(!version_matches_segments("27.0", "27.0.1"));
    }
}
