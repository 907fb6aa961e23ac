//! Puppet module version requirements.
//!
//! Requirements from `metadata.json` use the Puppet module syntax:
//! - `>= 1.0.0 < 2.0.0`: whitespace-separated comparators are ANDed
//! - `>= 1.0.0 || 3.x`: `||` separates alternatives
//! - `1.x`, `1.2.x`, `1`, `1.2`, `*`: wildcards
//! - `~1.2` (same minor), `^1.2.3` (same major, or minor below 1.0)
//! - `1.0.0 - 2.0.0`: inclusive hyphen range
//! - `1.2.3` or `=1.2.3`: exact version
//!
//! A prerelease version only satisfies an alternative that itself names a
//! prerelease of the same `major.minor.patch`.

use std::cmp::Ordering;
use std::fmt;

use semver::{Prerelease, Version};

/// A parsed version requirement: a disjunction of comparator sets.
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub original: String,
    sets: Vec<ComparatorSet>,
}

/// One `||` alternative, reduced to its tightest bounds.
#[derive(Debug, Clone, Default)]
struct ComparatorSet {
    lower: Option<Bound>,
    upper: Option<Bound>,
    /// `(major, minor, patch)` of every prerelease named in this set.
    prerelease_triples: Vec<(u64, u64, u64)>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    fn inclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    fn exclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

/// A version with some components left open (`1`, `1.2`, `1.x`).
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches(['v', 'V']);
        if s.is_empty() {
            return None;
        }
        // build metadata never affects matching
        let s = s.split_once('+').map_or(s, |(head, _)| head);
        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Prerelease::new(pre).ok()?),
            None => (s, Prerelease::EMPTY),
        };

        let mut parts = core.split('.');
        let mut next = || -> Option<Option<u64>> {
            match parts.next() {
                None => Some(None),
                Some("x" | "X" | "*") => Some(None),
                Some(n) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                    n.parse().ok().map(Some)
                }
                Some(_) => None,
            }
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return None;
        }
        // `1.x.3` is not a version
        if (major.is_none() && (minor.is_some() || patch.is_some()))
            || (minor.is_none() && patch.is_some())
        {
            return None;
        }
        if !pre.is_empty() && patch.is_none() {
            return None;
        }
        Some(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    fn is_any(&self) -> bool {
        self.major.is_none()
    }

    /// Open components filled with zero.
    fn floor(&self) -> Version {
        let mut v = Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        v.pre = self.pre.clone();
        v
    }

    fn is_exact(&self) -> bool {
        self.patch.is_some()
    }

    /// The first version past the last fixed component (`1.2` -> `1.3.0`).
    ///
    /// `None` for exact versions and when the component would overflow.
    fn ceiling(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(Version::new(major.checked_add(1)?, 0, 0)),
            (Some(major), Some(minor), None) => {
                Some(Version::new(major, minor.checked_add(1)?, 0))
            }
            _ => None,
        }
    }
}

impl ComparatorSet {
    fn any() -> Self {
        Self::default()
    }

    fn raise_lower(&mut self, bound: Bound) {
        let tighter = match &self.lower {
            None => true,
            Some(cur) => match precedence(&bound.version, &cur.version) {
                Ordering::Greater => true,
                Ordering::Equal => !bound.inclusive,
                Ordering::Less => false,
            },
        };
        if tighter {
            self.lower = Some(bound);
        }
    }

    fn lower_upper(&mut self, bound: Bound) {
        let tighter = match &self.upper {
            None => true,
            Some(cur) => match precedence(&bound.version, &cur.version) {
                Ordering::Less => true,
                Ordering::Equal => !bound.inclusive,
                Ordering::Greater => false,
            },
        };
        if tighter {
            self.upper = Some(bound);
        }
    }

    fn note_prerelease(&mut self, partial: &Partial) {
        if !partial.pre.is_empty() {
            let v = partial.floor();
            self.prerelease_triples.push((v.major, v.minor, v.patch));
        }
    }

    /// Apply one comparator such as `>=1.2`, `~1.2.3` or `1.x`.
    fn apply(&mut self, op: &str, partial: &Partial) -> Option<()> {
        self.note_prerelease(partial);
        if partial.is_any() {
            return match op {
                // `< *` matches nothing
                "<" => {
                    self.lower_upper(Bound::exclusive(Version::new(0, 0, 0)));
                    Some(())
                }
                _ => Some(()),
            };
        }

        let floor = partial.floor();
        match op {
            "" | "=" if partial.is_exact() => {
                self.raise_lower(Bound::inclusive(floor.clone()));
                self.lower_upper(Bound::inclusive(floor));
            }
            "" | "=" => {
                let ceiling = partial.ceiling()?;
                self.raise_lower(Bound::inclusive(floor));
                self.lower_upper(Bound::exclusive(ceiling));
            }
            ">=" => self.raise_lower(Bound::inclusive(floor)),
            ">" if partial.is_exact() => self.raise_lower(Bound::exclusive(floor)),
            ">" => self.raise_lower(Bound::inclusive(partial.ceiling()?)),
            "<" => self.lower_upper(Bound::exclusive(floor)),
            "<=" if partial.is_exact() => self.lower_upper(Bound::inclusive(floor)),
            "<=" => self.lower_upper(Bound::exclusive(partial.ceiling()?)),
            "~" => {
                let major = partial.major?;
                let ceiling = match partial.minor {
                    Some(minor) => Version::new(major, minor.checked_add(1)?, 0),
                    None => Version::new(major.checked_add(1)?, 0, 0),
                };
                self.raise_lower(Bound::inclusive(floor));
                self.lower_upper(Bound::exclusive(ceiling));
            }
            "^" => {
                let major = partial.major?;
                let ceiling = match (major, partial.minor, partial.patch) {
                    (0, Some(0), Some(patch)) => Version::new(0, 0, patch.checked_add(1)?),
                    (0, Some(minor), _) => Version::new(0, minor.checked_add(1)?, 0),
                    _ => Version::new(major.checked_add(1)?, 0, 0),
                };
                self.raise_lower(Bound::inclusive(floor));
                self.lower_upper(Bound::exclusive(ceiling));
            }
            _ => return None,
        }
        Some(())
    }

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let mut set = Self::any();

        if let Some((from, to)) = text.split_once(" - ") {
            let from = Partial::parse(from)?;
            let to = Partial::parse(to)?;
            set.note_prerelease(&from);
            set.note_prerelease(&to);
            if !from.is_any() {
                set.raise_lower(Bound::inclusive(from.floor()));
            }
            if to.is_exact() {
                set.lower_upper(Bound::inclusive(to.floor()));
            } else if !to.is_any() {
                set.lower_upper(Bound::exclusive(to.ceiling()?));
            }
            return Some(set);
        }

        for comparator in comparators(text)? {
            let (op, version) = split_operator(&comparator);
            set.apply(op, &Partial::parse(version)?)?;
        }
        Some(set)
    }

    fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty()
            && !self
                .prerelease_triples
                .contains(&(version.major, version.minor, version.patch))
        {
            return false;
        }
        if let Some(ref lower) = self.lower {
            let cmp = precedence(version, &lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = precedence(version, &upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }
}

/// Split a comparator set on whitespace, gluing `>= 1.0` back into `>=1.0`.
fn comparators(text: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in text.split_whitespace() {
        if is_operator(token) {
            if pending_op.is_some() {
                return None;
            }
            pending_op = Some(token);
            continue;
        }
        match pending_op.take() {
            Some(op) => out.push(format!("{op}{token}")),
            None => out.push(token.to_string()),
        }
    }
    if pending_op.is_some() {
        return None;
    }
    Some(out)
}

fn is_operator(token: &str) -> bool {
    matches!(token, ">=" | "<=" | ">" | "<" | "=" | "~" | "~>" | "^")
}

fn split_operator(comparator: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "=", "~>", "~", "^"] {
        if let Some(rest) = comparator.strip_prefix(op) {
            // `~>` is the Ruby spelling of `~`
            let op = if op == "~>" { "~" } else { op };
            return (op, rest);
        }
    }
    ("", comparator)
}

/// Semantic version precedence; build metadata is ignored.
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

impl VersionRange {
    /// Parse a requirement string.
    ///
    /// An empty string or `*` matches every release. Returns `None` when the
    /// requirement cannot be understood.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        let sets = if s.is_empty() {
            vec![ComparatorSet::any()]
        } else {
            s.split("||")
                .map(ComparatorSet::parse)
                .collect::<Option<Vec<_>>>()?
        };
        Some(Self {
            original: s.to_string(),
            sets,
        })
    }

    /// Whether `version` satisfies this requirement.
    pub fn contains(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&self.original)
        }
    }
}

/// Whether `version` satisfies the requirement text; `None` matches anything.
///
/// An unparseable requirement matches nothing.
pub fn requirement_matches(requirement: Option<&str>, version: &Version) -> bool {
    match requirement {
        None => true,
        Some(req) => VersionRange::parse(req).is_some_and(|range| range.contains(version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn matches(range: &str, version: &str) -> bool {
        VersionRange::parse(range).unwrap().contains(&v(version))
    }

    #[test]
    fn and_of_bounds() {
        assert!(matches(">= 4.13.1 < 7.0.0", "4.13.1"));
        assert!(matches(">= 4.13.1 < 7.0.0", "6.9.9"));
        assert!(!matches(">= 4.13.1 < 7.0.0", "7.0.0"));
        assert!(!matches(">= 4.13.1 < 7.0.0", "4.13.0"));
        assert!(matches(">=4.13.1 <7.0.0", "5.0.0"));
    }

    #[test]
    fn alternatives() {
        assert!(matches("1.x || >= 3.0.0", "1.4.0"));
        assert!(matches("1.x || >= 3.0.0", "3.2.0"));
        assert!(!matches("1.x || >= 3.0.0", "2.0.0"));
    }

    #[test]
    fn wildcards() {
        assert!(matches("1.x", "1.9.0"));
        assert!(!matches("1.x", "2.0.0"));
        assert!(matches("1.2.x", "1.2.7"));
        assert!(!matches("1.2.x", "1.3.0"));
        assert!(matches("1", "1.0.0"));
        assert!(matches("1.2", "1.2.5"));
        assert!(matches("*", "0.0.1"));
        assert!(matches("", "9.9.9"));
    }

    #[test]
    fn tilde_and_caret() {
        assert!(matches("~1.2.3", "1.2.9"));
        assert!(!matches("~1.2.3", "1.3.0"));
        assert!(matches("~> 1.2", "1.2.0"));
        assert!(matches("^1.2.3", "1.9.0"));
        assert!(!matches("^1.2.3", "2.0.0"));
        assert!(matches("^0.2.3", "0.2.9"));
        assert!(!matches("^0.2.3", "0.3.0"));
    }

    #[test]
    fn exclusive_partial_bounds() {
        assert!(matches("> 1.2", "1.3.0"));
        assert!(!matches("> 1.2", "1.2.9"));
        assert!(matches("<= 1.2", "1.2.9"));
        assert!(!matches("<= 1.2", "1.3.0"));
        assert!(!matches("< 1.2", "1.2.0"));
    }

    #[test]
    fn hyphen_range() {
        assert!(matches("1.0.0 - 2.0.0", "2.0.0"));
        assert!(matches("1.0.0 - 2.0.0", "1.0.0"));
        assert!(!matches("1.0.0 - 2.0.0", "2.0.1"));
        assert!(matches("1.0.0 - 2", "2.9.0"));
    }

    #[test]
    fn exact_versions() {
        assert!(matches("6.0.0", "6.0.0"));
        assert!(!matches("6.0.0", "6.0.1"));
        assert!(matches("= 6.0.0", "6.0.0"));
        assert!(matches("=6.0.0", "6.0.0+build.1"));
        assert!(!matches("= 6.0.0", "5.0.0"));
    }

    #[test]
    fn prereleases_need_an_explicit_opt_in() {
        assert!(!matches(">= 1.0.0", "2.0.0-rc1"));
        assert!(!matches("< 2.0.0", "2.0.0-rc1"));
        assert!(matches(">= 2.0.0-rc0", "2.0.0-rc1"));
        assert!(!matches(">= 2.0.0-rc0", "2.0.1-rc1"));
        assert!(matches("= 1.0.0-alpha", "1.0.0-alpha"));
    }

    #[test]
    fn invalid_requirements() {
        assert!(VersionRange::parse("banana").is_none());
        assert!(VersionRange::parse(">=").is_none());
        assert!(VersionRange::parse("1.x.3").is_none());
        assert!(VersionRange::parse("1.2.3.4").is_none());
        assert!(!requirement_matches(Some("banana"), &v("1.0.0")));
        assert!(requirement_matches(None, &v("1.0.0")));
    }

    #[test]
    fn overflowing_components_are_unparseable() {
        let max = u64::MAX;
        for req in [
            format!("{max}.x"),
            format!("{max}"),
            format!("1.{max}"),
            format!("> {max}"),
            format!("<= 1.{max}"),
            format!("~{max}"),
            format!("~1.{max}.0"),
            format!("^{max}.0.0"),
            format!("^0.{max}.0"),
            format!("^0.0.{max}"),
            format!("1.0.0 - {max}"),
        ] {
            assert!(VersionRange::parse(&req).is_none(), "{req}");
            assert!(!requirement_matches(Some(&req), &Version::new(1, 0, 0)), "{req}");
        }
        // exact versions at the limit still parse
        assert!(matches(&format!("= {max}.0.0"), &format!("{max}.0.0")));
    }

    #[test]
    fn display_keeps_the_original_text() {
        assert_eq!(VersionRange::parse(">= 1.0.0 < 2.0.0").unwrap().to_string(), ">= 1.0.0 < 2.0.0");
        assert_eq!(VersionRange::parse("").unwrap().to_string(), "*");
    }
}
