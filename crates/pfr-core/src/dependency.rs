use std::fmt;

use pfr_util::errors::PfrError;
use serde::{Deserialize, Serialize};

/// Identity of a module in a resolved graph: `(owner, name)`.
///
/// The owner is optional because Puppetfile modules fetched from git, svn
/// or a local path may be declared by bare name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleKey {
    pub owner: Option<String>,
    pub name: String,
}

impl ModuleKey {
    pub fn new(owner: Option<&str>, name: &str) -> Self {
        Self {
            owner: owner.map(|o| o.to_string()),
            name: name.to_string(),
        }
    }

    /// The platform pseudo-module.
    pub fn puppet() -> Self {
        Self::new(None, "puppet")
    }

    /// `owner-name`, or just `name` when the owner is unknown.
    pub fn slug(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}-{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Whether two keys may refer to the same module.
    ///
    /// Names must be equal; owners must be equal unless either side is unknown.
    pub fn unifies_with(&self, other: &ModuleKey) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.owner, &other.owner) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A reference to a module, optionally constrained to a version range.
///
/// Used both as the query for spec searchers and as an edge constraint
/// between specifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDependency {
    pub owner: Option<String>,
    pub name: String,
    #[serde(default)]
    pub version_requirement: Option<String>,
}

impl ModuleDependency {
    /// Build a dependency from a module title such as `puppetlabs/stdlib`.
    ///
    /// `default_owner` is used when the title carries no owner.
    pub fn from_title(
        title: &str,
        default_owner: Option<&str>,
        version_requirement: Option<String>,
    ) -> Result<Self, PfrError> {
        let (owner, name) = parse_title(title)?;
        Ok(Self {
            owner: owner.or_else(|| default_owner.map(|o| o.to_string())),
            name,
            version_requirement,
        })
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey {
            owner: self.owner.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ModuleDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())?;
        if let Some(ref req) = self.version_requirement {
            write!(f, " ({req})")?;
        }
        Ok(())
    }
}

/// Split a module title into `(owner, name)`.
///
/// Accepts `name`, `owner/name` and `owner-name`, splitting on the first
/// `/` or `-`. Both halves must be non-empty runs of word characters.
pub fn parse_title(title: &str) -> Result<(Option<String>, String), PfrError> {
    let invalid = || PfrError::TitleFormat {
        title: title.to_string(),
    };

    match title.find(['/', '-']) {
        Some(idx) => {
            let (owner, rest) = title.split_at(idx);
            let name = &rest[1..];
            if is_word(owner) && is_word(name) {
                Ok((Some(owner.to_string()), name.to_string()))
            } else {
                Err(invalid())
            }
        }
        None if is_word(title) => Ok((None, title.to_string())),
        None => Err(invalid()),
    }
}

/// Non-empty and made only of ASCII letters, digits and underscores.
pub fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
