//! Module specifications: the vertex type of a resolved dependency graph.

use std::fmt;

use pfr_util::errors::PfrError;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::dependency::{ModuleDependency, ModuleKey};

/// Where a specification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Forge,
    Git,
    Local,
    Svn,
    /// Synthetic placeholder for a module that could not be found.
    Missing,
    /// The host platform pseudo-module.
    Puppet,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Forge => "forge",
            Origin::Git => "git",
            Origin::Local => "local",
            Origin::Svn => "svn",
            Origin::Missing => "missing",
            Origin::Puppet => "puppet",
        };
        f.write_str(s)
    }
}

/// The subset of a module's `metadata.json` the resolver cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<MetadataRequirement>,
    #[serde(default)]
    pub requirements: Vec<MetadataRequirement>,
}

/// A `{ name, version_requirement }` entry from `dependencies` or `requirements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRequirement {
    pub name: String,
    #[serde(default)]
    pub version_requirement: Option<String>,
}

impl ModuleMetadata {
    /// Parse the contents of a `metadata.json` file.
    pub fn from_json(content: &str) -> Result<Self, PfrError> {
        serde_json::from_str(content)
            .map_err(|e| PfrError::fetch(format!("Invalid module metadata: {e}")))
    }
}

/// A concrete, versioned module candidate.
///
/// `origin == Missing` always comes with `version == None` and no
/// dependencies; use [`ModuleSpecification::missing`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpecification {
    pub owner: Option<String>,
    pub name: String,
    pub version: Option<Version>,
    pub origin: Origin,
    #[serde(default)]
    pub dependencies: Vec<ModuleDependency>,
    #[serde(default)]
    pub requirements: Vec<MetadataRequirement>,
    /// Why a missing specification could not be resolved.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ModuleSpecification {
    /// Build a specification for `key` from fetched metadata.
    ///
    /// The version comes from `version` when given, else from the metadata.
    /// Dependencies whose names are not valid module titles are skipped.
    pub fn from_metadata(
        key: &ModuleKey,
        version: Option<&str>,
        origin: Origin,
        metadata: &ModuleMetadata,
    ) -> Result<Self, PfrError> {
        let raw_version = version
            .or(metadata.version.as_deref())
            .ok_or_else(|| PfrError::fetch(format!("Module metadata for {key} has no version")))?;
        let version = Version::parse(raw_version.trim()).map_err(|e| {
            PfrError::fetch(format!(
                "Module {key} has an invalid version '{raw_version}': {e}"
            ))
        })?;

        let mut dependencies = Vec::with_capacity(metadata.dependencies.len());
        for dep in &metadata.dependencies {
            match ModuleDependency::from_title(&dep.name, None, dep.version_requirement.clone()) {
                Ok(d) => dependencies.push(d),
                Err(e) => tracing::warn!("{key} {version}: skipping dependency: {e}"),
            }
        }

        Ok(Self {
            owner: key.owner.clone(),
            name: key.name.clone(),
            version: Some(version),
            origin,
            dependencies,
            requirements: metadata.requirements.clone(),
            reason: None,
        })
    }

    /// A placeholder that satisfies any requirement and introduces none.
    pub fn missing(key: &ModuleKey, reason: Option<String>) -> Self {
        Self {
            owner: key.owner.clone(),
            name: key.name.clone(),
            version: None,
            origin: Origin::Missing,
            dependencies: Vec::new(),
            requirements: Vec::new(),
            reason,
        }
    }

    /// The platform pseudo-specification pinned to `version`.
    pub fn puppet(version: Version) -> Self {
        Self {
            owner: None,
            name: "puppet".to_string(),
            version: Some(version),
            origin: Origin::Puppet,
            dependencies: Vec::new(),
            requirements: Vec::new(),
            reason: None,
        }
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey {
            owner: self.owner.clone(),
            name: self.name.clone(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.origin == Origin::Missing
    }

    /// The version requirement this module places on the `puppet` platform, if any.
    pub fn puppet_requirement(&self) -> Option<&str> {
        self.requirements
            .iter()
            .find(|r| r.name == "puppet")
            .and_then(|r| r.version_requirement.as_deref())
    }

    /// `owner-name-version`, or `owner-name (missing)`.
    pub fn label(&self) -> String {
        match (&self.version, self.origin) {
            (_, Origin::Missing) | (None, _) => format!("{} (missing)", self.key().slug()),
            (Some(v), _) => format!("{}-{v}", self.key().slug()),
        }
    }
}

impl fmt::Display for ModuleSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {v} ({})", self.key(), self.origin),
            None => write!(f, "{} ({})", self.key(), self.origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "name": "puppetlabs-apache",
        "version": "5.4.0",
        "dependencies": [
            { "name": "puppetlabs/stdlib", "version_requirement": ">= 4.13.1 < 7.0.0" },
            { "name": "puppetlabs-concat", "version_requirement": ">= 2.2.1 < 7.0.0" },
            { "name": "not a module!" }
        ],
        "requirements": [
            { "name": "puppet", "version_requirement": ">= 5.5.10 < 7.0.0" }
        ],
        "summary": "ignored"
    }"#;

    #[test]
    fn from_metadata_reads_dependencies() {
        let meta = ModuleMetadata::from_json(METADATA).unwrap();
        let key = ModuleKey::new(Some("puppetlabs"), "apache");
        let spec = ModuleSpecification::from_metadata(&key, None, Origin::Forge, &meta).unwrap();

        assert_eq!(spec.version, Some(Version::new(5, 4, 0)));
        assert_eq!(spec.dependencies.len(), 2);
        assert_eq!(spec.dependencies[0].key(), ModuleKey::new(Some("puppetlabs"), "stdlib"));
        assert_eq!(
            spec.dependencies[1].version_requirement.as_deref(),
            Some(">= 2.2.1 < 7.0.0")
        );
        assert_eq!(spec.puppet_requirement(), Some(">= 5.5.10 < 7.0.0"));
        assert_eq!(spec.label(), "puppetlabs-apache-5.4.0");
    }

    #[test]
    fn explicit_version_wins_over_metadata() {
        let meta = ModuleMetadata::from_json(METADATA).unwrap();
        let key = ModuleKey::new(Some("puppetlabs"), "apache");
        let spec =
            ModuleSpecification::from_metadata(&key, Some("5.5.0"), Origin::Forge, &meta).unwrap();
        assert_eq!(spec.version, Some(Version::new(5, 5, 0)));
    }

    #[test]
    fn invalid_version_is_a_fetch_error() {
        let meta = ModuleMetadata {
            version: Some("1.0".into()),
            ..Default::default()
        };
        let err = ModuleSpecification::from_metadata(
            &ModuleKey::new(None, "thing"),
            None,
            Origin::Git,
            &meta,
        )
        .unwrap_err();
        assert!(matches!(err, PfrError::MetadataFetch { .. }));
    }

    #[test]
    fn missing_has_no_version_or_dependencies() {
        let spec = ModuleSpecification::missing(
            &ModuleKey::new(Some("puppetlabs"), "stdlib"),
            Some("offline".into()),
        );
        assert!(spec.is_missing());
        assert!(spec.version.is_none());
        assert!(spec.dependencies.is_empty());
        assert_eq!(spec.label(), "puppetlabs-stdlib (missing)");
    }

    #[test]
    fn puppet_pseudo_spec() {
        let spec = ModuleSpecification::puppet(Version::new(6, 21, 0));
        assert_eq!(spec.origin, Origin::Puppet);
        assert_eq!(spec.key(), ModuleKey::puppet());
        assert_eq!(spec.label(), "puppet-6.21.0");
    }
}
