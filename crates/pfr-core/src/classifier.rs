//! Module origin classification.
//!
//! Every declaration maps to exactly one [`ModuleKind`]. Predicates are
//! tried in a fixed priority order and the first match wins:
//!
//! 1. `Git`: the options contain a `git` key
//! 2. `Svn`: the options contain an `svn` key
//! 3. `Local`: the options contain a `local` key
//! 4. `Forge`: the title is `owner/name` or `owner-name` and the version is
//!    absent, `:latest`, or a full semantic version
//! 5. `Invalid`: everything else
//!
//! The discriminating keys win regardless of what else is in the options,
//! so a git declaration with unknown extra keys is still `Git`.

use std::fmt;

use semver::Version;

use crate::dependency::is_word;
use crate::document::{ArgValue, DeclaredModule, ModuleArgs};
use crate::specification::Origin;

/// Which commit a git module points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitRef {
    Tag(String),
    Commit(String),
    Branch(String),
    Ref(String),
    DefaultBranch,
}

impl GitRef {
    /// Pick the ref from declaration options: tag, then commit, then branch, then ref.
    pub fn from_args(args: &ModuleArgs) -> Self {
        let text = |key: &str| args.option(key).map(ArgValue::to_text);
        if let Some(tag) = text("tag") {
            GitRef::Tag(tag)
        } else if let Some(commit) = text("commit") {
            GitRef::Commit(commit)
        } else if let Some(branch) = text("branch") {
            GitRef::Branch(branch)
        } else if let Some(reference) = text("ref") {
            GitRef::Ref(reference)
        } else {
            GitRef::DefaultBranch
        }
    }

    /// The ref name to fetch, or `None` for the remote's default branch.
    pub fn name(&self) -> Option<&str> {
        match self {
            GitRef::Tag(s) | GitRef::Commit(s) | GitRef::Branch(s) | GitRef::Ref(s) => Some(s),
            GitRef::DefaultBranch => None,
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Tag(s) => write!(f, "tag {s}"),
            GitRef::Commit(s) => write!(f, "commit {s}"),
            GitRef::Branch(s) => write!(f, "branch {s}"),
            GitRef::Ref(s) => write!(f, "ref {s}"),
            GitRef::DefaultBranch => f.write_str("default branch"),
        }
    }
}

/// The version a Forge declaration asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForgeVersion {
    Any,
    Latest,
    Exact(Version),
}

/// The origin variant of a declared module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    Git {
        remote: String,
        reference: GitRef,
    },
    Svn {
        remote: String,
        revision: Option<String>,
    },
    Local {
        /// Explicit path; `None` means `<moduledir>/<name>`.
        path: Option<String>,
    },
    Forge {
        version: ForgeVersion,
    },
    Invalid {
        reason: String,
    },
}

impl ModuleKind {
    /// The specification origin this kind produces, `None` for `Invalid`.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            ModuleKind::Git { .. } => Some(Origin::Git),
            ModuleKind::Svn { .. } => Some(Origin::Svn),
            ModuleKind::Local { .. } => Some(Origin::Local),
            ModuleKind::Forge { .. } => Some(Origin::Forge),
            ModuleKind::Invalid { .. } => None,
        }
    }

    /// The version requirement the declaration itself imposes.
    pub fn version_requirement(&self) -> Option<String> {
        match self {
            ModuleKind::Forge {
                version: ForgeVersion::Exact(v),
            } => Some(format!("= {v}")),
            _ => None,
        }
    }
}

/// Classify a declared module.
pub fn classify_module(module: &DeclaredModule) -> ModuleKind {
    classify(&module.title, &module.args)
}

/// Classify a title and argument set into a [`ModuleKind`].
pub fn classify(title: &str, args: &ModuleArgs) -> ModuleKind {
    if let Some(remote) = args.option("git") {
        return ModuleKind::Git {
            remote: remote.to_text(),
            reference: GitRef::from_args(args),
        };
    }

    if let Some(remote) = args.option("svn") {
        let revision = args
            .option("rev")
            .or_else(|| args.option("revision"))
            .map(ArgValue::to_text);
        return ModuleKind::Svn {
            remote: remote.to_text(),
            revision,
        };
    }

    if let Some(local) = args.option("local") {
        let path = match local {
            ArgValue::Str(p) => Some(p.clone()),
            _ => None,
        };
        return ModuleKind::Local { path };
    }

    if is_forge_title(title) {
        let version = match args {
            ModuleArgs::None => Some(ForgeVersion::Any),
            ModuleArgs::Version(v) if v.is_symbol("latest") => Some(ForgeVersion::Latest),
            ModuleArgs::Version(ArgValue::Str(s)) => {
                parse_full_semver(s).map(ForgeVersion::Exact)
            }
            _ => None,
        };
        if let Some(version) = version {
            return ModuleKind::Forge { version };
        }
    }

    ModuleKind::Invalid {
        reason: invalid_reason(title, args),
    }
}

fn invalid_reason(title: &str, args: &ModuleArgs) -> String {
    let detail = match args {
        _ if !is_forge_title(title) => {
            format!("'{title}' is not an owner/name module title")
        }
        ModuleArgs::Version(ArgValue::Str(s)) => {
            format!("'{s}' is not a valid semantic version")
        }
        ModuleArgs::Version(other) => format!("unsupported version {other}"),
        ModuleArgs::Options(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("unsupported options: {}", keys.join(", "))
        }
        ModuleArgs::None => String::new(),
    };
    if detail.is_empty() {
        "no implementation understands these arguments".to_string()
    } else {
        format!("no implementation understands these arguments ({detail})")
    }
}

/// `owner/name` or `owner-name` with word characters on each side.
fn is_forge_title(title: &str) -> bool {
    match title.find(['/', '-']) {
        Some(idx) => is_word(&title[..idx]) && is_word(&title[idx + 1..]),
        None => false,
    }
}

/// Parse a complete `major.minor.patch[-pre][+build]` version.
///
/// Rejects partial versions, leading zeros in numeric identifiers and
/// surrounding whitespace.
pub fn parse_full_semver(s: &str) -> Option<Version> {
    Version::parse(s).ok()
}

/// Whether `s` is a syntactically valid full semantic version.
pub fn is_valid_semver(s: &str) -> bool {
    parse_full_semver(s).is_some()
}
