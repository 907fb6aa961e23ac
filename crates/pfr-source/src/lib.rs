//! Module metadata sources: the two-tier cache, HTTP download, and one
//! spec searcher per module origin.
//!
//! The resolver only sees the [`CandidateSource`] trait. [`SpecSearchers`]
//! is the production implementation that dispatches on a declaration's
//! [`ModuleKind`] and consults the local module paths first.

pub mod cache;
pub mod download;
pub mod forge;
pub mod git;
pub mod local;
pub mod svn;

use std::path::PathBuf;

use pfr_core::classifier::ModuleKind;
use pfr_core::config::GlobalConfig;
use pfr_core::dependency::ModuleDependency;
use pfr_core::specification::ModuleSpecification;
use pfr_util::errors::PfrError;

use crate::cache::Cache;
use crate::download::HttpClient;
use crate::forge::ForgeSearcher;
use crate::git::GitSearcher;
use crate::local::LocalSearcher;
use crate::svn::SvnSearcher;

/// Something that can list candidate specifications for a dependency.
pub trait CandidateSource {
    /// Candidates for `dependency`, newest version first.
    ///
    /// `kind` is how the module was declared; transitive dependencies that
    /// were never declared arrive as a Forge lookup.
    fn candidates(
        &self,
        dependency: &ModuleDependency,
        kind: &ModuleKind,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError>;
}

/// Dispatches candidate lookups to the searcher for each origin.
pub struct SpecSearchers {
    forge: ForgeSearcher,
    git: GitSearcher,
    svn: SvnSearcher,
    local: LocalSearcher,
}

impl SpecSearchers {
    /// Build the searchers.
    ///
    /// `forge_url` overrides the configured Forge, `moduledir` is where
    /// `:local => true` modules live, and `module_paths` are consulted for
    /// every dependency before its own origin.
    pub fn new(
        config: &GlobalConfig,
        forge_url: Option<&str>,
        moduledir: PathBuf,
        module_paths: Vec<PathBuf>,
    ) -> Result<Self, PfrError> {
        let http = HttpClient::new(&config.http)?;
        let forge_url = forge_url.unwrap_or(&config.forge_url);
        Ok(Self {
            forge: ForgeSearcher::new(http.clone(), forge_url),
            git: GitSearcher::new(http),
            svn: SvnSearcher,
            local: LocalSearcher::new(moduledir, module_paths),
        })
    }
}

impl CandidateSource for SpecSearchers {
    fn candidates(
        &self,
        dependency: &ModuleDependency,
        kind: &ModuleKind,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError> {
        let from_origin = match kind {
            ModuleKind::Forge { .. } => self.forge.candidates(dependency, cache),
            ModuleKind::Git { remote, reference } => {
                self.git.candidates(dependency, remote, reference, cache)
            }
            ModuleKind::Svn { remote, revision } => {
                self.svn
                    .candidates(dependency, remote, revision.as_deref(), cache)
            }
            ModuleKind::Local { path } => self.local.candidates(dependency, path.as_deref(), cache),
            // module paths never stand in for an invalid declaration
            ModuleKind::Invalid { reason } => return Err(PfrError::fetch(reason.clone())),
        };
        let mut found = self.local.search_module_paths(dependency, cache)?;

        match from_origin {
            Ok(specs) => {
                found.extend(specs);
                Ok(found)
            }
            Err(e @ PfrError::CacheCorruption { .. }) => Err(e),
            Err(e) if !found.is_empty() => {
                tracing::warn!("{dependency}: using module path copy, origin lookup failed: {e}");
                Ok(found)
            }
            Err(e) => Err(e),
        }
    }
}
