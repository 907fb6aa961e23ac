//! Local filesystem spec searcher.

use std::path::{Path, PathBuf};

use pfr_core::dependency::{parse_title, ModuleDependency};
use pfr_core::specification::{ModuleMetadata, ModuleSpecification, Origin};
use pfr_util::errors::PfrError;
use pfr_util::fs::read_if_exists;

use crate::cache::Cache;

/// Reads `metadata.json` from module directories on disk.
pub struct LocalSearcher {
    moduledir: PathBuf,
    module_paths: Vec<PathBuf>,
}

impl LocalSearcher {
    /// `moduledir` holds `:local => true` modules; `module_paths` are extra
    /// roots searched for every dependency.
    pub fn new(moduledir: PathBuf, module_paths: Vec<PathBuf>) -> Self {
        Self {
            moduledir,
            module_paths,
        }
    }

    /// The on-disk copy of a `:local` module, or nothing if it is absent.
    pub fn candidates(
        &self,
        dependency: &ModuleDependency,
        path: Option<&str>,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError> {
        let dir = match path {
            Some(path) => PathBuf::from(path),
            None => self.moduledir.join(&dependency.name),
        };
        match read_module(&dir, dependency, cache)? {
            Some(spec) => Ok(vec![spec]),
            None => Err(PfrError::fetch(format!(
                "no metadata.json in {}",
                dir.display()
            ))),
        }
    }

    /// The first copy of the module found under the module paths.
    pub fn search_module_paths(
        &self,
        dependency: &ModuleDependency,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError> {
        for root in &self.module_paths {
            let dir = root.join(&dependency.name);
            match read_module(&dir, dependency, cache) {
                Ok(Some(spec)) => {
                    tracing::debug!("{dependency}: found in {}", dir.display());
                    return Ok(vec![spec]);
                }
                Ok(None) => {}
                Err(e @ PfrError::CacheCorruption { .. }) => return Err(e),
                Err(e) => tracing::warn!("{}: {e}", dir.display()),
            }
        }
        Ok(Vec::new())
    }
}

fn read_module(
    dir: &Path,
    dependency: &ModuleDependency,
    cache: &mut Cache,
) -> Result<Option<ModuleSpecification>, PfrError> {
    let key = format!("local:{}", dir.display());
    let metadata = match cache.load_as::<ModuleMetadata>(&key)? {
        Some(metadata) => metadata,
        None => {
            let Some(content) = read_if_exists(&dir.join("metadata.json"))? else {
                return Ok(None);
            };
            let metadata = ModuleMetadata::from_json(&content)?;
            cache.save_as(&key, &metadata, false);
            metadata
        }
    };

    if !owner_matches(dependency, &metadata) {
        return Ok(None);
    }
    ModuleSpecification::from_metadata(&dependency.key(), None, Origin::Local, &metadata).map(Some)
}

/// A directory named like the module may belong to another owner.
fn owner_matches(dependency: &ModuleDependency, metadata: &ModuleMetadata) -> bool {
    let Some(wanted) = dependency.owner.as_deref() else {
        return true;
    };
    match metadata.name.as_deref().map(parse_title) {
        Some(Ok((Some(owner), _))) => owner == wanted,
        _ => true,
    }
}
