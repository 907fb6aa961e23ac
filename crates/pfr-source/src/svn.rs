//! Subversion spec searcher.

use pfr_core::dependency::ModuleDependency;
use pfr_core::specification::{ModuleMetadata, ModuleSpecification, Origin};
use pfr_util::errors::PfrError;
use pfr_util::process::CommandBuilder;

use crate::cache::Cache;

/// Reads `metadata.json` from an svn URL with `svn cat`.
pub struct SvnSearcher;

impl SvnSearcher {
    pub fn cache_key(remote: &str, revision: Option<&str>) -> String {
        format!("svn:{remote}:{}", revision.unwrap_or("HEAD"))
    }

    pub fn candidates(
        &self,
        dependency: &ModuleDependency,
        remote: &str,
        revision: Option<&str>,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError> {
        let key = Self::cache_key(remote, revision);
        let metadata = match cache.load_as::<ModuleMetadata>(&key)? {
            Some(metadata) => metadata,
            None => {
                let metadata = fetch_metadata(remote, revision)?;
                cache.save_as(&key, &metadata, true);
                metadata
            }
        };
        let spec =
            ModuleSpecification::from_metadata(&dependency.key(), None, Origin::Svn, &metadata)?;
        Ok(vec![spec])
    }
}

fn cat_command(remote: &str, revision: Option<&str>) -> CommandBuilder {
    let mut cmd = CommandBuilder::new("svn").args(["cat", "--non-interactive"]);
    if let Some(rev) = revision {
        cmd = cmd.args(["-r", rev]);
    }
    cmd.arg(format!("{}/metadata.json", remote.trim_end_matches('/')))
}

fn fetch_metadata(remote: &str, revision: Option<&str>) -> Result<ModuleMetadata, PfrError> {
    tracing::info!("fetching metadata from {remote}");
    let content = cat_command(remote, revision).exec_stdout().map_err(|e| {
        PfrError::fetch(format!(
            "could not find module metadata for revision {} at remote {remote}: {e}",
            revision.unwrap_or("HEAD")
        ))
    })?;
    ModuleMetadata::from_json(&content)
}
