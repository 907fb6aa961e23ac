//! Git spec searcher.
//!
//! GitHub and GitLab remotes are read over their raw-file HTTP endpoints.
//! Any other remote is shallow-fetched with the `git` CLI into a scratch
//! repository and `metadata.json` is read from `FETCH_HEAD`.

use pfr_core::classifier::GitRef;
use pfr_core::dependency::ModuleDependency;
use pfr_core::specification::{ModuleMetadata, ModuleSpecification, Origin};
use pfr_util::errors::PfrError;
use pfr_util::process::CommandBuilder;

use crate::cache::Cache;
use crate::download::HttpClient;

/// Fetches `metadata.json` from a git remote at one ref.
pub struct GitSearcher {
    http: HttpClient,
}

impl GitSearcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `git:{remote}:{kind}:{name}`, or `git:{remote}:HEAD` for the default branch.
    pub fn cache_key(remote: &str, reference: &GitRef) -> String {
        match reference {
            GitRef::Tag(name) => format!("git:{remote}:tag:{name}"),
            GitRef::Commit(name) => format!("git:{remote}:commit:{name}"),
            GitRef::Branch(name) => format!("git:{remote}:branch:{name}"),
            GitRef::Ref(name) => format!("git:{remote}:ref:{name}"),
            GitRef::DefaultBranch => format!("git:{remote}:HEAD"),
        }
    }

    /// The single specification at `reference`.
    pub fn candidates(
        &self,
        dependency: &ModuleDependency,
        remote: &str,
        reference: &GitRef,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError> {
        let key = Self::cache_key(remote, reference);
        let metadata = match cache.load_as::<ModuleMetadata>(&key)? {
            Some(metadata) => metadata,
            None => {
                let metadata = self.fetch_metadata(remote, reference)?;
                cache.save_as(&key, &metadata, true);
                metadata
            }
        };

        let spec =
            ModuleSpecification::from_metadata(&dependency.key(), None, Origin::Git, &metadata)?;
        Ok(vec![spec])
    }

    fn fetch_metadata(&self, remote: &str, reference: &GitRef) -> Result<ModuleMetadata, PfrError> {
        let refname = reference.name().unwrap_or("HEAD");
        tracing::info!("fetching metadata for {reference} from {remote}");

        let content = match raw_metadata_url(remote, refname) {
            Some(url) => self.http.get_text(&url)?,
            None => fetch_with_cli(remote, refname)?,
        };

        match content {
            Some(content) => ModuleMetadata::from_json(&content),
            None => Err(PfrError::fetch(format!(
                "could not find module metadata for ref {refname} at remote {remote}"
            ))),
        }
    }
}

/// Raw `metadata.json` URL for GitHub and GitLab remotes.
pub fn raw_metadata_url(remote: &str, refname: &str) -> Option<String> {
    let (host, path) = split_remote(remote)?;
    let path = path.trim_end_matches('/').trim_end_matches(".git");
    match host {
        "github.com" => Some(format!(
            "https://raw.githubusercontent.com/{path}/{refname}/metadata.json"
        )),
        "gitlab.com" => Some(format!(
            "https://gitlab.com/{path}/-/raw/{refname}/metadata.json"
        )),
        _ => None,
    }
}

/// `(host, owner/repo)` from an https, ssh or scp-style remote.
fn split_remote(remote: &str) -> Option<(&str, &str)> {
    let rest = ["https://", "http://", "ssh://", "git://"]
        .iter()
        .find_map(|scheme| remote.strip_prefix(scheme));

    let (host, path) = match rest {
        Some(rest) => rest.split_once('/')?,
        // git@github.com:owner/repo.git
        None => remote.split_once(':')?,
    };
    let host = host.rsplit('@').next()?;
    let host = host.split(':').next()?;
    Some((host, path))
}

fn fetch_with_cli(remote: &str, refname: &str) -> Result<Option<String>, PfrError> {
    let scratch = tempfile::tempdir()?;

    CommandBuilder::new("git")
        .args(["init", "--quiet"])
        .cwd(scratch.path())
        .exec_stdout()?;

    let fetch = CommandBuilder::new("git")
        .args(["fetch", "--quiet", "--depth", "1", remote, refname])
        .cwd(scratch.path())
        .env("GIT_TERMINAL_PROMPT", "0")
        .exec()?;
    if !fetch.status.success() {
        tracing::debug!(
            "git fetch {remote} {refname} failed: {}",
            String::from_utf8_lossy(&fetch.stderr).trim()
        );
        return Ok(None);
    }

    let show = CommandBuilder::new("git")
        .args(["show", "FETCH_HEAD:metadata.json"])
        .cwd(scratch.path())
        .exec()?;
    if !show.status.success() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&show.stdout).into_owned()))
}
