//! Puppet Forge spec searcher (Forge v3 API).

use serde::{Deserialize, Serialize};

use pfr_core::dependency::{ModuleDependency, ModuleKey};
use pfr_core::specification::{ModuleMetadata, ModuleSpecification, Origin};
use pfr_util::errors::PfrError;

use crate::cache::Cache;
use crate::download::HttpClient;

/// Releases requested per page.
const PAGE_LIMIT: u32 = 100;

/// One page of `GET /v3/releases`.
#[derive(Debug, Deserialize)]
struct ReleasePage {
    #[serde(default)]
    pagination: Pagination,
    #[serde(default)]
    results: Vec<ForgeRelease>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
}

/// A published module release, as cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeRelease {
    pub version: String,
    #[serde(default)]
    pub metadata: ModuleMetadata,
    #[serde(default, skip_serializing)]
    deleted_at: Option<String>,
}

impl ForgeRelease {
    pub fn new(version: impl Into<String>, metadata: ModuleMetadata) -> Self {
        Self {
            version: version.into(),
            metadata,
            deleted_at: None,
        }
    }
}

/// Lists every release of `owner-name` from a Forge.
pub struct ForgeSearcher {
    http: HttpClient,
    base_url: String,
}

impl ForgeSearcher {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn cache_key(&self, owner: &str, name: &str) -> String {
        format!("forge:{}:{owner}-{name}", self.base_url)
    }

    /// All releases of the module, newest first.
    pub fn candidates(
        &self,
        dependency: &ModuleDependency,
        cache: &mut Cache,
    ) -> Result<Vec<ModuleSpecification>, PfrError> {
        let Some(owner) = dependency.owner.as_deref() else {
            return Err(PfrError::fetch(format!(
                "'{}' has no owner; Forge modules are looked up as owner/name",
                dependency.name
            )));
        };
        let key = self.cache_key(owner, &dependency.name);

        let releases = match cache.load_as::<Vec<ForgeRelease>>(&key)? {
            Some(releases) => releases,
            None => {
                let releases = self.fetch_releases(owner, &dependency.name)?;
                cache.save_as(&key, &releases, true);
                releases
            }
        };

        Ok(specs_from_releases(&dependency.key(), &releases))
    }

    fn fetch_releases(&self, owner: &str, name: &str) -> Result<Vec<ForgeRelease>, PfrError> {
        tracing::info!("fetching {owner}-{name} releases from {}", self.base_url);
        let mut url = Some(format!(
            "{}/v3/releases?module={owner}-{name}&limit={PAGE_LIMIT}&exclude_fields=readme,changelog,license,reference",
            self.base_url
        ));
        let mut releases = Vec::new();

        while let Some(page_url) = url.take() {
            let Some(page) = self.http.get_json::<ReleasePage>(&page_url)? else {
                break;
            };
            releases.extend(page.results.into_iter().filter(|r| r.deleted_at.is_none()));
            url = page.pagination.next.map(|next| self.join(&next));
        }

        tracing::debug!("{owner}-{name}: {} releases", releases.len());
        Ok(releases)
    }

    /// Resolve a pagination link, which the Forge returns host-relative.
    fn join(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            next.to_string()
        } else {
            format!("{}/{}", self.base_url, next.trim_start_matches('/'))
        }
    }
}

/// Turn cached releases into specifications, newest first.
///
/// Releases with unparseable versions are skipped.
pub fn specs_from_releases(key: &ModuleKey, releases: &[ForgeRelease]) -> Vec<ModuleSpecification> {
    let mut specs: Vec<ModuleSpecification> = releases
        .iter()
        .filter_map(|release| {
            ModuleSpecification::from_metadata(
                key,
                Some(&release.version),
                Origin::Forge,
                &release.metadata,
            )
            .map_err(|e| tracing::warn!("skipping release: {e}"))
            .ok()
        })
        .collect();
    specs.sort_by(|a, b| b.version.cmp(&a.version));
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfr_core::config::HttpConfig;

    fn searcher(url: &str) -> ForgeSearcher {
        ForgeSearcher::new(HttpClient::new(&HttpConfig::default()).unwrap(), url)
    }

    #[test]
    fn cache_key_includes_forge_and_module() {
        let forge = searcher("https://forgeapi.puppet.com/");
        assert_eq!(
            forge.cache_key("puppetlabs", "stdlib"),
            "forge:https://forgeapi.puppet.com:puppetlabs-stdlib"
        );
    }

    #[test]
    fn pagination_links_are_joined_to_the_base() {
        let forge = searcher("https://forge.example.com");
        assert_eq!(
            forge.join("/v3/releases?module=a-b&offset=100"),
            "https://forge.example.com/v3/releases?module=a-b&offset=100"
        );
        assert_eq!(forge.join("https://other/x"), "https://other/x");
    }

    #[test]
    fn page_parses_forge_payload() {
        let page: ReleasePage = serde_json::from_str(
            r#"{
                "pagination": { "next": null },
                "results": [
                    { "version": "6.0.0", "metadata": { "name": "puppetlabs-stdlib", "version": "6.0.0" } },
                    { "version": "5.0.0", "metadata": {}, "deleted_at": "2020-01-01" }
                ]
            }"#,
        )
        .unwrap();
        assert!(page.pagination.next.is_none());
        assert_eq!(page.results.len(), 2);
        assert!(page.results[1].deleted_at.is_some());
    }

    #[test]
    fn releases_sort_newest_first() {
        let key = ModuleKey::new(Some("puppetlabs"), "stdlib");
        let releases = vec![
            ForgeRelease::new("4.25.1", ModuleMetadata::default()),
            ForgeRelease::new("6.0.0", ModuleMetadata::default()),
            ForgeRelease::new("6.0.0-rc1", ModuleMetadata::default()),
            ForgeRelease::new("not-a-version", ModuleMetadata::default()),
        ];
        let versions: Vec<String> = specs_from_releases(&key, &releases)
            .iter()
            .map(|s| s.version.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(versions, vec!["6.0.0", "6.0.0-rc1", "4.25.1"]);
    }

    #[test]
    fn cached_releases_skip_the_network() {
        let forge = searcher("http://127.0.0.1:9");
        let mut cache = Cache::in_memory();
        let releases = vec![ForgeRelease::new("1.0.0", ModuleMetadata::default())];
        cache.save_as(&forge.cache_key("example", "thing"), &releases, false);

        let dep = ModuleDependency::from_title("example/thing", None, None).unwrap();
        let specs = forge.candidates(&dep, &mut cache).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].origin, Origin::Forge);
    }

    #[test]
    fn bare_name_is_a_fetch_error() {
        let forge = searcher("http://127.0.0.1:9");
        let dep = ModuleDependency::from_title("thing", None, None).unwrap();
        let err = forge.candidates(&dep, &mut Cache::in_memory()).unwrap_err();
        assert!(matches!(err, PfrError::MetadataFetch { .. }));
    }
}
