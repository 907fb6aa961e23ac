use std::fs;
use std::path::Path;

use pfr_core::classifier::{classify, ModuleKind};
use pfr_core::config::{GlobalConfig, HttpConfig};
use pfr_core::dependency::ModuleDependency;
use pfr_core::document::{ArgValue, ModuleArgs};
use pfr_core::specification::Origin;
use pfr_source::cache::Cache;
use pfr_source::local::LocalSearcher;
use pfr_source::{CandidateSource, SpecSearchers};
use pfr_util::errors::PfrError;

fn write_module(dir: &Path, name: &str, version: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("metadata.json"),
        format!(
            r#"{{
                "name": "{name}",
                "version": "{version}",
                "dependencies": [{{ "name": "puppetlabs/stdlib", "version_requirement": ">= 4.0.0" }}]
            }}"#
        ),
    )
    .unwrap();
}

fn offline_config() -> GlobalConfig {
    GlobalConfig {
        forge_url: "http://127.0.0.1:9".to_string(),
        http: HttpConfig {
            timeout_secs: 2,
            retries: 0,
            ..HttpConfig::default()
        },
        ..GlobalConfig::default()
    }
}

#[test]
fn local_module_in_moduledir() {
    let tmp = tempfile::tempdir().unwrap();
    write_module(&tmp.path().join("modules/profile"), "example-profile", "0.1.0");

    let searcher = LocalSearcher::new(tmp.path().join("modules"), Vec::new());
    let dep = ModuleDependency::from_title("profile", None, None).unwrap();
    let specs = searcher.candidates(&dep, None, &mut Cache::in_memory()).unwrap();

    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].origin, Origin::Local);
    assert_eq!(specs[0].version.as_ref().unwrap().to_string(), "0.1.0");
    assert_eq!(specs[0].dependencies.len(), 1);
}

#[test]
fn local_module_at_explicit_path() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("elsewhere");
    write_module(&dir, "example-role", "2.0.0");

    let searcher = LocalSearcher::new(tmp.path().join("modules"), Vec::new());
    let dep = ModuleDependency::from_title("role", None, None).unwrap();
    let specs = searcher
        .candidates(&dep, dir.to_str(), &mut Cache::in_memory())
        .unwrap();
    assert_eq!(specs.len(), 1);
}

#[test]
fn absent_local_module_is_a_fetch_error() {
    let tmp = tempfile::tempdir().unwrap();
    let searcher = LocalSearcher::new(tmp.path().to_path_buf(), Vec::new());
    let dep = ModuleDependency::from_title("nothing", None, None).unwrap();
    let err = searcher
        .candidates(&dep, None, &mut Cache::in_memory())
        .unwrap_err();
    assert!(matches!(err, PfrError::MetadataFetch { .. }));
}

#[test]
fn module_paths_skip_other_owners() {
    let tmp = tempfile::tempdir().unwrap();
    write_module(&tmp.path().join("a/stdlib"), "example-stdlib", "1.0.0");
    write_module(&tmp.path().join("b/stdlib"), "puppetlabs-stdlib", "6.0.0");

    let searcher = LocalSearcher::new(
        tmp.path().join("modules"),
        vec![tmp.path().join("a"), tmp.path().join("b")],
    );
    let dep = ModuleDependency::from_title("puppetlabs/stdlib", None, None).unwrap();
    let specs = searcher
        .search_module_paths(&dep, &mut Cache::in_memory())
        .unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].version.as_ref().unwrap().to_string(), "6.0.0");
}

#[test]
fn module_path_copy_is_offered_when_origin_is_unreachable() {
    let tmp = tempfile::tempdir().unwrap();
    write_module(&tmp.path().join("site/stdlib"), "puppetlabs-stdlib", "6.0.0");

    let searchers = SpecSearchers::new(
        &offline_config(),
        None,
        tmp.path().join("modules"),
        vec![tmp.path().join("site")],
    )
    .unwrap();
    let dep = ModuleDependency::from_title("puppetlabs/stdlib", None, None).unwrap();
    let specs = searchers
        .candidates(
            &dep,
            &ModuleKind::Forge {
                version: pfr_core::classifier::ForgeVersion::Any,
            },
            &mut Cache::in_memory(),
        )
        .unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].origin, Origin::Local);
}

#[test]
fn invalid_kind_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let searchers =
        SpecSearchers::new(&offline_config(), None, tmp.path().to_path_buf(), Vec::new()).unwrap();
    let dep = ModuleDependency::from_title("puppetlabs/stdlib", None, None).unwrap();
    let err = searchers
        .candidates(
            &dep,
            &ModuleKind::Invalid {
                reason: "no implementation understands these arguments".into(),
            },
            &mut Cache::in_memory(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("no implementation understands"));
}

#[test]
fn invalid_kind_ignores_module_path_copy() {
    let tmp = tempfile::tempdir().unwrap();
    write_module(&tmp.path().join("site/stdlib"), "puppetlabs-stdlib", "6.0.0");
    let searchers = SpecSearchers::new(
        &offline_config(),
        None,
        tmp.path().join("modules"),
        vec![tmp.path().join("site")],
    )
    .unwrap();

    let kind = classify(
        "puppetlabs/stdlib",
        &ModuleArgs::Version(ArgValue::Str("1.2".into())),
    );
    assert!(matches!(kind, ModuleKind::Invalid { .. }));

    let dep = ModuleDependency::from_title("puppetlabs/stdlib", None, None).unwrap();
    let err = searchers
        .candidates(&dep, &kind, &mut Cache::in_memory())
        .unwrap_err();
    assert!(matches!(err, PfrError::MetadataFetch { .. }));
    assert!(err.to_string().contains("'1.2' is not a valid semantic version"));
}

#[test]
fn unreachable_forge_is_a_network_error() {
    let tmp = tempfile::tempdir().unwrap();
    let searchers =
        SpecSearchers::new(&offline_config(), None, tmp.path().to_path_buf(), Vec::new()).unwrap();
    let dep = ModuleDependency::from_title("puppetlabs/stdlib", None, None).unwrap();
    let mut cache = Cache::in_memory();
    let err = searchers
        .candidates(
            &dep,
            &ModuleKind::Forge {
                version: pfr_core::classifier::ForgeVersion::Any,
            },
            &mut cache,
        )
        .unwrap_err();
    assert!(matches!(err, PfrError::Network { .. }), "{err}");
    assert!(!cache.exists("forge:http://127.0.0.1:9:puppetlabs-stdlib"));
}
