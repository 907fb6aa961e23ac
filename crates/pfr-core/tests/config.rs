use pfr_core::config::GlobalConfig;
use pfr_core::DEFAULT_FORGE_URL;

#[test]
fn defaults_when_empty() {
    let config = GlobalConfig::parse_toml("").unwrap();
    assert_eq!(config.forge_url, DEFAULT_FORGE_URL);
    assert!(config.cache_dir.is_none());
    assert!(config.module_paths.is_empty());
    assert!(!config.strict);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.http.retries, 2);
    assert_eq!(config.http.retry_delay_ms, 500);
    assert!(config.http.user_agent.starts_with("puppetfile-resolver/"));
}

#[test]
fn full_config() {
    let config = GlobalConfig::parse_toml(
        r#"
forge-url = "https://forge.example.com"
cache-dir = "~/.pfr/cache"
module-paths = ["/etc/puppetlabs/code/modules", "site"]
strict = true

[http]
timeout-secs = 5
retries = 0
retry-delay-ms = 10
user-agent = "ci"
"#,
    )
    .unwrap();
    assert_eq!(config.forge_url, "https://forge.example.com");
    assert_eq!(config.cache_dir.as_deref(), Some("~/.pfr/cache"));
    assert_eq!(config.module_paths.len(), 2);
    assert!(config.strict);
    assert_eq!(config.http.timeout_secs, 5);
    assert_eq!(config.http.retries, 0);
    assert_eq!(config.http.retry_delay_ms, 10);
    assert_eq!(config.http.user_agent, "ci");
}

#[test]
fn from_path_reads_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "strict = true\n").unwrap();
    let config = GlobalConfig::from_path(&path).unwrap();
    assert!(config.strict);
}

#[test]
fn from_path_missing_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = GlobalConfig::from_path(&tmp.path().join("nope.toml")).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"), "{err}");
}

#[test]
fn from_path_invalid_toml_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "strict = [").unwrap();
    assert!(GlobalConfig::from_path(&path).is_err());
}

#[test]
fn default_path_is_under_home() {
    let path = GlobalConfig::default_path();
    assert!(path.ends_with(".pfr/config.toml"));
}
