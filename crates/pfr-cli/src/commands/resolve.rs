//! Resolve a Puppetfile and print the graph.

use std::path::{Path, PathBuf};

use pfr_core::config::GlobalConfig;
use pfr_core::document::Document;
use pfr_core::puppetfile;
use pfr_resolver::resolver::{resolve, ResolveOptions};
use pfr_source::cache::Cache;
use pfr_source::SpecSearchers;
use pfr_util::errors::{PfrError, PfrResult};
use pfr_util::fs::expand_home;
use pfr_util::progress;

use crate::cli::Cli;
use crate::ui::SpinnerUi;

const DEFAULT_MODULEDIR: &str = "modules";

pub fn exec(cli: &Cli) -> PfrResult<()> {
    let config = match cli.config {
        Some(ref path) => GlobalConfig::from_path(path)?,
        None => GlobalConfig::load()?,
    };

    let document = read_document(&cli.path)?;
    if !document.is_valid() {
        for error in &document.validation_errors {
            progress::status_error("error", &error.to_string());
        }
        return Err(PfrError::Manifest {
            message: format!(
                "{} has {} error(s)",
                cli.path.display(),
                document.validation_errors.len()
            ),
        }
        .into());
    }

    let base = cli
        .path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let moduledir = base.join(document.moduledir.as_deref().unwrap_or(DEFAULT_MODULEDIR));

    let module_paths: Vec<PathBuf> = if cli.module_paths.is_empty() {
        config.module_paths.iter().map(|p| expand_home(p)).collect()
    } else {
        cli.module_paths.clone()
    };

    let cache_dir = cli
        .cache_directory
        .clone()
        .or_else(|| config.cache_dir.as_deref().map(expand_home));
    let mut cache = Cache::new(cache_dir);

    let forge_url = cli
        .forge_url
        .as_deref()
        .or(document.forge_uri.as_deref());
    let searchers = SpecSearchers::new(&config, forge_url, moduledir, module_paths)?;

    let options = ResolveOptions {
        puppet_version: cli.puppet_version.clone(),
        allow_missing_modules: !(cli.strict || config.strict),
    };
    tracing::info!(
        "resolving {} ({} modules, strict: {})",
        cli.path.display(),
        document.modules.len(),
        !options.allow_missing_modules
    );

    progress::status("Resolving", &cli.path.display().to_string());
    let ui = SpinnerUi::new(!cli.debug);
    let result = resolve(&document, &searchers, &mut cache, &options, &ui)?;

    print!("{}", result.to_dot());
    print!("{}", result.validation_errors);

    let missing = result.graph.vertices().iter().filter(|s| s.is_missing()).count();
    if !result.validation_errors.is_empty() {
        progress::status_warn(
            "Unresolved",
            &format!("{} module(s) could not be resolved", result.validation_errors.len()),
        );
    } else if missing > 0 {
        progress::status_warn("Missing", &format!("{missing} module(s) could not be found"));
    } else {
        progress::status("Resolved", &format!("{} modules", result.graph.len()));
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<Document, PfrError> {
    let content = std::fs::read_to_string(path).map_err(|e| PfrError::Manifest {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    Ok(puppetfile::parse(&content))
}
