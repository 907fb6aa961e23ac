//! CLI argument definitions.
//!
//! Flag names keep the underscore spelling (`--puppet_version`) used by
//! existing Puppetfile tooling.

use std::path::PathBuf;

use clap::Parser;
use semver::Version;

#[derive(Parser, Debug)]
#[command(
    name = "puppetfile-resolver",
    version,
    about = "Resolve a Puppetfile into a module dependency graph",
    long_about = "Reads a Puppetfile, resolves every declared module and its transitive \
                  dependencies against the Forge, git, svn and local origins, and prints \
                  the resolved graph in DOT format."
)]
pub struct Cli {
    /// Puppetfile to resolve
    #[arg(long)]
    pub path: PathBuf,

    /// Puppet version modules must support
    #[arg(long = "puppet_version", value_parser = parse_puppet_version)]
    pub puppet_version: Option<Version>,

    /// Directory for the persistent metadata cache
    #[arg(long = "cache_directory", env = "PFR_CACHE_DIR")]
    pub cache_directory: Option<PathBuf>,

    /// Comma-separated directories searched for modules before their origin
    #[arg(long = "module_paths", value_delimiter = ',')]
    pub module_paths: Vec<PathBuf>,

    /// Report unresolvable modules as errors instead of missing vertices
    #[arg(long)]
    pub strict: bool,

    /// Print the solver trace
    #[arg(long)]
    pub debug: bool,

    /// Configuration file to use instead of ~/.pfr/config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Forge API base URL
    #[arg(long = "forge_url", env = "PFR_FORGE_URL")]
    pub forge_url: Option<String>,
}

fn parse_puppet_version(s: &str) -> Result<Version, String> {
    Version::parse(s.trim()).map_err(|e| format!("'{s}' is not a semantic version: {e}"))
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn module_paths_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "puppetfile-resolver",
            "--path",
            "Puppetfile",
            "--module_paths",
            "a,b/c",
        ])
        .unwrap();
        assert_eq!(cli.module_paths, vec![PathBuf::from("a"), PathBuf::from("b/c")]);
    }

    #[test]
    fn puppet_version_must_be_semver() {
        let cli = Cli::try_parse_from([
            "puppetfile-resolver",
            "--path",
            "Puppetfile",
            "--puppet_version",
            "6.21.0",
        ])
        .unwrap();
        assert_eq!(cli.puppet_version, Some(Version::new(6, 21, 0)));

        assert!(Cli::try_parse_from([
            "puppetfile-resolver",
            "--path",
            "Puppetfile",
            "--puppet_version",
            "six",
        ])
        .is_err());
    }

    #[test]
    fn path_is_required() {
        assert!(Cli::try_parse_from(["puppetfile-resolver", "--strict"]).is_err());
    }
}
