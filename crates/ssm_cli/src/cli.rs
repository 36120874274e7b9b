//! Command-line definition and merging with the configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use ssm_core::{SsmConfig, WriteMode};

/// ssm - section schema manager
#[derive(Parser, Debug)]
#[command(name = "ssm")]
#[command(version, about = "Resolve section schemas and write them into templates")]
#[command(long_about = r#"
Reads every `<name>-schema.*` file in SCHEMA_DIR, substitutes `from`
references between them, and writes each schema carrying a `for` target into
the {% schema %} ... {% endschema %} region of TARGET_DIR/<target>.liquid.

SCHEMA FILES:
  .json          → data schema
  .yaml / .yml   → data schema
  .plugin        → callable schema backed by a registered function

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Unresolved schema reference
  4 - Schema source error
"#)]
pub struct Cli {
    /// Directory holding the schema files
    pub schema_dir: Option<PathBuf>,

    /// Directory holding the template files
    pub target_dir: Option<PathBuf>,

    /// Configuration file (defaults to ./ssm.toml when present)
    #[arg(short, long, env = "SSM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Template file extension
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Append a schema region to templates that have none
    #[arg(long)]
    pub append: bool,

    /// Report what would be written without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit log lines as JSON on stderr
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Directories and settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub schema_dir: PathBuf,
    pub target_dir: PathBuf,
    pub config: SsmConfig,
}

impl Cli {
    /// Load the configuration file, explicit or discovered in `cwd`.
    pub fn load_config(&self, cwd: &Path) -> Result<SsmConfig> {
        match &self.config {
            Some(path) => SsmConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display())),
            None => SsmConfig::discover(cwd).context("Failed to load ssm.toml"),
        }
    }

    /// Apply command-line overrides on top of a loaded configuration.
    pub fn settings(&self, mut config: SsmConfig) -> Result<RunSettings> {
        if let Some(extension) = &self.extension {
            config.writer = config.writer.extension(extension.clone());
        }
        if self.append {
            config.writer = config.writer.mode(WriteMode::Append);
        }
        config.dry_run |= self.dry_run;

        let schema_dir = self
            .schema_dir
            .clone()
            .or_else(|| config.schema_dir.clone())
            .context("Missing argument: SCHEMA_DIR (pass it or set schema_dir in ssm.toml)")?;
        let target_dir = self
            .target_dir
            .clone()
            .or_else(|| config.target_dir.clone())
            .context("Missing argument: TARGET_DIR (pass it or set target_dir in ssm.toml)")?;

        Ok(RunSettings {
            schema_dir,
            target_dir,
            config,
        })
    }

    /// Log filter directive for the selected verbosity.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "ssm=debug"
        } else if self.quiet {
            "ssm=error"
        } else {
            "ssm=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ssm").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_directories() {
        let cli = parse(&["schema", "sections"]);
        let settings = cli.settings(SsmConfig::default()).unwrap();

        assert_eq!(settings.schema_dir, PathBuf::from("schema"));
        assert_eq!(settings.target_dir, PathBuf::from("sections"));
        assert_eq!(settings.config.writer.mode, WriteMode::Overwrite);
        assert!(!settings.config.dry_run);
    }

    #[test]
    fn test_flags_override_config() {
        let config = SsmConfig::from_toml_str(
            r#"
            schema_dir = "from-config"
            target_dir = "templates"

            [writer]
            template_extension = ".html"
            "#,
        )
        .unwrap();

        let cli = parse(&["src/schema", "--extension", "liquid", "--append", "--dry-run"]);
        let settings = cli.settings(config).unwrap();

        assert_eq!(settings.schema_dir, PathBuf::from("src/schema"));
        assert_eq!(settings.target_dir, PathBuf::from("templates"));
        assert_eq!(settings.config.writer.normalized_extension(), ".liquid");
        assert_eq!(settings.config.writer.mode, WriteMode::Append);
        assert!(settings.config.dry_run);
    }

    #[test]
    fn test_missing_directories() {
        let cli = parse(&[]);
        let err = cli.settings(SsmConfig::default()).unwrap_err();
        assert!(err.to_string().contains("SCHEMA_DIR"));
    }

    #[test]
    fn test_load_config_discovers_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ssm.toml"), "dry_run = true\n").unwrap();

        let config = parse(&[]).load_config(dir.path()).unwrap();
        assert!(config.dry_run);
    }

    #[test]
    fn test_log_directive() {
        assert_eq!(parse(&[]).log_directive(), "ssm=info");
        assert_eq!(parse(&["-v"]).log_directive(), "ssm=debug");
        assert_eq!(parse(&["-q"]).log_directive(), "ssm=error");
        assert!(Cli::try_parse_from(["ssm", "-v", "-q"]).is_err());
        assert!(parse(&["--log-json"]).log_json);
        assert!(!parse(&[]).log_json);
    }
}
