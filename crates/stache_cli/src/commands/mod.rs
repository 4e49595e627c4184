//! CLI command definitions.
//!
//! This module defines the command structure for the stache CLI and the
//! input loading shared by its subcommands.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use stache_templates::{Partials, PartialsLoader, RenderOptions, Value};

pub mod check;
pub mod render;

/// stache - logic-less template renderer
#[derive(Parser)]
#[command(name = "stache")]
#[command(version, about = "stache - logic-less template renderer")]
#[command(long_about = r#"
stache renders mustache-style templates against JSON or YAML view data.

COMMANDS:
  render  → Render a template with view data and partials
  check   → Verify template structure, pragmas and partial references

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  4 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a template
    Render(render::RenderArgs),

    /// Check a template without rendering it
    Check(check::CheckArgs),
}

/// Inputs shared by every subcommand.
#[derive(Args)]
pub struct TemplateInput {
    /// Template file, or `-` for stdin
    pub template: PathBuf,

    /// Directory of partial templates
    #[arg(short, long, env = "STACHE_PARTIALS")]
    pub partials: Option<PathBuf>,

    /// Render options file (TOML)
    #[arg(short, long, env = "STACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

impl TemplateInput {
    pub fn read_template(&self) -> Result<String> {
        if self.template == Path::new("-") {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read template from stdin")?;
            return Ok(source);
        }
        fs::read_to_string(&self.template)
            .with_context(|| format!("Failed to read template {:?}", self.template))
    }

    pub fn load_partials(&self) -> Result<Partials> {
        match &self.partials {
            Some(dir) => PartialsLoader::new(dir)
                .load_all()
                .with_context(|| format!("Failed to load partials from {:?}", dir)),
            None => Ok(Partials::new()),
        }
    }

    pub fn load_options(&self) -> Result<RenderOptions> {
        match &self.config {
            Some(path) => RenderOptions::from_file(path)
                .with_context(|| format!("Failed to load render options from {:?}", path)),
            None => Ok(RenderOptions::default()),
        }
    }
}

/// Parse view data, YAML for `.yaml`/`.yml` files and JSON otherwise.
pub fn load_view(path: &Path) -> Result<Value> {
    debug!("Loading view data from {:?}", path);
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read view data {:?}", path))?;

    let view = if is_yaml(path) {
        Value::from_yaml_str(&source)
    } else {
        Value::from_json_str(&source)
    };
    view.with_context(|| format!("Invalid view data in {:?}", path))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_view_by_extension() {
        let temp = tempdir().unwrap();
        let json = temp.path().join("view.json");
        let yaml = temp.path().join("view.YML");
        fs::write(&json, r#"{"name": "json"}"#).unwrap();
        fs::write(&yaml, "name: yaml\n").unwrap();

        assert_eq!(load_view(&json).unwrap().get("name").unwrap().to_text(), "json");
        assert_eq!(load_view(&yaml).unwrap().get("name").unwrap().to_text(), "yaml");
    }

    #[test]
    fn test_load_view_reports_bad_data() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("view.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_view(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid view data"));
    }

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "stache", "render", "page.mustache", "--data", "view.json", "--strict",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.input.template, PathBuf::from("page.mustache"));
                assert!(args.strict);
            }
            Commands::Check(_) => panic!("expected render"),
        }
    }
}
