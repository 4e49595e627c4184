//! Check command - Verify a template without rendering it.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stache_templates::Engine;

use super::TemplateInput;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: TemplateInput,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    info!("Checking template {:?}", args.input.template);

    let options = args.input.load_options()?;
    let engine = Engine::new(options);
    let template = args.input.read_template()?;
    let partials = args.input.load_partials()?;

    engine
        .check(&template, &partials)
        .with_context(|| format!("Template check failed for {:?}", args.input.template))?;

    println!("✅ {} is valid", args.input.template.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stache_templates::TemplateError;
    use tempfile::tempdir;

    fn check(source: &str) -> Result<()> {
        let temp = tempdir().unwrap();
        let template = temp.path().join("page.mustache");
        fs::write(&template, source).unwrap();
        execute(CheckArgs {
            input: TemplateInput {
                template,
                partials: None,
                config: None,
            },
        })
    }

    #[test]
    fn test_check_valid_template() {
        assert!(check("{{#items}}{{.}}{{/items}}").is_ok());
    }

    #[test]
    fn test_check_reports_template_error() {
        let err = check("{{#items}}{{.}}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TemplateError>(),
            Some(TemplateError::UnbalancedSection { .. })
        ));
    }
}
