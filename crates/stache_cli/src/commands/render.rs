//! Render command - Render a template to stdout or a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stache_templates::{Engine, Value};

use super::{load_view, TemplateInput};

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: TemplateInput,

    /// View data file (JSON, or YAML by extension)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reject unbalanced section tags
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: RenderArgs) -> Result<()> {
    info!("Rendering template {:?}", args.input.template);

    let mut options = args.input.load_options()?;
    if args.strict {
        options.strict_sections = true;
    }
    let engine = Engine::new(options);

    let template = args.input.read_template()?;
    let partials = args.input.load_partials()?;
    let view = match &args.data {
        Some(path) => load_view(path)?,
        None => Value::map(),
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    // Lines stream out as they complete; the first write error is kept and
    // reported once rendering stops.
    let mut write_error = None;
    let mut first = true;
    engine
        .render_lines(&template, &view, &partials, |line| {
            if write_error.is_some() {
                return;
            }
            let result = if first {
                out.write_all(line.as_bytes())
            } else {
                out.write_all(b"\n").and_then(|_| out.write_all(line.as_bytes()))
            };
            first = false;
            if let Err(e) = result {
                write_error = Some(e);
            }
        })
        .context("Template rendering failed")?;

    if let Some(e) = write_error {
        return Err(e).context("Failed to write output");
    }
    out.flush().context("Failed to write output")?;

    if let Some(path) = &args.output {
        info!("Wrote {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_render_to_file() {
        let temp = tempdir().unwrap();
        let template = temp.path().join("page.mustache");
        let data = temp.path().join("view.yaml");
        let partials = temp.path().join("partials");
        let output = temp.path().join("out.html");

        fs::create_dir_all(&partials).unwrap();
        fs::write(&template, "<ul>\n{{#books}}\n{{>item}}\n{{/books}}\n</ul>").unwrap();
        fs::write(&data, "books:\n  - title: Ruth\n  - title: Esther\n").unwrap();
        fs::write(partials.join("item.mustache"), "<li>{{title}}</li>").unwrap();

        execute(RenderArgs {
            input: TemplateInput {
                template,
                partials: Some(partials),
                config: None,
            },
            data: Some(data),
            output: Some(output.clone()),
            strict: false,
        })
        .unwrap();

        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "<ul>\n<li>Ruth</li>\n<li>Esther</li>\n</ul>"
        );
    }
}
