//! tasksync config commands.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

use super::Context;

#[derive(serde::Serialize)]
struct ShowReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<PathBuf>,
    config: &'a Config,
}

#[derive(serde::Serialize)]
struct InitReport {
    path: PathBuf,
    created: bool,
}

pub fn run_show(ctx: &Context) -> Result<()> {
    let source = config_source(&ctx.dir);
    let rendered = toml::to_string_pretty(&ctx.config)?;

    let mut human = HumanOutput::new("tasksync config");
    human.push_summary(
        "source",
        source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "defaults".to_string()),
    );
    for line in rendered.lines().filter(|line| !line.trim().is_empty()) {
        human.push_detail(line);
    }

    let report = ShowReport {
        source,
        config: &ctx.config,
    };
    emit_success(ctx.output(), "config show", &report, Some(&human))
}

pub fn run_init(dir: &Path, force: bool, output: OutputOptions) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(Error::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Config::default().save(&path)?;
    tracing::info!(path = %path.display(), "wrote default config");

    let mut human = HumanOutput::new(format!("tasksync config init: wrote {CONFIG_FILE}"));
    human.push_summary("path", path.display().to_string());
    human.push_next_step("tasksync list");

    let report = InitReport {
        path,
        created: true,
    };
    emit_success(output, "config init", &report, Some(&human))
}

/// The file [`Config::load_from_dir`] would read, if any.
fn config_source(dir: &Path) -> Option<PathBuf> {
    let local = dir.join(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    Config::global_path().filter(|path| path.exists())
}
