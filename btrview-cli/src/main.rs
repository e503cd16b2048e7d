// SPDX-License-Identifier: GPL-3.0-only

mod cli;
mod config;
mod logging;
mod render;
mod report;

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use btrview_forest::{InventoryDump, build_views, cross_filesystem_lineage};
use btrview_sys::{SubvolumeLister, discover_filesystems, is_root};
use clap::Parser;

use crate::cli::{Cli, OutputFormat};
use crate::config::{Config, Settings};
use crate::report::Report;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let settings = Settings::merge(&cli, config)?;
    logging::init(&settings.log_level);

    let inventory = match &cli.input {
        Some(path) => load_inventory(path, &cli.labels)?,
        None => enumerate_live(&cli.labels)?,
    };
    tracing::info!(
        filesystems = inventory.filesystems.len(),
        "inventory ready"
    );

    if let Some(path) = &cli.dump {
        let json = serde_json::to_string_pretty(&inventory)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write inventory {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote inventory");
    }

    let views = build_views(&inventory.filesystems, &settings.view);
    let cross = cli
        .cross_fs
        .then(|| cross_filesystem_lineage(&inventory.filesystems, &settings.view));
    if let Some(Err(err)) = &cross {
        tracing::error!("cross-filesystem lineage failed: {err}");
    }

    let output = match settings.format {
        OutputFormat::Text => render::render_text(&views, cli.view, cross.as_ref()),
        OutputFormat::Json => {
            let report = Report::new(&views, cli.view, cross.as_ref());
            let mut json = serde_json::to_string_pretty(&report)?;
            json.push('\n');
            json
        }
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn load_inventory(path: &Path, labels: &[String]) -> Result<InventoryDump> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read inventory {}", path.display()))?;
    let mut inventory: InventoryDump = serde_json::from_str(&raw)
        .with_context(|| format!("invalid inventory {}", path.display()))?;
    inventory.select_labels(labels);
    Ok(inventory)
}

fn enumerate_live(labels: &[String]) -> Result<InventoryDump> {
    if !is_root() {
        tracing::warn!("not running as root, subvolume listing may be incomplete");
    }

    let filesystems = discover_filesystems(labels)?;
    let mut inventory = InventoryDump::default();
    for fs in &filesystems {
        let records = SubvolumeLister::for_filesystem(fs).and_then(|lister| lister.enumerate(fs));
        match records {
            Ok(records) => inventory.filesystems.push(records),
            Err(err) => {
                tracing::error!(filesystem = %fs.title(), "failed to enumerate subvolumes: {err}")
            }
        }
    }
    Ok(inventory)
}
