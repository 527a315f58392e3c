//! Command-line driver for editable data grids.
//!
//! Loads a JSON row file into an in-memory source, mounts a grid over it,
//! then either prints one page or applies cell edits through the
//! soft/hard update cycle.

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use grid_sync_core::binding::{EditDescriptor, InputConfig};
use grid_sync_core::row::BACKUP_SUFFIX;
use grid_sync_core::{Column, GridConfig, Row};
use grid_sync_runtime::{EditableGrid, MemorySource, SortOrder, TableChange};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use cli::{parse_assignment, parse_edit, Cli, Commands, ViewArgs};

/// Upper bound on waiting for the automatic first fetch
const MOUNT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!("Using config: {:?}", config);

    match cli.command {
        Commands::Page { view } => {
            let rows = load_rows(&view.rows)?;
            let fields = columns(&rows);
            let source = Arc::new(MemorySource::new(rows));
            let grid = EditableGrid::new(fields, source, config.clone());
            open(&grid, &view, &config).await?;
            print_page(&grid)?;
            grid.unmount();
        }
        Commands::Edit { view, edits, reset } => {
            let rows = load_rows(&view.rows)?;
            let fields = columns(&rows);
            let source = Arc::new(MemorySource::new(rows));
            let mut grid = EditableGrid::new(fields, source, config.clone());
            let mut updates = grid.subscribe_hard_updates();
            open(&grid, &view, &config).await?;

            let cells = grid.render()?;
            for edit in &edits {
                let edit = parse_edit(edit)?;
                let column = grid
                    .columns()
                    .iter()
                    .position(|c| c.key == edit.field)
                    .with_context(|| format!("Unknown column '{}'", edit.field))?;
                let cell = cells
                    .get(edit.row)
                    .and_then(|row| row.get(column))
                    .with_context(|| format!("Row {} is not on this page", edit.row))?;
                grid.change(cell, edit.value)?;
                grid.blur(cell)?;
            }

            while let Ok(update) = updates.try_recv() {
                println!("{}", serde_json::to_string(&update)?);
            }
            print_page(&grid)?;

            if reset {
                let restored = grid.handle().reset_forms()?;
                println!("Restored {} fields", restored);
                print_page(&grid)?;
            }
            grid.unmount();
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GridConfig> {
    let mut config = match path {
        Some(path) => GridConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GridConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<Row> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))?;
    tracing::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// One column per field of the first row; everything but `id` is editable.
fn columns(rows: &[Row]) -> Vec<Column> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    first
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !key.ends_with(BACKUP_SUFFIX))
        .map(|key| {
            let column = Column::new(key.as_str(), key.as_str());
            if key == "id" {
                column
            } else {
                column.editable(EditDescriptor::input(InputConfig::new()))
            }
        })
        .collect()
}

/// Mounts the grid, waits for the first fetch, then moves to the requested
/// page, filters and sort.
async fn open(grid: &EditableGrid, view: &ViewArgs, config: &GridConfig) -> Result<()> {
    let mut applied = grid.controller().subscribe();
    grid.mount();
    tokio::time::timeout(MOUNT_TIMEOUT, applied.changed())
        .await
        .context("Timed out waiting for the initial fetch")?
        .context("Query controller dropped")?;

    let page_size = view.page_size.unwrap_or(config.default_page_size);
    let mut change = TableChange::page(view.page, page_size);
    for filter in &view.filters {
        let (field, value) = parse_assignment(filter)?;
        change.filters.entry(field).or_default().push(value);
    }
    if let Some(field) = &view.sort {
        let order = if view.desc {
            SortOrder::Descend
        } else {
            SortOrder::Ascend
        };
        change = change.sort(field.clone(), order);
    }

    let outcome = grid.table_change(change).await?;
    tracing::debug!("Page loaded: {:?}", outcome);
    Ok(())
}

fn print_page(grid: &EditableGrid) -> Result<()> {
    let handle = grid.handle();
    for row in handle.data() {
        let visible: Map<String, Value> = row
            .iter()
            .filter(|(key, _)| !key.ends_with(BACKUP_SUFFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        println!("{}", serde_json::to_string(&visible)?);
    }

    if let Some(state) = handle.pagination().as_ref().and_then(|p| p.state()) {
        match (state.total, state.total_pages()) {
            (Some(total), Some(pages)) => {
                println!("-- page {}/{} ({} rows)", state.current, pages, total)
            }
            _ => println!("-- page {}", state.current),
        }
    }
    Ok(())
}
