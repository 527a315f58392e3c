use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Grid configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print one page of a JSON row file
    Page {
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Apply cell edits to one page and print the hard updates
    Edit {
        #[command(flatten)]
        view: ViewArgs,

        /// Edits as row:field=value (value parsed as JSON, else taken as text)
        #[arg(long = "set", required = true)]
        edits: Vec<String>,

        /// Reset all forms after editing
        #[arg(long)]
        reset: bool,
    },
}

/// Data file and page position shared by every command.
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// JSON file holding an array of row objects
    #[arg(short, long)]
    pub rows: PathBuf,

    /// Page to show (1-indexed)
    #[arg(short, long, default_value_t = 1)]
    pub page: u64,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Equality filter as field=value (repeatable)
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Field to sort by
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

/// One parsed `row:field=value` edit.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row: usize,
    pub field: String,
    pub value: Value,
}

pub fn parse_edit(input: &str) -> Result<CellEdit> {
    let (row, rest) = input
        .split_once(':')
        .ok_or_else(|| anyhow!("Edit '{}' must look like row:field=value", input))?;
    let (field, value) = parse_assignment(rest)?;
    let row = row
        .trim()
        .parse::<usize>()
        .map_err(|e| anyhow!("Invalid row index '{}': {}", row, e))?;
    Ok(CellEdit { row, field, value })
}

/// Parses `field=value`; the value is JSON when it parses as JSON, text otherwise.
pub fn parse_assignment(input: &str) -> Result<(String, Value)> {
    let (field, value) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected field=value, got '{}'", input))?;
    let field = field.trim();
    if field.is_empty() {
        bail!("Empty field name in '{}'", input);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;
    use serde_json::json;

    #[test]
    #[timeout(1000)]
    fn test_parse_edit() {
        assert_eq!(
            parse_edit("2:name=alice").unwrap(),
            CellEdit {
                row: 2,
                field: "name".to_string(),
                value: json!("alice"),
            }
        );
        assert_eq!(parse_edit("0:score=42").unwrap().value, json!(42));
        assert_eq!(parse_edit("0:note=a=b").unwrap().value, json!("a=b"));
    }

    #[test]
    #[timeout(1000)]
    fn test_parse_edit_rejects_malformed() {
        assert!(parse_edit("name=alice").is_err());
        assert!(parse_edit("x:name=alice").is_err());
        assert!(parse_edit("1:=alice").is_err());
        assert!(parse_edit("1:name").is_err());
    }

    #[test]
    #[timeout(1000)]
    fn test_cli_parses_edit_command() {
        let cli = Cli::try_parse_from([
            "grid-tool", "edit", "--rows", "rows.json", "--set", "0:name=b", "--reset",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { view, edits, reset } => {
                assert_eq!(view.page, 1);
                assert_eq!(edits, vec!["0:name=b".to_string()]);
                assert!(reset);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
