use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use log::info;
use serde_json::Value;

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the result to this file instead of stdout
    #[arg(short = 'o', long)]
    pub out_file: Option<PathBuf>,
}

/// Strings are written as they are, anything else as pretty JSON.
pub fn render(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string_pretty(other).context("Failed to serialize result"),
    }
}

pub fn write_result(value: &Value, out: &OutputArgs) -> Result<()> {
    let content = render(value)?;
    match &out.out_file {
        Some(path) => write_file(path, &content),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, format!("{}\n", content))
        .with_context(|| format!("Failed to write result to {}", path.display()))?;
    info!("Result written to {}", path.display());
    eprintln!("{} {}", "✓ Result written to".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        assert_eq!(render(&json!("token")).unwrap(), "token");
        assert_eq!(render(&json!({"a": 1})).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputArgs {
            out_file: Some(dir.path().join("result.json")),
        };
        write_result(&json!({"status": "completed"}), &out).unwrap();

        let written = fs::read_to_string(dir.path().join("result.json")).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&written).unwrap()["status"], "completed");
    }
}
