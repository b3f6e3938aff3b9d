//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a float with fixed precision
pub fn format_float(value: f64) -> String {
    format!("{:.3}", value)
}

/// Format milliseconds
pub fn format_ms(ms: f64) -> String {
    format!("{:.1}ms", ms)
}

/// Format a 0..1 ratio as a percentage
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Format a set of feature names, `-` when empty
pub fn format_names(names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Color an error rate by severity
pub fn color_error_rate(ratio: f64) -> String {
    let formatted = format_ratio(ratio);
    if ratio < 0.01 {
        formatted.green().to_string()
    } else if ratio < 0.05 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(1.0 / 3.0), "33.3%");
        assert_eq!(format_ratio(0.0), "0.0%");
    }

    #[test]
    fn test_format_names() {
        let mut names = BTreeSet::new();
        assert_eq!(format_names(&names), "-");
        names.insert("foo".to_string());
        names.insert("bar".to_string());
        assert_eq!(format_names(&names), "bar, foo");
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(290.0), "290.0ms");
    }
}
