//! Shared utilities for CLI commands

use tabled::{Table, settings::Style};

/// Truncate a string with ellipsis if it exceeds max length
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Format optional tags vector for display
pub fn format_tags(tags: Option<&Vec<String>>) -> String {
    match tags {
        Some(t) if !t.is_empty() => t.join(", "),
        _ => "-".to_string(),
    }
}

/// `-` for absent or blank values
pub fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

/// Average as `4.5 (12)`, or `-` when unrated
pub fn format_rating(average: f64, count: i64) -> String {
    if count == 0 {
        "-".to_string()
    } else {
        format!("{:.1} ({})", average, count)
    }
}

/// Apply consistent table styling
pub fn apply_table_style(table: &mut Table) {
    table.with(Style::rounded());
}
