//! Terminal rendering of sessions, data sources and messages

use crate::api::{ChatMessage, DataSource, QueryResult, Role, Session};
use crate::config::ChatConfig;
use colored::Colorize;
use prettytable::{format, Table};
use serde_json::Value as JsonValue;

const MAX_TITLE_CHARS: usize = 40;
const MAX_CELL_CHARS: usize = 60;

/// Renders the session list, marking the active session with `*`
pub fn format_session_table(sessions: &[Session], active: Option<&str>) -> String {
    if sessions.is_empty() {
        return format!("{}\n", "No sessions found.".yellow());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "",
        "ID".bold(),
        "Title".bold(),
        "Data Source".bold(),
        "Created".bold()
    ]);

    for session in sessions {
        let marker = if active == Some(session.id.as_str()) {
            "*".green().to_string()
        } else {
            String::new()
        };
        table.add_row(prettytable::row![
            marker,
            session.id.cyan(),
            truncate(&session.title, MAX_TITLE_CHARS),
            session.data_source_id,
            session.created_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    table.to_string()
}

/// Renders the data sources sessions can be created on
pub fn format_data_source_table(data_sources: &[DataSource]) -> String {
    if data_sources.is_empty() {
        return format!("{}\n", "No data sources configured.".yellow());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Type".bold(),
        "Database".bold(),
        "Status".bold()
    ]);

    for ds in data_sources {
        let status = match ds.status {
            Some(1) => "enabled".green(),
            Some(_) => "disabled".red(),
            None => "-".normal(),
        };
        table.add_row(prettytable::row![
            ds.id.to_string().cyan(),
            ds.name,
            ds.db_type,
            format!("{}@{}:{}/{}", ds.username, ds.host, ds.port, ds.db_name),
            status
        ]);
    }

    table.to_string()
}

/// Renders the details of one data source
pub fn format_data_source_details(ds: &DataSource) -> String {
    let status = match ds.status {
        Some(1) => "enabled".green(),
        Some(_) => "disabled".red(),
        None => "unknown".normal(),
    };
    let synced = ds
        .schema_synced_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut out = String::new();
    out.push_str(&format!("{} {}\n", ds.name.bold(), format!("#{}", ds.id).cyan()));
    if let Some(description) = ds.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!("  {}\n", description));
    }
    out.push_str(&format!("  Type:         {}\n", ds.db_type));
    out.push_str(&format!("  Host:         {}:{}\n", ds.host, ds.port));
    out.push_str(&format!("  Database:     {}\n", ds.db_name));
    out.push_str(&format!("  User:         {}\n", ds.username));
    out.push_str(&format!("  Status:       {}\n", status));
    out.push_str(&format!("  Schema sync:  {}\n", synced));
    out
}

/// Renders one message of the log
///
/// Assistant replies show, in order: the content, the generated SQL (when
/// `show_sql` is set), the result table, the analysis, the chart hint,
/// the suggested questions and the error diagnostic.
pub fn format_message(message: &ChatMessage, chat: &ChatConfig) -> String {
    let mut out = String::new();

    match message.role {
        Role::User => {
            out.push_str(&format!("{} {}\n", "you>".blue().bold(), message.content));
            return out;
        }
        Role::Assistant => {
            out.push_str(&format!("{} {}\n", "sqlbot>".green().bold(), message.content));
        }
    }

    if chat.show_sql {
        if let Some(sql) = message.sql_query.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!("\n{}\n{}\n", "SQL:".bold(), sql.trim().cyan()));
        }
    }

    match message.query_result() {
        Ok(Some(result)) => out.push_str(&format_result_table(&result, chat.max_result_rows)),
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable query result");
            out.push_str(&format!("\n{}\n", "(query result could not be decoded)".yellow()));
        }
    }

    if let Some(analysis) = message.analysis.as_deref().filter(|a| !a.trim().is_empty()) {
        out.push_str(&format!("\n{}\n{}\n", "Analysis:".bold(), analysis.trim()));
    }

    if let Some(chart) = message.chart() {
        let axes = match (&chart.x_axis, &chart.y_axis) {
            (Some(x), Some(y)) => format!(" (x: {}, y: {})", x, y),
            (Some(x), None) => format!(" (x: {})", x),
            (None, Some(y)) => format!(" (y: {})", y),
            (None, None) => String::new(),
        };
        out.push_str(&format!("\n{} {}{}\n", "Chart:".bold(), chart.chart_type, axes));
    }

    match message.suggested_questions() {
        Ok(questions) if !questions.is_empty() => {
            out.push_str(&format!("\n{}\n", "You could also ask:".bold()));
            for (i, question) in questions.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, question));
            }
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Unreadable suggested questions"),
    }

    if let Some(error) = message.error_msg.as_deref() {
        out.push_str(&format!("\n{} {}\n", "Error:".red().bold(), error.red()));
    }

    out
}

/// Renders a query result, limited to `max_rows` rows
pub fn format_result_table(result: &QueryResult, max_rows: usize) -> String {
    if !result.success {
        let reason = result
            .error_message
            .as_deref()
            .unwrap_or("query failed without a message");
        return format!("\n{} {}\n", "Query failed:".red().bold(), reason);
    }

    if result.columns.is_empty() || result.rows.is_empty() {
        return format!("\n{}\n", "(no rows)".dimmed());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(result.columns.iter().map(|c| c.as_str().bold()).collect());

    for row in result.rows.iter().take(max_rows) {
        table.add_row(
            result
                .columns
                .iter()
                .map(|column| {
                    let value = row.get(column).unwrap_or(&JsonValue::Null);
                    truncate(&format_value(value), MAX_CELL_CHARS)
                })
                .collect(),
        );
    }

    let total = result.row_count.max(result.rows.len());
    let mut out = format!("\n{}", table);
    if total > max_rows {
        out.push_str(&format!(
            "{}\n",
            format!("showing {} of {} rows", max_rows.min(result.rows.len()), total).dimmed()
        ));
    }
    out
}

/// Formats a single result cell
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
