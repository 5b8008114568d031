//! Rendering of search pages.
//!
//! A page is rendered from the search session: the reaction list, the
//! report total, the pager, and the dataset's last-updated date. While the
//! session carries an error only the error banner is shown.

use crate::analysis::total_count;
use crate::models::ReactionCount;
use crate::pagination::SearchSession;
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

/// Serializable view of the page a session is on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView<'a> {
    pub drug_name: &'a str,
    pub page: u32,
    pub overall_pages: u64,
    pub total_results: u64,
    pub reactions: &'a [ReactionCount],
    pub has_previous_page: bool,
    pub has_next_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> PageView<'a> {
    pub fn from_session(session: &'a SearchSession) -> Self {
        Self {
            drug_name: &session.query,
            page: session.current_page,
            overall_pages: session.overall_pages(),
            total_results: session.total_results,
            reactions: session
                .current_entry()
                .map(|entry| entry.reactions.as_slice())
                .unwrap_or_default(),
            has_previous_page: session.has_previous_page(),
            has_next_page: session.has_next_page(),
            last_updated: session.meta.as_ref().map(|m| m.last_updated.as_str()),
            error: session.last_error.as_deref(),
        }
    }
}

/// Generate the plain-text view of the current page.
pub fn generate_text_page(session: &SearchSession) -> String {
    if let Some(ref error) = session.last_error {
        return generate_error_banner(error);
    }

    let view = PageView::from_session(session);
    if view.reactions.is_empty() {
        return format!("No reactions found for '{}'.\n", view.drug_name);
    }

    let mut output = String::new();

    output.push_str(&format!(
        "Adverse reactions reported for {}\n",
        view.drug_name
    ));
    output.push_str(&format!("Total reports found: {}\n", view.total_results));
    if let Some(updated) = view.last_updated {
        output.push_str(&format!("Last updated: {}\n", format_last_updated(updated)));
    }
    output.push('\n');

    let width = view
        .reactions
        .iter()
        .map(|r| r.term.chars().count())
        .max()
        .unwrap_or(0);

    for (i, reaction) in view.reactions.iter().enumerate() {
        output.push_str(&format!(
            "{:>3}. {:<width$}  {:>8}\n",
            i + 1,
            reaction.term,
            reaction.count,
            width = width
        ));
    }

    output.push('\n');
    output.push_str(&generate_pager(&view));
    output.push('\n');

    output
}

/// Generate the Markdown view of the current page.
pub fn generate_markdown_page(session: &SearchSession) -> String {
    if let Some(ref error) = session.last_error {
        return format!("> **Error:** {}\n", error);
    }

    let view = PageView::from_session(session);
    let mut output = String::new();

    output.push_str(&format!("# Adverse Reactions: {}\n\n", view.drug_name));
    output.push_str(&format!("- **Total Reports:** {}\n", view.total_results));
    if let Some(updated) = view.last_updated {
        output.push_str(&format!(
            "- **Last Updated:** {}\n",
            format_last_updated(updated)
        ));
    }
    output.push_str(&format!(
        "- **Page:** {} / {}\n\n",
        view.page, view.overall_pages
    ));

    if view.reactions.is_empty() {
        output.push_str("No reactions found.\n");
        return output;
    }

    output.push_str("| # | Reaction | Count |\n");
    output.push_str("|---:|:---|---:|\n");
    for (i, reaction) in view.reactions.iter().enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            reaction.term,
            reaction.count
        ));
    }
    output.push_str(&format!(
        "| | **Total on page** | **{}** |\n",
        total_count(view.reactions)
    ));

    if let Some(disclaimer) = session.meta.as_ref().map(|m| m.disclaimer.as_str()) {
        if !disclaimer.is_empty() {
            output.push_str(&format!("\n*{}*\n", disclaimer));
        }
    }

    output
}

/// Generate a JSON view of the current page.
pub fn generate_json_page(session: &SearchSession) -> Result<String> {
    serde_json::to_string_pretty(&PageView::from_session(session)).map_err(Into::into)
}

/// Generate the error banner.
pub fn generate_error_banner(message: &str) -> String {
    let line = "!".repeat(message.chars().count().clamp(20, 72) + 4);
    format!("{line}\n  Error: {message}\n  (press 'd' to dismiss)\n{line}\n")
}

/// Generate the pager line, e.g. `[< Previous]  Page 2 / 5  [Next >]`.
fn generate_pager(view: &PageView<'_>) -> String {
    let previous = if view.has_previous_page {
        "[< Previous]"
    } else {
        "[ -------- ]"
    };
    let next = if view.has_next_page {
        "[Next >]"
    } else {
        "[ ---- ]"
    };

    format!(
        "{}  Page {} / {}  {}",
        previous, view.page, view.overall_pages, next
    )
}

/// Render openFDA's `last_updated` (`YYYY-MM-DD` or `YYYYMMDD`) as a long
/// date; anything else is shown as-is.
pub fn format_last_updated(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map(|date| date.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
