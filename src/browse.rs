//! Search client flows: one-shot page display and interactive browsing.
//!
//! Both flows drive a `SearchSession` through the pagination manager and
//! render the page the session ends up on.

use crate::cli::OutputFormat;
use crate::pagination::{go_to_page, new_search, PageSource, PaginationError, SearchSession};
use crate::report;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  n            next page
  p            previous page
  <number>     go to page (only pages already visited, or the next one)
  / <drug>     new search
  r            retry the last failed request
  d            dismiss the error
  h            show this help
  q            quit";

/// A command typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Next,
    Previous,
    GoTo(i64),
    NewSearch(String),
    Retry,
    Dismiss,
    Help,
    Quit,
    Unknown(String),
}

/// Parse one line of interactive input.
pub fn parse_action(line: &str) -> Action {
    let line = line.trim();

    if let Some(query) = line.strip_prefix('/') {
        let query = query.trim();
        return if query.is_empty() {
            Action::Unknown(line.to_string())
        } else {
            Action::NewSearch(query.to_string())
        };
    }

    if let Ok(page) = line.parse::<i64>() {
        return Action::GoTo(page);
    }

    match line.to_lowercase().as_str() {
        "n" | "next" => Action::Next,
        "p" | "prev" | "previous" => Action::Previous,
        "r" | "retry" => Action::Retry,
        "d" | "dismiss" => Action::Dismiss,
        "h" | "help" | "?" => Action::Help,
        "q" | "quit" | "exit" => Action::Quit,
        _ => Action::Unknown(line.to_string()),
    }
}

/// Render the session's current page in the requested format.
pub fn render(session: &SearchSession, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report::generate_text_page(session)),
        OutputFormat::Markdown => Ok(report::generate_markdown_page(session)),
        OutputFormat::Json => report::generate_json_page(session),
    }
}

/// Walk forward from page 1 to `target` and return the session.
///
/// The cursor for a page is only known once the page before it has been
/// loaded, so every page up to `target` is fetched in turn. When the
/// results run out first, the session stays on the last available page.
pub async fn show_page<S>(
    query: &str,
    limit: u32,
    target: u32,
    source: &S,
    show_progress: bool,
) -> Result<SearchSession>
where
    S: PageSource + ?Sized,
{
    let mut session = new_search(query, limit);

    for page in 1..=target {
        let spinner = loading_spinner(show_progress, page);
        let result = go_to_page(&mut session, i64::from(page), source).await;
        spinner.finish_and_clear();

        match result {
            Ok(_) => {}
            Err(PaginationError::NoMorePages { page: last }) => {
                warn!(
                    "Only {} page(s) available for '{}', showing page {}",
                    last, query, last
                );
                break;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to load page {}", page));
            }
        }
    }

    Ok(session)
}

/// Interactive browsing loop over stdin.
pub async fn run_interactive<S>(
    query: &str,
    limit: u32,
    source: &S,
    format: OutputFormat,
    show_progress: bool,
) -> Result<()>
where
    S: PageSource + ?Sized,
{
    let mut session = new_search(query, limit);
    let mut last_failed: Option<i64> = None;

    println!("{}\n", HELP);
    navigate(&mut session, 1, source, format, show_progress, &mut last_failed).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let action = parse_action(&line);
        debug!("Action: {:?}", action);

        let target = match action {
            Action::Next => {
                if !session.has_next_page() {
                    println!("No next page.");
                    continue;
                }
                i64::from(session.current_page) + 1
            }
            Action::Previous => {
                if !session.has_previous_page() {
                    println!("Already on the first page.");
                    continue;
                }
                i64::from(session.current_page) - 1
            }
            Action::GoTo(page) => page,
            Action::NewSearch(query) => {
                session = new_search(query, limit);
                last_failed = None;
                1
            }
            Action::Retry => match last_failed {
                Some(page) => page,
                None => {
                    println!("Nothing to retry.");
                    continue;
                }
            },
            Action::Dismiss => {
                session.dismiss_error();
                print!("{}", render(&session, format)?);
                continue;
            }
            Action::Help => {
                println!("{}", HELP);
                continue;
            }
            Action::Quit => break,
            Action::Unknown(input) => {
                println!("Unknown command '{}'. Type 'h' for help.", input);
                continue;
            }
        };

        navigate(&mut session, target, source, format, show_progress, &mut last_failed).await?;
    }

    Ok(())
}

/// Go to `target` and print the outcome. Fetch failures are shown as the
/// error banner and remembered for `retry`; they do not end the loop.
async fn navigate<S>(
    session: &mut SearchSession,
    target: i64,
    source: &S,
    format: OutputFormat,
    show_progress: bool,
    last_failed: &mut Option<i64>,
) -> Result<()>
where
    S: PageSource + ?Sized,
{
    // cache hits return immediately, no spinner needed
    let needs_fetch = u32::try_from(target).is_ok_and(|page| !session.cache.has(page));
    let spinner = loading_spinner(show_progress && needs_fetch, target);
    let result = go_to_page(session, target, source).await;
    spinner.finish_and_clear();

    match result {
        Ok(None) => println!("Page must be at least 1."),
        Ok(Some(_)) => {
            *last_failed = None;
            print!("{}", render(session, format)?);
        }
        Err(PaginationError::Fetch(_)) => {
            *last_failed = Some(target);
            print!("{}", render(session, format)?);
        }
        Err(e) => println!("{}", e),
    }

    Ok(())
}

fn loading_spinner(show_progress: bool, page: impl std::fmt::Display) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Loading page {}...", page));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{ReactionCount, ResponseMeta};
    use crate::pagination::FetchedPage;
    use async_trait::async_trait;

    /// Three pages; cursors are the number of the page they lead to.
    struct ThreePages;

    #[async_trait]
    impl PageSource for ThreePages {
        async fn fetch_page(
            &self,
            _query: &str,
            _limit: u32,
            cursor: Option<&str>,
        ) -> Result<FetchedPage, FetchError> {
            let page: u32 = cursor.map(|c| c.parse().unwrap()).unwrap_or(1);
            Ok(FetchedPage {
                reactions: vec![ReactionCount::new(format!("TERM{}", page), 1)],
                next_cursor: (page < 3).then(|| (page + 1).to_string()),
                meta: ResponseMeta {
                    total: 15,
                    ..ResponseMeta::default()
                },
            })
        }
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("n"), Action::Next);
        assert_eq!(parse_action(" Previous "), Action::Previous);
        assert_eq!(parse_action("3"), Action::GoTo(3));
        assert_eq!(parse_action("-1"), Action::GoTo(-1));
        assert_eq!(parse_action("/ Tylenol"), Action::NewSearch("Tylenol".to_string()));
        assert_eq!(parse_action("/"), Action::Unknown("/".to_string()));
        assert_eq!(parse_action("q"), Action::Quit);
        assert_eq!(parse_action("zz"), Action::Unknown("zz".to_string()));
    }

    #[tokio::test]
    async fn test_show_page_walks_forward() {
        let session = show_page("Tylenol", 5, 2, &ThreePages, false).await.unwrap();

        assert_eq!(session.current_page, 2);
        assert_eq!(session.cache.pages(), vec![1, 2]);
        assert_eq!(session.current_entry().unwrap().reactions[0].term, "TERM2");
    }

    #[tokio::test]
    async fn test_show_page_stops_at_last_page() {
        let session = show_page("Tylenol", 5, 10, &ThreePages, false).await.unwrap();

        assert_eq!(session.current_page, 3);
        assert!(!session.has_next_page());
    }

    #[test]
    fn test_render_formats() {
        let session = SearchSession::new("Tylenol", 5);
        assert!(render(&session, OutputFormat::Text).unwrap().contains("No reactions"));
        assert!(render(&session, OutputFormat::Json).unwrap().contains("\"drugName\""));
    }
}
