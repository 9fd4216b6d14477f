//! Research sub-workflow: canned queries, tolerant search, one combined message.
//!
//! Used for the initial topic research and, scoped to a section, inside each
//! section's sub-workflow. A failed query only loses its own contribution;
//! research never fails the run.

use crate::adapter::SearchAdapter;
use crate::message::Message;
use tracing::{info, warn};

/// The canned query variants for one research step.
#[derive(Debug, Clone, Copy)]
pub enum QuerySet<'a> {
    /// Research on the report topic as a whole.
    Topic { topic: &'a str },
    /// Research on one section of the report.
    Section { section: &'a str, topic: &'a str },
}

impl QuerySet<'_> {
    /// All query variants, in the order they are searched.
    pub fn queries(&self) -> Vec<String> {
        match self {
            QuerySet::Topic { topic } => vec![
                format!("{} overview", topic),
                format!("latest developments in {}", topic),
                format!("technical details of {}", topic),
                format!("real-world applications of {}", topic),
                format!("future trends in {}", topic),
            ],
            QuerySet::Section { section, topic } => {
                let subject = format!("{} {}", section, topic);
                vec![
                    subject.clone(),
                    format!("latest developments in {}", subject),
                    format!("technical details of {}", subject),
                    format!("real-world examples of {}", subject),
                    format!("best practices for {}", subject),
                ]
            }
        }
    }

    /// First line of the research message.
    pub fn heading(&self) -> String {
        match self {
            QuerySet::Topic { topic } => format!("Research on {}", topic),
            QuerySet::Section { section, .. } => format!("Research for {}", section),
        }
    }
}

/// Runs up to `query_count` queries of `queries` and folds the results into one user message.
///
/// Queries run one after another. Successful results are joined with a blank
/// line. When every query fails the message still goes out, with an empty
/// research body.
pub async fn research(
    search: &dyn SearchAdapter,
    queries: QuerySet<'_>,
    query_count: usize,
) -> Message {
    let mut results = Vec::new();
    let mut failures = 0usize;

    for query in queries.queries().into_iter().take(query_count) {
        match search.search(&query).await {
            Ok(result) => results.push(result),
            Err(e) => {
                failures += 1;
                warn!(query = %query, error = %e, "Search failed; skipping query");
            }
        }
    }

    if results.is_empty() && failures > 0 {
        warn!(
            heading = %queries.heading(),
            failures,
            "All research queries failed; continuing without research context"
        );
    } else {
        info!(
            heading = %queries.heading(),
            succeeded = results.len(),
            failures,
            "Research complete"
        );
    }

    Message::user(format!("{}:\n{}", queries.heading(), results.join("\n\n")))
}
