//! Reaction aggregation.
//!
//! This module turns one batch of openFDA reports into a ranked list of
//! reaction terms and their counts. Aggregation is per batch: counts are
//! never merged across pages.

use crate::models::{Reaction, ReactionCount, ReactionRecord};
use std::collections::HashMap;

/// Aggregate the reactions of a batch of reports into ranked counts.
///
/// Terms are matched exactly (case-sensitive). The result is sorted by
/// count, highest first; equal counts keep the order in which their terms
/// were first seen in the batch.
pub fn aggregate(batch: &[ReactionRecord]) -> Vec<ReactionCount> {
    let mut counts: Vec<ReactionCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for reaction in batch.iter().flat_map(|record| record.reactions()) {
        let weight = reaction_weight(reaction);

        match index.get(reaction.term.as_str()) {
            Some(&slot) => {
                let entry = &mut counts[slot];
                entry.count = entry.count.saturating_add(weight);
            }
            None => {
                index.insert(reaction.term.as_str(), counts.len());
                counts.push(ReactionCount::new(reaction.term.clone(), weight));
            }
        }
    }

    // sort_by_key is stable, which gives the first-seen tie-break
    counts.sort_by_key(|c| std::cmp::Reverse(c.count));
    counts
}

/// Amount a single reaction adds to its term's count.
///
/// An integer outcome code, negative ones included, is added as-is. A
/// missing, empty or non-integer code counts as one occurrence.
pub fn reaction_weight(reaction: &Reaction) -> i64 {
    reaction
        .outcome
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .and_then(|code| code.parse::<i64>().ok())
        .unwrap_or(1)
}

/// Sum of all counts in an aggregated page, saturating at the `i64` bounds.
pub fn total_count(reactions: &[ReactionCount]) -> i64 {
    reactions
        .iter()
        .fold(0i64, |total, r| total.saturating_add(r.count))
}
