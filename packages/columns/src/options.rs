//! Option lists for constrained-choice columns.
//!
//! Lists are deterministic: fixed defaults first, then distinct non-blank
//! values already present in the dataset, each once, in first-seen order.

use std::collections::BTreeSet;

use risk_map_dataset::Dataset;
use risk_map_risk_models::{FEEDER_OPTIONS, level_options};

use crate::ColumnRole;

/// Merges `defaults` with `existing`, dropping blanks and duplicates.
#[must_use]
pub fn merge_options<D, E>(defaults: D, existing: E) -> Vec<String>
where
    D: IntoIterator,
    D::Item: Into<String>,
    E: IntoIterator<Item = String>,
{
    let mut seen = BTreeSet::new();
    defaults
        .into_iter()
        .map(Into::into)
        .chain(existing)
        .filter(|o| !o.trim().is_empty())
        .filter(|o| seen.insert(o.clone()))
        .collect()
}

/// Option list for `column` given its role, or `None` for free-entry
/// roles.
#[must_use]
pub fn options_for(role: ColumnRole, column: &str, dataset: &Dataset) -> Option<Vec<String>> {
    let existing = dataset.distinct_values(column);
    match role {
        ColumnRole::Level => Some(merge_options(level_options(), existing)),
        ColumnRole::Feeder => Some(merge_options(FEEDER_OPTIONS.iter().copied(), existing)),
        ColumnRole::Indicator(family) => Some(merge_options(
            family.default_options().iter().copied(),
            existing,
        )),
        ColumnRole::Derived(_)
        | ColumnRole::Documentation
        | ColumnRole::Date
        | ColumnRole::Number
        | ColumnRole::Plain => None,
    }
}
