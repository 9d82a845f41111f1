use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{NumericField, Record};

/// Ranking used to pick one record per identifier: more observed values win,
/// then the earlier input position.
fn compare_candidates(
    a: &(usize, Record),
    b: &(usize, Record),
    fields: &[NumericField],
) -> Ordering {
    a.1.observed_count(fields)
        .cmp(&b.1.observed_count(fields))
        .then_with(|| b.0.cmp(&a.0))
}

/// Keep one record per `iso_a2`. Groups come out in first-seen order.
///
/// Returns the surviving records and how many were discarded.
pub fn deduplicate_by_iso(records: Vec<Record>, fields: &[NumericField]) -> (Vec<Record>, usize) {
    let before = records.len();
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<(usize, Record)>> = HashMap::new();
    for (idx, r) in records.into_iter().enumerate() {
        let group = groups.entry(r.iso_a2.clone()).or_insert_with(|| {
            order.push(r.iso_a2.clone());
            Vec::new()
        });
        group.push((idx, r));
    }

    let kept: Vec<Record> = order
        .iter()
        .filter_map(|key| groups.remove(key))
        .filter_map(|group| {
            group
                .into_iter()
                .max_by(|a, b| compare_candidates(a, b, fields))
                .map(|(_, r)| r)
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}
