// Group-priority median imputation.
//
// Medians are always taken over the values observed before imputation
// started, so a value filled by one tier never feeds a later tier.
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::report::ImputationCounts;
use crate::types::{GroupField, NumericField, Record};
use crate::util::median;

/// Median of the observed values of each non-null group.
fn group_medians(
    records: &[Record],
    observed: &[Option<f64>],
    group: GroupField,
) -> HashMap<String, f64> {
    let mut buckets: HashMap<&str, Vec<f64>> = HashMap::new();
    for (r, v) in records.iter().zip(observed) {
        if let (Some(key), Some(v)) = (r.group(group), v) {
            buckets.entry(key).or_default().push(*v);
        }
    }
    buckets
        .into_iter()
        .filter_map(|(k, vals)| median(vals).map(|m| (k.to_string(), m)))
        .collect()
}

fn fill(record: &mut Record, column: NumericField, value: f64) {
    *record.value_mut(column) = Some(value);
    record.imputed.push(column);
}

/// Fill the nulls of `column` from the narrowest group median available,
/// then from the global median.
pub fn impute_groupwise_median(
    records: &mut [Record],
    column: NumericField,
    groups: &[GroupField],
) -> ImputationCounts {
    let mut counts = ImputationCounts::new(column, groups);
    let observed: Vec<Option<f64>> = records.iter().map(|r| r.value(column)).collect();

    let mut missing: Vec<usize> = observed
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_none())
        .map(|(i, _)| i)
        .collect();
    if missing.is_empty() {
        return counts;
    }

    for (tier, group) in groups.iter().enumerate() {
        if missing.is_empty() {
            break;
        }
        let medians = group_medians(records, &observed, *group);
        let mut unresolved = Vec::with_capacity(missing.len());
        for idx in missing {
            let m = records[idx].group(*group).and_then(|g| medians.get(g)).copied();
            match m {
                Some(m) => {
                    fill(&mut records[idx], column, m);
                    counts.by_group[tier].count += 1;
                }
                None => unresolved.push(idx),
            }
        }
        debug!(
            column = column.column(),
            group = group.column(),
            filled = counts.by_group[tier].count,
            "group median tier applied"
        );
        missing = unresolved;
    }

    if missing.is_empty() {
        return counts;
    }
    match median(observed.iter().flatten().copied().collect()) {
        Some(global) => {
            for &idx in &missing {
                fill(&mut records[idx], column, global);
            }
            counts.by_global = missing.len();
        }
        None => {
            warn!(
                column = column.column(),
                rows = missing.len(),
                "no observed values anywhere; leaving nulls in place"
            );
            counts.unresolved = missing.len();
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(iso: &str, subregion: Option<&str>, continent: Option<&str>, life: Option<f64>) -> Record {
        Record {
            iso_a2: iso.to_string(),
            name_long: iso.to_string(),
            continent: continent.map(str::to_string),
            region_un: None,
            subregion: subregion.map(str::to_string),
            kind: None,
            area_km2: Some(1.0),
            pop: Some(1.0),
            life_exp: life,
            gdp_percap: Some(1.0),
            imputed: Vec::new(),
        }
    }

    const GROUPS: [GroupField; 2] = [GroupField::Subregion, GroupField::Continent];

    #[test]
    fn prefers_subregion_then_continent_then_global() {
        let mut records = vec![
            rec("A", Some("North"), Some("Europe"), Some(80.0)),
            rec("B", Some("North"), Some("Europe"), Some(82.0)),
            rec("C", Some("North"), Some("Europe"), None),
            rec("D", Some("South"), Some("Europe"), Some(70.0)),
            rec("E", Some("West"), Some("Europe"), None),
            rec("F", None, Some("Asia"), Some(60.0)),
            rec("G", Some("East"), Some("Oceania"), None),
        ];
        let counts = impute_groupwise_median(&mut records, NumericField::LifeExp, &GROUPS);

        // North median of 80 and 82.
        assert_eq!(records[2].life_exp, Some(81.0));
        // West has no observations, Europe median of 80, 82, 70.
        assert_eq!(records[4].life_exp, Some(80.0));
        // Neither East nor Oceania observed: global median of 80, 82, 70, 60.
        assert_eq!(records[6].life_exp, Some(75.0));

        assert_eq!(counts.by(GroupField::Subregion), 1);
        assert_eq!(counts.by(GroupField::Continent), 1);
        assert_eq!(counts.by_global, 1);
        assert_eq!(counts.unresolved, 0);
        assert!(records[2].is_imputed(NumericField::LifeExp));
        assert!(!records[0].is_imputed(NumericField::LifeExp));
    }

    #[test]
    fn filled_values_do_not_feed_later_tiers() {
        let mut records = vec![
            rec("A", Some("North"), Some("Europe"), Some(10.0)),
            rec("B", Some("North"), Some("Europe"), Some(20.0)),
            rec("C", Some("North"), Some("Europe"), None),
            rec("D", Some("South"), Some("Europe"), Some(40.0)),
            rec("E", None, Some("Europe"), None),
        ];
        impute_groupwise_median(&mut records, NumericField::LifeExp, &GROUPS);
        assert_eq!(records[2].life_exp, Some(15.0));
        // Europe observed values are 10, 20, 40; the 15 filled into C is ignored.
        assert_eq!(records[4].life_exp, Some(20.0));
    }

    #[test]
    fn entirely_null_column_stays_null_and_is_counted() {
        let mut records = vec![
            rec("A", Some("North"), Some("Europe"), None),
            rec("B", None, None, None),
        ];
        let counts = impute_groupwise_median(&mut records, NumericField::LifeExp, &GROUPS);
        assert!(records.iter().all(|r| r.life_exp.is_none()));
        assert_eq!(counts.unresolved, 2);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn complete_column_is_untouched() {
        let mut records = vec![rec("A", Some("North"), Some("Europe"), Some(70.0))];
        let before = records.clone();
        let counts = impute_groupwise_median(&mut records, NumericField::LifeExp, &GROUPS);
        assert_eq!(records, before);
        assert_eq!(counts.total(), 0);
    }
}
