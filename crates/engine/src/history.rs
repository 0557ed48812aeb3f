use std::cmp::Ordering;
use std::collections::HashMap;

use daybook_core::{Document, LineageId};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Newest day first, undated entries last, then highest id first.
fn history_order(a: &Document, b: &Document) -> Ordering {
    let by_date = match (a.target_date, b.target_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| b.id.cmp(&a.id))
}

/// Arrange the documents of one lineage as a history stack, capped at `limit`.
pub fn order_history(mut docs: Vec<Document>, limit: usize) -> Vec<Document> {
    docs.sort_by(history_order);
    docs.truncate(limit);
    docs
}

/// Reduce a listing to one representative per lineage plus every ungrouped
/// document, most recently updated first.
///
/// The representative is the entry with the latest target date. On equal
/// dates the one met first in `docs` wins.
pub fn collapse_lineages(docs: Vec<Document>) -> Vec<Document> {
    let mut representatives: Vec<Document> = Vec::new();
    let mut slot_of: HashMap<LineageId, usize> = HashMap::new();
    let mut ungrouped = Vec::new();

    for doc in docs {
        let Some(lineage_id) = doc.lineage_id.clone() else {
            ungrouped.push(doc);
            continue;
        };
        match slot_of.get(&lineage_id) {
            Some(&slot) => {
                if doc.target_date > representatives[slot].target_date {
                    representatives[slot] = doc;
                }
            }
            None => {
                slot_of.insert(lineage_id, representatives.len());
                representatives.push(doc);
            }
        }
    }

    representatives.extend(ungrouped);
    representatives.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    representatives
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use daybook_core::DocumentId;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap()
    }

    fn doc(id: i64, lineage: Option<&LineageId>, date: Option<(i32, u32, u32)>) -> Document {
        Document {
            id: DocumentId::from_raw(id),
            lineage_id: lineage.cloned(),
            title: "Journal".into(),
            content: String::new(),
            color: "#d8b4fe".into(),
            target_date: date.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            created_at: base_time(),
            updated_at: base_time() + Duration::seconds(id),
        }
    }

    fn ids(docs: &[Document]) -> Vec<i64> {
        docs.iter().map(|d| d.id.as_raw()).collect()
    }

    #[test]
    fn history_sorted_by_date_then_id() {
        let l = LineageId::mint();
        let docs = vec![
            doc(1, Some(&l), Some((2024, 1, 1))),
            doc(2, Some(&l), None),
            doc(3, Some(&l), Some((2024, 1, 3))),
            doc(4, Some(&l), Some((2024, 1, 1))),
            doc(5, Some(&l), Some((2024, 1, 2))),
        ];
        assert_eq!(ids(&order_history(docs, 50)), vec![3, 5, 4, 1, 2]);
    }

    #[test]
    fn history_is_capped() {
        let l = LineageId::mint();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let docs: Vec<Document> = (0..80)
            .map(|i| {
                let mut d = doc(i + 1, Some(&l), None);
                d.target_date = Some(start + Duration::days(i));
                d
            })
            .collect();
        let history = order_history(docs, DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history[0].id.as_raw(), 80);
        assert_eq!(history[49].id.as_raw(), 31);
    }

    #[test]
    fn collapse_keeps_latest_entry_per_lineage() {
        let l = LineageId::mint();
        let docs = vec![
            doc(1, Some(&l), Some((2024, 1, 1))),
            doc(2, Some(&l), Some((2024, 1, 3))),
            doc(3, None, Some((2024, 1, 2))),
        ];
        let listing = collapse_lineages(docs);
        assert_eq!(ids(&listing), vec![3, 2]);
    }

    #[test]
    fn collapse_prefers_date_over_update_time() {
        let l = LineageId::mint();
        let mut old_entry = doc(1, Some(&l), Some((2024, 1, 1)));
        // Editing an old entry bumps its updated_at above the newer day.
        old_entry.updated_at = base_time() + Duration::hours(5);
        let newer_day = doc(2, Some(&l), Some((2024, 1, 3)));

        let listing = collapse_lineages(vec![old_entry, newer_day]);
        assert_eq!(ids(&listing), vec![2]);
    }

    #[test]
    fn collapse_ties_keep_first_seen() {
        let l = LineageId::mint();
        let docs = vec![
            doc(7, Some(&l), Some((2024, 1, 3))),
            doc(8, Some(&l), Some((2024, 1, 3))),
        ];
        assert_eq!(ids(&collapse_lineages(docs)), vec![7]);
    }

    #[test]
    fn undated_entry_never_beats_dated_one() {
        let l = LineageId::mint();
        let docs = vec![doc(1, Some(&l), None), doc(2, Some(&l), Some((2020, 1, 1)))];
        assert_eq!(ids(&collapse_lineages(docs)), vec![2]);
    }

    #[test]
    fn collapse_orders_by_recency() {
        let a = LineageId::mint();
        let b = LineageId::mint();
        let docs = vec![
            doc(1, Some(&a), Some((2024, 1, 1))),
            doc(2, None, None),
            doc(3, Some(&b), Some((2024, 1, 1))),
            doc(4, None, None),
        ];
        assert_eq!(ids(&collapse_lineages(docs)), vec![4, 3, 2, 1]);
    }
}
