use std::cmp::Ordering;

use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flip(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Which column the view is sorted by, and in which direction. Reselecting
/// the active key flips the direction; selecting a new key resets to
/// ascending.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub sort_key: Option<String>,
    pub order: SortOrder,
}

impl ViewState {
    pub fn toggle(&mut self, key: &str) {
        match &self.sort_key {
            Some(current) if current == key => self.order = self.order.flip(),
            _ => {
                self.sort_key = Some(key.to_string());
                self.order = SortOrder::Ascending;
            }
        }
    }

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort_key.as_deref().map(|key| (key, self.order))
    }
}

/// Case-insensitive primary, codepoint secondary. Stand-in for locale
/// collation (see DESIGN.md).
fn compare_values(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Derive the displayed subset: keep records where any field value contains
/// `term` case-insensitively (an empty term keeps all), then stable-sort on
/// the chosen key. Records missing the sort key compare as empty strings.
pub fn apply_view(records: &[Record], term: &str, sort: Option<(&str, SortOrder)>) -> Vec<Record> {
    let needle = term.trim().to_lowercase();

    let mut view: Vec<Record> = records
        .iter()
        .filter(|record| {
            needle.is_empty()
                || record
                    .fields
                    .values()
                    .any(|value| value.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    if let Some((key, order)) = sort {
        view.sort_by(|a, b| {
            let ordering = compare_values(a.value(key), b.value(key));
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(id: &str, pairs: &[(&str, &str)]) -> Record {
        let fields: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Record::created(id.to_string(), fields)
    }

    fn names(view: &[Record]) -> Vec<&str> {
        view.iter().map(|r| r.value("name")).collect()
    }

    #[test]
    fn empty_term_keeps_everything_in_sort_order() {
        let records = vec![
            record("1", &[("name", "Bob")]),
            record("2", &[("name", "Amy")]),
        ];
        let view = apply_view(&records, "", Some(("name", SortOrder::Ascending)));
        assert_eq!(names(&view), ["Amy", "Bob"]);
    }

    #[test]
    fn unmatched_term_yields_empty_view() {
        let records = vec![record("1", &[("name", "Bob")])];
        assert!(apply_view(&records, "zzz", None).is_empty());
    }

    #[test]
    fn filter_is_case_insensitive_across_all_fields() {
        let records = vec![
            record("1", &[("name", "Bob"), ("city", "Perth")]),
            record("2", &[("name", "Amy"), ("city", "Sydney")]),
        ];
        let view = apply_view(&records, "PER", None);
        assert_eq!(names(&view), ["Bob"]);
    }

    #[test]
    fn toggling_the_same_key_flips_direction() {
        let records = vec![
            record("1", &[("name", "Bob")]),
            record("2", &[("name", "Amy")]),
        ];
        let mut state = ViewState::default();
        state.toggle("name");
        let view = apply_view(&records, "", state.sort());
        assert_eq!(names(&view), ["Amy", "Bob"]);

        state.toggle("name");
        let view = apply_view(&records, "", state.sort());
        assert_eq!(names(&view), ["Bob", "Amy"]);

        state.toggle("name");
        let view = apply_view(&records, "", state.sort());
        assert_eq!(names(&view), ["Amy", "Bob"]);
    }

    #[test]
    fn new_key_resets_to_ascending() {
        let mut state = ViewState::default();
        state.toggle("name");
        state.toggle("name");
        assert_eq!(state.order, SortOrder::Descending);

        state.toggle("city");
        assert_eq!(state.sort_key.as_deref(), Some("city"));
        assert_eq!(state.order, SortOrder::Ascending);
    }

    #[test]
    fn missing_sort_key_sorts_as_empty_string() {
        let records = vec![
            record("1", &[("name", "Bob"), ("city", "Perth")]),
            record("2", &[("name", "Amy")]),
        ];
        let view = apply_view(&records, "", Some(("city", SortOrder::Ascending)));
        assert_eq!(names(&view), ["Amy", "Bob"]);
    }

    #[test]
    fn sort_is_stable_for_equal_values() {
        let records = vec![
            record("1", &[("name", "Amy"), ("city", "Perth")]),
            record("2", &[("name", "Amy"), ("city", "Sydney")]),
        ];
        let view = apply_view(&records, "", Some(("name", SortOrder::Ascending)));
        let ids: Vec<&str> = view.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }
}
