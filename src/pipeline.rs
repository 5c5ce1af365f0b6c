//! Derives the displayed rows from the dataset.
//!
//! Rows are indices into the [`Dataset`]. A search always filters the full
//! dataset and keeps the loaded order, the active sort is then applied to
//! whatever the search produced.

use std::cmp::Ordering;
use tracing::{debug, trace};

use crate::domain::BVError;
use crate::record::{Dataset, Field, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn indicator(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: Option<Field>,
    pub direction: SortDirection,
}

impl SortConfig {
    /// Selecting the active key while ascending flips to descending,
    /// every other selection starts ascending.
    pub fn toggle(self, key: Field) -> Self {
        let direction = if self.key == Some(key) && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        SortConfig {
            key: Some(key),
            direction,
        }
    }

    pub fn indicator(&self, field: Field) -> Option<&'static str> {
        match self.key {
            Some(key) if key == field => Some(self.direction.indicator()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    SetQuery(String),
    Search,
    Clear,
    SortBy(Field),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub query: String,
    pub filtered: bool,
    pub empty_query_alert: bool,
    pub sort: SortConfig,
    pub rows: Vec<usize>,
}

impl ViewState {
    pub fn new(dataset: &Dataset) -> Self {
        ViewState {
            rows: (0..dataset.len()).collect(),
            ..Default::default()
        }
    }

    /// Applies one user action and returns the next state.
    pub fn reduce(self, dataset: &Dataset, action: ViewAction) -> Self {
        trace!("Reduce {action:?}");
        match action {
            ViewAction::SetQuery(query) => ViewState { query, ..self },
            ViewAction::Search => match filter(dataset, &self.query) {
                Ok(matches) => {
                    let rows = sort(dataset, matches, self.sort);
                    ViewState {
                        filtered: true,
                        empty_query_alert: false,
                        rows,
                        ..self
                    }
                }
                Err(_) => ViewState {
                    empty_query_alert: true,
                    ..self
                },
            },
            // The sort key is kept, the rows return to the loaded order.
            ViewAction::Clear => ViewState {
                query: String::new(),
                filtered: false,
                rows: (0..dataset.len()).collect(),
                ..self
            },
            ViewAction::SortBy(field) if !field.is_sortable() => {
                debug!("Ignoring sort on {}", field.name());
                self
            }
            ViewAction::SortBy(field) => {
                let sort_config = self.sort.toggle(field);
                let rows = sort(dataset, self.rows, sort_config);
                ViewState {
                    sort: sort_config,
                    rows,
                    ..self
                }
            }
        }
    }
}

/// Indices of all records containing `query` in one of their fields,
/// ignoring case. Whitespace only queries are refused.
pub fn filter(dataset: &Dataset, query: &str) -> Result<Vec<usize>, BVError> {
    if query.trim().is_empty() {
        return Err(BVError::EmptyQuery);
    }
    let needle = query.to_lowercase();
    let matches: Vec<usize> = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            Field::SEARCHABLE.iter().any(|&field| {
                let value = record.get(field);
                value.is_present() && value.to_string().to_lowercase().contains(&needle)
            })
        })
        .map(|(idx, _)| idx)
        .collect();
    debug!("Search for {query:?} matched {} of {} records", matches.len(), dataset.len());
    Ok(matches)
}

/// Orders `rows` by the configured key. Rows stay untouched without a key or
/// when the key is not sortable.
pub fn sort(dataset: &Dataset, mut rows: Vec<usize>, config: SortConfig) -> Vec<usize> {
    let Some(key) = config.key.filter(|k| k.is_sortable()) else {
        return rows;
    };
    let missing = FieldValue::Missing;
    let value = |idx: usize| dataset.get(idx).map_or(&missing, |r| r.get(key));
    merge_sort_by(&mut rows, |&a, &b| {
        let ordering = value(a).relational_cmp(value(b));
        match config.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    debug!("Sorted {} rows by {} {:?}", rows.len(), key.name(), config.direction);
    rows
}

// Values of mixed types do not form a total order, which `slice::sort_by` may
// reject with a panic. This merge sort accepts any comparison.
fn merge_sort_by<T: Copy, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    let mut buffer = items.to_vec();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut left, mut right, mut out) = (start, mid, start);
            while left < mid && right < end {
                if compare(&items[right], &items[left]) == Ordering::Less {
                    buffer[out] = items[right];
                    right += 1;
                } else {
                    buffer[out] = items[left];
                    left += 1;
                }
                out += 1;
            }
            buffer[out..out + (mid - left)].copy_from_slice(&items[left..mid]);
            out += mid - left;
            buffer[out..out + (end - right)].copy_from_slice(&items[right..end]);
            start = end;
        }
        items.copy_from_slice(&buffer);
        width *= 2;
    }
}
