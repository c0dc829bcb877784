//! Table sorting and paging over the record list.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use shared::domain::Student;

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 25, 50];
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Roll,
    Name,
    Branch,
    Gpa,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Roll => "roll",
            SortKey::Name => "name",
            SortKey::Branch => "branch",
            SortKey::Gpa => "gpa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Ascending comparison of two records on one column.
///
/// GPA compares numerically; text columns use locale collation that ignores
/// case but not accents.
pub fn compare(a: &Student, b: &Student, key: SortKey) -> Ordering {
    match key {
        SortKey::Gpa => a.gpa.total_cmp(&b.gpa),
        SortKey::Roll => compare_text(a.roll.as_str(), b.roll.as_str()),
        SortKey::Name => compare_text(&a.name, &b.name),
        SortKey::Branch => compare_text(a.branch.as_str(), b.branch.as_str()),
    }
}

thread_local! {
    static COLLATOR: Option<Collator> = text_collator();
}

fn text_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Secondary);
    match Collator::try_new(&Default::default(), options) {
        Ok(collator) => Some(collator),
        Err(error) => {
            tracing::warn!(%error, "collator unavailable, sorting text by code point");
            None
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    COLLATOR.with(|collator| match collator {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    })
}

/// Stable in both directions: equal keys keep their incoming order.
pub fn sort_records(records: &mut [Student], key: SortKey, direction: SortDirection) {
    records.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Zero-based page; out-of-range pages are empty.
pub fn paginate<T: Clone>(records: &[T], page_index: usize, page_size: usize) -> Vec<T> {
    let Some(start) = page_index.checked_mul(page_size) else {
        return Vec::new();
    };
    if start >= records.len() {
        return Vec::new();
    }
    let end = start.saturating_add(page_size).min(records.len());
    records[start..end].to_vec()
}

pub fn view(
    records: &[Student],
    key: SortKey,
    direction: SortDirection,
    page_index: usize,
    page_size: usize,
) -> Vec<Student> {
    let mut sorted = records.to_vec();
    sort_records(&mut sorted, key, direction);
    paginate(&sorted, page_index, page_size)
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableView {
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableView {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    /// Clicking the active ascending column flips it; any other click sorts ascending.
    pub fn change_sort(&mut self, key: SortKey) {
        let flip = self.sort_key == key && self.sort_direction == SortDirection::Ascending;
        self.sort_direction = if flip {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        self.sort_key = key;
    }

    pub fn change_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn change_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page_index = 0;
    }

    pub fn apply(&self, records: &[Student]) -> Vec<Student> {
        view(
            records,
            self.sort_key,
            self.sort_direction,
            self.page_index,
            self.page_size,
        )
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
