//! Composable list-query model handed to the task repository.
//!
//! Filters are optional predicates that compose; the repository translates
//! the set into one SQL statement (or an in-memory scan) without the caller
//! knowing which adapter is behind the port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{TaskPriority, TaskStatus};

/// Whose tasks to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskScope {
    #[default]
    All,
    OwnedBy(Uuid),
    AssignedTo(Uuid),
}

/// Optional predicates over the task table. Empty vectors mean "no
/// constraint" for the respective field.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub scope: TaskScope,
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    /// `due_date < now` and status not terminal, evaluated at query time.
    pub overdue_only: bool,
    pub reminder_sent: Option<bool>,
    /// Case-insensitive substring match over title and description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortKey {
    #[default]
    DueDate,
    CreatedAt,
    Priority,
    Status,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSort {
    pub key: TaskSortKey,
    pub direction: SortDirection,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// 1-based pagination window. Construct with [`Page::clamped`] so out-of-range
/// requests degrade instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Clamps page to >= 1 and page size into [1, 100], defaulting to 20.
    pub fn clamped(number: Option<i64>, size: Option<i64>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

/// One page of results plus the totals clients need to iterate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, page: &Page, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + page.size - 1) / page.size
        };
        Self {
            items,
            page: page.number,
            page_size: page.size,
            total_items,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

impl TaskFilter {
    /// Applies the filter to one task at a fixed `now`. The in-memory adapter
    /// and the SQL adapter agree on these semantics.
    pub fn matches(&self, task: &crate::domain::Task, now: DateTime<Utc>) -> bool {
        match self.scope {
            TaskScope::All => {}
            TaskScope::OwnedBy(owner) => {
                if task.owner_id != owner {
                    return false;
                }
            }
            TaskScope::AssignedTo(assignee) => {
                if task.assignee_id != Some(assignee) {
                    return false;
                }
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if self.overdue_only && !task.is_overdue(now) {
            return false;
        }
        if let Some(flag) = self.reminder_sent {
            if task.reminder_sent != flag {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            if !task.title.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_size_and_number() {
        let page = Page::clamped(Some(0), Some(500));
        assert_eq!(page.number, 1);
        assert_eq!(page.size, MAX_PAGE_SIZE);

        let page = Page::clamped(None, Some(0));
        assert_eq!(page.size, 1);

        let page = Page::clamped(Some(3), None);
        assert_eq!(page.number, 3);
        assert_eq!(page.size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn paged_totals_round_up() {
        let page = Page::clamped(Some(1), Some(20));
        let paged = Paged::new(vec![(); 20], &page, 41);
        assert_eq!(paged.total_pages, 3);

        let empty: Paged<()> = Paged::new(vec![], &page, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
