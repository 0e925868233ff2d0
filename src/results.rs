//! Append-only store of output rows shared by all workers

use std::sync::{Mutex, PoisonError};

/// Where a row came from: data-unit sequence number and line index within it.
///
/// Only used to restore input order on request; the store itself keeps rows
/// in lock-acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowOrigin {
    pub unit: u64,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: String,
    pub title: String,
    pub text: String,
    pub origin: RowOrigin,
}

impl ResultRow {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        origin: RowOrigin,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            origin,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResultStore {
    rows: Mutex<Vec<ResultRow>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, row: ResultRow) {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the rows stored so far
    pub fn snapshot(&self) -> Vec<ResultRow> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stable sort of rows back into input order
pub fn sort_by_origin(rows: &mut [ResultRow]) {
    rows.sort_by_key(|row| row.origin);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn row(id: &str, unit: u64, line: usize) -> ResultRow {
        ResultRow::new(id, "title", "", RowOrigin { unit, line })
    }

    #[test]
    fn test_append_and_snapshot() {
        let store = ResultStore::new();
        assert!(store.is_empty());
        store.append(row("tt1", 0, 0));
        store.append(row("tt2", 0, 1));
        let rows = store.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "tt1");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_appends_are_all_kept() {
        let store = Arc::new(ResultStore::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..250 {
                        store.append(row(&format!("tt{}-{}", t, i), t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids: Vec<String> = store.snapshot().into_iter().map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_sort_by_origin_restores_input_order() {
        let mut rows = vec![row("c", 1, 0), row("b", 0, 7), row("a", 0, 2)];
        sort_by_origin(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
