//! Shared playground state
//!
//! The state is an immutable snapshot. Every mutation builds a new snapshot
//! that shares the untouched slices through `Arc`, so readers detect what
//! changed with a pointer comparison. Readers subscribe through a
//! `tokio::sync::watch` receiver; dropping it unsubscribes.

use crate::core::models::{ColumnMetadata, DatasetMetadata, Filter, GridData, Row};
use crate::core::types::{ColumnId, PreparationId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PlaygroundState {
    pub dataset: Option<Arc<DatasetMetadata>>,
    pub preparation_id: Option<PreparationId>,
    pub data: Option<Arc<GridData>>,
    pub filters: Arc<Vec<Filter>>,
    pub selected_column: Option<Arc<ColumnMetadata>>,
    pub selected_line: Option<Arc<Row>>,
    pub lookup_visibility: bool,
    /// Column to bring into view once the data is displayed
    pub column_focus: Option<ColumnId>,
}

impl PlaygroundState {
    pub fn is_preview(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.preview)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn selected_column_id(&self) -> Option<&ColumnId> {
        self.selected_column.as_ref().map(|c| &c.id)
    }

    /// Value of the selected line in the selected column
    pub fn selected_value(&self) -> Option<String> {
        let column = self.selected_column.as_ref()?;
        let line = self.selected_line.as_ref()?;
        Some(line.cell_text(column.id.as_str()))
    }
}

/// Owner of the current [`PlaygroundState`]
#[derive(Debug)]
pub struct PlaygroundStore {
    sender: watch::Sender<Arc<PlaygroundState>>,
}

impl Default for PlaygroundStore {
    fn default() -> Self {
        Self::new(PlaygroundState::default())
    }
}

impl PlaygroundStore {
    pub fn new(initial: PlaygroundState) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    pub fn snapshot(&self) -> Arc<PlaygroundState> {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<PlaygroundState>> {
        self.sender.subscribe()
    }

    /// Publish a new snapshot built from a copy of the current one
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PlaygroundState),
    {
        self.sender.send_modify(|current| {
            let mut next = PlaygroundState::clone(current);
            f(&mut next);
            *current = Arc::new(next);
        });
    }

    /// Load a new dataset and its data, clearing selection and filters
    pub fn load(&self, dataset: DatasetMetadata, preparation_id: Option<PreparationId>, data: GridData) {
        debug!(dataset = %dataset.id, records = data.records.len(), "loading dataset");
        self.update(|state| {
            state.dataset = Some(Arc::new(dataset));
            state.preparation_id = preparation_id;
            state.data = Some(Arc::new(data));
            state.filters = Arc::new(Vec::new());
            state.selected_column = None;
            state.selected_line = None;
        });
    }

    /// Replace the data keeping the dataset; the selection is resolved again
    /// by column id and row id
    pub fn set_data(&self, data: GridData) {
        self.update(|state| {
            let column = state
                .selected_column
                .as_ref()
                .and_then(|c| data.column(c.id.as_str()).cloned());
            let line = state
                .selected_line
                .as_ref()
                .and_then(|l| data.row_by_tdp_id(l.tdp_id).cloned());
            if let Some(column) = &state.selected_column {
                state.column_focus = Some(column.id.clone());
            }
            state.selected_column = column.map(Arc::new);
            state.selected_line = line.map(Arc::new);
            state.data = Some(Arc::new(data));
        });
    }

    /// Select a column and optionally a line of the current data
    ///
    /// Slices whose id did not change keep their identity.
    pub fn set_grid_selection(&self, column_id: Option<&ColumnId>, tdp_id: Option<u64>) {
        self.update(|state| {
            let Some(data) = state.data.clone() else {
                return;
            };

            let same_column = state.selected_column_id() == column_id;
            if !same_column {
                state.selected_column = column_id
                    .and_then(|id| data.column(id.as_str()).cloned())
                    .map(Arc::new);
            }

            let same_line = state.selected_line.as_ref().map(|l| l.tdp_id) == tdp_id;
            if !same_line {
                state.selected_line = tdp_id
                    .and_then(|id| data.row_by_tdp_id(id).cloned())
                    .map(Arc::new);
            }
        });
    }

    pub fn set_preparation_id(&self, preparation_id: PreparationId) {
        self.update(|state| state.preparation_id = Some(preparation_id));
    }

    pub fn add_filter(&self, filter: Filter) {
        self.update(|state| {
            if state.filters.contains(&filter) {
                return;
            }
            let mut filters = Vec::clone(&state.filters);
            filters.push(filter);
            state.filters = Arc::new(filters);
        });
    }

    pub fn remove_filter(&self, index: usize) {
        self.update(|state| {
            if index >= state.filters.len() {
                return;
            }
            let mut filters = Vec::clone(&state.filters);
            filters.remove(index);
            state.filters = Arc::new(filters);
        });
    }

    pub fn clear_filters(&self) {
        self.update(|state| {
            if !state.filters.is_empty() {
                state.filters = Arc::new(Vec::new());
            }
        });
    }

    pub fn set_lookup_visibility(&self, visible: bool) {
        self.update(|state| state.lookup_visibility = visible);
    }

    pub fn toggle_lookup(&self) {
        self.update(|state| state.lookup_visibility = !state.lookup_visibility);
    }

    pub fn set_column_focus(&self, column_id: Option<ColumnId>) {
        self.update(|state| state.column_focus = column_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DataMetadata;
    use pretty_assertions::assert_eq;

    fn sample_data() -> GridData {
        GridData {
            metadata: DataMetadata {
                columns: vec![
                    ColumnMetadata::new("0000", "id", "integer"),
                    ColumnMetadata::new("0001", "city", "string"),
                ],
            },
            records: vec![
                Row::new(1, [("0000", "1"), ("0001", "Paris")]),
                Row::new(2, [("0000", "2"), ("0001", "Lyon")]),
            ],
            preview: false,
        }
    }

    fn loaded_store() -> PlaygroundStore {
        let store = PlaygroundStore::default();
        store.load(DatasetMetadata::default(), None, sample_data());
        store
    }

    #[test]
    fn test_update_shares_untouched_slices() {
        let store = loaded_store();
        let before = store.snapshot();
        store.toggle_lookup();
        let after = store.snapshot();

        assert!(after.lookup_visibility);
        assert!(Arc::ptr_eq(before.data.as_ref().unwrap(), after.data.as_ref().unwrap()));
        assert!(Arc::ptr_eq(&before.filters, &after.filters));
    }

    #[test]
    fn test_selection_keeps_identity_when_unchanged() {
        let store = loaded_store();
        let column = ColumnId::new("0001");
        store.set_grid_selection(Some(&column), Some(2));
        let first = store.snapshot();
        assert_eq!(first.selected_value(), Some("Lyon".to_string()));

        store.set_grid_selection(Some(&column), Some(1));
        let second = store.snapshot();
        assert!(Arc::ptr_eq(
            first.selected_column.as_ref().unwrap(),
            second.selected_column.as_ref().unwrap()
        ));
        assert_eq!(second.selected_value(), Some("Paris".to_string()));
    }

    #[test]
    fn test_set_data_resolves_selection_again() {
        let store = loaded_store();
        store.set_grid_selection(Some(&ColumnId::new("0001")), Some(2));

        let mut data = sample_data();
        data.records.remove(1);
        store.set_data(data);

        let state = store.snapshot();
        assert_eq!(state.selected_column_id(), Some(&ColumnId::new("0001")));
        assert!(state.selected_line.is_none());
        assert_eq!(state.column_focus, Some(ColumnId::new("0001")));
    }

    #[test]
    fn test_filters_are_deduplicated() {
        let store = loaded_store();
        let column = ColumnMetadata::new("0001", "city", "string");
        store.add_filter(Filter::exact(&column, "Paris"));
        store.add_filter(Filter::exact(&column, "Paris"));
        assert_eq!(store.snapshot().filters.len(), 1);

        let before = store.snapshot();
        store.clear_filters();
        store.clear_filters();
        assert!(store.snapshot().filters.is_empty());
        assert!(!Arc::ptr_eq(&before.filters, &store.snapshot().filters));
    }

    #[test]
    fn test_remove_filter_keeps_the_others() {
        let store = loaded_store();
        let column = ColumnMetadata::new("0001", "city", "string");
        store.add_filter(Filter::exact(&column, "Paris"));
        store.add_filter(Filter::exact(&column, "Lyon"));

        let before = store.snapshot();
        store.remove_filter(5);
        assert!(Arc::ptr_eq(&before.filters, &store.snapshot().filters));

        store.remove_filter(1);
        assert_eq!(store.snapshot().filters.as_slice(), &[Filter::exact(&column, "Paris")]);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let store = loaded_store();
        let mut receiver = store.subscribe();

        store.set_lookup_visibility(true);
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().lookup_visibility);
    }
}
