//! Spreadsheet widget abstraction
//!
//! The reconciliation layer only talks to the grid through [`GridWidget`],
//! which keeps it testable with a recording double. [`GridView`] is the
//! ratatui implementation.

pub mod view;

use crate::services::column_service::ColumnDefinition;
use crate::services::datagrid_service::DatagridService;
use crate::tui::Theme;
use derive_deref::{Deref, DerefMut};
use ratatui::{Frame, layout::Rect};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

pub use view::GridView;

/// Active cell, as (visible row index, column index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

impl CellPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Style group content: visible row index -> (column id -> class)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct RowStyleMap(pub BTreeMap<usize, HashMap<String, String>>);

impl RowStyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_cell(&mut self, row: usize, column_id: &str, class: &str) {
        self.0
            .entry(row)
            .or_default()
            .insert(column_id.to_string(), class.to_string());
    }

    pub fn class_of(&self, row: usize, column_id: &str) -> Option<&str> {
        self.0.get(&row)?.get(column_id).map(String::as_str)
    }
}

/// Operations the reconciliation layer performs on the spreadsheet widget
pub trait GridWidget {
    fn columns(&self) -> &[ColumnDefinition];
    fn columns_mut(&mut self) -> &mut [ColumnDefinition];
    fn set_columns(&mut self, columns: Vec<ColumnDefinition>);

    /// Mark the whole grid for re-render
    fn invalidate(&mut self);
    fn scroll_row_to_top(&mut self);
    fn scroll_to_column(&mut self, index: usize);
    /// Recompute the canvas size from the space available at last render
    fn resize_canvas(&mut self);
    /// Rows shown at once, used for paging
    fn visible_rows(&self) -> usize {
        20
    }
    fn set_focused(&mut self, _focused: bool) {}

    fn active_cell(&self) -> Option<CellPosition>;
    fn set_active_cell(&mut self, position: CellPosition);
    fn reset_active_cell(&mut self);

    /// Replace the named style group
    fn set_cell_css_styles(&mut self, key: &str, styles: RowStyleMap);
    fn remove_cell_css_styles(&mut self, key: &str);

    fn render(&mut self, frame: &mut Frame, area: Rect, view: &DatagridService, theme: &Theme);
}

impl std::fmt::Debug for dyn GridWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridWidget")
            .field("columns", &self.columns().len())
            .field("active_cell", &self.active_cell())
            .finish()
    }
}

/// Shared handle on the widget; the grid lives on the UI thread only
pub type GridHandle = Rc<RefCell<dyn GridWidget>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_style_map() {
        let mut styles = RowStyleMap::new();
        styles.insert_cell(3, "0001", "highlight");
        styles.insert_cell(3, "0002", "highlight");
        styles.insert_cell(7, "0001", "highlight");

        assert_eq!(styles.len(), 2);
        assert_eq!(styles.class_of(3, "0002"), Some("highlight"));
        assert_eq!(styles.class_of(4, "0001"), None);
    }
}
