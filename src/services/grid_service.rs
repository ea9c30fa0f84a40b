use crate::core::ColumnId;
use crate::grid::{GridHandle, GridView, GridWidget};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Creates the grid widget and moves it around
pub trait GridService {
    fn init_grid(&mut self) -> GridHandle;

    /// Scroll the grid so the focused column is visible
    fn navigate_to_focused_column(&self, grid: &GridHandle, column_id: Option<&ColumnId>);
}

#[derive(Debug, Default)]
pub struct DatagridGridService;

impl GridService for DatagridGridService {
    fn init_grid(&mut self) -> GridHandle {
        debug!("creating grid widget");
        Rc::new(RefCell::new(GridView::new()))
    }

    fn navigate_to_focused_column(&self, grid: &GridHandle, column_id: Option<&ColumnId>) {
        let Some(column_id) = column_id else {
            return;
        };
        let mut grid = grid.borrow_mut();
        let index = grid.columns().iter().position(|c| &c.id == column_id);
        if let Some(index) = index {
            debug!(column = %column_id, index, "navigating to focused column");
            grid.scroll_to_column(index);
        }
    }
}
