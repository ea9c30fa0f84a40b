//! Grid reconciliation
//!
//! [`Datagrid`] watches the playground store and keeps the grid widget in
//! line with it. Each store slice has its own reaction; reactions that touch
//! the layout are debounced so a burst of store updates costs one render.

use crate::core::{ColumnId, Debouncer, PlaygroundState};
use crate::grid::{CellPosition, GridHandle, GridWidget};
use crate::services::{
    ColumnService, DatagridColumnService, DatagridGridService, DatagridService, DatagridSizeService,
    ExternalService, GridService, SizeService, StyleService,
};
use crate::tui::{Action, Component, Focusable, Theme};
use color_eyre::Result;
use ratatui::{
    Frame,
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace};

/// Debounced reactions, one pending timer each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reaction {
    Columns,
    FocusColumn,
    ResizeCanvas,
    ColumnStyle,
    SuggestionPanel,
    Highlight,
}

/// Reaction delays in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    pub columns_ms: u64,
    pub focus_column_ms: u64,
    pub resize_canvas_ms: u64,
    pub column_style_ms: u64,
    pub suggestion_panel_ms: u64,
    pub highlight_ms: u64,
    /// Delay of the style service before same-content cells are painted
    pub highlight_cells_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            columns_ms: 0,
            focus_column_ms: 300,
            resize_canvas_ms: 250,
            column_style_ms: 0,
            suggestion_panel_ms: 300,
            highlight_ms: 500,
            highlight_cells_ms: 200,
        }
    }
}

impl DebounceConfig {
    pub fn delay(&self, reaction: Reaction) -> Duration {
        let ms = match reaction {
            Reaction::Columns => self.columns_ms,
            Reaction::FocusColumn => self.focus_column_ms,
            Reaction::ResizeCanvas => self.resize_canvas_ms,
            Reaction::ColumnStyle => self.column_style_ms,
            Reaction::SuggestionPanel => self.suggestion_panel_ms,
            Reaction::Highlight => self.highlight_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn highlight_cells(&self) -> Duration {
        Duration::from_millis(self.highlight_cells_ms)
    }
}

/// Collaborators the grid delegates to
pub struct DatagridServices {
    pub grid: Box<dyn GridService>,
    pub columns: Box<dyn ColumnService>,
    pub size: Box<dyn SizeService>,
    pub external: Box<dyn ExternalService>,
}

impl DatagridServices {
    /// Default services with the given suggestion notifier
    pub fn with_external(external: Box<dyn ExternalService>, size: DatagridSizeService) -> Self {
        Self {
            grid: Box::new(DatagridGridService),
            columns: Box::new(DatagridColumnService::new()),
            size: Box::new(size),
            external,
        }
    }
}

/// Store slices compared between digests
#[derive(Debug, Clone)]
struct Watched {
    state: Arc<PlaygroundState>,
}

impl Watched {
    fn same<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Changes {
    metadata: bool,
    data: bool,
    filters: bool,
    lookup: bool,
    column: bool,
    line: bool,
}

impl Changes {
    fn between(previous: Option<&Watched>, next: &PlaygroundState) -> Self {
        let Some(previous) = previous else {
            return Self {
                metadata: true,
                data: true,
                filters: true,
                lookup: true,
                column: true,
                line: true,
            };
        };
        let prev = &previous.state;
        Self {
            metadata: !Watched::same(&prev.dataset, &next.dataset),
            data: !Watched::same(&prev.data, &next.data),
            filters: prev.filters != next.filters,
            lookup: prev.lookup_visibility != next.lookup_visibility,
            column: !Watched::same(&prev.selected_column, &next.selected_column),
            line: !Watched::same(&prev.selected_line, &next.selected_line),
        }
    }
}

pub struct Datagrid {
    services: DatagridServices,
    style: StyleService,
    view: DatagridService,
    grid: Option<GridHandle>,
    timers: Debouncer<Reaction, Option<(ColumnId, String)>>,
    delays: DebounceConfig,
    receiver: Option<watch::Receiver<Arc<PlaygroundState>>>,
    initial_pending: bool,
    state: Arc<PlaygroundState>,
    watched: Option<Watched>,
    destroyed: bool,
    focused: bool,
    supported_actions: Vec<Action>,
}

impl std::fmt::Debug for Datagrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datagrid")
            .field("grid", &self.grid.is_some())
            .field("pending", &self.timers.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Datagrid {
    pub fn new(services: DatagridServices, delays: DebounceConfig) -> Self {
        Self {
            services,
            style: StyleService::new(delays.highlight_cells()),
            view: DatagridService::default(),
            grid: None,
            timers: Debouncer::new(),
            delays,
            receiver: None,
            initial_pending: false,
            state: Arc::new(PlaygroundState::default()),
            watched: None,
            destroyed: false,
            focused: true,
            supported_actions: vec![
                Action::MoveUp,
                Action::MoveDown,
                Action::MoveLeft,
                Action::MoveRight,
                Action::PageUp,
                Action::PageDown,
                Action::Home,
                Action::End,
                Action::GoToTop,
                Action::GoToBottom,
            ],
        }
    }

    /// Watch a store; the next [`Datagrid::poll`] digests its current snapshot
    pub fn subscribe(&mut self, receiver: watch::Receiver<Arc<PlaygroundState>>) {
        if self.destroyed {
            return;
        }
        self.receiver = Some(receiver);
        self.initial_pending = true;
    }

    /// Digest the store snapshot if it changed since the last poll
    pub fn poll(&mut self, now: Instant) {
        let Some(receiver) = self.receiver.as_mut() else {
            return;
        };
        let changed = receiver.has_changed().unwrap_or(false);
        if !changed && !self.initial_pending {
            return;
        }
        self.initial_pending = false;
        let state = receiver.borrow_and_update().clone();
        self.digest(state, now);
    }

    /// Run the reactions for the slices that changed in `state`
    pub fn digest(&mut self, state: Arc<PlaygroundState>, now: Instant) {
        if self.destroyed {
            return;
        }
        let changes = Changes::between(self.watched.as_ref(), &state);
        self.state = state.clone();
        self.watched = Some(Watched { state: state.clone() });
        self.view.update(state.data.clone(), state.filters.clone());

        if changes.metadata {
            self.on_metadata_change();
        }
        if changes.data {
            self.on_data_change(now);
        }
        if changes.filters {
            self.on_filters_change();
        }
        if changes.lookup {
            self.on_lookup_change(now);
        }
        if changes.column {
            self.on_column_change(now);
        }
        if changes.column || changes.line {
            self.on_selection_change(now);
        }
    }

    fn on_metadata_change(&mut self) {
        let Some(grid) = &self.grid else {
            return;
        };
        debug!("dataset changed, renewing columns");
        grid.borrow_mut().scroll_row_to_top();
        self.services.columns.renew_all_columns(true);
        self.style.reset_cell_styles();
    }

    fn on_data_change(&mut self, now: Instant) {
        if self.state.data.is_none() {
            return;
        }
        if self.grid.is_none() {
            let grid = self.services.grid.init_grid();
            grid.borrow_mut().set_focused(self.focused);
            self.style.init(grid.clone());
            self.grid = Some(grid);
        }
        self.schedule(Reaction::Columns, now, None);
        self.schedule(Reaction::FocusColumn, now, None);
    }

    fn on_filters_change(&mut self) {
        let Some(grid) = &self.grid else {
            return;
        };
        self.style.reset_cell_styles();
        grid.borrow_mut().scroll_row_to_top();
    }

    fn on_lookup_change(&mut self, now: Instant) {
        if self.grid.is_some() {
            self.schedule(Reaction::ResizeCanvas, now, None);
        }
    }

    fn on_column_change(&mut self, now: Instant) {
        if self.grid.is_some() {
            self.schedule(Reaction::ColumnStyle, now, None);
        }
        self.timers.cancel(&Reaction::SuggestionPanel);
        if self.state.has_data() && !self.state.is_preview() {
            self.schedule(Reaction::SuggestionPanel, now, None);
        }
    }

    fn on_selection_change(&mut self, now: Instant) {
        if self.grid.is_some() {
            self.timers.cancel(&Reaction::Highlight);
            self.style.cancel_highlight();
        }
        if !self.state.has_data() || self.state.is_preview() {
            return;
        }
        let Some(column) = self.state.selected_column.as_ref() else {
            return;
        };
        if let Some(value) = self.state.selected_value() {
            self.schedule(Reaction::Highlight, now, Some((column.id.clone(), value)));
        }
    }

    fn schedule(&mut self, reaction: Reaction, now: Instant, payload: Option<(ColumnId, String)>) {
        let delay = self.delays.delay(reaction);
        if self.timers.reset_and_schedule(reaction, delay, now, payload) {
            trace!(?reaction, "rescheduled");
        }
    }

    /// Fire every reaction due at `now`, then the style service's highlight
    pub fn tick(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        for (reaction, payload) in self.timers.take_due(now) {
            self.fire(reaction, payload, now);
        }
        self.style.tick(now, &self.view);
    }

    fn fire(&mut self, reaction: Reaction, payload: Option<(ColumnId, String)>, now: Instant) {
        debug!(?reaction, "reaction fired");
        match reaction {
            Reaction::Columns => self.refresh_columns(),
            Reaction::FocusColumn => {
                if let Some(grid) = &self.grid {
                    self.services
                        .grid
                        .navigate_to_focused_column(grid, self.state.column_focus.as_ref());
                }
            }
            Reaction::ResizeCanvas => {
                if let Some(grid) = &self.grid {
                    grid.borrow_mut().resize_canvas();
                }
            }
            Reaction::ColumnStyle => {
                let Some(grid) = &self.grid else {
                    return;
                };
                let selected = self.state.selected_column_id();
                if self.state.selected_line.is_some() {
                    let mut grid = grid.borrow_mut();
                    StyleService::update_column_class(grid.columns_mut(), selected);
                    grid.invalidate();
                } else {
                    self.style.reset_styles(selected);
                }
            }
            Reaction::SuggestionPanel => self.services.external.update_suggestion_panel(true),
            Reaction::Highlight => {
                if let Some((column_id, value)) = payload {
                    self.style.schedule_highlight_cells_containing(column_id, value, now);
                }
            }
        }
    }

    fn refresh_columns(&mut self) {
        let (Some(grid), Some(data)) = (&self.grid, self.state.data.as_ref()) else {
            return;
        };
        let columns = self
            .services
            .columns
            .create_columns(&data.metadata.columns, data.preview);
        let mut widget = grid.borrow_mut();
        self.services.size.autosize_columns(&mut *widget, columns, &self.view);
        self.services.columns.renew_all_columns(false);
        StyleService::update_column_class(widget.columns_mut(), self.state.selected_column_id());
        widget.invalidate();
        self.services.columns.remember_columns(widget.columns());
    }

    /// Cancel every timer, stop watching the store and drop the widget
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        debug!("destroying datagrid");
        self.timers.cancel_all();
        self.style.release();
        self.receiver = None;
        self.grid = None;
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timers.next_deadline(), self.style.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_pending(&self, reaction: Reaction) -> bool {
        self.timers.is_pending(&reaction)
    }

    pub fn grid(&self) -> Option<&GridHandle> {
        self.grid.as_ref()
    }

    pub fn view(&self) -> &DatagridService {
        &self.view
    }

    /// Column id and row id under the active cell
    pub fn active_selection(&self) -> Option<(ColumnId, u64)> {
        let grid = self.grid.as_ref()?.borrow();
        let active = grid.active_cell()?;
        let column = grid.columns().get(active.col)?;
        let row = self.view.row(active.row)?;
        Some((column.id.clone(), row.tdp_id))
    }

    fn move_active(&mut self, action: Action) -> bool {
        let Some(grid) = &self.grid else {
            return false;
        };
        let rows = self.view.row_count();
        let mut grid = grid.borrow_mut();
        let columns = grid.columns().len();
        if rows == 0 || columns < 2 {
            return false;
        }
        let page = grid.visible_rows();
        let current = grid.active_cell().unwrap_or(CellPosition::new(0, 1));
        let last_row = rows - 1;
        let last_col = columns - 1;
        let next = match action {
            Action::MoveUp => CellPosition::new(current.row.saturating_sub(1), current.col),
            Action::MoveDown => CellPosition::new((current.row + 1).min(last_row), current.col),
            Action::MoveLeft => CellPosition::new(current.row, current.col.saturating_sub(1).max(1)),
            Action::MoveRight => CellPosition::new(current.row, (current.col + 1).min(last_col)),
            Action::PageUp => CellPosition::new(current.row.saturating_sub(page), current.col),
            Action::PageDown => CellPosition::new((current.row + page).min(last_row), current.col),
            Action::Home => CellPosition::new(current.row, 1),
            Action::End => CellPosition::new(current.row, last_col),
            Action::GoToTop => CellPosition::new(0, current.col),
            Action::GoToBottom => CellPosition::new(last_row, current.col),
            _ => return false,
        };
        let next = CellPosition::new(next.row.min(last_row), next.col.clamp(1, last_col));
        grid.set_active_cell(next);
        true
    }
}

impl Component for Datagrid {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        if self.destroyed || !self.supported_actions.contains(&action) {
            return Ok(false);
        }
        Ok(self.move_active(action))
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        match &self.grid {
            Some(grid) => grid.borrow_mut().render(frame, area, &self.view, theme),
            None => {
                let border = if self.focused {
                    theme.focused_border_style()
                } else {
                    theme.border_style()
                };
                let empty = Paragraph::new("No data loaded")
                    .style(theme.dim_style())
                    .block(Block::default().borders(Borders::ALL).title("Grid").border_style(border));
                frame.render_widget(empty, area);
            }
        }
    }

    fn supported_actions(&self) -> &[Action] {
        &self.supported_actions
    }

    fn name(&self) -> &str {
        "Datagrid"
    }
}

impl Focusable for Datagrid {
    fn is_focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if let Some(grid) = &self.grid {
            grid.borrow_mut().set_focused(focused);
        }
    }
}

impl Drop for Datagrid {
    fn drop(&mut self) {
        self.destroy();
    }
}
