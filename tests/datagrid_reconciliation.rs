//! Reconciliation of the grid widget with the playground store

use pretty_assertions::assert_eq;
use prepgrid::core::{ColumnMetadata, DataMetadata, DatasetMetadata, Filter, GridData, PlaygroundStore, Row};
use prepgrid::grid::{CellPosition, GridHandle, GridWidget, RowStyleMap};
use prepgrid::services::{
    ColumnDefinition, ColumnService, ColumnsConfig, DatagridColumnService, DatagridService, DatagridSizeService,
    ExternalService, GridService, SizeService,
};
use prepgrid::tui::Theme;
use prepgrid::tui::components::{Datagrid, DatagridServices, DebounceConfig, Reaction};
use prepgrid::ColumnId;
use ratatui::{Frame, layout::Rect};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MS: Duration = Duration::from_millis(1);

type Log = Rc<RefCell<Vec<String>>>;

fn drain(log: &Log) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

struct RecordingGrid {
    columns: Vec<ColumnDefinition>,
    active: Option<CellPosition>,
    log: Log,
}

impl RecordingGrid {
    fn record(&self, call: impl Into<String>) {
        self.log.borrow_mut().push(call.into());
    }
}

impl GridWidget for RecordingGrid {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn columns_mut(&mut self) -> &mut [ColumnDefinition] {
        &mut self.columns
    }

    fn set_columns(&mut self, columns: Vec<ColumnDefinition>) {
        self.record(format!("set_columns({})", columns.len()));
        self.columns = columns;
    }

    fn invalidate(&mut self) {
        self.record("invalidate");
    }

    fn scroll_row_to_top(&mut self) {
        self.record("scroll_row_to_top");
    }

    fn scroll_to_column(&mut self, index: usize) {
        self.record(format!("scroll_to_column({index})"));
    }

    fn resize_canvas(&mut self) {
        self.record("resize_canvas");
    }

    fn active_cell(&self) -> Option<CellPosition> {
        self.active
    }

    fn set_active_cell(&mut self, position: CellPosition) {
        self.active = Some(position);
    }

    fn reset_active_cell(&mut self) {
        self.record("reset_active_cell");
        self.active = None;
    }

    fn set_cell_css_styles(&mut self, key: &str, styles: RowStyleMap) {
        self.record(format!("set_cell_css_styles({key},{})", styles.len()));
    }

    fn remove_cell_css_styles(&mut self, key: &str) {
        self.record(format!("remove_cell_css_styles({key})"));
    }

    fn render(&mut self, _frame: &mut Frame, _area: Rect, _view: &DatagridService, _theme: &Theme) {}
}

struct RecordingGridService {
    created: Rc<RefCell<Option<Rc<RefCell<RecordingGrid>>>>>,
    log: Log,
}

impl GridService for RecordingGridService {
    fn init_grid(&mut self) -> GridHandle {
        self.log.borrow_mut().push("init_grid".to_string());
        let grid = Rc::new(RefCell::new(RecordingGrid {
            columns: Vec::new(),
            active: None,
            log: self.log.clone(),
        }));
        *self.created.borrow_mut() = Some(grid.clone());
        grid
    }

    fn navigate_to_focused_column(&self, _grid: &GridHandle, column_id: Option<&ColumnId>) {
        let target = column_id.map_or("-", ColumnId::as_str);
        self.log.borrow_mut().push(format!("navigate({target})"));
    }
}

struct RecordingColumns {
    inner: DatagridColumnService,
    log: Log,
}

impl ColumnService for RecordingColumns {
    fn create_columns(&mut self, columns: &[ColumnMetadata], preview: bool) -> Vec<ColumnDefinition> {
        self.log.borrow_mut().push(format!("create_columns(preview={preview})"));
        self.inner.create_columns(columns, preview)
    }

    fn renew_all_columns(&mut self, renew: bool) {
        self.log.borrow_mut().push(format!("renew_all_columns({renew})"));
        self.inner.renew_all_columns(renew);
    }

    fn remember_columns(&mut self, displayed: &[ColumnDefinition]) {
        self.inner.remember_columns(displayed);
    }
}

struct RecordingSize {
    inner: DatagridSizeService,
    log: Log,
}

impl SizeService for RecordingSize {
    fn autosize_columns(&self, grid: &mut dyn GridWidget, columns: Vec<ColumnDefinition>, view: &DatagridService) {
        self.log.borrow_mut().push("autosize".to_string());
        self.inner.autosize_columns(grid, columns, view);
    }
}

struct RecordingExternal {
    log: Log,
}

impl ExternalService for RecordingExternal {
    fn update_suggestion_panel(&mut self, column_scope: bool) {
        self.log.borrow_mut().push(format!("suggestion({column_scope})"));
    }
}

struct Fixture {
    datagrid: Datagrid,
    store: PlaygroundStore,
    log: Log,
    grid: Rc<RefCell<Option<Rc<RefCell<RecordingGrid>>>>>,
}

impl Fixture {
    fn new() -> Self {
        let log: Log = Rc::default();
        let grid = Rc::new(RefCell::new(None));
        let services = DatagridServices {
            grid: Box::new(RecordingGridService {
                created: grid.clone(),
                log: log.clone(),
            }),
            columns: Box::new(RecordingColumns {
                inner: DatagridColumnService::new(),
                log: log.clone(),
            }),
            size: Box::new(RecordingSize {
                inner: DatagridSizeService::new(ColumnsConfig::default()),
                log: log.clone(),
            }),
            external: Box::new(RecordingExternal { log: log.clone() }),
        };
        let store = PlaygroundStore::default();
        let mut datagrid = Datagrid::new(services, DebounceConfig::default());
        datagrid.subscribe(store.subscribe());
        Self {
            datagrid,
            store,
            log,
            grid,
        }
    }

    /// Store loaded and every timer of the initial digest flushed
    fn loaded() -> (Self, Instant) {
        let mut fixture = Self::new();
        fixture.store.load(DatasetMetadata::new("ds", "people"), None, data(false));
        let start = Instant::now();
        fixture.datagrid.poll(start);
        fixture.datagrid.tick(start);
        fixture.datagrid.tick(start + 300 * MS);
        drain(&fixture.log);
        (fixture, start + Duration::from_secs(1))
    }

    fn poll(&mut self, now: Instant) -> Vec<String> {
        self.datagrid.poll(now);
        drain(&self.log)
    }

    fn tick(&mut self, now: Instant) -> Vec<String> {
        self.datagrid.tick(now);
        drain(&self.log)
    }

    fn widget(&self) -> Rc<RefCell<RecordingGrid>> {
        self.grid.borrow().clone().unwrap()
    }
}

fn data(preview: bool) -> GridData {
    GridData {
        metadata: DataMetadata {
            columns: vec![
                ColumnMetadata::new("0000", "city", "string"),
                ColumnMetadata::new("0001", "age", "integer"),
            ],
        },
        records: vec![
            Row::new(1, [("0000", "Paris"), ("0001", "30")]),
            Row::new(2, [("0000", "Lyon"), ("0001", "40")]),
            Row::new(3, [("0000", "Paris"), ("0001", "50")]),
        ],
        preview,
    }
}

fn strings(calls: &[&str]) -> Vec<String> {
    calls.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_nothing_touches_the_grid_before_data() {
    let mut fixture = Fixture::new();
    let start = Instant::now();

    assert_eq!(fixture.poll(start), Vec::<String>::new());
    fixture.store.toggle_lookup();
    fixture.store.clear_filters();
    assert_eq!(fixture.poll(start + MS), Vec::<String>::new());
    assert!(fixture.datagrid.next_deadline().is_none());

    fixture.store.load(DatasetMetadata::new("ds", "people"), None, data(false));
    let calls = fixture.poll(start + 2 * MS);
    assert_eq!(calls.iter().filter(|c| *c == "init_grid").count(), 1);

    fixture.store.set_data(data(false));
    let calls = fixture.poll(start + 3 * MS);
    assert!(!calls.contains(&"init_grid".to_string()));
    assert!(fixture.datagrid.is_pending(Reaction::Columns));
}

#[test]
fn test_data_builds_columns_after_zero_delay() {
    let mut fixture = Fixture::new();
    fixture.store.set_column_focus(Some(ColumnId::new("0001")));
    fixture.store.load(DatasetMetadata::new("ds", "people"), None, data(false));
    let start = Instant::now();
    fixture.poll(start);

    assert_eq!(
        fixture.tick(start),
        strings(&[
            "create_columns(preview=false)",
            "autosize",
            "set_columns(3)",
            "renew_all_columns(false)",
            "invalidate",
            // column style without a selected line resets the styles
            "reset_active_cell",
            "set_cell_css_styles(highlight,0)",
            "invalidate",
        ])
    );
    let classes: Vec<Option<String>> = fixture
        .widget()
        .borrow()
        .columns()
        .iter()
        .map(|c| c.css_class.clone())
        .collect();
    assert_eq!(
        classes,
        vec![Some("index-column".to_string()), None, Some(" numbers".to_string())]
    );

    assert_eq!(fixture.tick(start + 250 * MS), strings(&["resize_canvas"]));
    assert_eq!(
        fixture.tick(start + 300 * MS),
        strings(&["navigate(0001)", "suggestion(true)"])
    );
}

#[test]
fn test_dataset_change_renews_columns() {
    let (mut fixture, now) = Fixture::loaded();
    fixture
        .store
        .load(DatasetMetadata::new("other", "other people"), None, data(false));

    assert_eq!(
        fixture.poll(now),
        strings(&[
            "scroll_row_to_top",
            "renew_all_columns(true)",
            "reset_active_cell",
            "set_cell_css_styles(highlight,0)",
        ])
    );
    assert!(fixture.datagrid.is_pending(Reaction::Columns));
    assert!(fixture.datagrid.is_pending(Reaction::FocusColumn));
}

#[test]
fn test_filters_compare_by_value() {
    let (mut fixture, now) = Fixture::loaded();
    let city = ColumnMetadata::new("0000", "city", "string");

    fixture.store.add_filter(Filter::exact(&city, "Paris"));
    assert_eq!(
        fixture.poll(now),
        strings(&["reset_active_cell", "set_cell_css_styles(highlight,0)", "scroll_row_to_top"])
    );
    assert_eq!(fixture.datagrid.view().row_count(), 2);

    // same filters in a new allocation
    fixture
        .store
        .update(|state| state.filters = Arc::new(Vec::clone(&state.filters)));
    assert_eq!(fixture.poll(now + MS), Vec::<String>::new());
}

#[test]
fn test_lookup_flip_resizes_once_after_quiet_period() {
    let (mut fixture, now) = Fixture::loaded();

    fixture.store.toggle_lookup();
    fixture.poll(now);
    fixture.store.toggle_lookup();
    fixture.poll(now + 100 * MS);

    assert_eq!(fixture.tick(now + 300 * MS), Vec::<String>::new());
    assert_eq!(fixture.tick(now + 350 * MS), strings(&["resize_canvas"]));
    assert_eq!(fixture.tick(now + 2000 * MS), Vec::<String>::new());
}

#[test]
fn test_column_selection_notifies_suggestions_once() {
    let (mut fixture, now) = Fixture::loaded();

    fixture.store.set_grid_selection(Some(&ColumnId::new("0000")), None);
    fixture.poll(now);
    fixture.store.set_grid_selection(Some(&ColumnId::new("0001")), None);
    fixture.poll(now + 100 * MS);

    let calls = fixture.tick(now + 350 * MS);
    assert!(!calls.contains(&"suggestion(true)".to_string()));
    assert_eq!(fixture.tick(now + 400 * MS), strings(&["suggestion(true)"]));
    assert!(!fixture.datagrid.is_pending(Reaction::Highlight));
}

#[test]
fn test_preview_skips_suggestions_and_highlight() {
    let (mut fixture, now) = Fixture::loaded();
    fixture.store.set_data(data(true));
    fixture.poll(now);

    fixture.store.set_grid_selection(Some(&ColumnId::new("0000")), Some(1));
    fixture.poll(now + MS);
    assert!(fixture.datagrid.is_pending(Reaction::ColumnStyle));
    assert!(!fixture.datagrid.is_pending(Reaction::SuggestionPanel));
    assert!(!fixture.datagrid.is_pending(Reaction::Highlight));
}

#[test]
fn test_selected_value_is_highlighted_after_both_delays() {
    let (mut fixture, now) = Fixture::loaded();
    fixture.store.set_grid_selection(Some(&ColumnId::new("0000")), Some(1));
    fixture.poll(now);

    // a selected line keeps the active cell
    assert_eq!(fixture.tick(now), strings(&["invalidate"]));
    assert_eq!(fixture.tick(now + 499 * MS), strings(&["suggestion(true)"]));
    assert_eq!(fixture.tick(now + 500 * MS), Vec::<String>::new());
    assert_eq!(fixture.tick(now + 699 * MS), Vec::<String>::new());
    assert_eq!(
        fixture.tick(now + 700 * MS),
        strings(&["set_cell_css_styles(highlight,2)"])
    );
}

#[test]
fn test_moving_the_line_cancels_the_pending_highlight() {
    let (mut fixture, now) = Fixture::loaded();
    let city = ColumnId::new("0000");
    fixture.store.set_grid_selection(Some(&city), Some(1));
    fixture.poll(now);
    fixture.store.set_grid_selection(Some(&city), Some(2));
    fixture.poll(now + 400 * MS);

    fixture.tick(now + 500 * MS);
    assert!(fixture.datagrid.is_pending(Reaction::Highlight));
    fixture.tick(now + 900 * MS);
    // "Lyon" appears once
    assert_eq!(
        fixture.tick(now + 1100 * MS),
        strings(&["set_cell_css_styles(highlight,1)"])
    );
}

#[test]
fn test_moving_the_line_drops_a_highlight_already_handed_to_styles() {
    let (mut fixture, now) = Fixture::loaded();
    let city = ColumnId::new("0000");
    fixture.store.set_grid_selection(Some(&city), Some(1));
    fixture.poll(now);
    fixture.tick(now + 500 * MS);
    assert_eq!(fixture.datagrid.next_deadline(), Some(now + 700 * MS));

    fixture.store.set_grid_selection(Some(&city), Some(2));
    fixture.poll(now + 600 * MS);
    let painted = |log: &[String]| log.iter().any(|call| call.starts_with("set_cell_css_styles(highlight"));
    assert!(!painted(&fixture.tick(now + 700 * MS)));
    assert!(!painted(&fixture.tick(now + 1100 * MS)));
    assert_eq!(
        fixture.tick(now + 1300 * MS),
        strings(&["set_cell_css_styles(highlight,1)"])
    );
}

#[test]
fn test_destroy_cancels_everything() {
    let (mut fixture, now) = Fixture::loaded();
    fixture.store.set_grid_selection(Some(&ColumnId::new("0000")), Some(1));
    fixture.poll(now);
    fixture.tick(now + 500 * MS);

    assert!(!fixture.datagrid.is_destroyed());
    fixture.datagrid.destroy();
    assert!(fixture.datagrid.is_destroyed());
    assert!(fixture.datagrid.next_deadline().is_none());
    assert!(fixture.datagrid.grid().is_none());

    fixture.store.toggle_lookup();
    assert_eq!(fixture.poll(now + 600 * MS), Vec::<String>::new());
    assert_eq!(fixture.tick(now + Duration::from_secs(5)), Vec::<String>::new());
}
