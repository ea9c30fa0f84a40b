//! Presentation state derived from columns and rows
//!
//! Column classes, cell formatting with preview markers and the debounced
//! "same value" highlight. The service never owns the widget lifecycle: it
//! receives the handle once through [`StyleService::init`].

use crate::core::{CellDiff, ColumnId, ColumnMetadata, Debouncer, Row, RowDiff, SimplifiedType};
use crate::grid::{GridHandle, GridWidget, RowStyleMap};
use crate::services::column_service::ColumnDefinition;
use crate::services::datagrid_service::{DatagridService, HIGHLIGHT_CLASS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const INDEX_COLUMN_CLASS: &str = "index-column";
pub const SELECTED_CLASS: &str = "selected";
pub const NUMBERS_CLASS: &str = "numbers";
pub const DELETED_VALUE_CLASS: &str = "cellDeletedValue";
pub const NEW_VALUE_CLASS: &str = "cellNewValue";
pub const UPDATED_VALUE_CLASS: &str = "cellUpdateValue";
pub const INVALID_VALUE_CLASS: &str = "red-rect";

/// Default delay of the same value highlight
pub const HIGHLIGHT_DELAY: Duration = Duration::from_millis(200);

/// Result of formatting one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedCell {
    Deleted(String),
    New(String),
    Updated(String),
    Plain { text: String, invalid: bool },
}

impl FormattedCell {
    pub fn text(&self) -> &str {
        match self {
            Self::Deleted(text) | Self::New(text) | Self::Updated(text) => text,
            Self::Plain { text, .. } => text,
        }
    }

    /// Class of the wrapper, if any
    pub fn class(&self) -> Option<&'static str> {
        match self {
            Self::Deleted(_) => Some(DELETED_VALUE_CLASS),
            Self::New(_) => Some(NEW_VALUE_CLASS),
            Self::Updated(_) => Some(UPDATED_VALUE_CLASS),
            Self::Plain { invalid: true, .. } => Some(INVALID_VALUE_CLASS),
            Self::Plain { invalid: false, .. } => None,
        }
    }
}

/// Keeps the row height when a marked cell is empty
fn placeholder(text: String) -> String {
    if text.is_empty() { " ".to_string() } else { text }
}

/// Per-column cell formatter, closed over the column invalid values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFormatter {
    invalid_values: Arc<Vec<String>>,
}

impl CellFormatter {
    pub fn new(invalid_values: Vec<String>) -> Self {
        Self {
            invalid_values: Arc::new(invalid_values),
        }
    }

    fn is_invalid(&self, value: &str) -> bool {
        self.invalid_values.iter().any(|v| v == value)
    }

    /// Format the value of `column_id` in `row`
    ///
    /// A row marker wins over a cell marker.
    pub fn format(&self, column_id: &str, row: &Row) -> FormattedCell {
        let value = row.cell_text(column_id);
        let text = adapt_to_grid_constraints(&value);

        match row.row_diff {
            Some(RowDiff::Delete) => return FormattedCell::Deleted(placeholder(text)),
            Some(RowDiff::New) => return FormattedCell::New(placeholder(text)),
            None => {}
        }

        match row.cell_diff.get(column_id) {
            Some(CellDiff::Update) => FormattedCell::Updated(text),
            Some(CellDiff::New) => FormattedCell::New(text),
            Some(CellDiff::Delete) => FormattedCell::Deleted(placeholder(text)),
            None => FormattedCell::Plain {
                invalid: self.is_invalid(&value),
                text,
            },
        }
    }
}

/// Make hidden characters visible in a single grid line
///
/// ANSI escapes are stripped, line breaks and tabs are shown as symbols and
/// leading or trailing spaces as middle dots.
pub fn adapt_to_grid_constraints(value: &str) -> String {
    let stripped = strip_ansi_escapes::strip_str(value);
    let trimmed_start = stripped.trim_start_matches(' ');
    let leading = stripped.len() - trimmed_start.len();
    let core = trimmed_start.trim_end_matches(' ');
    let trailing = trimmed_start.len() - core.len();

    let mut out = String::with_capacity(stripped.len());
    out.extend(std::iter::repeat_n('·', leading));
    for c in core.chars() {
        match c {
            '\r' => {}
            '\n' => out.push('↵'),
            '\t' => out.push('⇥'),
            other => out.push(other),
        }
    }
    out.extend(std::iter::repeat_n('·', trailing));
    out
}

#[derive(Debug)]
pub struct StyleService {
    grid: Option<GridHandle>,
    highlight: Debouncer<(), (ColumnId, String)>,
    highlight_delay: Duration,
}

impl Default for StyleService {
    fn default() -> Self {
        Self::new(HIGHLIGHT_DELAY)
    }
}

impl StyleService {
    pub fn new(highlight_delay: Duration) -> Self {
        Self {
            grid: None,
            highlight: Debouncer::new(),
            highlight_delay,
        }
    }

    pub fn init(&mut self, grid: GridHandle) {
        self.grid = Some(grid);
    }

    /// Drop the widget handle and any pending highlight
    pub fn release(&mut self) {
        self.highlight.cancel_all();
        self.grid = None;
    }

    /// Set the classes of every column from its type and the selection
    pub fn update_column_class(columns: &mut [ColumnDefinition], selected: Option<&ColumnId>) {
        for column in columns.iter_mut() {
            if column.id.is_index() {
                column.css_class = Some(INDEX_COLUMN_CLASS.to_string());
                continue;
            }

            let mut class: Option<String> = None;
            let mut add_class = |name: &str| {
                let current = class.take().unwrap_or_default();
                class = Some(format!("{current} {name}"));
            };
            if selected == Some(&column.id) {
                add_class(SELECTED_CLASS);
            }
            let simplified = column
                .metadata
                .as_ref()
                .map(ColumnMetadata::simplified_type)
                .unwrap_or(SimplifiedType::Unknown);
            if simplified.is_number() {
                add_class(NUMBERS_CLASS);
            }
            column.css_class = class;
        }
    }

    /// Clear the active cell and the highlight group
    pub fn reset_cell_styles(&self) {
        if let Some(grid) = &self.grid {
            let mut grid = grid.borrow_mut();
            grid.reset_active_cell();
            grid.set_cell_css_styles(HIGHLIGHT_CLASS, RowStyleMap::new());
        }
    }

    /// Reset cell styles, recompute the column classes and re-render
    pub fn reset_styles(&self, selected: Option<&ColumnId>) {
        if let Some(grid) = &self.grid {
            self.reset_cell_styles();
            let mut grid = grid.borrow_mut();
            Self::update_column_class(grid.columns_mut(), selected);
            grid.invalidate();
        }
    }

    pub fn column_formatter(column: &ColumnMetadata) -> CellFormatter {
        CellFormatter::new(column.quality.invalid_values.clone())
    }

    /// Header class for a column preview marker
    pub fn get_column_preview_style(column: &ColumnMetadata) -> &'static str {
        match column.diff {
            Some(CellDiff::New) => "newColumn",
            Some(CellDiff::Delete) => "deletedColumn",
            Some(CellDiff::Update) => "updatedColumn",
            None => "",
        }
    }

    /// Replace any pending highlight by a new one for `value` in `column_id`
    pub fn schedule_highlight_cells_containing(&mut self, column_id: ColumnId, value: String, now: Instant) {
        self.highlight
            .reset_and_schedule((), self.highlight_delay, now, (column_id, value));
    }

    pub fn cancel_highlight(&mut self) {
        self.highlight.cancel(&());
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.highlight.next_deadline()
    }

    /// Apply the highlight if its delay elapsed; returns whether it fired
    pub fn tick(&mut self, now: Instant, view: &DatagridService) -> bool {
        let due = self.highlight.take_due(now);
        let Some((_, (column_id, value))) = due.into_iter().last() else {
            return false;
        };
        let Some(grid) = &self.grid else {
            return false;
        };
        let config = view.get_same_content_config(&column_id, &value, HIGHLIGHT_CLASS);
        debug!(column = %column_id, rows = config.len(), "highlighting same content");
        grid.borrow_mut().set_cell_css_styles(HIGHLIGHT_CLASS, config);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataMetadata, GridData};
    use crate::grid::{CellPosition, GridView};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn definition(metadata: ColumnMetadata) -> ColumnDefinition {
        ColumnDefinition {
            id: metadata.id.clone(),
            name: metadata.name.clone(),
            width: 8,
            css_class: None,
            header_class: "",
            formatter: CellFormatter::default(),
            metadata: Some(metadata),
        }
    }

    fn index_definition() -> ColumnDefinition {
        ColumnDefinition {
            id: ColumnId::index(),
            name: "#".to_string(),
            metadata: None,
            width: 4,
            css_class: None,
            header_class: "",
            formatter: CellFormatter::default(),
        }
    }

    #[test]
    fn test_update_column_class() {
        let mut columns = vec![
            index_definition(),
            definition(ColumnMetadata::new("0001", "age", "integer")),
            definition(ColumnMetadata::new("0002", "city", "string")),
            definition(ColumnMetadata::new("0003", "price", "double")),
        ];
        let selected = ColumnId::new("0001");

        StyleService::update_column_class(&mut columns, Some(&selected));
        let classes: Vec<Option<String>> = columns.iter().map(|c| c.css_class.clone()).collect();
        assert_eq!(
            classes,
            vec![
                Some("index-column".to_string()),
                Some(" selected numbers".to_string()),
                None,
                Some(" numbers".to_string()),
            ]
        );

        StyleService::update_column_class(&mut columns, Some(&selected));
        let again: Vec<Option<String>> = columns.iter().map(|c| c.css_class.clone()).collect();
        assert_eq!(classes, again);

        StyleService::update_column_class(&mut columns, None);
        assert_eq!(columns[1].css_class.as_deref(), Some(" numbers"));
    }

    #[test]
    fn test_row_marker_wins_over_cell_marker() {
        let formatter = CellFormatter::default();
        let row = Row::new(1, [("0001", "")])
            .with_row_diff(RowDiff::Delete)
            .with_cell_diff("0001", CellDiff::Update);
        assert_eq!(formatter.format("0001", &row), FormattedCell::Deleted(" ".to_string()));

        let row = Row::new(1, [("0001", "x")]).with_row_diff(RowDiff::New);
        assert_eq!(formatter.format("0001", &row), FormattedCell::New("x".to_string()));
    }

    #[test]
    fn test_cell_markers() {
        let formatter = CellFormatter::default();
        let row = Row::new(1, [("a", "1"), ("b", ""), ("c", "")])
            .with_cell_diff("a", CellDiff::Update)
            .with_cell_diff("b", CellDiff::Delete)
            .with_cell_diff("c", CellDiff::New);

        assert_eq!(formatter.format("a", &row), FormattedCell::Updated("1".to_string()));
        assert_eq!(formatter.format("b", &row), FormattedCell::Deleted(" ".to_string()));
        // only deletions and row markers keep a placeholder
        assert_eq!(formatter.format("c", &row), FormattedCell::New(String::new()));
    }

    #[test]
    fn test_invalid_values_are_flagged() {
        let mut metadata = ColumnMetadata::new("0001", "city", "string");
        metadata.quality.invalid_values = vec!["???".to_string()];
        let formatter = StyleService::column_formatter(&metadata);

        let invalid = formatter.format("0001", &Row::new(1, [("0001", "???")]));
        assert_eq!(invalid.class(), Some(INVALID_VALUE_CLASS));
        let valid = formatter.format("0001", &Row::new(2, [("0001", "Paris")]));
        assert_eq!(valid, FormattedCell::Plain { text: "Paris".to_string(), invalid: false });
        assert_eq!(valid.class(), None);
    }

    #[test]
    fn test_adapt_to_grid_constraints() {
        assert_eq!(adapt_to_grid_constraints("  a b "), "··a b·");
        assert_eq!(adapt_to_grid_constraints("line1\r\nline2\tx"), "line1↵line2⇥x");
        assert_eq!(adapt_to_grid_constraints("\u{1b}[31mred\u{1b}[0m"), "red");
        assert_eq!(adapt_to_grid_constraints(""), "");
    }

    #[test]
    fn test_column_preview_style() {
        let mut column = ColumnMetadata::new("0001", "a", "string");
        assert_eq!(StyleService::get_column_preview_style(&column), "");
        column.diff = Some(CellDiff::New);
        assert_eq!(StyleService::get_column_preview_style(&column), "newColumn");
        column.diff = Some(CellDiff::Delete);
        assert_eq!(StyleService::get_column_preview_style(&column), "deletedColumn");
        column.diff = Some(CellDiff::Update);
        assert_eq!(StyleService::get_column_preview_style(&column), "updatedColumn");
    }

    #[test]
    fn test_highlight_is_debounced_and_superseded() {
        let data = GridData {
            metadata: DataMetadata {
                columns: vec![ColumnMetadata::new("0001", "city", "string")],
            },
            records: vec![
                Row::new(1, [("0001", "Paris")]),
                Row::new(2, [("0001", "Lyon")]),
                Row::new(3, [("0001", "Paris")]),
            ],
            preview: false,
        };
        let view = DatagridService::new(Some(Arc::new(data)), Arc::new(Vec::new()));
        let grid = Rc::new(RefCell::new(GridView::new()));
        let mut service = StyleService::default();
        service.init(grid.clone());

        let start = Instant::now();
        let column = ColumnId::new("0001");
        service.schedule_highlight_cells_containing(column.clone(), "Lyon".to_string(), start);
        service.schedule_highlight_cells_containing(column, "Paris".to_string(), start + Duration::from_millis(50));

        assert!(!service.tick(start + Duration::from_millis(200), &view));
        assert!(service.tick(start + Duration::from_millis(250), &view));
        assert!(!service.tick(start + Duration::from_millis(500), &view));

        let grid = grid.borrow();
        let highlight = grid.style_group(HIGHLIGHT_CLASS).unwrap();
        assert_eq!(highlight.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(highlight.class_of(2, "0001"), Some(HIGHLIGHT_CLASS));
    }

    #[test]
    fn test_reset_cell_styles_clears_active_cell() {
        let grid: GridHandle = Rc::new(RefCell::new(GridView::new()));
        let mut service = StyleService::default();
        service.reset_cell_styles();

        service.init(grid.clone());
        grid.borrow_mut().set_active_cell(CellPosition::new(0, 0));
        service.reset_cell_styles();
        assert_eq!(grid.borrow().active_cell(), None);

        service.release();
        assert_eq!(service.next_deadline(), None);
    }
}
