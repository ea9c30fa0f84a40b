use crate::grid::{CellPosition, GridWidget, RowStyleMap};
use crate::services::column_service::ColumnDefinition;
use crate::services::datagrid_service::DatagridService;
use crate::tui::Theme;
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Cell, Row, Table},
};
use std::collections::HashMap;
use tracing::trace;

/// Rows taken by borders and the two header lines
const CHROME_HEIGHT: u16 = 4;

/// Viewport into the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// First visible row
    pub top: usize,
    /// First visible column
    pub left: usize,
    /// Visible rows
    pub height: usize,
    /// Canvas width in cells
    pub width: u16,
}

/// Terminal spreadsheet widget
///
/// Rows are addressed by their index in the filtered view. Layout uses the
/// canvas size, which follows the render area only when
/// [`GridWidget::resize_canvas`] is called.
#[derive(Debug, Default)]
pub struct GridView {
    columns: Vec<ColumnDefinition>,
    style_groups: HashMap<String, RowStyleMap>,
    active: Option<CellPosition>,
    viewport: Viewport,
    last_area: Option<Rect>,
    canvas: Option<Rect>,
    dirty: bool,
    focused: bool,
}

impl GridView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn style_group(&self, key: &str) -> Option<&RowStyleMap> {
        self.style_groups.get(key)
    }

    fn apply_canvas(&mut self, canvas: Rect) {
        self.canvas = Some(canvas);
        self.viewport.height = canvas.height.saturating_sub(CHROME_HEIGHT).max(1) as usize;
        self.viewport.width = canvas.width.saturating_sub(2);
    }

    /// Number of columns that fit from `left` in the canvas width
    fn visible_column_count(&self, left: usize) -> usize {
        let mut used: u16 = 0;
        let mut count = 0;
        for column in self.columns.iter().skip(left) {
            let needed = column.width.saturating_add(1);
            if count > 0 && used.saturating_add(needed) > self.viewport.width {
                break;
            }
            used = used.saturating_add(needed);
            count += 1;
        }
        count
    }

    fn ensure_visible(&mut self, position: CellPosition) {
        let height = self.viewport.height.max(1);
        if position.row < self.viewport.top {
            self.viewport.top = position.row;
        } else if position.row >= self.viewport.top + height {
            self.viewport.top = position.row + 1 - height;
        }
        self.ensure_column_visible(position.col);
    }

    fn ensure_column_visible(&mut self, col: usize) {
        if col < self.viewport.left {
            self.viewport.left = col;
            return;
        }
        while self.viewport.left < col && self.viewport.left + self.visible_column_count(self.viewport.left) <= col
        {
            self.viewport.left += 1;
        }
    }

    fn cell_style(&self, theme: &Theme, base: Style, row: usize, column: &ColumnDefinition, class: Option<&str>) -> Style {
        let mut style = base;
        if let Some(css) = &column.css_class {
            for name in css.split_whitespace() {
                style = style.patch(theme.class_style(name));
            }
        }
        if let Some(class) = class {
            style = style.patch(theme.class_style(class));
        }
        for group in self.style_groups.values() {
            if let Some(class) = group.class_of(row, column.id.as_str()) {
                style = style.patch(theme.class_style(class));
            }
        }
        style
    }
}

impl GridWidget for GridView {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn columns_mut(&mut self) -> &mut [ColumnDefinition] {
        &mut self.columns
    }

    fn set_columns(&mut self, columns: Vec<ColumnDefinition>) {
        self.columns = columns;
        if let Some(active) = self.active {
            if active.col >= self.columns.len() {
                self.active = None;
            }
        }
        self.viewport.left = self.viewport.left.min(self.columns.len().saturating_sub(1));
        self.dirty = true;
    }

    fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn scroll_row_to_top(&mut self) {
        self.viewport.top = 0;
        self.dirty = true;
    }

    fn scroll_to_column(&mut self, index: usize) {
        if index < self.columns.len() {
            self.ensure_column_visible(index);
            self.dirty = true;
        }
    }

    fn resize_canvas(&mut self) {
        if let Some(area) = self.last_area {
            trace!(width = area.width, height = area.height, "grid canvas resized");
            self.apply_canvas(area);
            if let Some(active) = self.active {
                self.ensure_visible(active);
            }
            self.dirty = true;
        }
    }

    fn visible_rows(&self) -> usize {
        self.viewport.height.max(1)
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn active_cell(&self) -> Option<CellPosition> {
        self.active
    }

    fn set_active_cell(&mut self, position: CellPosition) {
        self.active = Some(position);
        self.ensure_visible(position);
        self.dirty = true;
    }

    fn reset_active_cell(&mut self) {
        self.active = None;
        self.dirty = true;
    }

    fn set_cell_css_styles(&mut self, key: &str, styles: RowStyleMap) {
        self.style_groups.insert(key.to_string(), styles);
        self.dirty = true;
    }

    fn remove_cell_css_styles(&mut self, key: &str) {
        if self.style_groups.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, view: &DatagridService, theme: &Theme) {
        self.last_area = Some(area);
        if self.canvas.is_none() {
            self.apply_canvas(area);
        }

        let left = self.viewport.left.min(self.columns.len().saturating_sub(1));
        let shown = self.visible_column_count(left);
        let columns = &self.columns[left.min(self.columns.len())..(left + shown).min(self.columns.len())];

        let header = Row::new(columns.iter().map(|column| {
            let mut style = theme.header_style().patch(theme.class_style(column.header_class));
            if column.css_class.as_deref().is_some_and(|c| c.contains("selected")) {
                style = style.patch(theme.class_style("selected"));
            }
            let type_label = column
                .metadata
                .as_ref()
                .map(|m| m.simplified_type().as_str())
                .unwrap_or_default();
            Cell::from(vec![Line::from(column.name.clone()), Line::from(type_label).style(theme.dim_style())])
                .style(style)
        }))
        .height(2);

        let last = (self.viewport.top + self.viewport.height).min(view.row_count());
        let rows: Vec<Row> = (self.viewport.top..last)
            .filter_map(|index| view.row(index).map(|record| (index, record)))
            .map(|(index, record)| {
                let base = if index % 2 == 1 {
                    theme.alt_row_style()
                } else {
                    theme.normal_style()
                };
                let cells = columns.iter().enumerate().map(|(offset, column)| {
                    let formatted = column.formatter.format(column.id.as_str(), record);
                    let mut style = self.cell_style(theme, base, index, column, formatted.class());
                    if self.active == Some(CellPosition::new(index, left + offset)) {
                        style = theme.selected_cell_style();
                    }
                    let line = if column.is_numeric() {
                        Line::from(formatted.text().to_string()).right_aligned()
                    } else {
                        Line::from(formatted.text().to_string())
                    };
                    Cell::from(line).style(style)
                });
                Row::new(cells)
            })
            .collect();

        let widths: Vec<Constraint> = columns.iter().map(|c| Constraint::Length(c.width)).collect();
        let title = match self.active {
            Some(active) => format!("Grid [{}/{}]", active.row + 1, view.row_count()),
            None => format!("Grid [{} rows]", view.row_count()),
        };
        let table = Table::new(rows, widths).header(header).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(if self.focused {
                    theme.focused_border_style()
                } else {
                    theme.border_style()
                }),
        );

        frame.render_widget(table, area);
        self.dirty = false;
    }
}
