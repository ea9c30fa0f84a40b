use crate::core::{ColumnId, Filter, FilterKind, GridData, Row};
use crate::grid::RowStyleMap;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

/// Style group name of the same value highlight
pub const HIGHLIGHT_CLASS: &str = "highlight";

/// A filter ready to be evaluated against rows
#[derive(Debug, Clone)]
enum CompiledFilter {
    Exact(String, String),
    Contains(String, String),
    Matches(String, Regex),
    Empty(String),
    Invalid(String, Vec<String>),
    Range(String, f64, f64),
}

impl CompiledFilter {
    fn compile(filter: &Filter, data: &GridData) -> Option<Self> {
        let column = filter.column_id.as_str().to_string();
        Some(match &filter.kind {
            FilterKind::Exact(value) => Self::Exact(column, value.clone()),
            FilterKind::Contains(value) => Self::Contains(column, value.to_lowercase()),
            FilterKind::Matches(pattern) => match Regex::new(pattern) {
                Ok(regex) => Self::Matches(column, regex),
                Err(e) => {
                    warn!(pattern, "ignoring filter with invalid pattern: {e}");
                    return None;
                }
            },
            FilterKind::Empty => Self::Empty(column),
            FilterKind::Invalid => {
                let invalid = data
                    .column(&column)
                    .map(|c| c.quality.invalid_values.clone())
                    .unwrap_or_default();
                Self::Invalid(column, invalid)
            }
            FilterKind::Range { min, max } => Self::Range(column, *min, *max),
        })
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Exact(column, value) => row.cell_text(column) == *value,
            Self::Contains(column, value) => row.cell_text(column).to_lowercase().contains(value),
            Self::Matches(column, regex) => regex.is_match(&row.cell_text(column)),
            Self::Empty(column) => row.cell_text(column).trim().is_empty(),
            Self::Invalid(column, invalid) => {
                let text = row.cell_text(column);
                invalid.iter().any(|v| *v == text)
            }
            Self::Range(column, min, max) => row
                .cell_text(column)
                .trim()
                .parse::<f64>()
                .is_ok_and(|n| n >= *min && n <= *max),
        }
    }
}

/// Filtered view over the grid data
///
/// Rows are addressed by their position in the view. A row is visible when
/// it satisfies every filter.
#[derive(Debug, Clone, Default)]
pub struct DatagridService {
    data: Option<Arc<GridData>>,
    filters: Arc<Vec<Filter>>,
    visible: Vec<usize>,
}

impl DatagridService {
    pub fn new(data: Option<Arc<GridData>>, filters: Arc<Vec<Filter>>) -> Self {
        let mut service = Self {
            data,
            filters,
            visible: Vec::new(),
        };
        service.refresh();
        service
    }

    /// Point the view at new data or filters; returns whether anything changed
    pub fn update(&mut self, data: Option<Arc<GridData>>, filters: Arc<Vec<Filter>>) -> bool {
        let same_data = match (&self.data, &data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same_data && Arc::ptr_eq(&self.filters, &filters) {
            return false;
        }
        self.data = data;
        self.filters = filters;
        self.refresh();
        true
    }

    fn refresh(&mut self) {
        let Some(data) = &self.data else {
            self.visible.clear();
            return;
        };
        let compiled: Vec<CompiledFilter> = self
            .filters
            .iter()
            .filter_map(|f| CompiledFilter::compile(f, data))
            .collect();
        self.visible = data
            .records
            .iter()
            .enumerate()
            .filter(|(_, row)| compiled.iter().all(|f| f.matches(row)))
            .map(|(index, _)| index)
            .collect();
    }

    pub fn data(&self) -> Option<&GridData> {
        self.data.as_deref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn row_count(&self) -> usize {
        self.visible.len()
    }

    /// Row at a view position
    pub fn row(&self, index: usize) -> Option<&Row> {
        let data = self.data.as_ref()?;
        data.records.get(*self.visible.get(index)?)
    }

    /// View position of the row with this id
    pub fn index_of(&self, tdp_id: u64) -> Option<usize> {
        let data = self.data.as_ref()?;
        self.visible
            .iter()
            .position(|&i| data.records.get(i).is_some_and(|r| r.tdp_id == tdp_id))
    }

    /// Rows of the first records in view, for sizing
    pub fn sample(&self, count: usize) -> impl Iterator<Item = &Row> {
        (0..self.row_count().min(count)).filter_map(|i| self.row(i))
    }

    /// Style group marking every visible cell of `column_id` equal to `value`
    pub fn get_same_content_config(&self, column_id: &ColumnId, value: &str, class: &str) -> RowStyleMap {
        let mut config = RowStyleMap::new();
        for index in 0..self.row_count() {
            if let Some(row) = self.row(index) {
                if row.cell_text(column_id.as_str()) == value {
                    config.insert_cell(index, column_id.as_str(), class);
                }
            }
        }
        config
    }
}
