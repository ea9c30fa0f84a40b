use crate::grid::GridWidget;
use crate::services::column_service::ColumnDefinition;
use crate::services::datagrid_service::DatagridService;
use serde::{Deserialize, Serialize};

/// Cells added around the widest content
const PADDING: u16 = 2;

/// Column sizing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub min_width: u16,
    pub max_width: u16,
    /// Rows inspected to size a column
    pub sample_rows: usize,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            min_width: 6,
            max_width: 40,
            sample_rows: 100,
        }
    }
}

/// Sizes the columns and installs them on the widget
pub trait SizeService {
    fn autosize_columns(&self, grid: &mut dyn GridWidget, columns: Vec<ColumnDefinition>, view: &DatagridService);
}

#[derive(Debug, Clone, Default)]
pub struct DatagridSizeService {
    config: ColumnsConfig,
}

impl DatagridSizeService {
    pub fn new(config: ColumnsConfig) -> Self {
        Self { config }
    }

    /// Width fitting the header, the type label and a sample of values
    pub fn column_width(&self, column: &ColumnDefinition, view: &DatagridService) -> u16 {
        let header = column.name.chars().count();
        let type_label = column
            .metadata
            .as_ref()
            .map(|m| m.simplified_type().as_str().len())
            .unwrap_or(0);
        let content = view
            .sample(self.config.sample_rows)
            .map(|row| column.formatter.format(column.id.as_str(), row).text().chars().count())
            .max()
            .unwrap_or(0);

        let widest = header.max(type_label).max(content);
        let width = u16::try_from(widest).unwrap_or(u16::MAX).saturating_add(PADDING);
        width.clamp(self.config.min_width, self.config.max_width.max(self.config.min_width))
    }
}

impl SizeService for DatagridSizeService {
    fn autosize_columns(&self, grid: &mut dyn GridWidget, mut columns: Vec<ColumnDefinition>, view: &DatagridService) {
        for column in columns.iter_mut().filter(|c| c.width == 0) {
            column.width = self.column_width(column, view);
        }
        grid.set_columns(columns);
    }
}
