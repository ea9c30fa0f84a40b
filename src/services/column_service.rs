use crate::core::{ColumnId, ColumnMetadata, SimplifiedType};
use crate::services::style_service::{CellFormatter, StyleService};
use std::collections::HashMap;
use tracing::debug;

/// Header label of the synthetic row-id column
pub const INDEX_COLUMN_NAME: &str = "#";

/// A grid column built from server metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub id: ColumnId,
    pub name: String,
    /// `None` for the synthetic index column
    pub metadata: Option<ColumnMetadata>,
    /// Width in cells; zero until sized
    pub width: u16,
    pub css_class: Option<String>,
    /// Header preview class
    pub header_class: &'static str,
    pub formatter: CellFormatter,
}

impl ColumnDefinition {
    pub fn index() -> Self {
        Self {
            id: ColumnId::index(),
            name: INDEX_COLUMN_NAME.to_string(),
            metadata: None,
            width: 0,
            css_class: None,
            header_class: "",
            formatter: CellFormatter::default(),
        }
    }

    pub fn from_metadata(metadata: &ColumnMetadata) -> Self {
        Self {
            id: metadata.id.clone(),
            name: metadata.name.clone(),
            width: 0,
            css_class: None,
            header_class: StyleService::get_column_preview_style(metadata),
            formatter: StyleService::column_formatter(metadata),
            metadata: Some(metadata.clone()),
        }
    }

    pub fn simplified_type(&self) -> SimplifiedType {
        match &self.metadata {
            Some(metadata) => metadata.simplified_type(),
            None => SimplifiedType::Integer,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.simplified_type().is_number()
    }
}

/// Builds grid column definitions from column metadata
pub trait ColumnService {
    fn create_columns(&mut self, columns: &[ColumnMetadata], preview: bool) -> Vec<ColumnDefinition>;

    /// When set, the next creation rebuilds every column from scratch
    fn renew_all_columns(&mut self, renew: bool);

    /// Called with the columns displayed once they are sized
    fn remember_columns(&mut self, _displayed: &[ColumnDefinition]) {}
}

/// Default column service
///
/// Definitions are cached by column id. An ordinary refresh keeps the
/// cached width and classes; a renew or a preview rebuilds them.
#[derive(Debug, Default)]
pub struct DatagridColumnService {
    cache: HashMap<ColumnId, ColumnDefinition>,
    renew_all: bool,
}

impl DatagridColumnService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_renewing_all(&self) -> bool {
        self.renew_all
    }

    fn reuse_or_create(&self, metadata: &ColumnMetadata, rebuild: bool) -> ColumnDefinition {
        let mut definition = ColumnDefinition::from_metadata(metadata);
        if !rebuild {
            if let Some(cached) = self.cache.get(&metadata.id) {
                definition.width = cached.width;
                definition.css_class = cached.css_class.clone();
            }
        }
        definition
    }
}

impl ColumnService for DatagridColumnService {
    fn create_columns(&mut self, columns: &[ColumnMetadata], preview: bool) -> Vec<ColumnDefinition> {
        let rebuild = self.renew_all || preview;
        debug!(columns = columns.len(), preview, rebuild, "creating grid columns");

        let mut index = self
            .cache
            .get(&ColumnId::index())
            .filter(|_| !rebuild)
            .cloned()
            .unwrap_or_else(ColumnDefinition::index);
        index.css_class = None;

        std::iter::once(index)
            .chain(columns.iter().map(|metadata| self.reuse_or_create(metadata, rebuild)))
            .collect()
    }

    fn renew_all_columns(&mut self, renew: bool) {
        self.renew_all = renew;
        if renew {
            self.cache.clear();
        }
    }

    fn remember_columns(&mut self, displayed: &[ColumnDefinition]) {
        self.cache = displayed.iter().map(|c| (c.id.clone(), c.clone())).collect();
    }
}
