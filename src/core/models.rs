use crate::core::types::{CellDiff, ColumnId, DatasetId, RowDiff, SimplifiedType, simplify_type};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Quality statistics computed by the server for a column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    #[serde(default)]
    pub empty: u64,
    #[serde(default)]
    pub invalid: u64,
    #[serde(default)]
    pub valid: u64,
    #[serde(default)]
    pub invalid_values: Vec<String>,
}

/// Column description as sent by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub id: ColumnId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub quality: Quality,
    /// Column level preview marker
    #[serde(rename = "__tdpColumnDiff", default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<CellDiff>,
}

impl ColumnMetadata {
    pub fn new(id: impl Into<ColumnId>, name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            column_type: column_type.into(),
            ..Default::default()
        }
    }

    pub fn simplified_type(&self) -> SimplifiedType {
        simplify_type(&self.column_type)
    }
}

/// Dataset description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub id: DatasetId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub records: u64,
    /// Creation date in milliseconds since epoch
    #[serde(default)]
    pub created: Option<i64>,
}

impl DatasetMetadata {
    pub fn new(id: impl Into<DatasetId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.and_then(DateTime::from_timestamp_millis)
    }
}

/// Column metadata attached to loaded records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataMetadata {
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

/// One record of the grid
///
/// Values are keyed by column id. Preview markers ride along with the values
/// and never change them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "tdpId", default)]
    pub tdp_id: u64,
    #[serde(rename = "__tdpRowDiff", default, skip_serializing_if = "Option::is_none")]
    pub row_diff: Option<RowDiff>,
    #[serde(rename = "__tdpDiff", default, skip_serializing_if = "HashMap::is_empty")]
    pub cell_diff: HashMap<String, CellDiff>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl Row {
    pub fn new<I, K, V>(tdp_id: u64, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            tdp_id,
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ..Default::default()
        }
    }

    pub fn with_row_diff(mut self, diff: RowDiff) -> Self {
        self.row_diff = Some(diff);
        self
    }

    pub fn with_cell_diff(mut self, column_id: &str, diff: CellDiff) -> Self {
        self.cell_diff.insert(column_id.to_string(), diff);
        self
    }

    /// Raw value of a cell rendered as text; missing and null values are empty
    pub fn cell_text(&self, column_id: &str) -> String {
        if column_id == crate::core::types::INDEX_COLUMN_ID {
            return self.tdp_id.to_string();
        }
        match self.values.get(column_id) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Records plus the metadata describing them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridData {
    #[serde(default)]
    pub metadata: DataMetadata,
    #[serde(default)]
    pub records: Vec<Row>,
    /// Set when the records are a speculative transformation result
    #[serde(default)]
    pub preview: bool,
}

impl GridData {
    pub fn column(&self, id: &str) -> Option<&ColumnMetadata> {
        self.metadata.columns.iter().find(|c| c.id.as_str() == id)
    }

    pub fn row_by_tdp_id(&self, tdp_id: u64) -> Option<&Row> {
        self.records.iter().find(|r| r.tdp_id == tdp_id)
    }
}

/// Metadata block of a content response: dataset fields plus columns
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentMetadata {
    #[serde(flatten)]
    pub dataset: DatasetMetadata,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

/// Dataset or preparation content as returned by the server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetContent {
    pub metadata: ContentMetadata,
    #[serde(default)]
    pub records: Vec<Row>,
}

impl DatasetContent {
    pub fn into_parts(self) -> (DatasetMetadata, GridData) {
        let data = GridData {
            metadata: DataMetadata {
                columns: self.metadata.columns,
            },
            records: self.records,
            preview: false,
        };
        (self.metadata.dataset, data)
    }
}

/// A grid filter predicate on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column_id: ColumnId,
    pub column_name: String,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum FilterKind {
    /// Cell text equals the value
    Exact(String),
    /// Cell text contains the value, case insensitive
    Contains(String),
    /// Cell text matches the regular expression
    Matches(String),
    /// Cell is empty or whitespace
    Empty,
    /// Cell value is listed in the column invalid values
    Invalid,
    /// Cell is a number within the inclusive bounds
    Range { min: f64, max: f64 },
}

impl Filter {
    pub fn new(column: &ColumnMetadata, kind: FilterKind) -> Self {
        Self {
            column_id: column.id.clone(),
            column_name: column.name.clone(),
            kind,
        }
    }

    pub fn exact(column: &ColumnMetadata, value: impl Into<String>) -> Self {
        Self::new(column, FilterKind::Exact(value.into()))
    }

    /// Short human readable description
    pub fn label(&self) -> String {
        match &self.kind {
            FilterKind::Exact(v) => format!("{} = '{}'", self.column_name, v),
            FilterKind::Contains(v) => format!("{} contains '{}'", self.column_name, v),
            FilterKind::Matches(v) => format!("{} ~ /{}/", self.column_name, v),
            FilterKind::Empty => format!("{} is empty", self.column_name),
            FilterKind::Invalid => format!("{} is invalid", self.column_name),
            FilterKind::Range { min, max } => format!("{} in [{}, {}]", self.column_name, min, max),
        }
    }
}

/// Accepts `true` as well as `"true"`
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::Str(s) => s.eq_ignore_ascii_case("true"),
    })
}

/// A value offered by an export parameter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportValue {
    pub value: String,
    #[serde(default)]
    pub label_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParameter {
    pub name: String,
    #[serde(default)]
    pub label_key: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub default_value: Option<ExportValue>,
    #[serde(default)]
    pub values: Vec<ExportValue>,
}

/// Export format descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportType {
    pub mime_type: String,
    pub extension: String,
    pub id: String,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub need_parameters: bool,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub default_export: bool,
    #[serde(default)]
    pub parameters: Vec<ExportParameter>,
}

impl ExportType {
    /// Parameter values to use when the user does not pick any
    pub fn default_parameters(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .filter_map(|p| {
                p.default_value
                    .as_ref()
                    .map(|v| (p.name.clone(), v.value.clone()))
            })
            .collect()
    }
}

/// Column type known by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label_key: Option<String>,
}
