use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a string-backed identifier newtype
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a dataset on the preparation server
    DatasetId
);
string_id!(
    /// Identifier of a preparation (a dataset plus its pipeline of steps)
    PreparationId
);
string_id!(
    /// Identifier of a column inside a dataset (e.g. `0001`)
    ColumnId
);

/// Id of the synthetic row-number column
pub const INDEX_COLUMN_ID: &str = "tdpId";

impl ColumnId {
    /// The synthetic row-id column
    pub fn index() -> Self {
        Self(INDEX_COLUMN_ID.to_string())
    }

    pub fn is_index(&self) -> bool {
        self.0 == INDEX_COLUMN_ID
    }
}

/// Row level preview marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowDiff {
    New,
    Delete,
}

/// Cell or column level preview marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellDiff {
    New,
    Update,
    Delete,
}

/// Coarse type family used for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifiedType {
    Integer,
    Decimal,
    Boolean,
    Text,
    Date,
    Unknown,
}

impl SimplifiedType {
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Date => "date",
            Self::Unknown => "unknown",
        }
    }
}

/// Map a server column type to its simplified family
pub fn simplify_type(raw_type: &str) -> SimplifiedType {
    match raw_type.to_ascii_lowercase().as_str() {
        "numeric" | "integer" => SimplifiedType::Integer,
        "double" | "float" | "decimal" => SimplifiedType::Decimal,
        "boolean" => SimplifiedType::Boolean,
        "string" | "char" => SimplifiedType::Text,
        "date" => SimplifiedType::Date,
        _ => SimplifiedType::Unknown,
    }
}

/// Scope a transformation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Column,
    Line,
    Cell,
    Dataset,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Line => "line",
            Self::Cell => "cell",
            Self::Dataset => "dataset",
        }
    }
}
