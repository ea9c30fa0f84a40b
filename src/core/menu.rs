//! Transformation menus offered by the server for a column
//!
//! The server describes a menu with loosely typed flags (`parameters`,
//! `items`, `dynamic`). They are resolved once into [`MenuKind`] when the
//! menu is decoded so the rest of the client matches on a closed enum.

use crate::core::types::{ColumnId, DatasetId, PreparationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters sent along with a transformation step
pub type Params = serde_json::Map<String, Value>;

/// One editable parameter of a transformation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Filled by the client (column id, scope...) and never shown
    #[serde(default)]
    pub implicit: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Default value rendered as editable text
    pub fn default_text(&self) -> String {
        match &self.default {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A selectable value of a choice, possibly carrying its own parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceValue {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// A named list of exclusive values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub values: Vec<ChoiceValue>,
}

/// How a menu collects its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum MenuKind {
    /// Applied right away
    Simple,
    /// Needs a parameter form, optionally with choices
    ParameterForm {
        parameters: Vec<Parameter>,
        choices: Vec<Choice>,
    },
    /// Needs the user to pick among choices
    ChoiceForm(Vec<Choice>),
    /// Parameters are computed by the server for the current column
    DynamicForm,
}

impl MenuKind {
    pub fn needs_modal(&self) -> bool {
        !matches!(self, Self::Simple)
    }
}

/// Menu as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransformMenu {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub items: Vec<Choice>,
    #[serde(default)]
    pub dynamic: bool,
}

/// A transformation the user can apply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTransformMenu")]
pub struct TransformMenu {
    pub name: String,
    pub label: String,
    pub category: String,
    pub description: String,
    pub kind: MenuKind,
}

impl From<RawTransformMenu> for TransformMenu {
    fn from(raw: RawTransformMenu) -> Self {
        // parameters first, then choices, then the dynamic flag
        let kind = if !raw.parameters.is_empty() {
            MenuKind::ParameterForm {
                parameters: raw.parameters,
                choices: raw.items,
            }
        } else if !raw.items.is_empty() {
            MenuKind::ChoiceForm(raw.items)
        } else if raw.dynamic {
            MenuKind::DynamicForm
        } else {
            MenuKind::Simple
        };

        Self {
            label: raw.label.unwrap_or_else(|| raw.name.clone()),
            name: raw.name,
            category: raw.category,
            description: raw.description.unwrap_or_default(),
            kind,
        }
    }
}

impl TransformMenu {
    pub fn simple(name: impl Into<String>, category: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            category: category.into(),
            description: String::new(),
            kind: MenuKind::Simple,
        }
    }

    pub fn with_kind(mut self, kind: MenuKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Cluster of similar values proposed for replacement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub replace: Option<Parameter>,
}

/// Parameters computed by the server for a dynamic menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "lowercase")]
pub enum DynamicParameters {
    Parameters(Vec<Parameter>),
    Cluster(Vec<Cluster>),
}

impl DynamicParameters {
    /// Flattened editable parameters
    pub fn parameters(&self) -> Vec<Parameter> {
        match self {
            Self::Parameters(params) => params.clone(),
            Self::Cluster(clusters) => clusters
                .iter()
                .flat_map(|c| c.parameters.iter().chain(c.replace.iter()).cloned())
                .collect(),
        }
    }
}

/// Key of a dynamic parameter request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicParamsRequest {
    pub column_id: ColumnId,
    pub dataset_id: DatasetId,
    pub preparation_id: Option<PreparationId>,
}
