use crate::core::{ColumnMetadata, DatasetMetadata, PlaygroundState, TypeDescriptor};
use std::collections::HashMap;
use crate::tui::{Action, Component, Theme};
use color_eyre::Result;
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// What the lookup panel shows about the selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnInfo {
    pub column: Option<ColumnMetadata>,
    /// Row id and value under the selection
    pub line: Option<(u64, String)>,
    pub dataset: Option<DatasetMetadata>,
    pub filters: Vec<String>,
}

impl ColumnInfo {
    pub fn from_state(state: &PlaygroundState) -> Self {
        Self {
            column: state.selected_column.as_deref().cloned(),
            line: state
                .selected_line
                .as_ref()
                .zip(state.selected_value())
                .map(|(line, value)| (line.tdp_id, value)),
            dataset: state.dataset.as_deref().cloned(),
            filters: state.filters.iter().map(|f| f.label()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.column.is_none() && self.dataset.is_none()
    }
}

/// Lookup panel next to the grid
///
/// Shows the selected column, its quality and the selected value.
#[derive(Debug, Default)]
pub struct ColumnDetails {
    info: ColumnInfo,
    /// Server type id -> display name
    type_names: HashMap<String, String>,
    focused: bool,
}

impl ColumnDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_info(&mut self, info: ColumnInfo) {
        self.info = info;
    }

    pub fn info(&self) -> &ColumnInfo {
        &self.info
    }

    /// Use the server's names for column types
    pub fn set_types(&mut self, types: Vec<TypeDescriptor>) {
        self.type_names = types
            .into_iter()
            .filter(|t| !t.name.is_empty())
            .map(|t| (t.id.to_ascii_lowercase(), t.name))
            .collect();
    }

    fn type_name<'a>(&'a self, column: &'a ColumnMetadata) -> &'a str {
        self.type_names
            .get(&column.column_type.to_ascii_lowercase())
            .map_or(column.column_type.as_str(), String::as_str)
    }

    fn lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        let field = |label: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{label}: "), theme.header_style()),
                Span::styled(value, theme.normal_style()),
            ])
        };

        let mut lines = Vec::new();
        if let Some(dataset) = &self.info.dataset {
            lines.push(field("Dataset", dataset.name.clone()));
            if !dataset.author.is_empty() {
                lines.push(field("Author", dataset.author.clone()));
            }
            if let Some(created) = dataset.created_at() {
                lines.push(field("Created", created.format("%Y-%m-%d %H:%M").to_string()));
            }
            lines.push(Line::default());
        }

        match &self.info.column {
            Some(column) => {
                lines.push(field("Column", format!("{} ({})", column.name, self.type_name(column))));
                if !column.domain.is_empty() {
                    lines.push(field("Domain", column.domain.clone()));
                }
                let quality = &column.quality;
                lines.push(field(
                    "Quality",
                    format!("{} valid, {} empty, {} invalid", quality.valid, quality.empty, quality.invalid),
                ));
            }
            None => lines.push(Line::styled("No column selected", theme.dim_style())),
        }

        if let Some((tdp_id, value)) = &self.info.line {
            lines.push(Line::default());
            lines.push(field("Row", tdp_id.to_string()));
            lines.push(Line::styled(value.clone(), theme.info_style()));
        }

        if !self.info.filters.is_empty() {
            lines.push(Line::default());
            lines.push(Line::styled("Filters", theme.header_style()));
            for filter in &self.info.filters {
                lines.push(Line::styled(format!("  {filter}"), theme.warning_style()));
            }
        }
        lines
    }
}

impl Component for ColumnDetails {
    fn handle_action(&mut self, _action: Action) -> Result<bool> {
        Ok(false)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Lookup")
            .border_style(if self.focused {
                theme.focused_border_style()
            } else {
                theme.border_style()
            });
        let details = Paragraph::new(self.lines(theme))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(details, area);
    }

    fn supported_actions(&self) -> &[Action] {
        &[]
    }

    fn name(&self) -> &str {
        "ColumnDetails"
    }
}
