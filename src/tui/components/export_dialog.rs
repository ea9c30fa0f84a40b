use crate::core::ExportType;
use crate::tui::{Action, Component, Theme};
use color_eyre::Result;
use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState},
};

/// Export format picker
///
/// Opens on the server's default format.
#[derive(Debug, Default)]
pub struct ExportDialog {
    types: Option<Vec<ExportType>>,
    selected: usize,
    error: Option<String>,
}

impl ExportDialog {
    /// Dialog waiting for the formats
    pub fn loading() -> Self {
        Self::default()
    }

    pub fn set_types(&mut self, types: Vec<ExportType>) {
        self.selected = types.iter().position(|t| t.default_export).unwrap_or(0);
        self.types = Some(types);
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn selected(&self) -> Option<&ExportType> {
        self.types.as_ref()?.get(self.selected)
    }
}

impl Component for ExportDialog {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        let count = self.types.as_ref().map_or(0, Vec::len);
        if count == 0 {
            return Ok(false);
        }
        match action {
            Action::MoveUp => self.selected = self.selected.saturating_sub(1),
            Action::MoveDown => self.selected = (self.selected + 1).min(count - 1),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let width = 40.min(area.width);
        let height = 12.min(area.height);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title("Export")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(theme.focused_border_style());

        let items: Vec<ListItem> = match (&self.types, &self.error) {
            (_, Some(error)) => vec![ListItem::new(Line::styled(error.clone(), theme.error_style()))],
            (None, None) => vec![ListItem::new(Line::styled("Loading formats...", theme.info_style()))],
            (Some(types), None) => types
                .iter()
                .map(|t| ListItem::new(format!("{} (.{})", t.id, t.extension)))
                .collect(),
        };
        let mut state = ListState::default().with_selected(self.selected().map(|_| self.selected));
        let list = List::new(items).block(block).highlight_style(theme.selected_style());
        frame.render_stateful_widget(list, popup, &mut state);
    }

    fn supported_actions(&self) -> &[Action] {
        &[Action::MoveUp, Action::MoveDown, Action::Confirm, Action::Cancel]
    }

    fn name(&self) -> &str {
        "ExportDialog"
    }
}
