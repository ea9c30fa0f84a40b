use crate::core::ColumnId;
use crate::core::menu::TransformMenu;
use crate::tui::{Action, Component, Focusable, Theme};
use color_eyre::Result;
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Empty,
    Loading,
    Menus(Vec<TransformMenu>),
    Failed(String),
}

/// Transformations offered for the selected column, grouped by category
#[derive(Debug)]
pub struct TransformPanel {
    column: Option<ColumnId>,
    content: Content,
    selected: usize,
    visible: bool,
    focused: bool,
    supported_actions: Vec<Action>,
}

impl Default for TransformPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPanel {
    pub fn new() -> Self {
        Self {
            column: None,
            content: Content::Empty,
            selected: 0,
            visible: false,
            focused: false,
            supported_actions: vec![
                Action::MoveUp,
                Action::MoveDown,
                Action::PageUp,
                Action::PageDown,
                Action::GoToTop,
                Action::GoToBottom,
            ],
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.focused = false;
        }
    }

    pub fn column(&self) -> Option<&ColumnId> {
        self.column.as_ref()
    }

    pub fn set_loading(&mut self, column: ColumnId) {
        self.column = Some(column);
        self.content = Content::Loading;
        self.selected = 0;
    }

    /// Show the menus fetched for `column`; results for another column are dropped
    pub fn set_menus(&mut self, column: &ColumnId, mut menus: Vec<TransformMenu>) -> bool {
        if self.column.as_ref() != Some(column) {
            return false;
        }
        menus.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.label.cmp(&b.label)));
        self.content = Content::Menus(menus);
        self.selected = 0;
        true
    }

    pub fn set_error(&mut self, column: &ColumnId, message: String) {
        if self.column.as_ref() == Some(column) {
            self.content = Content::Failed(message);
        }
    }

    pub fn clear(&mut self) {
        self.column = None;
        self.content = Content::Empty;
        self.selected = 0;
    }

    pub fn menus(&self) -> &[TransformMenu] {
        match &self.content {
            Content::Menus(menus) => menus,
            _ => &[],
        }
    }

    pub fn selected(&self) -> Option<&TransformMenu> {
        self.menus().get(self.selected)
    }

    fn items(&self, theme: &Theme) -> (Vec<ListItem<'static>>, Option<usize>) {
        let mut grouped: BTreeMap<&str, Vec<(usize, &TransformMenu)>> = BTreeMap::new();
        for (i, menu) in self.menus().iter().enumerate() {
            grouped.entry(menu.category.as_str()).or_default().push((i, menu));
        }

        let mut items = Vec::new();
        let mut highlighted = None;
        for (category, menus) in grouped {
            items.push(ListItem::new(Line::styled(category.to_uppercase(), theme.dim_style())));
            for (i, menu) in menus {
                if i == self.selected {
                    highlighted = Some(items.len());
                }
                let marker = if menu.kind.needs_modal() { "..." } else { "" };
                items.push(ListItem::new(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(format!("{}{marker}", menu.label), theme.normal_style()),
                ])));
            }
        }
        (items, highlighted)
    }
}

impl Component for TransformPanel {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        let count = self.menus().len();
        if count == 0 || !self.supported_actions.contains(&action) {
            return Ok(false);
        }
        let last = count - 1;
        self.selected = match action {
            Action::MoveUp => self.selected.saturating_sub(1),
            Action::MoveDown => (self.selected + 1).min(last),
            Action::PageUp => self.selected.saturating_sub(10),
            Action::PageDown => (self.selected + 10).min(last),
            Action::GoToTop => 0,
            Action::GoToBottom => last,
            _ => return Ok(false),
        };
        Ok(true)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Transformations")
            .border_style(if self.focused {
                theme.focused_border_style()
            } else {
                theme.border_style()
            });

        let (items, highlighted) = match &self.content {
            Content::Empty => (
                vec![ListItem::new(Line::styled("Select a column", theme.dim_style()))],
                None,
            ),
            Content::Loading => (
                vec![ListItem::new(Line::styled("Loading...", theme.info_style()))],
                None,
            ),
            Content::Failed(message) => (
                vec![ListItem::new(Line::styled(message.clone(), theme.error_style()))],
                None,
            ),
            Content::Menus(menus) if menus.is_empty() => (
                vec![ListItem::new(Line::styled("No transformation available", theme.dim_style()))],
                None,
            ),
            Content::Menus(_) => self.items(theme),
        };

        let mut state = ListState::default().with_selected(highlighted);
        let list = List::new(items).block(block).highlight_style(theme.selected_style());
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn supported_actions(&self) -> &[Action] {
        &self.supported_actions
    }

    fn name(&self) -> &str {
        "TransformPanel"
    }
}

impl Focusable for TransformPanel {
    fn is_focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused && self.visible;
    }
}
