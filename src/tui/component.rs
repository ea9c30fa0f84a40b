use crate::tui::action::Action;
use crate::tui::theme::Theme;
use color_eyre::Result;
use ratatui::{Frame, layout::Rect};

/// Base trait for all TUI components
///
/// All interactive UI elements implement this trait to provide consistent
/// behavior for action handling, rendering, and component lifecycle.
pub trait Component {
    /// Handle an action
    ///
    /// Returns Ok(true) if the action was handled and consumed.
    /// Returns Ok(false) if the action was not handled and should propagate.
    fn handle_action(&mut self, action: Action) -> Result<bool>;

    /// Render the component within the given area
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Get list of actions this component supports
    fn supported_actions(&self) -> &[Action];

    /// Get component name for debugging/logging
    fn name(&self) -> &str;
}

/// Focusable component trait
///
/// Focus determines which component receives keyboard input.
pub trait Focusable: Component {
    fn is_focused(&self) -> bool;

    fn set_focused(&mut self, focused: bool);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::components::{ColumnDetails, ExportDialog, TransformPanel};
    use ratatui::{Terminal, backend::TestBackend};

    fn rendered(component: &mut dyn Component) -> String {
        let mut terminal = Terminal::new(TestBackend::new(48, 12)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|frame| component.render(frame, frame.area(), &theme))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_unsupported_actions_propagate() {
        let mut components: Vec<Box<dyn Component>> = vec![
            Box::new(TransformPanel::new()),
            Box::new(ColumnDetails::new()),
            Box::new(ExportDialog::loading()),
        ];
        for component in &mut components {
            assert!(!component.supported_actions().contains(&Action::Quit));
            assert!(!component.handle_action(Action::Quit).unwrap(), "{}", component.name());
        }
    }

    #[test]
    fn test_components_render_their_placeholder() {
        assert!(rendered(&mut TransformPanel::new()).contains("Select a column"));
        assert!(rendered(&mut ExportDialog::loading()).contains("Loading formats..."));
        assert!(rendered(&mut ColumnDetails::new()).contains("Lookup"));
    }
}
