use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

/// Theme selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

/// A theme defines the color scheme for the TUI
///
/// Grid classes (`selected`, `highlight`, preview markers...) are mapped to
/// styles by [`Theme::class_style`].
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // General UI colors
    pub background: Color,
    pub foreground: Color,
    pub dim: Color,
    pub border: Color,
    pub border_focused: Color,

    // Table colors
    pub header_fg: Color,
    pub header_bg: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub row_alt_bg: Color, // For zebra striping
    pub column_selected_bg: Color,
    pub highlight_bg: Color,

    // Preview colors
    pub new_value: Color,
    pub updated_value: Color,
    pub deleted_value: Color,

    // Status/feedback colors
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
}

impl Default for Theme {
    /// Default dark theme
    fn default() -> Self {
        Self {
            name: "Default Dark".to_string(),
            background: Color::Reset,
            foreground: Color::Gray,
            dim: Color::DarkGray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            header_fg: Color::Cyan,
            header_bg: Color::Reset,
            selected_fg: Color::Black,
            selected_bg: Color::Cyan,
            row_alt_bg: Color::Rgb(25, 25, 35), // Slightly lighter than pure black
            column_selected_bg: Color::Rgb(30, 45, 60),
            highlight_bg: Color::Rgb(90, 80, 20),
            new_value: Color::Green,
            updated_value: Color::Yellow,
            deleted_value: Color::Red,
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
        }
    }
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::default(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            background: Color::White,
            foreground: Color::Black,
            dim: Color::Gray,
            border: Color::Gray,
            border_focused: Color::Blue,
            header_fg: Color::Blue,
            header_bg: Color::Rgb(240, 240, 240),
            selected_fg: Color::White,
            selected_bg: Color::Blue,
            row_alt_bg: Color::Rgb(250, 250, 250),
            column_selected_bg: Color::Rgb(225, 235, 250),
            highlight_bg: Color::Rgb(255, 240, 170),
            new_value: Color::Rgb(0, 130, 0),
            updated_value: Color::Rgb(200, 150, 0), // Darker yellow for light bg
            deleted_value: Color::Red,
            success: Color::Green,
            error: Color::Red,
            warning: Color::Rgb(200, 150, 0),
            info: Color::Blue,
        }
    }

    /// Style of a grid class; unknown classes have no style
    pub fn class_style(&self, class: &str) -> Style {
        match class {
            "selected" => Style::default().bg(self.column_selected_bg),
            "index-column" => Style::default().fg(self.dim),
            "highlight" => Style::default().bg(self.highlight_bg),
            "cellNewValue" | "newColumn" => Style::default().fg(self.new_value),
            "cellUpdateValue" | "updatedColumn" => Style::default().fg(self.updated_value),
            "cellDeletedValue" | "deletedColumn" => Style::default()
                .fg(self.deleted_value)
                .add_modifier(Modifier::CROSSED_OUT),
            "red-rect" => Style::default()
                .fg(self.error)
                .add_modifier(Modifier::UNDERLINED),
            _ => Style::default(),
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .bg(self.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.selected_fg)
            .bg(self.selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the currently active cell
    pub fn selected_cell_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn alt_row_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.row_alt_bg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }
}
