use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

/// All possible actions in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "PascalCase")]
pub enum Action {
    // Navigation
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    Home,
    End,
    GoToTop,
    GoToBottom,

    // Filters
    FilterOnValue,
    FilterEmpty,
    FilterInvalid,
    RemoveLastFilter,
    ClearFilters,

    // Panels
    ToggleLookup,
    ToggleTransformations,
    NextPanel,

    // Data
    Refresh,
    Export,

    // Application
    Quit,
    Confirm,
    Cancel,
}

impl Action {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Action::MoveUp => "Move cursor up",
            Action::MoveDown => "Move cursor down",
            Action::MoveLeft => "Move cursor left",
            Action::MoveRight => "Move cursor right",
            Action::PageUp => "Page up",
            Action::PageDown => "Page down",
            Action::Home => "Go to first column",
            Action::End => "Go to last column",
            Action::GoToTop => "Go to first row",
            Action::GoToBottom => "Go to last row",
            Action::FilterOnValue => "Keep rows with the selected value",
            Action::FilterEmpty => "Keep rows with an empty value in the column",
            Action::FilterInvalid => "Keep rows with an invalid value in the column",
            Action::RemoveLastFilter => "Remove the most recent filter",
            Action::ClearFilters => "Remove all filters",
            Action::ToggleLookup => "Show or hide the column details panel",
            Action::ToggleTransformations => "Show or hide the transformations of the column",
            Action::NextPanel => "Move focus to the next panel",
            Action::Refresh => "Reload the dataset",
            Action::Export => "Export the dataset",
            Action::Quit => "Quit application",
            Action::Confirm => "Confirm action",
            Action::Cancel => "Cancel action",
        }
    }

    /// Get category for grouping in help screen
    pub fn category(&self) -> ActionCategory {
        match self {
            Action::MoveUp
            | Action::MoveDown
            | Action::MoveLeft
            | Action::MoveRight
            | Action::PageUp
            | Action::PageDown
            | Action::Home
            | Action::End
            | Action::GoToTop
            | Action::GoToBottom => ActionCategory::Navigation,

            Action::FilterOnValue
            | Action::FilterEmpty
            | Action::FilterInvalid
            | Action::RemoveLastFilter
            | Action::ClearFilters => ActionCategory::Filters,

            Action::ToggleLookup | Action::ToggleTransformations | Action::NextPanel => ActionCategory::Panels,

            Action::Refresh | Action::Export => ActionCategory::Data,

            Action::Quit | Action::Confirm | Action::Cancel => ActionCategory::Application,
        }
    }

    /// Get all possible actions (for validation)
    pub fn all() -> Vec<Action> {
        Action::iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    Navigation,
    Filters,
    Panels,
    Data,
    Application,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCategory::Navigation => write!(f, "Navigation"),
            ActionCategory::Filters => write!(f, "Filters"),
            ActionCategory::Panels => write!(f, "Panels"),
            ActionCategory::Data => write!(f, "Data"),
            ActionCategory::Application => write!(f, "Application"),
        }
    }
}
