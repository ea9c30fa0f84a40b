#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_match)]
#![allow(clippy::collapsible_else_if)]

pub mod config;
pub mod core;
pub mod error;
pub mod grid;
pub mod hooks;
pub mod logging;
pub mod services;
pub mod tui;

// Re-export commonly used types
pub use core::{ColumnId, DatasetId, GridData, PlaygroundState, PlaygroundStore, PreparationId};
pub use error::PrepError;
pub use tui::{Action, ActionCategory};
