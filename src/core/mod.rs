pub mod debounce;
pub mod menu;
pub mod models;
pub mod state;
pub mod types;

pub use debounce::Debouncer;
pub use menu::{MenuKind, Params, TransformMenu};
pub use models::*;
pub use state::{PlaygroundState, PlaygroundStore};
pub use types::*;
