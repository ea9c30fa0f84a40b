pub mod column_details;
pub mod datagrid;
pub mod export_dialog;
pub mod transform_menu;
pub mod transform_panel;

pub use column_details::{ColumnDetails, ColumnInfo};
pub use datagrid::{Datagrid, DatagridServices, DebounceConfig, Reaction};
pub use export_dialog::ExportDialog;
pub use transform_menu::{
    DeferredTransform, FormField, FormInput, MenuContext, MenuOutcome, MenuState, ParameterForm, PendingTask,
    Settled, TransformMenuController,
};
pub use transform_panel::TransformPanel;
