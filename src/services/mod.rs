pub mod column_service;
pub mod datagrid_service;
pub mod external_service;
pub mod grid_service;
pub mod local_dataset;
pub mod playground_service;
pub mod rest;
pub mod size_service;
pub mod style_service;
pub mod transformation_service;

pub use column_service::{ColumnDefinition, ColumnService, DatagridColumnService};
pub use datagrid_service::{DatagridService, HIGHLIGHT_CLASS};
pub use external_service::{ChannelExternalService, ExternalEvent, ExternalService};
pub use grid_service::{DatagridGridService, GridService};
pub use playground_service::{OfflinePlaygroundService, PlaygroundService, RestPlaygroundService};
pub use rest::{RestClient, RestUrls};
pub use size_service::{ColumnsConfig, DatagridSizeService, SizeService};
pub use style_service::{CellFormatter, FormattedCell, StyleService};
pub use transformation_service::{OfflineTransformationService, RestTransformationService, TransformationService};
