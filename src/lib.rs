pub mod batch;
pub mod canopy;
pub mod config;
pub mod constants;
pub mod env_state;
pub mod grid;
pub mod growth_metrics;
pub mod imagery;
pub mod pipeline;
pub mod raster;
pub mod records;
pub mod treemetrics_errors;
pub mod trees;

pub use config::PipelineConfig;
pub use imagery::{http_client::HttpImageryClient, memory::InMemoryImagery, ImageryClient};
pub use pipeline::{run_pipeline, PipelineOutput, PipelineReport};
pub use records::{write_records_csv, TreeRecord};
pub use treemetrics_errors::TreeMetricsError;
pub use trees::{read_tree_csv, TreePoint};
