/// Multimodal tensor alignment for CropNet county-year samples.
///
/// Turns raw HRRR weather rows, Sentinel-2 imagery stores and USDA yield
/// tables into fixed-axis-order `ndarray` tensors, and collates them into
/// per-sample feature vectors.

pub mod align;
pub mod collate;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod schema;
pub mod store;
pub mod variables;

pub use align::{DailyWeatherAligner, DateOrder, ImageryAligner, MonthlyWeatherAligner, TileTransform, YieldAligner};
pub use collate::{Collator, FeatureBatch, FileRecordSource, RecordSource, SampleFeatures};
pub use config::{DatasetConfig, FailurePolicy};
pub use model::{AlignError, GeoKey, GridCell, RawRecord, RawRecordTable, Result, TemporalGranularity};
pub use schema::VariableSchema;
pub use store::{ImageryStore, MemoryImageryStore};
