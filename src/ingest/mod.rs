/// Readers that turn files on disk into raw records and imagery stores.
///
/// - `csv_table`: HRRR weather CSVs and USDA yield CSVs
/// - `manifest`: per-sample JSON manifests
/// - `hdf5_store`: Sentinel-2 HDF5 stores (feature `hdf5`)

pub mod csv_table;
#[cfg(feature = "hdf5")]
pub mod hdf5_store;
pub mod manifest;

pub use csv_table::{parse_weather_csv, parse_yield_csv, read_weather_csv, read_weather_files, read_yield_csv};
#[cfg(feature = "hdf5")]
pub use hdf5_store::Hdf5ImageryStore;
pub use manifest::{SampleFiles, SampleInfo, load_manifest, parse_manifest};
