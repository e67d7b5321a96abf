//! Sentinel-2 HDF5 imagery stores.
//!
//! Layout: `/<FIPS>/<date>/data`, where `data` is `(grid, height, width,
//! channel)`. Dates enumerate in the library's link order.

use std::path::Path;

use hdf5::{Conversion, File as H5File};
use ndarray::ArrayD;

use crate::model::{AlignError, GeoKey, IMAGERY_DATASET, Result};
use crate::store::ImageryStore;

pub struct Hdf5ImageryStore {
    file: H5File,
    name: String,
}

impl Hdf5ImageryStore {
    /// Opens `path` read-only. The file is closed when the store is dropped.
    pub fn open(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let file = H5File::open(path).map_err(|e| store_error(&name, "open", e))?;
        Ok(Hdf5ImageryStore { file, name })
    }

    fn county(&self, geo_key: &GeoKey) -> Result<hdf5::Group> {
        if !self.file.link_exists(geo_key.as_str()) {
            return Err(AlignError::KeyNotFound {
                key: geo_key.to_string(),
                origin: format!("imagery store '{}'", self.name),
            });
        }
        self.file
            .group(geo_key.as_str())
            .map_err(|e| store_error(&self.name, geo_key.as_str(), e))
    }
}

fn store_error(name: &str, what: &str, err: hdf5::Error) -> AlignError {
    AlignError::Store(format!("{} ({}): {}", name, what, err))
}

impl ImageryStore for Hdf5ImageryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, geo_key: &GeoKey) -> bool {
        self.file.link_exists(geo_key.as_str())
    }

    fn date_labels(&self, geo_key: &GeoKey) -> Result<Vec<String>> {
        self.county(geo_key)?
            .member_names()
            .map_err(|e| store_error(&self.name, geo_key.as_str(), e))
    }

    fn read_grid(&self, geo_key: &GeoKey, date: &str) -> Result<ArrayD<f32>> {
        let county = self.county(geo_key)?;
        if !county.link_exists(date) {
            return Err(AlignError::KeyNotFound {
                key: format!("{}/{}", geo_key, date),
                origin: format!("imagery store '{}'", self.name),
            });
        }
        let path = format!("{}/{}/{}", geo_key, date, IMAGERY_DATASET);
        let dataset = county
            .group(date)
            .and_then(|g| g.dataset(IMAGERY_DATASET))
            .map_err(|e| store_error(&self.name, &path, e))?;
        // Pixels are stored as integers; widen on read.
        dataset
            .as_reader()
            .conversion(Conversion::Hard)
            .read_dyn::<f32>()
            .map_err(|e| store_error(&self.name, &path, e))
    }
}
