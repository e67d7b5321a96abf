//! Keyed hierarchical imagery stores.
//!
//! An imagery store maps a county key to an ordered set of date-labelled
//! groups, each holding one pixel dataset: either `(height, width, channel)`
//! or `(grid, height, width, channel)` when a county is covered by several
//! tiles. Stores are read-only and released when dropped.

use ndarray::ArrayD;

use crate::model::{AlignError, GeoKey, Result};

/// Read access to a keyed imagery store.
pub trait ImageryStore {
    /// Human-readable name used in error messages (usually the file path).
    fn name(&self) -> &str;

    /// Returns `true` if the store has a subtree for `geo_key`.
    fn contains(&self, geo_key: &GeoKey) -> bool;

    /// Date labels under `geo_key`, in the store's native enumeration order.
    /// That order is not necessarily chronological.
    fn date_labels(&self, geo_key: &GeoKey) -> Result<Vec<String>>;

    /// Reads the pixel dataset stored for `geo_key` on `date`.
    fn read_grid(&self, geo_key: &GeoKey, date: &str) -> Result<ArrayD<f32>>;

    /// Returns `Ok(false)` when the county or the date is absent. Backend
    /// failures are returned as errors.
    fn has_date(&self, geo_key: &GeoKey, date: &str) -> Result<bool> {
        if !self.contains(geo_key) {
            return Ok(false);
        }
        Ok(self.date_labels(geo_key)?.iter().any(|l| l == date))
    }
}

/// An imagery store held in memory. Counties and dates enumerate in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageryStore {
    name: String,
    counties: Vec<(GeoKey, Vec<(String, ArrayD<f32>)>)>,
}

impl MemoryImageryStore {
    pub fn new(name: &str) -> Self {
        MemoryImageryStore {
            name: name.to_string(),
            counties: Vec::new(),
        }
    }

    /// Adds (or replaces) the dataset for `geo_key` on `date`.
    pub fn insert(&mut self, geo_key: &GeoKey, date: &str, grid: ArrayD<f32>) {
        let idx = match self.counties.iter().position(|(k, _)| k == geo_key) {
            Some(idx) => idx,
            None => {
                self.counties.push((geo_key.clone(), Vec::new()));
                self.counties.len() - 1
            }
        };
        let dates = &mut self.counties[idx].1;
        match dates.iter_mut().find(|(d, _)| d == date) {
            Some(entry) => entry.1 = grid,
            None => dates.push((date.to_string(), grid)),
        }
    }

    fn county(&self, geo_key: &GeoKey) -> Result<&[(String, ArrayD<f32>)]> {
        self.counties
            .iter()
            .find(|(k, _)| k == geo_key)
            .map(|(_, dates)| dates.as_slice())
            .ok_or_else(|| AlignError::KeyNotFound {
                key: geo_key.to_string(),
                origin: format!("imagery store '{}'", self.name),
            })
    }
}

impl ImageryStore for MemoryImageryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, geo_key: &GeoKey) -> bool {
        self.counties.iter().any(|(k, _)| k == geo_key)
    }

    fn date_labels(&self, geo_key: &GeoKey) -> Result<Vec<String>> {
        Ok(self.county(geo_key)?.iter().map(|(d, _)| d.clone()).collect())
    }

    fn read_grid(&self, geo_key: &GeoKey, date: &str) -> Result<ArrayD<f32>> {
        self.county(geo_key)?
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| AlignError::KeyNotFound {
                key: format!("{}/{}", geo_key, date),
                origin: format!("imagery store '{}'", self.name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_dates_enumerate_in_insertion_order() {
        let key = GeoKey::new("19153");
        let mut store = MemoryImageryStore::new("mem");
        store.insert(&key, "2022-09-01", ArrayD::zeros(IxDyn(&[2, 2, 3])));
        store.insert(&key, "2022-06-01", ArrayD::zeros(IxDyn(&[2, 2, 3])));
        assert_eq!(store.date_labels(&key).unwrap(), ["2022-09-01", "2022-06-01"]);
        assert!(store.has_date(&key, "2022-06-01").unwrap());
        assert!(!store.has_date(&key, "2022-07-01").unwrap());
        assert!(!store.has_date(&GeoKey::new("06037"), "2022-06-01").unwrap());
    }

    #[test]
    fn test_insert_replaces_existing_date() {
        let key = GeoKey::new("19153");
        let mut store = MemoryImageryStore::new("mem");
        store.insert(&key, "2022-06-01", ArrayD::zeros(IxDyn(&[1, 1, 1])));
        store.insert(&key, "2022-06-01", ArrayD::ones(IxDyn(&[1, 1, 1])));
        assert_eq!(store.date_labels(&key).unwrap().len(), 1);
        assert_eq!(store.read_grid(&key, "2022-06-01").unwrap()[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_missing_county_is_key_not_found() {
        let store = MemoryImageryStore::new("mem");
        assert!(!store.contains(&GeoKey::new("19153")));
        let err = store.date_labels(&GeoKey::new("19153")).unwrap_err();
        assert!(matches!(err, AlignError::KeyNotFound { .. }));
    }
}
