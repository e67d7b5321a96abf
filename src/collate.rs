/// Sample collation
///
/// Runs every aligner for a (county, year) sample described by a manifest
/// entry and concatenates the results into one feature vector. Batches fan
/// out across samples with rayon; results come back in manifest order.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Array3, Array4, Array5};
use rayon::prelude::*;

use crate::align::{DailyWeatherAligner, DateOrder, ImageryAligner, MonthlyWeatherAligner, YieldAligner};
use crate::config::{DatasetConfig, FailurePolicy};
use crate::ingest::csv_table::{read_weather_files, read_yield_csv};
use crate::ingest::manifest::SampleInfo;
use crate::logging::{self, Modality, log_alignment_failure, log_batch_summary};
use crate::model::{AlignError, GeoKey, RawRecordTable, Result};
use crate::store::ImageryStore;

// ---------------------------------------------------------------------------
// Record Sources
// ---------------------------------------------------------------------------

/// Where the collator gets raw records and imagery stores from.
pub trait RecordSource: Send + Sync {
    type Store: ImageryStore;

    /// Weather rows from `files`, concatenated in order.
    fn fetch_raw_rows(&self, geo_key: &GeoKey, year: i32, files: &[PathBuf]) -> Result<RawRecordTable>;

    fn fetch_yield_rows(&self, geo_key: &GeoKey, year: i32, file: &Path) -> Result<RawRecordTable>;

    /// Opens one store per file. Stores close when dropped.
    fn fetch_imagery_stores(&self, files: &[PathBuf]) -> Result<Vec<Self::Store>>;
}

/// Reads CSV tables and HDF5 stores from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRecordSource;

impl RecordSource for FileRecordSource {
    #[cfg(feature = "hdf5")]
    type Store = crate::ingest::hdf5_store::Hdf5ImageryStore;
    #[cfg(not(feature = "hdf5"))]
    type Store = crate::store::MemoryImageryStore;

    fn fetch_raw_rows(&self, _geo_key: &GeoKey, _year: i32, files: &[PathBuf]) -> Result<RawRecordTable> {
        read_weather_files(files)
    }

    fn fetch_yield_rows(&self, _geo_key: &GeoKey, _year: i32, file: &Path) -> Result<RawRecordTable> {
        read_yield_csv(file)
    }

    #[cfg(feature = "hdf5")]
    fn fetch_imagery_stores(&self, files: &[PathBuf]) -> Result<Vec<Self::Store>> {
        files
            .iter()
            .map(|p| crate::ingest::hdf5_store::Hdf5ImageryStore::open(p))
            .collect()
    }

    #[cfg(not(feature = "hdf5"))]
    fn fetch_imagery_stores(&self, files: &[PathBuf]) -> Result<Vec<Self::Store>> {
        match files.first() {
            None => Ok(Vec::new()),
            Some(path) => Err(AlignError::Store(format!(
                "{}: built without the `hdf5` feature",
                path.display()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Aligned tensors for one sample. Modalities the manifest entry lists no
/// files for are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFeatures {
    pub geo_key: GeoKey,
    pub year: i32,
    pub daily: Array4<f32>,
    pub monthly: Option<Array3<f32>>,
    pub imagery: Option<Array5<f32>>,
    pub yield_values: Option<Array1<f32>>,
}

impl SampleFeatures {
    /// Flattens every present modality row-major and concatenates them as
    /// imagery, yield, daily, monthly.
    pub fn feature_vector(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        if let Some(imagery) = &self.imagery {
            out.extend(imagery.iter().copied());
        }
        if let Some(yields) = &self.yield_values {
            out.extend(yields.iter().copied());
        }
        out.extend(self.daily.iter().copied());
        if let Some(monthly) = &self.monthly {
            out.extend(monthly.iter().copied());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.imagery.as_ref().map_or(0, |a| a.len())
            + self.yield_values.as_ref().map_or(0, |a| a.len())
            + self.daily.len()
            + self.monthly.as_ref().map_or(0, |a| a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stacked feature vectors, one row per successfully collated sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    pub keys: Vec<(GeoKey, i32)>,
    pub features: Array2<f32>,
}

// ---------------------------------------------------------------------------
// Collator
// ---------------------------------------------------------------------------

pub struct Collator<S: RecordSource> {
    source: S,
    config: DatasetConfig,
}

impl<S: RecordSource> Collator<S> {
    pub fn new(source: S, config: DatasetConfig) -> Self {
        Collator { source, config }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Aligns every modality of one sample. Any failure fails the sample.
    pub fn collate_sample(&self, sample: &SampleInfo) -> Result<SampleFeatures> {
        let geo_key = sample.geo_key();
        let key = geo_key.as_str();
        let year = sample.year;
        let files = sample.resolve(&self.config);
        let variables = &self.config.weather_variables;

        let daily = self
            .source
            .fetch_raw_rows(&geo_key, year, &files.short_term)
            .and_then(|table| DailyWeatherAligner.align(&table, &geo_key, variables))
            .inspect_err(|e| log_alignment_failure(Modality::Daily, key, "daily alignment", e))?;

        let monthly = if files.long_term.is_empty() {
            None
        } else {
            let aligned = files
                .long_term
                .iter()
                .map(|bucket| self.source.fetch_raw_rows(&geo_key, year, bucket))
                .collect::<Result<Vec<_>>>()
                .and_then(|buckets| MonthlyWeatherAligner.align(&buckets, &geo_key, variables))
                .inspect_err(|e| log_alignment_failure(Modality::Monthly, key, "monthly alignment", e))?;
            Some(aligned)
        };

        let imagery = if files.imagery.is_empty() {
            None
        } else {
            let aligned = self
                .source
                .fetch_imagery_stores(&files.imagery)
                .and_then(|stores| ImageryAligner.align(&stores, &geo_key, &DateOrder::Native, None))
                .inspect_err(|e| log_alignment_failure(Modality::Imagery, key, "imagery alignment", e))?;
            Some(aligned)
        };

        let yield_values = match &files.yield_file {
            None => None,
            Some(path) => {
                let aligned = self
                    .source
                    .fetch_yield_rows(&geo_key, year, path)
                    .and_then(|table| {
                        YieldAligner.align(
                            &table,
                            geo_key.state_code(),
                            geo_key.county_code(),
                            self.config.crop_type.measurement_columns(),
                        )
                    })
                    .inspect_err(|e| log_alignment_failure(Modality::Yield, key, "yield alignment", e))?;
                Some(aligned)
            }
        };

        Ok(SampleFeatures {
            geo_key,
            year,
            daily,
            monthly,
            imagery,
            yield_values,
        })
    }

    /// Collates samples in parallel and stacks their feature vectors.
    ///
    /// Under `FailurePolicy::Abort` the first failure in manifest order is
    /// returned. Under `Skip` failed samples are left out. All kept vectors
    /// must have the same length.
    pub fn collate_batch(&self, samples: &[SampleInfo]) -> Result<FeatureBatch> {
        let results: Vec<Result<SampleFeatures>> =
            samples.par_iter().map(|s| self.collate_sample(s)).collect();

        let total = results.len();
        let mut kept = Vec::with_capacity(total);
        let mut failed = 0usize;
        for (sample, result) in samples.iter().zip(results) {
            match result {
                Ok(features) => kept.push(features),
                Err(e) => {
                    failed += 1;
                    if self.config.failure_policy == FailurePolicy::Abort {
                        log_batch_summary(total, kept.len(), failed);
                        return Err(e);
                    }
                    logging::warn(
                        Modality::Collator,
                        Some(sample.geo_key().as_str()),
                        &format!("skipping sample for {}: {}", sample.year, e),
                    );
                }
            }
        }

        let width = kept.first().map_or(0, |f| f.len());
        let mut flat = Vec::with_capacity(kept.len() * width);
        let mut keys = Vec::with_capacity(kept.len());
        for features in kept {
            if features.len() != width {
                return Err(AlignError::ShapeMismatch {
                    context: format!("feature batch, sample {} {}", features.geo_key, features.year),
                    detail: format!("expected {} features, got {}", width, features.len()),
                });
            }
            flat.extend(features.feature_vector());
            keys.push((features.geo_key, features.year));
        }

        log_batch_summary(total, keys.len(), failed);
        let features = Array2::from_shape_vec((keys.len(), width), flat)
            .map_err(|e| AlignError::from_shape("feature batch", e))?;
        Ok(FeatureBatch { keys, features })
    }
}
