//! Sample manifests.
//!
//! A manifest is a JSON array with one entry per (county, year) sample,
//! listing the already-resolved relative paths of every source file the
//! sample needs:
//!
//! ```json
//! [{
//!   "FIPS": "19153",
//!   "year": 2022,
//!   "short_term": ["2022/HRRR_19_IA_2022-06.csv"],
//!   "long_term": [["2020/HRRR_19_IA_2020-01.csv"], ["2021/HRRR_19_IA_2021-01.csv"]],
//!   "data_paths": ["AG/IA/2022/Agriculture_19_IA_2022-04-01_2022-06-30.h5"],
//!   "usda_path": "Soybeans/2022/USDA_Soybeans_County_2022.csv"
//! }]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::DatasetConfig;
use crate::model::{GeoKey, Result};

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleInfo {
    #[serde(rename = "FIPS")]
    pub fips: String,
    #[serde(deserialize_with = "year_from_number_or_text")]
    pub year: i32,
    /// Daily weather files for the sample year.
    #[serde(default)]
    pub short_term: Vec<String>,
    /// Monthly weather files, one group per long-term bucket.
    #[serde(default)]
    pub long_term: Vec<Vec<String>>,
    /// Imagery store files, in time order.
    #[serde(default)]
    pub data_paths: Vec<String>,
    #[serde(default)]
    pub usda_path: Option<String>,
}

/// Source paths of one sample joined onto the configured base directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFiles {
    pub short_term: Vec<PathBuf>,
    pub long_term: Vec<Vec<PathBuf>>,
    pub imagery: Vec<PathBuf>,
    pub yield_file: Option<PathBuf>,
}

impl SampleInfo {
    pub fn geo_key(&self) -> GeoKey {
        GeoKey::new(&self.fips)
    }

    pub fn resolve(&self, config: &DatasetConfig) -> SampleFiles {
        SampleFiles {
            short_term: self.short_term.iter().map(|p| config.hrrr_dir.join(p)).collect(),
            long_term: self
                .long_term
                .iter()
                .map(|bucket| bucket.iter().map(|p| config.hrrr_dir.join(p)).collect())
                .collect(),
            imagery: self.data_paths.iter().map(|p| config.sentinel_dir.join(p)).collect(),
            yield_file: self.usda_path.as_ref().map(|p| config.usda_dir.join(p)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Number(i32),
    Text(String),
}

fn year_from_number_or_text<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    match YearRepr::deserialize(deserializer)? {
        YearRepr::Number(year) => Ok(year),
        YearRepr::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid year '{}'", text))),
    }
}

pub fn parse_manifest(json: &str) -> Result<Vec<SampleInfo>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_manifest(path: &Path) -> Result<Vec<SampleInfo>> {
    let json = fs::read_to_string(path)?;
    parse_manifest(&json)
}
