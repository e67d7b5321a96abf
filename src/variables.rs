/// Variable and crop registry for the CropNet datasets.
///
/// Defines the canonical HRRR weather variable columns and the USDA crop
/// types with the measurement columns each one reports. This is the single
/// source of truth for column names; other modules should reference them
/// from here rather than hardcoding strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{AlignError, Result};

// ---------------------------------------------------------------------------
// Weather variables
// ---------------------------------------------------------------------------

/// Default HRRR weather parameters, in the order they appear on the
/// variable axis of the weather tensors.
pub static HRRR_VARIABLES: &[&str] = &[
    "Avg Temperature (K)",
    "Max Temperature (K)",
    "Min Temperature (K)",
    "Precipitation (kg m**-2)",
    "Relative Humidity (%)",
    "Wind Gust (m s**-1)",
    "Wind Speed (m s**-1)",
    "Downward Shortwave Radiation Flux (W m**-2)",
    "Vapor Pressure Deficit (kPa)",
];

/// Returns the default weather variable list as owned strings.
pub fn default_weather_variables() -> Vec<String> {
    HRRR_VARIABLES.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Crop registry
// ---------------------------------------------------------------------------

pub const COL_PRODUCTION_BU: &str = "PRODUCTION, MEASURED IN BU";
pub const COL_PRODUCTION_BALES: &str = "PRODUCTION, MEASURED IN 480 LB BALES";
pub const COL_YIELD_BU_ACRE: &str = "YIELD, MEASURED IN BU / ACRE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CropType {
    Corn,
    Cotton,
    #[default]
    Soybeans,
    #[serde(rename = "Winter Wheat")]
    WinterWheat,
}

/// Metadata for one USDA crop type.
pub struct CropSpec {
    pub crop: CropType,
    /// Name as written in the USDA tables and in configuration files.
    pub name: &'static str,
    /// Columns selected, in order, onto the yield vector.
    pub measurement_columns: &'static [&'static str],
}

pub static CROP_REGISTRY: &[CropSpec] = &[
    CropSpec {
        crop: CropType::Corn,
        name: "Corn",
        measurement_columns: &[COL_PRODUCTION_BU, COL_YIELD_BU_ACRE],
    },
    CropSpec {
        crop: CropType::Cotton,
        name: "Cotton",
        // Cotton production is reported in bales, not bushels
        measurement_columns: &[COL_PRODUCTION_BALES, COL_YIELD_BU_ACRE],
    },
    CropSpec {
        crop: CropType::Soybeans,
        name: "Soybeans",
        measurement_columns: &[COL_PRODUCTION_BU, COL_YIELD_BU_ACRE],
    },
    CropSpec {
        crop: CropType::WinterWheat,
        name: "Winter Wheat",
        measurement_columns: &[COL_PRODUCTION_BU, COL_YIELD_BU_ACRE],
    },
];

impl CropType {
    fn entry(self) -> &'static CropSpec {
        // Every variant has a registry entry; see test_every_crop_type_is_registered.
        CROP_REGISTRY
            .iter()
            .find(|s| s.crop == self)
            .unwrap_or(&CROP_REGISTRY[0])
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn measurement_columns(self) -> &'static [&'static str] {
        self.entry().measurement_columns
    }

    /// Parses a crop name as written in the USDA tables.
    pub fn from_name(name: &str) -> Result<Self> {
        find_crop(name).map(|s| s.crop).ok_or_else(|| {
            AlignError::Config(format!(
                "cannot find a crop type named '{}'; choices: {}",
                name,
                all_crop_names().join(", ")
            ))
        })
    }
}

impl fmt::Display for CropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the names of all registered crops.
pub fn all_crop_names() -> Vec<&'static str> {
    CROP_REGISTRY.iter().map(|s| s.name).collect()
}

/// Looks up a crop by its USDA name. Returns `None` if not found.
pub fn find_crop(name: &str) -> Option<&'static CropSpec> {
    CROP_REGISTRY.iter().find(|s| s.name == name.trim())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
