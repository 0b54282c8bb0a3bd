use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    #[default]
    Android,
    Ios,
    Windows,
    Other,
}

impl OsFamily {
    pub const ALL: [OsFamily; 4] = [Self::Android, Self::Ios, Self::Windows, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Android => "android",
            OsFamily::Ios => "ios",
            OsFamily::Windows => "windows",
            OsFamily::Other => "other",
        }
    }
}

impl FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|os| os.as_str() == s)
            .ok_or_else(|| format!("Invalid OS family: {}", s))
    }
}

impl Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChipsetBrand {
    #[default]
    Qualcomm,
    Mediatek,
    Exynos,
    Apple,
    Unisoc,
    Other,
}

impl ChipsetBrand {
    pub const ALL: [ChipsetBrand; 6] = [
        Self::Qualcomm,
        Self::Mediatek,
        Self::Exynos,
        Self::Apple,
        Self::Unisoc,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChipsetBrand::Qualcomm => "qualcomm",
            ChipsetBrand::Mediatek => "mediatek",
            ChipsetBrand::Exynos => "exynos",
            ChipsetBrand::Apple => "apple",
            ChipsetBrand::Unisoc => "unisoc",
            ChipsetBrand::Other => "other",
        }
    }
}

impl FromStr for ChipsetBrand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|brand| brand.as_str() == s)
            .ok_or_else(|| format!("Invalid chipset brand: {}", s))
    }
}

impl Display for ChipsetBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single value in a [`FeatureRow`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FeatureValue::Integer(_) => "integer",
            FeatureValue::Float(_) => "float",
            FeatureValue::Text(_) => "text",
        }
    }
}

/// One row of model input: column names paired with values, in column order.
pub type FeatureRow = Vec<(String, FeatureValue)>;

/// Inclusive bounds of a numeric form widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    /// Spinner increment. Browsers count steps from `min`, so `None` is used
    /// where the common values do not sit on that grid.
    pub step: Option<f64>,
}

impl FieldBounds {
    pub const RAM_GB: FieldBounds = FieldBounds {
        name: "ram_gb",
        label: "RAM (GB)",
        min: 1.0,
        max: 24.0,
        step: Some(1.0),
    };
    pub const STORAGE_GB: FieldBounds = FieldBounds {
        name: "storage_gb",
        label: "Storage (GB)",
        min: 8.0,
        max: 1024.0,
        step: None,
    };
    pub const SCREEN_IN: FieldBounds = FieldBounds {
        name: "screen_in",
        label: "Screen Size (inches)",
        min: 3.5,
        max: 8.5,
        step: Some(0.1),
    };
    pub const REFRESH_HZ: FieldBounds = FieldBounds {
        name: "refresh_hz",
        label: "Refresh Rate (Hz)",
        min: 30.0,
        max: 240.0,
        step: Some(10.0),
    };

    fn check(&self, value: f64) -> Result<(), RangeError> {
        // NaN fails both comparisons, so test containment rather than exclusion.
        if (self.min..=self.max).contains(&value) {
            Ok(())
        } else {
            Err(RangeError {
                label: self.label,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{label} must be between {min} and {max}, got {value}")]
pub struct RangeError {
    pub label: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// One phone specification, as submitted by the form or the JSON API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub os_family: OsFamily,
    pub chipset_brand: ChipsetBrand,
    pub ram_gb: f64,
    pub storage_gb: f64,
    pub screen_in: f64,
    pub refresh_hz: f64,
    pub supports_5g: u8,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            os_family: OsFamily::default(),
            chipset_brand: ChipsetBrand::default(),
            ram_gb: 8.0,
            storage_gb: 128.0,
            screen_in: 6.5,
            refresh_hz: 120.0,
            supports_5g: 1,
        }
    }
}

impl FeatureRecord {
    /// Column names in the order the model was trained with.
    pub const COLUMNS: [&'static str; 7] = [
        "os_family",
        "chipset_brand",
        "ram_gb",
        "storage_gb",
        "screen_in",
        "refresh_hz",
        "supports_5g",
    ];

    pub fn to_row(&self) -> FeatureRow {
        let values = [
            FeatureValue::Text(self.os_family.to_string()),
            FeatureValue::Text(self.chipset_brand.to_string()),
            FeatureValue::Float(self.ram_gb),
            FeatureValue::Float(self.storage_gb),
            FeatureValue::Float(self.screen_in),
            FeatureValue::Float(self.refresh_hz),
            FeatureValue::Integer(i64::from(self.supports_5g)),
        ];
        Self::COLUMNS
            .iter()
            .map(|name| name.to_string())
            .zip(values)
            .collect()
    }

    /// Checks the widget bounds. The prediction path itself does not call this.
    pub fn check_ranges(&self) -> Result<(), RangeError> {
        FieldBounds::RAM_GB.check(self.ram_gb)?;
        FieldBounds::STORAGE_GB.check(self.storage_gb)?;
        FieldBounds::SCREEN_IN.check(self.screen_in)?;
        FieldBounds::REFRESH_HZ.check(self.refresh_hz)?;
        if self.supports_5g > 1 {
            return Err(RangeError {
                label: "5G Support",
                value: f64::from(self.supports_5g),
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}
