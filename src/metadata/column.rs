//! Metadata schema mapping - source column names to canonical fields

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical metadata columns.
///
/// The mapping from source names is fixed and total: any other column name
/// fails closed with [`Error::UnknownMetadataColumn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataColumn {
    /// `condName` - unique condition key
    ConditionName,
    /// `isTs` - declared time-series membership
    IsTimeSeries,
    /// `is1stLast` - declared position within the series
    IsFirstLast,
    /// `prevCol` - preceding condition
    PrevCondition,
    /// `del.t` - time since the preceding condition
    DeltaT,
}

impl MetadataColumn {
    /// All recognized columns
    pub const ALL: [Self; 5] = [
        Self::ConditionName,
        Self::IsTimeSeries,
        Self::IsFirstLast,
        Self::PrevCondition,
        Self::DeltaT,
    ];

    /// Column name as written in source metadata files.
    #[must_use]
    pub const fn source_name(self) -> &'static str {
        match self {
            Self::ConditionName => "condName",
            Self::IsTimeSeries => "isTs",
            Self::IsFirstLast => "is1stLast",
            Self::PrevCondition => "prevCol",
            Self::DeltaT => "del.t",
        }
    }

    /// Canonical field name.
    #[must_use]
    pub const fn canonical_name(self) -> &'static str {
        match self {
            Self::ConditionName => "condition_name",
            Self::IsTimeSeries => "is_time_series",
            Self::IsFirstLast => "is_first_last",
            Self::PrevCondition => "prev_condition",
            Self::DeltaT => "delta_t",
        }
    }

    /// Map a source column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetadataColumn`] for names outside the mapping
    pub fn from_source_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|column| column.source_name() == name)
            .ok_or_else(|| Error::UnknownMetadataColumn(name.to_string()))
    }
}

impl fmt::Display for MetadataColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_name())
    }
}

/// Declared position of a sample within its time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirstLast {
    /// First sample of a series
    First,
    /// Last sample of a series
    Last,
    /// Single-sample series (first and last at once)
    Both,
    /// Neither first nor last
    Interior,
}

impl FromStr for FirstLast {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "first" => Ok(Self::First),
            "l" | "last" => Ok(Self::Last),
            "e" | "b" | "both" => Ok(Self::Both),
            "m" | "middle" | "interior" => Ok(Self::Interior),
            _ => Err(()),
        }
    }
}
