//! Geographic and sector taxonomies used for concentration bucketing.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geographic region of a counterparty.
///
/// `NonEuropean` is the fallback bucket for unknown or missing country codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeographicRegion {
    /// Domestic exposures.
    Italy,
    /// Other European countries.
    EuOther,
    /// Everything else.
    NonEuropean,
}

impl GeographicRegion {
    /// All regions in reporting order.
    pub const ALL: [GeographicRegion; 3] = [
        GeographicRegion::Italy,
        GeographicRegion::EuOther,
        GeographicRegion::NonEuropean,
    ];

    /// Bucket code used in reports.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GeographicRegion::Italy => "ITALY",
            GeographicRegion::EuOther => "EU_OTHER",
            GeographicRegion::NonEuropean => "NON_EUROPEAN",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            GeographicRegion::Italy => "Italy",
            GeographicRegion::EuOther => "Other European",
            GeographicRegion::NonEuropean => "Non-European",
        }
    }
}

impl fmt::Display for GeographicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GeographicRegion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeographicRegion::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::unknown_variant("geographic region", s))
    }
}

/// Economic sector of an exposure.
///
/// `Other` is the fallback bucket for unknown or missing product types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EconomicSector {
    /// Residential mortgages to households.
    RetailMortgage,
    /// Central governments and public-sector entities.
    Sovereign,
    /// Non-financial corporates.
    Corporate,
    /// Credit institutions.
    Banking,
    /// Everything else.
    Other,
}

impl EconomicSector {
    /// All sectors in reporting order.
    pub const ALL: [EconomicSector; 5] = [
        EconomicSector::RetailMortgage,
        EconomicSector::Sovereign,
        EconomicSector::Corporate,
        EconomicSector::Banking,
        EconomicSector::Other,
    ];

    /// Bucket code used in reports.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EconomicSector::RetailMortgage => "RETAIL_MORTGAGE",
            EconomicSector::Sovereign => "SOVEREIGN",
            EconomicSector::Corporate => "CORPORATE",
            EconomicSector::Banking => "BANKING",
            EconomicSector::Other => "OTHER",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EconomicSector::RetailMortgage => "Retail Mortgage",
            EconomicSector::Sovereign => "Sovereign",
            EconomicSector::Corporate => "Corporate",
            EconomicSector::Banking => "Banking",
            EconomicSector::Other => "Other",
        }
    }
}

impl fmt::Display for EconomicSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EconomicSector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EconomicSector::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::unknown_variant("economic sector", s))
    }
}
