//! Credit risk mitigation input records.

use super::{CurrencyCode, ExposureId};
use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of credit risk mitigation instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MitigationType {
    /// Cash, securities or other financial collateral.
    FinancialCollateral,
    /// Personal guarantee or credit derivative.
    Guarantee,
    /// Residential or commercial property.
    RealEstate,
    /// Other physical collateral.
    PhysicalAsset,
}

impl MitigationType {
    /// Code used in input files and reports.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            MitigationType::FinancialCollateral => "FINANCIAL_COLLATERAL",
            MitigationType::Guarantee => "GUARANTEE",
            MitigationType::RealEstate => "REAL_ESTATE",
            MitigationType::PhysicalAsset => "PHYSICAL_ASSET",
        }
    }
}

impl fmt::Display for MitigationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for MitigationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FINANCIAL_COLLATERAL" => Ok(MitigationType::FinancialCollateral),
            "GUARANTEE" => Ok(MitigationType::Guarantee),
            "REAL_ESTATE" => Ok(MitigationType::RealEstate),
            "PHYSICAL_ASSET" => Ok(MitigationType::PhysicalAsset),
            _ => Err(CoreError::unknown_variant("mitigation type", s)),
        }
    }
}

/// A mitigation as reported, in its original currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMitigationData {
    exposure_id: ExposureId,
    mitigation_type: MitigationType,
    #[serde(with = "rust_decimal::serde::str")]
    value: Decimal,
    currency: CurrencyCode,
}

impl RawMitigationData {
    /// Builds a mitigation record, rejecting negative values.
    pub fn new(
        exposure_id: impl Into<String>,
        mitigation_type: MitigationType,
        value: Decimal,
        currency: CurrencyCode,
    ) -> CoreResult<Self> {
        let exposure_id = exposure_id.into();
        if exposure_id.trim().is_empty() {
            return Err(CoreError::missing_field("exposure_id"));
        }
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::invalid_amount(
                "value",
                value,
                "mitigation value must not be negative",
            ));
        }
        Ok(Self {
            exposure_id: ExposureId::new(exposure_id.trim()),
            mitigation_type,
            value,
            currency,
        })
    }

    /// Exposure this mitigation protects.
    #[must_use]
    pub fn exposure_id(&self) -> &ExposureId {
        &self.exposure_id
    }

    /// Instrument kind.
    #[must_use]
    pub fn mitigation_type(&self) -> MitigationType {
        self.mitigation_type
    }

    /// Value in the original currency.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Original currency.
    #[must_use]
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mitigation_type_parse() {
        assert_eq!(
            "guarantee".parse::<MitigationType>().unwrap(),
            MitigationType::Guarantee
        );
        assert_eq!(
            " REAL_ESTATE ".parse::<MitigationType>().unwrap(),
            MitigationType::RealEstate
        );
        assert!("PLEDGE".parse::<MitigationType>().is_err());
    }

    #[test]
    fn test_raw_mitigation_validation() {
        let eur = CurrencyCode::eur();
        assert!(RawMitigationData::new("E1", MitigationType::Guarantee, dec!(-1), eur.clone())
            .is_err());
        assert!(RawMitigationData::new("", MitigationType::Guarantee, dec!(1), eur.clone())
            .is_err());

        let m = RawMitigationData::new("E1", MitigationType::Guarantee, dec!(300), eur).unwrap();
        assert_eq!(m.value(), dec!(300));
        assert_eq!(m.exposure_id().as_str(), "E1");
    }
}
