//! Netting of collateral and guarantees against gross exposure.

use riskcalc_core::{CurrencyCode, EurAmount, ExposureId, MitigationType, RawMitigationData};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, PortfolioResult};

/// A mitigation with its EUR value resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mitigation {
    mitigation_type: MitigationType,
    #[serde(with = "rust_decimal::serde::str")]
    original_value: Decimal,
    original_currency: CurrencyCode,
    value_eur: EurAmount,
}

impl Mitigation {
    /// Pairs a raw mitigation with its converted value.
    pub fn new(raw: &RawMitigationData, value_eur: EurAmount) -> PortfolioResult<Self> {
        if value_eur.is_negative() {
            return Err(PortfolioError::NegativeMitigation {
                exposure_id: raw.exposure_id().to_string(),
                amount: value_eur.value(),
            });
        }
        Ok(Self {
            mitigation_type: raw.mitigation_type(),
            original_value: raw.value(),
            original_currency: raw.currency().clone(),
            value_eur,
        })
    }

    /// Instrument kind.
    pub fn mitigation_type(&self) -> MitigationType {
        self.mitigation_type
    }

    /// Value in the original currency.
    pub fn original_value(&self) -> Decimal {
        self.original_value
    }

    /// Original currency.
    pub fn original_currency(&self) -> &CurrencyCode {
        &self.original_currency
    }

    /// Value in EUR.
    pub fn value_eur(&self) -> EurAmount {
        self.value_eur
    }
}

/// Gross exposure netted against its mitigations.
///
/// `net_exposure = max(0, gross_exposure - total_mitigation)`; an excess of
/// mitigation never produces negative risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedExposure {
    exposure_id: ExposureId,
    gross_exposure: EurAmount,
    net_exposure: EurAmount,
    total_mitigation: EurAmount,
    mitigations: Vec<Mitigation>,
}

impl ProtectedExposure {
    /// Nets `mitigations` against `gross_exposure`.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::NegativeGrossExposure`] when the gross
    /// exposure is below zero.
    pub fn calculate(
        exposure_id: ExposureId,
        gross_exposure: EurAmount,
        mitigations: Vec<Mitigation>,
    ) -> PortfolioResult<Self> {
        if gross_exposure.is_negative() {
            return Err(PortfolioError::NegativeGrossExposure {
                exposure_id: exposure_id.to_string(),
                amount: gross_exposure.value(),
            });
        }

        let total_mitigation: EurAmount = mitigations.iter().map(Mitigation::value_eur).sum();
        let net_exposure = gross_exposure.saturating_sub(total_mitigation);

        Ok(Self {
            exposure_id,
            gross_exposure,
            net_exposure,
            total_mitigation,
            mitigations,
        })
    }

    /// Exposure identifier.
    pub fn exposure_id(&self) -> &ExposureId {
        &self.exposure_id
    }

    /// Exposure before netting.
    pub fn gross_exposure(&self) -> EurAmount {
        self.gross_exposure
    }

    /// Exposure after netting, never negative.
    pub fn net_exposure(&self) -> EurAmount {
        self.net_exposure
    }

    /// Sum of mitigation values.
    pub fn total_mitigation(&self) -> EurAmount {
        self.total_mitigation
    }

    /// Mitigations applied.
    pub fn mitigations(&self) -> &[Mitigation] {
        &self.mitigations
    }

    /// True when any mitigation was applied.
    pub fn has_mitigations(&self) -> bool {
        !self.mitigations.is_empty()
    }

    /// True when mitigations cover the gross exposure in full.
    pub fn is_fully_covered(&self) -> bool {
        self.total_mitigation >= self.gross_exposure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mitigation(value: Decimal) -> Mitigation {
        let raw = RawMitigationData::new(
            "E1",
            MitigationType::FinancialCollateral,
            value,
            CurrencyCode::eur(),
        )
        .unwrap();
        Mitigation::new(&raw, EurAmount::new(value)).unwrap()
    }

    #[test]
    fn test_over_mitigation_floors_at_zero() {
        let p = ProtectedExposure::calculate(
            ExposureId::new("E1"),
            EurAmount::new(dec!(500)),
            vec![mitigation(dec!(300)), mitigation(dec!(300))],
        )
        .unwrap();

        assert_eq!(p.net_exposure(), EurAmount::zero());
        assert_eq!(p.total_mitigation().value(), dec!(600));
        assert!(p.is_fully_covered());
        assert!(p.has_mitigations());
    }

    #[test]
    fn test_partial_mitigation() {
        let p = ProtectedExposure::calculate(
            ExposureId::new("E1"),
            EurAmount::new(dec!(1000)),
            vec![mitigation(dec!(250.50))],
        )
        .unwrap();

        assert_eq!(p.net_exposure().value(), dec!(749.50));
        assert!(!p.is_fully_covered());
    }

    #[test]
    fn test_exact_cover_is_fully_covered() {
        let p = ProtectedExposure::calculate(
            ExposureId::new("E1"),
            EurAmount::new(dec!(100)),
            vec![mitigation(dec!(100))],
        )
        .unwrap();
        assert!(p.is_fully_covered());
        assert!(p.net_exposure().is_zero());
    }

    #[test]
    fn test_no_mitigations() {
        let p =
            ProtectedExposure::calculate(ExposureId::new("E1"), EurAmount::new(dec!(42)), vec![])
                .unwrap();
        assert!(!p.has_mitigations());
        assert!(!p.is_fully_covered());
        assert_eq!(p.net_exposure().value(), dec!(42));
    }

    #[test]
    fn test_zero_gross_without_mitigation_is_fully_covered() {
        // 0 >= 0
        let p = ProtectedExposure::calculate(ExposureId::new("E1"), EurAmount::zero(), vec![])
            .unwrap();
        assert!(p.is_fully_covered());
    }

    #[test]
    fn test_negative_gross_rejected() {
        let result =
            ProtectedExposure::calculate(ExposureId::new("E1"), EurAmount::new(dec!(-1)), vec![]);
        assert!(matches!(
            result,
            Err(PortfolioError::NegativeGrossExposure { .. })
        ));
    }

    #[test]
    fn test_negative_mitigation_value_rejected() {
        let raw = RawMitigationData::new(
            "E1",
            MitigationType::Guarantee,
            dec!(10),
            CurrencyCode::eur(),
        )
        .unwrap();
        assert!(Mitigation::new(&raw, EurAmount::new(dec!(-10))).is_err());
    }
}
