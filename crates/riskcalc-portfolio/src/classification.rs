//! Region and sector classification of raw exposure codes.
//!
//! Classification never fails: blank or unrecognized codes land in the
//! fallback buckets ([`GeographicRegion::NonEuropean`] and
//! [`EconomicSector::Other`]) so one malformed record cannot abort a batch.

use std::collections::HashMap;

use riskcalc_core::{EconomicSector, ExposureRecording, GeographicRegion};

/// ISO 3166-1 alpha-2 codes of the domestic market.
const DOMESTIC: &[&str] = &["IT"];

/// European countries other than Italy: EU member states, EEA/EFTA members,
/// the United Kingdom and the microstates sharing the euro area.
const EUROPEAN: &[&str] = &[
    // EU member states
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE",
    "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
    // EEA / EFTA
    "CH", "IS", "LI", "NO",
    // Others
    "GB", "AD", "MC", "SM", "VA",
];

const SOVEREIGN_TERMS: &[&str] = &[
    "SOVEREIGN",
    "GOVERNMENT",
    "GOVT",
    "TREASURY",
    "PUBLIC_SECTOR",
    "CENTRAL_BANK",
    "MUNICIPAL",
];
const MORTGAGE_TERMS: &[&str] = &["MORTGAGE", "HOME_LOAN"];
const BANKING_TERMS: &[&str] = &[
    "BANK",
    "BANKS",
    "BANKING",
    "INTERBANK",
    "CREDIT_INSTITUTION",
    "FINANCIAL_INSTITUTION",
];
const CORPORATE_TERMS: &[&str] = &["CORPORATE", "BUSINESS", "SME", "COMMERCIAL", "COMPANY"];

/// Maps country and product codes onto the region and sector taxonomies.
///
/// Sector overrides are matched first, on the normalized product code, so a
/// bank can pin house-specific product names to a sector.
#[derive(Debug, Clone, Default)]
pub struct ExposureClassifier {
    sector_overrides: HashMap<String, EconomicSector>,
}

impl ExposureClassifier {
    /// Creates a classifier with the built-in rules only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins one product code to a sector.
    #[must_use]
    pub fn with_sector_override(mut self, product_type: &str, sector: EconomicSector) -> Self {
        self.sector_overrides.insert(normalize(product_type), sector);
        self
    }

    /// Pins several product codes.
    #[must_use]
    pub fn with_sector_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a EconomicSector)>,
    {
        for (product, sector) in overrides {
            self.sector_overrides.insert(normalize(product), *sector);
        }
        self
    }

    /// Region of an ISO 3166-1 alpha-2 country code.
    pub fn classify_region(&self, country_code: &str) -> GeographicRegion {
        let code = country_code.trim().to_ascii_uppercase();
        if DOMESTIC.contains(&code.as_str()) {
            GeographicRegion::Italy
        } else if EUROPEAN.contains(&code.as_str()) {
            GeographicRegion::EuOther
        } else {
            GeographicRegion::NonEuropean
        }
    }

    /// Sector of a free-form product type.
    pub fn classify_sector(&self, product_type: &str) -> EconomicSector {
        let code = normalize(product_type);
        if code.is_empty() {
            return EconomicSector::Other;
        }
        if let Some(sector) = self.sector_overrides.get(&code) {
            return *sector;
        }
        if let Ok(sector) = code.parse::<EconomicSector>() {
            return sector;
        }

        if has_any_term(&code, SOVEREIGN_TERMS) {
            EconomicSector::Sovereign
        } else if has_any_term(&code, MORTGAGE_TERMS) {
            // commercial real estate lending is corporate risk
            if has_term(&code, "COMMERCIAL") {
                EconomicSector::Corporate
            } else {
                EconomicSector::RetailMortgage
            }
        } else if has_any_term(&code, BANKING_TERMS) {
            EconomicSector::Banking
        } else if has_any_term(&code, CORPORATE_TERMS) {
            EconomicSector::Corporate
        } else {
            EconomicSector::Other
        }
    }

    /// Both buckets of a record.
    pub fn classify(&self, record: &ExposureRecording) -> (GeographicRegion, EconomicSector) {
        (
            self.classify_region(record.country_code()),
            self.classify_sector(record.product_type()),
        )
    }
}

/// Upper-cases and joins words with underscores: "Home loan" -> "HOME_LOAN".
fn normalize(raw: &str) -> String {
    raw.trim()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '/')
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Whole-word match of `term` (itself possibly multi-word) inside `code`.
fn has_term(code: &str, term: &str) -> bool {
    code == term
        || code.starts_with(&format!("{term}_"))
        || code.ends_with(&format!("_{term}"))
        || code.contains(&format!("_{term}_"))
}

fn has_any_term(code: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| has_term(code, term))
}
