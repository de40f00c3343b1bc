//! Domain types for exposure risk calculation.
//!
//! - [`EurAmount`]: Amount in the EUR reporting currency
//! - [`CurrencyCode`]: ISO 4217 currency code with minor-unit precision
//! - [`ExchangeRate`]: Positive conversion rate between two currencies
//! - [`ExposureId`], [`BatchId`], [`BankId`]: String identifiers
//! - [`GeographicRegion`], [`EconomicSector`]: Concentration buckets
//! - [`ExposureRecording`]: One validated input exposure record
//! - [`RawMitigationData`]: One unconverted collateral or guarantee

mod amount;
mod classification;
mod currency;
mod exposure;
mod ids;
mod mitigation;

pub use amount::{round_half_up, EurAmount};
pub use classification::{EconomicSector, GeographicRegion};
pub use currency::{CurrencyCode, ExchangeRate};
pub use exposure::ExposureRecording;
pub use ids::{BankId, BatchId, ExposureId};
pub use mitigation::{MitigationType, RawMitigationData};
