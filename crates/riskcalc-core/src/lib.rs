//! # Riskcalc Core
//!
//! Core types for the Riskcalc large-exposure risk calculation engine.
//!
//! This crate provides the foundational building blocks used throughout Riskcalc:
//!
//! - **Amounts**: [`EurAmount`] for reporting-currency values, exact decimal only
//! - **Currencies**: [`CurrencyCode`] (ISO 4217) and [`ExchangeRate`]
//! - **Identifiers**: [`ExposureId`], [`BatchId`], [`BankId`]
//! - **Taxonomies**: [`GeographicRegion`] and [`EconomicSector`] buckets
//! - **Input records**: [`ExposureRecording`] and [`RawMitigationData`]
//!
//! ## Design Philosophy
//!
//! - **Type Safety**: Newtypes prevent mixing EUR values with source-currency values
//! - **No Floating Point**: Every monetary value is a `rust_decimal::Decimal`
//! - **Validating Constructors**: Records are checked once, at construction
//!
//! ## Example
//!
//! ```rust
//! use riskcalc_core::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! let usd = CurrencyCode::new("usd").unwrap();
//! assert_eq!(usd.as_str(), "USD");
//!
//! let amount = EurAmount::new(dec!(100.005)).round_to(2);
//! assert_eq!(amount.value(), dec!(100.01));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]

pub mod error;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::types::{
        round_half_up, BankId, BatchId, CurrencyCode, EconomicSector, EurAmount, ExchangeRate,
        ExposureId, ExposureRecording, GeographicRegion, MitigationType, RawMitigationData,
    };
}

// Re-export commonly used types at crate root
pub use error::{CoreError, CoreResult};
pub use types::{
    round_half_up, BankId, BatchId, CurrencyCode, EconomicSector, EurAmount, ExchangeRate,
    ExposureId, ExposureRecording, GeographicRegion, MitigationType, RawMitigationData,
};
