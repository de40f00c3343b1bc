//! Identifier types.
//!
//! All identifiers are opaque strings chosen upstream; nothing here parses
//! or normalizes them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            #[allow(missing_docs)]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[allow(missing_docs)]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Exposure identifier as supplied by the reporting bank.
    ExposureId
);

string_id!(
    /// Batch identifier. One batch is one submitted exposure file.
    BatchId
);

string_id!(
    /// Reporting bank identifier (ABI code).
    BankId
);
