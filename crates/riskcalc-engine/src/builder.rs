//! Builder pattern for the risk calculation engine.

use std::sync::Arc;

use riskcalc_config::RiskCalculationConfig;
use riskcalc_traits::{ExchangeRateProvider, FileStorage};

use crate::engine::RiskCalculationEngine;
use crate::error::EngineError;
use crate::memory::{MemoryProbe, SystemMemoryProbe};

/// Builder for constructing a [`RiskCalculationEngine`].
pub struct RiskCalculationEngineBuilder {
    config: Option<RiskCalculationConfig>,
    rates: Option<Arc<dyn ExchangeRateProvider>>,
    storage: Option<Arc<dyn FileStorage>>,
    memory_probe: Option<Arc<dyn MemoryProbe>>,
}

impl RiskCalculationEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            rates: None,
            storage: None,
            memory_probe: None,
        }
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: RiskCalculationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the exchange-rate provider.
    pub fn with_rates(mut self, rates: Arc<dyn ExchangeRateProvider>) -> Self {
        self.rates = Some(rates);
        self
    }

    /// Set the file storage.
    pub fn with_storage(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the system memory probe.
    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.memory_probe = Some(probe);
        self
    }

    /// Build the engine.
    ///
    /// The configuration is required because the HHI breakpoints have no
    /// default.
    pub fn build(self) -> Result<RiskCalculationEngine, EngineError> {
        let config = self
            .config
            .ok_or_else(|| EngineError::ConfigError("config not configured".into()))?;

        let rates = self
            .rates
            .ok_or_else(|| EngineError::ConfigError("exchange rates not configured".into()))?;

        let storage = self
            .storage
            .ok_or_else(|| EngineError::ConfigError("storage not configured".into()))?;

        let probe = self
            .memory_probe
            .unwrap_or_else(|| Arc::new(SystemMemoryProbe::new()));

        RiskCalculationEngine::with_memory_probe(config, rates, storage, probe)
    }
}

impl Default for RiskCalculationEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RiskCalculationEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskCalculationEngineBuilder")
            .field("config", &self.config.is_some())
            .field("rates", &self.rates.is_some())
            .field("storage", &self.storage.is_some())
            .field("memory_probe", &self.memory_probe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_reported() {
        let err = RiskCalculationEngineBuilder::new().build().unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(ref m) if m.contains("config")));
    }
}
