//! LoRA hyper-parameter configuration
//!
//! Validates rank/alpha/dropout at construction so an adapted layer can only
//! be built from a consistent configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a low-rank adapter
///
/// `rank == 0` means "adapter disabled": the layer behaves as a plain dense
/// layer and no factor matrices are allocated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoraConfig {
    /// Adapter rank (typically 4, 8, 16, 32, or 64); 0 disables the adapter
    pub rank: usize,
    /// Scaling numerator (often same as rank); the correction is scaled by
    /// alpha / rank
    pub alpha: f32,
    /// Dropout rate applied to the adapter path, in [0.0, 1.0)
    pub dropout: f32,
}

impl LoraConfig {
    /// Create a new configuration with no dropout
    pub fn new(rank: usize, alpha: f32) -> Result<Self> {
        if alpha < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "Alpha must be non-negative, got {alpha}"
            )));
        }
        if rank == 0 && alpha > 0.0 {
            return Err(Error::InvalidConfig(format!(
                "Alpha {alpha} supplied with rank 0 (adapter disabled)"
            )));
        }
        Ok(Self {
            rank,
            alpha,
            dropout: 0.0,
        })
    }

    /// Configuration with the adapter disabled
    pub fn disabled() -> Self {
        Self {
            rank: 0,
            alpha: 0.0,
            dropout: 0.0,
        }
    }

    /// Set the adapter-path dropout rate
    pub fn with_dropout(mut self, dropout: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout) {
            return Err(Error::InvalidConfig(format!(
                "Dropout rate must be in [0.0, 1.0), got {dropout}"
            )));
        }
        self.dropout = dropout;
        Ok(self)
    }

    /// Correction scale factor: alpha / rank (0 when disabled)
    pub fn scaling(&self) -> f32 {
        if self.rank > 0 {
            self.alpha / self.rank as f32
        } else {
            0.0
        }
    }

    /// Whether an adapter will be allocated
    pub fn is_enabled(&self) -> bool {
        self.rank > 0
    }
}

impl Default for LoraConfig {
    /// Default configuration: rank=8, alpha=8, no dropout
    fn default() -> Self {
        Self {
            rank: 8,
            alpha: 8.0,
            dropout: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(200))]

        /// scaling must equal alpha/rank for any enabled configuration
        #[test]
        fn prop_scaling_is_alpha_over_rank(
            rank in 1usize..128,
            alpha in 0.0f32..128.0,
        ) {
            let config = LoraConfig::new(rank, alpha).unwrap();
            let expected = alpha / rank as f32;
            prop_assert!((config.scaling() - expected).abs() < 1e-6);
            prop_assert!(config.is_enabled());
        }

        /// dropout inside [0, 1) is accepted and preserved
        #[test]
        fn prop_dropout_in_range_accepted(
            rank in 1usize..64,
            dropout in 0.0f32..0.999,
        ) {
            let config = LoraConfig::new(rank, rank as f32)
                .unwrap()
                .with_dropout(dropout)
                .unwrap();
            prop_assert!((config.dropout - dropout).abs() < 1e-6);
        }

        /// dropout at or above 1.0 is always rejected
        #[test]
        fn prop_dropout_out_of_range_rejected(
            dropout in 1.0f32..10.0,
        ) {
            let config = LoraConfig::new(4, 4.0).unwrap();
            prop_assert!(config.with_dropout(dropout).is_err());
        }

        /// positive alpha with rank 0 is always rejected
        #[test]
        fn prop_alpha_without_rank_rejected(
            alpha in 0.001f32..64.0,
        ) {
            prop_assert!(LoraConfig::new(0, alpha).is_err());
        }
    }

    #[test]
    fn test_config_creation() {
        let config = LoraConfig::new(16, 32.0).unwrap();
        assert_eq!(config.rank, 16);
        assert_eq!(config.alpha, 32.0);
        assert_eq!(config.dropout, 0.0);
        assert!((config.scaling() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_config() {
        let config = LoraConfig::disabled();
        assert!(!config.is_enabled());
        assert_eq!(config.scaling(), 0.0);
    }

    #[test]
    fn test_zero_alpha_with_rank_allowed() {
        // Adapter present but contributing nothing
        let config = LoraConfig::new(4, 0.0).unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.scaling(), 0.0);
    }

    #[test]
    fn test_negative_alpha_rejected() {
        assert!(LoraConfig::new(4, -1.0).is_err());
    }

    #[test]
    fn test_negative_dropout_rejected() {
        let config = LoraConfig::new(4, 4.0).unwrap();
        assert!(config.with_dropout(-0.1).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LoraConfig::default();
        assert_eq!(config.rank, 8);
        assert_eq!(config.alpha, 8.0);
        assert!((config.scaling() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = LoraConfig::new(8, 16.0).unwrap().with_dropout(0.1).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let restored: LoraConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.rank, 8);
        assert!((restored.alpha - 16.0).abs() < 1e-6);
        assert!((restored.dropout - 0.1).abs() < 1e-6);
    }
}
