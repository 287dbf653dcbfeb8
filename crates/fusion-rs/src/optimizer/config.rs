use anyhow::{Context, Result};
use serde::Deserialize;

use crate::env;

/// Switches controlling the fusion pipeline.
///
/// Passed explicitly to passes; nothing here is read from process-wide state after construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Enables the IR-based fusion pass. Disabled passes leave the graph untouched.
    pub ir_based_fusion: bool,
    /// Upper bound on iterations of a fixed-point pipeline group.
    pub fixed_point_max_iters: usize,
    /// Emit per-pass statistics through `tracing`.
    pub log_stats: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            ir_based_fusion: false,
            fixed_point_max_iters: 2,
            log_stats: false,
        }
    }
}

impl FusionConfig {
    /// Configuration with IR-based fusion switched on.
    pub fn enabled() -> Self {
        Self {
            ir_based_fusion: true,
            ..Self::default()
        }
    }

    /// Reads `FUSIONRS_IR_BASED_FUSION`, `FUSIONRS_FIXED_POINT_ITERS` and `FUSIONRS_PASS_STATS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ir_based_fusion: env::flag("FUSIONRS_IR_BASED_FUSION")
                .unwrap_or(defaults.ir_based_fusion),
            fixed_point_max_iters: env::usize_var("FUSIONRS_FIXED_POINT_ITERS")
                .unwrap_or(defaults.fixed_point_max_iters),
            log_stats: env::flag("FUSIONRS_PASS_STATS").unwrap_or(defaults.log_stats),
        }
    }

    /// Parses a JSON object; missing fields take their defaults.
    pub fn from_json_str(src: &str) -> Result<Self> {
        serde_json::from_str(src).context("invalid fusion config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fusion_is_disabled_by_default() {
        let cfg = FusionConfig::default();
        assert!(!cfg.ir_based_fusion);
        assert_eq!(cfg.fixed_point_max_iters, 2);
    }

    #[test]
    fn json_fills_missing_fields() {
        let cfg = FusionConfig::from_json_str(r#"{ "ir_based_fusion": true }"#).unwrap();
        assert!(cfg.ir_based_fusion);
        assert_eq!(cfg.fixed_point_max_iters, 2);
        assert!(!cfg.log_stats);
    }

    #[test]
    fn json_rejects_wrong_types() {
        assert!(FusionConfig::from_json_str(r#"{ "ir_based_fusion": "maybe" }"#).is_err());
    }
}
