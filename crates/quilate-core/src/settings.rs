//! Engine settings, uniform within one run.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::state::DEFAULT_OVERDUE_DAYS;
use crate::time::{StoreOffset, DEFAULT_UTC_OFFSET_MINUTES};
use crate::types::DEFAULT_CARD_FEE_BPS;
use crate::validation::validate_bps;

/// Knobs of the reporting engine.
///
/// ## Defaults
/// | Setting             | Default | Meaning                       |
/// |---------------------|---------|-------------------------------|
/// | `card_fee_bps`      | 300     | 3% acquirer fee on tarjeta    |
/// | `utc_offset_minutes`| -360    | store wall clock is UTC−06    |
/// | `overdue_days`      | 75      | age sweep threshold           |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub card_fee_bps: u32,
    pub utc_offset_minutes: i32,
    pub overdue_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            card_fee_bps: DEFAULT_CARD_FEE_BPS,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            overdue_days: DEFAULT_OVERDUE_DAYS,
        }
    }
}

impl EngineSettings {
    /// Validated store offset.
    pub fn offset(&self) -> CoreResult<StoreOffset> {
        StoreOffset::from_minutes(self.utc_offset_minutes)
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_bps("card_fee_bps", self.card_fee_bps)?;
        self.offset()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.offset().unwrap(), StoreOffset::default());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let settings: EngineSettings = serde_json::from_str(r#"{"overdue_days": 90}"#).unwrap();
        assert_eq!(settings.overdue_days, 90);
        assert_eq!(settings.card_fee_bps, DEFAULT_CARD_FEE_BPS);
    }

    #[test]
    fn test_invalid_fee_rejected() {
        let settings = EngineSettings {
            card_fee_bps: 20_000,
            ..EngineSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
