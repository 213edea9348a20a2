//! Cross-field configuration validation

use super::MonitorConfig;
use crate::error::MonitorError;
use std::collections::HashSet;

/// Validate a configuration before the monitor accepts it
///
/// # Errors
/// Returns the first violation found: no tiers, a zero interval, a duplicate
/// tier name, or a zero gate timeout / history capacity.
pub fn validate_config(config: &MonitorConfig) -> Result<(), MonitorError> {
    if config.tiers.is_empty() {
        return Err(MonitorError::NoTiers);
    }

    let mut seen = HashSet::new();
    for tier in &config.tiers {
        if tier.interval.is_zero() {
            return Err(MonitorError::ZeroInterval {
                tier: tier.name.to_string(),
            });
        }
        if !seen.insert(tier.name.as_str()) {
            return Err(MonitorError::DuplicateTierName {
                tier: tier.name.to_string(),
            });
        }
    }

    if config.gate_timeout.is_zero() {
        return Err(MonitorError::ZeroDuration {
            field: "gate_timeout",
        });
    }
    if config.session_history_capacity == 0 {
        return Err(MonitorError::ZeroHistoryCapacity);
    }

    Ok(())
}
