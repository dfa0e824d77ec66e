//! Deserialization helpers for the exchange's numeric fields.
//!
//! The exchange encodes share counts as JSON numbers that may carry a
//! fractional part (`1500.0`), so plain integer deserialization is too strict.

use serde::{Deserialize, Deserializer};

/// Non-negative share count.
pub(crate) fn quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "invalid quantity: {value}"
        )));
    }
    Ok(value.round() as u64)
}

/// Signed share count (positions).
pub(crate) fn signed_quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "invalid position: {value}"
        )));
    }
    Ok(value.round() as i64)
}
