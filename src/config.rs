/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Static configuration of one ensemble run.

use crate::error::OatesError;

/// How the replay window drives mapping-function and weight updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowMode {
    /// Weights and mapping functions are rebuilt from the window on every call.
    Sliding,
    /// `replay_window_size == 1`: nothing is reset between calls, and CC
    /// catch-up with the refresh that follows it only runs on the first step.
    Legacy,
}

/// Parameters of an [`crate::Oates`] run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OatesConfig {
    /// Decay multiplier of the WC slot when it loses, in [0, 1].
    pub beta_wc: f64,
    /// Decay multiplier of CC slots when they lose, in [0, 1].
    pub beta_cc: f64,
    /// WC sampling stride; instance `t` is used for training iff `t % period == 0`.
    pub period: usize,
    /// Replay window capacity `Q` (≥ 1). The value 1 selects [`WindowMode::Legacy`].
    pub replay_window_size: usize,
}

impl Default for OatesConfig {
    fn default() -> Self {
        Self { beta_wc: 0.5, beta_cc: 0.5, period: 10, replay_window_size: usize::MAX }
    }
}

impl OatesConfig {
    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), OatesError> {
        check_unit("beta_wc", self.beta_wc)?;
        check_unit("beta_cc", self.beta_cc)?;
        if self.period == 0 {
            return Err(OatesError::InvalidParameter {
                name: "period".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.replay_window_size == 0 {
            return Err(OatesError::InvalidParameter {
                name: "replay_window_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Mode selected by `replay_window_size`.
    pub fn mode(&self) -> WindowMode {
        if self.replay_window_size == 1 {
            WindowMode::Legacy
        } else {
            WindowMode::Sliding
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), OatesError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OatesError::InvalidParameter {
            name: name.into(),
            reason: alloc::format!("{} is outside [0, 1]", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_sliding() {
        let c = OatesConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.mode(), WindowMode::Sliding);
    }

    #[test]
    fn test_window_of_one_is_legacy() {
        let c = OatesConfig { replay_window_size: 1, ..Default::default() };
        assert_eq!(c.mode(), WindowMode::Legacy);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let bad = [
            OatesConfig { beta_wc: 1.5, ..Default::default() },
            OatesConfig { beta_cc: -0.1, ..Default::default() },
            OatesConfig { beta_cc: f64::NAN, ..Default::default() },
            OatesConfig { period: 0, ..Default::default() },
            OatesConfig { replay_window_size: 0, ..Default::default() },
        ];
        for c in bad {
            assert!(matches!(c.validate(), Err(OatesError::InvalidParameter { .. })), "{:?}", c);
        }
    }
}
