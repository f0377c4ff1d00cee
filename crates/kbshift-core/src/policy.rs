#![forbid(unsafe_code)]

//! Policy-as-data configuration for keyboard handling.
//!
//! Captures every tunable as a single [`KeyboardPolicy`] that can be loaded
//! from TOML or JSON at startup.
//!
//! # Loading
//!
//! ```toml
//! # kbshift.toml
//! [layout]
//! margin = 24.0
//! center_shift = "full"
//!
//! [rotation]
//! duplicate_budget = 2
//! ```
//!
//! ```rust,ignore
//! let policy = KeyboardPolicy::from_toml_file("kbshift.toml")?;
//! let policy = KeyboardPolicy::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `KeyboardPolicy::default()` is a 40 point margin, half-overlap shifts for
//! center-anchored constraints, baseline re-snapshots on show, and a rotation
//! guard budget of 4.

#[cfg(feature = "policy-config")]
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default gap between the keyboard and the active input element.
pub const DEFAULT_KEYBOARD_MARGIN: f64 = 40.0;

/// Upper bound accepted for [`RotationPolicy::duplicate_budget`].
pub const MAX_DUPLICATE_BUDGET: u8 = 8;

/// Top-level keyboard handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardPolicy {
    /// Layout adjustment parameters.
    pub layout: LayoutPolicy,
    /// Rotation duplicate suppression parameters.
    pub rotation: RotationPolicy,
}

/// How far a center-anchored constraint moves for a given overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterShift {
    /// Subtract half the overlap.
    #[default]
    Half,
    /// Subtract the whole overlap.
    Full,
}

impl CenterShift {
    /// Portion of `overlap` applied to a center-anchored constraint.
    #[inline]
    pub fn apply(self, overlap: f64) -> f64 {
        match self {
            Self::Half => overlap / 2.0,
            Self::Full => overlap,
        }
    }
}

/// Layout adjustment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPolicy {
    /// Gap kept between the keyboard and the active input element.
    pub margin: f64,
    /// Shift rule for center-anchored constraints.
    pub center_shift: CenterShift,
    /// Re-capture view baselines on a hidden→visible edge when the view
    /// structure changed since the last capture.
    pub resnapshot_on_show: bool,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            margin: DEFAULT_KEYBOARD_MARGIN,
            center_shift: CenterShift::Half,
            resnapshot_on_show: true,
        }
    }
}

/// Rotation duplicate suppression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Whether the rotation guard is active at all.
    pub enabled: bool,
    /// Transitions tagged as rotation-caused after each orientation signal.
    pub duplicate_budget: u8,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            duplicate_budget: 4,
        }
    }
}

impl KeyboardPolicy {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyConfigError> {
        let policy: Self = toml::from_str(s)?;
        policy.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, PolicyConfigError> {
        let policy: Self = serde_json::from_str(s)?;
        policy.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the policy
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.layout.margin.is_finite() || self.layout.margin < 0.0 {
            errors.push(format!(
                "layout.margin must be a finite number >= 0, got {}",
                self.layout.margin
            ));
        }

        if self.rotation.duplicate_budget > MAX_DUPLICATE_BUDGET {
            errors.push(format!(
                "rotation.duplicate_budget must be <= {MAX_DUPLICATE_BUDGET}, got {}",
                self.rotation.duplicate_budget
            ));
        }

        errors
    }

    /// Return `self` if valid, otherwise the collected validation errors.
    pub fn validated(self) -> Result<Self, PolicyConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyConfigError::Validation(errors))
        }
    }
}

/// Errors from loading or validating a [`KeyboardPolicy`].
#[derive(Debug, thiserror::Error)]
pub enum PolicyConfigError {
    /// I/O error reading a file.
    #[error("failed to read keyboard policy: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    #[error("failed to parse keyboard policy TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    #[error("failed to parse keyboard policy JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Validation errors.
    #[error("invalid keyboard policy: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let policy = KeyboardPolicy::default();
        assert!(policy.validate().is_empty());
        assert_eq!(policy.layout.margin, DEFAULT_KEYBOARD_MARGIN);
        assert_eq!(policy.layout.center_shift, CenterShift::Half);
        assert!(policy.rotation.enabled);
        assert_eq!(policy.rotation.duplicate_budget, 4);
    }

    #[test]
    fn negative_margin_is_invalid() {
        let mut policy = KeyboardPolicy::default();
        policy.layout.margin = -1.0;
        let errors = policy.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("layout.margin"));
    }

    #[test]
    fn oversized_budget_is_invalid() {
        let mut policy = KeyboardPolicy::default();
        policy.rotation.duplicate_budget = 9;
        assert!(matches!(
            policy.validated(),
            Err(PolicyConfigError::Validation(errors)) if errors.len() == 1
        ));
    }

    #[test]
    fn center_shift_portions() {
        assert_eq!(CenterShift::Half.apply(100.0), 50.0);
        assert_eq!(CenterShift::Full.apply(100.0), 100.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let policy: KeyboardPolicy =
            serde_json::from_str(r#"{"layout": {"margin": 12.0}}"#).unwrap();
        assert_eq!(policy.layout.margin, 12.0);
        assert!(policy.layout.resnapshot_on_show);
        assert_eq!(policy.rotation, RotationPolicy::default());
    }
}
