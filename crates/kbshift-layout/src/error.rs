#![forbid(unsafe_code)]

use kbshift_runtime::ConsumerId;
use thiserror::Error;

use crate::target::TargetId;

pub type Result<T> = std::result::Result<T, KeyboardError>;

/// Configuration and bookkeeping errors raised by a synchronizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyboardError {
    #[error("{consumer}: keyboard handling misconfigured: {reason}")]
    MisconfiguredConsumer {
        consumer: ConsumerId,
        reason: &'static str,
    },

    #[error("no baseline recorded for managed {target}")]
    MissingBaseline { target: TargetId },

    #[error("{consumer}: baselines already captured; clear them before capturing again")]
    CaptureInFlight { consumer: ConsumerId },

    #[error("managed {target} registered twice")]
    DuplicateTarget { target: TargetId },

    #[error("{consumer}: keyboard margin must be a finite number >= 0, got {margin}")]
    InvalidMargin { consumer: ConsumerId, margin: f64 },
}
