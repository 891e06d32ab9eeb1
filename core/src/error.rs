//! Error types
//!
//! Nothing in the core is fatal: every error is logged by the scheduler and
//! the operation is retried at its next natural interval.

/// Publishing a snapshot failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Collaborator not connected/authenticated
    NotReady,
    /// Payload did not fit its buffer
    Payload,
    /// Transport failed while sending
    Transport,
    /// Remote end rejected the request
    Rejected { code: i32 },
}

impl core::fmt::Display for PublishError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotReady => write!(f, "Publisher not ready"),
            Self::Payload => write!(f, "Payload too large"),
            Self::Transport => write!(f, "Transport error"),
            Self::Rejected { code } => write!(f, "Rejected by remote (code {})", code),
        }
    }
}

impl core::error::Error for PublishError {}

/// Payload construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Output buffer exhausted
    Capacity,
    /// Topic contains MQTT wildcard or NUL characters
    InvalidTopic,
}

impl core::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Capacity => write!(f, "Payload buffer exhausted"),
            Self::InvalidTopic => write!(f, "Invalid MQTT topic"),
        }
    }
}

impl core::error::Error for PayloadError {}

impl From<core::fmt::Error> for PayloadError {
    fn from(_: core::fmt::Error) -> Self {
        Self::Capacity
    }
}

impl From<PayloadError> for PublishError {
    fn from(_: PayloadError) -> Self {
        Self::Payload
    }
}

/// Clock resynchronization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// Remote time source did not answer
    SourceUnavailable,
}

impl core::fmt::Display for TimeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SourceUnavailable => write!(f, "Time source unavailable"),
        }
    }
}

impl core::error::Error for TimeError {}

/// Network link bring-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Link did not come up within the allowed attempts
    Timeout { attempts: u32 },
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout { attempts } => write!(f, "Link down after {} attempts", attempts),
        }
    }
}

impl core::error::Error for LinkError {}
