use thiserror::Error;

/// Errors raised by the assessment engine and its device backends.
///
/// Permission and device failures are recoverable: the round returns to
/// `AwaitingPrompt` and the user may retry. The remaining variants indicate
/// a configuration or programming mistake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio device busy")]
    DeviceBusy,

    #[error("device error: {0}")]
    DeviceError(String),

    #[error("no active capture")]
    NoActiveCapture,

    #[error("prompt pool too small: requested {requested}, available {available}")]
    InsufficientPoolSize { requested: usize, available: usize },

    #[error("session not complete")]
    SessionNotComplete,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("intent `{intent}` not allowed in state {state}")]
    InvalidIntent { intent: &'static str, state: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AssessmentError {
    /// Whether the user can recover by retrying the same intent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::DeviceBusy | Self::DeviceError(_)
        )
    }

    /// Collapse a backend error into the controller's taxonomy.
    pub(crate) fn into_device_error(self) -> Self {
        match self {
            Self::PermissionDenied | Self::DeviceBusy | Self::DeviceError(_) => self,
            other => Self::DeviceError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_failures_are_recoverable() {
        assert!(AssessmentError::PermissionDenied.is_recoverable());
        assert!(AssessmentError::DeviceBusy.is_recoverable());
        assert!(AssessmentError::DeviceError("unplugged".into()).is_recoverable());
        assert!(!AssessmentError::SessionNotComplete.is_recoverable());
        assert!(!AssessmentError::InsufficientPoolSize { requested: 5, available: 2 }.is_recoverable());
        assert!(!AssessmentError::Serialization("bad json".into()).is_recoverable());
    }

    #[test]
    fn foreign_errors_normalise_to_device_error() {
        let err = AssessmentError::NoActiveCapture.into_device_error();
        assert_eq!(err, AssessmentError::DeviceError("no active capture".into()));
        assert_eq!(
            AssessmentError::DeviceBusy.into_device_error(),
            AssessmentError::DeviceBusy
        );
    }
}
