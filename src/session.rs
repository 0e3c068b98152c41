use std::{fmt, str::FromStr};

/// Identifier of the broadcaster being watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordingTarget(String);

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TargetError {
    #[error("target identifier must not be empty")]
    Empty,
}

impl RecordingTarget {
    pub fn new(id: impl Into<String>) -> Result<Self, TargetError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TargetError::Empty);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordingTarget {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for RecordingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phase of acquisition/recording. Owned by the orchestrator and replaced
/// wholesale after every component call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    NetworkDown,
    NetworkUp,
    NotLive,
    LiveDetected,
    EndpointResolved,
    Recording,
    Closed,
    Failed,
}

impl SessionState {
    /// Coarse numeric indicator printed alongside log lines.
    pub fn code(self) -> i8 {
        match self {
            SessionState::Unknown | SessionState::NetworkDown => 0,
            SessionState::NetworkUp => 1,
            SessionState::NotLive => 2,
            SessionState::LiveDetected => 3,
            SessionState::EndpointResolved => 4,
            SessionState::Recording => 5,
            SessionState::Closed => 7,
            SessionState::Failed => -1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::NetworkDown => "network down",
            SessionState::NetworkUp => "network up",
            SessionState::NotLive => "not live",
            SessionState::LiveDetected => "live detected",
            SessionState::EndpointResolved => "endpoint resolved",
            SessionState::Recording => "recording",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusCode: {} ({})", self.code(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_rejects_blank() {
        assert_eq!(RecordingTarget::new(""), Err(TargetError::Empty));
        assert_eq!(RecordingTarget::new("  "), Err(TargetError::Empty));
        assert_eq!(
            "c:someone".parse::<RecordingTarget>().unwrap().as_str(),
            "c:someone"
        );
    }

    #[test]
    fn state_display_carries_code() {
        assert_eq!(SessionState::default(), SessionState::Unknown);
        assert_eq!(
            SessionState::EndpointResolved.to_string(),
            "StatusCode: 4 (endpoint resolved)"
        );
        assert_eq!(SessionState::Closed.code(), 7);
    }
}
