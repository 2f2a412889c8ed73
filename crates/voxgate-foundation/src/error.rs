use thiserror::Error;

/// Top-level controller errors.
///
/// Recognizer and synthesizer failures are handled locally by the
/// controller; the only errors that escape to the embedding application
/// are the ones raised during initialization.
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Speech APIs are absent on this host (no recognizer or synthesizer
    /// backend compiled in / installed). Fatal for the controller.
    #[error("Unsupported environment: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Preference storage error: {0}")]
    Preference(#[from] std::io::Error),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_mentions_reason() {
        let err = ControllerError::Unsupported("no recognizer backend".into());
        assert!(format!("{}", err).contains("no recognizer backend"));
    }

    #[test]
    fn preference_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ControllerError = io.into();
        assert!(matches!(err, ControllerError::Preference(_)));
    }
}
