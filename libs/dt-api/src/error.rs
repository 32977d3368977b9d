use std::fmt;

/// Error kind for core errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed consumer configuration.
    Config,
    Io,
    /// Event could not be serialized or parsed.
    Format,
    /// Event failed verification.
    Verify,
    /// Call not allowed in the current core state (not initialized, initialized twice).
    State,
}

/// Error returned by every core and consumer operation.
#[derive(Debug)]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    pub fn verify(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Verify, message: msg.into() }
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::State, message: msg.into() }
    }

    pub fn is_verify(&self) -> bool {
        self.kind == ErrorKind::Verify
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CoreError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → CoreError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err = CoreError::io("disk full").with_context("log consumer");
        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.message, "log consumer: disk full");
        assert_eq!(err.to_string(), "Io: log consumer: disk full");
    }

    #[test]
    fn json_error_maps_to_format() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CoreError = parse.into();
        assert_eq!(err.kind, ErrorKind::Format);
        assert!(!err.is_verify());
    }
}
