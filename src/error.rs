/// Category of a failed run.
///
/// Every kind is recoverable from the user's point of view: the run stops, the
/// message is shown, and the user re-triggers with adjusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required columns missing, unreadable dates, duplicate dates, empty file.
    Schema,
    /// Invalid or empty date selection.
    Range,
    /// Model fit or prediction failed.
    Fit,
    /// Invalid flags, config file, or parameter values.
    Config,
    /// Filesystem / terminal I/O.
    Io,
    /// Chart rendering failed.
    Render,
}

#[derive(Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fit, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Schema | ErrorKind::Config | ErrorKind::Io => 2,
            ErrorKind::Range => 3,
            ErrorKind::Fit | ErrorKind::Render => 4,
        }
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::schema("x").exit_code(), 2);
        assert_eq!(AppError::range("x").exit_code(), 3);
        assert_eq!(AppError::fit("x").exit_code(), 4);
        assert_eq!(AppError::fit("boom").to_string(), "boom");
    }
}
