//! Failure type shared by handlers and middlewares.
//!
//! A [`HandlerError`] remembers where it was raised, so the error boundary in the
//! [`Dispatcher`](crate::Dispatcher) can report `"<message> file:<file> line:<line>"`
//! without a process-wide error hook.

use std::error::Error;
use std::fmt;
use std::panic::Location;

/// Boxed source error carried by a [`HandlerError`].
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The result every handler and middleware returns.
///
/// `Ok` can only be produced by one of the [`Response`](crate::Response) finalizers.
pub type HandlerResult = Result<crate::Finalized, HandlerError>;

/// An error raised while running a handler or a middleware.
///
/// Any `std::error::Error` converts into it through `?`, and the conversion records the
/// location of the `?` expression.
pub struct HandlerError {
    source: BoxError,
    file: &'static str,
    line: u32,
}

impl HandlerError {
    /// Creates an error from a plain message, located at the caller.
    #[track_caller]
    pub fn msg<M: fmt::Display>(message: M) -> Self {
        Self::located(message.to_string().into(), Location::caller())
    }

    /// Creates an error with an explicit location, used when the location is known
    /// from somewhere else (for example a panic).
    pub fn with_location<M: fmt::Display>(message: M, file: &'static str, line: u32) -> Self {
        Self { source: message.to_string().into(), file, line }
    }

    #[track_caller]
    pub(crate) fn already_finalized() -> Self {
        Self::msg("response has already been finalized")
    }

    fn located(source: BoxError, location: &'static Location<'static>) -> Self {
        Self { source, file: location.file(), line: location.line() }
    }

    /// The file the error was raised in.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// The line the error was raised at.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The underlying error.
    pub fn source_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Formats the message the way the error boundary reports it.
    pub fn report(&self) -> String {
        format_error_message(&self.source.to_string(), self.file, self.line)
    }
}

impl<E> From<E> for HandlerError
where
    E: Error + Send + Sync + 'static,
{
    #[track_caller]
    fn from(error: E) -> Self {
        Self::located(Box::new(error), Location::caller())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("source", &self.source)
            .field("file", &self.file)
            .field("line", &self.line)
            .finish()
    }
}

/// `"<message> file:<file> line:<line>"`
pub fn format_error_message(message: &str, file: &str, line: u32) -> String {
    format!("{message} file:{file} line:{line}")
}
