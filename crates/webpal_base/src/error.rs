use std::error::Error as StdError;
use std::fmt;
use std::io;

use tracing_error::{SpanTrace, SpanTraceStatus};

use crate::return_code::ReturnCode;

/* 📖 # Why a custom error type next to ReturnCode?

PAL primitives speak ReturnCode, because that is the contract every backend shares.
Application plumbing (configuration, the CLI) needs more than a number: which file, which step,
and which span it happened in. WebPalError carries that, and a ReturnCode converts into it
so PAL failures can be propagated with `?`.
 */

/// Error variants that can occur in webpal operations.
#[derive(Debug)]
pub enum ErrorKind {
    /// Reading or writing a std stream failed
    Io { source: io::Error },

    /// A PAL primitive returned an error code
    Platform { code: ReturnCode },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/// Error wrapping an ErrorKind with context, an optional cause and the span trace at creation.
pub struct WebPalError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<WebPalError>>,
    span_trace: SpanTrace,
}

impl WebPalError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a message-only error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates an error from a PAL return code.
    pub fn platform(code: ReturnCode) -> Self {
        Self::new(ErrorKind::Platform { code })
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: WebPalError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    pub fn cause(&self) -> Option<&WebPalError> {
        self.cause.as_deref()
    }

    /// The PAL code behind this error, if it came from a PAL primitive.
    pub fn return_code(&self) -> Option<ReturnCode> {
        match &self.kind {
            ErrorKind::Platform { code } => Some(*code),
            _ => None,
        }
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_kind(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io { source } => write!(f, "I/O error: {}", source),
            ErrorKind::Platform { code } => write!(f, "Platform error: {}", code),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let items = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i + 1 == items { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "{}└─ cause: ", indent)?;
            cause.fmt_kind(f)?;
            writeln!(f)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for WebPalError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ReturnCode> for WebPalError {
    fn from(code: ReturnCode) -> Self {
        Self::platform(code)
    }
}

impl From<ReturnCode> for Box<WebPalError> {
    fn from(code: ReturnCode) -> Self {
        Box::new(WebPalError::platform(code))
    }
}

impl From<io::Error> for WebPalError {
    fn from(source: io::Error) -> Self {
        Self::new(ErrorKind::Io { source })
    }
}

impl StdError for WebPalError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::Io { source } => Some(source),
            ErrorKind::Platform { code } => Some(code),
            ErrorKind::Message { .. } => self
                .cause
                .as_deref()
                .map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for WebPalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        self.fmt_kind(f)
    }
}

/* 📖 # Why a hand-written Debug?

Errors end up in logs and test failures. A tree of message, context, causes and the span
trace reads far better there than the derived struct dump.
*/
impl fmt::Debug for WebPalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_kind(f)?;
        writeln!(f)?;
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for webpal application code.
pub type Result<T> = std::result::Result<T, Box<WebPalError>>;
pub type WebPalResult<T> = Result<T>;

/// Build a boxed message error with `format!` syntax.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::WebPalError::message(format!($($arg)*)))
    };
}

/// Return early with a boxed message error.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error. Eager evaluation.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Attaches context using lazy evaluation.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| Box::new((*err).context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new((*err).with_context(f)))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, ReturnCode> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|code| Box::new(WebPalError::platform(code).context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|code| Box::new(WebPalError::platform(code).with_context(f)))
    }
}

impl<T> ResultExt<T> for io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| Box::new(WebPalError::from(source).context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| Box::new(WebPalError::from(source).with_context(f)))
    }
}
