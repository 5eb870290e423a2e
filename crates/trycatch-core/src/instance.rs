//! Exception instances and their diagnostic rendering

use std::fmt;
use std::io;
use std::panic::Location;

use crate::config::{ORIGIN_CAPTURE, OriginCapture};
use crate::types::ExceptionType;

/// Message attached to an instance
///
/// A borrowed message is never released by the runtime. An owned message is released
/// exactly once, when the protected region holding it is exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Static text, not owned by the instance
    Borrowed(&'static str),
    /// Heap text owned by the instance
    Owned(String),
}

impl Message {
    /// Message text
    pub fn as_str(&self) -> &str {
        match self {
            Message::Borrowed(s) => s,
            Message::Owned(s) => s.as_str(),
        }
    }

    /// Whether the runtime is responsible for releasing the buffer
    pub fn is_owned(&self) -> bool {
        matches!(self, Message::Owned(_))
    }

    /// Borrow constant format strings, allocate only when there are arguments
    pub fn from_fmt(args: fmt::Arguments<'_>) -> Self {
        match args.as_str() {
            Some(s) => Message::Borrowed(s),
            None => Message::Owned(fmt::format(args)),
        }
    }
}

impl From<&'static str> for Message {
    fn from(s: &'static str) -> Self {
        Message::Borrowed(s)
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Owned(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location where an instance was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Origin {
    /// Source file
    pub file: Option<&'static str>,
    /// Line number (1-based)
    pub line: Option<u32>,
}

impl Origin {
    /// No recorded origin
    pub const UNKNOWN: Origin = Origin {
        file: None,
        line: None,
    };

    /// Origin of the caller, filtered by the build-time [`ORIGIN_CAPTURE`]
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller(), ORIGIN_CAPTURE)
    }

    /// Origin from an explicit location
    pub fn from_location(location: &'static Location<'static>, capture: OriginCapture) -> Self {
        if !capture.file {
            return Self::UNKNOWN;
        }
        Self {
            file: Some(location.file()),
            line: capture.line.then(|| location.line()),
        }
    }
}

/// A thrown (or throwable) exception value
///
/// Instances have value semantics: they are moved into the handling region when thrown
/// and cloned by [`rethrow`](crate::rethrow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInstance {
    kind: &'static ExceptionType,
    message: Option<Message>,
    origin: Origin,
}

impl ExceptionInstance {
    /// Create an instance with a message, recording the caller as origin
    #[track_caller]
    pub fn new(kind: &'static ExceptionType, message: impl Into<Message>) -> Self {
        Self::with_origin(kind, Some(message.into()), Origin::caller())
    }

    /// Create an instance without a message, recording the caller as origin
    #[track_caller]
    pub fn bare(kind: &'static ExceptionType) -> Self {
        Self::with_origin(kind, None, Origin::caller())
    }

    /// Create an instance with an explicit origin
    pub fn with_origin(
        kind: &'static ExceptionType,
        message: Option<Message>,
        origin: Origin,
    ) -> Self {
        Self {
            kind,
            message,
            origin,
        }
    }

    /// Exception kind
    #[inline]
    pub fn kind(&self) -> &'static ExceptionType {
        self.kind
    }

    /// Message text, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(Message::as_str)
    }

    /// Message including its ownership
    pub fn raw_message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Whether the message buffer is owned by this instance
    pub fn owns_message(&self) -> bool {
        self.message.as_ref().is_some_and(Message::is_owned)
    }

    /// Where the instance was created
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// See [`instance_of`]
    #[inline]
    pub fn is_instance_of(&self, kind: &ExceptionType) -> bool {
        self.kind.is_subtype_of(kind)
    }
}

/// True if `kind` is the instance's kind, the catch-all root, or one of its ancestors
#[inline]
pub fn instance_of(instance: &ExceptionInstance, kind: &ExceptionType) -> bool {
    instance.is_instance_of(kind)
}

impl fmt::Display for ExceptionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        match (self.origin.file, self.origin.line) {
            (None, _) => f.write_str(" (unknown origin)")?,
            (Some(file), None) => write!(f, " (file \"{file}\")")?,
            (Some(file), Some(line)) => write!(f, " (file \"{file}\", line {line})")?,
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExceptionInstance {}

/// Render the one-line diagnostic for an instance:
/// `<TypeName> (file "<F>", line <L>)[: <message>]`
pub fn format_diagnostic(instance: &ExceptionInstance) -> String {
    instance.to_string()
}

/// Write the diagnostic followed by a newline
pub fn write_diagnostic<W: io::Write + ?Sized>(
    instance: &ExceptionInstance,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "{instance}")
}
