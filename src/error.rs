#![allow(clippy::question_mark)]
use crate::Span;
use std::fmt::{self, Debug, Display};

#[cfg(test)]
#[path = "./error_tests.rs"]
mod tests;

/// Error produced while parsing, serializing or patching TOML.
#[derive(Debug, Clone)]
pub struct Error {
    /// The error kind
    pub kind: ErrorKind,
    /// The span where the error occurs.
    ///
    /// Note some [`ErrorKind`] contain additional span information
    pub span: Span,
    /// Zero-based line and column (in characters), only available for errors
    /// coming from the parser
    pub line_info: Option<(usize, usize)>,
}

impl std::error::Error for Error {}

impl From<(ErrorKind, Span)> for Error {
    fn from((kind, span): (ErrorKind, Span)) -> Self {
        Self {
            kind,
            span,
            line_info: None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            span: Span::default(),
            line_info: None,
        }
    }
}

/// Coarse classification of an [`Error`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input text is not valid TOML.
    Syntax,
    /// An in-memory value cannot be represented as TOML.
    Type,
    /// A path or section update could not be applied.
    Patch,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Zero-based line of the error, for parser errors.
    pub fn line(&self) -> Option<usize> {
        self.line_info.map(|(line, _)| line)
    }

    /// Zero-based column (in characters) of the error, for parser errors.
    pub fn column(&self) -> Option<usize> {
        self.line_info.map(|(_, col)| col)
    }

    /// Absolute byte offset where the error starts.
    pub fn position(&self) -> usize {
        self.span.start as usize
    }

    /// Classifies the error. Anything reported by the parser is a syntax
    /// error, even kinds that can also occur at serialize time.
    pub fn category(&self) -> ErrorCategory {
        if self.line_info.is_some() {
            return ErrorCategory::Syntax;
        }
        match self.kind {
            ErrorKind::InvalidPath(..)
            | ErrorKind::MultilineTarget { .. }
            | ErrorKind::UnsupportedTarget { .. }
            | ErrorKind::PatchVerification { .. } => ErrorCategory::Patch,
            ErrorKind::MixedArray { .. } | ErrorKind::NotATable { .. } => ErrorCategory::Type,
            ErrorKind::Custom(..) => ErrorCategory::Type,
            _ => ErrorCategory::Syntax,
        }
    }
}

/// The different kinds of [`Error`].
#[derive(Clone, PartialEq)]
pub enum ErrorKind {
    /// EOF was reached when looking for a value.
    UnexpectedEof,

    /// An invalid character not allowed in a string was found.
    InvalidCharInString(char),

    /// An invalid character was found as an escape.
    InvalidEscape(char),

    /// An invalid character was found in a hex escape.
    InvalidHexEscape(char),

    /// An escape named a surrogate or a value beyond U+10FFFF.
    InvalidEscapeValue(u32),

    /// An unexpected character was encountered at the start of a statement or
    /// where a value was expected.
    Unexpected(char),

    /// EOF was found before the closing delimiter of a string.
    UnterminatedString,

    /// A number failed to parse.
    InvalidNumber,

    /// A date or time literal is malformed, under-padded or out of range.
    InvalidDatetime,

    /// Wanted one sort of token, but found another.
    Wanted {
        /// Expected token type.
        expected: &'static str,
        /// Actually found token type.
        found: &'static str,
    },

    /// A key with no characters, such as `= 1` or `a..b`.
    EmptyKey,

    /// A key followed by `=` but no value.
    MissingValue,

    /// A table header was declared twice.
    DuplicateTable {
        /// The name of the duplicate table
        name: String,
        /// The span where the table was first defined
        first: Span,
    },

    /// Duplicate key in table.
    DuplicateKey {
        /// The duplicate key
        key: String,
        /// The span where the first key is located
        first: Span,
    },

    /// A previously defined table was redefined as an array.
    RedefineAsArray,

    /// Multiline strings are not allowed for key.
    MultilineStringKey,

    /// Dotted key attempted to extend something that is not a table.
    DottedKeyInvalidType {
        /// The span where the non-table value was defined
        first: Span,
    },

    /// A header or dotted key attempted to add to an inline table or array.
    ExtendInline {
        /// `"table"` or `"array"`
        kind: &'static str,
        /// The span of the key owning the inline value
        first: Span,
    },

    /// An array mixes TOML types.
    MixedArray {
        /// Type of the first element
        expected: &'static str,
        /// Type of the offending element
        found: &'static str,
    },

    /// A value that must be a table is something else.
    NotATable {
        /// Dotted path of the offending value
        path: String,
    },

    /// Inline values, key paths or headers nest deeper than the parser
    /// allows.
    NestingTooDeep {
        /// The maximum number of nested levels
        limit: usize,
    },

    /// The parser's frame or context stack was unexpectedly empty.
    StackUnderflow,

    /// A dotted path argument could not be parsed.
    InvalidPath(String),

    /// The textual patcher was asked to replace a value spanning several lines.
    MultilineTarget {
        /// The key whose value spans lines
        key: String,
    },

    /// The textual patcher does not understand the shape of the section.
    UnsupportedTarget {
        /// The section being patched
        section: String,
        /// Why it cannot be patched
        reason: &'static str,
    },

    /// A patched text did not re-parse to the expected values.
    PatchVerification {
        /// The section being patched
        section: String,
    },

    /// A free-form error.
    Custom(std::borrow::Cow<'static, str>),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnexpectedEof => "unexpected-eof",
            Self::Custom(..) => "custom",
            Self::DottedKeyInvalidType { .. } => "dotted-key-invalid-type",
            Self::DuplicateKey { .. } => "duplicate-key",
            Self::DuplicateTable { .. } => "duplicate-table",
            Self::MultilineStringKey => "multiline-string-key",
            Self::RedefineAsArray => "redefine-as-array",
            Self::InvalidCharInString(..) => "invalid-char-in-string",
            Self::InvalidEscape(..) => "invalid-escape",
            Self::InvalidEscapeValue(..) => "invalid-escape-value",
            Self::InvalidHexEscape(..) => "invalid-hex-escape",
            Self::Unexpected(..) => "unexpected",
            Self::UnterminatedString => "unterminated-string",
            Self::InvalidNumber => "invalid-number",
            Self::InvalidDatetime => "invalid-datetime",
            Self::Wanted { .. } => "wanted",
            Self::EmptyKey => "empty-key",
            Self::MissingValue => "missing-value",
            Self::ExtendInline { .. } => "extend-inline",
            Self::MixedArray { .. } => "mixed-array",
            Self::NotATable { .. } => "not-a-table",
            Self::NestingTooDeep { .. } => "nesting-too-deep",
            Self::StackUnderflow => "stack-underflow",
            Self::InvalidPath(..) => "invalid-path",
            Self::MultilineTarget { .. } => "multiline-target",
            Self::UnsupportedTarget { .. } => "unsupported-target",
            Self::PatchVerification { .. } => "patch-verification",
        };
        f.write_str(text)
    }
}

impl Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

struct Escape(char);

impl fmt::Display for Escape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use std::fmt::Write as _;

        if self.0.is_whitespace() || self.0.is_control() {
            for esc in self.0.escape_default() {
                f.write_char(esc)?;
            }
            Ok(())
        } else {
            f.write_char(self.0)
        }
    }
}

macro_rules! rtry {
    ($($tt:tt)*) => {
        if let Err(err) = $($tt)* {
            return Err(err);
        }
    };
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnexpectedEof => rtry!(f.write_str("unexpected eof encountered")),
            ErrorKind::InvalidCharInString(c) => {
                rtry!(f.write_str("invalid character in string: `"));
                rtry!(Escape(*c).fmt(f));
                rtry!(f.write_str("`"))
            }
            ErrorKind::InvalidEscape(c) => {
                rtry!(f.write_str("invalid escape character in string: `"));
                rtry!(Escape(*c).fmt(f));
                rtry!(f.write_str("`"))
            }
            ErrorKind::InvalidHexEscape(c) => {
                rtry!(f.write_str("invalid hex escape character in string: `"));
                rtry!(Escape(*c).fmt(f));
                rtry!(f.write_str("`"))
            }
            ErrorKind::InvalidEscapeValue(c) => {
                rtry!(f.write_str("invalid escape value: `"));
                rtry!(write!(f, "{c:#x}"));
                rtry!(f.write_str("`"))
            }
            ErrorKind::Unexpected(c) => {
                rtry!(f.write_str("unexpected character found: `"));
                rtry!(Escape(*c).fmt(f));
                rtry!(f.write_str("`"))
            }
            ErrorKind::UnterminatedString => rtry!(f.write_str("unterminated string")),
            ErrorKind::Wanted { expected, found } => {
                rtry!(f.write_str("expected "));
                rtry!(f.write_str(expected));
                rtry!(f.write_str(", found "));
                rtry!(f.write_str(found))
            }
            ErrorKind::InvalidNumber => rtry!(f.write_str("invalid number")),
            ErrorKind::InvalidDatetime => rtry!(f.write_str("invalid date or time")),
            ErrorKind::EmptyKey => rtry!(f.write_str("empty bare key")),
            ErrorKind::MissingValue => rtry!(f.write_str("key has no value")),
            ErrorKind::DuplicateTable { name, .. } => {
                rtry!(f.write_str("redefinition of table `"));
                rtry!(f.write_str(name));
                rtry!(f.write_str("`"))
            }
            ErrorKind::DuplicateKey { key, .. } => {
                rtry!(f.write_str("cannot redefine existing key `"));
                rtry!(f.write_str(key));
                rtry!(f.write_str("`"))
            }
            ErrorKind::RedefineAsArray => rtry!(f.write_str("table redefined as array")),
            ErrorKind::MultilineStringKey => {
                rtry!(f.write_str("multiline strings are not allowed for key"))
            }
            ErrorKind::DottedKeyInvalidType { .. } => {
                rtry!(f.write_str("dotted key attempted to extend non-table type"))
            }
            ErrorKind::ExtendInline { kind, .. } => {
                rtry!(f.write_str("can't extend an inline "));
                rtry!(f.write_str(kind))
            }
            ErrorKind::MixedArray { expected, found } => {
                rtry!(f.write_str("array of "));
                rtry!(f.write_str(expected));
                rtry!(f.write_str(" values cannot contain a "));
                rtry!(f.write_str(found))
            }
            ErrorKind::NotATable { path } => {
                rtry!(f.write_str("`"));
                rtry!(f.write_str(path));
                rtry!(f.write_str("` is not a table"))
            }
            ErrorKind::NestingTooDeep { limit } => {
                rtry!(write!(f, "values nest deeper than {limit} levels"))
            }
            ErrorKind::StackUnderflow => rtry!(f.write_str("parser stack underflow")),
            ErrorKind::InvalidPath(path) => {
                rtry!(f.write_str("invalid key path `"));
                rtry!(f.write_str(path));
                rtry!(f.write_str("`"))
            }
            ErrorKind::MultilineTarget { key } => {
                rtry!(f.write_str("value of `"));
                rtry!(f.write_str(key));
                rtry!(f.write_str("` spans multiple lines and cannot be patched in place"))
            }
            ErrorKind::UnsupportedTarget { section, reason } => {
                rtry!(f.write_str("cannot patch section `"));
                rtry!(f.write_str(section));
                rtry!(f.write_str("`: "));
                rtry!(f.write_str(reason))
            }
            ErrorKind::PatchVerification { section } => {
                rtry!(f.write_str("patching section `"));
                rtry!(f.write_str(section));
                rtry!(f.write_str("` would change unrelated values"))
            }
            ErrorKind::Custom(message) => rtry!(f.write_str(message)),
        }
        if let Some((line, col)) = self.line_info {
            rtry!(write!(f, " at line {}, column {}", line + 1, col + 1));
        }
        Ok(())
    }
}

#[cfg(feature = "reporting")]
#[cfg_attr(docsrs, doc(cfg(feature = "reporting")))]
impl Error {
    /// Converts this [`Error`] into a [`codespan_reporting::diagnostic::Diagnostic`]
    pub fn to_diagnostic<FileId: Copy + PartialEq>(
        &self,
        fid: FileId,
    ) -> codespan_reporting::diagnostic::Diagnostic<FileId> {
        let diag =
            codespan_reporting::diagnostic::Diagnostic::error().with_code(self.kind.to_string());

        use codespan_reporting::diagnostic::Label;

        match &self.kind {
            ErrorKind::DuplicateKey { first, .. } => diag.with_labels(vec![
                Label::secondary(fid, *first).with_message("first key instance"),
                Label::primary(fid, self.span).with_message("duplicate key"),
            ]),
            ErrorKind::DuplicateTable { first, .. } => diag.with_labels(vec![
                Label::secondary(fid, *first).with_message("first table instance"),
                Label::primary(fid, self.span).with_message("duplicate table"),
            ]),
            ErrorKind::DottedKeyInvalidType { first } => {
                diag.with_message(self.kind_message()).with_labels(vec![
                    Label::primary(fid, self.span).with_message("attempted to extend table here"),
                    Label::secondary(fid, *first).with_message("non-table"),
                ])
            }
            ErrorKind::ExtendInline { kind, first } => {
                diag.with_message(self.kind_message()).with_labels(vec![
                    Label::primary(fid, self.span).with_message("extended here"),
                    Label::secondary(fid, *first).with_message(format!("inline {kind} defined here")),
                ])
            }
            ErrorKind::Unexpected(c) => diag.with_labels(vec![
                Label::primary(fid, self.span)
                    .with_message(format!("unexpected character '{}'", Escape(*c))),
            ]),
            ErrorKind::InvalidCharInString(c) => diag.with_labels(vec![
                Label::primary(fid, self.span)
                    .with_message(format!("invalid character '{}' in string", Escape(*c))),
            ]),
            ErrorKind::UnterminatedString => diag.with_labels(vec![
                Label::primary(fid, self.span).with_message("eof reached before string terminator"),
            ]),
            ErrorKind::Wanted { expected, .. } => diag.with_labels(vec![
                Label::primary(fid, self.span).with_message(format!("expected {expected}")),
            ]),
            ErrorKind::MissingValue => diag.with_labels(vec![
                Label::primary(fid, self.span).with_message("expected a value after `=`"),
            ]),
            _ => diag
                .with_message(self.kind_message())
                .with_labels(vec![Label::primary(fid, self.span)]),
        }
    }

    fn kind_message(&self) -> String {
        let without_position = Error {
            kind: self.kind.clone(),
            span: self.span,
            line_info: None,
        };
        without_position.to_string()
    }
}
