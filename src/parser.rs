// The parser avoids `?` and matches results explicitly, through `ptry!`.
#![allow(clippy::question_mark)]

#[cfg(test)]
#[path = "./parser_tests.rs"]
mod tests;

use crate::array::ArrayKind;
use crate::error::{Error, ErrorKind};
use crate::table::TableKind;
use crate::time::Datetime;
use crate::value::{Integer, Key, Value};
use crate::{Array, Document, Span, Table};
use num_bigint::BigInt;
use num_traits::Num;

macro_rules! ptry {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => return Err(e),
        }
    };
}

// ---------------------------------------------------------------------------
// Lightweight internal error -- zero-sized.
// When a method returns Err(ParseError), the full error details have already
// been written into Parser::error_kind / Parser::error_span.
// ---------------------------------------------------------------------------

#[derive(Copy, Clone)]
struct ParseError;

/// Deepest nesting [`parse`] accepts, counted separately for the segments of
/// a key path or header and for the inline arrays and tables of one value.
///
/// Trees are dropped, compared and serialized recursively, so the limit
/// keeps hostile input from exhausting the stack.
pub const MAX_NESTING_DEPTH: usize = 128;

// ---------------------------------------------------------------------------
// Context path entry -- one step from the root to the table that receives
// key/value lines.
// ---------------------------------------------------------------------------

struct Ctx {
    name: String,
    /// The step names an array of tables; descend into its last element.
    array: bool,
}

/// An inline array or table still being filled.
enum Frame {
    Array {
        array: Array,
        start: usize,
    },
    Table {
        table: Table,
        start: usize,
        /// Dotted key of the entry whose value is being parsed.
        path: Vec<Key>,
    },
}

impl Frame {
    /// Tables and arrays this frame adds to the nesting.
    fn levels(&self) -> usize {
        match self {
            Frame::Array { .. } => 1,
            // the inline table itself plus the tables of a dotted key
            Frame::Table { path, .. } => path.len(),
        }
    }
}

/// Where the top-level statements of a document begin, as byte offsets in
/// ascending order. Lines inside multi-line strings and arrays never show
/// up here.
#[derive(Clone, Debug, Default)]
pub(crate) struct Layout {
    /// The `[` opening each table or array-of-tables header.
    pub headers: Vec<usize>,
    /// The first key of each `key = value` line.
    pub entries: Vec<usize>,
}

impl Layout {
    pub(crate) fn is_header(&self, at: usize) -> bool {
        self.headers.binary_search(&at).is_ok()
    }

    pub(crate) fn is_entry(&self, at: usize) -> bool {
        self.entries.binary_search(&at).is_ok()
    }

    /// The first header after byte `at`.
    pub(crate) fn next_header(&self, at: usize) -> Option<usize> {
        let idx = self.headers.partition_point(|&h| h <= at);
        self.headers.get(idx).copied()
    }
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    cursor: usize,
    string_buf: String,
    error_span: Span,
    error_kind: Option<ErrorKind>,
    ctx: Vec<Ctx>,
    layout: Layout,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let cursor = if input.starts_with('\u{feff}') { 3 } else { 0 };
        Parser {
            input,
            bytes: input.as_bytes(),
            cursor,
            string_buf: String::new(),
            error_span: Span::default(),
            error_kind: None,
            ctx: Vec::new(),
            layout: Layout::default(),
        }
    }

    // -- error helpers ------------------------------------------------------

    #[cold]
    fn set_error(&mut self, start: usize, end: Option<usize>, kind: ErrorKind) -> ParseError {
        self.error_span = Span::new(start as u32, end.unwrap_or(start + 1) as u32);
        self.error_kind = Some(kind);
        ParseError
    }

    #[cold]
    fn set_error_span(&mut self, span: Span, kind: ErrorKind) -> ParseError {
        self.error_span = span;
        self.error_kind = Some(kind);
        ParseError
    }

    fn take_error(&mut self) -> Error {
        let kind = self.error_kind.take().unwrap_or(ErrorKind::StackUnderflow);
        let span = self.error_span;
        let line_info = Some(self.to_linecol(span.start as usize));
        Error {
            kind,
            span,
            line_info,
        }
    }

    /// Zero-based line and column, the column counted in characters.
    fn to_linecol(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.bytes.len());
        let before = &self.bytes[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count();
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let column = match self.input.get(line_start..offset) {
            Some(text) => text.chars().count(),
            None => offset - line_start,
        };
        (line, column)
    }

    // -- cursor operations --------------------------------------------------

    #[inline]
    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    #[inline]
    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.cursor + offset).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.cursor += 1;
    }

    #[inline]
    fn eat_byte(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_byte(&mut self, b: u8) -> Result<(), ParseError> {
        if self.eat_byte(b) {
            Ok(())
        } else {
            Err(self.wanted(byte_describe(b)))
        }
    }

    #[cold]
    fn wanted(&mut self, expected: &'static str) -> ParseError {
        let start = self.cursor;
        let (found, end) = self.scan_token_desc_and_end();
        self.set_error(start, Some(end), ErrorKind::Wanted { expected, found })
    }

    /// The character starting at byte `pos`.
    fn char_at(&self, pos: usize) -> char {
        self.input
            .get(pos..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or('\0')
    }

    #[cold]
    fn too_deep(&mut self, pos: usize) -> ParseError {
        self.set_error(
            pos,
            None,
            ErrorKind::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            },
        )
    }

    fn check_depth(&mut self, stack: &[Frame], pos: usize) -> Result<(), ParseError> {
        if stack.iter().map(Frame::levels).sum::<usize>() > MAX_NESTING_DEPTH {
            return Err(self.too_deep(pos));
        }
        Ok(())
    }

    #[cold]
    fn unexpected_char(&mut self, pos: usize) -> ParseError {
        let ch = self.char_at(pos);
        self.set_error(pos, Some(pos + ch.len_utf8()), ErrorKind::Unexpected(ch))
    }

    fn eat_whitespace(&mut self) {
        while let Some(b' ' | b'\t') = self.peek_byte() {
            self.advance();
        }
    }

    fn eat_comment(&mut self) -> Result<bool, ParseError> {
        if !self.eat_byte(b'#') {
            return Ok(false);
        }
        // Consume comment content (valid bytes: tab, 0x20..=0x7E, 0x80..=0xFF)
        while let Some(0x09 | 0x20..=0x7E | 0x80..) = self.peek_byte() {
            self.cursor += 1;
        }
        self.eat_newline_or_eof().map(|()| true)
    }

    fn eat_newline_or_eof(&mut self) -> Result<(), ParseError> {
        if self.peek_byte().is_none() || self.eat_newline() {
            Ok(())
        } else {
            Err(self.wanted("newline"))
        }
    }

    fn eat_newline(&mut self) -> bool {
        match self.peek_byte() {
            Some(b'\n') => {
                self.advance();
                true
            }
            Some(b'\r') if self.peek_byte_at(1) == Some(b'\n') => {
                self.cursor += 2;
                true
            }
            _ => false,
        }
    }

    /// Whitespace, newlines and comments between elements of an inline
    /// array or table.
    fn eat_intermediate(&mut self) -> Result<(), ParseError> {
        loop {
            self.eat_whitespace();
            if self.eat_newline() {
                continue;
            }
            match self.eat_comment() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Trailing whitespace, an optional comment and the end of the line.
    fn end_of_line(&mut self) -> Result<(), ParseError> {
        self.eat_whitespace();
        match self.eat_comment() {
            Ok(true) => Ok(()),
            Ok(false) => self.eat_newline_or_eof(),
            Err(e) => Err(e),
        }
    }

    /// Scan forward from the current position to determine the description
    /// and end position of the "token" at the cursor.
    fn scan_token_desc_and_end(&self) -> (&'static str, usize) {
        match self.peek_byte() {
            None => ("eof", self.bytes.len()),
            Some(b'\n' | b'\r') => ("a newline", self.cursor + 1),
            Some(b' ' | b'\t') => {
                let mut end = self.cursor + 1;
                while let Some(b' ' | b'\t') = self.bytes.get(end) {
                    end += 1;
                }
                ("whitespace", end)
            }
            Some(b'#') => ("a comment", self.cursor + 1),
            Some(b) if is_keylike_byte(b) => {
                let mut end = self.cursor + 1;
                while self.bytes.get(end).is_some_and(|&b| is_keylike_byte(b)) {
                    end += 1;
                }
                ("an identifier", end)
            }
            Some(b) => (byte_describe(b), self.cursor + 1),
        }
    }

    // -- keys ---------------------------------------------------------------

    fn read_keylike(&mut self) -> &'a str {
        let input = self.input;
        let start = self.cursor;
        while let Some(b) = self.peek_byte() {
            if !is_keylike_byte(b) {
                break;
            }
            self.advance();
        }
        &input[start..self.cursor]
    }

    fn read_table_key(&mut self) -> Result<Key, ParseError> {
        let start = self.cursor;
        match self.peek_byte() {
            Some(delim @ (b'"' | b'\'')) => {
                self.advance();
                let (span, name, multiline) = ptry!(self.read_string(start, delim));
                if multiline {
                    return Err(self.set_error(
                        start,
                        Some(self.cursor),
                        ErrorKind::MultilineStringKey,
                    ));
                }
                Ok(Key::spanned(name, span))
            }
            Some(b) if is_keylike_byte(b) => {
                let name = self.read_keylike();
                let span = Span::new(start as u32, self.cursor as u32);
                Ok(Key::spanned(name.to_owned(), span))
            }
            Some(b'=' | b'.' | b']') => Err(self.set_error(start, None, ErrorKind::EmptyKey)),
            Some(b'\n' | b'#') | None => Err(self.wanted("a table key")),
            Some(_) => Err(self.unexpected_char(start)),
        }
    }

    /// Reads `a`, `a.b` or `"a" . 'b'`, eating trailing whitespace.
    fn read_key_path(&mut self) -> Result<Vec<Key>, ParseError> {
        let mut path = vec![ptry!(self.read_table_key())];
        self.eat_whitespace();
        while self.eat_byte(b'.') {
            if path.len() == MAX_NESTING_DEPTH {
                return Err(self.too_deep(self.cursor));
            }
            self.eat_whitespace();
            path.push(ptry!(self.read_table_key()));
            self.eat_whitespace();
        }
        Ok(path)
    }

    // -- strings ------------------------------------------------------------

    /// Reads a string whose opening delimiter sits at `start`; the cursor
    /// is right after it. Returns the span of the whole literal, the decoded
    /// contents and whether it was a multi-line string.
    fn read_string(&mut self, start: usize, delim: u8) -> Result<(Span, String, bool), ParseError> {
        let mut multiline = false;
        if self.eat_byte(delim) {
            if self.eat_byte(delim) {
                multiline = true;
            } else {
                let span = Span::new(start as u32, self.cursor as u32);
                return Ok((span, String::new(), false));
            }
        }
        if multiline {
            // A newline right after the opening delimiter is trimmed.
            self.eat_newline();
        }
        self.read_string_loop(start, multiline, delim)
    }

    fn read_string_loop(
        &mut self,
        start: usize,
        multiline: bool,
        delim: u8,
    ) -> Result<(Span, String, bool), ParseError> {
        let input = self.input;
        let mut out = String::new();
        let mut plain = self.cursor;
        loop {
            let i = self.cursor;
            let Some(&b) = self.bytes.get(i) else {
                return Err(self.set_error(start, None, ErrorKind::UnterminatedString));
            };
            match b {
                b'\r' => {
                    let crlf = self.bytes.get(i + 1) == Some(&b'\n');
                    if !(multiline && crlf) {
                        let ch = if crlf { '\n' } else { '\r' };
                        return Err(self.set_error(i, None, ErrorKind::InvalidCharInString(ch)));
                    }
                    self.cursor = i + 2;
                }
                b'\n' => {
                    if !multiline {
                        return Err(self.set_error(i, None, ErrorKind::InvalidCharInString('\n')));
                    }
                    self.cursor = i + 1;
                }
                d if d == delim => {
                    if !multiline {
                        out.push_str(&input[plain..i]);
                        self.cursor = i + 1;
                        let span = Span::new(start as u32, self.cursor as u32);
                        return Ok((span, out, false));
                    }
                    let mut run = 1;
                    while self.bytes.get(i + run) == Some(&delim) {
                        run += 1;
                    }
                    if run < 3 {
                        self.cursor = i + run;
                        continue;
                    }
                    // Up to two quotes may directly precede the closing three.
                    let extra = run.min(5) - 3;
                    out.push_str(&input[plain..i + extra]);
                    self.cursor = i + extra + 3;
                    let span = Span::new(start as u32, self.cursor as u32);
                    return Ok((span, out, true));
                }
                b'\\' if delim == b'"' => {
                    out.push_str(&input[plain..i]);
                    self.cursor = i + 1;
                    ptry!(self.read_basic_escape(&mut out, start, multiline));
                    plain = self.cursor;
                }
                0x09 | 0x20..=0x7E | 0x80.. => self.cursor = i + 1,
                _ => {
                    return Err(self.set_error(i, None, ErrorKind::InvalidCharInString(b as char)));
                }
            }
        }
    }

    fn read_basic_escape(
        &mut self,
        out: &mut String,
        string_start: usize,
        multi: bool,
    ) -> Result<(), ParseError> {
        let i = self.cursor;
        let Some(&b) = self.bytes.get(i) else {
            return Err(self.set_error(string_start, None, ErrorKind::UnterminatedString));
        };
        self.cursor = i + 1;

        match b {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => out.push(ptry!(self.read_hex(4, string_start, i))),
            b'U' => out.push(ptry!(self.read_hex(8, string_start, i))),
            b' ' | b'\t' | b'\n' | b'\r' if multi => {
                // Line-ending backslash (CRLF folding: \r\n counts as \n)
                let c = if b == b'\r' && self.peek_byte() == Some(b'\n') {
                    self.advance();
                    '\n'
                } else {
                    b as char
                };
                if c != '\n' {
                    // Only whitespace may sit between the backslash and the newline
                    loop {
                        match self.peek_byte() {
                            Some(b' ' | b'\t') => self.advance(),
                            _ if self.eat_newline() => break,
                            _ => return Err(self.set_error(i, None, ErrorKind::InvalidEscape(c))),
                        }
                    }
                }
                loop {
                    match self.peek_byte() {
                        Some(b' ' | b'\t' | b'\n') => self.advance(),
                        Some(b'\r') if self.peek_byte_at(1) == Some(b'\n') => self.cursor += 2,
                        _ => break,
                    }
                }
            }
            _ => {
                let ch = self.char_at(i);
                return Err(self.set_error(i, Some(i + ch.len_utf8()), ErrorKind::InvalidEscape(ch)));
            }
        }
        Ok(())
    }

    fn read_hex(
        &mut self,
        n: usize,
        string_start: usize,
        escape_start: usize,
    ) -> Result<char, ParseError> {
        let mut val: u32 = 0;
        for _ in 0..n {
            let at = self.cursor;
            let Some(&byte) = self.bytes.get(at) else {
                return Err(self.set_error(string_start, None, ErrorKind::UnterminatedString));
            };
            match (byte as char).to_digit(16) {
                Some(digit) if byte.is_ascii() => {
                    val = val * 16 + digit;
                    self.cursor += 1;
                }
                _ => {
                    let ch = self.char_at(at);
                    return Err(self.set_error(at, None, ErrorKind::InvalidHexEscape(ch)));
                }
            }
        }
        match char::from_u32(val) {
            Some(ch) => Ok(ch),
            None => Err(self.set_error(
                escape_start,
                Some(self.cursor),
                ErrorKind::InvalidEscapeValue(val),
            )),
        }
    }

    // -- numbers ------------------------------------------------------------

    fn number(&mut self, start: usize, end: usize, s: &'a str) -> Result<Value, ParseError> {
        if let Some(digits) = s.strip_prefix("0x") {
            self.integer(digits, 16).map(Value::Integer)
        } else if let Some(digits) = s.strip_prefix("0o") {
            self.integer(digits, 8).map(Value::Integer)
        } else if let Some(digits) = s.strip_prefix("0b") {
            self.integer(digits, 2).map(Value::Integer)
        } else if s.contains('e') || s.contains('E') {
            self.float(s, None).map(Value::Float)
        } else if self.eat_byte(b'.') {
            let at = self.cursor;
            match self.peek_byte() {
                Some(b) if is_keylike_byte(b) => {
                    let after = self.read_keylike();
                    self.float(s, Some(after)).map(Value::Float)
                }
                _ => Err(self.set_error(start, Some(at), ErrorKind::InvalidNumber)),
            }
        } else {
            match s {
                "inf" => Ok(Value::Float(f64::INFINITY)),
                "-inf" => Ok(Value::Float(f64::NEG_INFINITY)),
                "nan" => Ok(Value::Float(f64::NAN.copysign(1.0))),
                "-nan" => Ok(Value::Float(f64::NAN.copysign(-1.0))),
                _ => match self.integer(s, 10) {
                    Ok(v) => Ok(Value::Integer(v)),
                    Err(_) => Err(self.set_error(start, Some(end), ErrorKind::InvalidNumber)),
                },
            }
        }
    }

    fn number_leading_plus(&mut self, plus_start: usize) -> Result<Value, ParseError> {
        match self.peek_byte() {
            Some(b) if is_keylike_byte(b) && b != b'-' => {
                let s = self.read_keylike();
                let end = self.cursor;
                if s.starts_with("0x") || s.starts_with("0o") || s.starts_with("0b") {
                    return Err(self.set_error(plus_start, Some(end), ErrorKind::InvalidNumber));
                }
                self.number(plus_start, end, s)
            }
            _ => Err(self.set_error(plus_start, Some(self.cursor), ErrorKind::InvalidNumber)),
        }
    }

    /// Parses an integer, keeping values wider than 64 bits as big integers.
    fn integer(&mut self, s: &'a str, radix: u32) -> Result<Integer, ParseError> {
        let allow_sign = radix == 10;
        let allow_leading_zeros = radix != 10;
        let (prefix, suffix) = ptry!(self.parse_integer(s, allow_sign, allow_leading_zeros, radix));
        let s_start = self.substr_offset(s);
        if !suffix.is_empty() {
            return Err(self.set_error(s_start, Some(s_start + s.len()), ErrorKind::InvalidNumber));
        }
        let digits = prefix.replace('_', "");
        let digits = digits.trim_start_matches('+');
        if let Ok(v) = i64::from_str_radix(digits, radix) {
            return Ok(Integer::I64(v));
        }
        match BigInt::from_str_radix(digits, radix) {
            Ok(v) => Ok(Integer::Big(v)),
            Err(_) => {
                Err(self.set_error(s_start, Some(s_start + s.len()), ErrorKind::InvalidNumber))
            }
        }
    }

    fn parse_integer(
        &mut self,
        s: &'a str,
        allow_sign: bool,
        allow_leading_zeros: bool,
        radix: u32,
    ) -> Result<(&'a str, &'a str), ParseError> {
        let s_start = self.substr_offset(s);
        let send = s_start + s.len();

        let mut first = true;
        let mut first_zero = false;
        let mut underscore = false;
        let mut end = s.len();
        for (i, c) in s.char_indices() {
            let at = i + s_start;
            if i == 0 && (c == '+' || c == '-') && allow_sign {
                continue;
            }

            if c == '0' && first {
                first_zero = true;
            } else if c.is_digit(radix) {
                if !first && first_zero && !allow_leading_zeros {
                    return Err(self.set_error(at, Some(send), ErrorKind::InvalidNumber));
                }
                underscore = false;
            } else if c == '_' && first {
                return Err(self.set_error(at, Some(send), ErrorKind::InvalidNumber));
            } else if c == '_' && !underscore {
                underscore = true;
            } else {
                end = i;
                break;
            }
            first = false;
        }
        if first || underscore {
            return Err(self.set_error(s_start, Some(send), ErrorKind::InvalidNumber));
        }
        Ok((&s[..end], &s[end..]))
    }

    fn float(&mut self, s: &'a str, after_decimal: Option<&'a str>) -> Result<f64, ParseError> {
        let (integral, mut suffix) = ptry!(self.parse_integer(s, true, false, 10));
        let s_start = self.substr_offset(integral);
        let s_end = s_start + s.len();

        let mut fraction = None;
        if let Some(after) = after_decimal {
            if !suffix.is_empty() {
                return Err(self.set_error(s_start, Some(s_end), ErrorKind::InvalidNumber));
            }
            let (a, b) = ptry!(self.parse_integer(after, false, true, 10));
            fraction = Some(a);
            suffix = b;
        }

        let mut exponent = None;
        if suffix.starts_with('e') || suffix.starts_with('E') {
            let (a, b) = if suffix.len() == 1 {
                self.eat_byte(b'+');
                match self.peek_byte() {
                    Some(b) if is_keylike_byte(b) => {
                        let next = self.read_keylike();
                        ptry!(self.parse_integer(next, false, true, 10))
                    }
                    _ => {
                        return Err(self.set_error(s_start, Some(s_end), ErrorKind::InvalidNumber));
                    }
                }
            } else {
                ptry!(self.parse_integer(&suffix[1..], true, true, 10))
            };
            if !b.is_empty() {
                return Err(self.set_error(s_start, Some(s_end), ErrorKind::InvalidNumber));
            }
            exponent = Some(a);
        } else if !suffix.is_empty() {
            return Err(self.set_error(s_start, Some(s_end), ErrorKind::InvalidNumber));
        }

        self.string_buf.clear();
        self.string_buf
            .extend(integral.trim_start_matches('+').chars().filter(|c| *c != '_'));
        if let Some(fraction) = fraction {
            self.string_buf.push('.');
            self.string_buf.extend(fraction.chars().filter(|c| *c != '_'));
        }
        if let Some(exponent) = exponent {
            self.string_buf.push('E');
            self.string_buf.extend(exponent.chars().filter(|c| *c != '_'));
        }
        match self.string_buf.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(self.set_error(s_start, Some(s_end), ErrorKind::InvalidNumber)),
        }
    }

    /// Byte offset of `s`, which must be a slice of the input.
    fn substr_offset(&self, s: &str) -> usize {
        (s.as_ptr() as usize).saturating_sub(self.bytes.as_ptr() as usize)
    }

    // -- values -------------------------------------------------------------

    fn datetime(&mut self, at: usize) -> Result<Value, ParseError> {
        match Datetime::munch(&self.bytes[at..]) {
            Some((len, dt)) => {
                self.cursor = at + len;
                Ok(Value::Datetime(dt))
            }
            None => {
                let mut end = at;
                while self
                    .bytes
                    .get(end)
                    .is_some_and(|&b| is_keylike_byte(b) || matches!(b, b':' | b'.' | b'+'))
                {
                    end += 1;
                }
                Err(self.set_error(at, Some(end), ErrorKind::InvalidDatetime))
            }
        }
    }

    /// Any value that is not an inline array or table.
    fn scalar(&mut self) -> Result<Value, ParseError> {
        let at = self.cursor;
        let Some(byte) = self.peek_byte() else {
            return Err(self.set_error(self.bytes.len(), None, ErrorKind::UnexpectedEof));
        };
        match byte {
            b'"' | b'\'' => {
                self.advance();
                let (_, val, _multiline) = ptry!(self.read_string(at, byte));
                Ok(Value::String(val))
            }
            b'+' => {
                self.advance();
                self.number_leading_plus(at)
            }
            b'0'..=b'9' if Datetime::looks_like(&self.bytes[at..]) => self.datetime(at),
            b if is_keylike_byte(b) => {
                let key = self.read_keylike();
                let end = self.cursor;
                match key {
                    "true" => Ok(Value::Boolean(true)),
                    "false" => Ok(Value::Boolean(false)),
                    "inf" | "nan" => self.number(at, end, key),
                    _ if matches!(key.as_bytes()[0], b'-' | b'0'..=b'9') => {
                        self.number(at, end, key)
                    }
                    _ => Err(self.set_error(
                        at,
                        Some(end),
                        ErrorKind::Wanted {
                            expected: "a value",
                            found: "an identifier",
                        },
                    )),
                }
            }
            _ => Err(self.unexpected_char(at)),
        }
    }

    /// Parses one value. Inline arrays and tables are tracked on an explicit
    /// frame stack, at most [`MAX_NESTING_DEPTH`] levels deep.
    fn value(&mut self) -> Result<Value, ParseError> {
        let mut stack: Vec<Frame> = Vec::new();
        loop {
            let start = self.cursor;
            let mut done = match self.peek_byte() {
                Some(b'[') => {
                    self.advance();
                    ptry!(self.eat_intermediate());
                    let span = Span::new(start as u32, self.cursor as u32);
                    let array = Array::with_kind_and_span(ArrayKind::Inline, span);
                    if !self.eat_byte(b']') {
                        stack.push(Frame::Array { array, start });
                        ptry!(self.check_depth(&stack, start));
                        continue;
                    }
                    let mut array = array;
                    array.set_span(Span::new(start as u32, self.cursor as u32));
                    Value::Array(array)
                }
                Some(b'{') => {
                    self.advance();
                    ptry!(self.eat_intermediate());
                    let span = Span::new(start as u32, self.cursor as u32);
                    let table = Table::with_kind_and_span(TableKind::Inline, span);
                    if !self.eat_byte(b'}') {
                        let path = ptry!(self.inline_entry_key());
                        stack.push(Frame::Table { table, start, path });
                        ptry!(self.check_depth(&stack, start));
                        continue;
                    }
                    let mut table = table;
                    table.set_span(Span::new(start as u32, self.cursor as u32));
                    Value::Table(table)
                }
                _ => ptry!(self.scalar()),
            };
            let mut done_start = start;

            // Hand the finished value to its container, closing every
            // container that ends right after it.
            loop {
                let Some(frame) = stack.last_mut() else {
                    return Ok(done);
                };
                let closed = match frame {
                    Frame::Array { array, .. } => {
                        if let Err(e) = array.push(done) {
                            return Err(self.set_error(done_start, Some(self.cursor), e.kind));
                        }
                        ptry!(self.eat_intermediate());
                        if self.eat_byte(b',') {
                            ptry!(self.eat_intermediate());
                            self.eat_byte(b']')
                        } else if self.eat_byte(b']') {
                            true
                        } else {
                            return Err(self.wanted("a right bracket"));
                        }
                    }
                    Frame::Table { table, path, .. } => {
                        let path = std::mem::take(path);
                        ptry!(self.insert_at_path(table, path, done));
                        ptry!(self.eat_intermediate());
                        if self.eat_byte(b'}') {
                            true
                        } else {
                            ptry!(self.expect_byte(b','));
                            ptry!(self.eat_intermediate());
                            self.eat_byte(b'}')
                        }
                    }
                };
                if !closed {
                    let at = self.cursor;
                    if let Some(Frame::Table { path, .. }) = stack.last_mut() {
                        *path = ptry!(self.inline_entry_key());
                        ptry!(self.check_depth(&stack, at));
                    }
                    break;
                }
                let end = self.cursor as u32;
                match stack.pop() {
                    Some(Frame::Array { mut array, start }) => {
                        array.set_span(Span::new(start as u32, end));
                        done = Value::Array(array);
                        done_start = start;
                    }
                    Some(Frame::Table {
                        mut table, start, ..
                    }) => {
                        table.set_span(Span::new(start as u32, end));
                        freeze_inline(&mut table);
                        done = Value::Table(table);
                        done_start = start;
                    }
                    None => return Err(self.set_error(self.cursor, None, ErrorKind::StackUnderflow)),
                }
            }
        }
    }

    /// Reads `key =` inside an inline table, leaving the cursor on the value.
    fn inline_entry_key(&mut self) -> Result<Vec<Key>, ParseError> {
        let path = ptry!(self.read_key_path());
        ptry!(self.expect_byte(b'='));
        self.eat_whitespace();
        if matches!(
            self.peek_byte(),
            None | Some(b'\n' | b'\r' | b'#' | b',' | b'}')
        ) {
            return Err(self.set_error(self.cursor, None, ErrorKind::MissingValue));
        }
        Ok(path)
    }

    // -- navigation ---------------------------------------------------------

    /// Enters the table named by an intermediate segment of a dotted key,
    /// creating it as [`TableKind::Dotted`] when missing.
    fn navigate_dotted_key<'t>(
        &mut self,
        table: &'t mut Table,
        key: &Key,
    ) -> Result<&'t mut Table, ParseError> {
        let idx = match table.find_index(&key.name) {
            Some(idx) => {
                let (existing_key, existing) = &table.entries()[idx];
                let first = existing_key.span;
                let rejected = match existing {
                    Value::Table(t) if t.kind() == TableKind::Inline => Some(ErrorKind::ExtendInline {
                        kind: "table",
                        first,
                    }),
                    Value::Table(_) => None,
                    Value::Array(a) if !a.is_array_of_tables() => Some(ErrorKind::ExtendInline {
                        kind: "array",
                        first,
                    }),
                    _ => Some(ErrorKind::DottedKeyInvalidType { first }),
                };
                if let Some(kind) = rejected {
                    return Err(self.set_error_span(key.span, kind));
                }
                idx
            }
            None => {
                let new = Table::with_kind_and_span(TableKind::Dotted, key.span);
                table.push_entry(key.clone(), Value::Table(new));
                table.len() - 1
            }
        };
        match &mut table.entry_at_mut(idx).1 {
            Value::Table(t) => Ok(t),
            _ => Err(self.set_error_span(key.span, ErrorKind::StackUnderflow)),
        }
    }

    /// Navigate an intermediate segment of a table header (e.g. `a` in `[a.b.c]`).
    /// Creates implicit tables if not found.
    /// Handles arrays-of-tables by navigating into the last element.
    fn navigate_header_intermediate<'t>(
        &mut self,
        table: &'t mut Table,
        key: &Key,
        header: Span,
    ) -> Result<&'t mut Table, ParseError> {
        let (idx, array) = match table.find_index(&key.name) {
            Some(idx) => {
                let (existing_key, existing) = &table.entries()[idx];
                let first = existing_key.span;
                match existing {
                    Value::Table(t) if t.kind() == TableKind::Inline => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::ExtendInline {
                                kind: "table",
                                first,
                            },
                        ));
                    }
                    Value::Table(_) => (idx, false),
                    Value::Array(a) if a.is_array_of_tables() => (idx, true),
                    Value::Array(_) => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::ExtendInline {
                                kind: "array",
                                first,
                            },
                        ));
                    }
                    _ => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::DuplicateKey {
                                key: key.name.clone(),
                                first,
                            },
                        ));
                    }
                }
            }
            None => {
                let new = Table::with_kind_and_span(TableKind::Implicit, header);
                table.push_entry(key.clone(), Value::Table(new));
                (table.len() - 1, false)
            }
        };
        self.ctx.push(Ctx {
            name: key.name.clone(),
            array,
        });
        let found = match &mut table.entry_at_mut(idx).1 {
            Value::Table(t) => Some(t),
            Value::Array(a) => match a.last_mut() {
                Some(Value::Table(t)) => Some(t),
                _ => None,
            },
            _ => None,
        };
        match found {
            Some(t) => Ok(t),
            None => Err(self.set_error_span(key.span, ErrorKind::StackUnderflow)),
        }
    }

    /// Handle the final segment of a standard table header `[a.b.c]`.
    fn navigate_header_table_final(
        &mut self,
        table: &mut Table,
        key: &Key,
        header: Span,
        name: &str,
    ) -> Result<(), ParseError> {
        match table.find_index(&key.name) {
            Some(idx) => {
                let (existing_key, existing) = table.entry_at_mut(idx);
                let first = existing_key.span;
                match existing {
                    Value::Table(t) => match t.kind() {
                        TableKind::Inline => {
                            return Err(self.set_error_span(
                                key.span,
                                ErrorKind::ExtendInline {
                                    kind: "table",
                                    first,
                                },
                            ));
                        }
                        TableKind::Header => {
                            return Err(self.set_error_span(
                                header,
                                ErrorKind::DuplicateTable {
                                    name: name.to_owned(),
                                    first: t.span(),
                                },
                            ));
                        }
                        // Implicitly created table, now explicitly declared.
                        TableKind::Implicit | TableKind::Dotted => {
                            t.set_kind(TableKind::Header);
                            t.set_span(header);
                        }
                    },
                    Value::Array(a) if a.is_array_of_tables() => {
                        return Err(self.set_error_span(
                            header,
                            ErrorKind::DuplicateTable {
                                name: name.to_owned(),
                                first,
                            },
                        ));
                    }
                    Value::Array(_) => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::ExtendInline {
                                kind: "array",
                                first,
                            },
                        ));
                    }
                    _ => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::DuplicateKey {
                                key: key.name.clone(),
                                first,
                            },
                        ));
                    }
                }
            }
            None => {
                let new = Table::with_kind_and_span(TableKind::Header, header);
                table.push_entry(key.clone(), Value::Table(new));
            }
        }
        self.ctx.push(Ctx {
            name: key.name.clone(),
            array: false,
        });
        Ok(())
    }

    /// Handle the final segment of an array-of-tables header `[[a.b.c]]`.
    fn navigate_header_array_final(
        &mut self,
        table: &mut Table,
        key: &Key,
        header: Span,
    ) -> Result<(), ParseError> {
        let entry = Value::Table(Table::with_kind_and_span(TableKind::Header, header));
        match table.find_index(&key.name) {
            Some(idx) => {
                let (existing_key, existing) = table.entry_at_mut(idx);
                let first = existing_key.span;
                match existing {
                    Value::Array(a) if a.is_array_of_tables() => {
                        if let Err(e) = a.push(entry) {
                            return Err(self.set_error_span(header, e.kind));
                        }
                    }
                    Value::Array(_) => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::ExtendInline {
                                kind: "array",
                                first,
                            },
                        ));
                    }
                    Value::Table(_) => {
                        return Err(self.set_error_span(header, ErrorKind::RedefineAsArray));
                    }
                    _ => {
                        return Err(self.set_error_span(
                            key.span,
                            ErrorKind::DuplicateKey {
                                key: key.name.clone(),
                                first,
                            },
                        ));
                    }
                }
            }
            None => {
                let mut array = Array::with_kind_and_span(ArrayKind::Tables, header);
                if let Err(e) = array.push(entry) {
                    return Err(self.set_error_span(header, e.kind));
                }
                table.push_entry(key.clone(), Value::Array(array));
            }
        }
        self.ctx.push(Ctx {
            name: key.name.clone(),
            array: true,
        });
        Ok(())
    }

    /// Insert a value into a table, checking for duplicates.
    fn insert_value(&mut self, table: &mut Table, key: Key, val: Value) -> Result<(), ParseError> {
        if let Some((existing_key, _)) = table.get_key_value(&key.name) {
            let first = existing_key.span;
            return Err(self.set_error_span(
                key.span,
                ErrorKind::DuplicateKey {
                    key: key.name.clone(),
                    first,
                },
            ));
        }
        table.push_entry(key, val);
        Ok(())
    }

    /// Inserts `val` under a possibly dotted key.
    fn insert_at_path(
        &mut self,
        table: &mut Table,
        mut path: Vec<Key>,
        val: Value,
    ) -> Result<(), ParseError> {
        let Some(last) = path.pop() else {
            return Err(self.set_error(self.cursor, None, ErrorKind::EmptyKey));
        };
        let mut table = table;
        for key in &path {
            table = ptry!(self.navigate_dotted_key(table, key));
        }
        self.insert_value(table, last, val)
    }

    // -- statements ---------------------------------------------------------

    fn parse_document(&mut self, root: &mut Table) -> Result<(), ParseError> {
        self.ctx.clear();
        loop {
            self.eat_whitespace();
            match self.eat_comment() {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => return Err(e),
            }
            if self.eat_newline() {
                continue;
            }

            match self.peek_byte() {
                None => break,
                Some(b'[') => {
                    self.layout.headers.push(self.cursor);
                    ptry!(self.process_table_header(root))
                }
                Some(_) => {
                    self.layout.entries.push(self.cursor);
                    ptry!(self.process_key_value(root))
                }
            }
        }
        Ok(())
    }

    fn process_table_header(&mut self, root: &mut Table) -> Result<(), ParseError> {
        let header_start = self.cursor;
        ptry!(self.expect_byte(b'['));
        let is_array = self.eat_byte(b'[');

        self.eat_whitespace();
        let path = ptry!(self.read_key_path());
        ptry!(self.expect_byte(b']'));
        if is_array {
            ptry!(self.expect_byte(b']'));
        }
        let header = Span::new(header_start as u32, self.cursor as u32);
        ptry!(self.end_of_line());

        let Some((last, parents)) = path.split_last() else {
            return Err(self.set_error_span(header, ErrorKind::EmptyKey));
        };
        let name = path
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(".");

        self.ctx.clear();
        let mut table = root;
        for key in parents {
            table = ptry!(self.navigate_header_intermediate(table, key, header));
        }
        if is_array {
            self.navigate_header_array_final(table, last, header)
        } else {
            self.navigate_header_table_final(table, last, header, &name)
        }
    }

    fn process_key_value(&mut self, root: &mut Table) -> Result<(), ParseError> {
        let path = ptry!(self.read_key_path());
        ptry!(self.expect_byte(b'='));
        self.eat_whitespace();
        if matches!(self.peek_byte(), None | Some(b'\n' | b'\r' | b'#')) {
            return Err(self.set_error(self.cursor, None, ErrorKind::MissingValue));
        }
        let val = ptry!(self.value());
        ptry!(self.end_of_line());

        let Some(table) = descend(root, &self.ctx) else {
            return Err(self.set_error(self.cursor, None, ErrorKind::StackUnderflow));
        };
        self.insert_at_path(table, path, val)
    }

    /// A single value with only whitespace and comments around it.
    fn single_value(&mut self) -> Result<Value, ParseError> {
        self.eat_whitespace();
        if matches!(self.peek_byte(), None | Some(b'\n' | b'\r' | b'#')) {
            return Err(self.set_error(self.cursor, None, ErrorKind::MissingValue));
        }
        let val = ptry!(self.value());
        ptry!(self.eat_intermediate());
        if self.peek_byte().is_some() {
            return Err(self.wanted("the end of the value"));
        }
        Ok(val)
    }
}

/// Walks the context path from the root to the table it names.
fn descend<'t>(root: &'t mut Table, path: &[Ctx]) -> Option<&'t mut Table> {
    let mut table = root;
    for step in path {
        let Some(value) = table.get_mut(&step.name) else {
            return None;
        };
        table = match value {
            Value::Table(t) if !step.array => t,
            Value::Array(a) if step.array => match a.last_mut() {
                Some(Value::Table(t)) => t,
                _ => return None,
            },
            _ => return None,
        };
    }
    Some(table)
}

/// Marks a closed inline table, and the dotted tables inside it, as inline.
fn freeze_inline(table: &mut Table) {
    table.set_kind(TableKind::Inline);
    for value in table.values_mut() {
        if let Value::Table(sub) = value
            && sub.kind() == TableKind::Dotted
        {
            freeze_inline(sub);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parses a TOML document.
///
/// # Examples
///
/// ```
/// let doc = toml_patchwork::parse("[server]\nport = 8080\n")?;
/// assert_eq!(doc.get("server.port")?.and_then(|v| v.as_i64()), Some(8080));
/// # Ok::<(), toml_patchwork::Error>(())
/// ```
pub fn parse(s: &str) -> Result<Document, Error> {
    parse_with_layout(s).map(|(doc, _)| doc)
}

/// Parses a document, also returning where its statements begin.
pub(crate) fn parse_with_layout(s: &str) -> Result<(Document, Layout), Error> {
    let mut root = Table::with_kind_and_span(TableKind::Implicit, Span::new(0, s.len() as u32));
    let mut parser = Parser::new(s);
    match parser.parse_document(&mut root) {
        Ok(()) => Ok((Document::from_table(root), parser.layout)),
        Err(_) => Err(parser.take_error()),
    }
}

/// Parses a single TOML value such as `42`, `"text"` or `[1, 2]`.
///
/// Surrounding whitespace and a trailing comment are accepted; anything else
/// after the value is an error.
pub fn parse_value(s: &str) -> Result<Value, Error> {
    let mut parser = Parser::new(s);
    match parser.single_value() {
        Ok(v) => Ok(v),
        Err(_) => Err(parser.take_error()),
    }
}

/// Parses a dotted key path such as `a."b.c".d`.
pub(crate) fn parse_key_path(s: &str) -> Result<Vec<Key>, Error> {
    let mut parser = Parser::new(s);
    parser.eat_whitespace();
    let path = match parser.read_key_path() {
        Ok(path) => path,
        Err(_) => return Err(ErrorKind::InvalidPath(s.to_owned()).into()),
    };
    if parser.peek_byte().is_some() {
        return Err(ErrorKind::InvalidPath(s.to_owned()).into());
    }
    Ok(path)
}

/// Parses the value at the very start of `s`, returning it with the number
/// of bytes it occupies.
pub(crate) fn measure_value(s: &str) -> Result<(Value, usize), Error> {
    let mut parser = Parser::new(s);
    match parser.value() {
        Ok(v) => Ok((v, parser.cursor)),
        Err(_) => Err(parser.take_error()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[inline]
fn is_keylike_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn byte_describe(b: u8) -> &'static str {
    match b {
        b'\n' => "a newline",
        b' ' | b'\t' => "whitespace",
        b'=' => "an equals",
        b'.' => "a period",
        b',' => "a comma",
        b':' => "a colon",
        b'+' => "a plus",
        b'{' => "a left brace",
        b'}' => "a right brace",
        b'[' => "a left bracket",
        b']' => "a right bracket",
        b'\'' | b'"' => "a string",
        _ if is_keylike_byte(b) => "an identifier",
        _ => "a character",
    }
}
