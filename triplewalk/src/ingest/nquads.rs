//! Line-oriented N-Triples / N-Quads reader.
//!
//! Each line holds a subject, predicate, object, an optional fourth term
//! (kept as the triple's provenance value) and a closing `.`:
//!
//! ```text
//! <http://ex/a> <http://ex/knows> "Bob"@en <http://ex/graph> .
//! ```
//!
//! Terms are `<iri>`, `"literal"` (with optional `^^<type>`, which is
//! dropped, or `@lang`), or a bare whitespace-terminated token. Blank lines
//! and `#` comments are skipped, as are lines with a literal in another
//! language than [`ParseOptions::language`].

use std::fmt;
use std::io::BufRead;

use crate::types::Triple;

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Language tag a literal must carry (if it carries one) for its line to
    /// be kept.
    pub language: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

enum Part {
    Term(Vec<u8>),
    /// The statement terminator; the input is left at the `.`.
    Dot,
    /// A literal in another language.
    Filtered,
}

/// Parse one line.
///
/// Returns `Ok(None)` for lines that carry no triple: blank lines, comments,
/// lines missing a subject, predicate or object, and language-filtered lines.
pub fn parse_line(line: &str, options: &ParseOptions) -> Result<Option<Triple>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut rest = line.as_bytes();

    let mut spo = Vec::with_capacity(3);
    for _ in 0..3 {
        let (part, more) = next_part(rest, options)?;
        match part {
            Part::Term(term) if !term.is_empty() => spo.push(term),
            _ => return Ok(None),
        }
        rest = more;
    }

    let (meta, more) = next_part(rest, options)?;
    let v = match meta {
        Part::Term(term) => term,
        Part::Dot | Part::Filtered => Vec::new(),
    };
    let tail = more.trim_ascii();
    if !(tail.is_empty() || tail == b".") {
        return Err(ParseError::NotTerminated(
            String::from_utf8_lossy(tail).into_owned(),
        ));
    }

    let triple = match <[Vec<u8>; 3]>::try_from(spo) {
        Ok([s, p, o]) => Triple { s, p, o, v },
        Err(_) => return Ok(None),
    };
    if !triple.is_well_formed() {
        return Err(ParseError::DelimiterInTerm);
    }
    Ok(Some(triple))
}

fn next_part<'a>(s: &'a [u8], options: &ParseOptions) -> Result<(Part, &'a [u8]), ParseError> {
    let s = s.trim_ascii_start();
    match s.first() {
        None => Err(ParseError::MissingTerm),
        Some(b'<') => {
            let (iri, rest) = parse_iri(&s[1..])?;
            Ok((Part::Term(iri.to_vec()), rest))
        }
        Some(b'"') => parse_literal(&s[1..], options),
        Some(b'.') => Ok((Part::Dot, s)),
        Some(_) => {
            let end = s
                .iter()
                .position(|b| matches!(b, b' ' | b'\t' | b'\r'))
                .ok_or_else(|| {
                    ParseError::UnterminatedToken(String::from_utf8_lossy(s).into_owned())
                })?;
            Ok((Part::Term(s[..end].to_vec()), &s[end..]))
        }
    }
}

/// `s` starts just after the `<`.
fn parse_iri(s: &[u8]) -> Result<(&[u8], &[u8]), ParseError> {
    let end = s
        .iter()
        .position(|b| *b == b'>')
        .ok_or(ParseError::UnterminatedIri)?;
    Ok((&s[..end], &s[end + 1..]))
}

/// `s` starts just after the opening quote.
fn parse_literal<'a>(
    s: &'a [u8],
    options: &ParseOptions,
) -> Result<(Part, &'a [u8]), ParseError> {
    let mut value = Vec::with_capacity(s.len());
    let mut i = 0;
    loop {
        match s.get(i) {
            None => return Err(ParseError::UnterminatedLiteral),
            Some(b'"') => break,
            Some(b'\\') => {
                let escaped = *s.get(i + 1).ok_or(ParseError::DanglingEscape)?;
                match escaped {
                    b'"' => value.push(b'"'),
                    b'\\' => value.push(b'\\'),
                    b'n' => value.push(b'\n'),
                    b'r' => value.push(b'\r'),
                    b't' => value.push(b'\t'),
                    b'u' | b'U' => {
                        // Code points are not decoded.
                        value.push(b'?');
                        let digits = if escaped == b'u' { 4 } else { 8 };
                        let hex = s
                            .get(i + 2..)
                            .unwrap_or_default()
                            .iter()
                            .take(digits)
                            .take_while(|b| b.is_ascii_hexdigit())
                            .count();
                        i += hex;
                    }
                    other => return Err(ParseError::BadEscape(char::from(other))),
                }
                i += 2;
            }
            Some(b) => {
                value.push(*b);
                i += 1;
            }
        }
    }

    let mut rest = &s[i + 1..];
    if let Some(typed) = rest.strip_prefix(b"^^<") {
        let (_datatype, more) = parse_iri(typed)?;
        rest = more;
    } else if let Some(tagged) = rest.strip_prefix(b"@") {
        let end = tagged
            .iter()
            .position(|b| matches!(b, b' ' | b'\t' | b'.'))
            .unwrap_or(tagged.len());
        if end == 0 {
            return Err(ParseError::MissingLanguage);
        }
        if tagged[..end] != *options.language.as_bytes() {
            return Ok((Part::Filtered, &tagged[end..]));
        }
        rest = &tagged[end..];
    }
    Ok((Part::Term(value), rest))
}

/// Streams triples from a reader, one line at a time.
///
/// Lines without a triple are skipped; malformed lines yield an error and
/// reading continues with the next line.
#[derive(Debug)]
pub struct QuadReader<R: BufRead> {
    reader: R,
    options: ParseOptions,
    line: usize,
    buf: String,
    failed: bool,
}

impl<R: BufRead> QuadReader<R> {
    #[must_use]
    pub const fn new(reader: R, options: ParseOptions) -> Self {
        Self {
            reader,
            options,
            line: 0,
            buf: String::new(),
            failed: false,
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for QuadReader<R> {
    type Item = Result<Triple, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => {
                    // An I/O error ends the stream.
                    self.failed = true;
                    return Some(Err(ReadError::Io(e)));
                }
            }
            match parse_line(&self.buf, &self.options) {
                Ok(Some(triple)) => return Some(Ok(triple)),
                Ok(None) => {}
                Err(error) => {
                    return Some(Err(ReadError::Parse {
                        line: self.line,
                        error,
                    }));
                }
            }
        }
    }
}

/// Errors that can occur parsing a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input ended where a term was expected.
    MissingTerm,
    /// `<` without a closing `>`.
    UnterminatedIri,
    /// `"` without a closing quote.
    UnterminatedLiteral,
    /// Backslash at the end of the input.
    DanglingEscape,
    /// Unknown escape sequence.
    BadEscape(char),
    /// `@` with no language tag.
    MissingLanguage,
    /// Bare token running to the end of the line.
    UnterminatedToken(String),
    /// Extra input after the last term.
    NotTerminated(String),
    /// A term contains the key delimiter byte.
    DelimiterInTerm,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTerm => write!(f, "missing term"),
            Self::UnterminatedIri => write!(f, "unterminated IRI"),
            Self::UnterminatedLiteral => write!(f, "unterminated literal"),
            Self::DanglingEscape => write!(f, "missing escape character"),
            Self::BadEscape(c) => write!(f, "bad escape '\\{c}'"),
            Self::MissingLanguage => write!(f, "missing language after '@'"),
            Self::UnterminatedToken(t) => write!(f, "unterminated token '{t}'"),
            Self::NotTerminated(rest) => write!(f, "statement not terminated with '.': '{rest}'"),
            Self::DelimiterInTerm => write!(f, "term contains a NUL byte"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that can occur reading a stream of lines.
#[derive(Debug)]
pub enum ReadError {
    /// I/O error.
    Io(std::io::Error),
    /// A line failed to parse (1-based line number).
    Parse { line: usize, error: ParseError },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse { line, error } => write!(f, "line {line}: {error}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse { error, .. } => Some(error),
        }
    }
}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
