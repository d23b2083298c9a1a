//! Single-pass scanner for placeholder tokens in connection-string values
//!
//! Recognized forms, checked in this order at every position:
//!
//! - `$$` and `%%`: an escaped delimiter
//! - `${name}`, `$(name)`, `$[name]` and the same with `%`: a token, where
//!   `name` is 1 to 64 letters, digits, `_`, `-` or whitespace
//!
//! Anything else is literal text.

/// Longest token name that is recognized
pub const MAX_TOKEN_LENGTH: usize = 64;

/// A piece of scanned input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// `$$` or `%%`
    Escape { delimiter: char, text: &'a str },
    /// A placeholder; `name` is the raw text between the brackets
    Token { name: &'a str, text: &'a str },
}

impl<'a> Segment<'a> {
    /// The exact input text this segment covers
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Literal(text) => text,
            Segment::Escape { text, .. } => text,
            Segment::Token { text, .. } => text,
        }
    }
}

/// Iterator over the segments of a string
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    pending: Option<(usize, Segment<'a>)>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            pending: None,
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if let Some((end, segment)) = self.pending.take() {
            self.pos = end;
            return Some(segment);
        }
        if self.pos >= self.input.len() {
            return None;
        }

        let start = self.pos;
        let mut cursor = start;
        while cursor < self.input.len() {
            if let Some((end, segment)) = match_at(self.input, cursor) {
                if cursor == start {
                    self.pos = end;
                    return Some(segment);
                }
                self.pending = Some((end, segment));
                self.pos = cursor;
                return Some(Segment::Literal(&self.input[start..cursor]));
            }
            cursor += self.input[cursor..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        }

        self.pos = cursor;
        Some(Segment::Literal(&self.input[start..]))
    }
}

fn is_delimiter(c: char) -> bool {
    c == '$' || c == '%'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace()
}

fn closing_bracket(open: char) -> Option<char> {
    match open {
        '{' => Some('}'),
        '(' => Some(')'),
        '[' => Some(']'),
        _ => None,
    }
}

/// Try to recognize an escape or a token starting at byte offset `at`.
/// Returns the end offset and the segment.
fn match_at(input: &str, at: usize) -> Option<(usize, Segment<'_>)> {
    let mut chars = input[at..].chars();
    let delimiter = chars.next().filter(|c| is_delimiter(*c))?;
    let next = chars.next()?;

    if next == delimiter {
        let end = at + 2;
        return Some((
            end,
            Segment::Escape {
                delimiter,
                text: &input[at..end],
            },
        ));
    }

    let close = closing_bracket(next)?;
    let name_start = at + 2;
    let mut name_end = name_start;
    let mut length = 0;
    for c in input[name_start..].chars() {
        if !is_name_char(c) {
            break;
        }
        length += 1;
        if length > MAX_TOKEN_LENGTH {
            return None;
        }
        name_end += c.len_utf8();
    }

    if length == 0 || !input[name_end..].starts_with(close) {
        return None;
    }

    let end = name_end + close.len_utf8();
    Some((
        end,
        Segment::Token {
            name: &input[name_start..name_end],
            text: &input[at..end],
        },
    ))
}

/// True when `input` contains a `$$` or `%%` escape
pub fn has_escapes(input: &str) -> bool {
    Scanner::new(input).any(|s| matches!(s, Segment::Escape { .. }))
}

/// Raw names of every token in `input`, in order of appearance
pub fn token_names(input: &str) -> impl Iterator<Item = &str> {
    Scanner::new(input).filter_map(|s| match s {
        Segment::Token { name, .. } => Some(name),
        _ => None,
    })
}

/// Rewrite `input`: escapes collapse to their delimiter, tokens are replaced
/// by `resolve(name)` or kept verbatim when it returns `None`.
pub fn substitute<F>(input: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut output = String::with_capacity(input.len());
    for segment in Scanner::new(input) {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Escape { delimiter, .. } => output.push(delimiter),
            Segment::Token { name, text } => match resolve(name) {
                Some(value) => output.push_str(&value),
                None => output.push_str(text),
            },
        }
    }
    output
}
