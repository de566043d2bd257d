//! Line-oriented N-Triples parsing.
//!
//! Each dump line holds at most one statement. Terms may be separated by
//! spaces or tabs (the Freebase dump uses tabs) and the statement ends with
//! `.`. Blank lines and `#` comments parse to `None`.

use crate::error::CoreError;
use crate::term::{Term, Triple};

/// Parse one line into a triple. `Ok(None)` means the line carries no
/// statement.
pub fn parse_line(line: &str) -> Result<Option<Triple>, CoreError> {
    let mut cursor = Cursor::new(line);
    cursor.skip_ws();
    match cursor.peek() {
        None | Some('#') => return Ok(None),
        _ => {}
    }

    let subject = cursor.term()?;
    if matches!(subject, Term::Literal { .. }) {
        return Err(CoreError::syntax(1, "subject must be an IRI or blank node"));
    }
    cursor.require_ws()?;

    let predicate_column = cursor.column();
    let predicate = cursor.term()?;
    if !matches!(predicate, Term::Iri(_)) {
        return Err(CoreError::syntax(predicate_column, "predicate must be an IRI"));
    }
    cursor.require_ws()?;

    let object = cursor.term()?;
    cursor.skip_ws();
    cursor.expect('.')?;
    cursor.skip_ws();
    match cursor.peek() {
        None | Some('#') => Ok(Some(Triple::new(subject, predicate, object))),
        Some(c) => Err(CoreError::syntax(
            cursor.column(),
            format!("unexpected '{c}' after statement"),
        )),
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn column(&self) -> usize {
        self.pos + 1
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CoreError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(CoreError::syntax(self.column(), format!("expected '{expected}'")))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
    }

    fn require_ws(&mut self) -> Result<(), CoreError> {
        let start = self.pos;
        self.skip_ws();
        if self.pos == start {
            return Err(CoreError::syntax(self.column(), "expected whitespace"));
        }
        Ok(())
    }

    fn term(&mut self) -> Result<Term, CoreError> {
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri()?)),
            Some('_') => self.blank(),
            Some('"') => self.literal(),
            Some(c) => Err(CoreError::syntax(
                self.column(),
                format!("unexpected '{c}' at start of term"),
            )),
            None => Err(CoreError::syntax(self.column(), "unexpected end of line")),
        }
    }

    fn iri(&mut self) -> Result<String, CoreError> {
        self.expect('<')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('u') => out.push(self.hex_escape(4)?),
                    Some('U') => out.push(self.hex_escape(8)?),
                    other => {
                        return Err(CoreError::InvalidEscape(format!(
                            "\\{} in IRI",
                            other.map(String::from).unwrap_or_default()
                        )));
                    }
                },
                Some(c @ (' ' | '\t' | '<' | '"' | '{' | '}' | '|' | '^' | '`')) => {
                    return Err(CoreError::syntax(
                        self.column() - 1,
                        format!("'{c}' is not allowed in an IRI"),
                    ));
                }
                Some(c) => out.push(c),
                None => return Err(CoreError::syntax(self.column(), "unterminated IRI")),
            }
        }
    }

    fn blank(&mut self) -> Result<Term, CoreError> {
        self.expect('_')?;
        self.expect(':')?;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.bump();
        }
        // A trailing '.' belongs to the statement, not the label.
        let mut end = self.pos;
        while end > start && self.input.as_bytes()[end - 1] == b'.' {
            end -= 1;
        }
        self.pos = end;
        if end == start {
            return Err(CoreError::syntax(self.column(), "empty blank node label"));
        }
        Ok(Term::Blank(self.input[start..end].to_string()))
    }

    fn literal(&mut self) -> Result<Term, CoreError> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => value.push(self.string_escape()?),
                Some(c) => value.push(c),
                None => {
                    return Err(CoreError::syntax(self.column(), "unterminated string literal"));
                }
            }
        }

        if self.eat('@') {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '-') {
                self.pos += 1;
            }
            if self.pos == start {
                return Err(CoreError::syntax(self.column(), "empty language tag"));
            }
            return Ok(Term::Literal {
                value,
                language: Some(self.input[start..self.pos].to_string()),
                datatype: None,
            });
        }

        if self.eat('^') {
            self.expect('^')?;
            let datatype = self.iri()?;
            return Ok(Term::Literal {
                value,
                language: None,
                datatype: Some(datatype),
            });
        }

        Ok(Term::Literal {
            value,
            language: None,
            datatype: None,
        })
    }

    fn string_escape(&mut self) -> Result<char, CoreError> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('b') => Ok('\u{0008}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('f') => Ok('\u{000C}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u') => self.hex_escape(4),
            Some('U') => self.hex_escape(8),
            Some(c) => Err(CoreError::InvalidEscape(format!("\\{c}"))),
            None => Err(CoreError::InvalidEscape("trailing backslash".into())),
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, CoreError> {
        let start = self.pos;
        for _ in 0..digits {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => {
                    return Err(CoreError::InvalidEscape(format!(
                        "expected {digits} hex digits at column {}",
                        start + 1
                    )));
                }
            }
        }
        let hex = &self.input[start..self.pos];
        u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| CoreError::InvalidEscape(format!("\\u{hex} is not a scalar value")))
    }
}
