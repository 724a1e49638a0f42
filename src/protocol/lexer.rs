//! Character cursor shared by the attribute-path and filter parsers.

/// Forward-only cursor over filter or path text.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Advance by `bytes`, which must land on a char boundary of the remaining text.
    pub(crate) fn advance(&mut self, bytes: usize) {
        self.position = (self.position + bytes).min(self.text.len());
    }

    /// Skip whitespace, returning whether any was consumed.
    pub(crate) fn skip_whitespace(&mut self) -> bool {
        let skipped = self.take_while(char::is_whitespace);
        !skipped.is_empty()
    }

    pub(crate) fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let length = rest
            .char_indices()
            .find(|(_, c)| !predicate(*c))
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        self.position += length;
        &rest[..length]
    }

    /// Read a comparison value: a double-quoted string or a bare JSON literal
    /// (`true`, `false`, `null` or a number).
    pub(crate) fn value_literal(&mut self) -> Result<String, String> {
        if self.eat('"') {
            return self.quoted_remainder();
        }
        let bare = self.take_while(|c| !c.is_whitespace() && c != ']' && c != ')');
        if bare.is_empty() {
            return Err(format!("expected a comparison value at position {}", self.position));
        }
        match serde_json::from_str::<serde_json::Value>(bare) {
            Ok(serde_json::Value::Bool(b)) => Ok(b.to_string()),
            Ok(serde_json::Value::Number(n)) => Ok(n.to_string()),
            Ok(serde_json::Value::Null) => Ok("null".to_string()),
            _ => Err(format!("unquoted comparison value '{}'", bare)),
        }
    }

    fn quoted_remainder(&mut self) -> Result<String, String> {
        let start = self.position;
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(format!("unterminated string starting at position {}", start - 1)),
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('/') => value.push('/'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some(other) => return Err(format!("invalid escape '\\{}'", other)),
                    None => return Err("dangling escape at end of input".to_string()),
                },
                Some(c) => value.push(c),
            }
        }
    }
}

/// Attribute name characters: `ALPHA *(ALPHA / DIGIT / "-" / "_")`, plus `$` for `$ref`.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$'
}

/// Render a comparison value in canonical quoted form.
pub(crate) fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
