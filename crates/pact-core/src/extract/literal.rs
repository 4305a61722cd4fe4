//! Lenient data-literal parser for near-JSON model output.
//!
//! Accepts JSON plus the spellings models borrow from other languages:
//! single-quoted strings, `True`/`False`/`None`, and trailing commas. The
//! grammar contains only mappings, sequences, strings, numbers, booleans and
//! null. Identifiers, calls and operators are syntax errors; nothing is ever
//! evaluated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Nesting limit for sequences and mappings.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    /// Byte offset into the input.
    pub offset: usize,
    pub message: String,
}

/// Parse a complete literal into a JSON value.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Parse a literal that must be a sequence.
pub fn parse_sequence(input: &str) -> Result<Vec<Value>, LiteralError> {
    match parse_literal(input)? {
        Value::Array(items) => Ok(items),
        _ => Err(LiteralError {
            offset: 0,
            message: "expected a sequence".into(),
        }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(LiteralError {
                offset: self.pos - c.len_utf8(),
                message: format!("expected {expected:?}, found {c:?}"),
            }),
            None => Err(self.error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        match self.peek() {
            Some('[') => self.parse_sequence(depth),
            Some('{') => self.parse_mapping(depth),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_sequence(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => {
                    return Err(LiteralError {
                        offset: self.pos - c.len_utf8(),
                        message: format!("expected ',' or ']', found {c:?}"),
                    });
                }
                None => return Err(self.error("unterminated sequence")),
            }
        }
    }

    fn parse_mapping(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key = self.parse_key()?;
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => {
                    return Err(LiteralError {
                        offset: self.pos - c.len_utf8(),
                        message: format!("expected ',' or '}}', found {c:?}"),
                    });
                }
                None => return Err(self.error("unterminated mapping")),
            }
        }
    }

    /// Keys are strings; numeric keys are kept in their textual form.
    fn parse_key(&mut self) -> Result<String, LiteralError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.parse_string(q),
            Some(c) if c == '-' || c.is_ascii_digit() => match self.parse_number()? {
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(self.error("invalid key")),
            },
            _ => Err(self.error("mapping keys must be strings or numbers")),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LiteralError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(LiteralError {
                        offset: start,
                        message: "unterminated string".into(),
                    });
                }
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.parse_escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, LiteralError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '0' => '\0',
            '\\' | '\'' | '"' | '/' => c,
            'u' => return self.parse_unicode_escape(),
            other => return Err(self.error(format!("unknown escape \\{other}"))),
        })
    }

    fn parse_unicode_escape(&mut self) -> Result<char, LiteralError> {
        let high = self.parse_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            // Surrogate pair: expect a following \uXXXX low half.
            if self.src[self.pos..].starts_with("\\u") {
                self.pos += 2;
                let low = self.parse_hex4()?;
                if (0xDC00..0xE000).contains(&low) {
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(code).ok_or_else(|| self.error("invalid code point"));
                }
            }
            return Err(self.error("unpaired surrogate in \\u escape"));
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_hex4(&mut self) -> Result<u32, LiteralError> {
        let digits = self
            .src
            .get(self.pos..self.pos + 4)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("expected four hex digits"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|e| self.error(e.to_string()))?;
        self.pos += 4;
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_') {
                self.bump();
            } else if matches!(c, '-' | '+')
                && matches!(self.src[..self.pos].chars().last(), Some('e' | 'E'))
            {
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_' && *c != '+')
            .collect();
        let unsigned = text.trim_start_matches('-');
        if unsigned.is_empty() || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return Err(LiteralError {
                offset: start,
                message: "invalid number".into(),
            });
        }
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Number(i.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number {text:?}"),
            })
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            word => Err(LiteralError {
                offset: start,
                message: format!("unsupported identifier {word:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_plain_json() {
        let v = parse_literal(r#"{"a": [1, 2.5, "x", true, null]}"#).unwrap();
        assert_eq!(v, json!({"a": [1, 2.5, "x", true, null]}));
    }

    #[test]
    fn parses_single_quotes_and_python_keywords() {
        let v = parse_literal("{'plan': {'done': False, 'note': None, 'ok': True}}").unwrap();
        assert_eq!(v, json!({"plan": {"done": false, "note": null, "ok": true}}));
    }

    #[test]
    fn allows_trailing_commas() {
        assert_eq!(
            parse_literal("['步骤1', '步骤2',]").unwrap(),
            json!(["步骤1", "步骤2"])
        );
        assert_eq!(parse_literal("{'a': 1,}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn handles_escapes_and_mixed_quotes() {
        let v = parse_literal(r#"['it\'s', "say \"hi\"", '你\n']"#).unwrap();
        assert_eq!(v, json!(["it's", "say \"hi\"", "你\n"]));
    }

    #[test]
    fn decodes_surrogate_pairs() {
        assert_eq!(parse_literal("\"\\ud83d\\ude00\"").unwrap(), json!("😀"));
        assert_eq!(parse_literal("'\\uD83D\\uDE00'").unwrap(), json!("😀"));
        assert!(parse_literal(r#""\ud83d""#).is_err());
    }

    #[test]
    fn numeric_keys_become_strings() {
        assert_eq!(parse_literal("{1: 'a'}").unwrap(), json!({"1": "a"}));
    }

    #[test]
    fn rejects_executable_syntax() {
        for input in [
            "__import__('os').system('ls')",
            "open('x')",
            "[1 + 2]",
            "['a'] * 3",
            "[x for x in range(3)]",
            "lambda: 1",
        ] {
            assert!(parse_literal(input).is_err(), "should reject {input:?}");
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse_literal("['a'] extra").unwrap_err();
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn rejects_unterminated_input() {
        assert!(parse_literal("['a', 'b'").is_err());
        assert!(parse_literal("'abc").is_err());
        assert!(parse_literal("").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = "[".repeat(MAX_DEPTH + 2) + &"]".repeat(MAX_DEPTH + 2);
        assert!(parse_literal(&deep).is_err());
        let ok = "[".repeat(10) + &"]".repeat(10);
        assert!(parse_literal(&ok).is_ok());
    }

    #[test]
    fn sequence_requires_array() {
        assert_eq!(parse_sequence("[1, 'a']").unwrap(), vec![json!(1), json!("a")]);
        assert!(parse_sequence("{'a': 1}").is_err());
    }

    #[test]
    fn parses_signed_and_exponent_numbers() {
        assert_eq!(parse_literal("[-3, +4, 1e3, 2.5E-1]").unwrap(), json!([-3, 4, 1000.0, 0.25]));
    }
}
