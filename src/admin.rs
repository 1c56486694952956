//! Admin sub-mode input: one line of `key:value` pairs becomes one database
//! command document.
//!
//! Accepted syntax is a relaxed object literal without the outer braces:
//!
//! ```text
//! ping:1
//! distinct:'users', key:'city', query:{age:{$gt:30}}
//! collStats:"orders", scale:1024
//! ```
//!
//! Keys are identifiers or quoted strings. Values are numbers, single- or
//! double-quoted strings, `true`, `false`, `null`, arrays, and nested objects
//! using the same syntax. Anything else is rejected; input is never evaluated.

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// Command names listed by `help`. Advisory only; the server decides what
/// it actually supports.
pub const ADMIN_COMMANDS: &[&str] = &[
    "ping",
    "profile",
    "repairDatabase",
    "resetError",
    "whatsmyuri",
    "convertToCapped",
    "distinct",
    "findAndModify",
    "geoNear",
    "reIndex",
    "collStats",
    "dbStats",
    "getLastError",
    "getPrevError",
];

pub const INVALID_COMMAND: &str = "The command you are trying to run is invalid or unsupported.";

/// A database command document, keys in the order they were typed.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminCommand(Map<String, Value>);

impl AdminCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut p = Parser::new(line);
        p.skip_ws();
        if p.at_end() {
            return Err(Error::Parse("empty command".into()));
        }
        let map = p.parse_members(None)?;
        p.skip_ws();
        if !p.at_end() {
            return Err(p.error("unexpected trailing input"));
        }
        Ok(Self(map))
    }

    /// `{ping: 1}`-style single-entry command.
    pub fn single(name: &str, value: Value) -> Self {
        let mut map = Map::new();
        map.insert(name.to_string(), value);
        Self(map)
    }

    /// The command name is the first key.
    pub fn name(&self) -> Option<&str> {
        self.0.keys().next().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// One line typed in the admin sub-mode.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminInput {
    Help,
    Exit,
    Command(AdminCommand),
}

impl AdminInput {
    pub fn parse(line: &str) -> Result<Self> {
        match line.trim() {
            "help" => Ok(AdminInput::Help),
            "exit" => Ok(AdminInput::Exit),
            other => AdminCommand::parse(other).map(AdminInput::Command),
        }
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

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{want}'"))),
        }
    }

    fn error(&self, msg: &str) -> Error {
        Error::Parse(format!("{msg} at column {}", self.pos + 1))
    }

    /// `key:value` pairs up to `close` (or end of input at top level).
    /// A trailing comma is allowed.
    fn parse_members(&mut self, close: Option<char>) -> Result<Map<String, Value>> {
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == close {
                break;
            }
            let key = self.parse_key()?;
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                c if c == close => break,
                Some(c) => return Err(self.error(&format!("expected ',' found '{c}'"))),
                None => return Err(self.error("unterminated object")),
            }
        }
        Ok(map)
    }

    fn parse_key(&mut self) -> Result<String> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.bump();
                self.parse_string(q)
            }
            Some(c) if is_ident_start(c) => Ok(self.parse_ident().to_string()),
            Some(c) => Err(self.error(&format!("invalid key start '{c}'"))),
            None => Err(self.error("expected a key")),
        }
    }

    fn parse_ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            Some('{') => {
                self.bump();
                let map = self.parse_members(Some('}'))?;
                self.expect('}')?;
                Ok(Value::Object(map))
            }
            Some('[') => {
                self.bump();
                self.parse_array()
            }
            Some(q @ ('\'' | '"')) => {
                self.bump();
                self.parse_string(q).map(Value::String)
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if is_ident_start(c) => match self.parse_ident() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                other => Err(Error::Parse(format!("unsupported identifier '{other}'"))),
            },
            Some(c) => Err(self.error(&format!("unexpected '{c}'"))),
            None => Err(self.error("expected a value")),
        }
    }

    fn parse_array(&mut self) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => return Err(self.error(&format!("expected ',' found '{c}'"))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.parse_unicode_escape()?),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let start = self.pos;
        let end = start + 4;
        let hex = self
            .src
            .get(start..end)
            .ok_or_else(|| self.error("short \\u escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid \\u escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid \\u escape"))
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')) {
            self.bump();
        }
        let token = &self.src[start..self.pos];
        let token = token.strip_prefix('+').unwrap_or(token);
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Value::Number(i.into()));
        }
        token
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| Error::Parse(format!("invalid number '{token}'")))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(line: &str) -> Value {
        AdminCommand::parse(line).unwrap().to_value()
    }

    #[test]
    fn test_ping() {
        assert_eq!(parse("ping:1"), json!({"ping": 1}));
        assert_eq!(parse("  ping : 1 "), json!({"ping": 1}));
    }

    #[test]
    fn test_multiple_pairs_keep_order() {
        let cmd = AdminCommand::parse("distinct:'users', key:\"city\"").unwrap();
        assert_eq!(cmd.name(), Some("distinct"));
        assert_eq!(cmd.to_value(), json!({"distinct": "users", "key": "city"}));
        let keys: Vec<_> = cmd.0.keys().cloned().collect();
        assert_eq!(keys, vec!["distinct", "key"]);
    }

    #[test]
    fn test_nested_values() {
        assert_eq!(
            parse("findAndModify:'people', query:{name:'Andy', age:{$gt:-2.5}}, remove:true, fields:[1, 'a', null]"),
            json!({
                "findAndModify": "people",
                "query": {"name": "Andy", "age": {"$gt": -2.5}},
                "remove": true,
                "fields": [1, "a", null]
            })
        );
    }

    #[test]
    fn test_quoted_keys_and_escapes() {
        assert_eq!(
            parse(r#""$weird key":'it\'s', 'uni':"é""#),
            json!({"$weird key": "it's", "uni": "é"})
        );
    }

    #[test]
    fn test_trailing_comma() {
        assert_eq!(parse("dbStats:1, scale:1024,"), json!({"dbStats": 1, "scale": 1024}));
    }

    #[test]
    fn test_rejects_code() {
        for bad in [
            "process.exit(1)",
            "ping:require('fs')",
            "ping:x",
            "ping",
            "ping:1 ping:2",
            "ping:'open",
            "a:{b:1",
            "a:[1,2",
            ":1",
            "",
            "   ",
        ] {
            assert!(
                matches!(AdminCommand::parse(bad), Err(Error::Parse(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_input_kinds() {
        assert_eq!(AdminInput::parse("help").unwrap(), AdminInput::Help);
        assert_eq!(AdminInput::parse(" exit ").unwrap(), AdminInput::Exit);
        assert_eq!(
            AdminInput::parse("ping:1").unwrap(),
            AdminInput::Command(AdminCommand::single("ping", json!(1)))
        );
    }

    #[test]
    fn test_help_list() {
        assert_eq!(ADMIN_COMMANDS.len(), 14);
        assert!(ADMIN_COMMANDS.contains(&"whatsmyuri"));
    }
}
