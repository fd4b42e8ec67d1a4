//! Textual fact codec for the rule-engine boundary.
//!
//! Facts are parenthesised templates with single-valued slots:
//!
//! ```text
//! (symptom (name screen-visuals) (value black) (cf 1.0))
//! (diagnosis (fault "GPU failure") (solution "Reseat the card") (category display) (cf 0.72) (citation "vendor manual"))
//! ```
//!
//! Slot values are symbols, numbers, or double-quoted strings with `\"` and
//! `\\` escapes.

use crate::error::{DiagError, Result};
use crate::features::Symptom;
use serde::{Deserialize, Serialize};

/// A slot value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Number(f64),
    Symbol(String),
    Str(String),
}

impl SlotValue {
    /// Text of a symbol or string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SlotValue::Symbol(s) | SlotValue::Str(s) => Some(s),
            SlotValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SlotValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Symbol if it would read back as one, string otherwise.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if is_symbol(&s) {
            SlotValue::Symbol(s)
        } else {
            SlotValue::Str(s)
        }
    }
}

impl std::fmt::Display for SlotValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotValue::Number(n) => write!(f, "{:?}", n),
            SlotValue::Symbol(s) => f.write_str(s),
            SlotValue::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '/' | '+' | '%')
}

fn is_symbol(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_symbol_char) && parse_number(s).is_none()
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// One fact: a template name and its slots in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub template: String,
    pub slots: Vec<(String, SlotValue)>,
}

impl Fact {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            slots: Vec::new(),
        }
    }

    pub fn with(mut self, slot: impl Into<String>, value: SlotValue) -> Self {
        self.slots.push((slot.into(), value));
        self
    }

    pub fn get(&self, slot: &str) -> Option<&SlotValue> {
        self.slots.iter().find(|(name, _)| name == slot).map(|(_, v)| v)
    }

    pub fn text(&self, slot: &str) -> Option<&str> {
        self.get(slot).and_then(SlotValue::as_text)
    }

    pub fn number(&self, slot: &str) -> Option<f64> {
        self.get(slot).and_then(SlotValue::as_number)
    }

    /// `(symptom (name N) (value V) (cf F))`
    pub fn symptom(symptom: &Symptom) -> Self {
        Fact::new("symptom")
            .with("name", SlotValue::text(symptom.name.as_str()))
            .with("value", SlotValue::text(symptom.value.as_str()))
            .with("cf", SlotValue::Number(symptom.cf))
    }

    /// Read a symptom fact back; `None` if any slot is missing.
    pub fn to_symptom(&self) -> Option<Symptom> {
        if self.template != "symptom" {
            return None;
        }
        Some(Symptom {
            name: self.text("name")?.to_string(),
            value: self.text("value")?.to_string(),
            cf: self.number("cf")?,
        })
    }
}

impl std::fmt::Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.template)?;
        for (name, value) in &self.slots {
            write!(f, " ({} {})", name, value)?;
        }
        f.write_str(")")
    }
}

impl std::str::FromStr for Fact {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self> {
        parse_fact(s)
    }
}

/// Parse exactly one fact; trailing non-whitespace is an error.
pub fn parse_fact(input: &str) -> Result<Fact> {
    let mut parser = Parser::new(input);
    let fact = parser.fact()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(DiagError::syntax(parser.pos, format!("unexpected {:?} after fact", c)));
    }
    Ok(fact)
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
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(DiagError::syntax(self.pos - c.len_utf8(), format!("expected {:?}, found {:?}", want, c))),
            None => Err(DiagError::syntax(self.pos, format!("expected {:?}, found end of input", want))),
        }
    }

    fn fact(&mut self) -> Result<Fact> {
        self.expect('(')?;
        let template = self.symbol()?;
        let mut fact = Fact::new(template);
        loop {
            self.skip_ws();
            match self.peek() {
                Some(')') => {
                    self.bump();
                    return Ok(fact);
                }
                Some('(') => {
                    self.bump();
                    let name = self.symbol()?;
                    let value = self.value()?;
                    self.expect(')')?;
                    fact.slots.push((name, value));
                }
                Some(c) => return Err(DiagError::syntax(self.pos, format!("expected slot, found {:?}", c))),
                None => return Err(DiagError::syntax(self.pos, "unterminated fact")),
            }
        }
    }

    fn symbol(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(is_symbol_char) {
            self.bump();
        }
        if start == self.pos {
            return Err(DiagError::syntax(start, "expected symbol"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn value(&mut self) -> Result<SlotValue> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.string(),
            Some(_) => {
                let raw = self.symbol()?;
                Ok(match parse_number(&raw) {
                    Some(n) => SlotValue::Number(n),
                    None => SlotValue::Symbol(raw),
                })
            }
            None => Err(DiagError::syntax(self.pos, "expected value")),
        }
    }

    fn string(&mut self) -> Result<SlotValue> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(SlotValue::Str(out)),
                Some('\\') => match self.bump() {
                    Some(c @ ('"' | '\\')) => out.push(c),
                    Some(c) => return Err(DiagError::syntax(self.pos, format!("unknown escape \\{}", c))),
                    None => return Err(DiagError::syntax(start, "unterminated string")),
                },
                Some(c) => out.push(c),
                None => return Err(DiagError::syntax(start, "unterminated string")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_symptom() {
        let s = Symptom {
            name: "screen-visuals".into(),
            value: "black".into(),
            cf: 1.0,
        };
        assert_eq!(
            Fact::symptom(&s).to_string(),
            "(symptom (name screen-visuals) (value black) (cf 1.0))"
        );
    }

    #[test]
    fn test_parse_diagnosis() {
        let fact = parse_fact(
            r#"(diagnosis (fault "GPU failure") (solution "Reseat the \"card\"") (category display) (cf 0.72) (citation none))"#,
        )
        .unwrap();
        assert_eq!(fact.template, "diagnosis");
        assert_eq!(fact.text("fault"), Some("GPU failure"));
        assert_eq!(fact.text("solution"), Some("Reseat the \"card\""));
        assert_eq!(fact.number("cf"), Some(0.72));
        assert_eq!(fact.text("category"), Some("display"));
    }

    #[test]
    fn test_roundtrip_with_escapes() {
        let fact = Fact::new("note")
            .with("text", SlotValue::text(r#"back\slash and "quotes""#))
            .with("n", SlotValue::Number(-0.5));
        let parsed: Fact = fact.to_string().parse().unwrap();
        assert_eq!(parsed, fact);
    }

    #[test]
    fn test_numeric_looking_text_is_quoted() {
        let fact = Fact::new("x").with("v", SlotValue::text("85"));
        assert_eq!(fact.to_string(), "(x (v \"85\"))");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_fact("symptom (name x)").is_err());
        assert!(parse_fact("(symptom (name x)").is_err());
        assert!(parse_fact("(symptom (name \"x))").is_err());
        assert!(parse_fact("(symptom (name x)) extra").is_err());
        assert!(parse_fact("(symptom (name))").is_err());
    }

    #[test]
    fn test_to_symptom_requires_slots() {
        let fact = parse_fact("(symptom (name power-state) (value dead))").unwrap();
        assert!(fact.to_symptom().is_none());
        let fact = parse_fact("(symptom (name power-state) (value dead) (cf 0.9))").unwrap();
        assert_eq!(fact.to_symptom().unwrap().value, "dead");
    }
}
