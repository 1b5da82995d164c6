//! Minimal selector engine.
//!
//! Supports comma separated compound selectors built from a tag name,
//! `.class` and `[attr]`, `[attr="v"]`, `[attr*="v"]`, `[attr^="v"]`
//! conditions, e.g. `h1[data-test-id="conversation-title"], .conversation-title`.
//! Combinators (descendant, child, sibling) are not supported.

use std::fmt;
use std::str::FromStr;

use crate::error::DomError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    StartsWith(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrCondition>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let mut alternatives = Vec::new();
        for part in source.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid(source, "empty selector in list"));
            }
            alternatives.push(parse_compound(source, part)?);
        }
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against an element described by its tag and attribute lookup.
    pub(crate) fn matches_with<'a>(
        &self,
        tag: &str,
        attribute: impl Fn(&str) -> Option<&'a str>,
    ) -> bool {
        self.alternatives
            .iter()
            .any(|compound| compound_matches(compound, tag, &attribute))
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(selector: &str, message: &str) -> DomError {
    DomError::InvalidSelector {
        selector: selector.to_string(),
        message: message.to_string(),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(source: &str, part: &str) -> Result<Compound, DomError> {
    let chars: Vec<char> = part.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    let read_ident = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    if i < chars.len() && chars[i] == '*' {
        i += 1;
    } else if i < chars.len() && is_ident_char(chars[i]) {
        let (tag, end) = read_ident(i);
        compound.tag = Some(tag.to_ascii_lowercase());
        i = end;
    }

    while i < chars.len() {
        match chars[i] {
            '.' => {
                let (class, end) = read_ident(i + 1);
                if class.is_empty() {
                    return Err(invalid(source, "expected class name after '.'"));
                }
                compound.classes.push(class);
                i = end;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|p| p + i)
                    .ok_or_else(|| invalid(source, "unterminated attribute condition"))?;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attributes.push(parse_attribute(source, &inner)?);
                i = close + 1;
            }
            c if c.is_whitespace() => {
                return Err(invalid(source, "combinators are not supported"));
            }
            c => {
                return Err(invalid(source, &format!("unexpected character '{}'", c)));
            }
        }
    }

    if compound.tag.is_none() && compound.classes.is_empty() && compound.attributes.is_empty() {
        // Bare `*` matches everything.
        if part != "*" {
            return Err(invalid(source, "empty compound selector"));
        }
    }

    Ok(compound)
}

fn parse_attribute(source: &str, inner: &str) -> Result<AttrCondition, DomError> {
    let inner = inner.trim();
    let Some(eq) = inner.find('=') else {
        if inner.is_empty() || !inner.chars().all(is_ident_char) {
            return Err(invalid(source, "invalid attribute name"));
        }
        return Ok(AttrCondition {
            name: inner.to_string(),
            op: AttrOp::Exists,
        });
    };

    let (mut name, raw_value) = (inner[..eq].trim(), inner[eq + 1..].trim());
    let mut kind = '=';
    if let Some(stripped) = name.strip_suffix('*') {
        kind = '*';
        name = stripped.trim_end();
    } else if let Some(stripped) = name.strip_suffix('^') {
        kind = '^';
        name = stripped.trim_end();
    }
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(invalid(source, "invalid attribute name"));
    }

    let value = raw_value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| raw_value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(raw_value)
        .to_string();

    let op = match kind {
        '*' => AttrOp::Contains(value),
        '^' => AttrOp::StartsWith(value),
        _ => AttrOp::Equals(value),
    };
    Ok(AttrCondition {
        name: name.to_string(),
        op,
    })
}

fn compound_matches<'a>(
    compound: &Compound,
    tag: &str,
    attribute: &impl Fn(&str) -> Option<&'a str>,
) -> bool {
    if let Some(expected) = &compound.tag {
        if !expected.eq_ignore_ascii_case(tag) {
            return false;
        }
    }

    if !compound.classes.is_empty() {
        let class_attr = attribute("class").unwrap_or("");
        let present: Vec<&str> = class_attr.split_whitespace().collect();
        if !compound.classes.iter().all(|c| present.contains(&c.as_str())) {
            return false;
        }
    }

    compound.attributes.iter().all(|cond| {
        let Some(actual) = attribute(&cond.name) else {
            return false;
        };
        match &cond.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => actual == v,
            AttrOp::Contains(v) => actual.contains(v.as_str()),
            AttrOp::StartsWith(v) => actual.starts_with(v.as_str()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<&'a str> {
        move |name| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }

    #[test]
    fn test_parse_list() {
        let sel = Selector::parse(".file-name, .name, [class*=\"filename\"]").unwrap();
        assert_eq!(sel.alternatives.len(), 3);
        assert_eq!(sel.to_string(), ".file-name, .name, [class*=\"filename\"]");
    }

    #[test]
    fn test_tag_and_attribute() {
        let sel = Selector::parse("h1[data-test-id=\"conversation-title\"]").unwrap();
        assert!(sel.matches_with("h1", attrs(&[("data-test-id", "conversation-title")])));
        assert!(sel.matches_with("H1", attrs(&[("data-test-id", "conversation-title")])));
        assert!(!sel.matches_with("h2", attrs(&[("data-test-id", "conversation-title")])));
        assert!(!sel.matches_with("h1", attrs(&[])));
    }

    #[test]
    fn test_class_match_is_token_based() {
        let sel = Selector::parse(".markdown").unwrap();
        assert!(sel.matches_with("div", attrs(&[("class", "markdown prose")])));
        assert!(!sel.matches_with("div", attrs(&[("class", "markdown-body")])));
    }

    #[test]
    fn test_contains_and_prefix() {
        let contains = Selector::parse("[class*=filename]").unwrap();
        assert!(contains.matches_with("span", attrs(&[("class", "chip-filename-label")])));

        let prefix = Selector::parse("[class^='language-']").unwrap();
        assert!(prefix.matches_with("code", attrs(&[("class", "language-rust")])));
        assert!(!prefix.matches_with("code", attrs(&[("class", "hljs")])));
    }

    #[test]
    fn test_exists_condition() {
        let sel = Selector::parse("[data-message-author-role]").unwrap();
        assert!(sel.matches_with("div", attrs(&[("data-message-author-role", "user")])));
        assert!(!sel.matches_with("div", attrs(&[("role", "user")])));
    }

    #[test]
    fn test_universal() {
        let sel = Selector::parse("*").unwrap();
        assert!(sel.matches_with("anything", attrs(&[])));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div,").is_err());
        assert!(Selector::parse("[unterminated").is_err());
        assert!(Selector::parse("div span").is_err());
        assert!(Selector::parse(".").is_err());
        assert!(Selector::parse("div > p").is_err());
    }
}
