//! Property path expressions and their textual parser.
//!
//! Grammar (whitespace between tokens is ignored):
//!
//! ```text
//! path    := unary ( '|' unary )*
//! unary   := '^' unary | primary ( '+' | '*' )*
//! primary := '(' path ')' | '<' iri '>' | 'a' | prefix ':' local
//! ```
//!
//! Sequence (`/`), optional (`?`) and negated (`!`) paths are not supported and are
//! reported as unknown operators.

use crate::error::QuerySyntaxError;
use crate::query::IriRef;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathExpr {
    Predicate(IriRef),
    Inverse(Box<PathExpr>),
    Alternative(Vec<PathExpr>),
    OneOrMore(Box<PathExpr>),
    ZeroOrMore(Box<PathExpr>),
}

impl PathExpr {
    pub fn parse(text: &str) -> Result<Self, QuerySyntaxError> {
        let mut parser = PathParser {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
        };
        parser.skip_ws();
        if parser.peek().is_none() {
            return Err(parser.invalid("empty path"));
        }
        let path = parser.alternative()?;
        parser.skip_ws();
        match parser.peek() {
            None => Ok(path),
            Some(')') => Err(parser.invalid("unbalanced ')'")),
            Some(c) => Err(parser.unknown(c)),
        }
    }

    /// A single predicate, written as in a query (`:uses`, `rdf:type`, `<iri>`).
    pub fn predicate(text: &str) -> Self {
        Self::Predicate(IriRef::parse(text))
    }

    pub fn inverse(inner: PathExpr) -> Self {
        Self::Inverse(Box::new(inner))
    }

    pub fn alternative(branches: impl IntoIterator<Item = PathExpr>) -> Self {
        Self::Alternative(branches.into_iter().collect())
    }

    pub fn one_or_more(inner: PathExpr) -> Self {
        Self::OneOrMore(Box::new(inner))
    }

    pub fn zero_or_more(inner: PathExpr) -> Self {
        Self::ZeroOrMore(Box::new(inner))
    }

    /// Whether the path contains `+` or `*`.
    pub fn is_transitive(&self) -> bool {
        match self {
            Self::Predicate(_) => false,
            Self::Inverse(inner) => inner.is_transitive(),
            Self::Alternative(branches) => branches.iter().any(Self::is_transitive),
            Self::OneOrMore(_) | Self::ZeroOrMore(_) => true,
        }
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(iri) => write!(f, "{}", iri),
            Self::Inverse(inner) => write!(f, "^{}", Grouped(inner)),
            Self::Alternative(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", branch)?;
                }
                Ok(())
            }
            Self::OneOrMore(inner) => write!(f, "{}+", Grouped(inner)),
            Self::ZeroOrMore(inner) => write!(f, "{}*", Grouped(inner)),
        }
    }
}

/// Parenthesizes alternations when they appear under a unary operator.
struct Grouped<'a>(&'a PathExpr);

impl fmt::Display for Grouped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            PathExpr::Alternative(_) => write!(f, "({})", self.0),
            other => write!(f, "{}", other),
        }
    }
}

struct PathParser<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl PathParser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.text.len(), |(i, _)| *i)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn invalid(&self, reason: &str) -> QuerySyntaxError {
        QuerySyntaxError::InvalidPath {
            path: self.text.to_string(),
            reason: format!("{} at offset {}", reason, self.offset()),
        }
    }

    fn unknown(&self, operator: char) -> QuerySyntaxError {
        QuerySyntaxError::UnknownPathOperator {
            operator,
            offset: self.offset(),
            path: self.text.to_string(),
        }
    }

    fn alternative(&mut self) -> Result<PathExpr, QuerySyntaxError> {
        let mut branches = vec![self.unary()?];
        loop {
            self.skip_ws();
            if self.peek() != Some('|') {
                break;
            }
            self.pos += 1;
            branches.push(self.unary()?);
        }
        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            PathExpr::Alternative(branches)
        })
    }

    fn unary(&mut self) -> Result<PathExpr, QuerySyntaxError> {
        self.skip_ws();
        if self.peek() == Some('^') {
            self.pos += 1;
            return Ok(PathExpr::inverse(self.unary()?));
        }
        let mut expr = self.primary()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => expr = PathExpr::one_or_more(expr),
                Some('*') => expr = PathExpr::zero_or_more(expr),
                _ => break,
            }
            self.pos += 1;
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<PathExpr, QuerySyntaxError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.invalid("expected a predicate")),
            Some('(') => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(')') {
                    return Err(QuerySyntaxError::EmptyAlternative);
                }
                let inner = self.alternative()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(self.invalid("expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some('<') => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == '>' {
                        let iri: String =
                            self.chars[start + 1..self.pos - 1].iter().map(|(_, c)| c).collect();
                        return Ok(PathExpr::Predicate(IriRef::full(iri)));
                    }
                }
                Err(self.invalid("unterminated '<'"))
            }
            Some(c) if is_name_char(c) => {
                let start = self.pos;
                while self.peek().is_some_and(is_name_char) {
                    self.pos += 1;
                }
                let name: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
                Ok(PathExpr::predicate(&name))
            }
            Some('|' | ')') => Err(self.invalid("expected a predicate")),
            Some(c) => Err(self.unknown(c)),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use infragraph_core::vocab;

    #[test]
    fn test_parse_transitive_alternation() {
        let path = PathExpr::parse("(:uses|:hosted_on|:communicates_via)+").unwrap();
        assert_eq!(
            path,
            PathExpr::one_or_more(PathExpr::alternative([
                PathExpr::predicate(":uses"),
                PathExpr::predicate(":hosted_on"),
                PathExpr::predicate(":communicates_via"),
            ]))
        );
        assert!(path.is_transitive());
    }

    #[test]
    fn test_parse_inverse_and_star() {
        assert_eq!(
            PathExpr::parse("^:runs_on").unwrap(),
            PathExpr::inverse(PathExpr::predicate(":runs_on"))
        );
        assert_eq!(
            PathExpr::parse("rdfs:subClassOf*").unwrap(),
            PathExpr::zero_or_more(PathExpr::predicate("rdfs:subClassOf"))
        );
        assert!(!PathExpr::parse("^:runs_on").unwrap().is_transitive());
    }

    #[test]
    fn test_parse_keyword_and_full_iri() {
        assert_eq!(
            PathExpr::parse("a").unwrap(),
            PathExpr::Predicate(IriRef::full(vocab::RDF_TYPE))
        );
        assert_eq!(
            PathExpr::parse(" <http://example.org/p> | :q ").unwrap(),
            PathExpr::alternative([
                PathExpr::Predicate(IriRef::full("http://example.org/p")),
                PathExpr::predicate(":q"),
            ])
        );
    }

    #[test]
    fn test_unknown_operators() {
        for (text, op) in [(":a/:b", '/'), (":a?", '?'), ("!:a", '!'), (":a{2}", '{')] {
            let err = PathExpr::parse(text).unwrap_err();
            assert!(
                matches!(err, QuerySyntaxError::UnknownPathOperator { operator, .. } if operator == op),
                "{}: {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_invalid_paths() {
        for text in ["", "(:a", ":a|", ":a)", "<http://x"] {
            let err = PathExpr::parse(text).unwrap_err();
            assert!(
                matches!(err, QuerySyntaxError::InvalidPath { .. }),
                "{}: {:?}",
                text,
                err
            );
        }
        assert_eq!(
            PathExpr::parse("()+").unwrap_err(),
            QuerySyntaxError::EmptyAlternative
        );
    }

    #[test]
    fn test_display_reparses() {
        let text = "^(:uses|:hosted_on)+|rdfs:subClassOf*";
        let path = PathExpr::parse(text).unwrap();
        assert_eq!(PathExpr::parse(&path.to_string()).unwrap(), path);
    }
}
