//! The token definition for the formula builder.

use serde::{Deserialize, Serialize};

/// A token is a single element of the expression being built, with its
/// literal text and a kind tag. Tokens are immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

/// The kind of a token. Exactly one kind per token; legality of a kind at a
/// given position is the builder's concern, not the token's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// An arithmetic operator symbol, e.g. `+` or `*`.
    Operator,
    /// A reference to a data-source field by name.
    DataRef,
    /// A digit or a whole numeric literal.
    Number,
    LeftParen,  // (
    RightParen, // )
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// The literal rendered form of this token. No validation happens here.
    pub fn render(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_literal_text() {
        let token = Token::new("temperature", TokenKind::DataRef);
        assert_eq!(token.render(), "temperature");
        assert_eq!(token.to_string(), "temperature");
    }

    #[test]
    fn test_kind_survives_serialization() {
        let token = Token::new("(", TokenKind::LeftParen);
        let json = serde_json::to_string(&token).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        assert_eq!(back.kind, TokenKind::LeftParen);
    }
}
