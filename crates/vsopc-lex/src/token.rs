//! The VSOP token set.

use vsopc_util::Symbol;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Keywords
    And,
    Bool,
    Class,
    Do,
    Else,
    Extends,
    False,
    If,
    In,
    Int32,
    Isnull,
    Let,
    New,
    Not,
    SelfKw,
    String,
    Then,
    True,
    Unit,
    While,

    // Identifiers: lower-case first letter.
    Ident(Symbol),
    // Type identifiers: upper-case first letter.
    TypeIdent(Symbol),

    // Literals
    IntegerLiteral(i32),
    StringLiteral(Symbol),

    // Operators and punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Comma,
    Plus,
    Minus,
    Times,
    Div,
    Pow,
    Dot,
    Equal,
    Lower,
    LowerEqual,
    Assign,

    Eof,
}

impl Token {
    /// Look up a keyword by its exact spelling, falling back to an
    /// identifier/type-identifier token based on the case of the first
    /// letter (spec.md §2).
    pub fn keyword_or_ident(text: &str) -> Token {
        match text {
            "and" => Token::And,
            "bool" => Token::Bool,
            "class" => Token::Class,
            "do" => Token::Do,
            "else" => Token::Else,
            "extends" => Token::Extends,
            "false" => Token::False,
            "if" => Token::If,
            "in" => Token::In,
            "int32" => Token::Int32,
            "isnull" => Token::Isnull,
            "let" => Token::Let,
            "new" => Token::New,
            "not" => Token::Not,
            "self" => Token::SelfKw,
            "string" => Token::String,
            "then" => Token::Then,
            "true" => Token::True,
            "unit" => Token::Unit,
            "while" => Token::While,
            _ => {
                let first = text.chars().next().expect("empty identifier");
                if first.is_ascii_uppercase() {
                    Token::TypeIdent(Symbol::intern(text))
                } else {
                    Token::Ident(Symbol::intern(text))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_take_priority_over_identifiers() {
        assert_eq!(Token::keyword_or_ident("class"), Token::Class);
        assert_eq!(Token::keyword_or_ident("while"), Token::While);
    }

    #[test]
    fn lowercase_first_letter_is_an_identifier() {
        match Token::keyword_or_ident("foo") {
            Token::Ident(s) => assert_eq!(s.as_str(), "foo"),
            other => panic!("expected Ident, got {other:?}"),
        }
    }

    #[test]
    fn uppercase_first_letter_is_a_type_identifier() {
        match Token::keyword_or_ident("Main") {
            Token::TypeIdent(s) => assert_eq!(s.as_str(), "Main"),
            other => panic!("expected TypeIdent, got {other:?}"),
        }
    }
}
