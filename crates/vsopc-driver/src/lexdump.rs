//! The `-l`/`-lex` token dump.
//!
//! spec.md §6 only says this mode "prints the token stream (handled by the
//! lexer collaborator)" and leaves the exact text format unspecified — the
//! lexer/parser were filtered out of `original_source/` as an external
//! collaborator's concern, so there is no reference implementation to copy
//! the format from. This follows the conventional `line,column,kind[,text]`
//! VSOP token dump: one token per line, 1-based positions, keywords and
//! punctuation spelled literally, and a `kind,payload` pair for the four
//! token families that carry data.
//!
//! (SPEC_FULL.md §9 Open-Question resolution: format invented here, not
//! read from any source — see DESIGN.md.)

use std::fmt::Write as _;
use vsopc_lex::{Spanned, Token};

pub fn render(tokens: &[Spanned]) -> String {
    let mut out = String::new();
    for spanned in tokens {
        let _ = writeln!(out, "{},{},{}", spanned.span.line, spanned.span.column, describe(&spanned.token));
    }
    out
}

fn describe(token: &Token) -> String {
    match token {
        Token::And => "and".to_string(),
        Token::Bool => "bool".to_string(),
        Token::Class => "class".to_string(),
        Token::Do => "do".to_string(),
        Token::Else => "else".to_string(),
        Token::Extends => "extends".to_string(),
        Token::False => "false".to_string(),
        Token::If => "if".to_string(),
        Token::In => "in".to_string(),
        Token::Int32 => "int32".to_string(),
        Token::Isnull => "isnull".to_string(),
        Token::Let => "let".to_string(),
        Token::New => "new".to_string(),
        Token::Not => "not".to_string(),
        Token::SelfKw => "self".to_string(),
        Token::String => "string".to_string(),
        Token::Then => "then".to_string(),
        Token::True => "true".to_string(),
        Token::Unit => "unit".to_string(),
        Token::While => "while".to_string(),
        Token::Ident(s) => format!("object-identifier,{s}"),
        Token::TypeIdent(s) => format!("type-identifier,{s}"),
        Token::IntegerLiteral(n) => format!("integer-literal,{n}"),
        Token::StringLiteral(s) => format!("string-literal,\"{s}\""),
        Token::LBrace => "lbrace".to_string(),
        Token::RBrace => "rbrace".to_string(),
        Token::LParen => "lparen".to_string(),
        Token::RParen => "rparen".to_string(),
        Token::Colon => "colon".to_string(),
        Token::Semicolon => "semicolon".to_string(),
        Token::Comma => "comma".to_string(),
        Token::Plus => "plus".to_string(),
        Token::Minus => "minus".to_string(),
        Token::Times => "times".to_string(),
        Token::Div => "div".to_string(),
        Token::Pow => "pow".to_string(),
        Token::Dot => "dot".to_string(),
        Token::Equal => "equal".to_string(),
        Token::Lower => "lower".to_string(),
        Token::LowerEqual => "lower-equal".to_string(),
        Token::Assign => "assign".to_string(),
        Token::Eof => "eof".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_lex::Lexer;
    use vsopc_util::Handler;

    #[test]
    fn dumps_one_line_per_token_with_position() {
        let handler = Handler::new("t.vsop");
        let tokens = Lexer::new("class Main", &handler).tokenize();
        let rendered = render(&tokens);
        assert!(rendered.contains("1,1,class"));
        assert!(rendered.contains("1,7,type-identifier,Main"));
        assert!(rendered.trim_end().ends_with("eof"));
    }
}
