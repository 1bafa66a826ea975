//! The VSOP lexer.
//!
//! Produces one [`Token`] at a time from a source string, skipping
//! whitespace, line comments (`//`) and nested block comments (`(* ... *)`).
//! Lexical errors (invalid character, unterminated string/comment, integer
//! literal overflow) are reported through the shared [`Handler`] rather than
//! aborting the stream; the lexer keeps producing tokens so later phases can
//! still see as much of the file as possible (spec.md §7).

use crate::cursor::Cursor;
use crate::token::Token;
use vsopc_util::{Handler, Span, Symbol};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    handler: &'a Handler,
    token_start: usize,
    token_start_line: u32,
    token_start_column: u32,
}

/// A token together with the span of source text it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Tokenize the whole input, collecting every token up to and including
    /// the trailing `Eof`.
    pub fn tokenize(mut self) -> Vec<Spanned> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_spanned();
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }
        tokens
    }

    fn mark_start(&mut self) {
        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();
    }

    fn span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    fn next_spanned(&mut self) -> Spanned {
        self.skip_trivia();
        self.mark_start();

        if self.cursor.is_at_end() {
            return Spanned {
                token: Token::Eof,
                span: self.span(),
            };
        }

        let token = self.lex_token();
        Spanned {
            token,
            span: self.span(),
        }
    }

    fn lex_token(&mut self) -> Token {
        let c = self.cursor.current_char();
        match c {
            '{' => {
                self.cursor.advance();
                Token::LBrace
            }
            '}' => {
                self.cursor.advance();
                Token::RBrace
            }
            '(' => {
                self.cursor.advance();
                Token::LParen
            }
            ')' => {
                self.cursor.advance();
                Token::RParen
            }
            ':' => {
                self.cursor.advance();
                Token::Colon
            }
            ';' => {
                self.cursor.advance();
                Token::Semicolon
            }
            ',' => {
                self.cursor.advance();
                Token::Comma
            }
            '+' => {
                self.cursor.advance();
                Token::Plus
            }
            '-' => {
                self.cursor.advance();
                Token::Minus
            }
            '*' => {
                self.cursor.advance();
                Token::Times
            }
            '/' => {
                self.cursor.advance();
                Token::Div
            }
            '^' => {
                self.cursor.advance();
                Token::Pow
            }
            '.' => {
                self.cursor.advance();
                Token::Dot
            }
            '=' => {
                self.cursor.advance();
                Token::Equal
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.match_char('-') {
                    Token::Assign
                } else if self.cursor.match_char('=') {
                    Token::LowerEqual
                } else {
                    Token::Lower
                }
            }
            '"' => self.lex_string(),
            c if c.is_ascii_digit() => self.lex_integer(),
            c if c.is_ascii_alphabetic() => self.lex_ident(),
            other => {
                self.handler
                    .error(format!("invalid character '{other}'"), self.span());
                self.cursor.advance();
                self.lex_token_or_eof()
            }
        }
    }

    fn lex_token_or_eof(&mut self) -> Token {
        if self.cursor.is_at_end() {
            Token::Eof
        } else {
            self.lex_token()
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.cursor.position();
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        Token::keyword_or_ident(text)
    }

    /// Decimal or `0x` hex integer literal. Values must fit in a signed
    /// 32-bit integer; overflow is reported but lexing continues so later
    /// phases still see a token.
    fn lex_integer(&mut self) -> Token {
        let start = self.cursor.position();
        if self.cursor.current_char() == '0'
            && (self.cursor.peek_char(1) == 'x' || self.cursor.peek_char(1) == 'X')
        {
            self.cursor.advance();
            self.cursor.advance();
            let digits_start = self.cursor.position();
            while self.cursor.current_char().is_ascii_hexdigit() {
                self.cursor.advance();
            }
            let digits = self.cursor.slice_from(digits_start);
            return match i64::from_str_radix(digits, 16) {
                Ok(value) if value <= i32::MAX as i64 => Token::IntegerLiteral(value as i32),
                _ => {
                    self.handler.error(
                        format!("integer literal '{}' out of range", self.cursor.slice_from(start)),
                        self.span(),
                    );
                    Token::IntegerLiteral(0)
                }
            };
        }

        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        match text.parse::<i64>() {
            Ok(value) if value <= i32::MAX as i64 => Token::IntegerLiteral(value as i32),
            _ => {
                self.handler
                    .error(format!("integer literal '{text}' out of range"), self.span());
                Token::IntegerLiteral(0)
            }
        }
    }

    /// String literal with VSOP escape sequences: `\b \t \n \r \" \\`,
    /// `\xHH` (exactly two hex digits) and a backslash-newline continuation
    /// that swallows the following line's leading whitespace.
    fn lex_string(&mut self) -> Token {
        self.cursor.advance(); // opening quote
        let mut value = String::new();
        loop {
            if self.cursor.is_at_end() {
                self.handler
                    .error("unterminated string literal", self.span());
                break;
            }
            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\n' => {
                    self.handler
                        .error("unterminated string literal", self.span());
                    break;
                }
                '\\' => {
                    self.cursor.advance();
                    self.lex_escape(&mut value);
                }
                c => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
        Token::StringLiteral(Symbol::intern(&value))
    }

    fn lex_escape(&mut self, value: &mut String) {
        match self.cursor.current_char() {
            'b' => {
                value.push('\u{8}');
                self.cursor.advance();
            }
            't' => {
                value.push('\t');
                self.cursor.advance();
            }
            'n' => {
                value.push('\n');
                self.cursor.advance();
            }
            'r' => {
                value.push('\r');
                self.cursor.advance();
            }
            '"' => {
                value.push('"');
                self.cursor.advance();
            }
            '\\' => {
                value.push('\\');
                self.cursor.advance();
            }
            'x' => {
                self.cursor.advance();
                let hi = self.cursor.current_char();
                self.cursor.advance();
                let lo = self.cursor.current_char();
                self.cursor.advance();
                match u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                    Ok(byte) => value.push(byte as char),
                    Err(_) => self
                        .handler
                        .error("invalid \\x escape in string literal", self.span()),
                }
            }
            '\n' => {
                self.cursor.advance();
                while matches!(self.cursor.current_char(), ' ' | '\t') {
                    self.cursor.advance();
                }
            }
            other => {
                self.handler
                    .error(format!("invalid escape sequence '\\{other}'"), self.span());
                self.cursor.advance();
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.current_char() {
                c if c.is_whitespace() => {
                    self.cursor.advance();
                }
                '/' if self.cursor.peek_char(1) == '/' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                '(' if self.cursor.peek_char(1) == '*' => {
                    self.skip_block_comment();
                }
                _ => break,
            }
        }
    }

    /// Block comments nest: `(* outer (* inner *) still outer *)`.
    fn skip_block_comment(&mut self) {
        let start_span = self.span();
        self.cursor.advance();
        self.cursor.advance();
        let mut depth = 1usize;
        while depth > 0 {
            if self.cursor.is_at_end() {
                self.handler.error("unterminated comment", start_span);
                return;
            }
            if self.cursor.current_char() == '(' && self.cursor.peek_char(1) == '*' {
                self.cursor.advance();
                self.cursor.advance();
                depth += 1;
            } else if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == ')' {
                self.cursor.advance();
                self.cursor.advance();
                depth -= 1;
            } else {
                self.cursor.advance();
            }
        }
    }
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(source: &str) -> Vec<Token> {
        let handler = Handler::new("test.vsop");
        Lexer::new(source, &handler)
            .tokenize()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn lexes_class_header() {
        let tokens = tokens_of("class Main extends Object {");
        assert_eq!(
            tokens,
            vec![
                Token::Class,
                Token::TypeIdent(Symbol::intern("Main")),
                Token::Extends,
                Token::TypeIdent(Symbol::intern("Object")),
                Token::LBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_assign_and_comparison_operators() {
        let tokens = tokens_of("x <- 1 < 2 <= 3");
        assert_eq!(
            tokens,
            vec![
                Token::Ident(Symbol::intern("x")),
                Token::Assign,
                Token::IntegerLiteral(1),
                Token::Lower,
                Token::IntegerLiteral(2),
                Token::LowerEqual,
                Token::IntegerLiteral(3),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_nested_block_comments() {
        let tokens = tokens_of("// a line comment\n(* outer (* inner *) still outer *) 42");
        assert_eq!(tokens, vec![Token::IntegerLiteral(42), Token::Eof]);
    }

    #[test]
    fn lexes_string_with_escapes() {
        let tokens = tokens_of(r#""line1\nline2\t\"quoted\"""#);
        match &tokens[0] {
            Token::StringLiteral(s) => assert_eq!(s.as_str(), "line1\nline2\t\"quoted\""),
            other => panic!("expected StringLiteral, got {other:?}"),
        }
    }

    #[test]
    fn lexes_hex_integer_literal() {
        let tokens = tokens_of("0xFF");
        assert_eq!(tokens, vec![Token::IntegerLiteral(255), Token::Eof]);
    }

    #[test]
    fn reports_unterminated_string() {
        let handler = Handler::new("test.vsop");
        let _ = Lexer::new("\"unterminated", &handler).tokenize();
        assert!(handler.has_errors());
    }

    #[test]
    fn reports_invalid_character() {
        let handler = Handler::new("test.vsop");
        let _ = Lexer::new("@", &handler).tokenize();
        assert!(handler.has_errors());
    }
}
