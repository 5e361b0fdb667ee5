//! Lexical analyzer for the Umbrella language.
//!
//! The lexer is total: every input produces a token stream ending in a single
//! `Eof` token. Characters that match no production become `Invalid` tokens
//! and it is the parser's job to report them.

mod span;
mod token;

pub use span::Span;
pub use token::{keyword, Token, TokenType};

use crate::source::Source;

/// The lexer for the Umbrella language.
pub struct Lexer<'a> {
    source: &'a mut Source,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a mut Source) -> Self {
        Lexer { source }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = matches!(tok.token_type, TokenType::Eof);
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    /// Consume the next character after a successful peek.
    fn consume_char(&mut self) -> char {
        self.source
            .next_char()
            .expect("peek confirmed a character exists")
    }

    /// Skip spaces, tabs, carriage returns, newlines and `//` comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.source.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.source.next_char();
                }
                '/' if self.source.peek_nth(1) == Some('/') => {
                    while let Some(c) = self.source.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.source.next_char();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let span = Span::new(self.source.line, self.source.column);
        let c = match self.source.next_char() {
            Some(c) => c,
            None => return Token::new(TokenType::Eof, "", span),
        };

        match c {
            '0'..='9' => self.read_number(c, span),
            'a'..='z' | 'A'..='Z' | '_' => self.read_identifier(c, span),
            '"' | '\'' => self.read_string(c, span),
            '(' => Token::new(TokenType::LeftParen, "(", span),
            ')' => Token::new(TokenType::RightParen, ")", span),
            '{' => Token::new(TokenType::LeftBrace, "{", span),
            '}' => Token::new(TokenType::RightBrace, "}", span),
            '[' => Token::new(TokenType::LeftBracket, "[", span),
            ']' => Token::new(TokenType::RightBracket, "]", span),
            ',' => Token::new(TokenType::Comma, ",", span),
            ';' => Token::new(TokenType::Semicolon, ";", span),
            ':' => Token::new(TokenType::Colon, ":", span),
            '~' => Token::new(TokenType::Tilde, "~", span),
            '.' => {
                if self.source.peek() == Some('.') && self.source.peek_nth(1) == Some('.') {
                    self.source.next_char();
                    self.source.next_char();
                    Token::new(TokenType::Ellipsis, "...", span)
                } else {
                    Token::new(TokenType::Dot, ".", span)
                }
            }
            '+' => match self.source.peek() {
                Some('+') => {
                    self.source.next_char();
                    Token::new(TokenType::PlusPlus, "++", span)
                }
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::PlusEqual, "+=", span)
                }
                _ => Token::new(TokenType::Plus, "+", span),
            },
            '-' => match self.source.peek() {
                Some('-') => {
                    self.source.next_char();
                    Token::new(TokenType::MinusMinus, "--", span)
                }
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::MinusEqual, "-=", span)
                }
                _ => Token::new(TokenType::Minus, "-", span),
            },
            '*' => {
                if self.source.peek() == Some('=') {
                    self.source.next_char();
                    Token::new(TokenType::StarEqual, "*=", span)
                } else {
                    Token::new(TokenType::Star, "*", span)
                }
            }
            '/' => {
                if self.source.peek() == Some('=') {
                    self.source.next_char();
                    Token::new(TokenType::SlashEqual, "/=", span)
                } else {
                    Token::new(TokenType::Slash, "/", span)
                }
            }
            '%' => {
                if self.source.peek() == Some('=') {
                    self.source.next_char();
                    Token::new(TokenType::PercentEqual, "%=", span)
                } else {
                    Token::new(TokenType::Percent, "%", span)
                }
            }
            '=' => match self.source.peek() {
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::EqualEqual, "==", span)
                }
                Some('>') => {
                    self.source.next_char();
                    Token::new(TokenType::Arrow, "=>", span)
                }
                _ => Token::new(TokenType::Equal, "=", span),
            },
            '!' => {
                if self.source.peek() == Some('=') {
                    self.source.next_char();
                    Token::new(TokenType::BangEqual, "!=", span)
                } else {
                    Token::new(TokenType::Bang, "!", span)
                }
            }
            '<' => match self.source.peek() {
                Some('<') => {
                    self.source.next_char();
                    Token::new(TokenType::LeftShift, "<<", span)
                }
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::LessEqual, "<=", span)
                }
                _ => Token::new(TokenType::Less, "<", span),
            },
            '>' => match self.source.peek() {
                Some('>') => {
                    self.source.next_char();
                    Token::new(TokenType::RightShift, ">>", span)
                }
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::GreaterEqual, ">=", span)
                }
                _ => Token::new(TokenType::Greater, ">", span),
            },
            '&' => match self.source.peek() {
                Some('&') => {
                    self.source.next_char();
                    Token::new(TokenType::AndAnd, "&&", span)
                }
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::AndEqual, "&=", span)
                }
                _ => Token::new(TokenType::Ampersand, "&", span),
            },
            '|' => match self.source.peek() {
                Some('|') => {
                    self.source.next_char();
                    Token::new(TokenType::OrOr, "||", span)
                }
                Some('=') => {
                    self.source.next_char();
                    Token::new(TokenType::OrEqual, "|=", span)
                }
                _ => Token::new(TokenType::Pipe, "|", span),
            },
            '^' => {
                if self.source.peek() == Some('=') {
                    self.source.next_char();
                    Token::new(TokenType::XorEqual, "^=", span)
                } else {
                    Token::new(TokenType::Caret, "^", span)
                }
            }
            '?' => match self.source.peek() {
                Some('?') => {
                    self.source.next_char();
                    Token::new(TokenType::QuestionQuestion, "??", span)
                }
                Some('.') => {
                    self.source.next_char();
                    Token::new(TokenType::QuestionDot, "?.", span)
                }
                _ => Token::new(TokenType::Question, "?", span),
            },
            _ => Token::new(TokenType::Invalid, c.to_string(), span),
        }
    }

    /// Digits with at most one interior decimal point. The value stays in the
    /// lexeme; the parser converts it to f64. A dot followed by anything other
    /// than a digit is left for the member-access production (`1.toString`).
    fn read_number(&mut self, first_char: char, span: Span) -> Token {
        let mut num = first_char.to_string();
        while let Some(c) = self.source.peek() {
            if c.is_ascii_digit() {
                num.push(self.consume_char());
            } else {
                break;
            }
        }

        if self.source.peek() == Some('.')
            && self.source.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            num.push(self.consume_char());
            while let Some(c) = self.source.peek() {
                if c.is_ascii_digit() {
                    num.push(self.consume_char());
                } else {
                    break;
                }
            }
        }

        Token::new(TokenType::Number, num, span)
    }

    /// Strings are delimited by a matching `"` or `'`. Recognized escapes are
    /// \n \t \r \\ \" \'; any other escaped byte stands for itself. Hitting
    /// end-of-input before the closing quote yields the content seen so far —
    /// the parser surfaces the higher-level error.
    fn read_string(&mut self, quote: char, span: Span) -> Token {
        let mut s = String::new();
        while let Some(c) = self.source.next_char() {
            if c == quote {
                return Token::new(TokenType::Str, s, span);
            }
            if c == '\\' {
                match self.source.next_char() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some('\'') => s.push('\''),
                    Some(other) => s.push(other),
                    None => break,
                }
            } else {
                s.push(c);
            }
        }
        Token::new(TokenType::Str, s, span)
    }

    fn read_identifier(&mut self, first_char: char, span: Span) -> Token {
        let mut ident = first_char.to_string();
        while let Some(ch) = self.source.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.source.next_char();
            } else {
                break;
            }
        }
        match keyword(&ident) {
            Some(token_type) => Token::new(token_type, ident, span),
            None => Token::new(TokenType::Identifier, ident, span),
        }
    }
}
