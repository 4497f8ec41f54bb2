//! Source text → tokens.
//!
//! [`Scanner::scan_tokens`] makes one pass over the bytes of the source and
//! always runs to the end.  Malformed input (a stray character, a string with
//! no closing quote) is recorded as a [`LoxError::Lex`] and scanning carries
//! on after it, so one run reports every lexical error.  The token list always
//! ends with exactly one `EOF`.
//!
//! Lines are counted on `\n` only; they exist for diagnostics.
//!
//! ```
//! use rox::scanner::Scanner;
//!
//! let (tokens, errors) = Scanner::new("print 1; // done").scan_tokens();
//!
//! assert!(errors.is_empty());
//! assert_eq!(tokens.len(), 4); // print, 1, ;, EOF
//! ```

use log::{debug, info};
use memchr::{memchr, memchr_iter};

use crate::error::LoxError;
use crate::token::{Token, TokenType};

pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to look at.
    current: usize,
    line: usize,
    tokens: Vec<Token<'a>>,
    errors: Vec<LoxError>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole source, returning the tokens and every lexical error.
    pub fn scan_tokens(mut self) -> (Vec<Token<'a>>, Vec<LoxError>) {
        while self.current < self.bytes.len() {
            self.start = self.current;

            if let Some(kind) = self.scan_token() {
                let lexeme: &'a str = self.lexeme();

                debug!("{} {:?} on line {}", kind.name(), lexeme, self.line);
                self.tokens.push(Token::new(kind, lexeme, self.line));
            }
        }

        self.tokens.push(Token::new(TokenType::EOF, "", self.line));

        info!(
            "Scanned {} token(s) with {} error(s)",
            self.tokens.len(),
            self.errors.len()
        );

        (self.tokens, self.errors)
    }

    /// Consume one lexeme starting at `self.start`.  `None` means nothing to
    /// emit: whitespace, a comment, or an error that has been recorded.
    fn scan_token(&mut self) -> Option<TokenType> {
        use TokenType::*;

        let byte: u8 = self.bump();

        let kind = match byte {
            b'(' => LEFT_PAREN,
            b')' => RIGHT_PAREN,
            b'{' => LEFT_BRACE,
            b'}' => RIGHT_BRACE,
            b',' => COMMA,
            b'.' => DOT,
            b'-' => MINUS,
            b'+' => PLUS,
            b';' => SEMICOLON,
            b'*' => STAR,

            b'!' => self.with_equal(BANG_EQUAL, BANG),
            b'=' => self.with_equal(EQUAL_EQUAL, EQUAL),
            b'<' => self.with_equal(LESS_EQUAL, LESS),
            b'>' => self.with_equal(GREATER_EQUAL, GREATER),

            b'/' if self.eat(b'/') => {
                self.skip_line_comment();
                return None;
            }
            b'/' => SLASH,

            b'\n' => {
                self.line += 1;
                return None;
            }
            b' ' | b'\r' | b'\t' => return None,

            b'"' => return self.string(),
            b'0'..=b'9' => return self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                self.unexpected_character();
                return None;
            }
        };

        Some(kind)
    }

    // ── lexeme kinds ────────────────────────────────────────────────────

    fn with_equal(&mut self, long: TokenType, short: TokenType) -> TokenType {
        if self.eat(b'=') {
            long
        } else {
            short
        }
    }

    /// Jump to the end of the line.  The `\n` itself is left for
    /// `scan_token`, which owns line counting.
    fn skip_line_comment(&mut self) {
        self.current = match memchr(b'\n', &self.bytes[self.current..]) {
            Some(offset) => self.current + offset,
            None => self.bytes.len(),
        };
    }

    /// Strings have no escapes and may span lines.
    fn string(&mut self) -> Option<TokenType> {
        let rest: &[u8] = &self.bytes[self.current..];

        let Some(close) = memchr(b'"', rest) else {
            self.line += memchr_iter(b'\n', rest).count();
            self.current = self.bytes.len();
            self.error("Unterminated string.");
            return None;
        };

        let source: &'a str = self.source;
        let contents: &str = &source[self.current..self.current + close];

        self.line += memchr_iter(b'\n', contents.as_bytes()).count();
        self.current += close + 1;

        Some(TokenType::STRING(contents.to_owned()))
    }

    /// `123` or `12.5`.  A dot needs a digit after it to belong to the
    /// number, so `8.` and `.5` both scan as separate `DOT` tokens.
    fn number(&mut self) -> Option<TokenType> {
        self.skip_digits();

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.current += 1;
            self.skip_digits();
        }

        let text: &'a str = self.lexeme();

        match text.parse::<f64>() {
            Ok(n) => Some(TokenType::NUMBER(n)),
            Err(e) => {
                self.error(format!("Invalid number '{}': {}", text, e));
                None
            }
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.current += 1;
        }

        TokenType::keyword(self.lexeme()).unwrap_or(TokenType::IDENTIFIER)
    }

    /// Report the whole character, which may be several bytes long, and
    /// resume after it.
    fn unexpected_character(&mut self) {
        let source: &'a str = self.source;
        let c: char = source[self.start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);

        self.current = (self.start + c.len_utf8()).min(self.bytes.len());
        self.error(format!("Unexpected character: {}", c));
    }

    // ── cursor ──────────────────────────────────────────────────────────

    fn bump(&mut self) -> u8 {
        let byte: u8 = self.peek();
        self.current += 1;
        byte
    }

    /// Current byte, or `0` past the end.
    fn peek(&self) -> u8 {
        self.bytes.get(self.current).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.bytes.get(self.current + 1).copied().unwrap_or(0)
    }

    fn eat(&mut self, expected: u8) -> bool {
        let hit: bool = self.current < self.bytes.len() && self.peek() == expected;

        if hit {
            self.current += 1;
        }

        hit
    }

    fn skip_digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }
    }

    fn lexeme(&self) -> &'a str {
        let source: &'a str = self.source;
        &source[self.start..self.current]
    }

    fn error<S: Into<String>>(&mut self, message: S) {
        self.errors.push(LoxError::lex(self.line, message));
    }
}
