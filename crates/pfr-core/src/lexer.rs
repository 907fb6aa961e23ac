//! Tokenizer for the Puppetfile directive language.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Ident(String),
    /// `git:` style option key.
    Label(String),
    Str(String),
    Symbol(String),
    Int(i64),
    FatArrow,
    Comma,
    LParen,
    RParen,
    Newline,
    Semi,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier '{s}'"),
            Token::Label(s) => write!(f, "label '{s}:'"),
            Token::Str(_) => f.write_str("string literal"),
            Token::Symbol(s) => write!(f, "symbol ':{s}'"),
            Token::Int(i) => write!(f, "integer {i}"),
            Token::FatArrow => f.write_str("'=>'"),
            Token::Comma => f.write_str("','"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Newline => f.write_str("end of line"),
            Token::Semi => f.write_str("';'"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lexeme {
    pub(crate) token: Token,
    pub(crate) line: usize,
}

/// A `#` comment, kept for resolver flag lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Comment {
    pub(crate) text: String, // without the leading '#'
    pub(crate) line: usize,
    pub(crate) trailing: bool, // true if a token appeared earlier on the same line
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub(crate) message: String,
    pub(crate) line: usize,
}

pub(crate) struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: usize,
    comments: Vec<Comment>,
    /// Whether we've seen a token on the current line.
    token_on_line: bool,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 0,
            comments: Vec::new(),
            token_on_line: false,
        }
    }

    pub(crate) fn tokenize(mut self) -> Result<(Vec<Lexeme>, Vec<Comment>), LexError> {
        let mut tokens = Vec::new();
        loop {
            let lexeme = self.next_token()?;
            let is_eof = lexeme.token == Token::Eof;
            tokens.push(lexeme);
            if is_eof {
                break;
            }
        }
        Ok((tokens, self.comments))
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn make(&self, token: Token, line: usize) -> Lexeme {
        Lexeme { token, line }
    }

    fn error(&self, message: impl Into<String>, line: usize) -> LexError {
        LexError {
            message: message.into(),
            line,
        }
    }

    fn next_token(&mut self) -> Result<Lexeme, LexError> {
        self.skip_blanks_and_comments();

        let Some(ch) = self.peek() else {
            return Ok(self.make(Token::Eof, self.line));
        };
        let line = self.line;

        if ch == b'\n' {
            self.pos += 1;
            self.line += 1;
            self.token_on_line = false;
            return Ok(self.make(Token::Newline, line));
        }

        self.token_on_line = true;

        if is_ident_start(ch) {
            return Ok(self.scan_ident_or_label());
        }
        if ch.is_ascii_digit() {
            return self.scan_int();
        }

        match ch {
            b'\'' | b'"' => self.scan_string(ch),
            b':' => self.scan_symbol(),
            b'=' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Ok(self.make(Token::FatArrow, line))
            }
            b',' => {
                self.pos += 1;
                Ok(self.make(Token::Comma, line))
            }
            b'(' => {
                self.pos += 1;
                Ok(self.make(Token::LParen, line))
            }
            b')' => {
                self.pos += 1;
                Ok(self.make(Token::RParen, line))
            }
            b';' => {
                self.pos += 1;
                Ok(self.make(Token::Semi, line))
            }
            _ => {
                let shown = self.char_at_pos();
                Err(self.error(format!("unexpected character '{shown}'"), line))
            }
        }
    }

    fn char_at_pos(&self) -> char {
        std::str::from_utf8(&self.source[self.pos..])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or('?')
    }

    fn skip_blanks_and_comments(&mut self) {
        loop {
            while let Some(ch) = self.peek() {
                if ch == b' ' || ch == b'\t' || ch == b'\r' {
                    self.pos += 1;
                } else if ch == b'\\' && self.peek_at(1) == Some(b'\n') {
                    // explicit line continuation
                    self.pos += 2;
                    self.line += 1;
                } else {
                    break;
                }
            }

            if self.peek() == Some(b'#') {
                let start = self.pos + 1;
                while self.peek().is_some_and(|c| c != b'\n') {
                    self.pos += 1;
                }
                let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
                self.comments.push(Comment {
                    text,
                    line: self.line,
                    trailing: self.token_on_line,
                });
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_label(&mut self) -> Lexeme {
        let line = self.line;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        // Ruby method names may end in ? or !
        if matches!(self.peek(), Some(b'?') | Some(b'!')) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();

        // `git: 'url'` but not `Foo::Bar`
        if self.peek() == Some(b':') && self.peek_at(1) != Some(b':') {
            self.pos += 1;
            return self.make(Token::Label(text), line);
        }
        self.make(Token::Ident(text), line)
    }

    fn scan_int(&mut self) -> Result<Lexeme, LexError> {
        let line = self.line;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'_') {
            self.pos += 1;
        }
        let digits: String = String::from_utf8_lossy(&self.source[start..self.pos])
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            return Err(self.error("bare version numbers must be quoted", line));
        }
        digits
            .parse::<i64>()
            .map(|n| self.make(Token::Int(n), line))
            .map_err(|_| self.error(format!("integer literal '{digits}' is out of range"), line))
    }

    fn scan_symbol(&mut self) -> Result<Lexeme, LexError> {
        let line = self.line;
        self.pos += 1; // ':'
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_continue) {
                    self.pos += 1;
                }
                let name = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
                Ok(self.make(Token::Symbol(name), line))
            }
            Some(q @ (b'\'' | b'"')) => {
                let lexeme = self.scan_string(q)?;
                match lexeme.token {
                    Token::Str(s) => Ok(self.make(Token::Symbol(s), line)),
                    _ => Err(self.error("malformed symbol", line)),
                }
            }
            _ => Err(self.error("unexpected ':'", line)),
        }
    }

    fn scan_string(&mut self, quote: u8) -> Result<Lexeme, LexError> {
        let line = self.line;
        self.pos += 1; // opening quote
        let mut bytes = Vec::new();

        loop {
            let Some(ch) = self.peek() else {
                return Err(self.error("unterminated string meets end of file", line));
            };
            self.pos += 1;
            match ch {
                c if c == quote => break,
                b'\n' => {
                    self.line += 1;
                    bytes.push(b'\n');
                }
                b'\\' => {
                    let Some(next) = self.peek() else {
                        return Err(self.error("unterminated string meets end of file", line));
                    };
                    self.pos += 1;
                    if quote == b'\'' {
                        // single quotes only escape the quote and the backslash
                        if next != b'\'' && next != b'\\' {
                            bytes.push(b'\\');
                        }
                        if next == b'\n' {
                            self.line += 1;
                        }
                        bytes.push(next);
                    } else {
                        match next {
                            b'n' => bytes.push(b'\n'),
                            b't' => bytes.push(b'\t'),
                            b'r' => bytes.push(b'\r'),
                            b'0' => bytes.push(0),
                            b's' => bytes.push(b' '),
                            b'\n' => self.line += 1,
                            other => bytes.push(other),
                        }
                    }
                }
                b'#' if quote == b'"' && self.peek() == Some(b'{') => {
                    return Err(self.error("string interpolation is not supported", self.line));
                }
                other => bytes.push(other),
            }
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(self.make(Token::Str(text), line))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
