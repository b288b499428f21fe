//! Purpose: Split shell source into words, operators, comments, and newlines.
//! Exports: `Token`, `TokenKind`, `tokenize`.
//! Role: First stage of the formatter; words keep their original quoting byte-for-byte.
//! Invariants: Quoted strings, `$(..)`, `${..}`, backticks, and array literals stay inside one word.
//! Invariants: Here-document bodies are attached to their delimiter word, terminator line included.
//! Invariants: Positions are 1-based line/column (columns count chars).

use super::SyntaxError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Word,
    /// Digits directly followed by a redirection operator.
    IoNumber,
    Op,
    Comment,
    Newline,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
    /// Byte offsets into the source.
    pub start: usize,
    pub end: usize,
    /// An escaped newline separated this token from the previous one.
    pub continued: bool,
    pub heredoc: Option<String>,
}

impl Token {
    pub fn is_word(&self, text: &str) -> bool {
        self.kind == TokenKind::Word && self.text == text
    }

    pub fn is_op(&self, text: &str) -> bool {
        self.kind == TokenKind::Op && self.text == text
    }
}

pub const REDIRECT_OPS: &[&str] = &[
    "<", ">", ">>", "<<", "<<-", "<<<", "<&", ">&", "<>", ">|", "&>", "&>>",
];

// Longest first so prefix matching picks the longest operator.
const OPERATORS: &[&str] = &[
    ";;&", "<<-", "<<<", "&>>", ";;", ";&", "&&", "&>", "||", "|&", "<<", "<&", "<>", ">>", ">&",
    ">|", ";", "&", "|", "<", ">", "(", ")",
];

struct PendingHeredoc {
    token: usize,
    delimiter: String,
    strip_tabs: bool,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    pending: Vec<PendingHeredoc>,
    expect_delimiter: Option<bool>,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        line: 1,
        col: 1,
        tokens: Vec::new(),
        pending: Vec::new(),
        expect_delimiter: None,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn err(line: usize, col: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(line, col, message)
    }

    fn run(&mut self) -> Result<(), SyntaxError> {
        let mut continued = false;
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                    continued = true;
                }
                Some('\n') => {
                    let (line, col, start) = (self.line, self.col, self.pos);
                    self.bump();
                    self.push(TokenKind::Newline, "\n".to_string(), line, col, start, false);
                    self.read_heredoc_bodies()?;
                    continued = false;
                }
                Some('#') => {
                    let (line, col, start) = (self.line, self.col, self.pos);
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    let text = self.src[start..self.pos].trim_end().to_string();
                    self.push(TokenKind::Comment, text, line, col, start, false);
                    continued = false;
                }
                None => {
                    if let Some(pending) = self.pending.first() {
                        let token = &self.tokens[pending.token];
                        return Err(Self::err(
                            token.line,
                            token.col,
                            format!("unclosed here-document '{}'", pending.delimiter),
                        ));
                    }
                    let (line, col, start) = (self.line, self.col, self.pos);
                    self.push(TokenKind::Eof, String::new(), line, col, start, continued);
                    return Ok(());
                }
                Some(_) => {
                    self.read_token(continued)?;
                    continued = false;
                }
            }
        }
    }

    fn push(
        &mut self,
        kind: TokenKind,
        text: String,
        line: usize,
        col: usize,
        start: usize,
        continued: bool,
    ) {
        self.tokens.push(Token {
            kind,
            text,
            line,
            col,
            start,
            end: self.pos,
            continued,
            heredoc: None,
        });
    }

    fn read_token(&mut self, continued: bool) -> Result<(), SyntaxError> {
        let (line, col, start) = (self.line, self.col, self.pos);
        let rest = &self.src[self.pos..];

        let process_substitution = (rest.starts_with("<(") || rest.starts_with(">("))
            && self.expect_delimiter.is_none();
        if !process_substitution {
            if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                for _ in 0..op.len() {
                    self.bump();
                }
                if *op == "<<" || *op == "<<-" {
                    self.expect_delimiter = Some(*op == "<<-");
                }
                self.push(TokenKind::Op, op.to_string(), line, col, start, continued);
                return Ok(());
            }
        }

        let mut word = String::new();
        if process_substitution {
            if let Some(c) = self.bump() {
                word.push(c);
            }
            self.read_balanced(&mut word, '(', ')')?;
        }
        self.read_word(&mut word)?;

        let kind = if word.bytes().all(|b| b.is_ascii_digit())
            && matches!(self.peek(), Some('<' | '>'))
        {
            TokenKind::IoNumber
        } else {
            TokenKind::Word
        };
        self.push(kind, word, line, col, start, continued);

        if kind == TokenKind::Word {
            if let Some(strip_tabs) = self.expect_delimiter.take() {
                let token = self.tokens.len() - 1;
                let delimiter = unquote(&self.tokens[token].text);
                self.pending.push(PendingHeredoc {
                    token,
                    delimiter,
                    strip_tabs,
                });
            }
        }
        Ok(())
    }

    fn read_word(&mut self, word: &mut String) -> Result<(), SyntaxError> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' | ';' | '&' | '|' | '<' | '>' | ')' => break,
                '(' => {
                    let array = word.ends_with('=');
                    let extglob = matches!(word.chars().last(), Some('@' | '!' | '+' | '*' | '?'));
                    if !(array || extglob) {
                        break;
                    }
                    self.read_balanced(word, '(', ')')?;
                }
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some('\n') => {}
                        Some(next) => {
                            word.push('\\');
                            word.push(next);
                        }
                        None => word.push('\\'),
                    }
                }
                '\'' => self.read_single_quoted(word, false)?,
                '"' => self.read_double_quoted(word)?,
                '`' => self.read_backticks(word)?,
                '$' => self.read_dollar(word)?,
                _ => {
                    self.bump();
                    word.push(c);
                }
            }
        }
        Ok(())
    }

    fn read_dollar(&mut self, word: &mut String) -> Result<(), SyntaxError> {
        self.bump();
        word.push('$');
        match self.peek() {
            Some('(') => self.read_balanced(word, '(', ')'),
            Some('{') => self.read_balanced(word, '{', '}'),
            Some('\'') => self.read_single_quoted(word, true),
            Some('"') => self.read_double_quoted(word),
            _ => Ok(()),
        }
    }

    fn read_single_quoted(&mut self, word: &mut String, escapes: bool) -> Result<(), SyntaxError> {
        let (line, col) = (self.line, self.col);
        self.bump();
        word.push('\'');
        loop {
            match self.bump() {
                Some('\'') => {
                    word.push('\'');
                    return Ok(());
                }
                Some('\\') if escapes => {
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some(c) => word.push(c),
                None => return Err(Self::err(line, col, "reached EOF without closing quote '")),
            }
        }
    }

    fn read_double_quoted(&mut self, word: &mut String) -> Result<(), SyntaxError> {
        let (line, col) = (self.line, self.col);
        self.bump();
        word.push('"');
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    word.push('"');
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some('$') => self.read_dollar(word)?,
                Some('`') => self.read_backticks(word)?,
                Some(c) => {
                    self.bump();
                    word.push(c);
                }
                None => return Err(Self::err(line, col, "reached EOF without closing quote \"")),
            }
        }
    }

    fn read_backticks(&mut self, word: &mut String) -> Result<(), SyntaxError> {
        let (line, col) = (self.line, self.col);
        self.bump();
        word.push('`');
        loop {
            match self.bump() {
                Some('`') => {
                    word.push('`');
                    return Ok(());
                }
                Some('\\') => {
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some(c) => word.push(c),
                None => return Err(Self::err(line, col, "reached EOF without closing quote `")),
            }
        }
    }

    /// Reads from `open` through its matching `close`, honoring nested quotes.
    fn read_balanced(&mut self, word: &mut String, open: char, close: char) -> Result<(), SyntaxError> {
        let (line, col) = (self.line, self.col);
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Some(c) if c == open => {
                    self.bump();
                    word.push(c);
                    depth += 1;
                }
                Some(c) if c == close => {
                    self.bump();
                    word.push(c);
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\\') => {
                    self.bump();
                    word.push('\\');
                    if let Some(next) = self.bump() {
                        word.push(next);
                    }
                }
                Some('\'') => self.read_single_quoted(word, false)?,
                Some('"') => self.read_double_quoted(word)?,
                Some('`') => self.read_backticks(word)?,
                Some(c) => {
                    self.bump();
                    word.push(c);
                }
                None => {
                    return Err(Self::err(
                        line,
                        col,
                        format!("reached EOF without matching {open} with {close}"),
                    ));
                }
            }
        }
    }

    fn read_heredoc_bodies(&mut self) -> Result<(), SyntaxError> {
        for pending in std::mem::take(&mut self.pending) {
            let start = self.pos;
            let mut closed = false;
            while self.pos < self.src.len() {
                let line_start = self.pos;
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
                let line = self.src[line_start..self.pos].trim_end_matches('\n');
                let line = if pending.strip_tabs {
                    line.trim_start_matches('\t')
                } else {
                    line
                };
                if line == pending.delimiter {
                    closed = true;
                    break;
                }
            }
            if !closed {
                let token = &self.tokens[pending.token];
                return Err(Self::err(
                    token.line,
                    token.col,
                    format!("unclosed here-document '{}'", pending.delimiter),
                ));
            }
            let mut body = self.src[start..self.pos].to_string();
            if !body.ends_with('\n') {
                body.push('\n');
            }
            self.tokens[pending.token].heredoc = Some(body);
        }
        Ok(())
    }
}

/// Here-document delimiters match with quotes and escapes removed.
fn unquote(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {}
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
