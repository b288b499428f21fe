//! Purpose: Recursive-descent parser from tokens to the statement tree.
//! Exports: `parse`.
//! Role: Second formatter stage; enforces dialect restrictions.
//! Invariants: Reserved words are only recognized in command position.
//! Invariants: Unterminated compound commands report the position of their opening keyword.

use super::ast::{
    AndOrList, Branch, CaseArm, Chained, Command, Compound, Function, Item, Part, PartKind,
    Pipeline, Redirect, Stmt,
};
use super::lexer::{REDIRECT_OPS, Token, TokenKind, tokenize};
use super::{LangVariant, SyntaxError};

const CASE_TERMINATORS: &[&str] = &[";;", ";&", ";;&"];

pub fn parse(src: &str, variant: LangVariant) -> Result<Vec<Item>, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        variant,
    };
    let items = parser.parse_items(&[])?;
    let token = parser.peek();
    if token.kind != TokenKind::Eof {
        return Err(parser.unexpected(token));
    }
    Ok(items)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    variant: LangVariant,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, ops: &[&str]) -> Option<Token> {
        let token = self.peek();
        if token.kind == TokenKind::Op && ops.contains(&token.text.as_str()) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn eat_word(&mut self, word: &str) -> Option<Token> {
        if self.peek().is_word(word) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn at_stop(&self, stops: &[&str]) -> bool {
        let token = self.peek();
        matches!(token.kind, TokenKind::Word | TokenKind::Op) && stops.contains(&token.text.as_str())
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.bump();
        }
    }

    /// Newlines and comments allowed after a binary operator.
    fn linebreak(&mut self) -> (bool, Option<String>) {
        let mut line_break = false;
        let mut comment = None;
        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    self.bump();
                    line_break = true;
                }
                TokenKind::Comment => {
                    let token = self.bump();
                    comment.get_or_insert(token.text);
                    line_break = true;
                }
                _ => return (line_break, comment),
            }
        }
    }

    fn error_at(token: &Token, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(token.line, token.col, message)
    }

    fn unexpected(&self, token: &Token) -> SyntaxError {
        let message = match (token.kind, token.text.as_str()) {
            (TokenKind::Eof, _) => "reached EOF where a statement was expected".to_string(),
            (TokenKind::Op, ")") => "\")\" can only be used to close a subshell".to_string(),
            (TokenKind::Op, ";;" | ";&" | ";;&") => {
                format!("{:?} can only be used in a case clause", token.text)
            }
            (TokenKind::Op, ";" | "&" | "|" | "||" | "&&" | "|&") => {
                format!("{:?} can only immediately follow a statement", token.text)
            }
            (TokenKind::Word, "then" | "elif" | "else" | "fi") => {
                format!("{:?} can only be used in an if", token.text)
            }
            (TokenKind::Word, "do" | "done") => {
                format!("{:?} can only be used in a loop", token.text)
            }
            (TokenKind::Word, "esac") => "\"esac\" can only be used to end a case".to_string(),
            (TokenKind::Word, "}") => "\"}\" can only be used to close a block".to_string(),
            (TokenKind::Word, "]]") => "\"]]\" can only be used to close a test".to_string(),
            _ => format!("{:?} is not a valid start for a statement", token.text),
        };
        Self::error_at(token, message)
    }

    fn require_extended(&self, token: &Token, feature: &str) -> Result<(), SyntaxError> {
        if self.variant == LangVariant::Posix {
            return Err(Self::error_at(
                token,
                format!("{feature} are a bash/mksh feature"),
            ));
        }
        Ok(())
    }

    fn expect_close(&mut self, word: &str, opener: &Token, message: String) -> Result<Token, SyntaxError> {
        if let Some(token) = self.eat_word(word) {
            return Ok(token);
        }
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            Err(Self::error_at(opener, message))
        } else {
            Err(self.unexpected(token))
        }
    }

    fn parse_items(&mut self, stops: &[&str]) -> Result<Vec<Item>, SyntaxError> {
        let mut items = Vec::new();
        let mut newlines = 0usize;
        let mut same_line = false;
        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    self.bump();
                    newlines += 1;
                    same_line = false;
                    continue;
                }
                TokenKind::Comment => {
                    let text = self.bump().text;
                    if newlines == 0 {
                        if let Some(Item::Stmt(stmt)) = items.last_mut() {
                            if stmt.comment.is_none() {
                                stmt.comment = Some(text);
                                continue;
                            }
                        }
                    }
                    if newlines >= 2 && !items.is_empty() {
                        items.push(Item::Blank);
                    }
                    items.push(Item::Comment(text));
                    newlines = 0;
                    continue;
                }
                TokenKind::Eof => break,
                _ if self.at_stop(stops) => break,
                _ => {}
            }

            if newlines >= 2 && !items.is_empty() {
                items.push(Item::Blank);
            }
            newlines = 0;

            let list = self.parse_and_or()?;
            let mut stmt = Stmt {
                list,
                background: false,
                same_line: same_line && !items.is_empty(),
                comment: None,
            };
            same_line = false;
            if self.eat_op(&[";"]).is_some() {
                same_line = true;
            } else if self.eat_op(&["&"]).is_some() {
                stmt.background = true;
                same_line = true;
            } else {
                let token = self.peek();
                let ends = matches!(
                    token.kind,
                    TokenKind::Newline | TokenKind::Comment | TokenKind::Eof
                );
                if !ends && !self.at_stop(stops) {
                    return Err(self.unexpected(token));
                }
            }
            items.push(Item::Stmt(stmt));
        }
        Ok(items)
    }

    fn parse_and_or(&mut self) -> Result<AndOrList, SyntaxError> {
        let first = self.parse_pipeline()?;
        let mut rest = Vec::new();
        while let Some(op) = self.eat_op(&["&&", "||"]) {
            let (line_break, comment) = self.linebreak();
            let line_break = line_break || op.continued;
            if self.peek().kind == TokenKind::Eof {
                return Err(Self::error_at(
                    &op,
                    format!("{:?} must be followed by a statement", op.text),
                ));
            }
            let item = self.parse_pipeline()?;
            rest.push(Chained {
                op: op.text,
                line_break,
                comment,
                item,
            });
        }
        Ok(AndOrList { first, rest })
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, SyntaxError> {
        let negated = self.eat_word("!").is_some();
        let first = self.parse_command()?;
        let mut rest = Vec::new();
        while let Some(op) = self.eat_op(&["|", "|&"]) {
            if op.text == "|&" {
                self.require_extended(&op, "\"|&\" pipes")?;
            }
            let (line_break, comment) = self.linebreak();
            let line_break = line_break || op.continued;
            if self.peek().kind == TokenKind::Eof {
                return Err(Self::error_at(
                    &op,
                    format!("{:?} must be followed by a statement", op.text),
                ));
            }
            let item = self.parse_command()?;
            rest.push(Chained {
                op: op.text,
                line_break,
                comment,
                item,
            });
        }
        Ok(Pipeline {
            negated,
            first,
            rest,
        })
    }

    fn parse_command(&mut self) -> Result<Command, SyntaxError> {
        let token = self.peek().clone();
        let kind = match (token.kind, token.text.as_str()) {
            (TokenKind::Word, "if") => self.parse_if()?,
            (TokenKind::Word, "while") => self.parse_loop(false)?,
            (TokenKind::Word, "until") => self.parse_loop(true)?,
            (TokenKind::Word, "for") => self.parse_for()?,
            (TokenKind::Word, "case") => self.parse_case()?,
            (TokenKind::Word, "{") => self.parse_group("{", "}")?,
            (TokenKind::Word, "[[") => self.parse_test()?,
            (TokenKind::Word, "function") => return self.parse_function_keyword(),
            (
                TokenKind::Word,
                "then" | "elif" | "else" | "fi" | "do" | "done" | "esac" | "}" | "]]",
            ) => return Err(self.unexpected(&token)),
            (TokenKind::Word, _)
                if self.peek_at(1).is_op("(") && self.peek_at(2).is_op(")") =>
            {
                return self.parse_function_parens();
            }
            (TokenKind::Op, "(") if self.peek_at(1).is_op("(") && self.peek_at(1).start == token.end => {
                self.parse_arith()?
            }
            (TokenKind::Op, "(") => self.parse_group("(", ")")?,
            (TokenKind::Word | TokenKind::IoNumber, _) => return self.parse_simple(),
            (TokenKind::Op, op) if REDIRECT_OPS.contains(&op) => return self.parse_simple(),
            _ => return Err(self.unexpected(&token)),
        };

        let mut redirects = Vec::new();
        while self.at_redirect() {
            redirects.push(self.parse_redirect()?);
        }
        Ok(Command::Compound { kind, redirects })
    }

    fn at_redirect(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::IoNumber
            || (token.kind == TokenKind::Op && REDIRECT_OPS.contains(&token.text.as_str()))
    }

    fn parse_redirect(&mut self) -> Result<Redirect, SyntaxError> {
        let fd = if self.peek().kind == TokenKind::IoNumber {
            Some(self.bump().text)
        } else {
            None
        };
        let op = self.bump();
        match op.text.as_str() {
            "<<<" => self.require_extended(&op, "herestrings")?,
            "&>" | "&>>" => self.require_extended(&op, "\"&>\" redirects")?,
            _ => {}
        }
        let target = self.peek();
        if target.kind != TokenKind::Word {
            return Err(Self::error_at(
                &op,
                format!("{:?} must be followed by a word", op.text),
            ));
        }
        let target = self.bump();
        Ok(Redirect {
            fd,
            op: op.text,
            target: target.text,
            heredoc: target.heredoc,
        })
    }

    fn parse_simple(&mut self) -> Result<Command, SyntaxError> {
        let mut parts = Vec::new();
        loop {
            let token = self.peek();
            let continued = token.continued && !parts.is_empty();
            if token.kind == TokenKind::Word {
                let text = self.bump().text;
                parts.push(Part {
                    kind: PartKind::Word(text),
                    continued,
                });
            } else if self.at_redirect() {
                let redirect = self.parse_redirect()?;
                parts.push(Part {
                    kind: PartKind::Redirect(redirect),
                    continued,
                });
            } else if token.is_op("(") {
                return Err(Self::error_at(
                    token,
                    "a command can only contain words and redirects; encountered (",
                ));
            } else {
                break;
            }
        }
        Ok(Command::Simple(parts))
    }

    fn parse_condition(&mut self, opener: &Token, follow: &str) -> Result<Vec<Item>, SyntaxError> {
        let cond = self.parse_items(&[follow])?;
        if !cond.iter().any(|item| matches!(item, Item::Stmt(_))) {
            return Err(Self::error_at(
                opener,
                format!("{:?} must be followed by a statement list", opener.text),
            ));
        }
        if self.eat_word(follow).is_none() {
            return Err(Self::error_at(
                opener,
                format!("\"{} <cond>\" must be followed by {follow:?}", opener.text),
            ));
        }
        Ok(cond)
    }

    fn parse_if(&mut self) -> Result<Compound, SyntaxError> {
        let opener = self.bump();
        let mut branches = Vec::new();
        let mut else_body = None;

        let cond = self.parse_condition(&opener, "then")?;
        let body = self.parse_items(&["elif", "else", "fi"])?;
        branches.push(Branch { cond, body });
        loop {
            if let Some(elif) = self.eat_word("elif") {
                let cond = self.parse_condition(&elif, "then")?;
                let body = self.parse_items(&["elif", "else", "fi"])?;
                branches.push(Branch { cond, body });
            } else if self.eat_word("else").is_some() {
                else_body = Some(self.parse_items(&["fi"])?);
                break;
            } else {
                break;
            }
        }
        self.expect_close("fi", &opener, "\"if\" must end with \"fi\"".to_string())?;
        Ok(Compound::If {
            branches,
            else_body,
        })
    }

    fn parse_loop(&mut self, until: bool) -> Result<Compound, SyntaxError> {
        let opener = self.bump();
        let cond = self.parse_condition(&opener, "do")?;
        let body = self.parse_items(&["done"])?;
        self.expect_close(
            "done",
            &opener,
            format!("{:?} must end with \"done\"", opener.text),
        )?;
        Ok(Compound::Loop { until, cond, body })
    }

    fn parse_for(&mut self) -> Result<Compound, SyntaxError> {
        let opener = self.bump();
        if self.peek().is_op("(") && self.peek_at(1).is_op("(") {
            self.require_extended(&opener, "c-style fors")?;
            let header = self.read_arith()?;
            self.eat_op(&[";"]);
            let body = self.parse_do_done(&opener)?;
            return Ok(Compound::ArithFor { header, body });
        }

        let var = self.peek();
        if var.kind != TokenKind::Word {
            return Err(Self::error_at(&opener, "\"for\" must be followed by a literal"));
        }
        let var = self.bump().text;

        self.skip_newlines();
        let words = if self.eat_word("in").is_some() {
            let mut words = Vec::new();
            while self.peek().kind == TokenKind::Word {
                words.push(self.bump().text);
            }
            Some(words)
        } else {
            None
        };
        self.eat_op(&[";"]);
        let body = self.parse_do_done(&opener)?;
        Ok(Compound::For { var, words, body })
    }

    fn parse_do_done(&mut self, opener: &Token) -> Result<Vec<Item>, SyntaxError> {
        self.skip_newlines();
        if self.eat_word("do").is_none() {
            return Err(Self::error_at(
                opener,
                "\"for foo [in words]\" must be followed by \"do\"",
            ));
        }
        let body = self.parse_items(&["done"])?;
        self.expect_close("done", opener, "\"for\" must end with \"done\"".to_string())?;
        Ok(body)
    }

    fn parse_case(&mut self) -> Result<Compound, SyntaxError> {
        let opener = self.bump();
        let word = self.peek();
        if word.kind != TokenKind::Word {
            return Err(Self::error_at(&opener, "\"case\" must be followed by a word"));
        }
        let word = self.bump().text;
        self.skip_newlines();
        if self.eat_word("in").is_none() {
            return Err(Self::error_at(
                &opener,
                format!("\"case {word}\" must be followed by \"in\""),
            ));
        }

        let mut arms = Vec::new();
        let mut comments = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    self.bump();
                    continue;
                }
                TokenKind::Comment => {
                    comments.push(self.bump().text);
                    continue;
                }
                TokenKind::Eof => {
                    return Err(Self::error_at(&opener, "\"case\" must end with \"esac\""));
                }
                _ => {}
            }
            if self.eat_word("esac").is_some() {
                break;
            }

            self.eat_op(&["("]);
            let mut patterns = Vec::new();
            loop {
                let token = self.peek();
                if token.kind != TokenKind::Word {
                    return Err(Self::error_at(token, "case patterns must consist of words"));
                }
                patterns.push(self.bump().text);
                if self.eat_op(&["|"]).is_none() {
                    break;
                }
            }
            if self.eat_op(&[")"]).is_none() {
                let token = self.peek();
                return Err(Self::error_at(
                    token,
                    "case patterns must be separated with |",
                ));
            }

            let mut stops = CASE_TERMINATORS.to_vec();
            stops.push("esac");
            let body = self.parse_items(&stops)?;
            let terminator = self.eat_op(CASE_TERMINATORS).map(|token| token.text);
            arms.push(CaseArm {
                comments: std::mem::take(&mut comments),
                patterns,
                body,
                terminator,
            });
        }

        Ok(Compound::Case {
            word,
            arms,
            trailing_comments: comments,
        })
    }

    fn parse_group(&mut self, open: &str, close: &str) -> Result<Compound, SyntaxError> {
        let opener = self.bump();
        let body = self.parse_items(&[close])?;
        let closer = if open == "(" {
            match self.eat_op(&[")"]) {
                Some(token) => token,
                None => {
                    return Err(Self::error_at(
                        &opener,
                        "reached EOF without matching ( with )",
                    ));
                }
            }
        } else {
            self.expect_close(close, &opener, format!("reached EOF without matching {open} with {close}"))?
        };

        let inline = opener.line == closer.line
            && body.len() == 1
            && matches!(&body[0], Item::Stmt(stmt) if stmt.comment.is_none());
        Ok(if open == "(" {
            Compound::Subshell { body, inline }
        } else {
            Compound::Brace { body, inline }
        })
    }

    fn parse_test(&mut self) -> Result<Compound, SyntaxError> {
        let opener = self.bump();
        self.require_extended(&opener, "tests with \"[[\"")?;
        loop {
            let token = self.peek();
            if token.is_word("]]") {
                let raw = self.src[opener.end..token.start].trim().to_string();
                self.bump();
                return Ok(Compound::Test(raw));
            }
            if token.kind == TokenKind::Eof {
                return Err(Self::error_at(&opener, "reached EOF without matching [[ with ]]"));
            }
            self.bump();
        }
    }

    fn parse_arith(&mut self) -> Result<Compound, SyntaxError> {
        let opener = self.peek().clone();
        self.require_extended(&opener, "arithmetic commands")?;
        Ok(Compound::Arith(self.read_arith()?))
    }

    /// Consumes `(( ... ))` and returns the text between the double parentheses.
    fn read_arith(&mut self) -> Result<String, SyntaxError> {
        let opener = self.bump();
        let inner_start = self.bump().end;
        let mut depth = 2usize;
        let mut inner_end = inner_start;
        loop {
            let token = self.bump();
            match token.kind {
                TokenKind::Eof => {
                    return Err(Self::error_at(&opener, "reached EOF without matching (( with ))"));
                }
                TokenKind::Op if token.text == "(" => depth += 1,
                TokenKind::Op if token.text == ")" => {
                    depth -= 1;
                    if depth == 1 {
                        inner_end = token.start;
                    }
                    if depth == 0 {
                        return Ok(self.src[inner_start..inner_end].trim().to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_function_parens(&mut self) -> Result<Command, SyntaxError> {
        let name = self.bump();
        self.bump();
        self.bump();
        let body = self.parse_function_body(&name)?;
        Ok(Command::Function(Function {
            name: name.text,
            keyword: false,
            parens: true,
            body: Box::new(body),
        }))
    }

    fn parse_function_keyword(&mut self) -> Result<Command, SyntaxError> {
        let opener = self.bump();
        self.require_extended(&opener, "\"function\" definitions")?;
        let name = self.peek();
        if name.kind != TokenKind::Word {
            return Err(Self::error_at(&opener, "\"function\" must be followed by a name"));
        }
        let name = self.bump();
        let parens = self.peek().is_op("(") && self.peek_at(1).is_op(")");
        if parens {
            self.bump();
            self.bump();
        }
        let body = self.parse_function_body(&name)?;
        Ok(Command::Function(Function {
            name: name.text,
            keyword: true,
            parens,
            body: Box::new(body),
        }))
    }

    fn parse_function_body(&mut self, name: &Token) -> Result<Command, SyntaxError> {
        self.skip_newlines();
        if self.peek().kind == TokenKind::Eof {
            return Err(Self::error_at(
                name,
                format!("\"{}()\" must be followed by a statement", name.text),
            ));
        }
        self.parse_command()
    }
}
