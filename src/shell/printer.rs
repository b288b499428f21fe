// Renders a statement tree with canonical spacing and indentation.

use super::PrintOptions;
use super::ast::{
    AndOrList, Chained, Command, Compound, Function, Item, PartKind, Pipeline, Redirect, Stmt,
};

pub fn print(items: &[Item], options: &PrintOptions) -> String {
    let mut printer = Printer {
        options,
        indent_unit: options.indent_unit(),
        out: String::new(),
        heredocs: Vec::new(),
    };
    printer.items(items, 0);
    for body in std::mem::take(&mut printer.heredocs) {
        printer.out.push_str(&body);
    }
    printer.out
}

struct Printer<'a> {
    options: &'a PrintOptions,
    indent_unit: String,
    out: String,
    /// Here-document bodies waiting for the end of the current line.
    heredocs: Vec<String>,
}

impl Printer<'_> {
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for body in std::mem::take(&mut self.heredocs) {
            self.out.push_str(&body);
        }
    }

    fn indent(&mut self, level: usize) {
        if self.options.minify {
            return;
        }
        for _ in 0..level {
            self.out.push_str(&self.indent_unit);
        }
    }

    fn items(&mut self, items: &[Item], level: usize) {
        let minify = self.options.minify;
        for (index, item) in items.iter().enumerate() {
            match item {
                Item::Blank if !minify => self.newline(),
                Item::Comment(text) if !minify => {
                    self.indent(level);
                    self.push(text);
                    self.newline();
                }
                Item::Blank | Item::Comment(_) => {}
                Item::Stmt(stmt) => {
                    let joined = index > 0
                        && stmt.same_line
                        && matches!(&items[index - 1], Item::Stmt(prev) if prev.comment.is_none());
                    if !joined {
                        self.indent(level);
                    }
                    self.stmt(stmt, level);

                    let next_joins = matches!(items.get(index + 1), Some(Item::Stmt(next)) if next.same_line);
                    if next_joins && stmt.comment.is_none() {
                        self.push(if stmt.background { " " } else { "; " });
                        continue;
                    }
                    if let Some(comment) = stmt.comment.as_deref().filter(|_| !minify) {
                        self.push(" ");
                        self.push(comment);
                    }
                    self.newline();
                }
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt, level: usize) {
        self.and_or(&stmt.list, level);
        if stmt.background {
            self.push(" &");
        }
    }

    fn and_or(&mut self, list: &AndOrList, level: usize) {
        self.pipeline(&list.first, level);
        for link in &list.rest {
            self.link(link, level);
            self.pipeline(&link.item, level);
        }
    }

    fn pipeline(&mut self, pipeline: &Pipeline, level: usize) {
        if pipeline.negated {
            self.push("! ");
        }
        self.command(&pipeline.first, level);
        for link in &pipeline.rest {
            self.link(link, level);
            self.command(&link.item, level);
        }
    }

    /// Writes a binary operator and whatever separates it from its right operand.
    fn link<T>(&mut self, link: &Chained<T>, level: usize) {
        let comment = link.comment.as_deref().filter(|_| !self.options.minify);
        if !link.line_break {
            self.push(" ");
            self.push(&link.op);
            self.push(" ");
            return;
        }
        if self.options.binary_next_line && comment.is_none() {
            self.push(" \\");
            self.newline();
            self.indent(level + 1);
            self.push(&link.op);
            self.push(" ");
            return;
        }
        self.push(" ");
        self.push(&link.op);
        if let Some(comment) = comment {
            self.push(" ");
            self.push(comment);
        }
        self.newline();
        self.indent(level + 1);
    }

    fn command(&mut self, command: &Command, level: usize) {
        match command {
            Command::Simple(parts) => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        if part.continued && !self.options.minify {
                            self.push(" \\");
                            self.newline();
                            self.indent(level + 1);
                        } else {
                            self.push(" ");
                        }
                    }
                    match &part.kind {
                        PartKind::Word(word) => self.push(word),
                        PartKind::Redirect(redirect) => self.redirect(redirect),
                    }
                }
            }
            Command::Compound { kind, redirects } => {
                self.compound(kind, level);
                for redirect in redirects {
                    self.push(" ");
                    self.redirect(redirect);
                }
            }
            Command::Function(function) => self.function(function, level),
        }
    }

    fn redirect(&mut self, redirect: &Redirect) {
        if let Some(fd) = &redirect.fd {
            self.push(fd);
        }
        self.push(&redirect.op);
        if self.options.space_redirects {
            self.push(" ");
        }
        self.push(&redirect.target);
        if let Some(body) = &redirect.heredoc {
            self.heredocs.push(body.clone());
        }
    }

    fn function(&mut self, function: &Function, level: usize) {
        if function.keyword {
            self.push("function ");
        }
        self.push(&function.name);
        if function.parens || !function.keyword {
            self.push("()");
        }
        let braced = matches!(
            function.body.as_ref(),
            Command::Compound {
                kind: Compound::Brace { .. },
                ..
            }
        );
        if self.options.func_next_line && braced && !self.options.minify {
            self.newline();
            self.indent(level);
        } else {
            self.push(" ");
        }
        self.command(&function.body, level);
    }

    /// Block body: newline, indented items, then the indent for the closing word.
    fn block(&mut self, body: &[Item], level: usize) {
        self.newline();
        self.items(body, level + 1);
        self.indent(level);
    }

    /// Writes a condition list and returns the separator to put before the next keyword.
    fn condition(&mut self, cond: &[Item], level: usize) -> &'static str {
        let simple = cond.iter().all(|item| matches!(item, Item::Stmt(stmt) if stmt.comment.is_none()));
        if !simple {
            self.block(cond, level);
            return "";
        }
        self.push(" ");
        let stmts: Vec<&Stmt> = cond
            .iter()
            .filter_map(|item| match item {
                Item::Stmt(stmt) => Some(stmt),
                _ => None,
            })
            .collect();
        for (index, stmt) in stmts.iter().enumerate() {
            if index > 0 {
                self.push(if stmts[index - 1].background { " " } else { "; " });
            }
            self.stmt(stmt, level);
        }
        match stmts.last() {
            Some(stmt) if stmt.background => " ",
            _ => "; ",
        }
    }

    fn compound(&mut self, compound: &Compound, level: usize) {
        match compound {
            Compound::Brace { body, inline } => {
                if let (true, [Item::Stmt(stmt)]) = (*inline, body.as_slice()) {
                    self.push("{ ");
                    self.stmt(stmt, level);
                    self.push(if stmt.background { " }" } else { "; }" });
                } else {
                    self.push("{");
                    self.block(body, level);
                    self.push("}");
                }
            }
            Compound::Subshell { body, inline } => {
                if let (true, [Item::Stmt(stmt)]) = (*inline, body.as_slice()) {
                    self.push(if starts_with_paren(stmt) { "( " } else { "(" });
                    self.stmt(stmt, level);
                    self.push(if starts_with_paren(stmt) { " )" } else { ")" });
                } else {
                    self.push("(");
                    self.block(body, level);
                    self.push(")");
                }
            }
            Compound::If {
                branches,
                else_body,
            } => {
                for (index, branch) in branches.iter().enumerate() {
                    self.push(if index == 0 { "if" } else { "elif" });
                    let separator = self.condition(&branch.cond, level);
                    self.push(separator);
                    self.push("then");
                    self.block(&branch.body, level);
                }
                if let Some(body) = else_body {
                    self.push("else");
                    self.block(body, level);
                }
                self.push("fi");
            }
            Compound::Loop { until, cond, body } => {
                self.push(if *until { "until" } else { "while" });
                let separator = self.condition(cond, level);
                self.push(separator);
                self.push("do");
                self.block(body, level);
                self.push("done");
            }
            Compound::For { var, words, body } => {
                self.push("for ");
                self.push(var);
                if let Some(words) = words {
                    self.push(" in");
                    for word in words {
                        self.push(" ");
                        self.push(word);
                    }
                }
                self.push("; do");
                self.block(body, level);
                self.push("done");
            }
            Compound::ArithFor { header, body } => {
                self.push("for ((");
                self.push(header);
                self.push(")); do");
                self.block(body, level);
                self.push("done");
            }
            Compound::Case {
                word,
                arms,
                trailing_comments,
            } => {
                self.push("case ");
                self.push(word);
                self.push(" in");
                self.newline();
                let minify = self.options.minify;
                let arm_level = level + usize::from(self.options.switch_case_indent);
                for arm in arms {
                    for comment in arm.comments.iter().filter(|_| !minify) {
                        self.indent(arm_level);
                        self.push(comment);
                        self.newline();
                    }
                    self.indent(arm_level);
                    self.push(&arm.patterns.join(" | "));
                    self.push(")");
                    let terminator = arm.terminator.as_deref().unwrap_or(";;");
                    if arm.body.is_empty() {
                        self.push(" ");
                        self.push(terminator);
                    } else {
                        self.newline();
                        self.items(&arm.body, arm_level + 1);
                        self.indent(arm_level + 1);
                        self.push(terminator);
                    }
                    self.newline();
                }
                for comment in trailing_comments.iter().filter(|_| !minify) {
                    self.indent(arm_level);
                    self.push(comment);
                    self.newline();
                }
                self.indent(level);
                self.push("esac");
            }
            Compound::Test(raw) => {
                self.push("[[ ");
                self.push(raw);
                self.push(" ]]");
            }
            Compound::Arith(raw) => {
                self.push("((");
                self.push(raw);
                self.push("))");
            }
        }
    }
}

fn starts_with_paren(stmt: &Stmt) -> bool {
    let pipeline = &stmt.list.first;
    !pipeline.negated
        && matches!(
            pipeline.first,
            Command::Compound {
                kind: Compound::Subshell { .. } | Compound::Arith(_),
                ..
            }
        )
}
