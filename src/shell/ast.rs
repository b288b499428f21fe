// Syntax tree produced by the parser and consumed by the printer.

/// One line-level entry of a statement list.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Stmt(Stmt),
    Comment(String),
    /// One or more blank lines, collapsed.
    Blank,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub list: AndOrList,
    pub background: bool,
    /// Follows the previous statement on the same line (after `;` or `&`).
    pub same_line: bool,
    pub comment: Option<String>,
}

/// A link in an `&&`/`||` or pipe chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Chained<T> {
    pub op: String,
    /// The source broke the line after the operator.
    pub line_break: bool,
    pub comment: Option<String>,
    pub item: T,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<Chained<Pipeline>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    pub negated: bool,
    pub first: Command,
    pub rest: Vec<Chained<Command>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Simple(Vec<Part>),
    Compound {
        kind: Compound,
        redirects: Vec<Redirect>,
    },
    Function(Function),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub kind: PartKind,
    /// Preceded by an escaped newline in the source.
    pub continued: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PartKind {
    Word(String),
    Redirect(Redirect),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Redirect {
    pub fd: Option<String>,
    pub op: String,
    pub target: String,
    pub heredoc: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Compound {
    Brace { body: Vec<Item>, inline: bool },
    Subshell { body: Vec<Item>, inline: bool },
    If {
        branches: Vec<Branch>,
        else_body: Option<Vec<Item>>,
    },
    Loop {
        until: bool,
        cond: Vec<Item>,
        body: Vec<Item>,
    },
    For {
        var: String,
        words: Option<Vec<String>>,
        body: Vec<Item>,
    },
    ArithFor { header: String, body: Vec<Item> },
    Case {
        word: String,
        arms: Vec<CaseArm>,
        trailing_comments: Vec<String>,
    },
    /// `[[ ... ]]`, kept as written between the brackets.
    Test(String),
    /// `(( ... ))`, kept as written between the parentheses.
    Arith(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub cond: Vec<Item>,
    pub body: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseArm {
    pub comments: Vec<String>,
    pub patterns: Vec<String>,
    pub body: Vec<Item>,
    pub terminator: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub keyword: bool,
    pub parens: bool,
    pub body: Box<Command>,
}
