//! Purpose: Shell script formatter used by the plugin's format path.
//! Exports: `format_source`, `PrintOptions`, `Indent`, `LangVariant`, `SyntaxError`.
//! Role: Pure text-to-text transform; knows nothing about the host protocol.
//! Invariants: Formatting a formatted script yields the same text.
//! Invariants: Word text (quotes, expansions, here-document bodies) is never rewritten.
//! Notes: Range requests are not supported here; callers format the whole file.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;

use std::fmt;

/// Shell dialect used to decide which constructs are accepted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LangVariant {
    #[default]
    Bash,
    Posix,
    MirBsdKorn,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Indent {
    Tabs,
    Spaces(u32),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrintOptions {
    pub indent: Indent,
    pub binary_next_line: bool,
    pub switch_case_indent: bool,
    pub space_redirects: bool,
    pub func_next_line: bool,
    pub minify: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            indent: Indent::Spaces(2),
            binary_next_line: false,
            switch_case_indent: false,
            space_redirects: false,
            func_next_line: false,
            minify: false,
        }
    }
}

impl PrintOptions {
    pub(crate) fn indent_unit(&self) -> String {
        match self.indent {
            Indent::Tabs | Indent::Spaces(0) => "\t".to_string(),
            Indent::Spaces(width) => " ".repeat(width as usize),
        }
    }
}

/// Parse failure rendered as `line:col: message`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for SyntaxError {}

pub fn format_source(
    source: &str,
    variant: LangVariant,
    options: &PrintOptions,
) -> Result<String, SyntaxError> {
    let items = parser::parse(source, variant)?;
    Ok(printer::print(&items, options))
}

#[cfg(test)]
mod tests {
    use super::{Indent, LangVariant, PrintOptions, format_source};

    fn fmt(src: &str, options: &PrintOptions) -> String {
        format_source(src, LangVariant::Bash, options).expect("format")
    }

    #[test]
    fn normalizes_if_spacing() {
        let out = fmt(
            "if [ \"$1\" = \"ok\" ];then\n echo ok\nfi\n",
            &PrintOptions::default(),
        );
        assert_eq!(out, "if [ \"$1\" = \"ok\" ]; then\n  echo ok\nfi\n");
    }

    #[test]
    fn unterminated_if_names_closing_keyword() {
        let err = format_source("if true; then\n  echo hi\n", LangVariant::Bash, &PrintOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "1:1: \"if\" must end with \"fi\"");
    }

    #[test]
    fn formatting_is_idempotent() {
        let src = "#!/bin/bash\nset -e\n\n\n# build\nfor f in *.c;do gcc -c \"$f\"||exit 1;done\ncase $1 in\nstart) run &;;\n*) usage;;\nesac\nf() {\nlocal x=$(date)\necho \"$x\" >&2\n}\n";
        let once = fmt(src, &PrintOptions::default());
        assert_eq!(
            once,
            "#!/bin/bash\nset -e\n\n# build\nfor f in *.c; do\n  gcc -c \"$f\" || exit 1\ndone\ncase $1 in\nstart)\n  run &\n  ;;\n*)\n  usage\n  ;;\nesac\nf() {\n  local x=$(date)\n  echo \"$x\" >&2\n}\n"
        );
        assert_eq!(fmt(&once, &PrintOptions::default()), once);
    }

    #[test]
    fn printer_options() {
        let src = "f() {\ncase $x in\na) cat <in >out ;;\nesac\n}\n";
        let options = PrintOptions {
            indent: Indent::Tabs,
            switch_case_indent: true,
            space_redirects: true,
            func_next_line: true,
            ..PrintOptions::default()
        };
        assert_eq!(
            fmt(src, &options),
            "f()\n{\n\tcase $x in\n\t\ta)\n\t\t\tcat < in > out\n\t\t\t;;\n\tesac\n}\n"
        );
    }

    #[test]
    fn binary_next_line_moves_operators() {
        let src = "make &&\n  make install\n";
        assert_eq!(fmt(src, &PrintOptions::default()), src);
        let options = PrintOptions {
            binary_next_line: true,
            ..PrintOptions::default()
        };
        assert_eq!(fmt(src, &options), "make \\\n  && make install\n");
    }

    #[test]
    fn minify_drops_indentation_and_comments() {
        let options = PrintOptions {
            minify: true,
            ..PrintOptions::default()
        };
        assert_eq!(
            fmt("# lead\nif a; then\n\n  b # why\nfi\n", &options),
            "if a; then\nb\nfi\n"
        );
    }

    #[test]
    fn zero_width_indents_with_tabs() {
        let options = PrintOptions {
            indent: Indent::Spaces(0),
            ..PrintOptions::default()
        };
        assert_eq!(fmt("{\nx\n}\n", &options), "{\n\tx\n}\n");
    }
}
