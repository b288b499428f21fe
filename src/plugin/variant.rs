// Dialect detection: interpreter line first, then file extension, then Bash.

use crate::shell::LangVariant;
use bstr::ByteSlice;
use std::path::Path;

pub fn detect_variant(file_path: &str, file_bytes: &[u8]) -> LangVariant {
    variant_from_shebang(file_bytes)
        .or_else(|| variant_from_file_path(file_path))
        .unwrap_or(LangVariant::Bash)
}

pub fn variant_from_file_path(file_path: &str) -> Option<LangVariant> {
    let extension = Path::new(file_path).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "sh" => Some(LangVariant::Posix),
        "bash" | "zsh" | "bats" => Some(LangVariant::Bash),
        "mksh" => Some(LangVariant::MirBsdKorn),
        _ => None,
    }
}

pub fn variant_from_shebang(file_bytes: &[u8]) -> Option<LangVariant> {
    if !file_bytes.starts_with(b"#!") {
        return None;
    }
    let line = file_bytes[2..].lines().next().unwrap_or_default().to_str().ok()?;
    let mut fields = line.split_whitespace();

    let mut interpreter = basename_lower(fields.next()?);
    if interpreter == "env" {
        interpreter = basename_lower(fields.find(|field| !field.starts_with('-'))?);
    }

    match interpreter.as_str() {
        "sh" | "dash" | "ash" => Some(LangVariant::Posix),
        "bash" | "zsh" | "bats" => Some(LangVariant::Bash),
        "mksh" => Some(LangVariant::MirBsdKorn),
        _ => None,
    }
}

fn basename_lower(field: &str) -> String {
    field
        .rsplit('/')
        .next()
        .unwrap_or(field)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{detect_variant, variant_from_file_path, variant_from_shebang};
    use crate::shell::LangVariant;

    #[test]
    fn file_path_extensions() {
        let cases = [
            ("script.sh", Some(LangVariant::Posix)),
            ("script.bash", Some(LangVariant::Bash)),
            ("script.ZSH", Some(LangVariant::Bash)),
            ("test.bats", Some(LangVariant::Bash)),
            ("script.mksh", Some(LangVariant::MirBsdKorn)),
            ("script.MKSH", Some(LangVariant::MirBsdKorn)),
            ("script.ksh", None),
            ("script.foo", None),
            ("script", None),
        ];
        for (path, expected) in cases {
            assert_eq!(variant_from_file_path(path), expected, "{path}");
        }
    }

    #[test]
    fn interpreter_lines() {
        let cases: &[(&[u8], Option<LangVariant>)] = &[
            (b"echo ok\n", None),
            (b"#!\n", None),
            (b"#!/bin/sh\n", Some(LangVariant::Posix)),
            (b"#!/usr/bin/dash\n", Some(LangVariant::Posix)),
            (b"#!/bin/ash\n", Some(LangVariant::Posix)),
            (b"#!/bin/bash -e\n", Some(LangVariant::Bash)),
            (b"#!/bin/zsh\n", Some(LangVariant::Bash)),
            (b"#!/usr/bin/bats\n", Some(LangVariant::Bash)),
            (b"#!/BIN/MKSH\n", Some(LangVariant::MirBsdKorn)),
            (b"#!/usr/bin/env mksh\n", Some(LangVariant::MirBsdKorn)),
            (b"#!/usr/bin/env -S -i mksh -e\n", Some(LangVariant::MirBsdKorn)),
            (b"#!/usr/bin/env -S bash -e\n", Some(LangVariant::Bash)),
            (b"#!/usr/bin/env -S -i\n", None),
            (b"#!/bin/fish\n", None),
            (b"#!/bin/ksh\n", None),
            (b"#!/bin/sh", Some(LangVariant::Posix)),
            (b"#!   /bin/sh   \n", Some(LangVariant::Posix)),
        ];
        for (bytes, expected) in cases {
            assert_eq!(
                variant_from_shebang(bytes),
                *expected,
                "{}",
                String::from_utf8_lossy(bytes)
            );
        }
    }

    #[test]
    fn detection_order() {
        assert_eq!(
            detect_variant("script.sh", b"#!/bin/mksh\nset -e\n"),
            LangVariant::MirBsdKorn
        );
        assert_eq!(detect_variant("script.mksh", b"echo ok\n"), LangVariant::MirBsdKorn);
        assert_eq!(detect_variant("script.sh", b"#!/bin/ksh\necho ok\n"), LangVariant::Posix);
        assert_eq!(detect_variant("script.txt", b"#!/bin/fish\necho ok\n"), LangVariant::Bash);
    }
}
