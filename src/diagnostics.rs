use std::path::Path;

use crate::config::CONFIG_FILE;
use crate::error::Error;

/// ANSI bold on.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a compiler failure with the compiler's own output indented below.
fn render_compile(name: &str, diagnostics: &str) -> String {
    let mut out = format!(
        "\
# Error: Compile Failed

The compiler rejected template `{name}`.

## Compiler output

"
    );
    for line in diagnostics.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    return out;
}

/// Render a compiler that could not be started.
fn render_compiler_not_found(program: &str) -> String {
    return format!(
        "\
# Error: Compiler Not Found

`{program}` could not be started.

## Fix

Install it, or remove the `compiler` setting from `{CONFIG_FILE}` to use
the Dust runtime compiler.
"
    );
}

/// Render a structured markdown diagnostic for an error.
///
/// Each variant produces a block with what happened and, where there is one,
/// how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::Compile { diagnostics, name } => render_compile(name, diagnostics),
        Error::CompilerNotFound { program } => render_compiler_not_found(program),
        Error::IdentityMismatch { canonical, path, written } => {
            render_identity_mismatch(written, path, canonical)
        },
        Error::UnresolvedReference { from, name } => render_unresolved(name, from),
        Error::ConfigNotFound { .. }
        | Error::FileNotFound { .. }
        | Error::InvalidSpan { .. }
        | Error::Io(_)
        | Error::Json(_)
        | Error::TomlDe(_)
        | Error::Watch { .. } => render_generic(e),
    };
}

/// Render the variants that need no fix section beyond their message.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => format!(
            "\
# Error: Config Not Found

`{}` does not exist.
",
            path.display()
        ),

        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid Config

{e}

## Fix

Check `{CONFIG_FILE}`. Known keys: path, paths, extension, default,
runtime, compiler, module_dirs, out_dir, verbose.
"
        ),

        Error::Compile { .. }
        | Error::CompilerNotFound { .. }
        | Error::IdentityMismatch { .. }
        | Error::InvalidSpan { .. }
        | Error::Io(_)
        | Error::Json(_)
        | Error::UnresolvedReference { .. }
        | Error::Watch { .. } => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Render a name that found a file known by another name.
fn render_identity_mismatch(written: &str, path: &Path, canonical: &str) -> String {
    return format!(
        "\
# Error: Identity Mismatch

`{{>{written}/}}` found `{}`, but that template is named `{canonical}`.

## Fix

Reference it by its canonical name:

    {{>{canonical}/}}
",
        path.display()
    );
}

/// Render a reference that matched nothing under any root.
fn render_unresolved(name: &str, from: &Path) -> String {
    let hint = if name.starts_with('.') || name.contains('/') {
        "The path is relative to the referencing template's directory."
    } else {
        "Hyphens may stand for directory levels: `a-b-c` matches `a/b/c.dust`,\n`a-b/c.dust`, `a/b-c.dust`, or `a-b-c.dust` under each root."
    };

    return format!(
        "\
# Error: Unresolved Reference

`{name}` in `{}` does not match any template.

## Hint

{hint}
",
        from.display()
    );
}
