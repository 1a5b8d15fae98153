//! Template compiler boundary. The compiler itself is external; these types
//! only adapt it to `compile(source, name) -> code`.

use std::io::Write as _;
use std::process::{ChildStdin, Command, Stdio};

use crate::error::Error;

/// Placeholder in compiler arguments replaced by the template's identifier.
const NAME_PLACEHOLDER: &str = "{name}";

/// Turns rewritten template text into code that registers it under `name`.
pub trait TemplateCompiler {
    /// Compile `source` as the template `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Compile` with the compiler's diagnostics untouched.
    fn compile(&self, source: &str, name: &str) -> Result<String, Error>;
}

/// Runs an external compiler: source on stdin, code on stdout.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    /// Arguments, with `{name}` substituted per template.
    args: Vec<String>,
    /// Executable to run.
    program: String,
}

impl CommandCompiler {
    /// Build from a `[program, args...]` list. `None` when the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        return Some(Self {
            args: args.to_vec(),
            program: program.clone(),
        });
    }
}

impl TemplateCompiler for CommandCompiler {
    fn compile(&self, source: &str, name: &str) -> Result<String, Error> {
        let args = self.args.iter().map(|arg| return arg.replace(NAME_PLACEHOLDER, name));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Error::CompilerNotFound {
                        program: self.program.clone(),
                    };
                }
                return Error::Io(e);
            })?;

        // Stdin is fed from its own thread so a compiler that streams output
        // never blocks on a full stdout pipe while we block on its stdin.
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || return feed_stdin(stdin, source.as_bytes()));
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or_else(|_panic| {
                return Err(std::io::Error::other("compiler stdin writer panicked"));
            });
            return (output, written);
        });
        written?;
        let output = output?;

        if !output.status.success() {
            return Err(Error::Compile {
                diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
                name: name.to_string(),
            });
        }

        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
}

/// Defers compilation to the Dust runtime: the emitted code compiles and
/// registers the template when the module is first loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeCompiler;

impl TemplateCompiler for RuntimeCompiler {
    fn compile(&self, source: &str, name: &str) -> Result<String, Error> {
        return Ok(format!(
            "dust.loadSource(dust.compile({}, {}));",
            js_string(source),
            js_string(name)
        ));
    }
}

/// Write `source` to a compiler's stdin and close it.
/// A compiler may exit before reading stdin; its status decides the outcome,
/// so a broken pipe is not an error here.
fn feed_stdin(stdin: Option<ChildStdin>, source: &[u8]) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    return match stdin.write_all(source) {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    };
}

/// Quote a string as a JavaScript literal.
pub fn js_string(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    return serde_json::Value::String(value.to_string()).to_string();
}
