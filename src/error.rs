/// Crate-level error types for dustlink diagnostics.
use std::path::PathBuf;

/// Every error names the template, identifier, or path it concerns so the
/// diagnostic is actionable without re-running in verbose mode.
/// Any of these aborts the file being processed and nothing else.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The template compiler rejected the rewritten source.
    #[error("compile failed for `{name}`:\n{diagnostics}")]
    Compile {
        /// Compiler output, untouched.
        diagnostics: String,
        /// Identifier the template was being compiled under.
        name: String,
    },

    /// The configured external compiler could not be started.
    #[error("compiler not found: `{program}`")]
    CompilerNotFound {
        /// Program name from the `compiler` setting.
        program: String,
    },

    /// An explicitly requested config file does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A template file named on the command line does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A concrete reference resolved to a file whose canonical identifier
    /// differs from the one the author wrote.
    #[error(
        "identity mismatch: `{written}` resolved to {}, which is named `{canonical}`",
        path.display()
    )]
    IdentityMismatch {
        /// Canonical identifier of the resolved file.
        canonical: String,
        /// File the identifier resolved to.
        path: PathBuf,
        /// Identifier as written in the template.
        written: String,
    },

    /// A reference span does not fit the source it is applied to.
    #[error("invalid reference span {offset}+{length} in source of {source_len} bytes")]
    InvalidSpan {
        /// Span length in bytes.
        length: usize,
        /// Span start offset in bytes.
        offset: usize,
        /// Length of the source text in bytes.
        source_len: usize,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of command output failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No root or module lookup produced a file for a reference.
    #[error("unresolved reference: `{name}` in {}", from.display())]
    UnresolvedReference {
        /// Template containing the reference.
        from: PathBuf,
        /// Identifier or request as written.
        name: String,
    },

    /// The filesystem watcher could not be set up.
    #[error("watch failed: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}
