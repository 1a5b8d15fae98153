//! Core domain types for partial references and template layout.
use std::path::PathBuf;

/// Compiled output for one template, ready to be written as a module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    /// Full module source: runtime preamble, requires, body, export.
    pub code: String,
    /// Distinct dependency files in first-seen order.
    pub dependencies: Vec<PathBuf>,
    /// Canonical identifier the template is registered under.
    pub identifier: String,
}

/// One partial reference found by the scanner.
/// The span covers only the name token (quotes included for quoted names)
/// and always indexes the pristine source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Byte length of the name token.
    pub length: usize,
    /// Byte offset of the name token in the original source.
    pub offset: usize,
    /// What the reference points at.
    pub target: ReferenceTarget,
}

impl Reference {
    /// Exclusive end offset of the span.
    pub fn end(&self) -> usize {
        return self.offset.saturating_add(self.length);
    }
}

/// The two shapes a partial name can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Bare, already-canonical identifier such as `home-widgets-welcome`.
    Concrete(String),
    /// Quoted request such as `"./widgets/welcome"` or `"shared/header"`.
    Module(String),
}

impl ReferenceTarget {
    /// The identifier or request exactly as the author wrote it.
    pub fn as_written(&self) -> &str {
        return match self {
            ReferenceTarget::Concrete(name) | ReferenceTarget::Module(name) => name,
        };
    }
}

/// A reference after resolution. `identifier` replaces the scanned span.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// Canonical identifier written back into the template.
    pub identifier: String,
    /// File the reference resolved to.
    pub path: PathBuf,
    /// The scanned reference, offsets untouched.
    pub reference: Reference,
}

/// Template file naming rules shared by the canonicalizer and the resolvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    /// Stem of the file that stands for its directory (`index`).
    pub default_stem: String,
    /// Template extension without the leading dot (`dust`).
    pub extension: String,
}

impl TemplateLayout {
    /// File name of a directory's default template, e.g. `index.dust`.
    pub fn default_file_name(&self) -> String {
        return self.file_name(&self.default_stem);
    }

    /// Append the template extension to a stem.
    pub fn file_name(&self, stem: &str) -> String {
        return format!("{stem}.{}", self.extension);
    }

    /// Whether a file name carries the template extension (case-insensitive).
    pub fn has_extension(&self, file_name: &str) -> bool {
        return self.strip_extension(file_name).is_some();
    }

    /// Remove a trailing `.<extension>`, ignoring ASCII case.
    pub fn strip_extension<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let suffix_len = self.extension.len().saturating_add(1);
        let split_at = file_name.len().checked_sub(suffix_len)?;
        let stem = file_name.get(..split_at)?;
        let suffix = file_name.get(split_at..)?;
        let ext = suffix.strip_prefix('.')?;

        if ext.eq_ignore_ascii_case(&self.extension) {
            return Some(stem);
        }
        return None;
    }
}

impl Default for TemplateLayout {
    fn default() -> Self {
        return Self {
            default_stem: "index".to_string(),
            extension: "dust".to_string(),
        };
    }
}
