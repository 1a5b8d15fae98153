//! Orchestration of one template: scan, resolve, verify, rewrite, compile,
//! and assemble the emitted module.

use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::compiler::{TemplateCompiler, js_string};
use crate::config::Config;
use crate::error::Error;
use crate::modules::ModuleResolver;
use crate::naming::{NameRegistry, canonicalize};
use crate::resolver::resolve_partial;
use crate::rewrite::rewrite;
use crate::scanner::scan;
use crate::types::{CompiledModule, Reference, ReferenceTarget, ResolvedReference};

/// Everything needed to process templates for one build session.
/// Borrowed collaborators let the caller own the registry across files.
pub struct Pipeline<'a> {
    /// Template compiler.
    pub compiler: &'a dyn TemplateCompiler,
    /// Project configuration.
    pub config: &'a Config,
    /// Lookup for quoted module-style references.
    pub modules: &'a dyn ModuleResolver,
    /// Session-wide synthetic name registry.
    pub names: &'a NameRegistry,
}

/// Where a template is in its processing. Logged as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolution and compilation finished.
    Compiled,
    /// A fatal error stopped processing.
    Failed,
    /// References are being resolved one by one.
    Resolving,
    /// Resolved identifiers are being spliced into the source.
    Rewriting,
    /// References have been extracted.
    Scanned,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Compiled => "compiled",
            Stage::Failed => "failed",
            Stage::Resolving => "resolving",
            Stage::Rewriting => "rewriting",
            Stage::Scanned => "scanned",
        };
        return f.write_str(label);
    }
}

impl Pipeline<'_> {
    /// Resolve a template's references without compiling it and return the
    /// distinct files it depends on, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn dependencies(&self, source: &str, entry: &Path) -> Result<Vec<PathBuf>, Error> {
        let resolved = self.resolve_all(scan(source), entry)?;
        return Ok(distinct_dependencies(&resolved));
    }

    /// Canonical identifier of a template file under this session's roots.
    pub fn identifier_for(&self, entry: &Path) -> String {
        let roots = self.config.roots_for(entry);
        return canonicalize(&roots, entry, &self.config.layout, self.names);
    }

    /// Process one template: resolve its partials, rewrite them to canonical
    /// identifiers, compile, and wrap the result as a module.
    ///
    /// `entry` should be absolute so it shares a prefix with the roots.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnresolvedReference` or `Error::IdentityMismatch` from
    /// resolution, `Error::InvalidSpan` from rewriting, or `Error::Compile`
    /// (and friends) from the compiler. The first error stops the file.
    pub fn process(&self, source: &str, entry: &Path) -> Result<CompiledModule, Error> {
        let result = self.run_stages(source, entry);
        if let Err(e) = &result {
            tracing::debug!(template = %entry.display(), stage = %Stage::Failed, error = %e);
        }
        return result;
    }

    /// Resolve every reference in scan order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn resolve_all(
        &self,
        references: Vec<Reference>,
        entry: &Path,
    ) -> Result<Vec<ResolvedReference>, Error> {
        let roots = self.config.roots_for(entry);
        let context = entry.parent().unwrap_or_else(|| return Path::new("."));

        let mut resolved = Vec::with_capacity(references.len());
        for reference in references {
            tracing::trace!(reference = reference.target.as_written(), offset = reference.offset, "resolving");
            let (path, identifier) = match &reference.target {
                ReferenceTarget::Concrete(name) => self.resolve_concrete(name, &roots, entry)?,
                ReferenceTarget::Module(request) => {
                    self.resolve_module(request, context, &roots, entry)?
                },
            };
            resolved.push(ResolvedReference {
                identifier,
                path,
                reference,
            });
        }
        return Ok(resolved);
    }

    /// Resolve a bare identifier and check it names the file it finds.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnresolvedReference` or `Error::IdentityMismatch`.
    fn resolve_concrete(
        &self,
        name: &str,
        roots: &[PathBuf],
        entry: &Path,
    ) -> Result<(PathBuf, String), Error> {
        let layout = &self.config.layout;
        let path = resolve_partial(name, roots, layout).ok_or_else(|| {
            return Error::UnresolvedReference {
                from: entry.to_path_buf(),
                name: name.to_string(),
            };
        })?;

        let canonical = canonicalize(roots, &path, layout, self.names);
        if canonical != name {
            return Err(Error::IdentityMismatch {
                canonical,
                path,
                written: name.to_string(),
            });
        }
        return Ok((path, canonical));
    }

    /// Resolve a quoted request through the module resolver and name the result.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnresolvedReference` if the resolver finds nothing.
    fn resolve_module(
        &self,
        request: &str,
        context: &Path,
        roots: &[PathBuf],
        entry: &Path,
    ) -> Result<(PathBuf, String), Error> {
        let path = self.modules.resolve(context, request).ok_or_else(|| {
            return Error::UnresolvedReference {
                from: entry.to_path_buf(),
                name: request.to_string(),
            };
        })?;
        let identifier = canonicalize(roots, &path, &self.config.layout, self.names);
        return Ok((path, identifier));
    }

    /// The happy path of [`Pipeline::process`], one stage after another.
    ///
    /// # Errors
    ///
    /// Propagates the first stage error.
    fn run_stages(&self, source: &str, entry: &Path) -> Result<CompiledModule, Error> {
        let template = entry.display();

        let references = scan(source);
        tracing::debug!(%template, stage = %Stage::Scanned, references = references.len());

        tracing::debug!(%template, stage = %Stage::Resolving);
        let resolved = self.resolve_all(references, entry)?;

        tracing::debug!(%template, stage = %Stage::Rewriting);
        let rewritten = rewrite(source, &resolved)?;

        let identifier = self.identifier_for(entry);
        let body = self.compiler.compile(&rewritten, &identifier)?;
        let dependencies = distinct_dependencies(&resolved);
        let code = assemble_module(&self.config.runtime, &dependencies, &body, &identifier);
        tracing::debug!(%template, stage = %Stage::Compiled, %identifier);

        return Ok(CompiledModule {
            code,
            dependencies,
            identifier,
        });
    }
}

/// Runtime preamble, one `require` per dependency, the compiled body, and
/// the exported identifier.
pub fn assemble_module(
    runtime: &str,
    dependencies: &[PathBuf],
    body: &str,
    identifier: &str,
) -> String {
    let mut out = format!("var dust = require({});\n", js_string(runtime));
    for dependency in dependencies {
        let _ = writeln!(out, "require({});", js_string(&dependency.to_string_lossy()));
    }
    let _ = writeln!(out, "{body}");
    let _ = writeln!(out, "module.exports = {};", js_string(identifier));
    return out;
}

/// Resolved paths with duplicates removed, first occurrence kept.
fn distinct_dependencies(resolved: &[ResolvedReference]) -> Vec<PathBuf> {
    let mut seen: Vec<PathBuf> = Vec::new();
    for reference in resolved {
        if !seen.contains(&reference.path) {
            seen.push(reference.path.clone());
        }
    }
    return seen;
}
