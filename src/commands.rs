//! CLI commands for dustlink: compile, build, name, resolve, deps.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use walkdir::WalkDir;

use crate::compiler::{CommandCompiler, RuntimeCompiler, TemplateCompiler};
use crate::config::{Config, absolute_path};
use crate::diagnostics;
use crate::error::Error;
use crate::modules::FsModuleResolver;
use crate::naming::NameRegistry;
use crate::pipeline::Pipeline;
use crate::resolver::resolve_partial;
use crate::types::CompiledModule;

/// Outcome of building every template once.
pub struct BuildReport {
    /// Templates that failed, with their errors already printed.
    pub failed: usize,
    /// Templates written to the output directory.
    pub written: usize,
}

impl BuildReport {
    /// Exit code for the report: 1 if anything failed.
    pub fn exit_code(&self) -> ExitCode {
        if self.failed > 0 {
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }
}

/// JSON shape printed by `deps --json`.
#[derive(Serialize)]
struct DependencyListing {
    /// Resolved files the template depends on.
    dependencies: Vec<PathBuf>,
    /// The template's canonical identifier.
    identifier: String,
    /// The template file itself.
    template: PathBuf,
}

/// One build session: configuration, collaborators, and the synthetic name
/// registry shared by every template processed in it.
pub struct Session {
    /// Template compiler chosen by config.
    compiler: Box<dyn TemplateCompiler>,
    /// Loaded configuration.
    config: Config,
    /// Module-style request lookup.
    modules: FsModuleResolver,
    /// Synthetic names for templates outside all roots.
    names: NameRegistry,
}

impl Session {
    /// Read and process one template file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the template is missing, or any
    /// pipeline error.
    pub fn compile_file(&self, path: &Path) -> Result<CompiledModule, Error> {
        let source = read_template(path)?;
        return self.pipeline().process(&source, path);
    }

    /// Session configuration.
    pub const fn config(&self) -> &Config {
        return &self.config;
    }

    /// Set up collaborators from config. The compiler is the configured
    /// command, or the runtime compiler when none is configured.
    pub fn new(config: Config) -> Self {
        let compiler: Box<dyn TemplateCompiler> = match CommandCompiler::from_argv(&config.compiler) {
            Some(command) => Box::new(command),
            None => Box::new(RuntimeCompiler),
        };
        let modules = FsModuleResolver::new(config.layout.clone(), config.module_dirs.clone());

        return Self {
            compiler,
            config,
            modules,
            names: NameRegistry::default(),
        };
    }

    /// A pipeline borrowing this session's collaborators.
    pub fn pipeline(&self) -> Pipeline<'_> {
        return Pipeline {
            compiler: self.compiler.as_ref(),
            config: &self.config,
            modules: &self.modules,
            names: &self.names,
        };
    }
}

/// Compile every template under the roots into `out_dir`.
/// A failing template is reported and skipped; the rest still build.
///
/// # Errors
///
/// Returns `Error::Io` if the output directory cannot be written.
pub fn build(session: &Session, out_dir: &Path) -> Result<BuildReport, Error> {
    let templates = collect_templates(session);
    let mut report = BuildReport { failed: 0, written: 0 };
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    for template in &templates {
        let module = match session.compile_file(template) {
            Err(e) => {
                eprintln!("failed: {}", template.display());
                diagnostics::print_error(&e);
                report.failed = report.failed.saturating_add(1);
                continue;
            },
            Ok(m) => m,
        };

        if let Some(previous) = claimed.get(&module.identifier) {
            tracing::warn!(
                identifier = %module.identifier,
                first = %previous.display(),
                second = %template.display(),
                "two templates share one identifier; the later one wins"
            );
        }

        write_module(out_dir, &module)?;
        claimed.insert(module.identifier, template.clone());
        report.written = report.written.saturating_add(1);
    }

    eprintln!(
        "Built {} templates into {} ({} failed)",
        report.written,
        out_dir.display(),
        report.failed
    );
    return Ok(report);
}

/// Every template file under the session roots, each listed once even when
/// roots nest. Module directories are not descended into.
fn collect_templates(session: &Session) -> BTreeSet<PathBuf> {
    let config = session.config();
    let mut templates = BTreeSet::new();

    for root in &config.roots {
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            return !(entry.file_type().is_dir() && config.module_dirs.iter().any(|d| return *d == name));
        });

        for entry in walker.filter_map(Result::ok) {
            let is_template = entry.file_type().is_file()
                && config.layout.has_extension(&entry.file_name().to_string_lossy());
            if is_template {
                templates.insert(entry.into_path());
            }
        }
    }

    return templates;
}

/// Compile one template and print it, or write it to `output`.
///
/// # Errors
///
/// Returns pipeline errors, or `Error::Io` if the output cannot be written.
pub fn compile(session: &Session, file: &Path, output: Option<&Path>) -> Result<(), Error> {
    let module = session.compile_file(&absolute_path(file))?;

    match output {
        None => print!("{}", module.code),
        Some(path) => {
            std::fs::write(path, &module.code)?;
            eprintln!(
                "Wrote `{}` to {} ({} dependencies)",
                module.identifier,
                path.display(),
                module.dependencies.len()
            );
        },
    }
    return Ok(());
}

/// List the files a template depends on, as lines or JSON.
///
/// # Errors
///
/// Returns `Error::FileNotFound`, resolution errors, or `Error::Json`.
pub fn deps(session: &Session, file: &Path, json: bool) -> Result<(), Error> {
    let template = absolute_path(file);
    let source = read_template(&template)?;
    let pipeline = session.pipeline();
    let dependencies = pipeline.dependencies(&source, &template)?;

    if json {
        let listing = DependencyListing {
            dependencies,
            identifier: pipeline.identifier_for(&template),
            template,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for dependency in &dependencies {
            println!("{}", dependency.display());
        }
    }
    return Ok(());
}

/// Print the canonical identifier of a template file.
pub fn name(session: &Session, file: &Path) {
    let identifier = session.pipeline().identifier_for(&absolute_path(file));
    println!("{identifier}");
}

/// Read a template, mapping a missing file to `Error::FileNotFound`.
///
/// # Errors
///
/// Returns `Error::FileNotFound` or `Error::Io`.
fn read_template(path: &Path) -> Result<String, Error> {
    return match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(Error::Io(e)),
        Ok(source) => Ok(source),
    };
}

/// Print the file a canonical identifier denotes.
///
/// # Errors
///
/// Returns `Error::UnresolvedReference` if no root has a match.
pub fn resolve(session: &Session, identifier: &str) -> Result<(), Error> {
    let config = session.config();
    let path = resolve_partial(identifier, &config.roots, &config.layout).ok_or_else(|| {
        return Error::UnresolvedReference {
            from: PathBuf::from("<command line>"),
            name: identifier.to_string(),
        };
    })?;
    println!("{}", path.display());
    return Ok(());
}

/// Write a compiled module as `<out_dir>/<identifier>.js`.
///
/// # Errors
///
/// Returns `Error::Io` if the directory or file cannot be written.
fn write_module(out_dir: &Path, module: &CompiledModule) -> Result<(), Error> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}.js", module.identifier));
    std::fs::write(&path, &module.code)?;
    tracing::debug!(path = %path.display(), "wrote module");
    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn session_for(dir: &TempDir, files: &[(&str, &str)]) -> Session {
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
        }
        let config = Config::load(dir.path())
            .unwrap()
            .override_roots(&[dir.path().join("templates")]);
        return Session::new(config);
    }

    #[test]
    fn build_writes_one_module_per_template() {
        let dir = TempDir::new().unwrap();
        let session = session_for(&dir, &[
            ("templates/home/index.dust", "{>shared-header/}"),
            ("templates/shared/header.dust", "<h1>{title}</h1>"),
        ]);
        let out = dir.path().join("out");

        let report = build(&session, &out).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 0);

        let home = fs::read_to_string(out.join("home.js")).unwrap();
        assert!(home.contains("module.exports = \"home\";"));
        assert!(out.join("shared-header.js").is_file());
    }

    #[test]
    fn build_keeps_going_after_a_failure() {
        let dir = TempDir::new().unwrap();
        let session = session_for(&dir, &[
            ("templates/bad.dust", "{>missing/}"),
            ("templates/good.dust", "fine"),
        ]);
        let out = dir.path().join("out");

        let report = build(&session, &out).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.written, 1);
        assert!(out.join("good.js").is_file());
        assert!(!out.join("bad.js").exists());
    }

    #[test]
    fn rootless_build_names_templates_from_one_shared_root() {
        let dir = TempDir::new().unwrap();
        for (path, content) in [
            ("a/index.dust", "<a/>"),
            ("a/x.dust", "x"),
            ("b/index.dust", "{>a-x/}"),
        ] {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
        }
        let config = Config::load(dir.path()).unwrap().with_fallback_root(dir.path());
        let session = Session::new(config);
        let out = dir.path().join("out");

        let report = build(&session, &out).unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(report.written, 3);
        assert!(out.join("a.js").is_file());
        assert!(out.join("a-x.js").is_file());
        let b = fs::read_to_string(out.join("b.js")).unwrap();
        assert!(b.contains("module.exports = \"b\";"));
        assert!(!out.join("index.js").exists());
    }

    #[test]
    fn collect_skips_module_dirs_and_other_files() {
        let dir = TempDir::new().unwrap();
        let session = session_for(&dir, &[
            ("templates/a.dust", ""),
            ("templates/notes.txt", ""),
            ("templates/node_modules/pkg/b.dust", ""),
        ]);
        let templates: Vec<PathBuf> = collect_templates(&session).into_iter().collect();
        assert_eq!(templates, [dir.path().join("templates/a.dust")]);
    }

    #[test]
    fn missing_template_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let session = session_for(&dir, &[]);
        let missing = dir.path().join("templates/none.dust");
        assert!(matches!(
            session.compile_file(&missing),
            Err(Error::FileNotFound { .. })
        ));
    }
}
