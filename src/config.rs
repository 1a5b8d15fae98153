use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::TemplateLayout;

/// Name of the project config file looked up in the working directory.
pub const CONFIG_FILE: &str = "dustlink.toml";

/// Project configuration loaded from `dustlink.toml`.
/// All paths are absolute, resolved against the config file's directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// External compiler command, `{name}` substituted. Empty means the
    /// runtime compiler.
    pub compiler: Vec<String>,
    /// Template extension and default-file stem.
    pub layout: TemplateLayout,
    /// Directory names searched for package-like module requests.
    pub module_dirs: Vec<String>,
    /// Output directory for `build` and `watch`.
    pub out_dir: PathBuf,
    /// Template roots in priority order. Empty means "the template's own directory".
    pub roots: Vec<PathBuf>,
    /// Module required by every emitted preamble.
    pub runtime: String,
    /// Debug logging.
    pub verbose: bool,
}

/// Raw TOML structure for `dustlink.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DustlinkTomlConfig {
    #[serde(default)]
    compiler: Vec<String>,
    default: Option<String>,
    extension: Option<String>,
    module_dirs: Option<Vec<String>>,
    out_dir: Option<PathBuf>,
    path: Option<PathBuf>,
    #[serde(default)]
    paths: Vec<PathBuf>,
    runtime: Option<String>,
    #[serde(default)]
    verbose: bool,
}

impl Config {
    /// Build from the parsed TOML, resolving relative paths against `base`.
    fn from_raw(raw: DustlinkTomlConfig, base: &Path) -> Self {
        let defaults = TemplateLayout::default();
        let mut roots: Vec<PathBuf> = raw.path.into_iter().collect();
        roots.extend(raw.paths);

        return Self {
            compiler: raw.compiler,
            layout: TemplateLayout {
                default_stem: raw.default.unwrap_or(defaults.default_stem),
                extension: raw.extension.unwrap_or(defaults.extension),
            },
            module_dirs: raw.module_dirs.unwrap_or_else(default_module_dirs),
            out_dir: absolute_path(&base.join(raw.out_dir.unwrap_or_else(default_out_dir))),
            roots: roots.iter().map(|root| return absolute_path(&base.join(root))).collect(),
            runtime: raw.runtime.unwrap_or_else(default_runtime),
            verbose: raw.verbose,
        };
    }

    /// Load config from `dustlink.toml` in the given directory.
    /// Returns defaults if the file doesn't exist. Returns an error if the
    /// file exists but is malformed; never silently falls back to defaults
    /// when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::from_raw(empty_toml_config(), dir));
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let raw: DustlinkTomlConfig = toml::from_str(&content)?;
        return Ok(Self::from_raw(raw, dir));
    }

    /// Load an explicitly named config file. Unlike [`Config::load`], a
    /// missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures, or `Error::TomlDe` if malformed.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let raw: DustlinkTomlConfig = toml::from_str(&content)?;
        let base = path.parent().unwrap_or_else(|| return Path::new("."));
        return Ok(Self::from_raw(raw, base));
    }

    /// Replace the configured roots with roots given on the command line,
    /// if any were given. Relative roots resolve against the working directory.
    #[must_use]
    pub fn override_roots(mut self, roots: &[PathBuf]) -> Self {
        if !roots.is_empty() {
            self.roots = roots.iter().map(|root| return absolute_path(root)).collect();
        }
        return self;
    }

    /// Roots used for a template at `entry`: the configured roots, or the
    /// template's own directory when none are configured.
    pub fn roots_for(&self, entry: &Path) -> Vec<PathBuf> {
        if !self.roots.is_empty() {
            return self.roots.clone();
        }
        return entry.parent().map(Path::to_path_buf).into_iter().collect();
    }

    /// Use `dir` as the sole root when none are configured. Commands that
    /// work over a whole tree need one root set shared by every template, so
    /// that names and lookups agree across directories.
    #[must_use]
    pub fn with_fallback_root(mut self, dir: &Path) -> Self {
        if self.roots.is_empty() {
            self.roots = vec![absolute_path(dir)];
        }
        return self;
    }
}

/// Absolute form of `path` without touching the filesystem beyond the
/// working directory. Falls back to the path as given.
pub fn absolute_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_err| return path.to_path_buf());
    return crate::modules::normalize_path(&absolute);
}

/// Package lookup directories when none are configured.
fn default_module_dirs() -> Vec<String> {
    return vec!["node_modules".to_string()];
}

/// Build output directory when none is configured.
fn default_out_dir() -> PathBuf {
    return PathBuf::from("build").join("templates");
}

/// Runtime module when none is configured.
fn default_runtime() -> String {
    return "dustjs-linkedin".to_string();
}

/// The config equivalent to an absent `dustlink.toml`.
const fn empty_toml_config() -> DustlinkTomlConfig {
    return DustlinkTomlConfig {
        compiler: Vec::new(),
        default: None,
        extension: None,
        module_dirs: None,
        out_dir: None,
        path: None,
        paths: Vec::new(),
        runtime: None,
        verbose: false,
    };
}
