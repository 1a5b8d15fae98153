//! Canonical identifiers: flatten a template path under a root into a
//! hyphen-joined name such as `home-widgets-welcome`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

use crate::types::TemplateLayout;

/// Runs of path separators and whitespace collapse into one hyphen.
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"[/\\\s]+").expect("valid regex"));

/// Synthetic names for templates that live outside every root.
///
/// One registry belongs to one build session. The same absolute path always
/// maps to the same `anonymous<N>` name for the registry's lifetime, and the
/// counter only grows. Internally locked so parallel builds can share it.
#[derive(Debug, Default)]
pub struct NameRegistry {
    /// Counter and memo, guarded together so a path never gets two numbers.
    state: Mutex<RegistryState>,
}

/// Mutable half of [`NameRegistry`].
#[derive(Debug, Default)]
struct RegistryState {
    /// Path -> synthetic name already handed out.
    assigned: HashMap<PathBuf, String>,
    /// Next number to hand out.
    next: u64,
}

impl NameRegistry {
    /// Return the synthetic name for `path`, assigning a fresh one on first use.
    pub fn synthetic_name(&self, path: &Path) -> String {
        let key = std::path::absolute(path).unwrap_or_else(|_err| return path.to_path_buf());
        let mut state = self.state.lock();

        if let Some(name) = state.assigned.get(&key) {
            return name.clone();
        }

        let name = format!("anonymous{}", state.next);
        state.next = state.next.saturating_add(1);
        tracing::debug!(path = %key.display(), %name, "template outside all roots");
        state.assigned.insert(key, name.clone());
        return name;
    }
}

/// Canonical identifier for `path`, named relative to the first root that
/// contains it.
///
/// The default file (`index.dust`) is named after its directory; any other
/// template loses its extension. Paths outside every root get a synthetic
/// name from `registry`.
pub fn canonicalize(
    roots: &[PathBuf],
    path: &Path,
    layout: &TemplateLayout,
    registry: &NameRegistry,
) -> String {
    for root in roots {
        if let Ok(relative) = path.strip_prefix(root) {
            return name_relative_path(relative, layout);
        }
    }
    return registry.synthetic_name(path);
}

/// Flatten a root-relative template path.
fn name_relative_path(relative: &Path, layout: &TemplateLayout) -> String {
    let file_name = relative
        .file_name()
        .map(|name| return name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts: Vec<String> = relative
        .parent()
        .map(path_components_as_strings)
        .unwrap_or_default();

    if file_name == layout.default_file_name() {
        // A root's own default file has no directory to be named after.
        if parts.is_empty() {
            return layout.default_stem.clone();
        }
    } else {
        let stem = layout.strip_extension(&file_name).unwrap_or(&file_name);
        parts.push(stem.to_string());
    }

    let joined = parts.join("/");
    return SEPARATOR_RUN.replace_all(&joined, "-").into_owned();
}

/// Normal components of a relative path as strings.
fn path_components_as_strings(path: &Path) -> Vec<String> {
    return path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => return Some(part.to_string_lossy().into_owned()),
            Component::CurDir
            | Component::ParentDir
            | Component::Prefix(_)
            | Component::RootDir => return None,
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(roots: &[&str], path: &str) -> String {
        let roots: Vec<PathBuf> = roots.iter().map(PathBuf::from).collect();
        return canonicalize(
            &roots,
            Path::new(path),
            &TemplateLayout::default(),
            &NameRegistry::default(),
        );
    }

    #[test]
    fn nested_template_joins_with_hyphens() {
        assert_eq!(
            name(&["/app/dust"], "/app/dust/home/widgets/welcome.dust"),
            "home-widgets-welcome"
        );
    }

    #[test]
    fn default_file_takes_directory_name() {
        assert_eq!(name(&["/app/dust"], "/app/dust/widgets/index.dust"), "widgets");
        assert_eq!(name(&["/app/dust"], "/app/dust/home/widgets/index.dust"), "home-widgets");
    }

    #[test]
    fn root_default_file_is_named_after_the_stem() {
        assert_eq!(name(&["/app/dust"], "/app/dust/index.dust"), "index");
    }

    #[test]
    fn extension_is_stripped_case_insensitively() {
        assert_eq!(name(&["/app/dust"], "/app/dust/Header.DUST"), "Header");
    }

    #[test]
    fn whitespace_runs_become_single_hyphens() {
        assert_eq!(name(&["/app/dust"], "/app/dust/my  pages/top  bar.dust"), "my-pages-top-bar");
    }

    #[test]
    fn first_matching_root_wins() {
        let roots = ["/app/dust", "/app/dust/shared"];
        assert_eq!(name(&roots, "/app/dust/shared/header.dust"), "shared-header");
        let reversed = ["/app/dust/shared", "/app/dust"];
        assert_eq!(name(&reversed, "/app/dust/shared/header.dust"), "header");
    }

    #[test]
    fn root_prefix_must_match_whole_components() {
        let registry = NameRegistry::default();
        let roots = vec![PathBuf::from("/app/dust")];
        let named = canonicalize(
            &roots,
            Path::new("/app/dustbin/a.dust"),
            &TemplateLayout::default(),
            &registry,
        );
        assert_eq!(named, "anonymous0");
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let registry = NameRegistry::default();
        let layout = TemplateLayout::default();
        let roots = vec![PathBuf::from("/app/dust")];
        let path = Path::new("/app/dust/a/b.dust");
        let first = canonicalize(&roots, path, &layout, &registry);
        let second = canonicalize(&roots, path, &layout, &registry);
        assert_eq!(first, second);
    }

    #[test]
    fn synthetic_names_are_memoized_per_path() {
        let registry = NameRegistry::default();
        let layout = TemplateLayout::default();
        let roots = vec![PathBuf::from("/app/dust")];

        let a = canonicalize(&roots, Path::new("/elsewhere/a.dust"), &layout, &registry);
        let b = canonicalize(&roots, Path::new("/elsewhere/b.dust"), &layout, &registry);
        let a_again = canonicalize(&roots, Path::new("/elsewhere/a.dust"), &layout, &registry);

        assert_eq!(a, "anonymous0");
        assert_eq!(b, "anonymous1");
        assert_eq!(a_again, "anonymous0");
    }

    #[test]
    fn empty_root_list_always_synthesizes() {
        let registry = NameRegistry::default();
        let named = canonicalize(
            &[],
            Path::new("/app/dust/a.dust"),
            &TemplateLayout::default(),
            &registry,
        );
        assert_eq!(named, "anonymous0");
    }

    #[test]
    fn shared_registry_gives_each_path_one_unique_name_across_threads() {
        let registry = NameRegistry::default();
        let paths: Vec<PathBuf> = (0..4)
            .map(|i| return PathBuf::from(format!("/elsewhere/t{i}.dust")))
            .collect();
        let (registry, paths) = (&registry, &paths);

        let seen: Vec<(PathBuf, String)> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    return scope.spawn(move || {
                        let mut named = Vec::new();
                        for _ in 0..50 {
                            for path in paths {
                                named.push((path.clone(), registry.synthetic_name(path)));
                            }
                        }
                        return named;
                    });
                })
                .collect();
            return workers.into_iter().flat_map(|w| return w.join().unwrap()).collect();
        });

        let mut by_path: HashMap<PathBuf, String> = HashMap::new();
        for (path, name) in seen {
            let first = by_path.entry(path).or_insert_with(|| return name.clone());
            assert_eq!(*first, name);
        }
        let mut names: Vec<String> = by_path.into_values().collect();
        names.sort();
        assert_eq!(names, ["anonymous0", "anonymous1", "anonymous2", "anonymous3"]);
    }
}
