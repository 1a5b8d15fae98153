//! Module-style partial requests (`"./widgets/clock"`, `"shared/header"`).
//! The hierarchy is explicit in the request, so resolution is a handful of
//! existence probes rather than a segmentation search.

use std::path::{Component, Path, PathBuf};

use crate::types::TemplateLayout;

/// Host-side lookup of a module request relative to the requesting template.
pub trait ModuleResolver {
    /// Resolve `request` as seen from `context` (the requesting template's
    /// directory). `None` means nothing matched.
    fn resolve(&self, context: &Path, request: &str) -> Option<PathBuf>;
}

/// Filesystem resolver following package-manager conventions: relative and
/// absolute requests are joined to the context, anything else is searched in
/// module directories (`node_modules`) of every ancestor.
#[derive(Debug, Clone)]
pub struct FsModuleResolver {
    /// Template naming rules.
    layout: TemplateLayout,
    /// Directory names searched for package-like requests.
    module_dirs: Vec<String>,
}

impl FsModuleResolver {
    /// Build a resolver for the given layout and module directory names.
    pub const fn new(layout: TemplateLayout, module_dirs: Vec<String>) -> Self {
        return Self { layout, module_dirs };
    }

    /// Probe `<base>.<ext>`, then `<base>` itself, then `<base>/<default>.<ext>`.
    fn probe_template(&self, base: &Path) -> Option<PathBuf> {
        let with_extension = base
            .file_name()
            .map(|name| return base.with_file_name(self.layout.file_name(&name.to_string_lossy())));
        if let Some(candidate) = with_extension
            && candidate.is_file()
        {
            return Some(candidate);
        }

        let literal_is_template = base
            .file_name()
            .is_some_and(|name| return self.layout.has_extension(&name.to_string_lossy()));
        if literal_is_template && base.is_file() {
            return Some(base.to_path_buf());
        }

        let default_file = base.join(self.layout.default_file_name());
        if default_file.is_file() {
            return Some(default_file);
        }

        return None;
    }

    /// Search module directories of `context` and each of its ancestors.
    fn resolve_package(&self, context: &Path, request: &str) -> Option<PathBuf> {
        for ancestor in context.ancestors() {
            for module_dir in &self.module_dirs {
                let base = normalize_path(&ancestor.join(module_dir).join(request));
                if let Some(found) = self.probe_template(&base) {
                    return Some(found);
                }
            }
        }
        return None;
    }
}

impl ModuleResolver for FsModuleResolver {
    fn resolve(&self, context: &Path, request: &str) -> Option<PathBuf> {
        let found = if is_relative_request(request) || Path::new(request).is_absolute() {
            self.probe_template(&normalize_path(&context.join(request)))
        } else {
            self.resolve_package(context, request)
        };
        tracing::debug!(request, context = %context.display(), found = ?found, "module lookup");
        return found;
    }
}

/// `./x`, `../x`, or a bare `.` / `..`.
fn is_relative_request(request: &str) -> bool {
    return request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
        || request.starts_with(".\\")
        || request.starts_with("..\\");
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(components.last(), Some(Component::Normal(_)));
            if can_pop {
                components.pop();
            } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                components.push(component);
            }
        },
        other @ (Component::Normal(_) | Component::Prefix(_) | Component::RootDir) => {
            components.push(other);
        },
    }
}
