//! Hierarchical resolution: recover the template file behind a flattened
//! identifier when its hyphens may be either directory boundaries or literal
//! characters in a file or directory name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::TemplateLayout;

/// Find the file an identifier denotes, trying `roots` in order.
///
/// Within a root the search prefers directory boundaries: `a-b-c` is first
/// tried as `a/b/c.dust`, then by descending into `a/`, and only then by
/// reading the first hyphen as literal (`a-b` + `c`). The first root with a
/// match wins; other roots are never consulted after that.
pub fn resolve_partial(
    identifier: &str,
    roots: &[PathBuf],
    layout: &TemplateLayout,
) -> Option<PathBuf> {
    let segments = split_identifier(identifier);

    for root in roots {
        let mut search = SegmentSearch::new(layout);
        if let Some(found) = search.run(root, segments.clone()) {
            tracing::debug!(identifier, path = %found.display(), probes = search.probes, "resolved partial");
            return Some(found);
        }
        tracing::trace!(identifier, root = %root.display(), "no match under root");
    }

    return None;
}

/// Backtracking search over `(cursor, segments)` states for one root.
struct SegmentSearch<'a> {
    /// States already known to fail, so sibling branches don't re-probe them.
    dead_ends: HashSet<(PathBuf, Vec<String>)>,
    /// Template naming rules.
    layout: &'a TemplateLayout,
    /// Filesystem probes issued so far.
    probes: u32,
}

impl<'a> SegmentSearch<'a> {
    /// Fresh search with an empty dead-end memo.
    fn new(layout: &'a TemplateLayout) -> Self {
        return Self {
            dead_ends: HashSet::new(),
            layout,
            probes: 0,
        };
    }

    /// `cursor/s0/.../sN.ext` if every segment is a usable path component.
    fn candidate_file(&self, cursor: &Path, segments: &[String]) -> Option<PathBuf> {
        let (last, dirs) = segments.split_last()?;
        if !segments.iter().all(|s| return is_plain_component(s)) {
            return None;
        }

        let mut path = cursor.to_path_buf();
        for dir in dirs {
            path.push(dir);
        }
        path.push(self.layout.file_name(last));
        return Some(path);
    }

    /// Descend into `cursor/segments[0]` when it is a directory.
    fn descend(&mut self, cursor: &Path, segments: &[String]) -> Option<PathBuf> {
        let (first, rest) = segments.split_first()?;
        if !is_plain_component(first) {
            return None;
        }

        let dir = cursor.join(first);
        if !self.probe_dir(&dir) {
            return None;
        }
        return self.run(&dir, rest.to_vec());
    }

    /// Whether `path` is an existing directory.
    fn probe_dir(&mut self, path: &Path) -> bool {
        self.probes = self.probes.saturating_add(1);
        let found = path.is_dir();
        tracing::trace!(path = %path.display(), found, "probe dir");
        return found;
    }

    /// Whether `path` is an existing file.
    fn probe_file(&mut self, path: &Path) -> bool {
        self.probes = self.probes.saturating_add(1);
        let found = path.is_file();
        tracing::trace!(path = %path.display(), found, "probe file");
        return found;
    }

    /// Resolve `segments` below `cursor`.
    fn run(&mut self, cursor: &Path, segments: Vec<String>) -> Option<PathBuf> {
        // A bare directory means its default file, never a deeper directory.
        if segments.is_empty() {
            let file = cursor.join(self.layout.default_file_name());
            return self.probe_file(&file).then_some(file);
        }

        let state = (cursor.to_path_buf(), segments);
        if self.dead_ends.contains(&state) {
            return None;
        }
        let (_, segments) = &state;

        if let Some(file) = self.candidate_file(cursor, segments)
            && self.probe_file(&file)
        {
            return Some(file);
        }

        if let Some(found) = self.descend(cursor, segments) {
            return Some(found);
        }

        if let Some(merged) = merge_leading_pair(segments)
            && let Some(found) = self.run(cursor, merged)
        {
            return Some(found);
        }

        self.dead_ends.insert(state);
        return None;
    }
}

/// Rejoin the first two segments with a literal hyphen.
fn merge_leading_pair(segments: &[String]) -> Option<Vec<String>> {
    let [first, second, rest @ ..] = segments else {
        return None;
    };

    let mut merged = Vec::with_capacity(rest.len().saturating_add(1));
    merged.push(format!("{first}-{second}"));
    merged.extend(rest.iter().cloned());
    return Some(merged);
}

/// Segments that could never name a child entry: empty, `.`, `..`, or
/// anything carrying a separator.
fn is_plain_component(segment: &str) -> bool {
    return !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\']);
}

/// Split an identifier on hyphens. The empty identifier has no segments.
fn split_identifier(identifier: &str) -> Vec<String> {
    if identifier.is_empty() {
        return Vec::new();
    }
    return identifier.split('-').map(String::from).collect();
}
