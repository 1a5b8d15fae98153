use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::{Reference, ReferenceTarget};

/// Marker that makes a quoted partial name depend on runtime data.
const INTERPOLATION_MARKER: char = '{';

/// `{>"quoted/request"` or `{>bare-identifier`, with optional whitespace after `{>`.
/// Group 1 is the quoted form including its quotes, group 2 its contents,
/// group 3 the bare form.
static PARTIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"\{>\s*(?:("([^"]*)")|([A-Za-z0-9_$][\w$\-]*))"#).expect("valid regex");
});

/// Find every partial reference in a template, left to right.
///
/// Quoted names containing `{` are computed at render time and cannot be
/// resolved statically; they are skipped and stay untouched in the output.
/// Spans never overlap and are strictly increasing.
pub fn scan(source: &str) -> Vec<Reference> {
    return PARTIAL_PATTERN
        .captures_iter(source)
        .filter_map(|cap| return parse_partial_capture(&cap))
        .collect();
}

/// Turn one regex match into a reference, or `None` for interpolated names.
fn parse_partial_capture(cap: &Captures<'_>) -> Option<Reference> {
    if let (Some(quoted), Some(inner)) = (cap.get(1), cap.get(2)) {
        let request = inner.as_str();
        if request.contains(INTERPOLATION_MARKER) {
            tracing::debug!(
                offset = quoted.start(),
                request,
                "skipping interpolated partial name"
            );
            return None;
        }
        return Some(Reference {
            length: quoted.len(),
            offset: quoted.start(),
            target: ReferenceTarget::Module(request.to_string()),
        });
    }

    let bare = cap.get(3)?;
    return Some(Reference {
        length: bare.len(),
        offset: bare.start(),
        target: ReferenceTarget::Concrete(bare.as_str().to_string()),
    });
}
