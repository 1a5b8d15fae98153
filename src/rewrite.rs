use crate::error::Error;
use crate::types::ResolvedReference;

/// Splice resolved identifiers into `source` in one left-to-right pass.
///
/// Every span is read against the original text at its scan-time offset.
/// Text between spans is copied verbatim, so interpolated partials and
/// anything else the scanner skipped survive untouched.
///
/// # Errors
///
/// Returns `Error::InvalidSpan` if a span runs past the end of `source`,
/// overlaps or precedes the previous span, or splits a UTF-8 character.
pub fn rewrite(source: &str, references: &[ResolvedReference]) -> Result<String, Error> {
    let mut output = String::with_capacity(source.len());
    let mut cursor = 0_usize;

    for resolved in references {
        let span = &resolved.reference;
        let invalid = || {
            return Error::InvalidSpan {
                length: span.length,
                offset: span.offset,
                source_len: source.len(),
            };
        };

        if span.offset < cursor {
            return Err(invalid());
        }
        let before = source.get(cursor..span.offset).ok_or_else(invalid)?;
        // The span itself must also land on character boundaries.
        source.get(span.offset..span.end()).ok_or_else(invalid)?;

        output.push_str(before);
        output.push_str(&resolved.identifier);
        cursor = span.end();
    }

    let tail = source.get(cursor..).unwrap_or_default();
    output.push_str(tail);
    return Ok(output);
}
