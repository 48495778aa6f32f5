//! Named-parameter substitution for command templates.
//!
//! `{name}` is replaced by the parameter value, or by nothing when the
//! parameter is absent. `{{` and `}}` produce literal braces. A `{` that is
//! not closed before the end of the template is copied through unchanged.
//! Values are inserted verbatim; quoting is the template author's job.

use crate::core::task::Parameters;

/// Render `template` against `params`.
pub fn render_command(template: &str, params: &Parameters) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else if let Some(end) = tail.find('}') {
            let name = tail[1..end].trim();
            if let Some(value) = params.get(name) {
                out.push_str(value);
            }
            rest = &tail[end + 1..];
        } else {
            out.push_str(tail);
            rest = "";
        }
    }
    out.push_str(rest);
    out
}
