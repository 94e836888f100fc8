//! Run-time macros in cell text and URL templates.
//!
//! `${0}` is replaced by the original cell text. Any other `${name}` is
//! replaced by the result of querying attribute `name` for the cell's
//! property. A `?` prefix (`${?name}`) turns query failures into empty
//! text instead of aborting the report.

use tabula_core::{QueryRequest, ValueQuery};

use crate::error::ReportError;

/// Expand all macros in `template`
pub fn expand_macros(
    template: &str,
    original_text: &str,
    query: &dyn ValueQuery,
    request: &QueryRequest<'_>,
) -> Result<String, ReportError> {
    if !template.contains("${") {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            out.push(c);
            continue;
        }
        chars.next();
        // An unterminated macro runs to the end of the template
        let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
        if name == "0" {
            out.push_str(original_text);
            continue;
        }
        let (attribute, optional) = match name.strip_prefix('?') {
            Some(rest) => (rest, true),
            None => (name.as_str(), false),
        };
        let result = query.evaluate(&request.with_attribute(attribute));
        if result.ok {
            out.push_str(&result.display_text);
        } else if !optional {
            return Err(ReportError::Evaluation(result.error_message.unwrap_or_else(|| {
                format!("Cannot resolve macro '{}'", attribute)
            })));
        }
    }
    Ok(out)
}
