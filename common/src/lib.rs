pub mod config;
pub mod logger;

use validator::ValidationErrors;

/// Joins every field-level validation message into a single `; `-separated string.
///
/// Errors without a custom message fall back to `<field>: <code>` so nothing is dropped silently.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
