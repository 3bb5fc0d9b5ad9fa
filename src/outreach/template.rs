use crate::outreach::types::OutreachError;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Substitutes `{name}` placeholders. Unknown placeholders are an error.
pub fn render(template: &str, values: &HashMap<String, String>) -> Result<String, OutreachError> {
    let mut missing = Vec::new();
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match values.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.push(key.to_string());
                caps[0].to_string()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(OutreachError::Template(format!(
            "unknown placeholder(s): {}",
            missing.join(", ")
        )))
    }
}
