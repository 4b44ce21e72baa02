use std::fmt::Write;

use crate::model::ModelSummary;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const OPTIONS_PLACEHOLDER: &str = "{{MODEL_OPTIONS}}";

/// Index page with one `<option>` per declared model. Models whose artifact
/// was not found are listed but disabled.
pub fn render_index(models: &[ModelSummary]) -> String {
    let mut options = String::new();
    for model in models {
        let name = escape_html(&model.name);
        let label = match &model.description {
            Some(description) => format!("{name} ({})", escape_html(description)),
            None => name.clone(),
        };
        if model.available {
            let _ = writeln!(options, r#"            <option value="{name}">{label}</option>"#);
        } else {
            let _ = writeln!(
                options,
                r#"            <option value="{name}" disabled>{label} (unavailable)</option>"#
            );
        }
    }
    INDEX_TEMPLATE.replace(OPTIONS_PLACEHOLDER, options.trim_end())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
