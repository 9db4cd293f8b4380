//! # General Route Handlers
//!
//! The upload form served at `/` and the health check.

use super::AppState;
use axum::{extract::State, response::Html};
use docgen::{ContextStrategy, Section};

/// Renders the upload form. The strategy select lists every context strategy,
/// with the configured one preselected.
pub async fn root(State(app_state): State<AppState>) -> Html<String> {
    Html(render_form(
        app_state.config.context.strategy,
        app_state.generator.sections(),
    ))
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

fn render_form(selected: ContextStrategy, sections: &[Section]) -> String {
    let options: String = ContextStrategy::ALL
        .iter()
        .map(|strategy| {
            let marker = if *strategy == selected { " selected" } else { "" };
            format!("<option value=\"{strategy}\"{marker}>{strategy}</option>")
        })
        .collect();
    let section_items: String = sections
        .iter()
        .map(|s| format!("<li>{}</li>", escape_html(&s.name)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Report Generator</title></head>
<body>
<h1>Report Generator</h1>
<p>Upload the company PDF and generate the report from the prompt catalog.</p>
<ul>{section_items}</ul>
<form action="/generate" method="post" enctype="multipart/form-data">
  <p><label>Source PDF <input type="file" name="file" accept="application/pdf"></label></p>
  <p><label>Context strategy <select name="strategy">{options}</select></label></p>
  <p><button type="submit">Generate</button></p>
</form>
<p><a href="/download">Download the last generated report</a></p>
</body>
</html>"#
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_preselects_configured_strategy() {
        let sections = vec![Section {
            name: "A. BUSINESS OPPORTUNITY & GROUP OVERVIEW".into(),
            prompt_sheet: "BO_Prompts".into(),
            format_sheet: "BO_Format_add".into(),
            assistant_id: "asst_bo".into(),
        }];
        let html = render_form(ContextStrategy::FileAttachment, &sections);

        assert!(html.contains(r#"<option value="file_attachment" selected>"#));
        assert!(html.contains(r#"<option value="none">"#));
        assert!(html.contains("BUSINESS OPPORTUNITY &amp; GROUP OVERVIEW"));
    }
}
