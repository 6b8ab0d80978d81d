//! Server-rendered HTML pages. Self-contained, no external assets.

use chrono::Datelike;

use crate::config::APP_NAME;
use crate::controller::ControllerSnapshot;
use crate::form::{FieldId, FieldKind};
use crate::models::{EvaluationResult, RiskBand};
use crate::navigation::Route;

pub const DISCLAIMER: &str = "CardioIA is a preventive awareness tool. Its results are not a formal \
medical diagnosis and do not replace an assessment by a health professional.";

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_header() -> String {
    format!(
        r#"<header class="header">
  <nav class="nav">
    <a class="logo" href="{home}">{app}</a>
    <a class="nav-link" href="{home}">Evaluation</a>
  </nav>
</header>"#,
        home = Route::Evaluation.path(),
        app = APP_NAME,
    )
}

fn render_footer() -> String {
    format!(
        r#"<footer class="footer">
  <p><strong>Important:</strong> {disclaimer}</p>
  <p>&copy; {year} {app}. All rights reserved.</p>
</footer>"#,
        disclaimer = DISCLAIMER,
        year = chrono::Utc::now().year(),
        app = APP_NAME,
    )
}

/// Wrap page content with the shared head, header and footer.
fn layout(title: &str, content: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | {app}</title>
<style>
*,*::before,*::after{{box-sizing:border-box}}
body{{margin:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#f8fafc;color:#1e293b;display:flex;flex-direction:column;min-height:100vh}}
.header{{background:#b91c1c;color:#fff}}
.nav{{max-width:960px;margin:0 auto;padding:16px 24px;display:flex;justify-content:space-between;align-items:center}}
.nav a{{color:#fff;text-decoration:none}}
.logo{{font-size:1.4rem;font-weight:700}}
main{{flex:1;max-width:960px;width:100%;margin:0 auto;padding:32px 24px}}
h2{{text-align:center;margin:0 0 8px}}
.intro{{text-align:center;max-width:700px;margin:0 auto 24px;color:#475569}}
.card{{background:#fff;border-radius:12px;box-shadow:0 4px 24px rgba(0,0,0,.06);padding:24px}}
.grid{{display:grid;grid-template-columns:repeat(auto-fill,minmax(260px,1fr));gap:16px}}
.field label{{display:block;font-weight:600;font-size:.9rem;margin-bottom:4px}}
.field input,.field select{{width:100%;padding:10px;border:1px solid #cbd5e1;border-radius:8px;font-size:1rem}}
.error-message{{background:#fef2f2;border:1px solid #fecaca;color:#b91c1c;border-radius:8px;padding:12px;margin:16px 0 0}}
.notice{{background:#fffbeb;border:1px solid #fde68a;border-radius:8px;padding:12px;margin:16px 0 0}}
.buttons{{display:flex;gap:12px;margin-top:24px}}
.btn{{padding:12px 20px;border:none;border-radius:8px;font-size:1rem;font-weight:600;cursor:pointer;text-decoration:none;display:inline-block}}
.btn-submit{{background:#b91c1c;color:#fff}}
.btn-clear{{background:#e2e8f0;color:#1e293b}}
.btn:disabled{{opacity:.6;cursor:default}}
.band{{font-size:1.5rem;font-weight:700;text-align:center;margin:8px 0}}
.band-low{{color:#15803d}}
.band-moderate{{color:#b45309}}
.band-high{{color:#b91c1c}}
.probability{{font-size:3rem;font-weight:700;text-align:center;margin:0}}
pre{{background:#f1f5f9;border-radius:8px;padding:12px;overflow:auto}}
.footer{{background:#1e293b;color:#cbd5e1;font-size:.85rem;text-align:center;padding:16px 24px}}
.footer p{{max-width:800px;margin:4px auto}}
</style>
</head>
<body>
{header}
<main>
{content}
</main>
{footer}
</body>
</html>"##,
        title = escape_html(title),
        app = APP_NAME,
        header = render_header(),
        content = content,
        footer = render_footer(),
    )
}

fn render_input(field: FieldId, value: &str) -> String {
    let key = field.key();
    let label = escape_html(field.label());
    let value = escape_html(value);

    let control = match field.kind() {
        FieldKind::Choice(options) => {
            let options: String = options
                .iter()
                .map(|(code, text)| {
                    let selected = if code.to_string() == value {
                        " selected"
                    } else {
                        ""
                    };
                    format!(r#"<option value="{code}"{selected}>{}</option>"#, escape_html(text))
                })
                .collect();
            format!(r#"<select id="{key}" name="{key}" required>{options}</select>"#)
        }
        FieldKind::Integer { min, max } => {
            let max = max.map(|m| format!(r#" max="{m}""#)).unwrap_or_default();
            format!(
                r#"<input type="number" id="{key}" name="{key}" value="{value}" step="1" min="{min}"{max} required>"#
            )
        }
        FieldKind::Number { min, .. } => format!(
            r#"<input type="number" id="{key}" name="{key}" value="{value}" step="any" min="{min}" required>"#
        ),
    };

    format!(r#"<div class="field"><label for="{key}">{label}</label>{control}</div>"#)
}

/// The evaluation form, reflecting the controller's current state.
pub fn render_form_page(snapshot: &ControllerSnapshot) -> String {
    let inputs: String = snapshot
        .form
        .iter()
        .map(|(field, value)| render_input(field, value))
        .collect::<Vec<_>>()
        .join("\n");

    let error = snapshot
        .last_error
        .as_deref()
        .map(|message| format!(r#"<p class="error-message" role="alert">{}</p>"#, escape_html(message)))
        .unwrap_or_default();

    let disabled = if snapshot.submit_enabled { "" } else { " disabled" };
    let reset_disabled = if snapshot.pending { " disabled" } else { "" };

    let content = format!(
        r##"<h2>Risk Evaluation</h2>
<p class="intro">Enter the clinical data below to estimate the risk of cardiovascular disease.</p>
<form id="evaluation-form" class="card" method="post" action="/evaluation" data-pending="{pending}">
<div class="grid">
{inputs}
</div>
{error}
<div class="buttons">
  <button type="submit" class="btn btn-submit"{disabled}>{label}</button>
  <button type="submit" class="btn btn-clear" formaction="/evaluation/reset" formnovalidate{reset_disabled}>Clear</button>
</div>
</form>
<script>
(function(){{
  var form=document.getElementById('evaluation-form');
  var inFlight=form.getAttribute('data-pending')==='true';
  form.addEventListener('submit',function(e){{
    if(e.submitter&&e.submitter.classList.contains('btn-clear'))return;
    if(inFlight){{e.preventDefault();return;}}
    inFlight=true;
    var submit=form.querySelector('.btn-submit');
    submit.disabled=true;
    submit.textContent='Calculating...';
  }});
}})();
</script>"##,
        pending = snapshot.pending,
        inputs = inputs,
        error = error,
        disabled = disabled,
        label = snapshot.submit_label,
        reset_disabled = reset_disabled,
    );

    layout("Evaluation", &content)
}

fn band_class(band: RiskBand) -> &'static str {
    match band {
        RiskBand::Low => "band band-low",
        RiskBand::Moderate => "band band-moderate",
        RiskBand::High => "band band-high",
    }
}

/// The result view. Unknown response shapes are shown as formatted JSON.
pub fn render_result_page(result: &EvaluationResult) -> String {
    let body = if let Some(message) = result.service_error() {
        format!(
            r#"<p class="notice">The prediction service could not evaluate the data: {}</p>"#,
            escape_html(message)
        )
    } else if let Some(assessment) = result.assessment() {
        let band = assessment.band();
        let factors = if assessment.influencing_factors.is_empty() {
            String::new()
        } else {
            let items: String = assessment
                .influencing_factors
                .iter()
                .map(|f| format!("<li>{}</li>", escape_html(f)))
                .collect();
            format!("<h3>Influencing factors</h3>\n<ul>{items}</ul>")
        };
        format!(
            r#"<p class="probability">{probability:.2}%</p>
<p class="{class}">{band}</p>
<p class="intro">Reported level: {level}</p>
{factors}"#,
            probability = assessment.probability,
            class = band_class(band),
            band = band.display_name(),
            level = escape_html(&assessment.risk_level),
            factors = factors,
        )
    } else {
        let pretty = serde_json::to_string_pretty(result.as_value())
            .unwrap_or_else(|_| result.as_value().to_string());
        format!("<pre>{}</pre>", escape_html(&pretty))
    };

    let content = format!(
        r#"<h2>Evaluation Result</h2>
<div class="card">
{body}
<div class="buttons"><a class="btn btn-submit" href="{home}">New evaluation</a></div>
</div>"#,
        body = body,
        home = Route::Evaluation.path(),
    );

    layout("Result", &content)
}

/// Generic page for shell failures. Never shows internal detail.
pub fn render_error_page(title: &str, message: &str) -> String {
    let content = format!(
        r#"<h2>{title}</h2>
<div class="card">
<p>{message}</p>
<div class="buttons"><a class="btn btn-submit" href="{home}">Back to the evaluation</a></div>
</div>"#,
        title = escape_html(title),
        message = escape_html(message),
        home = Route::Evaluation.path(),
    );
    layout(title, &content)
}
