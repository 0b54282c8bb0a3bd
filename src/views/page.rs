use crate::model::{ChipsetBrand, FeatureRecord, FieldBounds, OsFamily, RangeError};
use crate::services::prediction_handler::PredictionOutcome;
use axum::response::Html;

const CAPTION: &str = "Estimate based on a model trained from a public smartphone specs dataset.";

const STYLE: &str = "body{font-family:sans-serif;max-width:42rem;margin:2rem auto;padding:0 1rem}\
form{display:grid;grid-template-columns:1fr 1fr;gap:.75rem 1.5rem}\
label{display:flex;flex-direction:column;gap:.25rem}\
.wide{grid-column:1/3}\
.result{padding:.75rem 1rem;border-radius:.5rem;margin-top:1.5rem}\
.success{background:#e6f4ea;color:#1e4620}\
.error{background:#fdecea;color:#611a15}\
.caption{color:#666;font-size:.85rem}\
pre.detail{background:#f6f6f6;padding:.75rem;overflow-x:auto}\
details{margin-top:2rem}";

/// What the result area shows after a submission.
pub enum ResultView<'a> {
    Outcome(&'a PredictionOutcome),
    Invalid(&'a RangeError),
    /// The submission could not be decoded at all.
    Rejected(&'a str),
}

pub fn render_page(title: &str, values: &FeatureRecord, result: Option<ResultView>) -> Html<String> {
    let mut body = String::new();
    let title = escape(title);

    body.push_str(&format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
         <title>{title}</title><style>{STYLE}</style></head><body>\
         <h1>{title}</h1>\
         <p>Enter key specs to estimate <strong>battery capacity (mAh)</strong>.</p>\
         <form method=\"post\" action=\"/\">"
    ));

    let os_options: Vec<(&str, bool)> = OsFamily::ALL
        .iter()
        .map(|os| (os.as_str(), *os == values.os_family))
        .collect();
    select(&mut body, "os_family", "OS", &os_options, "");
    number(&mut body, &FieldBounds::RAM_GB, format!("{}", values.ram_gb));

    let chipset_options: Vec<(&str, bool)> = ChipsetBrand::ALL
        .iter()
        .map(|brand| (brand.as_str(), *brand == values.chipset_brand))
        .collect();
    select(&mut body, "chipset_brand", "Chipset Brand", &chipset_options, "");
    number(
        &mut body,
        &FieldBounds::STORAGE_GB,
        format!("{}", values.storage_gb),
    );
    number(
        &mut body,
        &FieldBounds::SCREEN_IN,
        format!("{:.1}", values.screen_in),
    );
    number(
        &mut body,
        &FieldBounds::REFRESH_HZ,
        format!("{}", values.refresh_hz),
    );

    let five_g_options = [("no", values.supports_5g == 0), ("yes", values.supports_5g == 1)];
    select(&mut body, "supports_5g", "5G Support", &five_g_options, " wide");

    body.push_str("<button type=\"submit\" class=\"wide\">Predict</button></form>");

    match result {
        Some(ResultView::Outcome(PredictionOutcome::Predicted {
            capacity_mah,
            message,
        })) => {
            body.push_str(&format!(
                "<div class=\"result success\" data-capacity-mah=\"{capacity_mah}\">\
                 <strong>{}</strong></div><p class=\"caption\">{CAPTION}</p>",
                escape(message)
            ));
        }
        Some(ResultView::Outcome(PredictionOutcome::Failed { message, detail })) => {
            body.push_str(&format!(
                "<div class=\"result error\">{}</div><pre class=\"detail\">{}</pre>",
                escape(message),
                escape(detail)
            ));
        }
        Some(ResultView::Invalid(err)) => {
            body.push_str(&format!(
                "<div class=\"result error\">{}</div>",
                escape(&err.to_string())
            ));
        }
        Some(ResultView::Rejected(reason)) => {
            body.push_str(&format!(
                "<div class=\"result error\">The form could not be read.</div>\
                 <pre class=\"detail\">{}</pre>",
                escape(reason)
            ));
        }
        None => {}
    }

    body.push_str(
        "<details><summary>How this works</summary>\
         <p><strong>Model</strong>: a pipeline of one-hot encoding for OS and chipset \
         followed by a random forest regressor.</p>\
         <p><strong>Input features</strong>: OS family, chipset brand, RAM, storage, \
         screen size, refresh rate, and a 5G flag.</p>\
         <p><strong>Target</strong>: battery capacity (mAh).</p>\
         <p>The model is loaded once when the server starts and shared by every request.</p>\
         </details></body></html>",
    );

    Html(body)
}

fn select(body: &mut String, name: &str, label: &str, options: &[(&str, bool)], class: &str) {
    body.push_str(&format!(
        "<label class=\"field{class}\">{label}<select name=\"{name}\">"
    ));
    for (value, selected) in options {
        let selected = if *selected { " selected" } else { "" };
        body.push_str(&format!(
            "<option value=\"{value}\"{selected}>{value}</option>"
        ));
    }
    body.push_str("</select></label>");
}

fn number(body: &mut String, bounds: &FieldBounds, shown: String) {
    let step = bounds
        .step
        .map_or_else(|| "any".to_string(), |step| step.to_string());
    body.push_str(&format!(
        "<label class=\"field\">{}<input type=\"number\" name=\"{}\" min=\"{}\" max=\"{}\" \
         step=\"{}\" value=\"{}\" required></label>",
        bounds.label,
        bounds.name,
        bounds.min,
        bounds.max,
        step,
        escape(&shown)
    ));
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_has_form_and_help_panel() {
        let Html(page) = render_page("Phone Battery Estimator", &FeatureRecord::default(), None);
        assert!(page.contains("<title>Phone Battery Estimator</title>"));
        assert!(page.contains("<option value=\"android\" selected>android</option>"));
        assert!(page.contains("<option value=\"yes\" selected>yes</option>"));
        assert!(page.contains("name=\"screen_in\" min=\"3.5\" max=\"8.5\" step=\"0.1\" value=\"6.5\""));
        assert!(page.contains("name=\"storage_gb\" min=\"8\" max=\"1024\" step=\"any\" value=\"128\""));
        assert!(page.contains("<summary>How this works</summary>"));
        assert!(!page.contains("class=\"result"));
    }

    #[test]
    fn failure_detail_is_escaped() {
        let outcome = PredictionOutcome::Failed {
            message: "Prediction failed.".to_string(),
            detail: "column <os_family> & friends".to_string(),
        };
        let Html(page) = render_page(
            "t",
            &FeatureRecord::default(),
            Some(ResultView::Outcome(&outcome)),
        );
        assert!(page.contains("<pre class=\"detail\">column &lt;os_family&gt; &amp; friends</pre>"));
    }

    #[test]
    fn submitted_values_are_kept() {
        let values = FeatureRecord {
            os_family: OsFamily::Ios,
            chipset_brand: ChipsetBrand::Apple,
            screen_in: 6.1,
            supports_5g: 0,
            ..Default::default()
        };
        let Html(page) = render_page("t", &values, None);
        assert!(page.contains("<option value=\"ios\" selected>ios</option>"));
        assert!(page.contains("<option value=\"apple\" selected>apple</option>"));
        assert!(page.contains("<option value=\"no\" selected>no</option>"));
        assert!(page.contains("value=\"6.1\""));
    }

    fn attribute<'a>(input: &'a str, name: &str) -> &'a str {
        let start = input.find(&format!("{name}=\"")).unwrap() + name.len() + 2;
        let len = input[start..].find('"').unwrap();
        &input[start..start + len]
    }

    #[test]
    fn default_values_sit_on_the_step_grid() {
        let Html(page) = render_page("t", &FeatureRecord::default(), None);
        let inputs: Vec<&str> = page
            .split("<input ")
            .skip(1)
            .map(|rest| &rest[..rest.find('>').unwrap()])
            .collect();
        assert_eq!(inputs.len(), 4);
        for input in inputs {
            let name = attribute(input, "name");
            let step = attribute(input, "step");
            if step == "any" {
                continue;
            }
            let min: f64 = attribute(input, "min").parse().unwrap();
            let value: f64 = attribute(input, "value").parse().unwrap();
            let steps = (value - min) / step.parse::<f64>().unwrap();
            assert!(
                (steps - steps.round()).abs() < 1e-9,
                "{name} value {value} is {steps} steps from min {min}"
            );
        }
    }

    #[test]
    fn common_storage_sizes_are_accepted_by_the_widget() {
        let Html(page) = render_page("t", &FeatureRecord::default(), None);
        assert!(page.contains("name=\"storage_gb\" min=\"8\" max=\"1024\" step=\"any\""));
        assert_eq!(FieldBounds::STORAGE_GB.step, None);
    }

    #[test]
    fn rejected_submission_shows_reason() {
        let Html(page) = render_page(
            "t",
            &FeatureRecord::default(),
            Some(ResultView::Rejected("ram_gb: invalid float literal")),
        );
        assert!(page.contains("The form could not be read."));
        assert!(page.contains("<pre class=\"detail\">ram_gb: invalid float literal</pre>"));
    }
}
