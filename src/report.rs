use serde::{Deserialize, Serialize};

use crate::explain::{explain, ExplanationResult};
use crate::metrics::{StudentMetrics, FEATURE_ORDER_FALLBACK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Html,
}

/// Prediction plus commentary, ready for either JSON or the result page.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub prediction: String,
    pub inputs: StudentMetrics,
    pub explanation: ExplanationResult,
}

impl PredictionReport {
    pub fn build(prediction: String, inputs: StudentMetrics) -> Self {
        Self {
            prediction,
            explanation: explain(&inputs),
            inputs,
        }
    }

    pub fn to_html(&self) -> String {
        let inputs: String = FEATURE_ORDER_FALLBACK
            .iter()
            .map(|f| {
                format!(
                    "<tr><th>{}</th><td>{}</td></tr>",
                    escape(f.form_label()),
                    self.inputs.get(*f)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Student Performance Result</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>Predicted outcome: <span class="prediction">{prediction}</span></h1>
        <table>{inputs}</table>
        <h3>Performance trend</h3>
        {trend}
        <h3>Weaknesses</h3>
        {weaknesses}
        <h3>Suggestions</h3>
        {suggestions}
        <p><a href="/">Predict another student</a></p>
    </div>
</body>
</html>
"#,
            prediction = escape(&self.prediction),
            trend = list(&self.explanation.trend),
            weaknesses = list(&self.explanation.weaknesses),
            suggestions = list(&self.explanation.suggestions),
        )
    }
}

const STYLE: &str = "body { font-family: Arial, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; } \
    .container { background: #f5f5f5; padding: 25px; border-radius: 10px; } \
    .form-group { margin: 15px 0; } \
    label { display: block; margin-bottom: 5px; font-weight: bold; } \
    input { width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; } \
    button { background: #007bff; color: white; padding: 12px 24px; border: none; border-radius: 4px; cursor: pointer; } \
    th, td { padding: 6px 10px; text-align: left; border-bottom: 1px solid #ddd; }";

fn list(items: &[String]) -> String {
    let entries: String = items
        .iter()
        .map(|item| format!("<li>{}</li>", escape(item)))
        .collect();
    format!("<ul>{}</ul>", entries)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Entry form posting the eight labelled fields to `/predict`.
pub fn form_page() -> String {
    let fields: String = FEATURE_ORDER_FALLBACK
        .iter()
        .map(|f| {
            let label = escape(f.form_label());
            format!(
                r#"<div class="form-group"><label>{label}<input type="number" step="any" name="{label}" required></label></div>"#
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Student Performance Predictor</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>Student Performance Predictor</h1>
        <p>Enter the student's marks and habits to predict the academic outcome:</p>
        <form method="post" action="/predict?format=html">
            {fields}
            <button type="submit">Predict</button>
        </form>
    </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_engine_output() {
        let inputs = StudentMetrics { g1: 8.0, g2: 10.0, g3: 12.0, studytime: 3.0, traveltime: 1.0, freetime: 2.0, absences: 2.0, failures: 0.0 };
        let report = PredictionReport::build("Pass".to_string(), inputs);
        assert_eq!(report.explanation, explain(&inputs));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["prediction"], "Pass");
        assert_eq!(json["inputs"]["g3"], 12.0);
        assert_eq!(json["explanation"]["trend"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn html_lists_keep_order_and_escape() {
        let report = PredictionReport::build("<b>Pass</b>".to_string(), StudentMetrics::default());
        let html = report.to_html();

        assert!(html.contains("&lt;b&gt;Pass&lt;/b&gt;"));
        let low = html.find("Low studytime").unwrap();
        let weak = html.find("Weak initial performance").unwrap();
        assert!(low < weak);
        assert!(html.contains("<li>No change from Initial → Final</li>"));
    }

    #[test]
    fn form_posts_every_label() {
        let page = form_page();
        for feature in FEATURE_ORDER_FALLBACK {
            assert!(page.contains(&format!("name=\"{}\"", feature.form_label())));
        }
    }

    #[test]
    fn format_parses_lowercase() {
        let format: ResponseFormat = serde_json::from_str("\"html\"").unwrap();
        assert_eq!(format, ResponseFormat::Html);
    }
}
