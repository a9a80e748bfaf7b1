//! Server-side HTML for the rates page and the log view.

use crate::core::rate::{RateObservation, TIMESTAMP_FORMAT};
use crate::view::RatesView;
use std::fmt::Write;

const STYLE: &str = "body { font-family: sans-serif; padding: 20px; }
table { border-collapse: collapse; width: 100%; max-width: 1000px; margin: auto; }
th, td { border: 1px solid #ccc; padding: 8px 12px; text-align: center; }
th { background-color: #f4f4f4; }
footer { text-align: center; margin-top: 20px; color: #666; font-size: 0.9em; }";

pub fn escape(text: &str) -> String {
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

fn push_row(html: &mut String, cells: &[&str], tag: &str) {
    html.push_str("<tr>");
    for cell in cells {
        // Writing to a String cannot fail
        let _ = write!(html, "<{tag}>{}</{tag}>", escape(cell));
    }
    html.push_str("</tr>\n");
}

pub fn render_index(view: &RatesView) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Visa FX Tracker</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1 style=\"text-align:center;\">Visa FX Rate Tracker</h1>\n<table>\n"
    );
    push_row(
        &mut html,
        &[
            "Currency",
            "Currency Name",
            "Visa Rate",
            "Benchmark Rate",
            "Markup",
            "Trend",
        ],
        "th",
    );
    for row in &view.rows {
        push_row(
            &mut html,
            &[
                row.currency.as_str(),
                row.name.as_str(),
                row.visa_rate.as_str(),
                row.benchmark_rate.as_str(),
                row.markup.as_str(),
                row.trend.as_str(),
            ],
            "td",
        );
    }
    let _ = write!(
        html,
        "</table>\n<footer>\n<p>Last updated: {}</p>\n<p>\
         <a href=\"/export/csv\">Download CSV</a> | \
         <a href=\"/export/json\">Download JSON</a> | \
         <a href=\"/log/view\">View Log</a></p>\n</footer>\n</body>\n</html>\n",
        escape(&view.last_updated)
    );
    html
}

pub fn render_log(observations: &[RateObservation]) -> String {
    let mut html = String::from(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>FX Log</title>\n\
         </head>\n<body>\n<h2 style=\"text-align:center;\">FX Log</h2>\n\
         <table border=1 style=\"margin:auto; border-collapse:collapse;\">\n",
    );
    push_row(
        &mut html,
        &[
            "Timestamp",
            "Currency",
            "Name",
            "Visa",
            "Benchmark",
            "Markup %",
        ],
        "th",
    );
    for obs in observations {
        push_row(
            &mut html,
            &[
                obs.timestamp.format(TIMESTAMP_FORMAT).to_string().as_str(),
                obs.currency.as_str(),
                obs.currency_name.as_str(),
                obs.visa_rate.to_string().as_str(),
                obs.benchmark_rate.to_string().as_str(),
                obs.markup_percent.to_string().as_str(),
            ],
            "td",
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}
