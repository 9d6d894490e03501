//! Interactive scatter plots.
//!
//! Each chart is a standalone HTML page driving plotly.js from its CDN. Point
//! data is embedded as JSON, one trace per outlier class.

use crate::models::{ClassifiedRecord, OutlierClass};
use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// A scatter chart ready to render.
#[derive(Debug, Clone)]
pub struct ScatterPlot<'a> {
    /// Chart title.
    pub title: String,
    /// Points to draw.
    pub records: &'a [ClassifiedRecord],
}

/// One plotly trace.
#[derive(Debug, Serialize)]
struct Trace {
    name: &'static str,
    #[serde(rename = "type")]
    trace_type: &'static str,
    mode: &'static str,
    x: Vec<i32>,
    y: Vec<f64>,
    customdata: Vec<(String, i64)>,
    hovertemplate: String,
    marker: serde_json::Value,
}

fn build_trace(class: OutlierClass, records: &[ClassifiedRecord]) -> Option<Trace> {
    let points: Vec<&ClassifiedRecord> = records
        .iter()
        .filter(|r| r.outlier_class == class)
        .collect();

    if points.is_empty() {
        return None;
    }

    Some(Trace {
        name: class.label(),
        trace_type: "scatter",
        mode: "markers",
        x: points.iter().map(|r| r.height_cm).collect(),
        y: points.iter().map(|r| r.ace_percentage).collect(),
        customdata: points
            .iter()
            .map(|r| (r.name.clone(), r.total_matches))
            .collect(),
        hovertemplate: format!(
            "is_outlier={}<br>Height (cm)=%{{x}}<br>Ace Percentage=%{{y}}<br>name=%{{customdata[0]}}<br>total_matches=%{{customdata[1]}}<extra></extra>",
            class.label()
        ),
        marker: json!({ "color": class.color() }),
    })
}

/// Plotly data and layout for a chart.
pub fn plot_spec(plot: &ScatterPlot<'_>) -> serde_json::Value {
    let traces: Vec<Trace> = OutlierClass::ALL
        .iter()
        .filter_map(|class| build_trace(*class, plot.records))
        .collect();

    json!({
        "data": traces,
        "layout": {
            "title": { "text": plot.title },
            "xaxis": { "title": { "text": "Height (cm)" } },
            "yaxis": { "title": { "text": "Ace Percentage" } },
            "legend": { "title": { "text": "is_outlier" } },
            "hovermode": "closest",
        },
    })
}

/// Render a standalone HTML page for the chart.
pub fn render_scatter_html(plot: &ScatterPlot<'_>) -> String {
    let spec = plot_spec(plot).to_string();
    // Keep the payload from closing the script element early.
    let spec = spec.replace("</", "<\\/");

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&plot.title)));
    html.push_str(&format!("<script src=\"{}\"></script>\n", PLOTLY_CDN));
    html.push_str("</head>\n<body>\n");
    html.push_str("<div id=\"chart\" style=\"width:100%;height:90vh;\"></div>\n");
    html.push_str("<script>\n");
    html.push_str(&format!("const spec = {};\n", spec));
    html.push_str("Plotly.newPlot('chart', spec.data, spec.layout, {responsive: true});\n");
    html.push_str("</script>\n");
    html.push_str("</body>\n</html>\n");

    html
}

/// Render and write a chart.
pub fn write_scatter_html(plot: &ScatterPlot<'_>, path: &Path) -> Result<()> {
    std::fs::write(path, render_scatter_html(plot))?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, ht: i32, ace: f64, class: OutlierClass) -> ClassifiedRecord {
        ClassifiedRecord {
            name: name.to_string(),
            height_cm: ht,
            ace_percentage: ace,
            total_matches: 150,
            height_group: ht,
            group_mean: 0.1,
            group_std: 0.02,
            z_score: 0.0,
            outlier_class: class,
        }
    }

    fn sample() -> Vec<ClassifiedRecord> {
        vec![
            record("Normal One", 185, 0.10, OutlierClass::Normal),
            record("Normal Two", 188, 0.11, OutlierClass::Normal),
            record("Bomber", 208, 0.25, OutlierClass::HighOutlier),
            record("Pusher", 175, 0.01, OutlierClass::LowOutlier),
        ]
    }

    #[test]
    fn test_one_trace_per_present_class() {
        let records = sample();
        let plot = ScatterPlot {
            title: "Ace Percentage vs Height".to_string(),
            records: &records,
        };

        let spec = plot_spec(&plot);
        let data = spec["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["name"], "Normal");
        assert_eq!(data[0]["x"], json!([185, 188]));
        assert_eq!(data[0]["marker"]["color"], "#636EFA");
        assert_eq!(data[1]["name"], "High Outlier");
        assert_eq!(data[1]["marker"]["color"], "#EF553B");
        assert_eq!(data[2]["marker"]["color"], "#00CC96");
        assert_eq!(data[1]["customdata"], json!([["Bomber", 150]]));
    }

    #[test]
    fn test_absent_class_has_no_trace() {
        let records = vec![record("Only", 190, 0.1, OutlierClass::Normal)];
        let plot = ScatterPlot {
            title: "t".to_string(),
            records: &records,
        };

        let spec = plot_spec(&plot);
        assert_eq!(spec["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_render_html_contains_hover_fields() {
        let records = sample();
        let plot = ScatterPlot {
            title: "Ace <Percentage> vs Height".to_string(),
            records: &records,
        };

        let html = render_scatter_html(&plot);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("plotly"));
        assert!(html.contains("name=%{customdata[0]}"));
        assert!(html.contains("total_matches=%{customdata[1]}"));
        assert!(html.contains("<title>Ace &lt;Percentage&gt; vs Height</title>"));
        assert!(html.contains("Pusher"));
    }

    #[test]
    fn test_script_payload_cannot_close_tag() {
        let records = vec![record("</script><b>", 190, 0.1, OutlierClass::Normal)];
        let plot = ScatterPlot {
            title: "t".to_string(),
            records: &records,
        };

        let html = render_scatter_html(&plot);
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_write_scatter_html_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chart.html");
        let records = sample();
        let plot = ScatterPlot {
            title: "Ace Percentage vs Height".to_string(),
            records: &records,
        };

        write_scatter_html(&plot, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_scatter_html(&plot));
    }
}
