//! Declarative chart descriptors
//!
//! Serialized verbatim into the report as Chart.js configuration objects.

use serde::Serialize;
use serde_json::json;

/// Series colour pair (fill, stroke)
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub fill: &'static str,
    pub stroke: &'static str,
}

pub const REST: Palette = Palette {
    fill: "rgba(239, 68, 68, 0.15)",
    stroke: "#ef4444",
};
pub const GRAPHQL: Palette = Palette {
    fill: "rgba(59, 130, 246, 0.15)",
    stroke: "#3b82f6",
};
pub const COLD: Palette = Palette {
    fill: "rgba(249, 115, 22, 0.15)",
    stroke: "#f97316",
};
pub const WARM: Palette = Palette {
    fill: "rgba(16, 185, 129, 0.15)",
    stroke: "#10b981",
};
pub const MIXED: Palette = Palette {
    fill: "rgba(168, 85, 247, 0.15)",
    stroke: "#a855f7",
};

/// Chart type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub border_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, data: Vec<f64>, palette: Palette) -> Self {
        Self {
            label: label.into(),
            data: data.into_iter().map(round2).collect(),
            background_color: palette.fill,
            border_color: palette.stroke,
            border_width: 2,
            fill: None,
            tension: None,
        }
    }

    /// Filled, smoothed line style
    pub fn area(mut self) -> Self {
        self.fill = Some(true);
        self.tension = Some(0.3);
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Chart.js configuration
#[derive(Clone, Debug, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: serde_json::Value,
}

/// A chart placed in a report section
#[derive(Clone, Debug)]
pub struct Chart {
    /// Canvas element id
    pub id: &'static str,
    pub title: String,
    pub spec: ChartSpec,
}

impl Chart {
    pub fn new(
        id: &'static str,
        title: impl Into<String>,
        kind: ChartKind,
        labels: &[&str],
        datasets: Vec<Dataset>,
        y_axis: Option<&str>,
    ) -> Self {
        let options = match y_axis {
            Some(unit) => json!({
                "responsive": true,
                "plugins": { "legend": { "position": "bottom" } },
                "scales": { "y": { "title": { "display": true, "text": unit } } }
            }),
            None => json!({
                "responsive": true,
                "plugins": { "legend": { "position": "bottom" } }
            }),
        };

        Self {
            id,
            title: title.into(),
            spec: ChartSpec {
                kind,
                data: ChartData {
                    labels: labels.iter().map(|l| l.to_string()).collect(),
                    datasets,
                },
                options,
            },
        }
    }

    /// Script statement instantiating the chart
    pub fn render_script(&self) -> String {
        let config = serde_json::to_string(&self.spec).unwrap_or_else(|_| "{}".to_string());
        format!(
            "new Chart(document.getElementById('{}'), {});",
            self.id, config
        )
    }
}

/// Round to two decimals so embedded literals stay short and stable
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_script_is_declarative_json() {
        let chart = Chart::new(
            "latencyAvgChart",
            "Average Latency",
            ChartKind::Bar,
            &["Average", "Median"],
            vec![Dataset::new("REST Waterfall", vec![12.345, 10.0], REST)],
            Some("Milliseconds"),
        );

        let script = chart.render_script();
        assert!(script.starts_with("new Chart(document.getElementById('latencyAvgChart'), {"));
        assert!(script.contains(r#""type":"bar""#));
        assert!(script.contains(r#""data":[12.35,10.0]"#));
        assert!(script.contains(r##""borderColor":"#ef4444""##));
        assert!(script.contains(r#""text":"Milliseconds""#));
    }

    #[test]
    fn test_area_style() {
        let ds = Dataset::new("Cold Cache", vec![1.0], COLD).area();
        let json = serde_json::to_value(&ds).unwrap();
        assert_eq!(json["fill"], true);
        assert_eq!(json["tension"], 0.3);
    }
}
