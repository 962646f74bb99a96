//! Bar chart of the top threat properties

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Error, Result};

use super::render::write_atomic;

/// Draws a labelled series to an image file
pub trait ChartRenderer: Send + Sync {
    /// Render `values` against `labels` (same length, same order) to `path`
    fn render(&self, title: &str, labels: &[String], values: &[i64], path: &Path) -> Result<()>;
}

const BAR_COLORS: [&str; 5] = ["red", "orange", "cyan", "blue", "green"];

/// Horizontal bar chart on a log-scaled x axis, written as SVG
#[derive(Debug, Clone)]
pub struct SvgBarChart {
    /// Image width in pixels
    pub width: u32,
    /// Height of one bar row
    pub bar_height: u32,
    /// Value axis caption
    pub x_label: String,
    /// Label axis caption
    pub y_label: String,
}

impl Default for SvgBarChart {
    fn default() -> Self {
        Self {
            width: 640,
            bar_height: 36,
            x_label: "Total Hits".to_string(),
            y_label: "Feed Name".to_string(),
        }
    }
}

// Layout
const LABEL_AREA: u32 = 180;
const MARGIN: u32 = 40;
const VALUE_AREA: u32 = 70;

impl SvgBarChart {
    /// SVG document for the series
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_svg(&self, title: &str, labels: &[String], values: &[i64]) -> Result<String> {
        if labels.len() != values.len() {
            return Err(Error::render(format!(
                "chart has {} labels but {} values",
                labels.len(),
                values.len()
            )));
        }

        let plot_width = self.width.saturating_sub(LABEL_AREA + MARGIN + VALUE_AREA).max(1);
        let rows = u32::try_from(values.len()).unwrap_or(u32::MAX);
        let height = 2 * MARGIN + rows.max(1) * self.bar_height + 30;
        let max_log = values.iter().map(|v| log_scale(*v)).fold(0.0_f64, f64::max);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{height}" viewBox="0 0 {w} {height}" font-family="sans-serif" font-size="12">"#,
            w = self.width
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            self.width / 2,
            MARGIN / 2 + 6,
            escape(title)
        );

        for (i, (label, value)) in labels.iter().zip(values).enumerate() {
            let row = u32::try_from(i).unwrap_or(u32::MAX);
            let y = MARGIN + row * self.bar_height;
            let bar = if max_log > 0.0 {
                (log_scale(*value) / max_log * f64::from(plot_width)) as u32
            } else {
                0
            };
            let color = BAR_COLORS[i % BAR_COLORS.len()];
            let mid = y + self.bar_height / 2 + 4;

            let _ = writeln!(
                svg,
                r#"  <text x="{}" y="{mid}" text-anchor="end">{}</text>"#,
                LABEL_AREA - 8,
                escape(label)
            );
            let _ = writeln!(
                svg,
                r#"  <rect x="{LABEL_AREA}" y="{}" width="{bar}" height="{}" fill="{color}"/>"#,
                y + 4,
                self.bar_height.saturating_sub(8)
            );
            let _ = writeln!(
                svg,
                r#"  <text x="{}" y="{mid}">{value}</text>"#,
                LABEL_AREA + bar + 6
            );
        }

        let axis_y = MARGIN + rows * self.bar_height;
        let _ = writeln!(
            svg,
            r#"  <line x1="{LABEL_AREA}" y1="{MARGIN}" x2="{LABEL_AREA}" y2="{axis_y}" stroke="black"/>"#
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle">{} (log scale)</text>"#,
            LABEL_AREA + plot_width / 2,
            axis_y + 24,
            escape(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"  <text x="14" y="{}" text-anchor="middle" transform="rotate(-90 14 {})">{}</text>"#,
            MARGIN + rows * self.bar_height / 2,
            MARGIN + rows * self.bar_height / 2,
            escape(&self.y_label)
        );
        svg.push_str("</svg>\n");

        Ok(svg)
    }
}

impl ChartRenderer for SvgBarChart {
    fn render(&self, title: &str, labels: &[String], values: &[i64], path: &Path) -> Result<()> {
        let svg = self.to_svg(title, labels, values)?;
        write_atomic(path, svg.as_bytes())
    }
}

/// log10(1 + v); non-positive values collapse to zero
fn log_scale(value: i64) -> f64 {
    if value <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let v = value as f64;
    v.ln_1p() / std::f64::consts::LN_10
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_svg_contains_bars_in_order() {
        let chart = SvgBarChart::default();
        let svg = chart
            .to_svg("Top 5 Feed Hits", &labels(&["Phishing", "Malware <C2>"]), &[1000, 10])
            .unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Top 5 Feed Hits"));
        assert!(svg.contains("Malware &lt;C2&gt;"));
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.find("Phishing").unwrap() < svg.find("Malware").unwrap());
        assert!(svg.contains(r#"fill="red""#));
        assert!(svg.contains(r#"fill="orange""#));
    }

    #[test]
    fn test_mismatched_lengths() {
        let err = SvgBarChart::default()
            .to_svg("t", &labels(&["a"]), &[1, 2])
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_empty_series_renders() {
        let svg = SvgBarChart::default().to_svg("t", &[], &[]).unwrap();
        assert_eq!(svg.matches("<rect").count(), 0);
    }

    #[test]
    fn test_render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        SvgBarChart::default()
            .render("t", &labels(&["a"]), &[5], &path)
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<rect"));
    }

    #[test]
    fn test_log_scale() {
        assert_eq!(log_scale(0), 0.0);
        assert_eq!(log_scale(-3), 0.0);
        assert!((log_scale(9) - 1.0).abs() < 1e-9);
    }
}
