//! Category spending chart
//!
//! Renders per-category totals as a standalone SVG bar chart. Any other
//! renderer (PNG, HTML) can plug in behind `ChartRenderer`.

use std::fmt::Write;

use crate::error::{Error, Result};
use crate::models::CategoryTotal;

/// Labels and canvas size
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Expense Analysis".to_string(),
            x_label: "Category".to_string(),
            y_label: "Amount Spent (Rs)".to_string(),
            width: 800,
            height: 500,
        }
    }
}

/// A rendered chart artifact
#[derive(Debug, Clone)]
pub struct Chart {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns category totals into an image artifact
pub trait ChartRenderer: Send + Sync {
    fn render(&self, totals: &[CategoryTotal], options: &ChartOptions) -> Result<Chart>;
}

/// SVG bar chart, one bar per category
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgBarChart;

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 130.0;
const Y_TICKS: usize = 5;
const BAR_COLOR: &str = "#87ceeb";

impl ChartRenderer for SvgBarChart {
    fn render(&self, totals: &[CategoryTotal], options: &ChartOptions) -> Result<Chart> {
        if totals.is_empty() {
            return Err(Error::NotFound("No expense data available".into()));
        }

        let mut svg = String::new();
        draw(&mut svg, totals, options)
            .map_err(|e| Error::InvalidData(format!("Failed to render chart: {}", e)))?;

        Ok(Chart {
            content_type: "image/svg+xml",
            bytes: svg.into_bytes(),
        })
    }
}

fn draw(svg: &mut String, totals: &[CategoryTotal], options: &ChartOptions) -> std::fmt::Result {
    let width = f64::from(options.width.max(200));
    let height = f64::from(options.height.max(200));
    let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;
    let axis_y = MARGIN_TOP + plot_h;

    let y_max = nice_ceiling(totals.iter().map(|t| t.total).fold(0.0, f64::max));
    let slot = plot_w / totals.len() as f64;
    let bar_w = slot * 0.6;

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = width,
        h = height
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-size="18" font-weight="bold">{}</text>"#,
        width / 2.0,
        escape(&options.title)
    )?;

    // Gridlines and y tick labels
    for i in 0..=Y_TICKS {
        let value = y_max * i as f64 / Y_TICKS as f64;
        let y = axis_y - plot_h * i as f64 / Y_TICKS as f64;
        writeln!(
            svg,
            r##"<line x1="{x1}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" stroke="#dddddd"/>"##,
            x1 = MARGIN_LEFT,
            x2 = MARGIN_LEFT + plot_w,
            y = y
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            format_amount(value)
        )?;
    }

    for (i, total) in totals.iter().enumerate() {
        let bar_h = plot_h * (total.total / y_max);
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_w) / 2.0;
        let center = x + bar_w / 2.0;
        writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {:.2}</title></rect>"#,
            x,
            axis_y - bar_h,
            bar_w,
            bar_h,
            BAR_COLOR,
            total.category,
            total.total
        )?;
        writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{y:.1}" text-anchor="end" font-size="12" transform="rotate(-45 {cx:.1} {y:.1})">{label}</text>"#,
            cx = center,
            y = axis_y + 16.0,
            label = total.category
        )?;
    }

    writeln!(
        svg,
        r#"<line x1="{x}" y1="{top}" x2="{x}" y2="{bottom}" stroke="black"/>"#,
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
        bottom = axis_y
    )?;
    writeln!(
        svg,
        r#"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="black"/>"#,
        MARGIN_LEFT,
        MARGIN_LEFT + plot_w,
        y = axis_y
    )?;

    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13">{}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        height - 15.0,
        escape(&options.x_label)
    )?;
    writeln!(
        svg,
        r#"<text x="20" y="{y}" text-anchor="middle" font-size="13" transform="rotate(-90 20 {y})">{}</text>"#,
        escape(&options.y_label),
        y = MARGIN_TOP + plot_h / 2.0
    )?;

    writeln!(svg, "</svg>")
}

/// Round up to 1, 2 or 5 times a power of ten
fn nice_ceiling(max: f64) -> f64 {
    if !max.is_finite() || max <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(max.log10().floor());
    let scaled = max / magnitude;
    let step = if scaled <= 1.0 {
        1.0
    } else if scaled <= 2.0 {
        2.0
    } else if scaled <= 5.0 {
        5.0
    } else {
        10.0
    };
    step * magnitude
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn totals() -> Vec<CategoryTotal> {
        vec![
            CategoryTotal {
                category: Category::Food,
                total: 50.0,
                count: 2,
            },
            CategoryTotal {
                category: Category::Transport,
                total: 10.0,
                count: 1,
            },
        ]
    }

    #[test]
    fn test_empty_totals_not_found() {
        let err = SvgBarChart
            .render(&[], &ChartOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(msg) if msg == "No expense data available"));
    }

    #[test]
    fn test_svg_contains_labels_and_bars() {
        let chart = SvgBarChart.render(&totals(), &ChartOptions::default()).unwrap();
        assert_eq!(chart.content_type, "image/svg+xml");

        let svg = String::from_utf8(chart.bytes).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Expense Analysis"));
        assert!(svg.contains("Amount Spent (Rs)"));
        assert!(svg.contains(">Food</text>"));
        assert!(svg.contains(">Transport</text>"));
        assert_eq!(svg.matches(BAR_COLOR).count(), 2);
    }

    #[test]
    fn test_title_is_escaped() {
        let options = ChartOptions {
            title: "A & B <script>".into(),
            ..Default::default()
        };
        let svg = String::from_utf8(SvgBarChart.render(&totals(), &options).unwrap().bytes).unwrap();
        assert!(svg.contains("A &amp; B &lt;script&gt;"));
        assert!(!svg.contains("<script>"));
    }

    #[test]
    fn test_nice_ceiling() {
        assert_eq!(nice_ceiling(0.0), 1.0);
        assert_eq!(nice_ceiling(50.0), 50.0);
        assert_eq!(nice_ceiling(60.0), 100.0);
        assert_eq!(nice_ceiling(130.0), 200.0);
    }

    #[test]
    fn test_all_zero_totals_render() {
        let zero = vec![CategoryTotal {
            category: Category::Miscellaneous,
            total: 0.0,
            count: 1,
        }];
        let svg = String::from_utf8(
            SvgBarChart
                .render(&zero, &ChartOptions::default())
                .unwrap()
                .bytes,
        )
        .unwrap();
        assert!(!svg.contains("NaN"));
    }
}
