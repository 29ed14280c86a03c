//! Minimal SVG line charts for predicted vs. actual prices.

use std::fmt::Write;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub label: String,
    pub color: &'static str,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct LineChart {
    pub title: String,
    pub y_label: String,
    /// One label per point; only the first and last are drawn.
    pub x_labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl LineChart {
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

        writeln!(
            svg,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}">"#
        )
        .ok();
        writeln!(
            svg,
            r#"<style>
    .title {{ font-family: sans-serif; font-size: 18px; fill: #222; }}
    .axis-label {{ font-family: sans-serif; font-size: 12px; fill: #555; }}
    .frame {{ fill: #fff; stroke: #999; stroke-width: 1; }}
</style>"#
        )
        .ok();
        writeln!(
            svg,
            r#"  <text class="title" x="{}" y="30" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            escape_xml(&self.title)
        )
        .ok();
        writeln!(
            svg,
            r#"  <rect class="frame" x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" />"#
        )
        .ok();

        let Some((lo, hi)) = self.value_bounds() else {
            writeln!(
                svg,
                r#"  <text class="axis-label" x="{}" y="{}" text-anchor="middle">no data</text>"#,
                MARGIN_LEFT + plot_w / 2.0,
                MARGIN_TOP + plot_h / 2.0
            )
            .ok();
            writeln!(svg, "</svg>").ok();
            return svg;
        };

        self.axes_to_svg(&mut svg, lo, hi, plot_h);

        for series in &self.series {
            series_to_svg(&mut svg, series, lo, hi, plot_w, plot_h);
        }

        self.legend_to_svg(&mut svg);
        writeln!(svg, "</svg>").ok();
        svg
    }

    fn value_bounds(&self) -> Option<(f64, f64)> {
        let finite = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite());

        finite.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    fn axes_to_svg(&self, svg: &mut String, lo: f64, hi: f64, plot_h: f64) {
        for (value, y) in [(hi, MARGIN_TOP), (lo, MARGIN_TOP + plot_h)] {
            writeln!(
                svg,
                r#"  <text class="axis-label" x="{}" y="{}" text-anchor="end">{:.2}</text>"#,
                MARGIN_LEFT - 8.0,
                y + 4.0,
                value
            )
            .ok();
        }

        writeln!(
            svg,
            r#"  <text class="axis-label" x="20" y="{}" transform="rotate(-90 20 {})" text-anchor="middle">{}</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            MARGIN_TOP + plot_h / 2.0,
            escape_xml(&self.y_label)
        )
        .ok();

        let label_y = MARGIN_TOP + plot_h + 20.0;
        if let Some(first) = self.x_labels.first() {
            writeln!(
                svg,
                r#"  <text class="axis-label" x="{MARGIN_LEFT}" y="{label_y}" text-anchor="start">{}</text>"#,
                escape_xml(first)
            )
            .ok();
        }
        if let Some(last) = self.x_labels.last().filter(|_| self.x_labels.len() > 1) {
            writeln!(
                svg,
                r#"  <text class="axis-label" x="{}" y="{label_y}" text-anchor="end">{}</text>"#,
                WIDTH - MARGIN_RIGHT,
                escape_xml(last)
            )
            .ok();
        }
    }

    fn legend_to_svg(&self, svg: &mut String) {
        let y = HEIGHT - 20.0;
        for (idx, series) in self.series.iter().enumerate() {
            let x = MARGIN_LEFT + idx as f64 * 180.0;
            writeln!(
                svg,
                r#"  <line x1="{x}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="3" />"#,
                y - 4.0,
                x + 24.0,
                y - 4.0,
                series.color
            )
            .ok();
            writeln!(
                svg,
                r#"  <text class="axis-label" x="{}" y="{y}">{}</text>"#,
                x + 30.0,
                escape_xml(&series.label)
            )
            .ok();
        }
    }
}

fn series_to_svg(svg: &mut String, series: &ChartSeries, lo: f64, hi: f64, plot_w: f64, plot_h: f64) {
    let n = series.values.len();
    let range = hi - lo;

    let points: Vec<String> = series
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| {
            let x = if n > 1 {
                MARGIN_LEFT + plot_w * i as f64 / (n - 1) as f64
            } else {
                MARGIN_LEFT + plot_w / 2.0
            };
            let frac = if range > 0.0 { (v - lo) / range } else { 0.5 };
            let y = MARGIN_TOP + plot_h * (1.0 - frac);
            format!("{x:.1},{y:.1}")
        })
        .collect();

    if points.is_empty() {
        return;
    }

    writeln!(
        svg,
        r#"  <polyline fill="none" stroke="{}" stroke-width="1.5" points="{}" />"#,
        series.color,
        points.join(" ")
    )
    .ok();
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
