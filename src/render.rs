use crate::config::{Config, LegendLayoutConfig};
use crate::legend::LegendDescriptor;
use crate::theme::Theme;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LegendRenderOptions {
    pub show_border: bool,
    /// Panel fill; the theme's legend background when unset.
    pub background: Option<String>,
    pub layout: LegendLayoutConfig,
}

impl Default for LegendRenderOptions {
    fn default() -> Self {
        Self {
            show_border: true,
            background: None,
            layout: LegendLayoutConfig::default(),
        }
    }
}

impl LegendRenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            show_border: config.render.show_border,
            background: None,
            layout: config.legend.clone(),
        }
    }
}

/// Render one legend as a positioned `<g>` fragment.
pub fn render_legend(legend: &LegendDescriptor, opts: &LegendRenderOptions, theme: &Theme) -> String {
    let layout = &opts.layout;
    let bounds = legend.bounds;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<g class=\"legend\" data-property=\"{}\" transform=\"translate({:.2},{:.2})\">",
        escape_xml(&legend.property),
        bounds.x,
        bounds.y
    ));

    let background = opts.background.as_deref().unwrap_or(&theme.legend_background);
    let border = if opts.show_border {
        format!(
            "stroke=\"{}\" stroke-width=\"1\"",
            escape_xml(&theme.legend_border)
        )
    } else {
        "stroke=\"none\"".to_string()
    };
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" {}/>",
        bounds.width,
        bounds.height,
        escape_xml(background),
        border
    ));

    let title_y = layout.padding + layout.title_font_size;
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{title_y:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        layout.padding,
        escape_xml(&theme.font_family),
        layout.title_font_size,
        escape_xml(&theme.text_color),
        escape_xml(&legend.title)
    ));

    let rows_top = title_y + layout.title_gap;
    for (idx, entry) in legend.entries.iter().enumerate() {
        let row_y = rows_top + idx as f32 * layout.row_height;
        let swatch_y = row_y + (layout.row_height - layout.swatch_size) / 2.0;
        svg.push_str(&swatch_svg(
            layout.padding,
            swatch_y,
            layout.swatch_size,
            &legend.property,
            &entry.style,
            theme,
        ));
        let text_x = layout.padding + layout.swatch_size + layout.swatch_gap;
        let text_y = row_y + layout.row_height / 2.0;
        svg.push_str(&format!(
            "<text x=\"{text_x:.2}\" y=\"{text_y:.2}\" dominant-baseline=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            escape_xml(&theme.font_family),
            layout.font_size,
            escape_xml(&theme.text_color),
            escape_xml(&entry.label)
        ));
    }

    svg.push_str("</g>");
    svg
}

/// Wrap legend fragments in a standalone SVG document.
pub fn render_legends_svg(
    legends: &[LegendDescriptor],
    opts: &LegendRenderOptions,
    theme: &Theme,
    width: f32,
    height: f32,
) -> String {
    let width = width.max(1.0);
    let height = height.max(1.0);
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&theme.background)
    ));
    for legend in legends {
        svg.push_str(&render_legend(legend, opts, theme));
    }
    svg.push_str("</svg>");
    svg
}

enum Swatch<'a> {
    Color(&'a str),
    Opacity(f64),
    StrokeWidth(f64),
    Plain,
}

fn classify_swatch<'a>(property: &str, style: &'a str) -> Swatch<'a> {
    let style = style.trim();
    if let Ok(number) = style.parse::<f64>() {
        return match property {
            "opacity" | "fillOpacity" | "fill-opacity" | "strokeOpacity" | "stroke-opacity" => {
                Swatch::Opacity(number.clamp(0.0, 1.0))
            }
            "strokeWidth" | "stroke-width" | "thickness" => Swatch::StrokeWidth(number.max(0.0)),
            _ => Swatch::Plain,
        };
    }
    if looks_like_color(style) {
        Swatch::Color(style)
    } else {
        Swatch::Plain
    }
}

fn looks_like_color(style: &str) -> bool {
    style.starts_with('#')
        || style.starts_with("rgb")
        || style.starts_with("hsl")
        || (!style.is_empty() && style.chars().all(|c| c.is_ascii_alphabetic()))
}

fn swatch_svg(x: f32, y: f32, size: f32, property: &str, style: &str, theme: &Theme) -> String {
    match classify_swatch(property, style) {
        Swatch::Color(color) => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" rx=\"2\" fill=\"{}\"/>",
            escape_xml(color)
        ),
        Swatch::Opacity(opacity) => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" rx=\"2\" fill=\"{}\" fill-opacity=\"{opacity}\"/>",
            escape_xml(&theme.swatch_color)
        ),
        Swatch::StrokeWidth(width) => {
            let mid = y + size / 2.0;
            format!(
                "<line x1=\"{x:.2}\" y1=\"{mid:.2}\" x2=\"{:.2}\" y2=\"{mid:.2}\" stroke=\"{}\" stroke-width=\"{width}\"/>",
                x + size,
                escape_xml(&theme.swatch_color)
            )
        }
        Swatch::Plain => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" rx=\"2\" fill=\"none\" stroke=\"{}\"/>",
            escape_xml(&theme.swatch_color)
        ),
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub fn write_output_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(
    svg: &str,
    output: &Path,
    render_cfg: &crate::config::RenderConfig,
) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid canvas size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::{Bounds, LegendEntry, LegendKind, LegendPosition};

    fn legend(title: &str, labels: &[(&str, &str)]) -> LegendDescriptor {
        LegendDescriptor {
            kind: LegendKind::Category,
            title: title.to_string(),
            property: "fill".to_string(),
            field: "kind".to_string(),
            entries: labels
                .iter()
                .map(|(label, style)| LegendEntry {
                    label: label.to_string(),
                    style: style.to_string(),
                    value: None,
                })
                .collect(),
            position: LegendPosition::TopLeft,
            bounds: Bounds {
                x: 16.0,
                y: 16.0,
                width: 120.0,
                height: 80.0,
            },
        }
    }

    #[test]
    fn escapes_all_metacharacters() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn renders_panel_title_and_rows() {
        let svg = render_legend(
            &legend("Kinds", &[("web", "#4e79a7"), ("db", "#f28e2b")]),
            &LegendRenderOptions::default(),
            &Theme::modern(),
        );
        assert!(svg.starts_with("<g class=\"legend\""));
        assert!(svg.contains("translate(16.00,16.00)"));
        assert!(svg.contains(">Kinds</text>"));
        assert!(svg.contains(">web</text>"));
        assert!(svg.contains("fill=\"#4e79a7\""));
        assert!(svg.contains(&format!("stroke=\"{}\"", Theme::modern().legend_border)));
        assert!(svg.ends_with("</g>"));
    }

    #[test]
    fn user_text_is_never_emitted_raw() {
        let nasty = r#"<script>alert("x")</script> & co"#;
        let svg = render_legend(
            &legend(nasty, &[(nasty, "#fff\"/><script>")]),
            &LegendRenderOptions::default(),
            &Theme::modern(),
        );
        assert!(!svg.contains("<script>"));
        assert!(!svg.contains("alert(\"x\")"));
        assert!(!svg.contains(" & co"));
        assert!(svg.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; co"));
    }

    #[test]
    fn border_and_background_are_configurable() {
        let opts = LegendRenderOptions {
            show_border: false,
            background: Some("#000000".into()),
            ..LegendRenderOptions::default()
        };
        let svg = render_legend(&legend("t", &[]), &opts, &Theme::modern());
        assert!(svg.contains("fill=\"#000000\" stroke=\"none\""));
    }

    #[test]
    fn numeric_styles_get_matching_swatches() {
        let mut opacity = legend("o", &[("0", "0.2"), ("10", "1")]);
        opacity.property = "opacity".into();
        let svg = render_legend(&opacity, &LegendRenderOptions::default(), &Theme::modern());
        assert!(svg.contains("fill-opacity=\"0.2\""));

        let mut width = legend("w", &[("0", "1"), ("10", "4.5")]);
        width.property = "strokeWidth".into();
        let svg = render_legend(&width, &LegendRenderOptions::default(), &Theme::modern());
        assert!(svg.contains("<line"));
        assert!(svg.contains("stroke-width=\"4.5\""));
    }

    #[test]
    fn wraps_fragments_in_svg_document() {
        let svg = render_legends_svg(
            &[legend("a", &[]), legend("b", &[])],
            &LegendRenderOptions::default(),
            &Theme::modern(),
            640.0,
            480.0,
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("viewBox=\"0 0 640 480\""));
        assert_eq!(svg.matches("<g class=\"legend\"").count(), 2);
        assert!(svg.ends_with("</svg>"));
    }
}
