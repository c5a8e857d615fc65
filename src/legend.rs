//! Legend descriptors synthesized from style mappings.
//!
//! A legend depends only on its mapping and configuration, never on live data.
//! Positions default to a rotation over the canvas corners and then the edge
//! centers so several legends on one diagram do not overlap.

use serde::{Deserialize, Serialize};

use crate::config::LegendLayoutConfig;
use crate::mapping::StyleMapping;
use crate::value::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegendPosition {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl LegendPosition {
    pub const ALL: [LegendPosition; 8] = [
        LegendPosition::TopLeft,
        LegendPosition::Top,
        LegendPosition::TopRight,
        LegendPosition::Right,
        LegendPosition::BottomRight,
        LegendPosition::Bottom,
        LegendPosition::BottomLeft,
        LegendPosition::Left,
    ];

    /// Order in which unpositioned legends are placed.
    pub const ROTATION: [LegendPosition; 8] = [
        LegendPosition::TopRight,
        LegendPosition::BottomRight,
        LegendPosition::TopLeft,
        LegendPosition::BottomLeft,
        LegendPosition::Top,
        LegendPosition::Right,
        LegendPosition::Bottom,
        LegendPosition::Left,
    ];

    /// Accepts `top-right`, `top_right`, `topRight` and friends.
    pub fn from_token(token: &str) -> Option<Self> {
        let key: String = token
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "topleft" => Some(Self::TopLeft),
            "top" => Some(Self::Top),
            "topright" => Some(Self::TopRight),
            "right" => Some(Self::Right),
            "bottomright" => Some(Self::BottomRight),
            "bottom" => Some(Self::Bottom),
            "bottomleft" => Some(Self::BottomLeft),
            "left" => Some(Self::Left),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendKind {
    /// Sampled along a continuous domain.
    Scale,
    /// A list of discrete entries.
    Category,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegendConfig {
    /// Samples for scale legends.
    pub steps: Option<usize>,
    pub position: Option<LegendPosition>,
    pub title: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendDescriptor {
    #[serde(rename = "type")]
    pub kind: LegendKind,
    pub title: String,
    pub property: String,
    pub field: String,
    pub entries: Vec<LegendEntry>,
    pub position: LegendPosition,
    pub bounds: Bounds,
}

#[derive(Debug, Clone)]
pub struct LegendRequest<'a> {
    pub mapping: &'a StyleMapping,
    pub config: LegendConfig,
}

/// Build the legend for a single mapping.
pub fn synthesize(
    mapping: &StyleMapping,
    config: Option<&LegendConfig>,
    layout: &LegendLayoutConfig,
) -> LegendDescriptor {
    let position = config
        .and_then(|c| c.position)
        .unwrap_or(LegendPosition::ROTATION[0]);
    build(mapping, config.cloned().unwrap_or_default(), position, layout)
}

/// Build legends for every mapping of one diagram, spreading unpositioned
/// legends over anchors not already claimed.
pub fn synthesize_all(requests: &[LegendRequest<'_>], layout: &LegendLayoutConfig) -> Vec<LegendDescriptor> {
    let mut taken: Vec<LegendPosition> = requests.iter().filter_map(|r| r.config.position).collect();
    let mut cursor = 0;
    let mut legends = Vec::with_capacity(requests.len());

    for request in requests {
        let position = match request.config.position {
            Some(position) => position,
            None => {
                let rotation = &LegendPosition::ROTATION;
                let offset = (0..rotation.len())
                    .position(|k| !taken.contains(&rotation[(cursor + k) % rotation.len()]))
                    .unwrap_or(0);
                let position = rotation[(cursor + offset) % rotation.len()];
                cursor += offset + 1;
                taken.push(position);
                position
            }
        };
        legends.push(build(request.mapping, request.config.clone(), position, layout));
    }
    legends
}

fn build(
    mapping: &StyleMapping,
    config: LegendConfig,
    position: LegendPosition,
    layout: &LegendLayoutConfig,
) -> LegendDescriptor {
    let (kind, entries) = entries(mapping, config.steps.unwrap_or(layout.default_steps));
    let title = config
        .title
        .clone()
        .unwrap_or_else(|| format!("{} ({})", mapping.field(), mapping.property()));
    let bounds = bounds(&title, &entries, &config, position, layout);
    LegendDescriptor {
        kind,
        title,
        property: mapping.property().to_string(),
        field: mapping.field().to_string(),
        entries,
        position,
        bounds,
    }
}

fn entries(mapping: &StyleMapping, steps: usize) -> (LegendKind, Vec<LegendEntry>) {
    match mapping {
        StyleMapping::Scale(scale) => {
            let steps = steps.max(2);
            let (min, max) = scale.domain;
            let entries = (0..steps)
                .map(|i| {
                    let value = if i == 0 {
                        min
                    } else if i == steps - 1 {
                        max
                    } else {
                        min + (max - min) * i as f64 / (steps - 1) as f64
                    };
                    LegendEntry {
                        label: format_number(value),
                        style: scale.resolve_number(value).display(),
                        value: Some(value),
                    }
                })
                .collect();
            (LegendKind::Scale, entries)
        }
        StyleMapping::Category(category) => {
            let entries = category
                .entries
                .iter()
                .map(|(key, style)| LegendEntry {
                    label: key.clone(),
                    style: style.display(),
                    value: None,
                })
                .collect();
            (LegendKind::Category, entries)
        }
        StyleMapping::Threshold(threshold) => {
            let breakpoints = threshold.breakpoints();
            let entries = breakpoints
                .iter()
                .enumerate()
                .map(|(i, bp)| {
                    let label = match i.checked_sub(1).map(|prev| &breakpoints[prev]) {
                        None => format!("≥ {}", format_number(bp.value)),
                        Some(higher) => format!(
                            "{} - {}",
                            format_number(bp.value),
                            format_number(higher.value)
                        ),
                    };
                    LegendEntry {
                        label,
                        style: bp.style.display(),
                        value: Some(bp.value),
                    }
                })
                .collect();
            (LegendKind::Category, entries)
        }
    }
}

/// Estimated rendered width of `text`.
pub fn text_width(text: &str, font_size: f32, layout: &LegendLayoutConfig) -> f32 {
    text.chars().count() as f32 * font_size * layout.char_width_ratio
}

fn bounds(
    title: &str,
    entries: &[LegendEntry],
    config: &LegendConfig,
    position: LegendPosition,
    layout: &LegendLayoutConfig,
) -> Bounds {
    let widest_label = entries
        .iter()
        .map(|e| text_width(&e.label, layout.font_size, layout))
        .fold(0.0_f32, f32::max);
    let content_width = text_width(title, layout.title_font_size, layout)
        .max(layout.swatch_size + layout.swatch_gap + widest_label);
    let computed_width = (content_width + 2.0 * layout.padding).max(layout.min_width).max(1.0);
    let computed_height = 2.0 * layout.padding
        + layout.title_font_size
        + layout.title_gap
        + entries.len() as f32 * layout.row_height;

    let overridden = |value: Option<f32>| value.filter(|v| v.is_finite() && *v > 0.0);
    let width = overridden(config.width).unwrap_or(computed_width);
    let height = overridden(config.height).unwrap_or(computed_height.max(1.0));

    let (canvas_w, canvas_h, margin) = (layout.canvas_width, layout.canvas_height, layout.margin);
    let near = margin;
    let far_x = canvas_w - width - margin;
    let far_y = canvas_h - height - margin;
    let mid_x = (canvas_w - width) / 2.0;
    let mid_y = (canvas_h - height) / 2.0;

    use LegendPosition::*;
    let x = match position {
        TopLeft | Left | BottomLeft => near,
        Top | Bottom => mid_x,
        TopRight | Right | BottomRight => far_x,
    };
    let y = match position {
        TopLeft | Top | TopRight => near,
        Left | Right => mid_y,
        BottomLeft | Bottom | BottomRight => far_y,
    };

    // Keep the panel on the canvas; an oversized one pins to the origin.
    Bounds {
        x: x.min(canvas_w - width).max(0.0),
        y: y.min(canvas_h - height).max(0.0),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{
        Breakpoint, CategoryFallback, CategoryMapping, ScaleMapping, ScaleRange, StyleValue,
        ThresholdMapping,
    };
    use indexmap::IndexMap;

    fn layout() -> LegendLayoutConfig {
        LegendLayoutConfig::default()
    }

    fn scale(domain: (f64, f64), from: &str, to: &str) -> StyleMapping {
        StyleMapping::Scale(
            ScaleMapping::new(
                "strokeWidth",
                "weight",
                domain,
                ScaleRange::parse(from, to).expect("valid range"),
            )
            .expect("valid scale"),
        )
    }

    fn thresholds() -> StyleMapping {
        let breakpoints = [(60.0, "yellow"), (80.0, "green"), (0.0, "red")]
            .into_iter()
            .map(|(value, style)| Breakpoint {
                value,
                style: style.into(),
            })
            .collect();
        StyleMapping::Threshold(
            ThresholdMapping::new("fill", "score", breakpoints).expect("valid thresholds"),
        )
    }

    fn categories() -> StyleMapping {
        let entries = IndexMap::from([
            ("web".to_string(), StyleValue::from("#4e79a7")),
            ("db".to_string(), StyleValue::from("#f28e2b")),
            ("cache".to_string(), StyleValue::from("#e15759")),
        ]);
        StyleMapping::Category(
            CategoryMapping::new("fill", "kind", entries, CategoryFallback::Omit)
                .expect("valid category"),
        )
    }

    #[test]
    fn scale_legend_samples_domain_inclusively() {
        let config = LegendConfig {
            steps: Some(3),
            ..LegendConfig::default()
        };
        let legend = synthesize(&scale((0.0, 10.0), "1", "5"), Some(&config), &layout());
        assert_eq!(legend.kind, LegendKind::Scale);
        let values: Vec<f64> = legend.entries.iter().filter_map(|e| e.value).collect();
        assert_eq!(values, vec![0.0, 5.0, 10.0]);
        let styles: Vec<&str> = legend.entries.iter().map(|e| e.style.as_str()).collect();
        assert_eq!(styles, vec!["1", "3", "5"]);
        let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "5", "10"]);
    }

    #[test]
    fn scale_legend_defaults_to_five_steps() {
        let legend = synthesize(&scale((0.0, 1.0), "#000000", "#ffffff"), None, &layout());
        assert_eq!(legend.entries.len(), 5);
        assert_eq!(legend.entries[0].value, Some(0.0));
        assert_eq!(legend.entries[4].value, Some(1.0));
        assert_eq!(legend.entries[0].style, "#000000");
        assert_eq!(legend.entries[4].style, "#ffffff");
        assert_eq!(legend.entries[1].label, "0.25");
    }

    #[test]
    fn numeric_scale_styles_use_two_decimals() {
        let config = LegendConfig {
            steps: Some(4),
            ..LegendConfig::default()
        };
        let legend = synthesize(&scale((0.0, 3.0), "0", "1"), Some(&config), &layout());
        let styles: Vec<&str> = legend.entries.iter().map(|e| e.style.as_str()).collect();
        assert_eq!(styles, vec!["0", "0.33", "0.67", "1"]);
    }

    #[test]
    fn threshold_legend_labels_ranges() {
        let legend = synthesize(&thresholds(), None, &layout());
        assert_eq!(legend.kind, LegendKind::Category);
        let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["≥ 80", "60 - 80", "0 - 60"]);
        let styles: Vec<&str> = legend.entries.iter().map(|e| e.style.as_str()).collect();
        assert_eq!(styles, vec!["green", "yellow", "red"]);
    }

    #[test]
    fn category_legend_keeps_declaration_order() {
        let legend = synthesize(&categories(), None, &layout());
        let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["web", "db", "cache"]);
        assert_eq!(legend.title, "kind (fill)");
        assert_eq!(legend.position, LegendPosition::TopRight);
    }

    #[test]
    fn explicit_title_and_position_win() {
        let config = LegendConfig {
            title: Some("Service kind".into()),
            position: Some(LegendPosition::BottomLeft),
            ..LegendConfig::default()
        };
        let legend = synthesize(&categories(), Some(&config), &layout());
        assert_eq!(legend.title, "Service kind");
        assert_eq!(legend.position, LegendPosition::BottomLeft);
    }

    #[test]
    fn unpositioned_legends_rotate_around_corners() {
        let mappings = [categories(), thresholds(), scale((0.0, 1.0), "0", "1")];
        let mut requests: Vec<LegendRequest<'_>> = mappings
            .iter()
            .map(|mapping| LegendRequest {
                mapping,
                config: LegendConfig::default(),
            })
            .collect();
        requests[1].config.position = Some(LegendPosition::TopRight);

        let legends = synthesize_all(&requests, &layout());
        let positions: Vec<LegendPosition> = legends.iter().map(|l| l.position).collect();
        assert_eq!(
            positions,
            vec![
                LegendPosition::BottomRight,
                LegendPosition::TopRight,
                LegendPosition::TopLeft
            ]
        );
    }

    #[test]
    fn rotation_wraps_after_all_anchors() {
        let mapping = categories();
        let requests: Vec<LegendRequest<'_>> = (0..10)
            .map(|_| LegendRequest {
                mapping: &mapping,
                config: LegendConfig::default(),
            })
            .collect();
        let legends = synthesize_all(&requests, &layout());
        let first_eight: Vec<LegendPosition> = legends[..8].iter().map(|l| l.position).collect();
        assert_eq!(first_eight, LegendPosition::ROTATION.to_vec());
        assert_eq!(legends[8].position, LegendPosition::TopRight);
        assert_eq!(legends[9].position, LegendPosition::BottomRight);
    }

    #[test]
    fn every_anchor_has_valid_bounds() {
        for layout in [
            LegendLayoutConfig::default(),
            LegendLayoutConfig {
                canvas_width: 50.0,
                canvas_height: 40.0,
                ..LegendLayoutConfig::default()
            },
        ] {
            for position in LegendPosition::ALL {
                let config = LegendConfig {
                    position: Some(position),
                    ..LegendConfig::default()
                };
                for mapping in [categories(), thresholds(), scale((0.0, 9.0), "1", "2")] {
                    let b = synthesize(&mapping, Some(&config), &layout).bounds;
                    assert!(b.x >= 0.0 && b.y >= 0.0, "{position:?}: {b:?}");
                    assert!(b.width > 0.0 && b.height > 0.0, "{position:?}: {b:?}");
                    assert!(b.x + b.width <= layout.canvas_width || b.x == 0.0, "{position:?}: {b:?}");
                    assert!(b.y + b.height <= layout.canvas_height || b.y == 0.0, "{position:?}: {b:?}");
                }
            }
        }
    }

    #[test]
    fn anchors_place_legends_on_the_canvas() {
        let layout = layout();
        let at = |position| {
            let config = LegendConfig {
                position: Some(position),
                width: Some(100.0),
                height: Some(50.0),
                ..LegendConfig::default()
            };
            synthesize(&categories(), Some(&config), &layout).bounds
        };
        let top_left = at(LegendPosition::TopLeft);
        assert_eq!((top_left.x, top_left.y), (layout.margin, layout.margin));
        let bottom_right = at(LegendPosition::BottomRight);
        assert_eq!(
            (bottom_right.x, bottom_right.y),
            (
                layout.canvas_width - 100.0 - layout.margin,
                layout.canvas_height - 50.0 - layout.margin
            )
        );
        let top = at(LegendPosition::Top);
        assert_eq!(top.x, (layout.canvas_width - 100.0) / 2.0);
        assert_eq!((top.width, top.height), (100.0, 50.0));
    }

    #[test]
    fn oversized_legends_pin_to_the_origin() {
        let layout = LegendLayoutConfig {
            canvas_width: 50.0,
            canvas_height: 40.0,
            ..LegendLayoutConfig::default()
        };
        for position in [LegendPosition::TopLeft, LegendPosition::Left, LegendPosition::BottomRight] {
            let config = LegendConfig {
                position: Some(position),
                ..LegendConfig::default()
            };
            let b = synthesize(&categories(), Some(&config), &layout).bounds;
            assert!(b.width > layout.canvas_width);
            assert_eq!((b.x, b.y), (0.0, 0.0), "{position:?}");
        }
    }

    #[test]
    fn numeric_threshold_styles_display_as_numbers() {
        let widths = StyleMapping::Threshold(
            ThresholdMapping::new(
                "strokeWidth",
                "load",
                vec![
                    Breakpoint {
                        value: 0.0,
                        style: 1.0.into(),
                    },
                    Breakpoint {
                        value: 50.0,
                        style: 2.5.into(),
                    },
                ],
            )
            .expect("valid thresholds"),
        );
        let legend = synthesize(&widths, None, &layout());
        let styles: Vec<&str> = legend.entries.iter().map(|e| e.style.as_str()).collect();
        assert_eq!(styles, vec!["2.5", "1"]);
    }

    #[test]
    fn bounds_grow_with_entries_and_labels() {
        let short = synthesize(&categories(), None, &layout()).bounds;
        let long = synthesize(&thresholds(), None, &layout()).bounds;
        assert!(short.height > 0.0);
        let more_rows = synthesize(
            &scale((0.0, 1.0), "0", "1"),
            Some(&LegendConfig {
                steps: Some(9),
                ..LegendConfig::default()
            }),
            &layout(),
        )
        .bounds;
        assert!(more_rows.height > long.height);
    }

    #[test]
    fn position_tokens() {
        assert_eq!(LegendPosition::from_token("top-right"), Some(LegendPosition::TopRight));
        assert_eq!(LegendPosition::from_token("bottomLeft"), Some(LegendPosition::BottomLeft));
        assert_eq!(LegendPosition::from_token("LEFT"), Some(LegendPosition::Left));
        assert_eq!(LegendPosition::from_token("middle"), None);
    }
}
