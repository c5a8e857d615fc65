use serde::Deserialize;
use stylemap::config::Config;
use stylemap::document::{Diagram, expand_document};
use stylemap::render::{LegendRenderOptions, render_legends_svg};
use stylemap::theme::{Palette, Theme};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StylemapOptions {
    theme: Option<String>,
    font_family: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    show_border: Option<bool>,
}

fn build_config(options: StylemapOptions) -> Config {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("classic") {
        config.theme = Theme::classic();
        config.palette = Palette::classic();
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(show_border) = options.show_border {
        config.render.show_border = show_border;
    }
    let width = options.width.unwrap_or(config.render.width);
    let height = options.height.unwrap_or(config.render.height);
    config.with_canvas(width, height)
}

fn parse_options(options_json: Option<String>) -> Result<StylemapOptions, JsValue> {
    match options_json {
        Some(raw) => serde_json::from_str::<StylemapOptions>(&raw)
            .map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(StylemapOptions::default()),
    }
}

fn expand(document: &str, config: &Config) -> Result<Diagram, JsValue> {
    expand_document(document, config).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Expanded elements, diagnostics and legends as JSON.
#[wasm_bindgen]
pub fn expand_document_json(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = build_config(parse_options(options_json)?);
    let diagram = expand(document, &config)?;
    serde_json::to_string(&diagram).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// The document's legends as a standalone SVG.
#[wasm_bindgen]
pub fn render_legends(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = build_config(parse_options(options_json)?);
    let diagram = expand(document, &config)?;
    Ok(render_legends_svg(
        &diagram.legends,
        &LegendRenderOptions::from_config(&config),
        &config.theme,
        config.render.width,
        config.render.height,
    ))
}

#[cfg(test)]
mod tests {
    use stylemap::document::expand_document;
    use stylemap::render::{LegendRenderOptions, render_legends_svg};

    use crate::{StylemapOptions, build_config};

    #[test]
    fn renders_legends_for_a_document() {
        let document = r##"{
            "sources": {"hosts": [{"name": "a", "cpu": 10}, {"name": "b", "cpu": 90}]},
            "templates": [{"id": "host", "from": "hosts", "nodes": [{"label": "${name}", "style": {
                "fill": {"kind": "scale", "field": "cpu", "domain": [0, 100], "range": ["#ffffff", "#ff0000"]}
            }}]}],
            "legends": [{"property": "fill", "field": "cpu", "title": "CPU"}]
        }"##;

        let config = build_config(StylemapOptions {
            width: Some(400.0),
            ..StylemapOptions::default()
        });
        let diagram = expand_document(document, &config).expect("document should expand");
        let svg = render_legends_svg(
            &diagram.legends,
            &LegendRenderOptions::from_config(&config),
            &config.theme,
            config.render.width,
            config.render.height,
        );

        assert_eq!(diagram.elements.len(), 2);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("width=\"400\""));
        assert!(svg.contains(">CPU</text>"));
    }
}
