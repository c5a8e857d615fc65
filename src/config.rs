use crate::theme::{Palette, Theme};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metrics used to size and place legends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendLayoutConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub margin: f32,
    pub padding: f32,
    pub font_size: f32,
    pub title_font_size: f32,
    pub title_gap: f32,
    pub row_height: f32,
    pub swatch_size: f32,
    pub swatch_gap: f32,
    /// Average glyph width as a fraction of the font size.
    pub char_width_ratio: f32,
    pub min_width: f32,
    pub default_steps: usize,
}

impl Default for LegendLayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            margin: 16.0,
            padding: 10.0,
            font_size: 12.0,
            title_font_size: 13.0,
            title_gap: 8.0,
            row_height: 20.0,
            swatch_size: 14.0,
            swatch_gap: 8.0,
            char_width_ratio: 0.6,
            min_width: 80.0,
            default_steps: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub show_border: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            show_border: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub palette: Palette,
    pub legend: LegendLayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::modern(),
            palette: Palette::default(),
            legend: LegendLayoutConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Use a new canvas size for both legend placement and the SVG wrapper.
    pub fn with_canvas(mut self, width: f32, height: f32) -> Self {
        self.render.width = width;
        self.render.height = height;
        self.legend.canvas_width = width;
        self.legend.canvas_height = height;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    text_color: Option<String>,
    legend_background: Option<String>,
    legend_border: Option<String>,
    swatch_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PaletteConfigFile {
    categorical: Option<Vec<String>>,
    neutral: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LegendConfigFile {
    canvas_width: Option<NumberOrString>,
    canvas_height: Option<NumberOrString>,
    margin: Option<NumberOrString>,
    padding: Option<NumberOrString>,
    font_size: Option<NumberOrString>,
    title_font_size: Option<NumberOrString>,
    row_height: Option<NumberOrString>,
    swatch_size: Option<NumberOrString>,
    char_width_ratio: Option<f32>,
    steps: Option<usize>,
    show_border: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    palette: Option<PaletteConfigFile>,
    legend: Option<LegendConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlay a JSON config document on the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
            config.palette = Palette::classic();
        } else {
            anyhow::bail!("unknown theme `{theme_name}`");
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.legend_background {
            config.theme.legend_background = v;
        }
        if let Some(v) = vars.legend_border {
            config.theme.legend_border = v;
        }
        if let Some(v) = vars.swatch_color {
            config.theme.swatch_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(palette) = parsed.palette {
        if let Some(v) = palette.categorical {
            config.palette.categorical = v;
        }
        if let Some(v) = palette.neutral {
            config.palette.neutral = v;
        }
    }

    if let Some(legend) = parsed.legend {
        let layout = &mut config.legend;
        for (slot, value) in [
            (&mut layout.canvas_width, &legend.canvas_width),
            (&mut layout.canvas_height, &legend.canvas_height),
            (&mut layout.margin, &legend.margin),
            (&mut layout.padding, &legend.padding),
            (&mut layout.font_size, &legend.font_size),
            (&mut layout.title_font_size, &legend.title_font_size),
            (&mut layout.row_height, &legend.row_height),
            (&mut layout.swatch_size, &legend.swatch_size),
        ] {
            if let Some(v) = value.as_ref().and_then(NumberOrString::as_f32) {
                *slot = v;
            }
        }
        if let Some(v) = legend.char_width_ratio {
            layout.char_width_ratio = v;
        }
        if let Some(v) = legend.steps {
            layout.default_steps = v;
        }
        if let Some(v) = legend.show_border {
            config.render.show_border = v;
        }
    }

    config.render.width = config.legend.canvas_width;
    config.render.height = config.legend.canvas_height;

    Ok(config)
}
