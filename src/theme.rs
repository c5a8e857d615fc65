use serde::{Deserialize, Serialize};

const TABLEAU_COLORS: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

const CLASSIC_COLORS: [&str; 12] = [
    "#ECECFF", "#ffffde", "#b9b9ff", "#d3d3ff", "#e6e6fa", "#ffe4e1", "#e0ffff", "#f0fff0",
    "#fffacd", "#f5deb3", "#dda0dd", "#c0c0c0",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub text_color: String,
    pub legend_background: String,
    pub legend_border: String,
    /// Fill for swatches whose style is a number rather than a color.
    pub swatch_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            text_color: "#333333".to_string(),
            legend_background: "#FFFFDE".to_string(),
            legend_border: "#AAAA33".to_string(),
            swatch_color: "#9370DB".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            text_color: "#1C2430".to_string(),
            legend_background: "#FFFFFF".to_string(),
            legend_border: "#D7E0F0".to_string(),
            swatch_color: "#7A8AA6".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}

/// Colors used when a mapping does not name one itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Cycled through for categories declared without a style.
    pub categorical: Vec<String>,
    /// Style for values no category matches.
    pub neutral: String,
}

impl Palette {
    pub fn tableau() -> Self {
        Self {
            categorical: TABLEAU_COLORS.iter().map(|c| c.to_string()).collect(),
            neutral: "#94a3b8".to_string(),
        }
    }

    pub fn classic() -> Self {
        Self {
            categorical: CLASSIC_COLORS.iter().map(|c| c.to_string()).collect(),
            neutral: "#c0c0c0".to_string(),
        }
    }

    /// The `index`-th categorical color, wrapping around.
    pub fn color(&self, index: usize) -> &str {
        if self.categorical.is_empty() {
            return &self.neutral;
        }
        &self.categorical[index % self.categorical.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::tableau()
    }
}
