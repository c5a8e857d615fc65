//! Category, scale and threshold style mappings.
//!
//! Mappings are validated when they are built, so resolution itself never fails:
//! out-of-range inputs clamp, unmatched categories fall back, and values below
//! every threshold take the lowest breakpoint's style.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::coerce::{to_number, to_text};
use crate::error::MappingError;
use crate::eval::validate_path;
use crate::value::{Value, format_fixed, format_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Category,
    Scale,
    Threshold,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MappingKind::Category => "category",
            MappingKind::Scale => "scale",
            MappingKind::Threshold => "threshold",
        })
    }
}

/// A concrete style value applied to an element.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

impl StyleValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) => Some(*n),
            StyleValue::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Display form used in legends: numbers get at most two decimals.
    pub fn display(&self) -> String {
        match self {
            StyleValue::Number(n) => format_fixed(*n, 2),
            StyleValue::Text(text) => text.clone(),
        }
    }

    pub(crate) fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(StyleValue::Number(n)),
            other => Some(StyleValue::Text(to_text(&other))),
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Number(n) => f.write_str(&format_number(*n)),
            StyleValue::Text(text) => f.write_str(text),
        }
    }
}

impl Serialize for StyleValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StyleValue::Number(n) => Value::Number(*n).serialize(serializer),
            StyleValue::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Text(value)
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb` or `#rgb`.
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Self {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            _ => None,
        }
    }

    /// Channel-wise linear blend; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            let value = f64::from(a) + t * (f64::from(b) - f64::from(a));
            value.round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A color endpoint of a scale range, keeping the text it was written as.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub rgb: Rgb,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleRange {
    Numeric(f64, f64),
    Color(ColorStop, ColorStop),
}

impl ScaleRange {
    /// Two numbers interpolate linearly, two colors channel-wise; anything else is rejected.
    pub fn parse(from: &str, to: &str) -> Result<Self, MappingError> {
        let number = |s: &str| s.trim().parse::<f64>().ok().filter(|n| n.is_finite());
        if let (Some(a), Some(b)) = (number(from), number(to)) {
            return Ok(ScaleRange::Numeric(a, b));
        }
        if let (Some(a), Some(b)) = (Rgb::parse(from), Rgb::parse(to)) {
            return Ok(ScaleRange::Color(
                ColorStop {
                    rgb: a,
                    text: from.trim().to_string(),
                },
                ColorStop {
                    rgb: b,
                    text: to.trim().to_string(),
                },
            ));
        }
        Err(MappingError::InvalidRange {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryFallback {
    Style(StyleValue),
    /// Unmatched values leave the property unset.
    Omit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMapping {
    pub property: String,
    pub field: String,
    pub entries: IndexMap<String, StyleValue>,
    pub fallback: CategoryFallback,
}

impl CategoryMapping {
    pub fn new(
        property: impl Into<String>,
        field: impl Into<String>,
        entries: IndexMap<String, StyleValue>,
        fallback: CategoryFallback,
    ) -> Result<Self, MappingError> {
        let field = checked_field(field.into())?;
        Ok(Self {
            property: property.into(),
            field,
            entries,
            fallback,
        })
    }

    fn resolve(&self, value: Option<&Value>) -> Option<StyleValue> {
        let key = value.map(to_text).unwrap_or_default();
        match self.entries.get(&key) {
            Some(style) => Some(style.clone()),
            None => match &self.fallback {
                CategoryFallback::Style(style) => Some(style.clone()),
                CategoryFallback::Omit => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleMapping {
    pub property: String,
    pub field: String,
    pub domain: (f64, f64),
    pub range: ScaleRange,
}

impl ScaleMapping {
    pub fn new(
        property: impl Into<String>,
        field: impl Into<String>,
        domain: (f64, f64),
        range: ScaleRange,
    ) -> Result<Self, MappingError> {
        let field = checked_field(field.into())?;
        let (min, max) = domain;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(MappingError::InvalidDomain { min, max });
        }
        Ok(Self {
            property: property.into(),
            field,
            domain,
            range,
        })
    }

    /// Normalized position of `input` inside the domain, clamped to `[0, 1]`.
    pub fn position(&self, input: f64) -> f64 {
        let (min, max) = self.domain;
        let clamped = input.clamp(min, max);
        if max == min {
            0.0
        } else {
            (clamped - min) / (max - min)
        }
    }

    pub fn resolve_number(&self, input: f64) -> StyleValue {
        let t = self.position(input);
        match &self.range {
            ScaleRange::Numeric(from, to) => {
                let value = if t <= 0.0 {
                    *from
                } else if t >= 1.0 {
                    *to
                } else {
                    from + t * (to - from)
                };
                StyleValue::Number(value)
            }
            ScaleRange::Color(from, to) => {
                if t <= 0.0 {
                    StyleValue::Text(from.text.clone())
                } else if t >= 1.0 {
                    StyleValue::Text(to.text.clone())
                } else {
                    StyleValue::Text(from.rgb.lerp(to.rgb, t).to_hex())
                }
            }
        }
    }

    fn resolve(&self, value: Option<&Value>) -> StyleValue {
        self.resolve_number(value.map(to_number).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub value: f64,
    pub style: StyleValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMapping {
    pub property: String,
    pub field: String,
    breakpoints: Vec<Breakpoint>,
}

impl ThresholdMapping {
    pub fn new(
        property: impl Into<String>,
        field: impl Into<String>,
        mut breakpoints: Vec<Breakpoint>,
    ) -> Result<Self, MappingError> {
        let field = checked_field(field.into())?;
        if breakpoints.is_empty() {
            return Err(MappingError::EmptyThresholds);
        }
        if let Some(bad) = breakpoints.iter().find(|bp| !bp.value.is_finite()) {
            return Err(MappingError::InvalidBreakpoint(bad.value));
        }
        breakpoints.sort_by(|a, b| b.value.total_cmp(&a.value));
        Ok(Self {
            property: property.into(),
            field,
            breakpoints,
        })
    }

    /// Breakpoints, highest value first.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn resolve_number(&self, input: f64) -> StyleValue {
        let chosen = self
            .breakpoints
            .iter()
            .find(|bp| bp.value <= input)
            .or_else(|| self.breakpoints.last());
        // Non-empty by construction.
        chosen
            .map(|bp| bp.style.clone())
            .unwrap_or_else(|| StyleValue::Text(String::new()))
    }

    fn resolve(&self, value: Option<&Value>) -> StyleValue {
        self.resolve_number(value.map(to_number).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleMapping {
    Category(CategoryMapping),
    Scale(ScaleMapping),
    Threshold(ThresholdMapping),
}

impl StyleMapping {
    pub fn kind(&self) -> MappingKind {
        match self {
            StyleMapping::Category(_) => MappingKind::Category,
            StyleMapping::Scale(_) => MappingKind::Scale,
            StyleMapping::Threshold(_) => MappingKind::Threshold,
        }
    }

    /// Target style attribute, e.g. `fill` or `strokeWidth`.
    pub fn property(&self) -> &str {
        match self {
            StyleMapping::Category(m) => &m.property,
            StyleMapping::Scale(m) => &m.property,
            StyleMapping::Threshold(m) => &m.property,
        }
    }

    /// Path of the record field feeding the mapping.
    pub fn field(&self) -> &str {
        match self {
            StyleMapping::Category(m) => &m.field,
            StyleMapping::Scale(m) => &m.field,
            StyleMapping::Threshold(m) => &m.field,
        }
    }

    /// Resolve a field value. `None` only when an unmatched category is omitted.
    pub fn resolve(&self, value: Option<&Value>) -> Option<StyleValue> {
        match self {
            StyleMapping::Category(m) => m.resolve(value),
            StyleMapping::Scale(m) => Some(m.resolve(value)),
            StyleMapping::Threshold(m) => Some(m.resolve(value)),
        }
    }

    pub fn resolve_category(&self, value: Option<&Value>) -> Result<Option<StyleValue>, MappingError> {
        match self {
            StyleMapping::Category(m) => Ok(m.resolve(value)),
            other => Err(other.mismatch(MappingKind::Category)),
        }
    }

    pub fn resolve_scale(&self, value: Option<&Value>) -> Result<StyleValue, MappingError> {
        match self {
            StyleMapping::Scale(m) => Ok(m.resolve(value)),
            other => Err(other.mismatch(MappingKind::Scale)),
        }
    }

    pub fn resolve_threshold(&self, value: Option<&Value>) -> Result<StyleValue, MappingError> {
        match self {
            StyleMapping::Threshold(m) => Ok(m.resolve(value)),
            other => Err(other.mismatch(MappingKind::Threshold)),
        }
    }

    fn mismatch(&self, expected: MappingKind) -> MappingError {
        MappingError::KindMismatch {
            expected,
            found: self.kind(),
        }
    }
}

fn checked_field(field: String) -> Result<String, MappingError> {
    let field = field.trim().to_string();
    if field.is_empty() {
        return Err(MappingError::EmptyField);
    }
    validate_path(&field).map_err(MappingError::InvalidField)?;
    Ok(field)
}
