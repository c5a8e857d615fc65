//! Diagram documents: data sources, templates and legend declarations as JSON.
//!
//! A document is the already-parsed form of the diagram DSL:
//!
//! ```json
//! {
//!   "sources": { "services": [ { "name": "web", "kind": "frontend" } ] },
//!   "templates": [{
//!     "id": "svc", "from": "services", "filter": "active",
//!     "nodes": [{ "label": "${name}", "style": {
//!       "fill": { "kind": "category", "field": "kind", "categories": ["frontend", "db"] }
//!     } }]
//!   }],
//!   "legends": [{ "property": "fill", "field": "kind", "position": "top-left" }]
//! }
//! ```
//!
//! Compiling a document validates every template and mapping up front, so
//! expansion only ever reports per-record problems.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{Config, LegendLayoutConfig};
use crate::error::{DocumentError, MappingError, TemplateError};
use crate::eval::EvalOptions;
use crate::ir::Element;
use crate::legend::{LegendConfig, LegendDescriptor, LegendPosition, LegendRequest, synthesize_all};
use crate::log::debug;
use crate::mapping::{
    Breakpoint, CategoryFallback, CategoryMapping, ScaleMapping, ScaleRange, StyleMapping,
    StyleValue, ThresholdMapping,
};
use crate::template::{
    Diagnostic, EdgeBlueprint, Filter, NodeBlueprint, RecordErrorPolicy, StyleBinding, Template,
    expand_all,
};
use crate::theme::Palette;
use crate::value::{DataRecord, DataSource, DataSources, Value, format_number};

/// A number or a string in a document, e.g. a style or a category key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn into_text(self) -> String {
        match self {
            Scalar::Number(n) => format_number(n),
            Scalar::Text(text) => text,
        }
    }

    /// Numbers stay numeric so `strokeWidth: 2` serializes as `2`.
    pub fn into_style(self) -> StyleValue {
        match self {
            Scalar::Number(n) => StyleValue::Number(n),
            Scalar::Text(text) => StyleValue::Text(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceDecl {
    pub name: String,
    #[serde(default)]
    pub records: Vec<DataRecord>,
}

/// Sources either keyed by name or listed with explicit names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SourcesDecl {
    Named(IndexMap<String, Vec<DataRecord>>),
    Listed(Vec<SourceDecl>),
}

impl Default for SourcesDecl {
    fn default() -> Self {
        SourcesDecl::Named(IndexMap::new())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CategoryDecl {
    /// Keys only; styles come from the palette in order.
    Keys(Vec<Scalar>),
    /// Key to style. A `null` style takes the next palette color.
    Table(IndexMap<String, Option<Scalar>>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BreakpointDecl {
    pub value: f64,
    pub style: Scalar,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MappingDecl {
    Category {
        field: String,
        categories: CategoryDecl,
        #[serde(default)]
        fallback: Option<Scalar>,
        #[serde(default, rename = "omitUnmatched")]
        omit_unmatched: bool,
    },
    Scale {
        field: String,
        domain: (f64, f64),
        range: (Scalar, Scalar),
    },
    Threshold {
        field: String,
        breakpoints: Vec<BreakpointDecl>,
    },
}

impl MappingDecl {
    /// Build the mapping for `property`, filling unstyled categories from `palette`.
    pub fn compile(self, property: &str, palette: &Palette) -> Result<StyleMapping, MappingError> {
        match self {
            MappingDecl::Category {
                field,
                categories,
                fallback,
                omit_unmatched,
            } => {
                let entries: IndexMap<String, StyleValue> = match categories {
                    CategoryDecl::Keys(keys) => keys
                        .into_iter()
                        .enumerate()
                        .map(|(idx, key)| (key.into_text(), StyleValue::from(palette.color(idx))))
                        .collect(),
                    CategoryDecl::Table(table) => table
                        .into_iter()
                        .enumerate()
                        .map(|(idx, (key, style))| {
                            let style = style
                                .map(Scalar::into_style)
                                .unwrap_or_else(|| StyleValue::from(palette.color(idx)));
                            (key, style)
                        })
                        .collect(),
                };
                let fallback = if omit_unmatched {
                    CategoryFallback::Omit
                } else {
                    CategoryFallback::Style(
                        fallback
                            .map(Scalar::into_style)
                            .unwrap_or_else(|| StyleValue::from(palette.neutral.as_str())),
                    )
                };
                CategoryMapping::new(property, field, entries, fallback).map(StyleMapping::Category)
            }
            MappingDecl::Scale {
                field,
                domain,
                range: (from, to),
            } => {
                let range = ScaleRange::parse(&from.into_text(), &to.into_text())?;
                ScaleMapping::new(property, field, domain, range).map(StyleMapping::Scale)
            }
            MappingDecl::Threshold { field, breakpoints } => {
                let breakpoints = breakpoints
                    .into_iter()
                    .map(|bp| Breakpoint {
                        value: bp.value,
                        style: bp.style.into_style(),
                    })
                    .collect();
                ThresholdMapping::new(property, field, breakpoints).map(StyleMapping::Threshold)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleBindingDecl {
    Literal(Scalar),
    Mapping(MappingDecl),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeDecl {
    pub id: Option<String>,
    pub label: String,
    pub subtitle: Option<String>,
    pub shape: Option<String>,
    pub style: IndexMap<String, StyleBindingDecl>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EdgeDecl {
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub style: IndexMap<String, StyleBindingDecl>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDecl {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "default_true")]
    pub safe_navigation: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub on_error: RecordErrorPolicy,
    #[serde(default)]
    pub nodes: Vec<NodeDecl>,
    #[serde(default)]
    pub edges: Vec<EdgeDecl>,
}

/// `legend for <property>:<field>` with optional hints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegendDecl {
    pub property: String,
    pub field: String,
    pub position: Option<String>,
    pub title: Option<String>,
    pub steps: Option<usize>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentDecl {
    pub sources: SourcesDecl,
    pub templates: Vec<TemplateDecl>,
    pub legends: Vec<LegendDecl>,
}

/// A legend declaration bound to the mapping it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendBinding {
    pub mapping: StyleMapping,
    pub config: LegendConfig,
}

/// A validated document, ready to expand.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub sources: DataSources,
    pub templates: Vec<Template>,
    pub legends: Vec<LegendBinding>,
}

/// Everything one document produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagram {
    pub elements: Vec<Element>,
    pub diagnostics: Vec<Diagnostic>,
    pub legends: Vec<LegendDescriptor>,
}

impl DocumentDecl {
    pub fn compile(self, palette: &Palette) -> Result<Document, DocumentError> {
        let mut sources = DataSources::new();
        match self.sources {
            SourcesDecl::Named(named) => {
                for (name, records) in named {
                    sources.insert(name.clone(), DataSource::new(name, records));
                }
            }
            SourcesDecl::Listed(listed) => {
                for source in listed {
                    if sources.contains_key(&source.name) {
                        return Err(DocumentError::DuplicateSource(source.name));
                    }
                    sources.insert(source.name.clone(), DataSource::new(source.name, source.records));
                }
            }
        }

        let mut templates: Vec<Template> = Vec::with_capacity(self.templates.len());
        for decl in self.templates {
            if templates.iter().any(|t| t.id == decl.id) {
                return Err(DocumentError::DuplicateTemplate(decl.id));
            }
            templates.push(compile_template(decl, palette)?);
        }

        let legends = self
            .legends
            .into_iter()
            .map(|decl| bind_legend(decl, &templates))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "compiled document: {} sources, {} templates, {} legends",
            sources.len(),
            templates.len(),
            legends.len()
        );
        Ok(Document {
            sources,
            templates,
            legends,
        })
    }
}

fn compile_template(decl: TemplateDecl, palette: &Palette) -> Result<Template, TemplateError> {
    let id = decl.id;
    let mut template = Template::new(id.clone(), decl.from)
        .with_eval(EvalOptions {
            safe_navigation: decl.safe_navigation,
            default_value: decl.default_value,
        })
        .with_error_policy(decl.on_error);

    if let Some(filter) = decl.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        let filter = Filter::parse(filter).map_err(|source| TemplateError::Path {
            template: id.clone(),
            field: "filter".to_string(),
            source,
        })?;
        template = template.with_filter(filter);
    }

    for node in decl.nodes {
        template = template.with_node(NodeBlueprint {
            id: node.id,
            label: node.label,
            subtitle: node.subtitle,
            shape: node.shape,
            style: compile_style(&id, node.style, palette)?,
        });
    }
    for edge in decl.edges {
        template = template.with_edge(EdgeBlueprint {
            id: edge.id,
            from: edge.from,
            to: edge.to,
            label: edge.label,
            kind: edge.kind,
            style: compile_style(&id, edge.style, palette)?,
        });
    }

    template.validate()?;
    Ok(template)
}

fn compile_style(
    template: &str,
    style: IndexMap<String, StyleBindingDecl>,
    palette: &Palette,
) -> Result<IndexMap<String, StyleBinding>, TemplateError> {
    let mut out = IndexMap::with_capacity(style.len());
    for (property, binding) in style {
        let binding = match binding {
            StyleBindingDecl::Literal(Scalar::Number(n)) => StyleBinding::Constant(StyleValue::Number(n)),
            StyleBindingDecl::Literal(Scalar::Text(text)) => StyleBinding::Literal(text),
            StyleBindingDecl::Mapping(decl) => {
                let mapping =
                    decl.compile(&property, palette)
                        .map_err(|source| TemplateError::Mapping {
                            template: template.to_string(),
                            property: property.clone(),
                            source,
                        })?;
                StyleBinding::Mapped(mapping)
            }
        };
        out.insert(property, binding);
    }
    Ok(out)
}

fn bind_legend(decl: LegendDecl, templates: &[Template]) -> Result<LegendBinding, DocumentError> {
    let property = decl.property.trim();
    let field = decl.field.trim();
    let mapping = templates
        .iter()
        .flat_map(Template::mappings)
        .find(|m| m.property() == property && m.field() == field)
        .ok_or_else(|| DocumentError::UnknownLegendMapping {
            property: property.to_string(),
            field: field.to_string(),
        })?;
    let position = decl
        .position
        .as_deref()
        .map(|token| {
            LegendPosition::from_token(token)
                .ok_or_else(|| DocumentError::InvalidLegendPosition(token.to_string()))
        })
        .transpose()?;
    Ok(LegendBinding {
        mapping: mapping.clone(),
        config: LegendConfig {
            steps: decl.steps,
            position,
            title: decl.title,
            width: decl.width,
            height: decl.height,
        },
    })
}

impl Document {
    /// Expand every template, then synthesize the declared legends.
    pub fn expand(&self, layout: &LegendLayoutConfig) -> Result<Diagram, TemplateError> {
        let expansion = expand_all(&self.templates, &self.sources)?;
        let requests: Vec<LegendRequest<'_>> = self
            .legends
            .iter()
            .map(|legend| LegendRequest {
                mapping: &legend.mapping,
                config: legend.config.clone(),
            })
            .collect();
        Ok(Diagram {
            elements: expansion.elements,
            diagnostics: expansion.diagnostics,
            legends: synthesize_all(&requests, layout),
        })
    }
}

/// Read a document as JSON, falling back to JSON5 for hand-written input.
///
/// Well-formed JSON of the wrong shape reports the JSON error; anything else
/// reports what the JSON5 parser found.
pub fn parse_document(input: &str) -> Result<DocumentDecl, DocumentError> {
    match serde_json::from_str::<DocumentDecl>(input) {
        Ok(decl) => Ok(decl),
        Err(err) if err.is_data() => Err(DocumentError::Syntax(err)),
        Err(_) => json5::from_str::<DocumentDecl>(input).map_err(DocumentError::Json5),
    }
}

/// Parse, compile and expand `input` with `config`.
pub fn expand_document(input: &str, config: &Config) -> Result<Diagram, DocumentError> {
    let document = parse_document(input)?.compile(&config.palette)?;
    Ok(document.expand(&config.legend)?)
}
