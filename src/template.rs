//! Template expansion: one concrete element per blueprint per retained record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::coerce::{is_truthy, to_text};
use crate::error::{PathError, TemplateError};
use crate::eval::{EvalOptions, evaluate_path, validate_path};
use crate::expr::{template_paths, try_expand_expression, try_expand_expression_value};
use crate::ir::{Edge, EdgeStyle, Element, Node, NodeShape, StyleMap};
use crate::log::{debug, warn};
use crate::mapping::{StyleMapping, StyleValue};
use crate::value::{DataRecord, DataSources};

/// How a style property gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleBinding {
    /// Literal text, possibly with `${path}` tokens. A lone token keeps its raw type.
    Literal(String),
    /// A value applied as is, e.g. a numeric `strokeWidth`.
    Constant(StyleValue),
    Mapped(StyleMapping),
}

/// Record filter: a path coerced to boolean, optionally negated with a leading `!`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub path: String,
    pub negate: bool,
}

impl Filter {
    /// Accepts `user.active`, `!user.active` and `${user.active}`.
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let mut text = expr.trim();
        let negate = text.starts_with('!');
        if negate {
            text = text[1..].trim_start();
        }
        if let Some(inner) = text.strip_prefix("${").and_then(|t| t.strip_suffix('}')) {
            text = inner.trim();
        }
        validate_path(text)?;
        Ok(Self {
            path: text.to_string(),
            negate,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeBlueprint {
    pub id: Option<String>,
    pub label: String,
    pub subtitle: Option<String>,
    pub shape: Option<String>,
    pub style: IndexMap<String, StyleBinding>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeBlueprint {
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub kind: Option<String>,
    pub style: IndexMap<String, StyleBinding>,
}

/// What to do when a record fails a strict lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordErrorPolicy {
    /// Drop the failing element and record a diagnostic.
    #[default]
    Skip,
    /// Fail the whole template.
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub source: String,
    pub filter: Option<Filter>,
    pub nodes: Vec<NodeBlueprint>,
    pub edges: Vec<EdgeBlueprint>,
    pub eval: EvalOptions,
    pub on_error: RecordErrorPolicy,
}

impl Template {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            filter: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            eval: EvalOptions::default(),
            on_error: RecordErrorPolicy::default(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_node(mut self, node: NodeBlueprint) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: EdgeBlueprint) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_eval(mut self, eval: EvalOptions) -> Self {
        self.eval = eval;
        self
    }

    pub fn with_error_policy(mut self, policy: RecordErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Every mapped style binding, nodes first, in declaration order.
    pub fn mappings(&self) -> impl Iterator<Item = &StyleMapping> {
        self.nodes
            .iter()
            .flat_map(|node| node.style.values())
            .chain(self.edges.iter().flat_map(|edge| edge.style.values()))
            .filter_map(|binding| match binding {
                StyleBinding::Mapped(mapping) => Some(mapping),
                StyleBinding::Literal(_) | StyleBinding::Constant(_) => None,
            })
    }

    /// Reject `${}` tokens with empty or malformed paths before any record is read.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for (idx, node) in self.nodes.iter().enumerate() {
            let field = |name: &str| format!("nodes[{idx}].{name}");
            if let Some(id) = &node.id {
                self.check_text(field("id"), id)?;
            }
            self.check_text(field("label"), &node.label)?;
            if let Some(subtitle) = &node.subtitle {
                self.check_text(field("subtitle"), subtitle)?;
            }
            if let Some(shape) = &node.shape {
                self.check_text(field("shape"), shape)?;
            }
            self.check_style(|p| field(p), &node.style)?;
        }
        for (idx, edge) in self.edges.iter().enumerate() {
            let field = |name: &str| format!("edges[{idx}].{name}");
            if let Some(id) = &edge.id {
                self.check_text(field("id"), id)?;
            }
            self.check_text(field("from"), &edge.from)?;
            self.check_text(field("to"), &edge.to)?;
            if let Some(label) = &edge.label {
                self.check_text(field("label"), label)?;
            }
            if let Some(kind) = &edge.kind {
                self.check_text(field("kind"), kind)?;
            }
            self.check_style(|p| field(p), &edge.style)?;
        }
        if let Some(filter) = &self.filter {
            validate_path(&filter.path).map_err(|source| TemplateError::Path {
                template: self.id.clone(),
                field: "filter".to_string(),
                source,
            })?;
        }
        Ok(())
    }

    fn check_style(
        &self,
        field: impl Fn(&str) -> String,
        style: &IndexMap<String, StyleBinding>,
    ) -> Result<(), TemplateError> {
        for (property, binding) in style {
            if let StyleBinding::Literal(text) = binding {
                self.check_text(field(property.as_str()), text)?;
            }
        }
        Ok(())
    }

    fn check_text(&self, field: String, text: &str) -> Result<(), TemplateError> {
        for path in template_paths(text) {
            validate_path(path).map_err(|source| TemplateError::Path {
                template: self.id.clone(),
                field: field.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// A non-fatal problem found while expanding one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub template: String,
    /// Index of the record in its data source.
    pub record: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expansion {
    pub elements: Vec<Element>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Expansion {
    pub fn extend(&mut self, other: Expansion) {
        self.elements.extend(other.elements);
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.elements.iter().filter_map(Element::as_node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.elements.iter().filter_map(Element::as_edge)
    }
}

/// Expand templates in declaration order and concatenate the results.
pub fn expand_all(templates: &[Template], sources: &DataSources) -> Result<Expansion, TemplateError> {
    let mut out = Expansion::default();
    for template in templates {
        out.extend(expand(template, sources)?);
    }
    Ok(out)
}

/// Instantiate `template` once per retained record of its data source.
pub fn expand(template: &Template, sources: &DataSources) -> Result<Expansion, TemplateError> {
    template.validate()?;
    let source = sources
        .get(&template.source)
        .ok_or_else(|| TemplateError::MissingDataSource {
            template: template.id.clone(),
            source_name: template.source.clone(),
        })?;

    debug!(
        "expanding template `{}` over {} records of `{}`",
        template.id,
        source.len(),
        source.name
    );

    let mut expander = Expander::new(template);
    for (index, record) in source.records.iter().enumerate() {
        expander.record(index, record)?;
    }
    expander.link_edges();

    debug!(
        "template `{}` produced {} elements",
        template.id,
        expander.out.elements.len()
    );
    Ok(expander.out)
}

struct Failure {
    property: String,
    source: PathError,
}

impl Failure {
    fn at(property: &str) -> impl FnOnce(PathError) -> Failure + '_ {
        move |source| Failure {
            property: property.to_string(),
            source,
        }
    }
}

struct Expander<'a> {
    template: &'a Template,
    ids: IdAllocator,
    out: Expansion,
}

impl<'a> Expander<'a> {
    fn new(template: &'a Template) -> Self {
        Self {
            template,
            ids: IdAllocator::new(&template.id),
            out: Expansion::default(),
        }
    }

    fn record(&mut self, index: usize, record: &DataRecord) -> Result<(), TemplateError> {
        match self.keep(record) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(failure) => return self.fail(index, failure),
        }

        let template = self.template;
        for blueprint in &template.nodes {
            match self.node(index, blueprint, record) {
                Ok(node) => self.out.elements.push(Element::Node(node)),
                Err(failure) => self.fail(index, failure)?,
            }
        }
        for blueprint in &template.edges {
            match self.edge(blueprint, record) {
                Ok(Some(edge)) => self.out.elements.push(Element::Edge(edge)),
                Ok(None) => self.note(index, None, "edge endpoint expanded to empty text; skipped"),
                Err(failure) => self.fail(index, failure)?,
            }
        }
        Ok(())
    }

    fn keep(&self, record: &DataRecord) -> Result<bool, Failure> {
        let Some(filter) = &self.template.filter else {
            return Ok(true);
        };
        let value =
            evaluate_path(&filter.path, record, &self.template.eval).map_err(Failure::at("filter"))?;
        Ok(is_truthy(value.as_ref()) != filter.negate)
    }

    fn node(
        &mut self,
        index: usize,
        blueprint: &NodeBlueprint,
        record: &DataRecord,
    ) -> Result<Node, Failure> {
        let label = self.text("label", &blueprint.label, record)?;
        let subtitle = blueprint
            .subtitle
            .as_deref()
            .map(|text| self.text("subtitle", text, record))
            .transpose()?;
        let shape = match &blueprint.shape {
            Some(text) => {
                let token = self.text("shape", text, record)?;
                match NodeShape::from_token(&token) {
                    Some(shape) => shape,
                    None => {
                        if !token.trim().is_empty() {
                            self.note(
                                index,
                                Some("shape"),
                                &format!("unknown shape `{token}`, using rectangle"),
                            );
                        }
                        NodeShape::Rectangle
                    }
                }
            }
            None => NodeShape::Rectangle,
        };
        let style = self.style(&blueprint.style, record)?;

        let preferred = match &blueprint.id {
            Some(text) => Some(self.text("id", text, record)?),
            None => self.label_key(&blueprint.label, record),
        };
        Ok(Node {
            id: self.ids.allocate(preferred),
            label,
            subtitle,
            shape,
            style,
            template: self.template.id.clone(),
        })
    }

    fn edge(&mut self, blueprint: &EdgeBlueprint, record: &DataRecord) -> Result<Option<Edge>, Failure> {
        let from = self.text("from", &blueprint.from, record)?;
        let to = self.text("to", &blueprint.to, record)?;
        if from.trim().is_empty() || to.trim().is_empty() {
            return Ok(None);
        }
        let label = blueprint
            .label
            .as_deref()
            .map(|text| self.text("label", text, record))
            .transpose()?
            .filter(|label| !label.is_empty());
        let kind = match &blueprint.kind {
            Some(text) => EdgeStyle::from_token(&self.text("kind", text, record)?),
            None => None,
        }
        .unwrap_or(EdgeStyle::Solid);
        let style = self.style(&blueprint.style, record)?;

        let preferred = match &blueprint.id {
            Some(text) => self.text("id", text, record)?,
            None => format!("{}-{}-{}", self.template.id, slug(&from), slug(&to)),
        };
        Ok(Some(Edge {
            id: self.ids.allocate(Some(preferred)),
            from,
            to,
            label,
            kind,
            style,
            template: self.template.id.clone(),
        }))
    }

    fn style(
        &self,
        bindings: &IndexMap<String, StyleBinding>,
        record: &DataRecord,
    ) -> Result<StyleMap, Failure> {
        let mut style = StyleMap::new();
        for (property, binding) in bindings {
            let value = match binding {
                StyleBinding::Literal(text) => {
                    try_expand_expression_value(text, record, &self.template.eval)
                        .map_err(Failure::at(property))?
                        .and_then(StyleValue::from_value)
                }
                StyleBinding::Constant(value) => Some(value.clone()),
                StyleBinding::Mapped(mapping) => {
                    let input = evaluate_path(mapping.field(), record, &self.template.eval)
                        .map_err(Failure::at(property))?;
                    mapping.resolve(input.as_ref())
                }
            };
            if let Some(value) = value {
                style.insert(property.clone(), value);
            }
        }
        Ok(style)
    }

    fn text(&self, property: &str, text: &str, record: &DataRecord) -> Result<String, Failure> {
        try_expand_expression(text, record, &self.template.eval).map_err(Failure::at(property))
    }

    /// `{template}-{value}` from the first field the label reads, when it has one.
    fn label_key(&self, label: &str, record: &DataRecord) -> Option<String> {
        let path = template_paths(label).into_iter().next()?;
        let value = evaluate_path(path, record, &self.template.eval).ok().flatten()?;
        let key = slug(&to_text(&value));
        (!key.is_empty()).then(|| format!("{}-{key}", self.template.id))
    }

    /// Point endpoints written as a label value (`Ann`) at the node id derived
    /// from it (`org-ann`). Endpoints naming an emitted id are left alone.
    fn link_edges(&mut self) {
        let template = self.template;
        let ids: HashSet<String> = self.out.nodes().map(|node| node.id.clone()).collect();
        for element in &mut self.out.elements {
            let Element::Edge(edge) = element else {
                continue;
            };
            for endpoint in [&mut edge.from, &mut edge.to] {
                if ids.contains(endpoint.as_str()) {
                    continue;
                }
                let derived = format!("{}-{}", template.id, slug(endpoint.as_str()));
                if ids.contains(&derived) {
                    *endpoint = derived;
                }
            }
        }
    }

    fn fail(&mut self, index: usize, failure: Failure) -> Result<(), TemplateError> {
        match self.template.on_error {
            RecordErrorPolicy::Abort => Err(TemplateError::Record {
                template: self.template.id.clone(),
                record: index,
                property: failure.property,
                source: failure.source,
            }),
            RecordErrorPolicy::Skip => {
                let message = failure.source.to_string();
                self.note(index, Some(&failure.property), &message);
                Ok(())
            }
        }
    }

    fn note(&mut self, index: usize, property: Option<&str>, message: &str) {
        warn!(
            "template `{}`, record {}: {}",
            self.template.id, index, message
        );
        self.out.diagnostics.push(Diagnostic {
            template: self.template.id.clone(),
            record: index,
            property: property.map(str::to_string),
            message: message.to_string(),
        });
    }
}

/// Hands out element ids unique within one template expansion.
struct IdAllocator {
    prefix: String,
    counter: usize,
    taken: HashMap<String, usize>,
}

impl IdAllocator {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: 0,
            taken: HashMap::new(),
        }
    }

    fn allocate(&mut self, preferred: Option<String>) -> String {
        let base = match preferred.map(|id| id.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => {
                self.counter += 1;
                format!("{}-{}", self.prefix, self.counter)
            }
        };
        let Some(uses) = self.taken.get(&base).copied() else {
            self.taken.insert(base.clone(), 1);
            return base;
        };
        let mut n = uses + 1;
        let mut candidate = format!("{base}-{n}");
        while self.taken.contains_key(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        self.taken.insert(base, n);
        self.taken.insert(candidate.clone(), 1);
        candidate
    }
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
