use indexmap::IndexMap;
use serde::Serialize;

use crate::mapping::StyleValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    Rectangle,
    RoundRect,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Diamond,
    Hexagon,
    Parallelogram,
    Trapezoid,
    Text,
}

impl NodeShape {
    pub fn from_token(token: &str) -> Option<Self> {
        let shape = match token.trim().to_ascii_lowercase().as_str() {
            "rect" | "rectangle" | "box" => Self::Rectangle,
            "round" | "rounded" | "roundrect" => Self::RoundRect,
            "stadium" | "pill" => Self::Stadium,
            "subroutine" => Self::Subroutine,
            "cylinder" | "database" | "db" => Self::Cylinder,
            "circle" => Self::Circle,
            "doublecircle" => Self::DoubleCircle,
            "diamond" | "decision" => Self::Diamond,
            "hexagon" => Self::Hexagon,
            "parallelogram" => Self::Parallelogram,
            "trapezoid" => Self::Trapezoid,
            "text" | "none" => Self::Text,
            _ => return None,
        };
        Some(shape)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStyle {
    Solid,
    Dotted,
    Thick,
}

impl EdgeStyle {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "solid" | "-->" => Some(Self::Solid),
            "dotted" | "dashed" | "-.->" => Some(Self::Dotted),
            "thick" | "==>" => Some(Self::Thick),
            _ => None,
        }
    }
}

/// Resolved style properties in blueprint declaration order.
pub type StyleMap = IndexMap<String, StyleValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub shape: NodeShape,
    pub style: StyleMap,
    /// Template that produced the node.
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: EdgeStyle,
    pub style: StyleMap,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Element {
    Node(Node),
    Edge(Edge),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Node(node) => &node.id,
            Element::Edge(edge) => &edge.id,
        }
    }

    pub fn style(&self) -> &StyleMap {
        match self {
            Element::Node(node) => &node.style,
            Element::Edge(edge) => &edge.style,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(edge) => Some(edge),
            Element::Node(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_tokens() {
        assert_eq!(NodeShape::from_token("Rounded"), Some(NodeShape::RoundRect));
        assert_eq!(NodeShape::from_token(" db "), Some(NodeShape::Cylinder));
        assert_eq!(NodeShape::from_token("blob"), None);
        assert_eq!(EdgeStyle::from_token("dashed"), Some(EdgeStyle::Dotted));
        assert_eq!(EdgeStyle::from_token("==>"), Some(EdgeStyle::Thick));
    }

    #[test]
    fn serializes_elements_with_type_tag() {
        let node = Element::Node(Node {
            id: "n1".into(),
            label: "One".into(),
            subtitle: None,
            shape: NodeShape::RoundRect,
            style: IndexMap::from([("opacity".to_string(), StyleValue::Number(0.5))]),
            template: "t".into(),
        });
        let json = serde_json::to_string(&node).expect("serializable");
        assert_eq!(
            json,
            r#"{"type":"node","id":"n1","label":"One","shape":"roundRect","style":{"opacity":0.5},"template":"t"}"#
        );
    }
}
