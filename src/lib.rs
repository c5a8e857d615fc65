//! Data-driven diagram templates and style mappings.
//!
//! Templates bound to named data sources expand into styled nodes and edges;
//! category, scale and threshold mappings turn record fields into style values
//! and are summarized as legends.

#[cfg(feature = "cli")]
pub mod cli;
pub mod coerce;
pub mod config;
pub mod document;
pub mod error;
pub mod eval;
pub mod expr;
pub mod ir;
pub mod legend;
mod log;
pub mod mapping;
pub mod render;
pub mod template;
pub mod theme;
pub mod value;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use document::{Diagram, Document, DocumentDecl, expand_document, parse_document};
pub use error::{DocumentError, MappingError, PathError, TemplateError};
pub use eval::{EvalOptions, evaluate_path};
pub use legend::{LegendConfig, LegendDescriptor, LegendPosition, synthesize, synthesize_all};
pub use mapping::{StyleMapping, StyleValue};
pub use render::{LegendRenderOptions, render_legend, render_legends_svg};
pub use template::{Expansion, Template, expand, expand_all};
pub use value::{DataRecord, DataSource, DataSources, Value};
