use crate::config::{Config, load_config};
use crate::document::{Diagram, expand_document};
use crate::render::{LegendRenderOptions, render_legends_svg, write_output_json, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "stylemap",
    version,
    about = "Expand data-driven diagram templates and synthesize style legends"
)]
pub struct Args {
    /// Input document (.json or .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, palette, legend)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width used to place legends
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height used to place legends
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Elements, diagnostics and legend descriptors
    Json,
    /// Legends as a standalone SVG
    Svg,
    /// Legends rasterized to PNG (needs the `png` feature)
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let diagram = expand_document(&input, &config)?;

    match args.output_format {
        OutputFormat::Json => {
            write_output_json(&diagram, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            report_diagnostics(&diagram);
            write_output_svg(&legend_svg(&diagram, &config), args.output.as_deref())?;
        }
        OutputFormat::Png => {
            report_diagnostics(&diagram);
            let output = ensure_output(&args.output, "png")?;
            write_png(&legend_svg(&diagram, &config), &output, &config)?;
        }
    }

    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let config = load_config(args.config.as_deref())?;
    if args.width.is_none() && args.height.is_none() {
        return Ok(config);
    }
    let width = args.width.unwrap_or(config.render.width);
    let height = args.height.unwrap_or(config.render.height);
    if !(width > 0.0 && height > 0.0) {
        return Err(anyhow::anyhow!("Canvas size must be positive, got {width}x{height}"));
    }
    Ok(config.with_canvas(width, height))
}

fn legend_svg(diagram: &Diagram, config: &Config) -> String {
    render_legends_svg(
        &diagram.legends,
        &LegendRenderOptions::from_config(config),
        &config.theme,
        config.render.width,
        config.render.height,
    )
}

fn report_diagnostics(diagram: &Diagram) {
    for diagnostic in &diagram.diagnostics {
        match &diagnostic.property {
            Some(property) => eprintln!(
                "warning: template `{}`, record {}, `{}`: {}",
                diagnostic.template, diagnostic.record, property, diagnostic.message
            ),
            None => eprintln!(
                "warning: template `{}`, record {}: {}",
                diagnostic.template, diagnostic.record, diagnostic.message
            ),
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
