//! `css-imports`: print the resolved `@import` graph of a stylesheet on disk as JSON.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use same_file::is_same_file;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use css_import_resolver::{
  FileSystemLocator, ImportGraphCollector, ImportResolver, Resource, ResolverConfig,
  ResourceLocator, ThreadCorrelation, render_json,
};

#[derive(Debug, Parser)]
#[command(name = "css-imports", version, about = "Resolve the @import graph of a stylesheet")]
struct Cli {
  /// Stylesheet URI, relative to the resource root.
  stylesheet: String,

  /// Directory searched for `css-imports.config.json`.
  #[arg(long, default_value = ".")]
  project_dir: PathBuf,

  /// Explicit configuration file, bypassing discovery.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Resource root overriding the configured `rootDir`.
  #[arg(long)]
  root: Option<PathBuf>,

  /// Record imports that cannot be located instead of failing.
  #[arg(long)]
  ignore_missing: bool,

  /// Write the report to a file instead of stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Increase log verbosity (`-v` debug, `-vv` trace).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let mut config = match &cli.config {
    Some(path) => ResolverConfig::from_path(path)?,
    None => ResolverConfig::try_discover(&cli.project_dir)?,
  };
  if cli.ignore_missing {
    config.ignore_missing_resources = true;
  }
  init_tracing(&config, cli.verbose);

  let root = cli
    .root
    .clone()
    .unwrap_or_else(|| config.root_dir_path(&cli.project_dir));
  let locator = FileSystemLocator::new(root);

  let source_path = locator.path_for(&cli.stylesheet);
  if let Some(output) = &cli.output
    && output.exists()
    && is_same_file(&source_path, output).unwrap_or(false)
  {
    bail!(
      "refusing to overwrite {} with its own import report",
      source_path.display()
    );
  }

  let collector = Arc::new(ImportGraphCollector::new(config.ignore_missing_resources));
  let resolver = ImportResolver::builder()
    .locator(locator.clone())
    .shared_hook(collector.clone())
    .shared_listener(collector.clone())
    .build();

  let resource = Resource::css(cli.stylesheet.as_str());
  let content = locator.read_to_string(resource.uri())?;

  let _run = ThreadCorrelation::begin();
  resolver
    .process(&resource, &content)
    .with_context(|| format!("failed to resolve imports of {}", resource.uri()))?;

  let json = render_json(&collector.graph())?;
  match &cli.output {
    Some(path) => {
      fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    None => println!("{json}"),
  }

  Ok(())
}

fn init_tracing(config: &ResolverConfig, verbose: u8) {
  let filter = match verbose {
    0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
    1 => EnvFilter::new("debug"),
    _ => EnvFilter::new("trace"),
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
    .with(filter)
    .init();
}
