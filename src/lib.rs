#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod correlation;
pub mod error;
pub mod hook;
pub mod locator;
pub mod models;
pub mod paths;
pub mod processor;
pub mod report;
pub mod scanner;

pub use builder::ImportResolverBuilder;
pub use config::ResolverConfig;
pub use correlation::{
  CorrelationId, CorrelationIdProvider, CorrelationStore, FixedCorrelation, ThreadCorrelation,
};
pub use error::{ResolveError, ResolveResult};
pub use hook::{ImportListener, NoopListener, PassThrough, TransformHook};
pub use locator::{FileSystemLocator, MemoryLocator, ResourceLocator};
pub use models::{Resource, ResourceType};
pub use processor::{ImportResolver, ResolveContext, ResourceProcessor};
pub use report::{ImportGraph, ImportGraphCollector, render_json};
pub use scanner::{CssImportScanner, ImportScanner};
