//! Report rendering and finalization.

pub mod finalizer;
pub mod generator;
pub mod html;

pub use finalizer::Finalizer;
pub use generator::ReportRenderer;

use crate::error::RenderError;
use crate::models::{OutputFormat, ResearchReport};

/// Turns a finished report into a document.
pub trait Renderer: Send + Sync {
    fn render(&self, report: &ResearchReport, format: OutputFormat) -> Result<String, RenderError>;
}

/// A report together with its rendered form.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub format: OutputFormat,
    pub content: String,
    pub report: ResearchReport,
}
