/// brand-batch
///
/// Bulk image generation for brand content: one image per prompt, generated
/// strictly one at a time, with the brand logo composited onto every result.

pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod image_data;
pub mod logo;
pub mod processing;
pub mod prompts;
pub mod state;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::compositor::{composite, composite_async, BadgeStyle, CompositeOptions, CompositingConfig, LogoPlacement};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{BatchError, CompositeError, DataUriError, GenerationError};
pub use crate::export::{archive_file_name, export_archive, export_completed, ArchiveSummary, ExportSummary};
pub use crate::generation::{create_generator, GenerationConfig, GeneratorProvider, ImageGenerator};
pub use crate::image_data::EncodedImage;
pub use crate::logo::{LogoPosition, LogoSettings, SharedLogoSettings};
pub use crate::processing::{apply_logo, BatchHandle, BatchRunner};
pub use crate::prompts::{BrandStyle, PromptList};
pub use crate::state::{BatchEvent, BatchOutcome, BatchReport, BatchStatus, GenerationJob, JobStatus};
