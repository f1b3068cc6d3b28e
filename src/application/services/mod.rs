//! Application services
//!
//! Concrete service implementations that orchestrate domain logic. Services
//! depend on I/O boundary traits (`FileSystem`, `PreviewFetcher`) but are
//! themselves concrete structs, not traits.

mod classifier;
mod preview;
mod storage;

pub use classifier::{
    ClassifyOutcome, ClassifyRequest, ClassifySession, RequestItem, TrafficStats,
};
pub use preview::{PagePreview, PreviewFetcher, PreviewService};
pub use storage::StorageService;
