pub mod error;
pub mod job;
pub mod models;
pub mod retry;
pub mod stream;

pub use error::{Error, Result};
pub use job::{CrawlErrors, ExtractStatus, ItemError, JobHandle, JobKind, JobState, JobStatus};
pub use models::{Document, DocumentMetadata};
pub use retry::RetryPolicy;
pub use stream::InboundFrame;
