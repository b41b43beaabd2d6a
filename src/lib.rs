//! Style Transfer Client
//!
//! Re-renders a photo in an artistic style by delegating synthesis to a remote
//! asynchronous prediction service: the image is prepared, a prediction is
//! submitted and polled to completion, and a local simulation stands in
//! whenever the remote path fails.

pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod pipeline;
pub mod polling;
pub mod preprocess;
pub mod progress;
pub mod prompt;
pub mod storage;

pub use error::{Result, TransferError};
pub use pipeline::{ResultHandle, StyleTransfer, TransferResult};
pub use preprocess::{EncodedImage, SourceImage};
pub use progress::{ProgressEvent, ProgressSender, ProgressStream, Stage};
pub use prompt::{build_prompt, PromptTable, StyleDescriptor};
