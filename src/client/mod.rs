//! Client module - prediction service trait and HTTP implementation

pub mod http;
pub mod traits;

pub use http::HttpPredictionClient;
pub use traits::{PredictionJob, PredictionService, PredictionStatus, SubmitRequest};
