//! HTTP prediction client implementation

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::traits::{
    PredictionJob, PredictionOutput, PredictionService, PredictionStatus, SubmitRequest,
};
use crate::config::{GenerationConfig, ServiceConfig};
use crate::error::{Result, TransferError};

/// Talks to the prediction proxy over HTTP
pub struct HttpPredictionClient {
    name: String,
    client: Client,
    service: ServiceConfig,
    generation: GenerationConfig,
}

/// Body posted to create a prediction
#[derive(Debug, Serialize)]
struct ApiSubmitRequest<'a> {
    image: String,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    num_inference_steps: u32,
    guidance_scale: f32,
    output_format: &'a str,
    output_quality: u8,
    prompt_strength: f32,
}

/// Prediction as returned by both the create and the status endpoints
#[derive(Debug, Deserialize)]
struct ApiPrediction {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    urls: Option<ApiUrls>,
    #[serde(default)]
    output: Option<PredictionOutput>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiUrls {
    #[serde(default)]
    get: Option<String>,
}

impl ApiPrediction {
    /// Turn a wire prediction into a snapshot, inheriting identity from `previous`
    fn into_job(self, previous: Option<&PredictionJob>) -> Result<PredictionJob> {
        let status = PredictionStatus::parse(&self.status)?;

        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| previous.map(|job| job.id.clone()))
            .ok_or_else(|| {
                TransferError::MalformedResponse("prediction response has no id".to_string())
            })?;

        let status_url = self
            .urls
            .and_then(|urls| urls.get)
            .filter(|url| !url.trim().is_empty())
            .or_else(|| previous.and_then(|job| job.status_url.clone()));

        let error = match self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(message)) => Some(message),
            Some(other) => Some(other.to_string()),
        };

        Ok(PredictionJob {
            id,
            status_url,
            status,
            output: self.output.map(PredictionOutput::into_vec).unwrap_or_default(),
            error,
        })
    }
}

impl HttpPredictionClient {
    /// Create a new HTTP client from configuration
    pub fn new(service: &ServiceConfig, generation: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(service.request_timeout_ms))
            .build()
            .map_err(|e| TransferError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: "http".to_string(),
            client,
            service: service.clone(),
            generation: generation.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.service.api_key {
            Some(key) if !key.is_empty() => request.bearer_auth(key),
            _ => request,
        }
    }

    fn status_url(&self, job: &PredictionJob) -> String {
        job.status_url
            .clone()
            .unwrap_or_else(|| self.service.prediction_url(&job.id))
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, request: SubmitRequest) -> Result<PredictionJob> {
        let url = self.service.predictions_url();

        let body = ApiSubmitRequest {
            image: request.image.data_url(),
            prompt: &request.prompt,
            style: request.style.as_deref(),
            negative_prompt: self.generation.negative_prompt.as_deref(),
            num_inference_steps: self.generation.num_inference_steps,
            guidance_scale: self.generation.guidance_scale,
            output_format: &self.generation.output_format,
            output_quality: self.generation.output_quality,
            prompt_strength: self.generation.prompt_strength,
        };
        // The encoded image is only needed until the body is built
        drop(request.image);

        debug!(url = %url, "Submitting prediction");

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Prediction submission rejected");
            return Err(TransferError::Submission {
                status: status.as_u16(),
                body,
            });
        }

        let prediction: ApiPrediction = response.json().await.map_err(|e| {
            TransferError::MalformedResponse(format!("Failed to parse submission response: {}", e))
        })?;

        prediction.into_job(None)
    }

    async fn status(&self, job: &PredictionJob) -> Result<PredictionJob> {
        let url = self.status_url(job);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() || e.is_request() {
                    TransferError::Poll {
                        status: None,
                        message: format!("Request to {} failed: {}", url, e),
                    }
                } else {
                    TransferError::HttpClient(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::Poll {
                status: Some(status.as_u16()),
                message: format!("Status endpoint returned {}: {}", status, body),
            });
        }

        let prediction: ApiPrediction = response.json().await.map_err(|e| {
            TransferError::MalformedResponse(format!("Failed to parse status response: {}", e))
        })?;

        prediction.into_job(Some(job))
    }

    async fn fetch_output(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "Downloading result image");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::RemoteFailure(format!(
                "Result download from {} returned {}",
                url, status
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(TransferError::EmptyResult(url.to_string()));
        }

        Ok(bytes.to_vec())
    }
}
