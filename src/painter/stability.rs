use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tracing::debug;

use super::{ImageFormat, Painter, Painting};
use crate::consts::DEFAULT_IMAGE_MODEL;
use crate::error::{ApiError, truncate_body};

const API_BASE: &str = "https://api.stability.ai/v2beta/stable-image/generate";
const SERVICE: &str = "Stability";

/// An image painter backed by the Stability AI stable-image REST API.
pub struct StabilityPainter {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl StabilityPainter {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}", self.model)
    }

    /// The image and the seed it was rendered with.
    fn parse_response(body: &str) -> Result<(Painting, Option<u64>), ApiError> {
        let resp: ApiResponse = serde_json::from_str(body).map_err(|e| {
            ApiError::UnexpectedResponse(format!(
                "Stability body is not JSON ({e}): {}",
                truncate_body(body)
            ))
        })?;

        if resp.finish_reason.as_deref() == Some("CONTENT_FILTERED") {
            return Err(ApiError::ContentFiltered(
                "Stability safety filter rejected the prompt".to_string(),
            ));
        }

        let image = resp
            .image
            .filter(|i| !i.is_empty())
            .ok_or_else(|| ApiError::UnexpectedResponse("Stability returned no image".into()))?;
        let data = STANDARD
            .decode(image.as_bytes())
            .map_err(|e| ApiError::UnexpectedResponse(format!("bad base64 image: {e}")))?;

        let painting = Painting {
            data,
            format: ImageFormat::Png,
        };
        Ok((painting, resp.seed))
    }
}

#[async_trait]
impl Painter for StabilityPainter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn paint(&self, prompt: &str) -> Result<Painting> {
        // multipart/form-data is the only body this endpoint accepts
        let form = reqwest::multipart::Form::new()
            .text("prompt", prompt.to_string())
            .text("output_format", ImageFormat::Png.extension());

        debug!(model = %self.model, "requesting illustration from Stability");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                service: SERVICE,
                source,
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("failed to read Stability response body")?;

        if !status.is_success() {
            return Err(ApiError::Status {
                service: SERVICE,
                status: status.as_u16(),
                message: truncate_body(&text),
            }
            .into());
        }

        let (painting, seed) = Self::parse_response(&text)?;
        debug!(
            model = %self.model,
            seed,
            bytes = painting.data.len(),
            "Stability returned an image"
        );
        Ok(painting)
    }
}

// --- API types ---

#[derive(Deserialize)]
struct ApiResponse {
    image: Option<String>,
    finish_reason: Option<String>,
    seed: Option<u64>,
}
