use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::{ImageIntake, IntakeError, NormalizedImage};

pub fn parse_image_url(raw: &str) -> Result<Url, IntakeError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| IntakeError::Fetch(format!("invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(IntakeError::Fetch(format!(
            "unsupported URL scheme '{}'",
            scheme
        ))),
    }
}

impl ImageIntake {
    /// Downloads an image and runs it through the same validation as uploads.
    pub async fn from_url(&self, raw_url: &str) -> Result<NormalizedImage, IntakeError> {
        let url = parse_image_url(raw_url)?;
        log::info!("Downloading image from URL: {}", url);

        let mut response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                IntakeError::Fetch(format!("timed out fetching {}", url))
            } else {
                IntakeError::Fetch(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntakeError::Fetch(format!(
                "{} returned status {}",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            self.check_size(length)?;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let limit = self.max_image_bytes();
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| IntakeError::Fetch(format!("failed to read body from {}: {}", url, e)))?
        {
            let size = body.len() + chunk.len();
            if size > limit {
                log::warn!("Aborted download of {} after {} bytes", url, size);
                return Err(IntakeError::TooLarge {
                    size: size as u64,
                    limit,
                });
            }
            body.extend_from_slice(&chunk);
        }

        self.from_bytes(&body, content_type.as_deref())
    }
}
