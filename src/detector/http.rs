use crate::config::FiducialConfig;
use crate::detector::still::prepare_still;
use crate::errors::CaptureError;
use crate::interfaces::MarkerDetector;
use crate::types::FiducialResult;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Marker detector backed by the HTTP validation service
///
/// `POST {service_url}{validate_path}` with the still as multipart field
/// `file`; JSON response `{detected, corners, quality, ready}`.
pub struct HttpMarkerDetector {
    client: reqwest::Client,
    validate_url: String,
    health_url: String,
    max_upload_dim: u32,
    jpeg_quality: u8,
}

impl HttpMarkerDetector {
    pub fn new(config: &FiducialConfig) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CaptureError::DetectionError(format!("Failed to build HTTP client: {}", e)))?;

        let base = config.service_url.trim_end_matches('/');
        Ok(Self {
            client,
            validate_url: format!("{}{}", base, config.validate_path),
            health_url: format!("{}{}", base, config.health_path),
            max_upload_dim: config.max_upload_dim,
            jpeg_quality: config.jpeg_quality,
        })
    }

    pub fn validate_url(&self) -> &str {
        &self.validate_url
    }

    /// Check the service; `Ok` only for a 2xx `{"status":"ok"}`
    pub async fn health(&self) -> Result<(), CaptureError> {
        let resp = self.client.get(&self.health_url).send().await?;
        let resp = check_response(resp).await?;
        let body: HealthResponse = resp.json().await?;
        if body.status != "ok" {
            return Err(CaptureError::DetectionError(format!(
                "service reported status '{}'",
                body.status
            )));
        }
        Ok(())
    }
}

async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CaptureError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_else(|e| {
        log::warn!("Failed to read error body: {}", e);
        String::new()
    });
    Err(CaptureError::DetectionError(format!(
        "service returned {}: {}",
        status.as_u16(),
        text
    )))
}

#[async_trait]
impl MarkerDetector for HttpMarkerDetector {
    async fn detect(&self, still: Bytes) -> Result<FiducialResult, CaptureError> {
        let max_dim = self.max_upload_dim;
        let quality = self.jpeg_quality;
        let payload = tokio::task::spawn_blocking(move || prepare_still(&still, max_dim, quality))
            .await
            .map_err(|e| CaptureError::ImageError(format!("Task join error: {}", e)))??;

        let size = payload.len();
        let part = reqwest::multipart::Part::bytes(payload.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(&self.validate_url)
            .multipart(form)
            .send()
            .await?;
        let result: FiducialResult = check_response(resp).await?.json().await?;

        log::debug!(
            "Marker check ({} bytes): detected={} quality={:.3} ready={}",
            size,
            result.detected_count,
            result.quality,
            result.ready
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_join_without_double_slash() {
        let config = FiducialConfig {
            service_url: "http://10.0.0.5:8000/".to_string(),
            ..FiducialConfig::default()
        };
        let detector = HttpMarkerDetector::new(&config).unwrap();
        assert_eq!(detector.validate_url(), "http://10.0.0.5:8000/fiducial/validate");
        assert_eq!(detector.health_url, "http://10.0.0.5:8000/health");
    }
}
