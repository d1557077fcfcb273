use gloo_file::File as GlooFile;
use gloo_net::http::{Request, Response};
use shared::{ApiResponse, ClassificationResult, ClassifyUrlRequest};
use web_sys::FormData;

pub const CLASSIFY_ENDPOINT: &str = "/api/v1/classify";
pub const CLASSIFY_URL_ENDPOINT: &str = "/api/v1/classify-url";

/// Multipart field the backend reads the upload from.
const UPLOAD_FIELD: &str = "file";

pub async fn classify_file(file: &GlooFile) -> Result<ClassificationResult, String> {
    let form_data = FormData::new().map_err(|_| "Failed to create form data".to_string())?;
    let raw: &web_sys::File = file.as_ref();
    form_data
        .append_with_blob_and_filename(UPLOAD_FIELD, raw, &file.name())
        .map_err(|_| format!("Failed to attach {}", file.name()))?;

    let response = Request::post(CLASSIFY_ENDPOINT)
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    read_envelope(response).await
}

pub async fn classify_url(url: &str) -> Result<ClassificationResult, String> {
    let body = ClassifyUrlRequest {
        url: url.to_string(),
    };
    let response = Request::post(CLASSIFY_URL_ENDPOINT)
        .json(&body)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    read_envelope(response).await
}

async fn read_envelope(response: Response) -> Result<ClassificationResult, String> {
    let status = response.status();
    match response.json::<ApiResponse<ClassificationResult>>().await {
        Ok(ApiResponse {
            success: true,
            data: Some(result),
            ..
        }) => Ok(result),
        Ok(envelope) => Err(envelope
            .error
            .unwrap_or_else(|| format!("Server error: {}", status))),
        Err(e) => Err(format!("Failed to parse response ({}): {}", status, e)),
    }
}
