use shared::ClassificationResult;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::assembly::{StageTimings, assemble};
use crate::intake::{ImageIntake, IntakeError, NormalizedImage};
use crate::model::{ModelError, VisionModel};
use crate::parser::{ParseError, parse_response};
use crate::prompt::build_prompt;
use crate::storage::ResultArchive;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error("External model error: {0}")]
    ExternalModel(ModelError),
    #[error("External model did not respond within {0:?}")]
    ExternalModelTimeout(Duration),
    #[error("Unparsable model response: {0}")]
    UnparsableResponse(#[from] ParseError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClassifyError {
    /// Name of the failure in the classification error taxonomy.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::Intake(IntakeError::UnsupportedFormat(_)) => "UnsupportedFormat",
            ClassifyError::Intake(IntakeError::TooLarge { .. }) => "TooLarge",
            ClassifyError::Intake(IntakeError::Fetch(_)) => "FetchError",
            ClassifyError::ExternalModel(_) => "ExternalModelError",
            ClassifyError::ExternalModelTimeout(_) => "ExternalModelTimeout",
            ClassifyError::UnparsableResponse(_) => "UnparsableResponse",
            ClassifyError::InvalidRequest(_) => "InvalidRequest",
        }
    }
}

/// An uploaded file as received from the client.
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct ClassificationService {
    intake: ImageIntake,
    model: Arc<dyn VisionModel>,
    model_timeout: Duration,
    archive: Option<ResultArchive>,
}

impl ClassificationService {
    pub fn new(
        intake: ImageIntake,
        model: Arc<dyn VisionModel>,
        model_timeout: Duration,
        archive: Option<ResultArchive>,
    ) -> Self {
        log::info!("Initialized ClassificationService with model: {}", model.name());
        Self {
            intake,
            model,
            model_timeout,
            archive,
        }
    }

    pub fn intake(&self) -> &ImageIntake {
        &self.intake
    }

    pub async fn classify_upload(&self, upload: Upload) -> Result<ClassificationResult, ClassifyError> {
        let started = Instant::now();
        let display_name = upload.file_name.as_deref().unwrap_or("<unnamed>");
        log::info!("Classifying uploaded image: {}", display_name);

        let image = self
            .intake
            .from_bytes(&upload.data, upload.content_type.as_deref())
            .inspect_err(|e| log::error!("Rejected upload '{}': {}", display_name, e))?;
        let intake_time = started.elapsed();

        let id = Uuid::new_v4();
        let image_reference = match &self.archive {
            Some(archive) => match archive.store_image(id, &image.jpeg).await {
                Ok(path) => path.display().to_string(),
                Err(e) => {
                    log::error!("Failed to archive uploaded image: {}", e);
                    ResultArchive::image_file_name(id)
                }
            },
            None => ResultArchive::image_file_name(id),
        };
        log::info!("Uploaded image '{}' registered as {}", display_name, image_reference);

        self.classify_normalized(id, image, image_reference, display_name, started, intake_time)
            .await
    }

    pub async fn classify_url(&self, url: &str) -> Result<ClassificationResult, ClassifyError> {
        let started = Instant::now();
        log::info!("Classifying image URL: {}", url);

        let image = self
            .intake
            .from_url(url)
            .await
            .inspect_err(|e| log::error!("Rejected image URL '{}': {}", url, e))?;
        let intake_time = started.elapsed();

        let id = Uuid::new_v4();
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.store_image(id, &image.jpeg).await {
                log::error!("Failed to archive image from '{}': {}", url, e);
            }
        }

        self.classify_normalized(id, image, url.trim().to_string(), url, started, intake_time)
            .await
    }

    async fn classify_normalized(
        &self,
        id: Uuid,
        image: NormalizedImage,
        image_reference: String,
        source: &str,
        started: Instant,
        intake_time: Duration,
    ) -> Result<ClassificationResult, ClassifyError> {
        log::debug!(
            "Normalized {:?} image ({} bytes) to {}x{} JPEG ({} bytes)",
            image.source_format,
            image.source_bytes,
            image.width,
            image.height,
            image.jpeg.len()
        );
        let prompt = build_prompt(&image);

        let model_started = Instant::now();
        let raw = match tokio::time::timeout(self.model_timeout, self.model.classify(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(ModelError::Timeout)) | Err(_) => {
                log::error!("Model timed out after {:?} for {}", self.model_timeout, source);
                return Err(ClassifyError::ExternalModelTimeout(self.model_timeout));
            }
            Ok(Err(e)) => {
                log::error!("Model call failed for {}: {}", source, e);
                return Err(ClassifyError::ExternalModel(e));
            }
        };
        let model_time = model_started.elapsed();
        log::info!("Model request took {:.2} seconds", model_time.as_secs_f64());

        let parse_started = Instant::now();
        let parsed = parse_response(&raw).inspect_err(|e| {
            log::error!("Failed to parse model response for {}: {}. Raw: {}", source, e, raw)
        })?;
        for issue in &parsed.issues {
            log::warn!("Recovered model output for {}: {}", source, issue);
        }
        for judgment in parsed.judgments.iter() {
            log::debug!(
                "{}: {} ({}%)",
                judgment.category,
                judgment.rating,
                judgment.confidence
            );
        }
        let parse_time = parse_started.elapsed();

        let timings = StageTimings {
            intake: intake_time,
            model: model_time,
            parse: parse_time,
            total: started.elapsed(),
        };
        let result = assemble(image_reference, parsed.judgments, self.model.name(), timings);

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.store_result(id, source, &image.jpeg, &result).await {
                log::error!("Error saving classification results: {}", e);
            }
        }

        log::info!(
            "Successfully classified '{}' in {:.2} seconds",
            source,
            timings.total.as_secs_f64()
        );
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::intake::tests::{encoded, intake};
    use crate::prompt::PromptPayload;
    use async_trait::async_trait;
    use image::ImageFormat;
    use shared::{Category, Rating, UNAVAILABLE_EXPLANATION};
    use std::sync::Mutex;

    pub(crate) enum Reply {
        Text(String),
        Fail,
        Hang,
    }

    pub(crate) struct StubModel {
        pub reply: Reply,
        pub prompts: Mutex<Vec<PromptPayload>>,
    }

    impl StubModel {
        pub(crate) fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl VisionModel for StubModel {
        fn name(&self) -> &str {
            "stub-model"
        }

        async fn classify(&self, prompt: &PromptPayload) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail => Err(ModelError::Status {
                    status: 429,
                    body: "quota exceeded".into(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("{}".into())
                }
            }
        }
    }

    pub(crate) fn service(model: Arc<StubModel>, archive: Option<ResultArchive>) -> ClassificationService {
        ClassificationService::new(intake(), model, Duration::from_millis(200), archive)
    }

    pub(crate) fn png_upload() -> Upload {
        Upload {
            file_name: Some("photo.png".into()),
            content_type: Some("image/png".into()),
            data: encoded(16, 16, ImageFormat::Png),
        }
    }

    #[actix_web::test]
    async fn upload_runs_the_whole_chain() {
        let model = StubModel::new(Reply::Text(
            r#"```json
{"AdultContent": {"rating":"HIGH","confidence":150,"explanation":"nudity"}}
```"#
                .into(),
        ));
        let result = service(model.clone(), None)
            .classify_upload(png_upload())
            .await
            .unwrap();

        assert_eq!(result.judgments.len(), 8);
        let adult = result.judgment(Category::AdultContent).unwrap();
        assert_eq!((adult.rating, adult.confidence), (Rating::High, 99));
        let drugs = result.judgment(Category::Drugs).unwrap();
        assert_eq!(drugs.explanation, UNAVAILABLE_EXPLANATION);
        assert_eq!(result.model, "stub-model");
        assert!(result.image_reference.ends_with(".jpg"));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].image_data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[actix_web::test]
    async fn intake_failure_never_reaches_the_model() {
        let model = StubModel::new(Reply::Text("{}".into()));
        let err = service(model.clone(), None)
            .classify_upload(Upload {
                file_name: None,
                content_type: Some("text/plain".into()),
                data: b"hello".to_vec(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnsupportedFormat");
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unparsable_reply_fails_the_request() {
        let model = StubModel::new(Reply::Text("not json at all".into()));
        let err = service(model, None)
            .classify_upload(png_upload())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnparsableResponse");
    }

    #[actix_web::test]
    async fn model_errors_are_surfaced() {
        let err = service(StubModel::new(Reply::Fail), None)
            .classify_upload(png_upload())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ExternalModelError");
        assert!(err.to_string().contains("429"));
    }

    #[actix_web::test]
    async fn slow_model_times_out() {
        let err = service(StubModel::new(Reply::Hang), None)
            .classify_upload(png_upload())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifyError::ExternalModelTimeout(d) if d == Duration::from_millis(200)));
    }

    #[actix_web::test]
    async fn archive_receives_image_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ResultArchive::new(dir.path()).unwrap();
        let model = StubModel::new(Reply::Text("{}".into()));
        let result = service(model, Some(archive))
            .classify_upload(png_upload())
            .await
            .unwrap();

        assert!(result.image_reference.starts_with(&dir.path().display().to_string()));
        assert!(std::path::Path::new(&result.image_reference).is_file());
        let results_file = result.image_reference.replace(".jpg", "_results.json");
        let stored: serde_json::Value =
            serde_json::from_slice(&std::fs::read(results_file).unwrap()).unwrap();
        assert_eq!(stored["source"], "photo.png");
        assert_eq!(stored["result"]["image_reference"], result.image_reference.as_str());
    }

    #[actix_web::test]
    async fn bad_url_is_a_fetch_error() {
        let model = StubModel::new(Reply::Text("{}".into()));
        let err = service(model, None)
            .classify_url("ftp://example.com/a.png")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FetchError");
    }
}
