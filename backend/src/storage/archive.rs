use hex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::ClassificationResult;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Clone)]
pub struct ResultArchive {
    data_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
pub struct ArchivedResult<'a> {
    pub source: &'a str,
    pub image_sha256: String,
    pub result: &'a ClassificationResult,
}

impl ResultArchive {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|source| ArchiveError::Io {
            path: data_dir.display().to_string(),
            source,
        })?;
        log::info!("Archiving classifications to: {}", data_dir.display());
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn calculate_image_hash(image_data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(image_data);
        hex::encode(hasher.finalize())
    }

    pub fn image_file_name(id: Uuid) -> String {
        format!("{}.jpg", id)
    }

    pub fn results_file_name(id: Uuid) -> String {
        format!("{}_results.json", id)
    }

    pub fn image_path(&self, id: Uuid) -> PathBuf {
        self.data_dir.join(Self::image_file_name(id))
    }

    pub async fn store_image(&self, id: Uuid, jpeg: &[u8]) -> Result<PathBuf, ArchiveError> {
        let path = self.image_path(id);
        write_file(&path, jpeg).await?;
        log::info!("Saved normalized image to: {}", path.display());
        Ok(path)
    }

    pub async fn store_result(
        &self,
        id: Uuid,
        source: &str,
        jpeg: &[u8],
        result: &ClassificationResult,
    ) -> Result<PathBuf, ArchiveError> {
        let record = ArchivedResult {
            source,
            image_sha256: Self::calculate_image_hash(jpeg),
            result,
        };
        let body = serde_json::to_vec_pretty(&record)?;
        let path = self.data_dir.join(Self::results_file_name(id));
        write_file(&path, &body).await?;
        log::info!(
            "Saved classification results to: {} (size: {} bytes)",
            path.display(),
            body.len()
        );
        Ok(path)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), ArchiveError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ArchiveError::Io {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Category, CategoryJudgment, ProcessingTime};

    fn result() -> ClassificationResult {
        ClassificationResult {
            image_reference: "https://example.com/cat.png".into(),
            judgments: Category::ALL
                .iter()
                .map(|c| (*c, CategoryJudgment::unavailable(*c)))
                .collect(),
            model: "gpt-4o".into(),
            processing_time: ProcessingTime::default(),
        }
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            ResultArchive::calculate_image_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let archive = ResultArchive::new(&nested).unwrap();
        assert!(archive.data_dir().is_dir());
    }

    #[actix_web::test]
    async fn stores_image_and_result_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ResultArchive::new(dir.path()).unwrap();
        let id = Uuid::new_v4();

        let image_path = archive.store_image(id, b"jpeg-bytes").await.unwrap();
        assert_eq!(std::fs::read(&image_path).unwrap(), b"jpeg-bytes");

        let result = result();
        let results_path = archive
            .store_result(id, "https://example.com/cat.png", b"jpeg-bytes", &result)
            .await
            .unwrap();
        assert_eq!(
            results_path.file_name().unwrap().to_str().unwrap(),
            format!("{}_results.json", id)
        );

        let stored: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&results_path).unwrap()).unwrap();
        assert_eq!(stored["source"], "https://example.com/cat.png");
        assert_eq!(
            stored["image_sha256"],
            ResultArchive::calculate_image_hash(b"jpeg-bytes")
        );
        assert_eq!(stored["result"]["judgments"]["Terrorism"]["confidence"], 0);
    }
}
