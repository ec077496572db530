use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::pdf::{sniff_mime, PDF_MIME};

/// Advisory upload limit shown next to the file picker. Not enforced.
pub const ADVISED_MAX_BYTES: usize = 10 * 1024 * 1024;

/// A résumé picked by the user, held fully in memory so it can be resent
/// for feedback and report generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    name: String,
    mime: String,
    bytes: Vec<u8>,
}

impl ResumeFile {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Builds a file whose MIME type is sniffed from its content and name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let head = &bytes[..bytes.len().min(512)];
        let mime = sniff_mime(&name, head).to_string();
        Self { name, mime, bytes }
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume.pdf".to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_pdf(&self) -> bool {
        self.mime == PDF_MIME
    }

    pub fn exceeds_advisory(&self) -> bool {
        self.bytes.len() > ADVISED_MAX_BYTES
    }
}

/// Score plus whatever text the service echoes back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisResult {
    pub similarity: f64,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTextRequest<'a> {
    pub job_description: &'a str,
    pub resume_text: &'a str,
}

/// Error envelope used by every endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_result_tolerates_missing_echo_fields() {
        let parsed: AnalysisResult = serde_json::from_str(r#"{"similarity": 82}"#).unwrap();
        assert_eq!(parsed.similarity, 82.0);
        assert!(parsed.resume_text.is_none());
        assert!(parsed.job_description.is_none());
    }

    #[test]
    fn analyze_request_uses_camel_case_keys() {
        let body = serde_json::to_value(AnalyzeTextRequest {
            job_description: "Senior Go engineer",
            resume_text: "Go, Kubernetes",
        })
        .unwrap();
        assert_eq!(body["jobDescription"], "Senior Go engineer");
        assert_eq!(body["resumeText"], "Go, Kubernetes");
    }

    #[test]
    fn sniffs_pdf_from_content() {
        let file = ResumeFile::from_bytes("cv.bin", b"%PDF-1.5\n...".to_vec());
        assert!(file.is_pdf());
        assert_eq!(file.name(), "cv.bin");

        let image = ResumeFile::from_bytes("cv.pdf", vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert!(!image.is_pdf());
        assert_eq!(image.mime(), "image/jpeg");
    }

    #[test]
    fn size_advisory_is_reported_not_enforced() {
        let big = ResumeFile::new("big.pdf", PDF_MIME, vec![0; ADVISED_MAX_BYTES + 1]);
        assert!(big.exceeds_advisory());
        assert!(big.is_pdf());
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        tokio::fs::write(&path, b"%PDF-1.4\n%%EOF").await.unwrap();

        let file = ResumeFile::load(&path).await.unwrap();
        assert_eq!(file.name(), "resume.pdf");
        assert!(file.is_pdf());
        assert_eq!(file.len(), 14);

        assert!(ResumeFile::load(&dir.path().join("missing.pdf")).await.is_err());
    }
}
