pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWrite;

pub use http::HttpAnalysisService;
pub use types::{AnalysisResult, ResumeFile};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with an error; `message` is what it said, or a fallback.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0} is not available with the configured contract")]
    Unsupported(&'static str),
}

impl ServiceError {
    /// Text suitable for a user-facing notice. Server-provided messages pass
    /// through; transport and decoding failures collapse to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ServiceError::Api { message, .. } => message.clone(),
            ServiceError::Unsupported(_) => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Remote analysis backend. Scoring, extraction and feedback all happen there.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn extract_text(&self, resume: &ResumeFile) -> Result<String, ServiceError>;

    async fn analyze(
        &self,
        job_description: &str,
        resume: &ResumeFile,
    ) -> Result<AnalysisResult, ServiceError>;

    async fn feedback(
        &self,
        job_description: &str,
        resume: &ResumeFile,
    ) -> Result<String, ServiceError>;

    /// Streams the generated PDF report into `sink`, returning the byte count.
    async fn write_report(
        &self,
        job_description: &str,
        resume: &ResumeFile,
        similarity: f64,
        feedback: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ServiceError>;

    fn supports_feedback(&self) -> bool;
}
