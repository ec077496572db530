use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use url::Url;

use super::types::{AnalyzeTextRequest, ErrorBody, ExtractResponse, FeedbackResponse};
use super::{AnalysisResult, AnalysisService, ResumeFile, ServiceError};
use crate::config::Contract;
use crate::utils::pdf::is_pdf;

const EXTRACT_FALLBACK: &str = "Failed to extract text from PDF";
const ANALYZE_FALLBACK: &str = "Failed to analyze resume";
const FEEDBACK_FALLBACK: &str = "Failed to generate feedback";
const REPORT_FALLBACK: &str = "Failed to generate report";

/// Endpoint paths for each contract, relative to the base URL.
struct Routes {
    extract: &'static str,
    extract_field: &'static str,
    analyze: &'static str,
    feedback: Option<&'static str>,
    report: Option<&'static str>,
}

impl Routes {
    fn for_contract(contract: Contract) -> Self {
        match contract {
            Contract::Service => Self {
                extract: "upload-pdf",
                extract_field: "pdf_file",
                analyze: "analyze/pinecone",
                feedback: Some("feedback"),
                report: Some("download"),
            },
            Contract::NextApi => Self {
                extract: "api/extract-pdf",
                extract_field: "file",
                analyze: "api/analyze",
                feedback: None,
                report: None,
            },
        }
    }
}

pub struct HttpAnalysisService {
    client: Client,
    base: Url,
    contract: Contract,
    routes: Routes,
}

impl HttpAnalysisService {
    /// No request timeout is configured: a hung call keeps its caller waiting.
    pub fn new(base: Url, contract: Contract) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .user_agent(concat!("resume-match/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base,
            contract,
            routes: Routes::for_contract(contract),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base.join(path)?)
    }

    fn resume_part(resume: &ResumeFile) -> Result<multipart::Part, ServiceError> {
        let part = multipart::Part::bytes(resume.bytes().to_vec())
            .file_name(resume.name().to_string())
            .mime_str(resume.mime())?;
        Ok(part)
    }

    fn resume_form(
        resume: &ResumeFile,
        job_description: &str,
    ) -> Result<multipart::Form, ServiceError> {
        Ok(multipart::Form::new()
            .part("pdf_file", Self::resume_part(resume)?)
            .text("job_description", job_description.to_string()))
    }

    async fn post_form(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<Response, ServiceError> {
        let url = self.endpoint(path)?;
        debug!("POST {} (multipart)", url);
        Ok(self.client.post(url).multipart(form).send().await?)
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        fallback: &str,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body, fallback));
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;

        // The extraction backend answers 200 with an `error` field on failure
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            error!("Analysis service reported an error with status {}: {}", status, message);
            return Err(ServiceError::Api {
                status: Some(status.as_u16()),
                message: message.to_string(),
            });
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// Builds an API error from a failed response, preferring the server's `error` field.
fn api_error(status: StatusCode, body: &str, fallback: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    error!("Analysis service error: Status {} - {}", status, message);
    ServiceError::Api {
        status: Some(status.as_u16()),
        message,
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn extract_text(&self, resume: &ResumeFile) -> Result<String, ServiceError> {
        let form = multipart::Form::new()
            .part(self.routes.extract_field, Self::resume_part(resume)?);
        let response = self.post_form(self.routes.extract, form).await?;
        let extracted: ExtractResponse = Self::read_json(response, EXTRACT_FALLBACK).await?;
        debug!("Extracted {} characters from {}", extracted.text.len(), resume.name());
        Ok(extracted.text)
    }

    async fn analyze(
        &self,
        job_description: &str,
        resume: &ResumeFile,
    ) -> Result<AnalysisResult, ServiceError> {
        info!(
            "Analyzing {} ({} bytes) via {} contract",
            resume.name(),
            resume.len(),
            self.contract
        );

        match self.contract {
            Contract::Service => {
                let form = Self::resume_form(resume, job_description)?;
                let response = self.post_form(self.routes.analyze, form).await?;
                Self::read_json(response, ANALYZE_FALLBACK).await
            }
            Contract::NextApi => {
                let resume_text = self.extract_text(resume).await?;

                let url = self.endpoint(self.routes.analyze)?;
                debug!("POST {} (json)", url);
                let response = self
                    .client
                    .post(url)
                    .header(header::ACCEPT, "application/json")
                    .json(&AnalyzeTextRequest {
                        job_description,
                        resume_text: &resume_text,
                    })
                    .send()
                    .await?;

                let mut result: AnalysisResult = Self::read_json(response, ANALYZE_FALLBACK).await?;
                if result.resume_text.is_none() {
                    result.resume_text = Some(resume_text);
                }
                Ok(result)
            }
        }
    }

    async fn feedback(
        &self,
        job_description: &str,
        resume: &ResumeFile,
    ) -> Result<String, ServiceError> {
        let path = self.routes.feedback.ok_or(ServiceError::Unsupported("Feedback"))?;
        let form = Self::resume_form(resume, job_description)?;
        let response = self.post_form(path, form).await?;
        let body: FeedbackResponse = Self::read_json(response, FEEDBACK_FALLBACK).await?;
        Ok(body.feedback)
    }

    async fn write_report(
        &self,
        job_description: &str,
        resume: &ResumeFile,
        similarity: f64,
        feedback: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ServiceError> {
        let path = self.routes.report.ok_or(ServiceError::Unsupported("Report download"))?;
        let form = Self::resume_form(resume, job_description)?
            .text("similarity", similarity.to_string())
            .text("feedback", feedback.to_string());
        let response = self.post_form(path, form).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body, REPORT_FALLBACK));
        }
        if content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
        {
            let body = response.text().await?;
            return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, &body, REPORT_FALLBACK));
        }

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if written == 0 && !is_pdf(content_type.as_deref(), &chunk) {
                warn!("Report response does not look like a PDF (content-type {:?})", content_type);
            }
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        info!("Received report of {} bytes", written);
        Ok(written)
    }

    fn supports_feedback(&self) -> bool {
        self.routes.feedback.is_some()
    }
}
