use thiserror::Error;
use tracing::{debug, warn};

use crate::service::ResumeFile;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please upload a PDF file (got {mime})")]
    InvalidFileType { mime: String },

    #[error("Please enter the job description")]
    MissingJobDescription,

    #[error("Please upload your resume")]
    MissingResume,
}

impl FormError {
    pub fn title(&self) -> &'static str {
        match self {
            FormError::InvalidFileType { .. } => "Invalid file format",
            FormError::MissingJobDescription => "Job description required",
            FormError::MissingResume => "Resume required",
        }
    }
}

/// Job description plus the selected résumé, validated before submission.
#[derive(Debug, Default)]
pub struct UploadForm {
    job_description: String,
    resume: Option<ResumeFile>,
}

impl UploadForm {
    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.job_description = text.into();
    }

    pub fn resume(&self) -> Option<&ResumeFile> {
        self.resume.as_ref()
    }

    /// Accepts `file` only when it is a PDF. A rejected file leaves the
    /// previous selection in place.
    pub fn select_file(&mut self, file: ResumeFile) -> Result<(), FormError> {
        if !file.is_pdf() {
            debug!("Rejected {} with type {}", file.name(), file.mime());
            return Err(FormError::InvalidFileType {
                mime: file.mime().to_string(),
            });
        }
        if file.exceeds_advisory() {
            warn!(
                "{} is {} bytes, above the 10MB advisory limit",
                file.name(),
                file.len()
            );
        }
        self.resume = Some(file);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(&str, &ResumeFile), FormError> {
        if self.job_description.trim().is_empty() {
            return Err(FormError::MissingJobDescription);
        }
        let resume = self.resume.as_ref().ok_or(FormError::MissingResume)?;
        Ok((&self.job_description, resume))
    }
}
