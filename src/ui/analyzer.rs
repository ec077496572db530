use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::form::{FormError, UploadForm};
use super::notice::Notices;
use super::request::RequestState;
use super::results::match_summary;
use crate::service::{AnalysisResult, AnalysisService, ResumeFile, ServiceError};

/// The analysis screen: form input, one state per remote call, and the
/// notices produced along the way.
pub struct ResumeAnalyzer<S> {
    service: S,
    form: UploadForm,
    analysis: RequestState<AnalysisResult>,
    feedback: RequestState<String>,
    report: RequestState<PathBuf>,
    notices: Notices,
}

impl<S: AnalysisService> ResumeAnalyzer<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            form: UploadForm::default(),
            analysis: RequestState::Idle,
            feedback: RequestState::Idle,
            report: RequestState::Idle,
            notices: Notices::default(),
        }
    }

    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.form.set_job_description(text);
    }

    /// Offers a file to the form. Non-PDF files raise a notice and keep the
    /// previous selection.
    pub fn select_file(&mut self, file: ResumeFile) -> bool {
        match self.form.select_file(file) {
            Ok(()) => true,
            Err(err) => {
                self.notify_form_error(&err);
                false
            }
        }
    }

    pub fn form(&self) -> &UploadForm {
        &self.form
    }

    pub fn analysis(&self) -> &RequestState<AnalysisResult> {
        &self.analysis
    }

    pub fn feedback(&self) -> &RequestState<String> {
        &self.feedback
    }

    #[cfg(test)]
    pub fn report(&self) -> &RequestState<PathBuf> {
        &self.report
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// True when the backend contract offers narrative feedback.
    pub fn offers_feedback(&self) -> bool {
        self.service.supports_feedback()
    }

    pub fn can_submit(&self) -> bool {
        !self.analysis.is_in_flight() && self.form.is_complete()
    }

    pub fn can_download(&self) -> bool {
        self.analysis.value().is_some() && !self.report.is_in_flight()
    }

    fn notify_form_error(&mut self, err: &FormError) {
        self.notices.destructive(err.title(), err.to_string());
    }

    /// Runs the analysis and, when the service offers it, the follow-up
    /// feedback request. Returns true when the analysis succeeded.
    pub async fn submit(&mut self, with_feedback: bool) -> bool {
        if self.analysis.is_in_flight() {
            debug!("Analysis already in flight, ignoring submit");
            return false;
        }

        let (job_description, resume) = match self.form.validate() {
            Ok((job, resume)) => (job.to_string(), resume.clone()),
            Err(err) => {
                self.notify_form_error(&err);
                return false;
            }
        };

        self.analysis = RequestState::Submitting;
        self.feedback = RequestState::Idle;
        self.report = RequestState::Idle;

        let outcome = self.service.analyze(&job_description, &resume).await;
        self.analysis = RequestState::settle(outcome, |err| {
            error!("Error analyzing resume: {}", err);
            err.user_message("There was an error analyzing your resume")
        });

        let similarity = match &self.analysis {
            RequestState::Succeeded(result) => result.similarity,
            RequestState::Failed(message) => {
                let message = message.clone();
                self.notices.destructive("Analysis failed", message);
                return false;
            }
            _ => return false,
        };

        self.notices.info("Analysis complete", match_summary(similarity));

        if with_feedback && self.service.supports_feedback() {
            self.request_feedback().await;
        }
        true
    }

    /// Asks the service for narrative feedback on the analyzed résumé.
    pub async fn request_feedback(&mut self) -> bool {
        if self.feedback.is_in_flight() {
            return false;
        }
        if self.analysis.value().is_none() {
            self.notices
                .destructive("Feedback unavailable", "Analyze your resume first");
            return false;
        }
        let Ok((job_description, resume)) = self.form.validate() else {
            return false;
        };
        let (job_description, resume) = (job_description.to_string(), resume.clone());

        self.feedback = RequestState::Submitting;
        let outcome = self.service.feedback(&job_description, &resume).await;
        self.feedback = RequestState::settle(outcome, |err| {
            error!("Error generating feedback: {}", err);
            err.user_message("There was an error generating feedback")
        });

        if let RequestState::Failed(message) = &self.feedback {
            let message = message.clone();
            self.notices.destructive("Feedback failed", message);
            return false;
        }
        true
    }

    /// Downloads the PDF report into `dir` under a timestamped name.
    pub async fn download_report(&mut self, dir: &Path) -> Option<PathBuf> {
        let name = report_file_name(Local::now());
        self.save_report(dir, &name).await
    }

    async fn save_report(&mut self, dir: &Path, name: &str) -> Option<PathBuf> {
        if self.report.is_in_flight() {
            return None;
        }
        let Some(similarity) = self.analysis.value().map(|r| r.similarity) else {
            self.notices
                .destructive("Report unavailable", "Analyze your resume first");
            return None;
        };
        let Ok((job_description, resume)) = self.form.validate() else {
            return None;
        };
        let (job_description, resume) = (job_description.to_string(), resume.clone());
        let feedback = self.feedback.value().cloned().unwrap_or_default();

        self.report = RequestState::Submitting;
        let outcome = self
            .fetch_report(dir, name, &job_description, &resume, similarity, &feedback)
            .await;

        self.report = RequestState::settle(outcome, |err| {
            error!("Error downloading report: {}", err);
            err.user_message("There was an error generating your report")
        });

        match &self.report {
            RequestState::Succeeded(saved) => {
                let saved = saved.clone();
                self.notices
                    .info("Report downloaded", format!("Saved to {}", saved.display()));
                Some(saved)
            }
            RequestState::Failed(message) => {
                let message = message.clone();
                self.notices.destructive("Download failed", message);
                None
            }
            _ => None,
        }
    }

    async fn fetch_report(
        &self,
        dir: &Path,
        name: &str,
        job_description: &str,
        resume: &ResumeFile,
        similarity: f64,
        feedback: &str,
    ) -> Result<PathBuf, ServiceError> {
        let (mut file, path) = create_unique(dir, name).await?;
        let written = self
            .service
            .write_report(job_description, resume, similarity, feedback, &mut file)
            .await;

        match written {
            Ok(bytes) => {
                file.flush().await?;
                info!("Wrote {} bytes to {}", bytes, path.display());
                Ok(path)
            }
            Err(err) => {
                drop(file);
                // The file was created above, so nothing saved earlier is lost
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    debug!("Could not remove {}: {}", path.display(), remove_err);
                }
                Err(err)
            }
        }
    }
}

/// Creates `name` inside `dir`, appending `-1`, `-2`, ... to the stem when
/// the name is taken. Existing files are never opened.
async fn create_unique(dir: &Path, name: &str) -> std::io::Result<(File, PathBuf)> {
    let (stem, extension) = name.rsplit_once('.').unwrap_or((name, ""));
    let mut attempt: u32 = 0;
    loop {
        let candidate = match (attempt, extension) {
            (0, _) => name.to_string(),
            (n, "") => format!("{}-{}", stem, n),
            (n, ext) => format!("{}-{}.{}", stem, n, ext),
        };
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((file, path)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying another name", path.display());
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn report_file_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("resume-analysis-{}.pdf", now.format("%Y%m%d-%H%M%S-%3f"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::AsyncWrite;

    use crate::ui::gauge::Animation;
    use crate::ui::results::{render_results, Band};
    use crate::utils::pdf::PDF_MIME;

    /// Scripted service: each operation returns the configured outcome.
    #[derive(Default)]
    struct FakeService {
        similarity: Option<f64>,
        analyze_error: Option<String>,
        feedback: Option<String>,
        report: Option<Vec<u8>>,
        no_feedback: bool,
        analyze_calls: AtomicUsize,
        feedback_calls: AtomicUsize,
        seen_job: Mutex<Option<String>>,
    }

    fn api(message: &str) -> ServiceError {
        ServiceError::Api {
            status: Some(500),
            message: message.to_string(),
        }
    }

    #[async_trait]
    impl AnalysisService for FakeService {
        async fn extract_text(&self, _resume: &ResumeFile) -> Result<String, ServiceError> {
            Ok(String::new())
        }

        async fn analyze(
            &self,
            job_description: &str,
            _resume: &ResumeFile,
        ) -> Result<AnalysisResult, ServiceError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_job.lock().unwrap() = Some(job_description.to_string());
            if let Some(message) = &self.analyze_error {
                return Err(api(message));
            }
            match self.similarity {
                Some(similarity) => Ok(AnalysisResult {
                    similarity,
                    resume_text: None,
                    job_description: None,
                }),
                None => Err(ServiceError::Decode(
                    serde_json::from_str::<u8>("not json").unwrap_err(),
                )),
            }
        }

        async fn feedback(
            &self,
            _job_description: &str,
            _resume: &ResumeFile,
        ) -> Result<String, ServiceError> {
            self.feedback_calls.fetch_add(1, Ordering::SeqCst);
            self.feedback.clone().ok_or_else(|| api("Feedback model offline"))
        }

        async fn write_report(
            &self,
            _job_description: &str,
            _resume: &ResumeFile,
            _similarity: f64,
            _feedback: &str,
            sink: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64, ServiceError> {
            match &self.report {
                Some(bytes) => {
                    sink.write_all(bytes).await?;
                    Ok(bytes.len() as u64)
                }
                None => {
                    sink.write_all(b"%PDF-partial").await?;
                    Err(api("Report generation failed"))
                }
            }
        }

        fn supports_feedback(&self) -> bool {
            !self.no_feedback
        }
    }

    fn pdf() -> ResumeFile {
        ResumeFile::new("resume.pdf", PDF_MIME, b"%PDF-1.4\n%%EOF".to_vec())
    }

    fn ready(service: FakeService) -> ResumeAnalyzer<FakeService> {
        let mut analyzer = ResumeAnalyzer::new(service);
        analyzer.set_job_description("Senior Go engineer");
        assert!(analyzer.select_file(pdf()));
        analyzer
    }

    #[tokio::test]
    async fn end_to_end_great_match() {
        let mut analyzer = ready(FakeService {
            similarity: Some(82.0),
            feedback: Some("Quantify your Go impact".to_string()),
            ..Default::default()
        });
        assert!(analyzer.can_submit());

        assert!(analyzer.submit(true).await);

        let result = analyzer.analysis().value().cloned().unwrap();
        assert_eq!(Band::from_score(result.similarity), Band::Great);
        assert_eq!(
            Animation::mount(result.similarity).value_at(std::time::Duration::from_secs(1)),
            82.0
        );

        let panel = render_results(&result, analyzer.feedback(), false);
        assert!(panel.contains("82%"));
        assert!(panel.contains("Great match!"));
        assert!(panel.contains("Quantify your Go impact"));

        let notice = analyzer.notices().visible().first().unwrap();
        assert_eq!(notice.title, "Analysis complete");
        assert_eq!(
            notice.description,
            "Your resume has a 82% match with the job description"
        );
        assert!(analyzer.can_submit());
        assert_eq!(
            analyzer.service.seen_job.lock().unwrap().as_deref(),
            Some("Senior Go engineer")
        );
    }

    #[tokio::test]
    async fn failure_resets_flag_and_notifies() {
        let mut analyzer = ready(FakeService {
            analyze_error: Some("Vector index unavailable".to_string()),
            ..Default::default()
        });

        assert!(!analyzer.submit(true).await);
        assert!(!analyzer.analysis().is_in_flight());
        assert_eq!(analyzer.analysis().error(), Some("Vector index unavailable"));
        assert_eq!(*analyzer.feedback(), RequestState::Idle);
        assert_eq!(analyzer.service.feedback_calls.load(Ordering::SeqCst), 0);

        let notice = analyzer.notices().latest().unwrap();
        assert_eq!(notice.title, "Analysis failed");
        assert_eq!(notice.description, "Vector index unavailable");
        assert!(analyzer.can_submit());
    }

    #[tokio::test]
    async fn transport_failure_uses_generic_message() {
        let mut analyzer = ready(FakeService::default());

        assert!(!analyzer.submit(false).await);
        assert_eq!(
            analyzer.analysis().error(),
            Some("There was an error analyzing your resume")
        );
    }

    #[tokio::test]
    async fn submit_is_blocked_until_form_is_complete() {
        let mut analyzer = ResumeAnalyzer::new(FakeService {
            similarity: Some(50.0),
            ..Default::default()
        });
        assert!(!analyzer.can_submit());

        analyzer.set_job_description("   ");
        assert!(!analyzer.submit(false).await);
        assert_eq!(analyzer.notices().latest().unwrap().title, "Job description required");

        analyzer.set_job_description("Senior Go engineer");
        assert!(!analyzer.can_submit());
        assert!(!analyzer.submit(false).await);
        assert_eq!(analyzer.notices().latest().unwrap().title, "Resume required");

        assert!(!analyzer.select_file(ResumeFile::new("cv.png", "image/png", vec![0x89])));
        assert_eq!(analyzer.notices().latest().unwrap().title, "Invalid file format");
        assert!(!analyzer.can_submit());

        assert_eq!(analyzer.service.analyze_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn in_flight_analysis_ignores_resubmit() {
        let mut analyzer = ready(FakeService {
            similarity: Some(90.0),
            ..Default::default()
        });
        analyzer.analysis = RequestState::Submitting;

        assert!(!analyzer.can_submit());
        assert!(!analyzer.submit(true).await);
        assert_eq!(analyzer.service.analyze_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn feedback_failure_keeps_analysis() {
        let mut analyzer = ready(FakeService {
            similarity: Some(45.0),
            ..Default::default()
        });

        assert!(analyzer.submit(true).await);
        assert_eq!(analyzer.analysis().value().map(|r| r.similarity), Some(45.0));
        assert_eq!(analyzer.feedback().error(), Some("Feedback model offline"));
        assert_eq!(analyzer.notices().latest().unwrap().title, "Feedback failed");
    }

    #[tokio::test]
    async fn feedback_skipped_when_unsupported_or_disabled() {
        let mut analyzer = ready(FakeService {
            similarity: Some(70.0),
            no_feedback: true,
            ..Default::default()
        });
        assert!(analyzer.submit(true).await);
        assert_eq!(*analyzer.feedback(), RequestState::Idle);

        let mut analyzer = ready(FakeService {
            similarity: Some(70.0),
            feedback: Some("x".into()),
            ..Default::default()
        });
        assert!(analyzer.submit(false).await);
        assert_eq!(analyzer.service.feedback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn feedback_requires_prior_analysis() {
        let mut analyzer = ready(FakeService {
            feedback: Some("x".into()),
            ..Default::default()
        });
        assert!(!analyzer.request_feedback().await);
        assert_eq!(analyzer.service.feedback_calls.load(Ordering::SeqCst), 0);
        assert_eq!(analyzer.notices().latest().unwrap().title, "Feedback unavailable");
    }

    #[tokio::test]
    async fn report_is_saved_with_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = ready(FakeService {
            similarity: Some(82.0),
            feedback: Some("Solid".into()),
            report: Some(b"%PDF-1.4 report".to_vec()),
            ..Default::default()
        });

        assert!(analyzer.download_report(dir.path()).await.is_none());
        assert!(!analyzer.can_download());

        assert!(analyzer.submit(true).await);
        assert!(analyzer.can_download());
        let saved = analyzer.download_report(dir.path()).await.unwrap();

        let name = saved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("resume-analysis-") && name.ends_with(".pdf"));
        assert_eq!(tokio::fs::read(&saved).await.unwrap(), b"%PDF-1.4 report");
        assert_eq!(analyzer.report().value(), Some(&saved));
        assert!(analyzer.can_download());
    }

    #[tokio::test]
    async fn failed_report_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = ready(FakeService {
            similarity: Some(60.0),
            ..Default::default()
        });
        assert!(analyzer.submit(false).await);

        assert!(analyzer.download_report(dir.path()).await.is_none());
        assert_eq!(analyzer.report().error(), Some("Report generation failed"));
        assert!(!analyzer.report().is_in_flight());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(analyzer.notices().latest().unwrap().title, "Download failed");
    }

    #[tokio::test]
    async fn retry_under_taken_name_keeps_saved_report() {
        let dir = tempfile::tempdir().unwrap();
        let name = "resume-analysis-20240309-140507-042.pdf";
        let mut analyzer = ready(FakeService {
            similarity: Some(82.0),
            report: Some(b"%PDF-1.4 first".to_vec()),
            ..Default::default()
        });
        assert!(analyzer.submit(false).await);

        let first = analyzer.save_report(dir.path(), name).await.unwrap();
        assert_eq!(first, dir.path().join(name));

        // Same timestamp, failing service
        analyzer.service.report = None;
        assert!(analyzer.save_report(dir.path(), name).await.is_none());
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"%PDF-1.4 first");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // Same timestamp, working service
        analyzer.service.report = Some(b"%PDF-1.4 second".to_vec());
        let second = analyzer.save_report(dir.path(), name).await.unwrap();
        assert_eq!(
            second,
            dir.path().join("resume-analysis-20240309-140507-042-1.pdf")
        );
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"%PDF-1.4 first");
        assert_eq!(tokio::fs::read(&second).await.unwrap(), b"%PDF-1.4 second");
    }

    #[tokio::test]
    async fn score_is_available_before_feedback_arrives() {
        let mut analyzer = ready(FakeService {
            similarity: Some(64.0),
            feedback: Some("Lead with your Go services".into()),
            ..Default::default()
        });

        assert!(analyzer.submit(false).await);
        assert!(analyzer.offers_feedback());
        assert_eq!(analyzer.analysis().value().map(|r| r.similarity), Some(64.0));
        assert_eq!(*analyzer.feedback(), RequestState::Idle);
        assert_eq!(analyzer.service.feedback_calls.load(Ordering::SeqCst), 0);

        assert!(analyzer.request_feedback().await);
        assert_eq!(
            analyzer.feedback().value().map(String::as_str),
            Some("Lead with your Go services")
        );
        assert_eq!(analyzer.analysis().value().map(|r| r.similarity), Some(64.0));
    }

    #[test]
    fn report_name_uses_wall_clock() {
        use chrono::{TimeZone, Timelike};
        let at = chrono::Utc
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .unwrap()
            .with_nanosecond(42_000_000)
            .unwrap();
        assert_eq!(report_file_name(at), "resume-analysis-20240309-140507-042.pdf");
    }
}
