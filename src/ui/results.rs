use std::fmt::Write as _;

use super::request::RequestState;
use crate::service::AnalysisResult;
use crate::utils::terminal::{fg_hex, BOLD, DIM, RESET};

/// Qualitative tier of a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Good,
    Great,
}

impl Band {
    /// Lower bounds are inclusive: 80 is great, 50 is good.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Band::Great
        } else if score >= 50.0 {
            Band::Good
        } else {
            Band::Low
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Band::Great => "#22c55e",
            Band::Good => "#f59e0b",
            Band::Low => "#ef4444",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Band::Great => "Great match! Your resume aligns well with this job.",
            Band::Good => "Good match. Consider highlighting more relevant skills and experiences.",
            Band::Low => "Low match. You may want to tailor your resume more specifically to this job.",
        }
    }
}

/// Rounded integer percentage, e.g. `79.6` renders as `80%`.
pub fn percentage_label(score: f64) -> String {
    format!("{}%", score.round() as i64)
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, color: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", fg_hex(color), text, RESET)
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", BOLD, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", DIM, text, RESET)
        } else {
            text.to_string()
        }
    }
}

/// Summary line used for the "Analysis complete" notice.
pub fn match_summary(score: f64) -> String {
    format!(
        "Your resume has a {} match with the job description",
        percentage_label(score)
    )
}

/// Renders the results panel shown under the gauge. Echoed texts are printed
/// verbatim; the feedback panel appears once feedback has been requested.
pub fn render_results(result: &AnalysisResult, feedback: &RequestState<String>, color: bool) -> String {
    let palette = Palette { enabled: color };
    let band = Band::from_score(result.similarity);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Your resume has a {} match with the job requirements",
        palette.paint(band.color(), &percentage_label(result.similarity))
    );
    let _ = writeln!(out, "{}", palette.paint(band.color(), band.message()));

    if let Some(job) = result.job_description.as_deref() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", palette.heading("Job Description"));
        let _ = writeln!(out, "{}", job);
    }
    if let Some(resume) = result.resume_text.as_deref() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", palette.heading("Your Resume"));
        let _ = writeln!(out, "{}", resume);
    }

    out.push_str(&render_feedback(feedback, color));
    out
}

/// The "AI Feedback" panel, empty until feedback has been requested.
/// A pending request shows a loading line that the final panel replaces.
pub fn render_feedback(feedback: &RequestState<String>, color: bool) -> String {
    let palette = Palette { enabled: color };
    let body = match feedback {
        RequestState::Idle => return String::new(),
        RequestState::Submitting => palette.muted("⠋ Generating feedback..."),
        RequestState::Succeeded(text) => text.clone(),
        RequestState::Failed(message) => palette.paint(Band::Low.color(), message),
    };
    format!("\n{}\n{}\n", palette.heading("AI Feedback"), body)
}
