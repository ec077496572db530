use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod service;
mod ui;
mod utils;

use config::{Settings, API_URL_ENV, CONTRACT_ENV};
use service::{AnalysisService, HttpAnalysisService, ResumeFile};
use ui::analyzer::ResumeAnalyzer;
use ui::gauge::{self, Animation, RingGeometry, BAR_WIDTH, TRACK_COLOR};
use ui::request::RequestState;
use ui::results::{render_feedback, render_results, Band};
use utils::terminal::{erase_lines, fg_hex, print_banner, RESET};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

fn cli() -> Command {
    Command::new("resume-match")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compare a resume against a job description using a remote analysis service")
        .long_about(
            "Uploads a PDF resume together with a job description to the analysis\n\
            service and shows the similarity score, the echoed texts and AI feedback.\n\
            Commands:\n\
            - analyze: score a resume against a job description\n\
            - extract: print the text of a PDF resume",
        )
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .global(true)
                .help(format!("Analysis service base URL [env: {}]", API_URL_ENV))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("contract")
                .long("contract")
                .value_name("NAME")
                .global(true)
                .help(format!(
                    "Backend contract: service or next-api [env: {}]",
                    CONTRACT_ENV
                ))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .help("Only log errors and hide the banner")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Log request details")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .global(true)
                .help("Disable colored output")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("analyze")
                .about("Score a resume against a job description")
                .arg(resume_arg())
                .arg(
                    Arg::new("job")
                        .long("job")
                        .short('j')
                        .value_name("TEXT")
                        .help("Job description text")
                        .conflicts_with("job-file")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("job-file")
                        .long("job-file")
                        .value_name("PATH")
                        .help("Read the job description from a file (stdin when neither is given)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("no-feedback")
                        .long("no-feedback")
                        .help("Skip the AI feedback request")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .help("Download the PDF report after analysis")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("report-dir")
                        .long("report-dir")
                        .value_name("DIR")
                        .help("Directory for the downloaded report")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("gauge-svg")
                        .long("gauge-svg")
                        .value_name("PATH")
                        .help("Also write the score ring as an SVG file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("no-animate")
                        .long("no-animate")
                        .help("Print the final gauge without animating it")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("extract")
                .about("Print the text of a PDF resume")
                .arg(resume_arg())
                .arg(
                    Arg::new("remote")
                        .long("remote")
                        .help("Ask the analysis service to extract instead of doing it locally")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

fn resume_arg() -> Arg {
    Arg::new("resume")
        .long("resume")
        .short('r')
        .value_name("PATH")
        .help("Resume PDF")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .action(clap::ArgAction::Set)
}

/// RUST_LOG wins when set; otherwise the verbosity flags pick the level.
fn log_directive(verbose: bool, quiet: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ if verbose => "debug".to_string(),
        _ if quiet => "error".to_string(),
        _ => "info".to_string(),
    }
}

fn init_tracing(matches: &ArgMatches) {
    let directive = log_directive(
        matches.get_flag("verbose"),
        matches.get_flag("quiet"),
        std::env::var("RUST_LOG").ok(),
    );
    let (filter, rejected) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("info"), Some(e)),
    };

    // stdout carries the results, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Some(e) = rejected {
        warn!("Ignoring invalid log filter {:?}: {}", directive, e);
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(&matches);

    let styled = !matches.get_flag("no-color") && std::env::var_os("NO_COLOR").is_none();
    let color = styled && std::io::stdout().is_terminal();

    if !matches.get_flag("quiet") {
        print_banner(styled && std::io::stderr().is_terminal());
    }

    let settings = match Settings::resolve(
        matches.get_one::<String>("api-url").cloned(),
        matches.get_one::<String>("contract").cloned(),
    ) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            process::exit(1);
        }
    };
    info!(
        "Using analysis service at {} ({} contract)",
        settings.api_url, settings.contract
    );

    let outcome = match matches.subcommand() {
        Some(("analyze", sub)) => run_analyze(sub, settings, color).await,
        Some(("extract", sub)) => run_extract(sub, settings).await,
        _ => unreachable!("subcommand is required"),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn read_job_description(matches: &ArgMatches) -> Result<String> {
    if let Some(text) = matches.get_one::<String>("job") {
        return Ok(text.clone());
    }
    if let Some(path) = matches.get_one::<PathBuf>("job-file") {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read job description from {}", path.display()));
    }

    if std::io::stdin().is_terminal() {
        eprintln!("Paste the job description, then press Ctrl-D:");
    }
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("failed to read job description from stdin")?;
    Ok(text)
}

/// Prints every visible notice once, then dismisses it.
fn flush_notices<S: AnalysisService>(analyzer: &mut ResumeAnalyzer<S>, color: bool) {
    let shown: Vec<(u64, String)> = analyzer
        .notices()
        .visible()
        .iter()
        .map(|notice| (notice.id, notice.render(color)))
        .collect();
    for (id, line) in shown {
        eprintln!("{}", line);
        analyzer.notices_mut().dismiss(id);
    }
}

async fn run_analyze(matches: &ArgMatches, settings: Settings, color: bool) -> Result<()> {
    let resume_path = matches
        .get_one::<PathBuf>("resume")
        .context("missing --resume")?;
    let job_description = read_job_description(matches).await?;
    let resume = ResumeFile::load(resume_path).await?;

    let service = HttpAnalysisService::new(settings.api_url, settings.contract)?;
    let mut analyzer = ResumeAnalyzer::new(service);
    analyzer.set_job_description(job_description);
    analyzer.select_file(resume);

    if !analyzer.can_submit() {
        // Surfaces which field is missing
        analyzer.submit(false).await;
        flush_notices(&mut analyzer, color);
        bail!("the form is incomplete");
    }

    if let Some(file) = analyzer.form().resume() {
        eprintln!("Analyzing {} ...", file.name());
    }
    let analyzed = analyzer.submit(false).await;
    flush_notices(&mut analyzer, color);
    if !analyzed {
        bail!("analysis failed");
    }

    let Some(result) = analyzer.analysis().value().cloned() else {
        bail!("analysis produced no result");
    };
    let band = Band::from_score(result.similarity);
    let with_feedback = !matches.get_flag("no-feedback") && analyzer.offers_feedback();
    let live = std::io::stdout().is_terminal();

    show_gauge(result.similarity, band, color, !matches.get_flag("no-animate")).await?;
    print!("\n{}", render_results(&result, &RequestState::Idle, color));

    if with_feedback {
        let pending = render_feedback(&RequestState::Submitting, color);
        if live {
            print!("{}", pending);
            std::io::stdout().flush()?;
        }
        analyzer.request_feedback().await;
        if live {
            print!("{}", erase_lines(pending.lines().count()));
        }
        print!("{}", render_feedback(analyzer.feedback(), color));
        std::io::stdout().flush()?;
        flush_notices(&mut analyzer, color);
    }

    if let Some(svg_path) = matches.get_one::<PathBuf>("gauge-svg") {
        write_gauge_svg(svg_path, result.similarity, band).await?;
    }

    if matches.get_flag("report") {
        let dir = matches
            .get_one::<PathBuf>("report-dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        if !analyzer.can_download() {
            bail!("a report needs a finished analysis");
        }
        eprintln!("Generating report ...");
        let saved = analyzer.download_report(&dir).await;
        flush_notices(&mut analyzer, color);
        if saved.is_none() {
            bail!("report download failed");
        }
    }

    Ok(())
}

async fn show_gauge(similarity: f64, band: Band, color: bool, animate: bool) -> Result<()> {
    let paint = |progress: f64| {
        let bar = gauge::render_bar(progress, BAR_WIDTH);
        if color {
            format!("{}{}{}", fg_hex(band.color()), bar, RESET)
        } else {
            bar
        }
    };

    let mut stdout = std::io::stdout();
    if animate && stdout.is_terminal() {
        gauge::play(&Animation::mount(similarity), &mut stdout, FRAME_INTERVAL, paint).await?;
    } else {
        writeln!(stdout, "{}", paint(similarity))?;
    }
    Ok(())
}

async fn write_gauge_svg(path: &Path, similarity: f64, band: Band) -> Result<()> {
    let svg = gauge::render_svg(&RingGeometry::default(), similarity, TRACK_COLOR, band.color());
    tokio::fs::write(path, svg)
        .await
        .with_context(|| format!("failed to write gauge to {}", path.display()))?;
    info!("Wrote gauge to {}", path.display());
    Ok(())
}

async fn run_extract(matches: &ArgMatches, settings: Settings) -> Result<()> {
    let resume_path = matches
        .get_one::<PathBuf>("resume")
        .context("missing --resume")?;
    let resume = ResumeFile::load(resume_path).await?;
    if !resume.is_pdf() {
        bail!("{} is not a PDF (detected {})", resume.name(), resume.mime());
    }

    let text = if matches.get_flag("remote") {
        let service = HttpAnalysisService::new(settings.api_url, settings.contract)?;
        service.extract_text(&resume).await?
    } else {
        debug!("Extracting {} locally", resume.name());
        tokio::task::spawn_blocking(move || {
            utils::pdf::extract_text_from_pdf_mem(resume.bytes())
        })
        .await
        .context("PDF extraction task failed")??
    };

    println!("{}", text);
    Ok(())
}
