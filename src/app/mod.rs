//! High-level application orchestration layer.
//!
//! This module provides the CLI-facing `App` façade. It validates input,
//! runs one analysis through [`TlsGrader`] and renders either structured
//! (JSON/YAML) or human-oriented output (styled / plain).
//!
//! Major steps in `App::run`:
//!   1. Schema generation early-exit
//!   2. Config load / validation
//!   3. Request validation (host, option conflicts)
//!   4. Parameter summary
//!   5. Polling until a terminal status, cancellable with Ctrl-C
//!   6. Detailed report persistence (non-fatal)
//!   7. Structured output or styled/plain report

use std::path::PathBuf;

use clap::CommandFactory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analysis::AnalysisReport;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::errors::{Result, TlsGradeError};
use crate::facade::TlsGrader;
use crate::output::{self, OutputFormatter, TextFormatter};
use crate::request::AnalysisRequest;
use crate::structured_output::GradeReportOutput;
use crate::styled_output::StyledFormatter;

/// Result of saving the detailed report.
enum RawReport {
    NotRequested,
    Saved(PathBuf),
    Failed(String),
}

/// Application façade.
pub struct App;

impl App {
    /// Execute the end-to-end analysis workflow.
    ///
    /// Returns the intended process exit code (0 = success, 1 = user/input
    /// error). Analysis failures are returned as errors.
    pub async fn run(cli: &Cli) -> Result<i32> {
        if Self::maybe_print_schema(cli)? {
            return Ok(0);
        }

        let config = Self::load_config(cli)?;

        let request = match Self::build_request(cli) {
            Ok(request) => request,
            Err(e) => {
                Self::report_input_error(cli, &e);
                return Ok(1);
            }
        };

        let formatter = Self::formatter(cli);
        if !cli.is_structured_output() {
            print!("{}", formatter.format_request(&request));
            println!("Analysing {}...", request.host());
        }

        let grader = TlsGrader::new(&config)?;
        let report = Self::analyze(&grader, &request).await?;

        let raw = Self::persist_raw_report(&config, &request, &report);

        if Self::maybe_render_structured(cli, &config, &request, &report, &raw)? {
            return Ok(0);
        }

        print!("{}", formatter.format_report(&report));
        match raw {
            RawReport::Saved(path) => {
                println!("\nThe full report was saved to: {}", path.display());
            }
            RawReport::Failed(message) => {
                if cli.warn_enabled() {
                    println!("\nWarning: {message}");
                }
            }
            RawReport::NotRequested => {}
        }

        Ok(0)
    }

    fn maybe_print_schema(cli: &Cli) -> Result<bool> {
        if cli.generate_schema {
            let schema = GradeReportOutput::generate_json_schema()
                .map_err(|e| TlsGradeError::internal_with("Error generating JSON schema", e))?;
            println!("{schema}");
            return Ok(true);
        }
        Ok(false)
    }

    fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::from_env();
        config.merge_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn build_request(cli: &Cli) -> Result<AnalysisRequest> {
        AnalysisRequest::builder(cli.host.clone().unwrap_or_default())
            .publish(cli.publish)
            .start_new(cli.start_new)
            .from_cache(cli.from_cache)
            .max_age(cli.max_age)
            .all(cli.all)
            .ignore_mismatch(cli.ignore_mismatch)
            .build()
    }

    fn report_input_error(cli: &Cli, error: &TlsGradeError) {
        if cli.error_enabled() {
            eprintln!("Error: {error}");
            eprintln!();
            eprintln!("{}", Cli::command().render_help());
        }
    }

    fn formatter(cli: &Cli) -> Box<dyn OutputFormatter> {
        if !cli.should_use_styling() {
            Box::new(TextFormatter)
        } else if cli.no_color {
            Box::new(StyledFormatter::without_colors())
        } else {
            Box::new(StyledFormatter::new())
        }
    }

    /// Poll until done; Ctrl-C cancels the run.
    async fn analyze(grader: &TlsGrader, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling analysis");
                token.cancel();
            }
        });

        let result = grader.analyze(request, &cancel).await;
        interrupt.abort();
        result
    }

    fn persist_raw_report(
        config: &Config,
        request: &AnalysisRequest,
        report: &AnalysisReport,
    ) -> RawReport {
        if !request.all() {
            return RawReport::NotRequested;
        }
        let Some(raw) = report.raw_payload.as_deref() else {
            return RawReport::NotRequested;
        };

        match output::write_raw_report(&config.output.report_dir, request.host(), raw) {
            Ok(path) => {
                debug!(path = %path.display(), "detailed report written");
                RawReport::Saved(path)
            }
            Err(e) => {
                warn!("could not save the detailed report: {e}");
                RawReport::Failed(format!("could not save the detailed report: {e}"))
            }
        }
    }

    fn maybe_render_structured(
        cli: &Cli,
        config: &Config,
        request: &AnalysisRequest,
        report: &AnalysisReport,
        raw: &RawReport,
    ) -> Result<bool> {
        if !cli.is_structured_output() {
            return Ok(false);
        }

        let mut document = GradeReportOutput::new(request, &config.api.endpoint, report.clone());
        match raw {
            RawReport::Saved(path) => document.set_raw_report_path(path.display().to_string()),
            RawReport::Failed(message) => document.add_warning(message.clone()),
            RawReport::NotRequested => {}
        }

        let rendered = match cli.output_format() {
            OutputFormat::Yaml => document.to_yaml(),
            _ => document.to_json(),
        }
        .map_err(|e| TlsGradeError::internal_with("Error serializing output", e))?;

        println!("{rendered}");
        Ok(true)
    }
}
