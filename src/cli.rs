use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

/// Boolean flags that older scripts pass Go-style as `-flag=true`.
const BOOL_FLAGS: &[&str] = &[
    "publish",
    "startNew",
    "start-new",
    "fromCache",
    "from-cache",
    "all",
    "ignoreMismatch",
    "ignore-mismatch",
];

// Verbosity levels:
// 0 - silent (only final output)
// 1 - errors
// 2 - warnings + errors
// 3 - progress (default)
// 4 - debug
// 5 - trace
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tlsgrade",
    author,
    version,
    about = "SSL Labs TLS Security Analyzer: grade the TLS setup of a public host",
    after_help = "Single-dash flags (-host www.example.com -startNew) are accepted as well."
)]
pub struct Cli {
    /// Domain to analyse (required, e.g. www.example.com)
    #[arg(long, value_name = "DOMAIN")]
    pub host: Option<String>,

    /// Publish the results on the public SSL Labs boards
    #[arg(long)]
    pub publish: bool,

    /// Start a new assessment, ignoring cached results
    #[arg(long = "start-new", visible_alias = "startNew")]
    pub start_new: bool,

    /// Accept cached results when available
    #[arg(long = "from-cache", visible_alias = "fromCache")]
    pub from_cache: bool,

    /// Maximum age in hours of a cached report (requires --from-cache)
    #[arg(
        long = "max-age",
        visible_alias = "maxAge",
        value_name = "HOURS",
        default_value_t = 0
    )]
    pub max_age: u32,

    /// Detailed mode: keep every field and save the full report as JSON
    #[arg(long)]
    pub all: bool,

    /// Continue even when the certificate does not match the host
    #[arg(long = "ignore-mismatch", visible_alias = "ignoreMismatch")]
    pub ignore_mismatch: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Plain text output without styling
    #[arg(long)]
    pub plain: bool,

    /// Directory for the detailed JSON report
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Give up after this many seconds in total
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Override the analysis endpoint
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Verbosity level (0-5)
    #[arg(long, default_value_t = 3)]
    pub verbose: u8,

    /// Print the JSON schema of the structured output and exit
    #[arg(long)]
    pub generate_schema: bool,
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report (styled on a terminal)
    #[default]
    Text,
    /// Structured JSON document
    Json,
    /// Structured YAML document
    Yaml,
}

impl Cli {
    /// Parse the process arguments, accepting Go-style single-dash flags.
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse_normalized(std::env::args_os())
    }

    /// Parse an explicit argument list (first item is the program name).
    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.into().to_string_lossy().into_owned())
            .collect();
        Self::try_parse_from(normalize_legacy_flags(args))
    }

    /// Convenience: are we in very verbose/debug mode?
    pub fn is_trace(&self) -> bool {
        self.verbose >= 5
    }

    /// Are warning-level messages enabled?
    pub fn warn_enabled(&self) -> bool {
        self.verbose >= 2
    }

    /// Are error-level messages enabled?
    pub fn error_enabled(&self) -> bool {
        self.verbose >= 1
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_structured_output(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Yaml)
    }

    /// Styled output unless plain text was asked for.
    pub fn should_use_styling(&self) -> bool {
        !self.plain && !self.is_structured_output()
    }
}

/// Rewrite single-dash long flags (`-host`, `-maxAge=5`) into clap's `--`
/// form. `-flag=true` / `-flag=false` on boolean flags become the bare flag
/// or nothing. Single-character flags, negative numbers and everything after
/// `--` are left alone.
pub fn normalize_legacy_flags(args: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();

    if let Some(program) = iter.next() {
        out.push(program);
    }

    while let Some(arg) = iter.next() {
        if arg == "--" {
            out.push(arg);
            out.extend(iter.by_ref());
            break;
        }

        let long = if let Some(rest) = arg.strip_prefix("--") {
            rest.to_string()
        } else if let Some(rest) = arg.strip_prefix('-') {
            let name_len = rest.split('=').next().map(str::len).unwrap_or(0);
            if name_len < 2 || !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
                out.push(arg);
                continue;
            }
            rest.to_string()
        } else {
            out.push(arg);
            continue;
        };

        match long.split_once('=') {
            Some((name, value)) if BOOL_FLAGS.contains(&name) => match value {
                "true" | "1" => out.push(format!("--{name}")),
                "false" | "0" => {}
                _ => out.push(format!("--{long}")),
            },
            _ => out.push(format!("--{long}")),
        }
    }

    out
}
