//! Styled output formatting for tlsgrade using anstyle.
//!
//! Same content as [`crate::output::TextFormatter`], with a colored banner,
//! highlighted labels and grades colored by rank: the A family green, B and
//! C yellow, everything else red.

use anstyle::{AnsiColor, Color, Style};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use crate::analysis::AnalysisReport;
use crate::output::{
    BANNER_RULE, BANNER_TITLE, ENDPOINT_RULE, NOT_AVAILABLE, OutputFormatter, endpoint_rows,
    report_rows, request_rows,
};
use crate::request::AnalysisRequest;

/// Style definitions for different UI elements
pub struct Styles {
    pub header: Style,
    pub subheader: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub muted: Style,
    pub label: Style,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            header: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            subheader: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
            success: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
            warning: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            error: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            label: Style::new().bold(),
        }
    }
}

/// Styled output formatter for analysis reports
pub struct StyledFormatter {
    styles: Styles,
    use_colors: bool,
}

impl StyledFormatter {
    /// Create a new styled formatter
    pub fn new() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: Self::should_use_colors(),
        }
    }

    /// Create a formatter without colors (for non-interactive use)
    pub fn without_colors() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: false,
        }
    }

    /// Determine if colors should be used based on environment
    fn should_use_colors() -> bool {
        atty::is(atty::Stream::Stdout) && std::env::var("NO_COLOR").is_err()
    }

    /// Apply style to text if colors are enabled
    fn styled(&self, text: &str, style: &Style) -> String {
        if self.use_colors {
            format!("{}{}{}", style.render(), text, style.render_reset())
        } else {
            text.to_string()
        }
    }

    /// Style for a letter grade.
    fn grade_style(&self, grade: &str) -> &Style {
        match grade.trim() {
            "A+" | "A" | "A-" => &self.styles.success,
            "B" | "C" => &self.styles.warning,
            "" | NOT_AVAILABLE => &self.styles.muted,
            _ => &self.styles.error,
        }
    }

    fn write_row(&self, output: &mut String, label: &str, value: &str) -> std::fmt::Result {
        writeln!(
            output,
            "{}: {}",
            self.styled(&format!("{label:<20}"), &self.styles.label),
            value
        )
    }

    fn write_banner(&self, output: &mut String) -> std::fmt::Result {
        writeln!(output, "{}", self.styled(BANNER_RULE, &self.styles.muted))?;
        writeln!(output, "{}", self.styled(BANNER_TITLE, &self.styles.header))?;
        writeln!(output, "{}", self.styled(BANNER_RULE, &self.styles.muted))
    }

    fn write_report(&self, output: &mut String, report: &AnalysisReport) -> std::fmt::Result {
        writeln!(output)?;
        writeln!(output, "{}", self.styled(BANNER_RULE, &self.styles.muted))?;
        for (label, value) in report_rows(report) {
            let value = match label {
                "Domain" => self.styled(&value, &self.styles.header),
                "Status" => self.styled(&value, &self.styles.subheader),
                _ => value,
            };
            self.write_row(output, label, &value)?;
        }

        for (i, endpoint) in report.endpoints.iter().enumerate() {
            writeln!(output)?;
            writeln!(output, "{}", self.styled(ENDPOINT_RULE, &self.styles.muted))?;
            writeln!(
                output,
                "             {}",
                self.styled(&format!("Endpoint #{}", i + 1), &self.styles.subheader)
            )?;
            writeln!(output, "{}", self.styled(ENDPOINT_RULE, &self.styles.muted))?;

            for (label, value) in endpoint_rows(endpoint) {
                let value = match label {
                    "Grade" | "GradeTrustIgnored" => self.styled(&value, self.grade_style(&value)),
                    "HasWarnings" if endpoint.has_warnings => {
                        self.styled(&value, &self.styles.warning)
                    }
                    _ => value,
                };
                self.write_row(output, label, &value)?;
            }
        }
        Ok(())
    }

    /// Print the report to stdout.
    pub fn print_report(&self, report: &AnalysisReport) -> io::Result<()> {
        print!("{}", self.format_report(report));
        io::stdout().flush()
    }
}

impl OutputFormatter for StyledFormatter {
    fn format_request(&self, request: &AnalysisRequest) -> String {
        let mut output = String::new();
        let _ = self.write_banner(&mut output);
        output.push('\n');
        output.push_str(&self.styled("Parameters:", &self.styles.subheader));
        output.push('\n');
        for (label, value) in request_rows(request) {
            let _ = self.write_row(&mut output, label, &value);
        }
        output.push('\n');
        output
    }

    fn format_report(&self, report: &AnalysisReport) -> String {
        let mut output = String::new();
        let _ = self.write_report(&mut output, report);
        output
    }
}

impl Default for StyledFormatter {
    fn default() -> Self {
        Self::new()
    }
}
