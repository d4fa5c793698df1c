use std::process::ExitCode;

use tlsgrade::app::App;
use tlsgrade::cli::Cli;
use tlsgrade::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    telemetry::init_tracing(cli.log_level());

    match App::run(&cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            tracing::debug!(category = %e.category(), "run failed");
            if cli.error_enabled() {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
