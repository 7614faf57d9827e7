//! parley CLI binary entry point.

use parley::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    cli::init_tracing(cli.log_filter());

    if let Err(e) = cli::commands::run(cli).await {
        eprintln!("Error: {e}");
        if let Some(participant) = e.failed_participant() {
            eprintln!("Failed participant: {participant}");
        }
        if let Some(hint) = e.recovery_suggestion().hint() {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}
