use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "keydev",
    version,
    about = "Find key developers in sliding windows of project history"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: dataset not found or unreadable
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let lower = format!("{err:#}").to_lowercase();

    if lower.contains("cannot read dataset") || lower.contains("dataset error") {
        3
    } else if lower.contains("config") {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command, cli.quiet) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_missing_dataset() {
        let err = anyhow::anyhow!("Cannot read dataset: /nonexistent.json");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_invalid_dataset() {
        let err = anyhow::anyhow!("Dataset error: Commit c1 has no code changes");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_config() {
        let err = anyhow::anyhow!("Invalid config: window.size_days must be at least 1");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Developer does not exist in the artifact graph: ghost");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
