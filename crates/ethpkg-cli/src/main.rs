mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "ethpkg",
    version,
    about = "Content-addressed package manifests for compiled smart-contract projects"
)]
struct Cli {
    /// Path to the ethpkg content store directory.
    #[arg(long, default_value = "~/.local/share/ethpkg", global = true)]
    store: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the manifest of a project.
    Create {
        /// Project root directory.
        #[arg(default_value = ".")]
        project: PathBuf,
        /// Package config file (defaults to ethpkg.toml, then ethpkg.json, in the project).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pin the manifest and its sources into the store.
        #[arg(long, default_value_t = false)]
        pin: bool,
        /// Write the manifest to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Fetch a pinned manifest by uri.
    Get {
        /// Content uri (blake3://...).
        uri: String,
        /// Write the manifest to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Verify the integrity of every object in the store.
    VerifyStore,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.trace);

    let store_path = expand_tilde(&cli.store);
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Create {
            project,
            config,
            pin,
            output,
        } => commands::create::run(
            &store_path,
            &project,
            config.as_deref(),
            pin,
            output.as_deref(),
            json_output,
        ),
        Commands::Get { uri, output } => {
            commands::get::run(&store_path, &uri, output.as_deref(), json_output)
        }
        Commands::VerifyStore => commands::verify_store::run(&store_path, json_output),
    };

    let code = result.unwrap_or_else(|msg| {
        eprintln!("error: {msg}");
        commands::exit_code_for(&msg)
    });
    ExitCode::from(code)
}

fn init_logging(verbose: bool, trace: bool) {
    let level = match (trace, verbose) {
        (true, _) => "trace",
        (false, true) => "debug",
        (false, false) => "warn",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("ETHPKG_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tilde_is_expanded_against_home() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_tilde("~/x"), PathBuf::from(home).join("x"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
