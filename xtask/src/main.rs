use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for wayfarer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and doc
    Check,
    /// Run all tests
    Test,
    /// Run the scheduler benchmark
    Bench,
    /// Play every scenario under demos/ through the CLI
    Demos,
}

const FMT: &[&str] = &["fmt", "--all", "--", "--check"];
const CLIPPY: &[&str] = &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"];
const TEST: &[&str] = &["test", "--workspace"];
const DOC: &[&str] = &["doc", "--workspace", "--no-deps"];
const BENCH: &[&str] = &["bench", "-p", "wayfarer-stream", "--bench", "bench_scheduler"];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            for args in [FMT, CLIPPY, TEST, DOC] {
                cargo(args)?;
            }
        }
        Commands::Test => cargo(TEST)?,
        Commands::Bench => cargo(BENCH)?,
        Commands::Demos => run_demos()?,
    }

    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args[0]);
    }
    Ok(())
}

fn run_demos() -> Result<()> {
    let mut scenarios: Vec<_> = std::fs::read_dir("demos")?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    scenarios.sort();
    for path in scenarios {
        let path = path.to_string_lossy().into_owned();
        // World manifests have no route; validate those instead.
        let command = if std::fs::read_to_string(&path)?.contains("\nroute:") {
            "simulate"
        } else {
            "validate"
        };
        cargo(&["run", "-q", "-p", "wayfarer-cli", "--", command, path.as_str()])?;
    }
    Ok(())
}
