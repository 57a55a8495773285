use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use ca_app::{AppResult, StepRecord, adapter_schema, list_adapters, load_script, run_session_with};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ca-cli")]
#[command(about = "Co-simulation adapter CLI - inspect adapters and replay scripted sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in adapters
    Adapters,
    /// Print an adapter's schema as JSON
    Schema {
        /// Adapter name (see `adapters`)
        adapter: String,
    },
    /// Validate a session script
    Validate {
        /// Path to the session YAML or JSON file
        script_path: PathBuf,
    },
    /// Replay a session script and emit one JSON record per step
    Run {
        /// Path to the session YAML or JSON file
        script_path: PathBuf,
        /// Output file for the step records (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    // Logs go to stderr so step records on stdout stay machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Adapters => cmd_adapters(),
        Commands::Schema { adapter } => cmd_schema(&adapter),
        Commands::Validate { script_path } => cmd_validate(&script_path),
        Commands::Run {
            script_path,
            output,
        } => cmd_run(&script_path, output.as_deref()),
    }
}

fn cmd_adapters() -> AppResult<()> {
    println!("Available adapters:");
    for info in list_adapters() {
        println!("  {:<12} {}", info.name, info.description);
    }
    Ok(())
}

fn cmd_schema(adapter: &str) -> AppResult<()> {
    let schema = adapter_schema(adapter)?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn cmd_validate(script_path: &Path) -> AppResult<()> {
    println!("Validating session: {}", script_path.display());
    let script = load_script(script_path)?;
    println!("✓ Session is valid");
    println!("  Adapter: {} ({})", script.adapter, script.config.sim_id);
    println!("  Create calls: {}", script.create.len());
    println!("  Steps: {}", script.steps.len());
    Ok(())
}

fn cmd_run(script_path: &Path, output: Option<&Path>) -> AppResult<()> {
    let script = load_script(script_path)?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut write_error = None;
    let report = run_session_with(&script, |record: &StepRecord| {
        if write_error.is_some() {
            return;
        }
        let line = serde_json::to_string(record).map_err(io::Error::from);
        if let Err(e) = line.and_then(|line| writeln!(writer, "{line}")) {
            write_error = Some(e);
        }
    })?;
    if let Some(e) = write_error {
        return Err(e.into());
    }
    writer.flush()?;

    if let Some(path) = output {
        println!(
            "✓ Wrote {} step records for {} entities to {}",
            report.steps.len(),
            report.entities.len(),
            path.display()
        );
    }
    Ok(())
}
