use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ecgsim_lib::{summarize, Catalog, Lead};
use ecgsim_run::{
    read_session, run_session, write_dataset_json, write_manifest_json, write_points_tsv,
};
use env_logger::Env;
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "ecgsim",
    version,
    about = "Synthetic 12-lead ECG rhythm generator"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Tsv,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog rhythms as JSON lines
    List,
    /// Print the metadata and generator policy of one rhythm
    Describe {
        #[arg(long)]
        rhythm: String,
    },
    /// Synthesize a rhythm and write the traces to stdout
    Generate {
        #[arg(long)]
        rhythm: String,
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        #[arg(long)]
        seed: Option<u64>,
        /// Disable sinus beat-to-beat variability
        #[arg(long)]
        no_jitter: bool,
        /// Restrict TSV output to these leads (repeatable)
        #[arg(long)]
        lead: Vec<Lead>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Rates, R-R statistics and PR range of a synthesized rhythm
    Summary {
        #[arg(long)]
        rhythm: String,
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a TOML session design
    Session {
        #[arg(long)]
        design: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
struct ListEntry<'a> {
    id: &'a str,
    name: &'a str,
    category: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    match cli.command {
        Commands::List => cmd_list()?,
        Commands::Describe { rhythm } => cmd_describe(&rhythm)?,
        Commands::Generate {
            rhythm,
            duration,
            seed,
            no_jitter,
            lead,
            format,
        } => cmd_generate(&rhythm, duration, seed, no_jitter, &lead, format)?,
        Commands::Summary {
            rhythm,
            duration,
            seed,
        } => cmd_summary(&rhythm, duration, seed)?,
        Commands::Session { design, format } => cmd_session(&design, format)?,
    }
    Ok(())
}

fn cmd_list() -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for def in Catalog::standard().iter() {
        let entry = ListEntry {
            id: def.id,
            name: def.name,
            category: def.category.to_string(),
        };
        writeln!(out, "{}", serde_json::to_string(&entry)?)?;
    }
    Ok(())
}

fn cmd_describe(rhythm: &str) -> Result<()> {
    let def = Catalog::standard().get(rhythm)?;
    println!("{}", serde_json::to_string_pretty(def)?);
    Ok(())
}

fn cmd_generate(
    rhythm: &str,
    duration: f64,
    seed: Option<u64>,
    no_jitter: bool,
    leads: &[Lead],
    format: OutputFormat,
) -> Result<()> {
    let def = Catalog::standard().get(rhythm)?;
    let policy = if no_jitter {
        def.rhythm.without_jitter()
    } else {
        def.rhythm.clone()
    };
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(0));
    let dataset = policy.generate(duration, &mut rng);
    info!(
        "{}: {} beats, {} points",
        def.id,
        dataset.beats.len(),
        dataset.point_count()
    );
    let stdout = io::stdout();
    match format {
        OutputFormat::Json => {
            write_dataset_json(stdout.lock(), &dataset)?;
            println!();
        }
        OutputFormat::Tsv => write_points_tsv(stdout.lock(), &dataset, leads)?,
    }
    Ok(())
}

fn cmd_summary(rhythm: &str, duration: f64, seed: Option<u64>) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(0));
    let dataset = Catalog::standard().generate(rhythm, duration, &mut rng)?;
    println!("{}", serde_json::to_string(&summarize(&dataset))?);
    Ok(())
}

fn cmd_session(design: &Path, format: OutputFormat) -> Result<()> {
    let spec = read_session(design)?;
    let bundle = run_session(&spec)
        .with_context(|| format!("running session {}", design.display()))?;
    let stdout = io::stdout();
    match format {
        OutputFormat::Json => {
            write_manifest_json(stdout.lock(), &bundle.manifest)?;
            println!();
        }
        OutputFormat::Tsv => write_points_tsv(stdout.lock(), &bundle.dataset, &[])?,
    }
    Ok(())
}
