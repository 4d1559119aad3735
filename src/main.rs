use anyhow::{bail, Context};
use channel_store::{
    config::StoreConfig, demo::{build_demo_manager, run_demo}, logger::init_tracing, schema::write_schema, snapshot::StoreSnapshot,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::{env, fs, path::{Path, PathBuf}};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "channel-store",
    about = "Typed multi-channel attribute store",
    version
)]
struct Cli {
    /// Optional log level override (e.g. error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk through channels, maps and the channel manager
    Demo(DemoArgs),

    /// Write a snapshot of the demo channel manager
    Snapshot(SnapshotArgs),

    /// Restore a snapshot and print its channels
    Inspect(InspectArgs),

    /// Emit JSON‐Schema for snapshots and config into `<out>`
    Schema {
        #[arg(long, default_value = "schemas")]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Rows of the demo point cloud
    #[arg(long)]
    num_points: Option<usize>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[arg(long)]
    out: PathBuf,

    /// Defaults to the extension of `--out` (`.yaml`/`.yml` is YAML, anything else JSON)
    #[arg(long, value_enum)]
    format: Option<Format>,

    #[arg(long)]
    num_points: Option<usize>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    file: PathBuf,

    /// Defaults to the extension of `file`, as for `snapshot`
    #[arg(long, value_enum)]
    format: Option<Format>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn resolve(explicit: Option<Format>, path: &Path) -> Self {
        explicit.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_file = env::current_dir()?.join(".env");
    let (mut config, notes) = StoreConfig::from_env(Some(env_file.as_path()));
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }
    init_tracing(&config.log_level, config.log_dir.as_deref())?;
    notes.log();

    match cli.command {
        Commands::Demo(args) => {
            let num_points = args.num_points.unwrap_or(config.num_points);
            let report = run_demo(num_points)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Snapshot(args) => {
            let num_points = args.num_points.unwrap_or(config.num_points);
            let cm = build_demo_manager(num_points)?;
            let snapshot = StoreSnapshot::capture(&cm)?;
            let text = match Format::resolve(args.format, &args.out) {
                Format::Json => serde_json::to_string(&snapshot)?,
                Format::Yaml => serde_yaml_bw::to_string(&snapshot)?,
            };
            fs::write(&args.out, text)
                .with_context(|| format!("Failed to write snapshot to {}", args.out.display()))?;
            info!(channels = cm.len(), "snapshot written to {}", args.out.display());
            println!("Snapshot with {} channels written to {}", cm.len(), args.out.display());
        }
        Commands::Inspect(args) => {
            let file = args.file;
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read snapshot at {}", file.display()))?;
            let snapshot: StoreSnapshot = match Format::resolve(args.format, &file) {
                Format::Json => serde_json::from_str(&text)?,
                Format::Yaml => StoreSnapshot::from_yaml_str(&text)?,
            };
            let map = match snapshot.restore() {
                Ok(map) => map,
                Err(err) => {
                    error!("could not restore {}: {err}", file.display());
                    bail!(err);
                }
            };
            print!("{map}");
        }
        Commands::Schema { out } => {
            for path in write_schema(&out)? {
                println!("Schema written to {}", path.display());
            }
        }
    }
    Ok(())
}
