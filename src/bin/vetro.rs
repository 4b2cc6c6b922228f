use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use vetro::sim::{Scene, Script, run_report};
use vetro::{MotionConfig, MotionEngine, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "vetro", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a motion script and report the final stage as JSON.
    Run(RunArgs),
    /// Initialize against a scene and print the registry snapshot.
    Snapshot(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Motion config JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output report path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Motion config JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MotionConfig> {
    match path {
        Some(path) => read_json(path, "config"),
        None => Ok(MotionConfig::default()),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let script: Script = read_json(&args.in_path, "script")?;
    let config = load_config(args.config.as_deref())?;

    let report = run_report(&script, config)?;
    let json = serde_json::to_string_pretty(&report)?;

    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(&out, json)
                .with_context(|| format!("write report '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let scene: Scene = read_json(&args.in_path, "scene")?;
    let config = load_config(args.config.as_deref())?;

    let mut stage = scene.build_stage()?;
    let mut engine = MotionEngine::new(config)?;
    engine.init(&mut stage, Timestamp::ZERO);

    let json = serde_json::to_string_pretty(&engine.snapshot())?;
    println!("{json}");
    Ok(())
}
