use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pilot_passport_api::{PassportConfig, PassportError, PilotPassportApi, API_CONTRACT_VERSION};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

const EXIT_FAILURE: u8 = 1;
const EXIT_NOT_FOUND: u8 = 3;
const EXIT_SOURCE_UNAVAILABLE: u8 = 4;

#[derive(Debug, Parser)]
#[command(name = "passport")]
#[command(about = "IL-2 pilot passport: career lineage, service record and stats")]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct PathArgs {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Game installation root.
    #[arg(long, global = true)]
    game_path: Option<PathBuf>,
    /// Career database, when not under the game path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Stock resource directory.
    #[arg(long, global = true)]
    static_root: Option<PathBuf>,
    /// Mod rank override directory.
    #[arg(long, global = true)]
    mod_ranks_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// One entry per career lineage in the database.
    Pilots,
    /// Identity, promotions and awards for a pilot.
    ServiceRecord(DescriptorArgs),
    /// Ordered statistics report for a pilot.
    Stats(DescriptorArgs),
    /// Every sortie flown across a pilot's lineage.
    Sorties(DescriptorArgs),
}

#[derive(Debug, Args)]
struct DescriptorArgs {
    /// Raw pilot descriptor, as listed in the `desc` field of `passport pilots`.
    #[arg(long)]
    desc: String,
}

impl PathArgs {
    fn passport_config(&self) -> Result<PassportConfig> {
        let file = match self.config.as_deref() {
            Some(path) => PassportConfig::load(path)?,
            None => PassportConfig::default(),
        };
        Ok(file.merge(PassportConfig {
            game_path: self.game_path.clone(),
            db_path: self.db.clone(),
            static_root: self.static_root.clone(),
            mod_ranks_dir: self.mod_ranks_dir.clone(),
        }))
    }
}

fn emit_json<T: Serialize>(payload: &T) -> Result<()> {
    let value = json!({
        "contract_version": CLI_CONTRACT_VERSION,
        "api_contract_version": API_CONTRACT_VERSION,
        "payload": payload,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn emit_error(err: &PassportError) -> Result<()> {
    let value: Value = json!({
        "contract_version": CLI_CONTRACT_VERSION,
        "error": { "code": err.code(), "message": err.to_string() },
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = match err.downcast_ref::<PassportError>() {
                Some(passport) => {
                    if let Err(emit_err) = emit_error(passport) {
                        eprintln!("error: {emit_err:#}");
                    }
                    match passport {
                        PassportError::NotFound(_) => EXIT_NOT_FOUND,
                        PassportError::SourceUnavailable { .. } => EXIT_SOURCE_UNAVAILABLE,
                        PassportError::Lineage(_) | PassportError::Store(_) => EXIT_FAILURE,
                    }
                }
                None => EXIT_FAILURE,
            };
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = cli.paths.passport_config()?.resolve();
    debug!(?paths, "resolved passport paths");
    let api = PilotPassportApi::new(paths);

    match cli.command {
        Command::Pilots => emit_json(&api.resolve_pilot_roster()?),
        Command::ServiceRecord(args) => emit_json(&api.resolve_service_record(&args.desc)?),
        Command::Stats(args) => emit_json(&api.resolve_stats(&args.desc)?),
        Command::Sorties(args) => emit_json(&api.resolve_sorties(&args.desc)?),
    }
}
