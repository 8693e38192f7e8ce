//! skillchatctl - CLI client for skillchatd
//!
//! Lists skills, runs chat turns, probes a skill and exports transcripts
//! through the daemon's HTTP API.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod client;
mod render;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::{ChatRequest, Client, ClientError};
use skillchat_core::Config;

const DEFAULT_ADDR: &str = "http://127.0.0.1:8000";

const DEFAULT_PROBE_QUESTION: &str =
    "What can you do with this skill? Please describe its capabilities and what tasks it can help with.";

/// CLI client for the skillchatd daemon.
#[derive(Parser)]
#[command(name = "skillchatctl")]
#[command(about = "Talk to hosted skills through skillchatd")]
#[command(version)]
struct Cli {
    /// Daemon address (default: http://127.0.0.1:8000)
    #[arg(long, global = true, env = "SKILLCHATD_ADDR")]
    addr: Option<String>,

    /// Auth token for daemon API
    #[arg(long, global = true, env = "SKILLCHATD_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List custom and pre-built skills
    Skills,

    /// Send one message and print the reply
    Chat {
        /// Message text
        message: String,

        /// Session to continue (a new one is generated when omitted)
        #[arg(long)]
        session: Option<String>,

        /// Skill to attach to this turn
        #[arg(long)]
        skill: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Maximum output tokens
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Ask a skill what it can do and save the answer as a report
    Probe {
        /// Skill to probe (default: CLAUDE_SKILL_ID)
        #[arg(long)]
        skill: Option<String>,

        /// Question to ask
        #[arg(long)]
        question: Option<String>,

        /// Directory for the report file
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Export a session transcript as markdown
    Export {
        /// Session ID
        session: String,

        /// Directory to write the export into
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let addr = cli.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let client = Client::new(&addr, cli.token.as_deref());

    if let Err(e) = client.wait_for_ready().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Skills => run_skills(&client).await,
        Command::Chat {
            message,
            session,
            skill,
            temperature,
            max_tokens,
        } => run_chat(&client, message, session, skill, temperature, max_tokens).await,
        Command::Probe {
            skill,
            question,
            output_dir,
        } => run_probe(&client, skill, question, &output_dir).await,
        Command::Export {
            session,
            output_dir,
        } => run_export(&client, &session, &output_dir).await,
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Local configuration, used only for CLAUDE_SKILL_ID. A broken `.env` is
/// reported and otherwise ignored.
fn local_config() -> Config {
    match Config::load(Some(Path::new(".env"))) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: ignoring local configuration: {}", e);
            Config::default()
        }
    }
}

fn new_session_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::now_v7().simple())
}

async fn run_skills(client: &Client) -> Result<(), ClientError> {
    let skills = client.list_skills().await?;
    let config = local_config();
    print!(
        "{}",
        render::format_skill_list(&skills, config.default_skill())
    );
    Ok(())
}

async fn run_chat(
    client: &Client,
    message: String,
    session: Option<String>,
    skill: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
) -> Result<(), ClientError> {
    let session_id = match session {
        Some(id) => id,
        None => {
            let id = new_session_id("session");
            eprintln!("session: {id} (pass --session {id} to continue)");
            id
        }
    };

    let req = ChatRequest {
        message,
        session_id: session_id.clone(),
        skill_id: skill,
        temperature,
        max_tokens,
    };

    let result = client.chat(&req).await?;
    render::print_chat_result(&session_id, &result);
    Ok(())
}

async fn run_probe(
    client: &Client,
    skill: Option<String>,
    question: Option<String>,
    output_dir: &Path,
) -> Result<(), ClientError> {
    let now = Utc::now();
    let config = local_config();

    let Some(skill_id) = skill.or_else(|| config.default_skill().map(str::to_string)) else {
        let msg = "error: no skill to probe\n  → pass --skill or set CLAUDE_SKILL_ID in .env";
        eprintln!("{msg}");
        let path = write_report(output_dir, now, msg)?;
        eprintln!("report saved to: {}", path.display());
        std::process::exit(1);
    };
    let question = question.unwrap_or_else(|| DEFAULT_PROBE_QUESTION.to_string());

    let header = render::probe_header(&skill_id, &question);
    println!("{header}");

    let req = ChatRequest {
        message: question,
        session_id: new_session_id("probe"),
        skill_id: Some(skill_id),
        temperature: None,
        max_tokens: None,
    };

    match client.chat(&req).await {
        Ok(result) => {
            let body = render::probe_body(&result);
            println!("{body}");
            let path = write_report(output_dir, now, &format!("{header}{body}"))?;
            println!("report saved to: {}", path.display());
            Ok(())
        }
        Err(e) => {
            let report = format!("{header}\nerror: {e}\n");
            let path = write_report(output_dir, now, &report)?;
            eprintln!("report saved to: {}", path.display());
            Err(e)
        }
    }
}

async fn run_export(client: &Client, session: &str, output_dir: &Path) -> Result<(), ClientError> {
    let export = client.export(session).await?;
    let path = export.write_to_dir(output_dir)?;
    println!("exported {} to {}", session, path.display());
    Ok(())
}

fn report_filename(at: DateTime<Utc>) -> String {
    format!("response_{}.md", at.format("%y.%m.%d.%H.%M.%S"))
}

fn write_report(dir: &Path, at: DateTime<Utc>, contents: &str) -> Result<PathBuf, ClientError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_filename(at));
    std::fs::write(&path, contents)?;
    Ok(path)
}
