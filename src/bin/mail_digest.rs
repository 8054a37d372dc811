use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use mail_digest::auth::credential_store;
use mail_digest::config::load_config;
use mail_digest::daemon::{DaemonConfig, run_daemon};
use mail_digest::digest::job::DigestJob;
use mail_digest::domain::email::ScanWindow;
use mail_digest::ipc::{self, Request};

#[derive(Parser)]
#[command(name = "mail_digest")]
#[command(about = "Daily mailbox digest (IMAP scan + summary)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve one window of mail and push a digest
    Digest {
        /// Single day to digest (defaults to today)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<NaiveDate>,

        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Print the raw retrieval result as JSON instead of a digest
        #[arg(long)]
        json: bool,

        /// List records instead of calling the summarizer
        #[arg(long)]
        no_summary: bool,
    },

    /// Run the scheduler: one digest per day, plus IPC-triggered runs
    Daemon,

    /// Ask a running daemon to produce a digest now
    Trigger {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Store the IMAP password (or the summarizer API key) in the keyring
    SetPassword {
        #[arg(long)]
        api_key: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetPassword { api_key } => {
            eprintln!("Paste secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            let secret = secret.trim();
            if api_key {
                credential_store::save_api_key(secret)?;
                println!("Saved summarizer API key");
            } else {
                let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
                credential_store::save_password(&cfg.user_email, secret)?;
                println!("Saved IMAP password for {}", cfg.user_email);
            }
            Ok(())
        }

        Command::Digest {
            date,
            from,
            to,
            json,
            no_summary,
        } => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            let window = match (from, to) {
                (Some(from), Some(to)) => ScanWindow::new(from, to)?,
                _ => ScanWindow::single_day(date.unwrap_or_else(|| Local::now().date_naive())),
            };

            let job = DigestJob::from_config(&cfg, !no_summary && !json)?;
            if json {
                let result = job.retrieve(&window);
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            job.run(&window)?;
            Ok(())
        }

        Command::Daemon => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            let daemon_cfg = DaemonConfig::from_run_at(&cfg.schedule.run_at)?;
            let job = DigestJob::from_config(&cfg, true)?;
            run_daemon(job, daemon_cfg)
        }

        Command::Trigger { date } => {
            let resp = ipc::send(&Request::RunDigest {
                date: date.map(|d| d.format("%Y-%m-%d").to_string()),
            })?;
            match (resp.ok, resp.message) {
                (true, msg) => {
                    println!("{}", msg.unwrap_or_default());
                    Ok(())
                }
                (false, msg) => Err(anyhow!(
                    "daemon refused: {}",
                    msg.unwrap_or_else(|| "unknown error".into())
                )),
            }
        }
    }
}
