use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use carelens::config::{self, PipelineConfig};
use carelens::db::{HealthStore, SqliteHealthStore};
use carelens::intelligence::{refresh_health_score, register_family_member, HealthScoreCalculator};
use carelens::models::FamilyMember;
use carelens::pipeline::extraction::PlainTextExtractor;
use carelens::pipeline::import::RawDocument;
use carelens::pipeline::{cancel_pair, DocumentProcessor};

#[derive(Parser, Debug)]
#[command(
    name = "carelens",
    version,
    about = "Analyze family health documents and track per-member health scores."
)]
struct Args {
    /// SQLite database file (defaults to ~/CareLens/carelens.db).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a family member.
    AddMember {
        name: String,
        /// Date of birth, YYYY-MM-DD.
        date_of_birth: Option<NaiveDate>,
    },
    /// List family members.
    Members,
    /// Analyze documents for a member.
    Analyze {
        member_id: Uuid,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Recompute and print a member's health score.
    Score { member_id: Uuid },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    carelens::init_tracing();
    let args = Args::parse();

    let config = PipelineConfig::load_default().context("Cannot load pipeline config")?;
    let db_path = args.db.unwrap_or_else(config::database_path);
    let store = Arc::new(
        SqliteHealthStore::open(&db_path, config.actions)
            .with_context(|| format!("Cannot open database {}", db_path.display()))?,
    );
    tracing::info!(
        version = config::APP_VERSION,
        db = %db_path.display(),
        "CareLens ready"
    );

    let now = Local::now().naive_local();

    match args.command {
        Command::AddMember {
            name,
            date_of_birth,
        } => {
            let mut member = FamilyMember::new(name);
            member.date_of_birth = date_of_birth;
            let calculator = HealthScoreCalculator::new(config.scoring);
            let member = register_family_member(store.as_ref(), &calculator, &member, now.date())
                .context("Cannot register member")?;
            print_json(&member)
        }
        Command::Members => print_json(&store.list_family_members()?),
        Command::Score { member_id } => {
            let calculator = HealthScoreCalculator::new(config.scoring);
            let breakdown = refresh_health_score(store.as_ref(), &calculator, &member_id, now.date())
                .with_context(|| format!("Cannot score member {member_id}"))?;
            print_json(&breakdown)
        }
        Command::Analyze { member_id, files } => {
            store
                .read_family_member(&member_id)
                .with_context(|| format!("Unknown member {member_id}"))?;

            let mut docs = Vec::with_capacity(files.len());
            for path in &files {
                docs.push(
                    RawDocument::from_path(path, config.extraction.max_file_size_bytes)
                        .await
                        .with_context(|| format!("Cannot load {}", path.display()))?,
                );
            }

            let processor = Arc::new(DocumentProcessor::new(
                Arc::new(PlainTextExtractor),
                store.clone(),
                config,
            ));

            let (cancel, signal) = cancel_pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling batch");
                    cancel.cancel();
                }
            });

            let reports = processor.process_batch(member_id, docs, now, signal).await?;
            print_json(&reports)
        }
    }
}
