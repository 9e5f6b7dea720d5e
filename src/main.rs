// src/main.rs

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use rusqlite::Connection;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use study_mastery::config::{ConfigStore, FileConfigStore};
use study_mastery::export::{self, ExportFormat};
use study_mastery::models::{ConceptFilter, ConceptPatch, NewConcept};
use study_mastery::{database, practice, repository, stats, Error, Result, UpdateRule};

/// track concept mastery with spaced-repetition review scheduling
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    /// database file (overrides the config file and default location)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to read instead of the default one
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// do not seed sample concepts into an empty database
    #[clap(long, global = true)]
    no_seed: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// register a new concept
    Add {
        name: String,
        #[clap(short, long)]
        category: String,
        #[clap(short, long)]
        description: Option<String>,
        /// starting mastery in [0, 1]
        #[clap(short, long, default_value_t = 0.0)]
        mastery: f64,
        /// ids of related concepts
        #[clap(long, value_delimiter = ',')]
        related: Vec<i64>,
        /// ids of prerequisite concepts
        #[clap(long, value_delimiter = ',')]
        prerequisites: Vec<i64>,
    },
    /// list concepts, weakest first
    List {
        #[clap(short, long)]
        category: Option<String>,
        #[clap(long)]
        needs_review: bool,
        #[clap(long, default_value_t = 1)]
        page: u32,
        #[clap(long)]
        limit: Option<u32>,
    },
    /// show one concept
    Show { id: i64 },
    /// edit fields of a concept
    Edit {
        id: i64,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        category: Option<String>,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        mastery: Option<f64>,
        #[clap(long)]
        needs_review: Option<bool>,
        /// RFC 3339 timestamp, e.g. 2024-03-01T12:00:00Z
        #[clap(long)]
        next_review: Option<DateTime<Utc>>,
        /// counters must satisfy encountered = succeeded + failed
        #[clap(long)]
        encountered: Option<u32>,
        #[clap(long)]
        succeeded: Option<u32>,
        #[clap(long)]
        failed: Option<u32>,
        /// replaces the related concept ids
        #[clap(long, value_delimiter = ',')]
        related: Option<Vec<i64>>,
        /// replaces the prerequisite concept ids
        #[clap(long, value_delimiter = ',')]
        prerequisites: Option<Vec<i64>>,
    },
    /// delete a concept
    Delete { id: i64 },
    /// record one practice attempt (EMA rule)
    Practice(OutcomeArgs),
    /// update mastery from the success ratio (batch rule)
    UpdateMastery(OutcomeArgs),
    /// record an outcome with an explicitly chosen rule
    Record {
        #[clap(flatten)]
        outcome: OutcomeArgs,
        /// ema (A) or success_ratio (B)
        #[clap(long, default_value = "ema")]
        rule: UpdateRule,
    },
    /// flag a concept for review now
    MarkReview { id: i64 },
    /// concepts flagged or due for review
    Due,
    /// concepts below a mastery threshold
    Weak {
        #[clap(long)]
        threshold: Option<f64>,
    },
    /// mastery statistics
    Stats,
    /// export all concepts
    Export {
        #[clap(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct OutcomeArgs {
    id: i64,
    #[clap(long, conflicts_with = "failure", required_unless_present = "failure")]
    success: bool,
    #[clap(long)]
    failure: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::NotFound(id)) => {
            eprintln!("concept {} not found", id);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    debug!("Config path: {:?}", store.path());
    let cfg = store.load();

    let db_path = cfg.resolve_db_path(cli.db.as_deref());
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    info!("Database path: {:?}", db_path);
    let conn = Connection::open(&db_path)?;
    database::init_db(&conn, cfg.seed_sample_data && !cli.no_seed)?;

    match cli.command {
        Command::Add {
            name,
            category,
            description,
            mastery,
            related,
            prerequisites,
        } => {
            let new = NewConcept {
                name,
                category,
                description,
                mastery_level: mastery,
                related_concepts: related,
                prerequisites,
            };
            print_json(&repository::create_concept(&conn, &new, Utc::now())?)
        }
        Command::List {
            category,
            needs_review,
            page,
            limit,
        } => {
            let filter = ConceptFilter {
                category,
                needs_review_only: needs_review,
                page,
                limit: limit.unwrap_or(cfg.page_size),
            };
            print_json(&repository::list_concepts(&conn, &filter)?)
        }
        Command::Show { id } => {
            let concept = repository::get_concept(&conn, id)?.ok_or(Error::NotFound(id))?;
            print_json(&concept)
        }
        Command::Edit {
            id,
            name,
            category,
            description,
            mastery,
            needs_review,
            next_review,
            encountered,
            succeeded,
            failed,
            related,
            prerequisites,
        } => {
            let patch = ConceptPatch {
                name,
                category,
                description,
                mastery_level: mastery,
                needs_review,
                next_review_date: next_review,
                times_encountered: encountered,
                times_succeeded: succeeded,
                times_failed: failed,
                related_concepts: related,
                prerequisites,
            };
            print_json(&repository::update_concept(&conn, id, &patch, Utc::now())?)
        }
        Command::Delete { id } => {
            repository::delete_concept(&conn, id)?;
            print_json(&serde_json::json!({ "message": "Concept deleted successfully" }))
        }
        Command::Practice(args) => {
            print_json(&practice::record_practice(&conn, args.id, args.success)?)
        }
        Command::UpdateMastery(args) => print_json(&practice::update_concept_mastery(
            &conn,
            args.id,
            args.success,
        )?),
        Command::Record { outcome, rule } => print_json(&practice::apply_outcome(
            &conn,
            outcome.id,
            outcome.success,
            rule,
            Utc::now(),
        )?),
        Command::MarkReview { id } => print_json(&practice::mark_for_review(&conn, id)?),
        Command::Due => print_json(&practice::concepts_needing_review(&conn)?),
        Command::Weak { threshold } => {
            let threshold = threshold.unwrap_or(cfg.weak_threshold);
            print_json(&repository::find_weak_concepts(&conn, threshold)?)
        }
        Command::Stats => print_json(&stats::mastery_stats(&conn)?),
        Command::Export { format, output } => {
            let concepts = repository::all_concepts(&conn)?;
            match output {
                Some(path) => {
                    let mut file = BufWriter::new(File::create(&path)?);
                    export::export_concepts(&concepts, format, &mut file)?;
                    file.flush()?;
                    info!("Exported {} concepts to {:?}", concepts.len(), path);
                    Ok(())
                }
                None => export::export_concepts(&concepts, format, io::stdout().lock()),
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
