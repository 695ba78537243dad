use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rusqlite::Connection;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lotto_suggest::config;
use lotto_suggest::connection::conn;
use lotto_suggest::database::{
    delete_undated_suggestions, get_all_lotteries, get_draw_history, get_lottery_by_name,
};
use lotto_suggest::import::import_directory;
use lotto_suggest::presets::seed_default_lotteries;
use lotto_suggest::stats::compute_statistics;
use lotto_suggest::suggestions::{
    GenerationOutcome, generate_for_all_lotteries, generate_for_lottery, suggestion_summary,
    validate_all_lotteries,
};
use lotto_suggest::{Lottery, validate_suggestions};

#[derive(Parser)]
#[command(name = "lotto-suggest", about = "Lottery results tracker and number suggestions")]
struct Cli {
    /// SQLite database path (overrides LOTTERY_DB_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and the default lotteries
    Init,
    /// Import draw JSON files from a directory
    Import { dir: Option<PathBuf> },
    /// Fetch new draws from the configured feed, then validate suggestions
    Sync,
    /// Check pending suggestions against known draws
    Validate {
        #[arg(long)]
        lottery: Option<String>,
    },
    /// Generate and store suggestions for the next draw
    Generate {
        #[arg(long)]
        lottery: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show hot and cold numbers of a lottery
    Stats {
        #[arg(long)]
        lottery: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Show how stored suggestions performed
    Summary {
        #[arg(long)]
        lottery: Option<String>,
    },
    /// Delete suggestions stored without a target draw date
    Cleanup,
}

fn find_lottery(conn: &Connection, name: &str) -> Result<Lottery> {
    get_lottery_by_name(conn, name)?.ok_or_else(|| anyhow!("Unknown lottery: {}", name))
}

fn print_outcome(outcome: &GenerationOutcome) {
    let target = outcome
        .target_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unscheduled".to_string());
    println!(
        "🎯 {} ({}): {:?} + {:?}",
        outcome.lottery_name, target, outcome.generated.main_numbers, outcome.generated.extra_numbers
    );
    println!(
        "   📊 {} draws analysed, {} suggestions learned, top numbers {:?}",
        outcome.generated.insights.total_draws_analyzed,
        outcome.generated.insights.suggestions_learned,
        outcome.generated.insights.top_numbers
    );
    if outcome.suggestion_id.is_none() {
        println!("   📋 A suggestion for this draw was already stored; not saved again");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load()?;
    if let Some(db) = cli.db {
        config.database_url = db;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let conn = conn(&config.database_url)?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Command::Init => {
            let ids = seed_default_lotteries(&conn)?;
            println!("✅ Database ready at {} with {} lotteries", config.database_url, ids.len());
        }
        Command::Import { dir } => {
            let dir = dir.unwrap_or(config.import_dir);
            let report = import_directory(&conn, &dir)?;
            println!(
                "📥 Imported {} draws ({} duplicates, {} rejected)",
                report.inserted, report.duplicates, report.rejected
            );
        }
        Command::Sync => {
            let feed_url = config
                .feed_url
                .as_deref()
                .context("LOTTERY_FEED_URL is not set")?;
            let report = lotto_suggest::api::fetch_and_save_draws(&conn, feed_url).await?;
            println!(
                "🔄 Synced {} new draws ({} duplicates, {} rejected)",
                report.inserted, report.duplicates, report.rejected
            );
            for (lottery_id, summary) in validate_all_lotteries(&conn)? {
                println!(
                    "   ✓ lottery {}: {} validated, {} matches",
                    lottery_id, summary.validated_count, summary.total_matches
                );
            }
        }
        Command::Validate { lottery } => {
            let lotteries = match lottery {
                Some(name) => vec![find_lottery(&conn, &name)?],
                None => get_all_lotteries(&conn)?,
            };
            for lottery in lotteries {
                let summary = validate_suggestions(&conn, lottery.id)?;
                println!(
                    "✓ {}: {} validated with {} matches, {} still waiting for a draw",
                    lottery.name, summary.validated_count, summary.total_matches, summary.pending_count
                );
            }
        }
        Command::Generate { lottery, seed } => {
            let mut rng = match seed.or(config.seed) {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            match lottery {
                Some(name) => {
                    let lottery = find_lottery(&conn, &name)?;
                    let outcome =
                        generate_for_lottery(&conn, lottery.id, &config.weights, today, &mut rng)?;
                    print_outcome(&outcome);
                }
                None => {
                    for entry in generate_for_all_lotteries(&conn, &config.weights, today, &mut rng)? {
                        match (&entry.outcome, &entry.skipped) {
                            (Some(outcome), _) => print_outcome(outcome),
                            (None, Some(reason)) => {
                                println!("⚠ {}: {}", entry.lottery_name, reason)
                            }
                            (None, None) => {}
                        }
                    }
                }
            }
        }
        Command::Stats { lottery, top } => {
            let lottery = find_lottery(&conn, &lottery)?;
            let history = get_draw_history(&conn, lottery.id)?;
            let stats =
                compute_statistics(&history, lottery.config.main_min, lottery.config.main_max);
            println!("📊 {} ({} draws)", lottery.name, history.len());
            println!("   🔥 Hot:");
            for stat in stats.hot_numbers(top) {
                println!("      {:>3}  {}x", stat.number, stat.frequency);
            }
            println!("   ❄ Cold:");
            for stat in stats.cold_numbers(top) {
                println!("      {:>3}  {} draws ago", stat.number, stat.delay);
            }
        }
        Command::Summary { lottery } => {
            let lottery_id = match lottery {
                Some(name) => Some(find_lottery(&conn, &name)?.id),
                None => None,
            };
            let summary = suggestion_summary(&conn, lottery_id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Cleanup => {
            let deleted = delete_undated_suggestions(&conn)?;
            println!("🧹 Deleted {} suggestions without a draw date", deleted);
        }
    }

    Ok(())
}
