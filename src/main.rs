mod cli;

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use card_forge::{
    classify, extract_record_pattern, extrapolate, format_batch, generate_records, history_stats,
    is_valid, open_database, prefix_patterns, repair, sort_entries, write_csv, AppConfig,
    CardRecord, GenerateRequest, HistorySort, HistoryStore, MaskRange, NewHistoryEntry,
    RandomDigits,
};
use cli::{Args, HistoryAction, Mode};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = AppConfig::from_env()?;
    if let Some(db) = args.db {
        config.db_path = db;
    }

    match args.mode {
        Mode::Generate {
            bin,
            month,
            year,
            security_code,
            quantity,
            length,
            csv,
            no_save,
        } => {
            let request = GenerateRequest {
                bin,
                month,
                year,
                security_code,
                quantity: quantity.unwrap_or(config.quantity),
                target_length: length.unwrap_or(config.target_length),
            };
            run_generate(&config, &request, csv.as_deref(), !no_save)?;
        }
        Mode::Similarity { first, second } => run_similarity(&first, &second)?,
        Mode::Extrapolate {
            card,
            count,
            start,
            end,
            patterns,
        } => run_extrapolate(&config, &card, count, MaskRange::new(start, end), patterns)?,
        Mode::Check { numbers } => run_check(&numbers),
        Mode::Brand { bin } => println!("{}", classify(&bin).as_str()),
        Mode::History { action } => run_history(&config, action)?,
        Mode::Ui => run_ui_mode(&config)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "card_forge=debug" } else { "card_forge=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn check_quantity(quantity: usize, max: usize) -> Result<()> {
    if quantity == 0 || quantity > max {
        return Err(anyhow!("quantity must be 1-{}, got {}", max, quantity));
    }
    Ok(())
}

fn run_generate(
    config: &AppConfig,
    request: &GenerateRequest,
    csv_path: Option<&std::path::Path>,
    save: bool,
) -> Result<()> {
    check_quantity(request.quantity, config.max_quantity)?;

    let today = Local::now().date_naive();
    let records = generate_records(request, &mut rand::thread_rng(), today)?;
    println!("{}", format_batch(&records));

    if let Some(path) = csv_path {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_csv(&records, file)?;
        eprintln!("✓ Wrote {} cards to {}", records.len(), path.display());
    }

    if save {
        let conn = open_database(&config.db_path)?;
        conn.create(
            &config.user,
            &NewHistoryEntry {
                bin: request.bin.clone(),
                month: request.month.clone().unwrap_or_default(),
                year: request.year.clone().unwrap_or_default(),
                security_code: request.security_code.clone().unwrap_or_default(),
                quantity: request.quantity as i64,
                target_length: request.target_length as i64,
            },
        )?;
    }

    eprintln!(
        "✓ {} {} cards generated",
        records.len(),
        classify(&request.bin).as_str()
    );
    Ok(())
}

fn run_similarity(first: &str, second: &str) -> Result<()> {
    let a: CardRecord = first.parse()?;
    let b: CardRecord = second.parse()?;
    let pattern = extract_record_pattern(&a, &b)?;

    println!("{}", pattern);
    if pattern.is_disjoint() {
        eprintln!("⚠️  No digits in common");
    } else {
        eprintln!(
            "✓ {} of {} digits shared",
            pattern.shared_digits(),
            pattern.pattern.len()
        );
    }
    Ok(())
}

fn run_extrapolate(
    config: &AppConfig,
    card: &str,
    count: usize,
    mask: MaskRange,
    patterns: bool,
) -> Result<()> {
    let seed: CardRecord = card.parse()?;

    if patterns {
        for pattern in prefix_patterns(&seed.number) {
            println!("{}", pattern);
        }
        return Ok(());
    }

    check_quantity(count, config.max_quantity)?;
    let batch = extrapolate(&seed, count, mask, RandomDigits(rand::thread_rng()))?;
    println!("{}", format_batch(&batch));
    Ok(())
}

fn run_check(numbers: &[String]) {
    for number in numbers {
        let number = number.trim();
        if is_valid(number) {
            println!("✓ {} valid ({})", number, classify(number).as_str());
            continue;
        }
        match repair(number) {
            Ok(fixed) => println!("✗ {} invalid, check digit gives {}", number, fixed),
            Err(e) => println!("✗ {} invalid: {}", number, e),
        }
    }
}

fn run_history(config: &AppConfig, action: HistoryAction) -> Result<()> {
    let conn = open_database(&config.db_path)?;

    match action {
        HistoryAction::List { sort, favorites } => {
            let sort: HistorySort = sort.parse()?;
            let mut entries = conn.list(&config.user, config.history_limit)?;
            if favorites {
                entries.retain(|e| e.is_favorite);
            }
            sort_entries(&mut entries, sort);

            if entries.is_empty() {
                println!("No history yet");
            }
            for e in &entries {
                println!(
                    "{} {} {:<16} {:>2}/{:<4} code:{:<4} x{:<4} {}",
                    if e.is_favorite { "★" } else { " " },
                    e.id,
                    e.bin,
                    e.month,
                    e.year,
                    if e.security_code.is_empty() { "rand" } else { e.security_code.as_str() },
                    e.quantity,
                    e.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                );
            }
        }
        HistoryAction::Favorite { id } => match conn.toggle_favorite(&config.user, &id)? {
            Some(true) => println!("★ {} marked as favourite", id),
            Some(false) => println!("☆ {} unmarked", id),
            None => return Err(anyhow!("no history entry {}", id)),
        },
        HistoryAction::Delete { id } => {
            if !conn.delete(&config.user, &id)? {
                return Err(anyhow!("no history entry {}", id));
            }
            println!("✓ Deleted {}", id);
        }
        HistoryAction::Clear => {
            let removed = conn.clear(&config.user)?;
            println!("✓ Cleared {} entries", removed);
        }
        HistoryAction::Stats => {
            let entries = conn.list(&config.user, u32::MAX as usize)?;
            let stats = history_stats(&entries);
            println!("Sessions:        {}", stats.total_sessions);
            println!("Cards generated: {}", stats.total_generated);
            println!("Favourites:      {}", entries.iter().filter(|e| e.is_favorite).count());
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let conn = open_database(&config.db_path)?;
    let mut app = ui::App::new(conn, config.clone())?;
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    Err(anyhow!(
        "TUI mode not available, rebuild with: cargo build --features tui"
    ))
}
