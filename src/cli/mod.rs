use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use crate::application::{AppError, LedgerService, parse_date};
use crate::config::{Config, DATA_ENV_VAR};
use crate::domain::{EntryChange, MAX_AMOUNT, ViewMode, YEARLY_TARGET};
use crate::io::{Exporter, ImportOptions, Importer};

/// savings365 - one amount per day, each value used once a year
#[derive(Parser)]
#[command(name = "savings365")]
#[command(about = "A 365-day savings plan: record an amount from 1 to 365 each day, never repeating within a year")]
#[command(version)]
pub struct Cli {
    /// Data file path (JSON, CSV or SQLite)
    #[arg(short, long, global = true, env = DATA_ENV_VAR)]
    pub data: Option<PathBuf>,

    /// Storage backend: json, csv, sqlite (defaults to the file extension)
    #[arg(short, long, global = true)]
    pub backend: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record an amount for a date (omit the value to clear it)
    Set {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Amount between 1 and 365
        value: Option<String>,
    },

    /// Remove the amount recorded for a date
    Clear {
        /// Date (YYYY-MM-DD)
        date: String,
    },

    /// List dates with their amounts
    List {
        /// Show a whole month (YYYY-MM) instead of the last days
        #[arg(short, long)]
        month: Option<String>,

        /// Number of days ending today
        #[arg(long, default_value = "7", conflicts_with = "month")]
        days: u32,
    },

    /// Total saved in a year
    Total {
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Amounts not yet used in a year
    Remaining {
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Suggest a random unused amount
    Suggest {
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Progress summary for a year
    Summary {
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Export entries to CSV or JSON
    Export {
        /// Only export this year
        #[arg(short, long)]
        year: Option<i32>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import entries from a date,amount CSV
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Validate without saving
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::resolve(self.data, self.backend.as_deref())?;
        let mut service = LedgerService::open(config.store_kind, &config.data_path)
            .await
            .with_context(|| format!("Failed to open {}", config.data_path.display()))?;

        if self.verbose {
            eprintln!("Using {}", service.store().describe());
        }

        let today = Local::now().date_naive();

        match self.command {
            Commands::Set { date, value } => {
                let date = parse_date(&date)?;
                let change = service
                    .set_entry(date, value.as_deref().unwrap_or(""))
                    .await?;
                print_change(date, change);
                print_year_total(&service, date.year());
            }

            Commands::Clear { date } => {
                let date = parse_date(&date)?;
                let change = service.clear_entry(date).await?;
                print_change(date, change);
                print_year_total(&service, date.year());
            }

            Commands::List { month, days } => {
                let mode = match month {
                    Some(month) => parse_month(&month)?,
                    None => ViewMode::LastDays(days),
                };
                run_list_command(&service, mode, today)?;
            }

            Commands::Total { year } => {
                let year = year.unwrap_or(today.year());
                print_year_total(&service, year);
            }

            Commands::Remaining { year } => {
                let year = year.unwrap_or(today.year());
                run_remaining_command(&service, year);
            }

            Commands::Suggest { year } => {
                let year = year.unwrap_or(today.year());
                match service.random_suggestion(year) {
                    Ok(amount) => println!("Suggested amount for {}: {}", year, amount),
                    Err(AppError::Exhausted(_)) => {
                        println!(
                            "All {} amounts for {} are used. The plan is complete!",
                            MAX_AMOUNT, year
                        );
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            Commands::Summary { year, format } => {
                let year = year.unwrap_or(today.year());
                run_summary_command(&service, year, &format)?;
            }

            Commands::Export {
                year,
                format,
                output,
            } => {
                run_export_command(&service, year, &format, output)?;
            }

            Commands::Import { input, dry_run } => {
                run_import_command(&mut service, input, dry_run).await?;
            }
        }

        Ok(())
    }
}

fn print_change(date: NaiveDate, change: EntryChange) {
    match change {
        EntryChange::Inserted(amount) => println!("Saved {}: {}", date, amount),
        EntryChange::Updated { previous, current } => {
            println!("Updated {}: {} -> {}", date, previous, current)
        }
        EntryChange::Unchanged(amount) => println!("{} already holds {}", date, amount),
        EntryChange::Removed(amount) => println!("Cleared {} (was {})", date, amount),
        EntryChange::AlreadyEmpty => println!("{} has no entry", date),
    }
}

fn print_year_total(service: &LedgerService, year: i32) {
    println!(
        "Saved in {}: {} / {}",
        year,
        format_thousands(service.total_saved(year)),
        format_thousands(YEARLY_TARGET)
    );
}

fn run_list_command(service: &LedgerService, mode: ViewMode, today: NaiveDate) -> Result<()> {
    let range = mode.range(today)?;
    let rows = service.entries_in(range);

    println!("  {:<12} {:<4} {:>6}", "DATE", "DAY", "AMOUNT");
    println!("  {}", "-".repeat(24));
    for row in &rows {
        let marker = if row.date == today { "*" } else { " " };
        let amount = row
            .amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {:<12} {:<4} {:>6}",
            marker,
            row.date,
            row.date.format("%a"),
            amount
        );
    }
    println!();

    let shown: u32 = rows.iter().filter_map(|r| r.amount).map(u32::from).sum();
    println!("Shown:    {}", format_thousands(shown));

    // A range can span a year boundary; report every year it touches
    let mut years: Vec<i32> = rows.iter().map(|r| r.date.year()).collect();
    years.dedup();
    for year in years {
        print_year_total(service, year);
    }
    Ok(())
}

fn run_remaining_command(service: &LedgerService, year: i32) {
    let remaining = service.remaining_amounts(year);
    if remaining.is_empty() {
        println!("No amounts left for {}: the plan is complete!", year);
        return;
    }

    println!("{} amounts left for {}:", remaining.len(), year);
    for chunk in remaining.chunks(15) {
        let line: Vec<String> = chunk.iter().map(|v| format!("{:>3}", v)).collect();
        println!("  {}", line.join(" "));
    }
}

fn run_summary_command(service: &LedgerService, year: i32, format: &str) -> Result<()> {
    let summary = service.year_summary(year);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "table" => {
            println!("Year:        {}", summary.year);
            println!("Days filled: {} / {}", summary.filled_days, MAX_AMOUNT);
            println!(
                "Saved:       {} / {}",
                format_thousands(summary.total_saved),
                format_thousands(summary.target_total)
            );
            println!("Remaining:   {} amounts", summary.remaining_count);
            println!("Progress:    {:.1}%", summary.completion_percentage);
        }
        _ => anyhow::bail!("Unknown format '{}'. Use: table, json", format),
    }
    Ok(())
}

fn run_export_command(
    service: &LedgerService,
    year: Option<i32>,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let exporter = Exporter::new(service);

    let writer: Box<dyn io::Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let count = match format {
        "csv" => exporter.export_csv(writer, year)?,
        "json" => exporter.export_json(writer, year)?.entries.len(),
        _ => anyhow::bail!("Unknown format '{}'. Use: csv, json", format),
    };

    if let Some(path) = output {
        eprintln!("Exported {} entries to {}", count, path.display());
    }
    Ok(())
}

async fn run_import_command(
    service: &mut LedgerService,
    input: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let reader: Box<dyn io::Read> = match &input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let result = Importer::new(service)
        .import_csv(reader, ImportOptions { dry_run })
        .await?;

    if dry_run {
        println!("Dry run: nothing was saved.");
    }
    println!("Imported: {}", result.imported);
    println!("Skipped:  {}", result.skipped);
    if !result.errors.is_empty() {
        println!("Errors:   {}", result.errors.len());
        for error in &result.errors {
            match &error.field {
                Some(field) => println!("  line {} ({}): {}", error.line, field, error.error),
                None => println!("  line {}: {}", error.line, error.error),
            }
        }
    }
    Ok(())
}

/// Parse `YYYY-MM` into a month view.
fn parse_month(input: &str) -> Result<ViewMode> {
    let (year, month) = input
        .trim()
        .split_once('-')
        .with_context(|| format!("Invalid month '{}'. Use YYYY-MM", input))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("Invalid year in '{}'", input))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("Invalid month in '{}'", input))?;
    if !(1..=12).contains(&month) {
        anyhow::bail!("Invalid month '{}'. Use YYYY-MM", input);
    }
    Ok(ViewMode::Month { year, month })
}

/// Format with thousands separators: 66795 -> "66,795"
fn format_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
