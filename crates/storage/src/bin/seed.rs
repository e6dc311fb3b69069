use std::fmt;

use chrono::{DateTime, Days, Duration, Utc};
use drill_core::model::Word;
use drill_core::model::WordId;
use storage::repository::{NewWordRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    words: u32,
    history_days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidWords { raw: String },
    InvalidHistoryDays { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidWords { raw } => write!(f, "invalid --words value: {raw}"),
            ArgsError::InvalidHistoryDays { raw } => {
                write!(f, "invalid --history-days value: {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("DRILL_DB_URL")
            .unwrap_or_else(|_| "sqlite://drill.sqlite3?mode=rwc".into());
        let mut words = std::env::var("DRILL_SEED_WORDS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(6);
        let mut history_days = std::env::var("DRILL_SEED_HISTORY_DAYS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--words" => {
                    let value = require_value(&mut args, "--words")?;
                    words = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidWords { raw: value.clone() })?;
                }
                "--history-days" => {
                    let value = require_value(&mut args, "--history-days")?;
                    history_days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidHistoryDays { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            words,
            history_days,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://drill.sqlite3?mode=rwc)");
    eprintln!("  --words <n>               Number of sample word pairs to insert (default: 6)");
    eprintln!("  --history-days <n>        Days of play history to backfill (default: 5)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  DRILL_DB_URL, DRILL_SEED_WORDS, DRILL_SEED_HISTORY_DAYS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let samples = [
        ("xin chào", "안녕하세요"),
        ("cảm ơn", "감사합니다"),
        ("tạm biệt", "안녕히 가세요"),
        ("nước", "물"),
        ("cà phê", "커피"),
        ("bao nhiêu tiền", "얼마예요"),
    ];
    for i in 0..args.words {
        let idx = (i as usize) % samples.len();
        let (primary, secondary) = samples[idx];
        // Validated through the domain type so seeded rows obey the same rules.
        let draft = Word::new(
            WordId::new(0),
            primary,
            secondary,
            now + Duration::seconds(i64::from(i)),
        )?;
        storage
            .words
            .insert_new_word(NewWordRecord::from_word(&draft))
            .await?;
    }

    let today = now.date_naive();
    for offset in 0..args.history_days {
        let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        for _ in 0..=(offset % 3) {
            storage.play_log.record_cycle(day).await?;
        }
    }

    println!(
        "Seeded {} words and {} days of play history into {}",
        args.words, args.history_days, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
