mod console_speech;

use std::fmt;
use std::sync::Arc;

use drill_core::model::{
    DEFAULT_PRIMARY_TAG, DEFAULT_SECONDARY_TAG, DEFAULT_SPEECH_RATE, PlaybackSettings,
    SettingsError, Word, WordId,
};
use drill_core::playback::{PlaybackSnapshot, PlaybackState};
use services::{AppServices, Clock, PlayerHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::console_speech::ConsoleSpeech;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidWordId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidRate { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidWordId { raw } => write!(f, "invalid word id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidRate { raw } => write!(f, "invalid --rate value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options] play");
    eprintln!("  cargo run -p app -- [options] add <primary> <secondary>");
    eprintln!("  cargo run -p app -- [options] edit <id> <primary> <secondary>");
    eprintln!("  cargo run -p app -- [options] list [query]");
    eprintln!("  cargo run -p app -- [options] toggle <id>");
    eprintln!("  cargo run -p app -- [options] remove <id>");
    eprintln!("  cargo run -p app -- [options] stats");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>          (default sqlite://drill.sqlite3)");
    eprintln!("  --primary-lang <tag>       (default {DEFAULT_PRIMARY_TAG})");
    eprintln!("  --secondary-lang <tag>     (default {DEFAULT_SECONDARY_TAG})");
    eprintln!("  --rate <0.1-10>            (default {DEFAULT_SPEECH_RATE})");
    eprintln!();
    eprintln!("While playing: p = play/pause, n = next, b = previous, q = quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DRILL_DB_URL, DRILL_PRIMARY_LANG, DRILL_SECONDARY_LANG, DRILL_SPEECH_RATE, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play,
    Add { primary: String, secondary: String },
    Edit { id: WordId, primary: String, secondary: String },
    List { query: String },
    Toggle { id: WordId },
    Remove { id: WordId },
    Stats,
}

impl Command {
    fn parse(name: &str, positional: Vec<String>) -> Result<Self, ArgsError> {
        let mut positional = positional.into_iter();
        let mut take = |name: &'static str| {
            positional
                .next()
                .ok_or(ArgsError::MissingArgument { name })
        };
        let command = match name {
            "play" => Self::Play,
            "add" => Self::Add {
                primary: take("primary")?,
                secondary: take("secondary")?,
            },
            "edit" => Self::Edit {
                id: parse_word_id(take("id")?)?,
                primary: take("primary")?,
                secondary: take("secondary")?,
            },
            "list" => Self::List {
                query: take("query").unwrap_or_default(),
            },
            "toggle" => Self::Toggle {
                id: parse_word_id(take("id")?)?,
            },
            "remove" => Self::Remove {
                id: parse_word_id(take("id")?)?,
            },
            "stats" => Self::Stats,
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        Ok(command)
    }
}

fn parse_word_id(raw: String) -> Result<WordId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidWordId { raw })
}

#[derive(Debug)]
struct Args {
    db_url: String,
    primary_lang: String,
    secondary_lang: String,
    rate: f32,
    command: Command,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("DRILL_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://drill.sqlite3".into(), normalize_sqlite_url);
        let mut primary_lang =
            std::env::var("DRILL_PRIMARY_LANG").unwrap_or_else(|_| DEFAULT_PRIMARY_TAG.into());
        let mut secondary_lang = std::env::var("DRILL_SECONDARY_LANG")
            .unwrap_or_else(|_| DEFAULT_SECONDARY_TAG.into());
        let mut rate = match std::env::var("DRILL_SPEECH_RATE") {
            Ok(raw) => parse_rate(raw)?,
            Err(_) => DEFAULT_SPEECH_RATE,
        };

        let mut command = None;
        let mut positional = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--primary-lang" => primary_lang = require_value(args, "--primary-lang")?,
                "--secondary-lang" => secondary_lang = require_value(args, "--secondary-lang")?,
                "--rate" => rate = parse_rate(require_value(args, "--rate")?)?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if command.is_none() => command = Some(arg),
                _ => positional.push(arg),
            }
        }

        // Default behavior: start the player when no subcommand is given.
        let command = match command {
            Some(name) => Command::parse(&name, positional)?,
            None => Command::Play,
        };

        Ok(Self {
            db_url,
            primary_lang,
            secondary_lang,
            rate,
            command,
        })
    }
}

fn parse_rate(raw: String) -> Result<f32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidRate { raw })
}

fn build_settings(args: &Args) -> Result<PlaybackSettings, SettingsError> {
    PlaybackSettings::new(&args.primary_lang, &args.secondary_lang)?.with_speech_rate(args.rate)
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn word_line(word: &Word) -> String {
    let mark = if word.included() { 'x' } else { ' ' };
    format!(
        "{:>4}  [{mark}]  {}  /  {}",
        word.id().value(),
        word.text_primary(),
        word.text_secondary()
    )
}

fn status_line(snapshot: &PlaybackSnapshot) -> String {
    let state = match snapshot.state {
        PlaybackState::Idle => "PAUSED",
        PlaybackState::SpeakingPrimary => "SPEAKING PRIMARY",
        PlaybackState::SpeakingSecondary => "SPEAKING SECONDARY",
    };
    let Some(word) = &snapshot.current_word else {
        return format!("{state}  (no words selected)");
    };
    format!(
        "{state}  {}  word {}/{}  {}  /  {}",
        snapshot.repeat_label(),
        snapshot.position + 1,
        snapshot.playlist_len,
        word.text_primary(),
        word.text_secondary()
    )
}

/// Remembers the last printed status so settling and generation ticks that
/// do not change what the user sees stay silent.
#[derive(Default)]
struct StatusPrinter {
    last: String,
}

impl StatusPrinter {
    fn render(&mut self, snapshot: &PlaybackSnapshot) -> Option<String> {
        let line = status_line(snapshot);
        if line == self.last {
            return None;
        }
        self.last.clone_from(&line);
        Some(line)
    }
}

async fn play(player: PlayerHandle) -> Result<(), Box<dyn std::error::Error>> {
    player.refresh_playlist().await?;

    let mut snapshots = player.subscribe();
    let mut printer = StatusPrinter::default();
    if let Some(line) = printer.render(&snapshots.borrow_and_update()) {
        println!("{line}");
    }
    let render = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if let Some(line) = printer.render(&snapshot) {
                println!("{line}");
            }
        }
    });

    println!("p = play/pause, n = next, b = previous, q = quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "p" => match player.toggle().await {
                Ok(_) => {}
                Err(err) if err.is_nothing_to_play() => {
                    println!("Nothing to play: select some words first.");
                }
                Err(err) => return Err(err.into()),
            },
            "n" => player.next().await?,
            "b" => player.prev().await?,
            "q" => break,
            "" => {}
            other => println!("unknown key: {other}"),
        }
    }

    player.shutdown().await;
    let _ = render.await;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = build_settings(&args)?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(
        &args.db_url,
        Clock::system(),
        settings,
        Arc::new(ConsoleSpeech::new()),
    )
    .await?;
    info!(db = %args.db_url, "storage ready");

    let words = services.words();
    match args.command {
        Command::Play => play(services.player().spawn()).await?,
        Command::Add { primary, secondary } => {
            let word = words.add_word(&primary, &secondary).await?;
            println!("{}", word_line(&word));
        }
        Command::Edit {
            id,
            primary,
            secondary,
        } => {
            let word = words.edit_word(id, &primary, &secondary).await?;
            println!("{}", word_line(&word));
        }
        Command::List { query } => {
            for word in words.list_words(&query).await? {
                println!("{}", word_line(&word));
            }
        }
        Command::Toggle { id } => {
            let word = words.toggle_included(id).await?;
            println!("{}", word_line(&word));
        }
        Command::Remove { id } => {
            words.delete_word(id).await?;
            println!("removed word {id}");
        }
        Command::Stats => {
            let stats = services.stats();
            println!("today: {}", stats.today_count().await?);
            for entry in stats.last_7_days().await? {
                println!("{}  {:>4}", entry.date, entry.count);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
