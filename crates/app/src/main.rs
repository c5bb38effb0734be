use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lesson_core::model::{Feed, LessonId};
use services::lesson::{Advance, LessonTimings, RevealedItem};
use services::narration::{PlaybackListener, Voice};
use services::{
    AudioClip, AudioOutput, Clock, LessonService, NarrationService, NarrationSynthesizer,
    PlaybackError, SpeechClient,
};
use storage::{Catalog, ContentSource};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCatalog,
    MissingText,
    UnknownArg(String),
    InvalidLessonId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCatalog => {
                write!(f, "no catalog given (use --catalog or LEARN_CATALOG)")
            }
            ArgsError::MissingText => write!(f, "narrate requires the text to speak"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson value: {raw}"),
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
    eprintln!("  cargo run -p app -- check   [--catalog <path>]");
    eprintln!("  cargo run -p app -- lesson  [--catalog <path>] [--lesson <id>]");
    eprintln!("  cargo run -p app -- narrate <text> [--out <path>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --lesson lesson_default");
    eprintln!("  --out narration.mp3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_CATALOG, LEARN_TTS_API_KEY, LEARN_TTS_BASE_URL, LEARN_TTS_MODEL,");
    eprintln!("  LEARN_TTS_VOICE, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Check { catalog: PathBuf },
    Lesson { catalog: PathBuf, lesson: LessonId },
    Narrate { text: String, out: PathBuf },
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let Some(name) = args.next() else {
            return Ok(None);
        };
        match name.as_str() {
            "check" => {
                let (catalog, _) = parse_catalog_args(&mut args, false)?;
                Ok(Some(Self::Check { catalog }))
            }
            "lesson" => {
                let (catalog, lesson) = parse_catalog_args(&mut args, true)?;
                Ok(Some(Self::Lesson {
                    catalog,
                    lesson: lesson.unwrap_or_else(LessonId::fallback),
                }))
            }
            "narrate" => {
                let mut text = None;
                let mut out = PathBuf::from("narration.mp3");
                while let Some(arg) = args.next() {
                    match arg.as_str() {
                        "--out" => out = PathBuf::from(require_value(&mut args, "--out")?),
                        _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                        _ if text.is_none() => text = Some(arg),
                        _ => return Err(ArgsError::UnknownArg(arg)),
                    }
                }
                let text = text.filter(|t| !t.trim().is_empty()).ok_or(ArgsError::MissingText)?;
                Ok(Some(Self::Narrate { text, out }))
            }
            "--help" | "-h" => Ok(None),
            _ => Err(ArgsError::UnknownArg(name)),
        }
    }
}

fn parse_catalog_args(
    args: &mut impl Iterator<Item = String>,
    accept_lesson: bool,
) -> Result<(PathBuf, Option<LessonId>), ArgsError> {
    let mut catalog = std::env::var("LEARN_CATALOG").ok().map(PathBuf::from);
    let mut lesson = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--catalog" => catalog = Some(PathBuf::from(require_value(args, "--catalog")?)),
            "--lesson" if accept_lesson => {
                let raw = require_value(args, "--lesson")?;
                let id = raw
                    .parse::<LessonId>()
                    .map_err(|_| ArgsError::InvalidLessonId { raw: raw.clone() })?;
                lesson = Some(id);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    let catalog = catalog.ok_or(ArgsError::MissingCatalog)?;
    Ok((catalog, lesson))
}

/// Output for headless runs: every clip "finishes" as soon as it starts.
struct SilentOutput;

struct SilentVoice;

#[async_trait]
impl AudioOutput for SilentOutput {
    async fn load(&self, _clip: &AudioClip) -> Result<Box<dyn Voice>, PlaybackError> {
        Ok(Box::new(SilentVoice))
    }
}

impl Voice for SilentVoice {
    fn start(&mut self, listener: PlaybackListener) {
        listener.finished();
    }

    fn stop(&mut self) {}
}

async fn load_catalog(path: &Path) -> Result<Catalog, Box<dyn std::error::Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(Catalog::from_json(&raw)?)
}

async fn check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(path).await?;
    let dangling = catalog.dangling_lessons();
    for id in &dangling {
        warn!(lesson = %id, "feed item points at a missing lesson; it will open the fallback");
    }
    let has_fallback = catalog.lessons.iter().any(|l| *l.id() == LessonId::fallback());
    if !dangling.is_empty() && !has_fallback {
        warn!(fallback = %LessonId::fallback(), "fallback lesson is missing");
    }
    let lessons = catalog.lessons.len();
    let source = ContentSource::in_memory(catalog.into_repository()?);
    let feed = Feed::with_default_repeat(source.feed.list_feed().await?);
    println!(
        "{}: {} lessons, {} feed items ({} frames), {} dangling lesson references",
        path.display(),
        lessons,
        feed.logical_items().len(),
        feed.len(),
        dangling.len()
    );
    Ok(())
}

async fn walk_lesson(path: &Path, lesson_id: &LessonId) -> Result<(), Box<dyn std::error::Error>> {
    let source = ContentSource::in_memory(load_catalog(path).await?.into_repository()?);
    let narration =
        NarrationService::new(Arc::new(SpeechClient::from_env()), Arc::new(SilentOutput));
    let lessons = LessonService::new(Clock::default(), source.lessons, narration.clone())
        .with_timings(LessonTimings::default().with_autoplay_narration(false));

    let (mut engine, _events) = lessons.start_lesson(lesson_id).await?;
    println!(
        "{} ({} items, {} scored)",
        engine.lesson().title(),
        engine.lesson().len(),
        engine.total_scorable()
    );
    let mut index = 0;
    loop {
        match engine.item(index)? {
            RevealedItem::Narration(item) => println!("  {index}. listen: {}", item.text()),
            RevealedItem::Quiz(item) => {
                println!("  {index}. quiz: {} [{}]", item.question(), item.options().join(" | "));
            }
            RevealedItem::Matching(item) => {
                let words: Vec<&str> = item.left_column().map(|(_, word)| word).collect();
                println!("  {index}. match: {}", words.join(", "));
            }
        }
        match engine.advance() {
            Advance::Revealed(next) => index = next,
            Advance::Finished(result) => {
                println!("finished without answers: {}/{}", result.score, result.total_scorable);
                break;
            }
            Advance::Exited => break,
        }
    }
    engine.exit();
    narration.shutdown();
    Ok(())
}

async fn narrate(text: &str, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let client = SpeechClient::from_env();
    if !client.enabled() {
        warn!("LEARN_TTS_API_KEY is not set; the request will fail");
    }
    let clip = client.synthesize(text).await?;
    tokio::fs::write(out, clip.bytes()).await?;
    info!(bytes = clip.len(), path = %out.display(), "narration saved");
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let command = Command::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Some(command) = command else {
        print_usage();
        return Ok(());
    };

    match command {
        Command::Check { catalog } => check(&catalog).await,
        Command::Lesson { catalog, lesson } => walk_lesson(&catalog, &lesson).await,
        Command::Narrate { text, out } => narrate(&text, &out).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}
