//! Streams one chapter and prints it at the paced reveal rate.
//!
//! Talks to the backend named by `CHAPTER_STREAM_BASE_URL` (a `.env` file
//! is honoured), or replays a built-in chapter with `--offline`. Ctrl-C
//! cancels the generation.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chapter_stream::observability::init_observability;
use chapter_stream::prelude::*;
use chapter_stream::transport::GenerationTransport;
use clap::Parser;
use tracing::{info, warn};

const SAMPLE_CHAPTER: &str = "The caravan left the oasis before dawn. By noon the horizon had \
turned the color of rust, and the old guide stopped singing. \"Tie the camels together,\" she \
said, and nobody asked why.";

#[derive(Parser, Debug)]
#[command(about = "Stream a generated chapter with a typewriter reveal")]
struct Args {
    /// Project the chapter belongs to.
    #[arg(long, default_value = "demo-project")]
    project: String,
    /// Chapter position (1-based).
    #[arg(long, default_value_t = 1)]
    chapter: u32,
    /// Chapter title.
    #[arg(long, default_value = "The Storm")]
    title: String,
    /// One-line chapter summary.
    #[arg(long, default_value = "")]
    summary: String,
    /// Replay the built-in chapter instead of calling the backend.
    #[arg(long)]
    offline: bool,
    /// Override the reveal tick in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Override the characters revealed per tick.
    #[arg(long)]
    chars_per_tick: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_observability();
    let args = Args::parse();

    let transport: Arc<dyn GenerationTransport> = if args.offline {
        Arc::new(ScriptedTransport::chapter(SAMPLE_CHAPTER, 12).delay(Duration::from_millis(40)))
    } else {
        Arc::new(HttpTransport::from_env()?)
    };

    let mut pacer_config = PacerConfig::from_env()?;
    if let Some(ms) = args.tick_ms {
        pacer_config = pacer_config.tick(Duration::from_millis(ms));
    }
    if let Some(chars) = args.chars_per_tick {
        pacer_config = pacer_config.chars_per_tick(chars);
    }

    let controller = GenerationController::with_options(transport, ControllerOptions::from_env()?);
    let pacer = Pacer::spawn(controller.subscribe(), pacer_config)?;

    let request = GenerateChapterRequest::new(
        args.project,
        ChapterOutline::new(args.chapter, args.title).summary(args.summary),
    );

    let printer = tokio::spawn(print_reveal(pacer.subscribe()));

    let session = controller.clone();
    let mut generation = tokio::spawn(async move { session.start(request).await });
    let outcome = tokio::select! {
        joined = &mut generation => joined??,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, cancelling generation");
            controller.cancel();
            generation.await??
        }
    };
    printer.await?;

    let view = GenerationView::compose(&controller.state(), &pacer.state());
    println!();
    match outcome {
        SessionOutcome::Completed { chapter } => info!(
            title = %chapter.title,
            word_count = chapter.word_count,
            badge = view.badge.label(),
            "chapter ready"
        ),
        SessionOutcome::Failed { message } => {
            eprintln!("generation failed: {message}");
        }
        SessionOutcome::Cancelled => eprintln!("generation {}", view.badge.label()),
    }
    Ok(())
}

/// Prints newly revealed text until the reveal has caught up with a
/// finished session.
async fn print_reveal(mut rx: tokio::sync::watch::Receiver<PacerState>) {
    let mut printed = 0;
    loop {
        let (chunk, done) = {
            let state = rx.borrow_and_update();
            let text = state.revealed_text();
            let chunk = text.get(printed..).unwrap_or_default().to_string();
            printed = text.len();
            (chunk, !state.is_active() && !state.session_id().is_nil())
        };
        if !chunk.is_empty() {
            print!("{chunk}");
            let _ = std::io::stdout().flush();
        }
        if done || rx.changed().await.is_err() {
            break;
        }
    }
}
