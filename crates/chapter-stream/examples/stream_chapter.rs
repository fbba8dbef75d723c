use std::sync::Arc;
use std::time::Duration;

use chapter_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), GenerationError> {
    let transport = ScriptedTransport::chapter("Sand hissed against the tent walls all night.", 8)
        .delay(Duration::from_millis(50));
    let controller = GenerationController::new(Arc::new(transport));
    let pacer = Pacer::spawn(
        controller.subscribe(),
        PacerConfig::default().chars_per_tick(2),
    )?;

    let request = GenerateChapterRequest::new("demo", ChapterOutline::new(3, "Night Watch"));
    let outcome = controller.start(request).await?;

    let view = GenerationView::compose(&controller.state(), &pacer.state());
    println!("[{}] {}", view.badge.label(), view.text);
    if let SessionOutcome::Completed { chapter } = outcome {
        println!("{} ({} chars)", chapter.title, chapter.word_count);
    }
    Ok(())
}
