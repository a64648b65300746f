//! Pipeline stages and progress event emission.
//!
//! Each request owns one [`ProgressEmitter`]. Streaming endpoints back it
//! with a bounded mpsc channel whose receiver feeds the SSE transport;
//! non-streaming endpoints use the disabled variant and the same
//! pipeline code path emits nothing. Events are sent the moment a stage
//! completes, never batched. A closed channel (the client went away)
//! aborts the request at the next emission point.

use tokio::sync::mpsc;

use crate::error::{PipelineError, Result};
use crate::pipeline::{RagOutcome, SearchOutcome};

/// Which request flow a pipeline execution belongs to.
///
/// The two flows share stages but report different labels and progress
/// percentages, matching what the client renders for each mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Ranked document search.
    Search,
    /// Retrieval-augmented question answering.
    RagQa,
}

/// A pipeline stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Language detection ran.
    Detect,
    /// Translation is about to invoke the provider.
    TranslateStarted,
    /// Translation finished.
    TranslateCompleted,
    /// Translation was skipped (query already in English).
    TranslateSkipped,
    /// Query expansion ran (RAG flow only).
    Expand,
    /// The query embedding was generated.
    Embed,
    /// The similarity index was searched.
    Search,
    /// Article metadata was retrieved.
    Retrieve,
    /// The generation context was assembled (RAG flow only).
    Context,
    /// The answer was generated (RAG flow only).
    Generate,
    /// All stages finished; the terminal payload follows.
    Complete,
}

/// Extra detail attached to translation stage events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationDetail {
    /// The untranslated query, sent when translation starts.
    Original(String),
    /// The translated query, sent when translation completes.
    Translated(String),
}

/// One progress notification, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    /// The stage that completed (or, for translation, started).
    pub stage: Stage,
    /// Human-readable label for the client's progress display.
    pub label: &'static str,
    /// Percent complete, monotonically non-decreasing per request.
    pub progress: u8,
    /// Translation detail, present only on translation stages.
    pub translation: Option<TranslationDetail>,
}

/// Everything a streaming consumer can receive from one request.
///
/// A stream is zero or more `Stage` events followed by exactly one
/// terminal variant, after which the channel closes.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A stage transition.
    Stage(StageEvent),
    /// Terminal success payload for the search flow.
    SearchComplete(SearchOutcome),
    /// Terminal success payload for the RAG flow.
    RagComplete(RagOutcome),
    /// Terminal failure; the message is safe to show the client.
    Failed {
        /// User-visible error description.
        message: String,
    },
}

impl PipelineEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Stage(_))
    }
}

fn label_and_progress(flow: Flow, stage: Stage) -> (&'static str, u8) {
    match (flow, stage) {
        (Flow::Search, Stage::Detect) => ("Detecting non-English characters in query...", 10),
        (Flow::Search, Stage::TranslateStarted) => ("Translating query to English...", 20),
        (Flow::Search, Stage::TranslateCompleted) => ("Translation completed", 25),
        (Flow::Search, Stage::TranslateSkipped) => {
            ("Query is in English, skipping translation", 25)
        }
        (Flow::Search, Stage::Embed) => ("Generating query embedding...", 40),
        (Flow::Search, Stage::Search) => ("Searching in vector database...", 60),
        (Flow::Search, Stage::Retrieve) => ("Retrieving article details...", 80),
        (Flow::Search, Stage::Complete) => ("Search completed!", 100),
        // Expand/Context/Generate do not occur in the search flow.
        (Flow::Search, Stage::Expand | Stage::Context | Stage::Generate) => {
            unreachable!("stage not part of the search flow")
        }
        (Flow::RagQa, Stage::Detect) => {
            ("Detecting non-English characters in question...", 10)
        }
        (Flow::RagQa, Stage::TranslateStarted) => ("Translating question to English...", 20),
        (Flow::RagQa, Stage::TranslateCompleted) => ("Translation completed", 25),
        (Flow::RagQa, Stage::TranslateSkipped) => {
            ("Question is in English, skipping translation", 25)
        }
        (Flow::RagQa, Stage::Expand) => ("Expanding query for better search...", 30),
        (Flow::RagQa, Stage::Embed) => ("Generating query embeddings...", 40),
        (Flow::RagQa, Stage::Search) => ("Searching for relevant articles...", 50),
        (Flow::RagQa, Stage::Retrieve) => ("Retrieving article details...", 70),
        (Flow::RagQa, Stage::Context) => ("Building context from articles...", 80),
        (Flow::RagQa, Stage::Generate) => ("Generating AI answer...", 90),
        (Flow::RagQa, Stage::Complete) => ("RAG analysis completed!", 100),
    }
}

/// Sequences and delivers progress events for one request.
///
/// The emitter guarantees the monotonic-progress invariant and turns a
/// closed channel into [`PipelineError::ClientGone`] so the pipeline
/// stops scheduling work for a client that is no longer listening.
pub struct ProgressEmitter {
    tx: Option<mpsc::Sender<PipelineEvent>>,
    flow: Flow,
    last_progress: u8,
}

impl ProgressEmitter {
    /// An emitter that delivers events into the given channel.
    pub fn streaming(flow: Flow, tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx), flow, last_progress: 0 }
    }

    /// An emitter that discards events (non-streaming endpoints).
    pub fn disabled(flow: Flow) -> Self {
        Self { tx: None, flow, last_progress: 0 }
    }

    /// The flow this emitter reports for.
    pub fn flow(&self) -> Flow {
        self.flow
    }

    /// Emit a stage transition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ClientGone`] when the consumer has
    /// dropped the receiving end.
    pub async fn stage(&mut self, stage: Stage) -> Result<()> {
        self.emit(stage, None).await
    }

    /// Emit a translation stage transition with its detail.
    pub async fn translation_stage(
        &mut self,
        stage: Stage,
        detail: TranslationDetail,
    ) -> Result<()> {
        self.emit(stage, Some(detail)).await
    }

    async fn emit(&mut self, stage: Stage, translation: Option<TranslationDetail>) -> Result<()> {
        let (label, progress) = label_and_progress(self.flow, stage);
        debug_assert!(progress >= self.last_progress, "stage progress must not decrease");
        let progress = progress.max(self.last_progress);
        self.last_progress = progress;

        let Some(tx) = &self.tx else { return Ok(()) };
        tx.send(PipelineEvent::Stage(StageEvent { stage, label, progress, translation }))
            .await
            .map_err(|_| PipelineError::ClientGone)
    }

    /// Deliver the terminal event, closing out the stream.
    ///
    /// Send failure is ignored: a client that disconnected before the
    /// terminal event simply never sees it.
    pub async fn finish(&self, event: PipelineEvent) {
        debug_assert!(event.is_terminal());
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}
