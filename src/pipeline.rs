//! Verification pipeline orchestration
//!
//! Drives one document through the fixed stage ladder: preprocess, then
//! signature and structure concurrently, then the routing decision, then
//! the visual stage (or a recorded skip), then text, then the sealed
//! verdict. The ladder only moves forward; a stage that fails or times
//! out is recorded on its [`StageResult`] and the run continues. Only
//! ingestion failures and artifact-store violations abort a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analyzer::signature::SignatureValidator;
use crate::analyzer::text::LanguageDetector;
use crate::analyzer::visual::{CopyMoveDetector, OcrEngine, PrnuAnalyzer};
use crate::analyzer::{
    Analyzer, AnalyzerError, SignatureAnalyzer, StructureAnalyzer, TextAnalyzer, VisualAnalyzer,
};
use crate::artifact::{keys, ArtifactRecord, ArtifactStore, ArtifactValue};
use crate::config::VerifierConfig;
use crate::error::{Error, Result};
use crate::preprocess::{PageRenderer, PreprocessSummary, Preprocessor};
use crate::router::{RouteDecision, Router};
use crate::types::{Document, Layer, StageError, StageResult};
use crate::verdict::Verdict;

/// Cooperative cancellation shared between the pipeline and its caller.
/// Checked at stage boundaries only; a stage that already started runs to
/// its own timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sealed record of one verification run. Everything the report needs,
/// in the order it happened.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub document_hash: String,
    pub preprocess: PreprocessSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RouteDecision>,
    pub stages: Vec<StageResult>,
    pub verdict: Verdict,
    pub artifacts: Vec<ArtifactRecord>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl PipelineRun {
    pub fn stage(&self, layer: Layer) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.layer == layer)
    }
}

/// Document verification pipeline that runs every analysis layer and
/// reduces the results to one verdict per document.
pub struct Pipeline {
    config: VerifierConfig,
    preprocessor: Preprocessor,
    router: Router,
    signature: SignatureAnalyzer,
    structure: StructureAnalyzer,
    visual: VisualAnalyzer,
    text: TextAnalyzer,
    cancel: CancelFlag,
}

impl Pipeline {
    /// Creates a pipeline over a validated configuration.
    pub fn new(config: VerifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor: Preprocessor::new(&config),
            router: Router::new(config.assume_raster),
            signature: SignatureAnalyzer::new(),
            structure: StructureAnalyzer::new(&config.structure),
            visual: VisualAnalyzer::new(&config.visual),
            text: TextAnalyzer::new(&config.text, &config.lexicon),
            cancel: CancelFlag::new(),
            config,
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.preprocessor = self.preprocessor.with_renderer(renderer);
        self
    }

    pub fn with_signature_validator(mut self, validator: Arc<dyn SignatureValidator>) -> Self {
        self.signature = SignatureAnalyzer::with_validator(validator);
        self
    }

    pub fn with_copy_move_detector(mut self, detector: Arc<dyn CopyMoveDetector>) -> Self {
        self.visual = self.visual.with_copy_move(detector);
        self
    }

    pub fn with_prnu_analyzer(mut self, prnu: Arc<dyn PrnuAnalyzer>) -> Self {
        self.visual = self.visual.with_prnu(prnu);
        self
    }

    pub fn with_ocr_engine(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.visual = self.visual.with_ocr(ocr);
        self
    }

    pub fn with_language_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.text = self.text.with_language_detector(detector);
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Handle for cancelling this pipeline from another task.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Executes the complete verification ladder over one document.
    #[instrument(skip_all, fields(sha256 = %doc.sha256()))]
    pub async fn run(&self, doc: &Document) -> Result<PipelineRun> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let store = ArtifactStore::new();

        info!(
            kind = %doc.kind(),
            bytes = doc.len(),
            "🚦 Starting verification run {run_id}"
        );

        let pre = self.preprocessor.run(doc).await;
        for (key, value) in pre.artifacts {
            store.put(&key, value)?;
        }

        let mut stages: Vec<StageResult> = Vec::new();
        let mut routing = None;
        let cancelled = self.drive(doc, &store, &mut stages, &mut routing).await?;
        if cancelled {
            warn!("run cancelled; sealing a partial verdict");
            for layer in Layer::ALL {
                if !stages.iter().any(|s| s.layer == layer) {
                    stages.push(StageResult::skipped(layer));
                }
            }
        }

        let verdict = self.config.policy.evaluate(&stages);
        let duration = started.elapsed();
        info!(
            outcome = ?verdict.overall,
            reasons = verdict.reasons.len(),
            ms = duration.as_millis() as u64,
            "🏁 Verdict sealed"
        );

        Ok(PipelineRun {
            run_id,
            document_hash: doc.sha256().to_string(),
            preprocess: pre.summary,
            routing,
            stages,
            verdict,
            artifacts: store.records(),
            cancelled,
            duration_ms: duration.as_millis() as u64,
        })
    }

    /// Runs the analyzer stages in ladder order. Returns true when the
    /// cancellation flag cut the run short.
    async fn drive(
        &self,
        doc: &Document,
        store: &ArtifactStore,
        stages: &mut Vec<StageResult>,
        routing: &mut Option<RouteDecision>,
    ) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Ok(true);
        }

        info!("🔏 Stage 1+2: Signature and structure analysis");
        // The two stages share no artifacts, so they run concurrently.
        // Results are recorded in fixed order either way.
        let (sig, structural) = futures::join!(
            self.run_stage(&self.signature, doc, store),
            self.run_stage(&self.structure, doc, store)
        );
        stages.push(sig?);
        stages.push(structural?);

        if self.cancel.is_cancelled() {
            return Ok(true);
        }

        let route = self.decide_route(store, stages)?;
        let run_visual = route.run_visual;
        *routing = Some(route);

        if run_visual {
            info!("🖼️ Stage 3: Visual analysis");
            let visual = self.run_stage(&self.visual, doc, store).await?;
            stages.push(visual);
        } else {
            info!("⏭️ Stage 3: Visual analysis skipped on the text route");
            stages.push(StageResult::skipped(Layer::Visual));
        }

        if self.cancel.is_cancelled() {
            return Ok(true);
        }

        info!("📝 Stage 4: Text analysis");
        let text = self.run_stage(&self.text, doc, store).await?;
        stages.push(text);
        Ok(false)
    }

    /// Routes the content stages and records the decision as an artifact
    /// so the text stage and the report can consult it.
    fn decide_route(&self, store: &ArtifactStore, stages: &[StageResult]) -> Result<RouteDecision> {
        let stats = store
            .get(keys::PAGE_STATS)
            .and_then(|value| value.as_page_stats().cloned())
            .ok_or_else(|| {
                Error::PipelineError("page_stats artifact missing after preprocess".into())
            })?;
        let structure = stages
            .iter()
            .find(|s| s.layer == Layer::Structure)
            .ok_or_else(|| Error::PipelineError("structure stage missing before routing".into()))?;

        let route = self.router.decide(&stats, structure);
        store.put(keys::ROUTING, ArtifactValue::Route(route.clone()))?;
        Ok(route)
    }

    /// Runs one analyzer under the per-stage timeout. Analyzer failures
    /// and timeouts become failed stage records; only store violations
    /// propagate as errors.
    async fn run_stage(
        &self,
        analyzer: &dyn Analyzer,
        doc: &Document,
        store: &ArtifactStore,
    ) -> Result<StageResult> {
        let layer = analyzer.layer();
        let started = Instant::now();

        for key in analyzer.required_artifacts() {
            if !store.has(key) {
                warn!(%layer, key, "missing dependency; stage not invoked");
                return Ok(StageResult::failed(
                    layer,
                    StageError::MissingDependency {
                        key: (*key).to_string(),
                    },
                    started.elapsed(),
                ));
            }
        }

        let outcome = timeout(self.config.stage_timeout(), analyzer.run(doc, store.view())).await;
        let duration = started.elapsed();

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(%layer, error = %err, "stage failed");
                return Ok(StageResult::failed(layer, stage_error(err), duration));
            }
            Err(_) => {
                warn!(
                    %layer,
                    limit_ms = self.config.stage_timeout_ms,
                    "stage exceeded its time budget"
                );
                return Ok(StageResult::failed(
                    layer,
                    StageError::Timeout {
                        limit_ms: self.config.stage_timeout_ms,
                    },
                    duration,
                ));
            }
        };

        for (key, value) in output.artifacts {
            store.put(&key, value)?;
        }
        info!(
            %layer,
            findings = output.findings.len(),
            ms = duration.as_millis() as u64,
            "stage completed"
        );
        Ok(StageResult::completed(layer, output.findings, duration))
    }
}

fn stage_error(err: AnalyzerError) -> StageError {
    match err {
        AnalyzerError::MissingArtifact { key } => StageError::MissingDependency { key },
        other => StageError::Analyzer {
            message: other.to_string(),
        },
    }
}
