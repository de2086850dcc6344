//! Run orchestration: plan, dispatch, aggregate, suppress, write.

use super::aggregate::{Detection, RunAttributes, aggregate};
use super::nms::suppress;
use crate::config::{DispatchMode, RunConfig, validate_run_config};
use crate::constants::{DEFAULT_TOP_K, GPU_WORKER_SLOTS, confidence};
use crate::error::{BoxError, Error, Result, WindowStage};
use crate::inference::{InferenceClient, InferenceDevice, Prediction};
use crate::logging::LogContext;
use crate::output::{
    FeatureSink, GeoFeature, abandon_progress, create_window_progress, finish_progress,
    inc_progress,
};
use crate::source::{ImageSource, SourceKind};
use crate::window::{Window, WindowPlanner, region_of_interest};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{Dispatch, debug, info, warn};

/// Lifecycle of a run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Collaborators wired, nothing started.
    Configured,
    /// Building the window plan.
    Planning,
    /// Fetching and classifying windows.
    Dispatching,
    /// Mapping detections to features.
    Aggregating,
    /// Non-maximum suppression.
    Suppressing,
    /// Handing features to the sink.
    Writing,
    /// Finished successfully.
    Done,
    /// Aborted by an error or cancellation.
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configured => "configured",
            Self::Planning => "planning",
            Self::Dispatching => "dispatching",
            Self::Aggregating => "aggregating",
            Self::Suppressing => "suppressing",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Counts reported after a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Windows dispatched.
    pub windows: usize,
    /// Detections above the confidence threshold.
    pub candidates: usize,
    /// Features written after suppression.
    pub features: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Worker pool size for a source and device.
///
/// Tile services are bound by downloads, GPU inference by the utilization
/// budget, CPU inference by the available cores.
pub fn worker_count(
    kind: SourceKind,
    device: InferenceDevice,
    max_utilization: f32,
    max_downloads: usize,
) -> usize {
    match (kind, device) {
        (SourceKind::WebTiled, _) => max_downloads.max(1),
        (SourceKind::Local, InferenceDevice::Gpu) => {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let slots = (max_utilization * GPU_WORKER_SLOTS as f32).ceil() as usize;
            slots.clamp(1, GPU_WORKER_SLOTS)
        }
        (SourceKind::Local, InferenceDevice::Cpu) => {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }
}

/// Drives one run over an image source.
pub struct Orchestrator {
    config: RunConfig,
    source: ImageSource,
    classifier: Box<dyn InferenceClient>,
    dispatch: Dispatch,
    stop: Arc<AtomicBool>,
    state: RunState,
}

impl Orchestrator {
    /// Validate `config` against the source and wire the collaborators.
    ///
    /// All logging of the run goes through `logging`, including from worker
    /// threads.
    pub fn new(
        config: RunConfig,
        source: ImageSource,
        classifier: Box<dyn InferenceClient>,
        logging: &LogContext,
    ) -> Result<Self> {
        validate_run_config(&config, source.kind())?;
        Ok(Self {
            config,
            source,
            classifier,
            dispatch: logging.dispatch().clone(),
            stop: Arc::new(AtomicBool::new(false)),
            state: RunState::Configured,
        })
    }

    /// Flag that stops the run when set. Workers check it between windows.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run and hand the features to `sink`.
    ///
    /// Nothing reaches the sink unless every window was processed.
    pub fn run(&mut self, sink: &mut dyn FeatureSink) -> Result<RunSummary> {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || {
            let result = self.execute(sink);
            match &result {
                Ok(_) => self.transition(RunState::Done),
                Err(e) => {
                    warn!("Run failed: {e}");
                    self.transition(RunState::Failed);
                }
            }
            result
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.stop.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn execute(&mut self, sink: &mut dyn FeatureSink) -> Result<RunSummary> {
        let started = Instant::now();
        let run_attributes = RunAttributes::now(self.config.producer_info);

        self.transition(RunState::Planning);
        let extent = self.source.extent();
        let region = region_of_interest(
            extent,
            self.config.bbox.as_ref(),
            self.source.transform(),
            self.source.spatial_reference(),
        )?;
        let planner = WindowPlanner::new(
            extent,
            region,
            self.config.window_size,
            self.config.step_size,
            self.config.pyramid,
        )?;
        info!(
            "Planned {} windows over {} in {}",
            planner.len(),
            planner.region(),
            self.source.spatial_reference()
        );

        self.transition(RunState::Dispatching);
        let progress = create_window_progress(planner.len(), self.config.progress);
        let detections = match self.dispatch_windows(&planner, progress.as_ref()) {
            Ok(detections) => detections,
            Err(e) => {
                abandon_progress(progress.as_ref());
                return Err(e);
            }
        };
        finish_progress(progress.as_ref(), "windows processed");
        self.check_cancelled()?;

        self.transition(RunState::Aggregating);
        let candidates: Vec<GeoFeature> = detections
            .iter()
            .map(|d| {
                aggregate(
                    d,
                    self.source.transform(),
                    self.config.geometry_type,
                    &run_attributes,
                )
            })
            .collect();
        let candidate_count = candidates.len();

        self.transition(RunState::Suppressing);
        let features = match self.config.nms_overlap {
            Some(threshold) => {
                let kept = suppress(candidates, threshold);
                debug!(
                    "Suppression kept {} of {} candidates (overlap > {threshold})",
                    kept.len(),
                    candidate_count
                );
                kept
            }
            None => candidates,
        };
        self.check_cancelled()?;

        self.transition(RunState::Writing);
        for feature in &features {
            sink.add(&feature.geometry, &feature.attributes)?;
        }
        sink.finalize()?;

        Ok(RunSummary {
            windows: planner.len(),
            candidates: candidate_count,
            features: features.len(),
            elapsed: started.elapsed(),
        })
    }

    fn dispatch_windows(
        &self,
        planner: &WindowPlanner,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Detection>> {
        match self.config.dispatch {
            DispatchMode::Serial => {
                info!("Processing {} windows serially", planner.len());
                self.dispatch_serial(planner, progress)
            }
            DispatchMode::Concurrent => {
                let workers = worker_count(
                    self.source.kind(),
                    self.config.device,
                    self.config.max_utilization,
                    self.config.max_downloads,
                );
                info!(
                    "Processing {} windows on {} workers ({}, {})",
                    planner.len(),
                    workers,
                    self.source.kind(),
                    self.config.device
                );
                self.dispatch_concurrent(planner, workers, progress)
            }
        }
    }

    fn dispatch_serial(
        &self,
        planner: &WindowPlanner,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Detection>> {
        let mut detections = Vec::new();
        for (window, _) in planner {
            self.check_cancelled()?;
            if let Some(detection) = self.process_window(&window)? {
                detections.push(detection);
            }
            inc_progress(progress);
        }
        Ok(detections)
    }

    fn dispatch_concurrent(
        &self,
        planner: &WindowPlanner,
        workers: usize,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Detection>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("window-worker-{i}"))
            .build()
            .map_err(|e| Error::Internal {
                message: format!("failed to start worker pool: {e}"),
            })?;

        let found: Mutex<Vec<(usize, Detection)>> = Mutex::new(Vec::new());
        let failure: Mutex<Option<Error>> = Mutex::new(None);

        pool.install(|| {
            planner
                .iter()
                .enumerate()
                .par_bridge()
                .for_each(|(index, (window, _))| {
                    if self.stop.load(Ordering::SeqCst) {
                        return;
                    }
                    tracing::dispatcher::with_default(&self.dispatch, || {
                        match self.process_window(&window) {
                            Ok(detection) => {
                                if let Some(detection) = detection {
                                    found
                                        .lock()
                                        .unwrap_or_else(PoisonError::into_inner)
                                        .push((index, detection));
                                }
                                inc_progress(progress);
                            }
                            Err(e) => {
                                self.stop.store(true, Ordering::SeqCst);
                                let mut slot =
                                    failure.lock().unwrap_or_else(PoisonError::into_inner);
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                            }
                        }
                    });
                });
        });

        if let Some(e) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(e);
        }
        self.check_cancelled()?;

        // Plan order keeps output identical to serial dispatch.
        let mut found = found.into_inner().unwrap_or_else(PoisonError::into_inner);
        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, detection)| detection).collect())
    }

    /// Fetch, classify and threshold one window.
    fn process_window(&self, window: &Window) -> Result<Option<Detection>> {
        let input = self
            .classifier
            .input_size()
            .unwrap_or(self.config.window_size);
        let pixels = self
            .source
            .fetch(window, input)
            .map_err(|source| Error::WindowIo {
                window: *window,
                stage: WindowStage::Fetch,
                source,
            })?;

        let mut predictions = self
            .classifier
            .predict(&pixels)
            .and_then(check_predictions)
            .map_err(|source| Error::WindowIo {
                window: *window,
                stage: WindowStage::Inference,
                source,
            })?;
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let Some(top) = predictions.first() else {
            return Ok(None);
        };
        if top.confidence < self.config.confidence {
            return Ok(None);
        }
        debug!("Window {}: {} ({:.3})", window, top.label, top.confidence);

        let label = top.label.clone();
        let confidence = top.confidence;
        predictions.truncate(DEFAULT_TOP_K);
        Ok(Some(Detection {
            window: *window,
            label,
            confidence,
            predictions,
        }))
    }
}

fn check_predictions(predictions: Vec<Prediction>) -> std::result::Result<Vec<Prediction>, BoxError> {
    if let Some(bad) = predictions.iter().find(|p| {
        !p.confidence.is_finite() || !(confidence::MIN..=confidence::MAX).contains(&p.confidence)
    }) {
        return Err(format!(
            "confidence {} for '{}' is outside [{}, {}]",
            bad.confidence,
            bad.label,
            confidence::MIN,
            confidence::MAX
        )
        .into());
    }
    Ok(predictions)
}
