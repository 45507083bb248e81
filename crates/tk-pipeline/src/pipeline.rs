//! One file, start to finish: probe, select, plan, remux.
//!
//! Every failure reaches the [`FailureNotifier`] exactly once. Failures
//! before the remux starts are reported here; the [`TranscodeExecutor`]
//! reports its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use tk_av::{
    output_path_for, ExecutionContext, PlanBuilder, ToolRegistry, TranscodeExecutor,
    TranscodePlan,
};
use tk_core::config::{default_preferred_languages, Config, TranscodeConfig};
use tk_core::{
    Container, ExecutionError, FailureNotifier, LanguageCode, Result, StatusRegistry, TaskId,
};
use tk_probe::{MediaInfo, Prober};
use tk_select::{
    canonical_preferences, configured_preferences, InteractiveSelectionController,
    SelectionDecision, SelectionStrategy,
};

use crate::report;

/// A unit of work owned by the caller.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub strategy: SelectionStrategy,
    /// Cancelling stops the task at whatever stage it is in.
    pub cancellation: CancellationToken,
}

impl Task {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self {
            id: TaskId::new(),
            strategy,
            cancellation: CancellationToken::new(),
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Result of a successful [`Pipeline::process`].
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub task_id: TaskId,
    pub output: PathBuf,
    pub decision: SelectionDecision,
    /// Completion message, see [`report::completion_message`].
    pub summary: String,
}

/// Orchestrates the stages for one source at a time per task.
pub struct Pipeline {
    prober: Arc<dyn Prober>,
    executor: TranscodeExecutor,
    controller: Option<Arc<InteractiveSelectionController>>,
    status: Arc<dyn StatusRegistry>,
    notifier: Arc<dyn FailureNotifier>,
    preferred: Vec<LanguageCode>,
    transcode: TranscodeConfig,
}

impl Pipeline {
    pub fn new(
        prober: Arc<dyn Prober>,
        executor: TranscodeExecutor,
        status: Arc<dyn StatusRegistry>,
        notifier: Arc<dyn FailureNotifier>,
    ) -> Self {
        Self {
            prober,
            executor,
            controller: None,
            status,
            notifier,
            preferred: canonical_preferences(default_preferred_languages()),
            transcode: TranscodeConfig::default(),
        }
    }

    /// Wire a pipeline from configuration and discovered tools.
    ///
    /// # Errors
    ///
    /// [`tk_core::Error::Tool`] when ffmpeg or ffprobe was not found.
    pub fn from_config(
        config: &Config,
        tools: &ToolRegistry,
        status: Arc<dyn StatusRegistry>,
        notifier: Arc<dyn FailureNotifier>,
    ) -> Result<Self> {
        let prober = tk_av::FfprobeProber::from_registry(tools)?;
        let executor = TranscodeExecutor::from_registry(tools)?;
        Ok(Self::new(Arc::new(prober), executor, status, notifier)
            .with_preferred_languages(configured_preferences(&config.selection))
            .with_transcode(config.transcode.clone()))
    }

    /// Builder: priority order for the kept audio language.
    pub fn with_preferred_languages(mut self, preferred: Vec<LanguageCode>) -> Self {
        self.preferred = preferred;
        self
    }

    /// Builder: input source for manual selection.
    pub fn with_controller(mut self, controller: Arc<InteractiveSelectionController>) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Builder: remux limits and output naming.
    pub fn with_transcode(mut self, transcode: TranscodeConfig) -> Self {
        self.transcode = transcode;
        self
    }

    pub fn preferred_languages(&self) -> &[LanguageCode] {
        &self.preferred
    }

    /// Run `task` on `source`.
    ///
    /// # Errors
    ///
    /// Any probe, selection, controller, plan, or execution failure. The
    /// notifier has already been told by the time this returns.
    pub async fn process(&self, task: &Task, source: &Path) -> Result<ProcessOutcome> {
        let started = Instant::now();
        tracing::info!(
            task_id = %task.id,
            source = %source.display(),
            mode = %task.strategy,
            "processing"
        );

        let (media, decision, plan) = match self.prepare(task, source).await {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "task stopped before remux");
                self.notifier
                    .report_failure(task.id, &err.user_message())
                    .await;
                return Err(err);
            }
        };

        let ctx = ExecutionContext::new(task.id, self.status.clone(), self.notifier.clone())
            .with_cancellation(task.cancellation.clone())
            .with_timeout(self.transcode.timeout())
            .with_remove_partial_output(self.transcode.remove_partial_output);
        let output = self.executor.execute(&plan, &ctx).await?;

        let output_bytes = tokio::fs::metadata(&output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let summary = report::completion_message(
            &output_name,
            output_bytes,
            started.elapsed(),
            &media,
            &decision,
        );

        Ok(ProcessOutcome {
            task_id: task.id,
            output,
            decision,
            summary,
        })
    }

    /// Probe, decide, and plan. Stops early when the task is cancelled.
    async fn prepare(
        &self,
        task: &Task,
        source: &Path,
    ) -> Result<(MediaInfo, SelectionDecision, TranscodePlan)> {
        if task.cancellation.is_cancelled() {
            return Err(ExecutionError::Cancelled.into());
        }

        let target = source.to_string_lossy();
        let media = tokio::select! {
            probed = self.prober.probe(&target) => probed?,
            _ = task.cancellation.cancelled() => return Err(ExecutionError::Cancelled.into()),
        };

        let proposed = task.strategy.select(&media, &self.preferred)?;
        tracing::debug!(
            task_id = %task.id,
            kept = ?proposed.kept(),
            removed = ?proposed.removed(),
            "proposed selection"
        );

        let decision = tokio::select! {
            confirmed = task.strategy.confirm(
                self.controller.as_deref(),
                task.id,
                &media,
                proposed,
            ) => confirmed?,
            _ = task.cancellation.cancelled() => return Err(ExecutionError::Cancelled.into()),
        };

        let output = output_path_for(source, &self.transcode.output_suffix, Container::default());
        let plan = PlanBuilder::new(&media).build(&decision, source, output)?;
        Ok((media, decision, plan))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("prober", &self.prober.name())
            .field("executor", &self.executor)
            .field("interactive", &self.controller.is_some())
            .field("preferred", &self.preferred)
            .finish_non_exhaustive()
    }
}
