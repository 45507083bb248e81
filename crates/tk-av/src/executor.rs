//! Runs a [`TranscodePlan`] as a child process.
//!
//! While the child runs, two readers work alongside it: one parses ffmpeg's
//! `-progress` key/value stream from stdout into the task's
//! [`ProgressState`], the other drains stderr into the log and keeps its last
//! lines for the failure message. Both readers hang off a child
//! [`CancellationToken`] and are always stopped before `execute` returns.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use tk_core::{ExecutionError, FailureNotifier, ProgressState, StatusRegistry, TaskId};

use crate::command::{program_name, ToolCommand};
use crate::plan::TranscodePlan;
use crate::tools::ToolRegistry;

/// Diagnostic lines kept for the failure message.
const DIAGNOSTIC_TAIL: usize = 20;

/// How long readers may keep draining after a normal exit.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Default bound on one remux run: 24 hours.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Everything a run needs from its owner.
pub struct ExecutionContext {
    pub task_id: TaskId,
    /// Receives the live progress for the duration of the run.
    pub status: Arc<dyn StatusRegistry>,
    /// Receives exactly one message if the run fails.
    pub notifier: Arc<dyn FailureNotifier>,
    /// Cancelling this token kills the child.
    pub cancellation: CancellationToken,
    /// Upper bound on the run; the child is killed when it elapses.
    pub timeout: Duration,
    /// Delete the output file when the run does not succeed.
    pub remove_partial_output: bool,
}

impl ExecutionContext {
    /// Create a context with the minimum required fields.
    pub fn new(
        task_id: TaskId,
        status: Arc<dyn StatusRegistry>,
        notifier: Arc<dyn FailureNotifier>,
    ) -> Self {
        Self {
            task_id,
            status,
            notifier,
            cancellation: CancellationToken::new(),
            timeout: DEFAULT_TIMEOUT,
            remove_partial_output: true,
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: bound the run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: keep or delete partial output on failure.
    pub fn with_remove_partial_output(mut self, remove: bool) -> Self {
        self.remove_partial_output = remove;
        self
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("task_id", &self.task_id)
            .field("timeout", &self.timeout)
            .field("remove_partial_output", &self.remove_partial_output)
            .finish_non_exhaustive()
    }
}

/// How the child stopped.
enum Exit {
    Status(std::process::ExitStatus),
    WaitFailed(std::io::Error),
    Cancelled,
    TimedOut,
}

/// Runs remux plans with ffmpeg.
#[derive(Debug, Clone)]
pub struct TranscodeExecutor {
    ffmpeg_path: PathBuf,
}

impl TranscodeExecutor {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    /// Create an executor from the registry's ffmpeg.
    pub fn from_registry(tools: &ToolRegistry) -> tk_core::Result<Self> {
        Ok(Self::new(tools.require("ffmpeg")?.path.clone()))
    }

    /// Run `plan` to completion, cancellation, or timeout.
    ///
    /// The progress state is registered under `ctx.task_id` for the whole run.
    /// On failure the notifier is invoked exactly once and, unless disabled,
    /// the partial output is deleted.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::ToolExitNonZero`] if ffmpeg exits unsuccessfully.
    /// - [`ExecutionError::Cancelled`] if `ctx.cancellation` fires first.
    /// - [`ExecutionError::TimedOut`] if `ctx.timeout` elapses first.
    /// - [`ExecutionError::Spawn`] if ffmpeg cannot be started or awaited.
    pub async fn execute(
        &self,
        plan: &TranscodePlan,
        ctx: &ExecutionContext,
    ) -> Result<PathBuf, ExecutionError> {
        let total_bytes = source_bytes(plan).await;
        let progress = Arc::new(ProgressState::new(total_bytes, plan.duration_secs()));

        let registration = Registration::new(ctx, progress.clone());
        let result = self.run(plan, ctx, &progress).await;
        drop(registration);

        match result {
            Ok(()) => {
                tracing::info!(
                    task_id = %ctx.task_id,
                    output = %plan.output().display(),
                    "remux complete"
                );
                Ok(plan.output().to_path_buf())
            }
            Err(err) => {
                tracing::warn!(task_id = %ctx.task_id, error = %err, "remux failed");
                if ctx.remove_partial_output {
                    remove_partial(plan).await;
                }
                ctx.notifier
                    .report_failure(ctx.task_id, &err.user_message())
                    .await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        plan: &TranscodePlan,
        ctx: &ExecutionContext,
        progress: &Arc<ProgressState>,
    ) -> Result<(), ExecutionError> {
        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.args(plan.to_args());

        tracing::info!(
            task_id = %ctx.task_id,
            source = %plan.source().display(),
            streams = plan.mappings().len(),
            "starting remux"
        );
        tracing::debug!(task_id = %ctx.task_id, args = ?cmd.get_args(), "ffmpeg arguments");

        let mut child = cmd.spawn().map_err(|e| {
            ExecutionError::Spawn(format!("{}: {e}", program_name(&self.ffmpeg_path)))
        })?;

        let readers = ctx.cancellation.child_token();
        let progress_reader = child.stdout.take().map(|stdout| {
            tokio::spawn(read_progress(stdout, progress.clone(), readers.clone()))
        });
        let diagnostic_reader = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(read_diagnostics(stderr, ctx.task_id, readers.clone())));

        let exit = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Exit::Status(status),
                Err(e) => Exit::WaitFailed(e),
            },
            _ = ctx.cancellation.cancelled() => Exit::Cancelled,
            _ = tokio::time::sleep(ctx.timeout) => Exit::TimedOut,
        };

        if matches!(exit, Exit::Cancelled | Exit::TimedOut | Exit::WaitFailed(_)) {
            if let Err(e) = child.kill().await {
                tracing::warn!(task_id = %ctx.task_id, error = %e, "failed to kill ffmpeg");
            }
            readers.cancel();
        }

        let joined = async move {
            if let Some(reader) = progress_reader {
                let _ = reader.await;
            }
            match diagnostic_reader {
                Some(reader) => reader.await.unwrap_or_default(),
                None => String::new(),
            }
        };
        tokio::pin!(joined);
        let diagnostics = match tokio::time::timeout(READER_GRACE, &mut joined).await {
            Ok(tail) => tail,
            Err(_) => {
                tracing::debug!(task_id = %ctx.task_id, "output pipes still open; stopping readers");
                readers.cancel();
                joined.await
            }
        };

        match exit {
            Exit::Status(status) if status.success() => Ok(()),
            Exit::Status(status) => Err(ExecutionError::ToolExitNonZero {
                code: status.code(),
                diagnostics,
            }),
            Exit::WaitFailed(e) => Err(ExecutionError::Spawn(format!(
                "waiting for {}: {e}",
                program_name(&self.ffmpeg_path)
            ))),
            Exit::Cancelled => Err(ExecutionError::Cancelled),
            Exit::TimedOut => Err(ExecutionError::TimedOut(ctx.timeout)),
        }
    }
}

/// Holds a task's progress in the status registry; unregisters on drop,
/// including when the `execute` future is dropped mid-run.
struct Registration<'a> {
    status: &'a dyn StatusRegistry,
    task_id: TaskId,
}

impl<'a> Registration<'a> {
    fn new(ctx: &'a ExecutionContext, progress: Arc<ProgressState>) -> Self {
        ctx.status.register(ctx.task_id, progress);
        Self {
            status: ctx.status.as_ref(),
            task_id: ctx.task_id,
        }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.status.unregister(self.task_id);
    }
}

/// Source size from the filesystem, falling back to the probe's figure.
async fn source_bytes(plan: &TranscodePlan) -> u64 {
    match tokio::fs::metadata(plan.source()).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => plan.source_size().unwrap_or(0),
    }
}

async fn remove_partial(plan: &TranscodePlan) {
    match tokio::fs::remove_file(plan.output()).await {
        Ok(()) => tracing::debug!(output = %plan.output().display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            output = %plan.output().display(),
            error = %e,
            "failed to remove partial output"
        ),
    }
}

/// One parsed line of ffmpeg's `-progress` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressLine {
    /// Media time written so far, in microseconds.
    OutTime(i64),
    /// End of a report block; `true` for the final one.
    BlockEnd(bool),
}

fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Despite its name ffmpeg reports out_time_ms in microseconds as well.
        "out_time_us" | "out_time_ms" => value.trim().parse().ok().map(ProgressLine::OutTime),
        "progress" => Some(ProgressLine::BlockEnd(value.trim() == "end")),
        _ => None,
    }
}

async fn read_progress<R>(stdout: R, progress: Arc<ProgressState>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => match parse_progress_line(&line) {
                Some(ProgressLine::OutTime(us)) => {
                    progress.advance_to_elapsed(us);
                }
                Some(ProgressLine::BlockEnd(end)) => {
                    tracing::trace!(
                        processed = progress.processed_bytes(),
                        total = progress.total_bytes(),
                        end,
                        "progress"
                    );
                }
                None => {}
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "progress stream read error");
                break;
            }
        }
    }
}

async fn read_diagnostics<R>(stderr: R, task_id: TaskId, cancel: CancellationToken) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
    let mut lines = BufReader::new(stderr).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    continue;
                }
                tracing::debug!(task_id = %task_id, "ffmpeg: {line}");
                if tail.len() == DIAGNOSTIC_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(task_id = %task_id, error = %e, "diagnostic stream read error");
                break;
            }
        }
    }
    Vec::from(tail).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_parsing() {
        assert_eq!(
            parse_progress_line("out_time_us=1500000"),
            Some(ProgressLine::OutTime(1_500_000))
        );
        assert_eq!(
            parse_progress_line("out_time_ms=42"),
            Some(ProgressLine::OutTime(42))
        );
        assert_eq!(parse_progress_line("out_time_us=N/A"), None);
        assert_eq!(
            parse_progress_line("progress=continue"),
            Some(ProgressLine::BlockEnd(false))
        );
        assert_eq!(
            parse_progress_line("progress=end\n"),
            Some(ProgressLine::BlockEnd(true))
        );
        assert_eq!(parse_progress_line("out_time=00:00:01.500000"), None);
        assert_eq!(parse_progress_line("garbage"), None);
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        use async_trait::async_trait;
        use parking_lot::Mutex;
        use tk_core::CodecType;
        use tk_probe::{FormatInfo, MediaInfo, StreamDescriptor};
        use tk_select::SelectionDecision;

        use crate::plan::PlanBuilder;

        #[derive(Default)]
        struct RecordingStatus {
            registered: Mutex<Vec<(TaskId, Arc<ProgressState>)>>,
            unregistered: Mutex<Vec<TaskId>>,
        }

        impl StatusRegistry for RecordingStatus {
            fn register(&self, task_id: TaskId, progress: Arc<ProgressState>) {
                self.registered.lock().push((task_id, progress));
            }

            fn unregister(&self, task_id: TaskId) {
                self.unregistered.lock().push(task_id);
            }
        }

        #[derive(Default)]
        struct RecordingNotifier {
            messages: Mutex<Vec<(TaskId, String)>>,
        }

        #[async_trait]
        impl FailureNotifier for RecordingNotifier {
            async fn report_failure(&self, task_id: TaskId, message: &str) {
                self.messages.lock().push((task_id, message.to_string()));
            }
        }

        struct Harness {
            dir: tempfile::TempDir,
            status: Arc<RecordingStatus>,
            notifier: Arc<RecordingNotifier>,
            task: TaskId,
        }

        impl Harness {
            fn new() -> Self {
                let dir = tempfile::tempdir().unwrap();
                std::fs::write(dir.path().join("in.mp4"), vec![0u8; 1000]).unwrap();
                Self {
                    dir,
                    status: Arc::new(RecordingStatus::default()),
                    notifier: Arc::new(RecordingNotifier::default()),
                    task: TaskId::new(),
                }
            }

            fn ffmpeg(&self, body: &str) -> TranscodeExecutor {
                let path = self.dir.path().join("ffmpeg");
                std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
                TranscodeExecutor::new(path)
            }

            fn plan(&self) -> TranscodePlan {
                let media = MediaInfo {
                    format: FormatInfo {
                        duration_secs: Some(10.0),
                        size_bytes: Some(1000),
                    },
                    streams: vec![
                        StreamDescriptor::new(0, CodecType::Video, "h264"),
                        StreamDescriptor::new(1, CodecType::Audio, "aac"),
                    ],
                };
                let decision = SelectionDecision::from_sets([0, 1], [], []).unwrap();
                PlanBuilder::new(&media)
                    .build(&decision, self.dir.path().join("in.mp4"), self.output())
                    .unwrap()
            }

            fn output(&self) -> PathBuf {
                self.dir.path().join("in.processed.mkv")
            }

            fn ctx(&self) -> ExecutionContext {
                ExecutionContext::new(self.task, self.status.clone(), self.notifier.clone())
            }
        }

        /// Writes its last argument, like ffmpeg writing the output file.
        const WRITE_OUTPUT: &str = r#"for last; do :; done
printf 'partial' > "$last""#;

        fn assert_registered_once(h: &Harness) {
            assert_eq!(h.status.registered.lock().len(), 1);
            assert_eq!(*h.status.unregistered.lock(), vec![h.task]);
        }

        #[tokio::test]
        async fn success_returns_output_and_tracks_progress() {
            let h = Harness::new();
            let exec = h.ffmpeg(&format!(
                "{WRITE_OUTPUT}\necho out_time_us=2000000\necho progress=continue\necho out_time_us=5000000\necho progress=end"
            ));

            let out = exec.execute(&h.plan(), &h.ctx()).await.unwrap();
            assert_eq!(out, h.output());
            assert!(out.exists());

            assert_registered_once(&h);
            let progress = h.status.registered.lock()[0].1.clone();
            assert_eq!(progress.total_bytes(), 1000);
            assert_eq!(progress.processed_bytes(), 500);
            assert!(h.notifier.messages.lock().is_empty());
        }

        #[tokio::test]
        async fn non_zero_exit_notifies_once_and_cleans_up() {
            let h = Harness::new();
            let exec = h.ffmpeg(&format!(
                "{WRITE_OUTPUT}\necho 'Stream map 0:7 matches no streams.' >&2\nexit 1"
            ));

            let err = exec.execute(&h.plan(), &h.ctx()).await.unwrap_err();
            match &err {
                ExecutionError::ToolExitNonZero { code, diagnostics } => {
                    assert_eq!(*code, Some(1));
                    assert!(diagnostics.contains("matches no streams"), "{diagnostics}");
                }
                other => panic!("expected ToolExitNonZero, got {other:?}"),
            }

            let messages = h.notifier.messages.lock();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].0, h.task);
            assert!(messages[0].1.starts_with("Processing failed"));
            assert!(!h.output().exists());
            assert_registered_once(&h);
        }

        #[tokio::test]
        async fn diagnostics_keep_only_the_tail() {
            let h = Harness::new();
            let exec = h.ffmpeg("i=0\nwhile [ $i -lt 50 ]; do echo \"line $i\" >&2; i=$((i+1)); done\nexit 2");

            let err = exec.execute(&h.plan(), &h.ctx()).await.unwrap_err();
            let ExecutionError::ToolExitNonZero { diagnostics, .. } = err else {
                panic!("expected ToolExitNonZero");
            };
            let lines: Vec<&str> = diagnostics.lines().collect();
            assert_eq!(lines.len(), DIAGNOSTIC_TAIL);
            assert_eq!(lines[0], "line 30");
            assert_eq!(lines[19], "line 49");
        }

        #[tokio::test]
        async fn partial_output_can_be_kept() {
            let h = Harness::new();
            let exec = h.ffmpeg(&format!("{WRITE_OUTPUT}\nexit 1"));

            let ctx = h.ctx().with_remove_partial_output(false);
            exec.execute(&h.plan(), &ctx).await.unwrap_err();
            assert!(h.output().exists());
        }

        #[tokio::test]
        async fn cancellation_kills_the_child() {
            let h = Harness::new();
            let exec = h.ffmpeg(&format!("{WRITE_OUTPUT}\nexec sleep 30"));
            let token = CancellationToken::new();
            let ctx = h.ctx().with_cancellation(token.clone());

            let canceller = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                token.cancel();
            });

            let started = std::time::Instant::now();
            let err = exec.execute(&h.plan(), &ctx).await.unwrap_err();
            canceller.await.unwrap();

            assert!(matches!(err, ExecutionError::Cancelled));
            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(!h.output().exists(), "cancelled output must not survive");
            assert_eq!(
                *h.notifier.messages.lock(),
                vec![(h.task, "Stopped by user".to_string())]
            );
            assert_registered_once(&h);
        }

        #[tokio::test]
        async fn timeout_kills_the_child() {
            let h = Harness::new();
            let exec = h.ffmpeg("exec sleep 30");
            let ctx = h.ctx().with_timeout(Duration::from_millis(200));

            let started = std::time::Instant::now();
            let err = exec.execute(&h.plan(), &ctx).await.unwrap_err();
            assert!(matches!(err, ExecutionError::TimedOut(d) if d == Duration::from_millis(200)));
            assert!(started.elapsed() < Duration::from_secs(10));
            assert_eq!(h.notifier.messages.lock().len(), 1);
        }

        #[tokio::test]
        async fn dropped_run_unregisters_progress() {
            let h = Harness::new();
            let exec = h.ffmpeg("exec sleep 30");
            let plan = h.plan();
            let ctx = h.ctx();

            let run = exec.execute(&plan, &ctx);
            let started = std::time::Instant::now();
            assert!(tokio::time::timeout(Duration::from_millis(200), run)
                .await
                .is_err());

            assert!(started.elapsed() < Duration::from_secs(10));
            assert_registered_once(&h);
            assert!(h.notifier.messages.lock().is_empty());
        }

        #[tokio::test]
        async fn missing_binary_is_spawn_error() {
            let h = Harness::new();
            let exec = TranscodeExecutor::new(PathBuf::from("/nonexistent/ffmpeg"));

            let err = exec.execute(&h.plan(), &h.ctx()).await.unwrap_err();
            assert!(matches!(err, ExecutionError::Spawn(_)));
            assert_eq!(h.notifier.messages.lock().len(), 1);
            assert_registered_once(&h);
        }

        #[tokio::test]
        async fn unreadable_source_falls_back_to_probe_size() {
            let h = Harness::new();
            std::fs::remove_file(h.dir.path().join("in.mp4")).unwrap();
            let exec = h.ffmpeg(&format!("{WRITE_OUTPUT}\necho out_time_us=10000000"));

            exec.execute(&h.plan(), &h.ctx()).await.unwrap();
            let progress = h.status.registered.lock()[0].1.clone();
            assert_eq!(progress.total_bytes(), 1000);
            assert_eq!(progress.processed_bytes(), 1000);
        }
    }
}
