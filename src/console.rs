//! Terminal collaborators: line-based selection input, failure output, and a
//! periodic progress line.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tk_core::{CodecType, FailureNotifier, ProgressSnapshot, TaskId, UserId};
use tk_pipeline::report::{readable_duration, readable_size};
use tk_pipeline::TaskStatusRegistry;
use tk_select::{InputListener, SelectionMenu, UserAction};

const HELP: &str = "toggle: <index> | v a s (all video/audio/subs) | r reverse | reset | done | cancel";

type Input = Box<dyn AsyncRead + Send + Unpin>;

/// Reads one action per line from a terminal-like source.
///
/// The source is handed to the first session; there is one per process.
pub struct ConsoleListener {
    input: Mutex<Option<Input>>,
    readers: Mutex<HashMap<TaskId, JoinHandle<()>>>,
}

impl ConsoleListener {
    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(reader))),
            readers: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl InputListener for ConsoleListener {
    fn register(&self, task: TaskId, user: UserId) -> mpsc::Receiver<UserAction> {
        let (tx, rx) = mpsc::channel(16);
        match self.input.lock().take() {
            Some(input) => {
                tracing::debug!(task_id = %task, user = %user, "reading selection from console");
                let handle = tokio::spawn(read_actions(input, tx));
                self.readers.lock().insert(task, handle);
            }
            // Dropping `tx` closes the session right away.
            None => tracing::warn!(task_id = %task, "console input already consumed"),
        }
        rx
    }

    fn deregister(&self, task: TaskId) {
        if let Some(handle) = self.readers.lock().remove(&task) {
            handle.abort();
        }
    }

    async fn render(&self, _task: TaskId, menu: &SelectionMenu) {
        println!("\n{menu}\n{HELP}");
    }
}

async fn read_actions(input: Input, tx: mpsc::Sender<UserAction>) {
    let mut lines = BufReader::new(input).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "console input failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_action(&line) {
            Some(action) => {
                if tx.send(action).await.is_err() {
                    break;
                }
            }
            None => println!("unrecognised input '{}'\n{HELP}", line.trim()),
        }
    }
}

/// Map one line of console input to an action.
pub fn parse_action(line: &str) -> Option<UserAction> {
    let word = line.trim().to_lowercase();
    if let Ok(index) = word.parse::<u32>() {
        return Some(UserAction::ToggleStream(index));
    }
    let action = match word.as_str() {
        "v" | "video" => UserAction::ToggleKind(CodecType::Video),
        "a" | "audio" => UserAction::ToggleKind(CodecType::Audio),
        "s" | "sub" | "subs" | "subtitle" => UserAction::ToggleKind(CodecType::Subtitle),
        "r" | "reverse" => UserAction::Reverse,
        "reset" => UserAction::Reset,
        "d" | "done" | "ok" => UserAction::Confirm,
        "q" | "cancel" => UserAction::Cancel,
        _ => return None,
    };
    Some(action)
}

/// Prints the failure line of a task to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl FailureNotifier for ConsoleNotifier {
    async fn report_failure(&self, task_id: TaskId, message: &str) {
        tracing::debug!(task_id = %task_id, "reporting failure");
        eprintln!("✗ {message}");
    }
}

/// Print every registered task's progress each `every` until `stop` fires.
pub async fn print_progress(
    status: Arc<TaskStatusRegistry>,
    every: Duration,
    stop: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for (_, snapshot) in status.snapshot_all() {
                    eprintln!("{}", format_progress(&snapshot));
                }
            }
            _ = stop.cancelled() => break,
        }
    }
}

/// `42.0% | 1.00 GiB of 2.38 GiB | 95.37 MiB/s | ETA 15s`
pub fn format_progress(snapshot: &ProgressSnapshot) -> String {
    let eta = snapshot
        .eta
        .map(readable_duration)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:.1}% | {} of {} | {}/s | ETA {eta}",
        snapshot.percent,
        readable_size(snapshot.processed_bytes),
        readable_size(snapshot.total_bytes),
        readable_size(snapshot.speed_bytes_per_sec as u64),
    )
}
