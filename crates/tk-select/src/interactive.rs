//! Interactive override of the automatic selection.
//!
//! A session moves through `Idle → AwaitingChoice → Resolved`, or ends in
//! `Cancelled` on an explicit cancel, a closed input source, or the session
//! window running out. The window is fixed when the session starts awaiting;
//! actions never extend it. While awaiting, every accepted [`UserAction`]
//! edits a draft copy of the decision and the menu is re-rendered. The input listener is
//! deregistered exactly once when the session leaves `AwaitingChoice`, on
//! every path, including the session future being dropped.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tk_core::{CodecType, ControllerError, TaskId, UserId};
use tk_probe::MediaInfo;

use crate::decision::SelectionDecision;
use crate::language::resolve_stream;

/// One user input accepted while a session awaits a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Move one stream between kept and removed.
    ToggleStream(u32),
    /// Keep all of a kind, or remove all of it if already all kept.
    ToggleKind(CodecType),
    /// Swap kept and removed.
    Reverse,
    /// Back to the decision the session started from.
    Reset,
    Confirm,
    Cancel,
}

/// Lifecycle of a selection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Idle,
    AwaitingChoice,
    Resolved,
    Cancelled,
}

/// Source of user actions, e.g. a chat bot's button callbacks or a terminal.
///
/// The listener filters events by task and user before they reach the
/// returned channel.
#[async_trait]
pub trait InputListener: Send + Sync {
    /// Start delivering `user`'s actions for `task`.
    fn register(&self, task: TaskId, user: UserId) -> mpsc::Receiver<UserAction>;

    /// Stop delivering actions for `task` and release its resources.
    fn deregister(&self, task: TaskId);

    /// Present the current draft to the user.
    async fn render(&self, task: TaskId, menu: &SelectionMenu);
}

/// Toggleable view of a draft decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionMenu {
    pub entries: Vec<MenuEntry>,
    /// Cover-art streams, shown but not toggleable.
    pub art: Vec<u32>,
    /// Feedback on the last action, if it was rejected.
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuEntry {
    pub index: u32,
    pub codec_type: CodecType,
    pub label: String,
    pub kept: bool,
}

impl SelectionMenu {
    pub fn new(media: &MediaInfo, draft: &SelectionDecision, notice: Option<String>) -> Self {
        let entries = media
            .streams
            .iter()
            .filter(|s| !draft.art().contains(&s.index))
            .map(|s| {
                let mut label = format!("{} {}", s.codec_name, resolve_stream(s));
                if let Some(title) = s.title() {
                    label.push_str(&format!(" ({title})"));
                }
                MenuEntry {
                    index: s.index,
                    codec_type: s.codec_type,
                    label,
                    kept: draft.is_kept(s.index),
                }
            })
            .collect();
        Self {
            entries,
            art: draft.art().iter().copied().collect(),
            notice,
        }
    }
}

impl fmt::Display for SelectionMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.entries {
            let mark = if e.kept { "x" } else { " " };
            writeln!(f, "[{mark}] {:>2}  {:<8} {}", e.index, e.codec_type, e.label)?;
        }
        if !self.art.is_empty() {
            let art: Vec<String> = self.art.iter().map(u32::to_string).collect();
            writeln!(f, "art (metadata only): {}", art.join(", "))?;
        }
        if let Some(notice) = &self.notice {
            writeln!(f, "! {notice}")?;
        }
        Ok(())
    }
}

/// Runs bounded interactive selection sessions, at most one per task.
pub struct InteractiveSelectionController {
    listener: Arc<dyn InputListener>,
    window: Duration,
    active: Mutex<HashSet<TaskId>>,
}

impl InteractiveSelectionController {
    pub fn new(listener: Arc<dyn InputListener>, window: Duration) -> Self {
        Self {
            listener,
            window,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// How long a session may await a choice before it is cancelled.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a session for `task` is currently awaiting a choice.
    pub fn is_awaiting(&self, task: TaskId) -> bool {
        self.active.lock().contains(&task)
    }

    /// Let `user` edit `initial` until they confirm.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::AlreadyActive`] if a session for `task` is running.
    /// - [`ControllerError::CancelledByUser`] on an explicit cancel.
    /// - [`ControllerError::Timeout`] when no confirm arrives within the window.
    /// - [`ControllerError::ListenerClosed`] if the input source goes away.
    pub async fn run(
        &self,
        task: TaskId,
        user: UserId,
        media: &MediaInfo,
        initial: SelectionDecision,
    ) -> Result<SelectionDecision, ControllerError> {
        let inserted = self.active.lock().insert(task);
        if !inserted {
            tracing::warn!(task_id = %task, "selection session already active");
            return Err(ControllerError::AlreadyActive(task.to_string()));
        }

        let mut actions = self.listener.register(task, user);
        let mut session = Session {
            controller: self,
            task,
            state: ControllerState::Idle,
        };
        session.transition(ControllerState::AwaitingChoice);
        let deadline = Instant::now() + self.window;

        let mut draft = initial.clone();
        self.listener
            .render(task, &SelectionMenu::new(media, &draft, None))
            .await;

        loop {
            let action = match tokio::time::timeout_at(deadline, actions.recv()).await {
                Err(_) => {
                    session.transition(ControllerState::Cancelled);
                    return Err(ControllerError::Timeout(self.window));
                }
                Ok(None) => {
                    session.transition(ControllerState::Cancelled);
                    return Err(ControllerError::ListenerClosed);
                }
                Ok(Some(action)) => action,
            };

            tracing::debug!(task_id = %task, ?action, "selection action");
            let notice = match action {
                UserAction::ToggleStream(index) => {
                    if draft.toggle(index) {
                        None
                    } else {
                        Some(format!("stream {index} cannot be toggled"))
                    }
                }
                UserAction::ToggleKind(kind) => {
                    if draft.toggle_kind(media, kind) {
                        None
                    } else {
                        Some(format!("no {kind} streams to toggle"))
                    }
                }
                UserAction::Reverse => {
                    draft.reverse();
                    None
                }
                UserAction::Reset => {
                    draft = initial.clone();
                    None
                }
                UserAction::Confirm if draft.kept().is_empty() => {
                    Some("select at least one stream before confirming".to_string())
                }
                UserAction::Confirm => {
                    session.transition(ControllerState::Resolved);
                    return Ok(draft);
                }
                UserAction::Cancel => {
                    session.transition(ControllerState::Cancelled);
                    return Err(ControllerError::CancelledByUser);
                }
            };

            self.listener
                .render(task, &SelectionMenu::new(media, &draft, notice))
                .await;
        }
    }
}

/// Live session bookkeeping; dropping it releases the task's listener.
struct Session<'a> {
    controller: &'a InteractiveSelectionController,
    task: TaskId,
    state: ControllerState,
}

impl Session<'_> {
    fn transition(&mut self, to: ControllerState) {
        tracing::debug!(task_id = %self.task, from = ?self.state, ?to, "selection state");
        self.state = to;
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.state == ControllerState::AwaitingChoice {
            tracing::debug!(task_id = %self.task, "selection session dropped while awaiting");
        }
        self.controller.listener.deregister(self.task);
        self.controller.active.lock().remove(&self.task);
    }
}
