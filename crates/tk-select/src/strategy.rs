//! Selection modes.
//!
//! Each mode proposes a decision ([`SelectionStrategy::select`]) and then
//! finalises it ([`SelectionStrategy::confirm`]). Only the manual mode
//! involves the user; the others resolve immediately.

use std::fmt;
use std::str::FromStr;

use tk_core::{CodecType, Error, LanguageCode, Result, SelectionError, TaskId, UserId};
use tk_probe::MediaInfo;

use crate::decision::SelectionDecision;
use crate::interactive::InteractiveSelectionController;
use crate::selector::StreamSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Priority-language decision, applied as is.
    Auto,
    /// Priority-language decision as a starting point, edited by `user`.
    Manual { user: UserId },
    /// Priority-language decision with every subtitle removed.
    Extract,
}

impl SelectionStrategy {
    /// Short mode name, also accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual { .. } => "manual",
            Self::Extract => "extract",
        }
    }

    /// Propose a decision for `media`.
    ///
    /// # Errors
    ///
    /// [`SelectionError::NoVideoStream`] for the non-interactive modes when
    /// the container has no playable video. A manual session may still be
    /// opened on such a file.
    pub fn select(
        &self,
        media: &MediaInfo,
        preferred: &[LanguageCode],
    ) -> std::result::Result<SelectionDecision, SelectionError> {
        if !matches!(self, Self::Manual { .. }) && media.main_video().is_none() {
            return Err(SelectionError::NoVideoStream);
        }

        let mut decision = StreamSelector::select(media, preferred);
        if *self == Self::Extract {
            decision.remove_kind(media, CodecType::Subtitle);
        }
        Ok(decision)
    }

    /// Finalise `proposed`.
    ///
    /// # Errors
    ///
    /// For the manual mode, any [`tk_core::ControllerError`] from the session,
    /// or [`Error::Validation`] when no input source is configured.
    pub async fn confirm(
        &self,
        controller: Option<&InteractiveSelectionController>,
        task: TaskId,
        media: &MediaInfo,
        proposed: SelectionDecision,
    ) -> Result<SelectionDecision> {
        match self {
            Self::Auto | Self::Extract => Ok(proposed),
            Self::Manual { user } => {
                let controller = controller.ok_or_else(|| {
                    Error::Validation("manual selection requires an input source".into())
                })?;
                Ok(controller.run(task, *user, media, proposed).await?)
            }
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionStrategy {
    type Err = Error;

    /// Parses `auto` and `extract`. `manual` parses with user id 0; callers
    /// substitute the real user.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual { user: UserId(0) }),
            "extract" => Ok(Self::Extract),
            other => Err(Error::Validation(format!("unknown selection mode '{other}'"))),
        }
    }
}
