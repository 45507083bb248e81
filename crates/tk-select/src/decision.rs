//! The kept / removed / art classification of a container's streams.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tk_core::{CodecType, Error, Result};
use tk_probe::MediaInfo;

/// Three pairwise disjoint sets of stream indices.
///
/// Every constructor and mutator keeps the sets disjoint. Whether they also
/// cover a particular container is checked by [`SelectionDecision::is_partition_of`].
/// Art indices are fixed at construction; edits move indices between `kept`
/// and `removed` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDecision {
    kept: BTreeSet<u32>,
    removed: BTreeSet<u32>,
    art: BTreeSet<u32>,
}

impl SelectionDecision {
    /// Build a decision from explicit sets.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if any index appears in more than one set.
    pub fn from_sets(
        kept: impl IntoIterator<Item = u32>,
        removed: impl IntoIterator<Item = u32>,
        art: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        let decision = Self {
            kept: kept.into_iter().collect(),
            removed: removed.into_iter().collect(),
            art: art.into_iter().collect(),
        };
        let overlap = decision
            .kept
            .intersection(&decision.removed)
            .chain(decision.kept.intersection(&decision.art))
            .chain(decision.removed.intersection(&decision.art))
            .next()
            .copied();
        match overlap {
            Some(index) => Err(Error::Validation(format!(
                "stream {index} classified more than once"
            ))),
            None => Ok(decision),
        }
    }

    /// Used by the selector, whose classification is disjoint by construction.
    pub(crate) fn from_disjoint(
        kept: BTreeSet<u32>,
        removed: BTreeSet<u32>,
        art: BTreeSet<u32>,
    ) -> Self {
        debug_assert!(kept.is_disjoint(&removed));
        debug_assert!(kept.is_disjoint(&art));
        debug_assert!(removed.is_disjoint(&art));
        Self { kept, removed, art }
    }

    /// Streams copied into the output, ascending.
    pub fn kept(&self) -> &BTreeSet<u32> {
        &self.kept
    }

    /// Streams dropped from the output.
    pub fn removed(&self) -> &BTreeSet<u32> {
        &self.removed
    }

    /// Cover-art streams; never stream-mapped.
    pub fn art(&self) -> &BTreeSet<u32> {
        &self.art
    }

    pub fn is_kept(&self, index: u32) -> bool {
        self.kept.contains(&index)
    }

    /// Move `index` between kept and removed. Returns `false` (and changes
    /// nothing) for art or unknown indices.
    pub fn toggle(&mut self, index: u32) -> bool {
        if self.kept.remove(&index) {
            self.removed.insert(index);
            true
        } else if self.removed.remove(&index) {
            self.kept.insert(index);
            true
        } else {
            false
        }
    }

    /// Bulk toggle every non-art stream of `kind`: if all of them are kept,
    /// remove them all; otherwise keep them all. Returns whether anything moved.
    pub fn toggle_kind(&mut self, media: &MediaInfo, kind: CodecType) -> bool {
        let members: Vec<u32> = media
            .streams_of(kind)
            .map(|s| s.index)
            .filter(|i| !self.art.contains(i))
            .filter(|i| self.kept.contains(i) || self.removed.contains(i))
            .collect();
        if members.is_empty() {
            return false;
        }

        let all_kept = members.iter().all(|i| self.kept.contains(i));
        for index in members {
            if all_kept {
                self.kept.remove(&index);
                self.removed.insert(index);
            } else {
                self.removed.remove(&index);
                self.kept.insert(index);
            }
        }
        true
    }

    /// Swap kept and removed; art is untouched.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.kept, &mut self.removed);
    }

    /// Move every stream of `kind` that is currently kept into removed.
    pub fn remove_kind(&mut self, media: &MediaInfo, kind: CodecType) {
        for stream in media.streams_of(kind) {
            if self.kept.remove(&stream.index) {
                self.removed.insert(stream.index);
            }
        }
    }

    /// Whether the three sets exactly cover the stream indices of `media`.
    pub fn is_partition_of(&self, media: &MediaInfo) -> bool {
        let all: BTreeSet<u32> = media.indices().collect();
        let covered = self.kept.len() + self.removed.len() + self.art.len();
        covered == all.len()
            && self
                .kept
                .iter()
                .chain(&self.removed)
                .chain(&self.art)
                .all(|i| all.contains(i))
    }

    /// Number of kept streams of `kind`.
    pub fn kept_of_kind(&self, media: &MediaInfo, kind: CodecType) -> usize {
        media
            .streams_of(kind)
            .filter(|s| self.kept.contains(&s.index))
            .count()
    }
}
