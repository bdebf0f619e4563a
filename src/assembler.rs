//! Reconciles streaming and final transcription fragments per item.
//!
//! Open items live in a bounded map keyed by `item_id` and are removed as
//! soon as their completed fragment arrives. A short memory of finalized ids
//! drops stragglers, so an item never produces output after its final record.

use crate::codec::TranscriptionFragment;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Default cap on concurrently open items
pub const DEFAULT_MAX_OPEN_ITEMS: usize = 256;

/// Minimum number of finalized ids remembered for straggler suppression.
///
/// The memory grows to `max_open` when that is larger. It is a window: a
/// fragment for an id that has since been pushed out by that many newer
/// finalized items is treated as a new item.
const FINALIZED_MEMORY: usize = 64;

/// Normalized output for one transcription fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub transcript: String,
    pub is_final: bool,
    pub item_id: String,
}

#[derive(Debug)]
struct OpenItem {
    /// Arrival order, used to pick an eviction victim
    seq: u64,
    text: String,
    deltas: usize,
}

/// Per-session transcript bookkeeping
#[derive(Debug)]
pub struct TranscriptAssembler {
    open: HashMap<String, OpenItem>,
    finalized: VecDeque<String>,
    finalized_cap: usize,
    max_open: usize,
    next_seq: u64,
}

impl TranscriptAssembler {
    pub fn new(max_open: usize) -> Self {
        let max_open = max_open.max(1);
        let finalized_cap = max_open.max(FINALIZED_MEMORY);
        Self {
            open: HashMap::new(),
            finalized: VecDeque::with_capacity(finalized_cap),
            finalized_cap,
            max_open,
            next_seq: 0,
        }
    }

    /// Number of items with deltas but no completed fragment yet
    pub fn open_items(&self) -> usize {
        self.open.len()
    }

    /// Partial text accumulated so far for an open item
    pub fn partial_text(&self, item_id: &str) -> Option<&str> {
        self.open.get(item_id).map(|item| item.text.as_str())
    }

    /// Accept a fragment from a delta (`completed == false`) or completed event.
    ///
    /// Returns the record to emit, or `None` for whitespace-only text and for
    /// fragments of already finalized items.
    pub fn accept(
        &mut self,
        fragment: TranscriptionFragment,
        completed: bool,
    ) -> Option<TranscriptRecord> {
        let TranscriptionFragment {
            item_id,
            delta,
            transcript,
            ..
        } = fragment;

        if self.finalized.contains(&item_id) {
            debug!(item_id = %item_id, "Dropping fragment for finalized item");
            return None;
        }

        let is_final = completed || transcript.is_some();
        let text = if is_final {
            transcript.unwrap_or_default()
        } else {
            delta.unwrap_or_default()
        };

        if is_final {
            self.finalize(&item_id);
        } else {
            self.append(&item_id, &text);
        }

        if text.trim().is_empty() {
            return None;
        }

        Some(TranscriptRecord {
            transcript: text,
            is_final,
            item_id,
        })
    }

    fn append(&mut self, item_id: &str, text: &str) {
        if let Some(item) = self.open.get_mut(item_id) {
            item.text.push_str(text);
            item.deltas += 1;
            return;
        }

        if self.open.len() >= self.max_open {
            self.evict_oldest();
        }

        self.open.insert(
            item_id.to_owned(),
            OpenItem {
                seq: self.next_seq,
                text: text.to_owned(),
                deltas: 1,
            },
        );
        self.next_seq += 1;
    }

    fn finalize(&mut self, item_id: &str) {
        match self.open.remove(item_id) {
            Some(item) => debug!(
                item_id = %item_id,
                deltas = item.deltas,
                partial_len = item.text.len(),
                "Item finalized"
            ),
            None => debug!(item_id = %item_id, "Item finalized without deltas"),
        }

        if self.finalized.len() >= self.finalized_cap {
            self.finalized.pop_front();
        }
        self.finalized.push_back(item_id.to_owned());
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .open
            .iter()
            .min_by_key(|(_, item)| item.seq)
            .map(|(id, _)| id.clone());

        if let Some(id) = oldest {
            warn!(item_id = %id, max_open = self.max_open, "Evicting unfinished transcript item");
            self.open.remove(&id);
        }
    }
}

impl Default for TranscriptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OPEN_ITEMS)
    }
}
