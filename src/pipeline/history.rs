//! Append-only in-memory log of pipeline outcomes.
//!
//! One entry per completed `analyze` call. Entries are never edited; the only
//! removal is eviction of the oldest entries under a `MaxEntries` policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// How many entries the log keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep everything
    #[default]
    Unbounded,
    /// Keep the newest `n`, evicting from the front
    MaxEntries(usize),
}

/// One classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the log since creation, starting at 0; survives eviction
    pub sequence: u64,
    pub group_id: usize,
    /// Flattened (row-major) field that was classified
    pub field: Vec<f64>,
    /// Fingerprint matched by the decoder, if any
    pub matched_tag: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Mean cell intensity of the stored field.
    pub fn field_mean(&self) -> f64 {
        if self.field.is_empty() {
            return 0.0;
        }
        self.field.iter().sum::<f64>() / self.field.len() as f64
    }

    /// Reproducible digest of the group id and field geometry.
    ///
    /// Entries with the same group, field length and mean intensity (to 6
    /// decimals) share a signature, which makes recurring patterns easy to
    /// catalogue.
    pub fn signature(&self) -> String {
        let input = format!("{}::{}::{:.6}", self.group_id, self.field.len(), self.field_mean());
        format!("{:x}", md5::compute(input.as_bytes()))
    }
}

/// Summary counters for the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_recorded: u64,
    pub retained: usize,
    pub evicted: u64,
    /// Retained entries per group id
    pub per_group: BTreeMap<usize, usize>,
}

/// Ordered, append-only outcome log.
#[derive(Debug, Clone, Default)]
pub struct AnalysisHistory {
    entries: VecDeque<HistoryEntry>,
    retention: RetentionPolicy,
    total_recorded: u64,
    evicted: u64,
}

impl AnalysisHistory {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
            total_recorded: 0,
            evicted: 0,
        }
    }

    /// Record an outcome and return the stored entry.
    pub fn append(
        &mut self,
        group_id: usize,
        field: Vec<f64>,
        matched_tag: Option<String>,
    ) -> &HistoryEntry {
        if let RetentionPolicy::MaxEntries(max) = self.retention {
            // Make room for the new entry
            self.evict_to(max.max(1) - 1);
        }

        self.entries.push_back(HistoryEntry {
            sequence: self.total_recorded,
            group_id,
            field,
            matched_tag,
            recorded_at: Utc::now(),
        });
        self.total_recorded += 1;
        &self.entries[self.entries.len() - 1]
    }

    /// Change the retention policy, evicting the oldest entries if needed.
    pub fn set_retention(&mut self, retention: RetentionPolicy) {
        self.retention = retention;
        if let RetentionPolicy::MaxEntries(max) = retention {
            self.evict_to(max.max(1));
        }
    }

    fn evict_to(&mut self, limit: usize) {
        while self.entries.len() > limit {
            self.entries.pop_front();
            self.evicted += 1;
        }
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> &VecDeque<HistoryEntry> {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Group ids of retained entries, oldest first.
    pub fn group_ids(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.group_id).collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let mut per_group = BTreeMap::new();
        for entry in &self.entries {
            *per_group.entry(entry.group_id).or_insert(0) += 1;
        }
        HistoryStats {
            total_recorded: self.total_recorded,
            retained: self.entries.len(),
            evicted: self.evicted,
            per_group,
        }
    }

    /// JSON array of the retained entries, for an external archiver.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
