use sentinel_common::SafetyAnalysis;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub camera_id: String,
    pub analysis: SafetyAnalysis,
}

/// Fixed-capacity ring of completed analyses, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    records: VecDeque<HistoryRecord>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, camera_id: &str, analysis: SafetyAnalysis) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(HistoryRecord {
            camera_id: camera_id.to_string(),
            analysis,
        });
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    /// Up to `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter().rev().take(n)
    }

    pub fn for_camera<'a>(&'a self, camera_id: &'a str) -> impl Iterator<Item = &'a HistoryRecord> {
        self.records.iter().filter(move |r| r.camera_id == camera_id)
    }

    pub fn to_vec(&self) -> Vec<HistoryRecord> {
        self.records.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(score: i32) -> SafetyAnalysis {
        SafetyAnalysis::new(score, Vec::new(), format!("score {}", score), score > 80)
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = HistoryBuffer::new(10);
        for score in 0..15 {
            history.push("cam-1", reading(score));
        }

        assert_eq!(history.len(), 10);
        let scores: Vec<i32> = history.iter().map(|r| r.analysis.safety_score).collect();
        assert_eq!(scores, (5..15).collect::<Vec<_>>());
        assert_eq!(history.latest().unwrap().analysis.safety_score, 14);
    }

    #[test]
    fn recent_is_newest_first() {
        let mut history = HistoryBuffer::new(10);
        for score in [70, 80, 90] {
            history.push("cam-1", reading(score));
        }
        let scores: Vec<i32> = history.recent(2).map(|r| r.analysis.safety_score).collect();
        assert_eq!(scores, vec![90, 80]);
    }

    #[test]
    fn filters_by_camera() {
        let mut history = HistoryBuffer::new(10);
        history.push("cam-1", reading(90));
        history.push("cam-2", reading(40));
        history.push("cam-1", reading(85));
        assert_eq!(history.for_camera("cam-1").count(), 2);
        assert_eq!(history.for_camera("cam-3").count(), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut history = HistoryBuffer::new(0);
        history.push("cam-1", reading(10));
        history.push("cam-1", reading(20));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.latest().unwrap().analysis.safety_score, 20);
    }
}
