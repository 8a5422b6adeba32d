use std::sync::{Mutex, MutexGuard};

use copyflow_common::ResultRecord;

use crate::stats::CollectorStats;

/// Ordered, append-only store of result records for one orchestrator.
///
/// Records are only removed by [`ResultCollector::clear`]. Appends go through a
/// mutex so scenarios may be processed in parallel without changing callers.
#[derive(Debug, Default)]
pub struct ResultCollector {
    records: Mutex<Vec<ResultRecord>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResultRecord>> {
        // A panic while holding the lock cannot leave a half-written record.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, record: ResultRecord) {
        self.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every record in append order.
    pub fn records(&self) -> Vec<ResultRecord> {
        self.lock().clone()
    }

    /// Records that count as usable output.
    pub fn valid(&self) -> Vec<ResultRecord> {
        self.lock().iter().filter(|r| r.is_valid()).cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CollectorStats {
        CollectorStats::from_records(&self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use copyflow_common::{
        FinalStatus, ProcessingStage, RecommendationRecord, Scenario, ValidationOutcome,
    };

    fn record(scenario: &str, status: FinalStatus) -> ResultRecord {
        let passed = status == FinalStatus::Success;
        ResultRecord {
            user_input: String::new(),
            persona: "p".to_string(),
            scenario: Scenario::new(scenario),
            scenario_validation: Some(ValidationOutcome::pass("")),
            draft: None,
            content_validation: Some(ValidationOutcome {
                passed,
                reason: String::new(),
            }),
            recommendation: RecommendationRecord::default(),
            stage_reached: ProcessingStage::Completed,
            final_status: status,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn keeps_append_order_and_filters_valid() {
        let collector = ResultCollector::new();
        collector.append(record("a", FinalStatus::Success));
        collector.append(record("b", FinalStatus::ValidationFailed));
        collector.append(record("c", FinalStatus::Success));

        assert_eq!(collector.len(), 3);
        let names: Vec<_> = collector
            .records()
            .iter()
            .map(|r| r.scenario.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(collector.valid().len(), 2);
        assert_eq!(collector.stats().valid, 2);
    }

    #[test]
    fn clear_empties_the_collector() {
        let collector = ResultCollector::new();
        collector.append(record("a", FinalStatus::Success));
        collector.clear();
        assert!(collector.is_empty());
    }

    #[test]
    fn append_is_safe_across_threads() {
        let collector = std::sync::Arc::new(ResultCollector::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    collector.append(record(&format!("s{i}"), FinalStatus::Success))
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(collector.len(), 4);
    }
}
