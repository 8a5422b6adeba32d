use chrono::{DateTime, Utc};
use copyflow_common::{FinalStatus, ResultRecord};

/// Summary counts over a set of result records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorStats {
    pub total: usize,
    pub valid: usize,
    pub scenario_passed: usize,
    pub content_passed: usize,
    pub by_status: [usize; 6], // indexed like FinalStatus::ALL
    pub first_at: Option<DateTime<Utc>>,
    pub last_at: Option<DateTime<Utc>>,
}

impl CollectorStats {
    pub fn from_records(records: &[ResultRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            stats.valid += usize::from(record.is_valid());
            stats.scenario_passed += usize::from(record.scenario_passed());
            stats.content_passed += usize::from(record.content_passed());
            stats.by_status[status_index(record.final_status)] += 1;
            stats.first_at = Some(match stats.first_at {
                Some(at) => at.min(record.created_at),
                None => record.created_at,
            });
            stats.last_at = Some(match stats.last_at {
                Some(at) => at.max(record.created_at),
                None => record.created_at,
            });
        }
        stats
    }

    pub fn count(&self, status: FinalStatus) -> usize {
        self.by_status[status_index(status)]
    }

    pub fn valid_rate(&self) -> f64 {
        self.percent(self.valid)
    }

    pub fn scenario_pass_rate(&self) -> f64 {
        self.percent(self.scenario_passed)
    }

    pub fn content_pass_rate(&self) -> f64 {
        self.percent(self.content_passed)
    }

    fn percent(&self, n: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            n as f64 / self.total as f64 * 100.0
        }
    }
}

fn status_index(status: FinalStatus) -> usize {
    FinalStatus::ALL
        .iter()
        .position(|s| *s == status)
        .unwrap_or_default()
}

impl std::fmt::Display for CollectorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Copy Run Complete ===")?;
        writeln!(f, "Scenarios:          {}", self.total)?;
        writeln!(f, "Valid output:       {} ({:.0}%)", self.valid, self.valid_rate())?;
        writeln!(
            f,
            "Scenario passed:    {} ({:.0}%)",
            self.scenario_passed,
            self.scenario_pass_rate()
        )?;
        writeln!(
            f,
            "Content passed:     {} ({:.0}%)",
            self.content_passed,
            self.content_pass_rate()
        )?;
        writeln!(f, "\nBy status:")?;
        for status in FinalStatus::ALL {
            writeln!(f, "  {:<18} {}", status.as_str(), self.count(status))?;
        }
        if let (Some(first), Some(last)) = (self.first_at, self.last_at) {
            writeln!(
                f,
                "\nSpan: {} .. {}",
                first.format("%Y-%m-%d %H:%M:%S"),
                last.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        Ok(())
    }
}
