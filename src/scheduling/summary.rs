//! Roll-up counts over a detection result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::SchedulingConflict;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConflictSummary {
    pub total: usize,
    /// Keyed by conflict type, e.g. `time_overlap`
    pub by_type: BTreeMap<String, usize>,
    /// Keyed by severity, e.g. `critical`
    pub by_severity: BTreeMap<String, usize>,
    pub auto_resolvable: usize,
    pub total_impact_score: u32,
}

impl ConflictSummary {
    pub fn from_conflicts(conflicts: &[SchedulingConflict]) -> Self {
        let mut summary = Self {
            total: conflicts.len(),
            ..Self::default()
        };
        for conflict in conflicts {
            *summary
                .by_type
                .entry(conflict.conflict_type.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_severity
                .entry(conflict.severity.as_str().to_string())
                .or_default() += 1;
            if conflict.auto_resolvable {
                summary.auto_resolvable += 1;
            }
            summary.total_impact_score += u32::from(conflict.impact_score);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::detector::ConflictDetector;
    use crate::scheduling::interval::DateRange;
    use crate::scheduling::test_support::*;

    #[test]
    fn test_counts_by_type_and_severity() {
        let overlap_a = assignment(1, 100, day(4), time(9, 0), 60);
        let overlap_b = assignment(2, 100, day(4), time(9, 30), 60);
        let off_day = assignment(3, 200, day(4), time(9, 0), 60);
        let mut absent = member(200);
        absent.time_off.push(day(4));

        let conflicts = ConflictDetector::default()
            .detect(
                &[overlap_a, overlap_b, off_day],
                &[member(100), absent],
                &DateRange::new(day(4), day(4)),
            )
            .unwrap();
        let summary = ConflictSummary::from_conflicts(&conflicts);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_type["time_overlap"], 1);
        assert_eq!(summary.by_type["unavailable_team"], 1);
        assert_eq!(summary.by_severity["critical"], 1);
        assert_eq!(summary.auto_resolvable, 1);
        assert_eq!(
            summary.total_impact_score,
            conflicts.iter().map(|c| u32::from(c.impact_score)).sum::<u32>()
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(ConflictSummary::from_conflicts(&[]), ConflictSummary::default());
    }
}
