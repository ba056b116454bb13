//! Finding aggregation: deduplication and deterministic ordering.

use super::types::Finding;

/// Deduplicate and order findings.
///
/// Findings with the same (kind, span) collapse to one, keeping the highest
/// severity. Output is ordered by span start, then severity descending,
/// with fixed tie-breaks so repeated runs produce identical output. Pure
/// and idempotent: aggregating an already aggregated list is a no-op.
pub fn aggregate(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| {
        a.key()
            .cmp(&b.key())
            .then(b.severity.cmp(&a.severity))
            .then(a.message.cmp(&b.message))
    });
    findings.dedup_by(|a, b| a.key() == b.key());

    findings.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.severity.cmp(&a.severity))
            .then(a.kind.cmp(&b.kind))
            .then(a.span.end.cmp(&b.span.end))
            .then(a.message.cmp(&b.message))
    });
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::types::{FindingKind, Severity};
    use crate::tree::Span;

    fn finding(kind: FindingKind, start: usize, severity: Severity) -> Finding {
        Finding {
            kind,
            span: Span::new(start, start + 10),
            message: format!("{} at {}", kind, start),
            severity,
        }
    }

    #[test]
    fn test_orders_by_start_then_severity_desc() {
        let input = vec![
            finding(FindingKind::UnusedDefaultAssignment, 50, Severity::Info),
            finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Warning),
            finding(FindingKind::UndefinedVariableUse, 50, Severity::Warning),
        ];
        let out = aggregate(input);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].span.start, 10);
        assert_eq!(out[1].span.start, 50);
        assert_eq!(out[1].severity, Severity::Warning);
        assert_eq!(out[2].severity, Severity::Info);
    }

    #[test]
    fn test_dedup_identical_kind_and_span() {
        let f = finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Warning);
        let out = aggregate(vec![f.clone(), f.clone(), f]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_dedup_keeps_highest_severity() {
        let mut low = finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Info);
        low.message = "low".into();
        let mut high = finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Warning);
        high.message = "high".into();

        let out = aggregate(vec![low, high]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::Warning);
    }

    #[test]
    fn test_same_span_different_kind_both_kept() {
        let a = finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Warning);
        let b = finding(FindingKind::UndefinedVariableUse, 10, Severity::Warning);
        let out = aggregate(vec![a, b]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            finding(FindingKind::UnusedDefaultAssignment, 50, Severity::Info),
            finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Warning),
            finding(FindingKind::RepeatedInvariantLookup, 10, Severity::Warning),
            finding(FindingKind::UndefinedVariableUse, 5, Severity::Warning),
        ];
        let once = aggregate(input);
        let twice = aggregate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
