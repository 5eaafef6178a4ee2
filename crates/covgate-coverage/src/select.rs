use std::collections::{BTreeSet, HashMap, HashSet};

use covgate_core::{CoverageDeficiencies, Deficiency, Result, TargetKind};
use tracing::debug;

use crate::aggregate::{Apex, Test};

/// Minimum acceptable coverage ratio, per artifact and in aggregate.
pub const COVERAGE_THRESHOLD: f64 = 0.75;

/// Decide the test set covering the requested artifacts, or fail with every
/// coverage deficiency found.
///
/// Targets are matched by name and kind against the aggregated artifacts.
/// Covering tests accumulate from every aggregated artifact, so a
/// dependency-expanded fetch contributes its tests to the selection, while
/// deficiencies and aggregate totals still key off the requested names
/// only. Classes in `test_class_names` are exempt from the individual
/// threshold but keep their lines in the aggregate totals.
pub fn select_max_coverage(
    tests: &HashMap<String, Test>,
    apexes: &HashMap<String, Apex>,
    classes: &[String],
    triggers: &[String],
    test_class_names: &HashSet<String>,
) -> Result<Vec<String>> {
    let mut deficiencies = Vec::new();
    let mut selected = BTreeSet::new();
    let mut lines_total = 0usize;
    let mut covered_total = 0usize;

    // Every aggregated artifact contributes its covering tests, not just the
    // requested ones: a dependency-expanded fetch must reproduce the
    // coverage of the expansion too.
    for apex in apexes.values() {
        for test_id in apex.coverage.keys() {
            if let Some(test) = tests.get(test_id) {
                selected.insert(test.name.clone());
            }
        }
    }

    let targets = triggers
        .iter()
        .map(|name| (TargetKind::Trigger, name))
        .chain(classes.iter().map(|name| (TargetKind::Class, name)));

    for (kind, name) in targets {
        let wants_trigger = kind == TargetKind::Trigger;
        let apex = apexes
            .values()
            .find(|a| a.name == *name && a.is_trigger == wants_trigger);

        let Some(apex) = apex else {
            deficiencies.push(Deficiency::Untested {
                kind,
                name: name.clone(),
            });
            continue;
        };

        // No instrumented lines means no defined ratio; treat as untested.
        if apex.lines == 0 {
            deficiencies.push(Deficiency::Untested {
                kind,
                name: name.clone(),
            });
            continue;
        }

        let covered = apex.covered_lines();
        lines_total += apex.lines;
        covered_total += covered;

        let ratio = coverage_ratio(covered, apex.lines);
        let exempt = kind == TargetKind::Class && test_class_names.contains(name);
        if ratio < COVERAGE_THRESHOLD && !exempt {
            deficiencies.push(Deficiency::BelowThreshold {
                kind,
                name: name.clone(),
                ratio,
            });
        }
    }

    // The aggregate check only applies once every individual target holds.
    if deficiencies.is_empty() && lines_total > 0 {
        let ratio = coverage_ratio(covered_total, lines_total);
        if ratio < COVERAGE_THRESHOLD {
            deficiencies.push(Deficiency::AggregateBelowThreshold { ratio });
        }
    }

    if deficiencies.is_empty() {
        debug!(tests = selected.len(), "coverage targets satisfied");
        Ok(selected.into_iter().collect())
    } else {
        Err(CoverageDeficiencies { deficiencies }.into())
    }
}

/// Covered over total, ceiling-rounded to two decimal places to match the
/// platform's own rounding convention.
fn coverage_ratio(covered: usize, lines: usize) -> f64 {
    (covered as f64 / lines as f64 * 100.0).ceil() / 100.0
}
