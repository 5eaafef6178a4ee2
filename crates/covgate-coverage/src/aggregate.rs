use std::collections::HashMap;

use covgate_sfapi::ApexCodeCoverage;

/// One deployable class or trigger with its merged coverage state.
#[derive(Debug, Clone)]
pub struct Apex {
    pub id: String,
    pub name: String,
    pub is_trigger: bool,
    /// Total instrumented lines; fixed by the first record seen for this
    /// artifact, which carries the authoritative total.
    pub lines: usize,
    /// Per covering test coverage vectors, keyed by test id. Every vector
    /// ends at the highest line observed for this artifact.
    pub coverage: HashMap<String, Vec<bool>>,
    /// Highest line number observed across all contributing records.
    pub max_line: usize,
}

impl Apex {
    /// Lines exercised by at least one covering test: the popcount of the
    /// OR-merge across all per-test vectors. Recomputed on each call so it
    /// never goes stale after further merging.
    pub fn covered_lines(&self) -> usize {
        let mut merged = vec![false; self.max_line];
        for cov in self.coverage.values() {
            merge_coverage(&mut merged, cov);
        }
        merged.iter().filter(|&&line| line).count()
    }
}

/// One test class with the mirror view: which lines of which artifacts it
/// covers, keyed by artifact id.
#[derive(Debug, Clone)]
pub struct Test {
    pub id: String,
    pub name: String,
    pub coverage: HashMap<String, Vec<bool>>,
}

/// Merge raw per-(test, artifact) coverage records into fully merged
/// test-side and artifact-side maps, both keyed by platform id.
///
/// Line numbers are 1-indexed on the wire and stored 0-indexed. Overlapping
/// records OR together: a line once seen covered stays covered.
pub fn aggregate_coverage(
    records: &[ApexCodeCoverage],
) -> (HashMap<String, Test>, HashMap<String, Apex>) {
    let mut tests: HashMap<String, Test> = HashMap::new();
    let mut apexes: HashMap<String, Apex> = HashMap::new();

    for record in records {
        let covered = &record.coverage.covered_lines;
        let uncovered = &record.coverage.uncovered_lines;
        let max_line = covered
            .iter()
            .chain(uncovered.iter())
            .copied()
            .max()
            .unwrap_or(0) as usize;

        let mut cov = vec![false; max_line];
        for &line in covered {
            if line >= 1 {
                cov[line as usize - 1] = true;
            }
        }

        let test_id = &record.test_class.id;
        let apex_id = &record.class_or_trigger.id;

        let apex = apexes.entry(apex_id.clone()).or_insert_with(|| Apex {
            id: apex_id.clone(),
            name: record.class_or_trigger.name.clone(),
            is_trigger: record.class_or_trigger.is_trigger(),
            lines: covered.len() + uncovered.len(),
            coverage: HashMap::new(),
            max_line: 0,
        });
        apex.max_line = apex.max_line.max(max_line);
        merge_coverage(apex.coverage.entry(test_id.clone()).or_default(), &cov);

        let test = tests.entry(test_id.clone()).or_insert_with(|| Test {
            id: test_id.clone(),
            name: record.test_class.name.clone(),
            coverage: HashMap::new(),
        });
        merge_coverage(test.coverage.entry(apex_id.clone()).or_default(), &cov);
    }

    (tests, apexes)
}

/// Element-wise OR of `src` into `dst`, growing `dst` when records disagree
/// on the highest observed line.
fn merge_coverage(dst: &mut Vec<bool>, src: &[bool]) {
    if src.len() > dst.len() {
        dst.resize(src.len(), false);
    }
    for (i, &covered) in src.iter().enumerate() {
        if covered {
            dst[i] = true;
        }
    }
}
