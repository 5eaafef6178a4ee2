use std::collections::{BTreeSet, HashSet};
use std::fmt;

use covgate_core::Result;
use covgate_sfapi::{APEX_CLASS, APEX_TRIGGER};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregate::aggregate_coverage;
use crate::api::ToolingApi;
use crate::deps::resolve_dependencies;
use crate::select::select_max_coverage;

/// Policy deciding which artifacts are included when fetching coverage.
///
/// The strategy set is fixed at build time; both variants share the same
/// validator, and deficiencies always key off the originally requested
/// names, never the dependency expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Evaluate coverage of the directly requested artifacts only.
    MaxCoverage,
    /// Expand the requested set through its dependency closure first.
    MaxCoverageWithDeps,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::MaxCoverage => write!(f, "MaxCoverage"),
            Strategy::MaxCoverageWithDeps => write!(f, "MaxCoverageWithDependencies"),
        }
    }
}

impl Strategy {
    /// Names the strategy adds to the requested set before fetching
    /// coverage records.
    pub async fn resolve_targets<A: ToolingApi + ?Sized>(
        &self,
        api: &A,
        classes: &[String],
        triggers: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        match self {
            Strategy::MaxCoverage => Ok(Vec::new()),
            Strategy::MaxCoverageWithDeps => {
                let edges = api
                    .request_dependencies(
                        &[APEX_CLASS.to_string(), APEX_TRIGGER.to_string()],
                        cancel,
                    )
                    .await?;
                let expanded = resolve_dependencies(&edges, classes, triggers);
                debug!(expanded = expanded.len(), "requested set expanded");
                Ok(expanded)
            }
        }
    }

    /// Decide the test classes required to reproduce coverage of the
    /// requested artifacts, or fail with every deficiency found.
    pub async fn select_tests<A: ToolingApi + ?Sized>(
        &self,
        api: &A,
        classes: &[String],
        triggers: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let expanded = self.resolve_targets(api, classes, triggers, cancel).await?;

        let mut fetch_names: BTreeSet<String> =
            classes.iter().chain(triggers.iter()).cloned().collect();
        fetch_names.extend(expanded);
        let fetch_names: Vec<String> = fetch_names.into_iter().collect();

        // Coverage records and test-class metadata come down concurrently;
        // the first failure wins without waiting on the other fetch.
        let (coverage, class_meta) = tokio::try_join!(
            api.request_coverage(&fetch_names, cancel),
            api.request_apex_classes(classes, cancel),
        )?;
        info!(
            strategy = %self,
            records = coverage.len(),
            "coverage records fetched"
        );

        let (tests, apexes) = aggregate_coverage(&coverage);
        let test_classes: HashSet<String> = class_meta
            .iter()
            .filter(|class| class.is_test_class())
            .map(|class| class.name.clone())
            .collect();

        select_max_coverage(&tests, &apexes, classes, triggers, &test_classes)
    }
}
