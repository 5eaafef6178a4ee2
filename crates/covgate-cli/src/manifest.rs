//! `package.xml` manifest parsing.
//!
//! Deployment manifests name the metadata components of a package; the gate
//! only cares about the `ApexClass` and `ApexTrigger` sections.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use covgate_sfapi::{APEX_CLASS, APEX_TRIGGER};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    types: Vec<TypeMembers>,
}

#[derive(Debug, Deserialize)]
struct TypeMembers {
    #[serde(default)]
    members: Vec<String>,
    name: String,
}

/// Apex artifacts named across one or more manifests, deduplicated and
/// sorted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Targets {
    pub classes: Vec<String>,
    pub triggers: Vec<String>,
}

impl Targets {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.triggers.is_empty()
    }
}

pub fn read_targets(paths: &[impl AsRef<Path>]) -> anyhow::Result<Targets> {
    let mut classes = BTreeSet::new();
    let mut triggers = BTreeSet::new();

    for path in paths {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let package: Package = quick_xml::de::from_str(&raw)
            .with_context(|| format!("parsing manifest {}", path.display()))?;

        for section in package.types {
            let bucket = match section.name.as_str() {
                APEX_CLASS => &mut classes,
                APEX_TRIGGER => &mut triggers,
                _ => continue,
            };
            // A `*` wildcard carries no concrete name to query by.
            bucket.extend(section.members.into_iter().filter(|m| m != "*"));
        }
    }

    Ok(Targets {
        classes: classes.into_iter().collect(),
        triggers: triggers.into_iter().collect(),
    })
}
