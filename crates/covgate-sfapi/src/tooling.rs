use covgate_core::{CovgateError, Result};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::{transport, Connection};

pub const APEX_CLASS: &str = "ApexClass";
pub const APEX_TRIGGER: &str = "ApexTrigger";

/// One raw line-coverage record: which lines of one class or trigger a
/// single test class covered and left uncovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApexCodeCoverage {
    #[serde(rename = "ApexTestClass")]
    pub test_class: NamedRecord,
    #[serde(rename = "ApexClassOrTrigger")]
    pub class_or_trigger: TypedRecord,
    #[serde(rename = "Coverage")]
    pub coverage: LineCoverage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypedRecord {
    #[serde(default)]
    pub attributes: RecordAttributes,
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

impl TypedRecord {
    pub fn is_trigger(&self) -> bool {
        self.attributes.record_type == APEX_TRIGGER
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordAttributes {
    #[serde(rename = "type")]
    pub record_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LineCoverage {
    #[serde(rename = "coveredLines", default)]
    pub covered_lines: Vec<u32>,
    #[serde(rename = "uncoveredLines", default)]
    pub uncovered_lines: Vec<u32>,
}

/// One directed dependency edge: component X references component Y.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataComponentDependency {
    #[serde(rename = "MetadataComponentName")]
    pub name: String,
    #[serde(rename = "MetadataComponentId")]
    pub id: String,
    #[serde(rename = "MetadataComponentType")]
    pub component_type: String,
    #[serde(rename = "RefMetadataComponentType")]
    pub ref_type: String,
    #[serde(rename = "RefMetadataComponentName")]
    pub ref_name: String,
    #[serde(rename = "RefMetadataComponentId")]
    pub ref_id: String,
}

/// Class metadata with the symbol-table fragment needed to recognize test
/// classes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApexClassInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SymbolTable", default)]
    pub symbol_table: SymbolTable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SymbolTable {
    #[serde(rename = "tableDeclaration", default)]
    pub table_declaration: TableDeclaration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableDeclaration {
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub name: String,
}

impl ApexClassInfo {
    /// A class carrying an `IsTest` annotation or a `testMethod` modifier is
    /// a test class and exempt from the individual coverage threshold.
    pub fn is_test_class(&self) -> bool {
        let decl = &self.symbol_table.table_declaration;
        decl.annotations
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case("istest"))
            || decl.modifiers.iter().any(|m| m == "testMethod")
    }
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteAnonymousResult {
    #[serde(default)]
    line: i64,
    #[serde(default)]
    column: i64,
    compiled: bool,
    success: bool,
    #[serde(default)]
    compile_problem: Option<String>,
    #[serde(default)]
    exception_stack_trace: Option<String>,
    #[serde(default)]
    exception_message: Option<String>,
}

impl Connection {
    /// Run one tooling-API SOQL query and decode the `records` array.
    ///
    /// Generic over the record kind; malformed JSON and HTTP failures
    /// propagate as-is.
    pub async fn query_tooling<T: DeserializeOwned>(
        &self,
        soql: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let req = self
            .http()
            .get(self.data_url("tooling/query/"))
            .query(&[("q", soql)])
            .header(CONTENT_TYPE, "application/json")
            .build()
            .map_err(transport)?;

        let body = self.send(req, cancel).await?;
        let resp: QueryResponse<T> = serde_json::from_slice(&body)?;
        debug!(records = resp.records.len(), "tooling query decoded");
        Ok(resp.records)
    }

    /// Coverage records for the named classes and triggers. An empty name
    /// list selects nothing and short-circuits without a network call.
    pub async fn request_coverage(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApexCodeCoverage>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let soql = format!(
            "SELECT ApexTestClass.Name,ApexTestClass.Id,ApexClassOrTrigger.Name,\
             ApexClassOrTrigger.Id,Coverage FROM ApexCodeCoverage \
             WHERE ApexClassOrTrigger.Name IN ({})",
            soql_string_list(names)
        );
        self.query_tooling(&soql, cancel).await
    }

    /// Dependency edges whose referencing side is one of the given metadata
    /// component types, restricted to class/trigger references.
    pub async fn request_dependencies(
        &self,
        component_types: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<MetadataComponentDependency>> {
        if component_types.is_empty() {
            return Ok(Vec::new());
        }
        let soql = format!(
            "SELECT MetadataComponentName,MetadataComponentId,MetadataComponentType,\
             RefMetadataComponentType,RefMetadataComponentName,RefMetadataComponentId \
             FROM MetadataComponentDependency \
             WHERE RefMetadataComponentType IN ('ApexClass','ApexTrigger') \
             AND MetadataComponentType IN ({})",
            soql_string_list(component_types)
        );
        self.query_tooling(&soql, cancel).await
    }

    /// Class metadata (symbol table included) for the named classes.
    pub async fn request_apex_classes(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApexClassInfo>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let soql = format!(
            "SELECT Id,Name,SymbolTable FROM ApexClass WHERE Name IN ({})",
            soql_string_list(names)
        );
        self.query_tooling(&soql, cancel).await
    }

    /// Execute an anonymous Apex block via the tooling API.
    pub async fn execute_anonymous(&self, body: &str, cancel: &CancellationToken) -> Result<()> {
        let stripped = body.replace('\n', " ");
        let req = self
            .http()
            .get(self.data_url("tooling/executeAnonymous/"))
            .query(&[("anonymousBody", stripped.as_str())])
            .build()
            .map_err(transport)?;

        let resp = self.send(req, cancel).await?;
        let parsed: ExecuteAnonymousResult = serde_json::from_slice(&resp)?;

        if parsed.success {
            return Ok(());
        }
        if parsed.compiled {
            return Err(CovgateError::Execution(format!(
                "error on line {}:{} - {} {}",
                parsed.line,
                parsed.column,
                parsed.exception_message.unwrap_or_default(),
                parsed.exception_stack_trace.unwrap_or_default()
            )));
        }
        Err(CovgateError::Execution(format!(
            "didn't compile: {}",
            parsed.compile_problem.unwrap_or_default()
        )))
    }
}

/// Render a SOQL string list: `'A','B'`, single quotes escaped.
fn soql_string_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "\\'")))
        .collect::<Vec<_>>()
        .join(",")
}
