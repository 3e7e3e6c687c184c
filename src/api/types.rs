//! Issue wire model and the create/update envelope.
//!
//! The tracker is inconsistent about shape: status, priority, and assignee
//! arrive either as bare strings or as `{"name": ...}` objects depending on
//! the endpoint. Normalization happens here, once, so the rest of the
//! client only ever sees plain strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Issue type used when a draft does not name one.
const DEFAULT_ISSUE_TYPE: &str = "Task";

/// Status assumed for a freshly created issue when the server reports none.
const DEFAULT_STATUS: &str = "Open";

/// A tracker issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Server-assigned key (e.g. "PROJ-123"); immutable once set.
    pub key: String,
    pub fields: IssueFields,
}

/// The mutable fields of an issue, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    pub summary: String,
    #[serde(default, deserialize_with = "de_description")]
    pub description: Option<String>,
    #[serde(default = "default_status", deserialize_with = "de_name")]
    pub status: String,
    #[serde(default, deserialize_with = "de_opt_name")]
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "de_opt_name")]
    pub priority: Option<String>,
    #[serde(default, rename = "project", deserialize_with = "de_project")]
    pub project_key: String,
}

/// Fields submitted when creating an issue.
#[derive(Debug, Clone, Default)]
pub struct IssueDraft {
    pub summary: String,
    pub project_key: String,
    pub description: Option<String>,
    /// Defaults to "Task" on the wire.
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
}

impl IssueDraft {
    pub fn new(summary: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            project_key: project_key.into(),
            ..Self::default()
        }
    }

    /// Local pre-validation; failures here never reach the network.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary cannot be empty".to_string());
        }
        if self.project_key.trim().is_empty() {
            return Err("project key cannot be empty".to_string());
        }
        Ok(())
    }

    /// The `{"fields": {...}}` envelope the tracker expects on create.
    pub(crate) fn to_envelope(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("project".to_string(), json!({ "key": self.project_key }));
        fields.insert("summary".to_string(), json!(self.summary));
        fields.insert(
            "issuetype".to_string(),
            json!({ "name": self.issue_type.as_deref().unwrap_or(DEFAULT_ISSUE_TYPE) }),
        );
        if let Some(description) = &self.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(priority) = &self.priority {
            fields.insert("priority".to_string(), json!({ "name": priority }));
        }
        if let Some(assignee) = &self.assignee {
            fields.insert("assignee".to_string(), json!({ "name": assignee }));
        }
        json!({ "fields": Value::Object(fields) })
    }

    /// Assemble the issue the caller gets back once the server assigns a
    /// key. The create response carries no fields, so the submitted draft
    /// is the authoritative snapshot.
    pub(crate) fn into_issue(self, key: String) -> Issue {
        Issue {
            key,
            fields: IssueFields {
                summary: self.summary,
                description: self.description,
                status: default_status(),
                assignee: self.assignee,
                priority: self.priority,
                project_key: self.project_key,
            },
        }
    }
}

/// A partial update; only set fields go on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
    }

    pub(crate) fn to_envelope(&self) -> Value {
        let mut fields = Map::new();
        if let Some(summary) = &self.summary {
            fields.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = &self.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(priority) = &self.priority {
            fields.insert("priority".to_string(), json!({ "name": priority }));
        }
        if let Some(assignee) = &self.assignee {
            fields.insert("assignee".to_string(), json!({ "name": assignee }));
        }
        json!({ "fields": Value::Object(fields) })
    }
}

/// Create response: the server assigns the key, nothing else matters here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateReceipt {
    pub key: String,
}

/// The current authenticated user, from the `myself` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(default)]
    pub account_id: String,
    pub display_name: String,
    /// May be empty if the user hides it.
    #[serde(default)]
    pub email_address: String,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

/// The shapes a named value arrives in.
#[derive(Deserialize)]
#[serde(untagged)]
enum NameRepr {
    Plain(String),
    Named { name: String },
    Display {
        #[serde(rename = "displayName")]
        display_name: String,
    },
}

impl NameRepr {
    fn into_name(self) -> String {
        match self {
            NameRepr::Plain(name) => name,
            NameRepr::Named { name } => name,
            NameRepr::Display { display_name } => display_name,
        }
    }
}

fn de_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let repr = Option::<NameRepr>::deserialize(deserializer)?;
    Ok(repr.map(NameRepr::into_name).unwrap_or_else(default_status))
}

fn de_opt_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let repr = Option::<NameRepr>::deserialize(deserializer)?;
    Ok(repr.map(NameRepr::into_name))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectRepr {
    Keyed { key: String },
    Plain(String),
}

fn de_project<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let repr = Option::<ProjectRepr>::deserialize(deserializer)?;
    Ok(match repr {
        Some(ProjectRepr::Keyed { key }) => key,
        Some(ProjectRepr::Plain(key)) => key,
        None => String::new(),
    })
}

/// Descriptions arrive as plain strings or as rich-text documents; only
/// plain text survives normalization.
fn de_description<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}
