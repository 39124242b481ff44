// Re-export dependencies used in public interfaces of common types

use std::fmt::Display;

pub use chrono;
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
pub use serde::{Deserialize, Serialize};

/// Envelope code the backend uses for a successful call.
pub const SUCCESS_CODE: i64 = 200;

/// Log tail used when a panel is opened without an explicit selection.
pub const DEFAULT_LOG_TAIL: u32 = 200;

/// Uniform `{code, msg, data}` wrapper around every admin API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Expired,
    /// Anything the backend reports that this client does not know about.
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, InstanceStatus::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Expired => "expired",
            InstanceStatus::Unknown => "unknown",
        }
    }
}

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A sandboxed challenge environment as listed by `GET /admin/instances`.
///
/// This is a read-only copy taken at page-fetch time and may be stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub challenge_id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub challenge_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<String>,
    pub status: InstanceStatus,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub container_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub docker_host_id: Option<String>,
    #[serde(default)]
    pub port: Option<u32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Instance {
    /// Stats may only be requested while the instance is running.
    pub fn stats_eligible(&self) -> bool {
        self.status.is_running()
    }

    /// Container id if the backend reported a non-empty one.
    pub fn container(&self) -> Option<&str> {
        self.container_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn display_title(&self) -> &str {
        self.challenge_title.as_deref().unwrap_or(&self.challenge_id)
    }
}

/// Point-in-time container resource usage, as computed by the backend from
/// the docker stats stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub container_id: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub network_rx: u64,
    pub network_tx: u64,
}

/// Wire shape of `GET /admin/instances/{id}/logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerLogs {
    #[serde(default)]
    pub logs: String,
    #[serde(default)]
    pub container_id: String,
}

/// Log excerpt held by a telemetry panel, tagged with the tail it was
/// requested with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBundle {
    pub container_id: String,
    pub tail_lines: u32,
    pub text: String,
}

impl LogBundle {
    pub fn from_wire(logs: ContainerLogs, tail_lines: u32) -> Self {
        Self {
            container_id: logs.container_id,
            tail_lines,
            text: logs.logs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminIdentity,
}

/// One page of a paginated admin listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(rename = "pageSize", default)]
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

pub type InstancePage = Page<Instance>;

/// Filter and pagination state for the instance listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceQuery {
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InstanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for InstanceQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            status: None,
            challenge: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: String,
    #[serde(default)]
    pub user_display_name: String,
    #[serde(default)]
    pub challenge_title: String,
    pub result: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotChallenge {
    #[serde(default)]
    pub title: String,
    pub count: u64,
}

/// Dashboard counters from `GET /admin/overview/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub today_instances: u64,
    pub running_instances: u64,
    pub today_submissions: u64,
    pub today_correct_rate: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub recent_submissions: Vec<SubmissionView>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hot_challenges: Vec<HotChallenge>,
}

/// Outcome filter for the submission listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionResult {
    Correct,
    Wrong,
}

/// One flag submission as listed by `GET /admin/submissions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub challenge_id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub challenge_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_display_name: Option<String>,
    #[serde(default)]
    pub flag: String,
    pub is_correct: bool,
    #[serde(default)]
    pub points: i64,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn result(&self) -> SubmissionResult {
        if self.is_correct {
            SubmissionResult::Correct
        } else {
            SubmissionResult::Wrong
        }
    }
}

pub type SubmissionPage = Page<Submission>;

/// Filter and pagination state for the submission listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionQuery {
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SubmissionResult>,
}

impl Default for SubmissionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            user: None,
            challenge: None,
            result: None,
        }
    }
}

/// Human readable byte count using 1024 steps, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[unit])
}

// The Go backend serialises nil slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_from_backend_json() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "inst-1",
            "user_id": "user-1",
            "challenge_id": "chal-1",
            "challenge_title": "Nginx basics",
            "container_id": "",
            "docker_host_id": "host-1",
            "port": 20001,
            "status": "running",
            "expires_at": "2024-01-15T10:00:00Z",
            "created_at": "2024-01-15T09:00:00Z"
        }))
        .unwrap();

        assert_eq!(instance.status, InstanceStatus::Running);
        assert!(instance.stats_eligible());
        assert_eq!(instance.container(), None);
        assert_eq!(instance.display_title(), "Nginx basics");
        assert_eq!(instance.port, Some(20001));
    }

    #[test]
    fn test_unknown_status_is_not_eligible() {
        let status: InstanceStatus = serde_json::from_value(json!("paused")).unwrap();
        assert_eq!(status, InstanceStatus::Unknown);
        assert!(!status.is_running());
    }

    #[test]
    fn test_page_accepts_null_list() {
        let page: InstancePage = serde_json::from_value(json!({
            "list": null,
            "total": 0,
            "page": 1,
            "pageSize": 10
        }))
        .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page_size, 10);
    }

    #[test]
    fn test_query_serialization_skips_unset_filters() {
        let query = InstanceQuery {
            status: Some(InstanceStatus::Running),
            ..Default::default()
        };

        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, json!({"page": 1, "pageSize": 10, "status": "running"}));
    }

    #[test]
    fn test_submission_page_from_backend_json() {
        let page: SubmissionPage = serde_json::from_value(json!({
            "list": [{
                "id": "sub-1",
                "user_id": "user-1",
                "challenge_id": "chal-1",
                "challenge_title": "",
                "user_display_name": "alice",
                "flag": "flag{nope}",
                "is_correct": false,
                "points": 0,
                "submitted_at": "2024-01-15T09:30:00Z"
            }],
            "total": 41,
            "page": 3,
            "pageSize": 20
        }))
        .unwrap();

        let submission = &page.list[0];
        assert_eq!(submission.challenge_title, None);
        assert_eq!(submission.user_display_name.as_deref(), Some("alice"));
        assert_eq!(submission.result(), SubmissionResult::Wrong);
        assert_eq!(page.total, 41);

        let query = SubmissionQuery {
            result: Some(SubmissionResult::Correct),
            ..Default::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, json!({"page": 1, "pageSize": 20, "result": "correct"}));
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope = serde_json::from_value(json!({"code": 400, "msg": "bad"})).unwrap();
        assert!(!envelope.is_success());
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(64 * 1024 * 1024), "64 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 + 1024 * 1024 * 512), "3.5 GB");
    }
}
