//! Wire records published to the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// "Task due" notification, version 1.
///
/// Serialized as JSON with ISO-8601 UTC instants; the message id on the
/// broker frame carries the task id so consumers can dedup if extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDueV1 {
    pub task_id: Uuid,
    pub title: String,
    pub due_date_utc: DateTime<Utc>,
    pub timestamp_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_contract_field_names() {
        let event = TaskDueV1 {
            task_id: Uuid::nil(),
            title: "T1".into(),
            due_date_utc: "2030-01-01T00:00:00Z".parse().unwrap(),
            timestamp_utc: "2030-01-02T00:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "taskId": "00000000-0000-0000-0000-000000000000",
                "title": "T1",
                "dueDateUtc": "2030-01-01T00:00:00Z",
                "timestampUtc": "2030-01-02T00:00:00Z",
            })
        );
    }
}
