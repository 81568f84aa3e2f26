// commands.rs
// Purpose: Request/response surface consumed by popups, option pages and other front ends

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{LifeLogError, LifeLogResult};
use crate::event_record::{EventSource, RawEvent};
use crate::lifelog_core::LifeLogCore;

/// Consumer request, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetStats,
    GetRecentEntries {
        #[serde(default)]
        limit: Option<i64>,
    },
    ToggleLogging {
        enabled: bool,
    },
    GetLoggingStatus,
    ClearAll,
    RecordEvent {
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        source: EventSource,
    },
    Sweep,
    ExportCsv,
}

impl Request {
    pub const ACTIONS: [&'static str; 8] = [
        "getStats",
        "getRecentEntries",
        "toggleLogging",
        "getLoggingStatus",
        "clearAll",
        "recordEvent",
        "sweep",
        "exportCsv",
    ];

    /// Parse a JSON request, telling unknown actions apart from bad payloads.
    pub fn from_value(value: Value) -> LifeLogResult<Self> {
        let action = match value.get("action").and_then(Value::as_str) {
            Some(action) => action.to_string(),
            None => return Err(LifeLogError::malformed("action", "missing request action")),
        };
        if !Self::ACTIONS.contains(&action.as_str()) {
            return Err(LifeLogError::unknown_request(action));
        }
        serde_json::from_value(value).map_err(|e| LifeLogError::malformed(action, e.to_string()))
    }
}

/// Response envelope: `success` plus whichever payload the action produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            success: true,
            data: None,
            enabled: None,
            error: None,
        }
    }

    pub fn with_data<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Response {
                data: Some(value),
                ..Response::ok()
            },
            Err(e) => Response::failure(&LifeLogError::from(e)),
        }
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Response {
            enabled: Some(enabled),
            ..Response::ok()
        }
    }

    pub fn failure(err: &LifeLogError) -> Self {
        let error = match err {
            LifeLogError::UnknownRequest { action } => format!("Unknown action: {action}"),
            other => other.to_string(),
        };
        Response {
            success: false,
            data: None,
            enabled: None,
            error: Some(error),
        }
    }
}

/// Dispatch a typed request against the engine.
pub async fn handle(core: &LifeLogCore, request: Request) -> Response {
    let result = dispatch(core, request).await;
    result.unwrap_or_else(|e| {
        warn!(error = %e, "request failed");
        Response::failure(&e)
    })
}

/// Dispatch a raw JSON request. Unknown actions get an explicit error.
pub async fn handle_value(core: &LifeLogCore, value: Value) -> Response {
    match Request::from_value(value) {
        Ok(request) => handle(core, request).await,
        Err(e) => {
            warn!(error = %e, "rejected request");
            Response::failure(&e)
        }
    }
}

async fn dispatch(core: &LifeLogCore, request: Request) -> LifeLogResult<Response> {
    let response = match request {
        Request::GetStats => Response::with_data(&core.stats().await?),
        Request::GetRecentEntries { limit } => {
            let limit = limit.unwrap_or(core.config().query.default_recent_limit);
            Response::with_data(&core.recent(limit).await?)
        }
        Request::ToggleLogging { enabled } => Response::with_enabled(core.set_logging(enabled).await?),
        Request::GetLoggingStatus => Response::with_enabled(core.logging_enabled()),
        Request::ClearAll => {
            core.clear_all().await?;
            Response::ok()
        }
        Request::RecordEvent { url, title, source } => {
            let outcome = core.admit(RawEvent { url, title, source }).await?;
            Response::with_data(&outcome)
        }
        Request::Sweep => Response::with_data(&core.sweep().await?),
        Request::ExportCsv => Response::with_data(&core.export_csv().await?),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_extension_message_shapes() {
        let req = Request::from_value(json!({"action": "getRecentEntries", "limit": 5})).unwrap();
        assert_eq!(req, Request::GetRecentEntries { limit: Some(5) });

        let req = Request::from_value(json!({"action": "getRecentEntries"})).unwrap();
        assert_eq!(req, Request::GetRecentEntries { limit: None });

        let req = Request::from_value(json!({"action": "toggleLogging", "enabled": false})).unwrap();
        assert_eq!(req, Request::ToggleLogging { enabled: false });
    }

    #[test]
    fn unknown_action_is_distinguished_from_bad_payload() {
        let err = Request::from_value(json!({"action": "launchRockets"})).unwrap_err();
        assert!(matches!(err, LifeLogError::UnknownRequest { .. }));

        let err = Request::from_value(json!({"action": "toggleLogging"})).unwrap_err();
        assert!(matches!(err, LifeLogError::MalformedInput { .. }));

        let err = Request::from_value(json!({"limit": 3})).unwrap_err();
        assert!(matches!(err, LifeLogError::MalformedInput { .. }));
    }

    #[test]
    fn failure_envelope_has_no_data() {
        let resp = Response::failure(&LifeLogError::unknown_request("nope"));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, json!({"success": false, "error": "Unknown action: nope"}));
    }
}
