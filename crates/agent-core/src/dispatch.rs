//! Tool Dispatch
//!
//! Routes an action to its local or remote capability and turns every
//! per-call failure into an `Error: ...` value the model can read. Only an
//! unknown action name is reported as an error to the caller.

use serde_json::Value;

use crate::envelope::normalize;
use crate::error::ToolError;
use crate::tool::{Capability, ToolCall, ToolRegistry, ToolSession};

/// Executes tool calls for one run
pub struct Dispatcher<'a> {
    registry: &'a ToolRegistry,
    session: Option<&'a dyn ToolSession>,
}

impl<'a> Dispatcher<'a> {
    /// `session` is required only if the registry holds remote tools
    pub fn new(registry: &'a ToolRegistry, session: Option<&'a dyn ToolSession>) -> Self {
        Self { registry, session }
    }

    /// Run `call` and return its normalized result.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let capability = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        if let Some(schema) = self.registry.schema(&call.name) {
            if let Err(e) = schema.validate(&call.arguments) {
                return Ok(error_value(&call.name, &e));
            }
        }

        match capability {
            Capability::Local(tool) => match tool.call(&call.arguments) {
                Ok(value) => Ok(value),
                Err(e) => Ok(error_value(&call.name, &e)),
            },
            Capability::Remote => {
                let Some(session) = self.session else {
                    let e = ToolError::Transport("tool server session is not open".into());
                    return Ok(error_value(&call.name, &e));
                };

                match session.call_tool(&call.name, call.arguments.clone()).await {
                    Ok(envelope) => Ok(normalize(envelope)),
                    Err(e) => Ok(error_value(&call.name, &e)),
                }
            }
        }
    }
}

fn error_value(tool: &str, error: &ToolError) -> Value {
    tracing::warn!(tool = %tool, error = %error, "Tool call failed");
    Value::String(error.observation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;
    use crate::testing::{FakeSession, search_tool, weather_tools};
    use serde_json::{Map, json};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_local(search_tool());
        for schema in weather_tools() {
            registry.register_remote(schema);
        }
        registry
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry, None);
        let err = dispatcher
            .dispatch(&ToolCall::new("launch_rocket", Map::new()))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("launch_rocket".into()));
    }

    #[tokio::test]
    async fn test_local_call() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry, None);
        let result = dispatcher
            .dispatch(&ToolCall::new("search_offices", args(json!({"query": "HQ"}))))
            .await
            .unwrap();
        assert!(result.as_str().unwrap().contains("HQ"));
    }

    #[tokio::test]
    async fn test_remote_call_normalized() {
        let registry = registry();
        let session = FakeSession::new(vec![Ok(Envelope::structured(json!({"result": 59.0}).into()))]);
        let dispatcher = Dispatcher::new(&registry, Some(&session));

        let result = dispatcher
            .dispatch(&ToolCall::new("convert_c_to_f", args(json!({"c": 15}))))
            .await
            .unwrap();

        assert_eq!(result, json!(59.0));
        assert_eq!(session.calls(), vec![("convert_c_to_f".to_string(), args(json!({"c": 15})))]);
    }

    #[tokio::test]
    async fn test_remote_declined_becomes_observation() {
        let registry = registry();
        let session = FakeSession::new(vec![Err(ToolError::Declined("Unknown location: Atlantis".into()))]);
        let dispatcher = Dispatcher::new(&registry, Some(&session));

        let result = dispatcher
            .dispatch(&ToolCall::new("geocode_location", args(json!({"name": "Atlantis"}))))
            .await
            .unwrap();

        assert_eq!(result, json!("Error: Unknown location: Atlantis"));
    }

    #[tokio::test]
    async fn test_remote_transport_failure_becomes_observation() {
        let registry = registry();
        let session = FakeSession::new(vec![Err(ToolError::Transport("broken pipe".into()))]);
        let dispatcher = Dispatcher::new(&registry, Some(&session));

        let result = dispatcher
            .dispatch(&ToolCall::new("get_weather", args(json!({"lat": 1, "lon": 2}))))
            .await
            .unwrap();

        assert_eq!(result, json!("Error: broken pipe"));
    }

    #[tokio::test]
    async fn test_missing_argument_not_sent() {
        let registry = registry();
        let session = FakeSession::new(vec![]);
        let dispatcher = Dispatcher::new(&registry, Some(&session));

        let result = dispatcher
            .dispatch(&ToolCall::new("get_weather", args(json!({"lat": 1}))))
            .await
            .unwrap();

        assert!(result.as_str().unwrap().starts_with("Error: Invalid arguments"));
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_without_session() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry, None);
        let result = dispatcher
            .dispatch(&ToolCall::new("geocode_location", args(json!({"name": "HQ"}))))
            .await
            .unwrap();
        assert_eq!(result, json!("Error: tool server session is not open"));
    }
}
