//! Turning a finished output tree into a response

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Converts a finalized output tree into a transport-level response
pub trait ResponseBuilder {
    type Output;

    fn build(&self, tree: Value) -> Result<Self::Output>;
}

/// A JSON response body with its status code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Encode the body as a JSON string
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

/// Builds a [`JsonResponse`] with a fixed status code
#[derive(Debug, Clone, Copy)]
pub struct JsonResponseBuilder {
    status: u16,
}

impl JsonResponseBuilder {
    pub fn with_status(status: u16) -> Self {
        Self { status }
    }
}

impl Default for JsonResponseBuilder {
    fn default() -> Self {
        Self { status: 200 }
    }
}

impl ResponseBuilder for JsonResponseBuilder {
    type Output = JsonResponse;

    fn build(&self, tree: Value) -> Result<JsonResponse> {
        Ok(JsonResponse {
            status: self.status,
            body: tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_builder() {
        let response = JsonResponseBuilder::default()
            .build(json!({"data": [1]}))
            .unwrap();
        assert_eq!(response, JsonResponse::ok(json!({"data": [1]})));
        assert_eq!(response.to_json_string().unwrap(), r#"{"data":[1]}"#);
    }

    #[test]
    fn test_custom_status() {
        let response = JsonResponseBuilder::with_status(201)
            .build(Value::Null)
            .unwrap();
        assert_eq!(response.status, 201);
        assert!(response.into_body().is_null());
    }
}
