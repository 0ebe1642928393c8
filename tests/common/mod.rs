#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rekey::api::{ApiClient, ApiError};
use serde_json::Value;

/// Records every call and answers from canned responses keyed by
/// `"METHOD /path"`.
#[derive(Default)]
pub struct MockApi {
    responses: Mutex<HashMap<String, Result<Value, ApiError>>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, call: &str, response: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(call.to_string(), Ok(response));
    }

    pub fn fail(&self, call: &str, error: ApiError) {
        self.responses
            .lock()
            .unwrap()
            .insert(call.to_string(), Err(error));
    }

    /// Calls made so far, as `"METHOD /path"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    /// Body of the last call matching `call`.
    pub fn body_of(&self, call: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(c, _)| c == call)
            .and_then(|(_, body)| body.clone())
    }

    fn answer(&self, call: String, body: Option<&Value>) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((call.clone(), body.cloned()));
        match self.responses.lock().unwrap().get(&call) {
            Some(response) => response.clone(),
            None => match body {
                Some(body) => Ok(body.clone()),
                None => Err(ApiError::Http {
                    status: 404,
                    message: format!("no route for {}", call),
                }),
            },
        }
    }
}

#[async_trait]
impl ApiClient for MockApi {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.answer(format!("GET {}", path), None)
    }

    async fn create(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.answer(format!("POST {}", path), Some(body))
    }

    async fn update(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.answer(format!("PUT {}", path), Some(body))
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.answer(format!("DELETE {}", path), None)
    }
}

/// Armored OpenPGP keys, shared with the unit tests.
pub const RECOVERY_A: &str = include_str!("../fixtures/recovery_a.asc");
pub const RECOVERY_B: &str = include_str!("../fixtures/recovery_b.asc");
pub const REVOKED: &str = include_str!("../fixtures/revoked.asc");
pub const RSA_2048: &str = include_str!("../fixtures/rsa2048.asc");

pub const NO_SERVER_KEY: &str = "0000000000000000000000000000000000000000";
