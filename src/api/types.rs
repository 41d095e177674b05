// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire shapes of the backend's request and response bodies.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::api::error::ApiError;

#[derive(Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Response to `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginEnvelope {
    #[serde(default)]
    pub ok: bool,
    pub access_token: Option<String>,
    pub user: Option<LoginUser>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Response to `POST /auth/register`. The backend answers either a success
/// envelope, a field-keyed `errors` map, or a bare `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterEnvelope {
    #[serde(default)]
    pub ok: bool,
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub user: Option<RegisteredUser>,
    pub errors: Option<Map<String, Value>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisteredUser {
    pub id: Option<Value>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl RegisteredUser {
    /// The user id as stored: numbers and strings verbatim, anything else
    /// empty.
    pub fn id_string(&self) -> String {
        match &self.id {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }
}

/// The error body of a failed request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Option<Map<String, Value>>,
    pub error: Option<String>,
}

impl ErrorEnvelope {
    /// Parses an error body, treating anything unparseable as empty.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

/// A card as the backend stores it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCard {
    pub id: i64,
    pub front: String,
    pub back: String,
}

#[derive(Serialize)]
pub struct CardPayload<'a> {
    pub front: &'a str,
    pub back: &'a str,
}

/// Response to creating or updating a card.
#[derive(Debug, Deserialize)]
pub struct CardEnvelope {
    #[serde(default)]
    pub ok: bool,
    pub card: Option<RemoteCard>,
    pub error: Option<String>,
}

impl CardEnvelope {
    pub fn into_result(self) -> Result<RemoteCard, ApiError> {
        match (self.ok, self.card) {
            (true, Some(card)) => Ok(card),
            _ => Err(ApiError::Rejected(
                self.error
                    .unwrap_or_else(|| "the server did not return a card".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
}

/// Flattens `{field: [messages]}` into one list, preserving the server's
/// field order.
pub fn flatten_messages(errors: &Map<String, Value>) -> Vec<String> {
    let mut messages = Vec::new();
    for value in errors.values() {
        match value {
            Value::Array(items) => {
                for item in items {
                    messages.push(message_text(item));
                }
            }
            other => messages.push(message_text(other)),
        }
    }
    messages
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
