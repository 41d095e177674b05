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

use reqwest::Method;
use serde::Serialize;

use crate::api::REGISTER_PATH;
use crate::api::client::ApiResponse;
use crate::api::types::ErrorEnvelope;
use crate::api::types::RegisterEnvelope;
use crate::api::types::flatten_messages;
use crate::auth::AuthManager;
use crate::auth::COMMUNICATION_ERROR;
use crate::auth::DEFAULT_TOKEN_TYPE;
use crate::auth::StoredSession;

pub const LANDING_ROUTE: &str = "/";
pub const REGISTRATION_FAILED: &str = "registration failed";

#[derive(Debug, Clone, Serialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// State of the sign-up form.
#[derive(Debug, Default)]
pub struct Registration {
    loading: bool,
    errors: Vec<String>,
    success: bool,
    redirect: Option<&'static str>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    /// Where to go next. Only set once the account has been created.
    pub fn redirect(&self) -> Option<&'static str> {
        self.redirect
    }

    pub async fn register(&mut self, auth: &mut AuthManager, form: &RegisterForm) {
        self.loading = true;
        self.errors.clear();
        self.success = false;
        self.redirect = None;

        let result = auth
            .client()
            .send(Method::POST, REGISTER_PATH, Some(form), None)
            .await;
        match result {
            Ok(response) if response.is_success() => self.accept(auth, form, &response),
            Ok(response) => {
                log::error!("Registration failed with status {}", response.status);
                let envelope = ErrorEnvelope::parse(&response.body);
                self.errors = match (envelope.errors, envelope.error) {
                    (Some(errors), _) => flatten_messages(&errors),
                    (None, Some(error)) => vec![error],
                    (None, None) => vec![COMMUNICATION_ERROR.to_string()],
                };
            }
            Err(e) => {
                log::error!("Registration request failed: {e}");
                self.errors = vec![COMMUNICATION_ERROR.to_string()];
            }
        }

        self.loading = false;
    }

    fn accept(&mut self, auth: &mut AuthManager, form: &RegisterForm, response: &ApiResponse) {
        let envelope: RegisterEnvelope = match response.json() {
            Ok(envelope) => envelope,
            Err(e) => {
                log::error!("Registration response unreadable: {e}");
                self.errors = vec![COMMUNICATION_ERROR.to_string()];
                return;
            }
        };
        if envelope.ok {
            if let Some(token) = &envelope.access_token {
                let user = envelope.user.clone().unwrap_or_default();
                let user_id = user.id_string();
                let stored = StoredSession {
                    access_token: token,
                    token_type: envelope.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE),
                    email: user
                        .email
                        .as_deref()
                        .filter(|s| !s.is_empty())
                        .unwrap_or(form.email.as_str()),
                    name: user
                        .name
                        .as_deref()
                        .filter(|s| !s.is_empty())
                        .unwrap_or(form.name.as_str()),
                    user_id: Some(&user_id),
                };
                if let Err(e) = auth.store_session(&stored) {
                    log::error!("Failed to persist session: {e}");
                    self.errors = vec![e.message().to_string()];
                    return;
                }
            }
            self.success = true;
            self.redirect = Some(LANDING_ROUTE);
        } else if let Some(errors) = &envelope.errors {
            self.errors = flatten_messages(errors);
        } else {
            self.errors = vec![
                envelope
                    .error
                    .unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
            ];
        }
    }
}
