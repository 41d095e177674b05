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

//! The session and everything that reads or writes it.

use reqwest::Method;
use reqwest::StatusCode;
use serde::Serialize;

use crate::api::LOGIN_PATH;
use crate::api::client::ApiClient;
use crate::api::client::ApiResponse;
use crate::api::error::ApiError;
use crate::api::types::Credentials;
use crate::api::types::ErrorEnvelope;
use crate::api::types::LoginEnvelope;
use crate::api::types::flatten_messages;
use crate::error::Fallible;
use crate::storage::ACCESS_TOKEN;
use crate::storage::SESSION_KEYS;
use crate::storage::Storage;
use crate::storage::TOKEN_TYPE;
use crate::storage::USER_EMAIL;
use crate::storage::USER_ID;
use crate::storage::USER_NAME;

pub const INVALID_CREDENTIALS: &str = "invalid credentials";
pub const COMMUNICATION_ERROR: &str = "communication error";
pub const LOGIN_FAILED: &str = "login failed";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// The client's view of who is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub email: String,
    pub display_name: String,
    /// The last login failure, for display.
    pub last_error: Option<String>,
}

/// Identity fields written to durable storage after a successful login or
/// registration.
pub struct StoredSession<'a> {
    pub access_token: &'a str,
    pub token_type: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub user_id: Option<&'a str>,
}

pub struct AuthManager {
    client: ApiClient,
    storage: Box<dyn Storage>,
    session: Session,
}

impl AuthManager {
    pub fn new(client: ApiClient, storage: Box<dyn Storage>) -> Self {
        Self {
            client,
            storage,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.logged_in
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN).filter(|token| !token.is_empty())
    }

    /// Marks the session logged in if a token is stored. The token is not
    /// checked against the server; the first authenticated call will find
    /// out.
    pub fn restore_session(&mut self) {
        if self.token().is_some() {
            self.session = Session {
                logged_in: true,
                email: self.storage.get(USER_EMAIL).unwrap_or_default(),
                display_name: self.storage.get(USER_NAME).unwrap_or_default(),
                last_error: None,
            };
            log::debug!("Restored session for {}", self.session.email);
        }
    }

    /// Attempts to log in. Failures land in [`Session::last_error`]; the
    /// envelope is returned whenever the server sent one.
    pub async fn login(&mut self, email: &str, password: &str) -> Option<LoginEnvelope> {
        self.session.last_error = None;
        let credentials = Credentials { email, password };
        let response = match self
            .client
            .send(Method::POST, LOGIN_PATH, Some(&credentials), None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::error!("Login request failed: {e}");
                self.session.last_error = Some(COMMUNICATION_ERROR.to_string());
                return None;
            }
        };
        if response.status == StatusCode::UNAUTHORIZED {
            self.session.last_error = Some(INVALID_CREDENTIALS.to_string());
            return None;
        }
        if !response.is_success() {
            log::error!("Login failed with status {}", response.status);
            self.session.last_error = Some(COMMUNICATION_ERROR.to_string());
            return None;
        }
        let envelope: LoginEnvelope = match response.json() {
            Ok(envelope) => envelope,
            Err(e) => {
                log::error!("Login response unreadable: {e}");
                self.session.last_error = Some(COMMUNICATION_ERROR.to_string());
                return None;
            }
        };
        match (envelope.ok, &envelope.access_token) {
            (true, Some(token)) => {
                let (user_email, user_name) = match &envelope.user {
                    Some(user) if !user.email.is_empty() => (user.email.as_str(), user.name.as_str()),
                    Some(user) => (email, user.name.as_str()),
                    None => (email, ""),
                };
                let stored = StoredSession {
                    access_token: token,
                    token_type: DEFAULT_TOKEN_TYPE,
                    email: user_email,
                    name: user_name,
                    user_id: None,
                };
                if let Err(e) = self.store_session(&stored) {
                    log::error!("Failed to persist session: {e}");
                    self.session.last_error = Some(e.message().to_string());
                    return None;
                }
            }
            (true, None) => {
                self.session.last_error = Some(LOGIN_FAILED.to_string());
            }
            (false, _) => {
                let message = envelope
                    .error
                    .clone()
                    .unwrap_or_else(|| LOGIN_FAILED.to_string());
                self.session.last_error = Some(message);
            }
        }
        Some(envelope)
    }

    /// Writes the identity keys and marks the session logged in. A missing
    /// user id removes any stale one.
    pub fn store_session(&mut self, stored: &StoredSession<'_>) -> Fallible<()> {
        self.storage.set(ACCESS_TOKEN, stored.access_token)?;
        self.storage.set(TOKEN_TYPE, stored.token_type)?;
        self.storage.set(USER_EMAIL, stored.email)?;
        self.storage.set(USER_NAME, stored.name)?;
        match stored.user_id {
            Some(id) => self.storage.set(USER_ID, id)?,
            None => self.storage.remove(USER_ID)?,
        }
        self.session = Session {
            logged_in: true,
            email: stored.email.to_string(),
            display_name: stored.name.to_string(),
            last_error: None,
        };
        log::debug!("Logged in as {}", stored.email);
        Ok(())
    }

    /// Forgets the session. Every owned key is removed even if an earlier
    /// removal fails; the first failure is returned.
    pub fn logout(&mut self) -> Fallible<()> {
        self.session = Session::default();
        let mut result = Ok(());
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                log::error!("Failed to remove {key}: {e}");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Sends a request carrying the stored bearer token. A 401 logs the
    /// session out before the error reaches the caller.
    pub async fn authenticated_request<B: Serialize + ?Sized>(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, ApiError> {
        let token = self.token().ok_or(ApiError::NotAuthenticated)?;
        let response = self.client.send(method, path, body, Some(&token)).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            log::error!("Authentication error: the access token is invalid");
            if let Err(e) = self.logout() {
                log::error!("Failed to clear session: {e}");
            }
            return Err(ApiError::Unauthorized);
        }
        if !response.is_success() {
            if let Some(errors) = ErrorEnvelope::parse(&response.body).errors {
                return Err(ApiError::Validation(flatten_messages(&errors)));
            }
            return Err(ApiError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    pub async fn authenticated_empty(
        &mut self,
        method: Method,
        path: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.authenticated_request::<()>(method, path, None).await
    }
}
