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

use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An authenticated call was attempted without a stored token. This is a
    /// caller bug, not a user-facing condition.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The server answered 401. The session has already been cleared.
    #[error("authentication error: the access token is invalid")]
    Unauthorized,

    /// Field-level validation messages, flattened in field order.
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    /// The server answered 2xx but with `ok: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("server responded with {status}")]
    Status { status: StatusCode, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}
