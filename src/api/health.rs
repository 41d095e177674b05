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

use crate::api::HEALTH_PATH;
use crate::api::client::ApiClient;
use crate::api::error::ApiError;
use crate::api::types::HealthReport;

pub const HEALTH_ERROR: &str = "error";

/// Probes the backend. Never fails: any problem is logged and reported as
/// status `error`.
pub async fn check_health(client: &ApiClient) -> HealthReport {
    match fetch_health(client).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Health check failed: {e}");
            HealthReport {
                status: HEALTH_ERROR.to_string(),
            }
        }
    }
}

async fn fetch_health(client: &ApiClient) -> Result<HealthReport, ApiError> {
    let response = client.send_empty(Method::GET, HEALTH_PATH, None).await?;
    if !response.is_success() {
        return Err(ApiError::Status {
            status: response.status,
            body: response.body,
        });
    }
    response.json()
}
