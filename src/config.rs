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

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Fallible;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const API_BASE_ENV: &str = "FLASHDECK_API_BASE";
const CONFIG_FILE_NAME: &str = "flashdeck.toml";
const SESSION_FILE_NAME: &str = "session.json";

/// The contents of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_base: Option<String>,
    session_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub session_file: PathBuf,
}

/// Sources consulted when building a [`Config`]. Later sources win: file,
/// then environment, then flag.
#[derive(Debug, Default)]
pub struct ConfigSources {
    pub file: Option<PathBuf>,
    pub env_api_base: Option<String>,
    pub flag_api_base: Option<String>,
    pub flag_session_file: Option<PathBuf>,
}

impl ConfigSources {
    /// Sources for the running process: the explicit config path, or the
    /// default one if it exists, plus the environment.
    pub fn from_env(
        file: Option<PathBuf>,
        flag_api_base: Option<String>,
        flag_session_file: Option<PathBuf>,
    ) -> Self {
        let file = file.or_else(|| {
            let default = config_dir().join(CONFIG_FILE_NAME);
            default.exists().then_some(default)
        });
        Self {
            file,
            env_api_base: std::env::var(API_BASE_ENV).ok(),
            flag_api_base,
            flag_session_file,
        }
    }
}

impl Config {
    pub fn resolve(sources: ConfigSources) -> Fallible<Self> {
        let file: ConfigFile = match &sources.file {
            Some(path) => load_file(path)?,
            None => ConfigFile::default(),
        };
        let api_base = sources
            .flag_api_base
            .or(sources.env_api_base.filter(|s| !s.trim().is_empty()))
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = api_base.trim().trim_end_matches('/').to_string();
        let session_file = sources
            .flag_session_file
            .or(file.session_file)
            .unwrap_or_else(|| config_dir().join(SESSION_FILE_NAME));
        log::debug!("Using API base {api_base}");
        Ok(Self {
            api_base,
            session_file,
        })
    }
}

fn load_file(path: &Path) -> Fallible<ConfigFile> {
    log::debug!("Loading config from {}", path.display());
    let content = read_to_string(path)?;
    let file: ConfigFile = toml::from_str(&content)?;
    Ok(file)
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flashdeck")
}
