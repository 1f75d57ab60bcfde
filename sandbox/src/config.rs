// Copyright 2025 eraflo
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

//! Sandbox configuration: command line and the optional `Lumen.toml`.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lumen_cache::CacheConfig;
use lumen_control::ServiceConfig;
use lumen_telemetry::{ProfilerConfig, SamplerConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Which device the sandbox pretends to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
    /// The machine running the sandbox, probed through sysinfo.
    Host,
    /// A low-end phone on a slow network with a draining battery.
    Weak,
    /// A desktop with a discrete GPU on a fast network.
    Strong,
}

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "sandbox")]
#[command(about = "Runs the adaptive quality loop against a simulated page")]
pub struct Cli {
    /// Path to a TOML configuration (defaults to `Lumen.toml` if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 20)]
    pub seconds: u64,

    /// Simulated device
    #[arg(short, long, value_enum, default_value_t = DeviceKind::Host)]
    pub device: DeviceKind,

    /// Degrade the frame rate and grow memory over time
    #[arg(long)]
    pub stress: bool,
}

/// Every tunable of the loop, as read from `Lumen.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    /// Capability profiler.
    pub profiler: ProfilerConfig,
    /// Telemetry sampler.
    pub sampler: SamplerConfig,
    /// Resource cache.
    pub cache: CacheConfig,
    /// Adaptive service and controller.
    pub service: ServiceConfig,
}

/// Loads the configuration from `path`, or from `Lumen.toml` in the working
/// directory. A missing default file yields the default configuration.
pub fn load(path: Option<&Path>) -> Result<LumenConfig> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from("Lumen.toml"), false),
    };

    if !explicit && !path.exists() {
        log::info!("Sandbox: no '{}' found, using defaults", path.display());
        return Ok(LumenConfig::default());
    }

    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file at '{}'", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("Failed to parse TOML from '{}'", path.display()))?;
    log::info!("Sandbox: loaded '{}'", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LumenConfig = toml::from_str(
            r#"
            [sampler]
            interval_ms = 500

            [service.controller]
            base_cooldown_ms = 4000
            "#,
        )
        .unwrap();

        assert_eq!(config.sampler.interval_ms, 500);
        assert_eq!(config.sampler.history_capacity, 60);
        assert_eq!(config.service.controller.base_cooldown_ms, 4000);
        assert_eq!(config.service.controller.max_adaptations, 3);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/Lumen.toml"))).is_err());
    }
}
