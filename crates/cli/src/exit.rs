// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit codes and command error shaping

use wave_engine::EngineError;
use wave_manifest::ConfigError;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Command failures split into configuration problems (exit 2) and
/// everything else (exit 1).
#[derive(Debug)]
pub enum CommandError {
    Config(String),
    Other(anyhow::Error),
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        CommandError::Config(err.to_string())
    }
}

impl From<EngineError> for CommandError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config(inner) => CommandError::Config(inner.to_string()),
            EngineError::PipelineDisabled(_) | EngineError::UnknownFromStep(_) => {
                CommandError::Config(err.to_string())
            }
            other => CommandError::Other(anyhow::Error::new(other)),
        }
    }
}

impl From<wave_storage::StateStoreError> for CommandError {
    fn from(err: wave_storage::StateStoreError) -> Self {
        CommandError::Other(anyhow::Error::new(err))
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Other(err)
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Other(anyhow::Error::new(err))
    }
}
