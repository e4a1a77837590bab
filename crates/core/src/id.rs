// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types for runs and steps

use chrono::{DateTime, Utc};

/// Trait for truncating identifiers to a short prefix.
pub trait ShortId {
    /// Returns a string slice truncated to at most `n` characters.
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        if self.len() <= n {
            self
        } else {
            &self[..n]
        }
    }
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`,
/// `From<&str>`, `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>`
/// implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one pipeline run.
    ///
    /// Format: `<pipeline-name>-<yyyymmddHHMMSS>-<nonce>` (see [`RunId::mint`]).
    pub struct RunId;
}

define_id! {
    /// Identifier of a step within a pipeline definition.
    pub struct StepId;
}

impl RunId {
    /// Mint a fresh run ID for a pipeline.
    ///
    /// The pipeline name is sanitized to lowercase alphanumerics-and-hyphens,
    /// the timestamp is UTC second precision, and the nonce is the first
    /// 8 hex chars of a v4 UUID.
    pub fn mint(pipeline_name: &str, now: DateTime<Utc>) -> Self {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        Self::mint_with_nonce(pipeline_name, now, nonce.short(8))
    }

    /// Mint with an explicit nonce (deterministic variant for tests).
    pub fn mint_with_nonce(pipeline_name: &str, now: DateTime<Utc>, nonce: &str) -> Self {
        Self(format!(
            "{}-{}-{}",
            sanitize_name(pipeline_name),
            now.format("%Y%m%d%H%M%S"),
            nonce
        ))
    }
}

/// Sanitize a pipeline name for use as a run-ID component.
///
/// Lowercases, maps every non-alphanumeric character to `-`, and collapses
/// runs of hyphens. An empty result falls back to `"pipeline"`.
pub fn sanitize_name(name: &str) -> String {
    let mapped: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '-',
        })
        .collect();

    let collapsed = mapped
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if collapsed.is_empty() {
        "pipeline".to_string()
    } else {
        collapsed
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
