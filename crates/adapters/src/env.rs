// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process environment filtering
//!
//! Adapter children start from an empty environment; only the manifest's
//! `env_passthrough` names, a small base set the binary needs to run, and
//! well-known credential variables are forwarded. Credentials are passed
//! through the environment only, never written to disk.

/// Always forwarded when present; a child process cannot exec or resolve
/// its config without these.
const BASE_VARS: &[&str] = &["PATH", "HOME", "LANG", "TMPDIR", "TERM"];

/// Well-known credential variables forwarded from the ambient environment.
const CREDENTIAL_VARS: &[&str] = &[
    "ANTHROPIC_API_KEY",
    "CLAUDE_CODE_OAUTH_TOKEN",
    "OPENAI_API_KEY",
];

/// Build the child environment: base vars, credentials, the manifest's
/// passthrough list, then explicit extras (highest precedence).
pub fn filtered_env(
    passthrough: &[String],
    extra: &[(String, String)],
) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = Vec::new();

    let mut push_ambient = |name: &str| {
        if env.iter().any(|(k, _)| k == name) {
            return;
        }
        if let Ok(value) = std::env::var(name) {
            env.push((name.to_string(), value));
        }
    };

    for name in BASE_VARS {
        push_ambient(name);
    }
    for name in CREDENTIAL_VARS {
        push_ambient(name);
    }
    for name in passthrough {
        push_ambient(name);
    }

    for (key, value) in extra {
        if let Some(existing) = env.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.clone();
        } else {
            env.push((key.clone(), value.clone()));
        }
    }

    env
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
