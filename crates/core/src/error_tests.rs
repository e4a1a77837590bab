// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn display_renders_class_and_message() {
    let err = WaveError::Contract("schema mismatch at /items".to_string());
    assert_eq!(err.to_string(), "ContractFailure: schema mismatch at /items");
    assert_eq!(WaveError::Cancelled.to_string(), "Cancelled");
}

#[parameterized(
    config = { WaveError::Config("x".into()), ErrorClass::ConfigError },
    workspace = { WaveError::Workspace("x".into()), ErrorClass::WorkspaceError },
    invocation = { WaveError::Invocation("x".into()), ErrorClass::InvocationError },
    contract = { WaveError::Contract("x".into()), ErrorClass::ContractFailure },
    relay = { WaveError::RelayExhausted("x".into()), ErrorClass::RelayExhausted },
    store = { WaveError::StateStore("x".into()), ErrorClass::StateStoreError },
    cancelled = { WaveError::Cancelled, ErrorClass::Cancelled },
)]
fn class_mapping(err: WaveError, class: ErrorClass) {
    assert_eq!(err.class(), class);
}

#[test]
fn retryability_follows_the_taxonomy() {
    assert!(WaveError::Contract("c".into()).is_step_retryable());
    assert!(WaveError::Invocation("i".into()).is_step_retryable());
    assert!(!WaveError::Workspace("w".into()).is_step_retryable());
    assert!(!WaveError::StateStore("s".into()).is_step_retryable());
    assert!(!WaveError::Cancelled.is_step_retryable());
}

#[test]
fn only_store_errors_are_run_fatal() {
    assert!(WaveError::StateStore("s".into()).is_fatal_for_run());
    assert!(!WaveError::Contract("c".into()).is_fatal_for_run());
    assert!(!WaveError::RelayExhausted("r".into()).is_fatal_for_run());
}
