// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared engine dependencies

use crate::events::EventBus;
use crate::workspace::WorkspaceManager;
use std::sync::Arc;
use wave_adapters::AdapterInvoker;
use wave_manifest::Manifest;
use wave_storage::StateStore;

/// Everything a component of the engine needs, threaded by handle.
#[derive(Clone)]
pub struct EngineContext {
    pub manifest: Arc<Manifest>,
    pub store: Arc<StateStore>,
    pub bus: Arc<EventBus>,
    pub invoker: Arc<dyn AdapterInvoker>,
    pub workspaces: Arc<WorkspaceManager>,
    /// Hex SHA-256 of the manifest file, recorded on every run.
    pub manifest_fingerprint: String,
}

impl EngineContext {
    pub fn new(
        manifest: Arc<Manifest>,
        store: Arc<StateStore>,
        bus: Arc<EventBus>,
        invoker: Arc<dyn AdapterInvoker>,
        manifest_fingerprint: String,
    ) -> Self {
        let workspaces = Arc::new(WorkspaceManager::new(
            manifest.runtime.workspace_root.clone(),
        ));
        Self {
            manifest,
            store,
            bus,
            invoker,
            workspaces,
            manifest_fingerprint,
        }
    }
}
