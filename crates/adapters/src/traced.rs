// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced invoker wrapper for consistent observability

use crate::{AdapterInvoker, InvokeControl, InvokeError, InvokeRequest, InvokeResult};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any AdapterInvoker
#[derive(Clone)]
pub struct TracedInvoker<I> {
    inner: I,
}

impl<I> TracedInvoker<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<I: AdapterInvoker> AdapterInvoker for TracedInvoker<I> {
    async fn invoke(
        &self,
        request: InvokeRequest,
        ctl: InvokeControl,
    ) -> Result<InvokeResult, InvokeError> {
        let span = tracing::info_span!(
            "adapter.invoke",
            step = %request.step_id,
            persona = %request.persona,
            binary = %request.binary,
        );
        async {
            tracing::info!(
                prompt_len = request.user_prompt.len(),
                timeout_secs = request.timeout.as_secs(),
                "starting"
            );
            let start = std::time::Instant::now();
            let result = self.inner.invoke(request, ctl).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(r) => tracing::info!(
                    elapsed_ms,
                    exit_code = r.exit_code,
                    tokens = r.tokens_used.total(),
                    artifacts = r.artifacts.len(),
                    stop = ?r.stop,
                    "completed"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
