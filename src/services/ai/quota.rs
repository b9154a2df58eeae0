//! Per-process call budgets for paid or rate-limited services.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{LlmProvider, Message};
use crate::errors::AppError;

#[derive(Debug)]
pub struct QuotaTracker {
    label: String,
    limit: u32,
    used: AtomicU32,
}

impl QuotaTracker {
    pub fn new(label: impl Into<String>, limit: u32) -> Self {
        Self {
            label: label.into(),
            limit,
            used: AtomicU32::new(0),
        }
    }

    /// Spend one call, or fail once the budget is gone.
    pub fn try_acquire(&self) -> Result<(), AppError> {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .map(|_| ())
            .map_err(|_| self.exhausted())
    }

    /// Fail if no calls are left, without spending one.
    pub fn ensure_available(&self) -> Result<(), AppError> {
        if self.remaining() == 0 {
            return Err(self.exhausted());
        }
        Ok(())
    }

    fn exhausted(&self) -> AppError {
        AppError::QuotaExhausted {
            label: self.label.clone(),
            limit: self.limit,
        }
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used())
    }

    pub fn status(&self) -> String {
        format!("{} Quota: {}/{}", self.label, self.used(), self.limit)
    }
}

/// Provider wrapper that spends one unit of a quota per call.
pub struct MeteredProvider {
    inner: Arc<dyn LlmProvider>,
    quota: Arc<QuotaTracker>,
}

impl MeteredProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, quota: Arc<QuotaTracker>) -> Self {
        Self { inner, quota }
    }
}

#[async_trait]
impl LlmProvider for MeteredProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        self.quota.try_acquire()?;
        self.inner.chat(system_prompt, messages).await
    }
}
