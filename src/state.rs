use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::ai::gemini::GeminiProvider;
use crate::services::ai::quota::{MeteredProvider, QuotaTracker};
use crate::services::ai::LlmProvider;
use crate::services::booking::BookingStore;
use crate::services::conversation::DialogueEngine;
use crate::services::hybrid::HybridQa;
use crate::services::web::WebSearcher;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    /// Metered model client; `None` when no API key is configured.
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub llm_quota: Arc<QuotaTracker>,
    pub web_quota: Arc<QuotaTracker>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let llm_quota = Arc::new(QuotaTracker::new("Gemini", config.gemini_daily_quota));
        let web_quota = Arc::new(QuotaTracker::new("Web", config.web_daily_quota));

        let mut state = Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            llm: None,
            llm_quota,
            web_quota,
        };

        if state.config.require_llm().is_ok() {
            tracing::info!(model = %state.config.gemini_model, "using Gemini provider");
            let gemini = GeminiProvider::new(
                state.config.gemini_api_key.clone(),
                state.config.gemini_model.clone(),
            );
            state = state.with_llm(Arc::new(gemini));
        }
        state
    }

    /// Replace the model client. Calls through it still count against the
    /// model quota.
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(Arc::new(MeteredProvider::new(llm, Arc::clone(&self.llm_quota))));
        self
    }

    pub fn booking_store(&self) -> BookingStore {
        BookingStore::new(Arc::clone(&self.db))
    }

    pub fn dialogue_engine(&self) -> DialogueEngine {
        DialogueEngine::new(self.booking_store())
    }

    /// Question answering over documents. Web fallback is enabled only when
    /// search credentials are configured.
    pub fn hybrid_qa(&self) -> Result<HybridQa, AppError> {
        let llm = self.llm.clone().ok_or_else(|| {
            AppError::Config("GEMINI_API_KEY must be set to answer document questions".to_string())
        })?;

        let web = match self.config.require_web_search() {
            Ok(()) => Some(WebSearcher::new(
                self.config.google_api_key.clone(),
                self.config.google_cse_id.clone(),
                Arc::clone(&llm),
                Arc::clone(&self.web_quota),
            )),
            Err(e) => {
                tracing::debug!(reason = %e, "web fallback disabled");
                None
            }
        };

        Ok(HybridQa::new(llm, web))
    }
}
