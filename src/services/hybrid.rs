//! Document-first question answering with web fallback.
//!
//! A question is answered from the loaded document when possible. If the
//! model reports that the document does not cover it, the named entities in
//! the question are looked up individually: the document supplies what it
//! can and the web fills in the rest.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::services::ai::{self, LlmProvider};
use crate::services::documents::{self, DocumentIndex};
use crate::services::web::WebSearcher;

const NOT_COVERED_MARKERS: [&str; 2] = ["not in the text", "not mentioned"];

static CAPITALIZED_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+").unwrap());
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static INTRODUCED_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:called|named|termed)\s+([^\s,.]+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Document,
    Web,
    Blended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridAnswer {
    pub text: String,
    pub source: AnswerSource,
}

/// Terms in a question worth looking up on their own.
pub fn extract_entities(question: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    let mut push = |entity: &str| {
        let entity = entity.trim();
        if !entity.is_empty() && !entities.iter().any(|e| e == entity) {
            entities.push(entity.to_string());
        }
    };

    for m in CAPITALIZED_PHRASE.find_iter(question) {
        push(m.as_str());
    }
    for caps in QUOTED.captures_iter(question) {
        push(&caps[1]);
    }
    for caps in INTRODUCED_TERM.captures_iter(question) {
        push(&caps[1]);
    }
    entities
}

/// Whether the model said the document does not answer the question.
pub fn is_not_covered(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    NOT_COVERED_MARKERS.iter().any(|marker| lower.contains(marker))
}

pub struct HybridQa {
    llm: Arc<dyn LlmProvider>,
    web: Option<WebSearcher>,
}

impl HybridQa {
    pub fn new(llm: Arc<dyn LlmProvider>, web: Option<WebSearcher>) -> Self {
        Self { llm, web }
    }

    pub fn web(&self) -> Option<&WebSearcher> {
        self.web.as_ref()
    }

    pub async fn answer(
        &self,
        index: &DocumentIndex,
        question: &str,
    ) -> anyhow::Result<HybridAnswer> {
        let context = index.retrieve(question, 1);
        let document_answer = documents::ask_document(
            self.llm.as_ref(),
            &format!("Answer this based ONLY on the context: {question}"),
            &context,
        )
        .await?;

        let Some(web) = self.web.as_ref() else {
            return Ok(HybridAnswer {
                text: document_answer,
                source: AnswerSource::Document,
            });
        };
        if !is_not_covered(&document_answer) {
            return Ok(HybridAnswer {
                text: document_answer,
                source: AnswerSource::Document,
            });
        }

        let entities = extract_entities(question);
        if entities.is_empty() {
            tracing::info!("answer not in document, searching the web");
            return Ok(HybridAnswer {
                text: web.search_and_summarize(question, 3).await?,
                source: AnswerSource::Web,
            });
        }

        let mut blended = format!("PDF CONTEXT:\n{context}\n\n");
        for entity in &entities {
            let entity_context = index.retrieve(entity, 1);
            if entity_context.is_empty() {
                tracing::info!(entity = %entity, "entity not in document, searching the web");
                let web_info = web.search_and_summarize(entity, 1).await?;
                blended.push_str(&format!("WEB INFO ABOUT '{entity}':\n{web_info}\n\n"));
            } else {
                blended.push_str(&format!("PDF INFO ABOUT '{entity}':\n{entity_context}\n\n"));
            }
        }

        let prompt = format!(
            "Comprehensively answer this question: {question}\n\n\
             Use all available information below. \
             Highlight key points and differences where applicable. \
             Clearly indicate which information comes from the PDF \
             and which comes from web sources.\n\n\
             {blended}"
        );
        Ok(HybridAnswer {
            text: ai::ask(self.llm.as_ref(), &prompt).await?,
            source: AnswerSource::Blended,
        })
    }
}
