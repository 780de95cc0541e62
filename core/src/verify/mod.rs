//! Claim verification and answer repair on top of the knowledge base.
//!
//! The [`Verifier`] retrieves the passages most similar to a claim, asks a
//! [`LanguageModel`] to judge a proposed answer against them, and parses the model's JSON
//! verdict into a [`VerificationReport`]. [`Verifier::fix`] asks the model to rewrite a
//! failed answer so that it complies with the retrieved rules.
//!
//! External failures degrade instead of aborting: a transient embedding failure during
//! retrieval leaves the prompt without reference context, and a failed model call is
//! replaced by [`NO_RESPONSE`]. Unparseable model output yields a report with verdict
//! `"ERROR"`. Data-integrity problems (a corrupt store, a dimensionality mismatch) are
//! returned as [`VerifyError`].

mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    chat::LanguageModel,
    search::ScoredEntry,
    store::{DocumentStore, StoreError},
};

/// Text substituted for the model's output when the model call fails.
pub const NO_RESPONSE: &str = "No response from the language model.";

/// Verdict used when the model's output cannot be parsed.
pub const ERROR_VERDICT: &str = "ERROR";

const DEFAULT_VERIFY_LIMIT: usize = 3;
const DEFAULT_FIX_LIMIT: usize = 2;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Context retrieval failed")]
    Retrieval(#[from] StoreError),
}

/// A claim, the answer to check, and optional user constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(alias = "spec")]
    pub claim: String,
    pub answer: String,
    #[serde(default)]
    pub rules: String,
}

/// One agent's finding within a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFinding {
    pub name: String,
    /// `"danger"`, `"warning"` or `"success"`.
    pub status: String,
    pub log: String,
}

/// The verdict on a proposed answer.
///
/// Keys the model returns beyond the known fields are kept in `extra` and serialized
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    #[serde(default)]
    pub agents: Vec<AgentFinding>,
    pub final_verdict: String,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub summary: String,
    /// Previews of the passages the verdict was based on.
    #[serde(default)]
    pub rag_sources: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerificationReport {
    /// The report returned when the model output is not a valid verdict.
    pub fn parse_failure(raw: impl Into<String>) -> Self {
        Self {
            agents: vec![AgentFinding {
                name: "System".to_string(),
                status: "danger".to_string(),
                log: "JSON Error".to_string(),
            }],
            final_verdict: ERROR_VERDICT.to_string(),
            confidence_score: 0.0,
            summary: raw.into(),
            rag_sources: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.final_verdict == ERROR_VERDICT
    }

    /// Parses model output, tolerating Markdown code fences around the JSON.
    ///
    /// `rag_sources` is always replaced by `sources`. Output that is not a JSON verdict
    /// yields [`VerificationReport::parse_failure`] with the raw text as summary.
    pub fn from_model_output(raw: &str, sources: Vec<String>) -> Self {
        let cleaned = raw.replace("```json", "").replace("```", "");
        match serde_json::from_str::<VerificationReport>(cleaned.trim()) {
            Ok(mut report) => {
                report.rag_sources = sources;
                report
            }
            Err(e) => {
                warn!(error = %e, "Model output is not a valid verdict");
                Self::parse_failure(raw)
            }
        }
    }
}

/// A rewritten answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixResult {
    pub fixed_solution: String,
}

/// Runs verification and repair requests against a language model, optionally grounded
/// in a [`DocumentStore`].
pub struct Verifier {
    store: Option<Arc<DocumentStore>>,
    model: Arc<dyn LanguageModel>,
    verify_limit: usize,
    fix_limit: usize,
}

impl Verifier {
    /// Creates a verifier without a knowledge base. Prompts state that no reference
    /// standards were found.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            store: None,
            model,
            verify_limit: DEFAULT_VERIFY_LIMIT,
            fix_limit: DEFAULT_FIX_LIMIT,
        }
    }

    pub fn with_store(mut self, store: Arc<DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Number of passages retrieved for [`Verifier::verify`] (default 3).
    pub fn verify_limit(mut self, limit: usize) -> Self {
        self.verify_limit = limit;
        self
    }

    /// Number of passages retrieved for [`Verifier::fix`] (default 2).
    pub fn fix_limit(mut self, limit: usize) -> Self {
        self.fix_limit = limit;
        self
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    #[instrument(skip_all, fields(model = self.model.model_name()))]
    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerificationReport, VerifyError> {
        let results = self.retrieve(&request.claim, self.verify_limit).await?;
        let context = context_or_placeholder(&results);
        let raw = self.generate(&prompt::verification(request, &context)).await;
        let report = VerificationReport::from_model_output(&raw, prompt::source_previews(&results));
        info!(verdict = %report.final_verdict, confidence = report.confidence_score, "Verification complete");
        Ok(report)
    }

    #[instrument(skip_all, fields(model = self.model.model_name()))]
    pub async fn fix(&self, request: &VerifyRequest) -> Result<FixResult, VerifyError> {
        let results = self.retrieve(&request.claim, self.fix_limit).await?;
        let context = prompt::format_context(&results);
        let fixed_solution = self.generate(&prompt::fix(request, &context)).await;
        Ok(FixResult { fixed_solution })
    }

    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<ScoredEntry>, VerifyError> {
        let Some(store) = &self.store else {
            debug!("No knowledge base configured");
            return Ok(Vec::new());
        };
        match store.search(query, limit).await {
            Ok(results) => {
                debug!(results = results.len(), "Retrieved context");
                Ok(results)
            }
            Err(StoreError::Embedding(e)) if e.is_transient() => {
                warn!(error = %e, "Retrieval unavailable, continuing without context");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn generate(&self, prompt: &str) -> String {
        match self.model.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Language model call failed");
                NO_RESPONSE.to_string()
            }
        }
    }
}

fn context_or_placeholder(results: &[ScoredEntry]) -> String {
    if results.is_empty() {
        prompt::NO_CONTEXT.to_string()
    } else {
        prompt::format_context(results)
    }
}
