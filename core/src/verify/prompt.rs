use crate::search::ScoredEntry;

use super::VerifyRequest;

pub(crate) const NO_CONTEXT: &str = "No official standards found.";

const SOURCE_PREVIEW_CHARS: usize = 100;

/// Renders retrieved passages as a bullet list with their sources, one per line.
pub(crate) fn format_context(results: &[ScoredEntry]) -> String {
    results
        .iter()
        .map(|r| format!("- {} [SOURCE: {}]", r.entry.text, r.entry.source()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Short `"<source>: <first 100 chars>..."` previews of retrieved passages.
pub(crate) fn source_previews(results: &[ScoredEntry]) -> Vec<String> {
    results
        .iter()
        .map(|r| {
            let preview: String = r.entry.text.chars().take(SOURCE_PREVIEW_CHARS).collect();
            format!("{}: {}...", r.entry.source(), preview)
        })
        .collect()
}

pub(crate) fn verification(request: &VerifyRequest, context: &str) -> String {
    format!(
        r#"You are TruthForge, a verification engine for claims from any domain
(law, engineering, medicine, finance and others).

## Claim
{claim}

## Proposed answer
{answer}

## User constraints
{rules}

## Reference standards
{context}

## Task
Determine which domain the claim belongs to. Check the proposed answer against the
reference standards and the user constraints. The Falsifier agent rejects answers that
are fabricated, factually wrong or unsafe. The Compliance agent cites any named standard
(such as GDPR, ISO or HIPAA) that the answer violates, using the [SOURCE] tags above.
Rate your confidence from 0 to 100.

## Output
Reply with a single JSON object and nothing else:
{{
  "agents": [
    {{ "name": "Falsifier", "status": "danger|warning|success", "log": "..." }},
    {{ "name": "Compliance", "status": "danger|warning|success", "log": "..." }}
  ],
  "final_verdict": "PASS|FAIL",
  "confidence_score": 0,
  "summary": "One or two sentences, naming the detected domain."
}}"#,
        claim = request.claim,
        answer = request.answer,
        rules = request.rules,
        context = context,
    )
}

pub(crate) fn fix(request: &VerifyRequest, context: &str) -> String {
    format!(
        r#"You are a senior compliance engineer. The proposed answer below failed
verification. Rewrite it so that it satisfies the query and the official rules.

## Query
{claim}

## Failed answer
{answer}

## User constraints
{rules}

## Official rules
{context}

## Output
Return only the corrected answer as plain text, not JSON. Name the standard the
corrected answer follows. Keep it professional and direct."#,
        claim = request.claim,
        answer = request.answer,
        rules = request.rules,
        context = context,
    )
}
