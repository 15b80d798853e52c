//! Relevance gate.
//!
//! The primary gate is prompt-level: the system policy tells the backend to answer only
//! from the supplied context and to reply with [`REFUSAL_SENTENCE`] otherwise. It is
//! advisory; nothing here can prove an answer is grounded. The optional similarity floor
//! is the only mechanical check.

use crate::index::RetrievalResult;

/// Fixed reply for out-of-scope or unsupported requests.
pub const REFUSAL_SENTENCE: &str = "This information is not present in the provided course materials.";

pub const BASE_POLICY: &str = r#"You are an educational assistant for a university course. The course materials (lectures, notes, worked examples, formulas, lab guides) are available to you only through the Context supplied with each request.

Rules (non-negotiable):
1) Use ONLY the supplied Context. Never add facts from outside knowledge, and do not guess.
2) If the request is outside the course domain, or the Context does not directly support a response, reply with exactly this sentence and nothing else:
   "This information is not present in the provided course materials."
3) Earlier turns of the conversation are background only. Decide whether you can respond using the Context of the latest request, not the conversation history.
4) Write academically and without filler. No emoji."#;

/// Drop hits scoring below `floor`. `None` keeps everything.
pub fn apply_similarity_floor(result: RetrievalResult, floor: Option<f32>) -> RetrievalResult {
    match floor {
        None => result,
        Some(min) => RetrievalResult {
            hits: result.hits.into_iter().filter(|h| h.score >= min).collect(),
        },
    }
}

/// True when the backend answered with the refusal sentence (quotes and trailing
/// whitespace tolerated).
pub fn is_refusal(output: &str) -> bool {
    let normalized = output
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\u{201c}' || c == '\u{201d}' || c == '\u{ab}' || c == '\u{bb}')
        .trim();
    normalized.eq_ignore_ascii_case(REFUSAL_SENTENCE)
        || normalized.eq_ignore_ascii_case(REFUSAL_SENTENCE.trim_end_matches('.'))
}
