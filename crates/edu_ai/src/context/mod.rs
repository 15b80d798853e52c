//! Context assembly: retrieved passages + prior turns → one bounded generation request.

use std::collections::BTreeMap;

use edu_core::domain::ConversationTurn;
use edu_core::error::{codes, AppError};

use crate::guardrails::BASE_POLICY;
use crate::index::RetrievalResult;
use crate::llm::{ChatMessage, ChatRole, GenerationRequest};

pub const PASSAGE_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub passages_used: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_context_chars: usize,
    pub max_history_turns: usize,
}

/// Join passages best-first until the next one would overflow `max_chars`.
///
/// If the best passage alone is over budget it is cut at a char boundary rather than
/// dropped, so a non-empty retrieval never yields an empty context.
pub fn assemble_context(retrieved: &RetrievalResult, max_chars: usize) -> AssembledContext {
    let sep_len = PASSAGE_SEPARATOR.chars().count();
    let mut text = String::new();
    let mut used_chars = 0usize;
    let mut passages_used = 0usize;

    for hit in &retrieved.hits {
        let passage = hit.text.trim();
        let len = passage.chars().count();
        if passages_used == 0 {
            if len > max_chars {
                text.extend(passage.chars().take(max_chars));
                passages_used = 1;
                break;
            }
        } else if used_chars + sep_len + len > max_chars {
            break;
        } else {
            text.push_str(PASSAGE_SEPARATOR);
            used_chars += sep_len;
        }
        text.push_str(passage);
        used_chars += len;
        passages_used += 1;
    }

    AssembledContext {
        text,
        passages_used,
    }
}

/// Interpolate `{name}` placeholders. Substituted values are not re-scanned, so braces
/// inside course text or user input pass through untouched.
pub fn render_template(template: &str, vars: &BTreeMap<&str, String>) -> Result<String, AppError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_lowercase() || c == '_'))
            .unwrap_or(after.len());
        if name_len > 0 && after[name_len..].starts_with('}') {
            let name = &after[..name_len];
            let value = vars.get(name).ok_or_else(|| {
                AppError::new(codes::CONFIG_INVALID, "Prompt template references an unknown variable")
                    .with_details(format!("variable={name}"))
            })?;
            out.push_str(value);
            rest = &after[name_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Build the request: fixed policy (+ mode addendum) as the system message, the most
/// recent `max_history_turns` prior turns verbatim, then the rendered instruction.
///
/// `{context}` and `{passage_count}` are always available to the template.
pub fn assemble(
    retrieved: &RetrievalResult,
    history: &[ConversationTurn],
    template: &str,
    vars: &BTreeMap<&str, String>,
    mode_policy: &str,
    limits: ContextLimits,
) -> Result<(GenerationRequest, AssembledContext), AppError> {
    let context = assemble_context(retrieved, limits.max_context_chars);

    let mut all_vars = vars.clone();
    all_vars.insert("context", context.text.clone());
    all_vars.insert("passage_count", context.passages_used.to_string());
    let instruction = render_template(template, &all_vars)?;

    let system = if mode_policy.trim().is_empty() {
        BASE_POLICY.to_string()
    } else {
        format!("{BASE_POLICY}\n\n{}", mode_policy.trim())
    };

    let skip = history.len().saturating_sub(limits.max_history_turns);
    let mut messages = Vec::with_capacity(2 + history.len() - skip);
    messages.push(ChatMessage::new(ChatRole::System, system));
    messages.extend(
        history[skip..]
            .iter()
            .map(|t| ChatMessage::new(t.role.into(), t.text.clone())),
    );
    messages.push(ChatMessage::new(ChatRole::User, instruction));

    Ok((GenerationRequest { messages }, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RetrievedPassage;
    use edu_core::domain::Provenance;
    use pretty_assertions::assert_eq;

    fn result(texts: &[&str]) -> RetrievalResult {
        RetrievalResult {
            hits: texts
                .iter()
                .enumerate()
                .map(|(i, t)| RetrievedPassage {
                    chunk_id: format!("c{i}"),
                    text: t.to_string(),
                    score: 1.0 - i as f32 * 0.1,
                    provenance: Provenance {
                        source: "l.pdf".to_string(),
                        path: "data/l.pdf".to_string(),
                        page: Some(1),
                        offset: 0,
                    },
                })
                .collect(),
        }
    }

    fn limits(max_context_chars: usize, max_history_turns: usize) -> ContextLimits {
        ContextLimits {
            max_context_chars,
            max_history_turns,
        }
    }

    #[test]
    fn passages_keep_retrieval_order_with_separator() {
        let ctx = assemble_context(&result(&["best", "second", "third"]), 1000);
        assert_eq!(ctx.text, "best\n---\nsecond\n---\nthird");
        assert_eq!(ctx.passages_used, 3);
    }

    #[test]
    fn budget_stops_before_overflow() {
        let ctx = assemble_context(&result(&["aaaa", "bbbb", "cccc"]), 14);
        assert_eq!(ctx.text, "aaaa\n---\nbbbb");
        assert_eq!(ctx.passages_used, 2);
    }

    #[test]
    fn oversized_first_passage_is_truncated_on_char_boundary() {
        let ctx = assemble_context(&result(&["жжжжжжжж", "x"]), 3);
        assert_eq!(ctx.text, "жжж");
        assert_eq!(ctx.passages_used, 1);
    }

    #[test]
    fn template_rendering() {
        let mut vars = BTreeMap::new();
        vars.insert("topic", "regression {not a var}".to_string());
        assert_eq!(
            render_template("Topic: {topic}. Set {1,2} and { x }.", &vars).expect("render"),
            "Topic: regression {not a var}. Set {1,2} and { x }."
        );
        let err = render_template("{missing}", &vars).expect_err("unknown");
        assert!(err.is(codes::CONFIG_INVALID));
    }

    #[test]
    fn request_layout_and_history_window() {
        let history = vec![
            ConversationTurn::user("first"),
            ConversationTurn::assistant("reply"),
            ConversationTurn::user("second"),
        ];
        let mut vars = BTreeMap::new();
        vars.insert("question", "What is ML?".to_string());

        let (req, ctx) = assemble(
            &result(&["Machine learning is a subfield of AI."]),
            &history,
            "Question: {question}\n\nContext ({passage_count}):\n{context}",
            &vars,
            "Answer as a tutor.",
            limits(1000, 2),
        )
        .expect("assemble");

        assert_eq!(ctx.passages_used, 1);
        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[0].role, ChatRole::System);
        assert!(req.messages[0].content.starts_with(BASE_POLICY));
        assert!(req.messages[0].content.ends_with("Answer as a tutor."));
        assert_eq!(req.messages[1], ChatMessage::new(ChatRole::Assistant, "reply"));
        assert_eq!(req.messages[2], ChatMessage::new(ChatRole::User, "second"));
        assert_eq!(
            req.last_user_text(),
            Some("Question: What is ML?\n\nContext (1):\nMachine learning is a subfield of AI.")
        );
    }
}
