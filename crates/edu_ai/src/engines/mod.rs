//! Ask / Quiz / Task engines.
//!
//! Each mode is the same three steps: retrieve, assemble, invoke. Engines hold no mutable
//! state; one `QueryEngines` can serve concurrent callers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use edu_core::config::RetrievalConfig;
use edu_core::domain::ConversationTurn;
use edu_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::{assemble, ContextLimits};
use crate::guardrails::{apply_similarity_floor, is_refusal, REFUSAL_SENTENCE};
use crate::llm::GenerationBackend;
use crate::retrieve::{RetrievedPassage, Retriever};

pub mod prompts;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Ask,
    Quiz,
    Task,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Quiz => "quiz",
            Self::Task => "task",
        }
    }

    pub fn default_k(&self, cfg: &RetrievalConfig) -> usize {
        match self {
            Self::Ask => cfg.ask_k,
            Self::Quiz => cfg.quiz_k,
            Self::Task => cfg.task_k,
        }
    }

    fn policy(&self) -> &'static str {
        match self {
            Self::Ask => prompts::ASK_POLICY,
            Self::Quiz => prompts::QUIZ_POLICY,
            Self::Task => prompts::TASK_POLICY,
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Self::Ask => prompts::ASK_TEMPLATE,
            Self::Quiz => prompts::QUIZ_TEMPLATE,
            Self::Task => prompts::TASK_TEMPLATE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub refused: bool,
    pub passages: Vec<RetrievedPassage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResponse {
    pub topic: String,
    pub questions: String,
    pub refused: bool,
    pub passages: Vec<RetrievedPassage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResponse {
    pub topic: String,
    pub task: String,
    pub refused: bool,
    pub passages: Vec<RetrievedPassage>,
}

struct Outcome {
    text: String,
    refused: bool,
    passages: Vec<RetrievedPassage>,
}

#[derive(Clone)]
pub struct QueryEngines {
    retriever: Retriever,
    backend: Arc<dyn GenerationBackend>,
    cfg: RetrievalConfig,
}

impl QueryEngines {
    pub fn new(retriever: Retriever, backend: Arc<dyn GenerationBackend>, cfg: RetrievalConfig) -> Self {
        Self {
            retriever,
            backend,
            cfg,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn ask(
        &self,
        question: &str,
        k: Option<usize>,
        history: &[ConversationTurn],
    ) -> Result<AskResponse, AppError> {
        let question = question.trim();
        let mut vars = BTreeMap::new();
        vars.insert("question", question.to_string());

        let out = self.run(Mode::Ask, question, k, vars, history)?;
        Ok(AskResponse {
            question: question.to_string(),
            answer: out.text,
            refused: out.refused,
            passages: out.passages,
        })
    }

    /// `num` defaults to `quiz_questions`; the backend may return fewer.
    pub fn quiz(
        &self,
        topic: &str,
        num: Option<usize>,
        history: &[ConversationTurn],
    ) -> Result<QuizResponse, AppError> {
        let topic = topic.trim();
        let num = num.unwrap_or(self.cfg.quiz_questions);
        if num == 0 {
            return Err(AppError::new(
                codes::RETRIEVAL_INVALID,
                "Number of quiz questions must be at least 1",
            ));
        }
        let mut vars = BTreeMap::new();
        vars.insert("topic", topic.to_string());
        vars.insert("num", num.to_string());

        let out = self.run(Mode::Quiz, topic, None, vars, history)?;
        Ok(QuizResponse {
            topic: topic.to_string(),
            questions: out.text,
            refused: out.refused,
            passages: out.passages,
        })
    }

    pub fn task(&self, topic: &str, history: &[ConversationTurn]) -> Result<TaskResponse, AppError> {
        let topic = topic.trim();
        let mut vars = BTreeMap::new();
        vars.insert("topic", topic.to_string());

        let out = self.run(Mode::Task, topic, None, vars, history)?;
        Ok(TaskResponse {
            topic: topic.to_string(),
            task: out.text,
            refused: out.refused,
            passages: out.passages,
        })
    }

    fn run(
        &self,
        mode: Mode,
        query: &str,
        k: Option<usize>,
        vars: BTreeMap<&str, String>,
        history: &[ConversationTurn],
    ) -> Result<Outcome, AppError> {
        let k = k.unwrap_or_else(|| mode.default_k(&self.cfg));

        // 1) retrieve
        let retrieved = self.retriever.retrieve(query, k)?;
        let retrieved_count = retrieved.len();
        let retrieved = apply_similarity_floor(retrieved, self.cfg.min_similarity);
        if retrieved.is_empty() {
            info!(
                mode = mode.as_str(),
                retrieved = retrieved_count,
                floor = self.cfg.min_similarity.unwrap_or(0.0),
                "no passage passed the similarity floor; refusing without generation"
            );
            return Ok(Outcome {
                text: REFUSAL_SENTENCE.to_string(),
                refused: true,
                passages: Vec::new(),
            });
        }

        // 2) assemble
        let (request, context) = assemble(
            &retrieved,
            history,
            mode.template(),
            &vars,
            mode.policy(),
            ContextLimits {
                max_context_chars: self.cfg.max_context_chars,
                max_history_turns: self.cfg.max_history_turns,
            },
        )?;

        // 3) invoke
        let backend = self.backend.descriptor();
        let started = Instant::now();
        let text = self.backend.generate(&request).map_err(|e| {
            warn!(
                mode = mode.as_str(),
                backend = %backend,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "generation failed"
            );
            if e.is(codes::GENERATION_FAILED) {
                e
            } else {
                let retryable = e.retryable;
                AppError::new(codes::GENERATION_FAILED, "Generation backend call failed")
                    .with_details(format!("backend={backend}; cause={e}"))
                    .with_retryable(retryable)
            }
        })?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::new(
                codes::GENERATION_FAILED,
                "Generation backend returned an empty response",
            )
            .with_details(format!("backend={backend}")));
        }

        let refused = is_refusal(&text);
        info!(
            mode = mode.as_str(),
            backend = %backend,
            elapsed_ms = started.elapsed().as_millis() as u64,
            k,
            passages = context.passages_used,
            history = history.len(),
            refused,
            "generated response"
        );

        let mut passages = retrieved.hits;
        passages.truncate(context.passages_used);
        Ok(Outcome {
            text,
            refused,
            passages,
        })
    }
}
