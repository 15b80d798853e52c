pub mod chunking;
pub mod context;
pub mod corpus;
pub mod embeddings;
pub mod engines;
pub mod guardrails;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod ollama;
pub mod retrieve;
