#![deny(missing_docs)]

//! Core library for the Arke document question-answering service.

/// Conversational agent: moderation, routing, and tool dispatch.
pub mod agent;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Document extraction backends.
pub mod extract;
/// Grounded answer generation.
pub mod generation;
/// Document splitting and chunk-id assignment.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and retrieval metrics helpers.
pub mod metrics;
/// Retrieval pipeline orchestration.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
/// Input moderation gate.
pub mod safety;
/// Conversation session tracking.
pub mod session;
