//! Product advisory pipeline: catalog filtering, prompt assembly, reply
//! contract, enrichment, severity detection and the per-turn orchestrator.

pub mod catalog_filter;
pub mod contract;
pub mod enricher;
pub mod handlers;
pub mod orchestrator;
pub mod prompt_builder;
pub mod prompts;
pub mod severity;
