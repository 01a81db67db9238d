pub mod aggregate;
pub mod assemble;
pub mod config;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod publish;
pub mod workflow;

pub use aggregate::{aggregate, merge_sources, AggregateConfig, KeywordTable, SimilarityMetric};
pub use assemble::{render, AssembledDocument, Assembler, AssemblerConfig, RenderedDocument};
pub use config::DispatchConfig;
pub use error::{DispatchError, Result};
pub use io::{parse_raw_items_file, parse_raw_items_json, parse_submission_file, DocumentMetadata};
pub use llm::{generate_for_step, AnthropicClient, AnthropicConfig, FallbackGenerator, Generator};
pub use models::{
    CandidateBatch, CurrentStep, Entry, Item, ItemRef, RawItem, Region, SessionState, StepKey,
    Submission,
};
pub use publish::{publish_document, PublishReceipt, Publisher, WebhookConfig, WebhookPublisher};
pub use workflow::{CheckpointStore, Progress, StepMachine};
