pub mod consistency;
pub mod error;
pub mod llm;
pub mod parser;
pub mod prompt;
pub mod retry;
pub mod schema;

pub use consistency::{ConsistencyConfig, ConsistencyOutcome, SelfConsistency, VoteTally};
pub use error::{CompletionError, NerError, NerResult};
pub use llm::{ChatMessage, CompletionConfig, CompletionService, OpenAiClient};
pub use parser::{CompletionParser, parse_completion};
pub use prompt::{ExampleSampler, render_example};
pub use retry::RetryPolicy;
pub use schema::{EntityRecord, EntityType, EntityTypeMap, LabeledSentence, PredictionRecord};
