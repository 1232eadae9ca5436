pub mod delegate;
pub mod handlers;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod salary;
pub mod scoring;
pub mod skills;

pub use pipeline::AnalysisPipeline;
