//! Prompt rendering for judges

pub mod template;

pub use template::PromptTemplate;
