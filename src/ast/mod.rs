//! AST Module - parsed workflow documents
//!
//! - `frontmatter`: header/body split
//! - `header`: generic, typed and extension passes over the header
//! - `schema`, `extensions`: typed header sub-models
//! - `content`: body references and outline
//! - `workflow`: the immutable `Workflow`
//!
//! These types are the static "what". Execution state lives in `resume`.

pub mod content;
pub mod extensions;
pub mod frontmatter;
pub mod header;
pub mod schema;
mod workflow;

pub use content::{Content, DocumentOutline, Heading, SubWorkflowReference};
pub use extensions::{
    BackoffStrategy, CheckpointFrequency, ErrorHandlingPolicy, Extensions, McpServer,
    ResumePolicy, SubWorkflowDecl,
};
pub use frontmatter::{split_front_matter, FrontMatter};
pub use header::HeaderFields;
pub use schema::{InputSpec, Metadata, ModelConfig, OutputSpec, ParameterSpec};
pub use workflow::{check_file_type, Workflow};
