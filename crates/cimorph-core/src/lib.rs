pub mod analyzer;
pub mod convert;
pub mod error;
pub mod graph;
pub mod parser;
pub mod render;

pub use analyzer::{analyze, graph_metrics, Analysis, GraphMetrics};
pub use convert::{gitlab_to_github_actions, ConversionResult};
pub use error::ParseError;
pub use graph::builder::GraphBuilder;
pub use graph::{Edge, EdgeKind, Graph, JobKind, Node};
pub use parser::gitlab::GitLabParser;
pub use parser::pipeline::{Job, Pipeline, Secret, Variable};
