//! Data model and pure algorithms of the federated agent search engine.
//!
//! Nothing in this crate performs I/O. The service crate fans queries out to sources and
//! feeds the results through [`merge`] and [`reputation`].

pub mod agent;
pub mod cursor;
pub mod feedback;
pub mod filter;
pub mod merge;
pub mod reputation;
pub mod sort;
pub mod source;

mod error;

pub use agent::{AgentRecord, Extensions};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use feedback::{FeedbackCriteria, FeedbackDetail, FeedbackRecord};
pub use filter::{
	AgentField, FieldShape, FilterSpec, FilterSplit, Predicate, PredicateKind, PredicateOp, Scalar,
	SourceCapabilities,
};
pub use merge::{MergedPage, merge, merge_by, name_description_key};
pub use reputation::{ReputationSummary, TagFilter, summarize, summarize_by_agent};
pub use sort::{SortDirection, SortField, SortKey, SortSpec};
pub use source::{AgentId, FeedbackId, SourceId};
