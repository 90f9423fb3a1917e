//! Query construction module
//!
//! Turns a declarative condition tree into the engine's bool query:
//! - [`condition`]: the typed condition tree
//! - [`dsl`]: the query-object model and its JSON rendering
//! - [`compiler`]: the condition-to-query compiler
//! - [`paging`]: the caller's request wrapping conditions, window and sort

pub mod compiler;
pub mod condition;
pub mod dsl;
pub mod paging;
pub mod zone;

pub use compiler::{compile, QueryCompiler, DEFAULT_DATE_FORMATS};
pub use condition::{Condition, ConditionKind, Leaf, Logic, NodeType, RangeBounds, RangeValue};
pub use dsl::{BoolQuery, FunctionScoreQuery, Query};
pub use paging::{Paging, Sort, DEFAULT_STREAM_BATCH_SIZE, MAX_PAGE_WINDOW};
