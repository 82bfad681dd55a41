//! Segment rule engine — compiles donor segment rule trees into store
//! predicates and evaluates segment membership.

pub mod builder;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod fields;
pub mod predicates;
pub mod rules;

pub use builder::SegmentBuilder;
pub use compiler::{compile, compile_json};
pub use engine::{Segment, SegmentationEngine};
pub use error::ValidationError;
pub use fields::{DonorAttribute, FieldKind, Operator};
pub use predicates::Predicate;
pub use rules::Rule;
