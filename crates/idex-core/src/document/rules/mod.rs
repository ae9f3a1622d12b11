//! Rule building blocks shared by the document extractors.

pub mod key_value;
pub mod patterns;
pub mod similarity;

pub use key_value::{
    sort_by_anchor, AnchoredLine, KeyValueMatcher, KeyValueSpec, LineRelation, ValueSelector,
};
pub use similarity::{partial_ratio, PartialRatio, Similarity};
