pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::{FilterConfig, FilterField, FilterSchema, OptionItem, OptionSet, SearchType, Term, TermsCallback};
pub use services::{apply_default_filters, derive_conditions};
pub use value_objects::{
    CompareOp, ConditionNode, ConditionSet, ConditionValue, Conjunction, DateParts, DerivedFilter, FilterInput,
    FilterValue, ParamKey, RangeSide, ViewValue, ViewValues,
};
