pub mod error;
pub mod ids;
pub mod keys;
pub mod ntriples;
pub mod term;
pub mod topic_key;
pub mod vocab;

pub use error::CoreError;
pub use ids::TopicId;
pub use term::{Term, Triple};
pub use topic_key::TopicKey;
pub use vocab::{PredicateKind, PropertyField};

/// Column bound shared by labels, aliases, keys and textids.
pub const MAX_VARCHAR_SIZE: usize = 191;

/// Column bound for mids (`/m/` or `/g/` followed by the opaque part).
pub const MAX_MID_SIZE: usize = 13;

/// Column bound for language tags.
pub const MAX_LANGUAGE_SIZE: usize = 5;
