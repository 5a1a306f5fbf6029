//! File association: from a loose drop of files to track bundles.
//!
//! Dropped paths are classified by extension, indexed under a normalized
//! filename key, then grouped into [`TrackBundle`](crate::models::TrackBundle)s
//! by fuzzy key matching. Every question that needs a human goes through a
//! [`DecisionProvider`].

mod classify;
mod decisions;
mod engine;
mod errors;
mod key;

pub use classify::{classify, Classification};
pub use decisions::{AutoDecisions, DecisionProvider, DirectoryDecision};
pub use engine::{
    AssociationEngine, AssociationOptions, AssociationOutcome, BundleOutcome, ImportReport,
};
pub use errors::{AssociationError, AssociationResult};
pub use key::{
    closest_keys, normalize, normalize_name, similarity, FileResultSet, NormalizedKey,
    PrimaryEntry, MATCH_CUTOFF, MAX_MATCHES,
};

#[cfg(test)]
pub(crate) use decisions::testing;
