// src/claim/mod.rs

//! Claim protocol: handing queued work to exactly one requesting worker.
//!
//! - [`requester`] parses the `container:version:hostname` key a worker
//!   polls with.
//! - [`hostname`] maps a worker's hostname back to its controller.
//! - [`claim_set`] is the in-process exclusivity point for queue keys.
//! - [`protocol`] ties them together against the namespace.

pub mod claim_set;
pub mod hostname;
pub mod protocol;
pub mod requester;

pub use claim_set::{ClaimGuard, ClaimSet};
pub use hostname::{claim_groups, group_candidates, worker_group};
pub use protocol::{ClaimOutcome, QueueItem, claim};
pub use requester::RequesterKey;
