//! Storage deal proposals.
//!
//! A [`DealProposal`] is the record a client signs and hands to a storage
//! provider. Its canonical encoding is the DAG-CBOR tuple used by the
//! storage market actor, so the provider can verify the client signature
//! against exactly the bytes produced by [`DealProposal::canonical_bytes`].

mod builder;
mod error;
mod label;
mod proposal;

pub use builder::{BuiltProposal, ProposalParams, build_proposal, parse_cid};
pub use error::ProposalError;
pub use label::Label;
pub use proposal::{DealProposal, SignedDealProposal};
