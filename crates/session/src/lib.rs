//! One storage deal attempt, end to end.
//!
//! A [`DealSession`] walks a fixed sequence of states:
//!
//! ```text
//! Initialized → PriceComputed → ProposalBuilt → Signed → PeerNegotiated → Exchanged
//!                                                                          ├→ Accepted
//!                                                                          └→ Rejected
//! ```
//!
//! Any failing step ends the session in `Failed` with a [`SessionError`].
//! There are no retries; each attempt uses a fresh deal UUID, so a caller
//! that wants to retry builds a new session.

mod error;
mod outcome;
mod session;

pub use error::{ErrorKind, SessionError};
pub use outcome::{DealOutcome, DealSummary};
pub use session::{DealRequest, DealSession, SessionConfig, SessionState};
