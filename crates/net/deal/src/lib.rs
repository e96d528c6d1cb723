//! Storage deal negotiation protocol.
//!
//! The client opens a stream with [`PROTOCOL_NAME`], writes one [`DealParams`]
//! and reads one [`DealResponse`]. Both are DAG-CBOR maps with the field names
//! the provider expects, written back to back with no extra framing.
//!
//! # Protocol Flow
//!
//! - **Outbound (client)**: [`exchange`] sends the request and waits for the
//!   verdict, bounded by a deadline and a cancellation token.
//! - **Inbound (provider)**: [`read_request`] and [`DealResponder`] serve the
//!   other side, used by in-process providers.

mod codec;
mod exchange;

pub use codec::{
    DealCodecError, DealParams, DealParamsCodec, DealResponse, DealResponseCodec, Transfer, wire,
};
pub use exchange::{CancelReason, DealResponder, ExchangeError, exchange, read_request};

/// Protocol name for storage deal proposals.
pub const PROTOCOL_NAME: &str = "/fil/storage/mk/1.2.0";

/// Maximum size of a deal protocol message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
