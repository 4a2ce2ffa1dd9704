//! Client side of a Lumen conversation.
//!
//! - [`ChatSession`] owns the transcript, its store, and the admin token
//! - [`RequestCoalescer`] keeps at most one chat request in flight and batches
//!   whatever the user types meanwhile into the next one
//! - [`ChatTransport`] carries a request to the gateway; [`HttpTransport`]
//!   does it over HTTP

pub mod coalescer;
pub mod session;
pub mod transport;

pub use coalescer::{CoalescerError, RequestCoalescer};
pub use session::ChatSession;
pub use transport::{ChatTransport, HttpTransport, TransportError};
