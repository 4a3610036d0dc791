//! Protocol dispatcher.
//!
//! A request is a single JSON object read from the `json` form field:
//! `{op, version, sid, spwd, uid, ...}`. [`Dispatcher::dispatch`] parses it, authorizes every
//! operation except `check` and `getpublished`, runs the matching vault operation and renders
//! either `{status: "OK", ...}` or `{status, code, desc, version}`.
mod dispatcher;
mod envelope;
mod error;

pub use crate::dispatcher::{Dispatcher, InboundRequest, Reply};
pub use crate::envelope::{Envelope, coerce_int, coerce_string, coerce_words};
pub use crate::error::{ProtocolError, ProtocolErrorExt};
