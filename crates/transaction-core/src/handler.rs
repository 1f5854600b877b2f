//! Hooks the transaction user plugs into server transactions.

use std::fmt;

use tracing::{info, warn};

use sipline_core::sdp::SessionSummary;
use sipline_core::Request;

/// Receives the session description of a new request.
///
/// Called after 100 Trying went out and before the final response is chosen.
/// Never called for CANCEL, BYE or ACK.
pub trait SdpHandler: Send + Sync + fmt::Debug {
    fn handle(&self, payload: &[u8]);
}

/// Logs a summary of each offer.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSdpHandler;

impl SdpHandler for LoggingSdpHandler {
    fn handle(&self, payload: &[u8]) {
        match SessionSummary::parse(payload) {
            Ok(summary) => info!(
                origin = ?summary.origin,
                session = ?summary.session_name,
                connection = ?summary.connection,
                media = ?summary.media,
                "Received session description"
            ),
            Err(e) => warn!(error = %e, "Unparseable session description"),
        }
    }
}

/// Picks the final response for a new request.
///
/// `Some(code)` answers immediately. `None` leaves the server transaction in
/// Proceeding until [`crate::ServerTransaction::respond`] is called.
pub trait RequestHandler: Send + Sync + fmt::Debug {
    fn final_response(&self, request: &Request) -> Option<u16>;
}

/// Answers every request with 200 OK.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl RequestHandler for AcceptAll {
    fn final_response(&self, _request: &Request) -> Option<u16> {
        Some(200)
    }
}
