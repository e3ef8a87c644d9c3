//! Latest-request-wins sequencing for debounced lookups.
//!
//! Each keystroke-triggered request takes a [`Ticket`] with a monotonically
//! increasing number. A result is only applied while its ticket is still the
//! newest one issued, which discards superseded requests as well as
//! responses that arrive out of order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sequence number handed to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(self) -> u64 {
        self.0
    }
}

/// Shared counter; clones observe the same sequence.
#[derive(Debug, Clone, Default)]
pub struct LatestRequest {
    latest: Arc<AtomicU64>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
