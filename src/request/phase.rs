//! Per-request lifecycle state machine driven by the request manager.

/// Where a request is in its lifecycle.
///
/// ```text
/// Created -> Pending -> Sending -> Done
///                         |  ^
///                         v  |
///                    AwaitingRetry
/// ```
///
/// An attempt only starts from `Pending` or `AwaitingRetry`, so two attempts
/// of one request can never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Built, not yet submitted.
    #[default]
    Created,
    /// Submitted; first attempt queued.
    Pending,
    /// An attempt is running on the network queue.
    Sending,
    /// The last attempt failed and a retry is scheduled.
    AwaitingRetry,
    /// Terminal; the listener has been (or is being) notified.
    Done,
}

impl Phase {
    pub(crate) fn submit(self) -> Option<Phase> {
        match self {
            Phase::Created => Some(Phase::Pending),
            _ => None,
        }
    }

    pub(crate) fn begin_attempt(self) -> Option<Phase> {
        match self {
            Phase::Pending | Phase::AwaitingRetry => Some(Phase::Sending),
            _ => None,
        }
    }

    pub(crate) fn schedule_retry(self) -> Option<Phase> {
        match self {
            Phase::Sending => Some(Phase::AwaitingRetry),
            _ => None,
        }
    }

    pub(crate) fn complete(self) -> Option<Phase> {
        match self {
            Phase::Done => None,
            _ => Some(Phase::Done),
        }
    }

    /// End a request whose retry has not started yet.
    pub(crate) fn abandon_retry(self) -> Option<Phase> {
        match self {
            Phase::AwaitingRetry => Some(Phase::Done),
            _ => None,
        }
    }
}
