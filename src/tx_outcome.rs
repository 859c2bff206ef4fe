/// How a transaction resolved.
///
/// Mirrors the completion callbacks: `Committed` goes with `on_success`,
/// `RolledBack` with `on_error`. A rollback is an outcome, not an error; failures
/// raised by the work itself come back as `Err` from
/// [`TransactionRunner::run`](crate::transaction::TransactionRunner::run) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// No rollback was observed and COMMIT succeeded.
    Committed,
    /// The handle reported a rollback while the work was running.
    RolledBack,
}

impl TxOutcome {
    #[must_use]
    pub fn is_committed(self) -> bool {
        matches!(self, TxOutcome::Committed)
    }

    #[must_use]
    pub fn is_rolled_back(self) -> bool {
        matches!(self, TxOutcome::RolledBack)
    }
}
