//! Single-record transactions
//!
//! A transaction stages at most one deferred write. It gives no atomicity
//! across keys: a plain `set` between `tx_begin` and `tx_commit` is written
//! immediately and survives a rollback.
//!
//! ```text
//!            tx_begin             tx_commit
//!   Idle ─────────────► Prepared ───────────► Committed ──► Idle
//!     ▲                    │        (set runs here)
//!     └────────────────────┘
//!          tx_rollback
//! ```

use crate::error::{Result, StoreError};
use crate::flash::Flash;
use crate::region::{Record, TxState};

use super::Engine;

impl<F: Flash> Engine<F> {
    /// Start a transaction, discarding anything staged by an earlier one
    pub fn tx_begin(&mut self) -> Result<()> {
        self.ensure_initialized()?;

        if self.pending.take().is_some() {
            tracing::debug!(
                "Instance {}: tx_begin discarded a staged write",
                self.config.instance_id
            );
        }
        self.tx_state = TxState::Prepared;
        Ok(())
    }

    /// Stage the transaction's write
    pub fn tx_set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.expect_prepared("tx_set")?;

        if self.pending.is_some() {
            return Err(StoreError::Transaction(
                "a write is already staged in this transaction".to_string(),
            ));
        }

        let layout = self.active_log().layout();
        layout.check_key(key)?;
        layout.check_value(value)?;

        self.pending = Some(Record::live(key, value));
        Ok(())
    }

    /// Apply the staged write, if any, and end the transaction
    ///
    /// The transaction ends even when the write fails; the error is
    /// returned and the staged record is gone.
    pub fn tx_commit(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.expect_prepared("tx_commit")?;

        let pending = self.pending.take();
        self.tx_state = TxState::Committed;

        let result = match &pending {
            Some(record) => self.set(&record.key, &record.value),
            None => Ok(()),
        };

        self.tx_state = TxState::Idle;

        if let Err(e) = &result {
            tracing::warn!("Instance {}: tx_commit failed: {}", self.config.instance_id, e);
        }
        result
    }

    /// Drop the staged write and end the transaction
    pub fn tx_rollback(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.expect_prepared("tx_rollback")?;

        self.pending = None;
        self.tx_state = TxState::Idle;
        Ok(())
    }

    pub fn tx_state(&self) -> TxState {
        self.tx_state
    }

    fn expect_prepared(&self, op: &str) -> Result<()> {
        if self.tx_state != TxState::Prepared {
            return Err(StoreError::Transaction(format!(
                "{} without tx_begin (state is {:?})",
                op, self.tx_state
            )));
        }
        Ok(())
    }
}
