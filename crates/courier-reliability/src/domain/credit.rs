//! Credit-based flow control.
//!
//! The receiver grants a budget of permitted messages. `pause` is a hard gate
//! checked before the count.

use serde::{Deserialize, Serialize};

/// Outcome of [`CreditFlow::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditOutcome {
    /// One credit taken; this many remain.
    CreditAvailable(u64),
    NoCredit,
    FlowPaused,
}

/// Credit budget for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditFlow {
    credits: u64,
    max_credits: u64,
    replenish_amount: u64,
    paused: bool,
}

impl CreditFlow {
    /// Starts with a full budget.
    pub fn new(max_credits: u64, replenish_amount: u64) -> Self {
        Self {
            credits: max_credits,
            max_credits,
            replenish_amount,
            paused: false,
        }
    }

    pub fn consume(&mut self) -> CreditOutcome {
        if self.paused {
            return CreditOutcome::FlowPaused;
        }
        if self.credits == 0 {
            return CreditOutcome::NoCredit;
        }
        self.credits -= 1;
        CreditOutcome::CreditAvailable(self.credits)
    }

    /// Adds the configured replenish amount, capped at the maximum.
    pub fn replenish(&mut self) {
        self.grant(self.replenish_amount);
    }

    /// Adds `amount` credits, capped at the maximum.
    pub fn grant(&mut self, amount: u64) {
        self.credits = self.credits.saturating_add(amount).min(self.max_credits);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn available(&self) -> u64 {
        self.credits
    }

    pub fn max_credits(&self) -> u64 {
        self.max_credits
    }
}
