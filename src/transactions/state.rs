/**
 * DOMAIN LAYER - Transaction State Machine
 *
 * The exhaustive transition table for the payment ledger:
 *
 *   initiated -> { processing, failed }
 *   processing -> { completed, failed }
 *   completed -> { partially_refunded, refunded }
 *   partially_refunded -> { refunded }
 *   failed -> { processing }          (retry)
 *
 * refunded is terminal. Every write path goes through ensure_transition;
 * anything outside the table is an InvalidTransition conflict and performs
 * no writes.
 */

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Initiated,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Initiated => "initiated",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(TransactionStatus::Initiated),
            "processing" => Some(TransactionStatus::Processing),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "refunded" => Some(TransactionStatus::Refunded),
            "partially_refunded" => Some(TransactionStatus::PartiallyRefunded),
            _ => None,
        }
    }

    pub fn can_transition(self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, to),
            (Initiated, Processing)
                | (Initiated, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, PartiallyRefunded)
                | (Completed, Refunded)
                | (PartiallyRefunded, Refunded)
                | (Failed, Processing)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == TransactionStatus::Refunded
    }
}

/// Validate a transition or return the typed conflict. Same-state is not a
/// transition and is rejected here; idempotent no-op paths short-circuit
/// before calling this.
pub fn ensure_transition(from: TransactionStatus, to: TransactionStatus) -> Result<()> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionStatus::{self, *};
    use super::*;

    const ALL: [TransactionStatus; 6] =
        [Initiated, Processing, Completed, Failed, Refunded, PartiallyRefunded];

    const ALLOWED: [(TransactionStatus, TransactionStatus); 8] = [
        (Initiated, Processing),
        (Initiated, Failed),
        (Processing, Completed),
        (Processing, Failed),
        (Completed, PartiallyRefunded),
        (Completed, Refunded),
        (PartiallyRefunded, Refunded),
        (Failed, Processing),
    ];

    #[test]
    fn transition_table_is_closed() {
        // Every (state, target) pair outside the table must be rejected,
        // including every same-state pair.
        for from in ALL {
            for to in ALL {
                let allowed = ALLOWED.contains(&(from, to));
                assert_eq!(from.can_transition(to), allowed, "{:?} -> {:?}", from, to);
                assert_eq!(ensure_transition(from, to).is_ok(), allowed);
            }
        }
    }

    #[test]
    fn refunded_is_the_only_terminal_state() {
        for state in ALL {
            assert_eq!(state.is_terminal(), state == Refunded);
        }
    }

    #[test]
    fn nothing_leaves_refunded() {
        for to in ALL {
            assert!(!Refunded.can_transition(to));
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for state in ALL {
            assert_eq!(TransactionStatus::parse(state.as_str()), Some(state));
        }
        assert_eq!(TransactionStatus::parse("pending"), None);
    }

    #[test]
    fn invalid_transition_error_names_both_states() {
        let err = ensure_transition(Completed, Processing).unwrap_err();
        match err {
            crate::error::AppError::InvalidTransition { from, to } => {
                assert_eq!(from, "completed");
                assert_eq!(to, "processing");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
