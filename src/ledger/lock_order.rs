//! Deterministic lock ordering for account pairs.
//!
//! Any two concurrent transfers touching the same account pair, in either
//! direction, must acquire locks in the same relative order so no circular
//! wait can form. The order is fixed by account id, never by arrival order
//! or sender/receiver role. This is the single invariant preventing
//! transfer deadlocks; keep it here, standalone.

use super::account::AccountId;

/// Return the pair sorted into lock acquisition order: smaller id first.
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b { (a, b) } else { (b, a) }
}
