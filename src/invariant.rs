//! Fatal invariant-violation reporting (§7).
//!
//! Programmer errors (cycles, nil/self children, wrong-parent removal,
//! out-of-range indices, disposed-node use) are never recoverable `Result`s;
//! they panic naming the offending operation, mirroring the teacher's
//! `log::error!` + early-return sites turned into hard failures.

/// Logs and panics, naming `operation`, with the structured `reason`.
#[track_caller]
pub fn fatal(operation: &str, reason: &str) -> ! {
    log::error!("invariant violation in {operation}: {reason}");
    panic!("invariant violation in {operation}: {reason}");
}

/// Panics via [`fatal`] unless `condition` holds.
#[track_caller]
pub fn invariant(condition: bool, operation: &str, reason: &str) {
    if !condition {
        fatal(operation, reason);
    }
}
