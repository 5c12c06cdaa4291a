//! Per-attempt timeout budgeting.
//!
//! A strategy's HTTP timeout is fixed at construction, but the caller's
//! context may have far less time left. Every strategy runs its request with
//! the timeout computed here so a request never outlives the caller.

use std::time::Duration;

use crate::context::AcquireContext;
use crate::scrapers::strategies::StrategyKind;

/// Headroom kept between the request timeout and the context deadline.
pub const SAFETY_MARGIN: Duration = Duration::from_millis(500);

/// Render requests queue server-side before the page load starts, so they
/// always get at least this long.
pub const RENDER_MIN_BUDGET: Duration = Duration::from_secs(30);

/// Effective timeout for one attempt of a `kind` strategy.
///
/// Without a deadline, or once the deadline has already passed, `base` is
/// returned and context cancellation is left to end the request.
pub fn budget_for(ctx: &AcquireContext, base: Duration, kind: StrategyKind) -> Duration {
    match ctx.remaining() {
        None => base,
        Some(remaining) => budget_from_remaining(remaining, base, kind),
    }
}

/// Pure form of [`budget_for`] over an explicit remaining time.
pub fn budget_from_remaining(remaining: Duration, base: Duration, kind: StrategyKind) -> Duration {
    if remaining.is_zero() {
        return base;
    }

    let candidate = match remaining.checked_sub(SAFETY_MARGIN) {
        Some(c) if !c.is_zero() => c,
        // Less than the margin left: spend what there is.
        _ => remaining,
    };

    let bounded = candidate.min(base);
    if kind == StrategyKind::Render {
        bounded.max(RENDER_MIN_BUDGET)
    } else {
        bounded
    }
}
