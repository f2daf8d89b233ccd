//! Guard command implementation.

use memopool_core::scope::scoped;
use std::time::Instant;

/// Execute the guard command.
///
/// Prints `Enter` when the session opens, `Inside` from the guarded block and
/// `Exit` from the guard's exit action.
pub fn execute() {
    scoped(
        Session::enter(),
        |session| {
            tracing::debug!(open_for = ?session.opened.elapsed(), "Leaving scope");
            println!("Exit");
        },
        |session| {
            tracing::debug!(opened = ?session.opened, "Inside scope");
            println!("Inside");
        },
    );
}

/// Value handed to the guarded block.
struct Session {
    opened: Instant,
}

impl Session {
    fn enter() -> Self {
        println!("Enter");
        Self { opened: Instant::now() }
    }
}
