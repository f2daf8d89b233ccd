//! Wrap command implementation.

use memopool_core::compose::{around, hook_fn, traced};

/// Execute the wrap command.
///
/// Calls `repeat_bar` once per entry in `times`, with an in/out hook around
/// every call.
pub fn execute(times: &[usize]) {
    let in_and_out = hook_fn(|| println!("In"), || println!("Out"));
    let foo = around(in_and_out, traced("repeat_bar", repeat_bar));

    for (i, &n) in times.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{:?}", foo(n));
    }
}

fn repeat_bar(n: usize) -> Vec<&'static str> {
    println!("Executing");
    vec!["bar"; n]
}
