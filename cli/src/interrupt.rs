//! Ctrl-C handling shared by every turn and the prompt.
//!
//! One listener owns the signal for the whole process. Each Ctrl-C becomes a
//! message on the returned channel, so an interrupt that lands between turns
//! is still seen by whoever reads next.

#[cfg(test)]
#[path = "interrupt_test.rs"]
mod interrupt_test;

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type Interrupts = mpsc::UnboundedReceiver<()>;

/// Install the process-wide Ctrl-C listener.
#[must_use]
pub fn listen() -> Interrupts {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run `fut` to completion, cancelling `cancel` on every interrupt seen
/// meanwhile. The future is expected to observe the token and wind down.
pub async fn cancel_on_interrupt<F: Future>(
    fut: F,
    interrupts: &mut Interrupts,
    cancel: &CancellationToken,
) -> F::Output {
    let mut fut = std::pin::pin!(fut);
    loop {
        tokio::select! {
            out = &mut fut => break out,
            Some(()) = interrupts.recv() => cancel.cancel(),
        }
    }
}
