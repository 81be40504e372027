use std::time::Duration;

use super::*;

#[tokio::test]
async fn pending_interrupt_cancels_the_turn() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(()).unwrap();
    let cancel = CancellationToken::new();

    let watched = cancel.clone();
    let out = tokio::time::timeout(
        Duration::from_secs(5),
        cancel_on_interrupt(async move { watched.cancelled().await; "stopped" }, &mut rx, &cancel),
    )
    .await
    .expect("interrupt did not cancel the turn");

    assert_eq!(out, "stopped");
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn turn_without_interrupt_completes_untouched() {
    let (_tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let out = cancel_on_interrupt(async { 7 }, &mut rx, &cancel).await;
    assert_eq!(out, 7);
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn closed_listener_does_not_stall_the_turn() {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    drop(tx);
    let cancel = CancellationToken::new();

    let out = tokio::time::timeout(
        Duration::from_secs(5),
        cancel_on_interrupt(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "done"
        }, &mut rx, &cancel),
    )
    .await
    .unwrap();
    assert_eq!(out, "done");
    assert!(!cancel.is_cancelled());
}
