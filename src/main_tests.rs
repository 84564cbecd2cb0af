// SPDX-License-Identifier: Apache-2.0

use std::time::Duration as StdDuration;
use tokio::time::timeout;

#[tokio::test]
#[cfg(unix)]
async fn sigterm_signal_handler_can_be_created() {
    use tokio::signal::unix::{signal, SignalKind};

    let result = signal(SignalKind::terminate());
    assert!(result.is_ok(), "should be able to create a SIGTERM signal handler");
}

#[tokio::test]
async fn sigint_handler_future_does_not_resolve_without_a_signal() {
    let ctrl_c_future = tokio::signal::ctrl_c();

    let result = timeout(StdDuration::from_millis(100), ctrl_c_future).await;

    assert!(result.is_err(), "ctrl_c() future should not resolve when no signal is sent");
}

#[tokio::test]
async fn select_resolves_on_whichever_branch_fires_first() {
    use tokio::sync::oneshot;

    let (tx, rx) = oneshot::channel::<()>();

    let result = tokio::select! {
        _ = async {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            Ok::<(), anyhow::Error>(())
        } => "shutdown signal",
        _ = async {
            tokio::time::sleep(StdDuration::from_secs(10)).await;
            rx.await
        } => "controller set",
    };

    assert_eq!(result, "shutdown signal");
    drop(tx);
}
