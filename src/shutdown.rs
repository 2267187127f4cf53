use tokio_util::sync::CancellationToken;

/// Returns a token cancelled on SIGINT or SIGTERM.
///
/// The staging sweeper watches this token and finishes its current pass
/// before exiting; nothing else in the crate holds long-running state.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signalled = token.clone();

    tokio::spawn(async move {
        let terminate = async {
            #[cfg(unix)]
            {
                let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler");
                sig.recv().await;
            }
            #[cfg(not(unix))]
            std::future::pending::<()>().await;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
            }
            _ = terminate => {
                tracing::info!("SIGTERM received, shutting down");
            }
        }
        signalled.cancel();
    });

    token
}
