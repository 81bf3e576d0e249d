use tokio::signal;

/// Resolves on the first interrupt, terminate or quit signal.
#[cfg(unix)]
pub async fn signal_for_shutdown() -> std::io::Result<()> {
    let mut interrupt_signal = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut terminate_signal = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let mut quit_signal = signal::unix::signal(signal::unix::SignalKind::quit())?;

    tokio::select! {
        _ = signal::ctrl_c() => (),
        _ = interrupt_signal.recv() => (),
        _ = terminate_signal.recv() => (),
        _ = quit_signal.recv() => (),
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn signal_for_shutdown() -> std::io::Result<()> {
    signal::ctrl_c().await
}
