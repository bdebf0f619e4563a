use tokio::sync::watch;

/// Run state of a session, owned by the coordinator.
///
/// Starts out running and moves to stopped exactly once; the loops observe
/// it through [`RunFlag`]s.
#[derive(Debug)]
pub struct RunSignal {
    tx: watch::Sender<bool>,
}

impl RunSignal {
    pub fn start() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx }
    }

    pub fn flag(&self) -> RunFlag {
        RunFlag {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.tx.borrow()
    }

    /// Broadcast the stop. Returns `true` only for the call that stopped it.
    pub fn stop(&self) -> bool {
        self.tx.send_replace(false)
    }
}

/// Read side of [`RunSignal`]
#[derive(Debug, Clone)]
pub struct RunFlag {
    rx: watch::Receiver<bool>,
}

impl RunFlag {
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the session is stopping (or the coordinator is gone)
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|running| !running).await;
    }
}
