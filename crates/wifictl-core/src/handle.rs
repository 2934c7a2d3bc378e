// ── Engine runtime ──
//
// Runs an `Engine` on its own tokio task. Callers hold a cheaply
// cloneable `EngineHandle`; each command is one engine turn, after
// which due timers fire and the tree is recomputed and published if
// anything invalidated it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::CoreError;
use crate::intent::{IntentDocument, IntentStore};
use crate::live::{LiveEvent, LiveSnapshot};
use crate::model::ConfigTree;
use crate::stream::ConfigStream;
use crate::wps::{JobId, WpsCallbacks, WpsJobEvent, WpsJobInfo, WpsMethod, WpsResult, WpsRole};

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

type EngineCall = Box<dyn FnOnce(&mut Engine, Instant) + Send>;

enum Command {
    /// Live-state report; no reply so driver callbacks never wait.
    Live(LiveEvent),
    Call(EngineCall),
}

// ── EngineHandle ────────────────────────────────────────────────────

/// Async facade over a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    commands: mpsc::Sender<Command>,
    config: watch::Receiver<Arc<ConfigTree>>,
    wps_events: broadcast::Sender<WpsJobEvent>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EngineHandle {
    /// Move `engine` onto a new task. Must be called inside a tokio
    /// runtime.
    pub fn spawn(mut engine: Engine) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (config_tx, config_rx) = watch::channel(engine.end_turn(Instant::now()));
        let (wps_events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            engine,
            command_rx,
            config_tx,
            wps_events.clone(),
            cancel.clone(),
        ));

        Self {
            inner: Arc::new(HandleInner {
                commands: command_tx,
                config: config_rx,
                wps_events,
                cancel,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    async fn send(&self, command: Command) -> Result<(), CoreError> {
        self.inner
            .commands
            .send(command)
            .await
            .map_err(|_| CoreError::EngineStopped)
    }

    /// Run `f` as one turn on the engine task and return its output.
    pub async fn call<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Engine, Instant) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let call: EngineCall = Box::new(move |engine, now| {
            let _ = tx.send(f(engine, now));
        });
        self.send(Command::Call(call)).await?;
        rx.await.map_err(|_| CoreError::EngineStopped)
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Last published tree.
    pub fn config(&self) -> Arc<ConfigTree> {
        self.inner.config.borrow().clone()
    }

    pub fn subscribe_config(&self) -> ConfigStream {
        ConfigStream::new(self.inner.config.clone())
    }

    pub fn subscribe_wps(&self) -> broadcast::Receiver<WpsJobEvent> {
        self.inner.wps_events.subscribe()
    }

    // ── Intent ───────────────────────────────────────────────────────

    pub async fn update_intent<F>(&self, f: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut IntentStore) + Send + 'static,
    {
        self.call(move |engine, now| engine.update_intent(now, f)).await
    }

    pub async fn apply_document(&self, doc: IntentDocument) -> Result<bool, CoreError> {
        self.call(move |engine, now| engine.apply_document(doc, now))
            .await?
    }

    pub async fn intent_document(&self) -> Result<IntentDocument, CoreError> {
        self.call(|engine, _| engine.intent().document()).await
    }

    pub async fn delete_interface_config(&self, name: impl Into<String>) -> Result<bool, CoreError> {
        let name = name.into();
        self.call(move |engine, now| engine.delete_interface_config(&name, now))
            .await
    }

    // ── Live state ───────────────────────────────────────────────────

    pub async fn apply_live(&self, event: LiveEvent) -> Result<(), CoreError> {
        self.send(Command::Live(event)).await
    }

    pub async fn apply_snapshot(&self, snapshot: LiveSnapshot) -> Result<(), CoreError> {
        self.call(move |engine, now| engine.apply_snapshot(snapshot, now))
            .await
    }

    pub async fn live_snapshot(&self) -> Result<LiveSnapshot, CoreError> {
        self.call(|engine, _| engine.live().snapshot()).await
    }

    pub async fn is_quiescent(&self) -> Result<bool, CoreError> {
        self.call(|engine, _| engine.is_quiescent()).await
    }

    // ── WPS ──────────────────────────────────────────────────────────

    pub async fn wps_alloc(
        &self,
        iface: impl Into<String>,
        role: WpsRole,
        method: WpsMethod,
    ) -> Result<JobId, CoreError> {
        let iface = iface.into();
        self.call(move |engine, _| engine.wps_alloc(&iface, role, method))
            .await?
    }

    pub async fn wps_set_creds(&self, id: JobId, creds: Vec<String>) -> Result<(), CoreError> {
        self.call(move |engine, _| engine.wps_set_creds(id, creds))
            .await?
    }

    pub async fn wps_set_callbacks(&self, id: JobId, callbacks: WpsCallbacks) -> Result<(), CoreError> {
        self.call(move |engine, _| engine.wps_set_callbacks(id, callbacks))
            .await?
    }

    pub async fn wps_set_timeout(&self, id: JobId, timeout: Duration) -> Result<(), CoreError> {
        self.call(move |engine, _| engine.wps_set_timeout(id, timeout))
            .await?
    }

    pub async fn wps_start(&self, id: JobId) -> Result<(), CoreError> {
        self.call(move |engine, now| engine.wps_start(id, now)).await?
    }

    pub async fn wps_cancel(&self, id: JobId) -> Result<(), CoreError> {
        self.call(move |engine, now| engine.wps_cancel(id, now)).await?
    }

    pub async fn wps_drop(&self, id: JobId) -> Result<(), CoreError> {
        self.call(move |engine, now| engine.wps_drop(id, now)).await?
    }

    pub async fn wps_result(&self, id: JobId) -> Result<Option<WpsResult>, CoreError> {
        self.call(move |engine, _| engine.wps_result(id)).await?
    }

    pub async fn wps_info(&self, id: JobId) -> Result<WpsJobInfo, CoreError> {
        self.call(move |engine, _| engine.wps_info(id)).await?
    }

    pub async fn wps_jobs(&self) -> Result<Vec<WpsJobInfo>, CoreError> {
        self.call(|engine, _| engine.wps_jobs()).await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        !self.inner.cancel.is_cancelled() && !self.inner.commands.is_closed()
    }

    /// Stop the engine task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(task) = self.inner.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "engine task ended abnormally");
            }
        }
    }
}

// ── Actor loop ──────────────────────────────────────────────────────

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn run(
    mut engine: Engine,
    mut commands: mpsc::Receiver<Command>,
    config: watch::Sender<Arc<ConfigTree>>,
    wps_events: broadcast::Sender<WpsJobEvent>,
    cancel: CancellationToken,
) {
    info!("engine task started");
    loop {
        let deadline = engine.next_deadline();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("all handles dropped");
                    break;
                };
                let now = Instant::now();
                match command {
                    Command::Live(event) => engine.apply_live(event, now),
                    Command::Call(call) => call(&mut engine, now),
                }
            }
            () = sleep_until(deadline) => {}
        }

        let now = Instant::now();
        engine.poll(now);
        let tree = engine.end_turn(now);
        config.send_if_modified(|current| {
            if Arc::ptr_eq(current, &tree) {
                false
            } else {
                *current = tree;
                true
            }
        });
        for event in engine.take_wps_events() {
            let _ = wps_events.send(event);
        }
    }
    info!("engine task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::intent::attr::{interface as ia, radio as ra};
    use crate::live::WpsEventKind;
    use crate::model::{InterfaceKind, LiveInterface, LiveRadio};
    use crate::policy::RecordingKicker;
    use crate::sync::{MemoryDb, Table};
    use crate::wps::JobState;
    use tokio_test::assert_ok;

    fn spawn() -> (EngineHandle, MemoryDb) {
        let db = MemoryDb::new();
        let engine = Engine::new(
            EngineConfig::default(),
            Box::new(db.clone()),
            Box::new(RecordingKicker::new()),
        );
        (EngineHandle::spawn(engine), db)
    }

    fn snapshot() -> LiveSnapshot {
        let mut wlan0 = LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap);
        wlan0.ap.as_mut().unwrap().mode.wps = true;
        LiveSnapshot {
            settled: true,
            radios: vec![LiveRadio::new("phy0")],
            interfaces: vec![wlan0],
            stations: Vec::new(),
        }
    }

    /// Echo the published tree back as the driver would.
    async fn drive(handle: &EngineHandle) {
        handle
            .call(|engine, now| {
                engine.loopback(now);
            })
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_tree_and_rows() {
        let (handle, db) = spawn();
        let mut stream = handle.subscribe_config();
        handle.apply_snapshot(snapshot()).await.unwrap();
        handle
            .update_intent(|i| {
                i.set_radio("phy0", ra::TX_POWER_DBM, Some(17));
                i.set_interface("wlan0", ia::RADIO, Some("phy0".to_owned()));
            })
            .await
            .unwrap();

        let tree = stream.changed().await.unwrap();
        assert!(tree.radio("phy0").is_some());
        assert_eq!(handle.config().radio("phy0").unwrap().tx_power_dbm, Some(17));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(handle.is_quiescent().await.unwrap());
        assert!(db.get(Table::RadioState, "phy0").is_some());
        assert!(db.get(Table::InterfaceState, "wlan0").is_some());

        handle.shutdown().await;
        assert!(!handle.is_running());
        assert!(matches!(
            handle.is_quiescent().await,
            Err(CoreError::EngineStopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wps_events_are_broadcast() {
        let (handle, _db) = spawn();
        let mut events = handle.subscribe_wps();
        handle.apply_snapshot(snapshot()).await.unwrap();

        let id = handle
            .wps_alloc("wlan0", WpsRole::Enroller, WpsMethod::Pbc)
            .await
            .unwrap();
        assert_ok!(handle.wps_set_creds(id, vec!["s3cret".into()]).await);
        assert_ok!(handle.wps_start(id).await);
        drive(&handle).await;
        assert_eq!(handle.wps_info(id).await.unwrap().state, JobState::Running);
        assert!(matches!(
            events.recv().await.unwrap(),
            WpsJobEvent::Started { .. }
        ));

        handle
            .apply_live(LiveEvent::Wps {
                iface: "wlan0".into(),
                kind: WpsEventKind::Overlap,
            })
            .await
            .unwrap();
        drive(&handle).await;
        assert!(matches!(
            events.recv().await.unwrap(),
            WpsJobEvent::Finished {
                result: WpsResult::Overlapped,
                ..
            }
        ));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn internal_timeout_fires_without_commands() {
        let (handle, _db) = spawn();
        handle.apply_snapshot(snapshot()).await.unwrap();
        let id = handle
            .wps_alloc("wlan0", WpsRole::Enroller, WpsMethod::Pbc)
            .await
            .unwrap();
        assert_ok!(handle.wps_set_timeout(id, Duration::from_secs(30)).await);
        assert_ok!(handle.wps_start(id).await);
        drive(&handle).await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(
            handle.wps_result(id).await.unwrap(),
            Some(WpsResult::TimedOutInternally)
        );
        handle.shutdown().await;
    }
}
