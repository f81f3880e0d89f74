use sentinel_common::{AlertSettings, AlertState};
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::context::{CycleOutcome, CycleRequest, MonitorContext, MonitorSnapshot, OutcomeKind, Reaction, TickDecision};
use crate::camera::compress::compress_frame;
use crate::camera::registry::CameraRegistry;
use crate::camera::FrameSource;
use crate::config::{MonitorConfig, SchedulerConfig};
use crate::error::{MonitorError, Result};
use crate::gateway::AnalysisGateway;
use crate::messaging::{dispatch, MonitorEvent, Notifier};
use crate::processing::alert::AlertEffect;
use crate::storage::LabelStore;
use crate::utils::metrics::Metrics;

const COMMAND_QUEUE: usize = 32;
const EVENT_QUEUE: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
pub enum MonitorCommand {
    Start,
    Stop,
    Acknowledge,
    RegisterCamera { id: String, label: String },
    SetCameraActive { id: String, active: bool, reply: Reply<()> },
    RenameCamera { id: String, label: String, reply: Reply<()> },
    UpdateSettings { settings: AlertSettings, reply: Reply<()> },
    Shutdown,
}

/// Collaborators the monitor loop drives.
#[derive(Clone)]
pub struct MonitorDeps {
    pub gateway: Arc<dyn AnalysisGateway>,
    pub frames: Arc<dyn FrameSource>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<Metrics>,
    pub labels: Option<LabelStore>,
}

#[derive(Debug, Clone, Copy)]
struct CycleLimits {
    max_dimension: u32,
    jpeg_quality: u8,
    gateway_timeout: Duration,
}

/// Serialized monitor loop. Owns the context exclusively; everything else
/// talks to it through a [`MonitorHandle`].
pub struct MonitorEngine {
    context: MonitorContext,
    deps: MonitorDeps,
    scheduler_config: SchedulerConfig,
    limits: CycleLimits,
    commands: mpsc::Receiver<MonitorCommand>,
    completions_tx: mpsc::Sender<(u64, CycleOutcome)>,
    completions_rx: mpsc::Receiver<(u64, CycleOutcome)>,
    snapshot_tx: watch::Sender<MonitorSnapshot>,
    events_tx: broadcast::Sender<MonitorEvent>,
}

#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    snapshot: watch::Receiver<MonitorSnapshot>,
    events: broadcast::Sender<MonitorEvent>,
    metrics: Arc<Metrics>,
}

impl MonitorEngine {
    pub fn new(config: &MonitorConfig, registry: CameraRegistry, deps: MonitorDeps) -> (Self, MonitorHandle) {
        let context = MonitorContext::new(config, registry);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let (completions_tx, completions_rx) = mpsc::channel(4);
        let (snapshot_tx, snapshot_rx) = watch::channel(context.snapshot(Instant::now()));
        let (events_tx, _) = broadcast::channel(EVENT_QUEUE);

        let handle = MonitorHandle {
            commands: commands_tx,
            snapshot: snapshot_rx,
            events: events_tx.clone(),
            metrics: deps.metrics.clone(),
        };

        let engine = Self {
            context,
            deps,
            scheduler_config: config.scheduler.clone(),
            limits: CycleLimits {
                max_dimension: config.gateway.max_image_dimension,
                jpeg_quality: config.gateway.jpeg_quality,
                gateway_timeout: config.gateway.request_timeout(),
            },
            commands: commands_rx,
            completions_tx,
            completions_rx,
            snapshot_tx,
            events_tx,
        };

        (engine, handle)
    }

    pub async fn run(mut self) -> Result<()> {
        info!("Monitor loop running");
        let mut next_tick = Instant::now();

        loop {
            let watchdog = self.context.watchdog_deadline();
            let tone = self.context.next_tone_at();

            tokio::select! {
                // Sample the next camera unless a cycle is still running
                _ = sleep_until(next_tick) => {
                    self.on_tick().await;
                    let interval = self.scheduler_config.tick_interval(self.context.active_camera_count());
                    next_tick = Instant::now() + interval;
                }
                // Give up on a hung analysis
                _ = sleep_until_opt(watchdog) => {
                    if let Some(reaction) = self.context.expire_watchdog(Instant::now()) {
                        self.apply(reaction).await;
                    }
                }
                // Re-arm the alarm tone
                _ = sleep_until_opt(tone) => {
                    if let Some(effect) = self.context.tone_due(Instant::now()) {
                        self.notify(&effect).await;
                    }
                }
                // Results from spawned cycles, possibly stale
                Some((seq, outcome)) = self.completions_rx.recv() => {
                    self.on_completion(seq, outcome).await;
                }
                // Operator commands
                command = self.commands.recv() => match command {
                    Some(MonitorCommand::Shutdown) | None => break,
                    Some(command) => {
                        let was_running = self.context.is_running();
                        self.on_command(command).await;
                        if !was_running && self.context.is_running() {
                            next_tick = Instant::now();
                        }
                    }
                },
            }

            self.publish_snapshot();
        }

        // Reset the alarm before exiting
        let reaction = self.context.stop();
        self.apply(reaction).await;
        self.publish_snapshot();
        info!("Monitor loop stopped");
        Ok(())
    }

    async fn on_tick(&mut self) {
        match self.context.begin_cycle(Instant::now()) {
            TickDecision::Start(request) => {
                self.deps.metrics.cycles_started.inc();
                self.emit(MonitorEvent::CycleStarted {
                    seq: request.seq,
                    camera_id: request.camera_id.clone(),
                });
                self.spawn_cycle(request);
            }
            TickDecision::Busy => {
                debug!("Tick skipped, analysis in flight");
            }
            TickDecision::Idle => {}
        }
    }

    fn spawn_cycle(&self, request: CycleRequest) {
        let gateway = self.deps.gateway.clone();
        let frames = self.deps.frames.clone();
        let completions = self.completions_tx.clone();
        let limits = self.limits;

        tokio::spawn(async move {
            let outcome = run_cycle(frames.as_ref(), gateway.as_ref(), &request.camera_id, limits).await;
            if completions.send((request.seq, outcome)).await.is_err() {
                debug!("Monitor loop gone, dropping result of cycle {}", request.seq);
            }
        });
    }

    async fn on_completion(&mut self, seq: u64, outcome: CycleOutcome) {
        match self.context.complete_cycle(seq, outcome, Instant::now()) {
            Some(reaction) => self.apply(reaction).await,
            None => {
                warn!("Discarding late result for abandoned cycle {}", seq);
                self.deps.metrics.late_results_discarded.inc();
            }
        }
    }

    async fn on_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::Start => self.context.start(),
            MonitorCommand::Stop => {
                let reaction = self.context.stop();
                self.apply(reaction).await;
            }
            MonitorCommand::Acknowledge => {
                let reaction = self.context.acknowledge();
                self.apply(reaction).await;
            }
            MonitorCommand::RegisterCamera { id, label } => {
                self.context.register_camera(&id, &label);
            }
            MonitorCommand::SetCameraActive { id, active, reply } => {
                let _ = reply.send(self.context.set_camera_active(&id, active));
            }
            MonitorCommand::RenameCamera { id, label, reply } => {
                let result = self.rename_camera(&id, &label).await;
                let _ = reply.send(result);
            }
            MonitorCommand::UpdateSettings { settings, reply } => {
                let result = match self.context.update_settings(settings, Instant::now()) {
                    Ok(reaction) => {
                        self.apply(reaction).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            MonitorCommand::Shutdown => {}
        }
    }

    async fn rename_camera(&mut self, id: &str, label: &str) -> Result<()> {
        self.context.rename_camera(id, label)?;
        if let Some(store) = &self.deps.labels {
            store.set_label(id, label).await?;
        }
        info!("Camera {} renamed to '{}'", id, label);
        Ok(())
    }

    async fn apply(&mut self, reaction: Reaction) {
        let metrics = &self.deps.metrics;
        match reaction.outcome {
            Some(OutcomeKind::Completed) => metrics.analyses_completed.inc(),
            Some(OutcomeKind::Inconclusive) => metrics.inconclusive_results.inc(),
            Some(OutcomeKind::Failed) => metrics.gateway_errors.inc(),
            Some(OutcomeKind::CaptureFailed) => metrics.capture_failures.inc(),
            Some(OutcomeKind::WatchdogExpired) => {
                metrics.watchdog_expiries.inc();
                metrics.inconclusive_results.inc();
            }
            None => {}
        }

        for effect in &reaction.effects {
            self.notify(effect).await;
        }

        for event in reaction.events {
            if matches!(event, MonitorEvent::AlertStateChanged { state: AlertState::Active }) {
                self.deps.metrics.alarms_raised.inc();
            }
            self.emit(event);
        }
        self.deps.metrics.set_alert_state(self.context.alert_state());
    }

    async fn notify(&self, effect: &AlertEffect) {
        if matches!(effect, AlertEffect::CriticalSms { .. }) {
            self.deps.metrics.sms_sent.inc();
        }
        if let Err(e) = dispatch(self.deps.notifier.as_ref(), effect).await {
            error!("Notifier failed on {:?}: {}", effect, e);
        }
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.context.snapshot(Instant::now()));
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending::<()>().await,
    }
}

/// Capture, compress and analyze one frame. Never fails: every problem is
/// folded into the outcome so the loop can release its busy flag.
#[instrument(skip(frames, gateway, limits), level = "debug")]
async fn run_cycle(
    frames: &dyn FrameSource,
    gateway: &dyn AnalysisGateway,
    camera_id: &str,
    limits: CycleLimits,
) -> CycleOutcome {
    let frame = match frames.capture(camera_id).await {
        Ok(Some(frame)) => frame,
        Ok(None) => return CycleOutcome::NoFrame("no frame available".to_string()),
        Err(e) => return CycleOutcome::NoFrame(e.to_string()),
    };

    let compressed =
        tokio::task::spawn_blocking(move || compress_frame(&frame, limits.max_dimension, limits.jpeg_quality)).await;
    let image = match compressed {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => return CycleOutcome::NoFrame(format!("unreadable frame: {}", e)),
        Err(e) => return CycleOutcome::NoFrame(format!("compression task failed: {}", e)),
    };

    match tokio::time::timeout(limits.gateway_timeout, gateway.analyze(&image)).await {
        Ok(Ok(analysis)) => CycleOutcome::Completed(analysis),
        Ok(Err(e)) => CycleOutcome::GatewayFailed(e),
        Err(elapsed) => CycleOutcome::GatewayFailed(elapsed.into()),
    }
}

impl MonitorHandle {
    async fn send(&self, command: MonitorCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::ChannelClosed)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> MonitorCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| MonitorError::ChannelClosed)?
    }

    pub async fn start(&self) -> Result<()> {
        self.send(MonitorCommand::Start).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(MonitorCommand::Stop).await
    }

    pub async fn acknowledge(&self) -> Result<()> {
        self.send(MonitorCommand::Acknowledge).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(MonitorCommand::Shutdown).await
    }

    pub async fn register_camera(&self, id: &str, label: &str) -> Result<()> {
        self.send(MonitorCommand::RegisterCamera {
            id: id.to_string(),
            label: label.to_string(),
        })
        .await
    }

    pub async fn set_camera_active(&self, id: &str, active: bool) -> Result<()> {
        self.request(|reply| MonitorCommand::SetCameraActive {
            id: id.to_string(),
            active,
            reply,
        })
        .await
    }

    pub async fn rename_camera(&self, id: &str, label: &str) -> Result<()> {
        self.request(|reply| MonitorCommand::RenameCamera {
            id: id.to_string(),
            label: label.to_string(),
            reply,
        })
        .await
    }

    pub async fn update_settings(&self, settings: AlertSettings) -> Result<()> {
        self.request(|reply| MonitorCommand::UpdateSettings { settings, reply }).await
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Waits until the published snapshot satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl Fn(&MonitorSnapshot) -> bool) -> Result<MonitorSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| MonitorError::ChannelClosed)?;
        Ok(snapshot.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
