//! Feed session runtime
//!
//! A [`FeedSession`] owns a [`DiscoveryEngine`] on a spawned tokio task that
//! acts as the feed's control thread. Host input is queued as commands,
//! alarms are sleeping tasks that post back into the same queue, and results
//! fan out to subscribers:
//!
//! - every [`SessionEvent`] on a broadcast channel
//! - the latest [`FeedSnapshot`] on a watch channel
//!
//! Dropping the handle stops the task and aborts every pending alarm.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use discovery_core::config::{ConfigError, DiscoveryConfig};
use discovery_core::engine::{DiscoveryEngine, DiscoveryEvent, Effect, FeedSnapshot};
use discovery_core::physics::{ArcPhysics, CardTransform};
use discovery_core::{ActionKind, CandidateItem, GestureSample, TimerId, TimerKind};

use crate::collaborators::{Collaborators, SwipeOutcome};

/// Capacity of the event broadcast channel
pub const EVENT_CAPACITY: usize = 64;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session task is gone
    #[error("Feed session closed")]
    Closed,

    /// The configuration was rejected
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Events published by a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Produced by the engine
    Discovery(DiscoveryEvent),
    /// Related items arrived for a long-pressed card
    SimilarItems {
        /// The held item
        item_id: String,
        /// Related candidates
        items: Vec<CandidateItem>,
    },
}

#[derive(Debug)]
enum Command {
    DragStart,
    DragUpdate(GestureSample),
    Release(GestureSample),
    Cancel,
    Undo,
    Like,
    Dislike,
    AcceptNotification,
    DismissNotification,
    TimerFired(TimerId),
    Snapshot(oneshot::Sender<FeedSnapshot>),
    Shutdown,
}

#[derive(Debug)]
enum OutcomeOp {
    Record(SwipeOutcome),
    Retract(String),
}

/// Handle to a running feed
///
/// # Example
///
/// ```no_run
/// use discovery_core::{CandidateItem, DiscoveryConfig, GestureSample};
/// use discovery_state::{Collaborators, FeedSession};
///
/// #[tokio::main]
/// async fn main() {
///     let items = vec![CandidateItem::new("a", "Chic Boutique", "dress", "https://cdn/a.jpg", 90.0)];
///     let session = FeedSession::start(DiscoveryConfig::default(), items, Collaborators::new()).unwrap();
///     let mut events = session.subscribe();
///
///     session.drag_start().unwrap();
///     session.release(GestureSample::at(200.0, 0.0, 250)).unwrap();
///
///     let event = events.recv().await.unwrap();
///     println!("{:?}", event);
/// }
/// ```
pub struct FeedSession {
    id: Uuid,
    physics: ArcPhysics,
    commands: mpsc::UnboundedSender<Command>,
    events_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<FeedSnapshot>,
    _handle: JoinHandle<()>,
}

impl FeedSession {
    /// Start a session on the current tokio runtime
    pub fn start(
        config: DiscoveryConfig,
        items: Vec<CandidateItem>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let engine = DiscoveryEngine::new(config, items)?;
        let id = Uuid::new_v4();
        let physics = ArcPhysics::new(engine.config());

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

        let outcomes = collaborators.outcomes.clone().map(|sink| {
            let (tx, mut rx) = mpsc::unbounded_channel::<OutcomeOp>();
            tokio::spawn(async move {
                // Sequential so a retract never overtakes its record
                while let Some(op) = rx.recv().await {
                    let result = match op {
                        OutcomeOp::Record(outcome) => sink.record(outcome).await,
                        OutcomeOp::Retract(item_id) => sink.retract(id, item_id).await,
                    };
                    if let Err(e) = result {
                        tracing::warn!(session_id = %id, error = %e, "failed to persist outcome");
                    }
                }
            });
            tx
        });

        let driver = Driver {
            id,
            engine,
            collaborators,
            outcomes,
            alarms: HashMap::new(),
            commands: commands.downgrade(),
            events_tx: events_tx.clone(),
            snapshot_tx,
        };
        let handle = tokio::spawn(driver.run(command_rx));

        Ok(Self {
            id,
            physics,
            commands,
            events_tx,
            snapshot_rx,
            _handle: handle,
        })
    }

    /// Session id, stamped on persisted outcomes
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Live transform for a drag offset, computed on the caller's thread
    pub fn preview(&self, dx: f32) -> CardTransform {
        self.physics.transform(dx)
    }

    /// Finger down
    pub fn drag_start(&self) -> Result<()> {
        self.send(Command::DragStart)
    }

    /// Finger moved
    pub fn drag_update(&self, sample: GestureSample) -> Result<()> {
        self.send(Command::DragUpdate(sample))
    }

    /// Finger lifted
    pub fn release(&self, sample: GestureSample) -> Result<()> {
        self.send(Command::Release(sample))
    }

    /// Pointer cancelled by the platform
    pub fn cancel(&self) -> Result<()> {
        self.send(Command::Cancel)
    }

    /// Undo the last swipe
    pub fn undo(&self) -> Result<()> {
        self.send(Command::Undo)
    }

    /// Like the top card from a button
    pub fn like_current(&self) -> Result<()> {
        self.send(Command::Like)
    }

    /// Dislike the top card from a button
    pub fn dislike_current(&self) -> Result<()> {
        self.send(Command::Dislike)
    }

    /// Accept the loyalty prompt
    pub fn accept_notification(&self) -> Result<()> {
        self.send(Command::AcceptNotification)
    }

    /// Close the loyalty prompt
    pub fn dismiss_notification(&self) -> Result<()> {
        self.send(Command::DismissNotification)
    }

    /// Snapshot after every queued command has been applied
    pub async fn snapshot(&self) -> Result<FeedSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Last published snapshot, without waiting
    pub fn current(&self) -> FeedSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Whether the session task has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Stop the session
    pub fn shutdown(self) {
        drop(self);
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// State owned by the session task
struct Driver {
    id: Uuid,
    engine: DiscoveryEngine,
    collaborators: Collaborators,
    outcomes: Option<mpsc::UnboundedSender<OutcomeOp>>,
    alarms: HashMap<TimerId, JoinHandle<()>>,
    commands: mpsc::WeakUnboundedSender<Command>,
    events_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<FeedSnapshot>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!(session_id = %self.id, "feed session started");

        while let Some(command) = commands.recv().await {
            let effects = match command {
                Command::DragStart => self.engine.drag_start(),
                Command::DragUpdate(sample) => self.engine.drag_update(sample),
                Command::Release(sample) => self.engine.release(sample),
                Command::Cancel => self.engine.cancel(),
                Command::Undo => self.engine.undo(),
                Command::Like => self.engine.like_current(),
                Command::Dislike => self.engine.dislike_current(),
                Command::AcceptNotification => self.engine.accept_notification(),
                Command::DismissNotification => self.engine.dismiss_notification(),
                Command::TimerFired(timer) => {
                    self.alarms.remove(&timer);
                    self.engine.timer_fired(timer)
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.engine.snapshot());
                    continue;
                }
                Command::Shutdown => break,
            };

            for effect in effects {
                self.apply(effect);
            }
            self.publish();
        }

        for (_, alarm) in self.alarms.drain() {
            alarm.abort();
        }
        tracing::debug!(session_id = %self.id, "feed session stopped");
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Schedule { timer, kind, after } => self.schedule(timer, kind, after),
            Effect::Cancel(timer) => {
                if let Some(alarm) = self.alarms.remove(&timer) {
                    tracing::trace!(%timer, "alarm cancelled");
                    alarm.abort();
                }
            }
            Effect::Emit(event) => self.dispatch(event),
        }
    }

    fn schedule(&mut self, timer: TimerId, kind: TimerKind, after: Duration) {
        let commands = self.commands.clone();
        let alarm = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::TimerFired(timer));
            }
        });
        tracing::trace!(%timer, ?kind, ?after, "alarm scheduled");

        if let Some(previous) = self.alarms.insert(timer, alarm) {
            previous.abort();
        }
    }

    fn dispatch(&self, event: DiscoveryEvent) {
        match &event {
            DiscoveryEvent::SwipedRight(item) => self.record(ActionKind::Like, item),
            DiscoveryEvent::SwipedLeft(item) => self.record(ActionKind::Dislike, item),
            DiscoveryEvent::Undone { item, .. } => {
                if let Some(outcomes) = &self.outcomes {
                    let _ = outcomes.send(OutcomeOp::Retract(item.id.clone()));
                }
            }
            DiscoveryEvent::LongPress(item) => self.lookup_similar(item),
            DiscoveryEvent::Haptic(pattern) => {
                if let Some(haptics) = self.collaborators.haptics.clone() {
                    let pattern = *pattern;
                    tokio::spawn(async move {
                        if let Err(e) = haptics.pulse(pattern).await {
                            tracing::warn!(error = %e, ?pattern, "haptic pulse failed");
                        }
                    });
                }
            }
            _ => {}
        }

        // No subscribers is fine
        let _ = self.events_tx.send(SessionEvent::Discovery(event));
    }

    fn record(&self, kind: ActionKind, item: &CandidateItem) {
        if let Some(outcomes) = &self.outcomes {
            let _ = outcomes.send(OutcomeOp::Record(SwipeOutcome::new(self.id, kind, item)));
        }
    }

    fn lookup_similar(&self, item: &CandidateItem) {
        let Some(service) = self.collaborators.similar.clone() else {
            return;
        };
        let events_tx = self.events_tx.clone();
        let item = item.clone();
        tokio::spawn(async move {
            let item_id = item.id.clone();
            match service.similar_to(item).await {
                Ok(items) => {
                    tracing::debug!(%item_id, count = items.len(), "similar items loaded");
                    let _ = events_tx.send(SessionEvent::SimilarItems { item_id, items });
                }
                Err(e) => {
                    tracing::warn!(%item_id, error = %e, "similar items lookup failed");
                }
            }
        });
    }

    fn publish(&self) {
        let next = self.engine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
