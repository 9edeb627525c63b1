//! Discovery engine
//!
//! The engine is the control-thread state machine of one feed. Every input
//! (touch-down, sample, release, alarm, button) returns a list of
//! [`Effect`]s for the host to carry out: schedule or cancel an alarm, or
//! deliver an event. The engine itself never sleeps, spawns or calls out.
//!
//! # Example
//!
//! ```rust
//! use discovery_core::{CandidateItem, DiscoveryConfig, DiscoveryEngine, GestureSample};
//!
//! let items = vec![CandidateItem::new("a", "Chic Boutique", "dress", "https://cdn/a.jpg", 90.0)];
//! let mut engine = DiscoveryEngine::new(DiscoveryConfig::default(), items).unwrap();
//!
//! let effects = engine.drag_start();
//! assert!(!effects.is_empty());
//!
//! let transform = engine.render(60.0);
//! assert!(transform.translate_y < 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::CandidateItem;
use crate::config::{self, DiscoveryConfig};
use crate::fling::{ExitTrajectory, FlingResolver, SnapBack};
use crate::gesture::{GestureClassifier, GesturePhase, GestureSample, ReleaseOutcome, SwipeDecision};
use crate::loyalty::{LoyaltyCheck, LoyaltyDetector, LoyaltyNotification, RecentBuffer};
use crate::physics::{ArcPhysics, CardTransform};
use crate::queue::{ActionKind, CardQueue, PendingAction};
use crate::timer::{TimerId, TimerIds, TimerKind};
use crate::undo::UndoController;

/// Haptic pulse requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HapticPattern {
    /// Drag crossed the commit threshold
    Selection,
    /// Swipe committed
    Success,
    /// Long-press recognised
    Heavy,
}

/// Why a loyalty notification went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DismissReason {
    /// The user tapped "favorite"
    Accepted,
    /// The user closed it
    Dismissed,
    /// It timed out
    Expired,
    /// The like that qualified the boutique was undone
    Withdrawn,
}

/// Something the host must react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "payload")]
pub enum DiscoveryEvent {
    /// A card was liked; fired once per card after its fling completed
    SwipedRight(CandidateItem),
    /// A card was disliked; fired once per card after its fling completed
    SwipedLeft(CandidateItem),
    /// A still hold asked for similar items
    LongPress(CandidateItem),
    /// A committed card started leaving the screen
    #[serde(rename_all = "camelCase")]
    FlingStarted {
        /// Direction of the swipe
        kind: ActionKind,
        /// Item being flung
        item_id: String,
        /// Exit animation
        exit: ExitTrajectory,
    },
    /// The card returns to the center
    SnapBack(SnapBack),
    /// The undo button should appear
    #[serde(rename_all = "camelCase")]
    UndoAvailable {
        /// What can be undone
        kind: ActionKind,
        /// Item that can be restored
        item_id: String,
    },
    /// The undo window closed without an undo
    UndoExpired,
    /// The last swipe was reverted
    Undone {
        /// What was reverted
        kind: ActionKind,
        /// The restored item
        item: CandidateItem,
        /// Cursor after the undo
        index: usize,
    },
    /// A loyalty prompt should appear
    LoyaltyNotification(LoyaltyNotification),
    /// The loyalty prompt went away
    LoyaltyClosed {
        /// The prompt that closed
        notification: LoyaltyNotification,
        /// Why it closed
        reason: DismissReason,
    },
    /// The user favorited a boutique from the prompt
    BoutiqueFavorite(String),
    /// Haptic feedback
    Haptic(HapticPattern),
    /// No candidates left
    AllCaughtUp,
}

/// Instruction for the host runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start a one-shot alarm; call [`DiscoveryEngine::timer_fired`] when it goes off
    Schedule {
        /// Alarm id
        timer: TimerId,
        /// What the alarm is for
        kind: TimerKind,
        /// Delay before firing
        after: std::time::Duration,
    },
    /// Cancel a previously scheduled alarm
    Cancel(TimerId),
    /// Deliver an event
    Emit(DiscoveryEvent),
}

/// Per-session counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Net likes (undone likes are subtracted)
    pub likes: u32,
    /// Net dislikes (undone dislikes are subtracted)
    pub dislikes: u32,
    /// Successful undos
    pub undos: u32,
    /// Long-presses recognised
    pub long_presses: u32,
}

/// Everything a screen needs to draw the feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    /// Cursor position
    pub index: usize,
    /// Number of candidates
    pub len: usize,
    /// Card to draw on top (absent for malformed items and empty feeds)
    pub top_card: Option<CandidateItem>,
    /// Whether every card has been swiped
    pub exhausted: bool,
    /// Gesture state of the top card
    pub phase: GesturePhase,
    /// Whether a committed card is still leaving the screen
    pub fling_in_progress: bool,
    /// Whether the undo button is showing
    pub undo_visible: bool,
    /// The undoable action
    pub pending_action: Option<PendingAction>,
    /// Loyalty prompt on screen
    pub notification: Option<LoyaltyNotification>,
    /// "Recently loved" strip, newest first
    pub recently_loved: Vec<CandidateItem>,
    /// Counters
    pub stats: SessionStats,
}

/// A committed card whose exit animation has not finished
#[derive(Debug, Clone)]
struct InFlight {
    kind: ActionKind,
    item: CandidateItem,
    index_at_commit: usize,
    timer: TimerId,
}

/// Swipe discovery state machine for one feed session
#[derive(Debug)]
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    physics: ArcPhysics,
    classifier: GestureClassifier,
    resolver: FlingResolver,
    queue: CardQueue,
    undo: UndoController,
    loyalty: LoyaltyDetector,
    timers: TimerIds,
    in_flight: Option<InFlight>,
    stats: SessionStats,
}

impl DiscoveryEngine {
    /// Create an engine for a candidate list
    pub fn new(config: DiscoveryConfig, items: Vec<CandidateItem>) -> config::Result<Self> {
        config.validate()?;
        tracing::debug!(candidates = items.len(), "discovery engine created");

        Ok(Self {
            physics: ArcPhysics::new(&config),
            classifier: GestureClassifier::new(&config.gesture),
            resolver: FlingResolver::new(&config),
            queue: CardQueue::new(items),
            undo: UndoController::new(config.undo_window()),
            loyalty: LoyaltyDetector::new(config.recent_capacity, config.loyalty_threshold),
            timers: TimerIds::new(),
            in_flight: None,
            stats: SessionStats::default(),
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// The candidate queue
    pub fn queue(&self) -> &CardQueue {
        &self.queue
    }

    /// Recently liked items
    pub fn recent(&self) -> &RecentBuffer {
        self.loyalty.recent()
    }

    /// Gesture phase
    pub fn phase(&self) -> GesturePhase {
        self.classifier.phase()
    }

    /// Counters
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Whether the undo button is showing
    pub fn is_undo_visible(&self) -> bool {
        self.undo.is_visible()
    }

    /// Loyalty prompt on screen
    pub fn notification(&self) -> Option<&LoyaltyNotification> {
        self.loyalty.live()
    }

    /// Live feedback for a drag offset. Pure; safe to call every frame.
    pub fn render(&self, dx: f32) -> CardTransform {
        self.physics.transform(dx)
    }

    /// Current drawable state
    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            index: self.queue.index(),
            len: self.queue.len(),
            top_card: self.queue.visible().filter(|item| item.is_renderable()).cloned(),
            exhausted: self.queue.is_exhausted(),
            phase: self.classifier.phase(),
            fling_in_progress: self.in_flight.is_some(),
            undo_visible: self.undo.is_visible(),
            pending_action: self.queue.pending().cloned(),
            notification: self.loyalty.live().cloned(),
            recently_loved: self.loyalty.recent().to_vec(),
            stats: self.stats,
        }
    }

    /// Finger down on the top card
    pub fn drag_start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.can_interact() {
            return effects;
        }

        let timer = self.timers.allocate();
        if let Some(stale) = self.classifier.begin(timer) {
            effects.push(Effect::Cancel(stale));
        }
        effects.push(Effect::Schedule {
            timer,
            kind: TimerKind::LongPress,
            after: self.config.long_press_duration(),
        });
        effects
    }

    /// Finger moved
    pub fn drag_update(&mut self, sample: GestureSample) -> Vec<Effect> {
        let mut effects = Vec::new();
        let outcome = self.classifier.on_sample(sample);
        if let Some(timer) = outcome.cancelled_long_press {
            tracing::trace!(%timer, "movement cancelled long-press");
            effects.push(Effect::Cancel(timer));
        }
        if outcome.crossed_threshold {
            effects.push(Effect::Emit(DiscoveryEvent::Haptic(HapticPattern::Selection)));
        }
        effects
    }

    /// Finger lifted with the final sample
    pub fn release(&mut self, sample: GestureSample) -> Vec<Effect> {
        let mut effects = Vec::new();
        let release = self.classifier.release(sample);
        if let Some(timer) = release.cancelled_long_press {
            effects.push(Effect::Cancel(timer));
        }

        match release.outcome {
            ReleaseOutcome::Ignored => {}
            ReleaseOutcome::Suppressed => {
                tracing::debug!("release after long-press, no swipe");
            }
            ReleaseOutcome::Decided { decision, sample } => match decision {
                SwipeDecision::Like => self.start_fling(ActionKind::Like, &sample, &mut effects),
                SwipeDecision::Dislike => {
                    self.start_fling(ActionKind::Dislike, &sample, &mut effects)
                }
                SwipeDecision::SnapBack => {
                    let snap = self.resolver.snap_back(&sample);
                    effects.push(Effect::Emit(DiscoveryEvent::SnapBack(snap)));
                    self.classifier.settle();
                }
            },
        }
        effects
    }

    /// Pointer cancelled by the platform
    pub fn cancel(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(session) = self.classifier.cancel() else {
            return effects;
        };
        if let Some(timer) = session.long_press_timer() {
            effects.push(Effect::Cancel(timer));
        }
        if !session.is_suppressed() {
            let last = session.last_sample().copied().unwrap_or_default();
            effects.push(Effect::Emit(DiscoveryEvent::SnapBack(self.resolver.snap_back(&last))));
        }
        self.classifier.settle();
        effects
    }

    /// Heart button: like the top card without a gesture
    pub fn like_current(&mut self) -> Vec<Effect> {
        self.commit_from_button(ActionKind::Like)
    }

    /// Cross button: dislike the top card without a gesture
    pub fn dislike_current(&mut self) -> Vec<Effect> {
        self.commit_from_button(ActionKind::Dislike)
    }

    /// An alarm went off
    pub fn timer_fired(&mut self, timer: TimerId) -> Vec<Effect> {
        if self.classifier.on_long_press(timer) {
            return self.on_long_press();
        }
        if matches!(&self.in_flight, Some(flight) if flight.timer == timer) {
            return self.complete_fling();
        }
        if self.undo.expire(timer) {
            self.queue.clear_pending();
            tracing::debug!("undo window closed");
            return vec![Effect::Emit(DiscoveryEvent::UndoExpired)];
        }
        if let Some(notification) = self.loyalty.expire(timer) {
            return vec![Effect::Emit(DiscoveryEvent::LoyaltyClosed {
                notification,
                reason: DismissReason::Expired,
            })];
        }

        tracing::debug!(%timer, "ignoring stale timer");
        Vec::new()
    }

    /// Revert the last committed swipe
    pub fn undo(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.in_flight.is_some() {
            tracing::debug!("undo ignored while a card is leaving");
            return effects;
        }
        let Some(action) = self.queue.undo() else {
            tracing::debug!("nothing to undo");
            return effects;
        };

        // A drag on the card that is about to be replaced is abandoned
        if let Some(session) = self.classifier.cancel() {
            if let Some(timer) = session.long_press_timer() {
                effects.push(Effect::Cancel(timer));
            }
            self.classifier.settle();
        }
        if let Some(timer) = self.undo.disarm() {
            effects.push(Effect::Cancel(timer));
        }

        let mut withdrawn = None;
        match action.kind {
            ActionKind::Like => {
                if self.loyalty.remove_like(&action.item.id) {
                    withdrawn = self.loyalty.withdraw_below_threshold();
                }
                self.stats.likes = self.stats.likes.saturating_sub(1);
            }
            ActionKind::Dislike => {
                self.stats.dislikes = self.stats.dislikes.saturating_sub(1);
            }
        }
        self.stats.undos += 1;

        tracing::debug!(
            kind = action.kind.as_str(),
            item_id = %action.item.id,
            index = self.queue.index(),
            "swipe undone"
        );
        effects.push(Effect::Emit(DiscoveryEvent::Undone {
            kind: action.kind,
            item: action.item,
            index: self.queue.index(),
        }));
        if let Some((notification, timer)) = withdrawn {
            tracing::debug!(source = %notification.source_name, "loyalty prompt withdrawn");
            effects.push(Effect::Cancel(timer));
            effects.push(Effect::Emit(DiscoveryEvent::LoyaltyClosed {
                notification,
                reason: DismissReason::Withdrawn,
            }));
        }
        effects
    }

    /// The user accepted the loyalty prompt
    pub fn accept_notification(&mut self) -> Vec<Effect> {
        let Some((notification, timer)) = self.loyalty.close() else {
            return Vec::new();
        };
        let source_name = notification.source_name.clone();
        vec![
            Effect::Cancel(timer),
            Effect::Emit(DiscoveryEvent::LoyaltyClosed {
                notification,
                reason: DismissReason::Accepted,
            }),
            Effect::Emit(DiscoveryEvent::BoutiqueFavorite(source_name)),
        ]
    }

    /// The user closed the loyalty prompt
    pub fn dismiss_notification(&mut self) -> Vec<Effect> {
        let Some((notification, timer)) = self.loyalty.close() else {
            return Vec::new();
        };
        vec![
            Effect::Cancel(timer),
            Effect::Emit(DiscoveryEvent::LoyaltyClosed {
                notification,
                reason: DismissReason::Dismissed,
            }),
        ]
    }

    fn can_interact(&self) -> bool {
        if self.in_flight.is_some() {
            tracing::debug!("card still leaving, ignoring input");
            return false;
        }
        match self.queue.current() {
            None => {
                tracing::debug!("feed exhausted, ignoring input");
                false
            }
            Some(item) if !item.is_renderable() => {
                tracing::warn!(item_id = %item.id, "malformed candidate, ignoring input");
                false
            }
            Some(_) => true,
        }
    }

    fn commit_from_button(&mut self, kind: ActionKind) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.classifier.is_active() || !self.can_interact() {
            return effects;
        }
        self.start_fling(kind, &GestureSample::default(), &mut effects);
        effects
    }

    fn start_fling(&mut self, kind: ActionKind, sample: &GestureSample, effects: &mut Vec<Effect>) {
        let Some(item) = self.queue.current().cloned() else {
            return;
        };
        let start_y = self.physics.translate_y(sample.dx);
        let exit = self.resolver.exit(kind, sample, start_y);
        let timer = self.timers.allocate();

        tracing::debug!(
            kind = kind.as_str(),
            item_id = %item.id,
            dx = sample.dx,
            velocity_x = exit.velocity_x,
            "swipe committed"
        );

        // The next commit closes the previous undo window
        if let Some(previous) = self.undo.disarm() {
            self.queue.clear_pending();
            effects.push(Effect::Cancel(previous));
            effects.push(Effect::Emit(DiscoveryEvent::UndoExpired));
        }

        effects.push(Effect::Emit(DiscoveryEvent::Haptic(HapticPattern::Success)));
        effects.push(Effect::Emit(DiscoveryEvent::FlingStarted {
            kind,
            item_id: item.id.clone(),
            exit,
        }));
        effects.push(Effect::Schedule {
            timer,
            kind: TimerKind::FlingComplete,
            after: exit.duration(),
        });

        self.in_flight = Some(InFlight {
            kind,
            item,
            index_at_commit: self.queue.index(),
            timer,
        });
    }

    fn on_long_press(&mut self) -> Vec<Effect> {
        let Some(item) = self.queue.current().cloned() else {
            return Vec::new();
        };
        self.stats.long_presses += 1;
        tracing::debug!(item_id = %item.id, "long-press recognised");
        vec![
            Effect::Emit(DiscoveryEvent::Haptic(HapticPattern::Heavy)),
            Effect::Emit(DiscoveryEvent::LongPress(item)),
        ]
    }

    fn complete_fling(&mut self) -> Vec<Effect> {
        let Some(flight) = self.in_flight.take() else {
            return Vec::new();
        };
        self.classifier.settle();

        let mut effects = Vec::new();
        self.queue.advance();
        self.queue
            .record_action(flight.kind, flight.item.clone(), flight.index_at_commit);

        let undo_timer = self.timers.allocate();
        if let Some(previous) = self.undo.arm(undo_timer) {
            effects.push(Effect::Cancel(previous));
        }
        effects.push(Effect::Schedule {
            timer: undo_timer,
            kind: TimerKind::UndoWindow,
            after: self.undo.window(),
        });

        let item_id = flight.item.id.clone();
        match flight.kind {
            ActionKind::Like => {
                self.stats.likes += 1;
                effects.push(Effect::Emit(DiscoveryEvent::SwipedRight(flight.item.clone())));
            }
            ActionKind::Dislike => {
                self.stats.dislikes += 1;
                effects.push(Effect::Emit(DiscoveryEvent::SwipedLeft(flight.item.clone())));
            }
        }
        effects.push(Effect::Emit(DiscoveryEvent::UndoAvailable {
            kind: flight.kind,
            item_id,
        }));

        if flight.kind == ActionKind::Like {
            match self.loyalty.record_like(flight.item) {
                LoyaltyCheck::Below => {}
                LoyaltyCheck::Qualified(notification) => {
                    let timer = self.timers.allocate();
                    tracing::debug!(source = %notification.source_name, "loyalty threshold reached");
                    self.loyalty.show(notification.clone(), timer);
                    effects.push(Effect::Schedule {
                        timer,
                        kind: TimerKind::Notification,
                        after: self.config.notification_duration(),
                    });
                    effects.push(Effect::Emit(DiscoveryEvent::LoyaltyNotification(notification)));
                }
                LoyaltyCheck::Dropped(notification) => {
                    tracing::debug!(
                        source = %notification.source_name,
                        "loyalty prompt already showing, dropping"
                    );
                }
            }
        }

        if self.queue.is_exhausted() {
            tracing::debug!("feed exhausted");
            effects.push(Effect::Emit(DiscoveryEvent::AllCaughtUp));
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn item(id: &str, source: &str) -> CandidateItem {
        CandidateItem::new(id, source, "dress", format!("https://cdn/{}.jpg", id), 120.0)
    }

    fn engine_with(items: Vec<CandidateItem>) -> DiscoveryEngine {
        DiscoveryEngine::new(DiscoveryConfig::default(), items).unwrap()
    }

    fn scheduled(effects: &[Effect], kind: TimerKind) -> Option<(TimerId, Duration)> {
        effects.iter().find_map(|effect| match effect {
            Effect::Schedule { timer, kind: k, after } if *k == kind => Some((*timer, *after)),
            _ => None,
        })
    }

    fn events(effects: &[Effect]) -> Vec<DiscoveryEvent> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    fn cancelled(effects: &[Effect]) -> Vec<TimerId> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Cancel(timer) => Some(*timer),
                _ => None,
            })
            .collect()
    }

    /// Drag, release past the threshold and let the fling finish
    fn swipe(engine: &mut DiscoveryEngine, dx: f32, velocity_x: f32) -> Vec<Effect> {
        engine.drag_start();
        engine.drag_update(GestureSample::at(dx, 0.0, 100));
        let released = engine.release(GestureSample::at(dx, 0.0, 120).with_velocity(velocity_x, 0.0));
        let (fling, _) = scheduled(&released, TimerKind::FlingComplete).expect("fling scheduled");
        engine.timer_fired(fling)
    }

    #[test]
    fn test_swipe_right_then_undo() {
        let items = vec![item("i0", "A"), item("i1", "B"), item("i2", "C")];
        let mut engine = engine_with(items.clone());

        engine.drag_start();
        engine.drag_update(GestureSample::at(200.0, 0.0, 100));
        let released = engine.release(GestureSample::at(200.0, 0.0, 120).with_velocity(50.0, 0.0));

        // Nothing is final until the fling completes
        assert_eq!(engine.queue().index(), 0);
        assert!(!events(&released)
            .iter()
            .any(|e| matches!(e, DiscoveryEvent::SwipedRight(_))));
        let (fling, _) = scheduled(&released, TimerKind::FlingComplete).unwrap();

        let completed = engine.timer_fired(fling);
        let emitted = events(&completed);
        assert_eq!(emitted[0], DiscoveryEvent::SwipedRight(items[0].clone()));
        assert_eq!(engine.queue().index(), 1);
        assert_eq!(engine.recent().to_vec(), vec![items[0].clone()]);
        assert!(engine.is_undo_visible());
        let (undo_timer, window) = scheduled(&completed, TimerKind::UndoWindow).unwrap();
        assert_eq!(window, Duration::from_millis(3000));

        let undone = engine.undo();
        assert_eq!(engine.queue().index(), 0);
        assert!(engine.recent().is_empty());
        assert!(!engine.is_undo_visible());
        assert_eq!(cancelled(&undone), vec![undo_timer]);
        assert!(matches!(
            &events(&undone)[0],
            DiscoveryEvent::Undone { kind: ActionKind::Like, index: 0, .. }
        ));

        // Second undo is a no-op
        assert!(engine.undo().is_empty());
        assert_eq!(engine.queue().index(), 0);

        // Late alarm for the closed window is stale
        assert!(engine.timer_fired(undo_timer).is_empty());
    }

    #[test]
    fn test_undo_after_window_is_noop() {
        let mut engine = engine_with(vec![item("i0", "A"), item("i1", "A")]);
        let completed = swipe(&mut engine, -300.0, -900.0);
        let (undo_timer, _) = scheduled(&completed, TimerKind::UndoWindow).unwrap();

        let expired = engine.timer_fired(undo_timer);
        assert_eq!(events(&expired), vec![DiscoveryEvent::UndoExpired]);
        assert!(engine.undo().is_empty());
        assert_eq!(engine.queue().index(), 1);
    }

    #[test]
    fn test_second_commit_supersedes_undo() {
        let items = vec![item("i0", "A"), item("i1", "B"), item("i2", "C")];
        let mut engine = engine_with(items);
        let first = swipe(&mut engine, 200.0, 0.0);
        let (first_timer, _) = scheduled(&first, TimerKind::UndoWindow).unwrap();

        // The window closes as soon as the next card commits
        engine.drag_start();
        let released = engine.release(GestureSample::at(-200.0, 0.0, 120));
        assert!(cancelled(&released).contains(&first_timer));
        assert!(events(&released).contains(&DiscoveryEvent::UndoExpired));
        assert!(!engine.is_undo_visible());

        let (fling, _) = scheduled(&released, TimerKind::FlingComplete).unwrap();
        engine.timer_fired(fling);

        // Stale first alarm does not close the second window
        assert!(engine.timer_fired(first_timer).is_empty());
        assert!(engine.is_undo_visible());

        engine.undo();
        assert_eq!(engine.queue().index(), 1);
        // The first like stays
        assert_eq!(engine.recent().len(), 1);
    }

    #[test]
    fn test_snap_back_does_not_touch_queue() {
        let mut engine = engine_with(vec![item("i0", "A")]);
        engine.drag_start();
        let released = engine.release(GestureSample::at(120.0, 5.0, 200).with_velocity(3000.0, 0.0));
        assert!(matches!(&events(&released)[0], DiscoveryEvent::SnapBack(_)));
        assert!(scheduled(&released, TimerKind::FlingComplete).is_none());
        assert_eq!(engine.queue().index(), 0);
        // The spring belongs to the host; the classifier is ready again
        assert_eq!(engine.phase(), GesturePhase::Idle);
        assert_eq!(engine.snapshot().phase, GesturePhase::Idle);
    }

    #[test]
    fn test_undo_hidden_while_next_card_leaves() {
        let mut engine = engine_with(vec![item("a", "A"), item("b", "B"), item("c", "C")]);
        let liked = engine.like_current();
        let (fling, _) = scheduled(&liked, TimerKind::FlingComplete).unwrap();
        engine.timer_fired(fling);
        assert!(engine.snapshot().undo_visible);

        engine.dislike_current();
        let snapshot = engine.snapshot();
        assert!(snapshot.fling_in_progress);
        assert!(!snapshot.undo_visible);
        assert!(snapshot.pending_action.is_none());

        // Matches what the button would do
        assert!(engine.undo().is_empty());
        assert_eq!(engine.queue().index(), 1);
    }

    #[test]
    fn test_undo_withdraws_loyalty_prompt() {
        let config = DiscoveryConfig::default().loyalty_threshold(1);
        let mut engine = DiscoveryEngine::new(config, vec![item("a", "Atelier"), item("b", "B")]).unwrap();
        let completed = swipe(&mut engine, 250.0, 0.0);
        let (prompt_timer, _) = scheduled(&completed, TimerKind::Notification).unwrap();
        assert!(engine.notification().is_some());

        let undone = engine.undo();
        assert!(cancelled(&undone).contains(&prompt_timer));
        assert!(events(&undone).contains(&DiscoveryEvent::LoyaltyClosed {
            notification: LoyaltyNotification {
                source_name: "Atelier".to_string(),
                count: 1,
            },
            reason: DismissReason::Withdrawn,
        }));
        assert!(engine.notification().is_none());
        assert!(engine.recent().is_empty());
        assert!(engine.timer_fired(prompt_timer).is_empty());
    }

    #[test]
    fn test_loyalty_fires_on_fifth_like_only() {
        let items: Vec<_> = (0..7).map(|i| item(&format!("c{}", i), "Chic Boutique")).collect();
        let mut engine = engine_with(items);

        for i in 0..4 {
            let completed = swipe(&mut engine, 200.0, 0.0);
            assert!(
                !events(&completed)
                    .iter()
                    .any(|e| matches!(e, DiscoveryEvent::LoyaltyNotification(_))),
                "fired early on like {}",
                i + 1
            );
        }

        let fifth = swipe(&mut engine, 200.0, 0.0);
        assert!(events(&fifth).contains(&DiscoveryEvent::LoyaltyNotification(
            LoyaltyNotification {
                source_name: "Chic Boutique".to_string(),
                count: 5,
            }
        )));
        let (notification_timer, after) = scheduled(&fifth, TimerKind::Notification).unwrap();
        assert_eq!(after, Duration::from_millis(5000));

        // Expire it so a re-fire would not be masked by the live one
        engine.timer_fired(notification_timer);
        assert!(engine.notification().is_none());

        for _ in 0..2 {
            let completed = swipe(&mut engine, 200.0, 0.0);
            assert!(!events(&completed)
                .iter()
                .any(|e| matches!(e, DiscoveryEvent::LoyaltyNotification(_))));
        }
    }

    #[test]
    fn test_accept_notification() {
        let config = DiscoveryConfig::default().loyalty_threshold(1);
        let mut engine = DiscoveryEngine::new(config, vec![item("a", "Atelier"), item("b", "B")]).unwrap();
        let completed = swipe(&mut engine, 300.0, 0.0);
        let (timer, _) = scheduled(&completed, TimerKind::Notification).unwrap();

        let accepted = engine.accept_notification();
        assert_eq!(cancelled(&accepted), vec![timer]);
        assert!(events(&accepted).contains(&DiscoveryEvent::BoutiqueFavorite("Atelier".to_string())));
        assert!(engine.notification().is_none());

        // Stale alarm and repeated accept are no-ops
        assert!(engine.timer_fired(timer).is_empty());
        assert!(engine.accept_notification().is_empty());
        assert!(engine.dismiss_notification().is_empty());
    }

    #[test]
    fn test_long_press_suppresses_swipe() {
        let mut engine = engine_with(vec![item("i0", "A"), item("i1", "B")]);
        let started = engine.drag_start();
        let (long_press, after) = scheduled(&started, TimerKind::LongPress).unwrap();
        assert_eq!(after, Duration::from_millis(500));

        let fired = engine.timer_fired(long_press);
        assert!(events(&fired).contains(&DiscoveryEvent::LongPress(item("i0", "A"))));
        assert_eq!(engine.phase(), GesturePhase::LongPressActive);

        engine.drag_update(GestureSample::at(50.0, 0.0, 550));
        let released = engine.release(GestureSample::at(250.0, 0.0, 600).with_velocity(2000.0, 0.0));
        assert!(released.is_empty());
        assert_eq!(engine.queue().index(), 0);
        assert_eq!(engine.stats().long_presses, 1);
    }

    #[test]
    fn test_movement_before_alarm_wins() {
        let mut engine = engine_with(vec![item("i0", "A")]);
        let started = engine.drag_start();
        let (long_press, _) = scheduled(&started, TimerKind::LongPress).unwrap();

        let moved = engine.drag_update(GestureSample::at(11.0, 0.0, 499));
        assert_eq!(cancelled(&moved), vec![long_press]);

        // The alarm was already in flight; it must not fire the callback
        assert!(engine.timer_fired(long_press).is_empty());
        assert_eq!(engine.phase(), GesturePhase::Dragging);
    }

    #[test]
    fn test_release_cancels_long_press() {
        let mut engine = engine_with(vec![item("i0", "A")]);
        let started = engine.drag_start();
        let (long_press, _) = scheduled(&started, TimerKind::LongPress).unwrap();
        let released = engine.release(GestureSample::at(0.0, 0.0, 200));
        assert!(cancelled(&released).contains(&long_press));
        assert!(engine.timer_fired(long_press).is_empty());
    }

    #[test]
    fn test_exhausted_feed_ignores_input() {
        let mut engine = engine_with(vec![item("only", "A")]);
        let completed = swipe(&mut engine, 200.0, 0.0);
        assert!(events(&completed).contains(&DiscoveryEvent::AllCaughtUp));
        assert!(engine.queue().is_exhausted());
        assert_eq!(engine.snapshot().top_card.unwrap().id, "only");

        assert!(engine.drag_start().is_empty());
        assert!(engine.release(GestureSample::at(500.0, 0.0, 10)).is_empty());
        assert!(engine.like_current().is_empty());
    }

    #[test]
    fn test_empty_feed() {
        let mut engine = engine_with(Vec::new());
        assert!(engine.snapshot().exhausted);
        assert!(engine.drag_start().is_empty());
        assert!(engine.undo().is_empty());
    }

    #[test]
    fn test_malformed_item_is_not_interactive() {
        let mut broken = item("bad", "A");
        broken.image_url.clear();
        let mut engine = engine_with(vec![broken, item("ok", "B")]);

        assert!(engine.snapshot().top_card.is_none());
        assert!(engine.drag_start().is_empty());
        assert!(engine.dislike_current().is_empty());
        assert_eq!(engine.queue().index(), 0);
    }

    #[test]
    fn test_button_commit() {
        let mut engine = engine_with(vec![item("i0", "A"), item("i1", "B")]);
        let started = engine.like_current();
        let Some(Effect::Emit(DiscoveryEvent::FlingStarted { exit, .. })) = started
            .iter()
            .find(|e| matches!(e, Effect::Emit(DiscoveryEvent::FlingStarted { .. })))
            .cloned()
        else {
            panic!("Expected fling");
        };
        assert_eq!(exit.velocity_x, 800.0);

        // Input is blocked while the card leaves
        assert!(engine.drag_start().is_empty());
        assert!(engine.dislike_current().is_empty());
        assert!(engine.undo().is_empty());

        let (fling, _) = scheduled(&started, TimerKind::FlingComplete).unwrap();
        engine.timer_fired(fling);
        assert_eq!(engine.queue().index(), 1);
        assert_eq!(engine.stats().likes, 1);
    }

    #[test]
    fn test_threshold_haptic() {
        let mut engine = engine_with(vec![item("i0", "A")]);
        engine.drag_start();
        let effects = engine.drag_update(GestureSample::at(150.0, 0.0, 50));
        assert!(events(&effects).contains(&DiscoveryEvent::Haptic(HapticPattern::Selection)));
    }

    #[test]
    fn test_cancel_snaps_back_from_last_sample() {
        let mut engine = engine_with(vec![item("i0", "A")]);
        engine.drag_start();
        engine.drag_update(GestureSample::at(80.0, 12.0, 50));
        let effects = engine.cancel();
        match &events(&effects)[0] {
            DiscoveryEvent::SnapBack(snap) => {
                assert_eq!(snap.from_x, 80.0);
                assert_eq!(snap.from_y, 12.0);
            }
            other => panic!("Expected snap back, got {:?}", other),
        }
        // Movement already abandoned the long-press
        assert!(cancelled(&effects).is_empty());
        assert_eq!(engine.phase(), GesturePhase::Idle);
    }

    #[test]
    fn test_undo_dislike_keeps_recent() {
        let mut engine = engine_with(vec![item("i0", "A"), item("i1", "B"), item("i2", "C")]);
        swipe(&mut engine, 200.0, 0.0);
        swipe(&mut engine, -200.0, 0.0);
        engine.undo();
        assert_eq!(engine.queue().index(), 1);
        assert_eq!(engine.recent().len(), 1);
        assert_eq!(
            engine.stats(),
            SessionStats {
                likes: 1,
                dislikes: 0,
                undos: 1,
                long_presses: 0
            }
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DiscoveryConfig::default().recent_capacity(0);
        assert!(DiscoveryEngine::new(config, Vec::new()).is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = DiscoveryEvent::BoutiqueFavorite("Chic Boutique".to_string());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "boutiqueFavorite");
        assert_eq!(json["payload"], "Chic Boutique");
    }
}
