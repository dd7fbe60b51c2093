//! Deterministic simulation runner.
//!
//! The runner owns time. It pops events in [`EventKey`] order, delivers
//! them to the engine, and executes the returned actions: timers become
//! scheduled events, internal events jump the queue at the current instant,
//! and emissions fan out to subscribers and the event log.

use crate::event_queue::EventKey;
use sae_core::{Action, ConfigError, Event, PipelineConfig, PipelineEvent, StateMachine, TimerId};
use sae_node::{EngineKind, Pipeline};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace};

/// A subscriber callback, invoked synchronously for every notification.
pub type Subscriber = Box<dyn FnMut(&PipelineEvent)>;

/// Deterministic simulation runner.
///
/// Given the same engine kind, configuration, and seed, produces the same
/// notification log every run. Time advances only by jumping to the next
/// scheduled event; an empty queue means the simulation is over.
pub struct SimulationRunner {
    /// The engine under simulation.
    pipeline: Pipeline,

    /// Scheduled events, ordered deterministically.
    event_queue: BTreeMap<EventKey, Event>,

    /// Insertion counter for deterministic tie-breaking.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// Timer registry for cancellation: maps a timer id to the key of its
    /// pending occurrence.
    timers: HashMap<TimerId, EventKey>,

    /// Statistics.
    stats: SimulationStats,

    /// Notification log, drained by [`SimulationRunner::take_events`].
    events: Vec<PipelineEvent>,

    /// Live subscribers.
    subscribers: Vec<Subscriber>,

    /// Set once [`SimulationRunner::stop`] runs; a stopped runner stays
    /// inert forever.
    stopped: bool,
}

/// Statistics collected during a run.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed per priority class.
    pub events_by_priority: [u64; 2],
    /// Total actions generated by the engine.
    pub actions_generated: u64,
    /// Notifications emitted.
    pub notifications: u64,
    /// Timers set.
    pub timers_set: u64,
    /// Timers cancelled (including the cancellation sweep on stop).
    pub timers_cancelled: u64,
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("pipeline", &self.pipeline)
            .field("pending_events", &self.event_queue.len())
            .field("now", &self.now)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl SimulationRunner {
    /// Validate the configuration, build the engine, and arm its initial
    /// timers at `t = 0`.
    pub fn start(
        kind: EngineKind,
        config: PipelineConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut pipeline = Pipeline::new(kind, &config, seed);
        let initial = pipeline.start();

        let mut runner = Self {
            pipeline,
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            timers: HashMap::new(),
            stats: SimulationStats::default(),
            events: Vec::new(),
            subscribers: Vec::new(),
            stopped: false,
        };
        for action in initial {
            runner.process_action(action);
        }

        info!(engine = %kind, seed, "simulation started");
        Ok(runner)
    }

    /// Run until the queue empties or the next event lies past `end_time`.
    pub fn run_until(&mut self, end_time: Duration) {
        while let Some((&key, _)) = self.event_queue.first_key_value() {
            if self.stopped {
                return;
            }
            if key.time > end_time {
                trace!(
                    remaining_events = self.event_queue.len(),
                    "time limit reached"
                );
                break;
            }
            self.step();
        }
    }

    /// Process exactly one event, jumping time to it. Returns `false` when
    /// the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((key, event)) = self.event_queue.pop_first() else {
            return false;
        };
        self.now = key.time;

        trace!(time = ?self.now, event = event.type_name(), "processing event");

        self.stats.events_processed += 1;
        self.stats.events_by_priority[event.priority() as usize] += 1;

        // Fired timers leave the registry before the handler runs, so a
        // re-arm inside the handler registers cleanly.
        if let Some(id) = timer_for_event(&event) {
            self.timers.remove(&id);
        }

        self.pipeline.set_time(self.now);
        let actions = self.pipeline.handle(event);
        self.stats.actions_generated += actions.len() as u64;

        for action in actions {
            self.process_action(action);
        }
        true
    }

    /// Run for `duration` of simulated time from the current instant.
    pub fn run_for(&mut self, duration: Duration) {
        let end = self.now + duration;
        self.run_until(end);
    }

    /// Stop the simulation.
    ///
    /// Cancels every pending timer and event; nothing fires and nothing is
    /// emitted afterwards. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.stats.timers_cancelled += self.timers.len() as u64;
        self.timers.clear();
        let discarded = self.event_queue.len();
        self.event_queue.clear();
        info!(discarded, at = ?self.now, "simulation stopped");
    }

    /// Whether [`SimulationRunner::stop`] has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Register a subscriber. It sees every notification from now on, in
    /// emission order, synchronously during the tick that produces it.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&PipelineEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Drain the notification log accumulated since the last call.
    pub fn take_events(&mut self) -> Vec<PipelineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run statistics so far.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Events still scheduled.
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    /// The engine under simulation.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Mutable engine access, for pause/resume style controls.
    ///
    /// Actions returned by engine methods called this way (e.g. the kick
    /// from a resume) must be fed back through the runner; use
    /// [`SimulationRunner::apply_actions`].
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Execute actions produced outside the normal event flow.
    pub fn apply_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.process_action(action);
        }
    }

    fn process_action(&mut self, action: Action) {
        if self.stopped {
            return;
        }
        match action {
            Action::SetTimer { id, duration } => {
                let fire_time = self.now + duration;
                let key = self.schedule_event(fire_time, timer_event(id));
                // Re-arming an id replaces its pending occurrence.
                if let Some(stale) = self.timers.insert(id, key) {
                    self.event_queue.remove(&stale);
                }
                self.stats.timers_set += 1;
            }

            Action::CancelTimer { id } => {
                if let Some(key) = self.timers.remove(&id) {
                    self.event_queue.remove(&key);
                    self.stats.timers_cancelled += 1;
                }
            }

            Action::EnqueueInternal { event } => {
                // Fires at the current instant, ahead of any timer
                // scheduled for it.
                self.schedule_event(self.now, event);
            }

            Action::Emit { event } => {
                trace!(kind = event.type_name(), at = ?event.at(), "notification");
                self.stats.notifications += 1;
                for subscriber in &mut self.subscribers {
                    subscriber(&event);
                }
                self.events.push(event);
            }
        }
    }

    fn schedule_event(&mut self, time: Duration, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, &event, self.sequence);
        debug!(time = ?time, event = event.type_name(), "scheduled");
        self.event_queue.insert(key, event);
        key
    }
}

/// The event a fired timer delivers.
fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::Arrival => Event::ArrivalTimer,
        TimerId::Proposal => Event::ProposalTimer,
        TimerId::AcceptDwell => Event::AcceptDwellTimer,
        TimerId::ExecStep => Event::ExecStepTimer,
        TimerId::Settlement => Event::SettlementTimer,
        TimerId::SyncCycle => Event::SyncCycleTimer,
        TimerId::SyncStep => Event::SyncStepTimer,
    }
}

/// The timer id behind an event, if it is a timer event.
fn timer_for_event(event: &Event) -> Option<TimerId> {
    match event {
        Event::ArrivalTimer => Some(TimerId::Arrival),
        Event::ProposalTimer => Some(TimerId::Proposal),
        Event::AcceptDwellTimer => Some(TimerId::AcceptDwell),
        Event::ExecStepTimer => Some(TimerId::ExecStep),
        Event::SettlementTimer => Some(TimerId::Settlement),
        Event::SyncCycleTimer => Some(TimerId::SyncCycle),
        Event::SyncStepTimer => Some(TimerId::SyncStep),
        Event::ExecutorKick | Event::SettlementCheck => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> SimulationRunner {
        SimulationRunner::start(EngineKind::Async, PipelineConfig::default(), 1)
            .expect("default config is valid")
    }

    #[test]
    fn test_start_schedules_initial_timers() {
        let runner = runner();
        // Arrival, proposal cadence, settlement check.
        assert_eq!(runner.pending_events(), 3);
        assert_eq!(runner.now(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = PipelineConfig::default().with_queue_capacity(0);
        assert!(SimulationRunner::start(EngineKind::Async, config, 1).is_err());
    }

    #[test]
    fn test_time_jumps_not_ticks() {
        let mut runner = runner();
        runner.run_until(Duration::from_millis(1500));
        // Time lands exactly on a scheduled event, never between them.
        assert!(runner.now() <= Duration::from_millis(1500));
        assert!(runner.stats().events_processed > 0);
    }

    #[test]
    fn test_stop_cancels_everything() {
        let mut runner = runner();
        runner.run_until(Duration::from_millis(5000));
        runner.take_events();

        runner.stop();
        assert_eq!(runner.pending_events(), 0);

        // A stopped runner never fires or emits again.
        runner.run_until(Duration::from_millis(60_000));
        assert!(runner.take_events().is_empty());
        assert_eq!(runner.pending_events(), 0);

        // Idempotent.
        runner.stop();
        assert!(runner.is_stopped());
    }

    #[test]
    fn test_subscriber_sees_every_notification() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(0u64));
        let mut runner = runner();
        let counter = Rc::clone(&seen);
        runner.subscribe(move |_| *counter.borrow_mut() += 1);

        runner.run_until(Duration::from_millis(10_000));
        let logged = runner.take_events().len() as u64;
        assert!(logged > 0);
        assert_eq!(*seen.borrow(), logged);
        assert_eq!(runner.stats().notifications, logged);
    }
}
