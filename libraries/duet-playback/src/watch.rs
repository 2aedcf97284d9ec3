//! Position watches and the shared poll scheduler

use std::time::Duration;

/// What a fired watch should trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// Notify the host with a position event
    Notify,

    /// End-of-window sentinel; the session stops when it fires
    EndWindow,
}

/// One armed position watch
#[derive(Debug, Clone, PartialEq, Eq)]
struct Watch {
    position_ms: u32,
    kind: WatchKind,
    /// Came from sound options rather than an explicit listener call
    from_options: bool,
    fired: bool,
}

/// Ordered set of position watches for one sound
///
/// Registration order is preserved; crossing checks walk newest first,
/// matching listener-attachment semantics where the most recently
/// added watch reacts first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    watches: Vec<Watch>,
}

impl WatchList {
    /// Empty watch list
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a watch at an absolute position
    pub fn attach(&mut self, position_ms: u32, kind: WatchKind, from_options: bool) {
        self.watches.push(Watch {
            position_ms,
            kind,
            from_options,
            fired: false,
        });
    }

    /// Remove all watches at a position; with `None`, remove every
    /// explicitly attached watch
    pub fn clear(&mut self, position_ms: Option<u32>) {
        match position_ms {
            Some(target) => self.watches.retain(|w| w.position_ms != target),
            None => self.watches.retain(|w| w.from_options),
        }
    }

    /// Remove watches that were attached from sound options
    pub fn detach_options(&mut self) {
        self.watches.retain(|w| !w.from_options);
    }

    /// Remove the end-of-window sentinel, if armed
    pub fn detach_end_window(&mut self) {
        self.watches.retain(|w| w.kind != WatchKind::EndWindow);
    }

    /// Whether an options-attached watch is already armed at a position
    pub fn has_options_watch(&self, position_ms: u32) -> bool {
        self.watches
            .iter()
            .any(|w| w.from_options && w.position_ms == position_ms)
    }

    /// Fire watches crossed by reaching `position_ms`
    ///
    /// Each watch fires at most once until re-armed. Newest watches
    /// are checked first.
    pub fn process(&mut self, position_ms: u32) -> Vec<(u32, WatchKind)> {
        let mut fired = Vec::new();
        for watch in self.watches.iter_mut().rev() {
            if !watch.fired && position_ms >= watch.position_ms {
                watch.fired = true;
                fired.push((watch.position_ms, watch.kind));
            }
        }
        fired
    }

    /// Re-arm fired watches ahead of `position_ms`
    ///
    /// Called on seek, stop, and finish so a replayed region fires its
    /// watches again.
    pub fn reset(&mut self, position_ms: u32) {
        for watch in &mut self.watches {
            if watch.fired && position_ms <= watch.position_ms {
                watch.fired = false;
            }
        }
    }

    /// Number of armed watches
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Whether no watches are armed
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

/// Outcome of a subscriber count change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTransition {
    /// First subscriber arrived; the host should start its timer
    Started,

    /// Last subscriber left; the host should stop its timer
    Stopped,

    /// Count changed without crossing zero
    Unchanged,
}

/// Shared poll timer bookkeeping
///
/// One timer serves every sound that needs sampling. Only sessions on
/// the polled backend subscribe, and only while actually playing; the
/// timer runs exactly when the subscriber count is nonzero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollScheduler {
    subscribers: usize,
    interval: Duration,
}

impl PollScheduler {
    /// Scheduler with the given sampling interval
    pub fn new(interval: Duration) -> Self {
        Self {
            subscribers: 0,
            interval,
        }
    }

    /// Sampling interval the host timer should use
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether any session currently needs sampling
    pub fn is_active(&self) -> bool {
        self.subscribers > 0
    }

    /// Current subscriber count
    pub fn subscribers(&self) -> usize {
        self.subscribers
    }

    /// Add a subscriber
    pub fn subscribe(&mut self) -> PollTransition {
        self.subscribers += 1;
        if self.subscribers == 1 {
            tracing::debug!("poll timer started");
            PollTransition::Started
        } else {
            PollTransition::Unchanged
        }
    }

    /// Remove a subscriber
    pub fn unsubscribe(&mut self) -> PollTransition {
        debug_assert!(self.subscribers > 0, "unsubscribe without subscribe");
        self.subscribers = self.subscribers.saturating_sub(1);
        if self.subscribers == 0 {
            tracing::debug!("poll timer stopped");
            PollTransition::Stopped
        } else {
            PollTransition::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_fires_once_per_arming() {
        let mut watches = WatchList::new();
        watches.attach(500, WatchKind::Notify, false);
        assert!(watches.process(400).is_empty());
        assert_eq!(watches.process(500), vec![(500, WatchKind::Notify)]);
        assert!(watches.process(600).is_empty());
    }

    #[test]
    fn newest_watch_fires_first() {
        let mut watches = WatchList::new();
        watches.attach(100, WatchKind::Notify, false);
        watches.attach(200, WatchKind::Notify, false);
        let fired = watches.process(300);
        assert_eq!(
            fired,
            vec![(200, WatchKind::Notify), (100, WatchKind::Notify)]
        );
    }

    #[test]
    fn reset_rearms_watches_ahead_of_position() {
        let mut watches = WatchList::new();
        watches.attach(500, WatchKind::Notify, false);
        watches.attach(1500, WatchKind::Notify, false);
        watches.process(2000);
        watches.reset(1000);
        // 500 stays fired, 1500 is re-armed
        assert_eq!(watches.process(1500), vec![(1500, WatchKind::Notify)]);
        assert!(watches.process(1500).is_empty());
    }

    #[test]
    fn reset_to_zero_rearms_everything() {
        let mut watches = WatchList::new();
        watches.attach(500, WatchKind::Notify, false);
        watches.process(500);
        watches.reset(0);
        assert_eq!(watches.process(500), vec![(500, WatchKind::Notify)]);
    }

    #[test]
    fn clear_by_position_removes_only_that_target() {
        let mut watches = WatchList::new();
        watches.attach(500, WatchKind::Notify, false);
        watches.attach(1000, WatchKind::Notify, false);
        watches.clear(Some(500));
        assert_eq!(watches.len(), 1);
        assert_eq!(watches.process(1000), vec![(1000, WatchKind::Notify)]);
    }

    #[test]
    fn clear_all_keeps_options_watches() {
        let mut watches = WatchList::new();
        watches.attach(500, WatchKind::Notify, true);
        watches.attach(1000, WatchKind::Notify, false);
        watches.clear(None);
        assert_eq!(watches.len(), 1);
        assert!(watches.has_options_watch(500));
    }

    #[test]
    fn detach_options_keeps_explicit_watches() {
        let mut watches = WatchList::new();
        watches.attach(500, WatchKind::Notify, true);
        watches.attach(1000, WatchKind::Notify, false);
        watches.detach_options();
        assert_eq!(watches.len(), 1);
        assert!(!watches.has_options_watch(500));
    }

    #[test]
    fn end_window_watch_fires_and_detaches() {
        let mut watches = WatchList::new();
        watches.attach(3000, WatchKind::EndWindow, false);
        assert_eq!(watches.process(3000), vec![(3000, WatchKind::EndWindow)]);
        watches.detach_end_window();
        assert!(watches.is_empty());
    }

    #[test]
    fn scheduler_reports_zero_crossings() {
        let mut scheduler = PollScheduler::new(Duration::from_millis(50));
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.subscribe(), PollTransition::Started);
        assert_eq!(scheduler.subscribe(), PollTransition::Unchanged);
        assert_eq!(scheduler.unsubscribe(), PollTransition::Unchanged);
        assert_eq!(scheduler.unsubscribe(), PollTransition::Stopped);
        assert!(!scheduler.is_active());
    }
}
