use tapgame_core::{Progress, TapOutcome};
use tokio::time::{Duration, Instant};

/// Ticks shorter than this would just spin.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerConfig {
    /// Quiet time after the last tap before a save goes out.
    pub debounce: Duration,
    /// Period of the background "save if anything changed" tick.
    pub interval: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(1),
            interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Idle,
    /// Taps happened that the server hasn't seen yet.
    PendingLocal,
    Saving,
    /// Saving because the game is being hidden or closed.
    ForceSaving,
}

/// Snapshot of what the player sees plus the two save flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientState {
    pub progress: Progress,
    pub pending_save: bool,
    pub is_saving: bool,
}

/// Permission to send exactly one save request with `progress` in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    pub progress: Progress,
    pub revision: u64,
    pub forced: bool,
}

/// Decides when progress goes to the server.
///
/// Pure state: every method takes the current instant from the caller and does no
/// I/O, so the same struct drives the real session and the tests.
///
/// Every tap bumps `revision`. A save carries the revision it was taken at, and only
/// a successful save of the latest revision clears the pending flag. Taps that land
/// while a request is in the air therefore stay pending and go out with the next one.
#[derive(Debug)]
pub struct SaveCoalescer {
    config: CoalescerConfig,
    progress: Progress,
    revision: u64,
    saved_revision: u64,
    in_flight: Option<SaveTicket>,
    debounce_at: Option<Instant>,
    next_tick: Instant,
}

impl SaveCoalescer {
    pub fn new(progress: Progress, mut config: CoalescerConfig, now: Instant) -> Self {
        config.interval = config.interval.max(MIN_INTERVAL);

        Self {
            config,
            progress,
            revision: 0,
            saved_revision: 0,
            in_flight: None,
            debounce_at: None,
            next_tick: now + config.interval,
        }
    }

    /// Applies a tap and restarts the debounce window.
    pub fn tap(&mut self, now: Instant) -> TapOutcome {
        let outcome = self.progress.tap();
        self.progress = outcome.progress;
        self.revision += 1;
        self.debounce_at = Some(now + self.config.debounce);
        outcome
    }

    /// When `poll` next has something to do.
    pub fn next_deadline(&self) -> Instant {
        match self.debounce_at {
            Some(at) => at.min(self.next_tick),
            None => self.next_tick,
        }
    }

    /// Fires the debounce and the interval tick if they are due and hands out a
    /// ticket when there is something to save and nothing already saving.
    pub fn poll(&mut self, now: Instant) -> Option<SaveTicket> {
        let mut due = false;

        if self.debounce_at.is_some_and(|at| at <= now) {
            self.debounce_at = None;
            due = true;
        }

        if self.next_tick <= now {
            // Ticks missed while busy collapse into one.
            while self.next_tick <= now {
                self.next_tick += self.config.interval;
            }
            due = true;
        }

        if due { self.begin(false) } else { None }
    }

    /// The game is going away: save now, skipping the debounce.
    ///
    /// Returns `None` when there is nothing to save or a save is already in flight;
    /// the caller waits for that one instead of racing a second request against it.
    pub fn force(&mut self) -> Option<SaveTicket> {
        self.begin(true)
    }

    /// Releases the in-flight slot.
    ///
    /// Must be called exactly once per ticket, whatever happened to the request.
    pub fn finish(&mut self, succeeded: bool, now: Instant) {
        let Some(ticket) = self.in_flight.take() else {
            return;
        };

        if succeeded {
            self.saved_revision = self.saved_revision.max(ticket.revision);

            // Taps arrived during the request: give them their own debounce
            // instead of waiting for the next tick.
            if self.is_pending() && self.debounce_at.is_none() {
                self.debounce_at = Some(now + self.config.debounce);
            }
        }
    }

    fn begin(&mut self, forced: bool) -> Option<SaveTicket> {
        if self.in_flight.is_some() || !self.is_pending() {
            return None;
        }

        let ticket = SaveTicket {
            progress: self.progress,
            revision: self.revision,
            forced,
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    pub fn is_pending(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn phase(&self) -> SavePhase {
        match self.in_flight {
            Some(ticket) if ticket.forced => SavePhase::ForceSaving,
            Some(_) => SavePhase::Saving,
            None if self.is_pending() => SavePhase::PendingLocal,
            None => SavePhase::Idle,
        }
    }

    pub fn state(&self) -> ClientState {
        ClientState {
            progress: self.progress,
            pending_save: self.is_pending(),
            is_saving: self.is_saving(),
        }
    }
}
