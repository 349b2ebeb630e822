use crate::api::ProgressApi;
use crate::coalescer::{ClientState, CoalescerConfig, SaveCoalescer, SaveTicket};
use anyhow::Result;
use std::sync::Arc;
use tapgame_core::{Progress, TapOutcome};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Tap,
    /// The game went to the background. Flush, keep running.
    Hide,
    /// The game is closing. Flush, then stop.
    Close,
}

type SaveHandle = JoinHandle<Result<()>>;

/// Runs a game session: applies taps, and sends saves when the coalescer says so.
///
/// Regular saves run as their own task so taps keep landing while a request is out.
/// Whatever happens to that task (success, error, panic) its join result releases the
/// in-flight slot, so the coalescer can never get stuck in `Saving`.
pub struct Session<A: ProgressApi> {
    api: Arc<A>,
    coalescer: SaveCoalescer,
    force_timeout: Duration,
}

impl<A: ProgressApi> Session<A> {
    pub fn new(
        api: Arc<A>,
        initial: Progress,
        config: CoalescerConfig,
        force_timeout: Duration,
    ) -> Self {
        Self {
            api,
            coalescer: SaveCoalescer::new(initial, config, Instant::now()),
            force_timeout,
        }
    }

    /// Processes events until `Close` arrives or every sender is gone.
    ///
    /// Returns the final state; `pending_save` is still set if the closing save
    /// didn't make it.
    pub async fn run<F>(mut self, mut events: mpsc::Receiver<SessionEvent>, mut on_tap: F) -> ClientState
    where
        F: FnMut(&TapOutcome),
    {
        let mut in_flight: Option<SaveHandle> = None;

        loop {
            let deadline = self.coalescer.next_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(SessionEvent::Tap) => {
                        let outcome = self.coalescer.tap(Instant::now());
                        on_tap(&outcome);
                    }
                    Some(SessionEvent::Hide) => self.force_save(&mut in_flight).await,
                    Some(SessionEvent::Close) | None => {
                        self.force_save(&mut in_flight).await;
                        break;
                    }
                },
                () = time::sleep_until(deadline) => {
                    if let Some(ticket) = self.coalescer.poll(Instant::now()) {
                        in_flight = Some(self.spawn_save(ticket));
                    }
                }
                joined = join_in_flight(&mut in_flight) => {
                    in_flight = None;
                    self.settle(joined);
                }
            }
        }

        self.coalescer.state()
    }

    fn spawn_save(&self, ticket: SaveTicket) -> SaveHandle {
        log::debug!(
            "Saving {:?} (revision {}, forced: {})",
            ticket.progress,
            ticket.revision,
            ticket.forced
        );

        let api = Arc::clone(&self.api);
        tokio::spawn(async move { api.save(ticket.progress).await })
    }

    fn settle(&mut self, joined: Result<Result<()>, JoinError>) {
        let succeeded = match joined {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::warn!("Save failed, will retry: {:#}", e);
                false
            }
            Err(e) => {
                log::error!("Save task died: {}", e);
                false
            }
        };

        self.coalescer.finish(succeeded, Instant::now());
        log::debug!("Save settled, now {:?}", self.coalescer.phase());
    }

    /// Best-effort flush for hide/close.
    ///
    /// 1. An outstanding save is waited for (bounded) rather than duplicated.
    /// 2. Whatever it didn't cover goes out as a forced save (bounded too).
    ///
    /// If the process is killed mid-way the last taps are lost; there is no way
    /// around that from the client side.
    async fn force_save(&mut self, in_flight: &mut Option<SaveHandle>) {
        if let Some(handle) = in_flight.take() {
            if !self.await_bounded(handle).await {
                return;
            }
        }

        if let Some(ticket) = self.coalescer.force() {
            let handle = self.spawn_save(ticket);
            self.await_bounded(handle).await;
        }
    }

    /// Waits up to `force_timeout` for a save. Returns false if it had to give up.
    async fn await_bounded(&mut self, mut handle: SaveHandle) -> bool {
        match time::timeout(self.force_timeout, &mut handle).await {
            Ok(joined) => {
                self.settle(joined);
                true
            }
            Err(_) => {
                handle.abort();
                log::warn!("Save did not finish within {:?}, giving up", self.force_timeout);
                self.coalescer.finish(false, Instant::now());
                false
            }
        }
    }
}

async fn join_in_flight(in_flight: &mut Option<SaveHandle>) -> Result<Result<()>, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Records every save and how many overlapped.
    #[derive(Default)]
    struct FakeApi {
        delay: Duration,
        saves: Mutex<Vec<Progress>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        failing: AtomicBool,
        panic_once: AtomicBool,
    }

    impl FakeApi {
        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Default::default()
            })
        }

        fn saves(&self) -> Vec<Progress> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProgressApi for FakeApi {
        async fn load(&self) -> Result<Progress> {
            Ok(Progress::default())
        }

        async fn save(&self, progress: Progress) -> Result<()> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            self.saves.lock().unwrap().push(progress);

            time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.panic_once.swap(false, Ordering::SeqCst) {
                panic!("simulated crash inside save");
            }
            if self.failing.load(Ordering::SeqCst) {
                bail!("network unreachable");
            }
            Ok(())
        }
    }

    fn start(
        api: &Arc<FakeApi>,
        initial: Progress,
    ) -> (mpsc::Sender<SessionEvent>, JoinHandle<ClientState>) {
        let session = Session::new(
            api.clone(),
            initial,
            CoalescerConfig::default(),
            Duration::from_secs(2),
        );
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(session.run(rx, |_| {}));
        (tx, task)
    }

    #[tokio::test(start_paused = true)]
    async fn taps_within_the_window_send_one_save() {
        let api = FakeApi::with_delay(Duration::from_millis(50));
        let (tx, task) = start(&api, Progress::default());

        for _ in 0..5 {
            tx.send(SessionEvent::Tap).await.unwrap();
            time::sleep(Duration::from_millis(100)).await;
        }
        time::sleep(Duration::from_millis(4000)).await;
        assert_eq!(api.saves(), vec![Progress::new(5, 1)]);

        tx.send(SessionEvent::Close).await.unwrap();
        let state = task.await.unwrap();

        assert_eq!(api.saves().len(), 1);
        assert!(!state.pending_save);
        assert!(!state.is_saving);
    }

    #[tokio::test(start_paused = true)]
    async fn hide_during_a_save_does_not_send_a_second_request() {
        let api = FakeApi::with_delay(Duration::from_millis(500));
        let (tx, task) = start(&api, Progress::default());

        tx.send(SessionEvent::Tap).await.unwrap();
        // Debounce fires at 1s, the request is out until 1.5s.
        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(api.active.load(Ordering::SeqCst), 1);

        tx.send(SessionEvent::Hide).await.unwrap();
        time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(api.saves(), vec![Progress::new(1, 1)]);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 1);

        tx.send(SessionEvent::Close).await.unwrap();
        let state = task.await.unwrap();
        assert_eq!(api.saves().len(), 1);
        assert!(!state.pending_save);
    }

    #[tokio::test(start_paused = true)]
    async fn close_flushes_taps_made_during_a_save_after_it_lands() {
        let api = FakeApi::with_delay(Duration::from_millis(500));
        let (tx, task) = start(&api, Progress::default());

        tx.send(SessionEvent::Tap).await.unwrap();
        time::sleep(Duration::from_millis(1100)).await;

        tx.send(SessionEvent::Tap).await.unwrap();
        tx.send(SessionEvent::Close).await.unwrap();
        let state = task.await.unwrap();

        assert_eq!(api.saves(), vec![Progress::new(1, 1), Progress::new(2, 1)]);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(state.progress, Progress::new(2, 1));
        assert!(!state.pending_save);
    }

    #[tokio::test(start_paused = true)]
    async fn close_saves_immediately_without_waiting_for_the_debounce() {
        let api = FakeApi::with_delay(Duration::from_millis(10));
        let (tx, task) = start(&api, Progress::new(99, 1));

        tx.send(SessionEvent::Tap).await.unwrap();
        tx.send(SessionEvent::Close).await.unwrap();
        let state = task.await.unwrap();

        assert_eq!(api.saves(), vec![Progress::new(0, 2)]);
        assert!(!state.pending_save);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_retried_on_the_next_tick() {
        let api = FakeApi::with_delay(Duration::from_millis(50));
        api.failing.store(true, Ordering::SeqCst);
        let (tx, task) = start(&api, Progress::default());

        tx.send(SessionEvent::Tap).await.unwrap();
        time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(api.saves().len(), 1);

        api.failing.store(false, Ordering::SeqCst);
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(api.saves().len(), 2);

        tx.send(SessionEvent::Close).await.unwrap();
        let state = task.await.unwrap();
        assert_eq!(api.saves().len(), 2);
        assert!(!state.pending_save);
    }

    #[tokio::test(start_paused = true)]
    async fn crashed_save_releases_the_in_flight_slot() {
        let api = FakeApi::with_delay(Duration::from_millis(50));
        api.panic_once.store(true, Ordering::SeqCst);
        let (tx, task) = start(&api, Progress::default());

        tx.send(SessionEvent::Tap).await.unwrap();
        time::sleep(Duration::from_millis(3500)).await;

        // First attempt panicked at ~1s, the 3s tick retried.
        assert_eq!(api.saves().len(), 2);

        tx.send(SessionEvent::Close).await.unwrap();
        assert!(!task.await.unwrap().pending_save);
    }

    #[tokio::test(start_paused = true)]
    async fn close_gives_up_on_a_hung_server() {
        let api = FakeApi::with_delay(Duration::from_secs(60));
        let (tx, task) = start(&api, Progress::default());

        tx.send(SessionEvent::Tap).await.unwrap();
        tx.send(SessionEvent::Close).await.unwrap();
        let state = task.await.unwrap();

        assert_eq!(api.saves().len(), 1);
        assert!(state.pending_save);
        assert!(!state.is_saving);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_sender_closes_the_session() {
        let api = FakeApi::with_delay(Duration::from_millis(10));
        let (tx, task) = start(&api, Progress::default());

        tx.send(SessionEvent::Tap).await.unwrap();
        drop(tx);

        let state = task.await.unwrap();
        assert_eq!(api.saves(), vec![Progress::new(1, 1)]);
        assert!(!state.pending_save);
    }
}
