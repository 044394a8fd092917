use std::{fmt, sync::Arc};

use flexlink_error::{LifecycleError, ResourceError, Transition};
use parking_lot::Mutex;

use super::{ListenerResourceFactory, ListenerResourceHandle, ResourceState, SubscriberSet};

/// Starts and stops a destination's listener as its subscriber set moves
/// between empty and non-empty.
///
/// - the first subscriber initializes the listener (if needed) and starts it;
/// - the last unsubscribe stops it but keeps it initialized;
/// - [`start`](Self::start) only initializes, it never makes the listener run;
/// - [`stop`](Self::stop) disposes the listener and leaves the subscriber set
///   alone, so running resumes only on the next empty to non-empty transition.
///
/// A listener that reports itself uninitialized while still held (its backing
/// channel went away) is disposed and replaced at the next `start` or empty to
/// non-empty transition.
///
/// All operations serialize on one lock owned by this coordinator. Resource
/// calls are made while the lock is held. Resource failures are returned to the
/// caller unchanged and nothing is retried or rolled back.
pub struct SubscriptionLifecycleCoordinator<F: ListenerResourceFactory> {
    destination: Arc<str>,
    factory: F,
    inner: Mutex<Inner<F::Handle>>,
}

struct Inner<H> {
    subscribers: SubscriberSet,
    resource: Option<H>,
}

impl<F: ListenerResourceFactory> SubscriptionLifecycleCoordinator<F> {
    pub fn new(
        destination: impl Into<Arc<str>>,
        factory: F,
    ) -> Self {
        Self {
            destination: destination.into(),
            factory,
            inner: Mutex::new(Inner {
                subscribers: SubscriberSet::new(),
                resource: None,
            }),
        }
    }

    /// Records `subscriber_id`; the empty to non-empty transition brings the
    /// listener up.
    ///
    /// On error the subscriber stays recorded while the listener may not be
    /// running.
    pub fn subscribe(
        &self,
        subscriber_id: &str,
    ) -> Result<(), LifecycleError> {
        let mut guard = self.inner.lock();
        let Inner {
            subscribers,
            resource,
        } = &mut *guard;

        let was_empty = subscribers.is_empty();
        if !subscribers.insert(subscriber_id) || !was_empty {
            return Ok(());
        }

        let handle = self.ensure_initialized(resource)?;
        if !handle.is_running() {
            handle
                .start()
                .map_err(|source| self.transition_error(Transition::Start, source))?;
        }
        Ok(())
    }

    /// Forgets `subscriber_id`; the last one out halts the listener.
    pub fn unsubscribe(
        &self,
        subscriber_id: &str,
    ) -> Result<(), LifecycleError> {
        let mut guard = self.inner.lock();
        let Inner {
            subscribers,
            resource,
        } = &mut *guard;

        if !subscribers.remove(subscriber_id) || !subscribers.is_empty() {
            return Ok(());
        }

        if let Some(handle) = resource.as_mut() {
            if handle.is_running() {
                handle
                    .stop()
                    .map_err(|source| self.transition_error(Transition::Stop, source))?;
            }
        }
        Ok(())
    }

    /// Makes sure the listener is initialized. Safe to repeat and to call after
    /// [`stop`](Self::stop).
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut guard = self.inner.lock();
        self.ensure_initialized(&mut guard.resource)?;
        Ok(())
    }

    /// Halts and disposes the listener whatever the subscriber set holds.
    ///
    /// The listener always ends up uninitialized: dispose is attempted even
    /// when the halt fails, and the first failure is returned.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let mut guard = self.inner.lock();
        let Some(mut handle) = guard.resource.take() else {
            return Ok(());
        };

        let halted = if handle.is_running() {
            handle.stop()
        } else {
            Ok(())
        };
        let disposed = self.factory.dispose(handle);

        halted.map_err(|source| self.transition_error(Transition::Stop, source))?;
        disposed.map_err(|source| self.transition_error(Transition::Dispose, source))
    }

    pub fn state(&self) -> ResourceState {
        ResourceState::of(self.inner.lock().resource.as_ref())
    }

    pub fn destination(&self) -> &Arc<str> {
        &self.destination
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    pub fn is_subscribed(
        &self,
        subscriber_id: &str,
    ) -> bool {
        self.inner.lock().subscribers.contains(subscriber_id)
    }

    /// Sorted snapshot of the subscriber identities.
    pub fn subscribers(&self) -> Vec<Arc<str>> {
        self.inner.lock().subscribers.snapshot()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn ensure_initialized<'a>(
        &self,
        slot: &'a mut Option<F::Handle>,
    ) -> Result<&'a mut F::Handle, LifecycleError> {
        let handle = match slot.take() {
            Some(handle) if handle.is_initialized() => handle,
            stale => {
                if let Some(old) = stale {
                    self.factory
                        .dispose(old)
                        .map_err(|source| self.transition_error(Transition::Dispose, source))?;
                }
                let handle = self.factory.initialize().map_err(|source| {
                    LifecycleError::ResourceInitialization {
                        destination: self.destination.to_string(),
                        source,
                    }
                })?;
                handle
            }
        };
        Ok(slot.insert(handle))
    }

    fn transition_error(
        &self,
        transition: Transition,
        source: ResourceError,
    ) -> LifecycleError {
        LifecycleError::ResourceTransition {
            destination: self.destination.to_string(),
            transition,
            source,
        }
    }
}

impl<F: ListenerResourceFactory> fmt::Debug for SubscriptionLifecycleCoordinator<F> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SubscriptionLifecycleCoordinator")
            .field("destination", &self.destination)
            .field("subscribers", &inner.subscribers.len())
            .field("state", &ResourceState::of(inner.resource.as_ref()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            mpsc, Arc,
        },
        thread,
        time::Duration,
    };

    use flexlink_error::{LifecycleError, ResourceError, Transition};
    use parking_lot::Mutex;
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Initialize,
        Start,
        Stop,
        Dispose,
    }

    /// Entered signal and release latch for a blocking `initialize`.
    type Gate = (mpsc::Sender<()>, mpsc::Receiver<()>);

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail_initialize: AtomicBool,
        fail_start: AtomicBool,
        fail_stop: AtomicBool,
        /// Makes live handles report themselves uninitialized until the next
        /// `initialize`.
        invalidated: AtomicBool,
        gate: Mutex<Option<Gate>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn count(
            &self,
            call: Call,
        ) -> usize {
            self.calls.lock().iter().filter(|c| **c == call).count()
        }

        fn record(
            &self,
            call: Call,
        ) {
            self.calls.lock().push(call);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingFactory(Arc<Recorder>);

    struct RecordingHandle {
        rec: Arc<Recorder>,
        running: bool,
    }

    impl ListenerResourceHandle for RecordingHandle {
        fn start(&mut self) -> Result<(), ResourceError> {
            self.rec.record(Call::Start);
            if self.rec.fail_start.load(Ordering::SeqCst) {
                return Err(ResourceError::Failed("start refused".to_string()));
            }
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ResourceError> {
            self.rec.record(Call::Stop);
            if self.rec.fail_stop.load(Ordering::SeqCst) {
                return Err(ResourceError::Failed("stop refused".to_string()));
            }
            self.running = false;
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn is_initialized(&self) -> bool {
            !self.rec.invalidated.load(Ordering::SeqCst)
        }
    }

    impl ListenerResourceFactory for RecordingFactory {
        type Handle = RecordingHandle;

        fn initialize(&self) -> Result<RecordingHandle, ResourceError> {
            let gate = self.0.gate.lock().take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.recv();
            }
            self.0.record(Call::Initialize);
            self.0.invalidated.store(false, Ordering::SeqCst);
            if self.0.fail_initialize.load(Ordering::SeqCst) {
                return Err(ResourceError::Unavailable("no connection".to_string()));
            }
            Ok(RecordingHandle {
                rec: self.0.clone(),
                running: false,
            })
        }

        fn dispose(
            &self,
            _handle: RecordingHandle,
        ) -> Result<(), ResourceError> {
            self.0.record(Call::Dispose);
            Ok(())
        }
    }

    fn coordinator() -> (SubscriptionLifecycleCoordinator<RecordingFactory>, Arc<Recorder>) {
        coordinator_for("quotes")
    }

    fn coordinator_for(
        destination: &str,
    ) -> (SubscriptionLifecycleCoordinator<RecordingFactory>, Arc<Recorder>) {
        let factory = RecordingFactory::default();
        let rec = factory.0.clone();
        (SubscriptionLifecycleCoordinator::new(destination, factory), rec)
    }

    /// One start for the first subscriber, one halt after the last leaves.
    #[test]
    fn test_first_subscriber_starts_last_stops() {
        let (c, rec) = coordinator();
        assert_eq!(c.state(), ResourceState::Uninitialized);

        c.subscribe("A").unwrap();
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(rec.calls(), vec![Call::Initialize, Call::Start]);

        c.subscribe("B").unwrap();
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(rec.count(Call::Initialize), 1);

        c.unsubscribe("A").unwrap();
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(c.subscribers(), vec![Arc::<str>::from("B")]);

        c.unsubscribe("B").unwrap();
        assert_eq!(c.state(), ResourceState::Stopped);
        assert_eq!(c.subscriber_count(), 0);
        assert_eq!(rec.calls(), vec![Call::Initialize, Call::Start, Call::Stop]);
    }

    #[test]
    fn test_duplicate_subscribe_is_noop() {
        let (c, rec) = coordinator();
        c.subscribe("A").unwrap();
        let before = rec.calls();
        c.subscribe("A").unwrap();
        assert_eq!(rec.calls(), before);
        assert_eq!(c.subscriber_count(), 1);
        assert_eq!(c.state(), ResourceState::Running);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let (c, rec) = coordinator();
        c.unsubscribe("ghost").unwrap();
        assert!(rec.calls().is_empty());

        c.subscribe("A").unwrap();
        c.unsubscribe("ghost").unwrap();
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(rec.count(Call::Stop), 0);
    }

    /// `start` initializes but never runs the listener.
    #[test]
    fn test_start_only_initializes() {
        let (c, rec) = coordinator();
        c.start().unwrap();
        c.start().unwrap();
        assert_eq!(c.state(), ResourceState::Stopped);
        assert_eq!(rec.calls(), vec![Call::Initialize]);

        c.subscribe("A").unwrap();
        assert_eq!(rec.calls(), vec![Call::Initialize, Call::Start]);
    }

    #[test]
    fn test_stop_disposes_and_keeps_subscribers() {
        let (c, rec) = coordinator();
        c.subscribe("A").unwrap();
        c.subscribe("B").unwrap();

        c.stop().unwrap();
        assert_eq!(c.state(), ResourceState::Uninitialized);
        assert_eq!(c.subscriber_count(), 2);
        assert_eq!(
            rec.calls(),
            vec![Call::Initialize, Call::Start, Call::Stop, Call::Dispose]
        );

        c.stop().unwrap();
        assert_eq!(rec.count(Call::Dispose), 1);
    }

    /// After `stop` a repeated subscribe of a member does not bring the
    /// listener back; only a new empty to non-empty transition does.
    #[test]
    fn test_resubscribe_after_stop_needs_fresh_transition() {
        let (c, rec) = coordinator();
        c.subscribe("A").unwrap();
        c.stop().unwrap();

        c.subscribe("A").unwrap();
        assert_eq!(c.state(), ResourceState::Uninitialized);

        c.unsubscribe("A").unwrap();
        assert_eq!(c.state(), ResourceState::Uninitialized);

        c.subscribe("A").unwrap();
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(rec.count(Call::Initialize), 2);
        assert_eq!(rec.count(Call::Start), 2);
    }

    #[test]
    fn test_stop_after_start_without_subscribers() {
        let (c, rec) = coordinator();
        c.start().unwrap();
        c.stop().unwrap();
        assert_eq!(rec.calls(), vec![Call::Initialize, Call::Dispose]);
        c.start().unwrap();
        assert_eq!(c.state(), ResourceState::Stopped);
    }

    #[test]
    fn test_failed_initialize_keeps_subscriber() {
        let (c, rec) = coordinator();
        rec.fail_initialize.store(true, Ordering::SeqCst);

        let err = c.subscribe("A").unwrap_err();
        assert!(matches!(err, LifecycleError::ResourceInitialization { .. }));
        assert_eq!(err.destination(), "quotes");
        assert!(c.is_subscribed("A"));
        assert_eq!(c.state(), ResourceState::Uninitialized);

        let err = c.start().unwrap_err();
        assert!(matches!(err, LifecycleError::ResourceInitialization { .. }));
    }

    #[test]
    fn test_failed_start_keeps_subscriber_and_initialized_listener() {
        let (c, rec) = coordinator();
        rec.fail_start.store(true, Ordering::SeqCst);

        let err = c.subscribe("A").unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ResourceTransition {
                transition: Transition::Start,
                ..
            }
        ));
        assert!(c.is_subscribed("A"));
        assert_eq!(c.state(), ResourceState::Stopped);

        // The set is not empty any more, so only a new 0→1 transition retries.
        rec.fail_start.store(false, Ordering::SeqCst);
        c.subscribe("B").unwrap();
        assert_eq!(c.state(), ResourceState::Stopped);
    }

    #[test]
    fn test_failed_unsubscribe_halt_surfaces_error() {
        let (c, rec) = coordinator();
        c.subscribe("A").unwrap();
        rec.fail_stop.store(true, Ordering::SeqCst);

        let err = c.unsubscribe("A").unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ResourceTransition {
                transition: Transition::Stop,
                ..
            }
        ));
        assert!(!c.is_subscribed("A"));
        assert_eq!(c.state(), ResourceState::Running);
    }

    #[test]
    fn test_stop_disposes_even_when_halt_fails() {
        let (c, rec) = coordinator();
        c.subscribe("A").unwrap();
        rec.fail_stop.store(true, Ordering::SeqCst);

        let err = c.stop().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ResourceTransition {
                transition: Transition::Stop,
                ..
            }
        ));
        assert_eq!(c.state(), ResourceState::Uninitialized);
        assert_eq!(rec.count(Call::Dispose), 1);
    }

    #[test]
    fn test_concurrent_subscribers_are_serializable() {
        let (c, rec) = coordinator();
        let c = Arc::new(c);

        let workers: Vec<_> = (0..8)
            .map(|t| {
                let c = c.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let id = format!("client-{t}-{}", i % 5);
                        c.subscribe(&id).unwrap();
                        if i % 2 == 1 {
                            c.unsubscribe(&id).unwrap();
                        }
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        // The last touch of ids 1 and 3 is a plain subscribe, so each thread
        // leaves two members behind.
        assert_eq!(c.subscriber_count(), 16);
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(rec.count(Call::Start), rec.count(Call::Stop) + 1);
        assert_eq!(rec.count(Call::Initialize), 1);
    }

    /// A handle that reports itself uninitialized is disposed and replaced by
    /// the next `start` or first subscriber.
    #[test]
    fn test_stale_listener_is_replaced() {
        let (c, rec) = coordinator();
        c.start().unwrap();

        rec.invalidated.store(true, Ordering::SeqCst);
        assert_eq!(c.state(), ResourceState::Uninitialized);
        c.start().unwrap();
        assert_eq!(c.state(), ResourceState::Stopped);
        assert_eq!(rec.calls(), vec![Call::Initialize, Call::Dispose, Call::Initialize]);

        rec.invalidated.store(true, Ordering::SeqCst);
        c.subscribe("A").unwrap();
        assert_eq!(c.state(), ResourceState::Running);
        assert_eq!(
            rec.calls()[3..],
            [Call::Dispose, Call::Initialize, Call::Start]
        );

        // Joining a non-empty set leaves a stale listener alone.
        rec.invalidated.store(true, Ordering::SeqCst);
        c.subscribe("B").unwrap();
        assert_eq!(c.state(), ResourceState::Uninitialized);
        assert_eq!(rec.count(Call::Initialize), 3);
    }

    struct CountEvents(Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CountEvents {
        fn on_event(
            &self,
            _event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Transitions and failures are left to the caller to log.
    #[test]
    fn test_coordinator_emits_no_events() {
        use tracing_subscriber::prelude::*;

        let events = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountEvents(events.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let (c, rec) = coordinator();
            c.subscribe("A").unwrap();
            c.unsubscribe("A").unwrap();
            rec.fail_initialize.store(true, Ordering::SeqCst);
            c.stop().unwrap();
            assert!(c.subscribe("B").is_err());
        });
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    /// A coordinator blocked inside a resource call does not hold up another
    /// destination.
    #[test]
    fn test_destinations_do_not_share_a_lock() {
        let (slow, slow_rec) = coordinator_for("slow");
        let (fast, _) = coordinator_for("fast");

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *slow_rec.gate.lock() = Some((entered_tx, release_rx));

        thread::scope(|s| {
            let blocked = s.spawn(|| slow.subscribe("A"));
            entered_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("initialize never entered");

            let (done_tx, done_rx) = mpsc::channel();
            let fast = &fast;
            s.spawn(move || {
                fast.subscribe("A").unwrap();
                done_tx.send(fast.state()).unwrap();
            });
            assert_eq!(
                done_rx.recv_timeout(Duration::from_secs(1)),
                Ok(ResourceState::Running)
            );

            release_tx.send(()).unwrap();
            blocked.join().unwrap().unwrap();
        });
        assert_eq!(slow.state(), ResourceState::Running);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Subscribe(u8),
        Unsubscribe(u8),
        Start,
        Stop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u8..4).prop_map(Op::Subscribe),
            4 => (0u8..4).prop_map(Op::Unsubscribe),
            1 => Just(Op::Start),
            1 => Just(Op::Stop),
        ]
    }

    proptest! {
        /// Checked against a model: the listener runs exactly while members
        /// exist and no `stop` came after the last start.
        #[test]
        fn prop_running_matches_model(ops in proptest::collection::vec(op(), 0..64)) {
            let (c, _rec) = coordinator();
            let mut members = std::collections::BTreeSet::new();
            let mut model = ResourceState::Uninitialized;

            for op in ops {
                match op {
                    Op::Subscribe(id) => {
                        let was_empty = members.is_empty();
                        if members.insert(id) && was_empty {
                            model = ResourceState::Running;
                        }
                        c.subscribe(&id.to_string()).unwrap();
                    }
                    Op::Unsubscribe(id) => {
                        if members.remove(&id) && members.is_empty() && model == ResourceState::Running {
                            model = ResourceState::Stopped;
                        }
                        c.unsubscribe(&id.to_string()).unwrap();
                    }
                    Op::Start => {
                        if model == ResourceState::Uninitialized {
                            model = ResourceState::Stopped;
                        }
                        c.start().unwrap();
                    }
                    Op::Stop => {
                        model = ResourceState::Uninitialized;
                        c.stop().unwrap();
                    }
                }
                prop_assert_eq!(c.state(), model);
                prop_assert_eq!(c.subscriber_count(), members.len());
            }
        }
    }
}
