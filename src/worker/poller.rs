// Fri Jan 17 2026 - Alex

use super::{run_loop, CancellationToken};
use crate::config::Config;
use crate::instance::{DataModel, Session};
use crate::memory::{self, MemoryError, RemoteMemory};
use crate::offsets::OffsetTable;
use crate::sync::{InstanceSource, SyncEvent, SyncStats, TreeSynchronizer};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub type AttachFn = Box<dyn FnMut() -> Result<Arc<dyn RemoteMemory>, MemoryError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Status {
    Connecting { attempt: u32 },
    Connected,
    Failed { attempts: u32 },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Connecting { attempt } => write!(f, "Connecting... (attempt {})", attempt),
            Status::Connected => write!(f, "Connected"),
            Status::Failed { attempts } => write!(f, "Connection failed after {} attempts", attempts),
        }
    }
}

/// Receives what the poll loop sees. Both methods default to doing nothing.
pub trait PollObserver: Send {
    fn status(&mut self, _status: Status) {}

    /// `tree` is already updated; removed nodes are no longer in it.
    fn events(&mut self, _service: &str, _tree: &TreeSynchronizer, _events: &[SyncEvent]) {}
}

impl PollObserver for () {}

/// Attach/poll loop: keeps one session alive and one synchronizer per
/// configured service root.
pub struct Poller {
    config: Config,
    offsets: Arc<OffsetTable>,
    attach: AttachFn,
    observer: Box<dyn PollObserver>,
    session: Option<Arc<Session>>,
    trees: IndexMap<String, TreeSynchronizer>,
    retry: u32,
    attempts: u32,
    ticks: u64,
}

impl Poller {
    pub fn new(config: Config, offsets: Arc<OffsetTable>, attach: AttachFn) -> Self {
        let trees = config
            .services
            .iter()
            .map(|name| (name.clone(), TreeSynchronizer::new()))
            .collect();
        Self {
            config,
            offsets,
            attach,
            observer: Box::new(()),
            session: None,
            trees,
            retry: 0,
            attempts: 0,
            ticks: 0,
        }
    }

    /// Attaches to `config.process_name` on this machine.
    pub fn for_process(config: Config, offsets: Arc<OffsetTable>) -> Self {
        let name = config.process_name.clone();
        Self::new(config, offsets, Box::new(move || memory::attach(&name)))
    }

    pub fn with_observer(mut self, observer: Box<dyn PollObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn tree(&self, service: &str) -> Option<&TreeSynchronizer> {
        self.trees.get(service)
    }

    pub fn tree_mut(&mut self, service: &str) -> Option<&mut TreeSynchronizer> {
        self.trees.get_mut(service)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) {
        self.ticks += 1;

        if self.session.as_ref().is_some_and(|session| !session.is_alive()) {
            self.detach();
        }

        match self.session.clone() {
            Some(session) => self.sync(&session),
            None => self.try_attach(),
        }
    }

    /// Runs until `token` is cancelled, or for `max_ticks` ticks.
    pub fn run(&mut self, token: &CancellationToken, max_ticks: Option<u64>) {
        let interval = self.config.tick_interval();
        let stop_at = max_ticks.map(|n| self.ticks + n);
        run_loop(token, interval, || {
            self.tick();
            stop_at.map_or(true, |limit| self.ticks < limit)
        });
    }

    // One attach attempt per second's worth of ticks.
    fn try_attach(&mut self) {
        self.retry += 1;
        if self.retry < self.config.tick_rate {
            return;
        }
        self.retry = 0;
        self.attempts += 1;
        self.observer.status(Status::Connecting { attempt: self.attempts });

        match (self.attach)() {
            Ok(remote) => {
                log::info!("attached to {} (pid {})", self.config.process_name, remote.pid());
                self.session = Some(Session::with_thread_timeout(
                    remote,
                    self.offsets.clone(),
                    self.config.thread_timeout(),
                ));
                self.attempts = 0;
                self.observer.status(Status::Connected);
            }
            Err(e) => {
                log::debug!("attach attempt {} failed: {}", self.attempts, e);
                if self.attempts >= self.config.attach_attempts {
                    self.observer.status(Status::Failed { attempts: self.attempts });
                }
            }
        }
    }

    fn detach(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        log::info!("{} is no longer running", self.config.process_name);
        session.cache().clear();
        for (service, tree) in self.trees.iter_mut() {
            let events = tree.reset(memory::Address::NULL);
            if !events.is_empty() {
                self.observer.events(service, tree, &events);
            }
        }
        self.retry = 0;
    }

    fn sync(&mut self, session: &Arc<Session>) {
        let game = session.scheduler().data_model();
        for (service, tree) in self.trees.iter_mut() {
            let root = service_root(&game, service);
            let events = tree.tick(&InstanceSource::new(root));
            for event in &events {
                if let SyncEvent::Removed { address } = event {
                    session.cache().forget(*address);
                }
            }
            if !events.is_empty() {
                let stats = SyncStats::from_events(&events);
                if stats.has_structural_changes() {
                    log::debug!("{}: {:?}", service, stats);
                }
                self.observer.events(service, tree, &events);
            }
        }
    }
}

fn service_root(game: &DataModel, service: &str) -> crate::instance::Instance {
    if game.is_null() {
        return game.instance().clone();
    }
    game.service(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::fixture::TreeBuilder;
    use crate::memory::Address;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Log {
        statuses: Vec<Status>,
        events: Vec<(String, SyncEvent)>,
    }

    struct Recorder(Arc<Mutex<Log>>);

    impl PollObserver for Recorder {
        fn status(&mut self, status: Status) {
            self.0.lock().statuses.push(status);
        }

        fn events(&mut self, service: &str, _tree: &TreeSynchronizer, events: &[SyncEvent]) {
            let mut log = self.0.lock();
            log.events.extend(events.iter().map(|e| (service.to_string(), *e)));
        }
    }

    fn config(attempts: u32) -> Config {
        Config {
            tick_rate: 2,
            attach_attempts: attempts,
            services: vec!["Workspace".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn test_attach_retries_then_fails() {
        let tree = TreeBuilder::new();
        let log = Arc::new(Mutex::new(Log::default()));
        let attach: AttachFn = Box::new(|| Err(MemoryError::ProcessNotFound("RobloxPlayerBeta.exe".into())));
        let mut poller = Poller::new(config(2), tree.offset_table(), attach).with_observer(Box::new(Recorder(log.clone())));

        for _ in 0..6 {
            poller.tick();
        }
        assert!(!poller.is_connected());
        assert_eq!(
            log.lock().statuses,
            vec![
                Status::Connecting { attempt: 1 },
                Status::Connecting { attempt: 2 },
                Status::Failed { attempts: 2 },
                Status::Connecting { attempt: 3 },
                Status::Failed { attempts: 3 },
            ]
        );
    }

    #[test]
    fn test_sync_and_detach() {
        let mut tree = TreeBuilder::new();
        let game = tree.game();
        let workspace = tree.node("Workspace", "Workspace", game);
        let baseplate = tree.part("Baseplate", workspace, [0.0; 3], [1.0; 3]);
        let mock = tree.mock();

        let log = Arc::new(Mutex::new(Log::default()));
        let remote = mock.clone();
        let attach: AttachFn = Box::new(move || Ok(remote.clone() as Arc<dyn RemoteMemory>));
        let mut poller = Poller::new(config(10), tree.offset_table(), attach).with_observer(Box::new(Recorder(log.clone())));

        poller.tick();
        assert!(!poller.is_connected());
        poller.tick();
        assert!(poller.is_connected());
        assert_eq!(log.lock().statuses, vec![Status::Connecting { attempt: 1 }, Status::Connected]);
        assert_eq!(poller.session().map(|s| s.thread_timeout()), Some(config(10).thread_timeout()));

        poller.tick();
        assert_eq!(poller.tree("Workspace").map(|t| t.root()), Some(workspace));
        assert_eq!(
            log.lock().events,
            vec![("Workspace".to_string(), SyncEvent::Added { address: baseplate, parent: workspace })]
        );

        let spawn = tree.part("Spawn", workspace, [0.0; 3], [1.0; 3]);
        tree.detach(baseplate, workspace);
        poller.tick();
        {
            let log = log.lock();
            let latest: Vec<SyncEvent> = log.events[1..].iter().map(|(_, e)| *e).collect();
            assert_eq!(
                latest,
                vec![
                    SyncEvent::Added { address: spawn, parent: workspace },
                    SyncEvent::Removed { address: baseplate },
                ]
            );
        }
        let session = poller.session().cloned().unwrap();
        assert!(session.cache().get(baseplate).is_none());

        mock.kill();
        poller.tick();
        assert!(!poller.is_connected());
        assert!(session.cache().is_empty());
        assert_eq!(log.lock().events.last().map(|(_, e)| *e), Some(SyncEvent::Removed { address: spawn }));
        assert_eq!(poller.tree("Workspace").map(|t| t.root()), Some(Address::NULL));
    }

    #[test]
    fn test_run_stops_after_ticks() {
        let tree = TreeBuilder::new();
        let attach: AttachFn = Box::new(|| Err(MemoryError::Detached));
        let mut poller = Poller::new(config(1), tree.offset_table(), attach);
        poller.run(&CancellationToken::new(), Some(3));
        assert_eq!(poller.ticks(), 3);
    }

    #[test]
    fn test_run_stops_when_cancelled() {
        let tree = TreeBuilder::new();
        let token = CancellationToken::new();
        let stopper = token.clone();
        let mut calls = 0;
        let attach: AttachFn = Box::new(move || {
            calls += 1;
            if calls == 2 {
                stopper.cancel();
            }
            Err(MemoryError::Detached)
        });
        let mut poller = Poller::new(config(10), tree.offset_table(), attach);
        poller.run(&token, None);
        // tick_rate 2: one attach attempt every other tick
        assert_eq!(poller.ticks(), 4);
        assert!(!poller.is_connected());
    }
}
