//! Fully wired state over an in-memory database and the virtual mailer.

use std::sync::Arc;

use mailflow_adapter_storage_sqlite_sqlx::pool::Config;
use mailflow_adapter_storage_sqlite_sqlx::{
    SqliteActivityLog, SqliteAutomationRepository, SqliteDelayQueue, SqliteEventStore,
    SqliteMembershipStore, SqliteRunRepository, SqliteSubscriberRepository,
};
use mailflow_adapter_virtual::VirtualMailer;
use mailflow_app::automation_engine::{AutomationEngine, EngineConfig};
use mailflow_app::event_bus::InProcessEventBus;
use mailflow_app::ports::{Adapters, Ports};

use crate::state::AppState;

pub struct TestPorts;

impl Ports for TestPorts {
    type Automations = SqliteAutomationRepository;
    type Runs = SqliteRunRepository;
    type Delays = SqliteDelayQueue;
    type Subscribers = SqliteSubscriberRepository;
    type Memberships = SqliteMembershipStore;
    type Messages = VirtualMailer;
    type Events = InProcessEventBus;
    type Activity = SqliteActivityLog;
}

pub struct TestApp {
    pub state: AppState<TestPorts, SqliteEventStore>,
    pub event_bus: Arc<InProcessEventBus>,
    pub mailer: Arc<VirtualMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        let pool = db.pool().clone();
        let event_bus = Arc::new(InProcessEventBus::new(64));
        let mailer = Arc::new(VirtualMailer::new());
        let ports: Adapters<TestPorts> = Adapters {
            automations: Arc::new(SqliteAutomationRepository::new(pool.clone())),
            runs: Arc::new(SqliteRunRepository::new(pool.clone())),
            delays: Arc::new(SqliteDelayQueue::new(pool.clone())),
            subscribers: Arc::new(SqliteSubscriberRepository::new(pool.clone())),
            memberships: Arc::new(SqliteMembershipStore::new(pool.clone())),
            messages: Arc::clone(&mailer),
            events: Arc::clone(&event_bus),
            activity: Arc::new(SqliteActivityLog::new(pool.clone())),
        };
        let engine = Arc::new(AutomationEngine::new(ports.clone(), EngineConfig::default()));
        let state = AppState::new(
            ports,
            engine,
            SqliteEventStore::new(pool),
            Arc::clone(&event_bus),
        );
        Self {
            state,
            event_bus,
            mailer,
        }
    }
}
