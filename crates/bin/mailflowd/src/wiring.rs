//! Port selection for the daemon: `SQLite` storage, the virtual mailer and
//! the in-process event bus.

use std::sync::Arc;

use mailflow_adapter_storage_sqlite_sqlx::pool::Database;
use mailflow_adapter_storage_sqlite_sqlx::{
    SqliteActivityLog, SqliteAutomationRepository, SqliteDelayQueue, SqliteMembershipStore,
    SqliteRunRepository, SqliteSubscriberRepository,
};
use mailflow_adapter_virtual::VirtualMailer;
use mailflow_app::event_bus::InProcessEventBus;
use mailflow_app::ports::{Adapters, Ports};

/// Zero-sized marker selecting the daemon's adapters.
pub struct SqlitePorts;

impl Ports for SqlitePorts {
    type Automations = SqliteAutomationRepository;
    type Runs = SqliteRunRepository;
    type Delays = SqliteDelayQueue;
    type Subscribers = SqliteSubscriberRepository;
    type Memberships = SqliteMembershipStore;
    type Messages = VirtualMailer;
    type Events = InProcessEventBus;
    type Activity = SqliteActivityLog;
}

/// One repository per port, all sharing the database's pool.
pub fn adapters(
    db: &Database,
    mailer: Arc<VirtualMailer>,
    event_bus: Arc<InProcessEventBus>,
) -> Adapters<SqlitePorts> {
    let pool = db.pool();
    Adapters {
        automations: Arc::new(SqliteAutomationRepository::new(pool.clone())),
        runs: Arc::new(SqliteRunRepository::new(pool.clone())),
        delays: Arc::new(SqliteDelayQueue::new(pool.clone())),
        subscribers: Arc::new(SqliteSubscriberRepository::new(pool.clone())),
        memberships: Arc::new(SqliteMembershipStore::new(pool.clone())),
        messages: mailer,
        events: event_bus,
        activity: Arc::new(SqliteActivityLog::new(pool.clone())),
    }
}
