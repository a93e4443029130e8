//! In-memory port implementations shared by the app-layer tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mailflow_domain::activity::ActivityEntry;
use mailflow_domain::automation::{Action, Automation, TriggerCategory};
use mailflow_domain::delay::DelayTicket;
use mailflow_domain::error::{DeliveryError, MailflowError, NotFoundError};
use mailflow_domain::event::Event;
use mailflow_domain::id::{AutomationId, GroupId, LabelId, RunId, SubscriberId};
use mailflow_domain::run::{Run, RunStatus};
use mailflow_domain::subscriber::Subscriber;
use mailflow_domain::time::Timestamp;

use crate::ports::{
    ActivityLog, Adapters, AutomationRepository, Claim, DelayQueue, EventPublisher,
    MembershipStore, MessageSender, Ports, RunFilter, RunRepository, SubscriberRepository,
};

#[derive(Default)]
pub struct State {
    pub automations: HashMap<AutomationId, Automation>,
    pub runs: HashMap<RunId, Run>,
    pub tickets: HashMap<RunId, DelayTicket>,
    pub subscribers: HashMap<SubscriberId, Subscriber>,
    pub groups: HashSet<(SubscriberId, GroupId)>,
    pub labels: HashSet<(SubscriberId, LabelId)>,
    pub activity: Vec<ActivityEntry>,
}

/// One lock over every table, so cascades and claims are atomic.
#[derive(Default)]
pub struct InMemoryStore {
    pub state: Mutex<State>,
}

impl InMemoryStore {
    pub fn run(&self, id: RunId) -> Option<Run> {
        self.state.lock().unwrap().runs.get(&id).cloned()
    }

    pub fn ticket_for(&self, id: RunId) -> Option<DelayTicket> {
        self.state.lock().unwrap().tickets.get(&id).cloned()
    }

    pub fn runs_of(&self, automation_id: AutomationId) -> Vec<Run> {
        self.state
            .lock()
            .unwrap()
            .runs
            .values()
            .filter(|r| r.automation_id == automation_id)
            .cloned()
            .collect()
    }

    pub fn subscriber(&self, id: SubscriberId) -> Option<Subscriber> {
        self.state.lock().unwrap().subscribers.get(&id).cloned()
    }

    /// Move a ticket's deadline, e.g. to make it due immediately.
    pub fn reschedule(&self, run_id: RunId, execute_after: Timestamp) {
        if let Some(ticket) = self.state.lock().unwrap().tickets.get_mut(&run_id) {
            ticket.execute_after = execute_after;
        }
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> MailflowError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

impl AutomationRepository for InMemoryStore {
    async fn create(&self, automation: Automation) -> Result<Automation, MailflowError> {
        self.state
            .lock()
            .unwrap()
            .automations
            .insert(automation.id, automation.clone());
        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, MailflowError> {
        Ok(self.state.lock().unwrap().automations.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Automation>, MailflowError> {
        Ok(self.state.lock().unwrap().automations.values().cloned().collect())
    }

    async fn get_active_by_trigger(
        &self,
        trigger: TriggerCategory,
    ) -> Result<Vec<Automation>, MailflowError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .automations
            .values()
            .filter(|a| a.active && a.trigger == trigger)
            .cloned()
            .collect())
    }

    async fn update(&self, automation: Automation) -> Result<Automation, MailflowError> {
        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.automations.get_mut(&automation.id) else {
            return Err(not_found("Automation", automation.id));
        };
        let steps = std::mem::take(&mut stored.steps);
        *stored = Automation { steps, ..automation };
        Ok(stored.clone())
    }

    async fn replace_steps(&self, automation: Automation) -> Result<Automation, MailflowError> {
        let mut state = self.state.lock().unwrap();
        if !state.automations.contains_key(&automation.id) {
            return Err(not_found("Automation", automation.id));
        }
        state.automations.insert(automation.id, automation.clone());
        Ok(automation)
    }

    async fn delete(&self, id: AutomationId) -> Result<(), MailflowError> {
        let mut state = self.state.lock().unwrap();
        if state.automations.remove(&id).is_none() {
            return Err(not_found("Automation", id));
        }
        let doomed: Vec<RunId> = state
            .runs
            .values()
            .filter(|r| r.automation_id == id)
            .map(|r| r.id)
            .collect();
        for run_id in doomed {
            state.runs.remove(&run_id);
            state.tickets.remove(&run_id);
        }
        Ok(())
    }
}

impl RunRepository for InMemoryStore {
    async fn create(&self, run: Run) -> Result<Run, MailflowError> {
        self.state.lock().unwrap().runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_by_id(&self, id: RunId) -> Result<Option<Run>, MailflowError> {
        Ok(self.state.lock().unwrap().runs.get(&id).cloned())
    }

    async fn list(&self, filter: RunFilter) -> Result<Vec<Run>, MailflowError> {
        let state = self.state.lock().unwrap();
        let mut runs: Vec<Run> = state
            .runs
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = filter.limit {
            runs.truncate(limit);
        }
        Ok(runs)
    }

    async fn update(&self, run: Run) -> Result<Run, MailflowError> {
        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.runs.get_mut(&run.id) else {
            return Err(not_found("Run", run.id));
        };
        let paused = stored.paused;
        *stored = Run { paused, ..run };
        Ok(stored.clone())
    }

    async fn set_paused(&self, id: RunId, paused: bool) -> Result<Option<Run>, MailflowError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.runs.get_mut(&id).map(|run| {
            run.paused = paused;
            run.clone()
        }))
    }

    async fn claim_halt(&self, id: RunId, step: u32) -> Result<Option<Run>, MailflowError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .runs
            .get_mut(&id)
            .filter(|run| run.status == RunStatus::Running && run.halted_at == Some(step))
            .map(|run| {
                run.halted_at = None;
                run.clone()
            }))
    }

    async fn delete(&self, id: RunId) -> Result<(), MailflowError> {
        let mut state = self.state.lock().unwrap();
        state.runs.remove(&id);
        state.tickets.remove(&id);
        Ok(())
    }
}

impl DelayQueue for InMemoryStore {
    async fn suspend(&self, run: Run, ticket: DelayTicket) -> Result<Run, MailflowError> {
        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.runs.get_mut(&run.id) else {
            return Err(not_found("Run", run.id));
        };
        let paused = stored.paused;
        *stored = Run { paused, ..run };
        let run = stored.clone();
        state.tickets.insert(ticket.run_id, ticket);
        Ok(run)
    }

    async fn due(&self, now: Timestamp, limit: usize) -> Result<Vec<DelayTicket>, MailflowError> {
        let state = self.state.lock().unwrap();
        let mut due: Vec<DelayTicket> = state
            .tickets
            .values()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|t| t.execute_after);
        due.truncate(limit);
        Ok(due)
    }

    async fn claim(&self, ticket: &DelayTicket) -> Result<Claim, MailflowError> {
        let mut state = self.state.lock().unwrap();
        match state.tickets.get(&ticket.run_id) {
            Some(live) if live.id == ticket.id => {}
            _ => return Ok(Claim::AlreadyClaimed),
        }
        state.tickets.remove(&ticket.run_id);
        match state.runs.get_mut(&ticket.run_id) {
            Some(run) if run.is_resumable() => {
                run.resume();
                Ok(Claim::Resumed(run.clone()))
            }
            _ => Ok(Claim::Orphaned),
        }
    }

    async fn find_by_run(&self, run_id: RunId) -> Result<Option<DelayTicket>, MailflowError> {
        Ok(self.state.lock().unwrap().tickets.get(&run_id).cloned())
    }
}

impl SubscriberRepository for InMemoryStore {
    async fn create(&self, subscriber: Subscriber) -> Result<Subscriber, MailflowError> {
        self.state
            .lock()
            .unwrap()
            .subscribers
            .insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    async fn get_by_id(&self, id: SubscriberId) -> Result<Option<Subscriber>, MailflowError> {
        Ok(self.state.lock().unwrap().subscribers.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, MailflowError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscribers
            .values()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn update(&self, subscriber: Subscriber) -> Result<Subscriber, MailflowError> {
        let mut state = self.state.lock().unwrap();
        if !state.subscribers.contains_key(&subscriber.id) {
            return Err(not_found("Subscriber", subscriber.id));
        }
        state.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    async fn delete(&self, id: SubscriberId) -> Result<(), MailflowError> {
        let mut state = self.state.lock().unwrap();
        if state.subscribers.remove(&id).is_none() {
            return Err(not_found("Subscriber", id));
        }
        let doomed: Vec<RunId> = state
            .runs
            .values()
            .filter(|r| r.subscriber_id == id)
            .map(|r| r.id)
            .collect();
        for run_id in doomed {
            state.runs.remove(&run_id);
            state.tickets.remove(&run_id);
        }
        state.groups.retain(|(s, _)| *s != id);
        state.labels.retain(|(s, _)| *s != id);
        Ok(())
    }
}

impl MembershipStore for InMemoryStore {
    async fn join_group(&self, s: SubscriberId, g: GroupId) -> Result<(), MailflowError> {
        self.state.lock().unwrap().groups.insert((s, g));
        Ok(())
    }

    async fn leave_group(&self, s: SubscriberId, g: GroupId) -> Result<(), MailflowError> {
        self.state.lock().unwrap().groups.remove(&(s, g));
        Ok(())
    }

    async fn add_label(&self, s: SubscriberId, l: LabelId) -> Result<(), MailflowError> {
        self.state.lock().unwrap().labels.insert((s, l));
        Ok(())
    }

    async fn remove_label(&self, s: SubscriberId, l: LabelId) -> Result<(), MailflowError> {
        self.state.lock().unwrap().labels.remove(&(s, l));
        Ok(())
    }

    async fn groups_of(&self, s: SubscriberId) -> Result<Vec<GroupId>, MailflowError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .groups
            .iter()
            .filter(|(owner, _)| *owner == s)
            .map(|(_, g)| *g)
            .collect())
    }

    async fn labels_of(&self, s: SubscriberId) -> Result<Vec<LabelId>, MailflowError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .labels
            .iter()
            .filter(|(owner, _)| *owner == s)
            .map(|(_, l)| *l)
            .collect())
    }
}

impl ActivityLog for InMemoryStore {
    async fn record(&self, entry: ActivityEntry) -> Result<(), MailflowError> {
        self.state.lock().unwrap().activity.push(entry);
        Ok(())
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, MailflowError> {
        let state = self.state.lock().unwrap();
        Ok(state.activity.iter().rev().take(limit).cloned().collect())
    }
}

/// Records every send; fails for addresses on the bounce list and never
/// answers for addresses on the stall list.
#[derive(Default)]
pub struct SpyMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub bounce: Mutex<HashSet<String>>,
    pub stall: Mutex<HashSet<String>>,
}

impl SpyMailer {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, subject, _)| subject.clone())
            .collect()
    }
}

impl MessageSender for SpyMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let stalled = self.stall.lock().unwrap().contains(to);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let bounced = self.bounce.lock().unwrap().contains(to);
        if bounced {
            return Err(DeliveryError::new(format!("mailbox {to} rejected the message")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct SpyPublisher {
    pub published: Mutex<Vec<Event>>,
}

impl EventPublisher for SpyPublisher {
    async fn publish(&self, event: Event) -> Result<(), MailflowError> {
        self.published.lock().unwrap().push(event);
        Ok(())
    }
}

pub struct TestPorts;

impl Ports for TestPorts {
    type Automations = InMemoryStore;
    type Runs = InMemoryStore;
    type Delays = InMemoryStore;
    type Subscribers = InMemoryStore;
    type Memberships = InMemoryStore;
    type Messages = SpyMailer;
    type Events = SpyPublisher;
    type Activity = InMemoryStore;
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<SpyMailer>,
    pub publisher: Arc<SpyPublisher>,
    pub adapters: Adapters<TestPorts>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::default());
        let mailer = Arc::new(SpyMailer::default());
        let publisher = Arc::new(SpyPublisher::default());
        let adapters = Adapters {
            automations: Arc::clone(&store),
            runs: Arc::clone(&store),
            delays: Arc::clone(&store),
            subscribers: Arc::clone(&store),
            memberships: Arc::clone(&store),
            messages: Arc::clone(&mailer),
            events: Arc::clone(&publisher),
            activity: Arc::clone(&store),
        };
        Self {
            store,
            mailer,
            publisher,
            adapters,
        }
    }

    pub fn subscriber(&self, email: &str) -> Subscriber {
        let subscriber = Subscriber::builder().email(email).build().unwrap();
        self.store
            .state
            .lock()
            .unwrap()
            .subscribers
            .insert(subscriber.id, subscriber.clone());
        subscriber
    }

    pub fn automation(&self, trigger: TriggerCategory, actions: Vec<Action>) -> Automation {
        let mut builder = Automation::builder().name("test flow").trigger(trigger);
        for action in actions {
            builder = builder.step(action);
        }
        let automation = builder.build().unwrap();
        self.store
            .state
            .lock()
            .unwrap()
            .automations
            .insert(automation.id, automation.clone());
        automation
    }

    pub fn event_types(&self) -> Vec<mailflow_domain::event::EventType> {
        self.publisher
            .published
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect()
    }
}

pub fn send(subject: &str) -> Action {
    Action::SendMessage {
        subject: subject.to_string(),
        body: format!("<p>{subject}</p>"),
    }
}
