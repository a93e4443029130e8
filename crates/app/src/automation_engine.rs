//! Automation engine — the run state machine and the delay sweep.
//!
//! A pass starts at a step index and walks the definition's steps in order
//! until the run completes, fails, or suspends on a `Wait` step. Suspension
//! writes a [`DelayTicket`]; [`AutomationEngine::sweep`] later claims due
//! tickets and starts a new pass after the waiting step.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use mailflow_domain::activity::ActivityEntry;
use mailflow_domain::automation::{Action, Automation};
use mailflow_domain::delay::DelayTicket;
use mailflow_domain::error::{DeliveryError, MailflowError, NotFoundError};
use mailflow_domain::event::{Event, EventType};
use mailflow_domain::id::{AutomationId, RunId, SubscriberId};
use mailflow_domain::run::{Run, RunStatus};
use mailflow_domain::subscriber::Subscriber;
use mailflow_domain::time::{Timestamp, now};

use crate::ports::{
    ActivityLog, Adapters, AutomationRepository, Claim, DelayQueue, EventPublisher,
    MembershipStore, MessageSender, Ports, RunRepository, SubscriberRepository,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tunables for [`AutomationEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single message delivery.
    pub delivery_timeout: Duration,
    /// How many `StartAutomation` hops a single pass may chain.
    pub max_chain_depth: u32,
    /// Fail runs that reach an undecodable step instead of skipping it.
    pub strict_steps: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(30),
            max_chain_depth: 8,
            strict_steps: false,
        }
    }
}

/// Result of asking the engine to start a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Run),
    /// The definition has no steps; no run was created.
    NoSteps,
}

/// Executes runs against the ports selected by `P`.
pub struct AutomationEngine<P: Ports> {
    ports: Adapters<P>,
    config: EngineConfig,
}

impl<P: Ports> AutomationEngine<P> {
    pub fn new(ports: Adapters<P>, config: EngineConfig) -> Self {
        Self { ports, config }
    }

    /// Create a run of `automation_id` for `subscriber_id` and execute it
    /// until it completes, fails, or suspends.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] when the definition or the
    /// subscriber does not exist (no run is created), or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn start_run(
        &self,
        automation_id: AutomationId,
        subscriber_id: SubscriberId,
    ) -> Result<StartOutcome, MailflowError> {
        let automation = self
            .ports
            .automations
            .get_by_id(automation_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Automation",
                id: automation_id.to_string(),
            })?;
        let subscriber = self
            .ports
            .subscribers
            .get_by_id(subscriber_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Subscriber",
                id: subscriber_id.to_string(),
            })?;
        self.start_at_depth(automation, subscriber, 0).await
    }

    fn start_at_depth(
        &self,
        automation: Automation,
        subscriber: Subscriber,
        depth: u32,
    ) -> BoxFuture<'_, Result<StartOutcome, MailflowError>> {
        Box::pin(async move {
            if automation.steps.is_empty() {
                tracing::debug!(automation_id = %automation.id, "automation has no steps");
                return Ok(StartOutcome::NoSteps);
            }

            let run = self
                .ports
                .runs
                .create(Run::start(automation.id, subscriber.id))
                .await?;
            tracing::info!(
                run_id = %run.id,
                automation_id = %automation.id,
                subscriber_id = %subscriber.id,
                depth,
                "run started"
            );
            self.emit(EventType::AutomationEntered, &run, serde_json::json!({}))
                .await;
            self.record(ActivityEntry::new(
                "automation.entered",
                "automation",
                automation.id,
                serde_json::json!({"run_id": run.id, "subscriber_id": subscriber.id}),
            ))
            .await;

            let run = self
                .execute_pass(run, &automation, subscriber, 0, depth)
                .await?;
            Ok(StartOutcome::Started(run))
        })
    }

    /// Continue `run` at step `from` using the live definition.
    ///
    /// Fails the run when its definition or subscriber has disappeared.
    ///
    /// # Errors
    ///
    /// Returns a storage error from any port.
    #[tracing::instrument(skip(self, run), fields(run_id = %run.id))]
    pub async fn execute_from(&self, run: Run, from: u32) -> Result<Run, MailflowError> {
        let Some(automation) = self.ports.automations.get_by_id(run.automation_id).await? else {
            return self.fail(run, "Automation not found").await;
        };
        let Some(subscriber) = self.ports.subscribers.get_by_id(run.subscriber_id).await? else {
            return self.fail(run, "Subscriber not found").await;
        };
        if automation.changed_since(run.started_at) {
            tracing::warn!(
                automation_id = %automation.id,
                "definition changed after the run started, continuing with the current steps"
            );
        }
        self.execute_pass(run, &automation, subscriber, from, 0)
            .await
    }

    async fn execute_pass(
        &self,
        mut run: Run,
        automation: &Automation,
        mut subscriber: Subscriber,
        from: u32,
        depth: u32,
    ) -> Result<Run, MailflowError> {
        let mut index = from;

        while let Some(step) = automation.step(index) {
            match self.ports.runs.get_by_id(run.id).await? {
                None => {
                    tracing::debug!(run_id = %run.id, "run deleted during execution");
                    return Ok(run);
                }
                Some(current) if current.paused => {
                    run.paused = true;
                    run.halt(index);
                    let run = self.ports.runs.update(run).await?;
                    tracing::info!(run_id = %run.id, step_index = index, "run paused");
                    return Ok(run);
                }
                Some(_) => {}
            }

            run.enter_step(index);
            run = self.ports.runs.update(run).await?;

            match &step.action {
                Action::SendMessage { subject, body } => {
                    if let Err(err) = self.deliver(&subscriber.email, subject, body).await {
                        return self.fail(run, &err.to_string()).await;
                    }
                }
                Action::Wait { minutes } => {
                    let ticket = match DelayTicket::new(run.id, index, now(), *minutes) {
                        Ok(ticket) => ticket,
                        Err(err) => return self.fail(run, &err.to_string()).await,
                    };
                    let execute_after = ticket.execute_after;
                    run.suspend();
                    let run = self.ports.delays.suspend(run, ticket).await?;
                    tracing::info!(
                        run_id = %run.id,
                        step_index = index,
                        %execute_after,
                        "run waiting"
                    );
                    return Ok(run);
                }
                Action::SetField { key, value } => {
                    subscriber.set_field(key.clone(), value);
                    subscriber = self.ports.subscribers.update(subscriber).await?;
                }
                Action::JoinGroup { group_id } => {
                    self.ports
                        .memberships
                        .join_group(subscriber.id, *group_id)
                        .await?;
                }
                Action::LeaveGroup { group_id } => {
                    self.ports
                        .memberships
                        .leave_group(subscriber.id, *group_id)
                        .await?;
                }
                Action::AddLabel { label_id } => {
                    self.ports
                        .memberships
                        .add_label(subscriber.id, *label_id)
                        .await?;
                }
                Action::RemoveLabel { label_id } => {
                    self.ports
                        .memberships
                        .remove_label(subscriber.id, *label_id)
                        .await?;
                }
                Action::StartAutomation { definition_id } => {
                    self.start_child(automation.id, *definition_id, &subscriber, depth)
                        .await;
                }
                Action::Skip { step_type } => {
                    if self.config.strict_steps {
                        let message =
                            format!("step {index} ({step_type}) has an undecodable payload");
                        return self.fail(run, &message).await;
                    }
                    tracing::debug!(run_id = %run.id, step_index = index, %step_type, "step skipped");
                }
            }

            index += 1;
        }

        run.complete(now());
        let run = self.ports.runs.update(run).await?;
        tracing::info!(run_id = %run.id, "run completed");
        self.emit(EventType::AutomationCompleted, &run, serde_json::json!({}))
            .await;
        Ok(run)
    }

    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let send = self.ports.messages.send(to, subject, body);
        match tokio::time::timeout(self.config.delivery_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::new(format!(
                "no response within {}s",
                self.config.delivery_timeout.as_secs()
            ))),
        }
    }

    /// Run a `StartAutomation` step. The child's outcome never affects the
    /// parent, so every problem is logged and swallowed.
    async fn start_child(
        &self,
        parent: AutomationId,
        target: AutomationId,
        subscriber: &Subscriber,
        depth: u32,
    ) {
        if target == parent {
            tracing::debug!(automation_id = %parent, "automation cannot start itself");
            return;
        }
        if depth >= self.config.max_chain_depth {
            tracing::warn!(
                automation_id = %target,
                depth,
                "automation chain too deep, not starting"
            );
            return;
        }

        let child = match self.ports.automations.get_by_id(target).await {
            Ok(Some(child)) if child.active => child,
            Ok(Some(_)) => {
                tracing::debug!(automation_id = %target, "target automation is inactive");
                return;
            }
            Ok(None) => {
                tracing::debug!(automation_id = %target, "target automation does not exist");
                return;
            }
            Err(err) => {
                tracing::warn!(automation_id = %target, error = %err, "failed to load target automation");
                return;
            }
        };

        match self.start_at_depth(child, subscriber.clone(), depth + 1).await {
            Ok(StartOutcome::Started(run)) => {
                tracing::debug!(child_run_id = %run.id, status = %run.status, "chained run started");
            }
            Ok(StartOutcome::NoSteps) => {}
            Err(err) => {
                tracing::warn!(automation_id = %target, error = %err, "chained run failed to start");
            }
        }
    }

    async fn fail(&self, mut run: Run, message: &str) -> Result<Run, MailflowError> {
        run.fail(message, now());
        let run = self.ports.runs.update(run).await?;
        tracing::warn!(run_id = %run.id, error = message, "run failed");
        self.emit(
            EventType::AutomationFailed,
            &run,
            serde_json::json!({"error": run.error_message}),
        )
        .await;
        Ok(run)
    }

    async fn emit(&self, event_type: EventType, run: &Run, extra: serde_json::Value) {
        let mut data = serde_json::json!({
            "automation_id": run.automation_id,
            "run_id": run.id,
            "subscriber_id": run.subscriber_id,
        });
        if let (Some(data), serde_json::Value::Object(extra)) = (data.as_object_mut(), extra) {
            data.extend(extra);
        }
        let event = Event::new(event_type, Some(run.id), data);
        if let Err(err) = self.ports.events.publish(event).await {
            tracing::warn!(error = %err, %event_type, "failed to publish event");
        }
    }

    async fn record(&self, entry: ActivityEntry) {
        if let Err(err) = self.ports.activity.record(entry).await {
            tracing::warn!(error = %err, "failed to record activity");
        }
    }

    /// Resume every run whose delay has elapsed, at most `limit` of them.
    ///
    /// Returns how many tickets were claimed, including orphans that were
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns a storage error when listing or claiming tickets fails; the
    /// caller is expected to retry on its next tick.
    pub async fn sweep(&self, limit: usize) -> Result<usize, MailflowError> {
        self.sweep_at(now(), limit).await
    }

    /// [`sweep`](Self::sweep) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`sweep`](Self::sweep).
    #[tracing::instrument(skip(self))]
    pub async fn sweep_at(&self, at: Timestamp, limit: usize) -> Result<usize, MailflowError> {
        let due = self.ports.delays.due(at, limit).await?;
        if due.is_empty() {
            tracing::debug!("no delay tickets due");
            return Ok(0);
        }

        let mut processed = 0;
        for ticket in due {
            match self.ports.delays.claim(&ticket).await? {
                Claim::AlreadyClaimed => {
                    tracing::debug!(ticket_id = %ticket.id, "ticket claimed elsewhere");
                }
                Claim::Orphaned => {
                    tracing::debug!(ticket_id = %ticket.id, run_id = %ticket.run_id, "discarded orphaned ticket");
                    processed += 1;
                }
                Claim::Resumed(run) => {
                    processed += 1;
                    let run_id = run.id;
                    if let Err(err) = self.execute_from(run, ticket.resume_index()).await {
                        tracing::warn!(%run_id, error = %err, "resumed run errored");
                    }
                }
            }
        }

        tracing::info!(processed, "sweep finished");
        Ok(processed)
    }

    /// Set the operator pause flag. The next pass over the run halts.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the run does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn pause_run(&self, id: RunId) -> Result<Run, MailflowError> {
        self.ports
            .runs
            .set_paused(id, true)
            .await?
            .ok_or_else(|| run_not_found(id))
    }

    /// Clear the pause flag and, if a pass halted on it, continue from the
    /// step where it stopped.
    ///
    /// A run paused while waiting keeps waiting; its ticket resumes it as
    /// usual. When several callers resume the same halted run at once, only
    /// the one that claims the halt re-executes it.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the run does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn resume_run(&self, id: RunId) -> Result<Run, MailflowError> {
        let run = self
            .ports
            .runs
            .set_paused(id, false)
            .await?
            .ok_or_else(|| run_not_found(id))?;
        let Some(step) = run.halted_at.filter(|_| run.status == RunStatus::Running) else {
            return Ok(run);
        };
        match self.ports.runs.claim_halt(id, step).await? {
            Some(claimed) => self.execute_from(claimed, step).await,
            None => {
                tracing::debug!(run_id = %id, step_index = step, "halt already claimed");
                Ok(self.ports.runs.get_by_id(id).await?.unwrap_or(run))
            }
        }
    }

    /// Delete a run and its pending ticket.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the run does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_run(&self, id: RunId) -> Result<(), MailflowError> {
        let run = self
            .ports
            .runs
            .get_by_id(id)
            .await?
            .ok_or_else(|| run_not_found(id))?;
        self.ports.runs.delete(id).await?;
        self.record(ActivityEntry::new(
            "automation.cancelled",
            "automation_run",
            id,
            serde_json::json!({"automation_id": run.automation_id, "status": run.status}),
        ))
        .await;
        tracing::info!(run_id = %id, "run cancelled");
        Ok(())
    }
}

fn run_not_found(id: RunId) -> MailflowError {
    NotFoundError {
        entity: "Run",
        id: id.to_string(),
    }
    .into()
}
