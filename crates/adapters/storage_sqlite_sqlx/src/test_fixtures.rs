//! Seed rows that runs and tickets reference.

use mailflow_app::ports::{AutomationRepository, SubscriberRepository};
use mailflow_domain::automation::{Action, Automation, TriggerCategory};
use mailflow_domain::subscriber::Subscriber;
use sqlx::SqlitePool;

use crate::{SqliteAutomationRepository, SqliteSubscriberRepository};

pub async fn automation(pool: &SqlitePool) -> Automation {
    let automation = Automation::builder()
        .name("Drip")
        .trigger(TriggerCategory::SubjectCreated)
        .step(Action::Wait { minutes: 10 })
        .build()
        .unwrap();
    SqliteAutomationRepository::new(pool.clone())
        .create(automation)
        .await
        .unwrap()
}

pub async fn subscriber(pool: &SqlitePool, email: &str) -> Subscriber {
    let subscriber = Subscriber::builder().email(email).build().unwrap();
    SqliteSubscriberRepository::new(pool.clone())
        .create(subscriber)
        .await
        .unwrap()
}
