use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::leave::model::{LeaveStatus, LeaveType};

/// Outcome event handed to the external notification collaborator.
#[derive(Clone, Debug)]
pub struct LeaveOutcomeEvent {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub leave_type: LeaveType,
    pub outcome: LeaveStatus,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn leave_outcome(&self, event: LeaveOutcomeEvent) -> anyhow::Result<()>;
}

/// Default collaborator stub: logs the event. Real delivery (push, Kakao,
/// etc.) lives outside this core.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn leave_outcome(&self, event: LeaveOutcomeEvent) -> anyhow::Result<()> {
        info!(
            staff_id = %event.staff_id,
            date = %event.date,
            leave_type = event.leave_type.as_str(),
            outcome = event.outcome.as_str(),
            "leave outcome notification"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatch. Delivery failure must never affect the
/// application outcome, so errors are swallowed with a warning.
pub async fn notify_best_effort(notifier: &dyn Notifier, event: LeaveOutcomeEvent) {
    let staff_id = event.staff_id;
    if let Err(e) = notifier.leave_outcome(event).await {
        warn!(error = %e, %staff_id, "notification delivery failed; ignoring");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn leave_outcome(&self, _: LeaveOutcomeEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("gateway down"))
        }
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let event = LeaveOutcomeEvent {
            staff_id: Uuid::new_v4(),
            date: "2025-11-21".parse().unwrap(),
            leave_type: LeaveType::Annual,
            outcome: LeaveStatus::Confirmed,
        };
        // Must not panic or propagate.
        notify_best_effort(&FailingNotifier, event).await;
    }
}
