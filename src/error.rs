use thiserror::Error;

/// Failure taxonomy for the leave-application surface.
///
/// ON_HOLD is deliberately not represented here: being held is a valid,
/// non-terminal outcome of a submission, not a failure.
#[derive(Error, Debug)]
pub enum LeaveError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("an active application already exists for this staff member and date")]
    Duplicate,

    #[error("annual leave balance is exhausted")]
    AnnualExhausted,

    #[error("fairness score is below the threshold for this leave type")]
    FairnessBelowThreshold,

    #[error("category is oversubscribed for this date")]
    SlotOverflow,

    #[error("staff not eligible: {0}")]
    Staff(String),

    #[error("concurrent submission conflict; please retry")]
    Conflict,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LeaveError {
    /// Conflicts are transient serialization failures; the caller may retry
    /// against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LeaveError::Conflict)
    }

    /// True for rejections the requester themselves caused (as opposed to
    /// infrastructure failures).
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            LeaveError::Validation(_)
                | LeaveError::Duplicate
                | LeaveError::AnnualExhausted
                | LeaveError::FairnessBelowThreshold
                | LeaveError::SlotOverflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_is_retryable() {
        assert!(LeaveError::Conflict.is_retryable());
        assert!(!LeaveError::Duplicate.is_retryable());
        assert!(!LeaveError::SlotOverflow.is_retryable());
    }

    #[test]
    fn user_rejections_exclude_storage_and_conflict() {
        assert!(LeaveError::Duplicate.is_user_rejection());
        assert!(LeaveError::FairnessBelowThreshold.is_user_rejection());
        assert!(!LeaveError::Conflict.is_user_rejection());
        assert!(!LeaveError::Storage(anyhow::anyhow!("db down")).is_user_rejection());
    }
}
