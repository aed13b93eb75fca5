//! Category slot allocator.
//!
//! Pure capacity arithmetic for one (date, category) pair. The transactional
//! repository feeds it fresh counts inside the submission critical section;
//! reconciliation feeds it counts after capacity-freeing events.

/// Live application counts for one (date, category) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCounts {
    /// Required headcount for the category on this date.
    pub required: u32,
    /// Active staff in the category.
    pub total_staff: u32,
    pub confirmed: u32,
    pub pending: u32,
    pub on_hold: u32,
}

impl SlotCounts {
    /// How many of this category's staff may be absent before the required
    /// headcount is breached.
    pub fn allowed_absences(&self) -> u32 {
        self.total_staff.saturating_sub(self.required)
    }

    /// Applications that have reserved (or queued for) a slot.
    pub fn approved_or_held(&self) -> u32 {
        self.confirmed + self.on_hold
    }

    /// All live applications, including undecided ones.
    pub fn live(&self) -> u32 {
        self.confirmed + self.pending + self.on_hold
    }
}

/// Hold-versus-reject policy knob.
#[derive(Clone, Copy, Debug)]
pub struct SlotPolicy {
    /// Requests beyond allowed absences that may wait ON_HOLD before further
    /// submissions are rejected outright. 0 disables holding.
    pub hold_queue_depth: u32,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self { hold_queue_depth: 2 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotDecision {
    Confirm,
    /// Capacity currently insufficient, but a plausible path to approval
    /// remains (a holder ahead may cancel, or the roster may change).
    Hold,
    /// Category provably oversubscribed beyond the hold queue.
    Reject,
}

/// Decides the fate of one new request given fresh counts.
///
/// Confirmation consumes a slot while approved-or-held requests are below
/// allowed absences, so held requests keep their first-come priority over
/// later submitters. Past that, the request waits ON_HOLD until the live
/// total reaches `allowed + hold_queue_depth`, after which further requests
/// are rejected rather than queued without bound.
pub fn decide(counts: &SlotCounts, policy: &SlotPolicy) -> SlotDecision {
    let allowed = counts.allowed_absences();

    if counts.approved_or_held() < allowed {
        return SlotDecision::Confirm;
    }

    if counts.live() >= allowed.saturating_add(policy.hold_queue_depth) {
        return SlotDecision::Reject;
    }

    SlotDecision::Hold
}
