use dashmap::DashMap;
use fleet_model::ids::ServerId;
use tokio_util::sync::CancellationToken;

/// Process-wide `server_id -> running-task handle` map, §4.5 and §9's
/// "periodic cancelable tasks" design note. A server is "in-process" iff an
/// entry is present; `stop_server` cancels the token rather than aborting
/// the task directly, so the task can unwind through `fleet_statemachine::error`
/// at its own next suspension point.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<ServerId, CancellationToken>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` for a new task, failing fast if one is already running.
    /// Returns the token the caller should poll for cancellation.
    pub fn try_claim(&self, id: ServerId) -> Option<CancellationToken> {
        let token = CancellationToken::new();
        let mut claimed = None;
        self.tasks.entry(id).or_insert_with(|| {
            claimed = Some(token.clone());
            token
        });
        claimed
    }

    pub fn is_running(&self, id: ServerId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Signals cooperative cancellation without removing the entry; the
    /// task itself calls [`TaskRegistry::release`] when it unwinds.
    pub fn cancel(&self, id: ServerId) -> bool {
        match self.tasks.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn release(&self, id: ServerId) {
        self.tasks.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_fails_while_first_holds_the_slot() {
        let registry = TaskRegistry::new();
        let id = ServerId::new();
        assert!(registry.try_claim(id).is_some());
        assert!(registry.try_claim(id).is_none());
        registry.release(id);
        assert!(registry.try_claim(id).is_some());
    }

    #[test]
    fn cancel_is_a_noop_for_an_unclaimed_id() {
        let registry = TaskRegistry::new();
        assert!(!registry.cancel(ServerId::new()));
    }

    #[test]
    fn cancel_trips_the_token_the_claimant_observes() {
        let registry = TaskRegistry::new();
        let id = ServerId::new();
        let token = registry.try_claim(id).unwrap();
        assert!(!token.is_cancelled());
        registry.cancel(id);
        assert!(token.is_cancelled());
    }
}
