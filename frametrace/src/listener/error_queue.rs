//! Order-preserving queue of listener errors, drained by the consumer.

use std::sync::Mutex;

use super::lock_or_recover;
use crate::domain::ListenerError;

#[derive(Debug, Default)]
pub struct ErrorQueue {
    errors: Mutex<Vec<ListenerError>>,
}

impl ErrorQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: ListenerError) {
        lock_or_recover(&self.errors).push(error);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !lock_or_recover(&self.errors).is_empty()
    }

    /// Take every queued error, leaving the queue empty.
    #[must_use]
    pub fn take_all(&self) -> Vec<ListenerError> {
        std::mem::take(&mut *lock_or_recover(&self.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_all_twice_returns_everything_then_nothing() {
        let queue = ErrorQueue::new();
        queue.push(ListenerError::Runtime("a".into()));
        queue.push(ListenerError::LostEvents(3));
        assert!(queue.has_errors());

        let first = queue.take_all();
        assert_eq!(
            first,
            vec![ListenerError::Runtime("a".into()), ListenerError::LostEvents(3)]
        );
        assert!(queue.take_all().is_empty());
        assert!(!queue.has_errors());
    }
}
