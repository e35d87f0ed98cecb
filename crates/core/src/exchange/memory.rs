//! In-process exchange for single-server deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{ExchangeError, StatusExchange};
use crate::callback::CallbackMessage;
use crate::correlation::CorrelationId;

#[derive(Default)]
pub struct MemoryStatusExchange {
    slots: Mutex<HashMap<CorrelationId, CallbackMessage>>,
}

impl MemoryStatusExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unread records.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatusExchange for MemoryStatusExchange {
    fn put(&self, id: &CorrelationId, message: &CallbackMessage) -> Result<(), ExchangeError> {
        self.slots
            .lock()
            .unwrap()
            .insert(id.clone(), message.clone());
        Ok(())
    }

    fn get_and_delete(
        &self,
        id: &CorrelationId,
    ) -> Result<Option<CallbackMessage>, ExchangeError> {
        Ok(self.slots.lock().unwrap().remove(id))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::contract;
    use std::sync::Arc;

    #[test]
    fn test_memory_contract() {
        let exchange = MemoryStatusExchange::new();
        contract::run_all(&exchange);
        assert!(exchange.is_empty());
    }

    #[test]
    fn test_concurrent_readers_get_one_copy() {
        let exchange = Arc::new(MemoryStatusExchange::new());
        let id = CorrelationId::parse("race").unwrap();
        exchange
            .put(&id, &CallbackMessage::management_ok(id.clone(), None, "ok"))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let exchange = Arc::clone(&exchange);
                let id = id.clone();
                std::thread::spawn(move || exchange.get_and_delete(&id).unwrap())
            })
            .collect();

        let hits = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(hits, 1);
    }
}
