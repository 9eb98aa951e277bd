use std::collections::VecDeque;
use std::time::SystemTime;

/// Entrada escalar no store: valor + expiração opcional.
///
/// A expiração é fixada na criação; um novo SET cria outra `Entry`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub value: String,
    pub expires_at: Option<SystemTime>,
}

impl Entry {
    pub fn new(value: String, expires_at: Option<SystemTime>) -> Self {
        Self { value, expires_at }
    }

    /// Expirada somente depois do instante: `now > expires_at`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|t| now > t)
    }
}

/// Lista: push no fim, pop do início. Uma lista esvaziada continua existindo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListValue {
    items: VecDeque<String>,
}

impl ListValue {
    pub fn push(&mut self, value: String) {
        self.items.push_back(value);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.items.pop_front()
    }

}
