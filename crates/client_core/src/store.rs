//! In-memory record list and its load lifecycle.

use shared::domain::Student;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// Identifies one load; completions for any other load are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Records mirror the backend's last successful listing as-is, duplicates included.
#[derive(Debug, Default)]
pub struct RecordStore {
    status: StoreStatus,
    records: Vec<Student>,
    generation: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    pub fn records(&self) -> &[Student] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.status == StoreStatus::Loading
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            StoreStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Returns `None` without touching state when a load is already running.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.is_loading() {
            return None;
        }
        self.generation += 1;
        self.status = StoreStatus::Loading;
        Some(LoadTicket(self.generation))
    }

    pub fn load_succeeded(&mut self, ticket: LoadTicket, records: Vec<Student>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.records = records;
        self.status = StoreStatus::Loaded;
        true
    }

    pub fn load_failed(&mut self, ticket: LoadTicket, message: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.status = StoreStatus::Error(message.into());
        true
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.is_loading() && ticket.0 == self.generation
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
