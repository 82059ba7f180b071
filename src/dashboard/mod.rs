// dashboard module: one assembler per audience. Each resolves its scope,
// fans out the reads it needs concurrently, and shapes one payload; a failed
// read fails the whole assembly.

pub mod activity;
pub mod admin;
pub mod dealer;
pub mod dealer_manager;
pub mod inventory;
pub mod partner;

pub use dealer_manager::MANAGER_ROLES;

use serde::Serialize;

/// A labelled count, the common shape for status and category breakdowns.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NamedCount {
    pub label: String,
    pub count: i64,
}

impl NamedCount {
    pub fn new(label: impl Into<String>, count: i64) -> Self {
        NamedCount {
            label: label.into(),
            count,
        }
    }
}
