use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named participant sharing project expenses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub name: String,
}

/// How one chat display name maps onto the partner directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderAssignment {
    /// None while the sender is still unassigned
    pub partner_id: Option<String>,
    /// Ignored senders never produce expense candidates
    #[serde(default)]
    pub ignored: bool,
}

/// Explicit sender-to-partner mapping threaded into the detector and
/// matcher. Two display names mapping to one partner are the same party
/// for matching purposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderMap {
    entries: HashMap<String, SenderAssignment>,
}

impl SenderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sender: impl Into<String>, assignment: SenderAssignment) {
        self.entries.insert(sender.into(), assignment);
    }

    pub fn get(&self, sender: &str) -> Option<&SenderAssignment> {
        self.entries.get(sender)
    }

    /// Partner id for a sender, None when unmapped or ignored
    pub fn partner_id_of(&self, sender: &str) -> Option<&str> {
        self.entries
            .get(sender)
            .filter(|a| !a.ignored)
            .and_then(|a| a.partner_id.as_deref())
    }

    pub fn is_ignored(&self, sender: &str) -> bool {
        self.entries.get(sender).is_some_and(|a| a.ignored)
    }

    /// Overlay other on top of self, other wins on conflicts
    pub fn merge(&mut self, other: &SenderMap) {
        for (sender, assignment) in &other.entries {
            self.entries.insert(sender.clone(), assignment.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SenderAssignment)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
