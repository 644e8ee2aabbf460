use serde::{Deserialize, Serialize};

/// Per-partner balance snapshot fed to the settlement solver.
///
/// Positive balance means the partner overpaid and is owed money back,
/// negative means they underpaid and owe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerBalance {
    pub name: String,
    pub balance: f64,
    pub total_contribution: f64,
    pub equal_share: f64,
}

/// A directed transfer that helps equalize partner balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Debtor
    pub from: String,
    /// Creditor
    pub to: String,
    pub amount: f64,
}
