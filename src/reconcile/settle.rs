use crate::models::{ExpenseRecord, Partner, PartnerBalance, Settlement};

/// Transfers below this are noise, not debts
pub const SETTLEMENT_EPSILON: f64 = 0.01;

/// Aggregate expense records into per-partner balance snapshots.
///
/// Equal share is the grand total divided by the partner count; a
/// partner's balance is their contribution minus that share.
pub fn compute_balances(expenses: &[ExpenseRecord], partners: &[Partner]) -> Vec<PartnerBalance> {
    if partners.is_empty() {
        return Vec::new();
    }

    let grand_total: f64 = expenses.iter().map(|e| e.amount).sum();
    let equal_share = grand_total / partners.len() as f64;

    partners
        .iter()
        .map(|partner| {
            let contribution: f64 = expenses
                .iter()
                .filter(|e| e.partner_id == partner.id)
                .map(|e| e.amount)
                .sum();
            PartnerBalance {
                name: partner.name.clone(),
                balance: contribution - equal_share,
                total_contribution: contribution,
                equal_share,
            }
        })
        .collect()
}

/// Compute peer transfers that equalize partner balances.
///
/// Greedy two-pointer netting: debtors and creditors sorted descending by
/// magnitude, largest against largest until one side runs dry. Optimal for
/// two-party netting; for more partners it is a standard heuristic that
/// yields few transfers, not a proven minimum. Already-balanced input
/// returns an empty plan.
pub fn settle(balances: &[PartnerBalance]) -> Vec<Settlement> {
    let mut debtors: Vec<(String, f64)> = balances
        .iter()
        .filter(|b| b.balance < -SETTLEMENT_EPSILON)
        .map(|b| (b.name.clone(), -b.balance))
        .collect();
    let mut creditors: Vec<(String, f64)> = balances
        .iter()
        .filter(|b| b.balance > SETTLEMENT_EPSILON)
        .map(|b| (b.name.clone(), b.balance))
        .collect();

    // Stable sort keeps input order for equal magnitudes
    debtors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    creditors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut settlements = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < debtors.len() && j < creditors.len() {
        let transfer = debtors[i].1.min(creditors[j].1);
        if transfer > SETTLEMENT_EPSILON {
            settlements.push(Settlement {
                from: debtors[i].0.clone(),
                to: creditors[j].0.clone(),
                amount: transfer,
            });
        }
        debtors[i].1 -= transfer;
        creditors[j].1 -= transfer;
        if debtors[i].1 < SETTLEMENT_EPSILON {
            i += 1;
        }
        if creditors[j].1 < SETTLEMENT_EPSILON {
            j += 1;
        }
    }

    settlements
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn balance(name: &str, amount: f64) -> PartnerBalance {
        PartnerBalance {
            name: name.to_string(),
            balance: amount,
            total_contribution: 0.0,
            equal_share: 0.0,
        }
    }

    fn expense(partner_id: &str, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            id: format!("e-{partner_id}-{amount}"),
            date: NaiveDate::from_ymd_opt(2025, 10, 8).unwrap(),
            amount,
            partner_id: partner_id.to_string(),
            category: None,
            notes: String::new(),
            receipt_urls: vec![],
            missing_receipt: false,
            needs_review: false,
        }
    }

    fn partner(id: &str, name: &str) -> Partner {
        Partner {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_three_party_netting() {
        let balances = vec![balance("A", -300.0), balance("B", 200.0), balance("C", 100.0)];
        let plan = settle(&balances);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].from, "A");
        assert_eq!(plan[0].to, "B");
        assert_eq!(plan[0].amount, 200.0);
        assert_eq!(plan[1].from, "A");
        assert_eq!(plan[1].to, "C");
        assert_eq!(plan[1].amount, 100.0);

        let transferred: f64 = plan.iter().map(|s| s.amount).sum();
        assert_eq!(transferred, 300.0);
        assert!(plan.iter().all(|s| s.from != s.to));
        assert!(plan.iter().all(|s| s.amount >= SETTLEMENT_EPSILON));
    }

    #[test]
    fn test_balanced_partners_need_no_transfers() {
        assert!(settle(&[balance("A", 0.0), balance("B", 0.0)]).is_empty());
        assert!(settle(&[]).is_empty());
    }

    #[test]
    fn test_negligible_imbalance_ignored() {
        // Sub-epsilon rounding residue yields no transfers
        let plan = settle(&[balance("A", -0.004), balance("B", 0.004)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_two_party_netting_is_single_transfer() {
        let plan = settle(&[balance("A", 750.5), balance("B", -750.5)]);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].from, "B");
        assert_eq!(plan[0].to, "A");
        assert_eq!(plan[0].amount, 750.5);
    }

    #[test]
    fn test_debtor_totals_match_balances() {
        let balances = vec![
            balance("A", -500.0),
            balance("B", -250.0),
            balance("C", 600.0),
            balance("D", 150.0),
        ];
        let plan = settle(&balances);

        for b in balances.iter().filter(|b| b.balance < 0.0) {
            let paid: f64 = plan
                .iter()
                .filter(|s| s.from == b.name)
                .map(|s| s.amount)
                .sum();
            assert!((paid - b.balance.abs()).abs() < SETTLEMENT_EPSILON);
        }
        for b in balances.iter().filter(|b| b.balance > 0.0) {
            let received: f64 = plan
                .iter()
                .filter(|s| s.to == b.name)
                .map(|s| s.amount)
                .sum();
            assert!((received - b.balance).abs() < SETTLEMENT_EPSILON);
        }
    }

    #[test]
    fn test_compute_balances() {
        let partners = vec![partner("p1", "Ahmed"), partner("p2", "Omar"), partner("p3", "Sara")];
        let expenses = vec![
            expense("p1", 900.0),
            expense("p1", 300.0),
            expense("p2", 600.0),
        ];

        let balances = compute_balances(&expenses, &partners);

        assert_eq!(balances.len(), 3);
        // Grand total 1800, equal share 600
        assert_eq!(balances[0].total_contribution, 1200.0);
        assert_eq!(balances[0].balance, 600.0);
        assert_eq!(balances[1].balance, 0.0);
        assert_eq!(balances[2].balance, -600.0);
        assert!(balances.iter().all(|b| b.equal_share == 600.0));

        let plan = settle(&balances);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].from, "Sara");
        assert_eq!(plan[0].to, "Ahmed");
        assert_eq!(plan[0].amount, 600.0);
    }

    #[test]
    fn test_compute_balances_without_partners() {
        assert!(compute_balances(&[expense("p1", 100.0)], &[]).is_empty());
    }
}
