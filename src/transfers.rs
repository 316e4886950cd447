// 🔁 Transfer Recognition - pair the two legs of an account-to-account transfer
//
// A banking transaction categorized `[Savings]` is one leg; the other leg is
// an opposite-sign transaction of the same magnitude in a register filed
// under "Savings". Links are weak (account key + index) on both sides.

use crate::config::{TransferOptions, TransferScope};
use crate::document::Document;
use crate::entities::{BankingTransaction, Transaction, TransferState, TxRef};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferMatch {
    /// Leg whose category named the other account
    pub source: TxRef,
    pub counterpart: TxRef,
    pub amount: f64,
    pub date_gap_days: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferReport {
    pub examined: usize,
    pub matches: Vec<TransferMatch>,
    pub unresolved: Vec<TxRef>,
}

impl TransferReport {
    pub fn summary(&self) -> String {
        format!(
            "Transfers: {} examined, {} linked, {} unresolved",
            self.examined,
            self.matches.len(),
            self.unresolved.len()
        )
    }
}

// ============================================================================
// RECOGNIZER
// ============================================================================

pub struct TransferRecognizer {
    pub options: TransferOptions,
}

impl TransferRecognizer {
    pub fn new() -> Self {
        TransferRecognizer {
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(options: TransferOptions) -> Self {
        TransferRecognizer { options }
    }

    /// Link every participating transfer leg it can; mark the rest unresolved.
    pub fn recognize(&self, doc: &mut Document) -> TransferReport {
        let scope = if doc.options.all_transfers {
            TransferScope::All
        } else {
            self.options.scope
        };

        let participants: Vec<TxRef> = doc
            .transactions()
            .filter_map(|(reference, tx)| {
                let banking = tx.as_banking()?;
                participates(banking, scope).then_some(reference)
            })
            .collect();

        let mut report = TransferReport {
            examined: participants.len(),
            ..Default::default()
        };

        for source in participants {
            // May have been claimed as a counterpart earlier in this pass
            let Some(leg) = doc.transaction(&source).and_then(Transaction::as_banking) else {
                continue;
            };
            if matches!(leg.transfer, TransferState::Linked(_)) {
                continue;
            }

            match self.find_counterpart(doc, &source, leg) {
                Some((counterpart, gap)) => {
                    let amount = leg.amount;
                    link(doc, &source, &counterpart);
                    debug!("linked transfer {} <-> {}", source, counterpart);
                    report.matches.push(TransferMatch {
                        source,
                        counterpart,
                        amount,
                        date_gap_days: gap,
                    });
                }
                None => {
                    if let Some(tx) = doc.transaction_mut(&source).and_then(Transaction::as_banking_mut) {
                        tx.transfer = TransferState::Unresolved;
                    }
                    debug!("no counterpart for transfer {}", source);
                    report.unresolved.push(source);
                }
            }
        }

        info!("{}", report.summary());
        report
    }

    /// Earliest-indexed eligible leg in the target account's registers.
    fn find_counterpart(
        &self,
        doc: &Document,
        source: &TxRef,
        leg: &BankingTransaction,
    ) -> Option<(TxRef, i64)> {
        let target = leg.transfer_account()?;
        if source.key.name.as_deref() == Some(target.as_str()) {
            return None;
        }
        let date = leg.date?;

        let found = doc.registers_named(&target).find_map(|register| {
            register.transactions.iter().enumerate().find_map(|(index, tx)| {
                let candidate = tx.as_banking()?;
                let gap = self.eligible(leg.amount, date, candidate)?;
                Some((TxRef::new(register.key.clone(), index), gap))
            })
        });
        found
    }

    /// Date gap in days when `candidate` can be the opposite leg.
    fn eligible(&self, amount: f64, date: NaiveDate, candidate: &BankingTransaction) -> Option<i64> {
        if matches!(candidate.transfer, TransferState::Linked(_)) {
            return None;
        }
        if amount * candidate.amount >= 0.0 {
            return None;
        }
        if (amount.abs() - candidate.amount.abs()).abs() > self.options.amount_epsilon {
            return None;
        }
        let gap = (candidate.date? - date).num_days().abs();
        (gap <= self.options.date_tolerance_days).then_some(gap)
    }
}

impl Default for TransferRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

fn participates(tx: &BankingTransaction, scope: TransferScope) -> bool {
    if !tx.is_transfer() {
        return false;
    }
    match (&tx.transfer, scope) {
        (TransferState::Linked(_), _) => false,
        (_, TransferScope::All) => true,
        (TransferState::Flagged | TransferState::Unresolved, TransferScope::FlaggedOnly) => true,
        (TransferState::NotFlagged, TransferScope::FlaggedOnly) => false,
    }
}

fn link(doc: &mut Document, a: &TxRef, b: &TxRef) {
    if let Some(tx) = doc.transaction_mut(a).and_then(Transaction::as_banking_mut) {
        tx.transfer = TransferState::Linked(b.clone());
    }
    if let Some(tx) = doc.transaction_mut(b).and_then(Transaction::as_banking_mut) {
        tx.transfer = TransferState::Linked(a.clone());
    }
}

/// Flag every `[Account]` transaction for recognition under the
/// flagged-only scope.
pub fn flag_all_transfers(doc: &mut Document) -> usize {
    let mut flagged = 0;
    for register in &mut doc.registers {
        for tx in register.transactions.iter_mut().filter_map(Transaction::as_banking_mut) {
            if tx.is_transfer() && tx.transfer == TransferState::NotFlagged {
                tx.flag_transfer();
                flagged += 1;
            }
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AccountKey, AccountType};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, day).unwrap()
    }

    fn create_test_transfer(day: u32, amount: f64, target: &str) -> Transaction {
        let mut tx = BankingTransaction::new(date(day), amount).with_category(format!("[{}]", target));
        tx.flag_transfer();
        Transaction::Banking(tx)
    }

    fn checking() -> AccountKey {
        AccountKey::named(AccountType::Bank, "Checking")
    }

    fn savings() -> AccountKey {
        AccountKey::named(AccountType::Bank, "Savings")
    }

    fn state(doc: &Document, reference: &TxRef) -> TransferState {
        doc.transaction(reference)
            .and_then(Transaction::as_banking)
            .map(|t| t.transfer.clone())
            .unwrap()
    }

    #[test]
    fn test_links_both_legs() {
        let mut doc = Document::new();
        let a = doc.push_transaction(checking(), create_test_transfer(15, -200.0, "Savings"));
        let b = doc.push_transaction(savings(), create_test_transfer(15, 200.0, "Checking"));

        let report = TransferRecognizer::new().recognize(&mut doc);

        assert_eq!(report.matches.len(), 1);
        assert!(report.unresolved.is_empty());
        assert_eq!(state(&doc, &a), TransferState::Linked(b.clone()));
        assert_eq!(state(&doc, &b), TransferState::Linked(a));
    }

    #[test]
    fn test_date_shift_leaves_both_unresolved() {
        let mut doc = Document::new();
        let a = doc.push_transaction(checking(), create_test_transfer(15, -200.0, "Savings"));
        let b = doc.push_transaction(savings(), create_test_transfer(17, 200.0, "Checking"));

        let report = TransferRecognizer::new().recognize(&mut doc);
        assert_eq!(report.unresolved.len(), 2);
        assert_eq!(state(&doc, &a), TransferState::Unresolved);
        assert_eq!(state(&doc, &b), TransferState::Unresolved);

        // A wider tolerance on a re-run picks them up
        let wider = TransferRecognizer::with_options(TransferOptions::new().with_date_tolerance(2));
        let report = wider.recognize(&mut doc);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].date_gap_days, 2);
    }

    #[test]
    fn test_earliest_candidate_wins() {
        let mut doc = Document::new();
        let a = doc.push_transaction(checking(), create_test_transfer(15, -50.0, "Savings"));
        let first = doc.push_transaction(savings(), Transaction::Banking(BankingTransaction::new(date(15), 50.0)));
        doc.push_transaction(savings(), Transaction::Banking(BankingTransaction::new(date(15), 50.0)));

        TransferRecognizer::new().recognize(&mut doc);
        assert_eq!(state(&doc, &a), TransferState::Linked(first));
    }

    #[test]
    fn test_same_sign_not_linked() {
        let mut doc = Document::new();
        let a = doc.push_transaction(checking(), create_test_transfer(15, -50.0, "Savings"));
        doc.push_transaction(savings(), Transaction::Banking(BankingTransaction::new(date(15), -50.0)));

        TransferRecognizer::new().recognize(&mut doc);
        assert_eq!(state(&doc, &a), TransferState::Unresolved);
    }

    #[test]
    fn test_flagged_only_scope_skips_unflagged() {
        let mut doc = Document::new();
        let tx = BankingTransaction::new(date(15), -50.0).with_category("[Savings]");
        let a = doc.push_transaction(checking(), Transaction::Banking(tx));
        doc.push_transaction(savings(), Transaction::Banking(BankingTransaction::new(date(15), 50.0)));

        let report = TransferRecognizer::new().recognize(&mut doc);
        assert_eq!(report.examined, 0);
        assert_eq!(state(&doc, &a), TransferState::NotFlagged);

        // !Option:AllXfr widens the scope
        doc.options.all_transfers = true;
        let report = TransferRecognizer::new().recognize(&mut doc);
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn test_self_transfer_unresolved() {
        let mut doc = Document::new();
        let a = doc.push_transaction(checking(), create_test_transfer(15, -50.0, "Checking"));
        doc.push_transaction(checking(), Transaction::Banking(BankingTransaction::new(date(15), 50.0)));

        TransferRecognizer::new().recognize(&mut doc);
        assert_eq!(state(&doc, &a), TransferState::Unresolved);
    }

    #[test]
    fn test_flag_all_transfers() {
        let mut doc = Document::new();
        let tx = BankingTransaction::new(date(15), -50.0).with_category("[Savings]");
        doc.push_transaction(checking(), Transaction::Banking(tx));
        doc.push_transaction(checking(), Transaction::Banking(BankingTransaction::new(date(15), 5.0)));
        assert_eq!(flag_all_transfers(&mut doc), 1);
    }
}
