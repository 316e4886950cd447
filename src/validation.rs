// ✅ Document Validation - quality checks over an assembled Document
//
// Parsing already rejects records it cannot decode; these checks look at
// what a document built in memory (or parsed leniently) still gets wrong:
// missing names, unbalanced splits, malformed categories, trades without a
// security.

use crate::document::Document;
use crate::entities::{
    parse_category, AccountType, BankingTransaction, CategoryProblem, CategoryRef,
    InvestmentTransaction, Transaction, SPLIT_EPSILON,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Record cannot be generated faithfully
    Warning,  // Record is questionable
    Info,     // Worth knowing
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    /// Record identity, e.g. `Bank:Checking#3` or `Category#0`
    pub location: String,
    pub field: String,
    pub issue: String,
}

impl QualityIssue {
    fn new(severity: Severity, location: &str, field: &str, issue: impl Into<String>) -> Self {
        QualityIssue {
            severity,
            location: location.to_string(),
            field: field.to_string(),
            issue: issue.into(),
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub records_checked: usize,
    pub issues: Vec<QualityIssue>,
}

impl ValidationReport {
    /// No Critical issues.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records checked: {} issues ({} critical, {} warnings, {} info)",
            self.records_checked,
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Warning),
            self.count(Severity::Info)
        )
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct DocumentValidator {
    /// Split-sum tolerance (default: 0.005)
    pub split_epsilon: f64,
}

impl DocumentValidator {
    pub fn new() -> Self {
        DocumentValidator {
            split_epsilon: SPLIT_EPSILON,
        }
    }

    pub fn with_split_epsilon(mut self, epsilon: f64) -> Self {
        self.split_epsilon = epsilon.abs();
        self
    }

    pub fn validate(&self, doc: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.check_accounts(doc, &mut report);

        for register in &doc.registers {
            let own_account = register.key.name.as_deref();
            for (index, tx) in register.transactions.iter().enumerate() {
                report.records_checked += 1;
                let location = format!("{}#{}", register.key, index);
                match tx {
                    Transaction::Banking(t) => {
                        if t.date.is_none() {
                            report.issues.push(QualityIssue::new(
                                Severity::Critical,
                                &location,
                                "date",
                                "register transaction has no date",
                            ));
                        }
                        self.check_banking(t, own_account, &location, &mut report);
                    }
                    Transaction::Investment(t) => self.check_investment(t, &location, &mut report),
                    _ => report.issues.push(QualityIssue::new(
                        Severity::Critical,
                        &location,
                        "record",
                        "memorized transaction stored in a register",
                    )),
                }
            }
        }

        for (index, tx) in doc.memorized.iter().enumerate() {
            report.records_checked += 1;
            let location = format!("Memorized#{}", index);
            match tx {
                Transaction::MemorizedBanking(m) => {
                    self.check_banking(&m.transaction, None, &location, &mut report)
                }
                Transaction::MemorizedInvestment(m) => {
                    self.check_investment(&m.transaction, &location, &mut report)
                }
                _ => report.issues.push(QualityIssue::new(
                    Severity::Critical,
                    &location,
                    "record",
                    "register transaction stored in the memorized list",
                )),
            }
        }

        for (index, item) in doc.categories.iter().enumerate() {
            report.records_checked += 1;
            if item.name.trim().is_empty() {
                report.issues.push(QualityIssue::new(
                    Severity::Critical,
                    &format!("Category#{}", index),
                    "name",
                    "category has no name",
                ));
            }
        }

        for (index, item) in doc.classes.iter().enumerate() {
            report.records_checked += 1;
            if item.name.trim().is_empty() {
                report.issues.push(QualityIssue::new(
                    Severity::Critical,
                    &format!("Class#{}", index),
                    "name",
                    "class has no name",
                ));
            }
        }

        log::info!("{}", report.summary());
        report
    }

    // ========================================================================
    // VALIDATION RULES
    // ========================================================================

    fn check_accounts(&self, doc: &Document, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        for (index, account) in doc.accounts.iter().enumerate() {
            report.records_checked += 1;
            let location = format!("Account#{}", index);

            if account.name.trim().is_empty() {
                report.issues.push(QualityIssue::new(
                    Severity::Critical,
                    &location,
                    "name",
                    "account definition has no name",
                ));
                continue;
            }
            if account.credit_limit.is_some() && account.account_type != AccountType::CreditCard {
                report.issues.push(QualityIssue::new(
                    Severity::Warning,
                    &location,
                    "credit_limit",
                    format!(
                        "credit limit on a '{}' account",
                        account.account_type.as_str()
                    ),
                ));
            }
            if !seen.insert(account.name.as_str()) {
                report.issues.push(QualityIssue::new(
                    Severity::Info,
                    &location,
                    "name",
                    format!("account name '{}' is defined more than once", account.name),
                ));
            }
        }
    }

    fn check_category(
        &self,
        raw: &str,
        own_account: Option<&str>,
        location: &str,
        field: &str,
        report: &mut ValidationReport,
    ) {
        match parse_category(raw) {
            Ok(CategoryRef::Transfer { account, .. }) if Some(account.as_str()) == own_account => {
                report.issues.push(QualityIssue::new(
                    Severity::Warning,
                    location,
                    field,
                    format!("transfer to its own account '{}'", account),
                ));
            }
            Ok(_) => {}
            Err(CategoryProblem::Empty) => {}
            Err(CategoryProblem::MixedTransferAndHierarchy) => {
                report.issues.push(QualityIssue::new(
                    Severity::Warning,
                    location,
                    field,
                    format!("'{}' mixes transfer and category forms", raw),
                ));
            }
            Err(CategoryProblem::EmptySegment) => {
                report.issues.push(QualityIssue::new(
                    Severity::Warning,
                    location,
                    field,
                    format!("'{}' has an empty hierarchy segment", raw),
                ));
            }
        }
    }

    fn check_banking(
        &self,
        tx: &BankingTransaction,
        own_account: Option<&str>,
        location: &str,
        report: &mut ValidationReport,
    ) {
        if let Some(category) = &tx.category {
            self.check_category(category, own_account, location, "category", report);
        }

        for (i, split) in tx.splits.iter().enumerate() {
            if split.category.trim().is_empty() {
                report.issues.push(QualityIssue::new(
                    Severity::Critical,
                    location,
                    &format!("splits[{}].category", i),
                    "split has no category",
                ));
            } else {
                self.check_category(&split.category, own_account, location, &format!("splits[{}].category", i), report);
            }
        }

        if !tx.splits.is_empty() {
            let diff = tx.split_total() - tx.amount;
            if diff.abs() > self.split_epsilon + 1e-9 {
                report.issues.push(QualityIssue::new(
                    Severity::Warning,
                    location,
                    "splits",
                    format!(
                        "splits sum to {:.2} but the total is {:.2}",
                        tx.split_total(),
                        tx.amount
                    ),
                ));
            }
        }
    }

    fn check_investment(&self, tx: &InvestmentTransaction, location: &str, report: &mut ValidationReport) {
        for (field, value) in [("quantity", tx.quantity), ("amount", tx.amount)] {
            if value.is_some_and(|v| v < 0.0) {
                report.issues.push(QualityIssue::new(
                    Severity::Critical,
                    location,
                    field,
                    format!("{} must be stored as a magnitude", field),
                ));
            }
        }

        let has_security = tx.security.as_deref().is_some_and(|s| !s.trim().is_empty());
        if tx.action.needs_security() && !has_security {
            report.issues.push(QualityIssue::new(
                Severity::Warning,
                location,
                "security",
                format!("{} without a security", tx.action.code()),
            ));
        }
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        AccountDefinition, AccountKey, CategoryItem, InvestmentAction, SplitTransaction,
    };
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()
    }

    fn create_valid_document() -> Document {
        let mut doc = Document::new();
        doc.push_transaction(
            AccountKey::named(AccountType::Bank, "Checking"),
            Transaction::Banking(
                BankingTransaction::new(date(), -100.0)
                    .with_split(SplitTransaction::new("Food:Groceries", -60.0))
                    .with_split(SplitTransaction::new("Household", -40.0)),
            ),
        );
        doc.categories.push(CategoryItem::new("Food:Groceries").expense());
        doc
    }

    #[test]
    fn test_validate_clean_document() {
        let report = DocumentValidator::new().validate(&create_valid_document());
        assert!(report.is_valid());
        assert!(report.issues.is_empty());
        assert_eq!(report.records_checked, 3);
    }

    #[test]
    fn test_split_mismatch_is_warning() {
        let mut doc = create_valid_document();
        if let Some(Transaction::Banking(tx)) = doc.registers[0].transactions.get_mut(0) {
            tx.splits[1].amount = -40.01;
        }
        let report = DocumentValidator::new().validate(&doc);
        assert!(report.is_valid());
        assert_eq!(report.count(Severity::Warning), 1);
    }

    #[test]
    fn test_missing_names_are_critical() {
        let mut doc = create_valid_document();
        doc.categories.push(CategoryItem::new(""));
        doc.accounts.push(AccountDefinition::new("", AccountType::Bank));
        let report = DocumentValidator::new().validate(&doc);
        assert!(!report.is_valid());
        assert_eq!(report.count(Severity::Critical), 2);
    }

    #[test]
    fn test_category_forms() {
        let mut doc = Document::new();
        let key = AccountKey::named(AccountType::Bank, "Checking");
        doc.push_transaction(
            key.clone(),
            Transaction::Banking(BankingTransaction::new(date(), -5.0).with_category("[Savings]:Interest")),
        );
        doc.push_transaction(
            key,
            Transaction::Banking(BankingTransaction::new(date(), -5.0).with_category("[Checking]")),
        );
        let report = DocumentValidator::new().validate(&doc);
        assert_eq!(report.count(Severity::Warning), 2);
        assert!(report.issues.iter().any(|i| i.issue.contains("own account")));
    }

    #[test]
    fn test_investment_checks() {
        let mut doc = Document::new();
        let mut sell = InvestmentTransaction::new(date(), InvestmentAction::Sell);
        sell.quantity = Some(-5.0);
        doc.push_transaction(AccountKey::named(AccountType::Investment, "Brokerage"), Transaction::Investment(sell));

        let report = DocumentValidator::new().validate(&doc);
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.count(Severity::Warning), 1);
        println!("✅ {}", report.summary());
    }

    #[test]
    fn test_credit_limit_and_duplicate_names() {
        let mut doc = Document::new();
        doc.accounts.push(AccountDefinition::new("Checking", AccountType::Bank).with_credit_limit(100.0));
        doc.accounts.push(AccountDefinition::new("Checking", AccountType::Bank));
        let report = DocumentValidator::new().validate(&doc);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.count(Severity::Info), 1);
    }
}
