// 💳 Account Entity - account definitions and register types
//
// An account definition (`!Account` block) names an account and, when it is
// followed by a `!Type:` header, sets the context that register blocks are
// filed under.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Checking / savings register (`Bank`)
    Bank,

    /// Cash register (`Cash`)
    Cash,

    /// Credit card register (`CCard`)
    CreditCard,

    /// Brokerage register (`Invst`)
    Investment,

    /// Other asset (`Oth A`)
    OtherAsset,

    /// Other liability (`Oth L`)
    OtherLiability,

    /// Any other type string a producer wrote in an account's `T` field
    Other(String),
}

impl AccountType {
    /// The token used in account definitions and after `!Type:`.
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Bank => "Bank",
            AccountType::Cash => "Cash",
            AccountType::CreditCard => "CCard",
            AccountType::Investment => "Invst",
            AccountType::OtherAsset => "Oth A",
            AccountType::OtherLiability => "Oth L",
            AccountType::Other(name) => name,
        }
    }

    pub fn from_qif(token: &str) -> Self {
        let token = token.trim();
        AccountType::REGISTER_TYPES
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
            .cloned()
            .unwrap_or_else(|| AccountType::Other(token.to_string()))
    }

    /// Register types that own a `!Type:` header.
    pub const REGISTER_TYPES: [AccountType; 6] = [
        AccountType::Bank,
        AccountType::Cash,
        AccountType::CreditCard,
        AccountType::Investment,
        AccountType::OtherAsset,
        AccountType::OtherLiability,
    ];

    /// `!Type:...` header line for this register, if it has one.
    pub fn header(&self) -> Option<String> {
        match self {
            AccountType::Other(_) => None,
            known => Some(format!("!Type:{}", known.as_str())),
        }
    }

    pub fn is_investment(&self) -> bool {
        matches!(self, AccountType::Investment)
    }
}

// ============================================================================
// ACCOUNT DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDefinition {
    pub name: String,
    pub account_type: AccountType,
    pub description: Option<String>,

    /// Credit cards only
    pub credit_limit: Option<f64>,

    pub statement_date: Option<NaiveDate>,
    pub statement_balance: Option<f64>,

    /// Unrecognized field lines, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl AccountDefinition {
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        AccountDefinition {
            name: name.into(),
            account_type,
            description: None,
            credit_limit: None,
            statement_date: None,
            statement_balance: None,
            extra: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_credit_limit(mut self, limit: f64) -> Self {
        self.credit_limit = Some(limit);
        self
    }

    pub fn with_statement(mut self, date: NaiveDate, balance: f64) -> Self {
        self.statement_date = Some(date);
        self.statement_balance = Some(balance);
        self
    }
}

// ============================================================================
// REGISTER KEY
// ============================================================================

/// Identifies a register: its type plus the account name from the most
/// recent `!Account` context, if there was one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub account_type: AccountType,
    pub name: Option<String>,
}

impl AccountKey {
    pub fn named(account_type: AccountType, name: impl Into<String>) -> Self {
        AccountKey {
            account_type,
            name: Some(name.into()),
        }
    }

    pub fn unnamed(account_type: AccountType) -> Self {
        AccountKey {
            account_type,
            name: None,
        }
    }
}

impl std::fmt::Display for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", self.account_type.as_str(), name),
            None => write!(f, "{}", self.account_type.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_key_display() {
        assert_eq!(AccountKey::named(AccountType::Bank, "Checking").to_string(), "Bank:Checking");
        assert_eq!(AccountKey::unnamed(AccountType::CreditCard).to_string(), "CCard");
    }

    #[test]
    fn test_account_type_tokens() {
        assert_eq!(AccountType::from_qif("CCard"), AccountType::CreditCard);
        assert_eq!(AccountType::from_qif("oth a"), AccountType::OtherAsset);
        assert_eq!(AccountType::from_qif("Port"), AccountType::Other("Port".to_string()));
        assert_eq!(AccountType::Investment.header().as_deref(), Some("!Type:Invst"));
        assert_eq!(AccountType::Other("401(k)".to_string()).header(), None);
    }

    #[test]
    fn test_account_builder() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        let account = AccountDefinition::new("Visa", AccountType::CreditCard)
            .with_description("Rewards card")
            .with_credit_limit(5000.0)
            .with_statement(date, -1250.75);

        assert_eq!(account.name, "Visa");
        assert_eq!(account.credit_limit, Some(5000.0));
        assert_eq!(account.statement_date, Some(date));
        assert_eq!(account.statement_balance, Some(-1250.75));
    }
}
