// 🏷️ Category and Class lists, plus the category reference grammar used
// in a transaction's `L` and split `S` fields.
//
//   Food:Groceries          hierarchical category
//   Food:Groceries/Business category with a class
//   [Savings]               transfer to the account "Savings"
//   [Savings]/Business      transfer with a class

use serde::{Deserialize, Serialize};

// ============================================================================
// CATEGORY LIST ITEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryItem {
    /// May contain a `Parent:Child` hierarchy
    pub name: String,
    pub description: Option<String>,
    pub tax_related: bool,
    pub income: bool,
    pub expense: bool,
    pub budget_amount: Option<f64>,
    pub tax_schedule: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl CategoryItem {
    pub fn new(name: impl Into<String>) -> Self {
        CategoryItem {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn income(mut self) -> Self {
        self.income = true;
        self
    }

    pub fn expense(mut self) -> Self {
        self.expense = true;
        self
    }

    /// Path segments of the hierarchical name.
    pub fn path(&self) -> Vec<&str> {
        self.name.split(':').collect()
    }

    pub fn parent(&self) -> Option<&str> {
        self.name.rsplit_once(':').map(|(parent, _)| parent)
    }
}

// ============================================================================
// CLASS LIST ITEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassItem {
    pub name: String,
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl ClassItem {
    pub fn new(name: impl Into<String>) -> Self {
        ClassItem {
            name: name.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// CATEGORY REFERENCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryRef {
    /// `[Account]` - money moves to or from another account
    Transfer {
        account: String,
        class: Option<String>,
    },

    /// `Parent:Child` - ordinary income/expense category
    Category {
        path: Vec<String>,
        class: Option<String>,
    },
}

impl CategoryRef {
    pub fn transfer_account(&self) -> Option<&str> {
        match self {
            CategoryRef::Transfer { account, .. } => Some(account),
            CategoryRef::Category { .. } => None,
        }
    }

    pub fn class(&self) -> Option<&str> {
        match self {
            CategoryRef::Transfer { class, .. } | CategoryRef::Category { class, .. } => {
                class.as_deref()
            }
        }
    }
}

/// Why a category string is neither a clean transfer nor a clean hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryProblem {
    Empty,
    MixedTransferAndHierarchy,
    EmptySegment,
}

/// Classify a raw category value. Transfer and hierarchical forms are
/// mutually exclusive: brackets anywhere but around the whole account part,
/// or a `:` next to a bracketed name, is rejected.
pub fn parse_category(raw: &str) -> Result<CategoryRef, CategoryProblem> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CategoryProblem::Empty);
    }

    let (main, class) = match raw.split_once('/') {
        Some((main, class)) => (main, Some(class.to_string()).filter(|c| !c.is_empty())),
        None => (raw, None),
    };

    if main.starts_with('[') || main.ends_with(']') {
        let account = main
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or(CategoryProblem::MixedTransferAndHierarchy)?;
        if account.is_empty() || account.contains(['[', ']']) {
            return Err(CategoryProblem::MixedTransferAndHierarchy);
        }
        return Ok(CategoryRef::Transfer {
            account: account.to_string(),
            class,
        });
    }

    if main.contains(['[', ']']) {
        return Err(CategoryProblem::MixedTransferAndHierarchy);
    }
    if main.is_empty() {
        // Class-only assignment such as "/Business"
        return Ok(CategoryRef::Category {
            path: Vec::new(),
            class,
        });
    }

    let path: Vec<String> = main.split(':').map(str::to_string).collect();
    if path.iter().any(|segment| segment.trim().is_empty()) {
        return Err(CategoryProblem::EmptySegment);
    }
    Ok(CategoryRef::Category { path, class })
}

/// Account name of a `[Account]` category, if the value is a transfer.
pub fn transfer_target(raw: &str) -> Option<String> {
    match parse_category(raw) {
        Ok(CategoryRef::Transfer { account, .. }) => Some(account),
        _ => None,
    }
}
