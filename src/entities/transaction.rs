// 🧾 Transaction Entities - banking, investment and memorized records
//
// One tagged union over the shared capability set (date, amount, memo,
// cleared status) instead of a class hierarchy.

use super::account::AccountKey;
use crate::codecs::ClearedStatus;
use crate::error::{CodecError, QifError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Splits must sum to the transaction total within this tolerance.
pub const SPLIT_EPSILON: f64 = 0.005;

// ============================================================================
// TRANSFER ANNOTATIONS
// ============================================================================

/// Weak reference to a register transaction: account key + index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef {
    pub key: AccountKey,
    pub index: usize,
}

impl TxRef {
    pub fn new(key: AccountKey, index: usize) -> Self {
        TxRef { key, index }
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.key, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferState {
    /// Not selected for transfer recognition
    #[default]
    NotFlagged,

    /// Selected by the calling layer, not yet examined
    Flagged,

    /// Paired with the opposite leg in another account
    Linked(TxRef),

    /// Examined, no counterpart found
    Unresolved,
}

// ============================================================================
// SPLITS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTransaction {
    pub category: String,
    pub memo: Option<String>,
    pub amount: f64,
    pub percent: Option<f64>,
}

impl SplitTransaction {
    pub fn new(category: impl Into<String>, amount: f64) -> Self {
        SplitTransaction {
            category: category.into(),
            memo: None,
            amount,
            percent: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_percent(mut self, percent: f64) -> Self {
        self.percent = Some(percent);
        self
    }
}

// ============================================================================
// BANKING TRANSACTION
// ============================================================================

/// Bank, cash, credit card and other asset/liability register entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BankingTransaction {
    /// Always present in registers; memorized templates may omit it
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub cleared: ClearedStatus,
    pub number: Option<String>,
    pub payee: Option<String>,
    pub memo: Option<String>,
    pub address: Vec<String>,
    pub category: Option<String>,
    pub reimbursable: bool,
    pub splits: Vec<SplitTransaction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<QifError>,

    #[serde(default)]
    pub transfer: TransferState,
}

impl BankingTransaction {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        BankingTransaction {
            date: Some(date),
            amount,
            ..Default::default()
        }
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_cleared(mut self, cleared: ClearedStatus) -> Self {
        self.cleared = cleared;
        self
    }

    pub fn with_split(mut self, split: SplitTransaction) -> Self {
        self.splits.push(split);
        self
    }

    /// Mark for transfer recognition under the flagged-only scope.
    pub fn flag_transfer(&mut self) {
        if !matches!(self.transfer, TransferState::Linked(_)) {
            self.transfer = TransferState::Flagged;
        }
    }

    pub fn transfer_account(&self) -> Option<String> {
        self.category.as_deref().and_then(super::category::transfer_target)
    }

    pub fn is_transfer(&self) -> bool {
        self.transfer_account().is_some()
    }

    pub fn split_total(&self) -> f64 {
        self.splits.iter().map(|s| s.amount).sum()
    }

    /// Difference between the split sum and the total when it exceeds
    /// [`SPLIT_EPSILON`]; `None` when balanced or unsplit.
    pub fn split_discrepancy(&self) -> Option<f64> {
        if self.splits.is_empty() {
            return None;
        }
        let diff = self.split_total() - self.amount;
        if diff.abs() > SPLIT_EPSILON + 1e-9 {
            Some(diff)
        } else {
            None
        }
    }
}

// ============================================================================
// INVESTMENT ACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashDirection {
    Inflow,
    Outflow,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareDirection {
    In,
    Out,
    None,
}

macro_rules! investment_actions {
    ($($variant:ident => $code:literal, $cash:ident, $shares:ident;)+) => {
        /// Investment action codes (`N` field of an investment record).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum InvestmentAction {
            $($variant,)+
        }

        impl InvestmentAction {
            pub const ALL: &'static [InvestmentAction] = &[$(InvestmentAction::$variant,)+];

            pub fn code(&self) -> &'static str {
                match self {
                    $(InvestmentAction::$variant => $code,)+
                }
            }

            /// Which way cash moves in the investment register.
            pub fn cash_direction(&self) -> CashDirection {
                match self {
                    $(InvestmentAction::$variant => CashDirection::$cash,)+
                }
            }

            /// Which way the share balance moves.
            pub fn share_direction(&self) -> ShareDirection {
                match self {
                    $(InvestmentAction::$variant => ShareDirection::$shares,)+
                }
            }
        }
    };
}

investment_actions! {
    Buy => "Buy", Outflow, In;
    BuyX => "BuyX", Outflow, In;
    Sell => "Sell", Inflow, Out;
    SellX => "SellX", Inflow, Out;
    CgLong => "CGLong", Inflow, None;
    CgLongX => "CGLongX", Inflow, None;
    CgMid => "CGMid", Inflow, None;
    CgMidX => "CGMidX", Inflow, None;
    CgShort => "CGShort", Inflow, None;
    CgShortX => "CGShortX", Inflow, None;
    Div => "Div", Inflow, None;
    DivX => "DivX", Inflow, None;
    IntInc => "IntInc", Inflow, None;
    IntIncX => "IntIncX", Inflow, None;
    ReinvDiv => "ReinvDiv", None, In;
    ReinvInt => "ReinvInt", None, In;
    ReinvLg => "ReinvLg", None, In;
    ReinvMd => "ReinvMd", None, In;
    ReinvSh => "ReinvSh", None, In;
    Reprice => "Reprice", None, None;
    XIn => "XIn", Inflow, None;
    XOut => "XOut", Outflow, None;
    MiscExp => "MiscExp", Outflow, None;
    MiscExpX => "MiscExpX", Outflow, None;
    MiscInc => "MiscInc", Inflow, None;
    MiscIncX => "MiscIncX", Inflow, None;
    MargInt => "MargInt", Outflow, None;
    MargIntX => "MargIntX", Outflow, None;
    RtrnCap => "RtrnCap", Inflow, None;
    RtrnCapX => "RtrnCapX", Inflow, None;
    StkSplit => "StkSplit", None, None;
    ShrsOut => "ShrsOut", None, Out;
    ShrsIn => "ShrsIn", None, In;
    ShtSell => "ShtSell", Inflow, Out;
    CvrShrt => "CvrShrt", Outflow, In;
    ContribX => "ContribX", Inflow, None;
    WithdrwX => "WithdrwX", Outflow, None;
}

impl InvestmentAction {
    /// Case-insensitive lookup of an action code.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let raw = raw.trim();
        InvestmentAction::ALL
            .iter()
            .copied()
            .find(|a| a.code().eq_ignore_ascii_case(raw))
            .ok_or_else(|| CodecError::InvalidAction {
                value: raw.to_string(),
            })
    }

    /// Trade actions move shares and therefore name a security.
    pub fn needs_security(&self) -> bool {
        self.share_direction() != ShareDirection::None
            || matches!(self, InvestmentAction::StkSplit | InvestmentAction::Reprice)
    }

    /// `X` actions move cash through the `L` transfer account.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            InvestmentAction::XIn | InvestmentAction::XOut | InvestmentAction::ContribX | InvestmentAction::WithdrwX
        ) || (self.code().ends_with('X') && self.code().len() > 2)
    }
}

// ============================================================================
// INVESTMENT TRANSACTION
// ============================================================================

/// Quantity and amount are stored as magnitudes; the action decides the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentTransaction {
    pub date: Option<NaiveDate>,
    pub action: InvestmentAction,
    pub security: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub amount: Option<f64>,
    pub cleared: ClearedStatus,
    /// `P` line: first-line text, used for transfers and reminders
    pub text: Option<String>,
    pub memo: Option<String>,
    pub commission: Option<f64>,
    pub transfer_account: Option<String>,
    pub transfer_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<QifError>,
}

impl InvestmentTransaction {
    pub fn new(date: NaiveDate, action: InvestmentAction) -> Self {
        InvestmentTransaction {
            date: Some(date),
            action,
            security: None,
            price: None,
            quantity: None,
            amount: None,
            cleared: ClearedStatus::Uncleared,
            text: None,
            memo: None,
            commission: None,
            transfer_account: None,
            transfer_amount: None,
            extra: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_security(mut self, security: impl Into<String>) -> Self {
        self.security = Some(security.into());
        self
    }

    /// Records price, quantity and amount as magnitudes.
    pub fn with_trade(mut self, price: f64, quantity: f64, amount: f64) -> Self {
        self.price = Some(price);
        self.quantity = Some(quantity.abs());
        self.amount = Some(amount.abs());
        self
    }

    /// Amount signed by the action's cash direction.
    pub fn signed_amount(&self) -> Option<f64> {
        self.amount.map(|a| match self.action.cash_direction() {
            CashDirection::Outflow => -a,
            _ => a,
        })
    }

    /// Quantity signed by the action's share direction.
    pub fn signed_quantity(&self) -> Option<f64> {
        self.quantity.map(|q| match self.action.share_direction() {
            ShareDirection::Out => -q,
            _ => q,
        })
    }
}

// ============================================================================
// MEMORIZED TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemorizedKind {
    Check,
    Deposit,
    Payment,
    Investment,
    Electronic,
}

impl MemorizedKind {
    pub fn code(&self) -> &'static str {
        match self {
            MemorizedKind::Check => "KC",
            MemorizedKind::Deposit => "KD",
            MemorizedKind::Payment => "KP",
            MemorizedKind::Investment => "KI",
            MemorizedKind::Electronic => "KE",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, CodecError> {
        match code.trim().to_ascii_uppercase().as_str() {
            "KC" => Ok(MemorizedKind::Check),
            "KD" => Ok(MemorizedKind::Deposit),
            "KP" => Ok(MemorizedKind::Payment),
            "KI" => Ok(MemorizedKind::Investment),
            "KE" => Ok(MemorizedKind::Electronic),
            _ => Err(CodecError::InvalidMemorizedType {
                value: code.to_string(),
            }),
        }
    }
}

/// Loan amortization lines `1`..`7` of a memorized payment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Amortization {
    pub first_payment_date: Option<NaiveDate>,
    pub total_years: Option<u32>,
    pub payments_made: Option<u32>,
    pub periods_per_year: Option<u32>,
    pub interest_rate: Option<f64>,
    pub current_balance: Option<f64>,
    pub original_amount: Option<f64>,
}

impl Amortization {
    pub fn is_empty(&self) -> bool {
        *self == Amortization::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memorized<T> {
    pub kind: MemorizedKind,
    pub transaction: T,
    pub amortization: Option<Amortization>,
}

// ============================================================================
// TRANSACTION UNION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transaction {
    Banking(BankingTransaction),
    Investment(InvestmentTransaction),
    MemorizedBanking(Memorized<BankingTransaction>),
    MemorizedInvestment(Memorized<InvestmentTransaction>),
}

impl Transaction {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Transaction::Banking(t) => t.date,
            Transaction::Investment(t) => t.date,
            Transaction::MemorizedBanking(m) => m.transaction.date,
            Transaction::MemorizedInvestment(m) => m.transaction.date,
        }
    }

    /// Signed amount; investment amounts take their sign from the action.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Transaction::Banking(t) => Some(t.amount),
            Transaction::Investment(t) => t.signed_amount(),
            Transaction::MemorizedBanking(m) => Some(m.transaction.amount),
            Transaction::MemorizedInvestment(m) => m.transaction.signed_amount(),
        }
    }

    pub fn memo(&self) -> Option<&str> {
        match self {
            Transaction::Banking(t) => t.memo.as_deref(),
            Transaction::Investment(t) => t.memo.as_deref(),
            Transaction::MemorizedBanking(m) => m.transaction.memo.as_deref(),
            Transaction::MemorizedInvestment(m) => m.transaction.memo.as_deref(),
        }
    }

    pub fn cleared(&self) -> ClearedStatus {
        match self {
            Transaction::Banking(t) => t.cleared,
            Transaction::Investment(t) => t.cleared,
            Transaction::MemorizedBanking(m) => m.transaction.cleared,
            Transaction::MemorizedInvestment(m) => m.transaction.cleared,
        }
    }

    pub fn warnings(&self) -> &[QifError] {
        match self {
            Transaction::Banking(t) => &t.warnings,
            Transaction::Investment(t) => &t.warnings,
            Transaction::MemorizedBanking(m) => &m.transaction.warnings,
            Transaction::MemorizedInvestment(m) => &m.transaction.warnings,
        }
    }

    pub fn extra(&self) -> &[(String, String)] {
        match self {
            Transaction::Banking(t) => &t.extra,
            Transaction::Investment(t) => &t.extra,
            Transaction::MemorizedBanking(m) => &m.transaction.extra,
            Transaction::MemorizedInvestment(m) => &m.transaction.extra,
        }
    }

    pub fn as_banking(&self) -> Option<&BankingTransaction> {
        match self {
            Transaction::Banking(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_banking_mut(&mut self) -> Option<&mut BankingTransaction> {
        match self {
            Transaction::Banking(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_investment(&self) -> Option<&InvestmentTransaction> {
        match self {
            Transaction::Investment(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_memorized(&self) -> bool {
        matches!(
            self,
            Transaction::MemorizedBanking(_) | Transaction::MemorizedInvestment(_)
        )
    }
}
