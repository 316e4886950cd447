// Entity Models - the record types a QIF document is made of
//
// Each entity is a plain value:
// - Accounts and the register key they define
// - Category and class list items, plus the category reference grammar
// - Banking, investment and memorized transactions under one union

pub mod account;
pub mod category;
pub mod transaction;

pub use account::{AccountDefinition, AccountKey, AccountType};
pub use category::{parse_category, transfer_target, CategoryItem, CategoryProblem, CategoryRef, ClassItem};
pub use transaction::{
    Amortization, BankingTransaction, CashDirection, InvestmentAction, InvestmentTransaction,
    Memorized, MemorizedKind, ShareDirection, SplitTransaction, Transaction, TransferState, TxRef,
    SPLIT_EPSILON,
};
