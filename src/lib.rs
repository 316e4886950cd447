// QIF Interchange - Core Library
// Parse, recognize transfers in, validate, export and regenerate Quicken
// Interchange Format documents. Used by the CLI and by tests.

pub mod codecs;
pub mod config;
pub mod document;
pub mod entities;
pub mod error;
pub mod export;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod transfers;
pub mod validation;

// Re-export commonly used types
pub use codecs::{AmountCodec, ClearedStatus, DateCodec, DateFormat};
pub use config::{GenerateOptions, ParseOptions, QifConfig, TransferOptions, TransferScope};
pub use document::{Document, DocumentOptions, Register};
pub use entities::{
    AccountDefinition, AccountKey, AccountType, Amortization, BankingTransaction, CategoryItem,
    CategoryRef, ClassItem, InvestmentAction, InvestmentTransaction, Memorized, MemorizedKind,
    SplitTransaction, Transaction, TransferState, TxRef,
};
pub use error::{CodecError, ErrorKind, GenerateError, QifError};
pub use export::{banking_rows, investment_rows, write_banking_csv, write_investment_csv};
pub use generator::{generate, generate_with, write_document};
pub use lexer::{lex, Block, EntityKind, LexEvent, Lexer};
pub use parser::{get_parser, parse, parse_reader, parse_with, ParseOutcome, Record, RecordParser};
pub use transfers::{flag_all_transfers, TransferMatch, TransferRecognizer, TransferReport};
pub use validation::{DocumentValidator, QualityIssue, Severity, ValidationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Link transfer legs across accounts and hand the enriched document back.
pub fn recognize_transfers(mut doc: Document, options: &TransferOptions) -> Document {
    TransferRecognizer::with_options(options.clone()).recognize(&mut doc);
    doc
}
