// 📚 Document Model - the aggregate a parse produces and a generate consumes
//
// Registers are keyed by (account type, account name). A register entered
// without a preceding `!Account` block lands in the unnamed bucket for its
// type. Accounts, registers and the transactions in each keep encounter order.

use crate::config::ParseOptions;
use crate::entities::{
    AccountDefinition, AccountKey, AccountType, CategoryItem, ClassItem, Transaction, TxRef,
};
use crate::error::QifError;
use crate::lexer::{Directive, EntityKind, LexEvent};
use crate::parser::{get_parser, ParseOutcome, Record};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentOptions {
    /// `!Option:AllXfr` was present
    pub all_transfers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    pub key: AccountKey,
    pub transactions: Vec<Transaction>,
}

impl Register {
    pub fn new(key: AccountKey) -> Self {
        Register {
            key,
            transactions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub options: DocumentOptions,
    pub accounts: Vec<AccountDefinition>,
    pub registers: Vec<Register>,
    pub categories: Vec<CategoryItem>,
    pub classes: Vec<ClassItem>,
    pub memorized: Vec<Transaction>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// First account definition with this name.
    pub fn account(&self, name: &str) -> Option<&AccountDefinition> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn register(&self, key: &AccountKey) -> Option<&Register> {
        self.registers.iter().find(|r| &r.key == key)
    }

    pub fn register_mut(&mut self, key: &AccountKey) -> Option<&mut Register> {
        self.registers.iter_mut().find(|r| &r.key == key)
    }

    /// Registers filed under an account name, any type.
    pub fn registers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Register> + 'a {
        self.registers
            .iter()
            .filter(move |r| r.key.name.as_deref() == Some(name))
    }

    /// The register for `key`, created empty at the end if missing.
    pub fn ensure_register(&mut self, key: AccountKey) -> &mut Register {
        let index = match self.registers.iter().position(|r| r.key == key) {
            Some(index) => index,
            None => {
                self.registers.push(Register::new(key));
                self.registers.len() - 1
            }
        };
        &mut self.registers[index]
    }

    /// Append a transaction to its register. A named register whose account
    /// has no definition yet gets one, so the document stays generatable.
    pub fn push_transaction(&mut self, key: AccountKey, transaction: Transaction) -> TxRef {
        if let Some(name) = &key.name {
            if self.account(name).is_none() {
                self.accounts
                    .push(AccountDefinition::new(name.clone(), key.account_type.clone()));
            }
        }
        let register = self.ensure_register(key.clone());
        register.transactions.push(transaction);
        TxRef::new(key, register.transactions.len() - 1)
    }

    pub fn transaction(&self, reference: &TxRef) -> Option<&Transaction> {
        self.register(&reference.key)?.transactions.get(reference.index)
    }

    pub fn transaction_mut(&mut self, reference: &TxRef) -> Option<&mut Transaction> {
        self.register_mut(&reference.key)?
            .transactions
            .get_mut(reference.index)
    }

    /// Every register transaction with its reference, in document order.
    pub fn transactions(&self) -> impl Iterator<Item = (TxRef, &Transaction)> {
        self.registers.iter().flat_map(|register| {
            register
                .transactions
                .iter()
                .enumerate()
                .map(move |(index, tx)| (TxRef::new(register.key.clone(), index), tx))
        })
    }

    pub fn transaction_count(&self) -> usize {
        self.registers.iter().map(|r| r.transactions.len()).sum()
    }
}

// ============================================================================
// ASSEMBLER
// ============================================================================

/// Folds lexer events into a Document, dispatching each block to its parser.
pub struct DocumentAssembler<'a> {
    options: &'a ParseOptions,
    document: Document,
    errors: Vec<QifError>,
    current_account: Option<String>,
    blocks: usize,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        DocumentAssembler {
            options,
            document: Document::new(),
            errors: Vec::new(),
            current_account: None,
            blocks: 0,
        }
    }

    fn register_key(&self, account_type: &AccountType) -> AccountKey {
        AccountKey {
            account_type: account_type.clone(),
            name: self.current_account.clone(),
        }
    }

    fn report(&mut self, error: QifError) {
        warn!("{}", error);
        self.errors.push(error);
    }

    pub fn consume(&mut self, event: LexEvent) {
        match event {
            LexEvent::Header {
                kind: EntityKind::Register(account_type),
                ..
            } => {
                let key = self.register_key(&account_type);
                self.document.ensure_register(key);
            }
            LexEvent::Header { .. } => {}
            LexEvent::Directive {
                directive: Directive::AllTransfers,
                ..
            } => self.document.options.all_transfers = true,
            LexEvent::Directive { directive, line } => {
                debug!("line {}: ignoring directive {:?}", line, directive);
            }
            LexEvent::Error(error) => self.report(error),
            LexEvent::Block(block) => {
                self.blocks += 1;
                debug!("line {}: {} block", block.start_line, block.kind.header());
                match get_parser(&block.kind).parse_block(&block, self.options) {
                    Ok(record) => self.insert(&block.kind, record),
                    Err(error) => {
                        // Registers after a rejected account must not inherit the previous one
                        if block.kind == EntityKind::Account {
                            self.current_account = None;
                        }
                        self.report(error);
                    }
                }
            }
        }
    }

    fn insert(&mut self, kind: &EntityKind, record: Record) {
        match record {
            Record::Account(account) => {
                self.current_account = Some(account.name.clone());
                self.document.accounts.push(account);
            }
            Record::Category(item) => self.document.categories.push(item),
            Record::Class(item) => self.document.classes.push(item),
            Record::Transaction(tx) => {
                for warning in tx.warnings() {
                    warn!("{}", warning);
                }
                self.errors.extend(tx.warnings().iter().cloned());
                match kind {
                    EntityKind::Register(account_type) => {
                        let key = self.register_key(account_type);
                        self.document.push_transaction(key, tx);
                    }
                    _ => self.document.memorized.push(tx),
                }
            }
        }
    }

    pub fn finish(self) -> ParseOutcome {
        info!(
            "parsed {} blocks: {} accounts, {} register transactions, {} memorized, {} errors",
            self.blocks,
            self.document.accounts.len(),
            self.document.transaction_count(),
            self.document.memorized.len(),
            self.errors.len()
        );
        ParseOutcome {
            document: self.document,
            errors: self.errors,
        }
    }
}
