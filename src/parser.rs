// 🏗️ Entity Parsers - lexed blocks → typed records
//
// One parser per entity type behind the RecordParser trait; get_parser()
// picks the parser for a block's header. A parser either returns a complete
// record or the first error that made the record unusable. Findings that do
// not invalidate the record (split-sum mismatch) ride along as warnings.

use crate::codecs::ClearedStatus;
use crate::config::ParseOptions;
use crate::document::{Document, DocumentAssembler};
use crate::entities::{
    AccountDefinition, AccountType, Amortization, BankingTransaction, CategoryItem, ClassItem,
    InvestmentAction, InvestmentTransaction, Memorized, MemorizedKind, SplitTransaction,
    Transaction,
};
use crate::error::{CodecError, QifError};
use crate::lexer::{Block, EntityKind, FieldLine, Lexer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Address lines a banking record may carry (`A`, repeatable).
pub const MAX_ADDRESS_LINES: usize = 6;

const SPLIT_CODES: [&str; 4] = ["S", "E", "$", "%"];

// ============================================================================
// CORE TYPES
// ============================================================================

/// Output of a RecordParser: one typed record per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Transaction(Transaction),
    Account(AccountDefinition),
    Category(CategoryItem),
    Class(ClassItem),
}

/// Everything `parse` learned from one input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub document: Document,
    pub errors: Vec<QifError>,
}

impl ParseOutcome {
    /// No errors and no warnings.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors that dropped a record or a block (warnings excluded).
    pub fn failures(&self) -> impl Iterator<Item = &QifError> {
        self.errors.iter().filter(|e| !e.is_warning())
    }

    pub fn into_parts(self) -> (Document, Vec<QifError>) {
        (self.document, self.errors)
    }
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// Decodes the field lines of one block into a typed record.
pub trait RecordParser {
    fn parse_block(&self, block: &Block, options: &ParseOptions) -> Result<Record, QifError>;

    /// Entity this parser handles
    fn entity(&self) -> EntityKind;
}

/// Factory: the parser for a block's header context.
pub fn get_parser(kind: &EntityKind) -> Box<dyn RecordParser> {
    match kind {
        EntityKind::Register(AccountType::Investment) => Box::new(InvestmentParser),
        EntityKind::Register(account_type) => Box::new(BankingParser {
            account_type: account_type.clone(),
        }),
        EntityKind::Account => Box::new(AccountParser),
        EntityKind::Category => Box::new(CategoryParser),
        EntityKind::Class => Box::new(ClassParser),
        EntityKind::Memorized => Box::new(MemorizedParser),
    }
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

fn decode<T>(field: &FieldLine, result: Result<T, CodecError>) -> Result<T, QifError> {
    result.map_err(|err| QifError::field_value(field.line, &field.code, &field.value, err))
}

fn overflow(extra: &mut Vec<(String, String)>, field: &FieldLine) {
    extra.push((field.code.clone(), field.value.clone()));
}

fn parse_percent(options: &ParseOptions, field: &FieldLine) -> Result<f64, QifError> {
    let raw = field.value.trim().trim_end_matches('%');
    decode(field, options.amounts.parse(raw))
}

fn parse_count(field: &FieldLine) -> Result<u32, QifError> {
    decode(
        field,
        field
            .value
            .trim()
            .parse::<u32>()
            .map_err(|_| CodecError::InvalidInteger {
                value: field.value.clone(),
            }),
    )
}

/// Tracks single-valued codes: the first occurrence wins.
#[derive(Default)]
struct SeenCodes(Vec<String>);

impl SeenCodes {
    fn first_time(&mut self, code: &str) -> bool {
        if self.0.iter().any(|c| c == code) {
            false
        } else {
            self.0.push(code.to_string());
            true
        }
    }
}

// ============================================================================
// BANKING RECORDS
// ============================================================================

/// Split being accumulated; closed by a repeated split code, a top-level
/// code or the end of the block.
struct OpenSplit {
    line: usize,
    category: Option<String>,
    memo: Option<String>,
    amount: Option<f64>,
    percent: Option<f64>,
}

impl OpenSplit {
    fn new(line: usize) -> Self {
        OpenSplit {
            line,
            category: None,
            memo: None,
            amount: None,
            percent: None,
        }
    }

    fn has(&self, code: &str) -> bool {
        match code {
            "S" => self.category.is_some(),
            "E" => self.memo.is_some(),
            "$" => self.amount.is_some(),
            "%" => self.percent.is_some(),
            _ => false,
        }
    }

    fn close(self) -> Result<SplitTransaction, QifError> {
        let category = self
            .category
            .ok_or_else(|| QifError::format(self.line, "split has no category (S) line"))?;
        let amount = self
            .amount
            .ok_or_else(|| QifError::format(self.line, "split has no amount ($) line"))?;
        Ok(SplitTransaction {
            category,
            memo: self.memo,
            amount,
            percent: self.percent,
        })
    }
}

/// Field-by-field state machine for the non-investment table.
struct BankingBuilder<'a> {
    options: &'a ParseOptions,
    tx: BankingTransaction,
    seen: SeenCodes,
    amount: Option<f64>,
    alternate: Option<(String, f64)>,
    split: Option<OpenSplit>,
}

impl<'a> BankingBuilder<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        BankingBuilder {
            options,
            tx: BankingTransaction::default(),
            seen: SeenCodes::default(),
            amount: None,
            alternate: None,
            split: None,
        }
    }

    fn accept(&mut self, field: &FieldLine) -> Result<(), QifError> {
        let code = field.code.as_str();
        if SPLIT_CODES.contains(&code) {
            return self.accept_split(field);
        }
        self.close_split()?;

        if code == "A" {
            if self.tx.address.len() < MAX_ADDRESS_LINES {
                self.tx.address.push(field.value.clone());
            } else {
                overflow(&mut self.tx.extra, field);
            }
            return Ok(());
        }

        let known = matches!(code, "D" | "T" | "U" | "C" | "N" | "P" | "M" | "L" | "F");
        if !known || !self.seen.first_time(code) {
            overflow(&mut self.tx.extra, field);
            return Ok(());
        }

        match code {
            "D" => self.tx.date = Some(decode(field, self.options.dates.parse(&field.value))?),
            "T" => self.amount = Some(decode(field, self.options.amounts.parse(&field.value))?),
            "U" => {
                let value = decode(field, self.options.amounts.parse(&field.value))?;
                self.alternate = Some((field.value.clone(), value));
            }
            "C" => self.tx.cleared = decode(field, ClearedStatus::parse(&field.value))?,
            "N" => self.tx.number = Some(field.value.clone()),
            "P" => self.tx.payee = Some(field.value.clone()),
            "M" => self.tx.memo = Some(field.value.clone()),
            "L" => self.tx.category = Some(field.value.clone()),
            _ => self.tx.reimbursable = true,
        }
        Ok(())
    }

    fn accept_split(&mut self, field: &FieldLine) -> Result<(), QifError> {
        let code = field.code.as_str();
        if self.split.as_ref().is_some_and(|s| s.has(code)) {
            self.close_split()?;
        }
        let split = self.split.get_or_insert_with(|| OpenSplit::new(field.line));
        match code {
            "S" => split.category = Some(field.value.clone()),
            "E" => split.memo = Some(field.value.clone()),
            "$" => split.amount = Some(decode(field, self.options.amounts.parse(&field.value))?),
            _ => split.percent = Some(parse_percent(self.options, field)?),
        }
        Ok(())
    }

    fn close_split(&mut self) -> Result<(), QifError> {
        if let Some(split) = self.split.take() {
            self.tx.splits.push(split.close()?);
        }
        Ok(())
    }

    /// `register` records must carry a date and an amount; memorized
    /// templates may leave both out.
    fn finish(mut self, start_line: usize, register: bool) -> Result<BankingTransaction, QifError> {
        self.close_split()?;

        self.tx.amount = match (self.amount, self.alternate) {
            (Some(total), Some((raw, alternate))) => {
                if (total - alternate).abs() > f64::EPSILON {
                    self.tx.extra.push(("U".to_string(), raw));
                }
                total
            }
            (Some(total), None) => total,
            (None, Some((_, alternate))) => alternate,
            (None, None) if register => {
                return Err(QifError::format(start_line, "transaction has no amount (T) line"));
            }
            (None, None) => 0.0,
        };

        if register && self.tx.date.is_none() {
            return Err(QifError::format(start_line, "transaction has no date (D) line"));
        }

        if let Some(diff) = self.tx.split_discrepancy() {
            self.tx.warnings.push(QifError::InvariantViolation {
                line: start_line,
                message: format!(
                    "splits sum to {:.2} but the total is {:.2} (off by {:.2})",
                    self.tx.split_total(),
                    self.tx.amount,
                    diff
                ),
            });
        }

        Ok(self.tx)
    }
}

/// Bank, Cash, CCard, Oth A and Oth L registers.
pub struct BankingParser {
    pub account_type: AccountType,
}

impl RecordParser for BankingParser {
    fn parse_block(&self, block: &Block, options: &ParseOptions) -> Result<Record, QifError> {
        let mut builder = BankingBuilder::new(options);
        for field in &block.fields {
            builder.accept(field)?;
        }
        let tx = builder.finish(block.start_line, true)?;
        Ok(Record::Transaction(Transaction::Banking(tx)))
    }

    fn entity(&self) -> EntityKind {
        EntityKind::Register(self.account_type.clone())
    }
}

// ============================================================================
// INVESTMENT RECORDS
// ============================================================================

struct InvestmentBuilder<'a> {
    options: &'a ParseOptions,
    seen: SeenCodes,
    date: Option<chrono::NaiveDate>,
    action: Option<InvestmentAction>,
    security: Option<String>,
    price: Option<f64>,
    quantity: Option<f64>,
    amount: Option<f64>,
    alternate: Option<(String, f64)>,
    cleared: ClearedStatus,
    text: Option<String>,
    memo: Option<String>,
    commission: Option<f64>,
    transfer_account: Option<String>,
    transfer_amount: Option<f64>,
    extra: Vec<(String, String)>,
}

impl<'a> InvestmentBuilder<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        InvestmentBuilder {
            options,
            seen: SeenCodes::default(),
            date: None,
            action: None,
            security: None,
            price: None,
            quantity: None,
            amount: None,
            alternate: None,
            cleared: ClearedStatus::Uncleared,
            text: None,
            memo: None,
            commission: None,
            transfer_account: None,
            transfer_amount: None,
            extra: Vec::new(),
        }
    }

    fn number(&self, field: &FieldLine) -> Result<f64, QifError> {
        decode(field, self.options.amounts.parse(&field.value))
    }

    fn accept(&mut self, field: &FieldLine) -> Result<(), QifError> {
        let code = field.code.as_str();
        let known = matches!(
            code,
            "D" | "N" | "Y" | "I" | "Q" | "T" | "U" | "C" | "P" | "M" | "O" | "L" | "$"
        );
        if !known || !self.seen.first_time(code) {
            overflow(&mut self.extra, field);
            return Ok(());
        }

        match code {
            "D" => self.date = Some(decode(field, self.options.dates.parse(&field.value))?),
            "N" => self.action = Some(decode(field, InvestmentAction::parse(&field.value))?),
            "Y" => self.security = Some(field.value.clone()),
            "I" => self.price = Some(self.number(field)?),
            "Q" => self.quantity = Some(self.number(field)?.abs()),
            "T" => self.amount = Some(self.number(field)?.abs()),
            "U" => self.alternate = Some((field.value.clone(), self.number(field)?.abs())),
            "C" => self.cleared = decode(field, ClearedStatus::parse(&field.value))?,
            "P" => self.text = Some(field.value.clone()),
            "M" => self.memo = Some(field.value.clone()),
            "O" => self.commission = Some(self.number(field)?),
            "L" => self.transfer_account = Some(field.value.clone()),
            _ => self.transfer_amount = Some(self.number(field)?),
        }
        Ok(())
    }

    fn finish(mut self, start_line: usize, register: bool) -> Result<InvestmentTransaction, QifError> {
        let action = self
            .action
            .ok_or_else(|| QifError::format(start_line, "investment record has no action (N) line"))?;
        if register && self.date.is_none() {
            return Err(QifError::format(start_line, "investment record has no date (D) line"));
        }

        let amount = match (self.amount, self.alternate) {
            (Some(total), Some((raw, alternate))) => {
                if (total - alternate).abs() > f64::EPSILON {
                    self.extra.push(("U".to_string(), raw));
                }
                Some(total)
            }
            (Some(total), None) => Some(total),
            (None, alternate) => alternate.map(|(_, value)| value),
        };

        Ok(InvestmentTransaction {
            date: self.date,
            action,
            security: self.security,
            price: self.price,
            quantity: self.quantity,
            amount,
            cleared: self.cleared,
            text: self.text,
            memo: self.memo,
            commission: self.commission,
            transfer_account: self.transfer_account,
            transfer_amount: self.transfer_amount,
            extra: self.extra,
            warnings: Vec::new(),
        })
    }
}

/// `!Type:Invst` register.
pub struct InvestmentParser;

impl RecordParser for InvestmentParser {
    fn parse_block(&self, block: &Block, options: &ParseOptions) -> Result<Record, QifError> {
        let mut builder = InvestmentBuilder::new(options);
        for field in &block.fields {
            builder.accept(field)?;
        }
        let tx = builder.finish(block.start_line, true)?;
        Ok(Record::Transaction(Transaction::Investment(tx)))
    }

    fn entity(&self) -> EntityKind {
        EntityKind::Register(AccountType::Investment)
    }
}

// ============================================================================
// MEMORIZED RECORDS
// ============================================================================

/// `!Type:Memorized`. The `K` tag decides which register table applies,
/// so it is located before any other field is decoded.
pub struct MemorizedParser;

impl MemorizedParser {
    fn accept_amortization(
        amortization: &mut Amortization,
        field: &FieldLine,
        options: &ParseOptions,
    ) -> Result<bool, QifError> {
        let slot_taken = match field.code.as_str() {
            "1" => amortization.first_payment_date.is_some(),
            "2" => amortization.total_years.is_some(),
            "3" => amortization.payments_made.is_some(),
            "4" => amortization.periods_per_year.is_some(),
            "5" => amortization.interest_rate.is_some(),
            "6" => amortization.current_balance.is_some(),
            "7" => amortization.original_amount.is_some(),
            _ => return Ok(false),
        };
        if slot_taken {
            return Ok(false);
        }

        match field.code.as_str() {
            "1" => amortization.first_payment_date = Some(decode(field, options.dates.parse(&field.value))?),
            "2" => amortization.total_years = Some(parse_count(field)?),
            "3" => amortization.payments_made = Some(parse_count(field)?),
            "4" => amortization.periods_per_year = Some(parse_count(field)?),
            "5" => amortization.interest_rate = Some(parse_percent(options, field)?),
            "6" => amortization.current_balance = Some(decode(field, options.amounts.parse(&field.value))?),
            _ => amortization.original_amount = Some(decode(field, options.amounts.parse(&field.value))?),
        }
        Ok(true)
    }
}

impl RecordParser for MemorizedParser {
    fn parse_block(&self, block: &Block, options: &ParseOptions) -> Result<Record, QifError> {
        let (tag_index, tag) = block
            .fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.code.starts_with('K'))
            .ok_or_else(|| {
                QifError::format(block.start_line, "memorized transaction has no type (K) line")
            })?;
        let kind = decode(tag, MemorizedKind::from_code(&tag.code))?;

        let mut amortization = Amortization::default();
        let remaining = block
            .fields
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != tag_index)
            .map(|(_, f)| f);

        let transaction = if kind == MemorizedKind::Investment {
            let mut builder = InvestmentBuilder::new(options);
            for field in remaining {
                if !Self::accept_amortization(&mut amortization, field, options)? {
                    builder.accept(field)?;
                }
            }
            let tx = builder.finish(block.start_line, false)?;
            Transaction::MemorizedInvestment(Memorized {
                kind,
                transaction: tx,
                amortization: Some(amortization).filter(|a| !a.is_empty()),
            })
        } else {
            let mut builder = BankingBuilder::new(options);
            for field in remaining {
                if !Self::accept_amortization(&mut amortization, field, options)? {
                    builder.accept(field)?;
                }
            }
            let tx = builder.finish(block.start_line, false)?;
            Transaction::MemorizedBanking(Memorized {
                kind,
                transaction: tx,
                amortization: Some(amortization).filter(|a| !a.is_empty()),
            })
        };

        Ok(Record::Transaction(transaction))
    }

    fn entity(&self) -> EntityKind {
        EntityKind::Memorized
    }
}

// ============================================================================
// LIST RECORDS
// ============================================================================

/// `!Account` blocks.
pub struct AccountParser;

impl RecordParser for AccountParser {
    fn parse_block(&self, block: &Block, options: &ParseOptions) -> Result<Record, QifError> {
        let mut seen = SeenCodes::default();
        let mut name = None;
        let mut account = AccountDefinition::new(String::new(), AccountType::Bank);

        for field in &block.fields {
            let code = field.code.as_str();
            let known = matches!(code, "N" | "T" | "D" | "L" | "/" | "$");
            if !known || !seen.first_time(code) {
                overflow(&mut account.extra, field);
                continue;
            }
            match code {
                "N" => name = Some(field.value.clone()),
                "T" => account.account_type = AccountType::from_qif(&field.value),
                "D" => account.description = Some(field.value.clone()),
                "L" => account.credit_limit = Some(decode(field, options.amounts.parse(&field.value))?),
                "/" => account.statement_date = Some(decode(field, options.dates.parse(&field.value))?),
                _ => account.statement_balance = Some(decode(field, options.amounts.parse(&field.value))?),
            }
        }

        account.name =
            name.ok_or_else(|| QifError::format(block.start_line, "account has no name (N) line"))?;
        Ok(Record::Account(account))
    }

    fn entity(&self) -> EntityKind {
        EntityKind::Account
    }
}

/// `!Type:Cat` blocks.
pub struct CategoryParser;

impl RecordParser for CategoryParser {
    fn parse_block(&self, block: &Block, options: &ParseOptions) -> Result<Record, QifError> {
        let mut seen = SeenCodes::default();
        let mut name = None;
        let mut item = CategoryItem::default();

        for field in &block.fields {
            let code = field.code.as_str();
            let known = matches!(code, "N" | "D" | "T" | "I" | "E" | "B" | "R");
            if !known || !seen.first_time(code) {
                overflow(&mut item.extra, field);
                continue;
            }
            match code {
                "N" => name = Some(field.value.clone()),
                "D" => item.description = Some(field.value.clone()),
                "T" => item.tax_related = true,
                "I" => item.income = true,
                "E" => item.expense = true,
                "B" => item.budget_amount = Some(decode(field, options.amounts.parse(&field.value))?),
                _ => item.tax_schedule = Some(field.value.clone()),
            }
        }

        item.name =
            name.ok_or_else(|| QifError::format(block.start_line, "category has no name (N) line"))?;
        Ok(Record::Category(item))
    }

    fn entity(&self) -> EntityKind {
        EntityKind::Category
    }
}

/// `!Type:Class` blocks.
pub struct ClassParser;

impl RecordParser for ClassParser {
    fn parse_block(&self, block: &Block, _options: &ParseOptions) -> Result<Record, QifError> {
        let mut seen = SeenCodes::default();
        let mut name = None;
        let mut item = ClassItem::default();

        for field in &block.fields {
            let code = field.code.as_str();
            let known = matches!(code, "N" | "D");
            if !known || !seen.first_time(code) {
                overflow(&mut item.extra, field);
                continue;
            }
            match code {
                "N" => name = Some(field.value.clone()),
                _ => item.description = Some(field.value.clone()),
            }
        }

        item.name =
            name.ok_or_else(|| QifError::format(block.start_line, "class has no name (N) line"))?;
        Ok(Record::Class(item))
    }

    fn entity(&self) -> EntityKind {
        EntityKind::Class
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Parse a complete QIF text with default options.
pub fn parse(text: &str) -> (Document, Vec<QifError>) {
    parse_with(text, &ParseOptions::default()).into_parts()
}

pub fn parse_with(text: &str, options: &ParseOptions) -> ParseOutcome {
    let mut lexer = Lexer::new();
    let mut assembler = DocumentAssembler::new(options);
    for line in text.lines() {
        for event in lexer.push_line(line) {
            assembler.consume(event);
        }
    }
    for event in lexer.finish() {
        assembler.consume(event);
    }
    assembler.finish()
}

/// Streaming variant: one line in memory at a time.
pub fn parse_reader<R: BufRead>(reader: R, options: &ParseOptions) -> Result<ParseOutcome> {
    let mut lexer = Lexer::new();
    let mut assembler = DocumentAssembler::new(options);
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read QIF input at line {}", index + 1))?;
        for event in lexer.push_line(&line) {
            assembler.consume(event);
        }
    }
    for event in lexer.finish() {
        assembler.consume(event);
    }
    Ok(assembler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::lexer::LexEvent;
    use chrono::NaiveDate;

    fn parse_single(text: &str) -> Result<Record, QifError> {
        let block = lex(text)
            .into_iter()
            .find_map(|e| match e {
                LexEvent::Block(b) => Some(b),
                _ => None,
            })
            .expect("test input has a block");
        get_parser(&block.kind).parse_block(&block, &ParseOptions::default())
    }

    fn banking(record: Record) -> BankingTransaction {
        match record {
            Record::Transaction(Transaction::Banking(tx)) => tx,
            other => panic!("expected banking transaction, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_banking_transaction() {
        let tx = banking(
            parse_single(
                "!Type:Bank\nD03/15/2023\nT-50.00\nN1001\nPGrocery Store\nMFood for the week\nLFood:Groceries\n^\n",
            )
            .unwrap(),
        );

        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2023, 3, 15));
        assert_eq!(tx.amount, -50.0);
        assert_eq!(tx.number.as_deref(), Some("1001"));
        assert_eq!(tx.payee.as_deref(), Some("Grocery Store"));
        assert_eq!(tx.memo.as_deref(), Some("Food for the week"));
        assert_eq!(tx.category.as_deref(), Some("Food:Groceries"));
        assert!(tx.warnings.is_empty());
    }

    #[test]
    fn test_split_state_machine() {
        let tx = banking(
            parse_single(
                "!Type:Bank\nD03/15/2023\nT-100.00\nSFood:Groceries\n$-60.00\nSHousehold\nESupplies\n$-40.00\n^\n",
            )
            .unwrap(),
        );

        assert_eq!(tx.splits.len(), 2);
        assert_eq!(tx.splits[0].category, "Food:Groceries");
        assert_eq!(tx.splits[0].amount, -60.0);
        assert_eq!(tx.splits[1].memo.as_deref(), Some("Supplies"));
        assert!(tx.warnings.is_empty());
    }

    #[test]
    fn test_split_mismatch_warns() {
        let tx = banking(
            parse_single("!Type:Bank\nD03/15/2023\nT-100.00\nSFood\n$-60.00\nSHousehold\n$-40.01\n^\n")
                .unwrap(),
        );
        assert_eq!(tx.warnings.len(), 1);
        assert!(tx.warnings[0].is_warning());
    }

    #[test]
    fn test_split_without_amount_rejected() {
        let err = parse_single("!Type:Bank\nD03/15/2023\nT-10.00\nSFood\nSHousehold\n$-10.00\n^\n")
            .unwrap_err();
        assert!(matches!(err, QifError::Format { line: 4, .. }));
    }

    #[test]
    fn test_unknown_and_repeated_codes_overflow() {
        let tx = banking(
            parse_single("!Type:Bank\nD03/15/2023\nT-5.00\nZ9custom\nPFirst\nPSecond\n^\n").unwrap(),
        );
        assert_eq!(tx.payee.as_deref(), Some("First"));
        assert_eq!(
            tx.extra,
            vec![
                ("Z9".to_string(), "custom".to_string()),
                ("P".to_string(), "Second".to_string())
            ]
        );
    }

    #[test]
    fn test_u_amount_alias() {
        let tx = banking(parse_single("!Type:CCard\nD03/15/2023\nU-12.50\n^\n").unwrap());
        assert_eq!(tx.amount, -12.5);
        assert!(tx.extra.is_empty());

        let tx = banking(parse_single("!Type:Bank\nD03/15/2023\nT-12.50\nU-13.00\n^\n").unwrap());
        assert_eq!(tx.amount, -12.5);
        assert_eq!(tx.extra, vec![("U".to_string(), "-13.00".to_string())]);
    }

    #[test]
    fn test_bad_date_is_field_value_error() {
        let err = parse_single("!Type:Bank\nD15/03/2023\nT-5.00\n^\n").unwrap_err();
        assert!(matches!(err, QifError::FieldValue { line: 2, .. }));
    }

    #[test]
    fn test_investment_buy() {
        let record = parse_single(
            "!Type:Invst\nD03/15/2023\nNBuy\nYAAPL\nI150.00\nQ10\nT1500.00\n^\n",
        )
        .unwrap();
        let Record::Transaction(Transaction::Investment(tx)) = record else {
            panic!("expected investment transaction");
        };
        assert_eq!(tx.action, InvestmentAction::Buy);
        assert_eq!(tx.security.as_deref(), Some("AAPL"));
        assert_eq!(tx.price, Some(150.0));
        assert_eq!(tx.quantity, Some(10.0));
        assert_eq!(tx.amount, Some(1500.0));
        assert_eq!(tx.signed_amount(), Some(-1500.0));
    }

    #[test]
    fn test_investment_unknown_action() {
        let err = parse_single("!Type:Invst\nD03/15/2023\nNGift\n^\n").unwrap_err();
        assert!(matches!(err, QifError::FieldValue { ref code, .. } if code == "N"));
    }

    #[test]
    fn test_memorized_payment_with_amortization() {
        let record = parse_single(
            "!Type:Memorized\nKP\nT-1200.00\nPMortgage Co\nL[Mortgage]\n101/01/2023\n230\n312\n412\n56.5\n6200000.00\n7250000.00\n^\n",
        )
        .unwrap();
        let Record::Transaction(Transaction::MemorizedBanking(memorized)) = record else {
            panic!("expected memorized banking transaction");
        };
        assert_eq!(memorized.kind, MemorizedKind::Payment);
        assert_eq!(memorized.transaction.date, None);
        assert_eq!(memorized.transaction.amount, -1200.0);
        let amortization = memorized.amortization.unwrap();
        assert_eq!(amortization.total_years, Some(30));
        assert_eq!(amortization.interest_rate, Some(6.5));
        assert_eq!(amortization.original_amount, Some(250000.0));
    }

    #[test]
    fn test_memorized_investment_uses_investment_table() {
        let record = parse_single("!Type:Memorized\nKI\nNBuy\nYMSFT\nQ5\n^\n").unwrap();
        let Record::Transaction(Transaction::MemorizedInvestment(memorized)) = record else {
            panic!("expected memorized investment transaction");
        };
        assert_eq!(memorized.transaction.security.as_deref(), Some("MSFT"));
        assert!(memorized.amortization.is_none());
    }

    #[test]
    fn test_memorized_without_tag() {
        let err = parse_single("!Type:Memorized\nT-5.00\n^\n").unwrap_err();
        assert!(matches!(err, QifError::Format { .. }));
        let err = parse_single("!Type:Memorized\nKZ\nT-5.00\n^\n").unwrap_err();
        assert!(matches!(err, QifError::FieldValue { .. }));
    }

    #[test]
    fn test_account_category_class() {
        let Record::Account(account) =
            parse_single("!Account\nNVisa\nTCCard\nL5,000.00\n/03/31/2023\n$-1250.75\n^\n").unwrap()
        else {
            panic!("expected account");
        };
        assert_eq!(account.account_type, AccountType::CreditCard);
        assert_eq!(account.credit_limit, Some(5000.0));
        assert_eq!(account.statement_balance, Some(-1250.75));

        let Record::Category(category) =
            parse_single("!Type:Cat\nNAuto:Fuel\nDGas\nE\nT\nB200.00\nRSchedule C\n^\n").unwrap()
        else {
            panic!("expected category");
        };
        assert!(category.expense && category.tax_related && !category.income);
        assert_eq!(category.budget_amount, Some(200.0));

        let Record::Class(class) = parse_single("!Type:Class\nNBusiness\nDSide work\n^\n").unwrap() else {
            panic!("expected class");
        };
        assert_eq!(class.description.as_deref(), Some("Side work"));

        assert!(parse_single("!Type:Class\nDNo name\n^\n").is_err());
    }

    #[test]
    fn test_parse_reader_matches_parse() {
        let text = "!Type:Bank\nD03/15/2023\nT-50.00\n^\nD03/16/2023\nT-5.00\n^\n";
        let streamed = parse_reader(text.as_bytes(), &ParseOptions::default()).unwrap();
        let (document, errors) = parse(text);
        assert_eq!(streamed.document, document);
        assert_eq!(streamed.errors, errors);
    }
}
