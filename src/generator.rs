// 🖨️ Generator - Document → canonical QIF text
//
// Output order: `!Option:AllXfr`, unnamed registers, then every account
// definition followed by the registers filed under its name, then the
// category, class and memorized lists. Within a record, known fields come in
// a fixed order, then splits, then overflow lines as captured.

use crate::codecs::{format_date, ClearedStatus};
use crate::config::GenerateOptions;
use crate::document::{Document, Register};
use crate::entities::{
    AccountDefinition, Amortization, BankingTransaction, CategoryItem, ClassItem,
    InvestmentTransaction, MemorizedKind, Transaction,
};
use crate::error::GenerateError;
use crate::lexer::EntityKind;
use chrono::NaiveDate;
use log::info;
use std::io::Write;

// ============================================================================
// LINE WRITER
// ============================================================================

struct QifWriter<'a, W: Write> {
    out: W,
    options: &'a GenerateOptions,
    records: usize,
}

impl<'a, W: Write> QifWriter<'a, W> {
    fn line(&mut self, text: &str) -> Result<(), GenerateError> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    fn field(&mut self, code: &str, value: &str) -> Result<(), GenerateError> {
        writeln!(self.out, "{}{}", code, value)?;
        Ok(())
    }

    fn opt_text(&mut self, code: &str, value: &Option<String>) -> Result<(), GenerateError> {
        match value {
            Some(text) => self.field(code, text),
            None => Ok(()),
        }
    }

    fn date(&mut self, code: &str, date: NaiveDate) -> Result<(), GenerateError> {
        let text = format_date(date, self.options.date_format);
        self.field(code, &text)
    }

    fn opt_date(&mut self, code: &str, date: Option<NaiveDate>) -> Result<(), GenerateError> {
        match date {
            Some(date) => self.date(code, date),
            None => Ok(()),
        }
    }

    fn money(&mut self, code: &str, value: f64) -> Result<(), GenerateError> {
        let text = self.options.amounts.format(value);
        self.field(code, &text)
    }

    fn opt_money(&mut self, code: &str, value: Option<f64>) -> Result<(), GenerateError> {
        match value {
            Some(value) => self.money(code, value),
            None => Ok(()),
        }
    }

    fn opt_number(&mut self, code: &str, value: Option<f64>) -> Result<(), GenerateError> {
        match value {
            Some(value) => {
                let text = self.options.amounts.format_number(value);
                self.field(code, &text)
            }
            None => Ok(()),
        }
    }

    fn flag(&mut self, code: &str, set: bool) -> Result<(), GenerateError> {
        if set {
            self.line(code)?;
        }
        Ok(())
    }

    fn cleared(&mut self, status: ClearedStatus) -> Result<(), GenerateError> {
        if status.is_cleared() {
            self.field("C", status.glyph())?;
        }
        Ok(())
    }

    fn extra(&mut self, extra: &[(String, String)]) -> Result<(), GenerateError> {
        for (code, value) in extra {
            self.field(code, value)?;
        }
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), GenerateError> {
        self.records += 1;
        self.line("^")
    }

    // ------------------------------------------------------------------------
    // Record bodies
    // ------------------------------------------------------------------------

    fn banking_fields(&mut self, tx: &BankingTransaction) -> Result<(), GenerateError> {
        self.opt_date("D", tx.date)?;
        self.money("T", tx.amount)?;
        self.cleared(tx.cleared)?;
        self.opt_text("N", &tx.number)?;
        self.opt_text("P", &tx.payee)?;
        self.opt_text("M", &tx.memo)?;
        for line in &tx.address {
            self.field("A", line)?;
        }
        self.opt_text("L", &tx.category)?;
        self.flag("F", tx.reimbursable)?;
        for split in &tx.splits {
            self.field("S", &split.category)?;
            self.opt_text("E", &split.memo)?;
            self.money("$", split.amount)?;
            self.opt_number("%", split.percent)?;
        }
        Ok(())
    }

    fn investment_fields(&mut self, tx: &InvestmentTransaction) -> Result<(), GenerateError> {
        self.opt_date("D", tx.date)?;
        self.field("N", tx.action.code())?;
        self.opt_text("Y", &tx.security)?;
        self.opt_number("I", tx.price)?;
        self.opt_number("Q", tx.quantity.map(f64::abs))?;
        self.opt_money("T", tx.amount.map(f64::abs))?;
        self.cleared(tx.cleared)?;
        self.opt_text("P", &tx.text)?;
        self.opt_text("M", &tx.memo)?;
        self.opt_money("O", tx.commission)?;
        self.opt_text("L", &tx.transfer_account)?;
        self.opt_money("$", tx.transfer_amount)
    }

    fn amortization(&mut self, amortization: &Option<Amortization>) -> Result<(), GenerateError> {
        let Some(a) = amortization else {
            return Ok(());
        };
        self.opt_date("1", a.first_payment_date)?;
        for (code, count) in [("2", a.total_years), ("3", a.payments_made), ("4", a.periods_per_year)] {
            if let Some(count) = count {
                self.field(code, &count.to_string())?;
            }
        }
        self.opt_number("5", a.interest_rate)?;
        self.opt_money("6", a.current_balance)?;
        self.opt_money("7", a.original_amount)
    }

    fn account(&mut self, record: &str, account: &AccountDefinition) -> Result<(), GenerateError> {
        if account.name.is_empty() {
            return Err(GenerateError::MissingField {
                record: record.to_string(),
                field: "N",
            });
        }
        self.field("N", &account.name)?;
        self.field("T", account.account_type.as_str())?;
        self.opt_text("D", &account.description)?;
        self.opt_money("L", account.credit_limit)?;
        self.opt_date("/", account.statement_date)?;
        self.opt_money("$", account.statement_balance)?;
        self.extra(&account.extra)?;
        self.end_record()
    }

    fn category(&mut self, record: &str, item: &CategoryItem) -> Result<(), GenerateError> {
        if item.name.is_empty() {
            return Err(GenerateError::MissingField {
                record: record.to_string(),
                field: "N",
            });
        }
        self.field("N", &item.name)?;
        self.opt_text("D", &item.description)?;
        self.flag("T", item.tax_related)?;
        self.flag("I", item.income)?;
        self.flag("E", item.expense)?;
        self.opt_money("B", item.budget_amount)?;
        self.opt_text("R", &item.tax_schedule)?;
        self.extra(&item.extra)?;
        self.end_record()
    }

    fn class(&mut self, record: &str, item: &ClassItem) -> Result<(), GenerateError> {
        if item.name.is_empty() {
            return Err(GenerateError::MissingField {
                record: record.to_string(),
                field: "N",
            });
        }
        self.field("N", &item.name)?;
        self.opt_text("D", &item.description)?;
        self.extra(&item.extra)?;
        self.end_record()
    }

    fn register(&mut self, register: &Register) -> Result<(), GenerateError> {
        let key = &register.key;
        let header = key.account_type.header().ok_or_else(|| GenerateError::MisplacedRecord {
            record: key.to_string(),
            message: format!("account type '{}' has no register header", key.account_type.as_str()),
        })?;

        self.line(&header)?;
        for (index, tx) in register.transactions.iter().enumerate() {
            let record = format!("{}#{}", key, index);
            match tx {
                Transaction::Banking(t) if !key.account_type.is_investment() => {
                    if t.date.is_none() {
                        return Err(GenerateError::MissingField { record, field: "D" });
                    }
                    self.banking_fields(t)?;
                    self.extra(&t.extra)?;
                }
                Transaction::Investment(t) if key.account_type.is_investment() => {
                    if t.date.is_none() {
                        return Err(GenerateError::MissingField { record, field: "D" });
                    }
                    self.investment_fields(t)?;
                    self.extra(&t.extra)?;
                }
                other => {
                    return Err(GenerateError::MisplacedRecord {
                        record,
                        message: format!("{} cannot appear in a {} register", variant_name(other), header),
                    });
                }
            }
            self.end_record()?;
        }
        Ok(())
    }

    fn memorized(&mut self, index: usize, tx: &Transaction) -> Result<(), GenerateError> {
        let record = format!("Memorized#{}", index);
        match tx {
            Transaction::MemorizedBanking(m) if m.kind != MemorizedKind::Investment => {
                self.line(m.kind.code())?;
                self.banking_fields(&m.transaction)?;
                self.amortization(&m.amortization)?;
                self.extra(&m.transaction.extra)?;
            }
            Transaction::MemorizedInvestment(m) if m.kind == MemorizedKind::Investment => {
                self.line(m.kind.code())?;
                self.investment_fields(&m.transaction)?;
                self.amortization(&m.amortization)?;
                self.extra(&m.transaction.extra)?;
            }
            Transaction::MemorizedBanking(_) | Transaction::MemorizedInvestment(_) => {
                return Err(GenerateError::MisplacedRecord {
                    record,
                    message: "only investment templates may use the KI type".to_string(),
                });
            }
            other => {
                return Err(GenerateError::MisplacedRecord {
                    record,
                    message: format!("{} cannot appear in the memorized list", variant_name(other)),
                });
            }
        }
        self.end_record()
    }
}

fn variant_name(tx: &Transaction) -> &'static str {
    match tx {
        Transaction::Banking(_) => "banking transaction",
        Transaction::Investment(_) => "investment transaction",
        Transaction::MemorizedBanking(_) => "memorized banking transaction",
        Transaction::MemorizedInvestment(_) => "memorized investment transaction",
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Stream canonical QIF for `doc` into `out`. Returns the number of records.
pub fn write_document<W: Write>(
    doc: &Document,
    options: &GenerateOptions,
    out: W,
) -> Result<usize, GenerateError> {
    // Named registers are only reachable through their account
    for register in &doc.registers {
        if let Some(name) = &register.key.name {
            if doc.account(name).is_none() {
                return Err(GenerateError::UnregisteredAccount {
                    record: register.key.to_string(),
                    account: name.clone(),
                });
            }
        }
    }

    let mut writer = QifWriter {
        out,
        options,
        records: 0,
    };

    if doc.options.all_transfers {
        writer.line("!Option:AllXfr")?;
    }

    for register in doc.registers.iter().filter(|r| r.key.name.is_none()) {
        writer.register(register)?;
    }

    for (index, account) in doc.accounts.iter().enumerate() {
        writer.line(&EntityKind::Account.header())?;
        writer.account(&format!("Account#{}", index), account)?;

        let first_with_name = doc.accounts.iter().position(|a| a.name == account.name) == Some(index);
        if first_with_name {
            for register in doc.registers_named(&account.name) {
                writer.register(register)?;
            }
        }
    }

    if !doc.categories.is_empty() {
        writer.line(&EntityKind::Category.header())?;
        for (index, item) in doc.categories.iter().enumerate() {
            writer.category(&format!("Category#{}", index), item)?;
        }
    }

    if !doc.classes.is_empty() {
        writer.line(&EntityKind::Class.header())?;
        for (index, item) in doc.classes.iter().enumerate() {
            writer.class(&format!("Class#{}", index), item)?;
        }
    }

    if !doc.memorized.is_empty() {
        writer.line(&EntityKind::Memorized.header())?;
        for (index, tx) in doc.memorized.iter().enumerate() {
            writer.memorized(index, tx)?;
        }
    }

    writer.out.flush()?;
    info!("generated {} QIF records", writer.records);
    Ok(writer.records)
}

/// Generate with default options.
pub fn generate(doc: &Document) -> Result<String, GenerateError> {
    generate_with(doc, &GenerateOptions::default())
}

pub fn generate_with(doc: &Document, options: &GenerateOptions) -> Result<String, GenerateError> {
    let mut buffer = Vec::new();
    write_document(doc, options, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| GenerateError::Io(err.to_string()))
}
