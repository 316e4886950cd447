// 📤 CSV Export - register transactions as flat CSV rows
//
// One row per register transaction with a fixed column set; banking and
// investment registers get separate tables since their columns differ.

use crate::codecs::{format_date, AmountCodec, DateFormat};
use crate::document::Document;
use crate::entities::{BankingTransaction, InvestmentTransaction, Transaction};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingRow {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Account")]
    pub account: String,

    #[serde(rename = "Type")]
    pub account_type: String,

    #[serde(rename = "Number")]
    pub number: String,

    #[serde(rename = "Payee")]
    pub payee: String,

    #[serde(rename = "Memo")]
    pub memo: String,

    #[serde(rename = "Category")]
    pub category: String,

    #[serde(rename = "Amount")]
    pub amount: String,

    #[serde(rename = "Status")]
    pub status: String,

    /// `category=amount` pairs joined with `|`
    #[serde(rename = "Splits")]
    pub splits: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRow {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Account")]
    pub account: String,

    #[serde(rename = "Action")]
    pub action: String,

    #[serde(rename = "Security")]
    pub security: String,

    #[serde(rename = "Quantity")]
    pub quantity: String,

    #[serde(rename = "Price")]
    pub price: String,

    #[serde(rename = "Amount")]
    pub amount: String,

    #[serde(rename = "Commission")]
    pub commission: String,

    #[serde(rename = "Memo")]
    pub memo: String,

    #[serde(rename = "Transfer Account")]
    pub transfer_account: String,

    #[serde(rename = "Status")]
    pub status: String,
}

// ============================================================================
// ROW BUILDING
// ============================================================================

fn iso(date: Option<NaiveDate>) -> String {
    date.map(|d| format_date(d, DateFormat::Iso)).unwrap_or_default()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn banking_row(account: &str, account_type: &str, tx: &BankingTransaction, amounts: &AmountCodec) -> BankingRow {
    let splits = tx
        .splits
        .iter()
        .map(|s| format!("{}={}", s.category, amounts.format(s.amount)))
        .collect::<Vec<_>>()
        .join("|");

    BankingRow {
        date: iso(tx.date),
        account: account.to_string(),
        account_type: account_type.to_string(),
        number: text(&tx.number),
        payee: text(&tx.payee),
        memo: text(&tx.memo),
        category: text(&tx.category),
        amount: amounts.format(tx.amount),
        status: tx.cleared.glyph().to_string(),
        splits,
    }
}

fn investment_row(account: &str, tx: &InvestmentTransaction, amounts: &AmountCodec) -> InvestmentRow {
    let number = |v: Option<f64>| v.map(|v| amounts.format_number(v)).unwrap_or_default();
    let money = |v: Option<f64>| v.map(|v| amounts.format(v)).unwrap_or_default();

    InvestmentRow {
        date: iso(tx.date),
        account: account.to_string(),
        action: tx.action.code().to_string(),
        security: text(&tx.security),
        quantity: number(tx.quantity),
        price: number(tx.price),
        amount: money(tx.amount),
        commission: money(tx.commission),
        memo: text(&tx.memo),
        transfer_account: text(&tx.transfer_account),
        status: tx.cleared.glyph().to_string(),
    }
}

/// Banking rows for every non-investment register, in document order.
pub fn banking_rows(doc: &Document, amounts: &AmountCodec) -> Vec<BankingRow> {
    doc.registers
        .iter()
        .flat_map(|register| {
            let account = register.key.name.clone().unwrap_or_default();
            let account_type = register.key.account_type.as_str().to_string();
            register
                .transactions
                .iter()
                .filter_map(Transaction::as_banking)
                .map(move |tx| banking_row(&account, &account_type, tx, amounts))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn investment_rows(doc: &Document, amounts: &AmountCodec) -> Vec<InvestmentRow> {
    doc.registers
        .iter()
        .flat_map(|register| {
            let account = register.key.name.clone().unwrap_or_default();
            register
                .transactions
                .iter()
                .filter_map(Transaction::as_investment)
                .map(move |tx| investment_row(&account, tx, amounts))
                .collect::<Vec<_>>()
        })
        .collect()
}

// ============================================================================
// WRITERS
// ============================================================================

fn write_rows<W: Write, T: Serialize>(rows: &[T], out: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row).context("Failed to serialize CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(rows.len())
}

pub fn write_banking_csv<W: Write>(doc: &Document, amounts: &AmountCodec, out: W) -> Result<usize> {
    write_rows(&banking_rows(doc, amounts), out)
}

pub fn write_investment_csv<W: Write>(doc: &Document, amounts: &AmountCodec, out: W) -> Result<usize> {
    write_rows(&investment_rows(doc, amounts), out)
}

/// Write `banking.csv` and, when the document has investment registers,
/// `investments.csv` into `dir`.
pub fn export_to_dir(doc: &Document, amounts: &AmountCodec, dir: &Path) -> Result<(usize, usize)> {
    let banking_path = dir.join("banking.csv");
    let file = std::fs::File::create(&banking_path)
        .with_context(|| format!("Failed to create {}", banking_path.display()))?;
    let banking = write_banking_csv(doc, amounts, file)?;

    let rows = investment_rows(doc, amounts);
    if rows.is_empty() {
        return Ok((banking, 0));
    }
    let investment_path = dir.join("investments.csv");
    let file = std::fs::File::create(&investment_path)
        .with_context(|| format!("Failed to create {}", investment_path.display()))?;
    let investments = write_rows(&rows, file)?;
    Ok((banking, investments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const SAMPLE: &str = "\
!Account
NChecking
TBank
^
!Type:Bank
D03/15/2023
T-100.00
CX
PMarket
SFood:Groceries
$-60.00
SHousehold
$-40.00
^
!Account
NBrokerage
TInvst
^
!Type:Invst
D03/17/2023
NBuy
YAAPL
I150.25
Q10
T1502.50
O4.95
^
";

    #[test]
    fn test_banking_rows() {
        let (doc, errors) = parse(SAMPLE);
        assert!(errors.is_empty());
        let rows = banking_rows(&doc, &AmountCodec::new());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2023-03-15");
        assert_eq!(rows[0].account, "Checking");
        assert_eq!(rows[0].account_type, "Bank");
        assert_eq!(rows[0].amount, "-100.00");
        assert_eq!(rows[0].status, "X");
        assert_eq!(rows[0].splits, "Food:Groceries=-60.00|Household=-40.00");
    }

    #[test]
    fn test_investment_csv_header_and_values() {
        let (doc, _) = parse(SAMPLE);
        let mut out = Vec::new();
        let written = write_investment_csv(&doc, &AmountCodec::new(), &mut out).unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Account,Action,Security,Quantity,Price,Amount,Commission,Memo,Transfer Account,Status")
        );
        assert_eq!(lines.next(), Some("2023-03-17,Brokerage,Buy,AAPL,10,150.25,1502.50,4.95,,,"));
    }

    #[test]
    fn test_banking_csv_reads_back() {
        let (doc, _) = parse(SAMPLE);
        let mut out = Vec::new();
        write_banking_csv(&doc, &AmountCodec::new(), &mut out).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        let rows: Vec<BankingRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, banking_rows(&doc, &AmountCodec::new()));
    }
}
