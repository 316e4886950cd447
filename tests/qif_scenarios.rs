// End-to-end scenarios through the public API: parse → recognize → generate.

use chrono::NaiveDate;
use qif_interchange::{
    generate, parse, parse_with, recognize_transfers, AccountKey, AccountType, DateCodec,
    DateFormat, ErrorKind, InvestmentAction, ParseOptions, QifError, Transaction, TransferOptions,
    TransferScope, TransferState,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const TWO_ACCOUNTS: &str = "\
!Account
NChecking
TBank
^
!Type:Bank
D03/15/2023
T-200.00
PTransfer to savings
L[Savings]
^
!Account
NSavings
TBank
^
!Type:Bank
D03/15/2023
T200.00
PTransfer from checking
L[Checking]
^
";

#[test]
fn simple_banking_transaction() {
    let text = "!Type:Bank\nD03/15/2023\nT-50.00\nN1001\nPGrocery Store\nMFood for the week\nLFood:Groceries\n^\n";
    let (doc, errors) = parse(text);

    assert!(errors.is_empty());
    let register = doc
        .register(&AccountKey::unnamed(AccountType::Bank))
        .expect("unnamed bank register");
    assert_eq!(register.transactions.len(), 1);

    let tx = register.transactions[0].as_banking().unwrap();
    assert_eq!(tx.date, Some(ymd(2023, 3, 15)));
    assert_eq!(tx.amount, -50.0);
    assert_eq!(tx.number.as_deref(), Some("1001"));
    assert_eq!(tx.payee.as_deref(), Some("Grocery Store"));
    assert_eq!(tx.memo.as_deref(), Some("Food for the week"));
    assert_eq!(tx.category.as_deref(), Some("Food:Groceries"));
}

#[test]
fn split_transaction_balanced() {
    let text = "\
!Type:Bank
D03/15/2023
T-100.00
PCorner Market
SFood:Groceries
$-60.00
SHousehold
ESupplies
$-40.00
^
";
    let (doc, errors) = parse(text);
    assert!(errors.is_empty());

    let tx = doc.registers[0].transactions[0].as_banking().unwrap();
    assert_eq!(tx.splits.len(), 2);
    assert_eq!(tx.splits[1].category, "Household");
    assert_eq!(tx.splits[1].memo.as_deref(), Some("Supplies"));
    assert!(tx.warnings.is_empty());
}

#[test]
fn split_mismatch_is_one_invariant_violation() {
    let text = "!Type:Bank\nD03/15/2023\nT-100.00\nSFood\n$-60.00\nSHousehold\n$-40.01\n^\nD03/16/2023\nT-1.00\n^\n";
    let (doc, errors) = parse(text);

    assert_eq!(doc.transaction_count(), 2);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::InvariantViolation);
    assert_eq!(doc.registers[0].transactions[0].warnings().len(), 1);
}

#[test]
fn investment_buy() {
    let text = "!Type:Invst\nD03/15/2023\nNBuy\nYAAPL\nI150.00\nQ10\nT1500.00\n^\n";
    let (doc, errors) = parse(text);
    assert!(errors.is_empty());

    let tx = doc.registers[0].transactions[0].as_investment().unwrap();
    assert_eq!(tx.action, InvestmentAction::Buy);
    assert_eq!(tx.security.as_deref(), Some("AAPL"));
    assert_eq!(tx.price, Some(150.0));
    assert_eq!(tx.quantity, Some(10.0));
    assert_eq!(tx.amount, Some(1500.0));
    assert_eq!(doc.registers[0].transactions[0].amount(), Some(-1500.0));
}

#[test]
fn transfer_legs_link_both_ways() {
    let (doc, errors) = parse(TWO_ACCOUNTS);
    assert!(errors.is_empty());

    let options = TransferOptions::new().with_scope(TransferScope::All);
    let doc = recognize_transfers(doc, &options);

    let checking = AccountKey::named(AccountType::Bank, "Checking");
    let savings = AccountKey::named(AccountType::Bank, "Savings");
    let a = doc.register(&checking).unwrap().transactions[0].as_banking().unwrap();
    let b = doc.register(&savings).unwrap().transactions[0].as_banking().unwrap();

    assert!(matches!(&a.transfer, TransferState::Linked(r) if r.key == savings && r.index == 0));
    assert!(matches!(&b.transfer, TransferState::Linked(r) if r.key == checking && r.index == 0));
}

#[test]
fn transfer_two_day_shift_unresolved() {
    let shifted = TWO_ACCOUNTS.replacen("D03/15/2023\nT200.00", "D03/17/2023\nT200.00", 1);
    let (doc, _) = parse(&shifted);

    let options = TransferOptions::new().with_scope(TransferScope::All);
    let doc = recognize_transfers(doc, &options);

    for register in &doc.registers {
        let tx = register.transactions[0].as_banking().unwrap();
        assert_eq!(tx.transfer, TransferState::Unresolved);
    }
}

#[test]
fn all_xfr_option_widens_scope() {
    let text = format!("!Option:AllXfr\n{}", TWO_ACCOUNTS);
    let (doc, _) = parse(&text);
    assert!(doc.options.all_transfers);

    let doc = recognize_transfers(doc, &TransferOptions::default());
    let linked = doc
        .transactions()
        .filter(|(_, tx)| matches!(tx.as_banking().map(|b| &b.transfer), Some(TransferState::Linked(_))))
        .count();
    assert_eq!(linked, 2);
}

#[test]
fn unknown_field_preserved_and_reemitted() {
    let text = "!Type:Bank\nD03/15/2023\nT-50.00\nZ9custom value\nPGrocery Store\n^\n";
    let (doc, errors) = parse(text);
    assert!(errors.is_empty());

    let tx = doc.registers[0].transactions[0].as_banking().unwrap();
    assert_eq!(tx.extra, vec![("Z9".to_string(), "custom value".to_string())]);

    let regenerated = generate(&doc).unwrap();
    assert!(regenerated.contains("\nZ9custom value\n"));

    let (again, _) = parse(&regenerated);
    assert_eq!(again, doc);
}

#[test]
fn round_trip_full_document() {
    let text = "\
!Option:AllXfr
!Account
NChecking
TBank
DEveryday
^
!Type:Bank
D03/15/2023
T-100.00
C*
N1002
PCorner Market
A12 Main St
ASpringfield
LFood
F
SFood:Groceries
$-60.00
%60
SHousehold
ESupplies
$-40.00
^
!Account
NVisa
TCCard
L5000.00
/03/31/2023
$-1250.75
^
!Type:CCard
D03/20/2023
T-35.20
CR
PFuel Stop
LAuto:Fuel/Business
^
!Account
NBrokerage
TInvst
^
!Type:Invst
D03/17/2023
NSellX
YMSFT
I280.5
Q4
T1122.00
O7.95
L[Checking]
$1114.05
^
!Type:Cat
NAuto:Fuel
DGasoline
T
E
B150.00
RSchedule C
^
NSalary
I
^
!Type:Class
NBusiness
DSide work
^
!Type:Memorized
KE
T-75.00
PPower Co
LUtilities
^
KI
NDiv
YVTI
T12.34
^
";
    let (doc, errors) = parse(text);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(doc.accounts.len(), 3);
    assert_eq!(doc.transaction_count(), 3);
    assert_eq!(doc.memorized.len(), 2);
    assert!(matches!(doc.memorized[1], Transaction::MemorizedInvestment(_)));

    let regenerated = generate(&doc).unwrap();
    let (again, errors) = parse(&regenerated);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(again, doc);

    // Canonical output is a fixed point
    assert_eq!(generate(&again).unwrap(), regenerated);
}

#[test]
fn date_disambiguation() {
    let us = "!Type:Bank\nD03/15/2023\nT-1.00\n^\n";
    let eu = "!Type:Bank\nD15/03/2023\nT-1.00\n^\n";

    let (doc, errors) = parse(us);
    assert!(errors.is_empty());
    assert_eq!(doc.registers[0].transactions[0].date(), Some(ymd(2023, 3, 15)));

    let (doc, errors) = parse(eu);
    assert_eq!(doc.transaction_count(), 0);
    assert!(matches!(errors.as_slice(), [QifError::FieldValue { line: 2, .. }]));

    let day_first = ParseOptions::new().with_dates(DateCodec::with_formats(DateFormat::DAY_FIRST_PRIORITY.to_vec()));
    let outcome = parse_with(eu, &day_first);
    assert!(outcome.is_clean());
    assert_eq!(outcome.document.registers[0].transactions[0].date(), Some(ymd(2023, 3, 15)));
}

#[test]
fn two_digit_year_pivot() {
    let (doc, _) = parse("!Type:Cash\nD3/15'68\nT-1.00\n^\nD3/15/69\nT-2.00\n^\n");
    let dates: Vec<_> = doc.registers[0].transactions.iter().map(|t| t.date()).collect();
    assert_eq!(dates, vec![Some(ymd(2068, 3, 15)), Some(ymd(1969, 3, 15))]);
}

#[test]
fn truncated_file_keeps_earlier_records() {
    let (doc, errors) = parse("!Type:Bank\nD03/15/2023\nT-1.00\n^\nD03/16/2023\nT-2.00");
    assert_eq!(doc.transaction_count(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Format);
}
