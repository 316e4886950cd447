use anyhow::{bail, Context, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

// Use library instead of local modules
use qif_interchange::{
    flag_all_transfers, parse_reader, write_banking_csv, write_document, write_investment_csv,
    DocumentValidator, ErrorKind, ParseOutcome, QifConfig, TransferRecognizer,
};

const USAGE: &str = "usage: qif-interchange <check|normalize|csv|json> <file.qif> [--config cfg.json]";

struct Args {
    command: String,
    file: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut positional = Vec::new();
    let mut config = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config needs a file path")?;
            config = Some(PathBuf::from(path));
        } else {
            positional.push(arg);
        }
    }

    if positional.len() != 2 {
        bail!("{}", USAGE);
    }
    let file = PathBuf::from(positional.pop().unwrap_or_default());
    let command = positional.pop().unwrap_or_default();
    Ok(Args { command, file, config })
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => QifConfig::load(path)?,
        None => QifConfig::default(),
    };

    let outcome = load(&args.file, &config)?;

    match args.command.as_str() {
        "check" => run_check(&outcome),
        "normalize" => run_normalize(outcome, &config),
        "csv" => run_csv(&outcome, &config),
        "json" => run_json(&outcome),
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

fn load(path: &Path, config: &QifConfig) -> Result<ParseOutcome> {
    let file = File::open(path).with_context(|| format!("Failed to open QIF file: {}", path.display()))?;
    parse_reader(BufReader::new(file), &config.parse)
        .with_context(|| format!("Failed to parse QIF file: {}", path.display()))
}

fn run_check(outcome: &ParseOutcome) -> Result<()> {
    println!("🔍 QIF check");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let doc = &outcome.document;
    println!("✓ {} accounts", doc.accounts.len());
    println!("✓ {} registers, {} transactions", doc.registers.len(), doc.transaction_count());
    println!("✓ {} categories, {} classes, {} memorized", doc.categories.len(), doc.classes.len(), doc.memorized.len());

    let count = |kind: ErrorKind| outcome.errors.iter().filter(|e| e.kind() == kind).count();
    println!(
        "\n📋 Parse: {} format, {} field value, {} unsupported, {} invariant",
        count(ErrorKind::Format),
        count(ErrorKind::FieldValue),
        count(ErrorKind::UnsupportedEntity),
        count(ErrorKind::InvariantViolation)
    );
    for error in &outcome.errors {
        println!("   {}", error);
    }

    let report = DocumentValidator::new().validate(doc);
    println!("\n📋 {}", report.summary());
    for issue in &report.issues {
        println!("   [{:?}] {} {}: {}", issue.severity, issue.location, issue.field, issue.issue);
    }

    if outcome.failures().next().is_some() {
        eprintln!("\n❌ Input has errors");
        std::process::exit(1);
    }
    println!("\n✅ OK");
    Ok(())
}

fn run_normalize(outcome: ParseOutcome, config: &QifConfig) -> Result<()> {
    let mut doc = outcome.document;
    if config.recognize_transfers {
        flag_all_transfers(&mut doc);
        let report = TransferRecognizer::with_options(config.transfers.clone()).recognize(&mut doc);
        eprintln!("🔁 {}", report.summary());
    }
    for error in &outcome.errors {
        eprintln!("⚠️  {}", error);
    }

    let stdout = io::stdout();
    write_document(&doc, &config.generate, stdout.lock()).context("Failed to generate QIF")?;
    Ok(())
}

fn run_csv(outcome: &ParseOutcome, config: &QifConfig) -> Result<()> {
    let amounts = &config.generate.amounts;
    let stdout = io::stdout();
    let rows = write_banking_csv(&outcome.document, amounts, stdout.lock())?;
    eprintln!("✓ {} banking rows", rows);

    let has_investments = outcome
        .document
        .registers
        .iter()
        .any(|r| r.key.account_type.is_investment());
    if has_investments {
        println!();
        let rows = write_investment_csv(&outcome.document, amounts, stdout.lock())?;
        eprintln!("✓ {} investment rows", rows);
    }
    Ok(())
}

fn run_json(outcome: &ParseOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("Failed to serialize document")?;
    println!("{}", json);
    Ok(())
}
