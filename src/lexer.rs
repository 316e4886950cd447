// ✂️ Record Lexer - raw QIF text → header-tagged blocks of field lines
//
// Line oriented and incremental: feed lines with `push_line`, drain the
// trailing state with `finish`. Headers persist as context until the next
// header; a bare `^` closes the current block.

use crate::entities::AccountType;
use crate::error::QifError;
use serde::{Deserialize, Serialize};

// ============================================================================
// FIELD CODE TABLES
// ============================================================================

pub const BANKING_CODES: &[&str] = &[
    "D", "T", "U", "C", "N", "P", "M", "A", "L", "F", "S", "E", "$", "%",
];

pub const INVESTMENT_CODES: &[&str] = &[
    "D", "N", "Y", "I", "Q", "T", "U", "C", "P", "M", "O", "L", "$",
];

pub const ACCOUNT_CODES: &[&str] = &["N", "T", "D", "L", "/", "$"];

pub const CATEGORY_CODES: &[&str] = &["N", "D", "T", "I", "E", "B", "R"];

pub const CLASS_CODES: &[&str] = &["N", "D"];

/// Memorized records carry either register table, so the lexer accepts the
/// union; the `K` type tag picks the table at parse time.
pub const MEMORIZED_CODES: &[&str] = &[
    "D", "T", "U", "C", "N", "P", "M", "A", "L", "F", "S", "E", "$", "%", "Y", "I", "Q", "O",
    "1", "2", "3", "4", "5", "6", "7",
];

// ============================================================================
// HEADERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Register(AccountType),
    Account,
    Category,
    Class,
    Memorized,
}

impl EntityKind {
    /// Canonical header line for this entity.
    pub fn header(&self) -> String {
        match self {
            EntityKind::Register(account_type) => format!("!Type:{}", account_type.as_str()),
            EntityKind::Account => "!Account".to_string(),
            EntityKind::Category => "!Type:Cat".to_string(),
            EntityKind::Class => "!Type:Class".to_string(),
            EntityKind::Memorized => "!Type:Memorized".to_string(),
        }
    }

    pub fn field_codes(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Register(AccountType::Investment) => INVESTMENT_CODES,
            EntityKind::Register(_) => BANKING_CODES,
            EntityKind::Account => ACCOUNT_CODES,
            EntityKind::Category => CATEGORY_CODES,
            EntityKind::Class => CLASS_CODES,
            EntityKind::Memorized => MEMORIZED_CODES,
        }
    }
}

/// Document-level option lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// `!Option:AllXfr`
    AllTransfers,
    /// `!Option:AutoSwitch` / `!Clear:AutoSwitch`
    AutoSwitch { enabled: bool },
}

/// What a `!` line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLine {
    Entity(EntityKind),
    Directive(Directive),
    /// `!Type:` with a type outside the grammar (Prices, Invoice, ...)
    Unsupported(String),
    Unknown(String),
}

/// Classify a line starting with `!`. Tokens match case-insensitively.
pub fn classify_header(text: &str) -> HeaderLine {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();

    match lower.as_str() {
        "!account" => return HeaderLine::Entity(EntityKind::Account),
        "!option:allxfr" => return HeaderLine::Directive(Directive::AllTransfers),
        "!option:autoswitch" => return HeaderLine::Directive(Directive::AutoSwitch { enabled: true }),
        "!clear:autoswitch" => return HeaderLine::Directive(Directive::AutoSwitch { enabled: false }),
        _ => {}
    }

    let Some(token) = lower.strip_prefix("!type:") else {
        return HeaderLine::Unknown(text.to_string());
    };
    match token.trim() {
        "cat" => HeaderLine::Entity(EntityKind::Category),
        "class" => HeaderLine::Entity(EntityKind::Class),
        "memorized" => HeaderLine::Entity(EntityKind::Memorized),
        other => match AccountType::from_qif(other) {
            AccountType::Other(_) => HeaderLine::Unsupported(text.to_string()),
            known => HeaderLine::Entity(EntityKind::Register(known)),
        },
    }
}

// ============================================================================
// BLOCKS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLine {
    /// 1-based source line
    pub line: usize,
    pub code: String,
    pub value: String,
}

/// Field lines between a header (or the previous caret) and the next `^`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: EntityKind,
    pub start_line: usize,
    pub fields: Vec<FieldLine>,
}

impl Block {
    pub fn first(&self, code: &str) -> Option<&FieldLine> {
        self.fields.iter().find(|f| f.code == code)
    }
}

/// Split a field line into its code and raw value.
///
/// A code known to the entity's table is a single character; the memorized
/// type tag is `K` plus a letter. Unknown codes take one character, or two
/// when the second is a digit (`Z9`), so that they survive regeneration.
pub fn split_field(kind: &EntityKind, text: &str) -> (String, String) {
    let mut chars = text.char_indices();
    let Some((_, first)) = chars.next() else {
        return (String::new(), String::new());
    };
    let second = chars.next();
    let rest_at = |idx: Option<(usize, char)>| idx.map(|(i, _)| i).unwrap_or(text.len());

    if *kind == EntityKind::Memorized && first == 'K' {
        let end = match second {
            Some((i, c)) if c.is_ascii_alphabetic() => i + c.len_utf8(),
            _ => first.len_utf8(),
        };
        return (text[..end].to_string(), text[end..].to_string());
    }

    let first_code = first.to_string();
    if kind.field_codes().contains(&first_code.as_str()) {
        return (first_code, text[rest_at(second)..].to_string());
    }

    match second {
        Some((i, c)) if c.is_ascii_digit() => {
            let end = i + c.len_utf8();
            (text[..end].to_string(), text[end..].to_string())
        }
        _ => (first_code, text[rest_at(second)..].to_string()),
    }
}

// ============================================================================
// LEXER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum LexEvent {
    /// A recognized entity header opened a new context
    Header { kind: EntityKind, line: usize },
    Directive { directive: Directive, line: usize },
    Block(Block),
    Error(QifError),
}

#[derive(Debug, Clone, PartialEq)]
enum Context {
    None,
    Entity(EntityKind),
    /// Lines are dropped until the next header
    Skipping,
}

pub struct Lexer {
    line_no: usize,
    context: Context,
    start_line: usize,
    fields: Vec<FieldLine>,
}

impl Lexer {
    pub fn new() -> Self {
        Lexer {
            line_no: 0,
            context: Context::None,
            start_line: 0,
            fields: Vec::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_no
    }

    /// Feed one physical line (with or without its line terminator).
    pub fn push_line(&mut self, raw: &str) -> Vec<LexEvent> {
        self.line_no += 1;
        // Field values keep trailing whitespace; only structure is trimmed
        let line = raw.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();
        let mut events = Vec::new();

        if trimmed.is_empty() {
            return events;
        }

        if trimmed.starts_with('!') {
            self.interrupt(&mut events);
            self.enter_header(trimmed, &mut events);
            return events;
        }

        if trimmed == "^" {
            if let Context::Entity(kind) = &self.context {
                if !self.fields.is_empty() {
                    events.push(LexEvent::Block(Block {
                        kind: kind.clone(),
                        start_line: self.start_line,
                        fields: std::mem::take(&mut self.fields),
                    }));
                }
            }
            return events;
        }

        if matches!(self.context, Context::None) {
            events.push(LexEvent::Error(QifError::format(
                self.line_no,
                "field line before any header",
            )));
            self.context = Context::Skipping;
            return events;
        }
        let (code, value) = match &self.context {
            Context::Entity(kind) => split_field(kind, line.trim_start()),
            _ => return events,
        };

        if self.fields.is_empty() {
            self.start_line = self.line_no;
        }
        self.fields.push(FieldLine {
            line: self.line_no,
            code,
            value,
        });
        events
    }

    /// End of input. A non-empty unterminated block is reported and dropped.
    pub fn finish(&mut self) -> Vec<LexEvent> {
        let mut events = Vec::new();
        if !self.fields.is_empty() {
            events.push(LexEvent::Error(QifError::format(
                self.start_line,
                format!(
                    "truncated record: {} field line(s) without a closing '^'",
                    self.fields.len()
                ),
            )));
            self.fields.clear();
        }
        events
    }

    fn interrupt(&mut self, events: &mut Vec<LexEvent>) {
        if self.fields.is_empty() {
            return;
        }
        events.push(LexEvent::Error(QifError::format(
            self.start_line,
            format!(
                "record interrupted by header at line {} before its closing '^'",
                self.line_no
            ),
        )));
        self.fields.clear();
    }

    fn enter_header(&mut self, text: &str, events: &mut Vec<LexEvent>) {
        let line = self.line_no;
        match classify_header(text) {
            HeaderLine::Entity(kind) => {
                self.context = Context::Entity(kind.clone());
                events.push(LexEvent::Header { kind, line });
            }
            HeaderLine::Directive(directive) => {
                events.push(LexEvent::Directive { directive, line });
            }
            HeaderLine::Unsupported(header) => {
                self.context = Context::Skipping;
                events.push(LexEvent::Error(QifError::UnsupportedEntity { line, header }));
            }
            HeaderLine::Unknown(header) => {
                self.context = Context::Skipping;
                events.push(LexEvent::Error(QifError::format(
                    line,
                    format!("unknown header line '{}'", header),
                )));
            }
        }
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lex a complete text buffer.
pub fn lex(text: &str) -> Vec<LexEvent> {
    let mut lexer = Lexer::new();
    let mut events: Vec<LexEvent> = text.lines().flat_map(|line| lexer.push_line(line)).collect();
    events.extend(lexer.finish());
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(events: &[LexEvent]) -> Vec<&Block> {
        events
            .iter()
            .filter_map(|e| match e {
                LexEvent::Block(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    fn errors(events: &[LexEvent]) -> Vec<&QifError> {
        events
            .iter()
            .filter_map(|e| match e {
                LexEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_blocks_carry_header_context() {
        let text = "!Type:Bank\r\nD03/15/2023\r\nT-50.00\r\n^\r\n\r\nD03/16/2023\r\nT10.00\r\n^\r\n";
        let events = lex(text);
        let blocks = blocks(&events);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, EntityKind::Register(AccountType::Bank));
        assert_eq!(blocks[0].start_line, 2);
        assert_eq!(blocks[0].fields[1].code, "T");
        assert_eq!(blocks[0].fields[1].value, "-50.00");
        assert_eq!(blocks[1].start_line, 6);
        assert!(errors(&events).is_empty());
    }

    #[test]
    fn test_header_tokens_case_insensitive() {
        assert_eq!(
            classify_header("!type:oth l"),
            HeaderLine::Entity(EntityKind::Register(AccountType::OtherLiability))
        );
        assert_eq!(classify_header("!Type:Cat"), HeaderLine::Entity(EntityKind::Category));
        assert_eq!(
            classify_header("!Option:AllXfr"),
            HeaderLine::Directive(Directive::AllTransfers)
        );
        assert_eq!(
            classify_header("!Type:Prices"),
            HeaderLine::Unsupported("!Type:Prices".to_string())
        );
        assert!(matches!(classify_header("!Bogus"), HeaderLine::Unknown(_)));
    }

    #[test]
    fn test_trailing_whitespace_kept_in_values() {
        let events = lex("!Type:Bank\r\nD03/15/2023\r\nPx \r\nMtwo  \r\n ^ \r\n");
        let blocks = blocks(&events);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].first("P").unwrap().value, "x ");
        assert_eq!(blocks[0].first("M").unwrap().value, "two  ");
        assert!(errors(&events).is_empty());
    }

    #[test]
    fn test_unknown_code_with_digit() {
        let bank = EntityKind::Register(AccountType::Bank);
        assert_eq!(split_field(&bank, "Z9hello"), ("Z9".to_string(), "hello".to_string()));
        assert_eq!(split_field(&bank, "Xabc"), ("X".to_string(), "abc".to_string()));
        assert_eq!(split_field(&bank, "T1,000.00"), ("T".to_string(), "1,000.00".to_string()));
    }

    #[test]
    fn test_memorized_codes() {
        let memorized = EntityKind::Memorized;
        assert_eq!(split_field(&memorized, "KC"), ("KC".to_string(), String::new()));
        assert_eq!(split_field(&memorized, "112/01/2023"), ("1".to_string(), "12/01/2023".to_string()));
        assert_eq!(split_field(&memorized, "YAAPL"), ("Y".to_string(), "AAPL".to_string()));
    }

    #[test]
    fn test_truncated_block_reported() {
        let events = lex("!Type:Bank\nD03/15/2023\nT-1.00\n^\nD03/16/2023\nT-2.00\n");
        assert_eq!(blocks(&events).len(), 1);
        let errs = errors(&events);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line(), 5);
    }

    #[test]
    fn test_empty_trailing_block_discarded() {
        let events = lex("!Type:Bank\nD03/15/2023\nT-1.00\n^\n\n^\n");
        assert_eq!(blocks(&events).len(), 1);
        assert!(errors(&events).is_empty());
    }

    #[test]
    fn test_unsupported_entity_skipped() {
        let events = lex("!Type:Prices\n\"AAPL\",150.00,\"3/15/23\"\n^\n!Type:Cash\nD3/15/23\nT-5.00\n^\n");
        let errs = errors(&events);
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], QifError::UnsupportedEntity { line: 1, .. }));
        let blocks = blocks(&events);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, EntityKind::Register(AccountType::Cash));
    }

    #[test]
    fn test_content_before_header() {
        let events = lex("D03/15/2023\nT-1.00\n^\n");
        assert!(blocks(&events).is_empty());
        assert_eq!(errors(&events).len(), 1);
    }

    #[test]
    fn test_header_interrupting_block() {
        let events = lex("!Type:Bank\nD03/15/2023\n!Type:Cash\nD03/16/2023\nT-1.00\n^\n");
        assert_eq!(errors(&events).len(), 1);
        let blocks = blocks(&events);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, EntityKind::Register(AccountType::Cash));
    }
}
