//! Espresso PLA truth tables and cover validation.
//!
//! The rule set is authored as a truth table over the six crisp rule inputs
//! and minimized offline. This module parses the table and checks that a
//! [`RuleSet`] is still a minimal cover of it:
//!
//! 1. the table's input labels match [`RuleInput`] column order
//! 2. the cover agrees with the table on every specified assignment
//! 3. no clause is redundant
//! 4. no literal can be dropped from any clause (every clause is prime)
//!
//! Supported PLA subset: `.i`, `.o 1`, `.ilb`, `.ob`, `.p`, `.type`
//! (`f`, `fd`, `fr`, `fdr`), `.e`/`.end`, `#` comments, and cube rows with
//! `0`/`1`/`-` inputs.

use super::inputs::RuleInput;
use super::rules::{Literal, RuleSet};
use serde::Serialize;
use thiserror::Error;

/// The truth table the shipped rule set was minimized from.
pub const EMBEDDED_TABLE: &str = include_str!("../../rules/runaway.pla");

/// Largest input count accepted; tables are enumerated exhaustively.
const MAX_INPUTS: usize = 16;

/// Errors parsing a PLA file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TruthTableError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("missing .i declaration")]
    MissingInputCount,

    #[error("only single-output tables are supported, found .o {0}")]
    MultipleOutputs(usize),

    #[error("input count {0} out of range (1..=16)")]
    UnsupportedWidth(usize),

    #[error(".ilb lists {found} labels for {expected} inputs")]
    LabelCount { expected: usize, found: usize },

    #[error(".p declares {declared} product terms, found {found}")]
    ProductCount { declared: usize, found: usize },

    #[error("assignment {assignment} is both on and off")]
    Conflict { assignment: String },
}

/// Errors validating a cover against a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverError {
    #[error(transparent)]
    Table(#[from] TruthTableError),

    #[error("table has {found} inputs, rules use {expected}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("table inputs are [{found}], rules expect [{expected}]")]
    LabelMismatch { expected: String, found: String },

    #[error("cover disagrees with table on {count} assignment(s), first {first} (table says {table})")]
    Disagreement {
        count: usize,
        first: String,
        table: bool,
    },

    #[error("clause {label} is redundant")]
    RedundantClause { label: String },

    #[error("literal {literal} of clause {label} can be dropped")]
    NonPrimeLiteral { label: String, literal: String },
}

impl From<TruthTableError> for runaway_common::Error {
    fn from(err: TruthTableError) -> Self {
        runaway_common::Error::TruthTable(err.to_string())
    }
}

impl From<CoverError> for runaway_common::Error {
    fn from(err: CoverError) -> Self {
        match err {
            CoverError::Table(e) => e.into(),
            other => runaway_common::Error::RuleCover(other.to_string()),
        }
    }
}

/// One input or output position of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trit {
    Zero,
    One,
    DontCare,
}

impl Trit {
    fn parse_input(c: char) -> Option<Self> {
        match c {
            '0' => Some(Trit::Zero),
            '1' => Some(Trit::One),
            '-' | '2' => Some(Trit::DontCare),
            _ => None,
        }
    }

    fn parse_output(c: char) -> Option<Self> {
        match c {
            '0' => Some(Trit::Zero),
            '1' | '4' => Some(Trit::One),
            '-' | '2' => Some(Trit::DontCare),
            _ => None,
        }
    }

    fn matches(self, bit: bool) -> bool {
        match self {
            Trit::Zero => !bit,
            Trit::One => bit,
            Trit::DontCare => true,
        }
    }
}

/// How rows are interpreted (Espresso `.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaType {
    /// Rows give the on-set; everything else is off.
    F,
    /// Rows give the on-set and don't-care set; everything else is off.
    #[default]
    Fd,
    /// Rows give the on-set and off-set; everything else is don't-care.
    Fr,
    /// Rows give all three sets.
    Fdr,
}

impl PlaType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "f" => Some(PlaType::F),
            "fd" => Some(PlaType::Fd),
            "fr" => Some(PlaType::Fr),
            "fdr" => Some(PlaType::Fdr),
            _ => None,
        }
    }

    fn rows_give_off_set(self) -> bool {
        matches!(self, PlaType::Fr | PlaType::Fdr)
    }

    fn rows_give_dc_set(self) -> bool {
        matches!(self, PlaType::Fd | PlaType::Fdr)
    }
}

/// One product-term row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cube {
    pub inputs: Vec<Trit>,
    pub output: Trit,
}

impl Cube {
    fn covers(&self, assignment: &[bool]) -> bool {
        self.inputs
            .iter()
            .zip(assignment)
            .all(|(t, &bit)| t.matches(bit))
    }
}

/// A parsed single-output truth table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruthTable {
    pub input_labels: Vec<String>,
    pub output_label: Option<String>,
    pub pla_type: PlaType,
    pub cubes: Vec<Cube>,
    inputs: usize,
}

impl TruthTable {
    /// Parse PLA text.
    pub fn parse(text: &str) -> Result<Self, TruthTableError> {
        let mut inputs: Option<usize> = None;
        let mut outputs = 1usize;
        let mut input_labels = Vec::new();
        let mut output_label = None;
        let mut pla_type = PlaType::default();
        let mut declared_products = None;
        let mut cubes = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let syntax = |message: String| TruthTableError::Syntax {
                line: line_no,
                message,
            };

            if let Some(directive) = line.strip_prefix('.') {
                let mut parts = directive.split_whitespace();
                let keyword = parts.next().unwrap_or("");
                let args: Vec<&str> = parts.collect();
                match keyword {
                    "i" => {
                        let n = parse_count(&args).ok_or_else(|| syntax("bad .i".into()))?;
                        if n == 0 || n > MAX_INPUTS {
                            return Err(TruthTableError::UnsupportedWidth(n));
                        }
                        inputs = Some(n);
                    }
                    "o" => {
                        outputs = parse_count(&args).ok_or_else(|| syntax("bad .o".into()))?;
                        if outputs != 1 {
                            return Err(TruthTableError::MultipleOutputs(outputs));
                        }
                    }
                    "ilb" => input_labels = args.iter().map(|s| s.to_string()).collect(),
                    "ob" => output_label = args.first().map(|s| s.to_string()),
                    "p" => {
                        declared_products =
                            Some(parse_count(&args).ok_or_else(|| syntax("bad .p".into()))?);
                    }
                    "type" => {
                        pla_type = args
                            .first()
                            .and_then(|t| PlaType::parse(t))
                            .ok_or_else(|| syntax(format!("unsupported .type {:?}", args)))?;
                    }
                    "e" | "end" => break,
                    other => return Err(syntax(format!("unsupported directive .{other}"))),
                }
                continue;
            }

            let width = inputs.ok_or(TruthTableError::MissingInputCount)?;
            cubes.push(parse_cube(line, width, outputs).map_err(syntax)?);
        }

        let inputs = inputs.ok_or(TruthTableError::MissingInputCount)?;
        if !input_labels.is_empty() && input_labels.len() != inputs {
            return Err(TruthTableError::LabelCount {
                expected: inputs,
                found: input_labels.len(),
            });
        }
        if let Some(declared) = declared_products {
            if declared != cubes.len() {
                return Err(TruthTableError::ProductCount {
                    declared,
                    found: cubes.len(),
                });
            }
        }

        Ok(TruthTable {
            input_labels,
            output_label,
            pla_type,
            cubes,
            inputs,
        })
    }

    /// The table shipped with the binary.
    pub fn embedded() -> Result<Self, TruthTableError> {
        Self::parse(EMBEDDED_TABLE)
    }

    pub fn input_count(&self) -> usize {
        self.inputs
    }

    /// Output for an assignment; `None` is don't-care.
    pub fn value(&self, assignment: &[bool]) -> Result<Option<bool>, TruthTableError> {
        let mut on = false;
        let mut off = false;
        let mut dc = false;
        for cube in self.cubes.iter().filter(|c| c.covers(assignment)) {
            match cube.output {
                Trit::One => on = true,
                Trit::Zero if self.pla_type.rows_give_off_set() => off = true,
                Trit::DontCare if self.pla_type.rows_give_dc_set() => dc = true,
                _ => {}
            }
        }
        if on && off {
            return Err(TruthTableError::Conflict {
                assignment: format_assignment(assignment),
            });
        }
        Ok(if on {
            Some(true)
        } else if off {
            Some(false)
        } else if dc || self.pla_type.rows_give_off_set() {
            None
        } else {
            Some(false)
        })
    }
}

fn parse_count(args: &[&str]) -> Option<usize> {
    match args {
        [n] => n.parse().ok(),
        _ => None,
    }
}

fn parse_cube(line: &str, width: usize, outputs: usize) -> Result<Cube, String> {
    let joined: String = line.split_whitespace().collect();
    if joined.chars().count() != width + outputs {
        return Err(format!(
            "expected {} input and {} output position(s), got {:?}",
            width, outputs, line
        ));
    }
    let mut chars = joined.chars();
    let inputs = chars
        .by_ref()
        .take(width)
        .map(|c| Trit::parse_input(c).ok_or_else(|| format!("bad input character {c:?}")))
        .collect::<Result<Vec<_>, _>>()?;
    let out_char = chars.next().ok_or_else(|| "missing output".to_string())?;
    let output =
        Trit::parse_output(out_char).ok_or_else(|| format!("bad output character {out_char:?}"))?;
    Ok(Cube { inputs, output })
}

/// Render an assignment as a bit string in column order.
pub fn format_assignment(assignment: &[bool]) -> String {
    assignment.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Enumerate every assignment of the rule inputs in table order.
pub fn assignments() -> impl Iterator<Item = [bool; RuleInput::COUNT]> {
    (0u32..1 << RuleInput::COUNT).map(|bits| {
        std::array::from_fn(|i| bits & (1 << (RuleInput::COUNT - 1 - i)) != 0)
    })
}

/// Per-clause validation details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseReport {
    pub label: &'static str,
    pub cube: String,
    /// On-set assignments covered by this clause alone.
    pub essential: usize,
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverReport {
    pub assignments: usize,
    pub on_set: usize,
    pub off_set: usize,
    pub dont_care: usize,
    pub clauses: Vec<ClauseReport>,
}

/// Crisp conjunction where the empty conjunction is a tautology.
fn conjunction_covers(literals: &[Literal], assignment: &[bool; RuleInput::COUNT]) -> bool {
    literals
        .iter()
        .all(|l| assignment[l.input.index()] != l.negated)
}

/// Check that `rules` is an irredundant prime cover of `table`.
pub fn validate_cover(table: &TruthTable, rules: &RuleSet) -> Result<CoverReport, CoverError> {
    if table.input_count() != RuleInput::COUNT {
        return Err(CoverError::WidthMismatch {
            expected: RuleInput::COUNT,
            found: table.input_count(),
        });
    }
    let expected: Vec<&str> = RuleInput::ALL.iter().map(|i| i.label()).collect();
    if !table.input_labels.is_empty() {
        let found: Vec<String> = table
            .input_labels
            .iter()
            .map(|l| l.to_ascii_lowercase())
            .collect();
        if found != expected {
            return Err(CoverError::LabelMismatch {
                expected: expected.join(" "),
                found: table.input_labels.join(" "),
            });
        }
    }

    let mut rows = Vec::with_capacity(1 << RuleInput::COUNT);
    for assignment in assignments() {
        rows.push((assignment, table.value(&assignment)?));
    }

    // 1. agreement
    let mut mismatches = rows
        .iter()
        .filter_map(|(a, v)| v.filter(|&t| t != rules.eval_crisp(a)).map(|t| (a, t)));
    if let Some((first, table_value)) = mismatches.next() {
        return Err(CoverError::Disagreement {
            count: 1 + mismatches.count(),
            first: format_assignment(first),
            table: table_value,
        });
    }

    let on: Vec<&[bool; RuleInput::COUNT]> = rows
        .iter()
        .filter(|(_, v)| *v == Some(true))
        .map(|(a, _)| a)
        .collect();
    let off: Vec<&[bool; RuleInput::COUNT]> = rows
        .iter()
        .filter(|(_, v)| *v == Some(false))
        .map(|(a, _)| a)
        .collect();

    let mut clauses = Vec::with_capacity(rules.clauses.len());
    for (i, clause) in rules.clauses.iter().enumerate() {
        // 2. irredundant: some on-set minterm needs this clause
        let essential = on
            .iter()
            .filter(|a| clause.covers(a))
            .filter(|a| {
                !rules
                    .clauses
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.covers(a))
            })
            .count();
        if essential == 0 {
            return Err(CoverError::RedundantClause {
                label: clause.label.to_string(),
            });
        }

        // 3. prime: dropping any literal reaches the off-set
        for (k, literal) in clause.literals.iter().enumerate() {
            let reduced: Vec<Literal> = clause
                .literals
                .iter()
                .enumerate()
                .filter(|(m, _)| *m != k)
                .map(|(_, l)| *l)
                .collect();
            if !off.iter().any(|a| conjunction_covers(&reduced, a)) {
                return Err(CoverError::NonPrimeLiteral {
                    label: clause.label.to_string(),
                    literal: literal.to_string(),
                });
            }
        }

        clauses.push(ClauseReport {
            label: clause.label,
            cube: clause.cube(),
            essential,
        });
    }

    Ok(CoverReport {
        assignments: rows.len(),
        on_set: on.len(),
        off_set: off.len(),
        dont_care: rows.len() - on.len() - off.len(),
        clauses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::rules::{Clause, RUNAWAY_RULES};
    use crate::inference::inputs::RuleInput::{HiCpu, HiMem};

    const HEADER: &str = ".i 6\n.o 1\n.ilb nice disowned midcpu midmem hicpu himem\n.ob runaway\n";

    #[test]
    fn embedded_table_parses() {
        let table = TruthTable::embedded().unwrap();
        assert_eq!(table.input_count(), 6);
        assert_eq!(table.cubes.len(), 64);
        assert_eq!(table.pla_type, PlaType::Fr);
        assert_eq!(table.output_label.as_deref(), Some("runaway"));
    }

    #[test]
    fn shipped_rules_are_minimal_cover_of_embedded_table() {
        let table = TruthTable::embedded().unwrap();
        let report = validate_cover(&table, &RUNAWAY_RULES).unwrap();
        assert_eq!(report.assignments, 64);
        assert_eq!(report.on_set, 51);
        assert_eq!(report.off_set, 13);
        assert_eq!(report.dont_care, 0);
        assert_eq!(report.clauses.len(), 4);
        assert!(report.clauses.iter().all(|c| c.essential > 0));
    }

    #[test]
    fn on_set_only_table_with_cubes() {
        // fd type: listed cubes are on, the rest is off
        let text = format!("{HEADER}011--- 1\n01-1-- 1\n----1- 1\n-----1 1\n.e\n");
        let table = TruthTable::parse(&text).unwrap();
        assert_eq!(table.pla_type, PlaType::Fd);
        validate_cover(&table, &RUNAWAY_RULES).unwrap();
    }

    #[test]
    fn concatenated_rows_and_comments() {
        let text = ".i 2\n.o 1\n# comment\n111 # trailing\n0-0\n.end\n";
        let table = TruthTable::parse(text).unwrap();
        assert_eq!(table.cubes.len(), 2);
        assert_eq!(table.value(&[true, true]).unwrap(), Some(true));
        assert_eq!(table.value(&[false, true]).unwrap(), Some(false));
    }

    #[test]
    fn dont_care_rows() {
        let text = ".i 2\n.o 1\n11 1\n10 -\n";
        let table = TruthTable::parse(text).unwrap();
        assert_eq!(table.value(&[true, false]).unwrap(), None);
        assert_eq!(table.value(&[false, false]).unwrap(), Some(false));
    }

    #[test]
    fn fr_conflict_is_reported() {
        let text = ".i 2\n.o 1\n.type fr\n1- 1\n11 0\n";
        let table = TruthTable::parse(text).unwrap();
        assert!(matches!(
            table.value(&[true, true]),
            Err(TruthTableError::Conflict { .. })
        ));
        assert_eq!(table.value(&[false, false]).unwrap(), None);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            TruthTable::parse("01 1\n"),
            Err(TruthTableError::MissingInputCount)
        );
        assert_eq!(
            TruthTable::parse(".i 2\n.o 2\n"),
            Err(TruthTableError::MultipleOutputs(2))
        );
        assert_eq!(
            TruthTable::parse(".i 40\n"),
            Err(TruthTableError::UnsupportedWidth(40))
        );
        assert!(matches!(
            TruthTable::parse(".i 2\n.o 1\n0x 1\n"),
            Err(TruthTableError::Syntax { line: 3, .. })
        ));
        assert!(matches!(
            TruthTable::parse(".i 2\n.o 1\n011 1\n"),
            Err(TruthTableError::Syntax { .. })
        ));
        assert!(matches!(
            TruthTable::parse(".i 2\n.phase 1\n"),
            Err(TruthTableError::Syntax { .. })
        ));
        assert_eq!(
            TruthTable::parse(".i 2\n.ilb a b c\n"),
            Err(TruthTableError::LabelCount {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            TruthTable::parse(".i 2\n.p 2\n11 1\n"),
            Err(TruthTableError::ProductCount {
                declared: 2,
                found: 1
            })
        );
    }

    #[test]
    fn wrong_labels_rejected() {
        let text = ".i 6\n.o 1\n.ilb a b c d e f\n";
        let table = TruthTable::parse(text).unwrap();
        assert!(matches!(
            validate_cover(&table, &RUNAWAY_RULES),
            Err(CoverError::LabelMismatch { .. })
        ));
        let narrow = TruthTable::parse(".i 5\n").unwrap();
        assert!(matches!(
            validate_cover(&narrow, &RUNAWAY_RULES),
            Err(CoverError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn disagreement_detected() {
        // himem dropped from the table
        let text = format!("{HEADER}011--- 1\n01-1-- 1\n----1- 1\n");
        let table = TruthTable::parse(&text).unwrap();
        match validate_cover(&table, &RUNAWAY_RULES) {
            Err(CoverError::Disagreement { count, table, .. }) => {
                assert!(count > 0);
                assert!(!table);
            }
            other => panic!("expected disagreement, got {other:?}"),
        }
    }

    #[test]
    fn redundant_clause_detected() {
        static CLAUSES: [Clause; 5] = [
            RUNAWAY_RULES.clauses[0],
            RUNAWAY_RULES.clauses[1],
            RUNAWAY_RULES.clauses[2],
            RUNAWAY_RULES.clauses[3],
            Clause {
                label: "extra",
                literals: &[Literal::pos(HiCpu), Literal::pos(HiMem)],
            },
        ];
        let rules = RuleSet { clauses: &CLAUSES };
        let table = TruthTable::embedded().unwrap();
        assert_eq!(
            validate_cover(&table, &rules),
            Err(CoverError::RedundantClause {
                label: "extra".into()
            })
        );
    }

    #[test]
    fn non_prime_clause_detected() {
        // himem & !hicpu together with hicpu is the same function as the
        // table, but !hicpu can be dropped
        static CLAUSES: [Clause; 4] = [
            RUNAWAY_RULES.clauses[0],
            RUNAWAY_RULES.clauses[1],
            RUNAWAY_RULES.clauses[2],
            Clause {
                label: "hi_mem_narrow",
                literals: &[Literal::pos(HiMem), Literal::neg(HiCpu)],
            },
        ];
        let rules = RuleSet { clauses: &CLAUSES };
        let table = TruthTable::embedded().unwrap();
        assert_eq!(
            validate_cover(&table, &rules),
            Err(CoverError::NonPrimeLiteral {
                label: "hi_mem_narrow".into(),
                literal: "!hicpu".into(),
            })
        );
    }

    #[test]
    fn errors_convert_to_common() {
        let err: runaway_common::Error = CoverError::RedundantClause { label: "x".into() }.into();
        assert_eq!(err.code(), 21);
        let err: runaway_common::Error =
            CoverError::Table(TruthTableError::MissingInputCount).into();
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn assignment_order_matches_columns() {
        let all: Vec<_> = assignments().collect();
        assert_eq!(all.len(), 64);
        assert_eq!(format_assignment(&all[0]), "000000");
        assert_eq!(format_assignment(&all[1]), "000001");
        assert_eq!(format_assignment(&all[32]), "100000");
    }
}
