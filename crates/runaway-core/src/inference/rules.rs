//! The runaway rule set.
//!
//! Badness is the fuzzy OR of four fuzzy AND clauses. The clauses are the
//! minimal two-level cover of `rules/runaway.pla`; they are stored here as
//! data so [`super::truth_table::validate_cover`] can check them against the
//! table without going through the scoring path.

use super::inputs::{FuzzyInputs, RuleInput};
use runaway_fuzzy::{and, or, FuzzyValue};
use serde::Serialize;

/// A possibly negated rule input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub input: RuleInput,
    pub negated: bool,
}

impl Literal {
    pub const fn pos(input: RuleInput) -> Self {
        Self {
            input,
            negated: false,
        }
    }

    pub const fn neg(input: RuleInput) -> Self {
        Self {
            input,
            negated: true,
        }
    }

    pub fn eval(&self, inputs: &FuzzyInputs) -> FuzzyValue {
        let v = inputs.get(self.input);
        if self.negated {
            !v
        } else {
            v
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negated {
            write!(f, "!{}", self.input)
        } else {
            write!(f, "{}", self.input)
        }
    }
}

/// A conjunction of literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub label: &'static str,
    pub literals: &'static [Literal],
}

impl Clause {
    /// Truth of the conjunction. An empty clause reads as false.
    pub fn strength(&self, inputs: &FuzzyInputs) -> FuzzyValue {
        and(self.literals.iter().map(|l| l.eval(inputs))).unwrap_or(FuzzyValue::FALSE)
    }

    /// Crisp evaluation on a boolean assignment.
    pub fn covers(&self, assignment: &[bool; RuleInput::COUNT]) -> bool {
        !self.literals.is_empty()
            && self
                .literals
                .iter()
                .all(|l| assignment[l.input.index()] != l.negated)
    }

    /// Espresso cube notation, e.g. `011---`.
    pub fn cube(&self) -> String {
        let mut cube = ['-'; RuleInput::COUNT];
        for lit in self.literals {
            cube[lit.input.index()] = if lit.negated { '0' } else { '1' };
        }
        cube.iter().collect()
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.literals.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", parts.join(" & "))
    }
}

/// A disjunction of clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    pub clauses: &'static [Clause],
}

/// Strength of one clause for one process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseStrength {
    pub label: &'static str,
    pub strength: FuzzyValue,
}

/// Badness of one process, with the clause breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badness {
    pub score: FuzzyValue,
    pub clauses: Vec<ClauseStrength>,
}

impl Badness {
    /// The clause that set the score, if any clause fired at all.
    pub fn dominant(&self) -> Option<&ClauseStrength> {
        self.clauses
            .iter()
            .filter(|c| c.strength > FuzzyValue::FALSE)
            .max_by(|a, b| a.strength.cmp_total(&b.strength))
    }
}

impl RuleSet {
    /// Badness of a fuzzified process. An empty rule set reads as false.
    pub fn score(&self, inputs: &FuzzyInputs) -> Badness {
        let clauses: Vec<ClauseStrength> = self
            .clauses
            .iter()
            .map(|c| ClauseStrength {
                label: c.label,
                strength: c.strength(inputs),
            })
            .collect();
        let score = or(clauses.iter().map(|c| c.strength)).unwrap_or(FuzzyValue::FALSE);
        Badness { score, clauses }
    }

    /// Crisp evaluation of the cover on a boolean assignment.
    pub fn eval_crisp(&self, assignment: &[bool; RuleInput::COUNT]) -> bool {
        self.clauses.iter().any(|c| c.covers(assignment))
    }
}

impl std::fmt::Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}  {:<10} {}", clause.cube(), clause.label, clause)?;
        }
        Ok(())
    }
}

use RuleInput::{Disowned, HiCpu, HiMem, MidCpu, MidMem, Nice};

/// The minimal cover of `rules/runaway.pla`.
///
/// A disowned process that is not nice is flagged at moderate use; high CPU
/// or high memory alone is always flagged.
pub const RUNAWAY_RULES: RuleSet = RuleSet {
    clauses: &[
        Clause {
            label: "orphan_cpu",
            literals: &[Literal::neg(Nice), Literal::pos(Disowned), Literal::pos(MidCpu)],
        },
        Clause {
            label: "orphan_mem",
            literals: &[Literal::neg(Nice), Literal::pos(Disowned), Literal::pos(MidMem)],
        },
        Clause {
            label: "hi_cpu",
            literals: &[Literal::pos(HiCpu)],
        },
        Clause {
            label: "hi_mem",
            literals: &[Literal::pos(HiMem)],
        },
    ],
};
