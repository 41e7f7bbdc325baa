//! Rule engine: fuzzification, the runaway rule cover and its truth table.

pub mod inputs;
pub mod rules;
pub mod truth_table;

pub use inputs::{cpu_ratio, mem_ratio, nice_truth, FuzzyInputs, RuleInput};
pub use rules::{Badness, Clause, ClauseStrength, Literal, RuleSet, RUNAWAY_RULES};
pub use truth_table::{
    validate_cover, ClauseReport, CoverError, CoverReport, PlaType, TruthTable, TruthTableError,
    EMBEDDED_TABLE,
};
