//! The session-scoped operation set and its results.
//!
//! [`Operation`] is the transport-agnostic request shape: one variant per
//! addressable operation, each carrying its arguments. [`Outcome`] is the
//! matching result shape. Both serialise with an explicit tag so any transport
//! can carry them unchanged.

use serde::{Deserialize, Serialize};

use crate::{HeuristicId, InstanceIndex, SlotIndex};

/// A request against one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// The capability's own description (`toString`).
    Describe,
    NumberOfInstances,
    LoadInstance { instance: InstanceIndex },
    SetMemorySize { size: usize },
    GetDepthOfSearch,
    SetDepthOfSearch { value: f64 },
    GetIntensityOfMutation,
    SetIntensityOfMutation { value: f64 },
    InitialiseSolution { slot: SlotIndex },
    /// Two-slot form: one source, one destination.
    ApplyHeuristic {
        heuristic: HeuristicId,
        source: SlotIndex,
        destination: SlotIndex,
    },
    /// Three-slot form: two parents, one destination.
    ApplyHeuristicPair {
        heuristic: HeuristicId,
        first: SlotIndex,
        second: SlotIndex,
        destination: SlotIndex,
    },
    CopySolution { source: SlotIndex, destination: SlotIndex },
    CompareSolutions { first: SlotIndex, second: SlotIndex },
    SolutionToString { slot: SlotIndex },
    FunctionValue { slot: SlotIndex },
    BestSolutionToString,
    BestSolutionValue,
    /// `heuristic_type` is kept as the caller's raw tag; an unrecognised tag
    /// answers with an empty list rather than an error.
    HeuristicsOfType { heuristic_type: String },
    HeuristicsUsingIntensityOfMutation,
    HeuristicsUsingDepthOfSearch,
    NumberOfHeuristics,
    HeuristicCallRecord,
    HeuristicCallTimeRecord,
}

impl Operation {
    /// Name written to the instrumentation log and carried in errors.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Describe => "toString",
            Operation::NumberOfInstances => "getNumberOfInstances",
            Operation::LoadInstance { .. } => "loadInstance",
            Operation::SetMemorySize { .. } => "setMemorySize",
            Operation::GetDepthOfSearch => "getDepthOfSearch",
            Operation::SetDepthOfSearch { .. } => "setDepthOfSearch",
            Operation::GetIntensityOfMutation => "getIntensityOfMutation",
            Operation::SetIntensityOfMutation { .. } => "setIntensityOfMutation",
            Operation::InitialiseSolution { .. } => "initialiseSolution",
            Operation::ApplyHeuristic { .. } | Operation::ApplyHeuristicPair { .. } => {
                "applyHeuristic"
            }
            Operation::CopySolution { .. } => "copySolution",
            Operation::CompareSolutions { .. } => "compareSolutions",
            Operation::SolutionToString { .. } => "getSolutionToString",
            Operation::FunctionValue { .. } => "getFunctionValue",
            Operation::BestSolutionToString => "getBestSolutionToString",
            Operation::BestSolutionValue => "getBestSolutionValue",
            Operation::HeuristicsOfType { .. } => "getHeuristicsOfType",
            Operation::HeuristicsUsingIntensityOfMutation => {
                "getHeuristicsThatUseIntensityOfMutation"
            }
            Operation::HeuristicsUsingDepthOfSearch => "getHeuristicsThatUseDepthOfSearch",
            Operation::NumberOfHeuristics => "getNumberOfHeuristics",
            Operation::HeuristicCallRecord => "getHeuristicCallRecord",
            Operation::HeuristicCallTimeRecord => "getHeuristicCallTimeRecord",
        }
    }

    /// Argument values in declaration order, rendered for the log.
    pub fn args(&self) -> Vec<String> {
        match self {
            Operation::LoadInstance { instance } => vec![instance.to_string()],
            Operation::SetMemorySize { size } => vec![size.to_string()],
            Operation::SetDepthOfSearch { value } | Operation::SetIntensityOfMutation { value } => {
                vec![value.to_string()]
            }
            Operation::InitialiseSolution { slot }
            | Operation::SolutionToString { slot }
            | Operation::FunctionValue { slot } => vec![slot.to_string()],
            Operation::ApplyHeuristic {
                heuristic,
                source,
                destination,
            } => vec![
                heuristic.to_string(),
                source.to_string(),
                destination.to_string(),
            ],
            Operation::ApplyHeuristicPair {
                heuristic,
                first,
                second,
                destination,
            } => vec![
                heuristic.to_string(),
                first.to_string(),
                second.to_string(),
                destination.to_string(),
            ],
            Operation::CopySolution {
                source,
                destination,
            } => vec![source.to_string(), destination.to_string()],
            Operation::CompareSolutions { first, second } => {
                vec![first.to_string(), second.to_string()]
            }
            Operation::HeuristicsOfType { heuristic_type } => vec![heuristic_type.clone()],
            Operation::Describe
            | Operation::NumberOfInstances
            | Operation::GetDepthOfSearch
            | Operation::GetIntensityOfMutation
            | Operation::BestSolutionToString
            | Operation::BestSolutionValue
            | Operation::HeuristicsUsingIntensityOfMutation
            | Operation::HeuristicsUsingDepthOfSearch
            | Operation::NumberOfHeuristics
            | Operation::HeuristicCallRecord
            | Operation::HeuristicCallTimeRecord => Vec::new(),
        }
    }
}

/// The result of a successful [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation has no result value.
    Done,
    Flag(bool),
    /// Objective values, search parameters.
    Number(f64),
    Count(usize),
    Text(String),
    /// Heuristic ids; never absent, possibly empty.
    Heuristics(Vec<HeuristicId>),
    /// Per-heuristic counters indexed by heuristic id.
    Counters(Vec<u64>),
}

impl Outcome {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Outcome::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Outcome::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Outcome::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match self {
            Outcome::Count(value) => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_apply_forms_share_a_log_name() {
        let two = Operation::ApplyHeuristic {
            heuristic: HeuristicId::new(2),
            source: SlotIndex::new(0),
            destination: SlotIndex::new(1),
        };
        let three = Operation::ApplyHeuristicPair {
            heuristic: HeuristicId::new(3),
            first: SlotIndex::new(0),
            second: SlotIndex::new(1),
            destination: SlotIndex::new(2),
        };
        assert_eq!(two.name(), three.name());
        assert_eq!(two.args(), vec!["2", "0", "1"]);
        assert_eq!(three.args(), vec!["3", "0", "1", "2"]);
    }

    #[test]
    fn parameterless_operations_log_no_args() {
        assert!(Operation::HeuristicCallRecord.args().is_empty());
        assert_eq!(
            Operation::SetDepthOfSearch { value: 0.25 }.args(),
            vec!["0.25"]
        );
    }

    #[test]
    fn operation_wire_shape_is_tagged() {
        let op: Operation =
            serde_json::from_str(r#"{"op":"copy_solution","source":0,"destination":3}"#)
                .expect("deserialize");
        assert_eq!(
            op,
            Operation::CopySolution {
                source: SlotIndex::new(0),
                destination: SlotIndex::new(3),
            }
        );
    }

    #[test]
    fn outcome_wire_shape_is_adjacently_tagged() {
        let json = serde_json::to_value(Outcome::Heuristics(Vec::new())).expect("serialize");
        assert_eq!(json["kind"], "heuristics");
        assert_eq!(json["value"], serde_json::json!([]));
        let done = serde_json::to_value(Outcome::Done).expect("serialize");
        assert_eq!(done, serde_json::json!({ "kind": "done" }));
    }
}
