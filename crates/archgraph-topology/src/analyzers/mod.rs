// ABOUTME: Topology analyzers that derive interactions and flows from graph facts
// ABOUTME: Each stage reads the store, computes deterministically, and writes back through upserts

pub mod atomic_flows;
pub mod contract_matcher;
pub mod coverage_gate;
pub mod entity;
pub mod flow_verify;
pub mod journeys;
pub mod naming;

pub use atomic_flows::{build_atomic_flows, classify_action, DEFAULT_MAX_FLOW_LENGTH};
pub use contract_matcher::{
    backfill_participant_modules, match_contracts, materialize, ContractMatch, MatchKind,
    MaterializeStats,
};
pub use coverage_gate::{
    classify_pair, coverage_ratio, run_coverage_inference, CoverageGate, CoverageReport,
    GateDecision, InferReason, SkipReason, StopReason,
};
pub use flow_verify::{verify_flows, FlowVerification};
pub use journeys::build_journeys;
