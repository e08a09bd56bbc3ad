pub mod analyzers;
pub mod gate_csv;
pub mod gate_prompts;
pub mod pipeline;

pub use analyzers::*;
pub use gate_csv::{parse_gate_response, GateAction, GateParseResult, GateRow};
pub use gate_prompts::{build_gate_user_prompt, PairContext, COVERAGE_GATE_SYSTEM};
pub use pipeline::{PipelineReport, TopologyPipeline};
