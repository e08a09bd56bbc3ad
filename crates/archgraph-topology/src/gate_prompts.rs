// ABOUTME: Prompts for confirming or skipping uncovered module pairs in the coverage gate
// ABOUTME: Renders per-pair evidence and asks for a strict RFC 4180 CSV verdict

use crate::gate_csv::{escape_field, GATE_CSV_HEADER};
use archgraph_core::{MemberSymbol, RelationshipSample};
use serde::Serialize;
use std::fmt::Write;

pub const COVERAGE_GATE_SYSTEM: &str = r#"You are a software architect reviewing module-to-module dependencies recovered by static analysis.

OBJECTIVE: For each candidate pair decide whether the FROM module genuinely initiates communication with the TO module at runtime.

RULES:
- CONFIRM only when the evidence shows FROM calling, requesting, publishing to or otherwise driving TO.
- SKIP when the evidence is incidental (shared types, re-exports, test fixtures) or when the direction is reversed.
- Different process means the modules run in separate runtimes; they can only talk over a network, queue or IPC channel.
- Use the module paths exactly as given. Never invent pairs that were not listed.

RESPONSE FORMAT (CSV ONLY, RFC 4180 quoting, one row per candidate):
from_module_path,to_module_path,action,reason,confidence
- action is CONFIRM or SKIP
- reason is one short sentence; quote it if it contains a comma
- confidence is high, medium or low (optional)"#;

/// Evidence for one uncovered pair, rendered into the user prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairContext {
    pub from_module_path: String,
    pub to_module_path: String,
    pub from_description: Option<String>,
    pub to_description: Option<String>,
    pub same_process: bool,
    pub forward_import: bool,
    pub reverse_import: bool,
    pub reverse_ast: bool,
    pub relationship_count: u32,
    pub samples: Vec<RelationshipSample>,
    pub from_members: Vec<MemberSymbol>,
    pub to_members: Vec<MemberSymbol>,
}

pub fn build_gate_user_prompt(pairs: &[PairContext]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Review {} candidate module pair(s). Answer with one CSV row per pair.\n",
        pairs.len()
    );

    for (index, pair) in pairs.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "## Pair {}: {} -> {}",
            index + 1,
            pair.from_module_path,
            pair.to_module_path
        );
        let _ = writeln!(
            prompt,
            "FROM description: {}",
            pair.from_description.as_deref().unwrap_or("(none)")
        );
        let _ = writeln!(
            prompt,
            "TO description: {}",
            pair.to_description.as_deref().unwrap_or("(none)")
        );
        let _ = writeln!(
            prompt,
            "Process: {}",
            if pair.same_process {
                "same process"
            } else {
                "different processes"
            }
        );
        let _ = writeln!(
            prompt,
            "Imports: forward={} reverse={}; reverse AST interaction={}",
            yes_no(pair.forward_import),
            yes_no(pair.reverse_import),
            yes_no(pair.reverse_ast)
        );
        let _ = writeln!(prompt, "Relationship edges: {}", pair.relationship_count);

        if !pair.samples.is_empty() {
            prompt.push_str("Sampled relationships:\n");
            for sample in &pair.samples {
                let _ = write!(
                    prompt,
                    "- {} {} {}",
                    sample.from_symbol, sample.kind, sample.to_symbol
                );
                if let Some(description) = &sample.description {
                    let _ = write!(prompt, " ({})", description);
                }
                prompt.push('\n');
            }
        }
        write_members(&mut prompt, "FROM members", &pair.from_members);
        write_members(&mut prompt, "TO members", &pair.to_members);
        prompt.push('\n');
    }

    let _ = writeln!(prompt, "Respond with this header first:\n{},confidence", GATE_CSV_HEADER);
    prompt.push_str("Example row: ");
    prompt.push_str(&escape_field("web.checkout"));
    prompt.push(',');
    prompt.push_str(&escape_field("api.orders"));
    prompt.push_str(",CONFIRM,");
    prompt.push_str(&escape_field("submits orders, then polls status"));
    prompt.push_str(",high\n");
    prompt
}

fn write_members(prompt: &mut String, label: &str, members: &[MemberSymbol]) {
    if members.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "{}:", label);
    for member in members {
        match &member.description {
            Some(description) => {
                let _ = writeln!(prompt, "- {} {}: {}", member.kind, member.name, description);
            }
            None => {
                let _ = writeln!(prompt, "- {} {}", member.kind, member.name);
            }
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_pair_with_its_evidence() {
        let pair = PairContext {
            from_module_path: "web.checkout".to_string(),
            to_module_path: "api.orders".to_string(),
            from_description: Some("Checkout page".to_string()),
            to_description: None,
            same_process: false,
            forward_import: false,
            reverse_import: false,
            reverse_ast: false,
            relationship_count: 2,
            samples: vec![RelationshipSample {
                from_symbol: "submitOrder".to_string(),
                to_symbol: "createOrder".to_string(),
                kind: "calls".to_string(),
                description: None,
            }],
            from_members: vec![],
            to_members: vec![MemberSymbol {
                definition_id: 1,
                name: "createOrder".to_string(),
                kind: "function".to_string(),
                description: Some("Persists a new order".to_string()),
            }],
        };

        let prompt = build_gate_user_prompt(&[pair]);
        assert!(prompt.contains("## Pair 1: web.checkout -> api.orders"));
        assert!(prompt.contains("Process: different processes"));
        assert!(prompt.contains("- submitOrder calls createOrder"));
        assert!(prompt.contains("- function createOrder: Persists a new order"));
        assert!(prompt.contains("TO description: (none)"));
        assert!(prompt.contains("\"submits orders, then polls status\""));
    }
}
