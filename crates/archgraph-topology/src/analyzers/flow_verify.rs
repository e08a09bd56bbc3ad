// ABOUTME: Checks stored flows against the interaction graph
// ABOUTME: Flags broken step chains and references to interactions that no longer exist

use archgraph_core::{Flow, Interaction, InteractionId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowVerification {
    pub slug: String,
    /// Index of the first step whose source differs from the previous step's target.
    pub broken_chain: Option<usize>,
    pub missing_interactions: Vec<InteractionId>,
}

impl FlowVerification {
    pub fn is_valid(&self) -> bool {
        self.broken_chain.is_none() && self.missing_interactions.is_empty()
    }
}

pub fn verify_flow(flow: &Flow, known: &HashSet<InteractionId>) -> FlowVerification {
    let broken_chain = flow
        .steps
        .windows(2)
        .position(|pair| pair[0].to_module_id != pair[1].from_module_id)
        .map(|index| index + 1);

    let mut missing = Vec::new();
    let referenced = flow
        .interaction_ids
        .iter()
        .copied()
        .chain(flow.steps.iter().filter_map(|s| s.interaction_id));
    for id in referenced {
        if !known.contains(&id) && !missing.contains(&id) {
            missing.push(id);
        }
    }

    FlowVerification {
        slug: flow.slug.clone(),
        broken_chain,
        missing_interactions: missing,
    }
}

pub fn verify_flows(flows: &[Flow], interactions: &[Interaction]) -> Vec<FlowVerification> {
    let known: HashSet<InteractionId> = interactions.iter().map(|i| i.id).collect();
    let results: Vec<FlowVerification> = flows.iter().map(|f| verify_flow(f, &known)).collect();
    for result in results.iter().filter(|r| !r.is_valid()) {
        warn!(
            slug = %result.slug,
            broken_at = ?result.broken_chain,
            missing = result.missing_interactions.len(),
            "Flow failed verification"
        );
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use archgraph_core::{FlowStep, FlowTier, InteractionSource, InteractionUpsert};
    use pretty_assertions::assert_eq;

    fn interaction(id: i64, from: i64, to: i64) -> Interaction {
        Interaction::from_upsert(id, InteractionUpsert::new(from, to, InteractionSource::Ast), 20)
    }

    #[test]
    fn connected_chain_with_known_interactions_is_valid() {
        let interactions = vec![interaction(1, 1, 2), interaction(2, 2, 3)];
        let mut flow = Flow::new("Order path", "order-path", FlowTier::Atomic).with_interactions(vec![1, 2]);
        flow.steps = vec![FlowStep::for_interaction(1, 1, 2), FlowStep::for_interaction(2, 2, 3)];

        let results = verify_flows(&[flow], &interactions);
        assert!(results[0].is_valid());
    }

    #[test]
    fn step_gap_is_reported_at_the_breaking_step() {
        let interactions = vec![interaction(1, 1, 2), interaction(2, 5, 6)];
        let mut flow = Flow::new("Gap", "gap", FlowTier::Atomic).with_interactions(vec![1, 2]);
        flow.steps = vec![FlowStep::for_interaction(1, 1, 2), FlowStep::for_interaction(2, 5, 6)];

        let results = verify_flows(&[flow], &interactions);
        assert_eq!(results[0].broken_chain, Some(1));
        assert!(results[0].missing_interactions.is_empty());
    }

    #[test]
    fn unknown_interaction_ids_are_listed_once() {
        let mut flow = Flow::new("Stale", "stale", FlowTier::Journey).with_interactions(vec![1, 9]);
        flow.steps = vec![FlowStep::for_interaction(9, 1, 2)];

        let results = verify_flows(&[flow], &[interaction(1, 1, 2)]);
        assert_eq!(results[0].missing_interactions, vec![9]);
        assert_eq!(results[0].broken_chain, None);
    }

    #[test]
    fn flows_without_steps_only_check_ids() {
        let flow = Flow::new("Bare", "bare", FlowTier::Journey);
        assert!(verify_flows(&[flow], &[])[0].is_valid());
    }
}
