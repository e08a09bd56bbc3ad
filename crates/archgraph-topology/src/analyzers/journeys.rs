// ABOUTME: Groups related lower-tier flows into tier-2 journeys
// ABOUTME: Entity journeys share a target entity; page journeys share an entry-point module

use super::naming::{capitalize, clean_sentence, truncate_chars, SlugRegistry};
use archgraph_core::{ActionType, Flow, FlowTier, InteractionId, Module, ModuleId};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const ENTITY_SUFFIXES: &[&str] = &["-list", "-detail"];
const MAX_NAME_CHARS: usize = 60;
const MIN_FLOWS_PER_JOURNEY: usize = 2;

/// Case-insensitive entity key with list/detail variants folded into the base entity.
pub fn normalize_entity(entity: &str) -> String {
    let lowered = entity.trim().to_lowercase();
    for suffix in ENTITY_SUFFIXES {
        if let Some(base) = lowered.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    lowered
}

/// Build tier-2 journeys over composite flows; empty when fewer than two exist.
/// Journey slugs never collide with atomic or composite slugs.
pub fn build_journeys(flows: &[Flow], modules: &[Module]) -> Vec<Flow> {
    let candidates: Vec<&Flow> = flows
        .iter()
        .filter(|f| f.tier == FlowTier::Composite)
        .collect();
    if candidates.len() < MIN_FLOWS_PER_JOURNEY {
        return Vec::new();
    }

    let mut slugs = SlugRegistry::with_reserved(
        flows
            .iter()
            .filter(|f| f.tier < FlowTier::Journey)
            .map(|f| f.slug.clone()),
    );
    let mut grouped: HashSet<&str> = HashSet::new();
    let mut journeys = Vec::new();

    let mut by_entity: IndexMap<String, Vec<&Flow>> = IndexMap::new();
    for &flow in &candidates {
        if let Some(entity) = flow.target_entity.as_deref().filter(|e| !e.trim().is_empty()) {
            by_entity.entry(normalize_entity(entity)).or_default().push(flow);
        }
    }
    for (entity, members) in &by_entity {
        if members.len() < MIN_FLOWS_PER_JOURNEY {
            continue;
        }
        let name = entity_journey_name(entity, members);
        let mut journey = aggregate(&name, members, &mut slugs);
        journey.target_entity = Some(capitalize(entity));
        grouped.extend(members.iter().map(|f| f.slug.as_str()));
        journeys.push(journey);
    }
    let entity_journeys = journeys.len();

    let module_map: HashMap<ModuleId, &Module> = modules.iter().map(|m| (m.id, m)).collect();
    let mut by_entry: IndexMap<ModuleId, Vec<&Flow>> = IndexMap::new();
    for flow in candidates
        .iter()
        .copied()
        .filter(|f| !grouped.contains(f.slug.as_str()))
    {
        if let Some(entry) = flow.entry_point_module_id {
            by_entry.entry(entry).or_default().push(flow);
        }
    }
    for (entry, members) in &by_entry {
        if members.len() < MIN_FLOWS_PER_JOURNEY {
            continue;
        }
        let name = page_journey_name(*entry, module_map.get(entry).copied());
        let mut journey = aggregate(&name, members, &mut slugs);
        journey.entry_point_module_id = Some(*entry);
        journeys.push(journey);
    }

    debug!(
        candidates = candidates.len(),
        entity_journeys,
        page_journeys = journeys.len() - entity_journeys,
        "Built journeys"
    );
    journeys
}

fn aggregate(name: &str, members: &[&Flow], slugs: &mut SlugRegistry) -> Flow {
    let mut seen: HashSet<InteractionId> = HashSet::new();
    let interaction_ids: Vec<InteractionId> = members
        .iter()
        .flat_map(|f| f.interaction_ids.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect();

    let mut journey = Flow::new(name, slugs.claim(name), FlowTier::Journey)
        .with_interactions(interaction_ids);
    journey.stakeholder = most_frequent(members.iter().filter_map(|f| f.stakeholder.as_deref()));
    journey.subflow_slugs = members.iter().map(|f| f.slug.clone()).collect();
    journey.description = Some(
        members
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    );
    journey
}

/// Most common value; ties go to the value seen first.
fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

fn entity_journey_name(entity: &str, members: &[&Flow]) -> String {
    let mut actions: Vec<ActionType> = Vec::new();
    for action in members.iter().filter_map(|f| f.action_type) {
        if !actions.contains(&action) {
            actions.push(action);
        }
    }
    let base = format!("{} journey", capitalize(entity));
    if actions.is_empty() {
        return base;
    }
    let verbs = actions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    truncate_chars(&format!("{} ({})", base, verbs), MAX_NAME_CHARS)
}

fn page_journey_name(entry: ModuleId, module: Option<&Module>) -> String {
    let label = module
        .and_then(|m| m.description.as_deref())
        .map(|d| d.split(['.', '\n']).next().unwrap_or(d))
        .map(clean_sentence)
        .filter(|d| !d.is_empty())
        .or_else(|| module.map(|m| capitalize(m.name())))
        .unwrap_or_else(|| format!("Module {}", entry));
    truncate_chars(&format!("{} journey", label), MAX_NAME_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flow(slug: &str, entity: Option<&str>, entry: Option<ModuleId>, ids: Vec<i64>) -> Flow {
        let mut flow = Flow::new(slug, slug, FlowTier::Composite).with_interactions(ids);
        flow.target_entity = entity.map(str::to_string);
        flow.entry_point_module_id = entry;
        flow
    }

    #[test]
    fn fewer_than_two_flows_yield_nothing() {
        let flows = vec![flow("only", Some("Order"), None, vec![1])];
        assert!(build_journeys(&flows, &[]).is_empty());
    }

    #[test]
    fn overlapping_interactions_are_deduplicated_in_order() {
        let flows = vec![
            flow("view-orders", Some("order-list"), None, vec![1, 2, 3]),
            flow("edit-order", Some("Order-detail"), None, vec![3, 4, 5]),
        ];
        let journeys = build_journeys(&flows, &[]);
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].interaction_ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(journeys[0].tier, FlowTier::Journey);
        assert_eq!(journeys[0].action_type, None);
        assert_eq!(journeys[0].subflow_slugs, vec!["view-orders", "edit-order"]);
        assert_eq!(journeys[0].target_entity.as_deref(), Some("Order"));
    }

    #[test]
    fn page_pass_only_sees_flows_left_by_the_entity_pass() {
        let modules =
            vec![Module::new(9, "web.checkout").with_description("The checkout page. Collects payment")];
        let flows = vec![
            flow("a", Some("Cart"), Some(9), vec![1]),
            flow("b", Some("cart"), Some(9), vec![2]),
            flow("c", None, Some(9), vec![3]),
            flow("d", Some("Payment"), Some(9), vec![4]),
        ];
        let journeys = build_journeys(&flows, &modules);
        assert_eq!(journeys.len(), 2);
        assert_eq!(journeys[0].subflow_slugs, vec!["a", "b"]);
        assert_eq!(journeys[1].subflow_slugs, vec!["c", "d"]);
        assert_eq!(journeys[1].name, "Checkout page journey");
        assert_eq!(journeys[1].entry_point_module_id, Some(9));
    }

    #[test]
    fn stakeholder_is_most_frequent_with_first_seen_ties() {
        let mut flows = vec![
            flow("a", Some("Order"), None, vec![1]),
            flow("b", Some("Order"), None, vec![2]),
            flow("c", Some("Order"), None, vec![3]),
        ];
        flows[0].stakeholder = Some("admin".to_string());
        flows[1].stakeholder = Some("customer".to_string());
        flows[2].stakeholder = Some("customer".to_string());
        assert_eq!(
            build_journeys(&flows, &[])[0].stakeholder.as_deref(),
            Some("customer")
        );

        flows[2].stakeholder = None;
        assert_eq!(
            build_journeys(&flows, &[])[0].stakeholder.as_deref(),
            Some("admin")
        );
    }

    #[test]
    fn journey_slugs_avoid_existing_flow_slugs() {
        let mut flows = vec![
            flow("order-journey", Some("Order"), None, vec![1]),
            flow("b", Some("order"), None, vec![2]),
        ];
        flows[0].action_type = None;
        let journeys = build_journeys(&flows, &[]);
        assert_eq!(journeys[0].name, "Order journey");
        assert_eq!(journeys[0].slug, "order-journey-2");
    }

    #[test]
    fn atomic_flows_are_never_grouped() {
        let mut flows = vec![
            flow("view-orders", Some("Order"), None, vec![1]),
            flow("edit-order", Some("Order"), None, vec![2]),
        ];
        for f in &mut flows {
            f.tier = FlowTier::Atomic;
        }
        assert!(build_journeys(&flows, &[]).is_empty());

        flows[1].tier = FlowTier::Composite;
        assert!(build_journeys(&flows, &[]).is_empty());
    }

    #[test]
    fn journey_slugs_avoid_atomic_slugs() {
        let mut atomic = flow("cart-journey", None, None, vec![9]);
        atomic.tier = FlowTier::Atomic;
        let flows = vec![
            atomic,
            flow("a", Some("Cart"), None, vec![1]),
            flow("b", Some("Cart"), None, vec![2]),
        ];
        let journeys = build_journeys(&flows, &[]);
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].slug, "cart-journey-2");
        assert_eq!(journeys[0].subflow_slugs, vec!["a", "b"]);
    }

    #[test]
    fn existing_journeys_are_not_regrouped() {
        let mut old = flow("old", Some("Order"), None, vec![1]);
        old.tier = FlowTier::Journey;
        let flows = vec![old, flow("new", Some("Order"), None, vec![2])];
        assert!(build_journeys(&flows, &[]).is_empty());
    }
}
