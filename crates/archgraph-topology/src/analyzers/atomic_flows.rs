// ABOUTME: Turns chains of runtime interactions into short, named tier-0 flows
// ABOUTME: Groups edges by entity pair, walks chains greedily, and windows long chains

use super::entity::{is_generic, module_entity};
use super::naming::{clean_sentence, truncate_chars, SlugRegistry};
use archgraph_core::{
    ActionType, Flow, FlowStep, FlowTier, Interaction, InteractionSource, Module, ModuleId,
};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const DEFAULT_MAX_FLOW_LENGTH: usize = 3;

const MAX_NAME_CHARS: usize = 60;
const MIN_SEMANTIC_CHARS: usize = 5;

/// Checked in order; the first category with a keyword hit wins.
const ACTION_KEYWORDS: &[(ActionType, &[&str])] = &[
    (
        ActionType::Authenticate,
        &["login", "logout", "signin", "signup", "auth", "authenticate", "token", "session", "password"],
    ),
    (ActionType::Delete, &["delete", "remove", "destroy", "purge"]),
    (ActionType::Create, &["create", "add", "register", "submit", "insert", "post"]),
    (ActionType::Update, &["update", "edit", "modify", "patch", "put", "save", "change"]),
    (ActionType::Notify, &["notify", "notification", "email", "alert", "publish", "emit", "broadcast"]),
    (ActionType::Process, &["process", "compute", "calculate", "validate", "sync", "import", "export", "handle"]),
    (ActionType::View, &["get", "fetch", "list", "view", "show", "display", "load", "read", "query", "search", "render"]),
];

/// Classify an action from free text by keyword, `None` when nothing matches.
pub fn classify_action(text: &str) -> Option<ActionType> {
    let words: HashSet<String> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect();
    ACTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| words.contains(*k)))
        .map(|(action, _)| *action)
}

/// Flows must carry runtime behaviour: import-only edges and edges touching test modules are excluded.
fn is_runtime(interaction: &Interaction, modules: &HashMap<ModuleId, &Module>) -> bool {
    if interaction.source == InteractionSource::AstImport {
        return false;
    }
    let is_test = |id: ModuleId| modules.get(&id).is_some_and(|m| m.is_test_module());
    !is_test(interaction.from_module_id) && !is_test(interaction.to_module_id)
}

/// Build tier-0 flows. Deterministic for a given interaction set.
pub fn build_atomic_flows(
    interactions: &[Interaction],
    modules: &[Module],
    max_flow_length: usize,
) -> Vec<Flow> {
    let window = max_flow_length.max(1);
    let module_map: HashMap<ModuleId, &Module> = modules.iter().map(|m| (m.id, m)).collect();
    let entities: HashMap<ModuleId, String> = modules
        .iter()
        .map(|m| (m.id, module_entity(Some(m))))
        .collect();
    let entity_of = |id: ModuleId| -> String {
        entities
            .get(&id)
            .cloned()
            .unwrap_or_else(|| module_entity(None))
    };

    let mut runtime: Vec<&Interaction> = interactions
        .iter()
        .filter(|i| is_runtime(i, &module_map))
        .collect();
    runtime.sort_by_key(|i| i.id);

    let mut groups: IndexMap<String, Vec<&Interaction>> = IndexMap::new();
    for interaction in runtime {
        let from_entity = entity_of(interaction.from_module_id);
        let to_entity = entity_of(interaction.to_module_id);
        let key = if is_generic(&from_entity) && is_generic(&to_entity) {
            format!(
                "{}:{}->{}",
                from_entity, interaction.from_module_id, interaction.to_module_id
            )
        } else if from_entity <= to_entity {
            format!("{}|{}", from_entity, to_entity)
        } else {
            format!("{}|{}", to_entity, from_entity)
        };
        groups.entry(key).or_default().push(interaction);
    }

    let mut slugs = SlugRegistry::new();
    let mut flows = Vec::new();
    for members in groups.values() {
        for chain in find_chains(members) {
            for segment in chain.chunks(window) {
                flows.push(flow_for_segment(segment, &module_map, &entity_of, &mut slugs));
            }
        }
    }

    debug!(
        interactions = interactions.len(),
        groups = groups.len(),
        flows = flows.len(),
        "Built atomic flows"
    );
    flows
}

/// Greedy chain walk. Starts are edges whose source is not a target inside the
/// group; edges never reached from a start become one-edge chains.
pub fn find_chains<'a>(members: &[&'a Interaction]) -> Vec<Vec<&'a Interaction>> {
    let targets: HashSet<ModuleId> = members.iter().map(|i| i.to_module_id).collect();
    let mut used = vec![false; members.len()];
    let mut chains = Vec::new();

    for start in 0..members.len() {
        if used[start] || targets.contains(&members[start].from_module_id) {
            continue;
        }
        used[start] = true;
        let mut chain = vec![members[start]];
        let mut current = members[start].to_module_id;
        while let Some(next) =
            (0..members.len()).find(|&j| !used[j] && members[j].from_module_id == current)
        {
            used[next] = true;
            chain.push(members[next]);
            current = members[next].to_module_id;
        }
        chains.push(chain);
    }

    for (index, interaction) in members.iter().enumerate() {
        if !used[index] {
            chains.push(vec![*interaction]);
        }
    }
    chains
}

fn flow_for_segment(
    segment: &[&Interaction],
    modules: &HashMap<ModuleId, &Module>,
    entity_of: &dyn Fn(ModuleId) -> String,
    slugs: &mut SlugRegistry,
) -> Flow {
    let first = segment[0];
    let module_name = |id: ModuleId| {
        modules
            .get(&id)
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| format!("module-{}", id))
    };

    let entity = [first.from_module_id, first.to_module_id]
        .into_iter()
        .map(entity_of)
        .find(|e| !is_generic(e));

    let semantic_name = first
        .semantic
        .as_deref()
        .map(clean_sentence)
        .filter(|s| s.chars().count() >= MIN_SEMANTIC_CHARS);
    let name = match (semantic_name, &entity) {
        (Some(text), _) => truncate_chars(&text, MAX_NAME_CHARS),
        (None, Some(entity)) => truncate_chars(
            &format!(
                "{}: {} calls {}",
                entity,
                module_name(first.from_module_id),
                module_name(first.to_module_id)
            ),
            MAX_NAME_CHARS,
        ),
        (None, None) => truncate_chars(
            &format!(
                "{} calls {}",
                module_name(first.from_module_id),
                module_name(first.to_module_id)
            ),
            MAX_NAME_CHARS,
        ),
    };
    let slug = slugs.claim(&name);

    let action_text = segment
        .iter()
        .filter_map(|i| i.semantic.as_deref())
        .collect::<Vec<_>>()
        .join(" ");

    let mut path = vec![module_name(first.from_module_id)];
    path.extend(segment.iter().map(|i| module_name(i.to_module_id)));

    let mut flow = Flow::new(name, slug, FlowTier::Atomic)
        .with_entry_point(first.from_module_id)
        .with_interactions(segment.iter().map(|i| i.id).collect());
    flow.description = Some(path.join(" -> "));
    flow.steps = segment
        .iter()
        .map(|i| FlowStep::for_interaction(i.id, i.from_module_id, i.to_module_id))
        .collect();
    if let Some(entity) = entity {
        flow = flow.with_target_entity(entity);
    }
    if let Some(action) = classify_action(&action_text) {
        flow = flow.with_action(action);
    }
    flow
}
