// ABOUTME: Pairs complementary contract participants into directed module interactions
// ABOUTME: Exact matches share a contract; fuzzy matches share a version-stripped key across contracts

use archgraph_core::{
    ArchitectureStore, Confidence, Contract, ContractId, ContractParticipant, DefinitionId,
    InteractionDefinitionLink, InteractionSource, InteractionUpsert, ModuleId, Result,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// API-version prefixes removed by fuzzy normalisation, longest first.
const VERSION_PREFIXES: &[&str] = &["/api/v1", "/api/v2", "/api/v3", "/api"];

const HTTP_VERBS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Matched keys listed per protocol in the interaction semantic.
const SEMANTIC_KEYS_PER_PROTOCOL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

/// One initiator/handler pairing. `from` is always the initiator side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractMatch {
    pub kind: MatchKind,
    pub protocol: String,
    /// The initiator's contract key.
    pub key: String,
    pub initiator_contract_id: ContractId,
    pub handler_contract_id: ContractId,
    pub from_module_id: ModuleId,
    pub to_module_id: ModuleId,
    pub from_definition_id: DefinitionId,
    pub to_definition_id: DefinitionId,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaterializeStats {
    pub created: usize,
    pub updated: usize,
    pub linked: usize,
}

/// Resolve missing participant module ids from their definitions. Returns the
/// number of participants updated.
pub async fn backfill_participant_modules(store: &dyn ArchitectureStore) -> Result<usize> {
    let mut updated = 0;
    for contract in store.contracts().await? {
        for participant in contract.participants.iter().filter(|p| p.module_id.is_none()) {
            let Some(module_id) = store.definition_module(participant.definition_id).await? else {
                continue;
            };
            store
                .set_participant_module(participant.id, module_id)
                .await?;
            updated += 1;
        }
    }
    if updated > 0 {
        info!(updated, "Backfilled contract participant modules");
    }
    Ok(updated)
}

/// Exact phase over every contract, then the fuzzy phase over contracts the
/// exact phase left unmatched.
pub fn match_contracts(contracts: &[Contract]) -> Vec<ContractMatch> {
    let mut matches = Vec::new();
    let mut matched_contracts: HashSet<ContractId> = HashSet::new();

    for contract in contracts {
        let before = matches.len();
        for initiator in contract.participants.iter() {
            let Some(complement) = initiator.role.complement() else {
                continue;
            };
            for handler in contract.participants.iter().filter(|p| p.role == complement) {
                if let Some(m) = pair(MatchKind::Exact, contract, initiator, contract, handler) {
                    matches.push(m);
                }
            }
        }
        if matches.len() > before {
            matched_contracts.insert(contract.id);
        }
    }
    let exact = matches.len();

    let unmatched: Vec<&Contract> = contracts
        .iter()
        .filter(|c| !matched_contracts.contains(&c.id))
        .collect();
    matches.extend(fuzzy_matches(&unmatched));

    debug!(
        contracts = contracts.len(),
        exact,
        fuzzy = matches.len() - exact,
        "Matched contract participants"
    );
    matches
}

fn fuzzy_matches(contracts: &[&Contract]) -> Vec<ContractMatch> {
    let mut by_key: IndexMap<String, Vec<(&Contract, &ContractParticipant)>> = IndexMap::new();
    for contract in contracts {
        let key = format!(
            "{}:{}",
            contract.protocol,
            normalize_fuzzy_key(&contract.normalized_key)
        );
        for participant in &contract.participants {
            by_key
                .entry(key.clone())
                .or_default()
                .push((contract, participant));
        }
    }

    let mut seen: HashSet<(ContractId, ContractId, ModuleId, ModuleId)> = HashSet::new();
    let mut matches = Vec::new();
    for members in by_key.values() {
        for (initiator_contract, initiator) in members {
            let Some(complement) = initiator.role.complement() else {
                continue;
            };
            for (handler_contract, handler) in members {
                if handler.role != complement || handler_contract.id == initiator_contract.id {
                    continue;
                }
                let Some(m) = pair(
                    MatchKind::Fuzzy,
                    initiator_contract,
                    initiator,
                    handler_contract,
                    handler,
                ) else {
                    continue;
                };
                let tuple = (
                    m.initiator_contract_id,
                    m.handler_contract_id,
                    m.from_module_id,
                    m.to_module_id,
                );
                if seen.insert(tuple) {
                    matches.push(m);
                }
            }
        }
    }
    matches
}

fn pair(
    kind: MatchKind,
    initiator_contract: &Contract,
    initiator: &ContractParticipant,
    handler_contract: &Contract,
    handler: &ContractParticipant,
) -> Option<ContractMatch> {
    let from_module_id = initiator.module_id?;
    let to_module_id = handler.module_id?;
    if from_module_id == to_module_id {
        return None;
    }
    Some(ContractMatch {
        kind,
        protocol: initiator_contract.protocol.clone(),
        key: initiator_contract.normalized_key.clone(),
        initiator_contract_id: initiator_contract.id,
        handler_contract_id: handler_contract.id,
        from_module_id,
        to_module_id,
        from_definition_id: initiator.definition_id,
        to_definition_id: handler.definition_id,
    })
}

/// Drop a leading HTTP verb and one API-version prefix that ends on a segment
/// boundary: `GET /api/v1/users/` becomes `/users`, `/apifoo` is untouched.
pub fn normalize_fuzzy_key(key: &str) -> String {
    let trimmed = key.trim();
    let path = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) if HTTP_VERBS.contains(&verb.to_ascii_uppercase().as_str()) => {
            rest.trim_start()
        }
        _ => trimmed,
    };

    let stripped = VERSION_PREFIXES
        .iter()
        .find_map(|prefix| {
            let rest = path.strip_prefix(prefix)?;
            (rest.is_empty() || rest.starts_with('/')).then_some(rest)
        })
        .unwrap_or(path);

    let without_slash = stripped.trim_end_matches('/');
    if without_slash.is_empty() && (stripped.starts_with('/') || path.starts_with('/')) {
        "/".to_string()
    } else {
        without_slash.to_string()
    }
}

/// `"http: k1, k2, k3 (+2 more); ws: k4"`, protocols sorted, keys deduplicated.
pub fn semantic_for(matches: &[&ContractMatch]) -> String {
    let mut keys_by_protocol: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for m in matches {
        let keys = keys_by_protocol.entry(m.protocol.as_str()).or_default();
        if !keys.contains(&m.key.as_str()) {
            keys.push(m.key.as_str());
        }
    }

    keys_by_protocol
        .into_iter()
        .map(|(protocol, keys)| {
            let shown = keys
                .iter()
                .take(SEMANTIC_KEYS_PER_PROTOCOL)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            if keys.len() > SEMANTIC_KEYS_PER_PROTOCOL {
                format!(
                    "{}: {} (+{} more)",
                    protocol,
                    shown,
                    keys.len() - SEMANTIC_KEYS_PER_PROTOCOL
                )
            } else {
                format!("{}: {}", protocol, shown)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Upsert one interaction per ordered module pair and a provenance link per match.
pub async fn materialize(
    store: &dyn ArchitectureStore,
    matches: &[ContractMatch],
) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();
    let mut by_pair: BTreeMap<(ModuleId, ModuleId), Vec<&ContractMatch>> = BTreeMap::new();
    for m in matches {
        by_pair
            .entry((m.from_module_id, m.to_module_id))
            .or_default()
            .push(m);
    }

    for ((from_module_id, to_module_id), group) in by_pair {
        let upsert = InteractionUpsert::new(
            from_module_id,
            to_module_id,
            InteractionSource::ContractMatched,
        )
        .with_weight(group.len() as u32)
        .with_confidence(Confidence::High)
        .with_semantic(semantic_for(&group));

        let outcome = store.upsert_interaction(upsert).await?;
        if outcome.created {
            stats.created += 1;
        } else {
            stats.updated += 1;
        }

        for m in group {
            let link = InteractionDefinitionLink {
                interaction_id: outcome.id,
                from_definition_id: m.from_definition_id,
                to_definition_id: m.to_definition_id,
                contract_id: Some(m.initiator_contract_id),
            };
            if store.insert_interaction_link(link).await? {
                stats.linked += 1;
            }
        }
    }

    info!(
        created = stats.created,
        updated = stats.updated,
        linked = stats.linked,
        "Materialized contract interactions"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use archgraph_core::ParticipantRole;
    use pretty_assertions::assert_eq;

    fn http(id: ContractId, key: &str) -> Contract {
        Contract::new(id, "http", key)
    }

    #[test]
    fn one_server_one_client_yields_one_match() {
        let contract = http(1, "GET /orders")
            .with_participant(1, 10, Some(1), ParticipantRole::Server)
            .with_participant(2, 20, Some(2), ParticipantRole::Client);

        let matches = match_contracts(&[contract]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::Exact);
        assert_eq!(matches[0].from_module_id, 2);
        assert_eq!(matches[0].to_module_id, 1);
        assert_eq!(matches[0].from_definition_id, 20);
    }

    #[test]
    fn same_module_and_unresolved_participants_never_match() {
        let same_module = http(1, "GET /a")
            .with_participant(1, 10, Some(1), ParticipantRole::Server)
            .with_participant(2, 11, Some(1), ParticipantRole::Client);
        let unresolved = http(2, "GET /b")
            .with_participant(3, 12, None, ParticipantRole::Server)
            .with_participant(4, 13, Some(2), ParticipantRole::Client);
        assert!(match_contracts(&[same_module, unresolved]).is_empty());
    }

    #[test]
    fn every_initiator_pairs_with_every_handler() {
        let contract = Contract::new(1, "queue", "orders.created")
            .with_participant(1, 10, Some(1), ParticipantRole::Producer)
            .with_participant(2, 20, Some(2), ParticipantRole::Consumer)
            .with_participant(3, 30, Some(3), ParticipantRole::Consumer);
        let matches = match_contracts(&[contract]);
        let pairs: Vec<_> = matches
            .iter()
            .map(|m| (m.from_module_id, m.to_module_id))
            .collect();
        assert_eq!(pairs, vec![(2, 1), (3, 1)]);
    }

    #[test]
    fn fuzzy_keys_strip_verbs_and_versions_on_segment_boundaries() {
        assert_eq!(normalize_fuzzy_key("GET /api/v1/users"), "/users");
        assert_eq!(normalize_fuzzy_key("POST /api/users/"), "/users");
        assert_eq!(normalize_fuzzy_key("/api/foo"), "/foo");
        assert_eq!(normalize_fuzzy_key("/apifoo"), "/apifoo");
        assert_eq!(normalize_fuzzy_key("/api/v10/items"), "/v10/items");
        assert_eq!(normalize_fuzzy_key("GET /api"), "/");
        assert_eq!(normalize_fuzzy_key("orders.created"), "orders.created");
    }

    #[test]
    fn fuzzy_phase_pairs_across_contracts_once() {
        let server = http(1, "GET /users")
            .with_participant(1, 10, Some(1), ParticipantRole::Server);
        let client = http(2, "GET /api/v1/users")
            .with_participant(2, 20, Some(2), ParticipantRole::Client)
            .with_participant(3, 21, Some(2), ParticipantRole::Client);

        let matches = match_contracts(&[server, client]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::Fuzzy);
        assert_eq!(matches[0].initiator_contract_id, 2);
        assert_eq!(matches[0].handler_contract_id, 1);
    }

    #[test]
    fn fuzzy_phase_skips_contracts_with_exact_matches() {
        let exact = http(1, "GET /users")
            .with_participant(1, 10, Some(1), ParticipantRole::Server)
            .with_participant(2, 20, Some(2), ParticipantRole::Client);
        let other = http(2, "GET /api/users")
            .with_participant(3, 30, Some(3), ParticipantRole::Client);

        let matches = match_contracts(&[exact, other]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::Exact);
    }

    #[test]
    fn fuzzy_protocol_must_agree() {
        let server = http(1, "/events")
            .with_participant(1, 10, Some(1), ParticipantRole::Server);
        let client = Contract::new(2, "ws", "/events")
            .with_participant(2, 20, Some(2), ParticipantRole::Client);
        assert!(match_contracts(&[server, client]).is_empty());
    }

    #[test]
    fn semantic_groups_by_protocol_and_truncates() {
        let make = |protocol: &str, key: &str| ContractMatch {
            kind: MatchKind::Exact,
            protocol: protocol.to_string(),
            key: key.to_string(),
            initiator_contract_id: 1,
            handler_contract_id: 1,
            from_module_id: 1,
            to_module_id: 2,
            from_definition_id: 1,
            to_definition_id: 2,
        };
        let matches = vec![
            make("ws", "orders"),
            make("http", "GET /a"),
            make("http", "GET /b"),
            make("http", "GET /a"),
            make("http", "GET /c"),
            make("http", "GET /d"),
            make("http", "GET /e"),
        ];
        let refs: Vec<&ContractMatch> = matches.iter().collect();
        assert_eq!(
            semantic_for(&refs),
            "http: GET /a, GET /b, GET /c (+2 more); ws: orders"
        );
    }
}
