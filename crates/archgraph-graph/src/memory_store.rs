use archgraph_core::{
    ArchGraphError, ArchitectureStore, Contract, DefinitionId, Flow, FlowId, FlowTier, ImportEdge,
    Interaction, InteractionDefinitionLink, InteractionId, InteractionUpsert, MemberSymbol, Module,
    ModuleFile, ModuleId, ModulePairEvidence, ParticipantId, RelationshipSample, Result,
    UpsertOutcome,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

const DEFAULT_MAX_SYMBOLS: usize = 20;

#[derive(Debug, Clone)]
struct RelationshipRecord {
    from_module_id: ModuleId,
    to_module_id: ModuleId,
    sample: RelationshipSample,
}

/// Process-local `ArchitectureStore` with the same upsert keys as the
/// persistent backends: interactions by ordered module pair, provenance links
/// by their full tuple, flows by slug.
pub struct InMemoryArchitectureStore {
    modules: RwLock<Vec<Module>>,
    module_files: RwLock<Vec<ModuleFile>>,
    imports: RwLock<Vec<ImportEdge>>,
    contracts: RwLock<Vec<Contract>>,
    definition_modules: DashMap<DefinitionId, ModuleId>,
    members: DashMap<ModuleId, Vec<MemberSymbol>>,
    relationships: RwLock<Vec<RelationshipRecord>>,
    interactions: DashMap<(ModuleId, ModuleId), Interaction>,
    links: RwLock<Vec<InteractionDefinitionLink>>,
    flows: RwLock<Vec<Flow>>,
    next_interaction_id: AtomicI64,
    next_flow_id: AtomicI64,
    max_symbols: usize,
}

impl Default for InMemoryArchitectureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryArchitectureStore {
    pub fn new() -> Self {
        Self::with_symbol_cap(DEFAULT_MAX_SYMBOLS)
    }

    pub fn with_symbol_cap(max_symbols: usize) -> Self {
        Self {
            modules: RwLock::new(Vec::new()),
            module_files: RwLock::new(Vec::new()),
            imports: RwLock::new(Vec::new()),
            contracts: RwLock::new(Vec::new()),
            definition_modules: DashMap::new(),
            members: DashMap::new(),
            relationships: RwLock::new(Vec::new()),
            interactions: DashMap::new(),
            links: RwLock::new(Vec::new()),
            flows: RwLock::new(Vec::new()),
            next_interaction_id: AtomicI64::new(1),
            next_flow_id: AtomicI64::new(1),
            max_symbols,
        }
    }

    pub fn add_module(&self, module: Module) {
        let mut modules = self.modules.write();
        modules.retain(|m| m.id != module.id);
        modules.push(module);
    }

    pub fn add_module_file(&self, module_id: ModuleId, file_id: i64) {
        let entry = ModuleFile { module_id, file_id };
        let mut files = self.module_files.write();
        if !files.contains(&entry) {
            files.push(entry);
        }
    }

    pub fn add_import(&self, edge: ImportEdge) {
        let mut imports = self.imports.write();
        if !imports.contains(&edge) {
            imports.push(edge);
        }
    }

    pub fn add_contract(&self, contract: Contract) {
        let mut contracts = self.contracts.write();
        contracts.retain(|c| c.id != contract.id);
        contracts.push(contract);
    }

    /// Register a definition as a member of `module_id`.
    pub fn add_definition(&self, module_id: ModuleId, member: MemberSymbol) {
        self.definition_modules
            .insert(member.definition_id, module_id);
        let mut members = self.members.entry(module_id).or_default();
        members.retain(|m| m.definition_id != member.definition_id);
        members.push(member);
    }

    /// Record symbol-level evidence that `from_module_id` relates to `to_module_id`.
    pub fn add_relationship(
        &self,
        from_module_id: ModuleId,
        to_module_id: ModuleId,
        sample: RelationshipSample,
    ) {
        self.relationships.write().push(RelationshipRecord {
            from_module_id,
            to_module_id,
            sample,
        });
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    pub fn interaction_between(&self, from: ModuleId, to: ModuleId) -> Option<Interaction> {
        self.interactions.get(&(from, to)).map(|i| i.clone())
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Insert or replace by slug, keeping the stored id.
    fn put_flow(&self, flows: &mut Vec<Flow>, mut flow: Flow) -> FlowId {
        if let Some(existing) = flows.iter_mut().find(|f| f.slug == flow.slug) {
            let id = existing
                .id
                .unwrap_or_else(|| Self::next_id(&self.next_flow_id));
            flow.id = Some(id);
            *existing = flow;
            return id;
        }
        let id = Self::next_id(&self.next_flow_id);
        flow.id = Some(id);
        flows.push(flow);
        id
    }
}

#[async_trait]
impl ArchitectureStore for InMemoryArchitectureStore {
    async fn modules(&self) -> Result<Vec<Module>> {
        let mut modules = self.modules.read().clone();
        modules.sort_by_key(|m| m.id);
        Ok(modules)
    }

    async fn module_files(&self) -> Result<Vec<ModuleFile>> {
        Ok(self.module_files.read().clone())
    }

    async fn import_edges(&self) -> Result<Vec<ImportEdge>> {
        Ok(self.imports.read().clone())
    }

    async fn contracts(&self) -> Result<Vec<Contract>> {
        let mut contracts = self.contracts.read().clone();
        contracts.sort_by_key(|c| c.id);
        Ok(contracts)
    }

    async fn definition_module(&self, definition_id: DefinitionId) -> Result<Option<ModuleId>> {
        Ok(self.definition_modules.get(&definition_id).map(|m| *m))
    }

    async fn set_participant_module(
        &self,
        participant_id: ParticipantId,
        module_id: ModuleId,
    ) -> Result<()> {
        let mut contracts = self.contracts.write();
        let participant = contracts
            .iter_mut()
            .flat_map(|c| c.participants.iter_mut())
            .find(|p| p.id == participant_id)
            .ok_or_else(|| {
                ArchGraphError::Store(format!("unknown contract participant {}", participant_id))
            })?;
        participant.module_id = Some(module_id);
        Ok(())
    }

    async fn interactions(&self) -> Result<Vec<Interaction>> {
        let mut interactions: Vec<Interaction> =
            self.interactions.iter().map(|e| e.value().clone()).collect();
        interactions.sort_by_key(|i| i.id);
        Ok(interactions)
    }

    async fn relationship_pairs(&self) -> Result<Vec<ModulePairEvidence>> {
        let mut counts: BTreeMap<(ModuleId, ModuleId), u32> = BTreeMap::new();
        for record in self.relationships.read().iter() {
            if record.from_module_id == record.to_module_id {
                continue;
            }
            *counts
                .entry((record.from_module_id, record.to_module_id))
                .or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((from_module_id, to_module_id), relationship_count)| ModulePairEvidence {
                from_module_id,
                to_module_id,
                relationship_count,
            })
            .collect())
    }

    async fn relationship_samples(
        &self,
        from_module_id: ModuleId,
        to_module_id: ModuleId,
        limit: usize,
    ) -> Result<Vec<RelationshipSample>> {
        Ok(self
            .relationships
            .read()
            .iter()
            .filter(|r| r.from_module_id == from_module_id && r.to_module_id == to_module_id)
            .take(limit)
            .map(|r| r.sample.clone())
            .collect())
    }

    async fn module_members(
        &self,
        module_id: ModuleId,
        limit: usize,
    ) -> Result<Vec<MemberSymbol>> {
        Ok(self
            .members
            .get(&module_id)
            .map(|members| members.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_interaction(&self, upsert: InteractionUpsert) -> Result<UpsertOutcome> {
        if upsert.from_module_id == upsert.to_module_id {
            return Err(ArchGraphError::InvalidOperation(format!(
                "self-interaction on module {}",
                upsert.from_module_id
            )));
        }

        let key = (upsert.from_module_id, upsert.to_module_id);
        let cap = upsert.symbol_cap_or(self.max_symbols);
        match self.interactions.entry(key) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().merge(&upsert, cap);
                Ok(UpsertOutcome {
                    id: existing.get().id,
                    created: false,
                })
            }
            Entry::Vacant(slot) => {
                let id: InteractionId = Self::next_id(&self.next_interaction_id);
                slot.insert(Interaction::from_upsert(id, upsert, cap));
                Ok(UpsertOutcome { id, created: true })
            }
        }
    }

    async fn insert_interaction_link(&self, link: InteractionDefinitionLink) -> Result<bool> {
        let mut links = self.links.write();
        if links.contains(&link) {
            return Ok(false);
        }
        links.push(link);
        Ok(true)
    }

    async fn interaction_links(&self) -> Result<Vec<InteractionDefinitionLink>> {
        Ok(self.links.read().clone())
    }

    async fn insert_flow(&self, flow: Flow) -> Result<FlowId> {
        Ok(self.put_flow(&mut self.flows.write(), flow))
    }

    async fn replace_flows(&self, tier: FlowTier, flows: Vec<Flow>) -> Result<Vec<FlowId>> {
        if let Some(stray) = flows.iter().find(|f| f.tier != tier) {
            return Err(ArchGraphError::InvalidOperation(format!(
                "flow {} is tier {:?}, expected {:?}",
                stray.slug, stray.tier, tier
            )));
        }
        let mut stored = self.flows.write();
        let before = stored.len();
        {
            let keep: HashSet<&str> = flows.iter().map(|f| f.slug.as_str()).collect();
            stored.retain(|f| f.tier != tier || keep.contains(f.slug.as_str()));
        }
        let removed = before - stored.len();

        let ids = flows
            .into_iter()
            .map(|flow| self.put_flow(&mut stored, flow))
            .collect::<Vec<_>>();
        debug!(?tier, stored = ids.len(), removed, "Replaced flows");
        Ok(ids)
    }

    async fn flows(&self) -> Result<Vec<Flow>> {
        Ok(self.flows.read().clone())
    }
}

impl InMemoryArchitectureStore {
    /// Ordered module pairs currently covered by an interaction.
    pub fn covered_pairs(&self) -> HashSet<(ModuleId, ModuleId)> {
        self.interactions.iter().map(|e| *e.key()).collect()
    }
}
