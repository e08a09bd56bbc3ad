use crate::{
    Contract, DefinitionId, Flow, FlowId, FlowTier, ImportEdge, Interaction, InteractionDefinitionLink,
    InteractionUpsert, MemberSymbol, Module, ModuleFile, ModuleId, ModulePairEvidence,
    ParticipantId, RelationshipSample, Result, UpsertOutcome,
};
use async_trait::async_trait;

/// Persistent graph store consumed by every topology stage.
///
/// Reads return snapshots; every write is an upsert keyed by a natural key so a
/// stage can be re-run after a partial failure without duplicating facts.
#[async_trait]
pub trait ArchitectureStore: Send + Sync {
    async fn modules(&self) -> Result<Vec<Module>>;

    /// Complete file-to-module assignment.
    async fn module_files(&self) -> Result<Vec<ModuleFile>>;

    /// Runtime and type-only import edges between files.
    async fn import_edges(&self) -> Result<Vec<ImportEdge>>;

    async fn contracts(&self) -> Result<Vec<Contract>>;

    async fn definition_module(&self, definition_id: DefinitionId) -> Result<Option<ModuleId>>;

    async fn set_participant_module(
        &self,
        participant_id: ParticipantId,
        module_id: ModuleId,
    ) -> Result<()>;

    async fn interactions(&self) -> Result<Vec<Interaction>>;

    /// Module pairs with symbol-level relationship evidence.
    async fn relationship_pairs(&self) -> Result<Vec<ModulePairEvidence>>;

    async fn relationship_samples(
        &self,
        from_module_id: ModuleId,
        to_module_id: ModuleId,
        limit: usize,
    ) -> Result<Vec<RelationshipSample>>;

    async fn module_members(&self, module_id: ModuleId, limit: usize)
        -> Result<Vec<MemberSymbol>>;

    /// Insert or merge by `(from_module_id, to_module_id)`.
    async fn upsert_interaction(&self, upsert: InteractionUpsert) -> Result<UpsertOutcome>;

    /// Returns `false` when the link already existed.
    async fn insert_interaction_link(&self, link: InteractionDefinitionLink) -> Result<bool>;

    async fn interaction_links(&self) -> Result<Vec<InteractionDefinitionLink>>;

    /// Insert or replace by slug.
    async fn insert_flow(&self, flow: Flow) -> Result<FlowId>;

    /// Make `flows` the complete set stored for `tier`. Stored flows of that
    /// tier whose slug is absent are deleted; the rest keep their id by slug.
    /// Returns the ids in input order.
    async fn replace_flows(&self, tier: FlowTier, flows: Vec<Flow>) -> Result<Vec<FlowId>>;

    async fn flows(&self) -> Result<Vec<Flow>>;
}
