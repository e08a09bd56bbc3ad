use crate::analyzers::{
    backfill_participant_modules, build_atomic_flows, build_journeys, match_contracts,
    materialize, run_coverage_inference, verify_flows, CoverageReport, MaterializeStats,
};
use archgraph_ai::{LLMProvider, LLMProviderFactory};
use archgraph_core::{
    ArchGraphConfig, ArchGraphError, ArchitectureStore, FlowTier, Result, TopologyConfig,
};
use archgraph_graph::compute_process_groups;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Summary of one end-to-end topology run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub participants_backfilled: usize,
    pub process_groups: usize,
    pub modules: usize,
    pub contract_matches: usize,
    pub materialize: MaterializeStats,
    /// `None` when no completion provider is configured.
    pub coverage: Option<CoverageReport>,
    pub atomic_flows: usize,
    pub journeys: usize,
    pub broken_flows: usize,
    pub flows_with_missing_interactions: usize,
}

/// Runs every topology stage in order against one store.
pub struct TopologyPipeline {
    store: Arc<dyn ArchitectureStore>,
    llm: Option<Arc<dyn LLMProvider>>,
    config: TopologyConfig,
}

impl TopologyPipeline {
    pub fn new(store: Arc<dyn ArchitectureStore>, config: TopologyConfig) -> Self {
        Self {
            store,
            llm: None,
            config,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build from loaded configuration; a provider is created only when `llm.enabled` is set.
    pub fn from_config(config: &ArchGraphConfig, store: Arc<dyn ArchitectureStore>) -> Result<Self> {
        let pipeline = Self::new(store, config.topology.clone());
        if !config.llm.enabled {
            return Ok(pipeline);
        }
        let llm = LLMProviderFactory::create_from_config(&config.llm)
            .map_err(|e| ArchGraphError::Config(e.to_string()))?;
        Ok(pipeline.with_llm(llm))
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<PipelineReport> {
        let store = self.store.as_ref();

        let participants_backfilled = backfill_participant_modules(store).await?;

        let modules = store.modules().await?;
        let groups = compute_process_groups(
            &modules,
            &store.module_files().await?,
            &store.import_edges().await?,
        );

        let matches = match_contracts(&store.contracts().await?);
        let materialized = materialize(store, &matches).await?;

        let coverage = match &self.llm {
            Some(llm) => {
                Some(run_coverage_inference(store, llm.as_ref(), &groups, &self.config).await?)
            }
            None => {
                info!("No completion provider configured, skipping coverage inference");
                None
            }
        };

        let atomic = build_atomic_flows(
            &store.interactions().await?,
            &modules,
            self.config.max_flow_length,
        );
        let atomic_flows = atomic.len();
        store.replace_flows(FlowTier::Atomic, atomic).await?;

        let journeys = build_journeys(&store.flows().await?, &modules);
        let journey_count = journeys.len();
        store.replace_flows(FlowTier::Journey, journeys).await?;

        let verification = verify_flows(&store.flows().await?, &store.interactions().await?);
        let report = PipelineReport {
            participants_backfilled,
            process_groups: groups.group_count(),
            modules: modules.len(),
            contract_matches: matches.len(),
            materialize: materialized,
            coverage,
            atomic_flows,
            journeys: journey_count,
            broken_flows: verification.iter().filter(|v| v.broken_chain.is_some()).count(),
            flows_with_missing_interactions: verification
                .iter()
                .filter(|v| !v.missing_interactions.is_empty())
                .count(),
        };

        info!(
            modules = report.modules,
            groups = report.process_groups,
            matches = report.contract_matches,
            atomic_flows = report.atomic_flows,
            journeys = report.journeys,
            "Topology pipeline finished"
        );
        Ok(report)
    }
}
