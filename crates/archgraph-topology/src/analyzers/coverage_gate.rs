// ABOUTME: Raises relationship coverage by routing uncovered module pairs through a bounded inference loop
// ABOUTME: A deterministic pre-filter decides which pairs need inference; confirmations are re-validated before commit

use crate::gate_csv::{parse_gate_response, GateAction};
use crate::gate_prompts::{build_gate_user_prompt, PairContext, COVERAGE_GATE_SYSTEM};
use archgraph_ai::LLMProvider;
use archgraph_core::{
    ArchGraphError, ArchitectureStore, Interaction, InteractionSource, InteractionUpsert, Module,
    ModuleId, ModulePairEvidence, Result, TopologyConfig,
};
use archgraph_graph::{ImportGraph, ProcessGroups};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

type Pair = (ModuleId, ModuleId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    MissingModule,
    ReverseAstInteraction,
    ReverseImport,
    NoImportEvidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferReason {
    CrossProcess,
    ForwardImport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GateDecision {
    AutoSkip(SkipReason),
    Infer(InferReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    ThresholdReached,
    NoUncoveredPairs,
    NoInferenceCandidates,
    NoProgress,
    RetryBudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub initial_coverage: f64,
    pub final_coverage: f64,
    pub iterations: u32,
    pub auto_skipped: usize,
    pub sent_to_inference: usize,
    pub interactions_added: usize,
    pub parse_errors: usize,
    pub rejected_confirmations: usize,
    pub stop_reason: StopReason,
}

/// Read-only view of the facts the pre-filter consults.
pub struct GateContext<'a> {
    pub modules: &'a HashMap<ModuleId, Module>,
    pub groups: &'a ProcessGroups,
    pub imports: &'a ImportGraph,
    /// Ordered pairs already covered by an AST-sourced interaction.
    pub ast_pairs: &'a HashSet<Pair>,
}

/// Pre-filter one uncovered pair, first matching rule wins.
pub fn classify_pair(from: ModuleId, to: ModuleId, ctx: &GateContext<'_>) -> GateDecision {
    if !ctx.modules.contains_key(&from) || !ctx.modules.contains_key(&to) {
        return GateDecision::AutoSkip(SkipReason::MissingModule);
    }
    if !ctx.groups.are_same_process(from, to) {
        return GateDecision::Infer(InferReason::CrossProcess);
    }
    if ctx.imports.has_import_path(from, to) {
        return GateDecision::Infer(InferReason::ForwardImport);
    }
    if ctx.ast_pairs.contains(&(to, from)) {
        return GateDecision::AutoSkip(SkipReason::ReverseAstInteraction);
    }
    if ctx.imports.has_import_path(to, from) {
        return GateDecision::AutoSkip(SkipReason::ReverseImport);
    }
    GateDecision::AutoSkip(SkipReason::NoImportEvidence)
}

/// Covered pairs over all pairs; no evidence at all counts as fully covered.
pub fn coverage_ratio(pairs: &[ModulePairEvidence], covered: &HashSet<Pair>) -> f64 {
    if pairs.is_empty() {
        return 1.0;
    }
    let hit = pairs
        .iter()
        .filter(|p| covered.contains(&(p.from_module_id, p.to_module_id)))
        .count();
    hit as f64 / pairs.len() as f64
}

pub struct CoverageGate<'a> {
    store: &'a dyn ArchitectureStore,
    llm: &'a dyn LLMProvider,
    config: &'a TopologyConfig,
}

impl<'a> CoverageGate<'a> {
    pub fn new(
        store: &'a dyn ArchitectureStore,
        llm: &'a dyn LLMProvider,
        config: &'a TopologyConfig,
    ) -> Self {
        Self { store, llm, config }
    }

    pub async fn run(&self, groups: &ProcessGroups) -> Result<CoverageReport> {
        let modules: HashMap<ModuleId, Module> = self
            .store
            .modules()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let by_path: HashMap<&str, ModuleId> = modules
            .values()
            .map(|m| (m.full_path.as_str(), m.id))
            .collect();
        let imports = ImportGraph::new(
            &self.store.module_files().await?,
            &self.store.import_edges().await?,
        );
        let pairs = self.store.relationship_pairs().await?;
        let evidence: HashMap<Pair, u32> = pairs
            .iter()
            .map(|p| ((p.from_module_id, p.to_module_id), p.relationship_count))
            .collect();

        let mut interactions = self.store.interactions().await?;
        let initial_coverage = coverage_ratio(&pairs, &covered_pairs(&interactions));

        let mut skipped: HashSet<Pair> = HashSet::new();
        let mut submitted: HashSet<Pair> = HashSet::new();
        let mut report = CoverageReport {
            initial_coverage,
            final_coverage: initial_coverage,
            iterations: 0,
            auto_skipped: 0,
            sent_to_inference: 0,
            interactions_added: 0,
            parse_errors: 0,
            rejected_confirmations: 0,
            stop_reason: StopReason::RetryBudgetExhausted,
        };

        for iteration in 1..=self.config.max_gate_retries {
            let covered = covered_pairs(&interactions);
            let coverage = coverage_ratio(&pairs, &covered);
            let uncovered: Vec<Pair> = pairs
                .iter()
                .map(|p| (p.from_module_id, p.to_module_id))
                .filter(|pair| pair.0 != pair.1 && !covered.contains(pair))
                .collect();

            if uncovered.is_empty() {
                report.stop_reason = StopReason::NoUncoveredPairs;
                break;
            }
            if coverage >= self.config.min_rel_coverage {
                report.stop_reason = StopReason::ThresholdReached;
                break;
            }

            let ast_pairs: HashSet<Pair> = interactions
                .iter()
                .filter(|i| i.source == InteractionSource::Ast)
                .map(Interaction::pair)
                .collect();
            let ctx = GateContext {
                modules: &modules,
                groups,
                imports: &imports,
                ast_pairs: &ast_pairs,
            };

            let mut batch: Vec<Pair> = Vec::new();
            for (from, to) in uncovered {
                match classify_pair(from, to, &ctx) {
                    GateDecision::AutoSkip(reason) => {
                        if skipped.insert((from, to)) {
                            debug!(from, to, ?reason, "Auto-skipped uncovered pair");
                        }
                    }
                    GateDecision::Infer(_) if submitted.contains(&(from, to)) => {}
                    GateDecision::Infer(_) => batch.push((from, to)),
                }
            }
            report.auto_skipped = skipped.len();

            if batch.is_empty() {
                report.stop_reason = StopReason::NoInferenceCandidates;
                break;
            }
            report.iterations = iteration;

            let contexts = self
                .pair_contexts(&batch, &modules, groups, &imports, &ast_pairs, &evidence)
                .await?;
            info!(
                iteration,
                coverage,
                candidates = batch.len(),
                "Submitting uncovered pairs for inference"
            );
            let response = self
                .llm
                .complete(COVERAGE_GATE_SYSTEM, &build_gate_user_prompt(&contexts))
                .await
                .map_err(|e| ArchGraphError::Completion(e.to_string()))?;
            submitted.extend(batch.iter().copied());
            report.sent_to_inference += batch.len();

            let parsed = parse_gate_response(&response);
            report.parse_errors += parsed.parse_errors;
            let current = covered_pairs(&self.store.interactions().await?);

            let batch_set: HashSet<Pair> = batch.iter().copied().collect();
            let mut accepted: HashSet<Pair> = HashSet::new();
            let mut added = 0;
            for row in parsed.rows.iter().filter(|r| r.action == GateAction::Confirm) {
                let (Some(&from), Some(&to)) = (
                    by_path.get(row.from_module_path.as_str()),
                    by_path.get(row.to_module_path.as_str()),
                ) else {
                    report.parse_errors += 1;
                    continue;
                };
                let pair = (from, to);
                if from == to
                    || !batch_set.contains(&pair)
                    || current.contains(&pair)
                    || !accepted.insert(pair)
                {
                    report.rejected_confirmations += 1;
                    continue;
                }

                let mut upsert = InteractionUpsert::new(from, to, InteractionSource::LlmInferred)
                    .with_confidence(row.confidence)
                    .with_weight(evidence.get(&pair).copied().unwrap_or(1))
                    .with_symbol_cap(self.config.max_symbols_per_interaction);
                if !row.reason.is_empty() {
                    upsert = upsert.with_semantic(row.reason.clone());
                }
                if let Some(pair_ctx) = contexts.iter().find(|c| {
                    c.from_module_path == row.from_module_path
                        && c.to_module_path == row.to_module_path
                }) {
                    let callees = pair_ctx.samples.iter().map(|s| s.to_symbol.clone());
                    upsert = upsert.with_symbols(callees.collect());
                }

                if self.store.upsert_interaction(upsert).await?.created {
                    added += 1;
                }
            }

            report.interactions_added += added;
            if parsed.parse_errors > 0 {
                warn!(
                    iteration,
                    parse_errors = parsed.parse_errors,
                    "Dropped malformed gate rows"
                );
            }
            if added == 0 {
                report.stop_reason = StopReason::NoProgress;
                break;
            }
            interactions = self.store.interactions().await?;
        }

        interactions = self.store.interactions().await?;
        report.final_coverage = coverage_ratio(&pairs, &covered_pairs(&interactions));
        info!(
            initial = report.initial_coverage,
            final_coverage = report.final_coverage,
            added = report.interactions_added,
            stop = ?report.stop_reason,
            "Coverage inference finished"
        );
        Ok(report)
    }

    async fn pair_contexts(
        &self,
        batch: &[Pair],
        modules: &HashMap<ModuleId, Module>,
        groups: &ProcessGroups,
        imports: &ImportGraph,
        ast_pairs: &HashSet<Pair>,
        evidence: &HashMap<Pair, u32>,
    ) -> Result<Vec<PairContext>> {
        let samples = self.config.context_samples;
        let mut contexts = Vec::with_capacity(batch.len());
        for &(from, to) in batch {
            let (Some(from_module), Some(to_module)) = (modules.get(&from), modules.get(&to)) else {
                continue;
            };
            contexts.push(PairContext {
                from_module_path: from_module.full_path.clone(),
                to_module_path: to_module.full_path.clone(),
                from_description: from_module.description.clone(),
                to_description: to_module.description.clone(),
                same_process: groups.are_same_process(from, to),
                forward_import: imports.has_import_path(from, to),
                reverse_import: imports.has_import_path(to, from),
                reverse_ast: ast_pairs.contains(&(to, from)),
                relationship_count: evidence.get(&(from, to)).copied().unwrap_or(0),
                samples: self.store.relationship_samples(from, to, samples).await?,
                from_members: self.store.module_members(from, samples).await?,
                to_members: self.store.module_members(to, samples).await?,
            });
        }
        Ok(contexts)
    }
}

/// Run the gate loop once against the store.
pub async fn run_coverage_inference(
    store: &dyn ArchitectureStore,
    llm: &dyn LLMProvider,
    groups: &ProcessGroups,
    config: &TopologyConfig,
) -> Result<CoverageReport> {
    CoverageGate::new(store, llm, config).run(groups).await
}

fn covered_pairs(interactions: &[Interaction]) -> HashSet<Pair> {
    interactions.iter().map(Interaction::pair).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use archgraph_core::{ImportEdge, ModuleFile};
    use archgraph_graph::compute_process_groups;

    struct Fixture {
        modules: HashMap<ModuleId, Module>,
        groups: ProcessGroups,
        imports: ImportGraph,
    }

    /// 1,2,3 share a process (1 -> 2 runtime, 3 -> 1 runtime); 4 is separate; 5 has no record.
    fn fixture() -> Fixture {
        let modules = vec![
            Module::new(1, "app.web"),
            Module::new(2, "app.store"),
            Module::new(3, "app.util"),
            Module::new(4, "api.server"),
        ];
        let files = vec![
            ModuleFile { module_id: 1, file_id: 1 },
            ModuleFile { module_id: 2, file_id: 2 },
            ModuleFile { module_id: 3, file_id: 3 },
            ModuleFile { module_id: 4, file_id: 4 },
        ];
        let imports = vec![ImportEdge::runtime(1, 2), ImportEdge::runtime(3, 1)];
        Fixture {
            groups: compute_process_groups(&modules, &files, &imports),
            imports: ImportGraph::new(&files, &imports),
            modules: modules.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    fn decide(f: &Fixture, ast: &HashSet<Pair>, from: ModuleId, to: ModuleId) -> GateDecision {
        let ctx = GateContext {
            modules: &f.modules,
            groups: &f.groups,
            imports: &f.imports,
            ast_pairs: ast,
        };
        classify_pair(from, to, &ctx)
    }

    #[test]
    fn prefilter_follows_rule_priority() {
        let f = fixture();
        let none = HashSet::new();

        assert_eq!(
            decide(&f, &none, 1, 5),
            GateDecision::AutoSkip(SkipReason::MissingModule)
        );
        assert_eq!(
            decide(&f, &none, 1, 4),
            GateDecision::Infer(InferReason::CrossProcess)
        );
        assert_eq!(
            decide(&f, &none, 3, 2),
            GateDecision::Infer(InferReason::ForwardImport)
        );
        assert_eq!(
            decide(&f, &none, 2, 1),
            GateDecision::AutoSkip(SkipReason::ReverseImport)
        );

        let reverse_ast: HashSet<Pair> = [(1, 2)].into_iter().collect();
        assert_eq!(
            decide(&f, &reverse_ast, 2, 1),
            GateDecision::AutoSkip(SkipReason::ReverseAstInteraction)
        );
    }

    #[test]
    fn siblings_sharing_a_dependency_have_no_import_evidence() {
        let modules = vec![Module::new(1, "a"), Module::new(2, "b"), Module::new(3, "lib")];
        let files = vec![
            ModuleFile { module_id: 1, file_id: 1 },
            ModuleFile { module_id: 2, file_id: 2 },
            ModuleFile { module_id: 3, file_id: 3 },
        ];
        let imports = vec![ImportEdge::runtime(1, 3), ImportEdge::runtime(2, 3)];
        let f = Fixture {
            groups: compute_process_groups(&modules, &files, &imports),
            imports: ImportGraph::new(&files, &imports),
            modules: modules.into_iter().map(|m| (m.id, m)).collect(),
        };
        assert!(f.groups.are_same_process(1, 2));
        assert_eq!(
            decide(&f, &HashSet::new(), 1, 2),
            GateDecision::AutoSkip(SkipReason::NoImportEvidence)
        );
    }

    #[test]
    fn coverage_of_empty_evidence_is_full() {
        assert_eq!(coverage_ratio(&[], &HashSet::new()), 1.0);
        let pairs = vec![
            ModulePairEvidence { from_module_id: 1, to_module_id: 2, relationship_count: 3 },
            ModulePairEvidence { from_module_id: 2, to_module_id: 3, relationship_count: 1 },
        ];
        let covered: HashSet<Pair> = [(1, 2)].into_iter().collect();
        assert_eq!(coverage_ratio(&pairs, &covered), 0.5);
    }
}
