mod common;

use archgraph_core::{
    ArchitectureStore, ImportEdge, InteractionSource, InteractionUpsert, Module, TopologyConfig,
};
use archgraph_graph::{compute_process_groups, InMemoryArchitectureStore};
use archgraph_topology::{run_coverage_inference, CoverageReport, StopReason};
use common::{sample, ScriptedProvider};
use pretty_assertions::assert_eq;

/// checkout talks to invoices and mailer; all three run in separate processes.
fn three_process_store() -> InMemoryArchitectureStore {
    let store = InMemoryArchitectureStore::new();
    store.add_module(Module::new(1, "shop.checkout"));
    store.add_module(Module::new(2, "billing.invoices"));
    store.add_module(Module::new(3, "notify.mailer"));
    for id in 1..=3 {
        store.add_module_file(id, id);
    }
    store.add_relationship(1, 2, sample("submitCheckout", "createInvoice"));
    store.add_relationship(1, 3, sample("submitCheckout", "sendReceipt"));
    store
}

const CONFIRM_INVOICES_ONLY: &str = "\
from_module_path,to_module_path,action,reason
shop.checkout,billing.invoices,CONFIRM,Bills the order
";

async fn run_gate(
    store: &InMemoryArchitectureStore,
    llm: &ScriptedProvider,
    config: &TopologyConfig,
) -> CoverageReport {
    let groups = compute_process_groups(
        &store.modules().await.unwrap(),
        &store.module_files().await.unwrap(),
        &store.import_edges().await.unwrap(),
    );
    run_coverage_inference(store, llm, &groups, config)
        .await
        .unwrap()
}

fn strict(max_gate_retries: u32) -> TopologyConfig {
    TopologyConfig {
        min_rel_coverage: 1.0,
        max_gate_retries,
        ..TopologyConfig::default()
    }
}

#[tokio::test]
async fn single_retry_stops_on_exhausted_budget() {
    let store = three_process_store();
    let llm = ScriptedProvider::new(&[CONFIRM_INVOICES_ONLY]);

    let report = run_gate(&store, &llm, &strict(1)).await;

    assert_eq!(report.iterations, 1);
    assert_eq!(report.sent_to_inference, 2);
    assert_eq!(report.interactions_added, 1);
    assert_eq!(report.final_coverage, 0.5);
    assert_eq!(report.stop_reason, StopReason::RetryBudgetExhausted);
    assert_eq!(llm.calls(), 1);
    assert!(store.interaction_between(1, 2).is_some());
    assert!(store.interaction_between(1, 3).is_none());
}

#[tokio::test]
async fn submitted_pairs_are_not_resubmitted() {
    let store = three_process_store();
    // A second completion would be an error, so any resubmission fails the run.
    let llm = ScriptedProvider::new(&[CONFIRM_INVOICES_ONLY]);

    let report = run_gate(&store, &llm, &strict(3)).await;

    assert_eq!(llm.calls(), 1);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.sent_to_inference, 2);
    assert_eq!(report.stop_reason, StopReason::NoInferenceCandidates);
    let prompt = llm.prompts.lock()[0].clone();
    assert!(prompt.contains("shop.checkout -> billing.invoices"));
    assert!(prompt.contains("shop.checkout -> notify.mailer"));
}

#[tokio::test]
async fn pairs_that_all_auto_skip_never_reach_the_service() {
    let store = InMemoryArchitectureStore::new();
    store.add_module(Module::new(1, "app.cart"));
    store.add_module(Module::new(2, "app.wishlist"));
    store.add_module(Module::new(3, "app.lib"));
    for id in 1..=3 {
        store.add_module_file(id, id);
    }
    store.add_import(ImportEdge::runtime(1, 3));
    store.add_import(ImportEdge::runtime(2, 3));
    store.add_relationship(1, 2, sample("addItem", "saveForLater"));
    store.add_relationship(2, 1, sample("moveToCart", "addItem"));
    let llm = ScriptedProvider::new(&[]);

    let report = run_gate(&store, &llm, &strict(3)).await;

    assert_eq!(report.stop_reason, StopReason::NoInferenceCandidates);
    assert_eq!(report.auto_skipped, 2);
    assert_eq!(report.iterations, 0);
    assert_eq!(report.sent_to_inference, 0);
    assert_eq!(llm.calls(), 0);
    assert_eq!(store.interaction_count(), 0);
}

#[tokio::test]
async fn fully_covered_evidence_stops_before_any_request() {
    let store = three_process_store();
    for to in [2, 3] {
        store
            .upsert_interaction(InteractionUpsert::new(1, to, InteractionSource::Ast))
            .await
            .unwrap();
    }
    let llm = ScriptedProvider::new(&[]);

    let report = run_gate(&store, &llm, &strict(3)).await;

    assert_eq!(report.stop_reason, StopReason::NoUncoveredPairs);
    assert_eq!(report.initial_coverage, 1.0);
    assert_eq!(report.iterations, 0);
    assert_eq!(llm.calls(), 0);

    let empty = InMemoryArchitectureStore::new();
    let report = run_gate(&empty, &llm, &strict(3)).await;
    assert_eq!(report.stop_reason, StopReason::NoUncoveredPairs);
}

#[tokio::test]
async fn lower_threshold_stops_with_pairs_still_uncovered() {
    let store = three_process_store();
    store
        .upsert_interaction(InteractionUpsert::new(1, 2, InteractionSource::Ast))
        .await
        .unwrap();
    let llm = ScriptedProvider::new(&[]);
    let config = TopologyConfig {
        min_rel_coverage: 0.5,
        ..TopologyConfig::default()
    };

    let report = run_gate(&store, &llm, &config).await;

    assert_eq!(report.stop_reason, StopReason::ThresholdReached);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn configured_symbol_cap_truncates_inferred_symbols() {
    let store = three_process_store();
    store.add_relationship(1, 2, sample("submitCheckout", "emailInvoice"));
    store.add_relationship(1, 2, sample("submitCheckout", "archiveInvoice"));
    let llm = ScriptedProvider::new(&[CONFIRM_INVOICES_ONLY]);
    let config = TopologyConfig {
        max_symbols_per_interaction: 2,
        ..strict(1)
    };

    run_gate(&store, &llm, &config).await;

    let inferred = store.interaction_between(1, 2).unwrap();
    assert_eq!(inferred.source, InteractionSource::LlmInferred);
    assert_eq!(inferred.weight, 3);
    assert_eq!(inferred.symbols, vec!["createInvoice", "emailInvoice"]);
}
