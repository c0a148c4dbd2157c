//! Pass-level tests for the coordinator and scheduler.
//!
//! These use the mock connectors and the in-memory store, so no external
//! service or Postgres instance is required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use connectors::mock::{MockAction, MockActionBehaviour, MockTrigger, MockTriggerBehaviour};
use connectors::{TriggerKind, Variable};
use db::DbError;

use crate::{
    Automation, AutomationDefinition, AutomationStore, Connection, ConnectorRegistry,
    EngineConfig, EngineError, InMemoryStore, PassOutcome, SchedulerLoop, Step, WebhookRecord,
    ZapCoordinator,
};

const TRIGGER: &str = "mock.trigger";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn registry(trigger: &MockTrigger, actions: &[(&str, &MockAction)]) -> Arc<ConnectorRegistry> {
    let mut registry = ConnectorRegistry::new();
    let handle = trigger.clone();
    registry.register_trigger(TRIGGER, TriggerKind::Polling, Duration::from_secs(60), move |p| {
        Box::new(handle.instance(p))
    });
    for (id, action) in actions {
        let handle = (*action).clone();
        registry.register_action(*id, move |p| Box::new(handle.instance(p)));
    }
    Arc::new(registry)
}

/// An automation under construction: one trigger plus actions added with `then`.
struct Zap {
    automation: Automation,
    trigger: Step,
    actions: Vec<Step>,
}

impl Zap {
    fn new() -> Self {
        let automation = Automation::new("test zap");
        let trigger = Step::trigger(automation.id, TRIGGER, json!({}));
        Self {
            automation,
            trigger,
            actions: Vec::new(),
        }
    }

    /// Append an action at the next order reading from `source`.
    fn then(mut self, connector_id: &str, source: Option<Uuid>) -> Self {
        let order = self.actions.len() as i32 + 1;
        self.actions
            .push(Step::action(self.automation.id, order, connector_id, source));
        self
    }

    fn step_id(&self, index: usize) -> Uuid {
        self.actions[index].id
    }

    async fn store(&self) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let mut steps = vec![self.trigger.clone()];
        steps.extend(self.actions.iter().cloned());
        store
            .insert(AutomationDefinition {
                automation: self.automation.clone(),
                steps,
                connections: Vec::new(),
            })
            .await;
        store
    }
}

fn coordinator(store: &Arc<InMemoryStore>, registry: Arc<ConnectorRegistry>) -> ZapCoordinator {
    ZapCoordinator::new(store.clone(), registry, &EngineConfig::default())
}

// ============================================================
// Chain routing
// ============================================================

#[tokio::test]
async fn variables_flow_from_each_actions_own_source() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![Variable::new("X", "1")]));
    let a1 = MockAction::returning(vec![Variable::new("Y", "2")]);
    let a2 = MockAction::returning(vec![]);
    let a3 = MockAction::returning(vec![]);

    let zap = Zap::new();
    let trigger_id = zap.trigger.id;
    let zap = zap.then("a1", Some(trigger_id));
    let a1_id = zap.step_id(0);
    let zap = zap.then("a2", Some(a1_id)).then("a3", Some(trigger_id));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[("a1", &a1), ("a2", &a2), ("a3", &a3)]));

    let outcome = coordinator.run_pass_at(&zap.automation, t0()).await.unwrap();

    assert_eq!(outcome, PassOutcome::Completed { actions_run: 3, failed_actions: 0 });
    assert!(outcome.fully_done());
    assert_eq!(a1.calls(), vec![vec![Variable::new("X", "1")]]);
    assert_eq!(a2.calls(), vec![vec![Variable::new("Y", "2")]]);
    assert_eq!(a3.calls(), vec![vec![Variable::new("X", "1")]]);
}

#[tokio::test]
async fn failed_action_does_not_halt_the_chain() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![Variable::new("X", "1")]));
    let broken = MockAction::failing("500");
    let fine = MockAction::returning(vec![Variable::new("Z", "3")]);
    let after_broken = MockAction::returning(vec![]);

    let zap = Zap::new();
    let trigger_id = zap.trigger.id;
    let zap = zap.then("broken", Some(trigger_id));
    let broken_id = zap.step_id(0);
    let zap = zap.then("fine", Some(trigger_id)).then("after", Some(broken_id));

    let store = zap.store().await;
    let coordinator = coordinator(
        &store,
        registry(&trigger, &[("broken", &broken), ("fine", &fine), ("after", &after_broken)]),
    );

    let outcome = coordinator.run_pass_at(&zap.automation, t0()).await.unwrap();

    assert_eq!(outcome, PassOutcome::Completed { actions_run: 3, failed_actions: 1 });
    assert!(!outcome.fully_done());
    assert_eq!(fine.call_count(), 1);
    // A failed step is still recorded, with no variables.
    assert_eq!(after_broken.calls(), vec![Vec::<Variable>::new()]);
}

#[tokio::test]
async fn unwired_action_fails_without_stopping_pass() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![]));
    let orphan = MockAction::returning(vec![]);
    let next = MockAction::new(MockActionBehaviour::Return(vec![]));

    let zap = Zap::new();
    let trigger_id = zap.trigger.id;
    let zap = zap.then("orphan", None).then("next", Some(trigger_id));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[("orphan", &orphan), ("next", &next)]));

    let outcome = coordinator.run_pass_at(&zap.automation, t0()).await.unwrap();
    assert_eq!(outcome, PassOutcome::Completed { actions_run: 2, failed_actions: 1 });
    assert_eq!(orphan.call_count(), 0);
    assert_eq!(next.call_count(), 1);
}

#[tokio::test]
async fn missing_source_aborts_pass_but_keeps_run_state() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![Variable::new("X", "1")]));
    let a1 = MockAction::returning(vec![]);
    let a2 = MockAction::returning(vec![]);

    let ghost = Uuid::new_v4();
    let zap = Zap::new().then("a1", Some(ghost));
    let a1_id = zap.step_id(0);
    let zap = zap.then("a2", Some(a1_id));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[("a1", &a1), ("a2", &a2)]));

    let err = coordinator.run_pass_at(&zap.automation, t0()).await.unwrap_err();
    match err {
        EngineError::MissingStepData {
            automation_id,
            step_id,
            source_step_id,
        } => {
            assert_eq!(automation_id, zap.automation.id);
            assert_eq!(step_id, a1_id);
            assert_eq!(source_step_id, ghost);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(a2.call_count(), 0);
    let stored = store.automation(zap.automation.id).await.unwrap();
    assert_eq!(stored.last_run_at, Some(t0()));
}

// ============================================================
// Trigger gating and persistence
// ============================================================

#[tokio::test]
async fn trigger_failure_writes_nothing_and_runs_nothing() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fail("token expired".into()));
    let a1 = MockAction::returning(vec![]);

    let zap = Zap::new();
    let trigger_id = zap.trigger.id;
    let zap = zap.then("a1", Some(trigger_id));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[("a1", &a1)]));

    let outcome = coordinator.run_pass_at(&zap.automation, t0()).await.unwrap();
    assert_eq!(outcome, PassOutcome::TriggerFailed);
    assert_eq!(a1.call_count(), 0);
    assert_eq!(store.automation(zap.automation.id).await.unwrap().last_run_at, None);
}

#[tokio::test]
async fn not_due_pass_is_a_silent_no_op() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![]));
    let mut zap = Zap::new();
    zap.automation.last_run_at = Some(t0());
    zap.automation.last_trigger_data = Some(json!({ "known": [] }));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[]));

    let outcome = coordinator
        .run_pass_at(&zap.automation, t0() + chrono::Duration::seconds(30))
        .await
        .unwrap();
    assert_eq!(outcome, PassOutcome::NotDue);
    assert_eq!(trigger.check_count(), 0);
    assert_eq!(store.automation(zap.automation.id).await.unwrap(), zap.automation);
}

#[tokio::test]
async fn new_file_in_folder_end_to_end() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Items(vec!["f1".into(), "f2".into()]));
    let notify = MockAction::returning(vec![]);

    let zap = Zap::new();
    let trigger_id = zap.trigger.id;
    let zap = zap.then("notify", Some(trigger_id));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[("notify", &notify)]));

    // Run 1: baseline only.
    let outcome = coordinator.run_pass_at(&zap.automation, t0()).await.unwrap();
    assert_eq!(outcome, PassOutcome::Idle);
    let after_first = store.automation(zap.automation.id).await.unwrap();
    assert_eq!(after_first.last_run_at, Some(t0()));
    assert_eq!(after_first.last_trigger_data, Some(json!({ "known": ["f1", "f2"] })));
    assert_eq!(notify.call_count(), 0);

    // Run 2: a third file appears.
    trigger.set_behaviour(MockTriggerBehaviour::Items(vec![
        "f1".into(),
        "f2".into(),
        "f3".into(),
    ]));
    let second_at = t0() + chrono::Duration::seconds(61);
    let outcome = coordinator.run_pass_at(&after_first, second_at).await.unwrap();
    assert!(outcome.fully_done());
    assert_eq!(notify.calls(), vec![vec![Variable::new("FileName", "f3")]]);

    let after_second = store.automation(zap.automation.id).await.unwrap();
    assert_eq!(after_second.last_run_at, Some(second_at));
    assert_eq!(
        after_second.last_trigger_data,
        Some(json!({ "known": ["f1", "f2", "f3"] }))
    );

    // Run 3: same listing, nothing fires twice.
    let third_at = second_at + chrono::Duration::seconds(61);
    let outcome = coordinator.run_pass_at(&after_second, third_at).await.unwrap();
    assert_eq!(outcome, PassOutcome::Idle);
    assert_eq!(notify.call_count(), 1);
}

// ============================================================
// Push entry point
// ============================================================

#[tokio::test]
async fn webhook_delivery_runs_chain_and_keeps_snapshot() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Idle);
    let a1 = MockAction::returning(vec![]);

    let mut zap = Zap::new();
    zap.automation.last_trigger_data = Some(json!({ "cursor": 7 }));
    let trigger_id = zap.trigger.id;
    let zap = zap.then("a1", Some(trigger_id));

    let store = zap.store().await;
    let coordinator = coordinator(&store, registry(&trigger, &[("a1", &a1)]));

    let outcome = coordinator
        .run_webhook_actions(&zap.automation, trigger_id, vec![Variable::new("Event", "push")])
        .await
        .unwrap();

    assert!(outcome.fully_done());
    assert_eq!(trigger.check_count(), 0);
    assert_eq!(a1.calls(), vec![vec![Variable::new("Event", "push")]]);
    let stored = store.automation(zap.automation.id).await.unwrap();
    assert!(stored.last_run_at.is_some());
    assert_eq!(stored.last_trigger_data, Some(json!({ "cursor": 7 })));
}

// ============================================================
// Scheduler
// ============================================================

#[tokio::test]
async fn one_broken_automation_does_not_affect_siblings() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![Variable::new("X", "1")]));
    let a1 = MockAction::returning(vec![]);

    let healthy = Zap::new();
    let healthy_trigger = healthy.trigger.id;
    let healthy = healthy.then("a1", Some(healthy_trigger));

    let mut broken = Zap::new();
    broken.trigger.connector_id = "retired.connector".into();

    let store = Arc::new(InMemoryStore::new());
    for zap in [&broken, &healthy] {
        let mut steps = vec![zap.trigger.clone()];
        steps.extend(zap.actions.iter().cloned());
        store
            .insert(AutomationDefinition {
                automation: zap.automation.clone(),
                steps,
                connections: Vec::new(),
            })
            .await;
    }

    let scheduler = SchedulerLoop::new(
        store.clone(),
        registry(&trigger, &[("a1", &a1)]),
        EngineConfig::default(),
    );

    assert_eq!(scheduler.preflight().await.unwrap(), 1);

    let summary = scheduler.run_cycle().await.unwrap();
    assert_eq!(summary.visited, 2);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.fired, 1);
    assert_eq!(a1.call_count(), 1);
}

#[tokio::test]
async fn inactive_automations_are_skipped() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Fire(vec![]));
    let mut zap = Zap::new();
    zap.automation.is_active = false;

    let store = zap.store().await;
    let scheduler = SchedulerLoop::new(store, registry(&trigger, &[]), EngineConfig::default());

    let summary = scheduler.run_cycle().await.unwrap();
    assert_eq!(summary.visited, 0);
    assert_eq!(trigger.check_count(), 0);
}

#[tokio::test]
async fn loop_stops_on_shutdown() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Idle);
    let zap = Zap::new();
    let store = zap.store().await;
    let scheduler = SchedulerLoop::new(store, registry(&trigger, &[]), EngineConfig::default());

    let (tx, rx) = broadcast::channel(1);
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
        .await
        .expect("scheduler should stop");

    let (tx, rx) = broadcast::channel::<()>(1);
    drop(tx);
    tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
        .await
        .expect("scheduler should stop when the sender is gone");
}

#[tokio::test(start_paused = true)]
async fn loop_keeps_cycling_until_shutdown() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Idle);
    let zap = Zap::new();
    let store = zap.store().await;
    let config = EngineConfig {
        cycle_delay: Duration::from_secs(1),
        ..EngineConfig::default()
    };
    let scheduler = Arc::new(SchedulerLoop::new(store, registry(&trigger, &[]), config));

    let (tx, rx) = broadcast::channel(1);
    let handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run(rx).await })
    };

    // Cold start checks once; later cycles are throttled by the 60 s interval.
    tokio::time::sleep(Duration::from_millis(3500)).await;
    tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(trigger.check_count(), 1);
    assert_eq!(
        trigger.checks()[0].last_comparison_data,
        None,
        "first check is a cold start"
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_cycle_delay() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Idle);
    let zap = Zap::new();
    let store = zap.store().await;
    let config = EngineConfig {
        cycle_delay: Duration::from_secs(3600),
        ..EngineConfig::default()
    };
    let scheduler = Arc::new(SchedulerLoop::new(store, registry(&trigger, &[]), config));

    let (tx, rx) = broadcast::channel(1);
    let handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run(rx).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler should stop without waiting out the delay")
        .unwrap();
    assert_eq!(trigger.check_count(), 1);
}

/// A store whose automation listing always fails.
#[derive(Default)]
struct UnreachableStore {
    list_calls: AtomicUsize,
}

impl UnreachableStore {
    fn unreachable() -> DbError {
        DbError::Corrupt {
            entity: "automation",
            message: "connection refused".into(),
        }
    }
}

#[async_trait]
impl AutomationStore for UnreachableStore {
    async fn list_active_automations(&self) -> Result<Vec<Automation>, DbError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unreachable())
    }

    async fn get_trigger_step(&self, _: Uuid) -> Result<Step, DbError> {
        Err(Self::unreachable())
    }

    async fn list_action_steps(&self, _: Uuid) -> Result<Vec<Step>, DbError> {
        Err(Self::unreachable())
    }

    async fn get_connection(&self, _: Uuid) -> Result<Connection, DbError> {
        Err(Self::unreachable())
    }

    async fn update_automation(
        &self,
        _: Uuid,
        _: DateTime<Utc>,
        _: Option<serde_json::Value>,
    ) -> Result<(), DbError> {
        Err(Self::unreachable())
    }

    async fn create_webhook(&self, _: Uuid, _: &str) -> Result<WebhookRecord, DbError> {
        Err(Self::unreachable())
    }
}

#[tokio::test(start_paused = true)]
async fn listing_failures_back_off_instead_of_spinning() {
    let trigger = MockTrigger::new(MockTriggerBehaviour::Idle);
    let store = Arc::new(UnreachableStore::default());
    let scheduler = Arc::new(SchedulerLoop::new(
        store.clone(),
        registry(&trigger, &[]),
        EngineConfig::default(),
    ));

    let (tx, rx) = broadcast::channel(1);
    let handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run(rx).await })
    };

    tokio::time::sleep(Duration::from_millis(3500)).await;
    tx.send(()).unwrap();
    handle.await.unwrap();

    let calls = store.list_calls.load(Ordering::SeqCst);
    assert!((3..=5).contains(&calls), "listed {calls} times in 3.5 s");
}
