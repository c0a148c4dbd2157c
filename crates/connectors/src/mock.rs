//! Test doubles for [`TriggerConnector`] and [`ActionConnector`].
//!
//! The engine builds a fresh connector for every check, so each mock is a
//! cheap, cloneable handle over shared state: register a factory that
//! calls [`MockTrigger::instance`] / [`MockAction::instance`] and keep a
//! clone of the handle to script behaviour and inspect calls.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::snapshot::detect_new;
use crate::{
    ActionConnector, ActionParams, ActionRunResult, ConnectorError, TriggerCheckResult,
    TriggerConnector, TriggerParams, Variable,
};

/// Behaviour injected into a [`MockTrigger`].
#[derive(Debug, Clone)]
pub enum MockTriggerBehaviour {
    /// Fire with these variables, keeping the stored snapshot.
    Fire(Vec<Variable>),
    /// Succeed without firing, keeping the stored snapshot.
    Idle,
    /// Diff this upstream item list with the snapshot protocol.
    Items(Vec<String>),
    /// Return an error.
    Fail(String),
    /// Never complete.
    Hang,
    /// Panic inside `check`.
    Panic,
}

/// How a [`MockTrigger`] answers `hook`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockHookBehaviour {
    Accept,
    /// Report a refusal from the external service.
    Refuse,
    /// Never complete.
    Hang,
    /// Panic inside `hook`.
    Panic,
}

struct MockTriggerState {
    behaviour: MockTriggerBehaviour,
    hook_behaviour: MockHookBehaviour,
    checks: Vec<TriggerParams>,
    hooks: Vec<(String, String)>,
}

/// A scripted trigger that records every check and hook call.
#[derive(Clone)]
pub struct MockTrigger {
    state: Arc<Mutex<MockTriggerState>>,
}

impl MockTrigger {
    pub fn new(behaviour: MockTriggerBehaviour) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockTriggerState {
                behaviour,
                hook_behaviour: MockHookBehaviour::Accept,
                checks: Vec::new(),
                hooks: Vec::new(),
            })),
        }
    }

    /// Connector bound to `params` that shares this handle's state.
    pub fn instance(&self, params: TriggerParams) -> MockTriggerInstance {
        MockTriggerInstance {
            params,
            state: Arc::clone(&self.state),
        }
    }

    pub fn set_behaviour(&self, behaviour: MockTriggerBehaviour) {
        self.lock().behaviour = behaviour;
    }

    /// Make `hook` report a refusal from the external service.
    pub fn refuse_hooks(&self) {
        self.set_hook_behaviour(MockHookBehaviour::Refuse);
    }

    pub fn set_hook_behaviour(&self, behaviour: MockHookBehaviour) {
        self.lock().hook_behaviour = behaviour;
    }

    /// Number of times `check` reached this connector.
    pub fn check_count(&self) -> usize {
        self.lock().checks.len()
    }

    /// Params of every instance that was checked, in call order.
    pub fn checks(&self) -> Vec<TriggerParams> {
        self.lock().checks.clone()
    }

    /// `(url, secret)` of every hook call, in call order.
    pub fn hooks(&self) -> Vec<(String, String)> {
        self.lock().hooks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockTriggerState> {
        self.state.lock().unwrap()
    }
}

pub struct MockTriggerInstance {
    params: TriggerParams,
    state: Arc<Mutex<MockTriggerState>>,
}

#[async_trait]
impl TriggerConnector for MockTriggerInstance {
    fn step_id(&self) -> Uuid {
        self.params.step_id
    }

    async fn check(&self) -> Result<TriggerCheckResult, ConnectorError> {
        let behaviour = {
            let mut state = self.state.lock().unwrap();
            state.checks.push(self.params.clone());
            state.behaviour.clone()
        };

        let previous = self.params.last_comparison_data.clone();
        match behaviour {
            MockTriggerBehaviour::Fire(vars) => Ok(TriggerCheckResult::fired(vars, previous)),
            MockTriggerBehaviour::Idle => Ok(TriggerCheckResult::idle(previous)),
            MockTriggerBehaviour::Items(items) => detect_new(
                &items,
                |item| item.clone(),
                previous.as_ref(),
                |item| vec![Variable::new("FileName", item.as_str())],
            ),
            MockTriggerBehaviour::Fail(msg) => Err(ConnectorError::Upstream(msg)),
            MockTriggerBehaviour::Hang => std::future::pending().await,
            MockTriggerBehaviour::Panic => panic!("mock trigger panicked"),
        }
    }

    async fn hook(&self, url: &str, secret: &str) -> Result<bool, ConnectorError> {
        let behaviour = {
            let mut state = self.state.lock().unwrap();
            state.hooks.push((url.to_owned(), secret.to_owned()));
            state.hook_behaviour
        };

        match behaviour {
            MockHookBehaviour::Accept => Ok(true),
            MockHookBehaviour::Refuse => Ok(false),
            MockHookBehaviour::Hang => std::future::pending().await,
            MockHookBehaviour::Panic => panic!("mock hook panicked"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockAction
// ---------------------------------------------------------------------------

/// Behaviour injected into a [`MockAction`].
#[derive(Debug, Clone)]
pub enum MockActionBehaviour {
    /// Succeed with these variables.
    Return(Vec<Variable>),
    /// Report `status: FAILURE` without erroring.
    ReportFailure,
    /// Return an error.
    Fail(String),
    /// Never complete.
    Hang,
    /// Panic inside `execute`.
    Panic,
}

struct MockActionState {
    behaviour: MockActionBehaviour,
    calls: Vec<Vec<Variable>>,
}

/// A scripted action that records the upstream variables of every call.
#[derive(Clone)]
pub struct MockAction {
    state: Arc<Mutex<MockActionState>>,
}

impl MockAction {
    pub fn new(behaviour: MockActionBehaviour) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockActionState {
                behaviour,
                calls: Vec::new(),
            })),
        }
    }

    /// Create a mock that always succeeds with `variables`.
    pub fn returning(variables: Vec<Variable>) -> Self {
        Self::new(MockActionBehaviour::Return(variables))
    }

    /// Create a mock that always errors.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self::new(MockActionBehaviour::Fail(msg.into()))
    }

    pub fn instance(&self, params: ActionParams) -> MockActionInstance {
        MockActionInstance {
            params,
            state: Arc::clone(&self.state),
        }
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Upstream variables of every call, in call order.
    pub fn calls(&self) -> Vec<Vec<Variable>> {
        self.state.lock().unwrap().calls.clone()
    }
}

pub struct MockActionInstance {
    params: ActionParams,
    state: Arc<Mutex<MockActionState>>,
}

impl MockActionInstance {
    pub fn step_id(&self) -> Uuid {
        self.params.step_id
    }
}

#[async_trait]
impl ActionConnector for MockActionInstance {
    async fn execute(&self, upstream: &[Variable]) -> Result<ActionRunResult, ConnectorError> {
        let behaviour = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(upstream.to_vec());
            state.behaviour.clone()
        };

        match behaviour {
            MockActionBehaviour::Return(vars) => Ok(ActionRunResult::success(vars)),
            MockActionBehaviour::ReportFailure => Ok(ActionRunResult::failure()),
            MockActionBehaviour::Fail(msg) => Err(ConnectorError::Upstream(msg)),
            MockActionBehaviour::Hang => std::future::pending().await,
            MockActionBehaviour::Panic => panic!("mock action panicked"),
        }
    }
}
