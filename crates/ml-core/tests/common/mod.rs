//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ml_core::{Agent, AgentId, AgentKind, EngineConfig, EntityId, GroupEngine};

/// Order in which agents were stepped
pub type StepLog = Rc<RefCell<Vec<AgentId>>>;

/// Agent that records each of its steps into a shared log
pub struct Recorder {
    pub id: AgentId,
    pub kind: AgentKind,
    pub log: StepLog,
}

impl Agent for Recorder {
    fn id(&self) -> AgentId {
        self.id.clone()
    }

    fn kind(&self) -> AgentKind {
        self.kind.clone()
    }

    fn step(&mut self) {
        self.log.borrow_mut().push(self.id.clone());
    }
}

pub fn new_log() -> StepLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Register scheduled, networked recorders of one kind
pub fn populate(engine: &mut GroupEngine, names: &[&str], kind: &str, log: &StepLog) {
    for name in names {
        engine.register(Recorder {
            id: AgentId::from(*name),
            kind: AgentKind::from(kind),
            log: log.clone(),
        });
    }
}

pub fn engine(config: EngineConfig, names: &[&str]) -> (GroupEngine, StepLog) {
    let mut engine = GroupEngine::new(config).unwrap();
    let log = new_log();
    populate(&mut engine, names, "villager", &log);
    (engine, log)
}

pub fn a(name: &str) -> EntityId {
    EntityId::agent(name)
}

pub fn g(name: &str) -> EntityId {
    EntityId::group(name)
}

pub fn steps_of(log: &StepLog, name: &str) -> usize {
    log.borrow().iter().filter(|id| id.as_str() == name).count()
}
