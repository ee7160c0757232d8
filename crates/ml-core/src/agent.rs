//! Agent Contract
//!
//! The engine never constructs or destroys agents. It holds shared handles to
//! whatever the host registers and only needs an id, a kind and a step.

use std::cell::RefCell;
use std::rc::Rc;

use ml_events::{AgentId, AgentKind};

/// A leaf agent in the simulation
pub trait Agent {
    /// Stable identifier, unique across the run
    fn id(&self) -> AgentId;

    /// Type tag used for per-kind indexing and stepping
    fn kind(&self) -> AgentKind;

    /// Per-tick action
    fn step(&mut self);
}

/// Shared handle to a registered agent
pub type AgentRef = Rc<RefCell<dyn Agent>>;

/// Wrap an agent into a shared handle
pub fn agent_ref<A: Agent + 'static>(agent: A) -> AgentRef {
    Rc::new(RefCell::new(agent))
}

/// Registry entry for a leaf agent
#[derive(Clone)]
pub struct RegisteredAgent {
    pub handle: AgentRef,
    pub kind: AgentKind,
    /// Whether the agent was added as a node of the relationship graph
    pub networked: bool,
}

impl std::fmt::Debug for RegisteredAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredAgent")
            .field("kind", &self.kind)
            .field("networked", &self.networked)
            .finish()
    }
}

impl RegisteredAgent {
    /// Run the agent's step. Returns false when the agent is already
    /// borrowed elsewhere and could not be stepped.
    pub fn step(&self) -> bool {
        match self.handle.try_borrow_mut() {
            Ok(mut agent) => {
                agent.step();
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        id: AgentId,
        steps: u32,
    }

    impl Agent for Counter {
        fn id(&self) -> AgentId {
            self.id.clone()
        }

        fn kind(&self) -> AgentKind {
            AgentKind::from("counter")
        }

        fn step(&mut self) {
            self.steps += 1;
        }
    }

    #[test]
    fn test_registered_agent_steps_through_handle() {
        let concrete = Rc::new(RefCell::new(Counter {
            id: AgentId::from("c1"),
            steps: 0,
        }));
        let handle: AgentRef = concrete.clone();
        let kind = handle.borrow().kind();
        let entry = RegisteredAgent {
            kind,
            handle,
            networked: true,
        };

        assert!(entry.step());
        assert!(entry.step());
        assert_eq!(concrete.borrow().steps, 2);
    }

    #[test]
    fn test_busy_agent_is_skipped() {
        let handle = agent_ref(Counter {
            id: AgentId::from("c1"),
            steps: 0,
        });
        let entry = RegisteredAgent {
            handle: handle.clone(),
            kind: AgentKind::from("counter"),
            networked: false,
        };

        let _guard = handle.borrow_mut();
        assert!(!entry.step());
    }
}
