//! Lifecycle management for wayfinding components

use crate::error::{Result, WayfindingError};

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Configure the node
    fn on_configure(&mut self) -> Result<()>;

    /// Activate the node
    fn on_activate(&mut self) -> Result<()>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<()>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<()>;

    /// Finalize a cleaned-up node; it cannot be configured again
    fn on_shutdown(&mut self) -> Result<()>;
}

/// Base implementation for lifecycle nodes
#[derive(Debug)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
    Finalized,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        self.state
    }

    /// Move to `to` if currently in `from`, otherwise report a lifecycle error
    pub fn transition(&mut self, transition: &'static str, from: State, to: State) -> Result<()> {
        if self.state != from {
            return Err(WayfindingError::Lifecycle {
                component: self.name.clone(),
                transition,
                state: format!("{:?}", self.state),
            });
        }
        log::debug!("{}: {:?} -> {:?}", self.name, self.state, to);
        self.state = to;
        Ok(())
    }
}
