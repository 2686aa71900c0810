//! Per-unit parameter registry with originator-filtered observers.
//!
//! Every addressed write names its originator. Observers registered under that
//! same token are skipped, so a node writing through its own token never hears
//! its own change back. Writes from a host or UI (another token, or none) reach
//! every observer.
//!
//! Observers are called synchronously on the writing thread, outside the
//! observer lock. Callbacks that touch node state must marshal onto the control
//! plane themselves (see [`ControlHandle`](crate::ControlHandle)).

use crate::parameter::{Parameter, ParameterAddress, ParameterSpec};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback receiving `(address, new_value)`.
pub type ObserverFn = Arc<dyn Fn(ParameterAddress, f32) + Send + Sync>;

/// Identity of one registered observer; also used as a write originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

impl ObserverToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

pub struct ParameterTree {
    parameters: Vec<Arc<Parameter>>,
    by_name: HashMap<&'static str, usize>,
    by_address: HashMap<ParameterAddress, usize>,
    observers: RwLock<Vec<(ObserverToken, ObserverFn)>>,
    next_token: AtomicU64,
}

impl ParameterTree {
    /// Build a tree from `(spec, initial value)` pairs.
    ///
    /// Names and addresses must be unique.
    pub fn new(parameters: impl IntoIterator<Item = (ParameterSpec, f32)>) -> Result<Self> {
        let mut tree = Self {
            parameters: Vec::new(),
            by_name: HashMap::new(),
            by_address: HashMap::new(),
            observers: RwLock::new(Vec::new()),
            next_token: AtomicU64::new(1),
        };

        for (spec, initial) in parameters {
            let index = tree.parameters.len();
            if tree.by_name.insert(spec.name, index).is_some() {
                return Err(Error::DuplicateParameter(spec.name.to_string()));
            }
            if tree.by_address.insert(spec.address, index).is_some() {
                return Err(Error::DuplicateParameter(format!(
                    "{} ({})",
                    spec.name, spec.address
                )));
            }
            tree.parameters.push(Arc::new(Parameter::new(spec, initial)));
        }

        Ok(tree)
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Parameter>> {
        self.by_name.get(name).map(|&i| &self.parameters[i])
    }

    /// Like [`get`](Self::get), for callers that treat a missing name as an error.
    pub fn parameter(&self, name: &str) -> Result<&Arc<Parameter>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    pub fn by_address(&self, address: ParameterAddress) -> Option<&Arc<Parameter>> {
        self.by_address.get(&address).map(|&i| &self.parameters[i])
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Arc<Parameter>> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Register an observer for changes made by any other originator.
    pub fn add_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(ParameterAddress, f32) + Send + Sync + 'static,
    {
        let token = ObserverToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((token, Arc::new(observer)));
        token
    }

    /// Returns `false` if the token was not registered.
    pub fn remove_observer(&self, token: ObserverToken) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(t, _)| *t != token);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Addressed write. Clamps to the parameter range and notifies every observer
    /// except `originator`. Returns the stored value.
    pub fn set_value(
        &self,
        address: ParameterAddress,
        value: f32,
        originator: Option<ObserverToken>,
    ) -> Result<f32> {
        let parameter = self
            .by_address(address)
            .ok_or(Error::UnknownParameterAddress(address))?;
        let stored = parameter.store(value);
        self.notify(address, stored, originator);
        Ok(stored)
    }

    /// Addressed write of a normalized (0.0-1.0) value, as host automation sends it.
    pub fn set_normalized(
        &self,
        address: ParameterAddress,
        normalized: f32,
        originator: Option<ObserverToken>,
    ) -> Result<f32> {
        let parameter = self
            .by_address(address)
            .ok_or(Error::UnknownParameterAddress(address))?;
        let value = parameter.range().denormalize(normalized);
        self.set_value(address, value, originator)
    }

    fn notify(&self, address: ParameterAddress, value: f32, originator: Option<ObserverToken>) {
        // Snapshot so callbacks may add or remove observers.
        let targets: Vec<ObserverFn> = self
            .observers
            .read()
            .iter()
            .filter(|(token, _)| Some(*token) != originator)
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in targets {
            observer(address, value);
        }
    }
}

impl std::fmt::Debug for ParameterTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterTree")
            .field("parameters", &self.parameters)
            .field("observers", &self.observer_count())
            .finish()
    }
}
