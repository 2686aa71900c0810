//! Processing-unit kinds and the process-wide factory registry.
//!
//! A kind is identified by a [`ComponentDescription`]: a type code, a subtype
//! code and a manufacturer code, each four ASCII characters. Factories are
//! registered at most once per kind; later registrations of the same kind are
//! ignored.

use crate::unit::ProcessingUnit;
use crate::{Error, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Four ASCII characters packed big-endian into a `u32` (e.g. `aufx`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FourCharCode(u32);

impl FourCharCode {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    pub fn parse(code: &str) -> Result<Self> {
        let bytes: [u8; 4] = code
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidFourCharCode(code.to_string()))?;
        if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(Error::InvalidFourCharCode(code.to_string()));
        }
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self)
    }
}

/// Identifies one kind of processing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentDescription {
    pub component_type: FourCharCode,
    pub sub_type: FourCharCode,
    pub manufacturer: FourCharCode,
}

impl ComponentDescription {
    pub const EFFECT: FourCharCode = FourCharCode::from_bytes(*b"aufx");
    pub const MANUFACTURER: FourCharCode = FourCharCode::from_bytes(*b"AuKt");

    /// An effect kind from the built-in manufacturer.
    pub fn effect(sub_type: &str) -> Result<Self> {
        Ok(Self {
            component_type: Self::EFFECT,
            sub_type: FourCharCode::parse(sub_type)?,
            manufacturer: Self::MANUFACTURER,
        })
    }
}

impl fmt::Display for ComponentDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.component_type, self.sub_type, self.manufacturer
        )
    }
}

/// Builds a fresh unit of one kind.
pub type UnitFactory =
    Arc<dyn Fn(&ComponentDescription) -> Result<Arc<dyn ProcessingUnit>> + Send + Sync>;

#[derive(Clone)]
pub struct ComponentRegistration {
    pub name: String,
    pub version: u32,
    factory: UnitFactory,
}

impl ComponentRegistration {
    /// Run this registration's factory.
    pub fn instantiate(&self, description: &ComponentDescription) -> Result<Arc<dyn ProcessingUnit>> {
        (self.factory)(description)
    }
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Maps kinds to factories.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: DashMap<ComponentDescription, ComponentRegistration>,
}

static GLOBAL: OnceLock<Arc<ComponentRegistry>> = OnceLock::new();

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry engines use unless given their own.
    pub fn global() -> Arc<ComponentRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ComponentRegistry::new())))
    }

    /// Register `factory` for `description` unless the kind already has one.
    ///
    /// Returns `true` if this call performed the registration.
    pub fn register_once<F>(
        &self,
        description: ComponentDescription,
        name: impl Into<String>,
        version: u32,
        factory: F,
    ) -> bool
    where
        F: Fn(&ComponentDescription) -> Result<Arc<dyn ProcessingUnit>> + Send + Sync + 'static,
    {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(description) {
            Entry::Occupied(existing) => {
                tracing::trace!(
                    kind = %description,
                    name = %existing.get().name,
                    "Component already registered"
                );
                false
            }
            Entry::Vacant(slot) => {
                let name = name.into();
                tracing::debug!(kind = %description, %name, version, "Registering component");
                slot.insert(ComponentRegistration {
                    name,
                    version,
                    factory: Arc::new(factory),
                });
                true
            }
        }
    }

    pub fn contains(&self, description: &ComponentDescription) -> bool {
        self.entries.contains_key(description)
    }

    pub fn registration(&self, description: &ComponentDescription) -> Option<ComponentRegistration> {
        self.entries.get(description).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the factory for `description`.
    ///
    /// The shard lock is released before the factory runs.
    pub fn instantiate(&self, description: &ComponentDescription) -> Result<Arc<dyn ProcessingUnit>> {
        self.registration(description)
            .ok_or(Error::UnregisteredComponent(*description))?
            .instantiate(description)
    }
}
