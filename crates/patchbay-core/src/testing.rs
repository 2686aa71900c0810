//! Minimal processing unit for unit tests.

use crate::parameter::{ParameterAddress, ParameterRange, ParameterSpec, ParameterUnit};
use crate::unit::{ProcessingUnit, UnitCore};
use std::any::Any;
use std::sync::Arc;

pub(crate) struct TestUnit {
    core: UnitCore,
}

impl TestUnit {
    pub(crate) fn specs() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new(
                "gain",
                "Gain",
                ParameterAddress(0),
                ParameterRange::linear(0.0, 1.0, 0.5),
            ),
            ParameterSpec::new(
                "cutoff",
                "Cutoff",
                ParameterAddress(1),
                ParameterRange::logarithmic(20.0, 20000.0, 1000.0),
            )
            .with_unit(ParameterUnit::Hertz),
        ]
    }

    pub(crate) fn new() -> Self {
        Self {
            core: UnitCore::new(Self::specs(), 0.0002, 44100.0),
        }
    }

    pub(crate) fn arc() -> Arc<dyn ProcessingUnit> {
        Arc::new(Self::new())
    }
}

impl ProcessingUnit for TestUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
