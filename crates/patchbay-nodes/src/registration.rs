use crate::{AmplitudeTrackerUnit, ModalResonanceFilterUnit};
use patchbay_core::ComponentRegistry;

/// Register every built-in unit kind with `registry`.
///
/// Kinds that already have a factory are left alone, so this is safe to call
/// from every engine build. Returns how many kinds this call registered.
pub fn register_builtin_components(registry: &ComponentRegistry) -> usize {
    let registered = [
        AmplitudeTrackerUnit::register(registry),
        ModalResonanceFilterUnit::register(registry),
    ];
    let count = registered.iter().filter(|r| **r).count();
    if count > 0 {
        tracing::debug!(count, "Registered built-in components");
    }
    count
}
