use std::sync::{Arc, PoisonError, RwLock};

use shading::{ParameterError, ShaderParameters};
use tracing::debug;

/// Shared, swappable parameter snapshot.
///
/// The shading loop takes one [`snapshot`](ParameterHandle::snapshot) per tick,
/// so a [`replace`](ParameterHandle::replace) lands between ticks and a tick
/// never mixes two parameter sets.
#[derive(Debug, Clone)]
pub struct ParameterHandle {
    current: Arc<RwLock<Arc<ShaderParameters>>>,
}

impl ParameterHandle {
    pub fn new(params: ShaderParameters) -> Result<Self, ParameterError> {
        params.validate()?;
        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(params))),
        })
    }

    pub fn snapshot(&self) -> Arc<ShaderParameters> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Validates `params` and swaps them in. Invalid sets leave the current
    /// snapshot untouched.
    pub fn replace(&self, params: ShaderParameters) -> Result<(), ParameterError> {
        params.validate()?;
        let next = Arc::new(params);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        debug!("shader parameters replaced");
        Ok(())
    }
}

impl Default for ParameterHandle {
    fn default() -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(ShaderParameters::default()))),
        }
    }
}
