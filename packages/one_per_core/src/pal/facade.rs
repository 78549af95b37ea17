use std::fmt::Debug;
use std::io;
#[cfg(test)]
use std::sync::Arc;

use crate::ProcessorSet;
#[cfg(test)]
use crate::pal::MockPlatform;
use crate::pal::{BuildTargetPlatform, Platform};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetPlatform)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Platform for PlatformFacade {
    fn processor_inventory(&self) -> Option<String> {
        match self {
            Self::Target(platform) => platform.processor_inventory(),
            #[cfg(test)]
            Self::Mock(mock) => mock.processor_inventory(),
        }
    }

    fn env_var_is_set(&self, name: &str) -> bool {
        match self {
            Self::Target(platform) => platform.env_var_is_set(name),
            #[cfg(test)]
            Self::Mock(mock) => mock.env_var_is_set(name),
        }
    }

    fn current_thread_affinity(&self) -> Result<ProcessorSet, io::Error> {
        match self {
            Self::Target(platform) => platform.current_thread_affinity(),
            #[cfg(test)]
            Self::Mock(mock) => mock.current_thread_affinity(),
        }
    }

    fn set_current_thread_affinity(&self, processors: &ProcessorSet) -> Result<(), io::Error> {
        match self {
            Self::Target(platform) => platform.set_current_thread_affinity(processors),
            #[cfg(test)]
            Self::Mock(mock) => mock.set_current_thread_affinity(processors),
        }
    }
}

impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
