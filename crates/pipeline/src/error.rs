use crate::sink::SinkError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] SinkError),
    #[error("failed to spawn {0}")]
    Spawn(String),
    #[error("sink drives {sink} pixels but the topology has {topology}")]
    SizeMismatch { topology: usize, sink: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("sink has already been released")]
    AlreadyReleased,
}
