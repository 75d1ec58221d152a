use ::thiserror::Error;

/// Things which can go wrong while driving a [`super::FramePacer`].
#[derive(Debug, Error)]
pub enum PacerError {
    #[error("Unable to spawn the frame pacer's timer thread")]
    ThreadSpawnFailed(#[source] std::io::Error),
}
