#[allow(clippy::module_inception)]
mod segment;
mod session;
mod store;

pub use {
    segment::Segment,
    session::{RecordingSession, SealedSession, SessionId},
    store::SegmentStore,
};
