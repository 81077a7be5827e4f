//! Document job queue adapters.

mod channel;
mod recording;

pub use channel::{ChannelJobQueue, DocumentJobReceiver};
pub use recording::RecordingJobQueue;
