//! Save synchronization between the local save file and the save server.

mod engine;
#[cfg(test)]
pub(crate) mod fake;
mod http;
mod remote;

pub use engine::{PlaytimeOutcome, PullOutcome, PushOutcome, SyncEngine};
pub use http::HttpSaveRemote;
pub use remote::{LatestSave, PlaytimeTotal, RemoteError, RemoteResult, SaveRemote, UploadReceipt};
