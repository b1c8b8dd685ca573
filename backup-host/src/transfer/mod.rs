//! rsync execution and output handling.

pub mod classify;
pub mod codec;
pub mod invoker;
pub mod progress;
pub mod router;

pub use classify::{classify_line, PathLine, TransferLine};
pub use invoker::{run_transfer, TransferCommand, TransferStatus};
pub use progress::{format_bytes, ProgressLine};
pub use router::{LineCounts, LineRouter, LineSink, StatusDisplay, TransferDisplay};
