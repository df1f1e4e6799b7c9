//! The log fan-out hub (spec.md §2 "log fan-out that multiplexes
//! timestamped level-tagged entries from both workers to both persistent
//! storage and live subscribers", §4.1, §5 "Log publishing is lock-free
//! fan-out: persist, then enqueue into per-build topic channels").

mod hub;
mod sink;

pub use hub::{LogHub, LogMessage, SubscribeError};
pub use sink::LogSink;
