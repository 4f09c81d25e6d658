//! Relay pipeline: watch the source conversation for command messages and republish
//! their payload into the target channel.
//!
//! Each inbound message is handled independently: a rejected publish is reported and
//! never affects the next message.

mod filter;
mod observer;
mod outcome;
mod pipeline;

pub use filter::{parse_command, Command};
pub use observer::{LogObserver, RelayEvent, RelayObserver};
pub use outcome::{Outcome, Rejection};
pub use pipeline::{RelayPipeline, UNKNOWN_SENDER};
