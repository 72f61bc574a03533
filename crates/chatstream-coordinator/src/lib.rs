#![deny(warnings)]
#![deny(unused_imports)]

pub mod assemble;
pub mod coordinator;
pub mod event;
pub mod log;
pub mod transport;

pub use assemble::TurnAssembler;
pub use coordinator::StreamCoordinator;
pub use event::{ChatEvent, ChatEventKind, TurnOutcome, TurnState};
pub use log::MessageLog;
pub use transport::{ScriptedTransport, ScriptItem};
