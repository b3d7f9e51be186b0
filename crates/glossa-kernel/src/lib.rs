//! Session layer for the Glossa polyglot evaluation kernel.
//!
//! This crate provides:
//! - `LanguageSession`: incremental acceptance of fragments for one language
//! - `Dispatcher`: the single entry point, with the `#!` language-switch
//!   directive and per-language session routing
//! - `BindingBroker`: top-level variable transfer between languages on a
//!   switch, with naming-convention translation
//! - `OutputSink`: where user-visible report lines go

pub mod broker;
pub mod dispatch;
pub mod output;
pub mod session;

pub use broker::{BindingBroker, NamingConventions, TransferReport};
pub use dispatch::{Dispatcher, KernelBuilder, SWITCH_LANGUAGE_PREFIX};
pub use output::{MemorySink, OutputSink, StdioSink};
pub use session::{CheckOutcome, LanguageSession, SessionConfig};
