//! Core types for botbase.
//!
//! This crate holds everything about a bot server that does not need a
//! runtime: the message model, configuration, the error taxonomy, the admin
//! allow-list and the parsing of diagnostic commands.
//!
//! # Diagnostic Commands
//!
//! - `!logsend` - upload the chat client's logs
//! - `!botlog` - copy recent bot logs into the caller's shared folder
//! - `!pprof <kind> [flags...] <duration>` - capture a `trace`, `cpu` or
//!   `heap` profile and post it back as an attachment

pub mod admin;
pub mod command;
pub mod config;
pub mod duration;
pub mod error;
pub mod model;
pub mod profile;

pub use admin::AdminGate;
pub use command::{classify, DiagnosticCommand, Route};
pub use config::{LogSourceOptions, ServerConfig, DEFAULT_BOT_ADMINS};
pub use duration::{format_duration, parse_duration, DurationError};
pub use error::{BotError, Result};
pub use model::{Channel, ConvId, ConvSummary, MembersType, Message, Sender};
pub use profile::{plan_profile, ProfilePlan, ProfileRequest, PROFILE_USAGE};
