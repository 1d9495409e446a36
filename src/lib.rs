//! labbox-launcher: launch a labbox container.
//!
//! Stages, in the order the CLI drives them:
//! - [`collector`]: fill launch settings missing from flags (prompts or script)
//! - [`resolver`] / [`kachery`]: turn the image identifier into a concrete reference
//! - [`planner`]: validate and assemble the launch plan
//! - [`launcher`]: run the plan on Docker/Podman and report the result
//!
//! Public APIs are re-exported at the crate root.

pub mod collector;
mod color;
pub mod config;
pub mod docker;
mod errors;
pub mod kachery;
pub mod launcher;
pub mod model;
pub mod planner;
pub mod resolver;
pub mod signals;
pub mod telemetry;
#[path = "ui/warn.rs"]
mod ui_warn;
pub mod util;

pub use collector::{
    AnswerSource, Collector, FieldKey, InputKind, NoAnswers, PromptField, Schema,
    ScriptedAnswers, TerminalAnswers,
};
pub use color::{
    color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr, paint,
    set_color_mode, ColorMode,
};
pub use config::Config;
pub use errors::{LauncherError, LookupError, RuntimeError};
pub use kachery::{store_from_config, KacheryCatStore, LocalKacheryStore, UnavailableStore};
pub use launcher::{ContainerRuntime, DockerCli, Launcher, RuntimeOutcome};
pub use model::{
    ImageSource, LaunchPlan, LaunchRequest, LaunchResult, MountSpec, PortSpec, ResolvedImage,
};
pub use planner::plan;
pub use resolver::{ContentHash, ContentStore, Resolver};
pub use ui_warn::warn_print;
pub use util::{shell_escape, shell_join};
