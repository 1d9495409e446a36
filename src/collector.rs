//! Schema-driven collection of launch settings that were not given as flags.
//!
//! Flags always win: a field already present in the request is never asked
//! for. Answers come from an [`AnswerSource`] so the collector runs the same
//! way against a terminal, a script, or nothing at all.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use serde::Deserialize;
use tracing::debug;

use crate::errors::LauncherError;
use crate::model::{parse_env_pair, valid_env_key, LaunchRequest, MountSpec, PortSpec};
use crate::util::shell_like_split_args;

pub const DEFAULT_PROMPT_RETRIES: u32 = 3;

/// Request field a prompt fills in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum FieldKey {
    Image,
    Interactive,
    Command,
    Port,
    Mount,
    Env(String),
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "image" => Ok(FieldKey::Image),
            "interactive" => Ok(FieldKey::Interactive),
            "command" => Ok(FieldKey::Command),
            "port" => Ok(FieldKey::Port),
            "mount" => Ok(FieldKey::Mount),
            other => match other.strip_prefix("env.") {
                Some(name) if valid_env_key(name) => Ok(FieldKey::Env(name.to_string())),
                _ => Err(format!(
                    "unknown prompt field '{other}' (expected image, interactive, command, port, mount or env.NAME)"
                )),
            },
        }
    }
}

impl TryFrom<String> for FieldKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Image => f.write_str("image"),
            FieldKey::Interactive => f.write_str("interactive"),
            FieldKey::Command => f.write_str("command"),
            FieldKey::Port => f.write_str("port"),
            FieldKey::Mount => f.write_str("mount"),
            FieldKey::Env(name) => write!(f, "env.{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Select,
    Confirm,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptField {
    pub field: FieldKey,
    pub prompt: String,
    #[serde(default = "default_kind")]
    pub kind: InputKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_kind() -> InputKind {
    InputKind::Text
}

impl PromptField {
    pub fn text(field: FieldKey, prompt: impl Into<String>) -> Self {
        Self {
            field,
            prompt: prompt.into(),
            kind: InputKind::Text,
            options: Vec::new(),
            default: None,
            required: true,
        }
    }

    pub fn select(field: FieldKey, prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            kind: InputKind::Select,
            options,
            ..Self::text(field, prompt)
        }
    }

    pub fn confirm(field: FieldKey, prompt: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Confirm,
            ..Self::text(field, prompt)
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Ordered set of prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub fields: Vec<PromptField>,
}

impl Schema {
    pub fn new(fields: Vec<PromptField>) -> Result<Self, LauncherError> {
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    /// Single required image prompt; a selection list when known images are configured.
    pub fn builtin(images: &[String]) -> Self {
        let prompt = "Container image (name[:tag] or sha1:// URI)";
        let field = if images.is_empty() {
            PromptField::text(FieldKey::Image, prompt)
        } else {
            PromptField::select(FieldKey::Image, prompt, images.to_vec())
        };
        Self {
            fields: vec![field],
        }
    }

    pub fn validate(&self) -> Result<(), LauncherError> {
        let mut seen = HashSet::new();
        for f in &self.fields {
            if !seen.insert(f.field.clone()) {
                return Err(LauncherError::Configuration(format!(
                    "prompt field '{}' is declared more than once",
                    f.field
                )));
            }
            match f.kind {
                InputKind::Select => {
                    if f.options.is_empty() {
                        return Err(LauncherError::Configuration(format!(
                            "select prompt '{}' declares no options",
                            f.field
                        )));
                    }
                    if let Some(d) = &f.default {
                        if !f.options.contains(d) {
                            return Err(LauncherError::Configuration(format!(
                                "default '{d}' of select prompt '{}' is not one of its options",
                                f.field
                            )));
                        }
                    }
                }
                InputKind::Confirm => {
                    if f.field != FieldKey::Interactive {
                        return Err(LauncherError::Configuration(format!(
                            "confirm prompts only apply to 'interactive', not '{}'",
                            f.field
                        )));
                    }
                }
                InputKind::Text => {}
            }
        }
        Ok(())
    }
}

/// Provider of prompt answers. `Ok(None)` means no answer can be obtained.
pub trait AnswerSource {
    fn ask(&mut self, field: &PromptField) -> Result<Option<String>, LauncherError>;
}

/// Interactive answers from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalAnswers;

impl TerminalAnswers {
    fn interactive() -> bool {
        atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stderr)
    }
}

impl AnswerSource for TerminalAnswers {
    fn ask(&mut self, field: &PromptField) -> Result<Option<String>, LauncherError> {
        if !Self::interactive() {
            return Ok(None);
        }
        let theme = ColorfulTheme::default();
        let answer = match field.kind {
            InputKind::Select => {
                let mut select = Select::with_theme(&theme)
                    .with_prompt(&field.prompt)
                    .items(&field.options);
                if let Some(idx) = field
                    .default
                    .as_ref()
                    .and_then(|d| field.options.iter().position(|o| o == d))
                {
                    select = select.default(idx);
                }
                select
                    .interact_opt()?
                    .and_then(|idx| field.options.get(idx).cloned())
            }
            InputKind::Confirm => {
                let default = field
                    .default
                    .as_deref()
                    .and_then(parse_confirm)
                    .unwrap_or(true);
                let yes = Confirm::with_theme(&theme)
                    .with_prompt(&field.prompt)
                    .default(default)
                    .interact_opt()?;
                yes.map(|b| if b { "yes" } else { "no" }.to_string())
            }
            InputKind::Text => {
                let mut input = Input::<String>::with_theme(&theme)
                    .with_prompt(&field.prompt)
                    .allow_empty(true);
                if let Some(d) = &field.default {
                    input = input.default(d.clone());
                }
                Some(input.interact_text()?)
            }
        };
        Ok(answer)
    }
}

/// Pre-recorded answers, handed out in order. Records every field asked.
#[derive(Debug, Default)]
pub struct ScriptedAnswers {
    answers: VecDeque<String>,
    asked: Vec<FieldKey>,
}

impl ScriptedAnswers {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[FieldKey] {
        &self.asked
    }
}

impl AnswerSource for ScriptedAnswers {
    fn ask(&mut self, field: &PromptField) -> Result<Option<String>, LauncherError> {
        self.asked.push(field.field.clone());
        Ok(self.answers.pop_front())
    }
}

/// Non-interactive sessions: never answers.
#[derive(Debug, Default)]
pub struct NoAnswers;

impl AnswerSource for NoAnswers {
    fn ask(&mut self, _field: &PromptField) -> Result<Option<String>, LauncherError> {
        Ok(None)
    }
}

fn parse_confirm(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn is_present(req: &LaunchRequest, key: &FieldKey) -> bool {
    match key {
        FieldKey::Image => req.image_identifier.is_some(),
        FieldKey::Interactive => req.interactive.is_some(),
        FieldKey::Command => req.command.is_some(),
        FieldKey::Port => !req.ports.is_empty(),
        FieldKey::Mount => !req.mounts.is_empty(),
        FieldKey::Env(name) => req.env.contains_key(name),
    }
}

/// Validate one answer and store it in `req`. `Err` carries the reason it was rejected.
fn apply_answer(req: &mut LaunchRequest, field: &PromptField, raw: &str) -> Result<(), String> {
    let value = raw.trim();
    if field.kind == InputKind::Select && !field.options.iter().any(|o| o == value) {
        return Err(format!(
            "invalid selection '{value}' (choose one of: {})",
            field.options.join(", ")
        ));
    }
    match &field.field {
        FieldKey::Image => req.image_identifier = Some(value.to_string()),
        FieldKey::Interactive => {
            let b = parse_confirm(value).ok_or_else(|| format!("expected yes or no, got '{value}'"))?;
            req.interactive = Some(b);
        }
        FieldKey::Command => {
            let words = shell_like_split_args(value)?;
            if words.is_empty() {
                return Err("command is empty".to_string());
            }
            req.command = Some(words);
        }
        FieldKey::Port => req.ports.push(value.parse::<PortSpec>()?),
        FieldKey::Mount => {
            let mount = value.parse::<MountSpec>()?;
            let base = std::env::current_dir().map_err(|e| e.to_string())?;
            req.mounts.push(mount.anchored_at(&base));
        }
        FieldKey::Env(name) => {
            let (k, v) = parse_env_pair(&format!("{name}={value}"))?;
            req.env.insert(k, v);
        }
    }
    Ok(())
}

pub struct Collector<'a> {
    source: &'a mut dyn AnswerSource,
    max_attempts: u32,
}

impl<'a> Collector<'a> {
    pub fn new(source: &'a mut dyn AnswerSource) -> Self {
        Self {
            source,
            max_attempts: DEFAULT_PROMPT_RETRIES,
        }
    }

    /// Total attempts per field before giving up (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Return a copy of `partial` with every absent schema field filled in.
    pub fn collect(
        &mut self,
        partial: LaunchRequest,
        schema: &Schema,
    ) -> Result<LaunchRequest, LauncherError> {
        let mut req = partial;
        for field in &schema.fields {
            if is_present(&req, &field.field) {
                debug!(field = %field.field, "already set by flag; not prompting");
                continue;
            }
            self.collect_field(&mut req, field)?;
        }
        Ok(req)
    }

    fn collect_field(
        &mut self,
        req: &mut LaunchRequest,
        field: &PromptField,
    ) -> Result<(), LauncherError> {
        for attempt in 1..=self.max_attempts {
            let answer = self
                .source
                .ask(field)?
                .filter(|a| !a.trim().is_empty())
                .or_else(|| field.default.clone());
            let Some(answer) = answer else {
                if field.required {
                    return Err(LauncherError::Configuration(format!(
                        "required field '{}' is unset and cannot be prompted for (pass it as a flag)",
                        field.field
                    )));
                }
                debug!(field = %field.field, "optional field left unset");
                return Ok(());
            };
            match apply_answer(req, field, &answer) {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    debug!(field = %field.field, attempt, "rejected answer: {reason}");
                    crate::warn_print(&format!("{}: {reason}", field.field));
                }
            }
        }
        Err(LauncherError::Configuration(format!(
            "no valid answer for '{}' after {} attempt(s)",
            field.field, self.max_attempts
        )))
    }
}
