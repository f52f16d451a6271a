//! ui::app
//!
//! The interaction state machine.
//!
//! # Screens
//!
//! ```text
//! home -> verbs -> wizard | preview -> confirm -> running -> preview
//! ```
//!
//! [`App::update`] is a pure reducer: it consumes one [`Msg`] and returns
//! the single effect the runtime must perform as a [`Cmd`]. Nothing here
//! touches the terminal, spawns a process, or reads the clock.
//!
//! # Keys
//!
//! - `Esc` goes back one level; `q` quits from navigation screens
//! - `Ctrl+C` quits anywhere; while running the first press cancels
//! - In preview: `r`/`F5` runs, `Space`/`Enter` toggles or edits the flag
//!   under the cursor, `v` expands advanced flags
//!
//! # Invariants
//!
//! - No `Cmd::Spawn` without passing validation and, when the gate asks
//!   for it, the exact confirmation phrase
//! - At most one run in flight; the cancel handle lives exactly as long
//! - Going back never leaves a stale edit focus behind

use std::sync::Arc;

use crate::actions::{ActionDef, ActionRegistry, VerbParser, OTHER_CATEGORY};
use crate::combos::{ComboForm, ComboRegistry};
use crate::core::types::{ActionInput, FieldError, OutputLine, ResolvedCommand};
use crate::engine::gate::{check_phrase, GateDecision, SafetyGate, CONFIRM_PHRASE};
use crate::engine::{CancelHandle, RunOutcome, RunRequest};

use super::keys::Key;

/// Live transcript cap; older lines are discarded first.
pub const MAX_TRANSCRIPT_LINES: usize = 2_000;

/// Runs remembered for the session.
pub const MAX_HISTORY: usize = 100;

/// Current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Verbs,
    Wizard,
    Preview,
    Confirm,
    Running,
}

/// Input to the reducer.
#[derive(Debug)]
pub enum Msg {
    Key(Key),
    Line(OutputLine),
    Finished(RunOutcome),
}

/// Effect requested by the reducer.
#[derive(Debug)]
pub enum Cmd {
    None,
    Spawn(RunRequest),
    /// Keep pulling events from the current run.
    Pull,
    Quit,
}

/// Registries and settings the UI reads.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub program: String,
    pub actions: Arc<ActionRegistry>,
    pub combos: Arc<ComboRegistry>,
    pub parser: VerbParser,
    pub show_advanced: bool,
}

impl Catalog {
    /// Build the catalog. Specs without a registered action get a
    /// pass-through action so they show up under their category.
    pub fn new(program: &str, mut actions: ActionRegistry, combos: ComboRegistry) -> Self {
        for key in combos.keys() {
            if actions.get(&key).is_some() {
                continue;
            }
            let Some(spec) = combos.get(&key) else {
                continue;
            };
            let verb = spec.verb_tokens();
            let verb: Vec<&str> = verb.iter().map(String::as_str).collect();
            let category = if spec.category.is_empty() {
                OTHER_CATEGORY
            } else {
                spec.category.as_str()
            };
            let action =
                ActionDef::passthrough(program, &key, category, &spec.description, &verb, "", "");
            if let Err(e) = actions.register(action) {
                tracing::debug!(%key, error = %e, "skipping spec without action");
            }
        }
        Self {
            program: program.to_string(),
            actions: Arc::new(actions),
            combos: Arc::new(combos),
            parser: VerbParser::new(),
            show_advanced: false,
        }
    }

    /// Start combo forms with advanced flags expanded.
    pub fn with_show_advanced(mut self, show: bool) -> Self {
        self.show_advanced = show;
        self
    }
}

/// A command waiting for the confirmation phrase.
#[derive(Debug, Clone)]
pub struct PendingRun {
    pub command: ResolvedCommand,
    pub reasons: Vec<String>,
    pub backup: bool,
}

/// One finished run of this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub action: String,
    pub command: String,
    pub exit_code: i32,
    pub summary: String,
}

impl From<&RunOutcome> for HistoryEntry {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            action: outcome.action.clone(),
            command: outcome.command.render_chain(),
            exit_code: outcome.result.exit_code,
            summary: outcome.summary.short.clone(),
        }
    }
}

/// Where Esc from preview leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Verbs,
    Wizard,
}

/// Interaction state.
#[derive(Debug)]
pub struct App {
    catalog: Catalog,
    gate: SafetyGate,
    origin: Origin,

    pub(crate) screen: Screen,
    pub(crate) categories: Vec<String>,
    pub(crate) home_cursor: usize,
    pub(crate) category: String,
    pub(crate) verbs: Vec<Arc<ActionDef>>,
    pub(crate) verb_cursor: usize,
    pub(crate) query: String,

    pub(crate) action: Option<Arc<ActionDef>>,
    pub(crate) input: ActionInput,
    pub(crate) wizard_step: usize,
    /// Text being typed: wizard answer, flag edit, or confirmation phrase.
    pub(crate) buffer: String,
    pub(crate) form: Option<ComboForm>,
    pub(crate) form_cursor: usize,
    /// Parameter key of the manual flag being edited.
    pub(crate) editing: Option<String>,
    pub(crate) errors: Vec<FieldError>,
    pub(crate) pending: Option<PendingRun>,

    running: Option<CancelHandle>,
    pub(crate) cancelling: bool,
    pub(crate) transcript: Vec<OutputLine>,
    pub(crate) history: Vec<HistoryEntry>,
    pub(crate) status: String,
    pub(crate) detail: String,
}

impl App {
    pub fn new(catalog: Catalog) -> Self {
        let gate = SafetyGate::new(catalog.program.clone());
        let categories = catalog.actions.categories();
        Self {
            catalog,
            gate,
            origin: Origin::Verbs,
            screen: Screen::Home,
            categories,
            home_cursor: 0,
            category: String::new(),
            verbs: Vec::new(),
            verb_cursor: 0,
            query: String::new(),
            action: None,
            input: ActionInput::new(),
            wizard_step: 0,
            buffer: String::new(),
            form: None,
            form_cursor: 0,
            editing: None,
            errors: Vec::new(),
            pending: None,
            running: None,
            cancelling: false,
            transcript: Vec::new(),
            history: Vec::new(),
            status: "Pick a category".to_string(),
            detail: String::new(),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Detail block of the last run summary.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn current_action(&self) -> Option<&ActionDef> {
        self.action.as_deref()
    }

    /// Inputs collected by the wizard (or seeded from defaults).
    pub fn input(&self) -> &ActionInput {
        &self.input
    }

    pub fn form(&self) -> Option<&ComboForm> {
        self.form.as_ref()
    }

    /// Field-scoped validation errors from the last run attempt.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn transcript(&self) -> &[OutputLine] {
        &self.transcript
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Reasons shown on the confirmation screen.
    pub fn pending_reasons(&self) -> &[String] {
        self.pending.as_ref().map_or(&[], |p| p.reasons.as_slice())
    }

    /// The command the current inputs resolve to.
    pub fn preview_command(&self) -> Option<ResolvedCommand> {
        if let Some(form) = &self.form {
            return Some(form.build(&self.catalog.program));
        }
        self.action.as_ref().map(|a| a.build(&self.input))
    }

    /// Apply one message.
    pub fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::Key(key) => self.on_key(key),
            Msg::Line(line) => self.on_line(line),
            Msg::Finished(outcome) => self.on_finished(outcome),
        }
    }

    fn on_key(&mut self, key: Key) -> Cmd {
        if self.screen == Screen::Running {
            return self.running_key(key);
        }
        if key == Key::Interrupt {
            return Cmd::Quit;
        }
        match self.screen {
            Screen::Home => self.home_key(key),
            Screen::Verbs => self.verbs_key(key),
            Screen::Wizard => self.wizard_key(key),
            Screen::Preview if self.editing.is_some() => self.edit_key(key),
            Screen::Preview => self.preview_key(key),
            Screen::Confirm => self.confirm_key(key),
            Screen::Running => Cmd::None,
        }
    }

    fn home_key(&mut self, key: Key) -> Cmd {
        match key {
            Key::Up => self.home_cursor = self.home_cursor.saturating_sub(1),
            Key::Down => self.home_cursor = step_down(self.home_cursor, self.categories.len()),
            Key::Enter => {
                let category = self
                    .categories
                    .get(self.home_cursor)
                    .cloned()
                    .unwrap_or_default();
                self.enter_verbs(category);
            }
            Key::Char('q') => return Cmd::Quit,
            _ => {}
        }
        Cmd::None
    }

    /// Show the actions of `category`, or all of them when it has none.
    pub(crate) fn enter_verbs(&mut self, category: String) {
        self.verbs = self.catalog.actions.for_category(&category);
        self.category = category;
        self.verb_cursor = 0;
        self.query.clear();
        self.clear_selection();
        self.screen = Screen::Verbs;
        self.status = "Enter selects; type to search".to_string();
    }

    fn verbs_key(&mut self, key: Key) -> Cmd {
        match key {
            Key::Up => self.verb_cursor = self.verb_cursor.saturating_sub(1),
            Key::Down => self.verb_cursor = step_down(self.verb_cursor, self.verbs.len()),
            Key::Esc => {
                self.query.clear();
                self.screen = Screen::Home;
                self.status = "Pick a category".to_string();
            }
            Key::Backspace => {
                self.query.pop();
            }
            Key::Enter if self.query.trim().is_empty() => {
                if let Some(action) = self.verbs.get(self.verb_cursor).cloned() {
                    self.open_action(action, ActionInput::new());
                }
            }
            Key::Enter => self.resolve_query(),
            Key::Char('q') if self.query.is_empty() => return Cmd::Quit,
            other => {
                if let Some(c) = other.printable() {
                    self.query.push(c);
                }
            }
        }
        Cmd::None
    }

    /// Resolve the free-text query.
    ///
    /// An exact synonym wins. A registered verb followed by arguments keeps
    /// them: actions with an `args` prompt are seeded, others fall back to a
    /// pass-through of `verb args...`. Then phrase matching, then a
    /// pass-through of whatever was typed.
    fn resolve_query(&mut self) {
        let query = std::mem::take(&mut self.query);
        let actions = Arc::clone(&self.catalog.actions);
        if let Some(action) = self.catalog.parser.synonym(&query).and_then(|n| actions.get(n)) {
            self.open_action(action, ActionInput::new());
            return;
        }

        let text = strip_program(query.trim(), &self.catalog.program);
        let (verb, rest) = text
            .split_once(char::is_whitespace)
            .map_or((text, ""), |(verb, rest)| (verb, rest.trim()));
        if verb.is_empty() {
            return;
        }
        let seed = if rest.is_empty() {
            ActionInput::new()
        } else {
            ActionInput::new().with("args", rest)
        };

        if !rest.is_empty() {
            if let Some(action) = actions.get(verb) {
                let action = if action.prompts.iter().any(|p| p.key == "args") {
                    action
                } else {
                    Arc::new(ActionDef::generic(&self.catalog.program, verb))
                };
                self.open_action(action, seed);
                return;
            }
        }

        let resolved = self
            .catalog
            .parser
            .parse(&query, |name| actions.get(name).is_some())
            .and_then(|name| actions.get(&name));
        if let Some(action) = resolved {
            self.open_action(action, ActionInput::new());
            return;
        }

        let action = match actions.get(verb) {
            Some(action) => action,
            None => Arc::new(ActionDef::generic(&self.catalog.program, verb)),
        };
        self.open_action(action, seed);
    }

    fn open_action(&mut self, action: Arc<ActionDef>, seed: ActionInput) {
        let mut input = action.defaults();
        for (key, value) in seed.iter() {
            input.set(key, value);
        }
        self.clear_selection();
        self.input = input;
        // Typed arguments take precedence over the combo form.
        self.form = if seed.is_empty() {
            self.catalog
                .combos
                .get(&action.name)
                .map(|spec| ComboForm::new(spec, self.catalog.show_advanced))
        } else {
            None
        };
        self.status = action.help.clone();
        tracing::debug!(action = %action.name, form = self.form.is_some(), "action selected");

        if self.form.is_some() || action.prompts.is_empty() || !seed.is_empty() {
            self.origin = Origin::Verbs;
            self.screen = Screen::Preview;
        } else {
            self.wizard_step = 0;
            self.screen = Screen::Wizard;
        }
        self.action = Some(action);
    }

    fn clear_selection(&mut self) {
        self.action = None;
        self.form = None;
        self.form_cursor = 0;
        self.editing = None;
        self.buffer.clear();
        self.errors.clear();
        self.pending = None;
        self.wizard_step = 0;
    }

    fn wizard_key(&mut self, key: Key) -> Cmd {
        let Some(action) = self.action.clone() else {
            self.screen = Screen::Verbs;
            return Cmd::None;
        };
        match key {
            Key::Esc if self.wizard_step == 0 => self.back_to_verbs(),
            Key::Esc => {
                self.wizard_step -= 1;
                self.buffer = self.prompt_value(&action, self.wizard_step);
            }
            Key::Enter => {
                if let Some(prompt) = action.prompts.get(self.wizard_step) {
                    self.input.set(prompt.key.as_str(), prompt.answer(&self.buffer));
                }
                self.buffer.clear();
                self.wizard_step += 1;
                if self.wizard_step >= action.prompts.len() {
                    self.origin = Origin::Wizard;
                    self.screen = Screen::Preview;
                    self.status = "Press r to run, Esc to go back".to_string();
                }
            }
            Key::Backspace => {
                self.buffer.pop();
            }
            other => {
                if let Some(c) = other.printable() {
                    self.buffer.push(c);
                }
            }
        }
        Cmd::None
    }

    fn prompt_value(&self, action: &ActionDef, step: usize) -> String {
        action
            .prompts
            .get(step)
            .map(|p| self.input.get(&p.key).to_string())
            .unwrap_or_default()
    }

    fn back_to_verbs(&mut self) {
        self.clear_selection();
        self.screen = Screen::Verbs;
        self.status = "Enter selects; type to search".to_string();
    }

    fn preview_key(&mut self, key: Key) -> Cmd {
        match key {
            Key::Esc => self.back_from_preview(),
            Key::Char('q') => return Cmd::Quit,
            Key::Char('r') | Key::F(5) => return self.request_run(),
            Key::Char('v') => {
                if let Some(form) = self.form.as_mut() {
                    form.toggle_advanced();
                    let visible = form.visible().len();
                    self.form_cursor = self.form_cursor.min(visible.saturating_sub(1));
                }
            }
            Key::Up => self.form_cursor = self.form_cursor.saturating_sub(1),
            Key::Down => {
                let visible = self.form.as_ref().map_or(0, |f| f.visible().len());
                self.form_cursor = step_down(self.form_cursor, visible);
            }
            Key::Char(' ') | Key::Enter => self.activate_flag(),
            _ => {}
        }
        Cmd::None
    }

    /// Toggle the flag under the cursor, or open the editor for a manual one.
    fn activate_flag(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let Some((toggle, key)) = form
            .flag_at(self.form_cursor)
            .map(|f| (f.is_toggle(), f.param_key.clone()))
        else {
            return;
        };
        if toggle {
            form.toggle(self.form_cursor);
            self.errors.retain(|e| e.field != key);
        } else {
            self.buffer = form.value(&key).to_string();
            self.editing = Some(key);
        }
    }

    fn edit_key(&mut self, key: Key) -> Cmd {
        let Some(field) = self.editing.clone() else {
            return Cmd::None;
        };
        match key {
            Key::Enter => {
                let text = std::mem::take(&mut self.buffer);
                if let Some(form) = self.form.as_mut() {
                    form.set_value(&field, text);
                }
                self.errors.retain(|e| e.field != field);
                self.editing = None;
            }
            Key::Esc => {
                self.buffer.clear();
                self.editing = None;
            }
            Key::Backspace => {
                self.buffer.pop();
            }
            other => {
                if let Some(c) = other.printable() {
                    self.buffer.push(c);
                }
            }
        }
        Cmd::None
    }

    fn back_from_preview(&mut self) {
        self.editing = None;
        self.buffer.clear();
        self.errors.clear();
        let wizard = match (&self.action, self.origin) {
            (Some(action), Origin::Wizard) if !action.prompts.is_empty() => Some(Arc::clone(action)),
            _ => None,
        };
        match wizard {
            Some(action) => {
                self.wizard_step = action.prompts.len() - 1;
                self.buffer = self.prompt_value(&action, self.wizard_step);
                self.screen = Screen::Wizard;
            }
            None => self.back_to_verbs(),
        }
    }

    /// Validate, resolve, and consult the gate.
    fn request_run(&mut self) -> Cmd {
        let Some(action) = self.action.clone() else {
            return Cmd::None;
        };
        let (input, command) = match &self.form {
            Some(form) => match form.validate() {
                Ok(()) => (form.resolve(), form.build(&self.catalog.program)),
                Err(errors) => return self.reject(errors),
            },
            None => match action.validate(&self.input) {
                Ok(()) => (self.input.clone(), action.build(&self.input)),
                Err(errors) => return self.reject(errors),
            },
        };
        self.errors.clear();

        match self
            .gate
            .assess(Some(action.as_ref()), &command, &input, self.form.as_ref())
        {
            GateDecision::Proceed => self.start_run(command, false),
            GateDecision::Confirm { reasons, backup } => {
                self.pending = Some(PendingRun {
                    command,
                    reasons,
                    backup,
                });
                self.buffer.clear();
                self.screen = Screen::Confirm;
                self.status = format!("Type {CONFIRM_PHRASE} and press Enter, Esc to go back");
                Cmd::None
            }
        }
    }

    fn reject(&mut self, errors: Vec<FieldError>) -> Cmd {
        self.status = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        self.errors = errors;
        Cmd::None
    }

    fn confirm_key(&mut self, key: Key) -> Cmd {
        match key {
            Key::Esc => {
                self.pending = None;
                self.buffer.clear();
                self.screen = Screen::Preview;
                self.status = "Confirmation cancelled".to_string();
            }
            Key::Enter => {
                let typed = std::mem::take(&mut self.buffer);
                let pending = self.pending.take();
                self.screen = Screen::Preview;
                match (pending, check_phrase(&typed)) {
                    (Some(pending), Ok(())) => {
                        return self.start_run(pending.command, pending.backup)
                    }
                    (_, Err(e)) => self.status = e.to_string(),
                    (None, Ok(())) => {}
                }
            }
            Key::Backspace => {
                self.buffer.pop();
            }
            other => {
                if let Some(c) = other.printable() {
                    self.buffer.push(c);
                }
            }
        }
        Cmd::None
    }

    fn start_run(&mut self, command: ResolvedCommand, backup: bool) -> Cmd {
        let Some(action) = &self.action else {
            return Cmd::None;
        };
        let cancel = CancelHandle::new();
        let request = RunRequest {
            action: action.name.clone(),
            command,
            backup,
            cancel: cancel.clone(),
        };
        self.status = format!("Running: {}", request.command.render_chain());
        self.running = Some(cancel);
        self.cancelling = false;
        self.transcript.clear();
        self.detail.clear();
        self.screen = Screen::Running;
        Cmd::Spawn(request)
    }

    fn running_key(&mut self, key: Key) -> Cmd {
        let quit_signal = matches!(key, Key::Char('q') | Key::Interrupt);
        if !quit_signal && key != Key::Char('c') {
            return Cmd::None;
        }
        if self.cancelling {
            return if quit_signal { Cmd::Quit } else { Cmd::None };
        }
        if let Some(handle) = &self.running {
            handle.cancel();
        }
        self.cancelling = true;
        self.status = "cancelling…".to_string();
        Cmd::None
    }

    fn on_line(&mut self, line: OutputLine) -> Cmd {
        if self.running.is_none() {
            return Cmd::None;
        }
        self.transcript.push(line);
        if self.transcript.len() > MAX_TRANSCRIPT_LINES {
            let excess = self.transcript.len() - MAX_TRANSCRIPT_LINES;
            self.transcript.drain(..excess);
        }
        Cmd::Pull
    }

    fn on_finished(&mut self, outcome: RunOutcome) -> Cmd {
        self.running = None;
        self.cancelling = false;
        self.history.push(HistoryEntry::from(&outcome));
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
        self.status = outcome.summary.short;
        self.detail = outcome.summary.detail;
        if self.screen == Screen::Running {
            self.screen = Screen::Preview;
        }
        Cmd::None
    }
}

fn step_down(cursor: usize, len: usize) -> usize {
    if cursor + 1 < len {
        cursor + 1
    } else {
        cursor
    }
}

/// Drop a leading `git` (or the configured program) from typed text.
fn strip_program<'a>(text: &'a str, program: &str) -> &'a str {
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) if first == program || first == "git" => rest.trim_start(),
        _ => text,
    }
}
