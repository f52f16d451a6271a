//! ui::terminal
//!
//! The runtime around the reducer: owns the terminal, turns key events and
//! run events into [`Msg`]s, and performs the [`Cmd`]s that come back.
//!
//! The loop waits on two sources at once: crossterm's event stream and the
//! current run's channels. Without a run in flight only keys are awaited.

use std::io::{self, IsTerminal, Stdout};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::engine::run::{self, RunChannels, RunEvent, RunSettings};

use super::app::{App, Cmd, Msg};
use super::keys::Key;
use super::render;

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the interactive UI until the user quits.
pub async fn run_tui(app: App, settings: Arc<RunSettings>) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        bail!("the interactive UI needs a terminal (TTY); try `gd actions` or `gd preview`");
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        restore_modes();
        return Err(e).context("enter alternate screen");
    }
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(e) => {
            restore_modes();
            return Err(e).context("create terminal");
        }
    };

    let result = event_loop(&mut terminal, app, settings).await;

    restore_modes();
    if let Err(e) = terminal.show_cursor() {
        tracing::debug!(error = %e, "show cursor failed");
    }
    result
}

fn restore_modes() {
    if let Err(e) = disable_raw_mode() {
        tracing::warn!(error = %e, "disable raw mode failed");
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
        tracing::warn!(error = %e, "leave alternate screen failed");
    }
}

enum Next {
    Terminal(Option<io::Result<Event>>),
    Run(Option<RunEvent>),
}

async fn event_loop(terminal: &mut Term, mut app: App, settings: Arc<RunSettings>) -> Result<()> {
    let mut events = EventStream::new();
    let mut current: Option<RunChannels> = None;

    loop {
        terminal
            .draw(|frame| render::draw(frame, &app))
            .context("draw frame")?;

        let next = tokio::select! {
            event = events.next() => Next::Terminal(event),
            event = pull(&mut current) => Next::Run(event),
        };

        let msg = match next {
            Next::Terminal(None) => {
                tracing::info!("terminal event stream closed");
                cancel(&current);
                return Ok(());
            }
            Next::Terminal(Some(Err(e))) => {
                cancel(&current);
                return Err(e).context("read terminal event");
            }
            Next::Terminal(Some(Ok(Event::Key(event)))) => match Key::from_event(event) {
                Some(key) => Msg::Key(key),
                None => continue,
            },
            Next::Terminal(Some(Ok(_))) => continue,
            Next::Run(Some(RunEvent::Line(line))) => Msg::Line(line),
            Next::Run(Some(RunEvent::Finished(outcome))) => {
                current = None;
                Msg::Finished(outcome)
            }
            Next::Run(None) => {
                current = None;
                continue;
            }
        };

        match app.update(msg) {
            Cmd::None | Cmd::Pull => {}
            Cmd::Spawn(request) => {
                tracing::debug!(action = %request.action, "spawning run");
                current = Some(run::spawn(Arc::clone(&settings), request));
            }
            Cmd::Quit => {
                cancel(&current);
                return Ok(());
            }
        }
    }
}

/// Next event of the current run; never resolves without one.
async fn pull(current: &mut Option<RunChannels>) -> Option<RunEvent> {
    match current {
        Some(channels) => channels.pull().await,
        None => std::future::pending().await,
    }
}

fn cancel(current: &Option<RunChannels>) {
    if let Some(channels) = current {
        channels.cancel_handle().cancel();
    }
}
