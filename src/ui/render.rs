//! ui::render
//!
//! Draws an [`App`] with ratatui. Rendering reads state only.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::core::types::StreamKind;
use crate::engine::gate::CONFIRM_PHRASE;

use super::app::{App, Screen};

const HEADER_HEIGHT: u16 = 3;
const FOOTER_HEIGHT: u16 = 3;

/// Draw one frame.
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(5),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    match app.screen {
        Screen::Home => draw_home(frame, app, chunks[1]),
        Screen::Verbs => draw_verbs(frame, app, chunks[1]),
        Screen::Wizard => draw_wizard(frame, app, chunks[1]),
        Screen::Preview => draw_preview(frame, app, chunks[1]),
        Screen::Confirm => draw_confirm(frame, app, chunks[1]),
        Screen::Running => draw_transcript(frame, app, chunks[1], "Running"),
    }
    draw_footer(frame, app, chunks[2]);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut crumbs = vec![Span::styled(
        "gitdeck",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if !app.category.is_empty() && app.screen != Screen::Home {
        crumbs.push(Span::raw(format!(" > {}", app.category)));
    }
    if let Some(action) = app.current_action() {
        crumbs.push(Span::raw(format!(" > {}", action.name)));
    }
    let header = Paragraph::new(Line::from(crumbs)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let hints = match app.screen {
        Screen::Home => "Up/Down move  Enter open  q quit",
        Screen::Verbs => "Up/Down move  Enter select  type to search  Esc back  q quit",
        Screen::Wizard => "Enter answer  Esc back  Ctrl+C quit",
        Screen::Preview if app.editing.is_some() => "Enter keep  Esc discard",
        Screen::Preview if app.form.is_some() => {
            "Space toggle/edit  v advanced  r run  Esc back  q quit"
        }
        Screen::Preview => "r run  Esc back  q quit",
        Screen::Confirm => "Enter confirm  Esc cancel",
        Screen::Running => "c cancel  q cancel, then quit",
    };
    let lines = vec![
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    ];
    let footer = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}

fn draw_home(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .categories
        .iter()
        .map(|c| ListItem::new(c.clone()))
        .collect();
    render_list(frame, area, "Categories", items, app.home_cursor);
}

fn draw_verbs(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = app
        .verbs
        .iter()
        .map(|a| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<20}", a.name),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(a.help.clone()),
            ]))
        })
        .collect();
    render_list(frame, chunks[0], "Actions", items, app.verb_cursor);

    let search = Paragraph::new(format!("> {}", app.query))
        .block(Block::default().borders(Borders::ALL).title("Search or type a command"));
    frame.render_widget(search, chunks[1]);
}

fn draw_wizard(frame: &mut Frame, app: &App, area: Rect) {
    let Some(action) = app.current_action() else {
        return;
    };
    let mut lines = vec![Line::from(action.help.clone()), Line::default()];
    for (i, prompt) in action.prompts.iter().enumerate() {
        if i < app.wizard_step {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", prompt.label), Style::default().fg(Color::DarkGray)),
                Span::raw(app.input.get(&prompt.key).to_string()),
            ]));
        } else if i == app.wizard_step {
            let hint = if prompt.default.is_empty() {
                String::new()
            } else {
                format!(" [{}]", prompt.default)
            };
            lines.push(Line::from(Span::styled(
                format!("{}{hint}", prompt.label),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(format!("> {}_", app.buffer)));
        }
    }
    let title = format!(
        "Step {} of {}",
        (app.wizard_step + 1).min(action.prompts.len()),
        action.prompts.len()
    );
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(body, area);
}

fn draw_preview(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(4),
            Constraint::Percentage(35),
        ])
        .split(area);

    let command = app
        .preview_command()
        .map(|c| c.preview)
        .unwrap_or_default();
    let preview = Paragraph::new(command)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Command"));
    frame.render_widget(preview, chunks[0]);

    match &app.form {
        Some(form) => {
            let items: Vec<ListItem> = form
                .visible()
                .into_iter()
                .map(|flag| {
                    let error = app
                        .errors
                        .iter()
                        .find(|e| e.field == flag.param_key)
                        .map(|e| format!("  ! {}", e.message))
                        .unwrap_or_default();
                    let marker = if flag.advanced { " (advanced)" } else { "" };
                    let text = if flag.is_toggle() {
                        let check = if form.is_included(&flag.param_key) { "x" } else { " " };
                        let hint = if form.suggested(flag) { " *" } else { "" };
                        format!("[{check}] {:<14} {}{hint}{marker}", flag.key, flag.display_label())
                    } else if app.editing.as_deref() == Some(flag.param_key.as_str()) {
                        format!("    {:<14} {}: {}_", flag.key, flag.display_label(), app.buffer)
                    } else {
                        format!(
                            "    {:<14} {}: {}{marker}",
                            flag.key,
                            flag.display_label(),
                            form.value(&flag.param_key)
                        )
                    };
                    let style = if error.is_empty() {
                        Style::default()
                    } else {
                        Style::default().fg(Color::Red)
                    };
                    ListItem::new(Span::styled(format!("{text}{error}"), style))
                })
                .collect();
            let title = format!("Flags: {}", form.spec().title());
            render_list(frame, chunks[1], &title, items, app.form_cursor);
        }
        None => {
            let mut lines: Vec<Line> = app
                .input
                .iter()
                .map(|(k, v)| Line::from(format!("{k} = {v}")))
                .collect();
            lines.extend(
                app.errors
                    .iter()
                    .map(|e| Line::from(Span::styled(e.to_string(), Style::default().fg(Color::Red)))),
            );
            let inputs = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Inputs"));
            frame.render_widget(inputs, chunks[1]);
        }
    }

    if app.transcript.is_empty() {
        let detail = Paragraph::new(app.detail.clone())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Last run"));
        frame.render_widget(detail, chunks[2]);
    } else {
        draw_transcript(frame, app, chunks[2], "Last run");
    }
}

fn draw_confirm(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        "This operation needs confirmation:",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))];
    for reason in app.pending_reasons() {
        lines.push(Line::from(format!("  - {reason}")));
    }
    if let Some(pending) = &app.pending {
        lines.push(Line::default());
        lines.push(Line::from(format!("  {}", pending.command.preview)));
        if pending.backup {
            lines.push(Line::from("  A recovery branch is created first."));
        }
    }
    lines.push(Line::default());
    lines.push(Line::from(format!("Type {CONFIRM_PHRASE}:")));
    lines.push(Line::from(format!("> {}_", app.buffer)));
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Confirm"));
    frame.render_widget(body, area);
}

fn draw_transcript(frame: &mut Frame, app: &App, area: Rect, title: &str) {
    let height = area.height.saturating_sub(2) as usize;
    let start = app.transcript.len().saturating_sub(height);
    let lines: Vec<Line> = app.transcript[start..]
        .iter()
        .map(|line| {
            let style = match line.stream {
                StreamKind::Stdout => Style::default(),
                StreamKind::Stderr => Style::default().fg(Color::Red),
            };
            Line::from(Span::styled(line.text.clone(), style))
        })
        .collect();
    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(body, area);
}

fn render_list(frame: &mut Frame, area: Rect, title: &str, items: Vec<ListItem>, selected: usize) {
    let mut state = ListState::default().with_selected((!items.is_empty()).then_some(selected));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRegistry;
    use crate::combos::ComboRegistry;
    use crate::ui::app::{Catalog, Msg};
    use crate::ui::keys::Key;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn home_lists_categories() {
        let app = App::new(Catalog::new(
            "git",
            ActionRegistry::with_builtins("git"),
            ComboRegistry::new(),
        ));
        let screen = rendered(&app);
        assert!(screen.contains("Categories"));
        assert!(screen.contains("basics"));
    }

    #[test]
    fn preview_shows_command() {
        let mut app = App::new(Catalog::new(
            "git",
            ActionRegistry::with_builtins("git"),
            ComboRegistry::new(),
        ));
        app.enter_verbs(String::new());
        for c in "status".chars() {
            app.update(Msg::Key(Key::Char(c)));
        }
        app.update(Msg::Key(Key::Enter));
        assert!(rendered(&app).contains("git status"));
    }
}
