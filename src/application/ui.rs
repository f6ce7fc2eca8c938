use std::io;

use anyhow::Result;
use crossterm::cursor;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::EnableMouseCapture;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use ratatui::widgets::Scrollbar;
use ratatui::widgets::ScrollbarOrientation;
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::BackendRef;
use crate::domain::models::Event;
use crate::domain::models::TextArea;
use crate::domain::services::events::EventsService;
use crate::domain::services::AppState;

async fn start_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app_state: &mut AppState,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let mut events = EventsService::new(rx);
    let mut textarea = TextArea::default();

    #[cfg(feature = "dev")]
    {
        textarea.insert_str("Give me three ideas for a rainy weekend, one paragraph each.");
    }

    loop {
        terminal.draw(|frame| {
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Min(1), Constraint::Max(4)])
                .split(frame.area());

            if usize::from(layout[0].width) != app_state.last_known_width
                || usize::from(layout[0].height) != app_state.last_known_height
            {
                app_state.set_rect(layout[0]);
            }

            app_state
                .bubble_list
                .render(frame, layout[0], app_state.scroll.position);
            frame.render_stateful_widget(
                Scrollbar::new(ScrollbarOrientation::VerticalRight),
                layout[0].inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut app_state.scroll.scrollbar_state,
            );

            if app_state.is_loading() {
                app_state.loading.render(frame, layout[1]);
            } else {
                frame.render_widget(&textarea, layout[1]);
            }
        })?;

        match events.next().await? {
            Event::BackendMessage(notice) => {
                app_state.add_notice(notice);
            }
            Event::BackendPromptResponse(res) => {
                app_state.handle_backend_response(res);
            }
            Event::KeyboardCharInput(input) => {
                if !app_state.is_loading() {
                    textarea.input(input);
                }
            }
            Event::KeyboardCTRLC() => {
                if !app_state.abort(&tx)? {
                    break;
                }
            }
            Event::KeyboardCTRLR() => {
                app_state.resubmit_last(&tx)?;
            }
            Event::KeyboardEnter() => {
                if app_state.is_loading() {
                    continue;
                }

                let input_str = textarea.lines().join("\n");
                let (should_break, should_continue) =
                    app_state.handle_slash_commands(&input_str, &tx)?;
                if should_break {
                    break;
                }
                if should_continue {
                    textarea = TextArea::default();
                    continue;
                }

                if app_state.submit_prompt(&input_str, &tx)? {
                    textarea = TextArea::default();
                }
            }
            Event::KeyboardPaste(text) => {
                if !app_state.is_loading() {
                    textarea.insert_str(text.replace('\r', "\n"));
                }
            }
            Event::UITick() => {
                app_state.loading.tick();
            }
            Event::UIResize() => {
                terminal.autoresize()?;
            }
            Event::UIScrollDown() => {
                app_state.scroll.down();
            }
            Event::UIScrollUp() => {
                app_state.scroll.up();
            }
            Event::UIScrollPageDown() => {
                app_state.scroll.down_page();
            }
            Event::UIScrollPageUp() => {
                app_state.scroll.up_page();
            }
        }
    }

    return Ok(());
}

pub fn destruct_terminal_for_panic() {
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    );
    let _ = crossterm::execute!(io::stdout(), cursor::Show);
}

pub async fn start(
    backend: BackendRef,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let mut app_state = AppState::new(&backend, &Config::get(ConfigKey::Model)).await?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    enable_raw_mode()?;
    crossterm::execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    start_loop(&mut terminal, &mut app_state, tx, rx).await?;

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    return Ok(());
}
