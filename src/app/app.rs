use std::io;
use std::time::Duration;

use crossterm::event;
use ratatui::DefaultTerminal;
use tracing::{error, info};

use fluxchunk::storage::save_bytes;

use crate::app::app_context::AppContext;
use crate::app::screen_action::{Screen, ScreenAction};

pub struct App<'a> {
    pub exit: bool,
    pub screens: Vec<Box<dyn Screen<'a> + 'a>>,
}

impl<'a> App<'a> {
    pub fn new(root: Box<dyn Screen<'a> + 'a>) -> Self {
        Self {
            exit: false,
            screens: vec![root],
        }
    }

    fn handle_action(&mut self, action: ScreenAction<'a>, ctx: &AppContext) {
        match action {
            ScreenAction::None => {}

            ScreenAction::Push(screen) => {
                self.screens.push(screen);
            }

            ScreenAction::Pop => {
                self.screens.pop();
                if self.screens.is_empty() {
                    self.exit = true;
                }
            }

            ScreenAction::Save(bytes) => {
                let message = match save_bytes(ctx.path, &bytes) {
                    Ok(()) => {
                        info!(path = %ctx.path.display(), bytes = bytes.len(), "saved");
                        format!("saved {} bytes", bytes.len())
                    }
                    Err(e) => {
                        error!(%e, path = %ctx.path.display(), "save failed");
                        format!("save failed: {e}")
                    }
                };

                if let Some(screen) = self.screens.last_mut() {
                    screen.notify(message);
                }
            }

            ScreenAction::Exit => {
                self.exit = true;
            }
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal, ctx: &AppContext) -> io::Result<()> {
        loop {
            // ───────────── UPDATE PHASE ─────────────
            let update_action = match self.screens.last_mut() {
                Some(screen) => screen.update(ctx),
                None => ScreenAction::None,
            };
            self.handle_action(update_action, ctx);

            // ───────────── DRAW PHASE ─────────────
            terminal.draw(|f| {
                if let Some(screen) = self.screens.last() {
                    screen.draw(f, ctx);
                }
            })?;

            // ───────────── INPUT PHASE ─────────────
            if event::poll(Duration::from_millis(50))? {
                let ev = event::read()?;

                let input_action = match self.screens.last_mut() {
                    Some(screen) => screen.handle_event(ev, ctx),
                    None => ScreenAction::None,
                };
                self.handle_action(input_action, ctx);
            }

            if self.exit {
                break;
            }
        }

        Ok(())
    }
}
