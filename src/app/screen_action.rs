use ratatui::Frame;

use crate::app::app_context::AppContext;

pub enum ScreenAction<'a> {
    None,
    Push(Box<dyn Screen<'a> + 'a>),
    Pop,
    /// Write these bytes to the open file.
    Save(Vec<u8>),
    Exit,
}

pub trait Screen<'a> {
    fn handle_event(&mut self, event: crossterm::event::Event, ctx: &AppContext) -> ScreenAction<'a>;

    fn update(&mut self, _ctx: &AppContext) -> ScreenAction<'a> {
        ScreenAction::None
    }

    /// Outcome of an action the app carried out for this screen.
    fn notify(&mut self, _message: String) {}

    fn draw(&self, f: &mut Frame, ctx: &AppContext);
}
