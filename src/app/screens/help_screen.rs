use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Frame;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use fluxchunk::browser::type_for_key;

use crate::app::app_context::AppContext;
use crate::app::screen_action::{Screen, ScreenAction};

const TYPE_KEYS: &str = "12345678fdsr[";

const BINDINGS: [(&str, &str); 9] = [
    ("↑ ↓ / k j", "previous / next sibling"),
    ("← / h", "parent set"),
    ("→ / l / Enter", "enter set"),
    ("i", "insert before the cursor"),
    ("a", "append after the last sibling"),
    ("o", "insert as first child of the set"),
    ("w", "save"),
    ("?", "this help"),
    ("q", "quit"),
];

#[derive(Debug, Default)]
pub struct HelpScreen;

impl HelpScreen {
    pub fn new() -> Self {
        Self
    }
}

impl<'a> Screen<'a> for HelpScreen {
    fn handle_event(&mut self, event: Event, _ctx: &AppContext) -> ScreenAction<'a> {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?'),
                kind: KeyEventKind::Press,
                ..
            }) => ScreenAction::Pop,

            _ => ScreenAction::None,
        }
    }

    fn draw(&self, f: &mut Frame, _ctx: &AppContext) {
        let mut lines: Vec<Line> = BINDINGS
            .iter()
            .map(|(keys, action)| Line::from(format!("{keys:<16}{action}")))
            .collect();

        lines.push(Line::from(""));
        lines.push(Line::from("Type keys after an insert:"));
        for key in TYPE_KEYS.chars() {
            if let Some(chunk_type) = type_for_key(key) {
                lines.push(Line::from(format!("  {key}  {chunk_type}")));
            }
        }

        f.render_widget(
            Paragraph::new(lines).block(Block::default().title(" Keys ").borders(Borders::ALL)),
            f.area(),
        );
    }
}
