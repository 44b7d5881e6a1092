use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use fluxchunk::browser::{Browser, BrowserAction, BrowserEvent, Mode};

use crate::app::app_context::AppContext;
use crate::app::screen_action::{Screen, ScreenAction};
use crate::app::screens::help_screen::HelpScreen;

const PREVIEW_BYTES: usize = 32;

pub struct TreeScreen<'a> {
    browser: Browser<'a>,
}

impl<'a> TreeScreen<'a> {
    pub fn new(browser: Browser<'a>) -> Self {
        Self { browser }
    }

    fn event_for(&self, code: KeyCode) -> Option<BrowserEvent> {
        let picking = matches!(self.browser.mode(), Mode::PickType { .. });

        let event = match code {
            KeyCode::Esc if picking => BrowserEvent::Cancel,
            KeyCode::Char(c) if picking => BrowserEvent::PickType(c),
            _ if picking => return None,

            KeyCode::Up | KeyCode::Char('k') => BrowserEvent::Up,
            KeyCode::Down | KeyCode::Char('j') => BrowserEvent::Down,
            KeyCode::Left | KeyCode::Char('h') => BrowserEvent::Left,
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => BrowserEvent::Right,
            KeyCode::Char('i') => BrowserEvent::Insert,
            KeyCode::Char('a') => BrowserEvent::Append,
            KeyCode::Char('o') => BrowserEvent::InsertInto,
            KeyCode::Char('w') => BrowserEvent::Save,
            KeyCode::Char('q') => BrowserEvent::Quit,
            _ => return None,
        };
        Some(event)
    }

    // ───────────────────────────────── Header ─────────────────────────────────

    fn render_header(&self, f: &mut Frame, area: Rect, ctx: &AppContext) {
        let tree = self.browser.tree();
        let mode = if ctx.realised { "REALISED" } else { "OWNED" };

        let line = Line::from(vec![
            Span::styled(format!("File: {}  ", ctx.path.display()), Style::default().fg(Color::Green)),
            Span::raw("| "),
            Span::raw(format!("Size: {}  ", tree.computed_size())),
            Span::raw("| "),
            Span::raw(format!("Items: {}  ", tree.root().nr_children())),
            Span::raw("| "),
            Span::styled(format!("MODE: {mode}"), Style::default().fg(Color::Yellow)),
        ]);

        f.render_widget(
            Paragraph::new(line).block(Block::default().title(" FluxChunk ").borders(Borders::ALL)),
            area,
        );
    }

    // ───────────────────────────────── Tree ─────────────────────────────────

    fn render_tree(&self, f: &mut Frame, area: Rect) {
        let rows = self.browser.rows();
        let selected = rows.iter().position(|row| row.focused);

        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| ListItem::new(format!("{}{}", "  ".repeat(row.depth), row.label)))
            .collect();

        let list = List::new(items)
            .block(Block::default().title(" Chunks ").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        state.select(selected);
        f.render_stateful_widget(list, area, &mut state);
    }

    // ───────────────────────────────── Details ─────────────────────────────────

    fn render_details(&self, f: &mut Frame, area: Rect) {
        let Some(node) = self.browser.focused() else {
            f.render_widget(
                Paragraph::new("Nothing selected").block(Block::default().title(" Chunk ").borders(Borders::ALL)),
                area,
            );
            return;
        };

        let source = node
            .source_offset()
            .map_or_else(|| "inserted".to_string(), |offset| offset.to_string());
        let offset = self
            .browser
            .cursor_offset()
            .map_or_else(|e| e.to_string(), |offset| offset.to_string());

        let mut lines = vec![
            Line::from(format!("Path:        {:?}", self.browser.cursor())),
            Line::from(format!("Type:        {}", node.chunk_type())),
            Line::from(format!("Items:       {}", node.nr_children())),
            Line::from(format!("Data length: {}", node.data_length())),
            Line::from(format!("Source:      {source}")),
            Line::from(format!("Offset:      {offset}")),
            Line::from(format!("Realised:    {}", node.is_realised())),
        ];

        if let Some(data) = node.data() {
            let preview: Vec<String> = data.iter().take(PREVIEW_BYTES).map(|b| format!("{b:02x}")).collect();
            let more = if data.len() > PREVIEW_BYTES { " .." } else { "" };
            lines.push(Line::from(""));
            lines.push(Line::from(format!("{}{more}", preview.join(" "))));
        }

        f.render_widget(
            Paragraph::new(lines).block(Block::default().title(" Chunk ").borders(Borders::ALL)),
            area,
        );
    }

    // ───────────────────────────────── Footer ─────────────────────────────────

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let keys = match self.browser.mode() {
            Mode::PickType { .. } => "[1-8 f d s r [] Type  [Esc] Leave untyped",
            Mode::Navigate => "[↑↓←→] Navigate  [i/a/o] Insert  [w] Save  [?] Help  [q] Quit",
        };

        let mut spans = vec![Span::raw(keys)];
        if let Some(status) = self.browser.status() {
            spans.push(Span::raw("  | "));
            spans.push(Span::styled(status.to_string(), Style::default().fg(Color::Cyan)));
        }

        f.render_widget(
            Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL)),
            area,
        );
    }
}

impl<'a> Screen<'a> for TreeScreen<'a> {
    fn handle_event(&mut self, event: Event, _ctx: &AppContext) -> ScreenAction<'a> {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return ScreenAction::None;
        };

        if code == KeyCode::Char('?') && *self.browser.mode() == Mode::Navigate {
            return ScreenAction::Push(Box::new(HelpScreen::new()));
        }

        let Some(event) = self.event_for(code) else {
            return ScreenAction::None;
        };

        match self.browser.handle_event(event) {
            BrowserAction::None => ScreenAction::None,
            BrowserAction::Save(bytes) => ScreenAction::Save(bytes),
            BrowserAction::Exit => ScreenAction::Exit,
        }
    }

    fn notify(&mut self, message: String) {
        self.browser.set_status(message);
    }

    fn draw(&self, f: &mut Frame, ctx: &AppContext) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Min(1),    // body
                Constraint::Length(3), // footer
            ])
            .split(f.area());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(55), // tree
                Constraint::Min(1),         // details
            ])
            .split(layout[1]);

        self.render_header(f, layout[0], ctx);
        self.render_tree(f, body[0]);
        self.render_details(f, body[1]);
        self.render_footer(f, layout[2]);
    }
}
