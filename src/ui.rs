use anyhow::Result;
use card_forge::{
    classify, favorites, generate_records, history_stats, sort_entries, AppConfig, CardRecord,
    GenerateRequest, HistoryEntry, HistorySort, HistoryStats, HistoryStore,
};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

/// Cards shown in the regeneration preview
const PREVIEW_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    History,
    Favorites,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::History => Page::Favorites,
            Page::Favorites => Page::History,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::History => "History",
            Page::Favorites => "Favorites",
        }
    }
}

pub struct App {
    conn: Connection,
    config: AppConfig,
    pub entries: Vec<HistoryEntry>,
    pub visible: Vec<HistoryEntry>,
    pub state: TableState,
    pub current_page: Page,
    pub sort: HistorySort,
    pub show_detail: bool,
    pub preview: Vec<CardRecord>,
    pub message: Option<String>,
}

impl App {
    pub fn new(conn: Connection, config: AppConfig) -> Result<Self> {
        let mut app = Self {
            conn,
            config,
            entries: Vec::new(),
            visible: Vec::new(),
            state: TableState::default(),
            current_page: Page::History,
            sort: HistorySort::default(),
            show_detail: false,
            preview: Vec::new(),
            message: None,
        };
        app.reload()?;
        Ok(app)
    }

    /// Re-read the store and rebuild the visible list
    pub fn reload(&mut self) -> Result<()> {
        self.entries = self.conn.list(&self.config.user, self.config.history_limit)?;
        self.refresh_view();
        Ok(())
    }

    fn refresh_view(&mut self) {
        let selected_id = self.selected_entry().map(|e| e.id.clone());

        self.visible = match self.current_page {
            Page::History => self.entries.clone(),
            Page::Favorites => favorites(&self.entries),
        };
        sort_entries(&mut self.visible, self.sort);

        let index = selected_id
            .and_then(|id| self.visible.iter().position(|e| e.id == id))
            .or(if self.visible.is_empty() { None } else { Some(0) });
        self.state.select(index);
    }

    pub fn selected_entry(&self) -> Option<&HistoryEntry> {
        self.state.selected().and_then(|i| self.visible.get(i))
    }

    pub fn stats(&self) -> HistoryStats {
        history_stats(&self.entries)
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.refresh_view();
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.refresh_view();
    }

    pub fn toggle_favorite(&mut self) -> Result<()> {
        let Some(id) = self.selected_entry().map(|e| e.id.clone()) else {
            return Ok(());
        };
        self.message = match self.conn.toggle_favorite(&self.config.user, &id)? {
            Some(true) => Some("★ Marked as favourite".to_string()),
            Some(false) => Some("☆ Removed from favourites".to_string()),
            None => Some("Entry no longer exists".to_string()),
        };
        self.reload()
    }

    pub fn delete_selected(&mut self) -> Result<()> {
        let Some(id) = self.selected_entry().map(|e| e.id.clone()) else {
            return Ok(());
        };
        if self.conn.delete(&self.config.user, &id)? {
            self.message = Some("✓ Entry deleted".to_string());
        }
        self.show_detail = false;
        self.reload()
    }

    pub fn clear_history(&mut self) -> Result<()> {
        let removed = self.conn.clear(&self.config.user)?;
        self.message = Some(format!("✓ Cleared {} entries", removed));
        self.show_detail = false;
        self.reload()
    }

    /// Replay the selected request into the preview panel
    pub fn toggle_detail(&mut self) {
        if self.show_detail {
            self.show_detail = false;
            return;
        }
        let Some(entry) = self.selected_entry() else {
            return;
        };

        let request = request_from_entry(entry);
        let today = Local::now().date_naive();
        match generate_records(&request, &mut rand::thread_rng(), today) {
            Ok(records) => {
                self.preview = records;
                self.show_detail = true;
            }
            Err(e) => self.message = Some(format!("✗ {}", e)),
        }
    }

    pub fn next(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
        self.show_detail = false;
    }

    pub fn previous(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
        self.show_detail = false;
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn request_from_entry(entry: &HistoryEntry) -> GenerateRequest {
    GenerateRequest {
        bin: entry.bin.clone(),
        month: non_empty(&entry.month),
        year: non_empty(&entry.year),
        security_code: non_empty(&entry.security_code),
        quantity: (entry.quantity.max(1) as usize).min(PREVIEW_LIMIT),
        target_length: usize::try_from(entry.target_length).unwrap_or(0),
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => app.next_page(),
                KeyCode::Char('s') => app.cycle_sort(),
                KeyCode::Char('f') => app.toggle_favorite()?,
                KeyCode::Char('d') => app.delete_selected()?,
                KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.clear_history()?
                }
                KeyCode::Char('r') => app.reload()?,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_preview(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let mut spans = vec![];
    for (i, page) in [Page::History, Page::Favorites].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Sessions: {}", stats.total_sessions),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Cards: {}", stats.total_generated),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Sort: {}", app.sort.as_str()),
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["", "BIN", "Brand", "Expiry", "Code", "Qty", "Created"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.visible.iter().map(|entry| {
        let expiry = match (entry.month.is_empty(), entry.year.is_empty()) {
            (true, true) => "random".to_string(),
            _ => format!("{}/{}", entry.month, entry.year),
        };
        let code = if entry.security_code.is_empty() {
            "random".to_string()
        } else {
            entry.security_code.clone()
        };

        let cells = vec![
            Cell::from(if entry.is_favorite { "★" } else { " " })
                .style(Style::default().fg(Color::Yellow)),
            Cell::from(entry.bin.clone()),
            Cell::from(classify(&entry.bin).as_str()),
            Cell::from(expiry),
            Cell::from(code),
            Cell::from(entry.quantity.to_string()).style(Style::default().fg(Color::Green)),
            Cell::from(
                entry
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(18),
            Constraint::Length(18),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Length(17),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", app.current_page.title())),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_preview(f: &mut Frame, area: Rect, app: &App) {
    let mut content = vec![Line::from("")];
    for record in &app.preview {
        content.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(record.number.clone(), Style::default().fg(Color::Green)),
            Span::styled(
                format!("|{}|{}|{}", record.month, record.year, record.security_code),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }
    content.push(Line::from(""));
    content.push(Line::from(vec![Span::styled(
        "  Press Enter to close",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )]));

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Regenerated "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.visible.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = &app.message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
    }

    for (key, label) in [
        ("Enter", " Regenerate"),
        ("Tab", " Page"),
        ("s", " Sort"),
        ("f", " Fav"),
        ("d", " Delete"),
        ("^X", " Clear"),
    ] {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(label));
    }
    spans.push(Span::raw(" | "));
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_forge::{setup_database, NewHistoryEntry};

    fn app_with_entries() -> App {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let config = AppConfig::default();
        for (bin, quantity) in [("456331", 10), ("515462", 30), ("601100", 5)] {
            conn.create(
                &config.user,
                &NewHistoryEntry {
                    bin: bin.to_string(),
                    quantity,
                    ..Default::default()
                },
            )
            .unwrap();
        }
        App::new(conn, config).unwrap()
    }

    #[test]
    fn test_app_loads_and_navigates() {
        let mut app = app_with_entries();
        assert_eq!(app.visible.len(), 3);
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_favorites_page() {
        let mut app = app_with_entries();
        app.toggle_favorite().unwrap();
        app.next_page();
        assert_eq!(app.current_page, Page::Favorites);
        assert_eq!(app.visible.len(), 1);
    }

    #[test]
    fn test_sort_and_delete() {
        let mut app = app_with_entries();
        app.sort = HistorySort::DateDesc.next().next().next().next();
        app.refresh_view();
        assert_eq!(app.sort, HistorySort::QuantityDesc);
        app.state.select(Some(0));
        assert_eq!(app.selected_entry().unwrap().bin, "515462");

        app.delete_selected().unwrap();
        assert_eq!(app.visible.len(), 2);
        app.clear_history().unwrap();
        assert!(app.visible.is_empty());
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_preview_uses_saved_length() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let mut config = AppConfig::default();
        conn.create(
            &config.user,
            &NewHistoryEntry {
                bin: "456331".to_string(),
                quantity: 3,
                target_length: 19,
                ..Default::default()
            },
        )
        .unwrap();

        config.target_length = 13;
        let mut app = App::new(conn, config).unwrap();
        app.toggle_detail();
        assert!(app.show_detail);
        assert_eq!(app.preview.len(), 3);
        assert!(app.preview.iter().all(|r| r.number.len() == 19));
    }

    #[test]
    fn test_regeneration_preview() {
        let mut app = app_with_entries();
        app.toggle_detail();
        assert!(app.show_detail);
        assert!(!app.preview.is_empty());
        assert!(app.preview.len() <= PREVIEW_LIMIT);
        assert!(app.preview.iter().all(|r| card_forge::is_valid(&r.number)));
    }
}
