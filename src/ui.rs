use crate::app::{AppState, Screen};
use crate::kanban_board::KanbanBoard;
use crate::settings::Theme;
use crate::store::Source;
use crate::task::{NewTask, Priority, Task, TaskStatus};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;

/// Rows per card: two lines of text plus the gap row above it.
const CARD_STRIDE: u16 = 3;
const CARD_HEIGHT: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardArea {
    pub task_id: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnArea {
    pub status: TaskStatus,
    pub area: Rect,
    pub inner: Rect,
    /// Number of tasks in the column, including any that did not fit.
    pub len: usize,
    pub cards: Vec<CardArea>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Card {
        status: TaskStatus,
        index: usize,
        task_id: String,
        rect: Rect,
    },
    Column {
        status: TaskStatus,
        len: usize,
    },
}

/// Where every column and card was drawn, for mapping pointer cells back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardLayout {
    pub columns: Vec<ColumnArea>,
    pub status_line: Rect,
}

impl BoardLayout {
    pub fn compute(area: Rect, board: &KanbanBoard) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![
                Constraint::Percentage(33),
                Constraint::Percentage(33),
                Constraint::Percentage(34),
            ])
            .split(rows[0]);

        let columns = board
            .columns()
            .into_iter()
            .zip(chunks.iter())
            .map(|(column, &chunk)| {
                let inner = Block::default().borders(Borders::ALL).inner(chunk);
                let cards = column
                    .tasks
                    .iter()
                    .enumerate()
                    .map_while(|(i, task)| {
                        let y = inner.y + 1 + (i as u16).checked_mul(CARD_STRIDE)?;
                        (y + CARD_HEIGHT <= inner.bottom()).then(|| CardArea {
                            task_id: task.id.clone(),
                            rect: Rect::new(inner.x, y, inner.width, CARD_HEIGHT),
                        })
                    })
                    .collect();
                ColumnArea {
                    status: column.status,
                    area: chunk,
                    inner,
                    len: column.len(),
                    cards,
                }
            })
            .collect();

        Self {
            columns,
            status_line: rows[1],
        }
    }

    /// Maps a pointer cell to the card or column body under it.
    pub fn hit(&self, x: u16, y: u16) -> Option<Hit> {
        let column = self.columns.iter().find(|c| contains(c.area, x, y))?;
        let card = column
            .cards
            .iter()
            .enumerate()
            .find(|(_, card)| contains(card.rect, x, y));
        Some(match card {
            Some((index, card)) => Hit::Card {
                status: column.status,
                index,
                task_id: card.task_id.clone(),
                rect: card.rect,
            },
            None => Hit::Column {
                status: column.status,
                len: column.len,
            },
        })
    }

    /// Row where the drop placeholder goes for an insertion index.
    pub fn placeholder_row(&self, status: TaskStatus, insert_index: usize) -> Option<Rect> {
        let column = self.columns.iter().find(|c| c.status == status)?;
        let offset = u16::try_from(insert_index).ok()?.checked_mul(CARD_STRIDE)?;
        let y = column.inner.y.checked_add(offset)?;
        (y < column.inner.bottom()).then(|| Rect::new(column.inner.x, y, column.inner.width, 1))
    }
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom()
}

fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Dark => Color::LightCyan,
        Theme::Light | Theme::Auto => Color::Cyan,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn card_lines(task: &Task) -> Vec<Line<'_>> {
    let mut meta = vec![Span::styled(
        format!("{} ", task.priority),
        Style::default().fg(priority_color(task.priority)),
    )];
    if let Some(assignee) = &task.assignee {
        meta.push(Span::raw(format!("@{} ", assignee.display_name())));
    }
    if let Some(due) = task.due_date {
        meta.push(Span::raw(format!("(Due: {due})")));
    }
    vec![
        Line::from(vec![
            Span::raw(format!("[{}] ", task.id)),
            Span::styled(task.title.as_str(), Style::default().fg(Color::White)),
        ]),
        Line::from(meta),
    ]
}

pub fn draw(f: &mut Frame, app: &AppState) -> BoardLayout {
    let layout = BoardLayout::compute(f.area(), &app.board);
    if app.screen == Screen::Login {
        draw_login(f, app);
        return layout;
    }

    let accent = accent(app.preferences.theme());
    let dragged = app.board.drag.task_id();
    for (i, column) in layout.columns.iter().enumerate() {
        let selected_column = app.board.selected_status == i;
        let block = Block::default()
            .title(format!("{} ({})", column.status.title(), column.len))
            .borders(Borders::ALL)
            .border_style(if selected_column {
                Style::default().fg(accent)
            } else {
                Style::default()
            });
        f.render_widget(block, column.area);

        for (index, card) in column.cards.iter().enumerate() {
            let Some(task) = app.board.find(&card.task_id) else {
                continue;
            };
            let mut style = Style::default();
            if selected_column && app.board.selected_task == index {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            if dragged == Some(task.id.as_str()) {
                style = style.add_modifier(Modifier::DIM);
            }
            f.render_widget(Paragraph::new(card_lines(task)).style(style), card.rect);
        }
    }

    if let Some(row) = app
        .board
        .drag
        .target()
        .and_then(|(status, index)| layout.placeholder_row(status, index))
    {
        let marker = "┈".repeat(usize::from(row.width));
        f.render_widget(Paragraph::new(marker).style(Style::default().fg(accent)), row);
    }

    f.render_widget(Paragraph::new(status_line(app)), layout.status_line);
    layout
}

fn status_line(app: &AppState) -> Line<'static> {
    let source = match app.board.source() {
        Source::Remote if app.config.remote_enabled => Span::styled("remote", Style::default().fg(Color::Green)),
        Source::Remote => Span::styled("local", Style::default().fg(Color::Blue)),
        Source::Fallback => Span::styled("fallback data", Style::default().fg(Color::Yellow)),
    };
    let mut spans = vec![
        Span::raw(" "),
        source,
        Span::raw(format!(" | {} tasks | q quit a add d delete r refresh ", app.board.tasks.len())),
    ];
    if let Some(err) = &app.last_error {
        spans.push(Span::styled(format!("| {err}"), Style::default().fg(Color::Red)));
    } else if let Some(notice) = &app.notice {
        spans.push(Span::raw(format!("| {notice}")));
    }
    Line::from(spans)
}

fn draw_login(f: &mut Frame, app: &AppState) {
    let mut lines = vec![
        Line::from("Not logged in."),
        Line::from("Press l and paste the redirect url from the browser login,"),
        Line::from("or run `taskdeck login <redirect-url>`. q quits."),
    ];
    if let Some(err) = &app.last_error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    let block = Block::default().title("Login").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), f.area());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Flow {
    if key.kind == KeyEventKind::Release {
        return Flow::Continue;
    }
    if app.screen == Screen::Login {
        match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Char('l') => {
                if let Some(redirect) = prompt("Paste the login redirect url") {
                    match app.complete_login(&redirect) {
                        Ok(_) => {
                            let _ = app.refresh();
                        }
                        Err(err) => app.last_error = Some(err.to_string()),
                    }
                }
            }
            _ => {}
        }
        return Flow::Continue;
    }

    // Errors are already on the status line; the loop keeps going.
    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char('a') => {
            if let Some(title) = prompt("Enter task title").filter(|t| !t.is_empty()) {
                let mut task = NewTask::titled(title);
                task.status = Some(app.board.selected_column());
                if let Some(due) = prompt("Enter due date (YYYY-MM-DD, empty for none)") {
                    task.due_date = crate::task::parse_due_date(&due);
                }
                let _ = app.add_task(task);
            }
        }
        KeyCode::Char('d') => {
            let _ = app.delete_selected();
        }
        KeyCode::Char('r') => {
            let _ = app.refresh();
        }
        KeyCode::Esc => app.board.drag.cancel(),
        KeyCode::Left => app.board.select_left(),
        KeyCode::Right => app.board.select_right(),
        KeyCode::Up => app.board.select_up(),
        KeyCode::Down => app.board.select_down(),
        KeyCode::Enter => {
            let _ = app.move_selected(1);
        }
        KeyCode::Backspace => {
            let _ = app.move_selected(-1);
        }
        _ => {}
    }
    Flow::Continue
}

pub fn handle_mouse(app: &mut AppState, layout: &BoardLayout, mouse: MouseEvent) {
    if app.screen != Screen::Board {
        return;
    }
    let hit = layout.hit(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(Hit::Card { task_id, .. }) = hit {
                if let Some(origin) = app.board.slot_of(&task_id) {
                    app.board.selected_status = origin.status.index();
                    app.board.selected_task = origin.index;
                    app.board.drag.start(task_id, origin);
                }
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => match hit {
            Some(Hit::Card {
                status,
                index,
                task_id,
                rect,
            }) => app.board.drag.over_task(status, index, &task_id, rect, mouse.row),
            Some(Hit::Column { status, len }) => app.board.drag.over_column(status, len),
            None => app.board.drag.leave(),
        },
        MouseEventKind::Up(MouseButton::Left) => {
            if hit.is_none() {
                app.board.drag.leave();
            }
            if let Some(outcome) = app.board.drag.release() {
                let _ = app.drop_task(&outcome);
            }
        }
        _ => {}
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut AppState) -> io::Result<()> {
    loop {
        let mut layout = BoardLayout::default();
        terminal.draw(|f| layout = draw(f, app))?;

        match event::read()? {
            Event::Key(key) => {
                if handle_key(app, key) == Flow::Quit {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => handle_mouse(app, &layout, mouse),
            _ => {}
        }
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input);
    enable_raw_mode().ok();
    read.ok().map(|_| input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::task::fallback_tasks;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;
    use tempfile::tempdir;

    fn offline_app(dir: &std::path::Path) -> AppState {
        let config = Config {
            data_dir: dir.to_path_buf(),
            remote_enabled: false,
            ..Config::default()
        };
        let mut app = AppState::open(config).unwrap();
        app.refresh().unwrap();
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn board() -> KanbanBoard {
        let mut board = KanbanBoard::new();
        board.tasks = fallback_tasks();
        board
    }

    #[test]
    fn cards_are_stacked_inside_their_column() {
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &board());
        assert_eq!(layout.columns.len(), 3);
        let todo = &layout.columns[0];
        assert_eq!(todo.len, 2);
        assert_eq!(todo.cards[0].rect, Rect::new(1, 2, todo.inner.width, 2));
        assert_eq!(todo.cards[1].rect.y, 5);
        assert_eq!(layout.status_line.y, 19);
    }

    #[test]
    fn hit_maps_cells_to_cards_and_column_bodies() {
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &board());
        match layout.hit(3, 5) {
            Some(Hit::Card { status, index, task_id, .. }) => {
                assert_eq!(status, TaskStatus::Todo);
                assert_eq!(index, 1);
                assert_eq!(task_id, "task-2");
            }
            other => panic!("expected a card, got {other:?}"),
        }
        // The gap row between two cards belongs to the column body.
        assert_eq!(
            layout.hit(3, 4),
            Some(Hit::Column {
                status: TaskStatus::Todo,
                len: 2
            })
        );
        let done_x = layout.columns[2].area.x + 2;
        assert!(matches!(
            layout.hit(done_x, 15),
            Some(Hit::Column {
                status: TaskStatus::Done,
                len: 1
            })
        ));
        assert_eq!(layout.hit(3, 19), None);
    }

    #[test]
    fn cards_that_do_not_fit_are_not_laid_out() {
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 7), &board());
        let todo = &layout.columns[0];
        assert_eq!(todo.len, 2);
        assert_eq!(todo.cards.len(), 1);
    }

    #[test]
    fn renders_columns_cards_and_placeholder() {
        let dir = tempdir().unwrap();
        let mut app = offline_app(dir.path());

        let mut terminal = Terminal::new(TestBackend::new(90, 20)).unwrap();
        let mut layout = BoardLayout::default();
        terminal.draw(|f| layout = draw(f, &app)).unwrap();

        // Drag the first card towards the bottom of the done column.
        let origin = app.board.slot_of("task-1").unwrap();
        app.board.drag.start("task-1", origin);
        app.board.drag.over_column(TaskStatus::Done, 1);
        terminal.draw(|f| layout = draw(f, &app)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let row = |y: u16| -> String {
            (0..buffer.area.width)
                .map(|x| buffer[(x, y)].symbol().to_string())
                .collect()
        };
        assert!(row(0).contains("To do (2)"));
        assert!(row(0).contains("Done (1)"));
        assert!(row(2).contains("[task-1]"));
        let placeholder = layout.placeholder_row(TaskStatus::Done, 1).unwrap();
        assert!(row(placeholder.y).contains('┈'));
        assert!(row(19).contains("local"));
    }

    #[test]
    fn mouse_drag_moves_a_card_between_columns() {
        let dir = tempdir().unwrap();
        let mut app = offline_app(dir.path());
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &app.board);
        let done_x = layout.columns[2].area.x + 2;

        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Down(MouseButton::Left), 3, 2));
        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Drag(MouseButton::Left), done_x, 15));
        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Up(MouseButton::Left), done_x, 15));

        assert!(app.board.drag.is_idle());
        assert_eq!(app.board.find("task-1").unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn releasing_outside_the_columns_drops_nothing() {
        let dir = tempdir().unwrap();
        let mut app = offline_app(dir.path());
        let layout = BoardLayout::compute(Rect::new(0, 0, 90, 20), &app.board);
        let done_x = layout.columns[2].area.x + 2;

        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Down(MouseButton::Left), 3, 2));
        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Drag(MouseButton::Left), done_x, 15));
        // Onto the status line, then let go there.
        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Drag(MouseButton::Left), 3, 19));
        assert_eq!(app.board.drag.target(), None);
        handle_mouse(&mut app, &layout, mouse(MouseEventKind::Up(MouseButton::Left), 3, 19));

        assert!(app.board.drag.is_idle());
        assert_eq!(app.board.find("task-1").unwrap().status, TaskStatus::Todo);
    }
}
