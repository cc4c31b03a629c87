use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Mode, NoticeLevel};
use crate::input::TextInput;
use crate::kanban_board::EditorField;
use crate::store::TaskStore;
use crate::task::Status;

const INPUT_HEIGHT: u16 = 3;

/// Screen regions, kept after each draw for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardLayout {
    /// Whole column, todo's input box included.
    pub columns: [Rect; 3],
    /// Card list inside each column.
    pub lists: [Rect; 3],
    pub input: Rect,
    pub status_line: Rect,
    /// Edit modal, when open.
    pub modal: Rect,
}

pub fn board_layout(area: Rect) -> BoardLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Min(INPUT_HEIGHT + 2), Constraint::Length(1)])
        .split(area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(rows[0]);

    let todo = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Min(2), Constraint::Length(INPUT_HEIGHT)])
        .split(chunks[0]);

    BoardLayout {
        columns: [chunks[0], chunks[1], chunks[2]],
        lists: [todo[0], chunks[1], chunks[2]],
        input: todo[1],
        status_line: rows[1],
        modal: centered_rect(60, 50, area),
    }
}

impl BoardLayout {
    /// Column under a screen cell, if any.
    pub fn column_at(&self, x: u16, y: u16) -> Option<Status> {
        let pos = Position::new(x, y);
        self.columns
            .iter()
            .position(|rect| rect.contains(pos))
            .and_then(Status::from_index)
    }

    /// Card row under a screen cell: column and index within the column.
    pub fn card_at(&self, x: u16, y: u16, offsets: [usize; 3]) -> Option<(Status, usize)> {
        let pos = Position::new(x, y);
        let col = self.lists.iter().position(|rect| rect.contains(pos))?;
        let list = self.lists[col];
        let top = list.y + 1;
        let bottom = (list.y + list.height).saturating_sub(1);
        if y < top || y >= bottom || x == list.x || x + 1 >= list.x + list.width {
            return None;
        }
        let status = Status::from_index(col)?;
        Some((status, (y - top) as usize + offsets[col]))
    }

    pub fn in_input(&self, x: u16, y: u16) -> bool {
        self.input.contains(Position::new(x, y))
    }

    pub fn in_modal(&self, x: u16, y: u16) -> bool {
        self.modal.contains(Position::new(x, y))
    }
}

pub fn render<S: TaskStore>(f: &mut Frame, app: &mut App<S>) {
    let layout = board_layout(f.area());
    app.layout = layout;

    for status in Status::ALL {
        render_column(f, app, status, layout.lists[status.index()]);
    }
    render_input(f, app, layout.input);
    render_status_line(f, app, layout.status_line);

    if app.mode == Mode::Edit {
        render_editor(f, app, layout.modal);
    }
}

fn render_column<S: TaskStore>(f: &mut Frame, app: &mut App<S>, status: Status, area: Rect) {
    let i = status.index();
    let selected_column = app.board.selected_status == i;
    let dragged = app.drag.as_ref().map(|d| d.task_id.as_str());
    let hovered = app.drag.as_ref().is_some_and(|d| d.hover == Some(status));

    let tasks = app.board.get_tasks_by_status(status);
    let count = tasks.len();
    let items: Vec<ListItem> = tasks
        .iter()
        .map(|t| {
            let title_style = if dragged == Some(t.id.as_str()) {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            } else {
                Style::default().fg(Color::White)
            };
            let mut spans = vec![
                Span::styled(t.task.clone(), title_style),
                Span::styled(
                    format!(" - {}", t.created_local()),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if t.explanation.as_deref().is_some_and(|e| !e.is_empty()) {
                spans.push(Span::styled(" ✎", Style::default().fg(Color::Blue)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let border_style = if hovered {
        Style::default().fg(Color::Yellow)
    } else if selected_column {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let title = if hovered {
        format!(" {} ({}) <- drop ", status.title(), count)
    } else {
        format!(" {} ({}) ", status.title(), count)
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED),
        );

    let state = &mut app.list_states[i];
    if selected_column && count > 0 && app.mode != Mode::Insert {
        state.select(Some(app.board.selected_task.min(count - 1)));
    } else {
        state.select(None);
    }
    f.render_stateful_widget(list, area, state);
}

fn render_input<S: TaskStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let active = app.mode == Mode::Insert;
    let input = &app.board.new_task;
    let text = if input.value().is_empty() && !active {
        Line::from(Span::styled(
            "Add a new task",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(input.value().to_string())
    };

    let block = Block::default()
        .title(" New task ")
        .borders(Borders::ALL)
        .border_style(if active {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        });
    f.render_widget(Paragraph::new(text).block(block), area);

    if active {
        set_cursor(f, input, area);
    }
}

fn render_status_line<S: TaskStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(" {} ", app.mode.display_name()),
        Style::default()
            .fg(Color::Black)
            .bg(app.mode.color())
            .add_modifier(Modifier::BOLD),
    )];

    match &app.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            spans.push(Span::styled(
                format!(" {}", notice.message),
                Style::default().fg(color),
            ));
        }
        None => spans.push(Span::styled(
            format!(" {}", app.mode.hints()),
            Style::default().fg(Color::DarkGray),
        )),
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_editor<S: TaskStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let Some(editor) = app.board.editor() else {
        return;
    };

    f.render_widget(Clear, area);
    let outer = Block::default()
        .title(" Edit task ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let field_block = |title: &'static str, focused: bool| {
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if focused {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            })
    };

    let title_focused = editor.focus == EditorField::Title;
    f.render_widget(
        Paragraph::new(editor.title.value().to_string())
            .block(field_block(" Title ", title_focused)),
        parts[0],
    );
    f.render_widget(
        Paragraph::new(editor.explanation.value().to_string())
            .wrap(Wrap { trim: false })
            .block(field_block(" Explanation ", !title_focused)),
        parts[1],
    );
    f.render_widget(
        Paragraph::new(Span::styled(
            "Tab switch field | Ctrl+S save | Esc close",
            Style::default().fg(Color::DarkGray),
        )),
        parts[2],
    );

    if title_focused {
        set_cursor(f, &editor.title, parts[0]);
    } else {
        set_cursor(f, &editor.explanation, parts[1]);
    }
}

/// Put the terminal cursor at the input's cursor, inside a bordered box.
fn set_cursor(f: &mut Frame, input: &TextInput, area: Rect) {
    let (row, col) = input.cursor_position();
    let max_x = (area.x + area.width).saturating_sub(2);
    let max_y = (area.y + area.height).saturating_sub(2);
    let x = (area.x + 1).saturating_add(col as u16).min(max_x);
    let y = (area.y + 1).saturating_add(row as u16).min(max_y);
    f.set_cursor_position(Position::new(x, y));
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
