//! Interactive TUI for watching a live run.
//!
//! Renders stage cards with status and phase progress, the run-level
//! bookend banners, and the stream connection state with a manual
//! retry key once the reconnect budget is exhausted. Expanded-stage
//! state and the view mode are session-scoped UI state held here and
//! passed into the pure reducers; the reducers themselves stay
//! stateless.

use std::collections::HashSet;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::{watch, RwLock};

use runscope_protocol::{RunStatus, StageCatalog};
use runscope_state::{derive_stage_groups, pipeline_stages, PhaseProgress, StageGroup, StageStatus};
use runscope_stream::{EventLog, StreamClient, StreamStatus};

/// Which panel fills the body area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    Stages,
    Events,
}

/// Snapshot of derived state for one render pass.
struct DashboardSnapshot {
    run_id: String,
    run_status: RunStatus,
    stream_status: StreamStatus,
    groups: Vec<StageGroup>,
}

pub struct App {
    run_id: String,
    catalog: StageCatalog,
    client: StreamClient,
    log: Arc<RwLock<EventLog>>,
    status_rx: watch::Receiver<StreamStatus>,
    /// Session view state: which stage cards are expanded.
    expanded: HashSet<String>,
    view_mode: ViewMode,
    selected: usize,
}

impl App {
    pub fn new(client: StreamClient, run_id: String) -> Self {
        let log = client.log();
        let status_rx = client.status();
        Self {
            run_id,
            catalog: StageCatalog::standard(),
            client,
            log,
            status_rx,
            expanded: HashSet::new(),
            view_mode: ViewMode::Stages,
            selected: 0,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        loop {
            let snapshot = self.snapshot().await;
            terminal.draw(|f| self.draw(f, &snapshot))?;

            if !event::poll(Duration::from_millis(200))? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        self.client.cancel();
                        return Ok(());
                    }
                    KeyCode::Char('r') => {
                        if snapshot.stream_status == StreamStatus::Failed {
                            self.client.retry(&self.run_id.clone());
                        }
                    }
                    KeyCode::Tab => {
                        self.view_mode = match self.view_mode {
                            ViewMode::Stages => ViewMode::Events,
                            ViewMode::Events => ViewMode::Stages,
                        };
                    }
                    KeyCode::Up => self.selected = self.selected.saturating_sub(1),
                    KeyCode::Down => {
                        let max = pipeline_stages(&snapshot.groups).len().saturating_sub(1);
                        self.selected = (self.selected + 1).min(max);
                    }
                    KeyCode::Enter | KeyCode::Char(' ') => {
                        if let Some(group) = pipeline_stages(&snapshot.groups).get(self.selected) {
                            let id = group.stage_id.clone();
                            if !self.expanded.remove(&id) {
                                self.expanded.insert(id);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Re-run the reducers over the current event log. Cheap enough to
    /// do every frame; derived state is never cached across ticks.
    async fn snapshot(&self) -> DashboardSnapshot {
        let log = self.log.read().await;
        let run_status = log.run_status();
        let groups = derive_stage_groups(log.events(), &self.catalog, run_status);
        DashboardSnapshot {
            run_id: self.run_id.clone(),
            run_status,
            stream_status: *self.status_rx.borrow(),
            groups,
        }
    }

    fn draw(&self, f: &mut Frame, snapshot: &DashboardSnapshot) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.draw_header(f, chunks[0], snapshot);
        match self.view_mode {
            ViewMode::Stages => self.draw_stages(f, chunks[1], snapshot),
            ViewMode::Events => self.draw_events(f, chunks[1], snapshot),
        }
        self.draw_footer(f, chunks[2], snapshot);
    }

    fn draw_header(&self, f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
        let (status_text, status_color) = match snapshot.stream_status {
            StreamStatus::Idle => ("idle", Color::DarkGray),
            StreamStatus::Connecting => ("connecting", Color::Yellow),
            StreamStatus::Connected => ("live", Color::Green),
            StreamStatus::Reconnecting => ("reconnecting", Color::Yellow),
            StreamStatus::Cancelled => ("cancelled", Color::DarkGray),
            StreamStatus::Failed => ("connection lost - press r to retry", Color::Red),
        };
        let line = Line::from(vec![
            Span::styled(
                format!("run {} ", snapshot.run_id),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("[{}] ", snapshot.run_status)),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]);
        let header = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title("Runscope"));
        f.render_widget(header, area);
    }

    fn draw_stages(&self, f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
        let mut lines: Vec<Line> = Vec::new();

        // Bookend banners come from the pseudo-stages.
        if let Some(start) = snapshot.groups.iter().find(|g| g.stage_id == "run_start") {
            if start.status == StageStatus::Completed {
                lines.push(Line::from(Span::styled(
                    "Run started",
                    Style::default().fg(Color::Cyan),
                )));
            }
        }

        for (i, group) in pipeline_stages(&snapshot.groups).iter().enumerate() {
            let marker = match group.status {
                StageStatus::Pending => "o",
                StageStatus::InProgress => ">",
                StageStatus::Completed => "*",
            };
            let style = if i == self.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{} {} [{}]", marker, group.stage_name, group.status),
                style,
            )));

            if self.expanded.contains(&group.stage_id) {
                push_phase_line(&mut lines, "iteration", group.phases.iteration);
                push_phase_line(&mut lines, "seed", group.phases.seed);
                push_phase_line(&mut lines, "aggregation", group.phases.aggregation);
                for transition in &group.transitions {
                    if let Some(summary) = &transition.transition_summary {
                        lines.push(Line::from(format!("    -> {summary}")));
                    }
                }
            }
        }

        if let Some(end) = snapshot.groups.iter().find(|g| g.stage_id == "run_end") {
            if end.status == StageStatus::Completed {
                lines.push(Line::from(Span::styled(
                    "Run finished",
                    Style::default().fg(Color::Cyan),
                )));
            }
        }

        let body = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Stages"));
        f.render_widget(body, area);
    }

    fn draw_events(&self, f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
        let mut lines: Vec<Line> = Vec::new();
        for group in pipeline_stages(&snapshot.groups) {
            for view in &group.events {
                let ts = view.event.timestamp.format("%H:%M:%S");
                lines.push(Line::from(format!(
                    "{} {} {:?}",
                    ts, group.stage_id, view.event.event_type
                )));
                for sub in &view.sub_events {
                    lines.push(Line::from(format!("    {} {:?}", sub.id, sub.event_type)));
                }
            }
        }
        let visible = area.height.saturating_sub(2) as usize;
        if lines.len() > visible {
            lines.drain(..lines.len() - visible);
        }
        let body = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Events"));
        f.render_widget(body, area);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect, _snapshot: &DashboardSnapshot) {
        let footer = Paragraph::new("q quit | tab view | enter expand | r retry")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, area);
    }
}

fn push_phase_line(lines: &mut Vec<Line>, name: &str, phase: Option<PhaseProgress>) {
    let Some(p) = phase else {
        return;
    };
    let width = 20usize;
    let filled = ((p.ratio() * width as f64).round() as usize).min(width);
    let bar: String = "#".repeat(filled) + &"-".repeat(width - filled);
    lines.push(Line::from(format!(
        "    {name:<12} [{bar}] {}/{}",
        p.current, p.total
    )));
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
