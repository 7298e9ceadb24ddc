use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Tabs, Wrap};
use tokio::sync::mpsc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::DashboardApi;
use crate::config::ConfiguredTimeZone;
use crate::error_log::ErrorLogStore;
use crate::format::{
    self, MetricKind, NOT_AVAILABLE, PriorityTone, Severity, format_currency,
    format_signed_currency, label_or_na,
};
use crate::model::{AnalysisResult, MarketSnapshot, TradingPosition};
use crate::orchestrator::Orchestrator;
use crate::state::{Applied, Completion, Operation, Rejection, RequestToken};

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_QUESTION_CHARS: usize = 1000;
const INDEX_COLUMN_WIDTH: usize = 3;
const PRIORITY_COLUMN_WIDTH: usize = 8;
const READY_COLUMN_WIDTH: usize = 7;
const QUESTION_PLACEHOLDER: &str = "Ask about volatility, positions, or market conditions...";

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Spinner {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        let interval = Duration::from_millis(120);
        if self.last_tick.elapsed() < interval {
            return false;
        }
        self.index = (self.index + 1) % SPINNER_FRAMES.len();
        self.last_tick = Instant::now();
        true
    }

    fn frame(&self) -> char {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Overview,
    Analysis,
    Positions,
    Assistant,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Overview, Tab::Analysis, Tab::Positions, Tab::Assistant];

    fn index(&self) -> usize {
        Tab::ALL.iter().position(|tab| tab == self).unwrap_or(0)
    }

    fn title(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Analysis => "Analysis",
            Tab::Positions => "Positions",
            Tab::Assistant => "AI Assistant",
        }
    }

    fn shifted(&self, delta: isize) -> Tab {
        let len = Tab::ALL.len() as isize;
        let idx = (self.index() as isize + delta).rem_euclid(len);
        Tab::ALL[idx as usize]
    }
}

pub struct TuiApp<A> {
    orchestrator: Orchestrator<A>,
    error_log: ErrorLogStore,
    timezone: ConfiguredTimeZone,
    tab: Tab,
    question: String,
    editing: bool,
    selected_position: usize,
    answer_scroll: usize,
    answer_max_scroll: usize,
    spinner: Spinner,
    status_message: Option<String>,
    status_visible_until: Option<Instant>,
    status_is_error: bool,
    exit_confirmation: bool,
    failures_logged: usize,
    dirty: bool,
    last_draw: Instant,
    min_redraw_gap: Duration,
}

impl<A: DashboardApi> TuiApp<A> {
    fn is_exit_key(key: &KeyEvent) -> bool {
        matches!(
            key.code,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
        )
    }

    pub fn new(
        orchestrator: Orchestrator<A>,
        error_log: ErrorLogStore,
        timezone: ConfiguredTimeZone,
    ) -> TuiApp<A> {
        let min_redraw_gap = Duration::from_millis(100);
        TuiApp {
            orchestrator,
            error_log,
            timezone,
            tab: Tab::Overview,
            question: String::new(),
            editing: false,
            selected_position: 0,
            answer_scroll: 0,
            answer_max_scroll: 0,
            spinner: Spinner::new(),
            status_message: None,
            status_visible_until: None,
            status_is_error: false,
            exit_confirmation: false,
            failures_logged: 0,
            dirty: true,
            last_draw: Instant::now() - min_redraw_gap,
            min_redraw_gap,
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(3));
        self.status_is_error = false;
        self.dirty = true;
    }

    fn set_error_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(8));
        self.status_is_error = true;
        self.dirty = true;
    }

    fn clear_status_if_allowed(&mut self) {
        let Some(visible_until) = self.status_visible_until else {
            return;
        };
        if Instant::now() < visible_until {
            return;
        }
        self.status_message = None;
        self.status_visible_until = None;
        self.status_is_error = false;
        self.dirty = true;
    }

    pub fn dispose(&self) {
        ratatui::restore();
    }

    pub async fn run(&mut self, rx: &mut mpsc::UnboundedReceiver<Completion>) -> Result<()> {
        color_eyre::install()?;
        let mut terminal = ratatui::init();
        self.mount();
        let mut input_tick = tokio::time::interval(self.min_redraw_gap);
        terminal.draw(|frame| self.render(frame))?;
        self.last_draw = Instant::now();
        self.dirty = false;
        loop {
            tokio::select! {
                biased;
                _ = input_tick.tick() => {
                    if self.orchestrator.state().any_in_flight() && self.spinner.tick() {
                        self.dirty = true;
                    }
                    self.clear_status_if_allowed();
                    if self.poll_input()? {
                        return Ok(());
                    }
                }
                message = rx.recv() => match message {
                    Some(completion) => self.on_completion(completion),
                    None => break,
                }
            }
            if self.dirty && self.last_draw.elapsed() >= self.min_redraw_gap {
                terminal.draw(|frame| self.render(frame))?;
                self.last_draw = Instant::now();
                self.dirty = false;
            }
        }
        Ok(())
    }

    fn mount(&mut self) {
        match self.error_log.load() {
            Ok(entries) => self.failures_logged = entries.len(),
            Err(err) => self.set_error_status_message(format!("could not read error log: {err}")),
        }
        if self.failures_logged > 0 {
            self.set_status_message(format!(
                "{} failure(s) recorded in the error log",
                self.failures_logged
            ));
        }
        self.trigger_refresh();
    }

    fn on_completion(&mut self, completion: Completion) {
        match self.orchestrator.complete(completion) {
            Applied::Updated(Operation::Refresh) => {
                self.set_status_message("Market data refreshed");
            }
            Applied::Updated(Operation::Analyze) => {
                self.selected_position = 0;
                let count = self.orchestrator.state().positions().len();
                self.set_status_message(format!(
                    "Analysis complete · {count} position recommendation(s)"
                ));
            }
            Applied::Updated(Operation::Ask) => {
                self.answer_scroll = 0;
                self.set_status_message("Assistant answered");
            }
            Applied::Failed(operation, err) => {
                let mut message = format!("{} failed ({}): {err}", operation.label(), err.kind());
                match self.error_log.record_failure(operation, &err) {
                    Ok(()) => self.failures_logged += 1,
                    Err(log_err) => {
                        message.push_str(&format!(" · could not write error log: {log_err}"));
                    }
                }
                self.set_error_status_message(message);
            }
            Applied::Stale(_) => {}
        }
        self.dirty = true;
    }

    fn report(&mut self, operation: Operation, started: Result<RequestToken, Rejection>) {
        match started {
            Ok(_) => {}
            Err(rejection) => self.set_status_message(rejection.describe(operation)),
        }
        self.dirty = true;
    }

    fn trigger_refresh(&mut self) {
        let started = self.orchestrator.refresh();
        self.report(Operation::Refresh, started);
    }

    fn trigger_analyze(&mut self) {
        let started = self.orchestrator.analyze();
        self.report(Operation::Analyze, started);
    }

    fn submit_question(&mut self) {
        let started = self.orchestrator.ask(&self.question);
        if started.is_ok() {
            self.editing = false;
        }
        self.report(Operation::Ask, started);
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let has_cards = self.orchestrator.state().snapshot().is_some() && area.height >= 20;
        let has_status = self.status_message.is_some() && area.height >= 12;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(if has_cards { 4 } else { 0 }),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(if has_status { 3 } else { 0 }),
            ])
            .split(area);
        self.render_header(frame, chunks[0]);
        if has_cards {
            self.render_cards(frame, chunks[1]);
        }
        self.render_tabs(frame, chunks[2]);
        match self.tab {
            Tab::Overview => self.render_overview(frame, chunks[3]),
            Tab::Analysis => self.render_analysis(frame, chunks[3]),
            Tab::Positions => self.render_positions(frame, chunks[3]),
            Tab::Assistant => self.render_assistant(frame, chunks[3]),
        }
        if has_status {
            self.render_status(frame, chunks[4]);
        }
        if self.exit_confirmation {
            self.render_exit_confirmation(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let state = self.orchestrator.state();
        let mut subtitle =
            "Live implied volatility analysis and trading recommendations".to_string();
        if let Some(updated) = state.last_updated() {
            subtitle.push_str(" · Last updated: ");
            subtitle.push_str(&self.timezone.format_datetime(updated, LAST_UPDATED_FORMAT));
        }
        if self.failures_logged > 0 {
            subtitle.push_str(&format!(" · {} failure(s) logged", self.failures_logged));
        }
        let refresh_label = if state.is_in_flight(Operation::Refresh) {
            format!("[r] Refreshing {}", self.spinner.frame())
        } else {
            "[r] Refresh Data".to_string()
        };
        let analyze_label = if state.is_in_flight(Operation::Analyze) {
            format!("[a] Analyzing... {}", self.spinner.frame())
        } else {
            "[a] Run Analysis".to_string()
        };
        let hints = Line::from(vec![
            Span::styled(
                refresh_label,
                action_style(!state.is_in_flight(Operation::Refresh)),
            ),
            Span::raw("  "),
            Span::styled(analyze_label, action_style(state.can_analyze())),
            Span::raw("  "),
            Span::styled("[1-4/Tab] Switch view", action_style(true)),
            Span::raw("  "),
            Span::styled("[i] Ask", action_style(!state.is_in_flight(Operation::Ask))),
            Span::raw("  "),
            Span::styled("[q] Quit", action_style(true)),
        ]);
        let lines = vec![
            Line::styled(subtitle, Style::default().fg(Color::Gray)),
            hints,
        ];
        let block = Block::bordered().title(Span::styled(
            "ETH Options Dashboard",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let Some(snapshot) = self.orchestrator.state().snapshot() else {
            return;
        };
        let cards = [
            (
                "ETH Price",
                format_currency(snapshot.eth_price),
                "Current spot price",
                Color::LightGreen,
            ),
            (
                "Implied Volatility",
                MetricKind::ImpliedVol.format(snapshot.eth_iv_deribit),
                "ATM options IV",
                Color::LightBlue,
            ),
            (
                "Realized Vol (30D)",
                MetricKind::RealizedVol.format(snapshot.eth_rv_30d),
                "Historical volatility",
                Color::Rgb(255, 165, 0),
            ),
            (
                "VIX",
                MetricKind::VolIndex.format(snapshot.vix),
                "Traditional market vol",
                Color::LightRed,
            ),
        ];
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(25); 4])
            .split(area);
        for ((title, value, caption, accent), column) in cards.into_iter().zip(columns.iter()) {
            let lines = vec![
                Line::styled(value, Style::default().add_modifier(Modifier::BOLD)),
                Line::styled(caption, Style::default().fg(Color::DarkGray)),
            ];
            let block = Block::bordered()
                .title(title)
                .border_style(Style::default().fg(accent));
            frame.render_widget(Paragraph::new(lines).block(block), *column);
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = Tab::ALL
            .iter()
            .enumerate()
            .map(|(idx, tab)| format!("{} {}", idx + 1, tab.title()));
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .block(Block::bordered())
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightBlue)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn render_overview(&self, frame: &mut Frame, area: Rect) {
        let state = self.orchestrator.state();
        let Some(snapshot) = state.snapshot() else {
            let message = if state.is_in_flight(Operation::Refresh) {
                format!("{} Loading market data...", self.spinner.frame())
            } else {
                "No market data yet · press r to refresh".to_string()
            };
            render_placeholder(frame, area, "Overview", &message, None);
            return;
        };
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let block = Block::bordered().title("Volatility Metrics");
        frame.render_widget(
            Paragraph::new(volatility_lines(snapshot)).block(block),
            columns[0],
        );
        let block = Block::bordered().title("Options Flow");
        frame.render_widget(Paragraph::new(flow_lines(snapshot)).block(block), columns[1]);
    }

    fn render_analysis(&self, frame: &mut Frame, area: Rect) {
        let state = self.orchestrator.state();
        let Some(analysis) = state.analysis() else {
            let message = if state.is_in_flight(Operation::Analyze) {
                format!("{} Analyzing...", self.spinner.frame())
            } else if state.snapshot().is_none() {
                "Market data is required before an analysis can run".to_string()
            } else {
                "Press a to generate the ETH options analysis with AI insights".to_string()
            };
            render_placeholder(frame, area, "Run Analysis", &message, None);
            return;
        };
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);
        let block = Block::bordered().title("Market Assessment");
        frame.render_widget(
            Paragraph::new(assessment_lines(analysis))
                .wrap(Wrap { trim: true })
                .block(block),
            columns[0],
        );
        let block = Block::bordered().title("AI Market Analysis");
        frame.render_widget(
            Paragraph::new(insight_lines(analysis))
                .wrap(Wrap { trim: true })
                .block(block),
            columns[1],
        );
    }

    fn render_positions(&self, frame: &mut Frame, area: Rect) {
        let state = self.orchestrator.state();
        let positions = state.positions();
        if positions.is_empty() {
            let message = if state.is_in_flight(Operation::Analyze) {
                format!("{} Analyzing...", self.spinner.frame())
            } else {
                "Run the analysis to generate trading position recommendations".to_string()
            };
            render_placeholder(
                frame,
                area,
                "Positions",
                "No Positions Available",
                Some(message.as_str()),
            );
            return;
        }
        let selected = clamp_index(self.selected_position, positions.len());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let list_area = columns[0];
        let visible = list_area.height.saturating_sub(2) as usize;
        let name_width = usize::from(list_area.width.saturating_sub(2))
            .saturating_sub(INDEX_COLUMN_WIDTH + PRIORITY_COLUMN_WIDTH + READY_COLUMN_WIDTH + 3)
            .max(4);
        let (start, end) = visible_range(positions.len(), visible, selected);
        let mut lines = Vec::new();
        for (idx, position) in positions.iter().enumerate().take(end).skip(start) {
            let priority = label_or_na(position.priority.as_deref());
            let ready = if position.entry_criteria_met {
                "✓ Ready"
            } else {
                ""
            };
            let name = format_column_value(
                label_or_na(position.position_type.as_deref()),
                ColumnAlign::Left,
                name_width,
            );
            let priority_cell =
                format_column_value(priority, ColumnAlign::Left, PRIORITY_COLUMN_WIDTH);
            let ready_cell = format_column_value(ready, ColumnAlign::Left, READY_COLUMN_WIDTH);
            let highlight = idx == selected;
            let index_cell = format_column_value(
                &format!("{}.", idx + 1),
                ColumnAlign::Right,
                INDEX_COLUMN_WIDTH,
            );
            lines.push(Line::from(vec![
                Span::styled(index_cell, Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(name, row_style(highlight)),
                Span::raw(" "),
                Span::styled(
                    priority_cell,
                    Style::default().fg(priority_color(format::priority_category(priority))),
                ),
                Span::raw(" "),
                Span::styled(ready_cell, Style::default().fg(Color::LightGreen)),
            ]));
        }
        let title = format!("Positions {}/{}", selected + 1, positions.len());
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().title(title)),
            list_area,
        );

        let analysis = state.analysis();
        let position = &positions[selected];
        let block = Block::bordered().title(format!(
            "{} · j/k to browse",
            label_or_na(position.position_type.as_deref())
        ));
        frame.render_widget(
            Paragraph::new(position_detail_lines(position, analysis))
                .wrap(Wrap { trim: true })
                .block(block),
            columns[1],
        );
    }

    fn render_assistant(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);
        let asking = self.orchestrator.state().is_in_flight(Operation::Ask);
        let input_line = if self.question.is_empty() && !self.editing {
            Line::styled(QUESTION_PLACEHOLDER, Style::default().fg(Color::DarkGray))
        } else {
            let mut spans = vec![Span::raw(self.question.clone())];
            if self.editing {
                spans.push(Span::styled(
                    "_",
                    Style::default().add_modifier(Modifier::SLOW_BLINK),
                ));
            }
            Line::from(spans)
        };
        let input_title = if asking {
            format!("Question · waiting for answer {}", self.spinner.frame())
        } else if self.editing {
            "Question · Enter to ask, Esc to stop editing".to_string()
        } else {
            "Question · press i to type".to_string()
        };
        let border = if self.editing {
            Style::default().fg(Color::LightCyan)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(input_line).block(
                Block::bordered()
                    .title(input_title)
                    .border_style(border),
            ),
            chunks[0],
        );

        let answer_area = chunks[1];
        let Some(turn) = self.orchestrator.state().assistant() else {
            render_placeholder(
                frame,
                answer_area,
                "AI Response",
                "Ask questions about the ETH options analysis",
                None,
            );
            self.answer_max_scroll = 0;
            return;
        };
        let mut lines = vec![
            Line::styled(
                format!("Q: {}", turn.question),
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            ),
            Line::raw(""),
        ];
        lines.extend(turn.answer.lines().map(|line| Line::raw(line.to_string())));
        let answer = Paragraph::new(lines).wrap(Wrap { trim: false });
        let inner_width = answer_area.width.saturating_sub(2);
        let inner_height = usize::from(answer_area.height.saturating_sub(2));
        // Rows as the word wrapper lays them out, not characters over width.
        let total_rows = answer.line_count(inner_width);
        self.answer_max_scroll = total_rows.saturating_sub(inner_height);
        self.answer_scroll = self.answer_scroll.min(self.answer_max_scroll);
        let scroll = self.answer_scroll.min(u16::MAX as usize) as u16;
        frame.render_widget(
            answer
                .scroll((scroll, 0))
                .block(Block::bordered().title("AI Response · PgUp/PgDn to scroll")),
            answer_area,
        );
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = &self.status_message {
            let color = if self.status_is_error {
                Color::Red
            } else {
                Color::Yellow
            };
            let block = Block::bordered().title("Status");
            let status = Paragraph::new(message.as_str())
                .style(Style::default().fg(color))
                .alignment(Alignment::Left)
                .block(block);
            frame.render_widget(status, area);
        }
    }

    fn render_exit_confirmation(&self, frame: &mut Frame) {
        let area = frame.area();
        if area.width < 24 || area.height < 5 {
            return;
        }
        let popup_width = area.width.saturating_sub(20).clamp(28, 50);
        let popup_height = 5;
        let left = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let top = area.y + (area.height.saturating_sub(popup_height)) / 2;
        let popup = Rect::new(left, top, popup_width, popup_height);
        let lines = vec![
            Line::from(Span::styled(
                "Quit the dashboard?",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from("Y/Enter confirm · N/Esc cancel"),
            Line::from("q again also confirms · Ctrl+C quits"),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(Block::bordered().title("Confirm exit"));
        frame.render_widget(Clear, popup);
        frame.render_widget(paragraph, popup);
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.dirty = true;
        if self.exit_confirmation {
            return self.handle_exit_confirmation_key(key);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if self.editing {
            self.handle_question_key(key);
            return false;
        }
        if Self::is_exit_key(&key) {
            self.prompt_exit_confirmation();
            return false;
        }
        match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => self.trigger_refresh(),
            KeyCode::Char('a') | KeyCode::Char('A') => self.trigger_analyze(),
            KeyCode::Char(digit @ '1'..='4') => {
                let idx = digit as usize - '1' as usize;
                self.tab = Tab::ALL[idx];
            }
            KeyCode::Tab => self.tab = self.tab.shifted(1),
            KeyCode::BackTab => self.tab = self.tab.shifted(-1),
            KeyCode::Char('i') | KeyCode::Char('I') => {
                self.tab = Tab::Assistant;
                self.editing = true;
            }
            KeyCode::Enter if self.tab == Tab::Assistant => self.editing = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.scroll_answer(5),
            KeyCode::PageUp => self.scroll_answer(-5),
            _ => {}
        }
        false
    }

    fn handle_question_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_question(),
            KeyCode::Esc => self.editing = false,
            KeyCode::Backspace => {
                self.question.pop();
            }
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && self.question.chars().count() < MAX_QUESTION_CHARS =>
            {
                self.question.push(ch);
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        match self.tab {
            Tab::Positions => {
                let len = self.orchestrator.state().positions().len();
                if len == 0 {
                    self.selected_position = 0;
                    return;
                }
                let current = clamp_index(self.selected_position, len) as isize;
                self.selected_position = (current + delta).clamp(0, len as isize - 1) as usize;
            }
            Tab::Assistant => self.scroll_answer(delta),
            Tab::Overview | Tab::Analysis => {}
        }
    }

    fn scroll_answer(&mut self, delta: isize) {
        let next = self.answer_scroll as isize + delta;
        self.answer_scroll = next.clamp(0, self.answer_max_scroll as isize) as usize;
    }

    fn prompt_exit_confirmation(&mut self) {
        if self.exit_confirmation {
            return;
        }
        self.exit_confirmation = true;
        self.set_status_message("Quit? Y/Enter confirm · N/Esc cancel");
    }

    fn handle_exit_confirmation_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') = key.code {
                self.exit_confirmation = false;
                return true;
            }
        }
        match key.code {
            KeyCode::Char('y')
            | KeyCode::Char('Y')
            | KeyCode::Char('q')
            | KeyCode::Char('Q')
            | KeyCode::Enter => {
                self.exit_confirmation = false;
                true
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.exit_confirmation = false;
                self.set_status_message("Exit cancelled");
                false
            }
            _ => false,
        }
    }

    fn poll_input(&mut self) -> Result<bool> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if self.handle_key_event(key) {
                        return Ok(true);
                    }
                }
                Event::Resize(_, _) => self.dirty = true,
                _ => {}
            }
        }
        Ok(false)
    }
}

fn volatility_lines(snapshot: &MarketSnapshot) -> Vec<Line<'static>> {
    let premium = format::vrp(snapshot);
    vec![
        metric_line(
            "ETH IV (Deribit)",
            MetricKind::ImpliedVol.format(snapshot.eth_iv_deribit),
            None,
        ),
        metric_line(
            "ETH IV (Binance)",
            MetricKind::ImpliedVol.format(snapshot.eth_iv_binance),
            None,
        ),
        metric_line("ETH RV (1D)", MetricKind::RealizedVol.format(snapshot.eth_rv_1d), None),
        metric_line("ETH RV (7D)", MetricKind::RealizedVol.format(snapshot.eth_rv_7d), None),
        metric_line("ETH RV (30D)", MetricKind::RealizedVol.format(snapshot.eth_rv_30d), None),
        metric_line("BTC RV (7D)", MetricKind::RealizedVol.format(snapshot.btc_rv_7d), None),
        metric_line("BTC RV (30D)", MetricKind::RealizedVol.format(snapshot.btc_rv_30d), None),
        metric_line("MOVE Index", MetricKind::VolIndex.format(snapshot.move_index), None),
        Line::styled("─".repeat(24), Style::default().fg(Color::DarkGray)),
        metric_line(
            "VRP (IV - RV)",
            MetricKind::RiskPremium.format(premium),
            Some(severity_color(format::signed_tone(premium))),
        ),
    ]
}

fn flow_lines(snapshot: &MarketSnapshot) -> Vec<Line<'static>> {
    vec![
        metric_line(
            "Puts Bought",
            MetricKind::FlowShare.format(snapshot.puts_bought),
            Some(Color::LightRed),
        ),
        metric_line(
            "Calls Bought",
            MetricKind::FlowShare.format(snapshot.calls_bought),
            Some(Color::LightGreen),
        ),
        metric_line("Puts Sold", MetricKind::FlowShare.format(snapshot.puts_sold), None),
        metric_line("Calls Sold", MetricKind::FlowShare.format(snapshot.calls_sold), None),
        Line::styled("─".repeat(24), Style::default().fg(Color::DarkGray)),
        metric_line(
            "Net Put Bias",
            MetricKind::FlowShare.format(snapshot.net_put_bias),
            Some(severity_color(format::put_bias_tone(snapshot.net_put_bias))),
        ),
    ]
}

fn assessment_lines(analysis: &AnalysisResult) -> Vec<Line<'static>> {
    let assessment = analysis.assessment.clone().unwrap_or_default();
    let metrics = analysis.current_metrics.clone().unwrap_or_default();
    let skew = analysis.skew_analysis.clone().unwrap_or_default();
    let projections = analysis.forward_projections.clone().unwrap_or_default();
    let regime = analysis.regime_analysis.clone().unwrap_or_default();
    let cross = analysis.cross_asset.clone().unwrap_or_default();

    let overall = label_or_na(assessment.overall_assessment.as_deref()).to_string();
    let overall_color = severity_color(format::assessment_category(&overall));
    let projected_range = format!(
        "{} to {}",
        MetricKind::ProjectedVol.format(projections.mc_p5),
        MetricKind::ProjectedVol.format(projections.mc_p95)
    );
    let divergence = match regime.regime_divergence {
        Some(true) => "yes",
        Some(false) => "no",
        None => NOT_AVAILABLE,
    };
    vec![
        Line::from(vec![
            Span::raw("Overall IV Assessment  "),
            badge(&overall, overall_color),
        ]),
        Line::from(vec![
            Span::raw("Volatility Regime      "),
            badge(label_or_na(assessment.regime.as_deref()), Color::Gray),
        ]),
        Line::from(vec![
            Span::raw("Analysis Confidence    "),
            badge(label_or_na(assessment.confidence.as_deref()), Color::LightBlue),
        ]),
        metric_line(
            "VRP Assessment",
            label_or_na(assessment.vrp_assessment.as_deref()).to_string(),
            None,
        ),
        metric_line(
            "Top Opportunity",
            label_or_na(assessment.top_opportunity.as_deref()).to_string(),
            None,
        ),
        metric_line("Risk Level", label_or_na(assessment.risk_level.as_deref()).to_string(), None),
        Line::raw(""),
        metric_line(
            "Volatility Risk Premium",
            MetricKind::RiskPremium.format(metrics.vrp),
            Some(severity_color(format::signed_tone(metrics.vrp))),
        ),
        metric_line("IV Rank", MetricKind::IvRank.format(metrics.estimated_ivr), None),
        metric_line("IV Percentile", MetricKind::IvPercentile.format(metrics.iv_percentile), None),
        metric_line("Put-Call Skew", MetricKind::Skew.format(skew.put_call_skew), None),
        metric_line("ATM Skew", MetricKind::Skew.format(skew.atm_skew), None),
        metric_line("Smile Curvature", MetricKind::Skew.format(skew.smile_curvature), None),
        metric_line(
            "Expected IV (30D)",
            MetricKind::ProjectedVol.format(projections.mc_mean),
            None,
        ),
        metric_line("Projected 5th-95th", projected_range, None),
        Line::raw(""),
        metric_line(
            "Crypto Regime",
            label_or_na(regime.crypto_regime.as_deref()).to_string(),
            None,
        ),
        metric_line(
            "TradFi Regime",
            label_or_na(regime.tradfi_regime.as_deref()).to_string(),
            None,
        ),
        metric_line("Regime Divergence", divergence.to_string(), None),
        metric_line("ETH/BTC RV Ratio", format::format_ratio(cross.eth_btc_rv_ratio), None),
        metric_line("ETH IV / VIX", format::format_ratio(cross.eth_vix_ratio), None),
        metric_line("VIX Regime", label_or_na(cross.vix_regime.as_deref()).to_string(), None),
    ]
}

fn insight_lines(analysis: &AnalysisResult) -> Vec<Line<'static>> {
    let Some(insights) = &analysis.ai_insights else {
        return vec![Line::styled(
            "No AI insights in this analysis",
            Style::default().fg(Color::DarkGray),
        )];
    };
    if let Some(error) = &insights.error {
        return vec![Line::styled(error.clone(), Style::default().fg(Color::Yellow))];
    }
    let mut lines = Vec::new();
    for (heading, body) in [
        ("Executive Summary", &insights.executive_summary),
        ("Market Analysis", &insights.market_analysis),
        ("Risk Assessment", &insights.risk_assessment),
    ] {
        lines.push(Line::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let text = label_or_na(body.as_deref());
        lines.extend(text.lines().map(|line| Line::raw(line.to_string())));
        lines.push(Line::raw(""));
    }
    lines
}

fn position_detail_lines(
    position: &TradingPosition,
    analysis: Option<&AnalysisResult>,
) -> Vec<Line<'static>> {
    let priority = label_or_na(position.priority.as_deref()).to_string();
    let tone = format::priority_category(&priority);
    let mut header = vec![badge(&priority, priority_color(tone))];
    if position.entry_criteria_met {
        header.push(Span::raw(" "));
        header.push(badge("✓ Ready", Color::LightGreen));
    }
    let net_color = match position.net_credit_debit {
        Some(value) if value > 0.0 => Color::LightGreen,
        _ => Color::LightRed,
    };
    let mut lines = vec![
        Line::from(header),
        Line::styled(
            label_or_na(position.strategy.as_deref()).to_string(),
            Style::default().fg(Color::Gray),
        ),
        Line::raw(""),
        metric_line("Strikes", label_or_na(position.strikes.as_deref()).to_string(), None),
        metric_line("Expiry", label_or_na(position.expiry.as_deref()).to_string(), None),
        metric_line(
            "Net Credit/Debit",
            format_signed_currency(position.net_credit_debit),
            Some(net_color),
        ),
        metric_line(
            "Win Probability",
            MetricKind::WinProbability.format(position.win_probability),
            None,
        ),
    ];
    if position.max_profit.is_some() {
        lines.push(metric_line("Max Profit", format_currency(position.max_profit), None));
    }
    if position.max_risk.is_some() {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!("Max Risk: {}", format_currency(position.max_risk)),
            Style::default().fg(Color::LightRed),
        ));
    }
    if let Some(commentary) = analysis.and_then(|analysis| analysis.commentary_for(position)) {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "AI commentary",
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ));
        lines.extend(commentary.lines().map(|line| Line::raw(line.to_string())));
    }
    lines
}

fn render_placeholder(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    message: &str,
    detail: Option<&str>,
) {
    let mut lines = vec![Line::styled(
        message.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(detail) = detail {
        lines.push(Line::styled(detail.to_string(), Style::default().fg(Color::Gray)));
    }
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::bordered().title(title.to_string()));
    frame.render_widget(paragraph, area);
}

fn metric_line(label: &str, value: String, color: Option<Color>) -> Line<'static> {
    let mut style = Style::default().add_modifier(Modifier::BOLD);
    if let Some(color) = color {
        style = style.fg(color);
    }
    Line::from(vec![
        Span::raw(format!("{}: ", label)),
        Span::styled(value, style),
    ])
}

fn badge(label: &str, color: Color) -> Span<'static> {
    Span::styled(
        format!(" {label} "),
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD),
    )
}

fn action_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::LightRed,
        Severity::Warning => Color::Yellow,
        Severity::Neutral => Color::Gray,
        Severity::Positive => Color::LightGreen,
    }
}

fn priority_color(tone: PriorityTone) -> Color {
    match tone {
        PriorityTone::Urgent => Color::LightRed,
        PriorityTone::Elevated => Color::Yellow,
        PriorityTone::Routine => Color::LightBlue,
        PriorityTone::Hedge => Color::LightMagenta,
    }
}

#[derive(Clone, Copy)]
enum ColumnAlign {
    Left,
    Right,
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .bg(Color::LightCyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn format_column_value(value: &str, align: ColumnAlign, width: usize) -> String {
    let clipped = clip_to_width(value, width);
    pad_to_width(&clipped, width, align)
}

fn clip_to_width(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(value) <= width {
        return value.to_string();
    }
    let mut result = String::new();
    let mut remaining = width.saturating_sub(1);
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > remaining {
            break;
        }
        result.push(ch);
        remaining = remaining.saturating_sub(ch_width);
    }
    result.push('…');
    result
}

fn pad_to_width(value: &str, width: usize, align: ColumnAlign) -> String {
    let current = UnicodeWidthStr::width(value);
    if current >= width {
        return value.to_string();
    }
    let padding = " ".repeat(width - current);
    match align {
        ColumnAlign::Left => format!("{value}{padding}"),
        ColumnAlign::Right => format!("{padding}{value}"),
    }
}

fn clamp_index(idx: usize, len: usize) -> usize {
    if len == 0 { 0 } else { idx.min(len - 1) }
}

fn visible_range(len: usize, visible: usize, selected: usize) -> (usize, usize) {
    if len == 0 || visible == 0 {
        return (0, 0);
    }
    if len <= visible {
        return (0, len);
    }
    let max_start = len - visible;
    let clamped = clamp_index(selected, len);
    let start = clamped.saturating_sub(visible - 1).min(max_start);
    (start, start + visible)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::api::fake::ScriptedApi;
    use crate::api::{FetchError, MarketFetch, parse_server_timestamp};
    use crate::model::AiInsights;

    fn fresh_log_path() -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "vol-dashboard-tui-{}-{}.jsonl",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn app_in(
        api: ScriptedApi,
        timezone: ConfiguredTimeZone,
        log_path: PathBuf,
    ) -> (TuiApp<ScriptedApi>, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(Arc::new(api), tx, Duration::from_secs(5));
        let app = TuiApp::new(orchestrator, ErrorLogStore::new(log_path), timezone);
        (app, rx)
    }

    fn app_with(
        api: ScriptedApi,
    ) -> (TuiApp<ScriptedApi>, mpsc::UnboundedReceiver<Completion>) {
        app_in(api, ConfiguredTimeZone::Local, fresh_log_path())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn draw(app: &mut TuiApp<ScriptedApi>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).expect("test terminal");
        terminal.draw(|frame| app.render(frame)).expect("draw");
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn market() -> MarketFetch {
        MarketFetch {
            snapshot: MarketSnapshot {
                eth_price: Some(3000.0),
                eth_iv_deribit: Some(65.2),
                eth_rv_30d: Some(58.0),
                ..MarketSnapshot::default()
            },
            server_timestamp: None,
        }
    }

    #[tokio::test]
    async fn renders_market_cards_after_refresh() {
        let api = ScriptedApi::default();
        api.push_market(Ok(market()));
        let (mut app, mut rx) = app_with(api);

        let before = draw(&mut app);
        assert!(before.contains("ETH Options Dashboard"));
        assert!(before.contains("No market data yet"));

        app.trigger_refresh();
        let completion = rx.recv().await.expect("completion");
        app.on_completion(completion);
        let after = draw(&mut app);
        assert!(after.contains("$3,000"));
        assert!(after.contains("65.20%"));
        assert!(after.contains("VRP (IV - RV): 7.20%"));
        assert!(after.contains("VIX"));
    }

    #[tokio::test]
    async fn mount_refreshes_and_shows_last_updated_in_zone() {
        let api = ScriptedApi::default();
        let mut fetch = market();
        fetch.server_timestamp = parse_server_timestamp("2024-05-01T12:00:00");
        api.push_market(Ok(fetch));
        let (mut app, mut rx) = app_in(
            api,
            ConfiguredTimeZone::Named(chrono_tz::Asia::Shanghai),
            fresh_log_path(),
        );

        app.mount();
        assert!(app.orchestrator.state().is_in_flight(Operation::Refresh));
        let completion = rx.recv().await.expect("completion");
        app.on_completion(completion);
        let screen = draw(&mut app);
        assert!(screen.contains("Last updated: 2024-05-01 20:00:00"), "{screen}");
    }

    #[tokio::test]
    async fn mount_counts_failures_already_in_the_log() {
        let log_path = fresh_log_path();
        let earlier = ErrorLogStore::new(log_path.clone());
        let refused = FetchError::Transport("connection refused".to_string());
        earlier.record_failure(Operation::Refresh, &refused).unwrap();
        earlier.record_failure(Operation::Ask, &refused).unwrap();

        let (mut app, mut rx) = app_in(ScriptedApi::default(), ConfiguredTimeZone::Local, log_path);
        app.mount();
        assert_eq!(app.failures_logged, 2);
        assert_eq!(
            app.status_message.as_deref(),
            Some("2 failure(s) recorded in the error log")
        );
        assert!(draw(&mut app).contains("2 failure(s) logged"));

        // The scripted API has no market data, so the mount refresh fails too.
        let completion = rx.recv().await.expect("completion");
        app.on_completion(completion);
        assert_eq!(app.failures_logged, 3);
    }

    #[tokio::test]
    async fn long_answer_scrolls_to_its_last_line() {
        let api = ScriptedApi::default();
        let word = "w".repeat(80);
        let paragraph = [word.as_str(); 4].join(" ");
        let mut answer = vec![paragraph; 20];
        answer.push("ENDMARKER".to_string());
        api.push_answer(Ok(answer.join("\n")));
        let (mut app, mut rx) = app_with(api);

        app.question = "Explain the skew".to_string();
        app.submit_question();
        let completion = rx.recv().await.expect("completion");
        app.on_completion(completion);
        app.handle_key_event(key(KeyCode::Char('4')));
        assert!(!draw(&mut app).contains("ENDMARKER"));

        for _ in 0..100 {
            app.handle_key_event(key(KeyCode::PageDown));
        }
        let screen = draw(&mut app);
        assert!(screen.contains("ENDMARKER"), "scroll stopped at {}", app.answer_scroll);
        assert_eq!(app.answer_scroll, app.answer_max_scroll);
    }

    #[tokio::test]
    async fn analyze_key_without_market_data_only_reports() {
        let (mut app, mut rx) = app_with(ScriptedApi::default());
        assert!(!app.handle_key_event(key(KeyCode::Char('a'))));
        assert!(!app.orchestrator.state().is_in_flight(Operation::Analyze));
        assert_eq!(
            app.status_message.as_deref(),
            Some("load market data before running the analysis")
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn typed_question_is_submitted_and_answer_rendered() {
        let api = ScriptedApi::default();
        api.push_answer(Ok("IV is rich relative to realised.".to_string()));
        let (mut app, mut rx) = app_with(api);

        app.handle_key_event(key(KeyCode::Char('i')));
        assert_eq!(app.tab, Tab::Assistant);
        for ch in "Is IV rich?".chars() {
            app.handle_key_event(key(KeyCode::Char(ch)));
        }
        app.handle_key_event(key(KeyCode::Enter));
        assert!(!app.editing);
        assert!(app.orchestrator.state().is_in_flight(Operation::Ask));

        let completion = rx.recv().await.expect("completion");
        app.on_completion(completion);
        let screen = draw(&mut app);
        assert!(screen.contains("Q: Is IV rich?"));
        assert!(screen.contains("IV is rich relative to realised."));
    }

    #[tokio::test]
    async fn failed_request_shows_error_kind() {
        let (mut app, mut rx) = app_with(ScriptedApi::default());
        app.trigger_refresh();
        let completion = rx.recv().await.expect("completion");
        app.on_completion(completion);
        assert!(app.status_is_error);
        let message = app.status_message.clone().unwrap_or_default();
        assert!(message.starts_with("refresh failed (transport)"), "{message}");
        assert_eq!(app.failures_logged, 1);
        assert!(app.orchestrator.state().snapshot().is_none());
    }

    #[tokio::test]
    async fn positions_tab_lists_analysis_recommendations() {
        let api = ScriptedApi::default();
        api.push_market(Ok(market()));
        api.push_analysis(Ok(AnalysisResult {
            trading_positions: vec![TradingPosition {
                position_type: Some("Short Put Spread".to_string()),
                strikes: Some("2800/2700".to_string()),
                net_credit_debit: Some(50.0),
                win_probability: Some(0.75),
                max_risk: Some(950.0),
                priority: Some("HIGH".to_string()),
                entry_criteria_met: true,
                ..TradingPosition::default()
            }],
            ..AnalysisResult::default()
        }));
        let (mut app, mut rx) = app_with(api);
        app.trigger_refresh();
        let completion = rx.recv().await.expect("market completion");
        app.on_completion(completion);
        app.handle_key_event(key(KeyCode::Char('a')));
        let completion = rx.recv().await.expect("analysis completion");
        app.on_completion(completion);

        app.handle_key_event(key(KeyCode::Char('3')));
        let screen = draw(&mut app);
        assert!(screen.contains("Short Put Spread"));
        assert!(screen.contains("✓ Ready"));
        assert!(screen.contains("Net Credit/Debit: +$50"));
        assert!(screen.contains("Win Probability: 75.00%"));
        assert!(screen.contains("Max Risk: $950"));
    }

    #[test]
    fn positions_tab_without_analysis_shows_empty_state() {
        let (mut app, _rx) = app_with(ScriptedApi::default());
        app.handle_key_event(key(KeyCode::Char('3')));
        assert_eq!(app.tab, Tab::Positions);
        let screen = draw(&mut app);
        assert!(screen.contains("No Positions Available"));
    }

    #[test]
    fn exit_requires_confirmation() {
        let (mut app, _rx) = app_with(ScriptedApi::default());
        assert!(!app.handle_key_event(key(KeyCode::Char('q'))));
        assert!(app.exit_confirmation);
        assert!(!app.handle_key_event(key(KeyCode::Char('n'))));
        assert!(!app.exit_confirmation);
        app.handle_key_event(key(KeyCode::Char('q')));
        assert!(app.handle_key_event(key(KeyCode::Enter)));
        assert!(app.handle_key_event(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
    }

    #[test]
    fn tab_cycling_wraps() {
        assert_eq!(Tab::Overview.shifted(-1), Tab::Assistant);
        assert_eq!(Tab::Assistant.shifted(1), Tab::Overview);
        assert_eq!(Tab::Analysis.shifted(1), Tab::Positions);
    }

    #[test]
    fn insight_error_replaces_sections() {
        let analysis = AnalysisResult {
            ai_insights: Some(AiInsights {
                error: Some("AI insights temporarily unavailable".to_string()),
                ..AiInsights::default()
            }),
            ..AnalysisResult::default()
        };
        let lines = insight_lines(&analysis);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].to_string(), "AI insights temporarily unavailable");
    }

    #[test]
    fn column_helpers_clip_and_pad() {
        assert_eq!(clip_to_width("Short Put Spread", 6), "Short…");
        assert_eq!(format_column_value("LOW", ColumnAlign::Left, 6), "LOW   ");
        assert_eq!(format_column_value("7", ColumnAlign::Right, 3), "  7");
        assert_eq!(visible_range(10, 3, 0), (0, 3));
        assert_eq!(visible_range(10, 3, 5), (3, 6));
        assert_eq!(visible_range(10, 3, 9), (7, 10));
        assert_eq!(visible_range(2, 5, 1), (0, 2));
    }
}
