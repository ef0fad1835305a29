use std::io::IsTerminal;
use std::path::PathBuf;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::error::{DashError, Result};
use crate::fmt::{compact, grams, kg, money, number, percent};
use crate::models::{ManagerSelection, ModelParameters, CONVERSION, PRICE, TRAFFIC};
use crate::session::{
    unrecognized_message, Evaluation, Report, Session, NO_FILE_MESSAGE, NO_WEIGHT_MESSAGE,
};
use crate::tui::{
    money_span, palette, run_view, wrap_text, View, ViewAction, ERROR_STYLE, EXPENSE_STYLE,
    FOOTER_STYLE, HEADER_STYLE, INFO_STYLE, REVENUE_STYLE, SELECTED_STYLE, WARNING_STYLE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Price,
    Traffic,
    Conversion,
    Managers,
}

const CONTROLS: [Control; 4] = [
    Control::Price,
    Control::Traffic,
    Control::Conversion,
    Control::Managers,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Trend,
    Product,
    Team,
}

const TABS: [Tab; 3] = [Tab::Trend, Tab::Product, Tab::Team];

const NORMAL_HINTS: &str =
    " Left/Right=control  Up/Down=adjust  Tab/1-3=view  m=managers  o=open  r=reload  q=quit";

impl Tab {
    fn title(&self) -> &'static str {
        match self {
            Tab::Trend => "1 Trend",
            Tab::Product => "2 Product",
            Tab::Team => "3 Team",
        }
    }

    fn index(&self) -> usize {
        TABS.iter().position(|t| t == self).unwrap_or(0)
    }

    fn shifted(&self, by: usize) -> Tab {
        TABS[(self.index() + by) % TABS.len()]
    }
}

enum Mode {
    Normal,
    /// Row 0 is "All", rows 1.. are the managers of the current file.
    Managers { cursor: usize },
    OpenFile { input: String },
}

pub struct Dashboard {
    session: Session,
    evaluation: Evaluation,
    control: usize,
    tab: Tab,
    mode: Mode,
    status_message: Option<String>,
}

pub fn run(file: Option<PathBuf>, params: ModelParameters) -> Result<()> {
    if !std::io::stdout().is_terminal() {
        return Err(DashError::Other(
            "the dashboard needs an interactive terminal; try `salesdash report all FILE`"
                .to_string(),
        ));
    }
    let mut session = Session::new(params);
    if let Some(file) = file {
        session.open(file);
    }
    let mut dashboard = Dashboard::new(session);
    run_view(&mut dashboard)
}

impl Dashboard {
    pub fn new(session: Session) -> Self {
        let mut dashboard = Self {
            session,
            evaluation: Evaluation::NoFile,
            control: 0,
            tab: Tab::Trend,
            mode: Mode::Normal,
            status_message: None,
        };
        dashboard.refresh();
        dashboard
    }

    fn refresh(&mut self) {
        self.evaluation = self.session.evaluate();
        let (hits, misses) = self.session.cache_stats();
        tracing::trace!(hits, misses, "dashboard refreshed");
    }

    fn managers(&self) -> Vec<String> {
        match &self.evaluation {
            Evaluation::Ready(report) => report.managers.clone(),
            _ => Vec::new(),
        }
    }

    fn step(&mut self, steps: i32) {
        let params = &mut self.session.params;
        match CONTROLS[self.control] {
            Control::Price => params.avg_price = PRICE.nudge(params.avg_price, steps),
            Control::Traffic => params.traffic_mult = TRAFFIC.nudge(params.traffic_mult, steps),
            Control::Conversion => params.conv_boost = CONVERSION.nudge(params.conv_boost, steps),
            Control::Managers => self.mode = Mode::Managers { cursor: 0 },
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) -> ViewAction {
        self.status_message = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Close,
            KeyCode::Left => self.control = (self.control + CONTROLS.len() - 1) % CONTROLS.len(),
            KeyCode::Right => self.control = (self.control + 1) % CONTROLS.len(),
            KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('=') => self.step(1),
            KeyCode::Down | KeyCode::Char('-') => self.step(-1),
            KeyCode::Tab => self.tab = self.tab.shifted(1),
            KeyCode::BackTab => self.tab = self.tab.shifted(TABS.len() - 1),
            KeyCode::Char('1') => self.tab = Tab::Trend,
            KeyCode::Char('2') => self.tab = Tab::Product,
            KeyCode::Char('3') => self.tab = Tab::Team,
            KeyCode::Char('m') => self.mode = Mode::Managers { cursor: 0 },
            KeyCode::Enter if CONTROLS[self.control] == Control::Managers => {
                self.mode = Mode::Managers { cursor: 0 }
            }
            KeyCode::Char('o') => {
                let input = self
                    .session
                    .file()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.mode = Mode::OpenFile { input };
            }
            KeyCode::Char('r') => {
                if self.session.file().is_some() {
                    self.session.reload();
                    self.status_message = Some("Reloaded.".to_string());
                }
            }
            _ => {}
        }
        ViewAction::Continue
    }

    fn handle_picker_key(&mut self, code: KeyCode, cursor: usize) {
        let managers = self.managers();
        let rows = managers.len() + 1;
        match code {
            KeyCode::Up => self.mode = Mode::Managers { cursor: cursor.saturating_sub(1) },
            KeyCode::Down => {
                self.mode = Mode::Managers {
                    cursor: (cursor + 1).min(rows - 1),
                }
            }
            KeyCode::Char(' ') => {
                let current = &self.session.params.managers;
                let picked = cursor.checked_sub(1).and_then(|i| managers.get(i));
                self.session.params.managers = match picked {
                    None => ManagerSelection::All,
                    Some(name) => current.toggle(name),
                };
            }
            KeyCode::Char('a') => self.session.params.managers = ManagerSelection::All,
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('q') => {
                self.mode = Mode::Normal
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, code: KeyCode, mut input: String) {
        match code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let trimmed = input.trim();
                if !trimmed.is_empty() {
                    let path = expand_home(trimmed);
                    self.status_message = Some(format!("Opened {}", path.display()));
                    self.session.open(path);
                }
            }
            KeyCode::Backspace => {
                input.pop();
                self.mode = Mode::OpenFile { input };
            }
            KeyCode::Char(c) => {
                input.push(c);
                self.mode = Mode::OpenFile { input };
            }
            _ => self.mode = Mode::OpenFile { input },
        }
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_controls(&self, frame: &mut Frame, area: Rect) {
        let params = &self.session.params;
        let mut spans = vec![Span::raw(" ")];
        for (i, control) in CONTROLS.iter().enumerate() {
            let text = match control {
                Control::Price => format!(" Price {} / kg ", money(params.avg_price)),
                Control::Traffic => format!(" Traffic x{:.1} ", params.traffic_mult),
                Control::Conversion => format!(" Conversion {:+.1} pp ", params.conv_boost),
                Control::Managers => format!(" Managers: {} ", params.managers.label()),
            };
            let style = if i == self.control {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            spans.push(Span::styled(text, style));
            spans.push(Span::raw("  "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_message(&self, frame: &mut Frame, area: Rect, message: &str, style: Style) {
        let (text, _) = wrap_text(message, area.width.saturating_sub(2) as usize);
        let lines: Vec<Line> = text
            .lines()
            .map(|l| Line::from(Span::styled(format!(" {l}"), style)))
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_report(&self, frame: &mut Frame, area: Rect, report: &Report) {
        let [metrics_area, tabs_area, content_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .areas(area);

        let kpi = &report.kpi;
        let columns: [Rect; 4] =
            Layout::horizontal([Constraint::Percentage(25); 4]).areas(metrics_area);
        let label_style = Style::default().add_modifier(Modifier::BOLD);
        let metrics = [
            ("Revenue (model)", money_span(kpi.modeled_revenue)),
            (
                "Expenses (actual)",
                Span::styled(money(kpi.total_expenses), EXPENSE_STYLE),
            ),
            ("Profit (estimate)", money_span(kpi.modeled_profit)),
            ("Sales volume", Span::raw(kg(kpi.modeled_kg))),
        ];
        for (column, (label, value)) in columns.iter().zip(metrics) {
            let lines = vec![
                Line::from(Span::styled(format!(" {label}"), label_style)),
                Line::from(vec![Span::raw(" "), value]),
            ];
            frame.render_widget(Paragraph::new(lines), *column);
        }

        let tabs = Tabs::new(TABS.iter().map(|t| t.title()))
            .select(self.tab.index())
            .highlight_style(SELECTED_STYLE)
            .padding(" ", " ");
        frame.render_widget(tabs, tabs_area);

        match self.tab {
            Tab::Trend => self.draw_trend(frame, content_area, report),
            Tab::Product => self.draw_weights(frame, content_area, report),
            Tab::Team => self.draw_team(frame, content_area, report),
        }
    }

    fn draw_trend(&self, frame: &mut Frame, area: Rect, report: &Report) {
        if report.trend.is_empty() {
            self.draw_message(frame, area, "No dated data.", INFO_STYLE);
            return;
        }
        let revenue: Vec<u64> = report
            .trend
            .iter()
            .map(|m| m.revenue.unwrap_or(0.0).max(0.0) as u64)
            .collect();
        let expenses: Vec<u64> = report
            .trend
            .iter()
            .map(|m| m.expenses.unwrap_or(0.0).max(0.0) as u64)
            .collect();

        let max_val = revenue.iter().chain(expenses.iter()).copied().max().unwrap_or(1) as f64;
        let (top_tick, mid_tick) = y_axis_ticks(max_val);
        let top_label = compact(top_tick);
        let mid_label = compact(mid_tick);
        let y_label_width = top_label.len().max(mid_label.len()) as u16 + 1;

        let [y_axis_area, bar_area] = Layout::horizontal([
            Constraint::Length(y_label_width),
            Constraint::Fill(1),
        ])
        .areas(area);

        // Title row on top, month labels at the bottom.
        let inner_height = bar_area.height.saturating_sub(2);
        let mid_row = inner_height / 2;
        let mut y_lines: Vec<Line> = vec![Line::from("")];
        for row in 0..inner_height {
            let label = if row == 0 {
                Some(&top_label)
            } else if row == mid_row {
                Some(&mid_label)
            } else {
                None
            };
            y_lines.push(match label {
                Some(label) => Line::from(Span::styled(
                    format!("{:>width$}", label, width = y_label_width as usize),
                    FOOTER_STYLE,
                )),
                None => Line::from(""),
            });
        }
        frame.render_widget(Paragraph::new(y_lines), y_axis_area);

        let groups: Vec<BarGroup> = report
            .trend
            .iter()
            .enumerate()
            .map(|(i, month)| {
                let bars = vec![
                    Bar::default()
                        .value(revenue[i])
                        .style(REVENUE_STYLE)
                        .text_value(String::new()),
                    Bar::default()
                        .value(expenses[i])
                        .style(EXPENSE_STYLE)
                        .text_value(String::new()),
                ];
                BarGroup::default()
                    .label(Line::from(short_month(&month.month)))
                    .bars(&bars)
            })
            .collect();

        let title = Line::from(vec![
            Span::styled("Revenue (model)", REVENUE_STYLE),
            Span::raw(" vs "),
            Span::styled("Expenses (actual)", EXPENSE_STYLE),
        ]);
        let block = Block::default()
            .title(title)
            .title_style(Style::default().add_modifier(Modifier::BOLD))
            .borders(Borders::NONE);
        let mut chart = BarChart::default()
            .block(block)
            .bar_width(3)
            .bar_gap(0)
            .group_gap(2)
            .max(top_tick as u64);
        for group in groups {
            chart = chart.data(group);
        }
        frame.render_widget(chart, bar_area);
    }

    fn draw_weights(&self, frame: &mut Frame, area: Rect, report: &Report) {
        let Some(buckets) = &report.weights else {
            self.draw_message(frame, area, NO_WEIGHT_MESSAGE, INFO_STYLE);
            return;
        };
        if buckets.is_empty() {
            self.draw_message(frame, area, "No write-offs in the selection.", INFO_STYLE);
            return;
        }
        let bar_room = area.width.saturating_sub(36) as f64;
        let mut lines = vec![Line::from(Span::styled(
            " Write-offs by weight (pcs)",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for (i, bucket) in buckets.iter().enumerate() {
            let width = (bucket.share_pct / 100.0 * bar_room).round() as usize;
            lines.push(Line::from(vec![
                Span::raw(format!(" {:>9}  ", grams(bucket.weight_g))),
                Span::styled("█".repeat(width.max(1)), Style::default().fg(palette(i))),
                Span::raw(format!(
                    "  {} pcs  {}",
                    number(bucket.qty),
                    percent(bucket.share_pct)
                )),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_team(&self, frame: &mut Frame, area: Rect, report: &Report) {
        if report.breakdown.is_empty() {
            self.draw_message(frame, area, "No expenses with a manager.", INFO_STYLE);
            return;
        }
        let manager_width = report
            .breakdown
            .iter()
            .map(|r| r.manager.chars().count())
            .max()
            .unwrap_or(10);
        let category_width = report
            .breakdown
            .iter()
            .map(|r| r.category.chars().count())
            .max()
            .unwrap_or(10);
        let mut categories: Vec<&str> = Vec::new();
        for row in &report.breakdown {
            if !categories.contains(&row.category.as_str()) {
                categories.push(&row.category);
            }
        }

        let max_amount = report
            .breakdown
            .iter()
            .map(|r| r.amount)
            .fold(0.0_f64, f64::max);
        let used = (manager_width + category_width + 20) as u16;
        let bar_room = area.width.saturating_sub(used) as f64;

        let mut lines = vec![Line::from(Span::styled(
            " Top expenses by manager",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for row in report.breakdown.iter().take(area.height.saturating_sub(1) as usize) {
            let color = categories
                .iter()
                .position(|c| *c == row.category)
                .map(palette)
                .unwrap_or(Color::Gray);
            let width = if max_amount > 0.0 {
                (row.amount.max(0.0) / max_amount * bar_room).round() as usize
            } else {
                0
            };
            lines.push(Line::from(vec![
                Span::raw(format!(
                    " {:<mw$}  {:<cw$}  ",
                    row.manager,
                    row.category,
                    mw = manager_width,
                    cw = category_width
                )),
                Span::styled(format!("{:>14}", money(row.amount)), EXPENSE_STYLE),
                Span::raw("  "),
                Span::styled("█".repeat(width), Style::default().fg(color)),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_picker(&self, frame: &mut Frame, area: Rect, cursor: usize) {
        let selection = &self.session.params.managers;
        let mut lines = vec![Line::from(Span::styled(
            " Managers",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        let mut rows = vec![("All".to_string(), selection.is_all())];
        for name in self.managers() {
            let checked = !selection.is_all() && selection.contains(&name);
            rows.push((name, checked));
        }
        for (i, (name, checked)) in rows.iter().enumerate() {
            let mark = if *checked { "[x]" } else { "[ ]" };
            let style = if i == cursor {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!(" {mark} {name}"), style)));
        }
        if rows.len() == 1 {
            lines.push(Line::from(Span::styled(
                " No managers in the current file.",
                FOOTER_STYLE,
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn footer(&self) -> Line<'static> {
        match &self.mode {
            Mode::OpenFile { input } => Line::from(vec![
                Span::styled(" Open file: ", HEADER_STYLE),
                Span::raw(format!("{input}_")),
            ]),
            Mode::Managers { .. } => Line::from(Span::styled(
                " Up/Down=move  Space=toggle  a=all  Enter=done",
                FOOTER_STYLE,
            )),
            Mode::Normal => match &self.status_message {
                Some(msg) => Line::from(Span::styled(format!(" {msg}"), WARNING_STYLE)),
                None => Line::from(Span::styled(
                    NORMAL_HINTS,
                    FOOTER_STYLE,
                )),
            },
        }
    }
}

impl View for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, sep1, controls_area, sep2, body_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let file = self
            .session
            .file()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "no file".to_string());
        frame.render_widget(
            Paragraph::new(format!(" Sales dashboard: {file}")).style(HEADER_STYLE),
            header_area,
        );

        let sep_line = "━".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(border_style);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget, sep2);

        self.draw_controls(frame, controls_area);

        if let Mode::Managers { cursor } = self.mode {
            self.draw_picker(frame, body_area, cursor);
        } else {
            match &self.evaluation {
                Evaluation::NoFile => {
                    self.draw_message(frame, body_area, NO_FILE_MESSAGE, INFO_STYLE)
                }
                Evaluation::LoadFailed(msg) => {
                    self.draw_message(frame, body_area, msg, ERROR_STYLE)
                }
                Evaluation::Unrecognized => {
                    self.draw_message(frame, body_area, &unrecognized_message(), WARNING_STYLE)
                }
                Evaluation::Ready(report) => self.draw_report(frame, body_area, report),
            }
        }

        frame.render_widget(Paragraph::new(self.footer()), hints_area);
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let action = match mode {
            Mode::Normal => self.handle_normal_key(code),
            Mode::Managers { cursor } => {
                self.mode = Mode::Managers { cursor };
                self.handle_picker_key(code, cursor);
                ViewAction::Continue
            }
            Mode::OpenFile { input } => {
                self.handle_prompt_key(code, input);
                ViewAction::Continue
            }
        };
        self.refresh();
        action
    }
}

fn expand_home(input: &str) -> PathBuf {
    match (input.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(input),
    }
}

/// `2025-01` -> `01/25`
fn short_month(month: &str) -> String {
    match month.split_once('-') {
        Some((year, m)) if year.len() == 4 => format!("{m}/{}", &year[2..]),
        _ => month.to_string(),
    }
}

/// Round axis ticks: 1, 2.5, 5 times a power of ten.
fn y_axis_ticks(max_val: f64) -> (f64, f64) {
    if !max_val.is_finite() || max_val <= 1.0 {
        return (1.0, 0.5);
    }
    let mut base = 1.0;
    loop {
        for m in [1.0, 2.5, 5.0] {
            let step = m * base;
            if step >= max_val {
                return (step, step / 2.0);
            }
        }
        base *= 10.0;
    }
}
