use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, List, ListItem, Paragraph,
        Row, Table, Tabs, Wrap,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tui_big_text::{BigText, PixelSize};

use crate::analytics::{fetch_bundle, AnalyticsBundle, AnalyticsPanel};
use crate::api::ApiClient;
use crate::catalog::{CatalogLoader, EtfPicker};
use crate::chart::PlotSpec;
use crate::correlation::{CorrelationPanel, GroupView, HIGH_CORRELATION_THRESHOLD, LEGEND};
use crate::dictionary::{CategoryStyle, DictionaryPanel, DictionaryView, TermCard};
use crate::error::{ApiError, ApiErrorKind, ValidationError};
use crate::holdings::{validate_new, HoldingsPanel, HoldingsView, EMPTY_MESSAGE};
use crate::model::{
    AllTerms, CatalogPage, CategoryTerms, CorrelationReport, Etf, NewEtf, PortfolioSummary,
    Recommendations, TermSearchResults,
};
use crate::recommend::{
    RecTab, RecommendPanel, RecommendView, ANALYZING_MESSAGE, EMPTY_TAB_MESSAGE,
};
use crate::summary::{SummaryPanel, Tone};
use crate::Config;

pub const PERIODS: &[&str] = &["1mo", "3mo", "6mo", "1y", "2y", "5y"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    Holdings,
    Analytics,
    Recommend,
    Correlation,
    Dictionary,
}

impl Tab {
    fn title(self) -> &'static str {
        match self {
            Tab::Holdings => "Holdings",
            Tab::Analytics => "Analytics",
            Tab::Recommend => "Recommend",
            Tab::Correlation => "Correlation",
            Tab::Dictionary => "Dictionary",
        }
    }

    fn all() -> &'static [Tab] {
        &[
            Tab::Holdings,
            Tab::Analytics,
            Tab::Recommend,
            Tab::Correlation,
            Tab::Dictionary,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddFocus {
    Ticker,
    Name,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmAction {
    Delete(String),
    Add(NewEtf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    AddEtf,
    Picker,
    Search,
    Confirm(ConfirmAction),
}

/// Outcome of a mutating action. Errors pop up, info lands in the footer.
#[derive(Debug, Clone)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Completions of background fetch tasks.
pub enum AppEvent {
    Holdings(Result<Vec<Etf>, ApiError>),
    Summary(Result<PortfolioSummary, ApiError>),
    CatalogPage(Result<CatalogPage, ApiError>),
    CatalogTick,
    Analytics(Result<AnalyticsBundle, ApiError>),
    Recommendations(Result<Recommendations, ApiError>),
    Correlation(Result<CorrelationReport, ApiError>),
    DictSearch(Result<TermSearchResults, ApiError>),
    DictAll(Result<AllTerms, ApiError>),
    DictCategory(Result<CategoryTerms, ApiError>),
    AddDone(Result<Etf, ApiError>),
    DeleteDone(Result<(), ApiError>),
}

pub struct App {
    pub current_tab: Tab,
    pub mode: AppMode,
    pub should_quit: bool,

    api: Arc<ApiClient>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,

    pub holdings: HoldingsPanel,
    pub summary: SummaryPanel,
    pub catalog: CatalogLoader,
    pub picker: Option<EtfPicker>,
    pub analytics: AnalyticsPanel,
    pub recommend: RecommendPanel,
    pub correlation: CorrelationPanel,
    pub dictionary: DictionaryPanel,

    pub chart_ticker: Option<String>,
    period_index: usize,
    pub notice: Option<Notice>,

    pub ticker_input: String,
    pub name_input: String,
    pub add_focus: AddFocus,

    dict_categories: Vec<String>,
    dict_category_index: usize,

    page_delay: Duration,
    rec_category: String,
    rec_limit: usize,
}

impl App {
    pub fn new(api: Arc<ApiClient>, cfg: &Config) -> App {
        let (tx, rx) = mpsc::unbounded_channel();
        let period_index = PERIODS
            .iter()
            .position(|p| *p == cfg.default_period)
            .unwrap_or(3);
        App {
            current_tab: Tab::Holdings,
            mode: AppMode::Normal,
            should_quit: false,
            api,
            tx,
            rx,
            holdings: HoldingsPanel::default(),
            summary: SummaryPanel::default(),
            catalog: CatalogLoader::new(cfg.catalog_page_size, cfg.catalog_max_records),
            picker: None,
            analytics: AnalyticsPanel::default(),
            recommend: RecommendPanel::default(),
            correlation: CorrelationPanel::default(),
            dictionary: DictionaryPanel::default(),
            chart_ticker: None,
            period_index,
            notice: None,
            ticker_input: String::new(),
            name_input: String::new(),
            add_focus: AddFocus::Ticker,
            dict_categories: Vec::new(),
            dict_category_index: 0,
            page_delay: Duration::from_millis(cfg.catalog_page_delay_ms),
            rec_category: "all".to_string(),
            rec_limit: 5,
        }
    }

    pub fn period(&self) -> &'static str {
        PERIODS[self.period_index]
    }

    fn next_period(&mut self) {
        self.period_index = (self.period_index + 1) % PERIODS.len();
    }

    fn previous_period(&mut self) {
        self.period_index = (self.period_index + PERIODS.len() - 1) % PERIODS.len();
    }

    /// Initial loads on startup: holdings, summary, the catalog chain and
    /// the full glossary. The remaining panels load on first visit.
    pub fn bootstrap(&mut self) {
        self.spawn_holdings();
        self.spawn_summary();
        self.trigger_catalog();
        self.dictionary.begin();
        self.spawn_dict_all();
    }

    fn spawn_holdings(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Holdings(api.holdings().await));
        });
    }

    fn spawn_summary(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Summary(api.portfolio_summary().await));
        });
    }

    fn trigger_catalog(&mut self) {
        if let Some(req) = self.catalog.next_request() {
            let api = Arc::clone(&self.api);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(AppEvent::CatalogPage(
                    api.catalog_page(req.limit, req.offset).await,
                ));
            });
        }
    }

    // Continuation pages wait a beat so paging does not hammer the server.
    fn schedule_catalog_tick(&self) {
        let tx = self.tx.clone();
        let delay = self.page_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::CatalogTick);
        });
    }

    fn refresh_analytics(&mut self) {
        let Some(ticker) = self.chart_ticker.clone() else {
            self.notice = Some(Notice::Info(ValidationError::NoTickerSelected.to_string()));
            return;
        };
        self.analytics.begin();
        let period = self.period().to_string();
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Analytics(
                fetch_bundle(&api, &ticker, &period).await,
            ));
        });
    }

    fn request_recommendations(&mut self) {
        self.recommend.begin();
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let category = self.rec_category.clone();
        let period = self.period().to_string();
        let limit = self.rec_limit;
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Recommendations(
                api.recommendations(&category, &period, limit).await,
            ));
        });
    }

    fn refresh_correlation(&mut self) {
        self.correlation.begin();
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let period = self.period().to_string();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Correlation(api.correlation(&period).await));
        });
    }

    fn spawn_dict_all(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::DictAll(api.all_terms().await));
        });
    }

    fn run_dict_search(&mut self) {
        let query = self.dictionary.query.trim().to_string();
        self.dictionary.begin();
        if query.is_empty() {
            // An empty query is not a search: back to the full listing.
            self.spawn_dict_all();
            return;
        }
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::DictSearch(api.search_terms(&query).await));
        });
    }

    fn cycle_dict_category(&mut self) {
        if self.dict_categories.is_empty() {
            return;
        }
        // Slot 0 is the aggregated all-categories view.
        self.dict_category_index =
            (self.dict_category_index + 1) % (self.dict_categories.len() + 1);
        self.dictionary.begin();
        if self.dict_category_index == 0 {
            self.spawn_dict_all();
            return;
        }
        let category = self.dict_categories[self.dict_category_index - 1].clone();
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::DictCategory(api.category_terms(&category).await));
        });
    }

    fn submit_add(&mut self, etf: NewEtf) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::AddDone(api.add_etf(&etf).await));
        });
    }

    fn submit_delete(&mut self, ticker: String) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::DeleteDone(api.delete_etf(&ticker).await));
        });
    }

    /// Drains completed fetches without blocking the draw loop.
    pub fn try_receive(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Holdings(Ok(list)) => {
                self.holdings.apply(list);
                if self.chart_ticker.is_none() {
                    self.chart_ticker = self
                        .holdings
                        .holdings()
                        .first()
                        .map(|etf| etf.ticker.clone());
                }
            }
            AppEvent::Holdings(Err(e)) => self.holdings.fail(e.to_string()),
            AppEvent::Summary(Ok(summary)) => self.summary.apply(summary),
            AppEvent::Summary(Err(e)) => self.summary.fail(e.to_string()),
            AppEvent::CatalogPage(Ok(page)) => {
                self.catalog.apply_page(page);
                // The picker is constructed from the first page only; later
                // pages merge in without touching filter or selection.
                match &mut self.picker {
                    Some(picker) => picker.merge(self.catalog.etfs()),
                    None => self.picker = Some(EtfPicker::new(self.catalog.etfs())),
                }
                if self.catalog.wants_more() {
                    self.schedule_catalog_tick();
                }
            }
            AppEvent::CatalogPage(Err(e)) => {
                self.catalog.abort();
                self.notice = Some(Notice::Error(format!("Catalog load failed: {e}")));
            }
            AppEvent::CatalogTick => self.trigger_catalog(),
            AppEvent::Analytics(Ok(bundle)) => self.analytics.apply(bundle),
            AppEvent::Analytics(Err(_)) => self.analytics.fail(),
            AppEvent::Recommendations(Ok(recs)) => self.recommend.apply(recs),
            AppEvent::Recommendations(Err(e)) => self.recommend.fail(e.to_string()),
            AppEvent::Correlation(Ok(report)) => self.correlation.apply(report),
            AppEvent::Correlation(Err(e)) => self.correlation.fail(&e),
            AppEvent::DictSearch(Ok(results)) => self.dictionary.apply_search(results),
            AppEvent::DictSearch(Err(e)) => self.dictionary.fail(e.to_string()),
            AppEvent::DictAll(Ok(all)) => {
                self.dict_categories = all.categories.clone();
                self.dict_category_index = 0;
                self.dictionary.apply_all(all);
            }
            AppEvent::DictAll(Err(e)) => self.dictionary.fail(e.to_string()),
            AppEvent::DictCategory(Ok(payload)) => self.dictionary.apply_category(payload),
            AppEvent::DictCategory(Err(e)) => self.dictionary.fail(e.to_string()),
            AppEvent::AddDone(result) => self.on_add_done(result),
            AppEvent::DeleteDone(result) => self.on_delete_done(result),
        }
    }

    fn on_add_done(&mut self, result: Result<Etf, ApiError>) {
        match result {
            Ok(etf) => {
                self.ticker_input.clear();
                self.name_input.clear();
                self.notice = Some(Notice::Info(format!("{} added.", etf.ticker)));
                self.spawn_holdings();
                self.spawn_summary();
            }
            // A duplicate is not worth an error popup.
            Err(e) if e.kind() == Some(ApiErrorKind::AlreadyRegistered) => {
                self.notice = Some(Notice::Info("Already in your holdings.".to_string()));
            }
            Err(e) => {
                // Adds surface the server-provided detail verbatim.
                let message = e
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Failed to add ETF: {e}"));
                self.notice = Some(Notice::Error(message));
            }
        }
    }

    fn on_delete_done(&mut self, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                self.notice = Some(Notice::Info("ETF deleted.".to_string()));
                self.spawn_holdings();
                self.spawn_summary();
            }
            // Deletes only ever show the generic message.
            Err(_) => self.notice = Some(Notice::Error("Failed to delete ETF.".to_string())),
        }
    }

    fn set_tab(&mut self, tab: Tab) {
        self.current_tab = tab;
        // First visit kicks off the panel's initial fetch.
        match tab {
            Tab::Recommend => {
                if matches!(self.recommend.view(), RecommendView::NotLoaded) {
                    self.request_recommendations();
                }
            }
            Tab::Correlation => {
                if self.correlation.views().is_empty()
                    && !self.correlation.is_loading()
                    && self.correlation.error().is_none()
                {
                    self.refresh_correlation();
                }
            }
            _ => {}
        }
    }

    fn next_tab(&mut self) {
        let tabs = Tab::all();
        let i = tabs
            .iter()
            .position(|&t| t == self.current_tab)
            .unwrap_or(0);
        self.set_tab(tabs[(i + 1) % tabs.len()]);
    }

    fn previous_tab(&mut self) {
        let tabs = Tab::all();
        let i = tabs
            .iter()
            .position(|&t| t == self.current_tab)
            .unwrap_or(0);
        self.set_tab(tabs[(i + tabs.len() - 1) % tabs.len()]);
    }

    fn refresh_current(&mut self) {
        match self.current_tab {
            Tab::Holdings => {
                self.spawn_holdings();
                self.spawn_summary();
                // Restart the catalog chain too; the picker keeps its
                // options and merges the fresh pages in.
                self.catalog.reset();
                self.trigger_catalog();
            }
            Tab::Analytics => self.refresh_analytics(),
            Tab::Recommend => self.request_recommendations(),
            Tab::Correlation => self.refresh_correlation(),
            Tab::Dictionary => {
                self.dictionary.begin();
                self.spawn_dict_all();
            }
        }
    }

    fn handle_key_normal(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.notice = None,
            KeyCode::Char('h') | KeyCode::Left => self.previous_tab(),
            KeyCode::Char('l') | KeyCode::Right => self.next_tab(),
            KeyCode::Char('1') => self.set_tab(Tab::Holdings),
            KeyCode::Char('2') => self.set_tab(Tab::Analytics),
            KeyCode::Char('3') => self.set_tab(Tab::Recommend),
            KeyCode::Char('4') => self.set_tab(Tab::Correlation),
            KeyCode::Char('5') => self.set_tab(Tab::Dictionary),
            KeyCode::Char('r') => self.refresh_current(),
            KeyCode::Char('[') => self.previous_period(),
            KeyCode::Char(']') => self.next_period(),
            KeyCode::Char('j') | KeyCode::Down => match self.current_tab {
                Tab::Holdings => self.holdings.select_next(),
                Tab::Recommend => self.recommend.select_next(),
                Tab::Dictionary => self.dictionary.select_next(),
                _ => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.current_tab {
                Tab::Holdings => self.holdings.select_previous(),
                Tab::Recommend => self.recommend.select_previous(),
                Tab::Dictionary => self.dictionary.select_previous(),
                _ => {}
            },
            KeyCode::Tab => {
                if self.current_tab == Tab::Recommend {
                    self.recommend.next_tab();
                } else {
                    self.next_tab();
                }
            }
            KeyCode::Char('a') => match self.current_tab {
                Tab::Holdings => {
                    self.mode = AppMode::AddEtf;
                    self.add_focus = AddFocus::Ticker;
                }
                Tab::Recommend => {
                    if let Some(etf) = self.recommend.selected_etf() {
                        self.mode = AppMode::Confirm(ConfirmAction::Add(NewEtf::new(
                            etf.ticker.clone(),
                            etf.name.clone(),
                        )));
                    }
                }
                _ => {}
            },
            KeyCode::Char('d') => {
                if self.current_tab == Tab::Holdings {
                    if let Some(etf) = self.holdings.selected_etf() {
                        self.mode = AppMode::Confirm(ConfirmAction::Delete(etf.ticker.clone()));
                    }
                }
            }
            KeyCode::Char('p') => {
                if self.current_tab == Tab::Analytics {
                    if self.picker.is_some() {
                        self.mode = AppMode::Picker;
                    } else {
                        self.notice =
                            Some(Notice::Info("Catalog is still loading...".to_string()));
                    }
                }
            }
            KeyCode::Char('/') => {
                if self.current_tab == Tab::Dictionary {
                    self.mode = AppMode::Search;
                }
            }
            KeyCode::Char('c') => {
                if self.current_tab == Tab::Dictionary {
                    self.cycle_dict_category();
                }
            }
            KeyCode::Enter => {
                if self.current_tab == Tab::Holdings {
                    let ticker = self.holdings.selected_etf().map(|e| e.ticker.clone());
                    if let Some(ticker) = ticker {
                        self.chart_ticker = Some(ticker);
                        self.set_tab(Tab::Analytics);
                        self.refresh_analytics();
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_key_add(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.mode = AppMode::Normal,
            KeyCode::Tab => {
                self.add_focus = match self.add_focus {
                    AddFocus::Ticker => AddFocus::Name,
                    AddFocus::Name => AddFocus::Ticker,
                };
            }
            KeyCode::Enter => match validate_new(&self.ticker_input, &self.name_input) {
                Ok(new) => {
                    self.mode = AppMode::Normal;
                    self.submit_add(new);
                }
                Err(e) => self.notice = Some(Notice::Error(e.to_string())),
            },
            KeyCode::Backspace => {
                match self.add_focus {
                    AddFocus::Ticker => self.ticker_input.pop(),
                    AddFocus::Name => self.name_input.pop(),
                };
            }
            KeyCode::Char(c) => match self.add_focus {
                AddFocus::Ticker => self.ticker_input.push(c),
                AddFocus::Name => self.name_input.push(c),
            },
            _ => {}
        }
    }

    fn handle_key_picker(&mut self, code: KeyCode) {
        let Some(picker) = &mut self.picker else {
            self.mode = AppMode::Normal;
            return;
        };
        match code {
            KeyCode::Esc => self.mode = AppMode::Normal,
            KeyCode::Down => picker.select_next(),
            KeyCode::Up => picker.select_previous(),
            KeyCode::Backspace => picker.pop_filter(),
            KeyCode::Enter => {
                let ticker = picker.selected_etf().map(|e| e.ticker.clone());
                if let Some(ticker) = ticker {
                    self.chart_ticker = Some(ticker);
                    self.mode = AppMode::Normal;
                    self.refresh_analytics();
                }
            }
            KeyCode::Char(c) => picker.push_filter(c),
            _ => {}
        }
    }

    fn handle_key_search(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.mode = AppMode::Normal,
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                self.run_dict_search();
            }
            KeyCode::Backspace => {
                self.dictionary.query.pop();
            }
            KeyCode::Char(c) => self.dictionary.query.push(c),
            _ => {}
        }
    }

    fn handle_key_confirm(&mut self, code: KeyCode, action: ConfirmAction) {
        match code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.mode = AppMode::Normal;
                match action {
                    ConfirmAction::Delete(ticker) => self.submit_delete(ticker),
                    ConfirmAction::Add(new) => self.submit_add(new),
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.mode = AppMode::Normal,
            _ => {}
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match self.mode.clone() {
            AppMode::Normal => self.handle_key_normal(code),
            AppMode::AddEtf => self.handle_key_add(code),
            AppMode::Picker => self.handle_key_picker(code),
            AppMode::Search => self.handle_key_search(code),
            AppMode::Confirm(action) => self.handle_key_confirm(code, action),
        }
    }
}

pub async fn run_tui(api: ApiClient, cfg: &Config) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(Arc::new(api), cfg);
    app.bootstrap();

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        app.try_receive();

        if crossterm::event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let tab_titles: Vec<Line> = Tab::all()
        .iter()
        .map(|t| {
            let style = if *t == app.current_tab {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(t.title(), style))
        })
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("ETFolio (period: {})", app.period())),
        )
        .style(Style::default().fg(Color::White))
        .select(
            Tab::all()
                .iter()
                .position(|&t| t == app.current_tab)
                .unwrap_or(0),
        );
    f.render_widget(tabs, chunks[0]);

    match app.current_tab {
        Tab::Holdings => render_holdings_tab(f, chunks[1], app),
        Tab::Analytics => render_analytics_tab(f, chunks[1], app),
        Tab::Recommend => render_recommend_tab(f, chunks[1], app),
        Tab::Correlation => render_correlation_tab(f, chunks[1], app),
        Tab::Dictionary => render_dictionary_tab(f, chunks[1], app),
    }

    render_footer(f, chunks[2], app);

    match &app.mode {
        AppMode::AddEtf => render_add_dialog(f, app),
        AppMode::Picker => render_picker_dialog(f, app),
        AppMode::Confirm(action) => render_confirm_dialog(f, action),
        _ => {}
    }

    if let Some(Notice::Error(message)) = &app.notice {
        render_error_popup(f, message);
    }
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let (loaded, total) = app.catalog.progress();
    let mut spans = vec![Span::styled(
        format!(" catalog {loaded}/{total} "),
        Style::default().fg(Color::DarkGray),
    )];
    if app.catalog.is_loading() {
        spans.push(Span::styled(
            "loading...",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(Notice::Info(message)) = &app.notice {
        spans.push(Span::styled(
            format!("  {message}"),
            Style::default().fg(Color::Cyan),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_loading(f: &mut Frame, area: Rect, what: &str) {
    let loading = Paragraph::new(format!("Loading {what}..."))
        .block(Block::default().borders(Borders::ALL).title("Loading"))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(loading, area);
}

fn render_message(f: &mut Frame, area: Rect, title: &str, message: &str, color: Color) {
    let paragraph = Paragraph::new(message)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn tone_color(tone: Option<Tone>) -> Color {
    match tone {
        Some(Tone::Positive) => Color::Green,
        Some(Tone::Negative) => Color::Red,
        None => Color::White,
    }
}

fn render_holdings_tab(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    // Current portfolio value, front and center.
    let value_text = app
        .summary
        .summary()
        .map(|s| crate::summary::format_currency(s.current_value))
        .unwrap_or_else(|| "-".to_string());
    let big_text = BigText::builder()
        .pixel_size(PixelSize::Quadrant)
        .style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .lines(vec![value_text.into()])
        .build();
    let value_block = Block::default()
        .borders(Borders::ALL)
        .title("Current Value")
        .title_alignment(Alignment::Center);
    f.render_widget(&value_block, chunks[0]);
    f.render_widget(
        big_text,
        chunks[0].inner(Margin {
            horizontal: 2,
            vertical: 1,
        }),
    );

    // The five summary figures.
    if let Some(error) = app.summary.error() {
        render_message(f, chunks[1], "Summary", error, Color::Red);
    } else {
        let items: Vec<ListItem> = app
            .summary
            .rows()
            .into_iter()
            .map(|(label, value, tone)| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{label:<18}"), Style::default().fg(Color::White)),
                    Span::styled(value, Style::default().fg(tone_color(tone))),
                ]))
            })
            .collect();
        let list =
            List::new(items).block(Block::default().borders(Borders::ALL).title("Summary"));
        f.render_widget(list, chunks[1]);
    }

    match app.holdings.view() {
        HoldingsView::Loading => render_loading(f, chunks[2], "holdings"),
        HoldingsView::Empty => {
            render_message(f, chunks[2], "Holdings", EMPTY_MESSAGE, Color::Gray)
        }
        HoldingsView::Error(error) => render_message(f, chunks[2], "Holdings", error, Color::Red),
        HoldingsView::List(list) => {
            let header = Row::new(["Ticker", "Name", "Market", "Category"].map(|h| {
                Cell::from(h).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            }))
            .height(1)
            .bottom_margin(1);
            let rows = list.iter().enumerate().map(|(i, etf)| {
                let style = if i == app.holdings.selected {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(etf.ticker.clone()),
                    Cell::from(etf.name.clone()),
                    Cell::from(etf.market.clone().unwrap_or_else(|| "-".to_string())),
                    Cell::from(etf.category.clone().unwrap_or_else(|| "-".to_string())),
                ])
                .style(style)
            });
            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(15),
                    Constraint::Percentage(45),
                    Constraint::Percentage(20),
                    Constraint::Percentage(20),
                ],
            )
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Holdings"));
            f.render_widget(table, chunks[2]);
        }
    }

    let help = Paragraph::new(
        "j/k select | Enter charts | a add | d delete | r refresh | h/l tabs | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"))
    .style(Style::default().fg(Color::Gray))
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[3]);
}

fn render_analytics_tab(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let title = match &app.chart_ticker {
        Some(ticker) => format!("Analytics: {ticker} ({})", app.period()),
        None => "Analytics".to_string(),
    };

    if let Some(error) = app.analytics.error() {
        render_message(f, chunks[0], &title, error, Color::Red);
    } else if app.analytics.is_loading() {
        render_loading(f, chunks[0], "analytics");
    } else if let Some(bundle) = app.analytics.bundle() {
        // Two metrics per line, four lines.
        let rows = crate::analytics::metric_rows(&bundle.analytics);
        let lines: Vec<Line> = rows
            .chunks(2)
            .map(|pair| {
                let mut spans = Vec::new();
                for (label, value) in pair {
                    spans.push(Span::styled(
                        format!("{label:<16}"),
                        Style::default().fg(Color::White),
                    ));
                    spans.push(Span::styled(
                        format!("{value:>14}   "),
                        Style::default().fg(Color::Cyan),
                    ));
                }
                Line::from(spans)
            })
            .collect();
        let paragraph =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(paragraph, chunks[0]);
    } else {
        render_message(
            f,
            chunks[0],
            &title,
            "Select an ETF (p to pick, or Enter on a holding) and press r.",
            Color::Gray,
        );
    }

    let chart_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(chunks[1]);

    let bundle = app.analytics.bundle();
    render_line_chart(f, chart_areas[0], "Price", bundle.map(|b| &b.price));
    render_line_chart(f, chart_areas[1], "Dividends", bundle.map(|b| &b.dividend));
    render_line_chart(
        f,
        chart_areas[2],
        "Cumulative Return",
        bundle.map(|b| &b.cumulative_return),
    );

    let help = Paragraph::new("p pick ETF | [ ] period | r refresh | h/l tabs | q quit")
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);
}

fn render_line_chart(f: &mut Frame, area: Rect, fallback_title: &str, spec: Option<&PlotSpec>) {
    let Some(spec) = spec else {
        render_message(f, area, fallback_title, "", Color::Gray);
        return;
    };
    if spec.is_empty() {
        render_message(f, area, fallback_title, "No data", Color::Gray);
        return;
    }

    let title = spec
        .title
        .clone()
        .unwrap_or_else(|| fallback_title.to_string());
    let (lo, hi) = spec.y_bounds();
    let point_sets: Vec<Vec<(f64, f64)>> = spec.traces.iter().map(|t| t.points()).collect();
    let colors = [Color::Cyan, Color::Yellow, Color::Magenta, Color::Green];
    let datasets: Vec<Dataset> = spec
        .traces
        .iter()
        .zip(&point_sets)
        .enumerate()
        .map(|(i, (trace, points))| {
            Dataset::default()
                .name(trace.name.clone().unwrap_or_default())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(colors[i % colors.len()]))
                .data(points)
        })
        .collect();

    let longest = spec.traces.iter().map(|t| t.x.len()).max().unwrap_or(1);
    let x_labels: Vec<Line> = spec
        .traces
        .first()
        .map(|t| {
            let mut labels = Vec::new();
            if let Some(first) = t.x.first() {
                labels.push(Line::from(first.clone()));
            }
            if let Some(last) = t.x.last() {
                labels.push(Line::from(last.clone()));
            }
            labels
        })
        .unwrap_or_default();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .bounds([0.0, longest.saturating_sub(1).max(1) as f64])
                .labels(x_labels)
                .style(Style::default().fg(Color::Gray)),
        )
        .y_axis(
            Axis::default()
                .bounds([lo, hi])
                .labels(vec![
                    Line::from(format!("{lo:.1}")),
                    Line::from(format!("{hi:.1}")),
                ])
                .style(Style::default().fg(Color::Gray)),
        );
    f.render_widget(chart, area);
}

fn render_recommend_tab(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let titles: Vec<Line> = RecTab::all().iter().map(|t| Line::from(t.title())).collect();
    let tab_bar = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Categories"))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .select(
            RecTab::all()
                .iter()
                .position(|&t| t == app.recommend.active_tab)
                .unwrap_or(0),
        );
    f.render_widget(tab_bar, chunks[0]);

    match app.recommend.view() {
        RecommendView::NotLoaded => render_message(
            f,
            chunks[1],
            "Recommendations",
            "Press r to analyze.",
            Color::Gray,
        ),
        RecommendView::Analyzing => render_message(
            f,
            chunks[1],
            "Recommendations",
            ANALYZING_MESSAGE,
            Color::Yellow,
        ),
        RecommendView::Empty => render_message(
            f,
            chunks[1],
            "Recommendations",
            EMPTY_TAB_MESSAGE,
            Color::Gray,
        ),
        RecommendView::Error(error) => {
            render_message(f, chunks[1], "Recommendations", error, Color::Red)
        }
        RecommendView::List(items) => {
            let header = Row::new(
                ["Ticker", "Name", "CAGR", "Volatility", "Sharpe", "Dividend"].map(|h| {
                    Cell::from(h).style(
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    )
                }),
            )
            .height(1)
            .bottom_margin(1);
            let rows = items.iter().enumerate().map(|(i, etf)| {
                let style = if i == app.recommend.selected {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                let cagr_color = if etf.cagr >= 0.0 {
                    Color::Green
                } else {
                    Color::Red
                };
                Row::new(vec![
                    Cell::from(etf.ticker.clone()),
                    Cell::from(etf.name.clone()),
                    Cell::from(format!("{:.2}%", etf.cagr)).style(Style::default().fg(cagr_color)),
                    Cell::from(format!("{:.2}%", etf.volatility)),
                    Cell::from(format!("{:.2}", etf.sharpe_ratio)),
                    Cell::from(format!("{:.2}%", etf.dividend_yield)),
                ])
                .style(style)
            });
            let title = match app.recommend.metadata() {
                Some(meta) => format!(
                    "{} (analyzed {} over {})",
                    app.recommend.active_tab.title(),
                    meta.total_analyzed,
                    meta.period
                ),
                None => app.recommend.active_tab.title().to_string(),
            };
            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(12),
                    Constraint::Percentage(38),
                    Constraint::Percentage(13),
                    Constraint::Percentage(13),
                    Constraint::Percentage(12),
                    Constraint::Percentage(12),
                ],
            )
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(table, chunks[1]);
        }
    }

    let help =
        Paragraph::new("Tab category | j/k select | a add to holdings | r re-analyze | q quit")
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);
}

fn heat_color(value: f64) -> Color {
    if value >= HIGH_CORRELATION_THRESHOLD {
        Color::Red
    } else if value >= 0.5 {
        Color::LightRed
    } else if value >= 0.3 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn render_correlation_tab(f: &mut Frame, area: Rect, app: &App) {
    if app.correlation.is_loading() {
        render_loading(f, area, "correlation analysis");
        return;
    }
    if let Some(error) = app.correlation.error() {
        let mut text = error.to_string();
        if let Some(hint) = app.correlation.hint() {
            text.push_str("\n\n");
            text.push_str(hint);
        }
        render_message(f, area, "Correlation", &text, Color::Red);
        return;
    }
    let views = app.correlation.views();
    if views.is_empty() {
        render_message(f, area, "Correlation", "Press r to analyze.", Color::Gray);
        return;
    }

    let mut constraints: Vec<Constraint> = views.iter().map(|_| Constraint::Min(8)).collect();
    constraints.push(Constraint::Length(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (view, chunk) in views.iter().zip(chunks.iter()) {
        match view {
            GroupView::Insufficient { name, message } => {
                render_message(f, *chunk, name, message, Color::Gray)
            }
            GroupView::Failed { name, error } => render_message(f, *chunk, name, error, Color::Red),
            GroupView::Full(group) => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                    .split(*chunk);

                let mut lines = vec![
                    Line::from(vec![
                        Span::styled(
                            format!("{} / 100 ", group.score),
                            Style::default()
                                .fg(Color::Green)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(group.rating.clone(), Style::default().fg(Color::Yellow)),
                    ]),
                    Line::from(group.advice.clone()),
                    Line::from(format!(
                        "avg {:.3} | max {:.3} | min {:.3}",
                        group.average, group.max, group.min
                    )),
                ];
                if !group.etf_names.is_empty() {
                    lines.push(Line::from(Span::styled(
                        group.etf_names.join(", "),
                        Style::default().fg(Color::Gray),
                    )));
                }
                if group.high_pairs.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "No highly correlated pairs.",
                        Style::default().fg(Color::Green),
                    )));
                } else {
                    for pair in &group.high_pairs {
                        lines.push(Line::from(Span::styled(
                            format!("{} / {}: {:.3}", pair.etf1, pair.etf2, pair.correlation),
                            Style::default().fg(Color::Red),
                        )));
                    }
                }
                let info = Paragraph::new(lines)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(group.name.clone()),
                    )
                    .wrap(Wrap { trim: true });
                f.render_widget(info, halves[0]);

                // One heatmap per group; the sanitized id keys the widget.
                let header = Row::new(
                    std::iter::once(Cell::from(""))
                        .chain(group.grid.labels.iter().map(|l| {
                            Cell::from(l.clone()).style(
                                Style::default()
                                    .fg(Color::Yellow)
                                    .add_modifier(Modifier::BOLD),
                            )
                        }))
                        .collect::<Vec<_>>(),
                )
                .height(1);
                let rows = group
                    .grid
                    .labels
                    .iter()
                    .zip(&group.grid.rows)
                    .map(|(label, row)| {
                        let mut cells = vec![Cell::from(label.clone()).style(
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        )];
                        for value in row {
                            cells.push(match value {
                                Some(v) => Cell::from(format!("{v:.2}"))
                                    .style(Style::default().fg(heat_color(*v))),
                                None => Cell::from("-"),
                            });
                        }
                        Row::new(cells).height(1)
                    });
                let n = group.grid.labels.len() + 1;
                let widths = vec![Constraint::Ratio(1, n as u32); n];
                let heatmap = Table::new(rows, widths).header(header).block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(group.heatmap_id.clone()),
                );
                f.render_widget(heatmap, halves[1]);
            }
        }
    }

    let legend = Paragraph::new(LEGEND.join("  |  "))
        .block(Block::default().borders(Borders::ALL).title("Legend"))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(legend, chunks[chunks.len() - 1]);
}

fn category_color(style: CategoryStyle) -> Color {
    match style {
        CategoryStyle::Slang => Color::Magenta,
        CategoryStyle::Etf => Color::Cyan,
        CategoryStyle::Indicator => Color::Yellow,
        CategoryStyle::Plain => Color::White,
    }
}

fn render_dictionary_tab(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    // Search/filter bar.
    let mut bar = vec![Span::styled(
        format!("[{}] ", app.dictionary.active_category()),
        Style::default().fg(Color::Yellow),
    )];
    if app.mode == AppMode::Search {
        bar.push(Span::styled(
            format!("/{}_", app.dictionary.query),
            Style::default().fg(Color::White),
        ));
    } else if let Some(label) = app.dictionary.result_label() {
        bar.push(Span::styled(
            label.to_string(),
            Style::default().fg(Color::Cyan),
        ));
    }
    let search_bar = Paragraph::new(Line::from(bar))
        .block(Block::default().borders(Borders::ALL).title("Dictionary"));
    f.render_widget(search_bar, chunks[0]);

    match app.dictionary.view() {
        DictionaryView::Loading => render_loading(f, chunks[1], "glossary"),
        DictionaryView::Empty(message) => {
            render_message(f, chunks[1], "Terms", message, Color::Gray)
        }
        DictionaryView::Error(error) => render_message(f, chunks[1], "Terms", error, Color::Red),
        DictionaryView::Terms(terms) => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
                .split(chunks[1]);

            let items: Vec<ListItem> = terms
                .iter()
                .enumerate()
                .map(|(i, term)| {
                    let style = if i == app.dictionary.selected {
                        Style::default().bg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    ListItem::new(term.term.clone()).style(style)
                })
                .collect();
            let list = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Terms ({})", terms.len())),
            );
            f.render_widget(list, halves[0]);

            if let Some(term) = terms.get(app.dictionary.selected) {
                let card = TermCard::build(term);
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        card.title.clone(),
                        Style::default()
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        card.category.clone(),
                        Style::default().fg(category_color(card.style)),
                    ),
                ])];
                lines.push(Line::from(""));
                lines.push(Line::from(card.description.clone()));
                for (label, text) in &card.sections {
                    lines.push(Line::from(""));
                    if label.is_empty() {
                        lines.push(Line::from(text.clone()));
                    } else {
                        lines.push(Line::from(vec![
                            Span::styled(
                                format!("{label}: "),
                                Style::default().fg(Color::Yellow),
                            ),
                            Span::raw(text.clone()),
                        ]));
                    }
                }
                let detail = Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL).title("Card"))
                    .wrap(Wrap { trim: true });
                f.render_widget(detail, halves[1]);
            }
        }
    }

    let help = Paragraph::new("/ search | c cycle category | j/k select | r reload | q quit")
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);
}

fn render_add_dialog(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Add ETF ")
        .title_alignment(Alignment::Center);
    f.render_widget(block, popup_area);

    let inner = popup_area.inner(Margin {
        horizontal: 2,
        vertical: 1,
    });
    let fields = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(inner);

    let field_style = |focused: bool| {
        if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        }
    };
    let ticker = Paragraph::new(app.ticker_input.clone()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(field_style(app.add_focus == AddFocus::Ticker))
            .title(" Ticker "),
    );
    f.render_widget(ticker, fields[0]);
    let name = Paragraph::new(app.name_input.clone()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(field_style(app.add_focus == AddFocus::Name))
            .title(" Name "),
    );
    f.render_widget(name, fields[1]);

    let hint = Paragraph::new("Tab: switch field | Enter: add | Esc: cancel")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);
    f.render_widget(hint, fields[2]);
}

fn render_picker_dialog(f: &mut Frame, app: &App) {
    let Some(picker) = &app.picker else { return };
    let popup_area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, popup_area);

    let (loaded, total) = app.catalog.progress();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Pick an ETF ({loaded}/{total} loaded) "))
        .title_alignment(Alignment::Center);
    f.render_widget(block, popup_area);

    let inner = popup_area.inner(Margin {
        horizontal: 2,
        vertical: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let filter = Paragraph::new(format!("{}_", picker.filter)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Filter "),
    );
    f.render_widget(filter, chunks[0]);

    let matches = picker.matches();
    let items: Vec<ListItem> = matches
        .iter()
        .enumerate()
        .map(|(i, etf)| {
            let style = if i == picker.selected.min(matches.len().saturating_sub(1)) {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}  {}", etf.ticker, etf.name)).style(style)
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} matches ", matches.len())),
    );
    f.render_widget(list, chunks[1]);
}

fn render_confirm_dialog(f: &mut Frame, action: &ConfirmAction) {
    let popup_area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, popup_area);

    let message = match action {
        ConfirmAction::Delete(ticker) => format!("Delete {ticker} from your holdings?"),
        ConfirmAction::Add(new) => format!("Add {} ({}) to your holdings?", new.name, new.ticker),
    };
    let paragraph = Paragraph::new(format!("{message}\n\ny/Enter: confirm | n/Esc: cancel"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Confirm ")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup_area);
}

fn render_error_popup(f: &mut Frame, error: &str) {
    let popup_area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, popup_area);

    let error_paragraph = Paragraph::new(format!("{error}\n\nEsc to dismiss"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Error")
                .style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(error_paragraph, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let api = ApiClient::new("http://localhost:8000/api/v1").unwrap();
        App::new(Arc::new(api), &Config::default())
    }

    fn page(tickers: &[&str], total: usize, has_more: bool) -> CatalogPage {
        CatalogPage {
            etfs: tickers
                .iter()
                .map(|t| Etf {
                    ticker: t.to_string(),
                    name: format!("{t} Fund"),
                    market: None,
                    category: None,
                })
                .collect(),
            total,
            has_more,
        }
    }

    #[tokio::test]
    async fn picker_is_constructed_once_and_merged_after() {
        let mut app = test_app();
        app.catalog.next_request();
        app.handle_event(AppEvent::CatalogPage(Ok(page(&["SPY"], 3, true))));
        assert!(app.picker.is_some());

        // User state in the picker survives the second page.
        app.picker.as_mut().unwrap().push_filter('s');
        app.catalog.next_request();
        app.handle_event(AppEvent::CatalogPage(Ok(page(&["QQQ", "SCHD"], 3, false))));
        let picker = app.picker.as_ref().unwrap();
        assert_eq!(picker.filter, "s");
        assert_eq!(picker.len(), 3);
    }

    #[tokio::test]
    async fn first_holdings_load_seeds_the_chart_ticker() {
        let mut app = test_app();
        app.handle_event(AppEvent::Holdings(Ok(vec![Etf {
            ticker: "SPY".to_string(),
            name: "SPDR S&P 500".to_string(),
            market: None,
            category: None,
        }])));
        assert_eq!(app.chart_ticker.as_deref(), Some("SPY"));
    }

    #[tokio::test]
    async fn duplicate_add_is_informational_not_an_error() {
        let mut app = test_app();
        app.handle_event(AppEvent::AddDone(Err(ApiError::Api {
            kind: ApiErrorKind::AlreadyRegistered,
            status: 400,
            detail: "already registered".to_string(),
        })));
        assert!(matches!(app.notice, Some(Notice::Info(_))));

        app.handle_event(AppEvent::AddDone(Err(ApiError::Api {
            kind: ApiErrorKind::Server,
            status: 500,
            detail: "upstream failure".to_string(),
        })));
        // Other add failures surface the server detail verbatim.
        match &app.notice {
            Some(Notice::Error(message)) => assert_eq!(message, "upstream failure"),
            other => panic!("expected error notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_failure_is_generic() {
        let mut app = test_app();
        app.handle_event(AppEvent::DeleteDone(Err(ApiError::Api {
            kind: ApiErrorKind::NotFound,
            status: 404,
            detail: "no such ETF".to_string(),
        })));
        match &app.notice {
            Some(Notice::Error(message)) => assert!(!message.contains("no such ETF")),
            other => panic!("expected error notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn analytics_refresh_requires_a_ticker() {
        let mut app = test_app();
        app.current_tab = Tab::Analytics;
        app.handle_key(KeyCode::Char('r'));
        assert!(matches!(app.notice, Some(Notice::Info(_))));
        assert!(!app.analytics.is_loading());
    }

    #[tokio::test]
    async fn period_cycles_through_known_values() {
        let mut app = test_app();
        let start = app.period();
        app.handle_key(KeyCode::Char(']'));
        assert_ne!(app.period(), start);
        app.handle_key(KeyCode::Char('['));
        assert_eq!(app.period(), start);
    }
}
