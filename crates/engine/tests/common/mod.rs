//! Scripted in-memory portal shared by the engine integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    portalbot_browser::{
        AccessLayer, BrowserError, BrowserSession, ElementHandle, Selector, SessionProvider,
    },
    portalbot_config::{DetailLabels, PortalSelectors, PortalbotConfig, TransitionLabels},
    portalbot_engine::Credentials,
};

pub const PORTAL_URL: &str = "https://portal.test/login";
pub const USERNAME: &str = "tecnico01";
pub const PASSWORD: &str = "s3gredo";
pub const HOME_TITLE: &str = "Work Order Management - Home";

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD)
}

/// Config with short timeouts so paused-clock tests stay readable.
pub fn test_config() -> PortalbotConfig {
    let mut config = PortalbotConfig::default();
    config.portal.url = PORTAL_URL.into();
    config.portal.login_timeout_ms = 2_000;
    config.portal.search_timeout_ms = 2_000;
    config.portal.field_timeout_ms = 500;
    config.browser.default_timeout_ms = 1_000;
    config.adaptive.min_timeout_ms = 500;
    config.adaptive.max_timeout_ms = 4_000;
    config.retry.max_retries = 3;
    config.retry.retry_base_delay_ms = 50;
    config.sessions.max_parallel_sessions = 2;
    config.sessions.session_deadline_ms = 60_000;
    config
}

// ── Portal data ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeOrder {
    pub id: String,
    pub cells: Vec<String>,
    /// Detail-view values keyed by field label.
    pub fields: HashMap<String, String>,
    /// Status cell text once the allocation sequence completes.
    pub allocated_label: String,
}

const STATUS_CELL: usize = 2;

impl FakeOrder {
    pub fn new(id: &str, status_label: &str) -> Self {
        let labels = DetailLabels::default();
        let fields = [
            (
                labels.description,
                "Instalação FTTH\nPDO Coordenadas: 38.7223, -9.1393\nCliente disponível à tarde",
            ),
            (labels.fiber_color, "Azul"),
            (labels.slid, "SL-889201"),
            (labels.address, "Rua Augusta 10, Lisboa"),
            (labels.network_owner, "MEO"),
            (labels.primary_port, "P1/3"),
            (labels.scheduled_date, "2026-10-20"),
            (labels.intervention_state, "Agendada"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();

        Self {
            id: id.into(),
            cells: vec![
                id.into(),
                "Rua Augusta 10".into(),
                status_label.into(),
                "2026-10-20".into(),
            ],
            fields,
            allocated_label: "ALLOCATED".into(),
        }
    }

    pub fn without_field(mut self, label: &str) -> Self {
        self.fields.remove(label);
        self
    }

    pub fn allocating_to(mut self, label: &str) -> Self {
        self.allocated_label = label.into();
        self
    }

    pub fn status_label(&self) -> &str {
        &self.cells[STATUS_CELL]
    }
}

/// Server side of the portal: shared by every session.
#[derive(Default)]
pub struct Backend {
    orders: Mutex<HashMap<String, FakeOrder>>,
    events: Mutex<Vec<String>>,
    /// A clickable label that never shows up.
    broken_label: Mutex<Option<String>>,
    /// Waiting for a result row never returns.
    hang_results: Mutex<bool>,
}

impl Backend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_orders(orders: impl IntoIterator<Item = FakeOrder>) -> Arc<Self> {
        let backend = Self::new();
        for order in orders {
            backend.add(order);
        }
        backend
    }

    pub fn add(&self, order: FakeOrder) {
        self.orders
            .lock()
            .unwrap()
            .insert(order.id.clone(), order);
    }

    pub fn order(&self, id: &str) -> Option<FakeOrder> {
        self.orders.lock().unwrap().get(id).cloned()
    }

    pub fn break_label(&self, label: &str) {
        *self.broken_label.lock().unwrap() = Some(label.into());
    }

    pub fn hang_results(&self) {
        *self.hang_results.lock().unwrap() = true;
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Clicks on any allocation-sequence control.
    pub fn transition_clicks(&self) -> Vec<String> {
        let labels = TransitionLabels::default();
        let wanted = [
            labels.auto_allocation,
            labels.evolve,
            labels.confirm,
            labels.acknowledge,
        ]
        .map(|l| format!("click {}", Selector::clickable(l)));
        self.events()
            .into_iter()
            .filter(|e| wanted.contains(e))
            .collect()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn results_hang(&self) -> bool {
        *self.hang_results.lock().unwrap()
    }

    fn is_broken(&self, label: &str) -> bool {
        self.broken_label.lock().unwrap().as_deref() == Some(label)
    }

    fn allocate(&self, id: &str) {
        if let Some(order) = self.orders.lock().unwrap().get_mut(id) {
            order.cells[STATUS_CELL] = order.allocated_label.clone();
        }
    }
}

// ── Page ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Blank,
    Login,
    Home,
    Menu,
    Detail,
    Dialog,
}

struct PageState {
    view: View,
    title: String,
    username: String,
    password: String,
    search_text: String,
    listed: Option<String>,
    detail: Option<String>,
    /// Allocation controls clicked so far in the open menu/dialog.
    step: usize,
    generation: u32,
    next_ref: u32,
    refs: HashMap<u32, u32>,
    waits: usize,
    /// Upcoming title reads that fail as if the page were mid-navigation.
    title_failures: usize,
}

impl PageState {
    fn show(&mut self, view: View) {
        self.view = view;
        self.generation += 1;
    }
}

/// Client side of the portal: one per session.
pub struct FakePage {
    backend: Arc<Backend>,
    state: Mutex<PageState>,
    selectors: PortalSelectors,
    fields: DetailLabels,
    transition: TransitionLabels,
}

impl FakePage {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self {
            backend,
            state: Mutex::new(PageState {
                view: View::Blank,
                title: String::new(),
                username: String::new(),
                password: String::new(),
                search_text: String::new(),
                listed: None,
                detail: None,
                step: 0,
                generation: 0,
                next_ref: 0,
                refs: HashMap::new(),
                waits: 0,
                title_failures: 0,
            }),
            selectors: PortalSelectors::default(),
            fields: DetailLabels::default(),
            transition: TransitionLabels::default(),
        }
    }

    /// Number of `wait_for_selector` calls served so far.
    pub fn waits(&self) -> usize {
        self.state.lock().unwrap().waits
    }

    /// Make the next `n` title reads fail with a non-fatal CDP error.
    pub fn fail_titles(&self, n: usize) {
        self.state.lock().unwrap().title_failures = n;
    }

    /// Force a re-render, detaching every handle.
    pub fn rerender(&self) {
        self.state.lock().unwrap().generation += 1;
    }

    fn step_labels(&self) -> [&str; 4] {
        [
            &self.transition.auto_allocation,
            &self.transition.evolve,
            &self.transition.confirm,
            &self.transition.acknowledge,
        ]
    }

    fn visible(&self, state: &PageState, selector: &Selector) -> bool {
        let s = &self.selectors;
        match selector {
            Selector::Css(css) => {
                if [&s.username_field, &s.password_field, &s.login_button].contains(&css) {
                    state.view == View::Login
                } else if [&s.search_field, &s.search_button, &s.results_table].contains(&css) {
                    state.view == View::Home
                } else {
                    false
                }
            },
            Selector::Row { table, contains } => {
                table == &s.results_table
                    && matches!(state.view, View::Home | View::Menu)
                    && state.listed.as_deref() == Some(contains.as_str())
            },
            Selector::Clickable(label) => {
                if self.backend.is_broken(label) {
                    return false;
                }
                if label == &self.fields.view_detail {
                    return state.view == View::Menu && state.step == 0;
                }
                if label == &self.fields.close_detail {
                    return state.view == View::Detail;
                }
                match self.step_labels().iter().position(|l| *l == label.as_str()) {
                    Some(0) => state.view == View::Menu && state.step == 0,
                    Some(1) => state.view == View::Menu && state.step == 1,
                    Some(i) => state.view == View::Dialog && state.step == i,
                    None => false,
                }
            },
            Selector::Field(label) => {
                state.view == View::Detail
                    && state
                        .detail
                        .as_deref()
                        .and_then(|id| self.backend.order(id))
                        .is_some_and(|o| o.fields.contains_key(label))
            },
        }
    }

    fn handle_selector(&self, handle: &ElementHandle) -> Result<(), BrowserError> {
        let state = self.state.lock().unwrap();
        let fresh = state.refs.get(&handle.ref_id()) == Some(&state.generation);
        if fresh && self.visible(&state, handle.selector()) {
            Ok(())
        } else {
            Err(BrowserError::StaleElement(handle.selector().to_string()))
        }
    }

    fn require_visible(&self, state: &PageState, selector: &Selector) -> Result<(), BrowserError> {
        if self.visible(state, selector) {
            Ok(())
        } else {
            Err(BrowserError::StaleElement(format!("no element matches {selector}")))
        }
    }
}

#[async_trait]
impl AccessLayer for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        if url != PORTAL_URL {
            return Err(BrowserError::NavigationFailed(format!("unreachable: {url}")));
        }
        let mut state = self.state.lock().unwrap();
        state.title = "Portal Login".into();
        state.show(View::Login);
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        self.require_visible(&state, selector)?;
        let css = match selector {
            Selector::Css(css) => css.as_str(),
            _ => return Err(BrowserError::InvalidAction(format!("cannot type into {selector}"))),
        };
        if css == self.selectors.username_field {
            state.username = text.into();
        } else if css == self.selectors.password_field {
            state.password = text.into();
        } else if css == self.selectors.search_field {
            state.search_text = text.into();
        }
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        self.require_visible(&state, selector)?;
        self.backend.record(format!("click {selector}"));

        match selector {
            Selector::Css(css) if css == &self.selectors.login_button => {
                if state.username == USERNAME && state.password == PASSWORD {
                    state.title = HOME_TITLE.into();
                    state.show(View::Home);
                } else {
                    state.title = "Portal Login - credenciais inválidas".into();
                }
            },
            Selector::Css(css) if css == &self.selectors.search_button => {
                let wanted = state.search_text.clone();
                state.listed = self.backend.order(&wanted).is_some().then_some(wanted);
                state.show(View::Home);
            },
            Selector::Clickable(label) if label == &self.fields.view_detail => {
                state.detail = state.listed.clone();
                state.show(View::Detail);
            },
            Selector::Clickable(label) if label == &self.fields.close_detail => {
                state.detail = None;
                state.show(View::Home);
            },
            Selector::Clickable(label) => {
                if let Some(i) = self.step_labels().iter().position(|l| *l == label.as_str()) {
                    state.step = i + 1;
                    if state.step == 4 {
                        if let Some(id) = state.listed.clone() {
                            self.backend.allocate(&id);
                        }
                        state.step = 0;
                        state.show(View::Home);
                    } else if state.step >= 2 {
                        state.show(View::Dialog);
                    } else {
                        state.generation += 1;
                    }
                }
            },
            _ => {},
        }
        Ok(())
    }

    async fn right_click(&self, selector: &Selector) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        self.require_visible(&state, selector)?;
        self.backend.record(format!("right_click {selector}"));
        if matches!(selector, Selector::Row { .. }) {
            state.step = 0;
            state.show(View::Menu);
        }
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        let hang = matches!(selector, Selector::Row { .. }) && self.backend.results_hang();
        if hang {
            std::future::pending::<()>().await;
        }

        let found = {
            let mut state = self.state.lock().unwrap();
            state.waits += 1;
            if self.visible(&state, selector) {
                state.next_ref += 1;
                let ref_ = state.next_ref;
                let generation = state.generation;
                state.refs.insert(ref_, generation);
                Some(ElementHandle::new(ref_, selector.clone()))
            } else {
                None
            }
        };

        match found {
            Some(handle) => Ok(handle),
            None => {
                tokio::time::sleep(timeout).await;
                Err(BrowserError::Timeout(format!(
                    "{selector} not found after {}ms",
                    timeout.as_millis()
                )))
            },
        }
    }

    async fn read_text(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        self.handle_selector(handle)?;
        match handle.selector() {
            Selector::Row { .. } => Ok(self.read_cells(handle).await?.join(" ")),
            other => Ok(self
                .read_attribute(handle, "value")
                .await?
                .unwrap_or_else(|| other.to_string())),
        }
    }

    async fn read_attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.handle_selector(handle)?;
        let Selector::Field(label) = handle.selector() else {
            return Ok(None);
        };
        if name != "value" {
            return Ok(None);
        }
        let detail = self.state.lock().unwrap().detail.clone();
        Ok(detail
            .and_then(|id| self.backend.order(&id))
            .and_then(|o| o.fields.get(label).cloned()))
    }

    async fn read_cells(&self, row: &ElementHandle) -> Result<Vec<String>, BrowserError> {
        self.handle_selector(row)?;
        let Selector::Row { contains, .. } = row.selector() else {
            return Err(BrowserError::InvalidAction("not a row".into()));
        };
        self.backend
            .order(contains)
            .map(|o| o.cells)
            .ok_or_else(|| BrowserError::StaleElement(row.selector().to_string()))
    }

    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, BrowserError> {
        Ok(self.handle_selector(handle).is_ok())
    }

    async fn current_title(&self) -> Result<String, BrowserError> {
        let mut state = self.state.lock().unwrap();
        if state.title_failures > 0 {
            state.title_failures -= 1;
            return Err(BrowserError::Cdp("Execution context was destroyed".into()));
        }
        Ok(state.title.clone())
    }

    async fn page_content(&self) -> Result<String, BrowserError> {
        let state = self.state.lock().unwrap();
        Ok(format!("<html><title>{}</title></html>", state.title))
    }
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Hands out [`FakePage`] sessions over one backend and counts them.
pub struct FakeProvider {
    backend: Arc<Backend>,
    counters: Arc<Counters>,
    launch_error: bool,
}

impl FakeProvider {
    pub fn new(backend: Arc<Backend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            counters: Arc::new(Counters::default()),
            launch_error: false,
        })
    }

    /// A provider whose browser never starts.
    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            backend: Backend::new(),
            counters: Arc::new(Counters::default()),
            launch_error: true,
        })
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Highest number of sessions open at once.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.launch_error {
            return Err(BrowserError::LaunchFailed("no display".into()));
        }
        let n = self.counters.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);

        // Let concurrent acquisitions overlap.
        tokio::task::yield_now().await;

        Ok(Box::new(FakeSession {
            id: format!("fake-{n}"),
            page: FakePage::new(Arc::clone(&self.backend)),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    id: String,
    page: FakePage,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn access(&self) -> &dyn AccessLayer {
        &self.page
    }

    async fn release(self: Box<Self>) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
