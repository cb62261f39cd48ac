//! The dropdown widget
//!
//! [`Dropdown`] is a cheap, cloneable handle. State lives behind a mutex and
//! every mutation follows the same pattern:
//!
//! ```text
//! lock widget ─→ mutate state and tree ─→ queue Effects ─→ unlock
//!                                                            ↓
//!                  native `change` ─→ on_change callback ─→ "dropkit:change"
//! ```
//!
//! Effects run with no lock held, so listeners and callbacks may call back
//! into the widget. Listeners registered on the tree hold weak references;
//! dropping every handle without [`Dropdown::destroy`] leaves them inert.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use dropkit_dom::{Dom, DomEvent, EventType, Key, ListenerId, NodeId};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::classes;
use crate::config::{DataResolver, DropdownOptions, Settings};
use crate::data::OptionData;
use crate::error::{DropdownError, LoadError, Result};
use crate::init::{extract_from_select, Host};
use crate::loader::{default_fetcher, load_options, DataFetcher, FetchRequest};
use crate::render::{build_template, GroupLabel, Mount, RenderedOption};
use crate::state::{dropdown_events, Phase, WidgetState};

/// Hosts picked up by [`Dropdown::initialize_all`] without a selector
pub const DEFAULT_SELECTOR: &str = "select[data-dropdown]";

/// Selection callback: `(value, text)`, with `None` after a clear
pub type ChangeCallback = Arc<dyn Fn(Option<&str>, &str) + Send + Sync>;

pub(crate) enum Effect {
    Dispatch(DomEvent),
    Notify {
        callback: ChangeCallback,
        value: Option<String>,
        text: String,
    },
}

/// Notifications queued while the widget is locked
#[derive(Default)]
pub(crate) struct Effects(Vec<Effect>);

impl Effects {
    pub fn dispatch(&mut self, event: DomEvent) {
        self.0.push(Effect::Dispatch(event));
    }

    pub fn notify(&mut self, callback: ChangeCallback, value: Option<String>, text: String) {
        self.0.push(Effect::Notify {
            callback,
            value,
            text,
        });
    }

    fn run(self, dom: &Dom) {
        for effect in self.0 {
            match effect {
                Effect::Dispatch(event) => {
                    dom.dispatch(&event);
                }
                Effect::Notify {
                    callback,
                    value,
                    text,
                } => callback(value.as_deref(), &text),
            }
        }
    }
}

pub(crate) struct Inner {
    pub dom: Dom,
    pub element_id: String,
    pub settings: Settings,
    /// `None` when the host was not found
    pub host: Option<Host>,
    /// `None` when inert or destroyed
    pub mount: Option<Mount>,
    pub data: Option<OptionData>,
    pub options: Vec<RenderedOption>,
    pub group_labels: Vec<GroupLabel>,
    pub no_results: Option<NodeId>,
    pub state: WidgetState,
    pub on_change: Option<ChangeCallback>,
    listeners: Vec<ListenerId>,
    load_generation: u64,
    load_task: Option<JoinHandle<()>>,
}

/// A load prepared under the lock and run outside it
struct LoadJob {
    generation: u64,
    fetcher: Option<Arc<dyn DataFetcher>>,
    request: FetchRequest,
    resolver: Option<DataResolver>,
}

impl LoadJob {
    async fn run(self) -> (u64, std::result::Result<OptionData, LoadError>) {
        let result = match self.fetcher {
            Some(fetcher) => load_options(fetcher, self.request, self.resolver).await,
            None => Err(LoadError::Unsupported(
                "no data fetcher configured and the `network` feature is off".to_string(),
            )),
        };
        (self.generation, result)
    }
}

impl Inner {
    fn new(dom: Dom, element_id: &str, settings: Settings) -> Self {
        Self {
            dom,
            element_id: element_id.to_string(),
            settings,
            host: None,
            mount: None,
            data: None,
            options: Vec::new(),
            group_labels: Vec::new(),
            no_results: None,
            state: WidgetState::default(),
            on_change: None,
            listeners: Vec::new(),
            load_generation: 0,
            load_task: None,
        }
    }

    // =========================================================================
    // Open / close
    // =========================================================================

    pub(crate) fn open(&mut self) {
        let Some(mount) = self.mount else {
            return;
        };
        if self.state.is_disabled() || !self.state.apply(dropdown_events::OPEN) {
            return;
        }
        self.mutate("open", |doc| {
            doc.add_class(mount.trigger, classes::ACTIVE)?;
            doc.add_class(mount.content, classes::SHOW)
        });
        self.reset_search();

        // Start on the selected option when it is visible
        let navigable = self.navigable();
        if !navigable.is_empty() {
            let start = self
                .state
                .selected_value
                .as_deref()
                .and_then(|selected| {
                    navigable
                        .iter()
                        .position(|index| self.options[*index].value == selected)
                })
                .unwrap_or(0);
            self.highlight_option(&navigable, start as isize);
        }

        let focus = mount.search.unwrap_or(mount.trigger);
        self.dom.write(|doc| doc.focus(focus));
    }

    pub(crate) fn close(&mut self) {
        let Some(mount) = self.mount else {
            return;
        };
        if !self.state.apply(dropdown_events::CLOSE) {
            return;
        }
        self.mutate("close", |doc| {
            doc.remove_class(mount.trigger, classes::ACTIVE)?;
            doc.remove_class(mount.content, classes::SHOW)
        });
        self.reset_search();
        self.clear_highlight();
    }

    pub(crate) fn toggle(&mut self) {
        if self.state.is_disabled() {
            return;
        }
        if self.state.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    fn reset_search(&mut self) {
        if let Some(search) = self.mount.and_then(|m| m.search) {
            self.mutate("search reset", |doc| doc.set_value(search, ""));
        }
        self.set_search_term("");
    }

    fn close_if_outside(&mut self, target: NodeId) {
        let Some(mount) = self.mount else {
            return;
        };
        if !self.dom.read(|doc| doc.contains(mount.root, target)) {
            self.close();
        }
    }

    fn search_changed(&mut self) {
        let Some(search) = self.mount.and_then(|m| m.search) else {
            return;
        };
        let term = self.dom.read(|doc| doc.value(search));
        self.set_search_term(&term);
    }

    // =========================================================================
    // Enable / disable
    // =========================================================================

    fn set_user_disabled(&mut self, disabled: bool) {
        let Some(mount) = self.mount else {
            return;
        };
        self.state.user_disabled = disabled;
        if disabled {
            self.close();
        }
        let pointer_events = if self.state.is_disabled() { "none" } else { "auto" };
        let opacity = if disabled { "0.6" } else { "1" };
        self.mutate("disabled styling", |doc| {
            doc.set_style(mount.trigger, "pointer-events", pointer_events)?;
            doc.set_style(mount.trigger, "opacity", opacity)
        });
    }

    // =========================================================================
    // Loading
    // =========================================================================

    fn abort_load(&mut self) {
        self.load_generation += 1;
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
    }

    /// Enter the loading phase; `None` when there is nothing to load
    fn begin_load(&mut self) -> Option<LoadJob> {
        self.mount?;
        let url = self.settings.data_url.clone()?;

        self.close();
        self.abort_load();
        self.state.apply(dropdown_events::LOAD_START);
        self.render_loading();

        Some(LoadJob {
            generation: self.load_generation,
            fetcher: default_fetcher(self.settings.fetcher.as_ref()),
            request: FetchRequest::build(url, &self.settings.fetch_options),
            resolver: self.settings.data_resolver.clone(),
        })
    }

    fn finish_load(&mut self, generation: u64, result: std::result::Result<OptionData, LoadError>) {
        if generation != self.load_generation || self.mount.is_none() {
            tracing::trace!(element_id = %self.element_id, generation, "discarding superseded load");
            return;
        }
        self.load_task = None;

        match result {
            Ok(data) => {
                self.state.apply(dropdown_events::LOAD_OK);
                self.render_ready();
                self.data = Some(data);
                self.populate_options();
                self.set_initial_selection();
            }
            Err(err) => {
                tracing::error!(
                    element_id = %self.element_id,
                    url = ?self.settings.data_url,
                    %err,
                    "Error loading dropdown data"
                );
                self.state.apply(dropdown_events::LOAD_FAIL);
                self.render_error();
            }
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    fn teardown(&mut self) {
        self.abort_load();
        for id in std::mem::take(&mut self.listeners) {
            self.dom.remove_listener(id);
        }
        let (Some(mount), Some(host)) = (self.mount.take(), self.host) else {
            return;
        };
        self.options.clear();
        self.group_labels.clear();
        self.no_results = None;

        self.mutate("teardown", |doc| {
            if host.is_native() {
                doc.set_style(host.node, "display", "")?;
            }
            if doc.exists(mount.root) {
                doc.remove(mount.root)?;
            }
            Ok(())
        });
        tracing::debug!(element_id = %self.element_id, "dropdown destroyed");
    }
}

/// A searchable dropdown bound to a host element
#[derive(Clone)]
pub struct Dropdown {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for Dropdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Dropdown")
            .field("element_id", &inner.element_id)
            .field("state", &inner.state)
            .field("options", &inner.options.len())
            .finish()
    }
}

impl Dropdown {
    /// Build a dropdown on the element with `element_id`
    ///
    /// A missing host is logged and yields an inert widget whose methods do
    /// nothing.
    pub fn create(
        dom: &Dom,
        element_id: &str,
        data: Option<OptionData>,
        options: DropdownOptions,
    ) -> Self {
        let fallback = options.clone();
        Self::try_create(dom, element_id, data, options).unwrap_or_else(|err| {
            tracing::error!(element_id, %err, "dropdown initialization failed");
            let settings = Settings::resolve(fallback, element_id, Default::default());
            Self::from_inner(Inner::new(dom.clone(), element_id, settings))
        })
    }

    /// Like [`Dropdown::create`], reporting a missing host as an error
    pub fn try_create(
        dom: &Dom,
        element_id: &str,
        data: Option<OptionData>,
        options: DropdownOptions,
    ) -> Result<Self> {
        let (host, settings, data, mount) = dom.write(|doc| -> Result<_> {
            let node = doc
                .get_element_by_id(element_id)
                .ok_or_else(|| DropdownError::ElementNotFound(element_id.to_string()))?;
            let host = Host::detect(doc, node);
            let settings = Settings::resolve(options, element_id, host.defaults(doc));
            let data = match data {
                Some(data) => Some(data.normalized()),
                None if host.is_native() => Some(extract_from_select(doc, node)),
                None => None,
            };
            let mount = build_template(doc, &host, &settings)?;
            Ok((host, settings, data, mount))
        })?;

        let mut inner = Inner::new(dom.clone(), element_id, settings);
        inner.host = Some(host);
        inner.mount = Some(mount);
        inner.data = data;
        let remote = inner.settings.data_url.is_some();

        let dropdown = Self::from_inner(inner);
        dropdown.attach_events();
        tracing::debug!(element_id, native = host.is_native(), remote, "dropdown created");

        if remote {
            dropdown.spawn_load();
        } else {
            let mut inner = dropdown.lock();
            inner.populate_options();
            inner.set_initial_selection();
        }
        Ok(dropdown)
    }

    /// Enhance every element matching `selector` (default
    /// [`DEFAULT_SELECTOR`]); elements without an id get a generated one
    pub fn initialize_all(dom: &Dom, selector: Option<&str>, options: DropdownOptions) -> Vec<Self> {
        Self::try_initialize_all(dom, selector, options).unwrap_or_else(|err| {
            tracing::error!(%err, "dropdown bulk initialization failed");
            Vec::new()
        })
    }

    /// Like [`Dropdown::initialize_all`], reporting failures as errors
    pub fn try_initialize_all(
        dom: &Dom,
        selector: Option<&str>,
        options: DropdownOptions,
    ) -> Result<Vec<Self>> {
        let selector = selector.unwrap_or(DEFAULT_SELECTOR);
        let ids = dom.write(|doc| -> Result<Vec<String>> {
            let batch = Uuid::new_v4().simple().to_string();
            let mut ids = Vec::new();
            for (index, node) in doc.query_selector_all(selector)?.into_iter().enumerate() {
                let existing = doc
                    .element(node)
                    .and_then(|e| e.id())
                    .filter(|id| !id.is_empty())
                    .map(str::to_string);
                let id = match existing {
                    Some(id) => id,
                    None => {
                        let id = format!("dropkit-auto-{batch}-{index}");
                        doc.set_attr(node, "id", id.as_str())?;
                        id
                    }
                };
                ids.push(id);
            }
            Ok(ids)
        })?;

        tracing::debug!(selector, count = ids.len(), "initializing dropdowns");
        ids.iter()
            .map(|id| Self::try_create(dom, id, None, options.clone()))
            .collect()
    }

    fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn from_weak(weak: &Weak<Mutex<Inner>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate under the lock, then run queued notifications unlocked
    fn update<R>(&self, f: impl FnOnce(&mut Inner, &mut Effects) -> R) -> R {
        let mut effects = Effects::default();
        let (result, dom) = {
            let mut inner = self.lock();
            let result = f(&mut inner, &mut effects);
            (result, inner.dom.clone())
        };
        effects.run(&dom);
        result
    }

    fn attach_events(&self) {
        let (dom, mount) = {
            let inner = self.lock();
            (inner.dom.clone(), inner.mount)
        };
        let Some(mount) = mount else {
            return;
        };
        let document = dom.read(|doc| doc.root());
        let weak = Arc::downgrade(&self.inner);
        let mut ids = Vec::new();

        ids.push(dom.add_listener(
            mount.trigger,
            EventType::Click,
            listener(&weak, move |widget, event| {
                let on_clear = mount
                    .clear
                    .is_some_and(|clear| widget.dom().read(|doc| doc.contains(clear, event.target)));
                if !on_clear {
                    widget.toggle();
                } else if !widget.is_disabled() {
                    widget.clear();
                }
            }),
        ));

        ids.push(dom.add_listener(
            mount.options,
            EventType::Click,
            listener(&weak, |widget, event| {
                widget.update(|inner, fx| inner.click_option(event.target, fx));
            }),
        ));

        if let Some(search) = mount.search {
            ids.push(dom.add_listener(
                search,
                EventType::Input,
                listener(&weak, |widget, _| {
                    widget.update(|inner, _| inner.search_changed());
                }),
            ));
        }

        ids.push(dom.add_listener(
            document,
            EventType::Click,
            listener(&weak, |widget, event| {
                widget.update(|inner, _| inner.close_if_outside(event.target));
            }),
        ));

        ids.push(dom.add_listener(
            mount.trigger,
            EventType::KeyDown,
            listener(&weak, |widget, event| {
                let opens = matches!(event.key, Some(Key::Enter | Key::Space | Key::Up | Key::Down));
                if opens && !widget.is_open() {
                    event.prevent_default();
                    widget.open();
                }
            }),
        ));

        ids.push(dom.add_listener(
            document,
            EventType::KeyDown,
            listener(&weak, |widget, event| {
                // Already consumed, e.g. the key that just opened the list
                if event.default_prevented() {
                    return;
                }
                if let Some(key) = event.key {
                    if widget.is_open() && widget.handle_key(key) {
                        event.prevent_default();
                    }
                }
            }),
        ));

        self.lock().listeners = ids;
    }

    fn spawn_load(&self) {
        let Some(job) = self.lock().begin_load() else {
            return;
        };
        let generation = job.generation;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let weak = Arc::downgrade(&self.inner);
                let task = handle.spawn(async move {
                    let (generation, result) = job.run().await;
                    if let Some(widget) = Dropdown::from_weak(&weak) {
                        widget.lock().finish_load(generation, result);
                    }
                });
                let mut inner = self.lock();
                if inner.load_generation == generation {
                    inner.load_task = Some(task);
                }
            }
            Err(_) => {
                self.lock().finish_load(generation, Err(LoadError::NoRuntime));
            }
        }
    }

    // =========================================================================
    // Public API
    // =========================================================================

    /// Selected value
    pub fn value(&self) -> Option<String> {
        self.lock().state.selected_value.clone()
    }

    /// Selected label, empty when nothing is selected
    pub fn text(&self) -> String {
        self.lock().state.selected_text.clone()
    }

    /// Select the enabled option with `value`; unknown or disabled values
    /// are ignored
    pub fn set_value(&self, value: &str) {
        self.update(|inner, fx| inner.set_value(value, fx));
    }

    /// Select an option directly, as a click on it would
    pub fn select_option(&self, value: &str, text: &str) {
        self.update(|inner, fx| inner.select_option(value, text, fx));
    }

    /// Reset to the placeholder and notify listeners
    pub fn clear(&self) {
        self.update(|inner, fx| inner.clear(fx));
    }

    /// Block interaction until [`Dropdown::enable`]
    pub fn disable(&self) {
        self.update(|inner, _| inner.set_user_disabled(true));
    }

    pub fn enable(&self) {
        self.update(|inner, _| inner.set_user_disabled(false));
    }

    pub fn open(&self) {
        self.update(|inner, _| inner.open());
    }

    pub fn close(&self) {
        self.update(|inner, _| inner.close());
    }

    pub fn toggle(&self) {
        self.update(|inner, _| inner.toggle());
    }

    /// Recompute option visibility for the current search term
    pub fn filter_options(&self) {
        self.update(|inner, _| inner.filter_options());
    }

    /// Set the search term (lowercased) and refilter
    pub fn search(&self, term: &str) {
        self.update(|inner, _| inner.set_search_term(term));
    }

    /// Feed a key to the open list; returns whether it was consumed
    pub fn handle_key(&self, key: Key) -> bool {
        self.update(|inner, fx| {
            if inner.state.is_open() {
                inner.handle_keyboard(key, fx)
            } else {
                false
            }
        })
    }

    /// Refetch remote options, replacing any load in flight
    ///
    /// Does nothing without a configured `dataUrl`.
    pub fn reload(&self) {
        {
            let mut inner = self.lock();
            if inner.mount.is_none() || inner.settings.data_url.is_none() {
                tracing::debug!(element_id = %inner.element_id, "reload ignored: no data url");
                return;
            }
            inner.clear_options();
        }
        self.spawn_load();
    }

    /// Load remote options and wait for the result
    ///
    /// Any load already in flight is superseded.
    pub async fn load_from_url(&self) {
        let Some(job) = self.lock().begin_load() else {
            return;
        };
        let (generation, result) = job.run().await;
        self.lock().finish_load(generation, result);
    }

    /// Wait until no spawned load is outstanding
    pub async fn settled(&self) {
        loop {
            let task = self.lock().load_task.take();
            let Some(task) = task else {
                break;
            };
            // Aborted loads resolve with a cancellation error
            let _ = task.await;
        }
    }

    /// Remove the widget, its listeners and any pending load; native hosts
    /// are shown again
    pub fn destroy(&self) {
        self.lock().teardown();
    }

    /// Register the change callback, replacing any previous one
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(Option<&str>, &str) + Send + Sync + 'static,
    {
        self.set_on_change(Some(Arc::new(callback)));
    }

    pub fn set_on_change(&self, callback: Option<ChangeCallback>) {
        self.lock().on_change = callback;
    }

    pub fn is_open(&self) -> bool {
        self.lock().state.is_open()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().state.is_loading()
    }

    /// Disabled by [`Dropdown::disable`], loading, or after a failed load
    pub fn is_disabled(&self) -> bool {
        self.lock().state.is_disabled()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase
    }

    /// Snapshot of the widget state
    pub fn state(&self) -> WidgetState {
        self.lock().state.clone()
    }

    /// Whether the host was found and the widget is not destroyed
    pub fn is_mounted(&self) -> bool {
        self.lock().mount.is_some()
    }

    pub fn element_id(&self) -> String {
        self.lock().element_id.clone()
    }

    /// Value of the highlighted row
    pub fn highlighted_value(&self) -> Option<String> {
        let inner = self.lock();
        inner
            .highlighted()
            .map(|index| inner.options[index].value.clone())
    }

    /// Values of rows not hidden by the search filter, in display order
    pub fn visible_values(&self) -> Vec<String> {
        let inner = self.lock();
        inner.dom.read(|doc| {
            inner
                .options
                .iter()
                .filter(|option| !doc.has_class(option.node, classes::HIDDEN))
                .map(|option| option.value.clone())
                .collect()
        })
    }

    pub fn dom(&self) -> Dom {
        self.lock().dom.clone()
    }

    /// Widget root element
    pub fn root(&self) -> Option<NodeId> {
        self.lock().mount.map(|m| m.root)
    }

    pub fn trigger(&self) -> Option<NodeId> {
        self.lock().mount.map(|m| m.trigger)
    }

    /// Text slot inside the trigger
    pub fn trigger_text(&self) -> Option<NodeId> {
        self.lock().mount.map(|m| m.text)
    }

    pub fn clear_button(&self) -> Option<NodeId> {
        self.lock().mount.and_then(|m| m.clear)
    }

    pub fn search_input(&self) -> Option<NodeId> {
        self.lock().mount.and_then(|m| m.search)
    }

    pub fn options_container(&self) -> Option<NodeId> {
        self.lock().mount.map(|m| m.options)
    }

    pub fn hidden_input(&self) -> Option<NodeId> {
        self.lock().mount.map(|m| m.hidden_input)
    }

    /// Rendered row for `value`
    pub fn option_node(&self, value: &str) -> Option<NodeId> {
        self.lock()
            .options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.node)
    }
}

/// Wrap a widget handler as a tree listener holding only a weak reference
fn listener<F>(weak: &Weak<Mutex<Inner>>, handler: F) -> impl Fn(&DomEvent) + Send + Sync + 'static
where
    F: Fn(&Dropdown, &DomEvent) + Send + Sync + 'static,
{
    let weak = weak.clone();
    move |event: &DomEvent| {
        if let Some(widget) = Dropdown::from_weak(&weak) {
            handler(&widget, event);
        }
    }
}
