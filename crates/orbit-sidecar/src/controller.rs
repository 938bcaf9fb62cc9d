use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, trace, warn};

use orbit_core::actions::{ActionKind, SUMMARIZE_PAGE_PROMPT};
use orbit_core::context::{PageContext, ViewHandle};
use orbit_core::events::{BridgeEvent, EventKind, EventPayload};
use orbit_core::ids::ViewId;
use orbit_core::messages::{self, ChatMessage};
use orbit_core::provider::{ChatBackend, ModelId, PageContextProvider};
use orbit_core::state::SessionState;

use crate::bus::{EventBus, SubscriptionToken};
use crate::error::SidecarError;

/// Orchestrates one chat session against whichever view is currently attached.
///
/// All operations report failure through `SessionState::last_error`; none of them return errors.
/// Results of work started for one attachment are discarded once another view is attached
/// or the view is gone.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    bus: Arc<EventBus>,
    provider: Arc<dyn PageContextProvider>,
    backend: Arc<dyn ChatBackend>,
    session: Mutex<Session>,
    snapshots: watch::Sender<SessionState>,
    tasks: TaskTracker,
    runtime: Handle,
    subscriptions: Mutex<Vec<SubscriptionToken>>,
}

struct Session {
    state: SessionState,
    attachment: Option<Attachment>,
    generation: u64,
    loading: usize,
    refreshing: usize,
}

#[derive(Clone, Debug)]
struct Attachment {
    view: ViewHandle,
    generation: u64,
}

#[derive(Clone, Copy, Debug)]
enum Flag {
    Loading,
    Refreshing,
}

impl Session {
    fn counter(&mut self, flag: Flag) -> &mut usize {
        match flag {
            Flag::Loading => &mut self.loading,
            Flag::Refreshing => &mut self.refreshing,
        }
    }

    fn sync_flags(&mut self) {
        self.state.is_loading = self.loading > 0;
        self.state.is_refreshing_context = self.refreshing > 0;
    }

    fn detach(&mut self) {
        self.attachment = None;
        self.generation += 1;
    }

    /// The attachment, provided its view still exists. A dropped view detaches here.
    fn live_attachment(&mut self) -> Option<Attachment> {
        let attachment = self.attachment.as_ref()?;
        if attachment.view.is_alive() {
            return Some(attachment.clone());
        }
        debug!(view_id = %attachment.view.id(), "attached view dropped, detaching");
        self.detach();
        None
    }

    fn is_current(&self, attachment: &Attachment) -> bool {
        self.generation == attachment.generation
    }

    fn set_error(&mut self, error: SidecarError) {
        self.state.last_error = Some(error.to_string());
    }

    /// Error for work whose attachment was replaced while it ran.
    fn superseded_error(&self) -> SidecarError {
        if self.attachment.is_some() {
            SidecarError::PageChanged
        } else {
            SidecarError::NoPage
        }
    }
}

/// Holds one unit of an in-flight counter. Released on drop, including cancellation.
struct FlagGuard {
    inner: Arc<Inner>,
    flag: Flag,
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        let flag = self.flag;
        self.inner.update(|s| {
            let counter = s.counter(flag);
            *counter = counter.saturating_sub(1);
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for token in self.subscriptions.get_mut().drain(..) {
            self.bus.unsubscribe(token);
        }
    }
}

impl SessionController {
    /// Subscribe to the bus and start a connection check.
    ///
    /// Must be called from within a Tokio runtime; background work is spawned onto it.
    pub fn new(
        bus: Arc<EventBus>,
        provider: Arc<dyn PageContextProvider>,
        backend: Arc<dyn ChatBackend>,
        initial_model: impl Into<String>,
    ) -> Self {
        let state = SessionState::new(initial_model);
        let (snapshots, _) = watch::channel(state.clone());
        let inner = Arc::new(Inner {
            bus: Arc::clone(&bus),
            provider,
            backend,
            session: Mutex::new(Session {
                state,
                attachment: None,
                generation: 0,
                loading: 0,
                refreshing: 0,
            }),
            snapshots,
            tasks: TaskTracker::new(),
            runtime: Handle::current(),
            subscriptions: Mutex::new(Vec::new()),
        });

        let tokens: Vec<SubscriptionToken> = EventKind::ALL
            .iter()
            .map(|kind| {
                let weak: Weak<Inner> = Arc::downgrade(&inner);
                bus.subscribe(*kind, move |event| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle(event);
                    }
                })
            })
            .collect();
        *inner.subscriptions.lock() = tokens;

        let task = Arc::clone(&inner);
        inner.spawn(async move { task.check_connection().await });

        Self { inner }
    }

    /// Attach `view`, replacing any previous one, and schedule a context refresh for it.
    pub fn attach(&self, view: ViewHandle) {
        self.inner.attach(view);
    }

    /// Drop affinity with the attached view. In-flight work for it is discarded on completion.
    pub fn detach(&self) {
        self.inner.update(|s| {
            if let Some(previous) = &s.attachment {
                info!(view_id = %previous.view.id(), "detached");
            }
            s.detach();
        });
    }

    pub fn attached_view_id(&self) -> Option<ViewId> {
        self.inner
            .current_attachment()
            .map(|a| a.view.id().clone())
    }

    /// React to a bridge event. Bus subscriptions route here; callers may also feed events
    /// directly.
    pub fn handle(&self, event: &BridgeEvent) {
        self.inner.handle(event);
    }

    pub async fn refresh_context(&self) {
        self.inner.refresh_context().await;
    }

    pub async fn send_message(&self) {
        self.inner.send_message(None).await;
    }

    pub async fn check_connection(&self) {
        self.inner.check_connection().await;
    }

    pub async fn summarize_page(&self) {
        self.inner.summarize_page().await;
    }

    pub async fn explain_selection(&self) {
        self.inner.explain_selection().await;
    }

    /// Ask about the live selection, as `<prompt>: "<text>"` or with the default ask template.
    pub async fn ask_about_selection(&self, prompt: Option<&str>) {
        self.inner.ask_about_selection(prompt).await;
    }

    /// Empty the conversation and clear the error. Context, connection and model are untouched.
    pub fn clear_chat(&self) {
        self.inner.update(|s| {
            s.state.messages.clear();
            s.state.last_error = None;
        });
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.update(|s| s.state.input = text);
    }

    pub fn select_model(&self, model: impl Into<String>) {
        let model = model.into();
        self.inner.update(|s| s.state.selected_model = model);
    }

    /// Latest state snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver of state snapshots, updated after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.snapshots.subscribe()
    }

    /// Wait until all background work spawned so far (and anything it spawns) has finished.
    pub async fn settle(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }
}

impl Inner {
    /// Mutate the session under the lock, then publish a snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.lock();
        let result = f(&mut session);
        session.sync_flags();
        self.snapshots.send_replace(session.state.clone());
        result
    }

    fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.session.lock())
    }

    /// Attachment bookkeeping is not part of `SessionState`, so no snapshot is sent.
    fn current_attachment(&self) -> Option<Attachment> {
        self.session.lock().live_attachment()
    }

    fn hold(self: &Arc<Self>, flag: Flag) -> FlagGuard {
        self.update(|s| *s.counter(flag) += 1);
        FlagGuard {
            inner: Arc::clone(self),
            flag,
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn_on(task, &self.runtime);
    }

    fn set_error(&self, error: SidecarError) {
        debug!(error_kind = error.error_kind(), "session error");
        self.update(|s| s.set_error(error));
    }

    /// The live attachment, or `NoPage` recorded as the session error.
    fn require_attachment(&self) -> Option<Attachment> {
        self.update(|s| {
            let attachment = s.live_attachment();
            if attachment.is_none() {
                s.set_error(SidecarError::NoPage);
            }
            attachment
        })
    }

    fn attach(self: &Arc<Self>, view: ViewHandle) {
        let attachment = self.update(|s| {
            let same_view = s
                .attachment
                .as_ref()
                .is_some_and(|a| a.view.id() == view.id());
            if !same_view {
                s.state.current_context = None;
                s.state.context_is_fallback = false;
                s.state.last_known_selected_text = None;
                s.generation += 1;
            }
            let attachment = Attachment {
                view,
                generation: s.generation,
            };
            s.attachment = Some(attachment.clone());
            attachment
        });
        info!(view_id = %attachment.view.id(), generation = attachment.generation, "attached");

        let inner = Arc::clone(self);
        self.spawn(async move {
            let _ = inner.refresh_for(&attachment).await;
        });
    }

    fn handle(self: &Arc<Self>, event: &BridgeEvent) {
        let Some(attachment) = self.current_attachment() else {
            trace!(
                view_id = %event.view_id,
                event = event.kind().name(),
                "no view attached, event ignored"
            );
            return;
        };
        if &event.view_id != attachment.view.id() {
            trace!(
                view_id = %event.view_id,
                event = event.kind().name(),
                "event for another view ignored"
            );
            return;
        }

        match &event.payload {
            EventPayload::StartNavigation { .. } => {
                trace!(view_id = %event.view_id, "navigation started");
            }
            EventPayload::FinishNavigation { .. } => {
                let inner = Arc::clone(self);
                self.spawn(async move {
                    let _ = inner.refresh_for(&attachment).await;
                    inner.install_monitoring(&attachment).await;
                });
            }
            EventPayload::SelectionChanged { selected_text } => {
                let selection = (!selected_text.is_empty()).then(|| selected_text.clone());
                self.update(|s| s.state.last_known_selected_text = selection);
            }
            EventPayload::AiAction(command) => {
                if &command.target_view_id != attachment.view.id() {
                    trace!(
                        view_id = %event.view_id,
                        target = %command.target_view_id,
                        "action targets another view, ignored"
                    );
                    return;
                }
                if command.selected_text.is_empty() {
                    return;
                }
                let prompt = command.action_kind.prompt(&command.selected_text);
                debug!(
                    view_id = %event.view_id,
                    action = %command.action_kind,
                    "menu action received"
                );
                let inner = Arc::clone(self);
                self.spawn(async move { inner.send_message(Some(prompt)).await });
            }
        }
    }

    async fn install_monitoring(&self, attachment: &Attachment) {
        if !self.read(|s| s.is_current(attachment)) {
            return;
        }
        if let Some(view) = attachment.view.upgrade() {
            self.provider.install_selection_monitoring(&*view).await;
        }
    }

    async fn refresh_context(self: &Arc<Self>) {
        let Some(attachment) = self.require_attachment() else {
            return;
        };
        if let Err(SidecarError::NoPage) = self.refresh_for(&attachment).await {
            self.set_error(SidecarError::NoPage);
        }
    }

    /// Replace `current_context` for `attachment`. Extraction failure falls back to basic context.
    ///
    /// Errors only when the attachment is no longer current: `NoPage` if its view is gone,
    /// `PageChanged` if another attach or detach happened meanwhile.
    #[instrument(
        skip_all,
        fields(view_id = %attachment.view.id(), generation = attachment.generation)
    )]
    async fn refresh_for(
        self: &Arc<Self>,
        attachment: &Attachment,
    ) -> Result<PageContext, SidecarError> {
        let _refreshing = self.hold(Flag::Refreshing);

        let Some(view) = attachment.view.upgrade() else {
            self.update(|s| {
                if s.is_current(attachment) {
                    s.detach();
                }
            });
            debug!("view gone before refresh");
            return Err(SidecarError::NoPage);
        };

        let (context, fallback) = match self.provider.extract_context(&*view).await {
            Ok(context) => (context, false),
            Err(e) => {
                warn!(error = %e, "context extraction failed, using basic context");
                (self.provider.basic_context(&*view), true)
            }
        };
        drop(view);

        self.update(|s| {
            if !s.is_current(attachment) {
                debug!("stale context discarded");
                return Err(SidecarError::PageChanged);
            }
            s.state.current_context = Some(context.clone());
            s.state.context_is_fallback = fallback;
            Ok(context)
        })
    }

    /// Send the pending input, or `prompt` in its place.
    async fn send_message(self: &Arc<Self>, prompt: Option<String>) {
        let started = self.update(|s| {
            if let Some(prompt) = prompt {
                s.state.input = prompt;
            }
            let text = s.state.input.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let Some(attachment) = s.live_attachment() else {
                s.set_error(SidecarError::NoPage);
                return None;
            };
            s.state.messages.push(ChatMessage::user(text));
            s.state.input.clear();
            s.state.last_error = None;
            *s.counter(Flag::Loading) += 1;
            Some(attachment)
        });
        let Some(attachment) = started else {
            return;
        };
        let _loading = FlagGuard {
            inner: Arc::clone(self),
            flag: Flag::Loading,
        };

        let context = match self.refresh_for(&attachment).await {
            Ok(context) => context,
            Err(_) => {
                self.update(|s| {
                    let error = s.superseded_error();
                    s.set_error(error);
                });
                return;
            }
        };

        let (history, model) = self.read(|s| {
            (
                messages::to_turns(&s.state.messages),
                s.state.selected_model.clone(),
            )
        });
        let model = match ModelId::parse(&model) {
            Ok(model) => model,
            Err(e) => {
                self.set_error(e.into());
                return;
            }
        };

        let result = self.backend.chat(&history, &model, Some(&context)).await;

        self.update(|s| {
            if !s.is_current(&attachment) {
                debug!(view_id = %attachment.view.id(), "reply for previous page discarded");
                let error = s.superseded_error();
                s.set_error(error);
                return;
            }
            match result {
                Ok(reply) => s.state.messages.push(ChatMessage::assistant(reply)),
                Err(e) => {
                    warn!(
                        backend = self.backend.name(),
                        %model,
                        error_kind = e.error_kind(),
                        error = %e,
                        "chat failed"
                    );
                    s.set_error(e.into());
                }
            }
        });
    }

    async fn check_connection(&self) {
        let connected = self.backend.check_connection().await;
        self.update(|s| s.state.is_connected = connected);
        info!(backend = self.backend.name(), connected, "connection checked");
        if !connected {
            return;
        }

        match self.backend.list_models().await {
            Ok(models) => self.update(|s| {
                if let Some(first) = models.first() {
                    if !models.contains(&s.state.selected_model) {
                        info!(model = %first, "selected model unavailable, defaulting to first");
                        s.state.selected_model = first.clone();
                    }
                }
                s.state.available_models = models;
            }),
            Err(e) => {
                warn!(error = %e, "model listing failed");
                self.set_error(SidecarError::ModelListing(e));
            }
        }
    }

    async fn summarize_page(self: &Arc<Self>) {
        let Some(attachment) = self.require_attachment() else {
            return;
        };
        match self.refresh_for(&attachment).await {
            Ok(context) if context.has_content() => {
                self.send_message(Some(SUMMARIZE_PAGE_PROMPT.to_string()))
                    .await;
            }
            Ok(_) => self.set_error(SidecarError::NoPageContent),
            Err(_) => self.update(|s| {
                let error = s.superseded_error();
                s.set_error(error);
            }),
        }
    }

    fn cached_selection(&self) -> Option<String> {
        self.read(|s| {
            s.state
                .last_known_selected_text
                .clone()
                .filter(|t| !t.is_empty())
        })
    }

    async fn explain_selection(self: &Arc<Self>) {
        if let Some(text) = self.cached_selection() {
            self.send_message(Some(ActionKind::Explain.prompt(&text)))
                .await;
            return;
        }

        let Some(attachment) = self.require_attachment() else {
            return;
        };
        let Some(view) = attachment.view.upgrade() else {
            self.update(|s| {
                if s.is_current(&attachment) {
                    s.detach();
                }
                s.set_error(SidecarError::NoPage);
            });
            return;
        };
        let fetched = self.provider.extract_selected_text(&*view).await;
        drop(view);

        if !self.read(|s| s.is_current(&attachment)) {
            self.update(|s| {
                let error = s.superseded_error();
                s.set_error(error);
            });
            return;
        }
        match fetched {
            Ok(Some(text)) if !text.is_empty() => {
                self.send_message(Some(ActionKind::Explain.prompt(&text)))
                    .await;
            }
            Ok(_) => self.set_error(SidecarError::NoSelection),
            Err(e) => {
                warn!(error = %e, "selection fetch failed");
                self.set_error(SidecarError::SelectionUnavailable(e));
            }
        }
    }

    async fn ask_about_selection(self: &Arc<Self>, prompt: Option<&str>) {
        let Some(text) = self.cached_selection() else {
            self.set_error(SidecarError::NoSelection);
            return;
        };
        let input = match prompt {
            Some(prompt) => format!("{prompt}: \"{text}\""),
            None => ActionKind::Ask.prompt(&text),
        };
        self.send_message(Some(input)).await;
    }
}
