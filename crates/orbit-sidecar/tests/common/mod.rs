#![allow(dead_code)]

use std::sync::Arc;

use url::Url;

use orbit_core::context::{ViewHandle, WebView};
use orbit_core::events::BridgeEvent;
use orbit_llm::mock::MockBackend;
use orbit_sidecar::{
    EventBus, MenuActionDispatcher, SessionController, StaticPage, StaticPageProvider,
};

pub struct Harness {
    pub bus: Arc<EventBus>,
    pub provider: Arc<StaticPageProvider>,
    pub backend: Arc<MockBackend>,
    pub controller: SessionController,
    pub page: Arc<StaticPage>,
}

impl Harness {
    /// Controller with its connection check finished and nothing attached.
    pub async fn detached(backend: MockBackend) -> Self {
        let bus = Arc::new(EventBus::new());
        let provider = Arc::new(StaticPageProvider::new());
        let backend = Arc::new(backend);
        let controller = SessionController::new(
            Arc::clone(&bus),
            provider.clone(),
            backend.clone(),
            "llama3.2",
        );
        controller.settle().await;
        Self {
            bus,
            provider,
            backend,
            controller,
            page: docs_page(),
        }
    }

    /// Controller attached to a "Docs" page, initial refresh complete.
    pub async fn attached(backend: MockBackend) -> Self {
        let harness = Self::detached(backend).await;
        harness.provider.set_content(harness.page.id(), "Rust docs body.");
        harness.controller.attach(ViewHandle::new(&harness.page));
        harness.controller.settle().await;
        harness
    }

    pub fn dispatcher(&self) -> MenuActionDispatcher {
        MenuActionDispatcher::new(Arc::clone(&self.bus), self.provider.clone())
    }

    pub fn select(&self, page: &StaticPage, text: &str) {
        self.bus
            .publish(&BridgeEvent::selection_changed(page.id().clone(), text));
    }

    pub fn finish_navigation(&self, page: &StaticPage) {
        self.bus.publish(&BridgeEvent::finished_navigation(
            page.id().clone(),
            page.url(),
            page.title(),
        ));
    }
}

pub fn docs_page() -> Arc<StaticPage> {
    StaticPage::new(
        Some(Url::parse("https://docs.example.com/guide").unwrap()),
        Some("Docs".into()),
    )
}

pub fn other_page() -> Arc<StaticPage> {
    StaticPage::new(
        Some(Url::parse("https://news.example.org/").unwrap()),
        Some("News".into()),
    )
}
