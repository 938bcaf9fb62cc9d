use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use url::Url;

use orbit_core::context::{PageContext, WebView};
use orbit_core::errors::ExtractionError;
use orbit_core::ids::ViewId;
use orbit_core::provider::PageContextProvider;

/// A view whose address and title are plain values, navigable by hand.
#[derive(Debug)]
pub struct StaticPage {
    id: ViewId,
    location: RwLock<(Option<Url>, Option<String>)>,
}

impl StaticPage {
    pub fn new(url: Option<Url>, title: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ViewId::new(),
            location: RwLock::new((url, title)),
        })
    }

    pub fn blank() -> Arc<Self> {
        Self::new(None, None)
    }

    pub fn navigate(&self, url: Option<Url>, title: Option<String>) {
        *self.location.write() = (url, title);
    }
}

impl WebView for StaticPage {
    fn id(&self) -> &ViewId {
        &self.id
    }

    fn url(&self) -> Option<Url> {
        self.location.read().0.clone()
    }

    fn title(&self) -> Option<String> {
        self.location.read().1.clone()
    }
}

#[derive(Default)]
struct PageScript {
    content: Option<String>,
    selection: Option<String>,
    extract_failure: Option<ExtractionError>,
    selection_failure: Option<ExtractionError>,
    extract_delays: VecDeque<Duration>,
    monitoring_installs: usize,
}

/// Page-context provider serving scripted content per view.
///
/// Extraction reads the view's own url and title and adds whatever text was scripted for it.
/// Queued delays are consumed one per `extract_context` call.
#[derive(Default)]
pub struct StaticPageProvider {
    pages: Mutex<HashMap<ViewId, PageScript>>,
    extract_calls: Mutex<usize>,
}

impl StaticPageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<R>(&self, view: &ViewId, f: impl FnOnce(&mut PageScript) -> R) -> R {
        let mut pages = self.pages.lock();
        f(pages.entry(view.clone()).or_default())
    }

    pub fn set_content(&self, view: &ViewId, content: impl Into<String>) {
        let content = content.into();
        self.with_script(view, |s| s.content = Some(content));
    }

    pub fn set_selection(&self, view: &ViewId, selection: Option<&str>) {
        self.with_script(view, |s| s.selection = selection.map(str::to_string));
    }

    pub fn fail_extraction(&self, view: &ViewId, error: Option<ExtractionError>) {
        self.with_script(view, |s| s.extract_failure = error);
    }

    pub fn fail_selection(&self, view: &ViewId, error: Option<ExtractionError>) {
        self.with_script(view, |s| s.selection_failure = error);
    }

    pub fn push_extract_delay(&self, view: &ViewId, delay: Duration) {
        self.with_script(view, |s| s.extract_delays.push_back(delay));
    }

    pub fn monitoring_installs(&self, view: &ViewId) -> usize {
        self.with_script(view, |s| s.monitoring_installs)
    }

    pub fn extract_calls(&self) -> usize {
        *self.extract_calls.lock()
    }
}

#[async_trait]
impl PageContextProvider for StaticPageProvider {
    async fn extract_context(&self, view: &dyn WebView) -> Result<PageContext, ExtractionError> {
        *self.extract_calls.lock() += 1;
        let delay = self.with_script(view.id(), |s| s.extract_delays.pop_front());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (content, selection, failure) = self.with_script(view.id(), |s| {
            (s.content.clone(), s.selection.clone(), s.extract_failure.clone())
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(PageContext {
            url: view.url(),
            title: view.title(),
            selected_text: selection,
            page_content: content,
        })
    }

    async fn extract_selected_text(
        &self,
        view: &dyn WebView,
    ) -> Result<Option<String>, ExtractionError> {
        self.with_script(view.id(), |s| match &s.selection_failure {
            Some(err) => Err(err.clone()),
            None => Ok(s.selection.clone().filter(|t| !t.is_empty())),
        })
    }

    async fn install_selection_monitoring(&self, view: &dyn WebView) {
        self.with_script(view.id(), |s| s.monitoring_installs += 1);
    }
}
