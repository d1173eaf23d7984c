//! In-memory parts for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::part::{Part, PartError, PartId, PartUsage, UNRESOLVED_TITLE};

#[derive(Debug)]
pub(crate) struct StubPart {
    id: PartId,
    url: String,
    title: String,
    unit_cost: f64,
    is_abstract: bool,
    is_assembly: bool,
    resolves: bool,
    resolved: AtomicBool,
    fresh: AtomicBool,
    refreshes: AtomicUsize,
    refresh_error: Option<PartError>,
    children: Mutex<Vec<PartUsage>>,
}

pub(crate) struct StubBuilder {
    part: StubPart,
}

impl StubPart {
    pub(crate) fn leaf(url: &str) -> StubBuilder {
        StubBuilder::new(url, false)
    }

    pub(crate) fn assembly(url: &str) -> StubBuilder {
        StubBuilder::new(url, true)
    }

    pub(crate) fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl StubBuilder {
    fn new(url: &str, is_assembly: bool) -> Self {
        #[allow(clippy::unwrap_used)]
        let id = PartId::from_url(url).unwrap();
        Self {
            part: StubPart {
                url: id.to_string(),
                title: format!("Part {}", id.as_str().rsplit('/').next().unwrap_or_default()),
                id,
                unit_cost: 0.0,
                is_abstract: false,
                is_assembly,
                resolves: true,
                resolved: AtomicBool::new(false),
                fresh: AtomicBool::new(false),
                refreshes: AtomicUsize::new(0),
                refresh_error: None,
                children: Mutex::new(Vec::new()),
            },
        }
    }

    pub(crate) fn cost(mut self, unit_cost: f64) -> Self {
        self.part.unit_cost = unit_cost;
        self
    }

    pub(crate) fn abstract_part(mut self) -> Self {
        self.part.is_abstract = true;
        self
    }

    pub(crate) fn resolved(self) -> Self {
        self.part.resolved.store(true, Ordering::SeqCst);
        self.part.fresh.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn stale(self) -> Self {
        self.part.resolved.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn never_resolves(mut self) -> Self {
        self.part.resolves = false;
        self
    }

    pub(crate) fn failing(mut self, reason: &str) -> Self {
        self.part.refresh_error = Some(PartError::refresh_failed(self.part.url.clone(), reason));
        self
    }

    pub(crate) fn child(self, part: Arc<dyn Part>, quantity: u64) -> Self {
        if let Ok(mut children) = self.part.children.lock() {
            children.push(PartUsage::new(part, quantity));
        }
        self
    }

    pub(crate) fn build_stub(self) -> Arc<StubPart> {
        Arc::new(self.part)
    }

    pub(crate) fn build(self) -> Arc<dyn Part> {
        self.build_stub()
    }
}

#[async_trait]
impl Part for StubPart {
    fn id(&self) -> &PartId {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn title(&self) -> String {
        if self.is_resolved() {
            self.title.clone()
        } else {
            UNRESOLVED_TITLE.to_string()
        }
    }

    fn unit_cost(&self) -> f64 {
        self.unit_cost
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn is_assembly(&self) -> bool {
        self.is_assembly
    }

    fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::SeqCst)
    }

    fn refresh_error(&self) -> Option<PartError> {
        self.refresh_error.clone()
    }

    fn last_refresh_age(&self) -> Option<Duration> {
        self.is_resolved().then_some(Duration::ZERO)
    }

    fn children(&self) -> Vec<PartUsage> {
        self.children
            .lock()
            .map(|children| children.clone())
            .unwrap_or_default()
    }

    async fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.resolves {
            self.resolved.store(true, Ordering::SeqCst);
            self.fresh.store(true, Ordering::SeqCst);
        }
    }
}
