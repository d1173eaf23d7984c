//! Scripted in-memory parts for BOM tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use partlist_core::part::{Part, PartError, PartId, PartUsage, UNRESOLVED_TITLE};

/// How a mock part behaves when asked to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Resolves on the first refresh.
    Immediate,
    /// Resolves on the given refresh attempt (1-based).
    AfterAttempts(usize),
    /// Refresh returns without ever resolving.
    Never,
    /// Refresh never completes.
    Hang,
}

#[derive(Debug)]
pub struct MockPart {
    id: PartId,
    title: String,
    unit_cost: f64,
    is_abstract: bool,
    is_assembly: bool,
    behavior: Behavior,
    attempts: AtomicUsize,
    resolved: AtomicBool,
    refresh_error: Option<PartError>,
    children: Mutex<Vec<PartUsage>>,
}

impl MockPart {
    pub fn leaf(url: &str) -> Self {
        Self::new(url, false)
    }

    pub fn assembly(url: &str) -> Self {
        Self::new(url, true)
    }

    fn new(url: &str, is_assembly: bool) -> Self {
        let id = PartId::from_url(url).unwrap();
        Self {
            title: format!("Title of {id}"),
            id,
            unit_cost: 0.0,
            is_abstract: false,
            is_assembly,
            behavior: Behavior::Immediate,
            attempts: AtomicUsize::new(0),
            resolved: AtomicBool::new(false),
            refresh_error: None,
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn abstract_part(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.refresh_error = Some(PartError::refresh_failed(self.id.as_str(), reason));
        self
    }

    pub fn with_child(self, part: &Arc<MockPart>, quantity: u64) -> Self {
        self.add_child(part, quantity);
        self
    }

    pub fn add_child(&self, part: &Arc<MockPart>, quantity: u64) {
        let child: Arc<dyn Part> = Arc::clone(part) as Arc<dyn Part>;
        self.children
            .lock()
            .unwrap()
            .push(PartUsage::new(child, quantity));
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Part for MockPart {
    fn id(&self) -> &PartId {
        &self.id
    }

    fn url(&self) -> &str {
        self.id.as_str()
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
        self.is_resolved()
    }

    fn refresh_error(&self) -> Option<PartError> {
        self.refresh_error.clone()
    }

    fn last_refresh_age(&self) -> Option<Duration> {
        self.is_resolved().then_some(Duration::ZERO)
    }

    fn children(&self) -> Vec<PartUsage> {
        self.children.lock().unwrap().clone()
    }

    async fn refresh(&self) {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.behavior {
            Behavior::Immediate => self.resolved.store(true, Ordering::SeqCst),
            Behavior::AfterAttempts(needed) if attempt >= needed => {
                self.resolved.store(true, Ordering::SeqCst);
            }
            Behavior::AfterAttempts(_) | Behavior::Never => {}
            Behavior::Hang => std::future::pending::<()>().await,
        }
    }
}

/// Erases the concrete type for APIs that take `Arc<dyn Part>`.
pub fn dyn_part(part: &Arc<MockPart>) -> Arc<dyn Part> {
    Arc::clone(part) as Arc<dyn Part>
}
