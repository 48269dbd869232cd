//! Sequential page processing with cooperative stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use upscaler_types::models::ImageSize;

use crate::auth::PageUpscaler;
use crate::types::{Page, PageStatus, RunSummary};

/// Shared stop request. Checked between pages, never interrupts a call in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PageProcessor {
    upscaler: Arc<dyn PageUpscaler>,
    resolution: ImageSize,
    cancel: CancellationFlag,
}

impl PageProcessor {
    pub fn new(upscaler: Arc<dyn PageUpscaler>, resolution: ImageSize) -> Self {
        Self { upscaler, resolution, cancel: CancellationFlag::new() }
    }

    /// Handle for requesting a stop from another task.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Process every selected page without a result, in order.
    ///
    /// A stop left over from a previous run is cleared on entry. Failed pages
    /// are marked and skipped; there are no retries.
    pub async fn run(&self, pages: &mut [Page]) -> RunSummary {
        self.cancel.reset();
        let mut summary = RunSummary::default();

        let pending = pages.iter().filter(|p| p.needs_processing()).count();
        if pending == 0 {
            info!("No pages selected for processing");
            return summary;
        }
        info!("Processing {} page(s) at {}", pending, self.resolution);

        for page in pages.iter_mut() {
            if !page.needs_processing() {
                continue;
            }
            if self.cancel.is_cancelled() {
                info!("Stop requested, leaving remaining pages untouched");
                summary.stopped = true;
                break;
            }

            page.status = PageStatus::Processing;
            page.resolution = Some(self.resolution);

            match self.upscaler.upscale(&page.source, self.resolution).await {
                Ok(outcome) => {
                    page.result = Some(outcome.image);
                    page.status = PageStatus::Completed;
                    summary.completed += 1;
                    if outcome.quota.is_some() {
                        summary.quota = outcome.quota;
                    }
                },
                Err(e) => {
                    error!("Page {} ({}) failed: {}", page.index + 1, page.source.name, e);
                    if let Some(quota) = e.quota() {
                        summary.quota = Some(quota);
                    }
                    page.status = PageStatus::Error(e.to_string());
                    summary.failed += 1;
                },
            }
        }

        info!(
            "Run finished: {} completed, {} failed{}",
            summary.completed,
            summary.failed,
            if summary.stopped { " (stopped)" } else { "" }
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::types::{PageImage, UpscaleOutcome, UpscaledImage};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use upscaler_types::models::Quota;

    /// Fails pages whose name is listed; optionally stops after the first call.
    struct ScriptedUpscaler {
        fail: Vec<&'static str>,
        stop_after_first: Option<CancellationFlag>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedUpscaler {
        fn new(fail: Vec<&'static str>) -> Self {
            Self { fail, stop_after_first: None, calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl PageUpscaler for ScriptedUpscaler {
        async fn upscale(&self, page: &PageImage, _size: ImageSize) -> Result<UpscaleOutcome, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(page.name.clone());
            if let Some(flag) = &self.stop_after_first {
                flag.cancel();
            }
            let quota = Quota::new(10, 9 - n as i64);
            if self.fail.contains(&page.name.as_str()) {
                return Err(ClientError::Rejected { status: 500, message: "boom".into(), quota: Some(quota) });
            }
            Ok(UpscaleOutcome {
                image: UpscaledImage { bytes: vec![1, 2, 3], mime_type: "image/png".into() },
                quota: Some(quota),
            })
        }
    }

    fn page(index: usize, name: &str) -> Page {
        Page::new(
            index,
            PageImage { name: name.into(), bytes: vec![0], mime_type: "image/png".into(), width: 4, height: 3 },
        )
    }

    #[tokio::test]
    async fn test_skips_unselected_and_completed_pages() {
        let upscaler = Arc::new(ScriptedUpscaler::new(vec![]));
        let processor = PageProcessor::new(upscaler.clone(), ImageSize::FourK);
        let mut pages = vec![page(0, "a"), page(1, "b"), page(2, "c")];
        pages[1].selected = false;
        pages[2].result = Some(UpscaledImage { bytes: vec![9], mime_type: "image/png".into() });

        let summary = processor.run(&mut pages).await;

        assert_eq!(*upscaler.seen.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(summary.completed, 1);
        assert_eq!(pages[0].status, PageStatus::Completed);
        assert_eq!(pages[0].resolution, Some(ImageSize::FourK));
        assert_eq!(pages[1].status, PageStatus::Pending);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_run() {
        let upscaler = Arc::new(ScriptedUpscaler::new(vec!["b"]));
        let processor = PageProcessor::new(upscaler.clone(), ImageSize::TwoK);
        let mut pages = vec![page(0, "a"), page(1, "b"), page(2, "c")];

        let summary = processor.run(&mut pages).await;

        assert_eq!(summary, RunSummary { completed: 2, failed: 1, stopped: false, quota: Some(Quota::new(10, 7)) });
        assert!(matches!(pages[1].status, PageStatus::Error(_)));
        assert!(pages[1].result.is_none());
        assert_eq!(upscaler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stop_finishes_current_page_then_halts() {
        let mut upscaler = ScriptedUpscaler::new(vec![]);
        let stop_flag = CancellationFlag::new();
        upscaler.stop_after_first = Some(stop_flag.clone());
        let upscaler = Arc::new(upscaler);

        let processor = PageProcessor { upscaler: upscaler.clone(), resolution: ImageSize::TwoK, cancel: stop_flag };
        let mut pages = vec![page(0, "a"), page(1, "b")];

        let summary = processor.run(&mut pages).await;

        assert!(summary.stopped);
        assert_eq!(summary.completed, 1);
        assert_eq!(pages[0].status, PageStatus::Completed);
        assert_eq!(pages[1].status, PageStatus::Pending);
        assert_eq!(upscaler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_stop_is_cleared_on_start() {
        let upscaler = Arc::new(ScriptedUpscaler::new(vec![]));
        let processor = PageProcessor::new(upscaler, ImageSize::TwoK);
        processor.cancellation().cancel();
        let mut pages = vec![page(0, "a")];

        let summary = processor.run(&mut pages).await;

        assert!(!summary.stopped);
        assert_eq!(summary.completed, 1);
    }
}
