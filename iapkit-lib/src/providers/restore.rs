//! Bookkeeping for one restore operation across result pages.

use std::collections::BTreeSet;

use crate::product::PurchaseRecord;
use crate::providers::core::ProviderCore;
use crate::state::PurchaseState;

/// Restored products of a single restore operation.
///
/// Each product is announced once even when it appears on several pages.
/// Finishing a run that restored nothing emits the empty-id sentinel so the
/// host knows the restore is complete.
#[derive(Debug, Default)]
pub struct RestoreRun {
    restored: BTreeSet<String>,
    pages: u32,
}

impl RestoreRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a fetched page. Returns the page number.
    pub fn next_page(&mut self) -> u32 {
        self.pages += 1;
        self.pages
    }

    /// Upsert and own a restorable record, announcing it the first time.
    pub fn restore(&mut self, core: &ProviderCore, record: &PurchaseRecord) -> bool {
        core.record_purchase(record, PurchaseState::Restored);
        if !self.restored.insert(record.product_id.clone()) {
            return false;
        }
        core.observer()
            .purchase_state_changed(&record.product_id, PurchaseState::Restored);
        true
    }

    pub fn restored(&self) -> &BTreeSet<String> {
        &self.restored
    }

    /// Close the run. Returns how many products were restored.
    pub fn finish(self, core: &ProviderCore) -> usize {
        if self.restored.is_empty() {
            core.observer().purchase_state_changed("", PurchaseState::Restored);
        }
        tracing::info!(
            vendor = %core.vendor(),
            restored = self.restored.len(),
            pages = self.pages,
            "restore finished"
        );
        self.restored.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::core::ProviderContext;
    use crate::state::Vendor;
    use crate::test_utils::{assert_quiet, next_event, ObserverEvent, RecordingObserver};
    use tokio::runtime::Handle;

    #[tokio::test]
    async fn duplicates_across_pages_are_announced_once() {
        let core = ProviderCore::new(Vendor::Samsung, ProviderContext::new(Handle::current()));
        let (observer, mut events) = RecordingObserver::channel();
        core.observer().set(observer);

        let mut run = RestoreRun::new();
        run.next_page();
        assert!(run.restore(&core, &PurchaseRecord::new("a")));
        assert!(run.restore(&core, &PurchaseRecord::new("b")));
        run.next_page();
        assert!(!run.restore(&core, &PurchaseRecord::new("b")));
        assert_eq!(run.finish(&core), 2);

        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("a".into(), PurchaseState::Restored)
        );
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("b".into(), PurchaseState::Restored)
        );
        assert_quiet(&mut events).await;
        assert_eq!(core.owned().to_vec(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_run_emits_sentinel() {
        let core = ProviderCore::new(Vendor::Amazon, ProviderContext::new(Handle::current()));
        let (observer, mut events) = RecordingObserver::channel();
        core.observer().set(observer);

        assert_eq!(RestoreRun::new().finish(&core), 0);
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged(String::new(), PurchaseState::Restored)
        );
        assert_quiet(&mut events).await;
    }
}
