//! Per-file upload tracking for the documents step.
//!
//! Each picked file gets a client-side id and walks
//! `Pending -> Uploading -> Done | Failed`. Items live in an ordered map so
//! rendering order is pick order, and step completeness is read off the
//! states rather than off which arrays happen to be filled.

use std::collections::BTreeMap;

use crate::api::models::LocalFile;
use crate::api::ApiResult;
use crate::utils::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Document,
    BrandImage,
}

impl UploadKind {
    pub fn label(self) -> &'static str {
        match self {
            UploadKind::Document => "document",
            UploadKind::BrandImage => "brand image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploading,
    Done { remote_url: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub kind: UploadKind,
    pub file: LocalFile,
    pub state: UploadState,
}

impl UploadedFile {
    pub fn remote_url(&self) -> Option<&str> {
        match &self.state {
            UploadState::Done { remote_url } => Some(remote_url),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.state, UploadState::Pending | UploadState::Uploading)
    }
}

/// Files picked during registration, in pick order, each with its own
/// upload state.
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    next_id: u64,
    items: BTreeMap<UploadId, UploadedFile>,
}

impl UploadTracker {
    /// Add a file as [`UploadState::Pending`].
    pub fn enqueue(&mut self, kind: UploadKind, file: LocalFile) -> UploadId {
        self.next_id += 1;
        let id = UploadId(self.next_id);
        self.items.insert(
            id,
            UploadedFile {
                kind,
                file,
                state: UploadState::Pending,
            },
        );
        id
    }

    /// Mark a pending item as uploading. False if it is not pending.
    pub fn start(&mut self, id: UploadId) -> bool {
        match self.items.get_mut(&id) {
            Some(item) if item.state == UploadState::Pending => {
                item.state = UploadState::Uploading;
                true
            }
            _ => false,
        }
    }

    pub fn complete(&mut self, id: UploadId, remote_url: String) {
        if let Some(item) = self.items.get_mut(&id) {
            item.state = UploadState::Done { remote_url };
        }
    }

    pub fn fail(&mut self, id: UploadId, reason: String) {
        if let Some(item) = self.items.get_mut(&id) {
            item.state = UploadState::Failed { reason };
        }
    }

    /// Forget failed items so the user can pick them again.
    pub fn clear_failed(&mut self) {
        self.items
            .retain(|_, item| !matches!(item.state, UploadState::Failed { .. }));
    }

    pub fn get(&self, id: UploadId) -> Option<&UploadedFile> {
        self.items.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UploadId, &UploadedFile)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    pub fn of_kind(&self, kind: UploadKind) -> impl Iterator<Item = (UploadId, &UploadedFile)> {
        self.iter().filter(move |(_, item)| item.kind == kind)
    }

    /// Remote URLs of the finished uploads of one kind, in pick order.
    pub fn attached(&self, kind: UploadKind) -> Vec<String> {
        self.of_kind(kind)
            .filter_map(|(_, item)| item.remote_url().map(str::to_string))
            .collect()
    }

    /// Items still pending or uploading.
    pub fn in_flight(&self) -> usize {
        self.items.values().filter(|item| item.in_flight()).count()
    }

    /// Step-3 gate: at least one document and one brand image, and nothing
    /// still uploading. Failed items do not count either way.
    pub fn check_complete(&self) -> Result<(), ValidationError> {
        let wanted = |kind| {
            self.of_kind(kind)
                .any(|(_, item)| item.in_flight() || item.remote_url().is_some())
        };
        if !wanted(UploadKind::Document) {
            return Err(ValidationError::NoDocuments);
        }
        if !wanted(UploadKind::BrandImage) {
            return Err(ValidationError::NoBrandImages);
        }
        match self.in_flight() {
            0 => Ok(()),
            pending => Err(ValidationError::UploadsPending(pending)),
        }
    }
}

/// What a detached upload hands back: the remote URL or the error.
#[derive(Debug)]
pub struct UploadResult {
    pub id: UploadId,
    pub name: String,
    pub outcome: ApiResult<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of one batch of picked files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatchReport {
    pub attached: usize,
    pub failed: Vec<UploadFailure>,
}

impl UploadBatchReport {
    /// Count one finished file; `failure` is `None` when it was attached.
    pub fn record(&mut self, failure: Option<UploadFailure>) {
        match failure {
            Some(failure) => self.failed.push(failure),
            None => self.attached += 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attached == 0 && self.failed.is_empty()
    }

    /// Alert text naming each failed file; `None` when all went through.
    pub fn alert_message(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.name, f.reason))
            .collect();
        Some(format!(
            "{} of {} file(s) failed to upload:\n{}",
            self.failed.len(),
            self.failed.len() + self.attached,
            lines.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> LocalFile {
        LocalFile::from_path(format!("/tmp/{name}"))
    }

    #[test]
    fn test_state_walk() {
        let mut tracker = UploadTracker::default();
        let id = tracker.enqueue(UploadKind::Document, file("cac.pdf"));
        assert_eq!(tracker.in_flight(), 1);

        assert!(tracker.start(id));
        assert!(!tracker.start(id));
        tracker.complete(id, "https://cdn/cac.pdf".to_string());

        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.attached(UploadKind::Document), vec!["https://cdn/cac.pdf"]);
        assert!(tracker.attached(UploadKind::BrandImage).is_empty());
    }

    #[test]
    fn test_check_complete_requires_both_kinds() {
        let mut tracker = UploadTracker::default();
        assert_eq!(tracker.check_complete(), Err(ValidationError::NoDocuments));

        let doc = tracker.enqueue(UploadKind::Document, file("cac.pdf"));
        tracker.complete(doc, "https://cdn/cac.pdf".to_string());
        assert_eq!(tracker.check_complete(), Err(ValidationError::NoBrandImages));

        let image = tracker.enqueue(UploadKind::BrandImage, file("logo.png"));
        assert_eq!(tracker.check_complete(), Err(ValidationError::UploadsPending(1)));

        tracker.complete(image, "https://cdn/logo.png".to_string());
        assert_eq!(tracker.check_complete(), Ok(()));
    }

    #[test]
    fn test_failed_items_do_not_count() {
        let mut tracker = UploadTracker::default();
        let doc = tracker.enqueue(UploadKind::Document, file("cac.pdf"));
        tracker.complete(doc, "https://cdn/cac.pdf".to_string());
        let image = tracker.enqueue(UploadKind::BrandImage, file("logo.png"));
        tracker.fail(image, "Network error".to_string());

        assert_eq!(tracker.check_complete(), Err(ValidationError::NoBrandImages));

        tracker.clear_failed();
        assert!(tracker.get(image).is_none());
        assert!(tracker.get(doc).is_some());
    }

    #[test]
    fn test_pick_order_is_kept() {
        let mut tracker = UploadTracker::default();
        let ids: Vec<UploadId> = ["a.png", "b.png", "c.png"]
            .iter()
            .map(|n| tracker.enqueue(UploadKind::BrandImage, file(n)))
            .collect();
        // Finish out of order
        tracker.complete(ids[2], "c".to_string());
        tracker.complete(ids[0], "a".to_string());
        tracker.complete(ids[1], "b".to_string());

        assert_eq!(tracker.attached(UploadKind::BrandImage), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_batch_report_names_failed_files() {
        let report = UploadBatchReport {
            attached: 1,
            failed: vec![UploadFailure {
                name: "back.jpg".to_string(),
                reason: "Network error".to_string(),
            }],
        };
        let message = report.alert_message().unwrap();
        assert!(message.starts_with("1 of 2"));
        assert!(message.contains("back.jpg"));
        assert_eq!(UploadBatchReport::default().alert_message(), None);
    }

    #[test]
    fn test_batch_report_records_each_file() {
        let mut report = UploadBatchReport::default();
        assert!(report.is_empty());
        report.record(None);
        report.record(Some(UploadFailure {
            name: "scan.pdf".to_string(),
            reason: "File too large".to_string(),
        }));
        assert_eq!(report.attached, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_empty());
    }
}
