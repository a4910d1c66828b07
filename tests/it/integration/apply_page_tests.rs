//! Page selection for one file and for the whole library.

use crate::helpers::{PanickingRenderer, TestFolderBuilder, page_color, pump, ready_pages};
use pdfshelf::error::CacheError;
use pdfshelf::library::ThumbnailStatus;
use pdfshelf::manager::{BatchReport, ThumbnailEvent};
use pdfshelf::types::{PageIndex, ThumbnailSize};
use std::fs;
use std::sync::Arc;

fn batch_report(events: &[ThumbnailEvent]) -> BatchReport {
    let reports: Vec<&BatchReport> = events
        .iter()
        .filter_map(|e| match e {
            ThumbnailEvent::BatchFinished(report) => Some(report),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 1, "expected exactly one batch report");
    reports[0].clone()
}

#[test]
fn test_apply_all_continues_past_failures() {
    let fixture = TestFolderBuilder::new()
        .with_pdf("a.pdf", 3)
        .with_pdf("b.pdf", 3)
        .with_corrupt("broken.pdf")
        .with_pdf("c.pdf", 3)
        .with_pdf("d.pdf", 3)
        .build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();

    let id = manager.apply_page_all(&mut library, PageIndex::new(2));
    let events = pump(&mut manager, &mut library);

    let report = batch_report(&events);
    assert_eq!(report.id, id);
    assert_eq!(report.page, PageIndex::new(2));
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.doc("broken.pdf"));
    assert_eq!(report.attempted(), 5);

    assert!(library.entries().iter().all(|e| e.page == PageIndex::new(2)));
    assert_eq!(library.count_with(|s| *s == ThumbnailStatus::Cached), 4);
    assert!(library.entry(&fixture.doc("broken.pdf")).unwrap().is_failed());
    assert_eq!(ready_pages(&events, &fixture.doc("c.pdf")), vec![PageIndex::new(2)]);
}

#[test]
fn test_apply_all_reports_renderer_panic_as_failure() {
    let fixture = TestFolderBuilder::new()
        .with_pdf("a.pdf", 2)
        .with_pdf("panic.pdf", 2)
        .with_pdf("z.pdf", 2)
        .build();
    let renderer = PanickingRenderer::new(Arc::clone(&fixture.renders));
    let mut manager = fixture.manager_with(Box::new(renderer));
    let mut library = fixture.library();

    manager.apply_page_all(&mut library, PageIndex::new(1));
    let events = pump(&mut manager, &mut library);

    let report = batch_report(&events);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.doc("panic.pdf"));
    assert_eq!(ready_pages(&events, &fixture.doc("z.pdf")), vec![PageIndex::new(1)]);

    // The worker survives and serves the next batch
    manager.apply_page_all(&mut library, PageIndex::FIRST);
    let events = pump(&mut manager, &mut library);
    assert_eq!(batch_report(&events).succeeded, 2);
}

#[test]
fn test_apply_all_with_short_documents_falls_back_per_file() {
    let fixture = TestFolderBuilder::new()
        .with_pdf("long.pdf", 5)
        .with_pdf("short.pdf", 1)
        .build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();

    manager.apply_page_all(&mut library, PageIndex::new(3));
    let events = pump(&mut manager, &mut library);

    assert!(batch_report(&events).is_clean());
    let long = library.entry(&fixture.doc("long.pdf")).unwrap();
    assert_eq!(long.page_used, Some(PageIndex::new(3)));
    let short = library.entry(&fixture.doc("short.pdf")).unwrap();
    assert_eq!(short.page, PageIndex::new(3));
    assert_eq!(short.page_used, Some(PageIndex::FIRST));
}

#[test]
fn test_apply_all_on_empty_library_reports_at_once() {
    let fixture = TestFolderBuilder::new().build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();

    manager.apply_page_all(&mut library, PageIndex::new(1));
    assert!(!manager.is_busy());

    let events = manager.process_completions(&mut library);
    let report = batch_report(&events);
    assert_eq!(report.attempted(), 0);
    assert!(report.is_clean());
}

#[test]
fn test_file_deleted_after_scan_fails_within_batch() {
    let fixture = TestFolderBuilder::new()
        .with_pdf("a.pdf", 2)
        .with_pdf("b.pdf", 2)
        .with_pdf("c.pdf", 2)
        .build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();
    fs::remove_file(fixture.doc("b.pdf")).unwrap();

    manager.apply_page_all(&mut library, PageIndex::new(1));
    let events = pump(&mut manager, &mut library);

    let report = batch_report(&events);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.doc("b.pdf"));
    assert!(library.entry(&fixture.doc("b.pdf")).unwrap().is_failed());
    assert_eq!(fixture.render_count(), 2);
}

#[test]
fn test_new_page_does_not_serve_old_thumbnail() {
    let fixture = TestFolderBuilder::new().with_pdf("a.pdf", 4).build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();
    let path = fixture.doc("a.pdf");
    let size = ThumbnailSize::default();

    manager.apply_page(&mut library, &path, PageIndex::new(1)).unwrap();
    pump(&mut manager, &mut library);
    manager.apply_page(&mut library, &path, PageIndex::new(3)).unwrap();
    pump(&mut manager, &mut library);

    let old = manager
        .get_thumbnail(&path, PageIndex::new(1), size)
        .unwrap()
        .ready()
        .unwrap();
    let new = manager
        .get_thumbnail(&path, PageIndex::new(3), size)
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(*old.image.get_pixel(0, 0), page_color(PageIndex::new(1)));
    assert_eq!(*new.image.get_pixel(0, 0), page_color(PageIndex::new(3)));
    assert_ne!(old.image, new.image);
    assert_eq!(library.entry(&path).unwrap().page_used, Some(PageIndex::new(3)));
}

#[test]
fn test_apply_page_forces_rerender_of_cached_page() {
    let fixture = TestFolderBuilder::new().with_pdf("a.pdf", 2).build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();
    let path = fixture.doc("a.pdf");

    manager
        .get_thumbnail(&path, PageIndex::FIRST, ThumbnailSize::default())
        .unwrap();
    pump(&mut manager, &mut library);
    assert_eq!(fixture.render_count(), 1);

    manager.apply_page(&mut library, &path, PageIndex::FIRST).unwrap();
    assert_eq!(library.entry(&path).unwrap().status, ThumbnailStatus::Stale);
    pump(&mut manager, &mut library);

    assert_eq!(fixture.render_count(), 2);
    assert_eq!(library.entry(&path).unwrap().status, ThumbnailStatus::Cached);
}

#[test]
fn test_latest_selection_wins() {
    let fixture = TestFolderBuilder::new().with_pdf("a.pdf", 4).build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();
    let path = fixture.doc("a.pdf");

    manager.apply_page(&mut library, &path, PageIndex::new(1)).unwrap();
    manager.apply_page(&mut library, &path, PageIndex::new(2)).unwrap();
    let events = pump(&mut manager, &mut library);

    assert_eq!(
        ready_pages(&events, &path),
        vec![PageIndex::new(1), PageIndex::new(2)]
    );
    let entry = library.entry(&path).unwrap();
    assert_eq!(entry.page, PageIndex::new(2));
    assert_eq!(entry.page_used, Some(PageIndex::new(2)));
    assert_eq!(entry.status, ThumbnailStatus::Cached);
}

#[test]
fn test_apply_page_to_unknown_file() {
    let fixture = TestFolderBuilder::new().with_pdf("a.pdf", 1).build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();

    let result = manager.apply_page(&mut library, &fixture.doc("other.pdf"), PageIndex::FIRST);
    assert!(matches!(result, Err(CacheError::NotFound(_))));
    assert_eq!(fixture.render_count(), 0);
}

#[test]
fn test_apply_page_to_deleted_file_marks_failed() {
    let fixture = TestFolderBuilder::new().with_pdf("a.pdf", 1).build();
    let mut manager = fixture.manager();
    let mut library = fixture.library();
    let path = fixture.doc("a.pdf");
    fs::remove_file(&path).unwrap();

    let result = manager.apply_page(&mut library, &path, PageIndex::FIRST);
    assert!(matches!(result, Err(CacheError::NotFound(_))));
    assert!(library.entry(&path).unwrap().is_failed());
}
