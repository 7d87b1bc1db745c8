//! 进度上报：起始通知、估算总量的增长、单调性与最终 `(n, n)`。

use std::sync::Arc;

use crate::progress::{DownloadProgress, ProgressReporter, ProgressSink, ProgressUpdate, SinkSlot};
use crate::states::unlock_reactive::UnlockReactiveProperty;
use crate::tests::RecordingSink;

fn reporter(step: u64) -> (ProgressReporter, Arc<RecordingSink>, UnlockReactiveProperty<DownloadProgress>) {
    let sink = RecordingSink::new();
    let slot = SinkSlot::new(Some(sink.clone() as Arc<dyn ProgressSink>));
    let state = UnlockReactiveProperty::new(DownloadProgress::default());
    (ProgressReporter::new(slot, state.clone(), step), sink, state)
}

#[test]
fn known_length_reports_bytes_only_mid_stream() {
    let (mut reporter, sink, state) = reporter(1_000);

    reporter.start(0, Some(300));
    reporter.advance(100);
    reporter.advance(200);
    let last = reporter.finish(300);

    assert!(last.is_completion());
    assert_eq!(
        sink.events(),
        vec![
            (Some(0), Some(300)),
            (Some(100), None),
            (Some(200), None),
            (Some(300), Some(300)),
        ]
    );
    let snapshot = state.get_current().unwrap();
    assert_eq!(snapshot.bytes_done, 300);
    assert_eq!(snapshot.total, Some(300));
}

#[test]
fn unknown_length_grows_estimate() {
    let (mut reporter, sink, _) = reporter(1_000);

    reporter.start(500, None);
    reporter.advance(1_200);
    reporter.advance(1_400);
    reporter.advance(2_600);
    reporter.finish(2_700);

    assert_eq!(
        sink.events(),
        vec![
            (Some(500), Some(1_500)),
            (Some(1_200), None),
            (Some(1_400), None),
            (Some(2_600), Some(3_600)),
            (Some(2_700), Some(2_700)),
        ]
    );
}

#[test]
fn decreasing_bytes_are_dropped() {
    let (mut reporter, sink, _) = reporter(1_000);

    reporter.start(0, Some(100));
    assert!(reporter.advance(50).is_some());
    assert!(reporter.advance(40).is_none());
    assert_eq!(reporter.last_bytes(), Some(50));
    assert_eq!(sink.events().len(), 2);
}

#[test]
fn swapped_sink_receives_later_notifications() {
    let first = RecordingSink::new();
    let second = RecordingSink::new();
    let slot = SinkSlot::new(Some(first.clone() as Arc<dyn ProgressSink>));
    let mut reporter = ProgressReporter::new(
        slot.clone(),
        UnlockReactiveProperty::new(DownloadProgress::default()),
        1_000,
    );

    reporter.start(0, Some(10));
    slot.replace(Some(second.clone() as Arc<dyn ProgressSink>));
    reporter.finish(10);

    assert_eq!(first.events(), vec![(Some(0), Some(10))]);
    assert_eq!(second.events(), vec![(Some(10), Some(10))]);
}

#[test]
fn closures_are_sinks() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let captured = seen.clone();
    let sink: Arc<dyn ProgressSink> = Arc::new(move |bytes: Option<u64>, total: Option<u64>| {
        captured.lock().unwrap().push((bytes, total));
    });
    sink.on_progress(Some(1), None);
    assert_eq!(*seen.lock().unwrap(), vec![(Some(1), None)]);
}

#[test]
fn completion_markers() {
    assert!(ProgressUpdate::new(Some(5), Some(5)).is_completion());
    assert!(!ProgressUpdate::new(Some(0), Some(0)).is_completion());
    assert!(!ProgressUpdate::new(Some(4), Some(5)).is_completion());
    assert!(!ProgressUpdate::new(Some(5), None).is_completion());
}
