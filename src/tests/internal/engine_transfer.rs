//! 直接追加模式下的完整传输：暂停 / 续传、服务器拒绝、传输中断、未知长度与 416。

use std::sync::Arc;

use crate::engine::DownloadStatus;
use crate::progress::ProgressSink;
use crate::tests::{
    BodyFault, RecordingSink, ScriptedTransport, init_tracing, load_engine, memory_store,
    random_payload, settle, test_config, test_url, wait_for_bytes,
};
use crate::writer::file_size;

fn as_sink(sink: &Arc<RecordingSink>) -> Option<Arc<dyn ProgressSink>> {
    Some(sink.clone() as Arc<dyn ProgressSink>)
}

#[tokio::test]
async fn pause_resume_round_trip_is_byte_identical() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    transport.set_fault(BodyFault::StallAfter(400));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");
    let sink = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    wait_for_bytes(&engine, &url, 400).await;

    engine.pause_download(&url).await;
    assert_eq!(engine.get_status(&url).await, DownloadStatus::Paused);
    let destination = engine.destination_path("a.bin");
    assert_eq!(file_size(&destination).await, Some(400));

    let mut status = engine.watch_status(&url).await.unwrap();
    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    loop {
        if status.changed().await.unwrap() == DownloadStatus::Completed {
            break;
        }
    }

    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
    assert_eq!(transport.requests(), vec![None, Some(400)]);
    assert_eq!(sink.last(), Some((Some(1000), Some(1000))));

    // 已下载字节从不回退
    let reported: Vec<u64> = sink.events().iter().filter_map(|(b, _)| *b).collect();
    assert!(reported.windows(2).all(|w| w[0] <= w[1]), "{reported:?}");
}

#[tokio::test]
async fn transport_failure_sets_error_and_keeps_received_bytes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    transport.set_fault(BodyFault::FailAfter(300));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Error);

    let destination = engine.destination_path("a.bin");
    assert_eq!(file_size(&destination).await, Some(300));

    // Error 不会自动重试，显式 resume 后从断点继续
    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
    assert_eq!(transport.requests(), vec![None, Some(300)]);
}

#[tokio::test]
async fn server_error_pauses_and_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(500);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    transport.push_status(503);
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");

    engine.add_download(&url, None).await.unwrap();
    let destination = engine.destination_path("a.bin");
    tokio::fs::create_dir_all(destination.parent().unwrap()).await.unwrap();
    tokio::fs::write(&destination, &payload[..200]).await.unwrap();

    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Paused);
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), &payload[..200]);

    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
    assert_eq!(transport.requests(), vec![Some(200), Some(200)]);
}

#[tokio::test]
async fn unknown_length_announces_growing_estimates() {
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(2500);
    let transport = Arc::new(ScriptedTransport::new(payload).without_length());
    let config = test_config(dir.path()).estimated_size(1000);
    let engine = load_engine(config, memory_store(), transport).await;
    let url = test_url("stream.bin");
    let sink = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);

    let totals: Vec<u64> = sink.events().iter().filter_map(|(_, t)| *t).collect();
    assert_eq!(totals, vec![1000, 2100, 3200, 2500]);
    assert_eq!(sink.events().first().copied(), Some((Some(0), Some(1000))));
    assert_eq!(sink.last(), Some((Some(2500), Some(2500))));
}

#[tokio::test]
async fn range_not_satisfiable_at_full_size_completes() {
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("done.bin");
    let sink = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    let destination = engine.destination_path("done.bin");
    tokio::fs::create_dir_all(destination.parent().unwrap()).await.unwrap();
    tokio::fs::write(&destination, &payload).await.unwrap();

    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(sink.events(), vec![(Some(1000), Some(1000))]);
    assert_eq!(transport.requests(), vec![Some(1000)]);
}

#[tokio::test]
async fn ignored_range_skips_bytes_already_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()).ignoring_range());
    let engine = load_engine(test_config(dir.path()), memory_store(), transport).await;
    let url = test_url("a.bin");
    let sink = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    let destination = engine.destination_path("a.bin");
    tokio::fs::create_dir_all(destination.parent().unwrap()).await.unwrap();
    tokio::fs::write(&destination, &payload[..400]).await.unwrap();

    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
    assert_eq!(sink.events().first().copied(), Some((Some(400), Some(1000))));
}

#[tokio::test]
async fn empty_resource_completes() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport).await;
    let url = test_url("empty.txt");
    let sink = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(sink.last(), Some((Some(0), Some(0))));
    assert_eq!(file_size(engine.destination_path("empty.txt")).await, Some(0));
}

#[tokio::test]
async fn resume_while_running_only_swaps_sink() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    transport.set_fault(BodyFault::StallAfter(200));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");
    let first = RecordingSink::new();
    let second = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, as_sink(&first)).await.unwrap();
    wait_for_bytes(&engine, &url, 200).await;

    engine.resume_download(&url, as_sink(&second)).await.unwrap();
    assert_eq!(transport.requests().len(), 1);
    let first_count = first.events().len();

    engine.pause_download(&url).await;
    assert_eq!(first.events().len(), first_count);
    assert_eq!(second.events(), vec![(Some(200), None)]);

    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(transport.requests(), vec![None, Some(200)]);
}

#[tokio::test]
async fn remove_during_transfer_stops_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = memory_store();
    let transport = Arc::new(ScriptedTransport::new(random_payload(1000)));
    transport.set_fault(BodyFault::StallAfter(300));
    let engine = load_engine(test_config(dir.path()), store.clone(), transport).await;
    let url = test_url("a.bin");

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, None).await.unwrap();
    wait_for_bytes(&engine, &url, 300).await;

    engine.remove_download(&url).await;
    assert_eq!(engine.get_status(&url).await, DownloadStatus::Invalid);
    assert!(engine.watch_status(&url).await.is_none());
    assert!(crate::record_store::RecordStore::list(store.as_ref()).await.unwrap().is_empty());
    assert_eq!(file_size(engine.destination_path("a.bin")).await, Some(300));
}

#[tokio::test]
async fn short_body_is_an_error_not_completion() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    transport.set_fault(BodyFault::EndAfter(600));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");
    let sink = RecordingSink::new();

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Error);

    let destination = engine.destination_path("a.bin");
    assert_eq!(file_size(&destination).await, Some(600));
    assert!(!sink.events().contains(&(Some(600), Some(600))), "{:?}", sink.events());

    engine.resume_download(&url, as_sink(&sink)).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
    assert_eq!(transport.requests(), vec![None, Some(600)]);
    assert_eq!(sink.last(), Some((Some(1000), Some(1000))));
}

#[tokio::test]
async fn partial_response_from_earlier_start_skips_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()).restarting_ranges());
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");

    engine.add_download(&url, None).await.unwrap();
    let destination = engine.destination_path("a.bin");
    tokio::fs::create_dir_all(destination.parent().unwrap()).await.unwrap();
    tokio::fs::write(&destination, &payload[..400]).await.unwrap();

    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
    assert_eq!(transport.requests(), vec![Some(400)]);
}

#[tokio::test]
async fn resume_during_pause_teardown_starts_exactly_one_transfer() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let payload = random_payload(1000);
    let transport = Arc::new(ScriptedTransport::new(payload.clone()));
    transport.set_fault(BodyFault::StallAfter(400));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");

    engine.add_download(&url, None).await.unwrap();
    engine.resume_download(&url, None).await.unwrap();
    wait_for_bytes(&engine, &url, 400).await;

    // pause 先被轮询：取消任务后挂起等待退出；resume 随后看到已取消的任务，等它退出再启动新任务
    let ((), resumed) = tokio::join!(
        engine.pause_download(&url),
        engine.resume_download(&url, None)
    );
    resumed.unwrap();

    assert_eq!(settle(&engine, &url).await, DownloadStatus::Completed);
    assert_eq!(transport.requests(), vec![None, Some(400)]);
    let destination = engine.destination_path("a.bin");
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), payload);
}

#[tokio::test]
async fn unopenable_destination_sets_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new(random_payload(500)));
    let engine = load_engine(test_config(dir.path()), memory_store(), transport.clone()).await;
    let url = test_url("a.bin");

    engine.add_download(&url, None).await.unwrap();
    // 目标路径被一个目录占住，无法以追加模式打开
    let destination = engine.destination_path("a.bin");
    tokio::fs::create_dir_all(&destination).await.unwrap();

    engine.resume_download(&url, None).await.unwrap();
    assert_eq!(settle(&engine, &url).await, DownloadStatus::Error);
    assert!(destination.is_dir());
    assert_eq!(transport.requests(), vec![None]);
}
