mod support;

use std::time::Duration;

use support::{MemoryFetcher, config, key, runtime};
use wordcount_core::WordCountError;
use wordcount_core::orchestration::{CountsTabulatedForDocument, JobEventPayload, Recipient};
use wordcount_core::orchestration::messages::{AggregatorCommand, AggregatorKey};
use wordcount_model::ProcessingStatus;

const A: &str = "http://docs.test/a";
const B: &str = "http://docs.test/b";
const C: &str = "http://docs.test/c";

#[tokio::test]
async fn batch_counts_are_merged_across_documents() {
    let fetcher = MemoryFetcher::new().page(A, "x y y").page(B, "y z z z");
    let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));

    let job = runtime.start_job(vec![key(A), key(B)]).unwrap();
    let report = job.results().await.unwrap();

    let mut merged = report.counts.to_map().into_iter().collect::<Vec<_>>();
    merged.sort();
    assert_eq!(
        merged,
        vec![("x".to_string(), 1), ("y".to_string(), 3), ("z".to_string(), 3)]
    );
    assert_eq!(report.completed(), 2);
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unreachable_document_is_marked_timed_out() {
    let fetcher = MemoryFetcher::new().unreachable_page(A);
    let runtime = runtime(fetcher, config(Duration::from_secs(2), Duration::from_secs(60)));

    let job = runtime.spawn_job();
    let mut results = job.subscribe().unwrap();
    job.start(vec![key(A)]).unwrap();

    let report = results.recv().await.unwrap();
    assert_eq!(report.status_of(&key(A)), Some(ProcessingStatus::FailedTimeout));
    assert!(report.counts.is_empty());
    assert!(results.recv().await.is_none());
}

#[tokio::test]
async fn broken_document_is_isolated_from_its_sibling() {
    let fetcher = MemoryFetcher::new()
        .broken_page(A, "connection reset")
        .page(B, "hi hi hi hi hi");
    let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));

    let report = runtime
        .start_job(vec![key(A), key(B)])
        .unwrap()
        .results()
        .await
        .unwrap();

    assert_eq!(report.status_of(&key(A)), Some(ProcessingStatus::FailedError));
    assert_eq!(report.status_of(&key(B)), Some(ProcessingStatus::Completed));
    assert_eq!(report.counts.count("hi"), 5);
    assert_eq!(report.counts.len(), 1);
}

#[tokio::test]
async fn completion_order_does_not_change_the_merge() {
    let bodies = [(A, "red green"), (B, "green blue blue"), (C, "red red")];

    let mut reports = Vec::new();
    for delays in [[30, 10, 1], [1, 10, 30], [10, 30, 1]] {
        let fetcher = bodies
            .iter()
            .zip(delays)
            .fold(MemoryFetcher::new(), |fetcher, ((uri, body), delay)| {
                fetcher.slow_page(uri, Duration::from_millis(delay), body)
            });
        let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));
        let report = runtime
            .start_job(vec![key(A), key(B), key(C)])
            .unwrap()
            .results()
            .await
            .unwrap();
        reports.push(report.counts.to_map());
    }

    assert_eq!(reports[0], reports[1]);
    assert_eq!(reports[1], reports[2]);
    assert_eq!(reports[0]["red"], 3);
    assert_eq!(reports[0]["blue"], 2);
}

#[tokio::test]
async fn subscribers_registered_before_start_each_get_one_report() {
    let fetcher = MemoryFetcher::new().page(A, "one two three four five six");
    let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));

    let job = runtime.spawn_job();
    let mut receivers: Vec<_> = (0..5).map(|_| job.subscribe().unwrap()).collect();
    job.start(vec![key(A)]).unwrap();

    for receiver in receivers.iter_mut() {
        let report = receiver.recv().await.unwrap();
        assert_eq!(report.counts.total_words(), 6);
        assert!(receiver.recv().await.is_none());
    }
    assert!(matches!(job.results().await, Err(WordCountError::JobTerminated)));
}

#[tokio::test]
async fn finalized_aggregator_serves_late_queries_from_the_same_snapshot() {
    let fetcher = MemoryFetcher::new().page(A, "alpha beta alpha");
    let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));

    let job = runtime.start_job(vec![key(A)]).unwrap();
    let report = job.results().await.unwrap();
    assert_eq!(report.counts.count("alpha"), 2);

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let (requester, mut rx) = Recipient::<CountsTabulatedForDocument>::channel();
        runtime
            .registry()
            .tell(AggregatorCommand::SubscribeOnCompletion {
                key: AggregatorKey::new(job.id(), key(A)),
                requester,
            })
            .unwrap();
        snapshots.push(rx.recv().await.unwrap().counts);
    }
    assert!(snapshots[0].ptr_eq(&snapshots[1]));
    assert_eq!(snapshots[0].count("alpha"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_over_one_document_keep_their_own_counts() {
    let body = vec!["word"; 2_000].join(" ");
    let fetcher = MemoryFetcher::new().page(A, &body);
    let mut config = config(Duration::from_secs(30), Duration::from_secs(5));
    config.parser.chunk_size = 1;
    let runtime = runtime(fetcher, config);

    let jobs = [runtime.spawn_job(), runtime.spawn_job()];
    let mut receivers: Vec<_> = jobs.iter().map(|job| job.subscribe().unwrap()).collect();
    for job in &jobs {
        job.start(vec![key(A)]).unwrap();
    }

    for receiver in receivers.iter_mut() {
        let report = receiver.recv().await.unwrap();
        assert_eq!(report.status_of(&key(A)), Some(ProcessingStatus::Completed));
        assert_eq!(report.counts.count("word"), 2_000);
        assert_eq!(report.counts.len(), 1);
    }
}

#[tokio::test]
async fn later_job_counts_a_fresh_fetch_of_the_same_document() {
    let fetcher = MemoryFetcher::new().page(A, "old old");
    let runtime = runtime(fetcher.clone(), config(Duration::from_secs(30), Duration::from_secs(5)));

    let first = runtime.start_job(vec![key(A)]).unwrap().results().await.unwrap();
    assert_eq!(first.counts.count("old"), 2);

    let _ = fetcher.page(A, "new");
    let second = runtime.start_job(vec![key(A)]).unwrap().results().await.unwrap();
    assert_eq!(second.counts.count("new"), 1);
    assert_eq!(second.counts.get("old"), None);
}

#[tokio::test]
async fn job_events_trace_the_lifecycle() {
    let fetcher = MemoryFetcher::new()
        .page(A, "a b")
        .broken_page(B, "gone");
    let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));
    let mut events = runtime.events().subscribe();

    let job = runtime.start_job(vec![key(A), key(B)]).unwrap();
    let job_id = job.id();
    job.results().await.unwrap();

    let mut payloads = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.job_id, job_id);
        payloads.push(event.payload);
    }

    assert!(matches!(payloads.first(), Some(JobEventPayload::Started { .. })));
    assert!(payloads.contains(&JobEventPayload::DocumentStatusChanged {
        document: key(B),
        status: ProcessingStatus::FailedError,
    }));
    assert_eq!(
        payloads.last(),
        Some(&JobEventPayload::Finished {
            completed: 1,
            failed: 1,
            timed_out: 0,
            distinct_words: 2,
            forced: false,
        })
    );
}

#[tokio::test]
async fn jobs_started_after_shutdown_still_report() {
    let fetcher = MemoryFetcher::new().page(A, "never fetched");
    let runtime = runtime(fetcher, config(Duration::from_secs(30), Duration::from_secs(5)));
    runtime.shutdown().await;
    assert!(runtime.is_shut_down());

    let report = runtime.start_job(vec![key(A)]).unwrap().results().await.unwrap();
    assert_eq!(report.status_of(&key(A)), Some(ProcessingStatus::FailedError));
    assert!(report.counts.is_empty());
}
