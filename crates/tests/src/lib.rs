//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 同步器在多流场景下的性质测试
//! - 多线程生产者与轮询捕获
//! - 配置到同步器的端到端装配

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::State::ALL.len(), 4);
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use sync_engine::{
        AnyBefore, Batch, Before, Captor, CaptureRange, Chunk, CountBefore, Deadline, Dispatch, Latched,
        LockingStrategy, Next, Policy, Ranged, State, Synchronizer, Throttled,
    };

    type Output = Vec<Dispatch<i64, u32>>;

    fn captor(
        stream: &str,
        capacity: usize,
        policy: impl Into<Policy<i64, u32>>,
    ) -> Arc<Captor<i64, u32>> {
        Arc::new(
            Captor::builder(stream)
                .capacity(capacity)
                .policy(policy)
                .build()
                .unwrap(),
        )
    }

    fn fill(captor: &Captor<i64, u32>, stamps: &[i64]) {
        for &t in stamps {
            captor.insert(t, t as u32);
        }
    }

    fn stamps_of(output: &Output) -> Vec<i64> {
        output.iter().map(|d| d.stamp).collect()
    }

    fn outputs(n: usize) -> Vec<Output> {
        vec![Vec::new(); n]
    }

    #[test]
    fn test_queues_stay_sorted_under_concurrent_inserts() {
        let lidar = captor("lidar", 1024, Ranged::new(0));

        let handles: Vec<_> = (0..4i64)
            .map(|worker| {
                let lidar = Arc::clone(&lidar);
                std::thread::spawn(move || {
                    for k in (0..100i64).rev() {
                        lidar.insert(k * 4 + worker, worker as u32);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stamps = lidar.stamps();
        assert_eq!(stamps.len(), 400);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_driver_with_ranged_follower_retries() {
        let camera = captor("camera", 8, Next);
        let lidar = captor("lidar", 8, Ranged::new(0));
        fill(&camera, &[5, 10, 15]);
        fill(&lidar, &[4, 6, 9, 14, 20]);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&lidar)]).unwrap();
        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();

        assert_eq!(result.state, State::Retry);
        assert!(out.iter().all(Vec::is_empty));
        assert_eq!(camera.stamps(), vec![5, 10, 15]);
        assert_eq!(lidar.stamps(), vec![4, 6, 9, 14, 20]);
    }

    #[test]
    fn test_batch_driver_with_ranged_follower_primes() {
        let camera = captor("camera", 8, Batch::new(2).unwrap());
        let lidar = captor("lidar", 8, Ranged::new(0));
        fill(&camera, &[5, 10, 15]);
        fill(&lidar, &[4, 6, 9, 14, 20]);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&lidar)]).unwrap();
        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();

        assert_eq!(result.state, State::Primed);
        assert_eq!(result.range, Some(CaptureRange::new(5, 10)));
        assert_eq!(stamps_of(&out[0]), vec![5, 10]);
        assert_eq!(stamps_of(&out[1]), vec![6, 9]);
        assert_eq!(camera.stamps(), vec![15]);
        assert_eq!(lidar.stamps(), vec![14, 20]);
    }

    #[test]
    fn test_chunk_driver_hands_ranged_follower_whole_span() {
        let camera = captor("camera", 8, Chunk::new(10).unwrap());
        let lidar = captor("lidar", 16, Ranged::new(0));
        fill(&camera, &[0, 3, 10, 13, 20]);
        fill(&lidar, &[1, 5, 8, 12, 15, 18, 25]);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&lidar)]).unwrap();
        let mut windows = Vec::new();
        let mut delivered = Vec::new();
        loop {
            let mut out = outputs(2);
            let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
            if !result.is_primed() {
                break;
            }
            windows.push(result.range.unwrap());
            delivered.extend(stamps_of(&out[1]));
        }

        assert_eq!(windows, vec![CaptureRange::new(0, 9), CaptureRange::new(10, 19)]);
        assert_eq!(delivered, vec![1, 5, 8, 12, 15, 18]);
        assert_eq!(camera.stamps(), vec![20]);
        assert_eq!(lidar.stamps(), vec![25]);
    }

    #[test]
    fn test_count_before_yields_each_dispatch_once() {
        let camera = captor("camera", 8, Next);
        let imu = captor("imu", 16, CountBefore::new(2, 0).unwrap());
        fill(&camera, &[5, 10, 12]);
        fill(&imu, &[3, 4, 8, 9, 11, 13]);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&imu)]).unwrap();

        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Primed);
        assert_eq!(stamps_of(&out[1]), vec![3, 4]);

        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Primed);
        assert_eq!(stamps_of(&out[1]), vec![8, 9]);

        // 11 alone precedes 12 and 13 closes the gap
        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Abort);
        assert!(out.iter().all(Vec::is_empty));
        assert!(camera.is_empty());
        assert_eq!(imu.stamps(), vec![11, 13]);
    }

    #[test]
    fn test_every_dispatch_consumed_at_most_once() {
        let camera = captor("camera", 64, Batch::new(3).unwrap());
        let imu = captor("imu", 256, Before::new(0));
        let gps = captor("gps", 64, AnyBefore::new(0));
        fill(&camera, &(0..30).map(|k| k * 10).collect::<Vec<_>>());
        fill(&imu, &(0..150).map(|k| k * 2 + 1).collect::<Vec<_>>());
        fill(&gps, &(0..30).map(|k| k * 10 + 7).collect::<Vec<_>>());

        let sync = Synchronizer::new(camera, vec![imu, gps]).unwrap();
        let mut seen: Vec<HashSet<i64>> = vec![HashSet::new(); 3];
        let mut primed = 0;

        loop {
            let mut out = outputs(3);
            let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
            if result.state != State::Primed {
                break;
            }
            primed += 1;
            for (set, output) in seen.iter_mut().zip(&out) {
                for dispatch in output {
                    assert!(set.insert(dispatch.stamp), "stamp {} emitted twice", dispatch.stamp);
                }
            }
        }

        assert_eq!(primed, 10);
        assert_eq!(seen[0].len(), 30);
    }

    #[test]
    fn test_latched_reemits_after_eviction() {
        let camera = captor("camera", 8, Next);
        let pose = captor("pose", 1, Latched::new(0));
        fill(&camera, &[10, 20]);
        fill(&pose, &[5]);

        let sync = Synchronizer::new(camera, vec![Arc::clone(&pose)]).unwrap();

        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Primed);
        assert_eq!(stamps_of(&out[1]), vec![5]);

        // capacity 1: the newer sample evicts the latched one from the queue
        pose.insert(25, 25);
        assert_eq!(pose.stamps(), vec![25]);

        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Primed);
        assert_eq!(result.range, Some(CaptureRange::at(20)));
        assert_eq!(stamps_of(&out[1]), vec![5]);
    }

    #[test]
    fn test_count_before_retry_then_abort_then_primed() {
        let camera = captor("camera", 8, Next);
        let imu = captor("imu", 16, CountBefore::new(3, 0).unwrap());
        fill(&camera, &[10]);
        fill(&imu, &[1, 2]);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&imu)]).unwrap();

        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Retry);
        assert_eq!(camera.stamps(), vec![10]);

        imu.insert(11, 11);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Abort);
        assert!(camera.is_empty());
        assert_eq!(imu.stamps(), vec![1, 2, 11]);

        camera.insert(20, 20);
        imu.insert(12, 12);
        imu.insert(21, 21);
        let mut out = outputs(2);
        let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
        assert_eq!(result.state, State::Primed);
        assert_eq!(stamps_of(&out[1]), vec![2, 11, 12]);
        assert_eq!(imu.stamps(), vec![21]);
    }

    #[test]
    fn test_throttled_driver_windows() {
        let camera = captor("camera", 8, Throttled::new(100));
        let gps = captor("gps", 8, AnyBefore::new(0));
        fill(&camera, &[0, 10, 50, 120, 130]);

        let sync = Synchronizer::new(camera, vec![gps]).unwrap();
        let mut windows = Vec::new();
        loop {
            let mut out = outputs(2);
            let result = sync.capture(&mut out, i64::MIN, Deadline::never()).unwrap();
            if result.state != State::Primed {
                assert_eq!(result.state, State::Retry);
                break;
            }
            windows.push(stamps_of(&out[0]));
        }

        assert_eq!(windows, vec![vec![0], vec![120]]);
    }

    #[test]
    fn test_overflow_monitor_sees_evicted_dispatch() {
        let dropped = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&dropped);
        let imu = Captor::<i64, u32>::builder("imu")
            .capacity(2)
            .policy(Before::new(0))
            .monitor(move |stream, dispatch| {
                sink.lock().unwrap().push((stream.to_string(), dispatch.stamp));
            })
            .build()
            .unwrap();

        fill(&imu, &[1, 2, 3]);

        assert_eq!(imu.stamps(), vec![2, 3]);
        assert_eq!(*dropped.lock().unwrap(), vec![("imu".to_string(), 1)]);
        assert_eq!(imu.overflow_count(), 1);
    }

    #[test]
    fn test_polling_capture_waits_for_producer_thread() {
        let camera = Arc::new(
            Captor::<i64, u32>::builder("camera")
                .capacity(8)
                .locking(LockingStrategy::polling(Duration::from_millis(1)).unwrap())
                .policy(Next)
                .build()
                .unwrap(),
        );
        let lidar = captor("lidar", 8, Ranged::new(0));
        camera.insert(10, 10);
        lidar.insert(8, 8);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&lidar)]).unwrap();

        let producer = {
            let lidar = Arc::clone(&lidar);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                lidar.insert(10, 10);
                lidar.insert(12, 12);
            })
        };

        let mut out = outputs(2);
        let result = sync
            .capture(
                &mut out,
                i64::MIN,
                Deadline::after(Duration::from_secs(5)),
            )
            .unwrap();
        producer.join().unwrap();

        assert_eq!(result.state, State::Primed);
        assert_eq!(stamps_of(&out[1]), vec![10]);
        assert_eq!(lidar.stamps(), vec![12]);
    }

    #[test]
    fn test_polling_timeout_leaves_queues_unchanged() {
        let camera = Arc::new(
            Captor::<i64, u32>::builder("camera")
                .capacity(8)
                .locking(LockingStrategy::polling(Duration::from_millis(2)).unwrap())
                .policy(Batch::new(2).unwrap())
                .build()
                .unwrap(),
        );
        let lidar = captor("lidar", 8, Ranged::new(0));
        camera.insert(5, 5);
        lidar.insert(4, 4);

        let sync = Synchronizer::new(Arc::clone(&camera), vec![Arc::clone(&lidar)]).unwrap();
        let mut out = outputs(2);
        let result = sync
            .capture(
                &mut out,
                i64::MIN,
                Deadline::after(Duration::from_millis(15)),
            )
            .unwrap();

        assert_eq!(result.state, State::Timeout);
        assert!(out.iter().all(Vec::is_empty));
        assert_eq!(camera.stamps(), vec![5]);
        assert_eq!(lidar.stamps(), vec![4]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use observability::CaptureMetricsAggregator;
    use sync_engine::{Captor, Deadline, Dispatch, State, Synchronizer};

    const PIPELINE: &str = r#"
[sync]
driver = "camera"
deadline_ms = 50

[[streams]]
id = "camera"
[streams.captor]
capacity = 16
locking = { mode = "polling", interval_ms = 1 }
policy = { kind = "batch", size = 2 }
[streams.source]
period = 10

[[streams]]
id = "lidar"
[streams.captor]
capacity = 128
policy = { kind = "ranged" }
[streams.source]
period = 2
phase = 1

[[streams]]
id = "gps"
[streams.captor]
capacity = 16
policy = { kind = "latched" }
[streams.source]
period = 25
"#;

    fn assemble(blueprint: &contracts::PipelineBlueprint) -> Synchronizer<i64, Bytes> {
        let build = |stream: &contracts::StreamConfig| {
            Arc::new(Captor::from_config(stream.id.clone(), &stream.captor).unwrap())
        };
        let driver = build(blueprint.driver_stream().unwrap());
        let followers = blueprint.follower_streams().map(build).collect();
        Synchronizer::new(driver, followers).unwrap()
    }

    /// Config -> Captors -> Synchronizer, fed synchronously
    #[test]
    fn test_config_to_synchronizer() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE, ConfigFormat::Toml).unwrap();
        let sync = assemble(&blueprint);
        let streams: Vec<String> = sync.streams().iter().map(|s| s.to_string()).collect();
        assert_eq!(streams, vec!["camera", "lidar", "gps"]);

        let members: Vec<_> = sync.members().cloned().collect();
        let (camera, lidar, gps) = (&members[0], &members[1], &members[2]);

        for t in [10, 20, 30] {
            camera.insert(t, Bytes::from_static(b"frame"));
        }
        for t in (1..40).step_by(2) {
            lidar.insert(t, Bytes::from_static(b"scan"));
        }
        gps.insert(0, Bytes::from_static(b"fix"));

        let mut outputs: Vec<Vec<Dispatch<i64, Bytes>>> = vec![Vec::new(); 3];
        let result = sync
            .capture(&mut outputs, i64::MIN, Deadline::after(Duration::from_millis(50)))
            .unwrap();

        assert_eq!(result.state, State::Primed);
        let lidar_stamps: Vec<i64> = outputs[1].iter().map(|d| d.stamp).collect();
        assert_eq!(lidar_stamps, vec![11, 13, 15, 17, 19]);
        assert_eq!(outputs[2].len(), 1);
        assert_eq!(outputs[2][0].value, Bytes::from_static(b"fix"));
    }

    /// Async producers -> Captors, blocking capture loop -> aggregator
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_producers_pipeline() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE, ConfigFormat::Toml).unwrap();
        let sync = Arc::new(assemble(&blueprint));
        let shutdown = Arc::new(AtomicBool::new(false));

        let configs: Vec<_> = blueprint
            .driver_stream()
            .into_iter()
            .chain(blueprint.follower_streams())
            .map(|s| s.source.clone())
            .collect();
        let producers: Vec<_> = sync
            .members()
            .cloned()
            .zip(configs)
            .map(|(captor, source)| {
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move {
                    let mut k = 0i64;
                    let mut interval = tokio::time::interval(Duration::from_micros(
                        source.period as u64 * 100,
                    ));
                    while !shutdown.load(Ordering::Relaxed) {
                        interval.tick().await;
                        captor.insert(source.phase + k * source.period, Bytes::from(vec![0u8; 4]));
                        k += 1;
                    }
                })
            })
            .collect();

        let loop_sync = Arc::clone(&sync);
        let aggregator = tokio::task::spawn_blocking(move || {
            let mut aggregator = CaptureMetricsAggregator::new();
            let mut previous_upper = i64::MIN;
            while aggregator.count(State::Primed) < 5 {
                let mut outputs: Vec<Vec<Dispatch<i64, Bytes>>> = vec![Vec::new(); 3];
                let result = loop_sync
                    .capture(&mut outputs, i64::MIN, Deadline::after(Duration::from_secs(5)))
                    .unwrap();
                aggregator.record(result.state, 0.0, None);
                if result.state == State::Primed {
                    let range = result.range.unwrap();
                    assert!(range.lower > previous_upper);
                    previous_upper = range.upper;
                    assert_eq!(outputs[0].len(), 2);
                    assert!(outputs[1]
                        .iter()
                        .all(|d| range.lower <= d.stamp && d.stamp <= range.upper));
                }
            }
            aggregator
        })
        .await
        .unwrap();

        shutdown.store(true, Ordering::Relaxed);
        for producer in producers {
            producer.await.unwrap();
        }

        assert_eq!(aggregator.count(State::Primed), 5);
        assert_eq!(aggregator.count(State::Timeout), 0);
    }
}
