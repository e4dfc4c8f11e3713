//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（命令编码、帧布局）
//! - 节点流水线端到端测试（乱序、原子性、报警、校准）
//! - 网关链路 + 配置文件测试（Mock 节点，无需真实网关）

#[cfg(test)]
mod contract_tests {
    use contracts::{AxisSelection, Command, FrameLayout, SamplingConfig};

    #[test]
    fn test_sampling_command_snapshot() {
        let command = Command::SamplingParameters {
            sampling: SamplingConfig {
                frequency_hz: 5000,
                sample_count: 512,
                sleep_s: 0,
                axes: AxisSelection::from_selector_text("110").unwrap(),
            },
            alarm: false,
        };
        assert_eq!(
            command.encode().unwrap(),
            "5000xxxx0xxxxxxx110xxxxx512xxxxx0xxxxxxx22xxxxxx"
        );
    }

    #[test]
    fn test_small_frame_layout() {
        let layout = FrameLayout::new(4).unwrap();
        assert_eq!(layout.buffer_len(), 8);
        assert_eq!(layout.raw_range(), 2..6);
        assert_eq!(layout.spectrum_range(), Some(6..8));
    }
}

#[cfg(test)]
mod node_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use async_channel::Receiver;
    use contracts::{
        ideal_code, AlarmConfig, AlarmMetric, Axis, CalibrationMethod, FrameHeader,
        MonitorConfig, RawPacket, SamplingConfig, HANDSHAKE_PREAMBLE,
    };
    use frame_engine::{CalibrationOutcome, PacketReorderBuffer, SensorNode};
    use ingestion::{ChannelCommandSink, MockMote, OutboundCommand};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn config(n: usize) -> MonitorConfig {
        MonitorConfig {
            sampling: SamplingConfig {
                sample_count: n,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn node(config: &MonitorConfig) -> (Arc<SensorNode>, Receiver<OutboundCommand>) {
        let (sink, rx) = ChannelCommandSink::unbounded();
        let node = SensorNode::new("node-1".into(), config, Arc::new(sink)).unwrap();
        (Arc::new(node), rx)
    }

    fn descriptors(rx: &Receiver<OutboundCommand>) -> Vec<u8> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .map(|c| c.command.descriptor())
            .collect()
    }

    fn feed(node: &SensorNode, packets: impl IntoIterator<Item = RawPacket>) {
        for packet in packets {
            node.handle_packet(packet).unwrap();
        }
    }

    #[test]
    fn test_reorder_drains_ascending() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut timestamps: Vec<u32> = (0..200).collect();
            timestamps.shuffle(&mut rng);

            let mut buffer = PacketReorderBuffer::new(0);
            for t in &timestamps {
                buffer.accept(RawPacket::new(*t as f64, vec![0u8, 0]));
            }
            let drained: Vec<f64> = std::iter::from_fn(|| buffer.drain_next())
                .map(|p| p.timestamp)
                .collect();
            assert_eq!(drained.len(), 200);
            assert!(drained.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_sixteen_bytes_complete_one_frame() {
        let (node, _rx) = node(&config(4));
        feed(&node, [RawPacket::new(0.0, HANDSHAKE_PREAMBLE.to_vec())]);

        let header = FrameHeader::encode(Axis::X, 5);
        let words = [header, 0, 32768, 32768, 32768, 32768, 0, 0];
        let payload: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        assert_eq!(payload.len(), 16);

        let report = node
            .handle_packet(RawPacket::new(1.0, payload.clone()))
            .unwrap();
        assert!(report.frame_completed);
        assert_eq!(node.frames_completed(), 1);

        // cursor back at 0: the same packet starts and completes the next frame
        let report = node.handle_packet(RawPacket::new(2.0, payload)).unwrap();
        assert!(report.frame_completed);
        assert_eq!(node.frames_completed(), 2);

        let frame = node.latest_frame().unwrap();
        assert_eq!(frame.axis, Some(Axis::X));
        assert_eq!(frame.raw, vec![0.0; 4]);
        assert_eq!(frame.spectrum.len(), 2);
    }

    #[test]
    fn test_shuffled_frames_match_ordered() {
        let sampling = config(64).sampling;
        let mut mote = MockMote::new("node-1", sampling).unwrap();
        let mut frames = Vec::new();
        for axis in [Axis::X, Axis::Y, Axis::Z, Axis::X] {
            frames.push(mote.sine_frame(axis, 0.3, 24.0));
        }
        let handshake = RawPacket::new(-1.0, HANDSHAKE_PREAMBLE.to_vec());

        let (ordered, _rx1) = node(&config(64));
        feed(&ordered, [handshake.clone()]);
        feed(&ordered, frames.iter().flatten().cloned());

        let mut shuffled_config = config(64);
        shuffled_config.reorder.drain_threshold = 3;
        let (shuffled, _rx2) = node(&shuffled_config);
        let mut rng = StdRng::seed_from_u64(3);
        feed(&shuffled, [handshake]);
        for frame in &frames {
            let mut frame = frame.clone();
            frame.shuffle(&mut rng);
            feed(&shuffled, frame);
        }

        // trailing frame is still held by the reorder buffer
        assert_eq!(ordered.frames_completed(), 4);
        assert_eq!(shuffled.frames_completed(), 3);
        for axis in [Axis::Y, Axis::Z] {
            assert_eq!(
                ordered.latest_statistics(axis),
                shuffled.latest_statistics(axis)
            );
        }
    }

    #[test]
    fn test_reader_never_sees_partial_frame() {
        let (node, _rx) = node(&config(32));
        feed(&node, [RawPacket::new(0.0, HANDSHAKE_PREAMBLE.to_vec())]);

        let low = ideal_code(-2.0) as u16;
        let high = ideal_code(2.0) as u16;
        let mut mote = MockMote::new("node-1", config(32).sampling).unwrap();
        let mut packets = Vec::new();
        for i in 0..200 {
            let code = if i % 2 == 0 { low } else { high };
            packets.extend(mote.frame_packets(Axis::X, &[code; 32], &[]));
        }

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let node = node.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut observed = 0usize;
                while !done.load(Ordering::SeqCst) {
                    if let Some(frame) = node.latest_frame() {
                        let first = frame.raw[0];
                        assert!(frame.raw.iter().all(|&g| g == first), "torn frame");
                        observed += 1;
                    }
                }
                observed
            })
        };

        feed(&node, packets);
        done.store(true, Ordering::SeqCst);

        let observed = reader.join().unwrap();
        assert!(observed > 0 || node.latest_frame().is_some());
        assert_eq!(node.frames_completed(), 200);
    }

    #[test]
    fn test_alarm_fires_once_then_disarms() {
        let mut config = config(32);
        config.alarm = Some(AlarmConfig {
            metric: AlarmMetric::Peak,
            threshold: 10.0,
            armed: true,
        });
        let (node, rx) = node(&config);
        let mut mote = MockMote::new("node-1", config.sampling).unwrap();
        feed(&node, [mote.handshake()]);

        let mut fired = Vec::new();
        for g in [5.0, 12.0, 3.0, 15.0] {
            for packet in mote.constant_frame(Axis::Y, g) {
                let report = node.handle_packet(packet).unwrap();
                if report.frame_completed {
                    fired.push(report.alarm_fired);
                }
            }
        }

        assert_eq!(fired, vec![false, true, false, false]);
        let sent = descriptors(&rx);
        assert_eq!(sent.iter().filter(|&&d| d == 44).count(), 1);
        assert!(!node.alarm_config().unwrap().armed);

        // re-arming resumes evaluation
        node.arm_alarm(AlarmMetric::Peak, 10.0);
        for packet in mote.constant_frame(Axis::Y, 11.0) {
            node.handle_packet(packet).unwrap();
        }
        assert_eq!(descriptors(&rx).iter().filter(|&&d| d == 44).count(), 1);
    }

    #[test]
    fn test_calibration_is_idempotent_until_reset() {
        let mut config = config(32);
        config.calibration.method = Some(CalibrationMethod::Orientation);
        let (node, _rx) = node(&config);
        let mut mote = MockMote::new("node-1", config.sampling).unwrap();
        feed(&node, [mote.handshake()]);

        let base = ideal_code(0.0) as u16;
        let mut outcomes = Vec::new();
        for code in [base + 200, base + 500] {
            for packet in mote.frame_packets(Axis::X, &[code; 32], &[]) {
                if let Some(outcome) = node.handle_packet(packet).unwrap().calibration {
                    outcomes.push(outcome);
                }
            }
        }

        assert_eq!(
            outcomes,
            vec![
                CalibrationOutcome::Applied {
                    axis: Axis::X,
                    offset: 200.0
                },
                CalibrationOutcome::AlreadyCalibrated { axis: Axis::X },
            ]
        );
        assert_eq!(node.offset(Axis::X), 200.0);
        assert!(node.calibration_pending());

        node.reset_calibration();
        assert_eq!(node.offset(Axis::X), 0.0);
    }

    #[test]
    fn test_sampling_update_resizes_frames() {
        let (node, rx) = node(&config(32));
        let mut mote = MockMote::new("node-1", config(64).sampling).unwrap();
        feed(&node, [mote.handshake()]);
        node.update_sampling(config(64).sampling).unwrap();

        feed(&node, mote.sine_frame(Axis::Z, 0.2, 32.0));
        let frame = node.latest_frame().unwrap();
        assert_eq!(frame.raw.len(), 64);
        assert!(descriptors(&rx).contains(&22));
        assert_eq!(node.sampling(), config(64).sampling);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::Arc;

    use analytics::SamplingAxes;
    use config_loader::ConfigLoader;
    use contracts::{Axis, NodeId};
    use ingestion::{ChannelCommandSink, GatewayLink, MockMote, MockMoteSource, NodeRegistry};

    const MONITOR_TOML: &str = r#"
[sampling]
frequency_hz = 512
sample_count = 64
axes = { x = true, y = true, z = true }

[alarm]
metric = "rms"
threshold = 0.3
armed = true

[statistics]
history_capacity = 2
"#;

    /// End-to-end test: config file -> NodeRegistry -> GatewayLink -> MockMote
    #[tokio::test]
    async fn test_e2e_mock_motes_through_gateway_link() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MONITOR_TOML.as_bytes()).unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();

        let (sink, outbound) = ChannelCommandSink::unbounded();
        let registry = Arc::new(NodeRegistry::new(config.clone(), Arc::new(sink)));
        let mut link = GatewayLink::new(registry.clone());

        let ids = ["00-17-0d-00-00-38-06-c3", "00-17-0d-00-00-38-07-01"];
        for id in ids {
            let mut mote = MockMote::new(id, config.sampling).unwrap();
            let mut script = vec![mote.handshake()];
            for axis in [Axis::X, Axis::Y, Axis::X, Axis::X] {
                script.extend(mote.sine_frame(axis, 0.5, 16.0));
            }
            link.attach(Arc::new(MockMoteSource::new(mote.id().clone(), script)))
                .unwrap();
        }
        link.start_all();
        link.join_all().await;

        assert_eq!(registry.len(), 2);
        assert_eq!(link.metrics().snapshot().frames_completed, 8);

        let axes = SamplingAxes::new(config.sampling.frequency_hz as f64, 64).unwrap();
        for id in ids {
            let node = link.node(&NodeId::new(id)).unwrap();
            assert_eq!(node.frames_completed(), 4);

            let frame = node.latest_frame().unwrap();
            assert_eq!(frame.axis, Some(Axis::X));
            assert_eq!(frame.raw.len(), axes.times.len());
            assert_eq!(frame.spectrum.len(), axes.frequencies.len());

            // capacity 2: the first x record was evicted
            let x = node.statistics(Axis::X);
            assert_eq!(x.history.len(), 2);
            assert_eq!(x.evicted, 1);
            assert!(node.latest_statistics(Axis::X).and_then(|r| r.rms).unwrap() > 0.3);
            assert!(!node.alarm_config().unwrap().armed);

            let summary = node.metrics_summary();
            assert_eq!(summary.total_frames, 4);
            assert_eq!(summary.alarms_fired, 1);
        }

        let commands: Vec<_> = std::iter::from_fn(|| outbound.try_recv().ok()).collect();
        for id in ids {
            let for_node: Vec<u8> = commands
                .iter()
                .filter(|c| c.node.as_str() == id)
                .map(|c| c.command.descriptor())
                .collect();
            // handshake answer, one announcement per frame start, one trigger
            assert_eq!(for_node.iter().filter(|&&d| d == 22).count(), 5);
            assert_eq!(for_node.iter().filter(|&&d| d == 44).count(), 1);
        }
        assert!(commands.iter().all(|c| c.message.len() == 48));
    }

    #[tokio::test]
    async fn test_e2e_disconnect_and_rehandshake() {
        let config = ConfigLoader::load_from_str(MONITOR_TOML, config_loader::ConfigFormat::Toml)
            .unwrap();
        let (sink, _outbound) = ChannelCommandSink::unbounded();
        let registry = Arc::new(NodeRegistry::new(config.clone(), Arc::new(sink)));
        let mut link = GatewayLink::new(registry.clone());

        let mut mote = MockMote::new("node-1", config.sampling).unwrap();
        let mut script = vec![mote.handshake()];
        script.extend(mote.sine_frame(Axis::Z, 0.1, 8.0));
        let node = link
            .attach(Arc::new(MockMoteSource::new(mote.id().clone(), script)))
            .unwrap();
        link.start_all();
        link.join_all().await;
        assert_eq!(node.frames_completed(), 1);

        link.disconnect(mote.id()).unwrap();
        assert!(node.latest_frame().is_none());
        assert_eq!(node.statistics(Axis::Z).history.len(), 1);

        // the node re-joins through a new source and a fresh handshake
        let mut script = vec![mote.handshake()];
        script.extend(mote.sine_frame(Axis::Z, 0.1, 8.0));
        let mut relink = GatewayLink::new(registry.clone());
        let same = relink
            .attach(Arc::new(MockMoteSource::new(mote.id().clone(), script)))
            .unwrap();
        assert!(Arc::ptr_eq(&node, &same));
        relink.start_all();
        relink.join_all().await;

        assert!(node.handshake_acknowledged());
        assert!(node.latest_frame().is_some());
        assert_eq!(node.statistics(Axis::Z).history.len(), 2);
    }
}
