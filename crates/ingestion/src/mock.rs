//! Mock 振动节点
//!
//! 用于无网关环境的测试：`MockMote` 按固件格式生成握手包与帧数据包，
//! `MockMoteSource` 在后台线程中按脚本回放。

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    ideal_code, Axis, ContractError, FrameHeader, FrameLayout, NodeId, PacketCallback,
    PacketSource, RawPacket, SamplingConfig, DEFAULT_PROTOCOL_VERSION, HANDSHAKE_PREAMBLE,
};
use tracing::{debug, trace};

/// 每个数据包的字数（90 字节负载）
pub const DEFAULT_PACKET_WORDS: usize = 45;

/// Mock 节点：生成与固件一致的数据包序列
#[derive(Debug, Clone)]
pub struct MockMote {
    id: NodeId,
    layout: FrameLayout,
    frequency_hz: u32,
    version: u8,
    packet_words: usize,
    /// 网关时间戳（秒）
    clock: f64,
    /// 相邻数据包的时间间隔（秒）
    packet_interval_s: f64,
}

impl MockMote {
    pub fn new(id: impl Into<NodeId>, sampling: SamplingConfig) -> Result<Self, ContractError> {
        Ok(Self {
            id: id.into(),
            layout: sampling.layout()?,
            frequency_hz: sampling.frequency_hz,
            version: DEFAULT_PROTOCOL_VERSION,
            packet_words: DEFAULT_PACKET_WORDS,
            clock: 0.0,
            packet_interval_s: 0.01,
        })
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn with_packet_words(mut self, words: usize) -> Self {
        self.packet_words = words.max(1);
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    fn tick(&mut self) -> f64 {
        let now = self.clock;
        self.clock += self.packet_interval_s;
        now
    }

    /// 入网前导码
    pub fn handshake(&mut self) -> RawPacket {
        RawPacket::new(self.tick(), Bytes::from_static(&HANDSHAKE_PREAMBLE))
    }

    /// 一帧的完整字序列：头、保留字、原始码、频谱（不足补零）
    pub fn frame_words(&self, axis: Axis, raw: &[u16], spectrum: &[u16]) -> Vec<u16> {
        let n = self.layout.sample_count();
        let mut words = Vec::with_capacity(self.layout.buffer_len());
        words.push(FrameHeader::encode(axis, self.version));
        words.push(0);
        words.extend(raw.iter().copied().chain(std::iter::repeat(0)).take(n));
        words.extend(
            spectrum
                .iter()
                .copied()
                .chain(std::iter::repeat(0))
                .take(self.layout.spectrum_len()),
        );
        words
    }

    /// 按固定包长切分一帧
    pub fn frame_packets(&mut self, axis: Axis, raw: &[u16], spectrum: &[u16]) -> Vec<RawPacket> {
        let words = self.frame_words(axis, raw, spectrum);
        let chunks: Vec<Vec<u8>> = words
            .chunks(self.packet_words)
            .map(|chunk| chunk.iter().flat_map(|w| w.to_le_bytes()).collect())
            .collect();
        chunks
            .into_iter()
            .map(|payload| RawPacket::new(self.tick(), payload))
            .collect()
    }

    /// 正弦激励下的一帧（叠加该轴静止加速度）
    pub fn sine_frame(&mut self, axis: Axis, amplitude_g: f64, tone_hz: f64) -> Vec<RawPacket> {
        let fs = self.frequency_hz as f64;
        let raw: Vec<u16> = (0..self.layout.sample_count())
            .map(|k| {
                let g = axis.rest_g() + amplitude_g * (2.0 * PI * tone_hz * k as f64 / fs).sin();
                to_code(g)
            })
            .collect();
        self.frame_packets(axis, &raw, &[])
    }

    /// 恒定加速度的一帧
    pub fn constant_frame(&mut self, axis: Axis, g: f64) -> Vec<RawPacket> {
        let raw = vec![to_code(g); self.layout.sample_count()];
        self.frame_packets(axis, &raw, &[])
    }
}

fn to_code(g: f64) -> u16 {
    ideal_code(g).clamp(0.0, u16::MAX as f64) as u16
}

/// 按脚本回放数据包的 Mock 源
pub struct MockMoteSource {
    node_id: NodeId,
    script: Mutex<Vec<RawPacket>>,
    pacing: Option<Duration>,
    listening: Arc<AtomicBool>,
}

impl MockMoteSource {
    pub fn new(node_id: NodeId, script: Vec<RawPacket>) -> Self {
        Self {
            node_id,
            script: Mutex::new(script),
            pacing: None,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 每个数据包之间的间隔
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }
}

impl PacketSource for MockMoteSource {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn listen(&self, callback: PacketCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let script = std::mem::take(
            &mut *self
                .script
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let listening = self.listening.clone();
        let pacing = self.pacing;
        let node_id = self.node_id.clone();

        thread::spawn(move || {
            debug!(node = %node_id, packets = script.len(), "mock mote playback started");
            for packet in script {
                if !listening.load(Ordering::SeqCst) {
                    break;
                }
                trace!(node = %node_id, timestamp = packet.timestamp, "mock packet");
                callback(packet);
                if let Some(pacing) = pacing {
                    thread::sleep(pacing);
                }
            }
            debug!(node = %node_id, "mock mote playback finished");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}
