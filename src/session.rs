//! One scanning session: classify frames, feed the committed accumulator, publish the outcome
//!
//! The session itself is owned by the sampling worker. Everything a UI needs goes through
//! [`ScanHandle`], which reads an atomically swapped snapshot and can subscribe to events.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use arc_swap::ArcSwap;
use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    classify::{self, Dialect, ProtocolTag},
    config::ScanConfig,
    fountain::FountainAccumulator,
    frame::Frame,
    legacy_segments::LegacySegmentAccumulator,
    registry,
    scan_result::{ScanError, ScanResult},
    segmented::SegmentedAccumulator,
    sniffer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ScanStatus {
    Idle,
    Accumulating,
    Complete,
    Error,
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }
}

/// What observers see, replaced wholesale on every change
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    pub status: ScanStatus,
    pub percent_complete: f64,
    pub result: Option<ScanResult>,
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        Self { status: ScanStatus::Idle, percent_complete: 0.0, result: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Progress(f64),
    Completed(ScanResult),
    Cancelled,
}

/// Returned from every [`ScanSession::ingest`], `result` is set exactly once per session
#[derive(Debug, Clone, PartialEq)]
pub struct ScanUpdate {
    pub percent_complete: f64,
    pub result: Option<ScanResult>,
}

#[derive(Debug)]
enum Accumulator {
    LegacySegments(LegacySegmentAccumulator),
    Fountain(FountainAccumulator),
    Segmented(SegmentedAccumulator),
}

impl Accumulator {
    fn for_tag(tag: &ProtocolTag) -> Self {
        match tag {
            ProtocolTag::LegacySegments(_) => Self::LegacySegments(LegacySegmentAccumulator::new()),
            ProtocolTag::Fountain(dialect) => Self::Fountain(FountainAccumulator::new(*dialect)),
            ProtocolTag::SegmentedBlock => Self::Segmented(SegmentedAccumulator::new()),
        }
    }

    fn percent_complete(&self) -> f64 {
        match self {
            Self::LegacySegments(accumulator) => accumulator.percent_complete(),
            Self::Fountain(accumulator) => accumulator.percent_complete(),
            Self::Segmented(accumulator) => accumulator.percent_complete(),
        }
    }
}

/// State shared between the session and its handles
#[derive(Debug)]
struct Shared {
    snapshot: ArcSwap<ScanSnapshot>,
    subscribers: Mutex<Vec<Sender<ScanEvent>>>,
    cancelled: AtomicBool,
    event_capacity: usize,
}

impl Shared {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn broadcast(&self, event: ScanEvent) {
        self.subscribers.lock().retain(|subscriber| match subscriber.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("subscriber queue is full, dropping scan event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

#[derive(Debug)]
pub struct ScanSession {
    config: ScanConfig,
    shared: Arc<Shared>,
    protocol: Option<ProtocolTag>,
    accumulator: Option<Accumulator>,
    status: ScanStatus,
    percent_complete: f64,
    result: Option<ScanResult>,
}

impl ScanSession {
    pub fn new(config: ScanConfig) -> Self {
        let shared = Shared {
            snapshot: ArcSwap::from_pointee(ScanSnapshot::default()),
            subscribers: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            event_capacity: config.event_capacity.max(1),
        };

        Self {
            config,
            shared: Arc::new(shared),
            protocol: None,
            accumulator: None,
            status: ScanStatus::Idle,
            percent_complete: 0.0,
            result: None,
        }
    }

    pub fn handle(&self) -> ScanHandle {
        ScanHandle { shared: self.shared.clone() }
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn percent_complete(&self) -> f64 {
        self.percent_complete
    }

    pub fn result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    /// Stop the session, accumulated state is dropped
    pub fn cancel(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.apply_cancellation();
    }

    pub fn ingest(&mut self, frame: Frame) -> ScanUpdate {
        if self.shared.is_cancelled() {
            self.apply_cancellation();
        }

        if self.status.is_terminal() {
            trace!("session is {}, ignoring frame", self.status);
            return self.update(None);
        }

        if frame.is_empty() {
            trace!("ignoring empty frame");
            return self.update(None);
        }

        let result = self.route(&frame);
        self.settle(result)
    }

    fn route(&mut self, frame: &Frame) -> Option<ScanResult> {
        match classify::classify(frame) {
            None if self.protocol.is_some() => {
                debug!("ignoring single payload frame while reassembling");
                None
            }
            None => Some(sniffer::sniff(frame, &self.config)),
            Some(tag) => self.accumulate(tag, frame),
        }
    }

    /// Publish the outcome of a frame unless a cancel arrived while it was being handled
    fn settle(&mut self, result: Option<ScanResult>) -> ScanUpdate {
        if self.shared.is_cancelled() {
            debug!("cancelled while handling a frame, dropping its outcome");
            self.apply_cancellation();
            return self.update(None);
        }

        match result {
            Some(result) => self.complete(result),
            None => self.progress(),
        }
    }

    /// Consume frames until a result, a cancellation or the channel closing
    pub fn run(mut self, frames: Receiver<Frame>) -> Option<ScanResult> {
        let poll_interval = self.config.poll_interval();

        loop {
            if self.shared.is_cancelled() {
                self.apply_cancellation();
            }

            if self.status.is_terminal() {
                return self.result.take();
            }

            match frames.recv_timeout(poll_interval) {
                Ok(frame) => {
                    if let Some(result) = self.ingest(frame).result {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("frame channel closed, stopping scan");
                    return None;
                }
            }
        }
    }

    fn accumulate(&mut self, tag: ProtocolTag, frame: &Frame) -> Option<ScanResult> {
        match &self.protocol {
            Some(committed) if !committed.same_protocol(&tag) => {
                debug!("ignoring {tag:?} frame, session is locked to {committed:?}");
                return None;
            }
            Some(_) => {}
            None => {
                info!("committing scan session to {tag:?}");
                self.accumulator = Some(Accumulator::for_tag(&tag));
                self.protocol = Some(tag.clone());
            }
        }

        let text = frame.text_str().unwrap_or_default();
        let accumulator = self.accumulator.as_mut()?;

        match (accumulator, tag) {
            (Accumulator::LegacySegments(accumulator), ProtocolTag::LegacySegments(segment)) => {
                accumulator.ingest(segment);
                accumulator.finish()
            }

            (Accumulator::Fountain(accumulator), ProtocolTag::Fountain(dialect)) => {
                Self::accumulate_fountain(accumulator, dialect, text, self.config.network)
            }

            (Accumulator::Segmented(accumulator), ProtocolTag::SegmentedBlock) => {
                match accumulator.ingest(text) {
                    Ok(result) => result,
                    Err(error) => Some(ScanError::from(error).into()),
                }
            }

            (_, tag) => {
                warn!("accumulator does not match committed protocol, ignoring {tag:?}");
                None
            }
        }
    }

    fn accumulate_fountain(
        accumulator: &mut FountainAccumulator,
        dialect: Dialect,
        text: &str,
        network: bitcoin::Network,
    ) -> Option<ScanResult> {
        if dialect != accumulator.dialect() {
            debug!("ignoring {dialect} UR, decoding {}", accumulator.dialect());
            return None;
        }

        match accumulator.ingest(text) {
            Ok(Some(payload)) => Some(registry::extract(&payload.ur_type, &payload.cbor, network)),
            Ok(None) => None,
            Err(error) => {
                warn!("fountain decoding failed: {error}");
                Some(ScanError::FountainDecode(error.to_string()).into())
            }
        }
    }

    fn progress(&mut self) -> ScanUpdate {
        let Some(accumulator) = &self.accumulator else {
            return self.update(None);
        };

        let percent_complete = accumulator.percent_complete().max(self.percent_complete);
        let changed = percent_complete > self.percent_complete || self.status == ScanStatus::Idle;

        self.status = ScanStatus::Accumulating;
        self.percent_complete = percent_complete;

        if changed {
            trace!("scan progress {percent_complete:.2}");
            self.publish();
            self.shared.broadcast(ScanEvent::Progress(percent_complete));
        }

        self.update(None)
    }

    fn complete(&mut self, result: ScanResult) -> ScanUpdate {
        self.status = if result.is_error() { ScanStatus::Error } else { ScanStatus::Complete };
        if self.status == ScanStatus::Complete {
            self.percent_complete = 1.0;
        }

        info!("scan finished with {}", result.kind());
        self.accumulator = None;
        self.result = Some(result.clone());

        self.publish();
        self.shared.broadcast(ScanEvent::Completed(result.clone()));

        self.update(Some(result))
    }

    fn apply_cancellation(&mut self) {
        if self.status == ScanStatus::Cancelled {
            return;
        }

        if self.status.is_terminal() {
            debug!("session already {}, nothing to cancel", self.status);
            return;
        }

        info!("scan cancelled");
        self.status = ScanStatus::Cancelled;
        self.accumulator = None;

        self.publish();
        self.shared.broadcast(ScanEvent::Cancelled);
    }

    fn publish(&self) {
        self.shared.snapshot.store(Arc::new(ScanSnapshot {
            status: self.status,
            percent_complete: self.percent_complete,
            result: self.result.clone(),
        }));
    }

    fn update(&self, result: Option<ScanResult>) -> ScanUpdate {
        ScanUpdate { percent_complete: self.percent_complete, result }
    }
}

/// Cheap to clone, safe to use from any thread
#[derive(Debug, Clone)]
pub struct ScanHandle {
    shared: Arc<Shared>,
}

impl ScanHandle {
    pub fn snapshot(&self) -> Arc<ScanSnapshot> {
        self.shared.snapshot.load_full()
    }

    pub fn percent_complete(&self) -> f64 {
        self.shared.snapshot.load().percent_complete
    }

    pub fn result(&self) -> Option<ScanResult> {
        self.shared.snapshot.load().result.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.is_cancelled() || self.shared.snapshot.load().status.is_terminal()
    }

    /// Takes effect on the worker's next frame or poll
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    /// Events from now on, a finished session replays its final event
    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        let (sender, receiver) = flume::bounded(self.shared.event_capacity);

        let mut subscribers = self.shared.subscribers.lock();
        let snapshot = self.shared.snapshot.load();

        let last_event = match (&snapshot.status, &snapshot.result) {
            (ScanStatus::Cancelled, _) => Some(ScanEvent::Cancelled),
            (_, Some(result)) => Some(ScanEvent::Completed(result.clone())),
            _ => None,
        };

        match last_event {
            Some(event) => {
                let _ = sender.try_send(event);
            }
            None => subscribers.push(sender),
        }

        receiver
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use bbqr::{
        encode::Encoding,
        file_type::FileType,
        qr::Version,
        split::{Split, SplitOptions},
    };
    use bitcoin::Network;
    use cove_ur::{CryptoSeed, RegistryItem as _};
    use foundation_ur::Encoder;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        mnemonic::tests::words_24,
        psbt::tests::{TEST_PSBT_HEX, test_psbt},
        scan_result::ScanResultKind,
    };

    const ADDRESS: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

    fn session() -> ScanSession {
        ScanSession::new(ScanConfig::default())
    }

    fn seed_cbor() -> (bip39::Mnemonic, Vec<u8>) {
        let mnemonic = bip39::Mnemonic::parse(words_24()).unwrap();
        let cbor = CryptoSeed::from_mnemonic(&mnemonic).to_cbor().unwrap();
        (mnemonic, cbor)
    }

    #[test]
    fn test_legacy_segments_out_of_order() {
        let mut session = session();

        let first = session.ingest("p1of3 AAA".into());
        assert_eq!(first.result, None);
        assert!((first.percent_complete - 1.0 / 3.0).abs() < f64::EPSILON);

        assert_eq!(session.ingest("p3of3 CCC".into()).result, None);
        assert_eq!(session.status(), ScanStatus::Accumulating);

        let last = session.ingest("p2of3 BBB".into());
        assert_eq!(last.result, Some(ScanResult::Text("AAABBBCCC".into())));
        assert_eq!(last.percent_complete, 1.0);
        assert_eq!(session.status(), ScanStatus::Complete);
    }

    #[test]
    fn test_single_frame_goes_straight_to_sniffer() {
        let mut session = session();
        let update = session.ingest(ADDRESS.into());

        assert_eq!(update.result.map(|result| result.kind()), Some(ScanResultKind::PaymentUri));
        assert_eq!(update.percent_complete, 1.0);
    }

    #[test]
    fn test_idempotent_after_completion() {
        let mut session = session();
        let result = session.ingest(ADDRESS.into()).result;
        assert!(result.is_some());

        let handle = session.handle();
        let before = handle.snapshot();

        let again = session.ingest("p1of2 AA".into());
        assert_eq!(again, ScanUpdate { percent_complete: 1.0, result: None });
        assert_eq!(session.status(), ScanStatus::Complete);
        assert_eq!(handle.snapshot(), before);
        assert_eq!(session.result(), result.as_ref());
    }

    #[test]
    fn test_protocol_lock() {
        let mut session = session();
        session.ingest("p1of2 AA".into());

        // a complete payload and a UR from another protocol are both ignored
        assert_eq!(session.ingest(ADDRESS.into()).result, None);
        assert_eq!(session.ingest("ur:bytes/fysxzpx8ynzxx5p5yw0rqcxvqp".into()).result, None);
        assert_eq!(session.percent_complete(), 0.5);

        let done = session.ingest("p2of2 BB".into());
        assert_eq!(done.result, Some(ScanResult::Text("AABB".into())));
    }

    #[test]
    fn test_empty_frames_ignored() {
        let mut session = session();

        let idle = ScanUpdate { percent_complete: 0.0, result: None };
        assert_eq!(session.ingest(Frame::default()), idle);
        assert_eq!(session.ingest("   ".into()).result, None);
        assert_eq!(session.status(), ScanStatus::Idle);
    }

    #[test]
    fn test_multi_part_ur_seed() {
        let (mnemonic, cbor) = seed_cbor();
        let mut encoder = Encoder::new();
        encoder.start("crypto-seed", &cbor, 10);

        let mut session = session();
        let mut last_percent = 0.0;

        let result = (0..100)
            .find_map(|_| {
                let part = encoder.next_part().to_string().to_uppercase();
                let update = session.ingest(part.into());

                assert!(update.percent_complete >= last_percent);
                last_percent = update.percent_complete;
                update.result
            })
            .expect("fountain should complete");

        let ScanResult::Seed(seed) = result else { panic!("expected a seed, got {result:?}") };
        assert_eq!(seed.mnemonic, mnemonic);
        assert_eq!(session.percent_complete(), 1.0);
    }

    #[test]
    fn test_legacy_ur() {
        let mut session = session();
        let seed = "ur:crypto-seed/myqjegsp2rrsnpvqzf0z4vyczff5dzedh3fq9kryr9ra57wzraf";
        let update = session.ingest(seed.into());

        let Some(ScanResult::Seed(seed)) = update.result else { panic!("expected a seed") };
        assert_eq!(seed.word_count(), 12);
        assert_eq!(seed.birth.as_second(), 18394 * 86_400);
    }

    #[test]
    fn test_fountain_error_is_terminal() {
        let mut session = session();
        let corrupt = "ur:crypto-seed/myqjegsp2rrsnpvqzf0z4vyczff5dzedh3fq9kryr9ra57wzraq";
        let update = session.ingest(corrupt.into());

        assert!(matches!(update.result, Some(ScanResult::Error(ScanError::FountainDecode(_)))));
        assert_eq!(session.status(), ScanStatus::Error);
        assert_eq!(session.ingest(ADDRESS.into()).result, None);
    }

    #[test]
    fn test_unknown_ur_type_is_an_error_result() {
        let mut session = session();
        let text = foundation_ur::UR::new("crypto-eckey", &[0xa0]).to_string();

        assert_eq!(
            session.ingest(text.into()).result,
            Some(ScanResult::Error(ScanError::UnsupportedRegistryType("crypto-eckey".into())))
        );
    }

    #[test]
    fn test_segmented_psbt() {
        let options = SplitOptions {
            encoding: Encoding::Zlib,
            min_split_number: 3,
            max_split_number: 3,
            min_version: Version::V01,
            max_version: Version::V40,
        };
        let psbt = hex::decode(TEST_PSBT_HEX).unwrap();
        let split = Split::try_from_data(&psbt, FileType::Psbt, options).unwrap();
        assert!(split.parts.len() > 1);

        let mut session = session();
        let mut result = None;
        for part in split.parts.iter().rev() {
            result = session.ingest(part.as_str().into()).result;
        }

        assert_eq!(result, Some(ScanResult::Psbt(Box::new(test_psbt()))));
    }

    #[test]
    fn test_cancel_drops_state() {
        let mut session = session();
        let events = session.handle().subscribe();

        session.ingest("p1of2 AA".into());
        session.cancel();

        assert_eq!(session.status(), ScanStatus::Cancelled);
        assert_eq!(session.ingest("p2of2 BB".into()).result, None);
        assert_eq!(session.handle().snapshot().status, ScanStatus::Cancelled);

        let received = events.try_iter().collect::<Vec<_>>();
        assert_eq!(received, vec![ScanEvent::Progress(0.5), ScanEvent::Cancelled]);
    }

    #[test]
    fn test_handle_cancel_applies_on_next_frame() {
        let mut session = session();
        let handle = session.handle();

        handle.cancel();
        assert!(handle.is_finished());

        assert_eq!(session.ingest(ADDRESS.into()).result, None);
        assert_eq!(session.status(), ScanStatus::Cancelled);
    }

    #[test]
    fn test_cancel_while_handling_frame() {
        let mut session = session();
        let handle = session.handle();
        let events = handle.subscribe();

        let result = session.route(&ADDRESS.into());
        assert!(result.is_some());

        handle.cancel();
        assert_eq!(session.settle(result), ScanUpdate { percent_complete: 0.0, result: None });

        assert_eq!(session.status(), ScanStatus::Cancelled);
        assert_eq!(handle.result(), None);
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![ScanEvent::Cancelled]);
    }

    #[test]
    fn test_late_subscriber_gets_result() {
        let mut session = session();
        let result = session.ingest(ADDRESS.into()).result.unwrap();

        let events = session.handle().subscribe();
        assert_eq!(events.try_recv(), Ok(ScanEvent::Completed(result)));
    }

    #[test]
    fn test_full_subscriber_does_not_block() {
        let mut config = ScanConfig::default();
        config.event_capacity = 1;

        let mut session = ScanSession::new(config);
        let events = session.handle().subscribe();

        session.ingest("p1of4 A".into());
        session.ingest("p2of4 B".into());
        session.ingest("p3of4 C".into());

        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![ScanEvent::Progress(0.25)]);
    }

    #[test]
    fn test_worker_thread() {
        let (sender, receiver) = flume::unbounded();
        let session = ScanSession::new(ScanConfig::with_network(Network::Bitcoin));
        let handle = session.handle();
        let events = handle.subscribe();

        let worker = thread::spawn(move || session.run(receiver));

        sender.send(Frame::text("p2of2 world")).unwrap();
        sender.send(Frame::text("p1of2 hello ")).unwrap();

        let result = worker.join().unwrap();
        assert_eq!(result, Some(ScanResult::Text("hello world".into())));
        assert!(handle.is_finished());
        assert_eq!(handle.result(), result);
        assert_eq!(handle.percent_complete(), 1.0);

        let received = events.try_iter().collect::<Vec<_>>();
        let completed = ScanEvent::Completed(ScanResult::Text("hello world".into()));
        assert_eq!(received.last(), Some(&completed));
    }

    #[test]
    fn test_worker_stops_on_cancel() {
        let (_sender, receiver) = flume::unbounded::<Frame>();
        let mut config = ScanConfig::default();
        config.poll_interval_ms = 5;

        let session = ScanSession::new(config);
        let handle = session.handle();
        let worker = thread::spawn(move || session.run(receiver));

        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        assert_eq!(worker.join().unwrap(), None);
        assert_eq!(handle.snapshot().status, ScanStatus::Cancelled);
    }

    #[test]
    fn test_worker_stops_when_channel_closes() {
        let (sender, receiver) = flume::unbounded::<Frame>();
        let worker = thread::spawn(move || session().run(receiver));

        drop(sender);
        assert_eq!(worker.join().unwrap(), None);
    }
}
