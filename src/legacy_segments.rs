//! `p<i>of<n> <payload>` segments, joined by concatenation once every index has arrived

use tracing::{debug, warn};

use crate::{
    classify::LegacySegment, psbt::Psbt, scan_result::ScanResult, transaction::Transaction,
};

#[derive(Debug, Clone, Default)]
pub struct LegacySegmentAccumulator {
    slots: Vec<Option<String>>,
    received: usize,
}

impl LegacySegmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn ingest(&mut self, segment: LegacySegment) {
        let LegacySegment { index, total, payload } = segment;

        if self.slots.is_empty() {
            debug!("starting legacy segments, expecting {total} parts");
            self.slots = vec![None; total];
        }

        if total != self.total() {
            warn!("ignoring part {index} of {total}, already collecting {} parts", self.total());
            return;
        }

        let Some(slot) = index.checked_sub(1).and_then(|i| self.slots.get_mut(i)) else {
            warn!("ignoring out of range part {index} of {total}");
            return;
        };

        *slot = Some(payload);
        self.received = self.slots.iter().filter(|slot| slot.is_some()).count();
    }

    pub fn percent_complete(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }

        self.received as f64 / self.total() as f64
    }

    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.received == self.total()
    }

    /// Parts joined in index order, `None` until every part has arrived
    pub fn joined(&self) -> Option<String> {
        if !self.is_complete() {
            return None;
        }

        Some(self.slots.iter().flatten().map(String::as_str).collect())
    }

    /// PSBT, then a hex transaction, then the joined text as is
    pub fn finish(&self) -> Option<ScanResult> {
        let joined = self.joined()?;

        if let Ok(psbt) = Psbt::try_from_str(&joined) {
            return Some(ScanResult::Psbt(Box::new(psbt)));
        }

        if let Ok(transaction) = Transaction::try_from_hex(&joined) {
            return Some(ScanResult::Transaction(transaction));
        }

        Some(ScanResult::Text(joined))
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{psbt::tests::TEST_PSBT_HEX, transaction::tests::GENESIS_TX_HEX};

    fn segment(index: usize, total: usize, payload: &str) -> LegacySegment {
        LegacySegment { index, total, payload: payload.to_string() }
    }

    fn split(payload: &str, parts: usize) -> Vec<LegacySegment> {
        let chunks = payload.as_bytes().chunks(payload.len().div_ceil(parts)).collect::<Vec<_>>();
        let total = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, bytes)| segment(i + 1, total, std::str::from_utf8(bytes).unwrap()))
            .collect()
    }

    #[test]
    fn test_out_of_order() {
        let mut accumulator = LegacySegmentAccumulator::new();

        accumulator.ingest(segment(1, 3, "AAA"));
        accumulator.ingest(segment(3, 3, "CCC"));
        assert!(!accumulator.is_complete());
        assert_eq!(accumulator.joined(), None);

        accumulator.ingest(segment(2, 3, "BBB"));
        assert_eq!(accumulator.finish(), Some(ScanResult::Text("AAABBBCCC".to_string())));
    }

    #[test]
    fn test_every_permutation_with_duplicates() {
        let parts =
            [segment(1, 4, "ab"), segment(2, 4, "cd"), segment(3, 4, "ef"), segment(4, 4, "g")];

        for order in (0..parts.len()).permutations(parts.len()) {
            let mut accumulator = LegacySegmentAccumulator::new();
            let mut last_percent = 0.0;

            // deliver everything but the final part twice
            let repeated = order.iter().take(3).chain(order.iter().take(3));
            let deliveries = repeated.chain(order.iter().skip(3));
            for &i in deliveries {
                accumulator.ingest(parts[i].clone());

                let percent = accumulator.percent_complete();
                assert!(percent >= last_percent);
                last_percent = percent;
            }

            assert_eq!(accumulator.joined().as_deref(), Some("abcdefg"));
            assert_eq!(last_percent, 1.0);
        }
    }

    #[test]
    fn test_duplicate_does_not_advance() {
        let mut accumulator = LegacySegmentAccumulator::new();

        accumulator.ingest(segment(2, 4, "x"));
        accumulator.ingest(segment(2, 4, "x"));

        assert_eq!(accumulator.percent_complete(), 0.25);
    }

    #[test]
    fn test_mismatched_total_ignored() {
        let mut accumulator = LegacySegmentAccumulator::new();

        accumulator.ingest(segment(1, 2, "AA"));
        accumulator.ingest(segment(2, 3, "BB"));
        assert_eq!(accumulator.percent_complete(), 0.5);

        accumulator.ingest(segment(2, 2, "CC"));
        assert_eq!(accumulator.joined().as_deref(), Some("AACC"));
    }

    #[test]
    fn test_finish_psbt() {
        let mut accumulator = LegacySegmentAccumulator::new();
        for part in split(TEST_PSBT_HEX, 3) {
            accumulator.ingest(part);
        }

        assert!(matches!(accumulator.finish(), Some(ScanResult::Psbt(_))));
    }

    #[test]
    fn test_finish_transaction() {
        let mut accumulator = LegacySegmentAccumulator::new();
        for part in split(GENESIS_TX_HEX, 4).into_iter().rev() {
            accumulator.ingest(part);
        }

        assert!(matches!(accumulator.finish(), Some(ScanResult::Transaction(_))));
    }
}
