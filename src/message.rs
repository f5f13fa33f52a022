//! The decoded-message entity and the word-driven state machine that
//! builds it.

use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::samples;
use crate::word::{self, HitType, InfoType, StopType, WordKind};

/// Maximum number of raw-data payload words (one `Rda` plus up to 19
/// `Con`) retained per message; words beyond this bound are silently
/// discarded, matching the fixed-size capture buffer of the source
/// protocol.
const RAW_BUF_CAP: usize = 20;

#[derive(Clone, Default)]
struct RawBuf {
    words: [u16; RAW_BUF_CAP],
    len: u8,
}

impl RawBuf {
    fn new() -> Self {
        RawBuf::default()
    }

    fn push(&mut self, word: u16) {
        if (self.len as usize) < RAW_BUF_CAP {
            self.words[self.len as usize] = word;
            self.len += 1;
        }
    }

    fn as_slice(&self) -> &[u16] {
        &self.words[..self.len as usize]
    }
}

/// A single decoded SPADIC message.
///
/// A `Message` is built incrementally by repeated calls to
/// [`Message::decode_from`]; its classification predicates
/// (`is_hit`, `is_info`, ...) are pure functions of the fields that
/// have been filled in so far, not a separately tracked state enum.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    group_id: u8,
    channel_id: u8,
    timestamp: u16,
    hit_type: HitType,
    stop_type: StopType,
    num_samples: u8,
    buffer_overflow_count: u8,
    epoch_count: u16,
    info_type: Option<InfoType>,
    valid: u8,

    #[cfg_attr(feature = "serde", serde(skip))]
    raw_buf: RawBuf,
    #[cfg_attr(feature = "serde", serde(skip))]
    samples_cache: OnceLock<Vec<i16>>,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            group_id: 0,
            channel_id: 0,
            timestamp: 0,
            hit_type: HitType::Global,
            stop_type: StopType::Normal,
            num_samples: 0,
            buffer_overflow_count: 0,
            epoch_count: 0,
            info_type: None,
            valid: 0,
            raw_buf: RawBuf::new(),
            samples_cache: OnceLock::new(),
        }
    }
}

impl Message {
    /// An empty message, ready to be fed words via [`Message::decode_from`].
    pub fn new() -> Self {
        Message::default()
    }

    fn reset(&mut self) {
        *self = Message::new();
    }

    /// Feed words from `buf` into this message until it is complete or
    /// `buf` is exhausted, whichever comes first. Returns the number of
    /// words consumed from `buf` (which may be less than `buf.len()`).
    ///
    /// A start-of-message word seen mid-decode resets all state
    /// accumulated so far and starts over; this is never reported as
    /// an error (malformed input is not a fault, see crate docs).
    pub fn decode_from(&mut self, buf: &[u16]) -> usize {
        let mut consumed = 0;
        for &w in buf {
            consumed += 1;
            let (kind, info) = word::classify(w);
            if word::is_ignore(kind, info) {
                continue;
            }
            if word::is_start(kind, info) {
                self.reset();
            }
            self.apply(kind, info, w);
            if word::is_end(kind) {
                return consumed;
            }
        }
        consumed
    }

    fn apply(&mut self, kind: WordKind, info: Option<InfoType>, w: u16) {
        self.valid |= word::validity_bit(kind);
        match kind {
            WordKind::Som => {
                let fields = word::extract_som(w);
                self.group_id = fields.group_id;
                self.channel_id = fields.channel_id;
            }
            WordKind::Tsw => {
                self.timestamp = word::extract_tsw(w);
            }
            WordKind::Rda => {
                self.raw_buf.push(word::extract_rda_payload(w));
            }
            WordKind::Con => {
                self.raw_buf.push(word::extract_con_payload(w));
            }
            WordKind::Eom => {
                let fields = word::extract_eom(w);
                self.num_samples = fields.num_samples;
                self.hit_type = fields.hit_type;
                self.stop_type = fields.stop_type;
            }
            WordKind::Bom => {
                self.buffer_overflow_count = word::extract_bom(w);
            }
            WordKind::Epm => {
                self.epoch_count = word::extract_epm(w);
            }
            WordKind::Inf => {
                let info = info.expect("Inf classification always carries an InfoType");
                let fields = word::extract_inf(w, info);
                if let Some(channel_id) = fields.channel_id {
                    self.channel_id = channel_id;
                }
                if let Some(epoch_count) = fields.epoch_count {
                    self.epoch_count = epoch_count;
                }
                self.info_type = Some(info);
            }
            WordKind::Exd => {}
        }
    }

    /// Group index, set by the `Som` word.
    pub fn group_id(&self) -> u8 {
        self.group_id
    }

    /// Channel index. Set by the `Som` word, and overwritten by
    /// certain `Inf` sub-types that report a per-channel condition.
    pub fn channel_id(&self) -> u8 {
        self.channel_id
    }

    /// Timestamp, set by the `Tsw` word.
    pub fn timestamp(&self) -> u16 {
        self.timestamp
    }

    /// Number of samples reported by the `Eom` word. This is the
    /// caller-visible sample count; it caps [`Message::samples`] even
    /// if more 9-bit fields could be unpacked from `raw_buf`.
    pub fn num_samples(&self) -> u8 {
        self.num_samples
    }

    /// Signed ADC samples, unpacked from `raw_buf` on first access and
    /// cached for the lifetime of the message.
    pub fn samples(&self) -> &[i16] {
        self.samples_cache
            .get_or_init(|| samples::unpack(self.raw_buf.as_slice(), self.num_samples))
            .as_slice()
    }

    /// Raw hit_type code, set by the `Eom` word.
    pub fn hit_type(&self) -> u8 {
        self.hit_type.code()
    }

    /// Typed view of [`Message::hit_type`].
    pub fn hit_type_kind(&self) -> HitType {
        self.hit_type
    }

    /// Raw stop_type code, set by the `Eom` word.
    pub fn stop_type(&self) -> u8 {
        self.stop_type.code()
    }

    /// Typed view of [`Message::stop_type`].
    pub fn stop_type_kind(&self) -> StopType {
        self.stop_type
    }

    /// Overflow count, set by the `Bom` word.
    pub fn buffer_overflow_count(&self) -> u8 {
        self.buffer_overflow_count
    }

    /// Epoch count, set by the `Epm` word or a `Syn` `Inf` word.
    pub fn epoch_count(&self) -> u16 {
        self.epoch_count
    }

    /// Raw info_type code, if an `Inf` word has been seen.
    pub fn info_type(&self) -> Option<u8> {
        self.info_type.map(|i| i.code())
    }

    /// Typed view of [`Message::info_type`].
    pub fn info_type_kind(&self) -> Option<InfoType> {
        self.info_type
    }

    /// Whether decoding has reached a terminal word (`Eom`, `Bom`,
    /// `Epm`, or `Inf`). Does not imply the message is well-formed;
    /// see [`Message::is_valid`].
    pub fn is_complete(&self) -> bool {
        const TERMINAL: u8 = (1 << 3) | (1 << 4) | (1 << 5) | (1 << 6);
        self.valid & TERMINAL != 0
    }

    /// A complete hit: `Som`, `Tsw`, `Rda`, `Eom` all seen, nothing else.
    pub fn is_hit(&self) -> bool {
        self.valid == (word::validity_bit(WordKind::Som)
            | word::validity_bit(WordKind::Tsw)
            | word::validity_bit(WordKind::Rda)
            | word::validity_bit(WordKind::Eom))
    }

    /// A hit aborted by the message builder: `Inf` only, with a
    /// `Disabled` or `BuilderCorruption` sub-type.
    pub fn is_hit_aborted(&self) -> bool {
        self.valid == word::validity_bit(WordKind::Inf)
            && matches!(
                self.info_type,
                Some(InfoType::Disabled) | Some(InfoType::BuilderCorruption)
            )
    }

    /// A buffer-overflow report: `Som`, `Tsw`, `Bom` only.
    pub fn is_buffer_overflow(&self) -> bool {
        self.valid
            == (word::validity_bit(WordKind::Som)
                | word::validity_bit(WordKind::Tsw)
                | word::validity_bit(WordKind::Bom))
    }

    /// An epoch marker: `Som`, `Epm` only.
    pub fn is_epoch_marker(&self) -> bool {
        self.valid == (word::validity_bit(WordKind::Som) | word::validity_bit(WordKind::Epm))
    }

    /// An epoch-out-of-sync report: `Som`, `Inf` only, with a `Syn`
    /// sub-type.
    pub fn is_epoch_out_of_sync(&self) -> bool {
        self.valid == (word::validity_bit(WordKind::Som) | word::validity_bit(WordKind::Inf))
            && matches!(self.info_type, Some(InfoType::EpochOutOfSync))
    }

    /// A plain info report: `Inf` only, with a `NextGrantTimeout`,
    /// `NextRequestTimeout`, or `NewGrantEmpty` sub-type.
    pub fn is_info(&self) -> bool {
        self.valid == word::validity_bit(WordKind::Inf)
            && matches!(
                self.info_type,
                Some(InfoType::NextGrantTimeout)
                    | Some(InfoType::NextRequestTimeout)
                    | Some(InfoType::NewGrantEmpty)
            )
    }

    /// Any one of the well-formed message shapes recognized above.
    pub fn is_valid(&self) -> bool {
        self.is_hit()
            || self.is_hit_aborted()
            || self.is_buffer_overflow()
            || self.is_epoch_marker()
            || self.is_epoch_out_of_sync()
            || self.is_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const HIT: [u16; 8] = [
        0x8012, // SOM group=1 channel=2
        0x9666, // TSW timestamp=0x666
        0xA008, // RDA payload=0x008
        0x0403, // CON
        0x0100, // CON
        0x5030, // CON
        0x0E00, // CON
        0xB1D0, // EOM num_samples=7 hit_type=1 stop_type=0
    ];

    #[test]
    fn decodes_a_complete_hit() {
        let mut m = Message::new();
        let n = m.decode_from(&HIT);
        assert_eq!(n, HIT.len());
        assert!(m.is_complete());
        assert!(m.is_hit());
        assert!(m.is_valid());
        assert_eq!(m.group_id(), 1);
        assert_eq!(m.channel_id(), 2);
        assert_eq!(m.timestamp(), 0x666);
        assert_eq!(m.num_samples(), 7);
        assert_eq!(m.hit_type(), 1);
        assert_eq!(m.stop_type(), 0);
    }

    #[test]
    fn stops_consuming_at_the_end_word() {
        let mut buf = HIT.to_vec();
        buf.push(0x8abc); // a second message's SOM, must not be consumed
        let mut m = Message::new();
        let n = m.decode_from(&buf);
        assert_eq!(n, HIT.len());
    }

    #[test]
    fn som_mid_decode_resets_state() {
        let mut m = Message::new();
        m.decode_from(&[0x8012, 0x9666]);
        assert_eq!(m.group_id(), 1);
        // A fresh SOM, then a full message, in one call.
        let n = m.decode_from(&HIT);
        assert_eq!(n, HIT.len());
        assert!(m.is_hit());
        assert_eq!(m.group_id(), 1);
    }

    #[test]
    fn buffer_overflow_shape() {
        let mut m = Message::new();
        m.decode_from(&[0x8000, 0x9000, 0xC07B]);
        assert!(m.is_complete());
        assert!(m.is_buffer_overflow());
        assert!(m.is_valid());
        assert_eq!(m.buffer_overflow_count(), 0x7B);
    }

    #[test]
    fn epoch_marker_shape() {
        let mut m = Message::new();
        m.decode_from(&[0x8000, 0xD123]);
        assert!(m.is_epoch_marker());
        assert!(m.is_valid());
        assert_eq!(m.epoch_count(), 0x123);
    }

    #[test]
    fn epoch_out_of_sync_shape() {
        let mut m = Message::new();
        m.decode_from(&[0x8000, 0xF605]);
        assert!(m.is_epoch_out_of_sync());
        assert!(m.is_valid());
        assert_eq!(m.epoch_count(), 0x05);
    }

    #[test]
    fn plain_info_shape() {
        let mut m = Message::new();
        m.decode_from(&[0xF1A0]);
        assert!(m.is_info());
        assert!(m.is_valid());
        assert_eq!(m.channel_id(), 0xA);
    }

    #[test]
    fn hit_aborted_shape() {
        let mut m = Message::new();
        m.decode_from(&[0xF0A0]);
        assert!(m.is_hit_aborted());
        assert!(m.is_valid());
    }

    #[test]
    fn nop_info_word_is_silently_dropped() {
        let mut m = Message::new();
        let buf = [0xF500, 0x8010, 0xD123];
        let n = m.decode_from(&buf);
        assert_eq!(n, buf.len());
        assert!(m.is_epoch_marker());
        assert_eq!(m.group_id(), 1);
    }

    #[test]
    fn stray_end_of_message_without_start_is_complete_but_invalid() {
        let mut m = Message::new();
        let n = m.decode_from(&[0xB000]);
        assert_eq!(n, 1);
        assert!(m.is_complete());
        assert!(!m.is_valid());
    }

    #[test]
    fn info_start_word_resets_a_partial_message_in_progress() {
        let mut m = Message::new();
        // SOM + TSW only: a partial hit, not yet complete.
        m.decode_from(&[0x8012, 0x9666]);
        assert!(!m.is_complete());

        // A lone NGT info word is simultaneously start and end: it must
        // reset the partial SOM/TSW state, not merge into it.
        let n = m.decode_from(&[0xF1A0]);
        assert_eq!(n, 1);
        assert!(m.is_complete());
        assert!(m.is_info());
        assert!(m.is_valid());
        assert_eq!(m.channel_id(), 0xA);
        // The SOM's group_id must not have survived the reset.
        assert_eq!(m.group_id(), 0);
    }

    #[test]
    fn exd_words_are_skipped_but_counted() {
        let mut m = Message::new();
        let buf = [0x8000, 0xE000, 0xE000, 0xD123];
        let n = m.decode_from(&buf);
        assert_eq!(n, buf.len());
        assert!(m.is_epoch_marker());
    }

    #[test]
    fn unknown_info_subtype_is_not_a_fault() {
        let mut m = Message::new();
        m.decode_from(&[0xFF00]);
        assert!(m.is_complete());
        assert!(!m.is_valid());
    }

    #[test]
    fn samples_are_cached_across_calls() {
        let mut m = Message::new();
        m.decode_from(&HIT);
        let first = m.samples().to_vec();
        let second = m.samples().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn partial_buffer_reports_fewer_consumed_words() {
        let mut m = Message::new();
        let n = m.decode_from(&HIT[..4]);
        assert_eq!(n, 4);
        assert!(!m.is_complete());
    }
}
