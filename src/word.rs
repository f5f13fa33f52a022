//! Classification and bit-field extraction for single 16-bit SPADIC
//! words.
//!
//! A SPADIC message is built word by word; each word's top nibble (or,
//! for continuation words, its top bit) identifies its kind, and the
//! remaining bits carry a fixed set of fields for that kind. None of
//! this ever fails: every possible `u16` value classifies as exactly
//! one [`WordKind`], including the reserved/unassigned ranges.

use bitmatch::bitmatch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of a single 16-bit word in a SPADIC message stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WordKind {
    /// Start of message: group_id, channel_id.
    Som,
    /// Timestamp.
    Tsw,
    /// First raw-data word.
    Rda,
    /// End of message: num_samples, hit_type, stop_type.
    Eom,
    /// Buffer-overflow count.
    Bom,
    /// Epoch marker.
    Epm,
    /// Extracted data; reserved, not decoded.
    Exd,
    /// Info word; carries an [`InfoType`] sub-type.
    Inf,
    /// Continuation of a raw-data payload.
    Con,
}

/// Validity-bitmap bit assigned to each word kind that contributes one.
/// `Exd` and `Con` contribute no bit.
pub(crate) fn validity_bit(kind: WordKind) -> u8 {
    match kind {
        WordKind::Som => 1 << 0,
        WordKind::Tsw => 1 << 1,
        WordKind::Rda => 1 << 2,
        WordKind::Eom => 1 << 3,
        WordKind::Bom => 1 << 4,
        WordKind::Epm => 1 << 5,
        WordKind::Inf => 1 << 6,
        WordKind::Exd | WordKind::Con => 0,
    }
}

/// The info-word sub-type carried in bits 11-8 of an `Inf` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InfoType {
    /// Channel disabled during message building.
    Disabled,
    /// Next grant timeout.
    NextGrantTimeout,
    /// Next request timeout.
    NextRequestTimeout,
    /// New grant but channel buffer empty.
    NewGrantEmpty,
    /// Corruption detected in the message builder.
    BuilderCorruption,
    /// Empty/no-op info word.
    Nop,
    /// Epoch counter out of sync.
    EpochOutOfSync,
    /// Unassigned sub-type code (7-15).
    Unknown(u8),
}

impl InfoType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => InfoType::Disabled,
            1 => InfoType::NextGrantTimeout,
            2 => InfoType::NextRequestTimeout,
            3 => InfoType::NewGrantEmpty,
            4 => InfoType::BuilderCorruption,
            5 => InfoType::Nop,
            6 => InfoType::EpochOutOfSync,
            other => InfoType::Unknown(other),
        }
    }

    /// The raw 4-bit code this variant was decoded from.
    pub fn code(&self) -> u8 {
        match *self {
            InfoType::Disabled => 0,
            InfoType::NextGrantTimeout => 1,
            InfoType::NextRequestTimeout => 2,
            InfoType::NewGrantEmpty => 3,
            InfoType::BuilderCorruption => 4,
            InfoType::Nop => 5,
            InfoType::EpochOutOfSync => 6,
            InfoType::Unknown(bits) => bits,
        }
    }
}

/// The stop condition carried in an `Eom` word's low 3 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopType {
    /// Normal end of message.
    Normal,
    /// Channel buffer became full.
    ChannelBufferFull,
    /// Ordering FIFO became full.
    OrderingFifoFull,
    /// Multiple hits on the same channel.
    MultiHit,
    /// Multiple hits, and the channel buffer became full.
    MultiHitChannelBufferFull,
    /// Multiple hits, and the ordering FIFO became full.
    MultiHitOrderingFifoFull,
    /// Unassigned stop code (6-7).
    Reserved(u8),
}

impl StopType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => StopType::Normal,
            1 => StopType::ChannelBufferFull,
            2 => StopType::OrderingFifoFull,
            3 => StopType::MultiHit,
            4 => StopType::MultiHitChannelBufferFull,
            5 => StopType::MultiHitOrderingFifoFull,
            other => StopType::Reserved(other),
        }
    }

    /// The raw 3-bit code this variant was decoded from.
    pub fn code(&self) -> u8 {
        match *self {
            StopType::Normal => 0,
            StopType::ChannelBufferFull => 1,
            StopType::OrderingFifoFull => 2,
            StopType::MultiHit => 3,
            StopType::MultiHitChannelBufferFull => 4,
            StopType::MultiHitOrderingFifoFull => 5,
            StopType::Reserved(bits) => bits,
        }
    }
}

/// The trigger relationship carried in an `Eom` word's hit_type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HitType {
    /// Global trigger.
    Global,
    /// Self-triggered hit.
    SelfTriggered,
    /// Triggered by a neighboring channel.
    NeighborTriggered,
    /// Both self- and neighbor-triggered.
    SelfAndNeighbor,
}

impl HitType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => HitType::Global,
            1 => HitType::SelfTriggered,
            2 => HitType::NeighborTriggered,
            _ => HitType::SelfAndNeighbor,
        }
    }

    /// The raw 2-bit code this variant was decoded from.
    pub fn code(&self) -> u8 {
        match *self {
            HitType::Global => 0,
            HitType::SelfTriggered => 1,
            HitType::NeighborTriggered => 2,
            HitType::SelfAndNeighbor => 3,
        }
    }
}

/// Classify a 16-bit word. Every kind other than `Con` requires bit 15
/// set, so `Con` (mask 0x8000, value 0x0000) is tried last; this is
/// equivalent to scanning the kind table in order but lets the match
/// arms double as the precedence documentation.
pub fn classify(word: u16) -> (WordKind, Option<InfoType>) {
    if word & 0x8000 == 0 {
        return (WordKind::Con, None);
    }
    match word & 0xF000 {
        0x8000 => (WordKind::Som, None),
        0x9000 => (WordKind::Tsw, None),
        0xA000 => (WordKind::Rda, None),
        0xB000 => (WordKind::Eom, None),
        0xC000 => (WordKind::Bom, None),
        0xD000 => (WordKind::Epm, None),
        0xE000 => (WordKind::Exd, None),
        _ => {
            let info = InfoType::from_bits(((word >> 8) & 0xF) as u8);
            (WordKind::Inf, Some(info))
        }
    }
}

/// An `Inf` word with a `Nop` sub-type carries no information at all;
/// it is dropped before it can reset or terminate anything. `Exd`
/// carries no decodable field either, but it is not skipped the same
/// way: it still passes through `apply` (as a no-op), just like the
/// source protocol's `message_fill` does for it.
pub(crate) fn is_ignore(kind: WordKind, info: Option<InfoType>) -> bool {
    kind == WordKind::Inf && info == Some(InfoType::Nop)
}

/// `Som` starts a new message. So does a lone `Inf` word reporting
/// `NextGrantTimeout`, `NextRequestTimeout`, or `NewGrantEmpty`: such a
/// word is simultaneously start and end of its own self-contained
/// info message, so it must first reset whatever partial message was
/// already in progress.
pub(crate) fn is_start(kind: WordKind, info: Option<InfoType>) -> bool {
    kind == WordKind::Som
        || (kind == WordKind::Inf
            && matches!(
                info,
                Some(InfoType::NextGrantTimeout)
                    | Some(InfoType::NextRequestTimeout)
                    | Some(InfoType::NewGrantEmpty)
            ))
}

/// `Eom`, `Bom`, `Epm` and `Inf` terminate a message.
pub(crate) fn is_end(kind: WordKind) -> bool {
    matches!(kind, WordKind::Eom | WordKind::Bom | WordKind::Epm | WordKind::Inf)
}

/// Fields extracted from an `Som` word.
pub(crate) struct SomFields {
    pub group_id: u8,
    pub channel_id: u8,
}

#[bitmatch]
pub(crate) fn extract_som(word: u16) -> SomFields {
    #[bitmatch]
    let "1000ggggggggcccc" = word;
    SomFields {
        group_id: g as u8,
        channel_id: c as u8,
    }
}

/// Fields extracted from a `Tsw` word.
pub(crate) fn extract_tsw(word: u16) -> u16 {
    word & 0x0FFF
}

/// The masked 12-bit payload of an `Rda` word (the first `raw_buf`
/// entry).
pub(crate) fn extract_rda_payload(word: u16) -> u16 {
    word & 0x0FFF
}

/// The masked 15-bit payload of a `Con` word (a subsequent `raw_buf`
/// entry).
pub(crate) fn extract_con_payload(word: u16) -> u16 {
    word & 0x7FFF
}

/// Fields extracted from an `Eom` word.
pub(crate) struct EomFields {
    pub num_samples: u8,
    pub hit_type: HitType,
    pub stop_type: StopType,
}

#[bitmatch]
pub(crate) fn extract_eom(word: u16) -> EomFields {
    #[bitmatch]
    let "1011nnnnnnhh?sss" = word;
    EomFields {
        num_samples: n as u8,
        hit_type: HitType::from_bits(h as u8),
        stop_type: StopType::from_bits(s as u8),
    }
}

/// The overflow-count field of a `Bom` word.
pub(crate) fn extract_bom(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// The epoch-count field of an `Epm` word.
pub(crate) fn extract_epm(word: u16) -> u16 {
    word & 0x0FFF
}

/// Fields conditionally present in an `Inf` word's low byte, depending
/// on its sub-type.
pub(crate) struct InfFields {
    pub channel_id: Option<u8>,
    pub epoch_count: Option<u16>,
}

pub(crate) fn extract_inf(word: u16, info: InfoType) -> InfFields {
    match info {
        InfoType::Disabled
        | InfoType::NextGrantTimeout
        | InfoType::NewGrantEmpty
        | InfoType::BuilderCorruption => InfFields {
            channel_id: Some(((word >> 4) & 0xF) as u8),
            epoch_count: None,
        },
        InfoType::EpochOutOfSync => InfFields {
            channel_id: None,
            epoch_count: Some(word & 0x00FF),
        },
        InfoType::NextRequestTimeout | InfoType::Nop | InfoType::Unknown(_) => InfFields {
            channel_id: None,
            epoch_count: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_kind() {
        assert_eq!(classify(0x8012).0, WordKind::Som);
        assert_eq!(classify(0x9666).0, WordKind::Tsw);
        assert_eq!(classify(0xA008).0, WordKind::Rda);
        assert_eq!(classify(0xB1D0).0, WordKind::Eom);
        assert_eq!(classify(0xC0FF).0, WordKind::Bom);
        assert_eq!(classify(0xD123).0, WordKind::Epm);
        assert_eq!(classify(0xE000).0, WordKind::Exd);
        assert_eq!(classify(0xF000).0, WordKind::Inf);
        assert_eq!(classify(0x0403).0, WordKind::Con);
        assert_eq!(classify(0x5030).0, WordKind::Con);
    }

    #[test]
    fn info_sub_type_is_decoded() {
        let (kind, info) = classify(0xF600);
        assert_eq!(kind, WordKind::Inf);
        assert_eq!(info, Some(InfoType::EpochOutOfSync));
    }

    #[test]
    fn unknown_info_sub_type_does_not_panic() {
        let (_, info) = classify(0xFF00);
        assert_eq!(info, Some(InfoType::Unknown(15)));
    }

    #[test]
    fn som_fields_match_worked_scenario() {
        let fields = extract_som(0x8012);
        assert_eq!(fields.group_id, 1);
        assert_eq!(fields.channel_id, 2);
    }

    #[test]
    fn eom_fields_match_worked_scenario() {
        let fields = extract_eom(0xB1D0);
        assert_eq!(fields.num_samples, 7);
        assert_eq!(fields.hit_type.code(), 1);
        assert_eq!(fields.stop_type.code(), 0);
    }
}
