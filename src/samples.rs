//! Expansion of a message's `raw_buf` into signed 9-bit ADC samples.
//!
//! The raw-data payload is a bit river: the first `raw_buf` word
//! contributes its low 12 bits, every following word its low 15 bits,
//! all concatenated MSB-first, and the result is chopped into 9-bit
//! fields. This mirrors the bit-level `BitVec` construction the
//! teacher crate uses for its own (byte-granular) packet framing,
//! generalized here to the SPADIC payload's mixed word widths.

use bitvec::prelude::*;

const FIRST_WORD_BITS: usize = 12;
const CONT_WORD_BITS: usize = 15;
const SAMPLE_BITS: usize = 9;

/// Unpack up to `num_samples` signed samples from `raw_buf`.
///
/// `raw_buf` holds the masked payload words captured from the `Rda`
/// word and any following `Con` words, in order. Trailing bits that do
/// not fill a whole 9-bit field are discarded, and `num_samples` caps
/// the output even if the bit river holds more complete fields than
/// that (both per the original protocol, which never over- or
/// under-reports its own sample count relative to what was captured).
pub(crate) fn unpack(raw_buf: &[u16], num_samples: u8) -> Vec<i16> {
    let mut river: BitVec<Msb0, u8> = BitVec::with_capacity(raw_buf.len() * CONT_WORD_BITS);
    for (i, &word) in raw_buf.iter().enumerate() {
        let width = if i == 0 { FIRST_WORD_BITS } else { CONT_WORD_BITS };
        for shift in (0..width).rev() {
            river.push((word >> shift) & 1 == 1);
        }
    }

    let want = num_samples as usize;
    river
        .chunks_exact(SAMPLE_BITS)
        .take(want)
        .map(|field| sign_extend(field.load_be::<u16>()))
        .collect()
}

/// Sign-extend a 9-bit two's-complement field held in the low 9 bits of
/// `value` to a full `i16`.
fn sign_extend(value: u16) -> i16 {
    const SIGN_BIT: u16 = 1 << (SAMPLE_BITS - 1);
    if value & SIGN_BIT != 0 {
        (value as i16) - (1 << SAMPLE_BITS)
    } else {
        value as i16
    }
}
