//! One's-complement checksum arithmetic.
//!
//! The datagram checksum sums 16-bit words with end-around carry: any carry out
//! of bit 15 is added back into bit 0. The sum covers a pseudo-header made of
//! a zero word, the source port, the destination port and the body length,
//! followed by the body itself taken two bytes at a time.
//!
//! Body words are formed with the first byte of each pair as the high byte. An
//! odd trailing byte becomes the high byte of a word whose low byte is zero.
//!
//! A zero result is never transmitted: it is replaced by all-ones (`0xFFFF`),
//! since a zero checksum field conventionally means "not computed".

/// Checksum value used in place of a zero sum.
pub const ZERO_CHECKSUM_SUBSTITUTE: u16 = 0xFFFF;

/// Add two 16-bit words with end-around carry.
#[inline]
pub fn ones_complement_add(a: u16, b: u16) -> u16 {
    let (sum, carry) = a.overflowing_add(b);
    // With a carry the wrapped sum is at most 0xFFFE, so adding it back cannot overflow.
    sum + u16::from(carry)
}

/// Fold a byte slice into an accumulator, two bytes per word.
pub fn fold_words(mut acc: u16, data: &[u8]) -> u16 {
    let mut pairs = data.chunks_exact(2);
    for pair in &mut pairs {
        acc = ones_complement_add(acc, u16::from_be_bytes([pair[0], pair[1]]));
    }
    if let [last] = pairs.remainder() {
        acc = ones_complement_add(acc, u16::from_be_bytes([*last, 0]));
    }
    acc
}

/// Compute the header checksum for a body sent between two ports.
///
/// The body length enters the pseudo-header truncated to 16 bits; callers
/// enforce the maximum body size before a checksum is stored in a header.
pub fn checksum(source_port: u16, dest_port: u16, body: &[u8]) -> i16 {
    let mut acc = 0u16;
    acc = ones_complement_add(acc, source_port);
    acc = ones_complement_add(acc, dest_port);
    acc = ones_complement_add(acc, body.len() as u16);
    acc = fold_words(acc, body);

    if acc == 0 {
        acc = ZERO_CHECKSUM_SUBSTITUTE;
    }

    acc as i16
}

/// Check a received checksum field against the ports and body it arrived with.
#[inline]
pub fn verify(source_port: u16, dest_port: u16, body: &[u8], received: i16) -> bool {
    checksum(source_port, dest_port, body) == received
}
