//! N-fold
//!
//! Stretches or shrinks an octet string to a fixed width by summing
//! successively 13-bit-rotated copies of the input with ones'-complement
//! addition, until the total folded length reaches lcm(input, output).

use zeroize::Zeroizing;

use crate::error::{KeytabError, Result};

/// Fold `input` to `output_bits` bits (a positive multiple of 8)
pub fn nfold(input: &[u8], output_bits: usize) -> Result<Zeroizing<Vec<u8>>> {
    if output_bits == 0 || output_bits % 8 != 0 {
        return Err(KeytabError::InvalidFold(format!(
            "output size must be a positive multiple of 8 bits, got {}",
            output_bits
        )));
    }

    let mut out = Zeroizing::new(Vec::new());
    out.try_reserve_exact(output_bits / 8)?;
    out.resize(output_bits / 8, 0);
    nfold_into(input, &mut out)?;
    Ok(out)
}

/// Fold `input` into the whole of `out`
pub fn nfold_into(input: &[u8], out: &mut [u8]) -> Result<()> {
    let len = input.len();
    let size = out.len();
    if len == 0 {
        return Err(KeytabError::InvalidFold("input must not be empty".to_string()));
    }
    if size == 0 {
        return Err(KeytabError::InvalidFold("output must not be empty".to_string()));
    }

    // Unconsumed rotated copies. Less than `size` bytes carry over between
    // rounds, so one round never needs more than size + len bytes.
    let mut pending = zeroed(2 * size.max(len))?;
    let mut current = zeroed(len)?;
    let mut rotated = zeroed(len)?;

    out.fill(0);
    current.copy_from_slice(input);
    pending[..len].copy_from_slice(input);

    let mut filled = 0;
    loop {
        filled += len;
        while filled >= size {
            add_ones_complement(out, &pending[..size]);
            filled -= size;
            if filled == 0 {
                break;
            }
            pending.copy_within(size..size + filled, 0);
        }
        if filled == 0 {
            return Ok(());
        }

        rotate_right_13(&mut rotated, &current);
        pending[filled..filled + len].copy_from_slice(&rotated);
        std::mem::swap(&mut current, &mut rotated);
    }
}

fn zeroed(len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(Vec::new());
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Rotate the bit string `src` right by 13 bits into `dst`
fn rotate_right_13(dst: &mut [u8], src: &[u8]) {
    let bytes = src.len();
    let total_bits = bytes * 8;
    let shift = 13 % total_bits;

    for (i, out) in dst.iter_mut().enumerate() {
        // source bit that lands on the first bit of output byte i
        let first_bit = (8 * i + total_bits - shift) % total_bits;
        let b1 = first_bit / 8;
        let s1 = first_bit % 8;
        let b2 = (b1 + 1) % bytes;

        let hi = u32::from(src[b1]) << s1;
        let lo = u32::from(src[b2]) >> (8 - s1);
        *out = (hi | lo) as u8;
    }
}

/// `acc += addend` as big-endian ones'-complement numbers (end-around carry)
fn add_ones_complement(acc: &mut [u8], addend: &[u8]) {
    let mut carry = 0u32;
    for (a, b) in acc.iter_mut().zip(addend).rev() {
        let sum = u32::from(*a) + u32::from(*b) + carry;
        *a = sum as u8;
        carry = sum >> 8;
    }
    for a in acc.iter_mut().rev() {
        if carry == 0 {
            break;
        }
        let sum = u32::from(*a) + carry;
        *a = sum as u8;
        carry = sum >> 8;
    }
}
