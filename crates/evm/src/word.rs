//! 256-bit machine word arithmetic.
//!
//! Words are `U256` values. Unsigned operations wrap modulo 2^256; the
//! signed views read the most significant bit as the sign of a
//! two's-complement number. Division and modulo by zero yield zero.

use ethereum_types::{U256, U512};

pub fn bool_to_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

pub fn is_negative(value: U256) -> bool {
    value.bit(255)
}

pub fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        twos_complement(value)
    } else {
        value
    }
}

pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

/// Signed division truncating toward zero. `MIN / -1` wraps to `MIN`.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        twos_complement(quotient)
    } else {
        quotient
    }
}

/// Signed remainder; the result takes the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(a) && !remainder.is_zero() {
        twos_complement(remainder)
    } else {
        remainder
    }
}

/// `(a + b) % n` over a 512-bit intermediate.
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let sum = U512::from(a) + U512::from(b);
    narrow(sum % U512::from(n))
}

/// `(a * b) % n` over a 512-bit intermediate.
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow(a.full_mul(b) % U512::from(n))
}

fn narrow(value: U512) -> U256 {
    // Callers only narrow remainders of a 256-bit modulus.
    U256::try_from(value).unwrap_or_default()
}

pub fn exp(base: U256, exponent: U256) -> U256 {
    base.overflowing_pow(exponent).0
}

/// Extends the sign bit of byte `index` (counted from the least significant
/// end) through the high bytes. Indices of 31 and above leave `x` unchanged.
pub fn signextend(index: U256, x: U256) -> U256 {
    if index >= U256::from(31) {
        return x;
    }
    let bit = index.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << (bit + 1)) - U256::one();
    if x.bit(bit) {
        x | !mask
    } else {
        x & mask
    }
}

pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// Byte `index` of `x` counted from the most significant end.
pub fn byte(index: U256, x: U256) -> U256 {
    if index >= U256::from(32) {
        U256::zero()
    } else {
        U256::from(x.byte(31 - index.low_u64() as usize))
    }
}
