use bytes::{Buf, BufMut};

use super::config::INT_SIZE;

/// Reads a little-endian `i32` at `offset`. Panics if the field would run
/// past the end of `data`.
#[inline]
pub fn read_i32(data: &[u8], offset: usize) -> i32 {
    let mut src = &data[offset..offset + INT_SIZE];
    src.get_i32_le()
}

/// Writes a little-endian `i32` at `offset`.
#[inline]
pub fn write_i32(data: &mut [u8], offset: usize, value: i32) {
    let mut dst = &mut data[offset..offset + INT_SIZE];
    dst.put_i32_le(value);
}
