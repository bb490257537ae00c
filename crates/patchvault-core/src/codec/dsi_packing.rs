//! DSI "packed MS bit" format
//!
//! Each group of up to 7 data bytes is preceded by one byte carrying their
//! most significant bits: bit `i` of the header is the MSB of byte `i`.

/// Pack 8-bit data into 7-bit sysex-safe bytes
pub fn pack(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packed_len(data.len()));
    for group in data.chunks(7) {
        let msbs = group
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, b)| acc | ((b >> 7) << i));
        out.push(msbs);
        out.extend(group.iter().map(|b| b & 0x7F));
    }
    out
}

/// Reverse of [`pack`]
pub fn unpack(packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(unpacked_len(packed.len()));
    for group in packed.chunks(8) {
        let Some((&msbs, rest)) = group.split_first() else {
            continue;
        };
        out.extend(
            rest.iter()
                .enumerate()
                .map(|(i, b)| (b & 0x7F) | (((msbs >> i) & 0x01) << 7)),
        );
    }
    out
}

pub fn packed_len(unpacked: usize) -> usize {
    unpacked / 7 * 8 + match unpacked % 7 {
        0 => 0,
        rest => rest + 1,
    }
}

pub fn unpacked_len(packed: usize) -> usize {
    packed / 8 * 7 + (packed % 8).saturating_sub(1)
}
