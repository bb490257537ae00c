//! Rolling-shift packing used by the Alesis Andromeda
//!
//! Eight-bit bytes are laid end to end as a bit stream and cut into 7-bit
//! chunks, least significant bits first. Seven data bytes therefore occupy
//! eight wire bytes.

/// Unpack 7-bit wire bytes into 8-bit data
pub fn unpack(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 7 / 8);
    let mut roll: u32 = 0;
    let mut i = 0;
    while i + 1 < data.len() {
        let mask1 = (0xFFu32 << roll) & 0x7F;
        let mask2 = 0xFFu32 >> (7 - roll);
        let low = (u32::from(data[i]) & mask1) >> roll;
        let high = (u32::from(data[i + 1]) & mask2) << (7 - roll);
        out.push(((low | high) & 0xFF) as u8);
        roll = (roll + 1) % 7;
        i += 1;
        if roll == 0 {
            i += 1;
        }
    }
    out
}

/// Pack 8-bit data into 7-bit wire bytes
pub fn pack(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 8 / 7 + 2);
    let mut roll: u32 = 7;
    let mut previous: u32 = 0;
    let mut i = 0;
    while i < data.len() {
        let mask1 = 0xFFu32 >> (8 - roll);
        let mask2 = (0xFFu32 >> roll) << roll;
        if mask1 > 0 {
            let byte = u32::from(data[i]);
            out.push((((byte & mask1) << (7 - roll)) | previous) as u8);
            previous = (byte & mask2) >> roll;
            roll -= 1;
            i += 1;
        } else {
            out.push(previous as u8);
            previous = 0;
            roll = 7;
        }
    }
    out.push(previous as u8);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unpack_known_vectors() {
        assert_eq!(unpack(&[0x7F, 0x01, 0x02, 0x00]), vec![0xFF, 0x80, 0x00]);
        assert_eq!(unpack(&[0x7F; 16]), vec![0xFF; 14]);
        assert_eq!(
            unpack(&[0, 0, 0, 0, 0, 0, 0x40, 0x7F, 0, 0]),
            vec![0, 0, 0, 0, 0, 0, 0xFF, 0]
        );
    }

    #[test]
    fn test_pack_known_vector() {
        let mut expected = vec![0x7F; 17];
        expected.push(0x01);
        assert_eq!(pack(&[0xFF; 15]), expected);
    }

    #[test]
    fn test_program_block_sizes() {
        assert_eq!(pack(&[0u8; 2048]).len(), 2341);
        assert_eq!(unpack(&[0u8; 2341]).len(), 2048);
    }

    proptest! {
        #[test]
        fn pack_round_trips(data in proptest::collection::vec(any::<u8>(), 1..200)) {
            let packed = pack(&data);
            prop_assert!(packed.iter().all(|b| *b < 0x80));
            let unpacked = unpack(&packed);
            prop_assert_eq!(&unpacked[..data.len()], &data[..]);
        }
    }
}
