// Tue Jan 13 2026 - Alex

const PRIME1: u32 = 0x9E3779B1;
const PRIME2: u32 = 0x85EBCA77;
const PRIME3: u32 = 0xC2B2AE3D;
const PRIME4: u32 = 0x27D4EB2F;
const PRIME5: u32 = 0x165667B1;

/// xxHash32 of `data`.
pub fn xxh32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h32: u32;
    let mut p = 0;

    if len >= 16 {
        let limit = len - 15;
        let mut v1 = seed.wrapping_add(PRIME1).wrapping_add(PRIME2);
        let mut v2 = seed.wrapping_add(PRIME2);
        let mut v3 = seed;
        let mut v4 = seed.wrapping_sub(PRIME1);

        while p < limit {
            v1 = round32(v1, read_u32_le(&data[p..]));
            v2 = round32(v2, read_u32_le(&data[p + 4..]));
            v3 = round32(v3, read_u32_le(&data[p + 8..]));
            v4 = round32(v4, read_u32_le(&data[p + 12..]));
            p += 16;
        }

        h32 = v1
            .rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18));
    } else {
        h32 = seed.wrapping_add(PRIME5);
    }

    h32 = h32.wrapping_add(len as u32);

    while p + 4 <= len {
        h32 = h32.wrapping_add(read_u32_le(&data[p..]).wrapping_mul(PRIME3));
        h32 = h32.rotate_left(17).wrapping_mul(PRIME4);
        p += 4;
    }

    while p < len {
        h32 = h32.wrapping_add((data[p] as u32).wrapping_mul(PRIME5));
        h32 = h32.rotate_left(11).wrapping_mul(PRIME1);
        p += 1;
    }

    avalanche(h32)
}

fn round32(acc: u32, input: u32) -> u32 {
    acc.wrapping_add(input.wrapping_mul(PRIME2))
        .rotate_left(13)
        .wrapping_mul(PRIME1)
}

fn avalanche(mut h: u32) -> u32 {
    h ^= h >> 15;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 13;
    h = h.wrapping_mul(PRIME3);
    h ^= h >> 16;
    h
}

fn read_u32_le(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(xxh32(b"", 0), 0x02CC5D05);
        assert_eq!(xxh32(b"abc", 0), 0x32D153FF);
        assert_eq!(xxh32(b"Nobody inspects the spammish repetition", 0), 0xE2293B2F);
    }

    #[test]
    fn test_seed_changes_digest() {
        assert_ne!(xxh32(b"abc", 0), xxh32(b"abc", 42));
    }
}
