//! CRC-32/ISO-HDLC, the checksum carried in every ZIP header.
//!
//! Reflected polynomial `0xEDB88320`, register preset to all ones and
//! complemented on output.  Bit-compatible with PKZIP and RFC 1952.

/// Reflected CRC-32 generator polynomial.
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// 256-entry lookup table, built at compile time.
pub static CRC32_TABLE: [u32; 256] = generate_table();

const fn generate_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut n = i as u32;
        let mut round = 0;
        while round < 8 {
            n = if n & 1 != 0 { (n >> 1) ^ CRC32_POLYNOMIAL } else { n >> 1 };
            round += 1;
        }
        table[i] = n;
        i += 1;
    }
    table
}

/// Incremental CRC-32 state.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    register: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self { register: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        let mut reg = self.register;
        for &b in data {
            reg = CRC32_TABLE[((reg ^ b as u32) & 0xFF) as usize] ^ (reg >> 8);
        }
        self.register = reg;
    }

    pub fn finalize(self) -> u32 {
        !self.register
    }
}

/// One-shot checksum of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}
