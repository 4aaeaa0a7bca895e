use std::fmt;
use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::blockchain::proto::ToRaw;

/// Variable length integer
/// Also known as CompactSize. Values always serialize to the shortest
/// possible encoding, regardless of how they were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarUint {
    pub value: u64,
}

impl VarUint {
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<VarUint> {
        let first = reader.read_u8()?; // read first length byte
        let value = match first {
            0x00..=0xfc => u64::from(first),
            0xfd => u64::from(reader.read_u16::<LittleEndian>()?),
            0xfe => u64::from(reader.read_u32::<LittleEndian>()?),
            0xff => reader.read_u64::<LittleEndian>()?,
        };
        Ok(VarUint { value })
    }
}

impl From<u8> for VarUint {
    #[inline]
    fn from(value: u8) -> Self {
        VarUint {
            value: u64::from(value),
        }
    }
}

impl From<u16> for VarUint {
    #[inline]
    fn from(value: u16) -> Self {
        VarUint {
            value: u64::from(value),
        }
    }
}

impl From<u32> for VarUint {
    #[inline]
    fn from(value: u32) -> Self {
        VarUint {
            value: u64::from(value),
        }
    }
}

impl From<u64> for VarUint {
    #[inline]
    fn from(value: u64) -> Self {
        VarUint { value }
    }
}

impl From<usize> for VarUint {
    #[inline]
    fn from(value: usize) -> Self {
        VarUint {
            value: value as u64,
        }
    }
}

impl ToRaw for VarUint {
    fn to_bytes(&self) -> Vec<u8> {
        match self.value {
            0x00..=0xfc => vec![self.value as u8],
            0xfd..=0xffff => {
                let mut buf = Vec::with_capacity(3);
                buf.push(0xfd);
                buf.extend_from_slice(&(self.value as u16).to_le_bytes());
                buf
            }
            0x10000..=0xffff_ffff => {
                let mut buf = Vec::with_capacity(5);
                buf.push(0xfe);
                buf.extend_from_slice(&(self.value as u32).to_le_bytes());
                buf
            }
            _ => {
                let mut buf = Vec::with_capacity(9);
                buf.push(0xff);
                buf.extend_from_slice(&self.value.to_le_bytes());
                buf
            }
        }
    }
}

impl fmt::Display for VarUint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use crate::blockchain::proto::varuint::VarUint;
    use crate::blockchain::proto::ToRaw;
    use std::io;

    #[test]
    fn test_varuint_u8() {
        let test = VarUint::from(250u8);
        assert_eq!(250, test.value);
        assert_eq!(vec![0xfa], test.to_bytes());
    }

    #[test]
    fn test_varuint_u16() {
        let test = VarUint::from(4444u16);
        assert_eq!(4444, test.value);
        assert_eq!(vec![0xfd, 0x5c, 0x11], test.to_bytes());

        let test = VarUint::from(515u16);
        assert_eq!(515, test.value);
        assert_eq!(vec![0xfd, 0x03, 0x02], test.to_bytes());
    }

    #[test]
    fn test_varuint_u32() {
        let test = VarUint::from(3333333333u32);
        assert_eq!(3333333333, test.value);
        assert_eq!(vec![0xfe, 0x55, 0xa1, 0xae, 0xc6], test.to_bytes());
    }

    #[test]
    fn test_varuint_u64() {
        let test = VarUint::from(9000000000000000000u64);
        assert_eq!(9000000000000000000, test.value);
        assert_eq!(
            vec![0xff, 0x00, 0x00, 0x84, 0xe2, 0x50, 0x6c, 0xe6, 0x7c],
            test.to_bytes()
        );
    }

    #[test]
    fn test_varuint_minimal_encoding() {
        // a value read from a wider encoding re-serializes minimally
        let mut cursor = io::Cursor::new([0xfd, 0xfa, 0x00]);
        let test = VarUint::read_from(&mut cursor).unwrap();
        assert_eq!(250, test.value);
        assert_eq!(vec![0xfa], test.to_bytes());
    }

    #[test]
    fn test_varuint_read() {
        let mut cursor = io::Cursor::new([0xfe, 0x55, 0xa1, 0xae, 0xc6]);
        let test = VarUint::read_from(&mut cursor);
        assert_eq!(vec![0xfe, 0x55, 0xa1, 0xae, 0xc6], test.unwrap().to_bytes());
    }
}
