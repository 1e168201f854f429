use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

pub(crate) trait ReadUtil: Read {
    fn read_be_u16(&mut self) -> io::Result<u16> {
        self.read_u16::<BigEndian>()
    }

    fn read_be_u32(&mut self) -> io::Result<u32> {
        self.read_u32::<BigEndian>()
    }

    fn read_be_u64(&mut self) -> io::Result<u64> {
        self.read_u64::<BigEndian>()
    }

    fn read_u8_vec(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<T: Read> ReadUtil for T {}

pub(crate) trait WriteUtil: Write {
    fn write_be_u16(&mut self, val: u16) -> io::Result<()> {
        self.write_u16::<BigEndian>(val)
    }

    fn write_be_u32(&mut self, val: u32) -> io::Result<()> {
        self.write_u32::<BigEndian>(val)
    }

    fn write_be_u64(&mut self, val: u64) -> io::Result<()> {
        self.write_u64::<BigEndian>(val)
    }
}

impl<T: Write> WriteUtil for T {}
