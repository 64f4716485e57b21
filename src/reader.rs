//! Bounded random-access byte source shared by sample payload closures.
//!
//! A `Reader` wraps an in-memory buffer, a memory-mapped file, or a
//! caller-supplied range-read callback behind one handle, with a
//! mutex-guarded sequential cursor alongside fully random-access reads. It is
//! the only object the editing engines treat as shared mutable state;
//! everything else in this crate is pure values and immutable samples.

use std::fs::File;
use std::sync::{Arc, Mutex};

use memmap::Mmap;

use crate::error::{Error, Result};

enum Backing {
    Memory(Arc<Vec<u8>>),
    MappedFile(Arc<Mmap>),
    Callback(Arc<dyn Fn(u32, u32) -> Result<Vec<u8>> + Send + Sync>),
}

struct Shared {
    backing: Backing,
    size: u32,
    offset: Mutex<u32>,
}

/// A cheaply-cloneable handle to a bounded random-access byte source.
///
/// Cloning a `Reader` clones the `Arc` to its shared state, so every clone
/// sees the same sequential-read cursor (guarded by the inner mutex) while
/// `read_at` is fully random-access and cursor-independent.
#[derive(Clone)]
pub struct Reader {
    shared: Arc<Shared>,
}

impl Reader {
    pub fn from_memory(data: Vec<u8>) -> Reader {
        let size = data.len() as u32;
        Reader {
            shared: Arc::new(Shared { backing: Backing::Memory(Arc::new(data)), size, offset: Mutex::new(0) }),
        }
    }

    pub fn from_file(file: &File) -> Result<Reader> {
        let size = file.metadata()?.len();
        if size == 0 {
            return Ok(Reader::from_memory(Vec::new()));
        }
        if size > u32::MAX as u64 {
            return Err(error!(Overflow, "file size {} exceeds u32 range", size));
        }
        let map = unsafe { Mmap::map(file)? };
        Ok(Reader {
            shared: Arc::new(Shared { backing: Backing::MappedFile(Arc::new(map)), size: size as u32, offset: Mutex::new(0) }),
        })
    }

    /// Wrap an arbitrary range-read callback (e.g. a platform file
    /// descriptor or a network range request), with a known total `size`.
    pub fn from_callback(size: u32, read: impl Fn(u32, u32) -> Result<Vec<u8>> + Send + Sync + 'static) -> Reader {
        Reader {
            shared: Arc::new(Shared { backing: Backing::Callback(Arc::new(read)), size, offset: Mutex::new(0) }),
        }
    }

    pub fn size(&self) -> u32 {
        self.shared.size
    }

    /// Random-access read; does not affect the sequential cursor.
    pub fn read_at(&self, offset: u32, size: u32) -> Result<Vec<u8>> {
        if offset.saturating_add(size) > self.shared.size {
            return Err(error!(OutOfRange, "read [{}, {}) exceeds size {}", offset, offset as u64 + size as u64, self.shared.size));
        }
        match &self.shared.backing {
            Backing::Memory(data) => Ok(data[offset as usize..(offset + size) as usize].to_vec()),
            Backing::MappedFile(map) => Ok(map[offset as usize..(offset + size) as usize].to_vec()),
            Backing::Callback(f) => f(offset, size),
        }
    }

    /// Sequential read from the shared cursor, advancing it by `size`.
    pub fn read(&self, size: u32) -> Result<Vec<u8>> {
        let mut offset = self.shared.offset.lock().map_err(|_| Error::ReaderError("reader lock poisoned".into()))?;
        let data = self.read_at(*offset, size)?;
        *offset += size;
        Ok(data)
    }

    pub fn seek(&self, offset: u32) -> Result<()> {
        if offset > self.shared.size {
            return Err(error!(OutOfRange, "seek to {} exceeds size {}", offset, self.shared.size));
        }
        let mut cursor = self.shared.offset.lock().map_err(|_| Error::ReaderError("reader lock poisoned".into()))?;
        *cursor = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_at_is_cursor_independent() {
        let reader = Reader::from_memory(vec![1, 2, 3, 4, 5]);
        reader.seek(4).unwrap();
        assert_eq!(reader.read_at(0, 2).unwrap(), vec![1, 2]);
        // sequential cursor untouched by read_at
        assert_eq!(reader.read(1).unwrap(), vec![5]);
    }

    #[test]
    fn out_of_range_read_is_an_error() {
        let reader = Reader::from_memory(vec![1, 2, 3]);
        assert!(reader.read_at(2, 5).is_err());
    }

    #[test]
    fn clone_shares_the_cursor() {
        let reader = Reader::from_memory(vec![1, 2, 3, 4]);
        let clone = reader.clone();
        assert_eq!(reader.read(2).unwrap(), vec![1, 2]);
        assert_eq!(clone.read(2).unwrap(), vec![3, 4]);
    }

    #[test]
    fn callback_backing_delegates_reads() {
        let reader = Reader::from_callback(10, |offset, size| Ok(vec![offset as u8; size as usize]));
        assert_eq!(reader.read_at(3, 2).unwrap(), vec![3, 3]);
    }
}
