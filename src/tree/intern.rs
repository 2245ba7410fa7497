use crate::atom::Slice;
use crate::error::{AmqpError, Result};

/// Growable side buffer backing every variable-length atom's payload.
///
/// Atoms store a `(offset, len)` pair rather than a pointer, so growing
/// `bytes` (which may reallocate) never invalidates an already-interned
/// atom: the offset is an index, not an address, and indices into a
/// `Vec<u8>` are stable across reallocation by construction. The
/// "rebase every interned atom" step the spec calls for is therefore
/// structural here rather than an explicit pass — there is nothing to
/// rewrite.
#[derive(Debug, Default)]
pub struct InternBuffer {
    bytes: Vec<u8>,
}

impl InternBuffer {
    pub fn new() -> Self {
        InternBuffer { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        InternBuffer {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies `data` into the buffer and returns the slice that now
    /// designates it.
    pub fn intern(&mut self, data: &[u8]) -> Slice {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(data);
        let slice = Slice {
            offset,
            len: data.len() as u32,
        };
        log::debug!(
            "interned {} byte(s) at offset {} (buffer now {} bytes)",
            data.len(),
            offset,
            self.bytes.len()
        );
        slice
    }

    pub fn get(&self, slice: Slice) -> Result<&[u8]> {
        let start = slice.offset as usize;
        let end = start + slice.len as usize;
        self.bytes.get(start..end).ok_or_else(|| {
            AmqpError::arg_err(format!(
                "intern slice {start}..{end} out of bounds (buffer is {} bytes)",
                self.bytes.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_interleaved_with_growth_preserves_earlier_slices() {
        let mut buf = InternBuffer::new();
        let mut slices = Vec::new();
        for i in 0..10_000u32 {
            let small = [i as u8, (i >> 8) as u8];
            slices.push((small.to_vec(), buf.intern(&small)));
            if i % 500 == 0 {
                let large = vec![0xAAu8; 8192];
                buf.intern(&large);
            }
        }
        for (expected, slice) in &slices {
            assert_eq!(buf.get(*slice).unwrap(), expected.as_slice());
        }
    }
}
