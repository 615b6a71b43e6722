/// A fixed-capacity PCM byte region plus the number of bytes the last
/// writer populated.
///
/// Buffers are only created by [`allocate_pool`] and are deliberately not
/// `Clone`: moving a `SampleBuffer` through a [`BufferQueue`] is the
/// ownership hand-off between capture driver, engine and playback driver,
/// so exactly one context can touch the bytes at any instant.
///
/// [`BufferQueue`]: super::queue::BufferQueue
#[derive(Debug)]
pub struct SampleBuffer {
    id: usize,
    data: Box<[u8]>,
    valid_len: usize,
}

impl SampleBuffer {
    pub(crate) fn new(id: usize, capacity: usize) -> Self {
        Self {
            id,
            data: vec![0u8; capacity].into_boxed_slice(),
            valid_len: 0,
        }
    }

    /// Pool slot this buffer was allocated in.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn valid_len(&self) -> usize {
        self.valid_len
    }

    /// Record how many bytes the current writer populated.
    ///
    /// # Panics
    /// If `len` exceeds the buffer capacity.
    pub fn set_valid_len(&mut self, len: usize) {
        assert!(
            len <= self.data.len(),
            "valid length {} exceeds buffer capacity {}",
            len,
            self.data.len()
        );
        self.valid_len = len;
    }

    /// The populated bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.valid_len]
    }

    /// The populated bytes, for in-place processing.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.valid_len]
    }

    /// The whole backing region, for a producer about to fill the buffer.
    /// Call [`set_valid_len`](Self::set_valid_len) afterwards.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy 16-bit samples in as little-endian PCM and set the valid length.
    ///
    /// Returns the number of samples written, which is limited by capacity.
    pub fn write_samples(&mut self, samples: &[i16]) -> usize {
        let count = samples.len().min(self.data.len() / 2);
        for (chunk, sample) in self.data.chunks_exact_mut(2).zip(&samples[..count]) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        self.valid_len = count * 2;
        count
    }

    /// Decode the populated bytes as little-endian 16-bit samples.
    pub fn read_samples_into(&self, out: &mut Vec<i16>) {
        out.extend(
            self.bytes()
                .chunks_exact(2)
                .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]])),
        );
    }
}

/// Allocate `count` zeroed buffers of `capacity` bytes each, ids `0..count`.
pub fn allocate_pool(count: usize, capacity: usize) -> Vec<SampleBuffer> {
    (0..count).map(|id| SampleBuffer::new(id, capacity)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = SampleBuffer::new(3, 16);
        assert_eq!(buf.id(), 3);
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.valid_len(), 0);
        assert!(buf.bytes().is_empty());
    }

    #[test]
    fn reads_stop_at_valid_len() {
        let mut buf = SampleBuffer::new(0, 8);
        buf.storage_mut().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        buf.set_valid_len(4);

        assert_eq!(buf.bytes(), &[1, 2, 3, 4]);
        assert_eq!(buf.bytes_mut().len(), 4);
    }

    #[test]
    #[should_panic(expected = "exceeds buffer capacity")]
    fn valid_len_beyond_capacity_panics() {
        let mut buf = SampleBuffer::new(0, 8);
        buf.set_valid_len(9);
    }

    #[test]
    fn samples_are_little_endian() {
        let mut buf = SampleBuffer::new(0, 8);
        let written = buf.write_samples(&[1, -2]);

        assert_eq!(written, 2);
        assert_eq!(buf.bytes(), &[0x01, 0x00, 0xFE, 0xFF]);

        let mut decoded = Vec::new();
        buf.read_samples_into(&mut decoded);
        assert_eq!(decoded, vec![1, -2]);
    }

    #[test]
    fn write_samples_truncates_to_capacity() {
        let mut buf = SampleBuffer::new(0, 4);
        assert_eq!(buf.write_samples(&[1, 2, 3]), 2);
        assert_eq!(buf.valid_len(), 4);
    }

    #[test]
    fn pool_ids_are_unique() {
        let pool = allocate_pool(4, 32);
        let ids: Vec<usize> = pool.iter().map(SampleBuffer::id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(pool.iter().all(|b| b.capacity() == 32));
    }
}
