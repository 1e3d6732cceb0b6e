//! Buffer sizing policy: file size → I/O chunk size.

use crate::utils::config::ChunkConsts;

/// Round `n` up to the next multiple of [`ChunkConsts::CHUNK_ALIGN`], never below one alignment unit.
fn align_up(n: u64) -> u64 {
    let align = ChunkConsts::CHUNK_ALIGN;
    n.max(1).div_ceil(align) * align
}

/// Chunk size for streaming a file of `file_size` bytes.
///
/// Files under [`ChunkConsts::MIN_CHUNK`] get a buffer that reads them in one shot. Larger files
/// start at `MIN_CHUNK` and double until the chunk covers the file or reaches
/// [`ChunkConsts::MAX_CHUNK`]. The result is always a multiple of 64 in `[64, MAX_CHUNK]`.
pub fn size_for(file_size: u64) -> usize {
    if file_size < ChunkConsts::MIN_CHUNK {
        return align_up(file_size) as usize;
    }
    let mut chunk = ChunkConsts::MIN_CHUNK;
    while chunk < file_size && chunk < ChunkConsts::MAX_CHUNK {
        chunk <<= 1;
    }
    align_up(chunk) as usize
}
