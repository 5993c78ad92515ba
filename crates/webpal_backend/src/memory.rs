//! Heap allocation that reports failure instead of aborting.
//!
//! Blocks are plain byte vectors. `try_*` return `None` on failure; the `alloc*` forms turn that
//! into `ReturnCode::OUT_OF_MEMORY` for callers that propagate with `?`.

use tracing::warn;

use webpal_base::{PalResult, ReturnCode};

fn block_size(count: usize, elem_size: usize) -> Option<usize> {
    count.checked_mul(elem_size).filter(|&size| size > 0)
}

/// Uninitialised contents are not exposed; the block is zero-filled like the cleared form.
pub fn try_alloc(count: usize, elem_size: usize) -> Option<Vec<u8>> {
    try_alloc_cleared(count, elem_size)
}

pub fn try_alloc_cleared(count: usize, elem_size: usize) -> Option<Vec<u8>> {
    let size = block_size(count, elem_size)?;
    let mut block = Vec::new();
    block.try_reserve_exact(size).ok()?;
    block.resize(size, 0);
    Some(block)
}

/// Resize `block` to `count * elem_size` bytes, keeping its prefix.
///
/// On failure the original block is handed back unchanged.
pub fn try_realloc(
    mut block: Vec<u8>,
    count: usize,
    elem_size: usize,
) -> Result<Vec<u8>, Vec<u8>> {
    let Some(size) = block_size(count, elem_size) else {
        return Err(block);
    };
    if size > block.len() && block.try_reserve_exact(size - block.len()).is_err() {
        return Err(block);
    }
    block.resize(size, 0);
    Ok(block)
}

pub fn alloc(count: usize, elem_size: usize) -> PalResult<Vec<u8>> {
    try_alloc(count, elem_size).ok_or_else(|| out_of_memory(count, elem_size))
}

pub fn alloc_cleared(count: usize, elem_size: usize) -> PalResult<Vec<u8>> {
    try_alloc_cleared(count, elem_size).ok_or_else(|| out_of_memory(count, elem_size))
}

pub fn realloc(block: Vec<u8>, count: usize, elem_size: usize) -> PalResult<Vec<u8>> {
    try_realloc(block, count, elem_size).map_err(|_| out_of_memory(count, elem_size))
}

fn out_of_memory(count: usize, elem_size: usize) -> ReturnCode {
    warn!(count, elem_size, "allocation failed");
    ReturnCode::OUT_OF_MEMORY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_zeroed() {
        let block = try_alloc(4, 3).unwrap();
        assert_eq!(block, vec![0u8; 12]);
    }

    #[test]
    fn test_overflow_fails() {
        assert_eq!(try_alloc(usize::MAX, 2), None);
        assert_eq!(alloc_cleared(usize::MAX, 2), Err(ReturnCode::OUT_OF_MEMORY));
    }

    #[test]
    fn test_zero_sized_request_fails() {
        assert_eq!(try_alloc(0, 16), None);
        assert_eq!(alloc(16, 0), Err(ReturnCode::OUT_OF_MEMORY));
    }

    #[test]
    fn test_realloc_keeps_prefix() {
        let block = vec![1, 2, 3];
        let grown = try_realloc(block, 5, 1).unwrap();
        assert_eq!(grown, vec![1, 2, 3, 0, 0]);
        let shrunk = realloc(grown, 2, 1).unwrap();
        assert_eq!(shrunk, vec![1, 2]);
    }

    #[test]
    fn test_failed_realloc_returns_original() {
        let block = vec![7u8; 4];
        assert_eq!(try_realloc(block, usize::MAX, 2), Err(vec![7u8; 4]));
    }
}
