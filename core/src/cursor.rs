//! Position inside the current synthesis block

use crate::engine::Status;

/// Tracks which row of the current engine block the next host frame uses
///
/// A fresh cursor sits on the block boundary with a successful status, so the
/// very first frame triggers a block compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCursor {
    position: usize,
    block_size: usize,
    status: Status,
}

impl BlockCursor {
    /// Cursor primed to compute a block on the next frame
    pub fn new(block_size: usize) -> Self {
        Self {
            position: block_size,
            block_size,
            status: Status::OK,
        }
    }

    /// Cursor primed for a new start that keeps a failed status
    ///
    /// Only an engine reset clears a failure, so a restart without one must
    /// not compute again.
    pub fn restarted(&self, block_size: usize) -> Self {
        Self {
            status: self.status,
            ..Self::new(block_size)
        }
    }

    /// Row of the current block the next frame reads and writes
    pub fn position(&self) -> usize {
        self.position
    }

    /// Frames per block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Status of the most recent block compute
    pub fn status(&self) -> Status {
        self.status
    }

    /// True when the current block is used up
    pub fn at_boundary(&self) -> bool {
        self.position >= self.block_size
    }

    /// True when a new block must be computed before the next frame
    ///
    /// A failed compute is never retried: the engine has nothing more to give
    /// until it is reset.
    #[inline]
    pub fn needs_compute(&self) -> bool {
        self.at_boundary() && self.status.is_ok()
    }

    /// Record the outcome of a block compute and rewind to row 0
    #[inline]
    pub fn begin_block(&mut self, status: Status) {
        self.position = 0;
        self.status = status;
    }

    /// True when the current row holds valid engine output
    #[inline]
    pub fn is_readable(&self) -> bool {
        self.status.is_ok() && !self.at_boundary()
    }

    /// Move to the next row, stopping at the boundary
    #[inline]
    pub fn advance(&mut self) {
        if self.position < self.block_size {
            self.position += 1;
        }
    }
}

impl Default for BlockCursor {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cursor_needs_compute() {
        let cursor = BlockCursor::new(4);
        assert_eq!(cursor.position(), 4);
        assert!(cursor.at_boundary());
        assert!(cursor.needs_compute());
        assert!(!cursor.is_readable());
    }

    #[test]
    fn test_block_walk() {
        let mut cursor = BlockCursor::new(3);
        cursor.begin_block(Status::OK);

        for row in 0..3 {
            assert_eq!(cursor.position(), row);
            assert!(cursor.is_readable());
            assert!(!cursor.needs_compute());
            cursor.advance();
        }
        assert!(cursor.needs_compute());
    }

    #[test]
    fn test_failed_block_is_not_retried() {
        let mut cursor = BlockCursor::new(2);
        cursor.begin_block(Status(1));

        assert_eq!(cursor.position(), 0);
        assert!(!cursor.is_readable());

        for _ in 0..10 {
            cursor.advance();
        }
        assert_eq!(cursor.position(), 2);
        assert!(cursor.at_boundary());
        assert!(!cursor.needs_compute());
        assert_eq!(cursor.status(), Status(1));
    }

    #[test]
    fn test_restart_keeps_failure() {
        let mut cursor = BlockCursor::new(2);
        cursor.begin_block(Status(3));

        let restarted = cursor.restarted(4);
        assert_eq!(restarted.position(), 4);
        assert_eq!(restarted.block_size(), 4);
        assert_eq!(restarted.status(), Status(3));
        assert!(!restarted.needs_compute());
        assert!(!restarted.is_readable());

        let fresh = BlockCursor::default().restarted(4);
        assert!(fresh.needs_compute());
    }

    #[test]
    fn test_advance_saturates_at_boundary() {
        let mut cursor = BlockCursor::new(4);
        cursor.advance();
        assert_eq!(cursor.position(), 4);
    }
}
