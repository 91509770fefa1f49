use crate::errors::StoreError;
use crate::shard::Shard;

pub const SHARD_COUNT: usize = 40;

/// Stateless router over a fixed array of shards. Requires no
/// synchronization of its own — each shard carries its own locks, and the
/// array itself is never resized after construction.
pub struct ShardBank {
    shards: [Shard; SHARD_COUNT],
}

impl ShardBank {
    pub fn new() -> Self {
        Self { shards: std::array::from_fn(|_| Shard::new()) }
    }

    /// Validates `0 <= index <= 39` and returns the shard, or `BadIndex`.
    pub fn get(&self, index: i64) -> Result<&Shard, StoreError> {
        if index < 0 {
            return Err(StoreError::BadIndex);
        }
        self.shards.get(index as usize).ok_or(StoreError::BadIndex)
    }
}

impl Default for ShardBank {
    fn default() -> Self {
        Self::new()
    }
}
