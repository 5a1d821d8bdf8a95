/// Source of confirmed L2 blocks.
///
/// Abstracts block storage/retrieval so the sync machinery can be driven by a
/// real archiver, a node RPC, or the in-memory source used by devnets and tests.
use anyhow::{Result, ensure};
use containers::{BlockNumber, L2Block};
use parking_lot::RwLock;

#[async_trait::async_trait]
pub trait L2BlockSource: Send + Sync + 'static {
    /// Number of the latest confirmed block, or 0 if the chain is empty.
    async fn block_height(&self) -> Result<BlockNumber>;

    /// Up to `limit` consecutive blocks starting at `from`.
    ///
    /// Returns fewer blocks (possibly none) when the chain does not reach
    /// `from + limit - 1` yet.
    async fn get_blocks(&self, from: BlockNumber, limit: usize) -> Result<Vec<L2Block>>;
}

/// Block source backed by a vector of blocks numbered 1..=n.
#[derive(Debug, Default)]
pub struct InMemoryBlockSource {
    blocks: RwLock<Vec<L2Block>>,
}

impl InMemoryBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source pre-filled with `count` empty blocks.
    pub fn with_empty_blocks(count: u64) -> Self {
        Self {
            blocks: RwLock::new((1..=count).map(L2Block::empty).collect()),
        }
    }

    /// Append a block. Its number must directly follow the current height.
    pub fn add_block(&self, block: L2Block) -> Result<()> {
        self.add_blocks([block])
    }

    /// Append several blocks at once; readers see either none or all of them.
    pub fn add_blocks(&self, new_blocks: impl IntoIterator<Item = L2Block>) -> Result<()> {
        let mut blocks = self.blocks.write();
        let mut expected = blocks.len() as BlockNumber + 1;
        let new_blocks: Vec<L2Block> = new_blocks.into_iter().collect();

        for block in &new_blocks {
            ensure!(
                block.number == expected,
                "block {} does not extend chain, expected {expected}",
                block.number
            );
            expected += 1;
        }

        blocks.extend(new_blocks);
        Ok(())
    }

    pub fn height(&self) -> BlockNumber {
        self.blocks.read().len() as BlockNumber
    }
}

#[async_trait::async_trait]
impl L2BlockSource for InMemoryBlockSource {
    async fn block_height(&self) -> Result<BlockNumber> {
        Ok(self.height())
    }

    async fn get_blocks(&self, from: BlockNumber, limit: usize) -> Result<Vec<L2Block>> {
        ensure!(from >= 1, "block numbers start at 1, got {from}");

        let blocks = self.blocks.read();
        let start = (from - 1) as usize;
        if start >= blocks.len() {
            return Ok(Vec::new());
        }

        let end = start.saturating_add(limit).min(blocks.len());
        Ok(blocks[start..end].to_vec())
    }
}
