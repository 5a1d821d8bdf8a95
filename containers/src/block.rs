use crate::{BlockNumber, Tx, TxHash};
use serde::{Deserialize, Serialize};

/// A confirmed L2 block: a height plus the transactions it settled, in order.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct L2Block {
    pub number: BlockNumber,
    pub txs: Vec<Tx>,
}

impl L2Block {
    pub fn new(number: BlockNumber, txs: Vec<Tx>) -> Self {
        Self { number, txs }
    }

    pub fn empty(number: BlockNumber) -> Self {
        Self::new(number, Vec::new())
    }

    /// Block filled with `tx_count` random transactions.
    pub fn random(number: BlockNumber, tx_count: usize) -> Self {
        Self::new(number, (0..tx_count).map(|_| Tx::random()).collect())
    }

    /// Hashes of every transaction in the block, in block order.
    pub fn tx_hashes(&self) -> Vec<TxHash> {
        self.txs.iter().map(Tx::hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tx_hashes_keep_block_order() {
        let txs = vec![Tx::new(vec![3]), Tx::new(vec![1]), Tx::new(vec![2])];
        let expected: Vec<_> = txs.iter().map(Tx::hash).collect();

        let block = L2Block::new(7, txs);
        assert_eq!(block.tx_hashes(), expected);
    }

    #[test]
    fn test_empty_block() {
        let block = L2Block::empty(1);
        assert_eq!(block.number, 1);
        assert!(block.tx_hashes().is_empty());
    }

    #[test]
    fn test_random_block() {
        let block = L2Block::random(4, 3);
        assert_eq!(block.txs.len(), 3);
        assert_eq!(block.number, 4);
    }
}
