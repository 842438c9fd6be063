// Disjoint-set forest over dense node indices

pub type NodeId = usize;

/// Union-find with path compression and union by size.
///
/// Nodes are positions in an arena, so there is no pointer graph to walk.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<NodeId>,
    size: Vec<usize>,
}

impl UnionFind {
    #[inline]
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of `node`'s set
    pub fn find(&mut self, node: NodeId) -> NodeId {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = node;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false when already joined.
    pub fn union(&mut self, a: NodeId, b: NodeId) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_find() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(0, 1));
        assert!(uf.union(1, 2));
        assert!(!uf.union(0, 2));
        assert_eq!(uf.find(0), uf.find(2));
        assert_ne!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(3), uf.find(4));
    }

    #[test]
    fn test_long_chain_compresses() {
        let mut uf = UnionFind::new(1000);
        for i in 1..1000 {
            uf.union(i - 1, i);
        }
        let root = uf.find(999);
        assert!((0..1000).all(|i| uf.find(i) == root));
        assert!(!uf.union(0, 999));
    }
}
