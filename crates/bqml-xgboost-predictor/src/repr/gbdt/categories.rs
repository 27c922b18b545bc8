//! Categorical split storage for tree nodes.
//!
//! XGBoost stores categorical splits as the set of categories that go right.
//! Categories not in the set go left. Sets are kept here as packed `u32`
//! bitsets, one segment per node.

// =============================================================================
// CategoriesStorage
// =============================================================================

/// Packed category bitsets for every categorical node of one tree.
///
/// # Decision Rule
///
/// For a categorical split on a node with feature value `c`:
/// - bit `c` set → RIGHT
/// - bit `c` not set, or `c` beyond the stored words → LEFT
/// - feature value NaN → default direction (handled by the caller)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoriesStorage {
    /// Flat array of bitset words (32 categories per word).
    words: Box<[u32]>,
    /// Per-node `(start, n_words)` into `words`. Empty when the tree has no
    /// categorical splits.
    segments: Box<[(u32, u32)]>,
}

impl CategoriesStorage {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build storage from per-node category lists.
    ///
    /// `per_node[i]` holds the categories that go right at node `i`; nodes
    /// without a categorical split pass an empty list.
    pub fn from_node_categories(per_node: &[Vec<u32>]) -> Self {
        if per_node.iter().all(Vec::is_empty) {
            return Self::empty();
        }

        let mut words = Vec::new();
        let mut segments = Vec::with_capacity(per_node.len());
        for categories in per_node {
            let bitset = categories_to_bitset(categories);
            segments.push((words.len() as u32, bitset.len() as u32));
            words.extend(bitset);
        }

        Self {
            words: words.into_boxed_slice(),
            segments: segments.into_boxed_slice(),
        }
    }

    /// Returns `true` if `category` is in the right-going set of `node`.
    #[inline]
    pub fn category_goes_right(&self, node: u32, category: u32) -> bool {
        let Some(&(start, size)) = self.segments.get(node as usize) else {
            return false;
        };

        let word_idx = category >> 5;
        if word_idx >= size {
            return false;
        }

        let word = self.words[(start + word_idx) as usize];
        (word >> (category & 31)) & 1 != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The bitset words for a single node.
    pub fn bitset_for_node(&self, node: u32) -> &[u32] {
        match self.segments.get(node as usize) {
            Some(&(start, size)) => &self.words[start as usize..(start + size) as usize],
            None => &[],
        }
    }
}

// =============================================================================
// Bitset Utilities
// =============================================================================

/// Pack category values into `u32` words, bit `c` set for each category `c`.
pub fn categories_to_bitset(categories: &[u32]) -> Vec<u32> {
    let Some(&max_cat) = categories.iter().max() else {
        return Vec::new();
    };

    let mut bitset = vec![0u32; ((max_cat >> 5) + 1) as usize];
    for &cat in categories {
        bitset[(cat >> 5) as usize] |= 1u32 << (cat & 31);
    }
    bitset
}

/// Convert an encoded feature value to a category index.
///
/// Returns `None` for values XGBoost treats as invalid categories (negative,
/// non-finite, or beyond `u32`); those go left.
#[inline]
pub fn float_to_category(value: f32) -> Option<u32> {
    if !value.is_finite() || value < 0.0 || value >= u32::MAX as f32 {
        return None;
    }
    Some(value as u32)
}
