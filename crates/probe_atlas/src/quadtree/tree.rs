//! Quadtree - power-of-two square region allocator.
//!
//! Allocation picks the smallest free node that fits (fewest splits), ties
//! broken by pre-order traversal index, then splits it down to the
//! requested size. Freeing coalesces four free siblings back into their
//! parent, repeatedly, up to the root.

use glam::UVec2;

use super::node::{NodeId, NodeState, QuadInfo, QuadNode, ROOT_SLOT};
use crate::error::AtlasError;

/// Arena-backed quadtree over a square pixel domain.
#[derive(Clone, Debug)]
pub struct Quadtree {
  size: u32,
  nodes: Vec<QuadNode>,
  /// Recycled arena slots.
  free_slots: Vec<u32>,
  allocated: usize,
}

impl Quadtree {
  /// Create an empty tree over a `size` x `size` domain.
  ///
  /// `size` must be a non-zero power of two.
  pub fn new(size: u32) -> Result<Self, AtlasError> {
    if size == 0 || !size.is_power_of_two() {
      return Err(AtlasError::InvalidSize { size, root: size });
    }
    Ok(Self {
      size,
      nodes: vec![QuadNode::leaf(UVec2::ZERO, size, None, 0)],
      free_slots: Vec::new(),
      allocated: 0,
    })
  }

  /// Side length of the root square.
  #[inline]
  pub fn size(&self) -> u32 {
    self.size
  }

  /// Number of live allocations.
  #[inline]
  pub fn allocated_count(&self) -> usize {
    self.allocated
  }

  /// Number of live arena nodes (free, allocated and split).
  #[inline]
  pub fn node_count(&self) -> usize {
    self.nodes.len() - self.free_slots.len()
  }

  /// Maximum number of `tile_size` tiles the domain can hold.
  pub fn capacity_for(&self, tile_size: u32) -> u32 {
    if tile_size == 0 || tile_size > self.size {
      return 0;
    }
    let per_side = self.size / tile_size;
    per_side * per_side
  }

  /// Check a request against the power-of-two and root-size rules.
  pub fn validate_size(&self, size: u32) -> Result<(), AtlasError> {
    if size == 0 || !size.is_power_of_two() || size > self.size {
      return Err(AtlasError::InvalidSize {
        size,
        root: self.size,
      });
    }
    Ok(())
  }

  /// Allocate a `size` x `size` region.
  pub fn allocate(&mut self, size: u32) -> Result<NodeId, AtlasError> {
    self.validate_size(size)?;

    let Some(mut slot) = self.find_best_fit(size) else {
      return Err(AtlasError::OutOfSpace { requested: size });
    };

    // Descend through quadrant 0 until the node matches the request
    while self.nodes[slot as usize].size > size {
      slot = self.split(slot)[0];
    }

    let node = &mut self.nodes[slot as usize];
    node.state = NodeState::Allocated;
    self.allocated += 1;

    Ok(NodeId {
      slot,
      generation: node.generation,
    })
  }

  /// Free an allocated region and coalesce its ancestors.
  pub fn free(&mut self, id: NodeId) -> Result<(), AtlasError> {
    if !self.is_allocated(id) {
      return Err(AtlasError::InvalidHandle);
    }

    let node = &mut self.nodes[id.slot as usize];
    node.state = NodeState::Free;
    node.generation = node.generation.wrapping_add(1);
    let parent = node.parent;
    self.allocated -= 1;

    self.coalesce(parent);
    Ok(())
  }

  /// True if `id` names a live allocation of this tree.
  pub fn is_allocated(&self, id: NodeId) -> bool {
    self
      .nodes
      .get(id.slot as usize)
      .is_some_and(|node| node.state == NodeState::Allocated && node.generation == id.generation)
  }

  /// Geometry of an allocated region.
  pub fn info(&self, id: NodeId) -> Option<QuadInfo> {
    if !self.is_allocated(id) {
      return None;
    }
    Some(QuadInfo::from_node(&self.nodes[id.slot as usize], self.size))
  }

  /// Iterate over all live allocations.
  pub fn allocated(&self) -> impl Iterator<Item = (NodeId, QuadInfo)> + '_ {
    self
      .nodes
      .iter()
      .enumerate()
      .filter(|(_, node)| node.state == NodeState::Allocated)
      .map(|(slot, node)| {
        (
          NodeId {
            slot: slot as u32,
            generation: node.generation,
          },
          QuadInfo::from_node(node, self.size),
        )
      })
  }

  /// Unallocated area in square pixels.
  pub fn free_area(&self) -> u64 {
    let total = self.size as u64 * self.size as u64;
    let used: u64 = self
      .allocated()
      .map(|(_, info)| info.size as u64 * info.size as u64)
      .sum();
    total - used
  }

  /// Side of the largest free node, if any.
  pub fn largest_free(&self) -> Option<u32> {
    self
      .preorder()
      .into_iter()
      .map(|slot| &self.nodes[slot as usize])
      .filter(|node| node.is_free())
      .map(|node| node.size)
      .max()
  }

  /// Live node by slot.
  #[cfg(test)]
  pub(crate) fn node(&self, slot: u32) -> Option<&QuadNode> {
    self.preorder().contains(&slot).then(|| &self.nodes[slot as usize])
  }

  /// Drop every allocation. All outstanding ids become stale.
  pub fn clear(&mut self) {
    self.free_slots.clear();
    for (slot, node) in self.nodes.iter_mut().enumerate() {
      node.generation = node.generation.wrapping_add(1);
      node.state = NodeState::Free;
      node.children = None;
      node.parent = None;
      if slot as u32 != ROOT_SLOT {
        self.free_slots.push(slot as u32);
      }
    }
    let root = &mut self.nodes[ROOT_SLOT as usize];
    root.origin = UVec2::ZERO;
    root.size = self.size;
    self.allocated = 0;
  }

  /// Live slots in pre-order, children visited in quadrant order.
  pub fn preorder(&self) -> Vec<u32> {
    let mut order = Vec::with_capacity(self.node_count());
    let mut stack = vec![ROOT_SLOT];
    while let Some(slot) = stack.pop() {
      order.push(slot);
      if let Some(children) = self.nodes[slot as usize].children {
        stack.extend(children.iter().rev());
      }
    }
    order
  }

  /// Smallest free node with side >= `size`, first in pre-order on ties.
  fn find_best_fit(&self, size: u32) -> Option<u32> {
    let mut best: Option<(u32, u32)> = None;
    let mut stack = vec![ROOT_SLOT];

    while let Some(slot) = stack.pop() {
      let node = &self.nodes[slot as usize];
      if node.size < size {
        continue;
      }
      match node.state {
        NodeState::Free => {
          if node.size == size {
            // Exact fit needs no splits; nothing later in pre-order can beat it
            return Some(slot);
          }
          if best.map_or(true, |(_, best_size)| node.size < best_size) {
            best = Some((slot, node.size));
          }
        }
        NodeState::Split => {
          if let Some(children) = node.children {
            stack.extend(children.iter().rev());
          }
        }
        NodeState::Allocated => {}
      }
    }

    best.map(|(slot, _)| slot)
  }

  /// Split a free leaf into 4 free children, returning their slots.
  fn split(&mut self, slot: u32) -> [u32; 4] {
    let parent = self.nodes[slot as usize].clone();
    debug_assert!(parent.is_free(), "only free leaves can be split");
    debug_assert!(parent.size > 1, "cannot split a 1px node");

    let half = parent.size / 2;
    let mut children = [0u32; 4];
    for (quadrant, child) in children.iter_mut().enumerate() {
      *child = self.alloc_slot(parent.child_origin(quadrant), half, slot);
    }

    let node = &mut self.nodes[slot as usize];
    node.state = NodeState::Split;
    node.children = Some(children);
    children
  }

  fn alloc_slot(&mut self, origin: UVec2, size: u32, parent: u32) -> u32 {
    match self.free_slots.pop() {
      Some(slot) => {
        let generation = self.nodes[slot as usize].generation;
        self.nodes[slot as usize] = QuadNode::leaf(origin, size, Some(parent), generation);
        slot
      }
      None => {
        self.nodes.push(QuadNode::leaf(origin, size, Some(parent), 0));
        (self.nodes.len() - 1) as u32
      }
    }
  }

  fn release_slot(&mut self, slot: u32) {
    let node = &mut self.nodes[slot as usize];
    node.generation = node.generation.wrapping_add(1);
    node.state = NodeState::Free;
    node.children = None;
    node.parent = None;
    self.free_slots.push(slot);
  }

  /// Merge fully free sibling groups, walking up from `start`.
  fn coalesce(&mut self, start: Option<u32>) {
    let mut current = start;
    while let Some(parent) = current {
      let Some(children) = self.nodes[parent as usize].children else {
        break;
      };
      if !children.iter().all(|&c| self.nodes[c as usize].is_free()) {
        break;
      }

      for child in children {
        self.release_slot(child);
      }
      let node = &mut self.nodes[parent as usize];
      node.children = None;
      node.state = NodeState::Free;
      current = node.parent;
    }
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
