use glam::{UVec2, Vec2, Vec4};

use super::*;

/// Children tile the parent in quadrant order: min, +X, +Y, +X+Y.
#[test]
fn test_child_origins_follow_quadrant_order() {
  let node = QuadNode::leaf(UVec2::new(512, 256), 256, None, 0);

  assert_eq!(node.child_origin(0), UVec2::new(512, 256));
  assert_eq!(node.child_origin(1), UVec2::new(640, 256));
  assert_eq!(node.child_origin(2), UVec2::new(512, 384));
  assert_eq!(node.child_origin(3), UVec2::new(640, 384));
}

/// A fresh leaf is free and has no children.
#[test]
fn test_leaf_is_free() {
  let node = QuadNode::leaf(UVec2::ZERO, 64, Some(3), 7);
  assert!(node.is_free());
  assert!(node.children.is_none());
  assert_eq!(node.parent, Some(3));
  assert_eq!(node.generation, 7);
}

/// Normalized geometry is relative to the root size.
#[test]
fn test_info_normalization() {
  let node = QuadNode::leaf(UVec2::new(256, 768), 256, None, 0);
  let info = QuadInfo::from_node(&node, 1024);

  assert_eq!(info.normalized_origin, Vec2::new(0.25, 0.75));
  assert_eq!(info.normalized_size, 0.25);
  assert_eq!(info.uv_rect(), Vec4::new(0.25, 0.75, 0.5, 1.0));
  assert_eq!(info.pixel_rect().max(), UVec2::new(512, 1024));
}

/// NodeIds compare by slot, then generation.
#[test]
fn test_node_id_ordering() {
  let a = NodeId { slot: 1, generation: 5 };
  let b = NodeId { slot: 1, generation: 6 };
  let c = NodeId { slot: 2, generation: 0 };
  assert!(a < b);
  assert!(b < c);
  assert_ne!(a, b);
}
