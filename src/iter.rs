use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::node::{Link, Node};
use crate::FingerTree;

/// An iterator over the entries of a [`FingerTree`] in ascending key order.
///
/// Walks from the minimum by repeated in-order successor steps; a fresh
/// pass is started by calling [`FingerTree::iter`] again.
pub struct Iter<'a, K, V> {
    next: Link<K, V>,
    remaining: usize,
    _marker: PhantomData<&'a FingerTree<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(first: Link<K, V>, len: usize) -> Self {
        Self {
            next: first,
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next.ptr()?;
        self.next = Node::successor(node_ptr);
        self.remaining = self.remaining.saturating_sub(1);
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.next, self.remaining)
    }
}
