use super::handle::Handle;

/// Augmentation hook driven by the engine.
///
/// `summarize` is called for a node whenever the set of elements in its subtree may have
/// changed (new leaf, rotation, splice, bulk build), always after its children have been
/// summarized. The previous summary is handed back through `release` so hooks that own
/// resources elsewhere can free them.
pub(crate) trait Summarize<K, V, S> {
    fn summarize(&mut self, node: Handle, key: &K, value: &V, left: Option<&S>, right: Option<&S>) -> S;

    fn release(&mut self, _summary: S) {}
}

/// Hook for trees that carry no augmentation.
pub(crate) struct NoSummary;

impl<K, V> Summarize<K, V, ()> for NoSummary {
    #[inline]
    fn summarize(&mut self, _node: Handle, _key: &K, _value: &V, _left: Option<&()>, _right: Option<&()>) {}
}
