//! Render-target pool (§4.10): power-of-two bucketed offscreen images reused
//! across frames. Grounded on `myth`'s `TransientTexturePool`, adapted from
//! per-frame `reset()`-based recycling to the explicit `acquire`/`release`
//! contract §4.10 specifies (images may be held across the special-node
//! recursion and the scene's deferred-release list, not just one frame).

use rustc_hash::FxHashMap;

use crate::backend::Backend;

fn next_pow2(n: u32) -> u32 {
    if n <= 1 {
        return 1;
    }
    n.next_power_of_two()
}

/// Bucket key: a power-of-two width/height pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct BucketKey {
    width: u32,
    height: u32,
}

/// A pooled, bucketed source of offscreen render-target images.
///
/// Images are never freed internally; they are owned for the process
/// lifetime of the scene (§4.10). An image pulled from the free list is
/// cleared lazily, on the *next* acquire that reuses it, to avoid wasted
/// GPU work on a fast release-then-reacquire cycle.
pub struct RenderTargetPool<B: Backend> {
    free: FxHashMap<BucketKey, Vec<B::Image>>,
    /// Bucket each currently-live (acquired, not yet released) image
    /// belongs to, so `release` can find its bucket from the image handle
    /// alone.
    live: FxHashMap<B::Image, BucketKey>,
}

impl<B: Backend> Default for RenderTargetPool<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> RenderTargetPool<B> {
    #[must_use]
    pub fn new() -> Self {
        Self { free: FxHashMap::default(), live: FxHashMap::default() }
    }

    /// Returns a cleared image of dimensions `nextPow2(w) x nextPow2(h)`.
    pub fn acquire(&mut self, backend: &mut B, width: u32, height: u32) -> B::Image {
        let key = BucketKey { width: next_pow2(width), height: next_pow2(height) };
        let image = if let Some(bucket) = self.free.get_mut(&key) {
            if let Some(img) = bucket.pop() {
                backend.clear(img);
                img
            } else {
                backend.new_image(key.width, key.height)
            }
        } else {
            backend.new_image(key.width, key.height)
        };
        self.live.insert(image, key);
        image
    }

    /// Returns `image` to its bucket for reuse. A `None` image is a no-op
    /// (§4.10). Panics (as a programmer-error invariant) if `image` was
    /// never acquired from this pool.
    pub fn release(&mut self, image: Option<B::Image>) {
        let Some(image) = image else { return };
        match self.live.remove(&image) {
            Some(key) => self.free.entry(key).or_default().push(image),
            None => log::warn!("released an image this pool did not acquire"),
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::FakeBackend;

    #[test]
    fn release_then_acquire_same_bucket_reuses_image() {
        let mut backend = FakeBackend::default();
        let mut pool = RenderTargetPool::<FakeBackend>::new();
        let a = pool.acquire(&mut backend, 100, 50);
        pool.release(Some(a));
        let b = pool.acquire(&mut backend, 120, 60);
        assert_eq!(a, b);
    }

    #[test]
    fn different_buckets_get_distinct_images() {
        let mut backend = FakeBackend::default();
        let mut pool = RenderTargetPool::<FakeBackend>::new();
        let a = pool.acquire(&mut backend, 16, 16);
        let b = pool.acquire(&mut backend, 256, 256);
        assert_ne!(a, b);
    }

    #[test]
    fn release_none_is_noop() {
        let mut pool = RenderTargetPool::<FakeBackend>::new();
        pool.release(None);
        assert_eq!(pool.live_count(), 0);
    }
}
