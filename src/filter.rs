//! Filter chain contract (§1, §4.6, Design Notes §9).
//!
//! Filters are an open set (user-provided shaders), so unlike [`crate::node::hit::HitShape`]
//! or [`crate::text::Font`] this stays a trait-object boundary rather than a
//! closed sum type. The core only contracts `apply`/`padding`; individual
//! filter implementations (blur, color-matrix, displacement, ...) are
//! external collaborators per §1.

use crate::backend::Backend;

/// One stage of a special-node filter chain.
pub trait Filter<B: Backend> {
    /// Consumes `input` (a pooled render-target image) and produces an
    /// output image, acquiring any working images it needs from `pool`.
    /// Implementations must not retain `input` past this call; superseding
    /// images are the caller's responsibility to release.
    fn apply(&mut self, backend: &mut B, pool: &mut crate::rtpool::RenderTargetPool<B>, input: B::Image, width: u32, height: u32) -> B::Image;

    /// Extra pixels of padding this filter requires around the subtree
    /// bounds (e.g. a blur radius), summed across the chain per §4.6 step 2.
    fn padding(&self) -> u32;
}

/// An ordered sequence of filters applied to a special node's offscreen
/// rasterization (§4.6 step 5d).
#[derive(Default)]
pub struct FilterChain<B: Backend> {
    pub filters: Vec<Box<dyn Filter<B>>>,
}

impl<B: Backend> FilterChain<B> {
    #[must_use]
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Sum of each filter's declared padding, per §4.6 step 2.
    #[must_use]
    pub fn total_padding(&self) -> u32 {
        self.filters.iter().map(|f| f.padding()).sum()
    }

    /// Applies the whole chain in order, releasing superseded images back
    /// to the pool as each stage completes.
    pub fn apply_all(&mut self, backend: &mut B, pool: &mut crate::rtpool::RenderTargetPool<B>, mut image: B::Image, width: u32, height: u32) -> B::Image {
        for filter in &mut self.filters {
            let next = filter.apply(backend, pool, image, width, height);
            if next != image {
                pool.release(Some(image));
            }
            image = next;
        }
        image
    }
}
