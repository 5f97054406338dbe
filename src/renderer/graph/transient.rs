//! Frame-scoped render target acquisition
//!
//! Passes acquire their intermediate buffers from a host-provided
//! [`RenderTargetPool`] during **configure** and release them during
//! **cleanup**. Two helpers keep the acquire/release pairs balanced:
//!
//! - [`AcquireScope`]: RAII guard used while acquiring. If configuration
//!   bails out half-way (`?` on a pool error), dropping the scope releases
//!   everything acquired so far.
//! - [`FrameManifest`]: the committed list of handles a pass owns for the
//!   current frame. Cleanup releases exactly this list.
//!
//! ```text
//!  configure ──► AcquireScope ──commit──► FrameManifest ──release_all──► cleanup
//!                    │ (error)
//!                    └──► drop: release partial set
//! ```

use crate::errors::{Result, SsfError};
use crate::renderer::graph::target::{NamedTarget, RenderTargetDescriptor, RenderTargetHandle};

/// Host capability that hands out per-frame render targets.
///
/// Implementations must make [`acquire`](Self::acquire) idempotent for a
/// given name within a frame, and must not require [`release`](Self::release)
/// to wait for GPU work recorded earlier in the same frame.
pub trait RenderTargetPool {
    /// Provides a buffer for `name` matching `desc`.
    ///
    /// The returned handle must be [`RenderTargetHandle::from_name`]`(name)`:
    /// commands are recorded against name-derived handles. [`AcquireScope`]
    /// rejects any other handle with [`SsfError::TargetAllocation`].
    fn acquire(&mut self, name: &str, desc: &RenderTargetDescriptor)
    -> Result<RenderTargetHandle>;

    /// Returns a buffer to the pool. Unknown handles are ignored.
    fn release(&mut self, handle: RenderTargetHandle);
}

/// Handles owned by a pass for the current frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameManifest {
    handles: Vec<RenderTargetHandle>,
}

impl FrameManifest {
    #[must_use]
    pub fn handles(&self) -> &[RenderTargetHandle] {
        &self.handles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[must_use]
    pub fn contains(&self, handle: RenderTargetHandle) -> bool {
        self.handles.contains(&handle)
    }

    /// Releases every handle back to `pool` and empties the manifest.
    /// Returns the number of released handles.
    pub fn release_all<P: RenderTargetPool + ?Sized>(&mut self, pool: &mut P) -> usize {
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            pool.release(handle);
        }
        count
    }
}

/// Guard that releases its acquisitions unless committed.
pub struct AcquireScope<'p, P: RenderTargetPool + ?Sized> {
    pool: &'p mut P,
    acquired: Vec<RenderTargetHandle>,
}

impl<'p, P: RenderTargetPool + ?Sized> AcquireScope<'p, P> {
    pub fn new(pool: &'p mut P) -> Self {
        Self {
            pool,
            acquired: Vec::new(),
        }
    }

    /// Acquires `target` and records it for release.
    pub fn acquire(
        &mut self,
        target: &NamedTarget,
        desc: &RenderTargetDescriptor,
    ) -> Result<RenderTargetHandle> {
        let handle = self.pool.acquire(target.name(), desc)?;
        if handle != target.handle() {
            self.pool.release(handle);
            return Err(SsfError::TargetAllocation {
                name: target.name().to_owned(),
                reason: format!(
                    "pool returned handle {:#018x}, expected the name-derived {:#018x}",
                    handle.to_u64(),
                    target.handle().to_u64()
                ),
            });
        }
        if !self.acquired.contains(&handle) {
            self.acquired.push(handle);
        }
        Ok(handle)
    }

    /// Hands ownership of the acquired set to a manifest.
    #[must_use]
    pub fn commit(mut self) -> FrameManifest {
        FrameManifest {
            handles: std::mem::take(&mut self.acquired),
        }
    }
}

impl<P: RenderTargetPool + ?Sized> Drop for AcquireScope<'_, P> {
    fn drop(&mut self) {
        if !self.acquired.is_empty() {
            log::debug!(
                "Releasing {} partially acquired render targets",
                self.acquired.len()
            );
        }
        for handle in self.acquired.drain(..) {
            self.pool.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::graph::target::{RenderTargetFormat, TargetFilterMode};

    #[derive(Default)]
    struct CountingPool {
        live: Vec<RenderTargetHandle>,
        fail_on: Option<&'static str>,
        /// Hands out sequential handles instead of name-derived ones.
        sequential: bool,
    }

    impl RenderTargetPool for CountingPool {
        fn acquire(
            &mut self,
            name: &str,
            _desc: &RenderTargetDescriptor,
        ) -> Result<RenderTargetHandle> {
            if self.fail_on == Some(name) {
                return Err(SsfError::TargetAllocation {
                    name: name.to_owned(),
                    reason: "out of memory".to_owned(),
                });
            }
            let handle = if self.sequential {
                RenderTargetHandle::from_name(&format!("#{}", self.live.len()))
            } else {
                RenderTargetHandle::from_name(name)
            };
            if !self.live.contains(&handle) {
                self.live.push(handle);
            }
            Ok(handle)
        }

        fn release(&mut self, handle: RenderTargetHandle) {
            self.live.retain(|h| *h != handle);
        }
    }

    fn desc() -> RenderTargetDescriptor {
        RenderTargetDescriptor::new(
            8,
            8,
            RenderTargetFormat::SingleChannelFloat,
            TargetFilterMode::Nearest,
        )
    }

    #[test]
    fn dropped_scope_releases_partial_acquisitions() {
        let mut pool = CountingPool {
            fail_on: Some("c"),
            ..Default::default()
        };

        let result = (|| -> Result<FrameManifest> {
            let mut scope = AcquireScope::new(&mut pool);
            scope.acquire(&NamedTarget::new("a"), &desc())?;
            scope.acquire(&NamedTarget::new("b"), &desc())?;
            scope.acquire(&NamedTarget::new("c"), &desc())?;
            Ok(scope.commit())
        })();

        assert!(result.is_err());
        assert!(pool.live.is_empty());
    }

    #[test]
    fn committed_manifest_releases_exactly_once() {
        let mut pool = CountingPool::default();
        let mut manifest = {
            let mut scope = AcquireScope::new(&mut pool);
            scope.acquire(&NamedTarget::new("a"), &desc()).unwrap();
            scope.acquire(&NamedTarget::new("a"), &desc()).unwrap();
            scope.acquire(&NamedTarget::new("b"), &desc()).unwrap();
            scope.commit()
        };

        assert_eq!(manifest.len(), 2);
        assert_eq!(pool.live.len(), 2);
        assert_eq!(manifest.release_all(&mut pool), 2);
        assert!(pool.live.is_empty());
        assert!(manifest.is_empty());
    }

    #[test]
    fn foreign_handles_are_rejected_and_released() {
        let mut pool = CountingPool {
            sequential: true,
            ..Default::default()
        };

        let result = (|| -> Result<FrameManifest> {
            let mut scope = AcquireScope::new(&mut pool);
            scope.acquire(&NamedTarget::new("a"), &desc())?;
            Ok(scope.commit())
        })();

        assert!(matches!(
            result,
            Err(SsfError::TargetAllocation { ref name, .. }) if name == "a"
        ));
        assert!(pool.live.is_empty());
    }
}
