//! Exclusive ownership of externally allocated platform resources
//!
//! A [`Handle`] owns at most one [`Resource`] and releases it exactly once when
//! the handle is dropped or reset. Handles are move-only; [`Handle::take`]
//! transfers ownership and leaves the source empty.

use std::fmt;

use tracing::warn;

/// A platform object that must be released through a specific call
pub trait Resource {
    /// Human readable kind used in diagnostics (e.g. "texture")
    const KIND: &'static str;

    /// Error reported by a failed release
    type Error: fmt::Display;

    /// Releases the underlying platform object
    fn release(self) -> Result<(), Self::Error>;
}

/// Owning wrapper that releases its resource exactly once
pub struct Handle<T: Resource> {
    inner: Option<T>,
}

impl<T: Resource> Handle<T> {
    /// Wraps a live resource
    pub fn new(resource: T) -> Self {
        Self {
            inner: Some(resource),
        }
    }

    /// Creates a handle that owns nothing
    pub fn empty() -> Self {
        Self { inner: None }
    }

    /// Wraps a possibly missing resource
    ///
    /// A missing value produces an empty handle rather than an error; the code
    /// that produced the raw value is where failure is reported.
    pub fn from_option(resource: Option<T>) -> Self {
        Self { inner: resource }
    }

    /// Returns true if the handle owns nothing
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }

    /// Moves ownership into a new handle, leaving this one empty
    pub fn take(&mut self) -> Self {
        Self {
            inner: self.inner.take(),
        }
    }

    /// Releases the current resource (if any) and adopts `resource`
    pub fn reset(&mut self, resource: Option<T>) {
        if let Some(old) = std::mem::replace(&mut self.inner, resource) {
            release_logged(old);
        }
    }

    /// Gives up ownership without releasing
    pub fn into_inner(mut self) -> Option<T> {
        self.inner.take()
    }
}

impl<T: Resource> Default for Handle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Resource> From<T> for Handle<T> {
    fn from(resource: T) -> Self {
        Self::new(resource)
    }
}

impl<T: Resource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &T::KIND)
            .field("empty", &self.is_empty())
            .finish()
    }
}

impl<T: Resource> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Some(resource) = self.inner.take() {
            release_logged(resource);
        }
    }
}

fn release_logged<T: Resource>(resource: T) {
    if let Err(e) = resource.release() {
        warn!(kind = T::KIND, error = %e, "Failed to release resource");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked {
        releases: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Resource for Tracked {
        const KIND: &'static str = "tracked";
        type Error = &'static str;

        fn release(self) -> Result<(), Self::Error> {
            self.releases.set(self.releases.get() + 1);
            if self.fail { Err("refused") } else { Ok(()) }
        }
    }

    fn tracked(releases: &Rc<Cell<u32>>) -> Tracked {
        Tracked {
            releases: releases.clone(),
            fail: false,
        }
    }

    #[test]
    fn test_drop_releases_once() {
        let releases = Rc::new(Cell::new(0));
        {
            let handle = Handle::new(tracked(&releases));
            assert!(!handle.is_empty());
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_empty_handle_releases_nothing() {
        let handle: Handle<Tracked> = Handle::from_option(None);
        assert!(handle.is_empty());
        drop(handle);
    }

    #[test]
    fn test_take_transfers_ownership() {
        let releases = Rc::new(Cell::new(0));
        let mut source = Handle::new(tracked(&releases));
        let moved = source.take();

        assert!(source.is_empty());
        assert!(!moved.is_empty());

        drop(source);
        assert_eq!(releases.get(), 0);

        drop(moved);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_reset_releases_previous() {
        let releases = Rc::new(Cell::new(0));
        let mut handle = Handle::new(tracked(&releases));

        handle.reset(Some(tracked(&releases)));
        assert_eq!(releases.get(), 1);

        handle.reset(None);
        assert_eq!(releases.get(), 2);
        assert!(handle.is_empty());
    }

    #[test]
    fn test_into_inner_disarms_release() {
        let releases = Rc::new(Cell::new(0));
        let handle = Handle::new(tracked(&releases));
        let inner = handle.into_inner();

        assert!(inner.is_some());
        assert_eq!(releases.get(), 0);
    }

    #[test]
    fn test_failed_release_is_not_escalated() {
        let releases = Rc::new(Cell::new(0));
        let handle = Handle::new(Tracked {
            releases: releases.clone(),
            fail: true,
        });
        drop(handle);
        assert_eq!(releases.get(), 1);
    }
}
