//! # Intrusive Reference Counting
//!
//! Objects carry their own atomic [`RefCount`]; [`Ptr<T>`] handles bump it
//! on clone and drop it on release. The last release hands the object to its
//! [`Reclaim`] capability, which knows how the object was allocated (heap or
//! pool) without the pointer having to.
//!
//! [`ref_counted!`](crate::ref_counted) writes the unsafe glue for the two
//! common cases:
//!
//! ```rust,ignore
//! struct Mesh { refs: RefCount, vertices: Vec<f32> }
//! struct Texture { refs: RefCount, id: u32 }
//!
//! oroboros_core::ref_counted!(Mesh, refs, boxed);
//! oroboros_core::ref_counted!(Texture, refs, pooled);
//!
//! let mesh: Ptr<Mesh> = Mesh::create(Mesh { refs: RefCount::new(), vertices });
//! let texture: Ptr<Texture> = Texture::create(Texture { refs: RefCount::new(), id: 3 });
//! ```

// SAFETY: Ptr manages object lifetime manually through the embedded counter.
#![allow(unsafe_code)]

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{self, AtomicUsize, Ordering};

use crate::memory::PoolAllocator;

// =============================================================================
// REF COUNT
// =============================================================================

/// Atomic reference counter embedded in a ref-counted object.
///
/// Starts at zero; the first [`Ptr`] takes it to one.
#[derive(Default)]
pub struct RefCount(AtomicUsize);

impl RefCount {
    /// A counter with no references.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Current count. Stale as soon as it is read when other threads hold
    /// references.
    #[inline]
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Adds a reference.
    ///
    /// Relaxed: the caller already holds a reference, so nothing new needs
    /// to be published.
    #[inline]
    pub fn add_ref(&self) {
        let old = self.0.fetch_add(1, Ordering::Relaxed);
        if old > isize::MAX as usize {
            std::process::abort();
        }
    }

    /// Drops a reference. Returns true when this was the last one; the
    /// caller then owns the object exclusively and must reclaim it.
    #[inline]
    #[must_use]
    pub fn release(&self) -> bool {
        let old = self.0.fetch_sub(1, Ordering::Release);
        debug_assert!(old != 0, "RefCount released below zero");
        if old == 1 {
            // Pairs with the Release above on every other thread.
            atomic::fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for RefCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefCount({})", self.get())
    }
}

// =============================================================================
// RECLAIM
// =============================================================================

/// How to free one particular object once its count reaches zero.
///
/// Built from `&self` so it can be returned through a trait object; the
/// borrow has ended by the time [`Ptr`] runs it.
pub struct Reclaim {
    object: NonNull<u8>,
    context: *const (),
    reclaim: unsafe fn(NonNull<u8>, *const ()),
}

unsafe fn reclaim_boxed<T>(object: NonNull<u8>, _context: *const ()) {
    drop(Box::from_raw(object.cast::<T>().as_ptr()));
}

unsafe fn reclaim_pooled<T>(object: NonNull<u8>, context: *const ()) {
    let pool = &*context.cast::<PoolAllocator<T>>();
    pool.destroy(object.cast());
}

impl Reclaim {
    /// Frees `object` as a `Box<T>`.
    #[must_use]
    pub fn boxed<T>(object: &T) -> Self {
        Self {
            object: NonNull::from(object).cast(),
            context: std::ptr::null(),
            reclaim: reclaim_boxed::<T>,
        }
    }

    /// Returns `object` to `pool`.
    #[must_use]
    pub fn pooled<T>(object: &T, pool: &'static PoolAllocator<T>) -> Self {
        Self {
            object: NonNull::from(object).cast(),
            context: (pool as *const PoolAllocator<T>).cast(),
            reclaim: reclaim_pooled::<T>,
        }
    }

    /// Custom strategy.
    ///
    /// # Safety
    ///
    /// Calling `reclaim(object, context)` once must free the object
    /// correctly.
    #[must_use]
    pub unsafe fn from_raw_parts(
        object: NonNull<u8>,
        context: *const (),
        reclaim: unsafe fn(NonNull<u8>, *const ()),
    ) -> Self {
        Self {
            object,
            context,
            reclaim,
        }
    }

    unsafe fn run(self) {
        (self.reclaim)(self.object, self.context);
    }
}

// =============================================================================
// REF COUNTED
// =============================================================================

/// An object with an embedded reference count.
///
/// # Safety
///
/// `ref_count` must always return the same counter, owned by `self`.
/// `reclaim` must return a capability that frees `self` the way it was
/// allocated; every object handed to [`Ptr::from_raw`] must have been
/// allocated that way.
pub unsafe trait RefCounted {
    /// The embedded counter.
    fn ref_count(&self) -> &RefCount;

    /// Deallocation capability for this object.
    fn reclaim(&self) -> Reclaim;
}

// =============================================================================
// PTR
// =============================================================================

/// Shared handle to a [`RefCounted`] object, or null.
pub struct Ptr<T: ?Sized + RefCounted> {
    ptr: Option<NonNull<T>>,
    _marker: PhantomData<T>,
}

// SAFETY: like Arc, the object is shared and may be reclaimed on any thread.
unsafe impl<T: ?Sized + RefCounted + Send + Sync> Send for Ptr<T> {}
// SAFETY: as above.
unsafe impl<T: ?Sized + RefCounted + Send + Sync> Sync for Ptr<T> {}

impl<T: ?Sized + RefCounted> Ptr<T> {
    /// A handle to nothing.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self {
            ptr: None,
            _marker: PhantomData,
        }
    }

    /// Takes a reference to `object`.
    ///
    /// # Safety
    ///
    /// `object` must be live and allocated the way its `reclaim` frees it.
    /// It must only ever be shared through `Ptr`s from then on.
    #[must_use]
    pub unsafe fn from_raw(object: NonNull<T>) -> Self {
        object.as_ref().ref_count().add_ref();
        Self {
            ptr: Some(object),
            _marker: PhantomData,
        }
    }

    /// Returns true if the handle points at nothing.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Returns true if the handle points at an object.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.ptr.is_some()
    }

    /// The object, if any.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: a held reference keeps the object alive.
        self.ptr.map(|p| unsafe { &*p.as_ptr() })
    }

    /// Raw address of the object, if any.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// Current reference count, 0 for null.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.get().map_or(0, |object| object.ref_count().get())
    }

    /// Returns true if both handles point at the same object (or both are
    /// null).
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    #[inline]
    fn addr(&self) -> usize {
        self.ptr.map_or(0, |p| p.cast::<u8>().as_ptr() as usize)
    }

    /// Releases the held reference and becomes null.
    pub fn reset(&mut self) {
        if let Some(object) = self.ptr.take() {
            // SAFETY: we held one reference to a live object.
            unsafe { Self::release(object) };
        }
    }

    /// Points this handle at `other`'s object. Assigning the object already
    /// held does nothing.
    pub fn set(&mut self, other: &Self) {
        if !self.ptr_eq(other) {
            *self = other.clone();
        }
    }

    /// Takes the handle, leaving null behind.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Converts to a handle of a compatible type sharing the same counter,
    /// typically a trait object:
    ///
    /// ```rust,ignore
    /// let shape: Ptr<dyn Shape> = unsafe { circle.upcast(|p| p as NonNull<dyn Shape>) };
    /// ```
    ///
    /// # Safety
    ///
    /// `convert` must return a pointer to the same object viewed as `U`.
    ///
    /// # Panics
    ///
    /// Panics if the converted pointer has a different address or counter.
    pub unsafe fn upcast<U: ?Sized + RefCounted>(
        mut self,
        convert: impl FnOnce(NonNull<T>) -> NonNull<U>,
    ) -> Ptr<U> {
        let Some(object) = self.ptr.take() else {
            return Ptr::null();
        };
        let converted = convert(object);
        assert_eq!(
            converted.cast::<u8>(),
            object.cast::<u8>(),
            "Ptr::upcast changed the object address"
        );
        assert!(
            std::ptr::eq(converted.as_ref().ref_count(), object.as_ref().ref_count()),
            "Ptr::upcast changed the reference counter"
        );
        Ptr {
            ptr: Some(converted),
            _marker: PhantomData,
        }
    }

    unsafe fn release(object: NonNull<T>) {
        let last = object.as_ref().ref_count().release();
        if last {
            let reclaim = object.as_ref().reclaim();
            reclaim.run();
        }
    }
}

impl<T: ?Sized + RefCounted> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        if let Some(object) = self.get() {
            object.ref_count().add_ref();
        }
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized + RefCounted> Drop for Ptr<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized + RefCounted> Default for Ptr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized + RefCounted> Deref for Ptr<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics on a null handle.
    fn deref(&self) -> &T {
        match self.get() {
            Some(object) => object,
            None => panic!("Ptr: null dereference"),
        }
    }
}

impl<T: ?Sized + RefCounted> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: ?Sized + RefCounted> Eq for Ptr<T> {}

impl<T: ?Sized + RefCounted> PartialOrd for Ptr<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized + RefCounted> Ord for Ptr<T> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.addr().cmp(&other.addr())
    }
}

impl<T: ?Sized + RefCounted> Hash for Ptr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T: ?Sized + RefCounted + fmt::Debug> fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(object) => f.debug_tuple("Ptr").field(&object).finish(),
            None => f.write_str("Ptr(null)"),
        }
    }
}

// =============================================================================
// DECLARATION MACRO
// =============================================================================

/// Implements [`RefCounted`] for a struct and gives it a safe
/// `create(value) -> Ptr<Self>`.
///
/// `ref_counted!(Type, field, boxed)` heap-allocates each object.
/// `ref_counted!(Type, field, pooled)` also adds `Type::pool()`, a lazily
/// built process-wide [`PoolAllocator`] that every object of the type lives
/// in. `field` names the embedded [`RefCount`].
///
/// Objects of the type must reach a [`Ptr`] only through `create`.
#[macro_export]
macro_rules! ref_counted {
    ($ty:ident, $refs:ident, boxed) => {
        // SAFETY: the only safe way to a Ptr is `create`, which boxes.
        #[allow(unsafe_code)]
        unsafe impl $crate::RefCounted for $ty {
            fn ref_count(&self) -> &$crate::RefCount {
                &self.$refs
            }

            fn reclaim(&self) -> $crate::Reclaim {
                $crate::Reclaim::boxed(self)
            }
        }

        #[allow(unsafe_code)]
        impl $ty {
            /// Moves `value` to the heap and returns the first handle to it.
            pub fn create(value: Self) -> $crate::Ptr<Self> {
                let object = ::std::boxed::Box::leak(::std::boxed::Box::new(value));
                // SAFETY: freshly boxed; reclaim frees a Box.
                unsafe { $crate::Ptr::from_raw(::std::ptr::NonNull::from(object)) }
            }
        }
    };
    ($ty:ident, $refs:ident, pooled) => {
        // SAFETY: the only safe way to a Ptr is `create`, which allocates
        // from `pool()`.
        #[allow(unsafe_code)]
        unsafe impl $crate::RefCounted for $ty {
            fn ref_count(&self) -> &$crate::RefCount {
                &self.$refs
            }

            fn reclaim(&self) -> $crate::Reclaim {
                $crate::Reclaim::pooled(self, Self::pool())
            }
        }

        #[allow(unsafe_code)]
        impl $ty {
            /// The pool every object of this type is allocated from.
            pub fn pool() -> &'static $crate::PoolAllocator<Self> {
                static POOL: ::std::sync::OnceLock<$crate::PoolAllocator<$ty>> =
                    ::std::sync::OnceLock::new();
                POOL.get_or_init($crate::PoolAllocator::new)
            }

            /// Moves `value` into the type's pool and returns the first
            /// handle to it.
            pub fn create(value: Self) -> $crate::Ptr<Self> {
                let object = Self::pool().create(value);
                // SAFETY: allocated from the pool reclaim returns it to.
                unsafe { $crate::Ptr::from_raw(object) }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    struct Node {
        refs: RefCount,
        value: i32,
        drops: &'static AtomicUsize,
    }

    impl Drop for Node {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    ref_counted!(Node, refs, boxed);

    fn node(value: i32, drops: &'static AtomicUsize) -> Ptr<Node> {
        Node::create(Node {
            refs: RefCount::new(),
            value,
            drops,
        })
    }

    trait Shape {
        fn area(&self) -> i32;
    }

    impl Shape for Node {
        fn area(&self) -> i32 {
            self.value * self.value
        }
    }

    // SAFETY: forwards to Node.
    unsafe impl RefCounted for dyn Shape {
        fn ref_count(&self) -> &RefCount {
            // Only Nodes implement Shape in this test.
            unsafe { &(*(self as *const dyn Shape).cast::<Node>()).refs }
        }

        fn reclaim(&self) -> Reclaim {
            unsafe { Reclaim::boxed(&*(self as *const dyn Shape).cast::<Node>()) }
        }
    }

    #[test]
    fn test_refcount_basics() {
        let count = RefCount::new();
        assert_eq!(count.get(), 0);
        count.add_ref();
        count.add_ref();
        assert!(!count.release());
        assert!(count.release());
    }

    #[test]
    fn test_ptr_lifecycle() {
        static LOCAL: AtomicUsize = AtomicUsize::new(0);
        let a = node(7, &LOCAL);
        assert_eq!(a.ref_count(), 1);
        let b = a.clone();
        assert_eq!(a.ref_count(), 2);
        assert_eq!(b.value, 7);
        drop(a);
        assert_eq!(b.ref_count(), 1);
        assert_eq!(LOCAL.load(Ordering::SeqCst), 0);
        drop(b);
        assert_eq!(LOCAL.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_same_pointer_is_noop() {
        static LOCAL: AtomicUsize = AtomicUsize::new(0);
        let mut a = node(1, &LOCAL);
        let alias = a.clone();
        a.set(&alias);
        assert_eq!(a.ref_count(), 2);

        let other = node(2, &LOCAL);
        a.set(&other);
        assert_eq!(alias.ref_count(), 1);
        assert_eq!(other.ref_count(), 2);
        assert!(a.ptr_eq(&other));
    }

    #[test]
    fn test_reset_releases_once() {
        static LOCAL: AtomicUsize = AtomicUsize::new(0);
        let mut a = node(3, &LOCAL);
        a.reset();
        assert!(a.is_null());
        a.reset();
        assert_eq!(LOCAL.load(Ordering::SeqCst), 1);
        assert_eq!(a.ref_count(), 0);
    }

    #[test]
    #[should_panic(expected = "null dereference")]
    fn test_null_deref_panics() {
        let p: Ptr<Node> = Ptr::null();
        let _ = p.value;
    }

    #[test]
    fn test_upcast_shares_counter() {
        static LOCAL: AtomicUsize = AtomicUsize::new(0);
        let node = node(4, &LOCAL);
        let keep = node.clone();
        // SAFETY: unsizing coercion of the same object.
        let shape: Ptr<dyn Shape> = unsafe { node.upcast(|p| p as NonNull<dyn Shape>) };
        assert_eq!(shape.area(), 16);
        assert_eq!(keep.ref_count(), 2);
        drop(keep);
        assert_eq!(LOCAL.load(Ordering::SeqCst), 0);
        drop(shape);
        assert_eq!(LOCAL.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ordering_and_equality_by_address() {
        let a = node(1, &DROPS);
        let b = node(1, &DROPS);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        let addr = |p: &Ptr<Node>| p.as_ptr().map(|p| p.as_ptr() as usize);
        assert_eq!(a.cmp(&b), addr(&a).cmp(&addr(&b)));
        assert_eq!(Ptr::<Node>::null(), Ptr::null());
    }

    struct Pooled {
        refs: RefCount,
        payload: u64,
    }

    ref_counted!(Pooled, refs, pooled);

    fn pooled(payload: u64) -> Ptr<Pooled> {
        Pooled::create(Pooled {
            refs: RefCount::new(),
            payload,
        })
    }

    #[test]
    fn test_pooled_reclaim_returns_slot() {
        let before = Pooled::pool().live_count();
        let a = pooled(99);
        let b = a.clone();
        assert_eq!(Pooled::pool().live_count(), before + 1);
        assert_eq!(b.payload, 99);
        drop(a);
        drop(b);
        assert_eq!(Pooled::pool().live_count(), before);
    }
}
