//! # Pool Allocator
//!
//! Lock-free allocator for objects of one type, safe to share across threads.
//!
//! Storage comes in **puddles**: fixed blocks of slots that are allocated on
//! demand and never move or shrink until the pool is dropped. Every slot
//! starts with a 16-byte header, followed by the object itself:
//!
//! ```text
//! | next: Tag | my_tag: Tag | state | padding | T ............ |
//! '------------- 16 bytes -------------------'
//! ```
//!
//! Free slots form a Treiber stack threaded through `next`. The stack head is
//! a single `AtomicU32` holding a [`Tag`]; each push bumps the slot's
//! generation, which defeats ABA on the head compare-and-swap.
//!
//! Slot state machine: `init -> free -> used -> free -> used ...`
//!
//! ## Example
//!
//! ```rust,ignore
//! let pool: PoolAllocator<Particle> = PoolAllocator::new();
//!
//! // From any thread, no locks.
//! let p = pool.create(Particle::default());
//! unsafe { pool.destroy(p) };
//!
//! // Or with a guard.
//! let boxed = pool.boxed(Particle::default());
//! ```

// SAFETY: This module hands out raw slot memory. Slots are only reached
// through tags popped from the free list or pointers returned by `create`.
#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicU32, AtomicU8, AtomicUsize, Ordering};

use super::raw;
use super::tag::Tag;
use crate::config::PoolConfig;
use crate::error::{CoreError, CoreResult};

// =============================================================================
// SLOT LAYOUT
// =============================================================================

const STATE_INIT: u8 = 0;
const STATE_FREE: u8 = 1;
const STATE_USED: u8 = 2;

/// Poison written over freed objects.
#[cfg(feature = "allocator-debug")]
const POISON_FREED: u8 = 0xAA;

/// Poison written over popped slots before construction.
#[cfg(feature = "allocator-debug")]
const POISON_POPPED: u8 = 0xBB;

/// Per-slot bookkeeping, exactly 16 bytes.
#[repr(C, align(16))]
struct NodeHeader {
    /// Tag of the next free slot while on the free list.
    next: AtomicU32,
    /// This slot's own tag, generation bumped on every free.
    my_tag: AtomicU32,
    state: AtomicU8,
    _pad: [u8; 7],
}

const _: () = assert!(mem::size_of::<NodeHeader>() == 16);

#[repr(C)]
struct Slot<T> {
    header: NodeHeader,
    value: UnsafeCell<MaybeUninit<T>>,
}

// =============================================================================
// POOL ALLOCATOR
// =============================================================================

/// Outcome of one attempt to add a puddle.
enum Grow {
    /// A new puddle's slots are on the free list.
    Grown,
    /// Another thread is filling a puddle; retry the free list.
    Busy,
    /// Every puddle is claimed and ready.
    Full,
}

/// Thread-safe, lock-free pool of `T` slots.
///
/// `create` and `destroy` may be called concurrently from any number of
/// threads through a shared reference. Objects never move while live.
pub struct PoolAllocator<T> {
    /// Free-list head.
    head: AtomicU32,
    /// Generation source for pushed slots.
    unique_count: AtomicU32,
    /// Puddle base pointers; only `[0, num_puddles)` may be set.
    puddles: Box<[AtomicPtr<Slot<T>>]>,
    /// Puddles claimed so far.
    num_puddles: AtomicUsize,
    /// Puddles whose slots are all on the free list. Trails `num_puddles`
    /// by at most one.
    ready_puddles: AtomicUsize,
    /// Objects currently constructed.
    live: AtomicUsize,
    config: PoolConfig,
    _marker: PhantomData<T>,
}

// SAFETY: objects may be created on one thread and destroyed on another, so
// T must be Send. The allocator's own state is atomics only.
unsafe impl<T: Send> Send for PoolAllocator<T> {}
// SAFETY: as above; `&PoolAllocator` never exposes `&T`.
unsafe impl<T: Send> Sync for PoolAllocator<T> {}

impl<T> PoolAllocator<T> {
    /// Byte offset of the object inside its slot.
    const VALUE_OFFSET: usize = raw::round_up(mem::size_of::<NodeHeader>(), mem::align_of::<T>());

    /// Creates a growable pool with the default geometry (256 puddles of 256
    /// slots). No memory is allocated until the first `create`.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(PoolConfig::default())
    }

    /// Creates a growable pool with custom puddle geometry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the geometry does not fit the
    /// 16-bit tag address space.
    pub fn with_config(config: PoolConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    /// Creates a fixed pool of exactly `capacity` slots, allocated up front.
    ///
    /// A fixed pool never grows; creating more than `capacity` live objects
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `capacity` is zero or above
    /// [`MAX_POOL_SLOTS`](crate::config::MAX_POOL_SLOTS).
    pub fn fixed(capacity: usize) -> CoreResult<Self> {
        let pool = Self::with_config(PoolConfig::fixed(capacity))?;
        pool.grow();
        Ok(pool)
    }

    fn from_config(config: PoolConfig) -> Self {
        Self {
            head: AtomicU32::new(Tag::INVALID.bits()),
            unique_count: AtomicU32::new(0),
            puddles: (0..config.max_puddles)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
            num_puddles: AtomicUsize::new(0),
            ready_puddles: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            config,
            _marker: PhantomData,
        }
    }

    /// Puddle geometry.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of live objects.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Number of puddles claimed so far, including one still being filled.
    #[inline]
    #[must_use]
    pub fn puddle_count(&self) -> usize {
        self.num_puddles.load(Ordering::Acquire)
    }

    /// Slots in claimed puddles. Never below `live_count()`.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.puddle_count() * self.config.puddle_elements
    }

    /// Slots the pool can ever hold.
    #[inline]
    #[must_use]
    pub const fn max_capacity(&self) -> usize {
        self.config.max_slots()
    }

    /// Moves `value` into a free slot and returns its address.
    ///
    /// Grows by one puddle when the free list is empty.
    ///
    /// # Panics
    ///
    /// Panics if the pool is at its maximum capacity.
    pub fn create(&self, value: T) -> NonNull<T> {
        match self.try_create(value) {
            Ok(ptr) => ptr,
            Err(err) => panic!("PoolAllocator::create: {err}"),
        }
    }

    /// Moves `value` into a free slot and returns its address.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PoolExhausted`] if every slot is live and no more
    /// puddles may be allocated. `value` is dropped in that case.
    pub fn try_create(&self, value: T) -> CoreResult<NonNull<T>> {
        let slot = loop {
            if let Some(slot) = self.pop() {
                break slot;
            }
            match self.grow() {
                Grow::Grown => {}
                // Slots of the claimed puddle are about to be pushed.
                Grow::Busy => std::hint::spin_loop(),
                Grow::Full => match self.pop() {
                    Some(slot) => break slot,
                    None => {
                        return Err(CoreError::PoolExhausted {
                            capacity: self.max_capacity(),
                        })
                    }
                },
            }
        };

        // SAFETY: the slot was just popped, so this thread owns it.
        let object = unsafe { (*slot.as_ptr()).value.get().cast::<T>() };
        // SAFETY: the value cell is allocated and uninitialized.
        unsafe { ptr::write(object, value) };
        self.live.fetch_add(1, Ordering::Relaxed);
        // SAFETY: derived from a non-null slot pointer.
        Ok(unsafe { NonNull::new_unchecked(object) })
    }

    /// Like [`PoolAllocator::create`], returning a guard that destroys the
    /// object when dropped.
    ///
    /// # Panics
    ///
    /// Panics if the pool is at its maximum capacity.
    pub fn boxed(&self, value: T) -> PoolBox<'_, T> {
        PoolBox {
            pool: self,
            object: self.create(value),
        }
    }

    /// Drops the object and returns its slot to the free list.
    ///
    /// With the `allocator-debug` feature, pointers not owned by this pool
    /// are caught here.
    ///
    /// # Safety
    ///
    /// `object` must come from `create` on this pool and not have been
    /// destroyed yet. No reference to it may outlive this call.
    pub unsafe fn destroy(&self, object: NonNull<T>) {
        #[cfg(feature = "allocator-debug")]
        assert!(
            self.is_owned(object),
            "PoolAllocator::destroy: pointer not owned by this pool"
        );
        let slot = Self::slot_of(object);
        ptr::drop_in_place(object.as_ptr());
        self.live.fetch_sub(1, Ordering::Relaxed);
        self.push(slot);
    }

    /// Returns true if `object` points at a slot inside one of this pool's
    /// puddles. Linear in the number of puddles.
    #[must_use]
    pub fn is_owned(&self, object: NonNull<T>) -> bool {
        let addr = object.as_ptr() as usize;
        let slot_size = mem::size_of::<Slot<T>>();
        let puddle_bytes = slot_size * self.config.puddle_elements;
        self.puddles[..self.puddle_count()].iter().any(|puddle| {
            let base = puddle.load(Ordering::Acquire) as usize;
            base != 0
                && addr >= base + Self::VALUE_OFFSET
                && addr < base + puddle_bytes
                && (addr - base - Self::VALUE_OFFSET) % slot_size == 0
        })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    #[inline]
    fn slot_of(object: NonNull<T>) -> NonNull<Slot<T>> {
        // SAFETY: objects live VALUE_OFFSET bytes into their slot.
        unsafe { NonNull::new_unchecked(object.as_ptr().cast::<u8>().sub(Self::VALUE_OFFSET).cast()) }
    }

    /// Resolves a tag address to its slot.
    #[inline]
    fn slot_at(&self, address: u16) -> NonNull<Slot<T>> {
        let address = usize::from(address);
        let puddle = address / self.config.puddle_elements;
        let index = address % self.config.puddle_elements;
        let base = self.puddles[puddle].load(Ordering::Acquire);
        debug_assert!(!base.is_null(), "tag refers to an unallocated puddle");
        // SAFETY: the puddle holds puddle_elements slots.
        unsafe { NonNull::new_unchecked(base.add(index)) }
    }

    /// Claims the next puddle, allocates it and pushes all its slots.
    ///
    /// Only one puddle is ever being filled at a time: a thread that finds
    /// a claimed puddle not yet ready backs off with [`Grow::Busy`].
    fn grow(&self) -> Grow {
        let claimed = self.num_puddles.load(Ordering::Acquire);
        if self.ready_puddles.load(Ordering::Acquire) < claimed {
            return Grow::Busy;
        }
        if claimed >= self.config.max_puddles {
            return Grow::Full;
        }
        if self
            .num_puddles
            .compare_exchange(claimed, claimed + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Grow::Busy;
        }
        self.fill_puddle(claimed);
        self.ready_puddles.fetch_add(1, Ordering::Release);
        Grow::Grown
    }

    fn fill_puddle(&self, claimed: usize) {
        let elements = self.config.puddle_elements;
        let base = raw::alloc_array::<Slot<T>>(elements);
        for index in 0..elements {
            // Geometry is validated to stay within 16 address bits.
            let address = (claimed * elements + index) as u16;
            let header = NodeHeader {
                next: AtomicU32::new(Tag::INVALID.bits()),
                my_tag: AtomicU32::new(Tag::new(0, address).bits()),
                state: AtomicU8::new(STATE_INIT),
                _pad: [0; 7],
            };
            // SAFETY: index < elements; the slot is fresh memory.
            unsafe {
                ptr::write(
                    base.as_ptr().add(index),
                    Slot {
                        header,
                        value: UnsafeCell::new(MaybeUninit::uninit()),
                    },
                );
            }
        }
        self.puddles[claimed].store(base.as_ptr(), Ordering::Release);
        tracing::debug!(
            "pool puddle {} allocated: {} slots of {} bytes",
            claimed,
            elements,
            mem::size_of::<Slot<T>>()
        );

        // Reverse order so the lowest slot is popped first.
        for index in (0..elements).rev() {
            // SAFETY: index < elements.
            self.push(unsafe { NonNull::new_unchecked(base.as_ptr().add(index)) });
        }
    }

    /// Overwrites the object bytes of a slot this thread owns.
    #[cfg(feature = "allocator-debug")]
    fn poison(slot: &Slot<T>, byte: u8) {
        // SAFETY: the value cell holds no live object while poisoned.
        unsafe { raw::fill_raw(slot.value.get().cast::<u8>(), mem::size_of::<T>(), byte) };
    }

    fn push(&self, slot: NonNull<Slot<T>>) {
        // SAFETY: slots stay allocated until the pool is dropped.
        let slot = unsafe { slot.as_ref() };
        let header = &slot.header;
        let state = header.state.load(Ordering::Relaxed);
        assert!(
            state == STATE_INIT || state == STATE_USED,
            "PoolAllocator: slot freed twice"
        );
        debug_assert_eq!(header.next.load(Ordering::Relaxed), Tag::INVALID.bits());

        #[cfg(feature = "allocator-debug")]
        Self::poison(slot, POISON_FREED);

        header.state.store(STATE_FREE, Ordering::Relaxed);
        let generation = self.unique_count.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let tag = Tag::from_bits(header.my_tag.load(Ordering::Relaxed)).with_generation(generation as u16);
        header.my_tag.store(tag.bits(), Ordering::Relaxed);

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            header.next.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange_weak(head, tag.bits(), Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    fn pop(&self) -> Option<NonNull<Slot<T>>> {
        loop {
            let head = Tag::from_bits(self.head.load(Ordering::Acquire));
            if !head.is_valid() {
                return None;
            }
            let slot = self.slot_at(head.address());
            // SAFETY: slots stay allocated until the pool is dropped.
            let header = unsafe { &slot.as_ref().header };
            // A stale read here is harmless: the CAS fails because the head
            // generation moved on.
            let next = header.next.load(Ordering::Relaxed);
            if self
                .head
                .compare_exchange_weak(head.bits(), next, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                header.next.store(Tag::INVALID.bits(), Ordering::Relaxed);
                header.state.store(STATE_USED, Ordering::Relaxed);
                #[cfg(feature = "allocator-debug")]
                // SAFETY: slots stay allocated until the pool is dropped.
                Self::poison(unsafe { slot.as_ref() }, POISON_POPPED);
                return Some(slot);
            }
        }
    }
}

impl<T> Default for PoolAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for PoolAllocator<T> {
    fn drop(&mut self) {
        let elements = self.config.puddle_elements;
        let mut leaked = 0usize;
        let claimed = *self.num_puddles.get_mut();
        for puddle in self.puddles[..claimed].iter_mut() {
            let base = *puddle.get_mut();
            if base.is_null() {
                continue;
            }
            for index in 0..elements {
                // SAFETY: we have exclusive access; used slots hold a live T.
                unsafe {
                    let slot = &mut *base.add(index);
                    if *slot.header.state.get_mut() == STATE_USED {
                        ptr::drop_in_place(slot.value.get_mut().as_mut_ptr());
                        leaked += 1;
                    }
                }
            }
            // SAFETY: allocated by fill_puddle with the same element count.
            // Slot headers have no drop glue.
            unsafe { raw::free_array(NonNull::new_unchecked(base), elements) };
        }
        if leaked > 0 {
            tracing::warn!("PoolAllocator dropped with {} live objects", leaked);
        }
    }
}

impl<T> fmt::Debug for PoolAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("live", &self.live_count())
            .field("capacity", &self.capacity())
            .field("max_capacity", &self.max_capacity())
            .field("puddles", &self.puddle_count())
            .finish()
    }
}

// =============================================================================
// POOL BOX
// =============================================================================

/// Owning guard for a pool object; destroys it on drop.
pub struct PoolBox<'a, T> {
    pool: &'a PoolAllocator<T>,
    object: NonNull<T>,
}

// SAFETY: PoolBox owns its T like Box does.
unsafe impl<T: Send> Send for PoolBox<'_, T> {}
// SAFETY: shared access only hands out &T.
unsafe impl<T: Send + Sync> Sync for PoolBox<'_, T> {}

impl<'a, T> PoolBox<'a, T> {
    /// Releases ownership without destroying the object.
    ///
    /// The caller becomes responsible for calling
    /// [`PoolAllocator::destroy`].
    #[must_use]
    pub fn into_raw(this: Self) -> NonNull<T> {
        let object = this.object;
        mem::forget(this);
        object
    }

    /// The pool this object lives in.
    #[must_use]
    pub fn pool(this: &Self) -> &'a PoolAllocator<T> {
        this.pool
    }
}

impl<T> Deref for PoolBox<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the object is live for as long as the guard.
        unsafe { self.object.as_ref() }
    }
}

impl<T> DerefMut for PoolBox<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard owns the object exclusively.
        unsafe { self.object.as_mut() }
    }
}

impl<T> Drop for PoolBox<'_, T> {
    fn drop(&mut self) {
        // SAFETY: created by this pool and destroyed only here.
        unsafe { self.pool.destroy(self.object) };
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
