//! # Ptr Lifecycle Tests
//!
//! Pool-backed ref-counted objects shared across threads: the object must be
//! reclaimed exactly once, by whichever thread drops the last handle. Test
//! types are declared through `ref_counted!`, so no test touches `unsafe`.
//!
//! Run with: cargo test --package oroboros_core --test ptr_lifecycle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use oroboros_core::{ref_counted, Ptr, RefCount};

struct Texture {
    refs: RefCount,
    id: u32,
    dropped: &'static AtomicUsize,
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

ref_counted!(Texture, refs, pooled);

fn texture(id: u32, dropped: &'static AtomicUsize) -> Ptr<Texture> {
    Texture::create(Texture {
        refs: RefCount::new(),
        id,
        dropped,
    })
}

#[test]
fn verify_shared_ptr_reclaimed_once() {
    const THREADS: usize = 8;
    const CLONES: usize = 10_000;

    static DROPPED: AtomicUsize = AtomicUsize::new(0);
    let texture = texture(42, &DROPPED);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let local = texture.clone();
            scope.spawn(move || {
                let mut held = Vec::with_capacity(16);
                for i in 0..CLONES {
                    held.push(local.clone());
                    if i % 16 == 15 {
                        held.clear();
                    }
                }
                assert_eq!(local.id, 42);
            });
        }
    });

    assert_eq!(texture.ref_count(), 1);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 0);
    drop(texture);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn verify_boxed_declaration_frees_on_last_release() {
    struct Mesh {
        refs: RefCount,
        vertices: Vec<f32>,
        dropped: &'static AtomicUsize,
    }

    impl Drop for Mesh {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    ref_counted!(Mesh, refs, boxed);

    static DROPPED: AtomicUsize = AtomicUsize::new(0);
    let mesh = Mesh::create(Mesh {
        refs: RefCount::new(),
        vertices: vec![0.0, 1.0, 2.0],
        dropped: &DROPPED,
    });
    let other = thread::spawn({
        let mesh = mesh.clone();
        move || mesh.vertices.len()
    });
    assert_eq!(other.join().expect("worker panicked"), 3);
    assert_eq!(mesh.ref_count(), 1);
    drop(mesh);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn verify_pooled_declaration_returns_slots() {
    static DROPPED: AtomicUsize = AtomicUsize::new(0);
    let handles: Vec<Ptr<Texture>> = (0..64).map(|id| texture(id, &DROPPED)).collect();
    assert!(Texture::pool().live_count() >= 64);
    assert!(handles.iter().all(|t| Texture::pool().is_owned(t.as_ptr().expect("valid"))));
    drop(handles);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 64);
}

#[test]
fn verify_last_release_on_other_thread() {
    static DROPPED: AtomicUsize = AtomicUsize::new(0);
    let texture = texture(7, &DROPPED);
    let handle = thread::spawn(move || {
        let copy = texture.clone();
        drop(texture);
        assert_eq!(copy.ref_count(), 1);
        copy.id
    });
    assert_eq!(handle.join().expect("worker panicked"), 7);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn verify_ptr_in_containers() {
    use oroboros_core::Array;

    let mut array: Array<Ptr<Texture>> = Array::new();
    static DROPPED: AtomicUsize = AtomicUsize::new(0);
    let shared = texture(1, &DROPPED);
    for _ in 0..100 {
        array.add(shared.clone());
    }
    assert_eq!(shared.ref_count(), 101);
    drop(array.erase_swap(10));
    assert_eq!(shared.ref_count(), 100);
    array.clear();
    assert_eq!(shared.ref_count(), 1);
    drop(shared);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
}
