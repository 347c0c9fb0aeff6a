//! Lock-free slab allocator with four fixed-size classes (spec §4.1, §5).
//!
//! Grounded directly on `rt_pool.c`'s tagged-pointer freelist: each class owns
//! an atomic 64-bit head packing a 48-bit pointer and a 16-bit version counter
//! (ABA guard), plus a CAS-linked slab list. Sizes > 512 bytes fall through to
//! the system allocator via [`std::alloc`].

use std::alloc::{self, Layout};
use std::ptr::null_mut;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};

const BLOCKS_PER_SLAB: usize = 64;
const CLASS_SIZES: [usize; 4] = [64, 128, 256, 512];
const PTR_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(usize)]
pub enum SizeClass {
	Class64 = 0,
	Class128 = 1,
	Class256 = 2,
	Class512 = 3,
}

impl SizeClass {
	#[inline]
	fn for_size(size: usize) -> Option<SizeClass> {
		match size {
			0..=64 => Some(SizeClass::Class64),
			65..=128 => Some(SizeClass::Class128),
			129..=256 => Some(SizeClass::Class256),
			257..=512 => Some(SizeClass::Class512),
			_ => None,
		}
	}

	#[inline]
	fn block_size(self) -> usize {
		CLASS_SIZES[self as usize]
	}
}

/// Intrusive freelist node: the header occupies the block's own first bytes.
#[repr(C)]
struct Block {
	next: *mut Block,
}

#[inline]
fn pack(ptr: *mut Block, version: u16) -> u64 {
	((version as u64) << 48) | (ptr as u64 & PTR_MASK)
}

#[inline]
fn unpack_ptr(tagged: u64) -> *mut Block {
	(tagged & PTR_MASK) as *mut Block
}

#[inline]
fn unpack_version(tagged: u64) -> u16 {
	(tagged >> 48) as u16
}

struct Slab {
	next: *mut Slab,
	data: *mut u8,
	layout: Layout,
}

struct ClassState {
	freelist: AtomicU64,
	slabs: AtomicPtr<Slab>,
	allocated: AtomicUsize,
	free_count: AtomicUsize,
}

impl ClassState {
	const fn new() -> Self {
		ClassState {
			freelist: AtomicU64::new(0),
			slabs: AtomicPtr::new(null_mut()),
			allocated: AtomicUsize::new(0),
			free_count: AtomicUsize::new(0),
		}
	}

	/// Pop a block from the freelist, or `None` if empty. Tagged-pointer CAS
	/// eliminates the ABA hazard: a block recycled between our load and CAS
	/// bumps the version, so the CAS fails and we retry instead of double-
	/// returning the same block to two callers.
	fn pop(&self) -> Option<*mut Block> {
		let mut old = self.freelist.load(Ordering::Acquire);
		loop {
			let head = unpack_ptr(old);
			if head.is_null() {
				return None;
			}
			let version = unpack_version(old);
			// SAFETY: `head` came from a previous push of a live, owned block.
			let next = unsafe { (*head).next };
			let new = pack(next, version.wrapping_add(1));
			match self.freelist.compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire) {
				Ok(_) => {
					self.free_count.fetch_sub(1, Ordering::Relaxed);
					return Some(head);
				}
				Err(actual) => old = actual,
			}
		}
	}

	fn push(&self, block: *mut Block) {
		let mut old = self.freelist.load(Ordering::Acquire);
		loop {
			let head = unpack_ptr(old);
			let version = unpack_version(old);
			// SAFETY: `block` is exclusively owned by this call.
			unsafe { (*block).next = head };
			let new = pack(block, version.wrapping_add(1));
			match self.freelist.compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire) {
				Ok(_) => break,
				Err(actual) => old = actual,
			}
		}
		self.free_count.fetch_add(1, Ordering::Relaxed);
	}

	/// Batch-push every block of a freshly allocated slab.
	fn push_slab(&self, slab: &Slab, block_size: usize) {
		let mut first: *mut Block = null_mut();
		let mut last: *mut Block = null_mut();
		for i in 0..BLOCKS_PER_SLAB {
			// SAFETY: `slab.data` covers `BLOCKS_PER_SLAB * block_size` bytes.
			let block = unsafe { slab.data.add(i * block_size) as *mut Block };
			unsafe { (*block).next = null_mut() };
			if first.is_null() {
				first = block;
			} else {
				unsafe { (*last).next = block };
			}
			last = block;
		}

		let mut old = self.freelist.load(Ordering::Acquire);
		loop {
			let old_head = unpack_ptr(old);
			let version = unpack_version(old);
			unsafe { (*last).next = old_head };
			let new = pack(first, version.wrapping_add(1));
			match self.freelist.compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire) {
				Ok(_) => break,
				Err(actual) => old = actual,
			}
		}
		self.free_count.fetch_add(BLOCKS_PER_SLAB, Ordering::Relaxed);
	}

	/// CAS-link a new slab into the class's slab list, retrying on a lost
	/// race so a concurrent allocator never orphans a slab.
	fn link_slab(&self, slab: *mut Slab) {
		let mut expected = self.slabs.load(Ordering::Relaxed);
		loop {
			// SAFETY: `slab` is a unique, freshly allocated node.
			unsafe { (*slab).next = expected };
			match self.slabs.compare_exchange_weak(expected, slab, Ordering::Release, Ordering::Relaxed) {
				Ok(_) => break,
				Err(actual) => expected = actual,
			}
		}
	}
}

/// Per-class state for all four pools. Module-scoped global state, torn down
/// only at process exit or by explicit [`Pool::shutdown`] (§9 "Global state").
pub struct Pool {
	classes: [ClassState; 4],
}

impl Pool {
	pub const fn new() -> Self {
		Pool {
			classes: [ClassState::new(), ClassState::new(), ClassState::new(), ClassState::new()],
		}
	}

	/// Allocate a zeroed block. Sizes ≤ 512 bucket into a size class; larger
	/// sizes fall through to the system allocator. Returns null on failure;
	/// never partially initializes.
	pub fn alloc(&self, size: usize) -> *mut u8 {
		let size = size.max(1);
		let Some(class) = SizeClass::for_size(size) else {
			return unsafe { alloc_system(size) };
		};

		let state = &self.classes[class as usize];
		let block = match state.pop() {
			Some(b) => b,
			None => {
				let Some(slab) = allocate_slab(class) else { return null_mut() };
				// SAFETY: `slab` is boxed and leaked deliberately; the pool owns it
				// for the process lifetime (never returned to the OS per-slab).
				let slab_ptr = Box::into_raw(Box::new(slab));
				state.link_slab(slab_ptr);
				state.push_slab(unsafe { &*slab_ptr }, class.block_size());
				match state.pop() {
					Some(b) => b,
					None => return null_mut(),
				}
			}
		};

		state.allocated.fetch_add(1, Ordering::Relaxed);
		let ptr = block as *mut u8;
		unsafe { ptr.write_bytes(0, class.block_size()) };
		ptr
	}

	/// Return a block to its size-class freelist (cleared for debuggability);
	/// larger sizes are released to the system allocator.
	pub fn free(&self, ptr: *mut u8, size: usize) {
		if ptr.is_null() {
			return;
		}
		let size = size.max(1);
		let Some(class) = SizeClass::for_size(size) else {
			unsafe { free_system(ptr, size) };
			return;
		};

		let state = &self.classes[class as usize];
		unsafe { ptr.write_bytes(0, class.block_size()) };
		state.push(ptr as *mut Block);
		state.allocated.fetch_sub(1, Ordering::Relaxed);
	}

	/// `(in_use, on_freelist)` for one size class. Best-effort: relaxed loads,
	/// counts may be stale but are monotone per class between observations.
	pub fn stats(&self, class: SizeClass) -> (usize, usize) {
		let state = &self.classes[class as usize];
		(state.allocated.load(Ordering::Relaxed), state.free_count.load(Ordering::Relaxed))
	}

	/// Release every slab. Caller must ensure no live allocations remain.
	pub fn shutdown(&self) {
		for state in &self.classes {
			let mut slab = state.slabs.swap(null_mut(), Ordering::AcqRel);
			while !slab.is_null() {
				// SAFETY: every slab in this list was allocated via `Box::into_raw`
				// in `alloc` and is visited exactly once here.
				let boxed = unsafe { Box::from_raw(slab) };
				let next = boxed.next;
				unsafe { alloc::dealloc(boxed.data, boxed.layout) };
				drop(boxed);
				slab = next;
			}
			state.freelist.store(0, Ordering::Relaxed);
			state.allocated.store(0, Ordering::Relaxed);
			state.free_count.store(0, Ordering::Relaxed);
		}
	}
}

impl Default for Pool {
	fn default() -> Self {
		Self::new()
	}
}

fn allocate_slab(class: SizeClass) -> Option<Slab> {
	let block_size = class.block_size();
	let data_size = block_size * BLOCKS_PER_SLAB;
	let layout = Layout::from_size_align(data_size, 8).ok()?;
	// SAFETY: `layout` has nonzero size.
	let data = unsafe { alloc::alloc_zeroed(layout) };
	if data.is_null() {
		return None;
	}
	Some(Slab { next: null_mut(), data, layout })
}

unsafe fn alloc_system(size: usize) -> *mut u8 {
	let Ok(layout) = Layout::from_size_align(size, 8) else { return null_mut() };
	alloc::alloc_zeroed(layout)
}

unsafe fn free_system(ptr: *mut u8, size: usize) {
	if let Ok(layout) = Layout::from_size_align(size, 8) {
		alloc::dealloc(ptr, layout);
	}
}

// SAFETY: all mutable state is behind atomics; `Slab`/`Block` raw pointers
// are only traversed under the CAS protocol above.
unsafe impl Sync for Pool {}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::thread;

	#[test]
	fn small_alloc_returns_zeroed_block() {
		let pool = Pool::new();
		let ptr = pool.alloc(40);
		assert!(!ptr.is_null());
		let slice = unsafe { std::slice::from_raw_parts(ptr, 40) };
		assert!(slice.iter().all(|b| *b == 0));
		pool.free(ptr, 40);
	}

	#[test]
	fn stats_in_use_plus_freelist_equals_slab_capacity() {
		let pool = Pool::new();
		let a = pool.alloc(10);
		let b = pool.alloc(10);
		let (in_use, free) = pool.stats(SizeClass::Class64);
		assert_eq!(in_use + free, 64);
		assert_eq!(in_use, 2);
		pool.free(a, 10);
		pool.free(b, 10);
		let (in_use, free) = pool.stats(SizeClass::Class64);
		assert_eq!(in_use, 0);
		assert_eq!(free, 64);
	}

	#[test]
	fn large_allocation_falls_back_to_system_allocator() {
		let pool = Pool::new();
		let ptr = pool.alloc(4096);
		assert!(!ptr.is_null());
		let (in_use, free) = pool.stats(SizeClass::Class512);
		assert_eq!((in_use, free), (0, 0));
		pool.free(ptr, 4096);
	}

	#[test]
	fn concurrent_alloc_free_never_double_hands_out_a_block() {
		let pool = Arc::new(Pool::new());
		let mut handles = Vec::new();
		for _ in 0..4 {
			let pool = pool.clone();
			handles.push(thread::spawn(move || {
				for _ in 0..2000 {
					let p = pool.alloc(64);
					assert!(!p.is_null());
					pool.free(p, 64);
				}
			}));
		}
		for h in handles {
			h.join().unwrap();
		}
		let (in_use, free) = pool.stats(SizeClass::Class64);
		assert_eq!(in_use, 0);
		assert_eq!(free % 64, 0);
	}
}
