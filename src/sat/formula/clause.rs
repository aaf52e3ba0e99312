use std::collections::HashMap;
use std::mem;

use super::allocator::{RegionAllocator, Ref};
use super::Lit;

/// Offset of a clause's header inside the arena. `INVALID` means "no
/// clause" (a decision, a top-level fact, or an absent reason);
/// `BINARY_CONFLICT` is a distinct sentinel the propagator returns when a
/// conflict is found through the binary-watch shortcut, which never has a
/// backing arena allocation.
pub type CRef = Ref;

pub const INVALID: CRef = Ref::max_value();
pub const BINARY_CONFLICT: CRef = Ref::max_value() - 1;

pub mod flag {
    pub const ORIGINAL: u32 = 0;
    pub const LEARNED: u32 = 1 << 0;
    pub const DELETED: u32 = 1 << 1;
    pub const GLUE: u32 = 1 << 2;
    pub const FROZEN: u32 = 1 << 3;
}

/// Clause metadata, stored inline in the arena immediately before the
/// clause's literals. Kept as a plain `u32` flag mask rather than a packed
/// bitfield: Rust has no native bitfield syntax and FROZEN needs its own
/// independent bit alongside the 28-bit size the wire format budgets for.
#[repr(C)]
pub struct ClauseHeader {
    size: u32,
    flags: u32,
    lbd: u32,
    activity: f32,
}

impl ClauseHeader {
    fn new(size: usize, flags: u32) -> ClauseHeader {
        assert!(size < (1 << 28));
        ClauseHeader {
            size: size as u32,
            flags,
            lbd: 0,
            activity: 0.0,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    #[inline]
    pub fn has_flag(&self, f: u32) -> bool {
        self.flags & f != 0
    }

    fn set_flag(&mut self, f: u32, val: bool) {
        if val {
            self.flags |= f;
        } else {
            self.flags &= !f;
        }
    }
}

/// A read-only view onto an arena-resident clause.
pub struct ClauseRef<'a> {
    header: &'a ClauseHeader,
    lits: &'a [Lit],
}

impl<'a> ClauseRef<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    #[inline]
    pub fn lits(&self) -> &[Lit] {
        self.lits
    }

    #[inline]
    pub fn head(&self) -> Lit {
        self.lits[0]
    }

    #[inline]
    pub fn head_pair(&self) -> (Lit, Lit) {
        (self.lits[0], self.lits[1])
    }

    #[inline]
    pub fn is_learned(&self) -> bool {
        self.header.has_flag(flag::LEARNED)
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.header.has_flag(flag::DELETED)
    }

    #[inline]
    pub fn is_glue(&self) -> bool {
        self.header.has_flag(flag::GLUE)
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.header.has_flag(flag::FROZEN)
    }

    #[inline]
    pub fn activity(&self) -> f32 {
        self.header.activity
    }

    #[inline]
    pub fn lbd(&self) -> u32 {
        self.header.lbd
    }
}

/// A mutable view onto an arena-resident clause.
pub struct ClauseRefMut<'a> {
    header: &'a mut ClauseHeader,
    lits: &'a mut [Lit],
}

impl<'a> ClauseRefMut<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    #[inline]
    pub fn lits(&self) -> &[Lit] {
        self.lits
    }

    #[inline]
    pub fn head(&self) -> Lit {
        self.lits[0]
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        self.lits.swap(i, j);
    }

    /// Drops the last `n` literals, shrinking the clause in place. Used
    /// when compacting a clause during `remove_satisfied`.
    pub fn shrink_by(&mut self, n: usize) {
        let new_len = self.lits.len() - n;
        self.header.size = new_len as u32;
    }

    pub fn set_activity(&mut self, a: f32) {
        self.header.activity = a;
    }

    pub fn activity(&self) -> f32 {
        self.header.activity
    }

    pub fn set_lbd(&mut self, lbd: u32) {
        self.header.lbd = lbd;
    }

    pub fn set_glue(&mut self, glue: bool) {
        self.header.set_flag(flag::GLUE, glue);
    }

    pub fn is_glue(&self) -> bool {
        self.header.has_flag(flag::GLUE)
    }

    pub fn is_learned(&self) -> bool {
        self.header.has_flag(flag::LEARNED)
    }

    fn mark_deleted(&mut self) {
        self.header.set_flag(flag::DELETED, true);
    }
}

/// A generous built-in ceiling on the number of arena-backed clauses a
/// single run may hold; `ClauseAllocator::set_max_clauses` can tighten it.
/// Reached only on pathological inputs or a deliberately lowered cap —
/// crossing it returns `INVALID` rather than growing without bound.
pub const DEFAULT_MAX_CLAUSES: usize = 64 * 1024 * 1024;

/// The clause store: a bump allocator of packed `(ClauseHeader, [Lit])`
/// records, plus bookkeeping for how many bytes are reclaimable by GC.
pub struct ClauseAllocator {
    ra: RegionAllocator,
    pub extra_clause_field: bool,
    wasted: usize,
    num_clauses: usize,
    max_clauses: usize,
}

const HEADER_WORDS: usize = mem::size_of::<ClauseHeader>();

impl ClauseAllocator {
    pub fn new() -> ClauseAllocator {
        ClauseAllocator {
            ra: RegionAllocator::with_capacity(1024 * 1024, mem::align_of::<ClauseHeader>()),
            extra_clause_field: false,
            wasted: 0,
            num_clauses: 0,
            max_clauses: DEFAULT_MAX_CLAUSES,
        }
    }

    pub fn new_for_gc(from: &ClauseAllocator) -> ClauseAllocator {
        ClauseAllocator {
            ra: RegionAllocator::with_capacity(from.ra.allocated_bytes().max(1024), mem::align_of::<ClauseHeader>()),
            extra_clause_field: from.extra_clause_field,
            wasted: 0,
            num_clauses: 0,
            max_clauses: from.max_clauses,
        }
    }

    /// Tightens (or loosens) the arena's clause-count ceiling. `alloc`
    /// returns `INVALID` once it would be crossed.
    pub fn set_max_clauses(&mut self, max_clauses: usize) {
        self.max_clauses = max_clauses;
    }

    /// Preallocates arena storage for about `num_clauses` clauses averaging
    /// `avg_lits` literals apiece, so the DIMACS header's declared clause
    /// count can be used to avoid incremental regrowth during parsing.
    pub fn reserve(&mut self, num_clauses: usize, avg_lits: usize) {
        let bytes_per_clause = HEADER_WORDS + avg_lits * mem::size_of::<Lit>();
        self.ra.reserve(num_clauses.saturating_mul(bytes_per_clause));
    }

    fn lits_offset(cr: CRef) -> Ref {
        cr + HEADER_WORDS as Ref
    }

    fn alloc_raw(&mut self, lits: &[Lit], flags: u32) -> CRef {
        if self.num_clauses >= self.max_clauses {
            return INVALID;
        }
        unsafe {
            let allocated = self.ra.allocate_with_extra::<ClauseHeader, Lit>(lits.len());
            let (header, cr): (&mut ClauseHeader, Ref) = match allocated {
                Some(h) => h,
                None => return INVALID,
            };
            *header = ClauseHeader::new(lits.len(), flags);
            let body = self.ra.get_slice_mut::<Lit>(Self::lits_offset(cr), lits.len());
            body.copy_from_slice(lits);
            self.num_clauses += 1;
            cr
        }
    }

    pub fn alloc(&mut self, lits: &[Lit], learned: bool) -> CRef {
        self.alloc_raw(lits, if learned { flag::LEARNED } else { flag::ORIGINAL })
    }

    pub fn view(&self, cr: CRef) -> ClauseRef {
        unsafe {
            let header: &ClauseHeader = self.ra.get(cr);
            let lits = self.ra.get_slice::<Lit>(Self::lits_offset(cr), header.size());
            ClauseRef { header, lits }
        }
    }

    pub fn edit(&mut self, cr: CRef) -> ClauseRefMut {
        let size = self.view(cr).len();
        let lits_off = Self::lits_offset(cr);
        unsafe {
            let ra_ptr: *mut RegionAllocator = &mut self.ra;
            let header: &mut ClauseHeader = (*ra_ptr).get_mut(cr);
            let lits: &mut [Lit] = (*ra_ptr).get_slice_mut(lits_off, size);
            ClauseRefMut { header, lits }
        }
    }

    pub fn is_deleted(&self, cr: CRef) -> bool {
        self.view(cr).is_deleted()
    }

    pub fn free(&mut self, cr: CRef) {
        let size = self.view(cr).len();
        let bytes = HEADER_WORDS + size * mem::size_of::<Lit>();
        self.edit(cr).mark_deleted();
        self.wasted += bytes;
    }

    pub fn size(&self) -> usize {
        self.ra.allocated_bytes()
    }

    pub fn wasted(&self) -> usize {
        self.wasted
    }

    pub fn check_garbage(&self, frac: f64) -> bool {
        (self.wasted as f64) > (self.ra.allocated_bytes() as f64) * frac
    }
}

/// A memoizing relocation handle passed to every owner of `CRef`s during
/// arena GC. Each owner calls `relocate` for the references it holds; a
/// live clause is copied into the new arena at most once no matter how
/// many owners reference it (watch lists, the learnt/clause vectors, BVE
/// occurrence lists, and trail reasons all hold independent copies of the
/// same `CRef`s).
pub struct ClauseGC<'a> {
    from: &'a ClauseAllocator,
    to: &'a mut ClauseAllocator,
    map: HashMap<CRef, CRef>,
}

impl<'a> ClauseGC<'a> {
    pub fn new(from: &'a ClauseAllocator, to: &'a mut ClauseAllocator) -> ClauseGC<'a> {
        ClauseGC {
            from,
            to,
            map: HashMap::new(),
        }
    }

    /// Relocates a single clause reference. Returns `None` if the clause
    /// was deleted (callers should drop the reference from whatever list
    /// held it); returns the (possibly cached) new reference otherwise.
    pub fn relocate(&mut self, cr: CRef) -> Option<CRef> {
        if let Some(&new_cr) = self.map.get(&cr) {
            return Some(new_cr);
        }

        let (lits, header_flags, lbd, activity, deleted) = {
            let c = self.from.view(cr);
            (c.lits().to_vec(), c.header.flags, c.header.lbd, c.header.activity, c.is_deleted())
        };
        if deleted {
            return None;
        }

        let new_cr = self.to.alloc_raw(&lits, header_flags);
        if new_cr == INVALID {
            // Relocating a live clause into a fresh arena sized off the
            // same cap as `from` should never exhaust it; if it somehow
            // does, drop the clause rather than hand back a dangling ref.
            log::warn!("clause arena exhausted during garbage collection; dropping a live clause");
            return None;
        }
        {
            let mut m = self.to.edit(new_cr);
            m.set_lbd(lbd);
            m.set_activity(activity);
        }
        self.map.insert(cr, new_cr);
        Some(new_cr)
    }
}
