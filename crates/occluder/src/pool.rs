//! Growable item stores addressed by typed indices.
//!
//! Windings and triangles live in [`Pool`]s that grow in large fixed chunks
//! and can hand back a single freed slot. Trace infos are interned in an
//! [`InfoPool`] so every triangle of a surface shares one entry.

use std::marker::PhantomData;
use std::sync::Arc;

use occluder_level::ShaderInfo;

/// Growth chunk for the trace info pool.
pub const GROW_TRACE_INFOS: usize = 32768;
/// Growth chunk for the winding pool.
pub const GROW_TRACE_WINDINGS: usize = 65536;
/// Growth chunk for the triangle pool.
pub const GROW_TRACE_TRIANGLES: usize = 131072;
/// Growth chunk for the node store.
pub const GROW_TRACE_NODES: usize = 16384;

/// A typed index into one of the pools.
pub trait PoolId: Copy {
    /// Wrap a raw index.
    fn from_index(index: usize) -> Self;
    /// The raw index.
    fn index(self) -> usize;
}

macro_rules! pool_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl PoolId for $name {
            #[inline]
            fn from_index(index: usize) -> Self {
                Self(index)
            }

            #[inline]
            fn index(self) -> usize {
                self.0
            }
        }
    };
}

pool_id!(
    /// Handle to a tree node.
    NodeId
);
pool_id!(
    /// Handle to a trace winding.
    WindingId
);
pool_id!(
    /// Handle to a trace triangle.
    TriangleId
);
pool_id!(
    /// Handle to an interned trace info.
    InfoId
);

/// Append-only storage with chunked growth and a single reusable slot.
#[derive(Debug, Clone)]
pub struct Pool<I, T> {
    items: Vec<T>,
    chunk: usize,
    dead: Option<usize>,
    _id: PhantomData<I>,
}

impl<I: PoolId, T> Pool<I, T> {
    /// Create an empty pool that grows `chunk` items at a time.
    pub fn new(chunk: usize) -> Self {
        Self {
            items: Vec::new(),
            chunk: chunk.max(1),
            dead: None,
            _id: PhantomData,
        }
    }

    /// Store `item`, reusing the freed slot if there is one.
    pub fn insert(&mut self, item: T) -> I {
        if let Some(slot) = self.dead.take() {
            if let Some(existing) = self.items.get_mut(slot) {
                *existing = item;
                return I::from_index(slot);
            }
        }
        if self.items.len() == self.items.capacity() {
            self.items.reserve_exact(self.chunk);
        }
        self.items.push(item);
        I::from_index(self.items.len() - 1)
    }

    /// Mark `id` as reusable by the next insert. Only the most recent free
    /// is remembered.
    pub fn free(&mut self, id: I) {
        self.dead = Some(id.index());
    }

    /// The slot the next insert will reuse, if any.
    pub fn dead_slot(&self) -> Option<I> {
        self.dead.map(I::from_index)
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Number of slots ever used.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<I: PoolId, T> std::ops::Index<I> for Pool<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.index()]
    }
}

/// Shader, originating surface and shadow group of a triangle.
#[derive(Debug, Clone)]
pub struct TraceInfo {
    pub shader: Arc<ShaderInfo>,
    /// Level surface the geometry came from; `None` for external models.
    pub surface: Option<usize>,
    pub cast_shadows: i32,
}

impl TraceInfo {
    /// Same shader object, surface and group.
    pub fn same_as(&self, other: &TraceInfo) -> bool {
        Arc::ptr_eq(&self.shader, &other.shader)
            && self.surface == other.surface
            && self.cast_shadows == other.cast_shadows
    }
}

/// Deduplicating store of trace infos.
#[derive(Debug, Clone)]
pub struct InfoPool {
    infos: Vec<TraceInfo>,
}

impl InfoPool {
    pub fn new() -> Self {
        Self { infos: Vec::new() }
    }

    /// Return the id of an identical entry, adding `info` if there is none.
    pub fn intern(&mut self, info: TraceInfo) -> InfoId {
        if let Some(i) = self.infos.iter().position(|existing| existing.same_as(&info)) {
            return InfoId::from_index(i);
        }
        if self.infos.len() == self.infos.capacity() {
            self.infos.reserve_exact(GROW_TRACE_INFOS);
        }
        self.infos.push(info);
        InfoId::from_index(self.infos.len() - 1)
    }

    pub fn get(&self, id: InfoId) -> Option<&TraceInfo> {
        self.infos.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn into_vec(self) -> Vec<TraceInfo> {
        self.infos
    }
}

impl Default for InfoPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occluder_level::CompileFlags;

    #[test]
    fn test_pool_grows_in_chunks() {
        let mut pool: Pool<WindingId, u32> = Pool::new(8);
        let a = pool.insert(1);
        let b = pool.insert(2);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(pool.capacity(), 8);
        for i in 0..7 {
            pool.insert(i);
        }
        assert_eq!(pool.capacity(), 16);
    }

    #[test]
    fn test_pool_reuses_only_last_freed() {
        let mut pool: Pool<TriangleId, &str> = Pool::new(4);
        let a = pool.insert("a");
        let b = pool.insert("b");
        pool.free(a);
        pool.free(b);
        assert_eq!(pool.dead_slot(), Some(b));

        let c = pool.insert("c");
        assert_eq!(c, b);
        assert_eq!(pool[c], "c");
        assert_eq!(pool.dead_slot(), None);

        // a was forgotten when b was freed
        let d = pool.insert("d");
        assert_eq!(d.index(), 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_info_interning() {
        let stone = Arc::new(ShaderInfo::new("stone", CompileFlags::SOLID));
        let stone_copy = Arc::new(ShaderInfo::new("stone", CompileFlags::SOLID));
        let mut pool = InfoPool::new();

        let info = |shader: &Arc<ShaderInfo>, surface, cast_shadows| TraceInfo {
            shader: Arc::clone(shader),
            surface,
            cast_shadows,
        };

        let a = pool.intern(info(&stone, Some(3), 1));
        assert_eq!(pool.intern(info(&stone, Some(3), 1)), a);
        // equal contents but a different descriptor object
        assert_ne!(pool.intern(info(&stone_copy, Some(3), 1)), a);
        assert_ne!(pool.intern(info(&stone, Some(4), 1)), a);
        assert_ne!(pool.intern(info(&stone, Some(3), 2)), a);
        assert_ne!(pool.intern(info(&stone, None, 1)), a);
        assert_eq!(pool.len(), 5);
    }
}
