//! Pointer Capabilities
//!
//! Pointer-kind ports carry a [`Handle`] into a [`CapabilityStore`] owned by
//! the host. The engine copies handles between ports and never looks behind
//! them; only node types that know the concrete object type resolve a handle
//! back to the object.
//!
//! The capture layer that opens devices and feeds statistics runs outside
//! the engine, possibly on its own thread, so the store is a concurrent map
//! and the statistics counters sit behind a lock.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Opaque reference to an object in a [`CapabilityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw handle value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}

type Object = Arc<dyn Any + Send + Sync>;

/// Host-owned table of capability objects addressed by handle.
#[derive(Default)]
pub struct CapabilityStore {
    objects: DashMap<Handle, Object>,
    next: AtomicU64,
}

impl CapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object and return a fresh handle for it.
    pub fn insert<T: Any + Send + Sync>(&self, object: T) -> Handle {
        let handle = Handle(self.next.fetch_add(1, Ordering::Relaxed));
        self.objects.insert(handle, Arc::new(object));
        handle
    }

    /// Store an object under an existing handle, replacing what was there.
    ///
    /// Nodes that republish the same capability every pass use this to keep
    /// their handle stable.
    pub fn replace<T: Any + Send + Sync>(&self, handle: Handle, object: T) {
        self.objects.insert(handle, Arc::new(object));
    }

    /// Resolve a handle to an object of type `T`.
    ///
    /// Returns `None` if the handle is unknown or refers to another type.
    pub fn get<T: Any + Send + Sync>(&self, handle: Handle) -> Option<Arc<T>> {
        let object = self.objects.get(&handle)?.value().clone();
        object.downcast::<T>().ok()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.objects.contains_key(&handle)
    }

    /// Release an object.
    pub fn remove(&self, handle: Handle) -> bool {
        self.objects.remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl fmt::Debug for CapabilityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityStore")
            .field("objects", &self.objects.len())
            .finish()
    }
}

/// Which side of a connection a port filter matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortDirection {
    Src,
    Dst,
    #[default]
    SrcOrDst,
}

/// A capture filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketFilter {
    /// Match a TCP/UDP port.
    Port { port: u16, direction: PortDirection },
    /// Match if any of the sub-filters match.
    Or(Vec<PacketFilter>),
}

impl PacketFilter {
    pub fn port(port: u16) -> Self {
        PacketFilter::Port {
            port,
            direction: PortDirection::SrcOrDst,
        }
    }

    /// Render as BPF filter text.
    pub fn to_bpf(&self) -> String {
        match self {
            PacketFilter::Port { port, direction } => match direction {
                PortDirection::Src => format!("src port {}", port),
                PortDirection::Dst => format!("dst port {}", port),
                PortDirection::SrcOrDst => format!("port {}", port),
            },
            PacketFilter::Or(filters) => filters
                .iter()
                .map(|f| format!("({})", f.to_bpf()))
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }
}

impl fmt::Display for PacketFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bpf())
    }
}

/// Counters captured so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub bytes: u64,
    pub largest: u64,
}

/// Capture statistics shared with the capture thread.
#[derive(Debug, Default)]
pub struct PacketStats {
    counters: Mutex<StatsSnapshot>,
}

impl PacketStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one captured packet.
    pub fn record(&self, len: u64) {
        let mut counters = self.counters.lock();
        counters.packets += 1;
        counters.bytes += len;
        counters.largest = counters.largest.max(len);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        *self.counters.lock()
    }

    pub fn clear(&self) {
        *self.counters.lock() = StatsSnapshot::default();
    }

    /// Printable multi-line summary.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Packets captured: {}\nBytes captured:   {}\nLargest packet:   {}",
            s.packets, s.bytes, s.largest
        )
    }
}
