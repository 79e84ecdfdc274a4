//! Compute accelerator abstraction.
//!
//! The engine talks to the device through owned buffers, asynchronous streams
//! and kernel launches. `HostDevice` is the shipped backend: device memory is
//! ordinary heap memory accounted against a budget, every stream is a worker
//! thread that executes its commands in issue order, and kernels fan out over
//! a thread pool that belongs to the device alone, so a host thread blocked in
//! `Stream::synchronize` can never starve a kernel of workers.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::ThreadPool;
use thiserror::Error;

pub mod buffer;
pub mod stream;

pub use buffer::{ConstantBuffer, DevicePtr, DeviceBuffer, DualBuffer, PinnedBuffer};
pub use stream::Stream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    Device,
    Pinned,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Device => write!(f, "device"),
            MemoryKind::Pinned => write!(f, "pinned host"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("out of {kind} memory: requested {requested} bytes, {available} available")]
    OutOfMemory { kind: MemoryKind, requested: usize, available: usize },

    #[error("invalid free of {bytes} bytes of {kind} memory with only {in_use} in use")]
    InvalidFree { kind: MemoryKind, bytes: usize, in_use: usize },

    #[error("copy size mismatch: source has {src} elements, destination {dst}")]
    SizeMismatch { src: usize, dst: usize },

    #[error("could not create stream {id}: {source}")]
    StreamCreate { id: usize, source: std::io::Error },

    #[error("stream {id} stopped executing commands")]
    StreamLost { id: usize },

    #[error("stream {id} did not shut down cleanly")]
    StreamDestroy { id: usize },

    #[error("could not start device: {0}")]
    Init(#[from] rayon::ThreadPoolBuildError),
}

/// Report a failed device operation and abort the process. Device failures
/// have no recovery path in the engine.
pub fn check<T>(operation: &str, result: Result<T, DeviceError>) -> T {
    match result {
        Ok(v) => v,
        Err(err) => {
            tracing::error!(operation, error = %err, "fatal device error");
            eprintln!("fatal device error in {}: {}", operation, err);
            std::process::abort()
        }
    }
}

/// Byte budget for one kind of memory.
#[derive(Debug)]
pub struct MemoryPool {
    kind: MemoryKind,
    capacity: usize,
    used: AtomicUsize,
}

impl MemoryPool {
    fn new(kind: MemoryKind, capacity: usize) -> Self {
        Self { kind, capacity, used: AtomicUsize::new(0) }
    }

    fn reserve(&self, bytes: usize) -> Result<(), DeviceError> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let available = self.capacity - used;
            if bytes > available {
                return Err(DeviceError::OutOfMemory { kind: self.kind, requested: bytes, available });
            }
            match self.used.compare_exchange_weak(used, used + bytes, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Ok(()),
                Err(current) => used = current,
            }
        }
    }

    fn release(&self, bytes: usize) -> Result<(), DeviceError> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            if bytes > used {
                return Err(DeviceError::InvalidFree { kind: self.kind, bytes, in_use: used });
            }
            match self.used.compare_exchange_weak(used, used - bytes, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Ok(()),
                Err(current) => used = current,
            }
        }
    }

    pub fn in_use(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DeviceDesc {
    pub memory_bytes: usize,
    pub pinned_bytes: usize,
    /// Kernel worker threads, 0 picks one per core.
    pub threads: usize,
}

impl Default for DeviceDesc {
    fn default() -> Self {
        Self {
            memory_bytes: 1 << 30,
            pinned_bytes: 1 << 30,
            threads: 0,
        }
    }
}

/// Work launched onto a stream. Runs inside the device thread pool, so rayon
/// parallel iterators in `run` use the device's workers.
pub trait Kernel: Send + 'static {
    fn name(&self) -> &'static str;

    fn run(self);
}

pub struct HostDevice {
    pool: Arc<ThreadPool>,
    device_memory: Arc<MemoryPool>,
    pinned_memory: Arc<MemoryPool>,
    next_stream: AtomicUsize,
}

impl HostDevice {
    pub fn new(desc: DeviceDesc) -> Result<Self, DeviceError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(desc.threads)
            .thread_name(|i| format!("device-{}", i))
            .build()?;

        let device_memory = MemoryPool::new(MemoryKind::Device, desc.memory_bytes);
        let pinned_memory = MemoryPool::new(MemoryKind::Pinned, desc.pinned_bytes);
        tracing::debug!(
            threads = pool.current_num_threads(),
            memory = device_memory.capacity(),
            pinned = pinned_memory.capacity(),
            "host device started"
        );

        Ok(Self {
            pool: Arc::new(pool),
            device_memory: Arc::new(device_memory),
            pinned_memory: Arc::new(pinned_memory),
            next_stream: AtomicUsize::new(0),
        })
    }

    pub fn alloc<T: Copy + Default + Send + 'static>(&self, len: usize) -> Result<DeviceBuffer<T>, DeviceError> {
        DeviceBuffer::new(&self.device_memory, len)
    }

    pub fn alloc_pinned<T: Copy + Default + Send + 'static>(&self, len: usize) -> Result<PinnedBuffer<T>, DeviceError> {
        PinnedBuffer::new(&self.pinned_memory, len)
    }

    /// Allocate a device buffer and its pinned host mirror, in that order.
    pub fn alloc_dual<T: Copy + Default + Send + 'static>(&self, len: usize) -> Result<DualBuffer<T>, DeviceError> {
        let device = self.alloc(len)?;
        let host = self.alloc_pinned(len)?;
        Ok(DualBuffer::new(host, device))
    }

    /// Copy read-only data to device memory once.
    pub fn upload<T: Send + Sync + 'static>(&self, value: T, bytes: usize) -> Result<ConstantBuffer<T>, DeviceError> {
        ConstantBuffer::new(&self.device_memory, value, bytes)
    }

    pub fn create_stream(&self) -> Result<Stream, DeviceError> {
        let id = self.next_stream.fetch_add(1, Ordering::Relaxed);
        Stream::spawn(id)
    }

    /// Issue a kernel onto `stream`; it runs after everything already queued there.
    pub fn launch<K: Kernel>(&self, stream: &Stream, kernel: K) -> Result<(), DeviceError> {
        let pool = self.pool.clone();
        tracing::trace!(stream = stream.id(), kernel = kernel.name(), "launch");
        stream.enqueue(move || pool.install(move || kernel.run()))
    }

    pub fn memory_in_use(&self) -> usize {
        self.device_memory.in_use()
    }

    pub fn pinned_in_use(&self) -> usize {
        self.pinned_memory.in_use()
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}
