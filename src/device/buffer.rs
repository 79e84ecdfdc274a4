use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::device::{DeviceError, MemoryPool, Stream};

/// Reservation in a memory pool, returned exactly once.
#[derive(Debug)]
struct Allocation {
    bytes: usize,
    pool: Option<Arc<MemoryPool>>,
}

impl Allocation {
    fn reserve(pool: &Arc<MemoryPool>, bytes: usize) -> Result<Self, DeviceError> {
        pool.reserve(bytes)?;
        Ok(Self { bytes, pool: Some(pool.clone()) })
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        match self.pool.take() {
            Some(pool) => pool.release(self.bytes),
            None => Ok(()),
        }
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "leaked allocation could not be returned");
        }
    }
}

/// Shared handle to memory that kernels and copy commands capture. Holding a
/// `DevicePtr` does not keep the allocation accounted for; the owning buffer does.
pub struct DevicePtr<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for DevicePtr<T> {
    fn clone(&self) -> Self {
        DevicePtr(self.0.clone())
    }
}

impl<T> DevicePtr<T> {
    pub fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.0.lock()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn zeroed<T: Copy + Default>(len: usize) -> DevicePtr<T> {
    DevicePtr(Arc::new(Mutex::new(vec![T::default(); len])))
}

fn bytes_for<T>(len: usize) -> usize {
    len * std::mem::size_of::<T>()
}

pub struct DeviceBuffer<T> {
    ptr: DevicePtr<T>,
    len: usize,
    allocation: Allocation,
}

impl<T: Copy + Default + Send + 'static> DeviceBuffer<T> {
    pub(crate) fn new(pool: &Arc<MemoryPool>, len: usize) -> Result<Self, DeviceError> {
        let allocation = Allocation::reserve(pool, bytes_for::<T>(len))?;
        Ok(Self { ptr: zeroed(len), len, allocation })
    }
}

impl<T> DeviceBuffer<T> {
    pub fn ptr(&self) -> DevicePtr<T> {
        self.ptr.clone()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn free(mut self) -> Result<(), DeviceError> {
        self.allocation.release()
    }
}

/// Page-locked host memory; the only host memory streams copy from or into.
pub struct PinnedBuffer<T> {
    ptr: DevicePtr<T>,
    len: usize,
    allocation: Allocation,
}

impl<T: Copy + Default + Send + 'static> PinnedBuffer<T> {
    pub(crate) fn new(pool: &Arc<MemoryPool>, len: usize) -> Result<Self, DeviceError> {
        let allocation = Allocation::reserve(pool, bytes_for::<T>(len))?;
        Ok(Self { ptr: zeroed(len), len, allocation })
    }
}

impl<T> PinnedBuffer<T> {
    /// Host view of the buffer. Must not be held across a `synchronize`
    /// boundary while copies into or out of this buffer are in flight.
    pub fn lock(&self) -> MappedMutexGuard<'_, [T]> {
        MutexGuard::map(self.ptr.lock(), |v| v.as_mut_slice())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn free(mut self) -> Result<(), DeviceError> {
        self.allocation.release()
    }
}

pub fn copy_to_device_async<T: Copy + Send + 'static>(
    stream: &Stream,
    src: &PinnedBuffer<T>,
    dst: &DeviceBuffer<T>,
) -> Result<(), DeviceError> {
    enqueue_copy(stream, src.ptr.clone(), src.len, dst.ptr(), dst.len)
}

pub fn copy_to_host_async<T: Copy + Send + 'static>(
    stream: &Stream,
    src: &DeviceBuffer<T>,
    dst: &PinnedBuffer<T>,
) -> Result<(), DeviceError> {
    enqueue_copy(stream, src.ptr(), src.len, dst.ptr.clone(), dst.len)
}

fn enqueue_copy<T: Copy + Send + 'static>(
    stream: &Stream,
    src: DevicePtr<T>,
    src_len: usize,
    dst: DevicePtr<T>,
    dst_len: usize,
) -> Result<(), DeviceError> {
    if src_len != dst_len {
        return Err(DeviceError::SizeMismatch { src: src_len, dst: dst_len });
    }
    stream.enqueue(move || {
        let src = src.lock();
        dst.lock().copy_from_slice(&src);
    })
}

/// A device buffer paired with a pinned host mirror of the same length.
pub struct DualBuffer<T> {
    host: PinnedBuffer<T>,
    device: DeviceBuffer<T>,
}

impl<T: Copy + Send + 'static> DualBuffer<T> {
    pub(crate) fn new(host: PinnedBuffer<T>, device: DeviceBuffer<T>) -> Self {
        debug_assert_eq!(host.len(), device.len());
        Self { host, device }
    }

    /// Queue a copy of the host mirror into device memory.
    pub fn stage_to_device(&self, stream: &Stream) -> Result<(), DeviceError> {
        copy_to_device_async(stream, &self.host, &self.device)
    }

    /// Queue a copy of device memory back into the host mirror.
    pub fn stage_to_host(&self, stream: &Stream) -> Result<(), DeviceError> {
        copy_to_host_async(stream, &self.device, &self.host)
    }

    pub fn host(&self) -> MappedMutexGuard<'_, [T]> {
        self.host.lock()
    }

    pub fn device_ptr(&self) -> DevicePtr<T> {
        self.device.ptr()
    }

    pub fn len(&self) -> usize {
        self.device.len()
    }

    pub fn is_empty(&self) -> bool {
        self.device.is_empty()
    }

    /// Free the device side, then the host mirror, matching allocation order.
    pub fn free(self) -> Result<(), DeviceError> {
        let Self { host, device } = self;
        device.free()?;
        host.free()
    }
}

/// Read-only data resident on the device for the lifetime of the buffer.
pub struct ConstantBuffer<T> {
    value: Arc<T>,
    allocation: Allocation,
}

impl<T: Send + Sync + 'static> ConstantBuffer<T> {
    pub(crate) fn new(pool: &Arc<MemoryPool>, value: T, bytes: usize) -> Result<Self, DeviceError> {
        let allocation = Allocation::reserve(pool, bytes)?;
        Ok(Self { value: Arc::new(value), allocation })
    }
}

impl<T> ConstantBuffer<T> {
    pub fn ptr(&self) -> Arc<T> {
        self.value.clone()
    }

    pub fn free(mut self) -> Result<(), DeviceError> {
        self.allocation.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceDesc, HostDevice};

    #[test]
    fn mismatched_copy_is_rejected() {
        let device = HostDevice::new(DeviceDesc { threads: 1, ..DeviceDesc::default() }).unwrap();
        let stream = device.create_stream().unwrap();
        let host = device.alloc_pinned::<u8>(4).unwrap();
        let dev = device.alloc::<u8>(8).unwrap();
        assert!(matches!(
            copy_to_device_async(&stream, &host, &dev),
            Err(DeviceError::SizeMismatch { src: 4, dst: 8 })
        ));
        stream.destroy().unwrap();
    }

    #[test]
    fn dropping_a_buffer_returns_its_memory() {
        let device = HostDevice::new(DeviceDesc { threads: 1, ..DeviceDesc::default() }).unwrap();
        {
            let _buf = device.alloc::<u64>(10).unwrap();
            assert_eq!(device.memory_in_use(), 80);
        }
        assert_eq!(device.memory_in_use(), 0);
    }

    #[test]
    fn staged_results_visible_after_synchronize() {
        let device = HostDevice::new(DeviceDesc { threads: 1, ..DeviceDesc::default() }).unwrap();
        let stream = device.create_stream().unwrap();
        let buf = device.alloc_dual::<u32>(4).unwrap();
        buf.device_ptr().lock().copy_from_slice(&[1, 2, 3, 4]);

        buf.stage_to_host(&stream).unwrap();
        stream.synchronize().unwrap();
        assert_eq!(&*buf.host(), &[1, 2, 3, 4]);
        buf.free().unwrap();
        stream.destroy().unwrap();
    }
}
