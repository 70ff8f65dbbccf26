//! Memory bridge for host <-> module data transfer.
//!
//! The solver module owns its linear memory outright; the host only
//! ever touches it through the module's exported `alloc`/`dealloc`
//! pair and bounds-checked reads and writes. The unit of exchange is
//! the [`Descriptor`]: a fixed 8-byte pointer+length record the host
//! writes before a call and the module overwrites with the result.

use ravel_core::{RavelError, Result};
use wasmtime::{Memory, Store, TypedFunc};

/// Size of the descriptor record in module memory: two u32 fields.
pub const DESCRIPTOR_SIZE: u32 = 8;

/// A region within the module's linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WasmPtr {
    /// Offset within linear memory.
    pub offset: u32,
    /// Size of the region in bytes.
    pub len: u32,
}

impl WasmPtr {
    /// Create a new region handle.
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Get the end offset (offset + len), widened so a region near the
    /// top of the address space cannot overflow.
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.len as u64
    }
}

/// The fixed two-field record passed to the module's entry point.
///
/// Laid out as two little-endian u32 values: `ptr` at offset 0,
/// `len` at offset 4. Reused bidirectionally within one invocation:
/// the host writes the input buffer's address and byte count, the
/// module overwrites both fields with the result buffer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Address of the payload bytes.
    pub ptr: u32,
    /// Byte count of the payload.
    pub len: u32,
}

impl Descriptor {
    /// Encode as the 8-byte wire layout.
    pub fn to_le_bytes(self) -> [u8; DESCRIPTOR_SIZE as usize] {
        let mut bytes = [0u8; DESCRIPTOR_SIZE as usize];
        bytes[0..4].copy_from_slice(&self.ptr.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// Decode from the 8-byte wire layout.
    pub fn from_le_bytes(bytes: [u8; DESCRIPTOR_SIZE as usize]) -> Self {
        Self {
            ptr: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            len: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// The payload region this descriptor points at.
    pub fn payload(self) -> WasmPtr {
        WasmPtr::new(self.ptr, self.len)
    }
}

/// Bridge for memory operations between host and module.
///
/// Wraps the module's exported memory and allocator functions and
/// keeps every access bounds-checked against the current memory size.
pub struct MemoryBridge<T> {
    /// The module's exported linear memory.
    memory: Memory,
    /// The module's `alloc(size: u32) -> u32` export.
    alloc_fn: TypedFunc<u32, u32>,
    /// The module's `dealloc(ptr: u32, size: u32)` export.
    dealloc_fn: TypedFunc<(u32, u32), ()>,
    /// Phantom data for store type.
    _marker: std::marker::PhantomData<T>,
}

impl<T> MemoryBridge<T> {
    /// Create a new memory bridge.
    pub fn new(
        memory: Memory,
        alloc_fn: TypedFunc<u32, u32>,
        dealloc_fn: TypedFunc<(u32, u32), ()>,
    ) -> Self {
        Self {
            memory,
            alloc_fn,
            dealloc_fn,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the module's memory.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Allocate a region of `len` bytes in module memory.
    ///
    /// A trap inside the allocator (out of capacity) is fatal to the
    /// current invocation and maps to [`RavelError::MemoryAlloc`].
    pub fn allocate(&self, store: &mut Store<T>, len: u32) -> Result<u32> {
        self.alloc_fn
            .call(&mut *store, len)
            .map_err(|_| RavelError::MemoryAlloc {
                requested: len as u64,
            })
    }

    /// Return a region to the module's free pool.
    pub fn release(&self, store: &mut Store<T>, region: WasmPtr) -> Result<()> {
        self.dealloc_fn
            .call(&mut *store, (region.offset, region.len))
            .map_err(|e| RavelError::MemoryRelease {
                offset: region.offset,
                len: region.len,
                cause: e.to_string(),
            })
    }

    /// Allocate a buffer of exactly `data.len()` bytes and copy
    /// `data` into it.
    ///
    /// Zero-length data still gets a real (zero-length) allocation so
    /// the descriptor never carries an address the module did not hand
    /// out.
    pub fn copy_in(&self, store: &mut Store<T>, data: &[u8]) -> Result<WasmPtr> {
        let len = data.len() as u32;
        let offset = self.allocate(store, len)?;
        let region = WasmPtr::new(offset, len);
        if !data.is_empty() {
            if let Err(e) = self.write_at(store, offset, data) {
                // The allocator handed out a region the memory cannot
                // back; hand it straight back before bailing out.
                let _ = self.release(store, region);
                return Err(e);
            }
        }
        Ok(region)
    }

    /// Read bytes from a region of module memory.
    ///
    /// The region may come straight out of a module-written descriptor,
    /// so it is not trusted: the bounds check happens in u64 before any
    /// indexing.
    pub fn read_bytes(&self, store: &Store<T>, region: WasmPtr) -> Result<Vec<u8>> {
        if region.len == 0 {
            return Ok(Vec::new());
        }
        let mem_data = self.memory.data(store);
        if region.end() > mem_data.len() as u64 {
            return Err(RavelError::MemoryAccess {
                offset: region.offset,
                len: region.len,
            });
        }
        let start = region.offset as usize;
        Ok(mem_data[start..start + region.len as usize].to_vec())
    }

    /// Read a UTF-8 string from a region of module memory.
    pub fn read_string(&self, store: &Store<T>, region: WasmPtr) -> Result<String> {
        let bytes = self.read_bytes(store, region)?;
        String::from_utf8(bytes).map_err(|e| RavelError::InvalidUtf8 {
            cause: e.to_string(),
        })
    }

    /// Write bytes to a specific location (no allocation).
    pub fn write_at(&self, store: &mut Store<T>, offset: u32, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        let mem_data = self.memory.data_mut(store);
        let dest = mem_data
            .get_mut(offset as usize..end)
            .ok_or(RavelError::MemoryAccess {
                offset,
                len: data.len() as u32,
            })?;
        dest.copy_from_slice(data);
        Ok(())
    }

    /// Write a descriptor record at the given address.
    pub fn write_descriptor(
        &self,
        store: &mut Store<T>,
        addr: u32,
        descriptor: Descriptor,
    ) -> Result<()> {
        self.write_at(store, addr, &descriptor.to_le_bytes())
    }

    /// Read the descriptor record at the given address.
    ///
    /// Re-read after a call: the module overwrites both fields, and
    /// the result buffer lies wherever the module chose to put it.
    pub fn read_descriptor(&self, store: &Store<T>, addr: u32) -> Result<Descriptor> {
        let bytes = self.read_bytes(store, WasmPtr::new(addr, DESCRIPTOR_SIZE))?;
        let mut raw = [0u8; DESCRIPTOR_SIZE as usize];
        raw.copy_from_slice(&bytes);
        Ok(Descriptor::from_le_bytes(raw))
    }

    /// Get the current size of module memory in bytes.
    pub fn size(&self, store: &Store<T>) -> usize {
        self.memory.data_size(store)
    }
}

/// Tracks host-owned regions so they are released on every exit path.
///
/// An invocation body pushes each region it becomes responsible for;
/// after the body returns, [`AllocScope::release_all`] runs whether
/// the body succeeded or trapped. The input buffer is [`forget`]ten
/// at the entry-point call, where its ownership passes to the module.
///
/// [`forget`]: AllocScope::forget
#[derive(Debug, Default)]
pub struct AllocScope {
    regions: Vec<WasmPtr>,
}

impl AllocScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a region the host must release.
    pub fn track(&mut self, region: WasmPtr) {
        self.regions.push(region);
    }

    /// Stop tracking a region whose ownership left the host.
    pub fn forget(&mut self, region: WasmPtr) {
        self.regions.retain(|r| *r != region);
    }

    /// Number of regions currently tracked.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the scope tracks no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Release all tracked regions, best effort.
    ///
    /// Runs on the trap path too, where the allocator itself may be
    /// unusable; a failed release is logged and skipped rather than
    /// masking the invocation's own error.
    pub fn release_all<T>(&mut self, store: &mut Store<T>, bridge: &MemoryBridge<T>) {
        for region in self.regions.drain(..) {
            if let Err(e) = bridge.release(store, region) {
                tracing::warn!(
                    offset = region.offset,
                    len = region.len,
                    error = %e,
                    "failed to release module memory region"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasm_ptr_basic() {
        let ptr = WasmPtr::new(100, 50);
        assert_eq!(ptr.offset, 100);
        assert_eq!(ptr.len, 50);
        assert_eq!(ptr.end(), 150);
    }

    #[test]
    fn wasm_ptr_end_near_address_space_top() {
        // offset + len exceeds u32; end() must not wrap or panic.
        let ptr = WasmPtr::new(0xFFFF_FFF0, 64);
        assert_eq!(ptr.end(), 0xFFFF_FFF0u64 + 64);
    }

    #[test]
    fn descriptor_wire_layout() {
        let desc = Descriptor {
            ptr: 0x12345678,
            len: 0x0000_00AB,
        };
        let bytes = desc.to_le_bytes();
        // ptr little-endian at offset 0, len at offset 4
        assert_eq!(bytes, [0x78, 0x56, 0x34, 0x12, 0xAB, 0x00, 0x00, 0x00]);
        assert_eq!(Descriptor::from_le_bytes(bytes), desc);
    }

    #[test]
    fn alloc_scope_forget() {
        let mut scope = AllocScope::new();
        let a = WasmPtr::new(8, 8);
        let b = WasmPtr::new(16, 3);
        scope.track(a);
        scope.track(b);
        assert_eq!(scope.len(), 2);

        scope.forget(b);
        assert_eq!(scope.len(), 1);
        assert!(!scope.is_empty());

        scope.forget(a);
        assert!(scope.is_empty());
    }
}
