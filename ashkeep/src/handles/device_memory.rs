//! 参照カウンタで管理して、参照がすべて破棄された際に
//! DeviceMemoryの解放の処理まで行うDeviceMemoryHandleと、
//! そのメモリをCPUから読み書きするためのMemoryMapを定義する。
//!
//! mapは冪等で参照カウントされている。
//! あるMemoryMapが生きている間に再度mapすると、同じネイティブのmapを共有したMemoryMapが返る。
//! 確保したメモリ全体を一度だけmapし、各MemoryMapはその先頭からのoffsetを指す。
//! 最後のMemoryMapが破棄されたときに一度だけunmapされる。

use crate::{Handle, InvalidUsage, Result, VkResultExt};
use ash::vk;
use std::{
    fmt::Debug,
    ops::Deref,
    ptr::NonNull,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use super::shared::Shared;

// mapされたメモリの先頭
#[derive(Clone, Copy)]
struct MappedPtr(NonNull<u8>);
// mapされたポインタはどのスレッドからでも使える
unsafe impl Send for MappedPtr {}
unsafe impl Sync for MappedPtr {}

#[derive(Default)]
struct MappingState {
    base: Option<MappedPtr>,
    live: Weak<MappedRegion>,
    // unmapする資格のあるMappedRegionを区別するための世代
    generation: u64,
}

struct DeviceMemoryHandleData {
    memory: Handle<vk::DeviceMemory, crate::DeviceHandle>,
    size: vk::DeviceSize,
    memory_type_index: u32,
    property_flags: vk::MemoryPropertyFlags,
    mapping: Mutex<MappingState>,
}

/// vk::DeviceMemoryを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct DeviceMemoryHandle(Shared<DeviceMemoryHandleData>);
impl DeviceMemoryHandle {
    pub(crate) fn allocate(
        device: crate::DeviceHandle,
        size: vk::DeviceSize,
        memory_type_index: u32,
    ) -> Result<Self> {
        let memory_properties = device.memory_properties();
        let property_flags = memory_properties
            .memory_types
            .get(memory_type_index as usize)
            .filter(|_| memory_type_index < memory_properties.memory_type_count)
            .map(|memory_type| memory_type.property_flags)
            .ok_or(InvalidUsage::UnknownMemoryType(memory_type_index))?;

        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(size)
            .memory_type_index(memory_type_index);
        let memory = unsafe {
            ash::Device::allocate_memory(&device, &allocate_info, None)
                .created("vkAllocateMemory")?
        };

        let memory = Handle::new(
            memory,
            |memory, device: &crate::DeviceHandle| unsafe { device.free_memory(memory, None) },
            device,
        );
        Ok(Self(Shared::new(DeviceMemoryHandleData {
            memory,
            size,
            memory_type_index,
            property_flags,
            mapping: Mutex::new(MappingState::default()),
        })))
    }

    /// メモリの`offset`から`size`バイトをCPUから見えるようにmapする。
    /// `size`がNoneのときは`offset`から確保したメモリの最後まで。
    ///
    /// 既に生きているMemoryMapがあれば同じネイティブのmapを共有する。
    pub fn map(&self, offset: vk::DeviceSize, size: Option<vk::DeviceSize>) -> Result<MemoryMap> {
        let allocation_size = self.0.size;
        let size = size.unwrap_or(allocation_size.saturating_sub(offset));
        let in_bounds = offset
            .checked_add(size)
            .map_or(false, |end| end <= allocation_size);
        if size == 0 || !in_bounds {
            return Err(InvalidUsage::MapOutOfBounds {
                offset,
                size,
                allocation_size,
            }
            .into());
        }
        if !self
            .0
            .property_flags
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
        {
            return Err(InvalidUsage::NotHostVisible(self.0.memory_type_index).into());
        }

        let region = self.region(&mut self.lock_mapping())?;
        Ok(MemoryMap {
            region,
            offset,
            size,
        })
    }

    // 生きているネイティブのmapを返す。なければmapする。
    fn region(&self, state: &mut MappingState) -> Result<Arc<MappedRegion>> {
        if let Some(region) = state.live.upgrade() {
            return Ok(region);
        }
        // 直前のMemoryMapが破棄中の場合はunmapされる前のポインタをそのまま引き継ぐ
        let base = match state.base {
            Some(base) => base,
            None => self.map_whole()?,
        };
        state.base = Some(base);
        state.generation += 1;
        let region = Arc::new(MappedRegion {
            memory: self.clone(),
            base,
            generation: state.generation,
        });
        state.live = Arc::downgrade(&region);
        Ok(region)
    }

    fn map_whole(&self) -> Result<MappedPtr> {
        let ptr = unsafe {
            self.device()
                .map_memory(
                    self.0.memory.raw(),
                    0,
                    vk::WHOLE_SIZE,
                    vk::MemoryMapFlags::empty(),
                )
                .created("vkMapMemory")?
        };
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or(crate::Error::ResourceCreationFailed {
            call: "vkMapMemory",
            result: vk::Result::ERROR_MEMORY_MAP_FAILED,
        })?;
        log::debug!("mapped device memory {:?}", self.0.memory);
        Ok(MappedPtr(ptr))
    }

    fn lock_mapping(&self) -> MutexGuard<'_, MappingState> {
        self.0.mapping.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ネイティブのmapが存在するかどうか
    pub fn is_mapped(&self) -> bool {
        self.lock_mapping().base.is_some()
    }

    /// 確保したメモリのサイズ
    pub fn size(&self) -> vk::DeviceSize {
        self.0.size
    }

    /// メモリタイプのindex
    pub fn memory_type_index(&self) -> u32 {
        self.0.memory_type_index
    }

    /// メモリタイプのプロパティ
    pub fn property_flags(&self) -> vk::MemoryPropertyFlags {
        self.0.property_flags
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.memory.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for DeviceMemoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemoryHandle")
            .field("size", &self.0.size)
            .field("memory_type_index", &self.0.memory_type_index)
            .finish()
    }
}

// DeviceMemoryHandleはvk::DeviceMemoryにDerefする
impl Deref for DeviceMemoryHandle {
    type Target = vk::DeviceMemory;
    fn deref(&self) -> &Self::Target {
        &self.0.memory
    }
}

// ひとつのネイティブのmapを表す。
// すべてのMemoryMapから共有され、最後のMemoryMapと一緒に破棄される。
struct MappedRegion {
    memory: DeviceMemoryHandle,
    base: MappedPtr,
    generation: u64,
}
impl Drop for MappedRegion {
    fn drop(&mut self) {
        let mut state = self.memory.lock_mapping();
        // 破棄中に別のmapが引き継いだ場合はそちらがunmapする
        if state.generation != self.generation || state.base.is_none() {
            return;
        }
        state.base = None;
        unsafe {
            self.memory
                .device()
                .unmap_memory(self.memory.0.memory.raw());
        }
        log::debug!("unmapped device memory {:?}", self.memory.0.memory);
    }
}

/// DeviceMemoryのmapされた範囲。
/// 元のDeviceMemoryHandleを保持するので、生きている間はメモリが解放されない。
#[derive(Clone)]
pub struct MemoryMap {
    region: Arc<MappedRegion>,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
}
impl MemoryMap {
    /// この範囲の先頭のポインタ。
    /// ポインタ経由の読み書きは他のMemoryMapと排他されないので呼び出し側で同期する。
    pub fn as_ptr(&self) -> *mut u8 {
        unsafe { self.region.base.0.as_ptr().add(self.offset as usize) }
    }

    /// DeviceMemoryの先頭からのoffset
    pub fn offset(&self) -> vk::DeviceSize {
        self.offset
    }

    /// この範囲のサイズ
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// mapしているDeviceMemoryHandle
    pub fn memory(&self) -> &DeviceMemoryHandle {
        &self.region.memory
    }

    /// この範囲の`offset`バイト目から`data`を書き込む。
    /// 同じメモリのMemoryMapからの読み書きは互いに排他される。
    pub fn write<T: bytemuck::Pod>(&self, offset: vk::DeviceSize, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.check_access(offset, bytes.len())?;
        let _access = self.region.memory.lock_mapping();
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.as_ptr().add(offset as usize),
                bytes.len(),
            );
        }
        Ok(())
    }

    /// この範囲の`offset`バイト目から`data`に読み込む
    pub fn read<T: bytemuck::Pod>(&self, offset: vk::DeviceSize, data: &mut [T]) -> Result<()> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
        self.check_access(offset, bytes.len())?;
        let _access = self.region.memory.lock_mapping();
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.as_ptr().add(offset as usize),
                bytes.as_mut_ptr(),
                bytes.len(),
            );
        }
        Ok(())
    }

    /// HOST_COHERENTではないメモリへの書き込みをGPUから見えるようにする
    pub fn flush(&self) -> Result<()> {
        let range = vk::MappedMemoryRange::builder()
            .memory(self.region.memory.0.memory.raw())
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .build();
        unsafe {
            self.region
                .memory
                .device()
                .flush_mapped_memory_ranges(&[range])
                .called("vkFlushMappedMemoryRanges")
        }
    }

    fn check_access(&self, offset: vk::DeviceSize, len: usize) -> Result<()> {
        let len = len as vk::DeviceSize;
        let in_bounds = offset
            .checked_add(len)
            .map_or(false, |end| end <= self.size);
        if in_bounds {
            Ok(())
        } else {
            Err(InvalidUsage::ViewOutOfBounds {
                offset,
                len,
                size: self.size,
            }
            .into())
        }
    }
}

// Debugトレイトの実装
impl Debug for MemoryMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMap")
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish()
    }
}
