//! 必要に応じてDescriptorPoolを増やしながらDescriptorSetを割り当てるAutoDescriptorPool。
//!
//! DescriptorSetの型ごとにDescriptorSetLayoutとpoolの列を持ち、
//! 現在のpoolを使い切ると前回の倍のサイズのpoolを作って割り当てを続ける。
//! 割り当てたDescriptorSetHandleはpoolとlayoutを保持するので、
//! AutoDescriptorPoolを先に破棄しても構わない。

use crate::{InvalidUsage, Result};
use ash::vk;
use std::collections::HashMap;

/// AutoDescriptorPoolの設定
#[derive(Debug, Clone)]
pub struct AutoDescriptorPoolConfig {
    /// 型ごとに最初に作るpoolのset数
    pub initial_pool_size: u32,
    /// poolの作成時に指定するflags
    pub pool_flags: vk::DescriptorPoolCreateFlags,
}
impl Default for AutoDescriptorPoolConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: 8,
            pool_flags: vk::DescriptorPoolCreateFlags::empty(),
        }
    }
}

// 登録されたDescriptorSetの型ごとの状態
struct DescriptorSetTypeGroup {
    layout: crate::DescriptorSetLayoutHandle,
    // set1つあたりのdescriptor数
    pool_sizes: Vec<vk::DescriptorPoolSize>,
    pools: Vec<crate::DescriptorPoolHandle>,
    remaining_sets: u32,
    next_pool_size: u32,
}
impl DescriptorSetTypeGroup {
    // 次のサイズのpoolを作って現在のpoolにする
    fn grow(
        &mut self,
        device: &crate::DeviceHandle,
        pool_flags: vk::DescriptorPoolCreateFlags,
    ) -> Result<crate::DescriptorPoolHandle> {
        let max_sets = self.next_pool_size;
        let pool_sizes = self
            .pool_sizes
            .iter()
            .map(|size| vk::DescriptorPoolSize {
                ty: size.ty,
                descriptor_count: size.descriptor_count.saturating_mul(max_sets),
            })
            .collect::<Vec<_>>();
        let pool = device.create_descriptor_pool(
            &vk::DescriptorPoolCreateInfo::builder()
                .flags(pool_flags)
                .max_sets(max_sets)
                .pool_sizes(&pool_sizes),
        )?;
        log::debug!(
            "descriptor pool #{} created with {} sets",
            self.pools.len() + 1,
            max_sets
        );

        self.pools.push(pool.clone());
        self.remaining_sets = max_sets;
        self.next_pool_size = max_sets.saturating_mul(2);
        Ok(pool)
    }
}

/// DescriptorSetの型を登録して、その型のDescriptorSetを必要なだけ割り当てる構造体
pub struct AutoDescriptorPool {
    device: crate::DeviceHandle,
    config: AutoDescriptorPoolConfig,
    types: HashMap<u32, DescriptorSetTypeGroup>,
}
impl AutoDescriptorPool {
    /// 初期のpoolサイズが8のAutoDescriptorPoolを作成する
    pub fn new(device: &crate::DeviceHandle) -> Self {
        Self::with_config(device, AutoDescriptorPoolConfig::default())
    }

    /// 設定を指定してAutoDescriptorPoolを作成する。
    /// `initial_pool_size`が0の場合は1として扱う。
    pub fn with_config(device: &crate::DeviceHandle, config: AutoDescriptorPoolConfig) -> Self {
        let config = AutoDescriptorPoolConfig {
            initial_pool_size: config.initial_pool_size.max(1),
            ..config
        };
        Self {
            device: device.clone(),
            config,
            types: HashMap::new(),
        }
    }

    /// DescriptorSetの型を登録する。
    /// bindingsからDescriptorSetLayoutを作り、descriptorの種類ごとの数を集計しておく。
    pub fn register_type(
        &mut self,
        type_id: u32,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> Result<()> {
        if self.types.contains_key(&type_id) {
            return Err(InvalidUsage::DescriptorSetTypeAlreadyRegistered(type_id).into());
        }

        // descriptorの種類ごとに数を合計する
        let mut pool_sizes: Vec<vk::DescriptorPoolSize> = vec![];
        for binding in bindings {
            match pool_sizes
                .iter_mut()
                .find(|size| size.ty == binding.descriptor_type)
            {
                Some(size) => size.descriptor_count += binding.descriptor_count,
                None => pool_sizes.push(vk::DescriptorPoolSize {
                    ty: binding.descriptor_type,
                    descriptor_count: binding.descriptor_count,
                }),
            }
        }

        let layout = self.device.create_descriptor_set_layout(
            &vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings),
        )?;
        self.types.insert(
            type_id,
            DescriptorSetTypeGroup {
                layout,
                pool_sizes,
                pools: vec![],
                remaining_sets: 0,
                next_pool_size: self.config.initial_pool_size,
            },
        );
        Ok(())
    }

    /// 登録した型のDescriptorSetを`count`個割り当てる。
    /// 現在のpoolが足りなければpoolを追加して割り当てを続ける。
    pub fn create(&mut self, type_id: u32, count: u32) -> Result<Vec<crate::DescriptorSetHandle>> {
        let group = self
            .types
            .get_mut(&type_id)
            .ok_or(InvalidUsage::UnknownDescriptorSetType(type_id))?;

        let mut sets = Vec::with_capacity(count as usize);
        let mut count = count;
        while count > 0 {
            let current = if group.remaining_sets > 0 {
                group.pools.last().cloned()
            } else {
                None
            };
            let pool = match current {
                Some(pool) => pool,
                None => group.grow(&self.device, self.config.pool_flags)?,
            };

            let batch_size = count.min(group.remaining_sets);
            let layouts = vec![group.layout.clone(); batch_size as usize];
            sets.extend(pool.allocate_descriptor_sets(&layouts)?);
            count -= batch_size;
            group.remaining_sets -= batch_size;
        }
        Ok(sets)
    }

    /// 登録した型のDescriptorSetをひとつ割り当てる
    pub fn create_one(&mut self, type_id: u32) -> Result<crate::DescriptorSetHandle> {
        let mut sets = self.create(type_id, 1)?;
        sets.pop()
            .ok_or(InvalidUsage::UnknownDescriptorSetType(type_id).into())
    }

    /// 登録した型のDescriptorSetLayoutHandle
    pub fn layout(&self, type_id: u32) -> Result<crate::DescriptorSetLayoutHandle> {
        self.group(type_id).map(|group| group.layout.clone())
    }

    /// 登録した型のためにこれまでに作ったpoolの数
    pub fn pool_count(&self, type_id: u32) -> Result<usize> {
        self.group(type_id).map(|group| group.pools.len())
    }

    fn group(&self, type_id: u32) -> Result<&DescriptorSetTypeGroup> {
        self.types
            .get(&type_id)
            .ok_or(InvalidUsage::UnknownDescriptorSetType(type_id).into())
    }
}
