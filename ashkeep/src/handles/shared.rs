//! 各種XxxHandleの中身を参照カウンタで共有するための入れ物。
//!
//! 参照カウントの実装には「詳解 Rustアトミック操作とロック ―並行処理実装のための低レイヤプログラミング」の
//! Arcの実装を参考にしている。
//! メモリのOrderingなどは、それに準拠している。

use std::{
    marker::PhantomData,
    ops::Deref,
    ptr::NonNull,
    sync::atomic::{fence, AtomicUsize, Ordering},
};

struct SharedData<D> {
    data: D,
    ref_count: AtomicUsize,
}

/// 参照カウントで中身を共有するポインタ。
/// 参照がすべて破棄された際に中身をdropする。
pub(crate) struct Shared<D> {
    ptr: NonNull<SharedData<D>>,
    _marker: PhantomData<SharedData<D>>,
}
impl<D> Shared<D> {
    pub(crate) fn new(data: D) -> Self {
        let data = Box::new(SharedData {
            data,
            ref_count: AtomicUsize::new(1),
        });
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(data)) };
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// 同じ中身を指しているかどうか
    pub(crate) fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }

    fn inner(&self) -> &SharedData<D> {
        unsafe { self.ptr.as_ref() }
    }
}

// 中身がSendかつSyncならSharedもSend
unsafe impl<D: Send + Sync> Send for Shared<D> {}
// 中身がSendかつSyncならSharedもSync
unsafe impl<D: Send + Sync> Sync for Shared<D> {}

impl<D> Deref for Shared<D> {
    type Target = D;
    fn deref(&self) -> &Self::Target {
        &self.inner().data
    }
}

// Cloneで参照カウントを増やす
impl<D> Clone for Shared<D> {
    fn clone(&self) -> Self {
        if self.inner().ref_count.fetch_add(1, Ordering::Relaxed) > usize::MAX / 2 {
            panic!("Too many references to {}", std::any::type_name::<D>());
        }
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

// Drop時に参照カウントを減らし、0になったら中身を破棄する
impl<D> Drop for Shared<D> {
    fn drop(&mut self) {
        if self.inner().ref_count.fetch_sub(1, Ordering::Release) == 1 {
            fence(Ordering::Acquire);
            unsafe {
                drop(Box::from_raw(self.ptr.as_ptr()));
            }
        }
    }
}
