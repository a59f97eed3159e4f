//! 生のVulkanハンドルを、その破棄処理と親オブジェクトと一緒に所有するHandleを定義する。
//!
//! 破棄処理はハンドルが非nullのときに一度だけ呼ばれ、そのあいだ親オブジェクトは必ず生きている。
//! 親の参照は破棄処理の後に手放されるので、子が親より後に破棄されることはない。

use ash::vk;
use std::{fmt::Debug, ops::Deref};

/// Handleの破棄処理
pub type Finalizer<T, P> = Box<dyn FnOnce(T, &P) + Send + Sync>;

/// 生のVulkanハンドル`T`と、共有所有する親`P`と、破棄処理をまとめて所有する構造体。
///
/// `P`は親のHandleひとつか、親のHandleのタプル。
/// 親を持たない場合は`()`を使う。
pub struct Handle<T: vk::Handle + Copy, P = ()> {
    value: T,
    finalizer: Option<Finalizer<T, P>>,
    parents: P,
}
impl<T: vk::Handle + Copy, P> Handle<T, P> {
    /// ハンドルの所有権を受け取る。
    /// Dropの際に`finalizer(value, &parents)`が呼ばれる。
    pub fn new(value: T, finalizer: impl FnOnce(T, &P) + Send + Sync + 'static, parents: P) -> Self {
        Self {
            value,
            finalizer: Some(Box::new(finalizer)),
            parents,
        }
    }

    /// 破棄処理を持たないHandleを作る。
    /// 親の寿命を延ばすだけで、ハンドル自体は他のオブジェクトが破棄する
    /// (swapchainのimageやpoolから回収されるdescriptor setなど)。
    pub fn borrowed(value: T, parents: P) -> Self {
        Self {
            value,
            finalizer: None,
            parents,
        }
    }

    /// 生のハンドルを取得する
    pub fn raw(&self) -> T {
        self.value
    }

    /// ハンドルがnullかどうか
    pub fn is_null(&self) -> bool {
        self.value.as_raw() == 0
    }

    /// 親を取得する
    pub fn parents(&self) -> &P {
        &self.parents
    }
}
impl<T: vk::Handle + Copy, P: Default> Handle<T, P> {
    /// 中身を取り出して、代わりにnullのHandleを残す。
    /// 何も破棄されない。
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

// nullのHandleは破棄処理も親も持たない
impl<T: vk::Handle + Copy, P: Default> Default for Handle<T, P> {
    fn default() -> Self {
        Self {
            value: T::from_raw(0),
            finalizer: None,
            parents: P::default(),
        }
    }
}

// Debugトレイトの実装
impl<T: vk::Handle + Copy, P> Debug for Handle<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle")
            .field(&format_args!("{:#x}", self.value.as_raw()))
            .finish()
    }
}

// Handleは生のハンドルにDerefする
impl<T: vk::Handle + Copy, P> Deref for Handle<T, P> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

// 破棄処理を呼んでからnullに戻す。
// parentsのフィールドはこの後にdropされる。
impl<T: vk::Handle + Copy, P> Drop for Handle<T, P> {
    fn drop(&mut self) {
        if self.is_null() {
            return;
        }
        if let Some(finalizer) = self.finalizer.take() {
            finalizer(self.value, &self.parents);
        }
        self.value = T::from_raw(0);
    }
}
