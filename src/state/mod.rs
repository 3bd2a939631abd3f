pub mod prefs;
pub mod refresh;
pub mod storage;
pub mod store;
pub mod toast;

pub use refresh::{RefreshBus, Subscription};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::Store;
pub use toast::{Toast, ToastKind, Toasts};
