//! # Credential Source
//! Where the PEM material lives and how its bytes are read.

mod files;
pub mod storage;

pub(crate) use self::files::Material;
pub use self::files::{X509Files, X509FilesOption};
pub use self::storage::{MemStorage, OsStorage, Storage};
