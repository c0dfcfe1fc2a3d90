//! Upload Validator & Placer
//!
//! Takes an [`UploadRequest`] through `Received -> Validated ->
//! DirectoryEnsured -> Written`. Anything wrong with the request itself
//! (bad name, wrong extension, too large) is rejected during validation,
//! before the filesystem is touched. The placer never updates the catalog
//! itself; callers refresh it once a file has been written.

mod conflict;
mod placer;

pub use self::conflict::{CollisionPolicy, MAX_RENAME_ATTEMPTS};
pub use self::placer::{Placed, Placer, UploadRequest};
