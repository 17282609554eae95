pub mod base43;
pub mod result_ext;

pub use result_ext::ResultExt;
