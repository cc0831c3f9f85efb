use thiserror::Error;

/// The error returned by checked lookups when the requested key is absent.
///
/// Lookups that merely report absence, such as [`AvlMap::get`](crate::AvlMap::get), return
/// `None` instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
#[error("key not found")]
pub struct KeyNotFound;
