//! 定长上限字符串
//!
//! 导航图的字符串字段有固定的字节上限（节点 ID 31 字节，边字段 15 字节）。
//! 超长输入按协议被截断而不是拒绝；`BoundedStr::truncating` 通过返回值显式告知是否发生了截断，
//! 由调用方决定如何上报。

use std::fmt;
use std::ops::Deref;
use thiserror::Error;

/// 字符串超出字节上限
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("String too long: {len} bytes (max {max})")]
pub struct BoundedStrError {
    pub len: usize,
    pub max: usize,
}

/// 字节长度不超过 `N` 的 UTF-8 字符串
///
/// 截断总是落在字符边界上，因此存储的值永远是合法文本，长度可能略小于 `N`。
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BoundedStr<const N: usize>(String);

impl<const N: usize> BoundedStr<N> {
    /// 最大字节数
    pub const CAPACITY: usize = N;

    /// 严格构造：超长则返回错误
    pub fn try_new(value: &str) -> Result<Self, BoundedStrError> {
        if value.len() > N {
            return Err(BoundedStrError {
                len: value.len(),
                max: N,
            });
        }
        Ok(Self(value.to_string()))
    }

    /// 截断构造
    ///
    /// # 返回
    ///
    /// `(值, 是否发生截断)`
    pub fn truncating(value: &str) -> (Self, bool) {
        if value.len() <= N {
            return (Self(value.to_string()), false);
        }
        let mut end = N;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        (Self(value[..end].to_string()), true)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> Deref for BoundedStr<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> AsRef<str> for BoundedStr<N> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> TryFrom<&str> for BoundedStr<N> {
    type Error = BoundedStrError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl<const N: usize> PartialEq<str> for BoundedStr<N> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedStr<N> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl<const N: usize> fmt::Display for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> fmt::Debug for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(feature = "serde")]
impl<const N: usize> serde::Serialize for BoundedStr<N> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de, const N: usize> serde::Deserialize<'de> for BoundedStr<N> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::try_new(&value).map_err(serde::de::Error::custom)
    }
}
