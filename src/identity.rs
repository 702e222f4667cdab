//! 构建目标的稳定标识
//!
//! Identity 是随机 v4 UUID 的 22 位 base62 编码。Identity 不写入目标本身，而是记录在
//! 进程级的旁路表中：键为目标的共享分配地址（构造器目标则为其类型）。

use crate::error::IdentityError;
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::any::TypeId;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// 编码长度，62^22 是第一个大于 2^128 的幂
pub const IDENTITY_WIDTH: usize = 22;

const MIN_PRUNE_THRESHOLD: usize = 64;

lazy_static! {
    static ref ATTACHMENTS: DashMap<Anchor, Attachment> = DashMap::new();
    static ref PRUNE_AT: AtomicUsize = AtomicUsize::new(MIN_PRUNE_THRESHOLD);
}

/// Identity 的挂载点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Anchor {
    /// 共享分配的地址
    Shared(usize),
    /// 构造器目标，按类型区分
    Type(TypeId),
}

struct Attachment {
    identity: Identity,
    /// 共享挂载点的存活检查。持有弱引用会保留分配，记录存在期间地址不会被复用。
    alive: Option<Box<dyn Fn() -> bool + Send + Sync>>,
}

impl Attachment {
    fn is_alive(&self) -> bool {
        self.alive.as_ref().map_or(true, |alive| alive())
    }
}

/// 按引用区分的稳定标识，用作缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// 生成新的随机 Identity
    pub fn create() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// 编码已解析的 UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        let mut value = uuid.as_u128();
        let mut digits = [ALPHABET[0]; IDENTITY_WIDTH];
        for slot in digits.iter_mut().rev() {
            *slot = ALPHABET[(value % 62) as usize];
            value /= 62;
            if value == 0 {
                break;
            }
        }
        // 每个字节都来自 ALPHABET
        Self(digits.iter().map(|&b| b as char).collect())
    }

    /// 将 UUID 字符串（`8-4-4-4-12` 十六进制）编码为 22 位形式
    pub fn encode(uuid: &str) -> Result<Self, IdentityError> {
        let uuid =
            Uuid::parse_str(uuid).map_err(|_| IdentityError::InvalidUuid(uuid.to_string()))?;
        Ok(Self::from_uuid(uuid))
    }

    /// 将 22 位 Identity 解码为带连字符的 UUID 字符串
    pub fn decode(id: &str) -> Result<String, IdentityError> {
        Ok(Self::decode_uuid(id)?.hyphenated().to_string())
    }

    fn decode_uuid(id: &str) -> Result<Uuid, IdentityError> {
        if let Some(c) = id.chars().find(|&c| digit_of(c).is_none()) {
            return Err(IdentityError::InvalidCharacter(c));
        }
        if id.len() != IDENTITY_WIDTH {
            return Err(IdentityError::InvalidLength(id.len()));
        }

        let mut value: u128 = 0;
        for c in id.chars() {
            let digit = digit_of(c).ok_or(IdentityError::InvalidCharacter(c))?;
            value = value
                .checked_mul(62)
                .and_then(|v| v.checked_add(digit))
                .ok_or(IdentityError::Overflow)?;
        }
        Ok(Uuid::from_u128(value))
    }

    /// 返回共享目标的 Identity，首次请求时创建。
    /// 同一 `Arc` 的克隆共享 Identity，不同分配永不相同。
    pub fn extract<T>(target: &Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let anchor = Anchor::Shared(Arc::as_ptr(target) as *const () as usize);
        Self::attach(anchor, || {
            let weak = Arc::downgrade(target);
            let liveness: Box<dyn Fn() -> bool + Send + Sync> =
                Box::new(move || weak.strong_count() > 0);
            Some(liveness)
        })
    }

    /// 返回类型 `T` 的 Identity，用于构造器目标
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Self::of_type_id(TypeId::of::<T>())
    }

    pub(crate) fn of_type_id(type_id: TypeId) -> Self {
        Self::attach(Anchor::Type(type_id), || None)
    }

    fn attach<F>(anchor: Anchor, liveness: F) -> Self
    where
        F: FnOnce() -> Option<Box<dyn Fn() -> bool + Send + Sync>>,
    {
        if let Some(attachment) = ATTACHMENTS.get(&anchor) {
            return attachment.identity.clone();
        }

        prune_if_due();

        ATTACHMENTS
            .entry(anchor)
            .or_insert_with(|| {
                let identity = Identity::create();
                tracing::trace!(identity = %identity, anchor = ?anchor, "Identity attached");
                Attachment {
                    identity,
                    alive: liveness(),
                }
            })
            .identity
            .clone()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 对应的 UUID
    pub fn to_uuid(&self) -> Uuid {
        // 只会由合法编码构造
        Self::decode_uuid(&self.0).unwrap_or_else(|_| Uuid::nil())
    }
}

fn digit_of(c: char) -> Option<u128> {
    match c {
        '0'..='9' => Some(c as u128 - '0' as u128),
        'A'..='Z' => Some(c as u128 - 'A' as u128 + 10),
        'a'..='z' => Some(c as u128 - 'a' as u128 + 36),
        _ => None,
    }
}

/// 表大小翻倍时清理目标已释放的记录
fn prune_if_due() {
    let threshold = PRUNE_AT.load(Ordering::Relaxed);
    if ATTACHMENTS.len() < threshold {
        return;
    }
    ATTACHMENTS.retain(|_, attachment| attachment.is_alive());
    let next = (ATTACHMENTS.len() * 2).max(MIN_PRUNE_THRESHOLD);
    PRUNE_AT.store(next, Ordering::Relaxed);
    tracing::debug!(remaining = ATTACHMENTS.len(), next_prune = next, "Identity table pruned");
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_uuid(s)?;
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
