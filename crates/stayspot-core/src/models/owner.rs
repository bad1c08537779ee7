use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::{DEFAULT_MAX_BLOG_IMAGES, DEFAULT_MAX_LISTING_PHOTOS};

/// Kind of record that owns media references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// One profile image.
    User,
    /// Ordered photo set, index 0 is the cover.
    Listing,
    /// Ordered image set, index 0 is the cover.
    BlogPost,
}

impl OwnerKind {
    pub fn holds_set(self) -> bool {
        matches!(self, OwnerKind::Listing | OwnerKind::BlogPost)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Listing => "listing",
            OwnerKind::BlogPost => "blog_post",
        }
    }
}

impl Display for OwnerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Reference to an owning record held outside this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::User, id)
    }

    pub fn listing(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Listing, id)
    }

    pub fn blog_post(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::BlogPost, id)
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An owner paired with the authenticated caller acting on it.
///
/// Built by the route layer after authentication; the media service still verifies that
/// `caller` is the owner's principal before mutating anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerBinding {
    pub owner: OwnerRef,
    pub caller: String,
}

impl OwnerBinding {
    pub fn new(owner: OwnerRef, caller: impl Into<String>) -> Self {
        Self {
            owner,
            caller: caller.into(),
        }
    }
}

/// Limits for photo-set uploads. `listing()` and `blog()` are the unconfigured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetLimits {
    pub max_count: usize,
}

impl SetLimits {
    pub const fn new(max_count: usize) -> Self {
        Self { max_count }
    }

    pub const fn listing() -> Self {
        Self::new(DEFAULT_MAX_LISTING_PHOTOS)
    }

    pub const fn blog() -> Self {
        Self::new(DEFAULT_MAX_BLOG_IMAGES)
    }
}
