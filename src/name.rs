//! # Hierarchical service names.
//!
//! A [`ServiceName`] is an immutable linked list of segments, leaf first:
//!
//! ```text
//! svc.web.http  ──►  Node("http") ──parent──► Node("web") ──parent──► Node("svc")
//! ```
//!
//! ## Rules
//! - Equality is structural over the full chain (same segments, same order).
//! - The hash is computed once at construction from the parent hash and the segment,
//!   so names built by different `append` paths hash identically.
//! - Rendering joins segments with `.` from root to leaf.
//!
//! ## Example
//! ```rust
//! use servicevisor::ServiceName;
//!
//! let web = ServiceName::of(["app", "web"]).unwrap();
//! let http = web.append(["http"]).unwrap();
//!
//! assert_eq!(http.to_string(), "app.web.http");
//! assert_eq!(http.parent(), Some(&web));
//! assert!(web.is_parent_of(&http));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::error::NameError;

/// Segment of the designated root name.
const ROOT_SEGMENT: &str = "svc";

/// Immutable hierarchical service identifier.
///
/// Cheap to clone (one `Arc`), structurally compared, hash cached.
#[derive(Clone)]
pub struct ServiceName {
    node: Arc<Node>,
}

struct Node {
    parent: Option<ServiceName>,
    segment: Box<str>,
    depth: usize,
    hash: u64,
}

impl ServiceName {
    /// Returns the designated root name (`svc`).
    pub fn root() -> ServiceName {
        static ROOT: OnceLock<ServiceName> = OnceLock::new();
        ROOT.get_or_init(|| ServiceName::segment(None, ROOT_SEGMENT))
            .clone()
    }

    /// Builds a name from one or more segments, applied left to right.
    ///
    /// Fails with [`NameError::NoSegments`] when `parts` is empty and with
    /// [`NameError::EmptySegment`] when any segment is `""`.
    pub fn of<I, S>(parts: I) -> Result<ServiceName, NameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(None, parts)
    }

    /// Builds a name below `parent` from one or more segments.
    pub fn of_parent<I, S>(parent: &ServiceName, parts: I) -> Result<ServiceName, NameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(Some(parent.clone()), parts)
    }

    /// Returns a new name with `parts` appended below `self`.
    pub fn append<I, S>(&self, parts: I) -> Result<ServiceName, NameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(Some(self.clone()), parts)
    }

    /// Returns a new name with every segment of `other` appended below `self`.
    ///
    /// `a.append_name(&b)` equals `a.append(b.segments())`.
    pub fn append_name(&self, other: &ServiceName) -> ServiceName {
        other
            .segments()
            .into_iter()
            .fold(self.clone(), |acc, seg| ServiceName::segment(Some(acc), seg))
    }

    /// Returns the enclosing name, or `None` for a single-segment name.
    pub fn parent(&self) -> Option<&ServiceName> {
        self.node.parent.as_ref()
    }

    /// Returns the last segment.
    pub fn simple_name(&self) -> &str {
        &self.node.segment
    }

    /// Returns the number of segments.
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    /// Returns all segments, root first.
    pub fn segments(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.node.depth);
        let mut cur = Some(self);
        while let Some(name) = cur {
            out.push(name.simple_name());
            cur = name.parent();
        }
        out.reverse();
        out
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    pub fn is_parent_of(&self, other: &ServiceName) -> bool {
        let mut cur = other.parent();
        while let Some(name) = cur {
            if name.depth() < self.depth() {
                return false;
            }
            if name == self {
                return true;
            }
            cur = name.parent();
        }
        false
    }

    fn build<I, S>(parent: Option<ServiceName>, parts: I) -> Result<ServiceName, NameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = parent;
        let mut added = 0usize;
        for part in parts {
            let part = part.as_ref();
            if part.is_empty() {
                return Err(NameError::EmptySegment);
            }
            current = Some(ServiceName::segment(current, part));
            added += 1;
        }
        match current {
            Some(name) if added > 0 => Ok(name),
            _ => Err(NameError::NoSegments),
        }
    }

    fn segment(parent: Option<ServiceName>, segment: &str) -> ServiceName {
        let (depth, seed) = match &parent {
            Some(p) => (p.node.depth + 1, p.node.hash),
            None => (1, 1),
        };
        let hash = seed.wrapping_mul(31).wrapping_add(segment_hash(segment));
        ServiceName {
            node: Arc::new(Node {
                parent,
                segment: segment.into(),
                depth,
                hash,
            }),
        }
    }
}

/// FNV-1a over the segment bytes; stable across processes.
fn segment_hash(segment: &str) -> u64 {
    segment
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
}

impl PartialEq for ServiceName {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            if Arc::ptr_eq(&a.node, &b.node) {
                return true;
            }
            if a.node.hash != b.node.hash
                || a.node.depth != b.node.depth
                || a.node.segment != b.node.segment
            {
                return false;
            }
            match (a.parent(), b.parent()) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Eq for ServiceName {}

impl Hash for ServiceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.node.hash);
    }
}

impl Ord for ServiceName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(&other.segments())
    }
}

impl PartialOrd for ServiceName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments().into_iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceName({self})")
    }
}
