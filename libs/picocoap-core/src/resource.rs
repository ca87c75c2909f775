//! Static resource tree
//!
//! Resources are attached to the root once at startup and live as long as
//! the server. Each resource carries its permissions, supported content
//! formats and freshness budget; behaviour is selected by [`ResourceKind`].

use crate::error::ConfigError;
use crate::protocol::{Code, ContentFormatSet};

/// Longest single path segment
pub const MAX_SEGMENT_LENGTH: usize = 16;

/// Resource name
/// A single path segment, never empty and never containing `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceName(heapless::String<MAX_SEGMENT_LENGTH>);

impl ResourceName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for ResourceName {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() || value.contains('/') {
            return Err(ConfigError::InvalidResourceName);
        }
        let name =
            heapless::String::try_from(value).map_err(|_| ConfigError::ResourceNameTooLong {
                max_length: MAX_SEGMENT_LENGTH,
                actual_length: value.len(),
            })?;
        Ok(ResourceName(name))
    }
}

impl core::ops::Deref for ResourceName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl core::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a resource in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResourceId(u8);

impl ResourceId {
    pub const ROOT: ResourceId = ResourceId(0);

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allowed operations bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Permissions(u8);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const GET: Permissions = Permissions(1 << 0);
    pub const POST: Permissions = Permissions(1 << 1);
    pub const PUT: Permissions = Permissions(1 << 2);
    pub const DELETE: Permissions = Permissions(1 << 3);
    pub const OBSERVE: Permissions = Permissions(1 << 4);

    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether a request with this method code may be served
    pub fn allows(self, code: Code) -> bool {
        match code {
            Code::Get => self.contains(Permissions::GET),
            Code::Post => self.contains(Permissions::POST),
            Code::Put => self.contains(Permissions::PUT),
            Code::Delete => self.contains(Permissions::DELETE),
            _ => false,
        }
    }
}

impl core::ops::BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions(self.0 | rhs.0)
    }
}

/// Which handler serves a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceKind {
    /// Path component only
    #[default]
    Container,
    /// `/.well-known/core`
    Discovery,
    /// The on/off light backed by the actuator
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: ResourceName,
    parent: Option<ResourceId>,
    kind: ResourceKind,
    permissions: Permissions,
    formats: ContentFormatSet,
    max_age: u32,
    expire_time: u32,
}

impl Resource {
    pub fn new(name: &str, kind: ResourceKind) -> Result<Self, ConfigError> {
        Ok(Self {
            name: ResourceName::try_from(name)?,
            parent: None,
            kind,
            permissions: Permissions::NONE,
            formats: ContentFormatSet::EMPTY,
            max_age: 0,
            expire_time: 0,
        })
    }

    fn root() -> Self {
        Self {
            name: ResourceName::default(),
            parent: None,
            kind: ResourceKind::Container,
            permissions: Permissions::NONE,
            formats: ContentFormatSet::EMPTY,
            max_age: 0,
            expire_time: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_formats(mut self, formats: ContentFormatSet) -> Self {
        self.formats = formats;
        self
    }

    /// Freshness budget in ticks; the countdown starts full
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = max_age;
        self.expire_time = max_age;
        self
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn parent(&self) -> Option<ResourceId> {
        self.parent
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn formats(&self) -> ContentFormatSet {
        self.formats
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    /// Remaining freshness in ticks
    pub fn expire_time(&self) -> u32 {
        self.expire_time
    }

    pub fn is_observable(&self) -> bool {
        self.permissions.contains(Permissions::OBSERVE)
    }

    pub fn is_discoverable(&self) -> bool {
        !self.permissions.is_empty()
    }

    /// Advance the freshness countdown by one tick.
    ///
    /// Returns true when the countdown had reached `margin`, in which case it
    /// is re-armed to `max_age` instead of decremented.
    pub(crate) fn tick_freshness(&mut self, margin: u32) -> bool {
        if self.expire_time <= margin {
            self.expire_time = self.max_age;
            true
        } else {
            self.expire_time -= 1;
            false
        }
    }
}

/// Fixed-capacity resource tree
///
/// Slot 0 is the root (`/`). `MAX_RESOURCES` counts the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTree<const MAX_RESOURCES: usize> {
    resources: heapless::Vec<Resource, MAX_RESOURCES>,
}

impl<const MAX_RESOURCES: usize> ResourceTree<MAX_RESOURCES> {
    pub fn new() -> Result<Self, ConfigError> {
        let mut resources = heapless::Vec::new();
        resources
            .push(Resource::root())
            .map_err(|_| ConfigError::MaxResourcesReached {
                max_resources: MAX_RESOURCES,
            })?;
        Ok(Self { resources })
    }

    /// Attach `resource` below `parent`
    pub fn add_child(
        &mut self,
        parent: ResourceId,
        mut resource: Resource,
    ) -> Result<ResourceId, ConfigError> {
        if self.get(parent).is_none() {
            return Err(ConfigError::UnknownParent { parent: parent.0 });
        }
        if self.child(parent, resource.name.as_str()).is_some() {
            return Err(ConfigError::DuplicateResource);
        }

        let index = self.resources.len();
        let id = u8::try_from(index)
            .map(ResourceId)
            .map_err(|_| ConfigError::MaxResourcesReached {
                max_resources: MAX_RESOURCES,
            })?;

        resource.parent = Some(parent);
        self.resources
            .push(resource)
            .map_err(|_| ConfigError::MaxResourcesReached {
                max_resources: MAX_RESOURCES,
            })?;
        Ok(id)
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(id.index())
    }

    /// Child of `parent` called `name`
    pub fn child(&self, parent: ResourceId, name: &str) -> Option<ResourceId> {
        self.iter()
            .find(|(_, r)| r.parent == Some(parent) && r.name.as_str() == name)
            .map(|(id, _)| id)
    }

    /// Resolve a request path such as `lights/led3`
    pub fn resolve(&self, path: &str) -> Option<ResourceId> {
        PathSegments::new(path).try_fold(ResourceId::ROOT, |current, segment| {
            self.child(current, segment)
        })
    }

    /// Write the absolute path of `id`, e.g. `/lights/led3`
    pub fn write_path<W: core::fmt::Write>(
        &self,
        id: ResourceId,
        out: &mut W,
    ) -> core::fmt::Result {
        let mut chain: heapless::Vec<ResourceId, MAX_RESOURCES> = heapless::Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            if cid == ResourceId::ROOT {
                break;
            }
            let resource = self.get(cid).ok_or(core::fmt::Error)?;
            chain.push(cid).map_err(|_| core::fmt::Error)?;
            current = resource.parent;
        }

        if chain.is_empty() {
            return out.write_char('/');
        }
        for cid in chain.iter().rev() {
            let resource = self.get(*cid).ok_or(core::fmt::Error)?;
            write!(out, "/{}", resource.name)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(index, r)| (ResourceId(index as u8), r))
    }

    /// Ids of resources that accept observers
    pub fn observable(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.iter()
            .filter(|(_, r)| r.is_observable())
            .map(|(id, _)| id)
    }

    /// Number of resources, root included
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Iterator over non-empty path segments (split by /)
struct PathSegments<'a> {
    remaining: &'a str,
}

impl<'a> PathSegments<'a> {
    fn new(path: &'a str) -> Self {
        Self { remaining: path }
    }
}

impl<'a> Iterator for PathSegments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining.is_empty() {
                return None;
            }
            let segment = match self.remaining.find('/') {
                Some(pos) => {
                    let segment = &self.remaining[..pos];
                    self.remaining = &self.remaining[pos + 1..];
                    segment
                }
                None => core::mem::take(&mut self.remaining),
            };
            if !segment.is_empty() {
                return Some(segment);
            }
        }
    }
}
