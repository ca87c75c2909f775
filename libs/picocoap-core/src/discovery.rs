//! `/.well-known/core` document generation (link format)

use core::fmt::Write;

use crate::error::ConfigError;
use crate::resource::{Resource, ResourceTree};

/// Discovery document of capacity `N` bytes
pub type DiscoveryDocument<const N: usize> = heapless::String<N>;

/// Serialize every discoverable resource of `tree`
///
/// Entries look like `</lights/led3>;ct="0 50";obs` and are separated by `,`,
/// in registration order.
///
/// # Errors
///
/// Returns `ConfigError::DiscoveryDocumentTooLarge` when the document does
/// not fit in `N` bytes.
pub fn generate<const MAX_RESOURCES: usize, const N: usize>(
    tree: &ResourceTree<MAX_RESOURCES>,
) -> Result<DiscoveryDocument<N>, ConfigError> {
    let mut document = DiscoveryDocument::<N>::new();
    let mut first = true;

    for (id, resource) in tree.iter().filter(|(_, r)| r.is_discoverable()) {
        if !first {
            document.push(',').map_err(|_| too_large::<N>())?;
        }
        first = false;

        document.push('<').map_err(|_| too_large::<N>())?;
        tree.write_path(id, &mut document)
            .map_err(|_| too_large::<N>())?;
        document.push('>').map_err(|_| too_large::<N>())?;
        write_attributes(resource, &mut document).map_err(|_| too_large::<N>())?;
    }

    Ok(document)
}

fn write_attributes<W: Write>(resource: &Resource, out: &mut W) -> core::fmt::Result {
    let formats = resource.formats();
    match formats.len() {
        0 => {}
        1 => {
            for format in formats.iter() {
                write!(out, ";ct={}", format.number())?;
            }
        }
        _ => {
            out.write_str(";ct=\"")?;
            for (i, format) in formats.iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write!(out, "{}", format.number())?;
            }
            out.write_char('"')?;
        }
    }
    if resource.is_observable() {
        out.write_str(";obs")?;
    }
    Ok(())
}

const fn too_large<const N: usize>() -> ConfigError {
    ConfigError::DiscoveryDocumentTooLarge { capacity: N }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ContentFormat, ContentFormatSet};
    use crate::resource::{Permissions, ResourceId, ResourceKind};

    fn tree() -> ResourceTree<6> {
        let mut tree = ResourceTree::<6>::new().unwrap();
        let well_known = tree
            .add_child(
                ResourceId::ROOT,
                Resource::new(".well-known", ResourceKind::Container).unwrap(),
            )
            .unwrap();
        tree.add_child(
            well_known,
            Resource::new("core", ResourceKind::Discovery)
                .unwrap()
                .with_permissions(Permissions::GET)
                .with_formats(ContentFormatSet::of(ContentFormat::LinkFormat)),
        )
        .unwrap();
        let lights = tree
            .add_child(
                ResourceId::ROOT,
                Resource::new("lights", ResourceKind::Container).unwrap(),
            )
            .unwrap();
        tree.add_child(
            lights,
            Resource::new("led3", ResourceKind::Light)
                .unwrap()
                .with_permissions(Permissions::GET | Permissions::PUT | Permissions::OBSERVE)
                .with_formats(
                    ContentFormatSet::of(ContentFormat::Json).with(ContentFormat::PlainText),
                )
                .with_max_age(15),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_generate_document() {
        let document = generate::<6, 100>(&tree()).unwrap();
        assert_eq!(
            document.as_str(),
            "</.well-known/core>;ct=40,</lights/led3>;ct=\"0 50\";obs"
        );
    }

    #[test]
    fn test_containers_are_skipped() {
        let document = generate::<6, 100>(&tree()).unwrap();
        assert!(!document.contains("</lights>"));
        assert!(!document.contains("</.well-known>"));
    }

    #[test]
    fn test_generate_overflow() {
        assert_eq!(
            generate::<6, 20>(&tree()),
            Err(ConfigError::DiscoveryDocumentTooLarge { capacity: 20 })
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = ResourceTree::<1>::new().unwrap();
        let document = generate::<1, 8>(&tree).unwrap();
        assert!(document.is_empty());
    }
}
