//! Path based backend classification for local Unix mounts.

use lzthumb::{BackendClassifier, BackendKind, ListEntry};

/// GVFS mount prefixes for network shares.
const NETWORK_MARKERS: &[&str] = &["/gvfs/smb-share:", "/gvfs/sftp:", "/gvfs/dav:", "/gvfs/ftp:"];

/// GVFS mount prefixes for devices that only serve one request at a time.
const SLOW_MARKERS: &[&str] = &["/gvfs/mtp:", "/gvfs/gphoto2:", "/gvfs/afc:"];

const REMOVABLE_ROOTS: &[&str] = &["/media/", "/run/media/", "/Volumes/"];

const NETWORK_ROOTS: &[&str] = &["/net/", "//"];

pub struct MountClassifier;

impl BackendClassifier for MountClassifier {
    fn classify(&self, entry: &ListEntry) -> BackendKind {
        classify_path(&entry.source_id)
    }
}

fn classify_path(path: &str) -> BackendKind {
    if SLOW_MARKERS.iter().any(|m| path.contains(m)) {
        BackendKind::Slow
    } else if NETWORK_MARKERS.iter().any(|m| path.contains(m))
        || NETWORK_ROOTS.iter().any(|r| path.starts_with(r))
    {
        BackendKind::Network
    } else if REMOVABLE_ROOTS.iter().any(|r| path.starts_with(r)) {
        BackendKind::Removable
    } else {
        BackendKind::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_path() {
        assert_eq!(classify_path("/home/me/a.png"), BackendKind::Local);
        assert_eq!(classify_path("/media/me/SD/DCIM/a.jpg"), BackendKind::Removable);
        assert_eq!(
            classify_path("/run/user/1000/gvfs/mtp:host=Phone/DCIM/a.jpg"),
            BackendKind::Slow
        );
        assert_eq!(
            classify_path("/run/user/1000/gvfs/smb-share:server=nas,share=photos/a.jpg"),
            BackendKind::Network
        );
        assert_eq!(classify_path("/net/nas/a.jpg"), BackendKind::Network);
    }

    #[test]
    fn test_classifier_uses_source_id() {
        let entry = ListEntry::file("/run/media/me/usb/a.png");
        assert_eq!(MountClassifier.classify(&entry), BackendKind::Removable);
    }
}
