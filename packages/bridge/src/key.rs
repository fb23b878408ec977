//! Registration keys derived from user-visible paths.

use std::fmt;
use std::path::Path;

use url::Url;

use crate::error::RegistrationError;

/// The part of an access mode that participates in key resolution: its
/// first character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeClass {
    Read,
    Write,
}

impl ModeClass {
    /// Mode class of an access string. Trailing characters (a binary-mode
    /// marker, `+`) are accepted and ignored.
    pub fn parse(mode: &str) -> Result<Self, RegistrationError> {
        match mode.chars().next() {
            Some('r') => Ok(ModeClass::Read),
            Some('w') => Ok(ModeClass::Write),
            _ => Err(RegistrationError::Mode {
                mode: mode.to_string(),
            }),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            ModeClass::Read => 'r',
            ModeClass::Write => 'w',
        }
    }
}

impl fmt::Display for ModeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// What an opener registration is filed under.
///
/// Keys are derived from the user-visible path by URI parsing and taking the
/// directory component, so sibling files resolve to the same key and
/// auxiliary/sidecar files reuse the registration made for the primary file.
/// For a given (path, mode) pair the key is stable for the lifetime of a
/// registration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationKey {
    scheme: String,
    authority: String,
    parent: String,
    mode: ModeClass,
}

impl RegistrationKey {
    /// Key for a file path.
    pub fn for_path(urlpath: &str, mode: ModeClass) -> Self {
        let (scheme, authority, path) = split_uri(urlpath);
        let parent = dirname(&path);
        Self {
            scheme,
            authority,
            parent,
            mode,
        }
    }

    /// Key for a directory path: the directory itself is the parent
    /// component, which is what listings of its children resolve to.
    pub fn for_directory(urlpath: &str, mode: ModeClass) -> Self {
        let (scheme, authority, path) = split_uri(urlpath);
        let parent = match path.as_str() {
            "/" => path,
            other => other.trim_end_matches('/').to_string(),
        };
        Self {
            scheme,
            authority,
            parent,
            mode,
        }
    }

    pub fn mode(&self) -> ModeClass {
        self.mode
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {:?}, {:?}, {})",
            self.scheme, self.authority, self.parent, self.mode
        )
    }
}

/// Split a user-visible path into (scheme, authority, path).
///
/// Paths that do not parse as absolute URIs - including single-character
/// schemes, which collide with drive letters - are treated as plain paths
/// with an empty scheme and authority.
fn split_uri(urlpath: &str) -> (String, String, String) {
    match Url::parse(urlpath) {
        Ok(url) if url.scheme().len() > 1 => {
            let mut authority = url.host_str().unwrap_or("").to_string();
            if let Some(port) = url.port() {
                authority.push_str(&format!(":{}", port));
            }
            (
                url.scheme().to_string(),
                authority,
                url.path().to_string(),
            )
        }
        _ => (String::new(), String::new(), urlpath.to_string()),
    }
}

fn dirname(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) => parent.to_string_lossy().into_owned(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_share_a_key() {
        let a = RegistrationKey::for_path("tests/data/RGB.byte.tif", ModeClass::Read);
        let b = RegistrationKey::for_path("tests/data/RGB.byte.tif.msk", ModeClass::Read);
        assert_eq!(a, b);
    }

    #[test]
    fn mode_class_separates_keys() {
        let r = RegistrationKey::for_path("data/a.tif", ModeClass::Read);
        let w = RegistrationKey::for_path("data/a.tif", ModeClass::Write);
        assert_ne!(r, w);
    }

    #[test]
    fn uri_paths_split_scheme_and_authority() {
        let a = RegistrationKey::for_path("s3://bucket/dir/a.tif", ModeClass::Read);
        let b = RegistrationKey::for_path("s3://bucket/dir/b.tif", ModeClass::Read);
        let other_bucket = RegistrationKey::for_path("s3://other/dir/a.tif", ModeClass::Read);
        assert_eq!(a, b);
        assert_ne!(a, other_bucket);
    }

    #[test]
    fn directory_key_matches_its_children() {
        let child = RegistrationKey::for_path("dir/a.tif", ModeClass::Read);
        let dir = RegistrationKey::for_directory("dir", ModeClass::Read);
        assert_eq!(child, dir);

        let child = RegistrationKey::for_path("s3://bucket/dir/a.tif", ModeClass::Read);
        let dir = RegistrationKey::for_directory("s3://bucket/dir", ModeClass::Read);
        assert_eq!(child, dir);
    }

    #[test]
    fn drive_letter_like_schemes_stay_plain_paths() {
        let key = RegistrationKey::for_path("C:/data/a.tif", ModeClass::Read);
        let sibling = RegistrationKey::for_path("C:/data/b.tif", ModeClass::Read);
        assert_eq!(key, sibling);
    }

    #[test]
    fn mode_parse_takes_first_character() {
        assert_eq!(ModeClass::parse("r").unwrap(), ModeClass::Read);
        assert_eq!(ModeClass::parse("rb").unwrap(), ModeClass::Read);
        assert_eq!(ModeClass::parse("w+").unwrap(), ModeClass::Write);
        assert!(ModeClass::parse("a").is_err());
        assert!(ModeClass::parse("").is_err());
    }
}
