//! Template sources and their character encodings

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use crate::error::TemplateError;

/// Identity used when a source has none of its own
pub const ANONYMOUS: &str = "<string>";

/// Declared character encoding of a template file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8, a leading byte order mark is dropped
    #[default]
    Utf8,
    /// Seven-bit only; any high byte is a decode error
    Ascii,
    /// Every byte maps to the code point of the same value
    Latin1,
    /// Any other encoding known to `encoding_rs`, e.g. Shift_JIS or EUC-JP
    Other(&'static encoding_rs::Encoding),
}

/// Codec names without a WHATWG label of their own
const ALIASES: &[(&str, &str)] = &[
    ("cp932", "shift_jis"),
    ("mskanji", "shift_jis"),
    ("cp936", "gbk"),
    ("cp949", "euc-kr"),
    ("cp950", "big5"),
];

impl Encoding {
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin-1",
            Encoding::Other(encoding) => encoding.name(),
        }
    }

    /// Decode `bytes`; `name` identifies the template in errors
    pub fn decode(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<String, TemplateError> {
        let invalid = || TemplateError::Decode {
            name: name.to_string(),
            encoding: self.label().to_string(),
        };
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).map_err(|_| invalid())
            }
            Encoding::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().map(|&b| b as char).collect())
                } else {
                    Err(invalid())
                }
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Encoding::Other(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned())
                .ok_or_else(invalid),
        }
    }
}

impl FromStr for Encoding {
    type Err = TemplateError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let lowered = label.trim().to_ascii_lowercase();
        let dashed = lowered.replace('_', "-");
        // WHATWG folds these into windows-1252, which is not what they mean here
        match dashed.as_str() {
            "utf-8" | "utf8" => return Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => return Ok(Encoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => return Ok(Encoding::Latin1),
            _ => {}
        }
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered || *alias == dashed)
            .map_or(lowered.as_str(), |&(_, target)| target);
        let found = encoding_rs::Encoding::for_label(canonical.as_bytes())
            .or_else(|| encoding_rs::Encoding::for_label(dashed.as_bytes()));
        match found {
            Some(encoding) if encoding == encoding_rs::UTF_8 => Ok(Encoding::Utf8),
            // The replacement encoding decodes everything to an error
            Some(encoding) if encoding != encoding_rs::REPLACEMENT => Ok(Encoding::Other(encoding)),
            _ => Err(TemplateError::UnknownEncoding(label.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable template text plus what the cache needs to know about it
#[derive(Debug, Clone)]
pub struct TemplateSource {
    text: String,
    identity: Option<String>,
    path: Option<PathBuf>,
    mtime: Option<SystemTime>,
    encoding: Encoding,
}

impl TemplateSource {
    /// In-memory text with no identity; never cached on disk
    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            identity: None,
            path: None,
            mtime: None,
            encoding: Encoding::Utf8,
        }
    }

    /// Decode raw bytes under a caller-chosen identity
    pub fn from_bytes(
        identity: impl Into<String>,
        bytes: &[u8],
        encoding: Encoding,
    ) -> Result<Self, TemplateError> {
        let identity = identity.into();
        let text = encoding.decode(&identity, bytes)?;
        Ok(Self {
            text,
            identity: Some(identity),
            path: None,
            mtime: None,
            encoding,
        })
    }

    /// Read a file; its path is the identity and its mtime the freshness key
    pub fn from_file(
        path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| TemplateError::io(path, e))?;
        let mtime = fs::metadata(path).and_then(|m| m.modified()).ok();
        let identity = path.display().to_string();
        let text = encoding.decode(&identity, &bytes)?;
        tracing::debug!(path = %path.display(), encoding = %encoding, "loaded template");
        Ok(Self {
            text,
            identity: Some(identity),
            path: Some(path.to_path_buf()),
            mtime,
            encoding,
        })
    }

    /// Replace the identity, e.g. to give an in-memory template a cache key
    pub fn with_identity(
        mut self,
        identity: impl Into<String>,
    ) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_mtime(
        mut self,
        mtime: SystemTime,
    ) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Identity or a placeholder, for messages
    pub fn name(&self) -> &str {
        self.identity.as_deref().unwrap_or(ANONYMOUS)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_encoding_labels() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("iso-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("latin_1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("ascii".parse::<Encoding>().unwrap(), Encoding::Ascii);
        assert_eq!("cp932".parse::<Encoding>().unwrap().label(), "Shift_JIS");
        assert_eq!("euc_jp".parse::<Encoding>().unwrap().label(), "EUC-JP");
        assert_eq!("windows-1251".parse::<Encoding>().unwrap().label(), "windows-1251");
        assert!("iso-2022-kr".parse::<Encoding>().is_err());
        let err = "ebcdic".parse::<Encoding>().unwrap_err();
        assert!(matches!(err, TemplateError::UnknownEncoding(ref l) if l == "ebcdic"));
    }

    #[test]
    fn test_decode() {
        assert_eq!(Encoding::Utf8.decode("t", b"\xEF\xBB\xBFhi").unwrap(), "hi");
        assert_eq!(Encoding::Latin1.decode("t", b"caf\xE9").unwrap(), "café");
        let err = Encoding::Ascii.decode("page", b"caf\xE9").unwrap_err();
        assert_eq!(err.to_string(), "template page is not valid ascii");
        assert!(Encoding::Utf8.decode("t", b"\xFF").is_err());

        let cp932: Encoding = "cp932".parse().unwrap();
        assert_eq!(cp932.decode("t", b"\x93\xFA\x96\x7B").unwrap(), "日本");
        let err = cp932.decode("page", b"\x93").unwrap_err();
        assert_eq!(err.to_string(), "template page is not valid Shift_JIS");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Hello <%= name %>").unwrap();
        let source = TemplateSource::from_file(file.path(), Encoding::Utf8).unwrap();
        assert_eq!(source.text(), "Hello <%= name %>");
        assert_eq!(source.path(), Some(file.path()));
        assert!(source.mtime().is_some());
        assert_eq!(source.identity(), Some(file.path().display().to_string().as_str()));
    }

    #[test]
    fn test_missing_file() {
        let err = TemplateSource::from_file("/definitely/not/here.tpl", Encoding::Utf8).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }

    #[test]
    fn test_string_source_is_anonymous() {
        let source = TemplateSource::from_string("x");
        assert_eq!(source.identity(), None);
        assert_eq!(source.name(), ANONYMOUS);
        assert_eq!(source.with_identity("inline").name(), "inline");
    }
}
