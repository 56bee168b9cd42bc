//! The data records that flow between the index fetcher, cache, registry
//! and classifier.
use crate::classifier::Classifiable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub maintainer: String,
    #[serde(default)]
    pub depends: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub md5sum: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub depiction: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub installed_size: String,
    #[serde(default)]
    pub sileodepiction: String,
    #[serde(default)]
    pub native_depiction: String,
    #[serde(default)]
    pub rootless: String,
    #[serde(default)]
    pub commercial: String,
    #[serde(default)]
    pub payment_link: String,
    #[serde(default)]
    pub architecture: String,
    /// Every field the stanza carried, by name, including ones with no
    /// dedicated accessor above — lets a caller re-render a package's
    /// control stanza without losing fields this crate doesn't model.
    #[serde(default)]
    pub raw: std::collections::BTreeMap<String, String>,
}

impl Package {
    /// Builds a `Package` from a parsed control stanza, mapping the
    /// well-known RFC822 field names onto the typed accessors.
    pub fn from_stanza(stanza: &crate::control::Stanza) -> Self {
        let field = |name: &str| stanza.get(name).unwrap_or_default().to_string();
        let raw = stanza.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self {
            raw,
            package: field("Package"),
            version: field("Version"),
            section: field("Section"),
            description: field("Description"),
            name: field("Name"),
            author: field("Author"),
            maintainer: field("Maintainer"),
            depends: field("Depends"),
            filename: field("Filename"),
            size: field("Size"),
            md5sum: field("MD5sum"),
            sha256: field("SHA256"),
            icon: field("Icon"),
            depiction: field("Depiction"),
            tag: field("Tag"),
            installed_size: field("Installed-Size"),
            sileodepiction: field("SileoDepiction"),
            native_depiction: field("Native-Depiction"),
            rootless: field("Rootless"),
            commercial: field("Commercial"),
            payment_link: field("Payment-Link"),
            architecture: field("Architecture"),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.package } else { &self.name }
    }

    pub fn display_author(&self) -> &str {
        if !self.author.is_empty() {
            &self.author
        } else if !self.maintainer.is_empty() {
            &self.maintainer
        } else {
            "unknown"
        }
    }

    pub fn display_size(&self) -> String {
        match self.size.parse::<f64>() {
            Ok(mut bytes) if bytes >= 0.0 => {
                for unit in ["B", "KB", "MB", "GB"] {
                    if bytes < 1024.0 {
                        return format!("{bytes:.1} {unit}");
                    }
                    bytes /= 1024.0;
                }
                format!("{bytes:.1} TB")
            },
            _ if !self.size.is_empty() => self.size.clone(),
            _ => "unknown size".to_string(),
        }
    }

    pub fn depiction_url(&self) -> Option<&str> {
        [&self.sileodepiction, &self.native_depiction, &self.depiction].into_iter().find(|s| !s.is_empty()).map(String::as_str)
    }

    pub fn is_commercial(&self) -> bool {
        matches!(self.commercial.to_ascii_lowercase().as_str(), "yes" | "true" | "1")
    }

    /// Key used to deduplicate records pulled from multiple architecture
    /// subpaths of the same repository: last write for a key wins.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}|{}", self.package, self.version, self.architecture)
    }
}

impl Classifiable for Package {
    fn rootless_flag(&self) -> &str { &self.rootless }
    fn filename(&self) -> &str { &self.filename }
    fn package_id(&self) -> &str { &self.package }
    fn description(&self) -> &str { &self.description }
    fn display_name(&self) -> &str { Package::display_name(self) }
    fn architecture(&self) -> &str { &self.architecture }
    fn depends(&self) -> &str { &self.depends }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub packages_count: usize,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool { true }

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: normalize_url(&url.into()),
            enabled: true,
            last_updated: None,
            packages_count: 0,
            icon: None,
            description: None,
        }
    }
}

/// Repository URLs are always stored with a trailing slash so they can be
/// joined with a relative path component unambiguously.
pub fn normalize_url(url: &str) -> String {
    if url.ends_with('/') { url.to_string() } else { format!("{url}/") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_package() {
        let mut pkg = Package::default();
        pkg.package = "com.example.tweak".into();
        assert_eq!(pkg.display_name(), "com.example.tweak");
        pkg.name = "My Tweak".into();
        assert_eq!(pkg.display_name(), "My Tweak");
    }

    #[test]
    fn display_size_formats_bytes() {
        let mut pkg = Package::default();
        pkg.size = "2048".into();
        assert_eq!(pkg.display_size(), "2.0 KB");
    }

    #[test]
    fn depiction_prefers_sileo() {
        let mut pkg = Package::default();
        pkg.depiction = "http://a".into();
        pkg.sileodepiction = "http://b".into();
        assert_eq!(pkg.depiction_url(), Some("http://b"));
    }

    #[test]
    fn from_stanza_preserves_unknown_fields_on_raw() {
        let mut stanza = crate::control::Stanza::new();
        stanza.set("Package", "com.example.tweak");
        stanza.set("Version", "1.0");
        stanza.set("X-Custom-Field", "whatever");
        let pkg = Package::from_stanza(&stanza);
        assert_eq!(pkg.raw.get("X-Custom-Field").map(String::as_str), Some("whatever"));
        assert_eq!(pkg.raw.get("Package").map(String::as_str), Some("com.example.tweak"));
    }

    #[test]
    fn url_normalization_adds_trailing_slash() {
        assert_eq!(normalize_url("https://repo.example/"), "https://repo.example/");
        assert_eq!(normalize_url("https://repo.example"), "https://repo.example/");
    }
}
