//! Header profiles that make this crate's requests look like the package
//! managers jailbreak repositories expect (Sileo or legacy Cydia), plus the
//! blocking HTTP client built around them.
use crate::error::*;
use crate::jailbreak::JailbreakConfig;
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout for callers that don't need a tighter one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam between the rest of the crate and the concrete HTTP client, so a
/// caller (or a test) can substitute a fake transport instead of hitting
/// the network.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> DtResult<reqwest::blocking::Response>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    Sileo,
    Cydia,
}

impl HeaderProfile {
    pub fn for_config(config: &JailbreakConfig) -> Self {
        if config.use_sileo_headers { Self::Sileo } else { Self::Cydia }
    }

    pub fn headers(self, config: &JailbreakConfig) -> Vec<(&'static str, String)> {
        match self {
            Self::Sileo => vec![
                ("User-Agent", "Sileo/2.4 CFNetwork/1410.0.3 Darwin/22.6.0".into()),
                ("X-Machine", config.device_model.clone()),
                ("X-Firmware", config.firmware_version.clone()),
                ("X-Unique-ID", config.unique_id.clone()),
                ("X-Device-Model", config.device_model.clone()),
                ("X-Device-Version", config.firmware_version.clone()),
                ("Accept", "application/json, text/plain, */*".into()),
                ("Accept-Language", "en-US,en;q=0.9".into()),
                ("X-Sileo-Version", "2.4".into()),
                ("X-Jailbreak-Mode", mode_header(config)),
            ],
            Self::Cydia => vec![
                ("User-Agent", "Cydia/1.1.32 CFNetwork/978.0.7 Darwin/18.7.0".into()),
                ("X-Machine", config.device_model.clone()),
                ("X-Unique-ID", config.unique_id.clone()),
                ("X-Firmware", config.firmware_version.clone()),
            ],
        }
    }
}

fn mode_header(config: &JailbreakConfig) -> String {
    match config.mode {
        crate::jailbreak::JailbreakMode::Rootless => "rootless".into(),
        crate::jailbreak::JailbreakMode::Rootful => "rootful".into(),
        crate::jailbreak::JailbreakMode::Both => "both".into(),
        crate::jailbreak::JailbreakMode::Unknown => "unknown".into(),
    }
}

/// An override file that replaces the built-in header profiles entirely
/// when present.
pub fn load_custom_headers(app_dir: &Path) -> Option<Vec<(String, String)>> {
    let path = app_dir.join("custom_headers.json");
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str::<std::collections::BTreeMap<String, String>>(&data)
        .ok()
        .map(|m| m.into_iter().collect())
}

pub struct HttpClient {
    client: reqwest::blocking::Client,
    headers: Vec<(String, String)>,
}

impl HttpClient {
    pub fn new(config: &JailbreakConfig, app_dir: &Path) -> DtResult<Self> {
        let headers = load_custom_headers(app_dir).unwrap_or_else(|| {
            HeaderProfile::for_config(config)
                .headers(config)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect()
        });
        let client = build_client()?;
        Ok(Self { client, headers })
    }

    pub fn get(&self, url: &str) -> DtResult<reqwest::blocking::Response> {
        self.get_with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn get_with_timeout(&self, url: &str, timeout: Duration) -> DtResult<reqwest::blocking::Response> {
        let mut req = self.client.get(url);
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        Ok(req.timeout(timeout).send()?)
    }
}

impl Transport for HttpClient {
    fn get(&self, url: &str, timeout: Duration) -> DtResult<reqwest::blocking::Response> {
        self.get_with_timeout(url, timeout)
    }
}

fn build_client() -> DtResult<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?)
}

/// Holds the live `HttpClient`, rebuilding it whenever the jailbreak
/// config's header-relevant fields change so callers never see a stale
/// profile.
pub struct HttpClientHandle(RwLock<HttpClient>);

impl HttpClientHandle {
    pub fn new(config: &JailbreakConfig, app_dir: &Path) -> DtResult<Self> {
        Ok(Self(RwLock::new(HttpClient::new(config, app_dir)?)))
    }

    pub fn rebuild(&self, config: &JailbreakConfig, app_dir: &Path) -> DtResult<()> {
        let fresh = HttpClient::new(config, app_dir)?;
        *self.0.write().unwrap() = fresh;
        Ok(())
    }

    pub fn get(&self, url: &str) -> DtResult<reqwest::blocking::Response> {
        self.0.read().unwrap().get(url)
    }

    pub fn get_with_timeout(&self, url: &str, timeout: Duration) -> DtResult<reqwest::blocking::Response> {
        self.0.read().unwrap().get_with_timeout(url, timeout)
    }
}

impl Transport for HttpClientHandle {
    fn get(&self, url: &str, timeout: Duration) -> DtResult<reqwest::blocking::Response> {
        self.get_with_timeout(url, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jailbreak::JailbreakConfig;

    #[test]
    fn sileo_profile_has_expected_headers() {
        let config = JailbreakConfig::default();
        let headers = HeaderProfile::Sileo.headers(&config);
        assert!(headers.iter().any(|(k, v)| *k == "User-Agent" && v.starts_with("Sileo/")));
        assert!(headers.iter().any(|(k, _)| *k == "X-Jailbreak-Mode"));
    }

    #[test]
    fn cydia_profile_omits_sileo_only_fields() {
        let config = JailbreakConfig::default();
        let headers = HeaderProfile::Cydia.headers(&config);
        assert!(headers.iter().any(|(k, v)| *k == "User-Agent" && v.starts_with("Cydia/")));
        assert!(!headers.iter().any(|(k, _)| *k == "X-Sileo-Version"));
    }

    struct FakeTransport;
    impl Transport for FakeTransport {
        fn get(&self, _url: &str, _timeout: Duration) -> DtResult<reqwest::blocking::Response> {
            Err(DebtoolError::Str("fake transport always fails"))
        }
    }

    #[test]
    fn transport_trait_is_substitutable() {
        let transport: &dyn Transport = &FakeTransport;
        assert!(transport.get("http://example.invalid/", Duration::from_secs(1)).is_err());
    }
}
