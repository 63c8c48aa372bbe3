use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::error::LoadError;

/// Where published data files come from. `fetch` returns the raw body, still
/// compressed if the file was published compressed.
pub trait DataSource: Send + Sync {
    fn fetch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>>;

    fn describe(&self) -> String;
}

/// Files served over HTTP from a static host or CDN.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

impl DataSource for HttpSource {
    fn fetch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        async move {
            let url = self.url_for(name);
            log::debug!("Fetching {}", url);

            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LoadError::NotFound(name.to_string()));
            }
            if !status.is_success() {
                return Err(LoadError::Status {
                    name: name.to_string(),
                    status,
                });
            }

            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        }
        .boxed()
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Files sitting in a local directory, e.g. a checkout of the published data.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DataSource for DirSource {
    fn fetch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        async move {
            let path = self.root.join(name);
            log::debug!("Reading {}", path.display());
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(LoadError::NotFound(name.to_string())),
                Err(e) => Err(LoadError::Io(e)),
            }
        }
        .boxed()
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Picks an HTTP source for URLs and a directory source for anything else.
pub fn source_for(location: &str, timeout: Duration) -> Result<Box<dyn DataSource>, LoadError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location, timeout)?))
    } else {
        Ok(Box::new(DirSource::new(location)))
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory source that also records the order of requests.
    #[derive(Default)]
    pub struct MemorySource {
        files: HashMap<String, Vec<u8>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MemorySource {
        pub fn with(mut self, name: &str, body: impl Into<Vec<u8>>) -> Self {
            self.files.insert(name.to_string(), body.into());
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl DataSource for MemorySource {
        fn fetch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
            async move {
                self.requests.lock().unwrap().push(name.to_string());
                self.files
                    .get(name)
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound(name.to_string()))
            }
            .boxed()
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}
