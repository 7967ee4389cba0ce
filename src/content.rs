use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::future::Future;
use tokio::sync::OnceCell;

/// One page of the published documentation, as emitted into `content.json`
/// by the site build.
#[derive(Debug, Clone, Deserialize)]
pub struct DocPage {
    pub title: String,
    pub url: String,
    pub content: String,
}

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Concatenate all pages into the single grounding context string.
pub fn build_context(pages: &[DocPage]) -> String {
    pages
        .iter()
        .map(|page| format!("## {}\nURL: {}\n\n{}", page.title, page.url, page.content))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// One-shot loader for the documentation index.
///
/// The context is fetched at most once: concurrent `load` calls coalesce on
/// the same in-flight request and the result is memoized. A failed load
/// leaves the cell unset so a later widget open may try again, but nothing
/// retries automatically.
pub struct ContentLoader {
    url: String,
    client: reqwest::Client,
    context: OnceCell<String>,
}

impl ContentLoader {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
            context: OnceCell::new(),
        }
    }

    /// The grounding context, if the index has been loaded.
    pub fn context(&self) -> Option<&str> {
        self.context.get().map(String::as_str)
    }

    pub fn is_loaded(&self) -> bool {
        self.context.initialized()
    }

    pub async fn load(&self) -> Result<&str> {
        self.load_with(|| self.fetch()).await
    }

    async fn load_with<F, Fut>(&self, fetch: F) -> Result<&str>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<DocPage>>>,
    {
        self.context
            .get_or_try_init(|| async { Ok(build_context(&fetch().await?)) })
            .await
            .map(String::as_str)
    }

    async fn fetch(&self) -> Result<Vec<DocPage>> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "content index request failed with status: {}",
                response.status()
            ));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(title: &str, url: &str, content: &str) -> DocPage {
        DocPage {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn context_sections_are_titled_and_separated() {
        let pages = vec![
            page("Java Basics", "https://site/java/basics/", "# Java Basics\nbody"),
            page("Setup", "https://site/setup/", "install things"),
        ];
        let context = build_context(&pages);
        assert_eq!(
            context,
            "## Java Basics\nURL: https://site/java/basics/\n\n# Java Basics\nbody\
             \n\n---\n\n\
             ## Setup\nURL: https://site/setup/\n\ninstall things"
        );
    }

    #[test]
    fn empty_index_yields_empty_context() {
        assert_eq!(build_context(&[]), "");
    }

    #[tokio::test]
    async fn concurrent_loads_fetch_exactly_once() {
        let loader = ContentLoader::new("http://unused.invalid/content.json");
        let calls = AtomicUsize::new(0);

        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![page("T", "u", "c")])
        };
        let (a, b) = tokio::join!(loader.load_with(fetch), loader.load_with(fetch));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Already loaded: a third call is a no-op.
        loader.load_with(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn failed_load_is_not_memoized() {
        let loader = ContentLoader::new("http://unused.invalid/content.json");

        let err = loader
            .load_with(|| async { Err(anyhow!("connection refused")) })
            .await;
        assert!(err.is_err());
        assert!(!loader.is_loaded());
        assert!(loader.context().is_none());

        // A later open may try again and succeed.
        let ok = loader
            .load_with(|| async { Ok(vec![page("T", "u", "c")]) })
            .await
            .unwrap();
        assert_eq!(ok, "## T\nURL: u\n\nc");
        assert_eq!(loader.context(), Some("## T\nURL: u\n\nc"));
    }
}
