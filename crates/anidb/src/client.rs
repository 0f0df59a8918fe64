//! AniDB client: title search over the cached index and anime lookups.

use once_cell::unsync::OnceCell;
use shared::AnidbConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::api::{AnimeFetcher, Downloader, HttpApi, HttpDownloader};
use crate::decode;
use crate::error::AnidbError;
use crate::models::{Anime, AnimeRecord, StubAnime};
use crate::titles::{TitleIndex, TitleIndexCache};
use crate::Result;

/// Entry point for searching and fetching anime.
///
/// The title index is read from disk on first use and kept in memory. The
/// client is single-threaded; create one per thread when fanning out.
pub struct AnidbClient {
    config: AnidbConfig,
    cache: TitleIndexCache,
    fetcher: Box<dyn AnimeFetcher>,
    index: OnceCell<TitleIndex>,
}

impl AnidbClient {
    /// Create a client talking to AniDB over HTTP
    pub fn new(config: AnidbConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let downloader = HttpDownloader::new(timeout)?;
        let fetcher = HttpApi::new(
            config.api_url.clone(),
            config.client_name.clone(),
            config.client_version,
            timeout,
        )?;
        Self::with_collaborators(config, Box::new(downloader), Box::new(fetcher))
    }

    /// Create a client with custom download and fetch implementations
    pub fn with_collaborators(
        config: AnidbConfig,
        downloader: Box<dyn Downloader>,
        fetcher: Box<dyn AnimeFetcher>,
    ) -> Result<Self> {
        let cache_dir = resolve_cache_dir(&config)?;
        let cache = TitleIndexCache::new(&cache_dir, config.titles_url.clone(), downloader)?;

        info!(
            cache_dir = %cache_dir.display(),
            auto_download = config.auto_download,
            lang = %config.lang,
            "AniDB client initialized"
        );

        Ok(Self {
            config,
            cache,
            fetcher,
            index: OnceCell::new(),
        })
    }

    /// Default language for title lookups
    pub fn lang(&self) -> &str {
        &self.config.lang
    }

    /// Path of the cached title index
    pub fn titles_path(&self) -> &Path {
        self.cache.path()
    }

    /// Search titles; results are stubs in index order
    pub fn search(&self, term: &str) -> Result<Vec<StubAnime>> {
        let index = self.index()?;
        let results: Vec<StubAnime> = index
            .search(term)
            .into_iter()
            .map(|entry| StubAnime::new(entry.aid, entry.titles.clone(), self.lang()))
            .collect();

        debug!(term = term, results = results.len(), "Search complete");
        Ok(results)
    }

    /// Fetch and decode the full record of one anime. No retries.
    pub fn fetch(&self, aid: u32) -> Result<Anime> {
        let xml = self.fetcher.fetch_anime_xml(aid).map_err(|e| match e {
            AnidbError::Fetch { .. } => e,
            other => AnidbError::fetch(aid, other),
        })?;

        let anime = decode::parse_anime(&xml, self.lang()).map_err(|e| AnidbError::fetch(aid, e))?;

        debug!(
            aid = aid,
            titles = anime.titles.len(),
            episodes = anime.all_episodes.len(),
            "Anime fetched"
        );
        Ok(anime)
    }

    /// Upgrade a search result to a full record
    pub fn load(&self, stub: &StubAnime) -> Result<Anime> {
        self.fetch(stub.id)
    }

    /// Get a record by id, fetched when `auto_load` is set.
    ///
    /// Without `auto_load` no I/O happens: the stub takes its titles from the
    /// index if it is already in memory.
    pub fn anime(&self, aid: u32, auto_load: bool) -> Result<AnimeRecord> {
        if auto_load {
            return self.fetch(aid).map(AnimeRecord::Full);
        }

        let titles = self
            .index
            .get()
            .and_then(|index| index.get(aid))
            .map(|entry| entry.titles.clone())
            .unwrap_or_default();
        Ok(AnimeRecord::Stub(StubAnime::new(aid, titles, self.lang())))
    }

    /// Download the title index if it is stale, or always with `force`.
    ///
    /// Returns whether a download happened; the in-memory index is then
    /// dropped and re-read on next search.
    pub fn download_titles(&mut self, force: bool) -> Result<bool> {
        let downloaded = self.cache.ensure_fresh(force)?;
        if downloaded {
            self.index.take();
        }
        Ok(downloaded)
    }

    fn index(&self) -> Result<&TitleIndex> {
        self.index.get_or_try_init(|| self.load_index())
    }

    fn load_index(&self) -> Result<TitleIndex> {
        match self.cache.load() {
            Err(AnidbError::NotFound(path)) if self.config.auto_download => {
                info!(path = %path.display(), "Title index missing, downloading");
                self.cache.ensure_fresh(false)?;
                self.cache.load()
            }
            other => other,
        }
    }
}

/// Configured cache directory, or the platform cache directory (created on demand)
fn resolve_cache_dir(config: &AnidbConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.cache_dir {
        return Ok(dir.clone());
    }

    let dir = AnidbConfig::default_cache_dir()
        .ok_or_else(|| AnidbError::Configuration("no cache directory available".to_string()))?;
    std::fs::create_dir_all(&dir).map_err(|e| {
        AnidbError::Configuration(format!("cannot create '{}': {}", dir.display(), e))
    })?;
    Ok(dir)
}
