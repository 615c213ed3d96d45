//! Album art lookup.
//!
//! MOC does not know about cover art, so the bridge asks MusicBrainz for releases matching the
//! current artist and album and takes the first image the Cover Art Archive has for one of them.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

const MUSICBRAINZ_RELEASE_SEARCH: &str = "https://musicbrainz.org/ws/2/release/";
const COVER_ART_ARCHIVE_RELEASE: &str = "https://coverartarchive.org/release/";
const SEARCH_LIMIT: &str = "5";

/// Finds an image URL for an album.
pub trait ArtLookup: fmt::Debug {
    /// Returns an art URL for `album` by `artist`, or `None` if nothing was found.
    fn lookup(&self, artist: &str, album: &str) -> Option<String>;
}

/// Never finds anything. Used when art lookup is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArt;

impl ArtLookup for NoArt {
    fn lookup(&self, _artist: &str, _album: &str) -> Option<String> {
        None
    }
}

/// Looks up art on MusicBrainz and the Cover Art Archive.
#[derive(Debug, Clone)]
pub struct MusicBrainzArt {
    agent: ureq::Agent,
}

impl MusicBrainzArt {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        MusicBrainzArt {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(timeout)
                .timeout_read(timeout)
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION"),
                    " (MOC MPRIS bridge)"
                ))
                .build(),
        }
    }

    fn search_releases(&self, artist: &str, album: &str) -> Result<Vec<String>, ureq::Error> {
        let query = format!(
            "artist:\"{}\" AND release:\"{}\"",
            escape_query(artist),
            escape_query(album)
        );
        let response: serde_json::Value = self
            .agent
            .get(MUSICBRAINZ_RELEASE_SEARCH)
            .query("query", &query)
            .query("limit", SEARCH_LIMIT)
            .query("fmt", "json")
            .call()?
            .into_json()?;
        Ok(release_ids(&response))
    }

    fn first_image(&self, release_id: &str) -> Result<Option<String>, ureq::Error> {
        let url = format!("{}{}", COVER_ART_ARCHIVE_RELEASE, release_id);
        let response: serde_json::Value = self.agent.get(&url).call()?.into_json()?;
        Ok(first_image(&response))
    }
}

impl ArtLookup for MusicBrainzArt {
    fn lookup(&self, artist: &str, album: &str) -> Option<String> {
        let releases = match self.search_releases(artist, album) {
            Ok(releases) => releases,
            Err(error) => {
                warn!(%artist, %album, %error, "release search failed");
                return None;
            }
        };

        releases.iter().find_map(|release| match self.first_image(release) {
            Ok(image) => image,
            Err(error) => {
                debug!(%release, %error, "no cover art for release");
                None
            }
        })
    }
}

/// How many albums [`CachedArt::new`] remembers.
pub const DEFAULT_ART_CACHE_CAPACITY: usize = 256;

type AlbumKey = (String, String);

/// Remembers lookups per `(artist, album)`, including the ones that found nothing.
///
/// Once `capacity` albums are remembered, the one looked up first is forgotten.
#[derive(Debug)]
pub struct CachedArt<L> {
    inner: L,
    capacity: usize,
    cache: RefCell<HashMap<AlbumKey, Option<String>>>,
    order: RefCell<VecDeque<AlbumKey>>,
}

impl<L: ArtLookup> CachedArt<L> {
    /// Wrap `inner` with a cache of [`DEFAULT_ART_CACHE_CAPACITY`] albums.
    pub fn new(inner: L) -> Self {
        CachedArt::with_capacity(inner, DEFAULT_ART_CACHE_CAPACITY)
    }

    /// Wrap `inner` with a cache of at most `capacity` albums (at least one).
    pub fn with_capacity(inner: L, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CachedArt {
            inner,
            capacity,
            cache: RefCell::new(HashMap::with_capacity(capacity)),
            order: RefCell::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Number of albums currently remembered.
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// `true` when nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    fn remember(&self, key: AlbumKey, found: Option<String>) {
        let mut cache = self.cache.borrow_mut();
        let mut order = self.order.borrow_mut();
        while cache.len() >= self.capacity {
            match order.pop_front() {
                Some(oldest) => {
                    cache.remove(&oldest);
                }
                None => break,
            }
        }
        order.push_back(key.clone());
        cache.insert(key, found);
    }
}

impl<L: ArtLookup> ArtLookup for CachedArt<L> {
    fn lookup(&self, artist: &str, album: &str) -> Option<String> {
        let key = (artist.to_owned(), album.to_owned());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }

        let found = self.inner.lookup(artist, album);
        debug!(%artist, %album, art_url = ?found, "album art looked up");
        self.remember(key, found.clone());
        found
    }
}

fn escape_query(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}

fn release_ids(response: &serde_json::Value) -> Vec<String> {
    response["releases"]
        .as_array()
        .map(|releases| {
            releases
                .iter()
                .filter_map(|release| release["id"].as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn first_image(response: &serde_json::Value) -> Option<String> {
    response["images"]
        .as_array()?
        .iter()
        .find_map(|image| image["image"].as_str())
        .map(String::from)
}
