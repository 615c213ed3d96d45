use std::collections::BTreeMap;

use crate::status::RawStatus;
use crate::value::Value;

/// The only track id this bridge ever reports; MOC has no stable per-track identity.
pub const TRACK_ID: &str = "/org/moc_mpris/track/1";

/// A structured representation of the current track, built from the player's status dump.
///
/// * [Read more about the MPRIS2 `Metadata_Map`
/// type.](https://specifications.freedesktop.org/mpris-spec/latest/Track_List_Interface.html#Mapping:Metadata_Map)
/// * [Read MPRIS v2 metadata guidelines](https://www.freedesktop.org/wiki/Specifications/mpris-spec/metadata/)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metadata {
    /// `File`
    pub url: Option<String>,
    /// `SongTitle`
    pub title: Option<String>,
    /// `Artist`
    pub artist: Option<String>,
    /// `Album`
    pub album: Option<String>,
    /// `TotalSec`, in microseconds
    pub length_in_microseconds: Option<i64>,
    /// Looked up separately, see `art`.
    pub art_url: Option<String>,
}

impl Metadata {
    /// Read the track fields out of a status dump. Blank fields are treated as missing.
    pub fn from_status(status: &RawStatus) -> Self {
        let text = |key| status.get_nonempty(key).map(String::from);
        Metadata {
            url: text("File"),
            title: text("SongTitle"),
            artist: text("Artist"),
            album: text("Album"),
            length_in_microseconds: status
                .seconds("TotalSec")
                .and_then(|seconds| i64::try_from(seconds).ok())
                .map(|seconds| seconds.saturating_mul(1_000_000)),
            art_url: None,
        }
    }

    /// Attach an album art URL.
    pub fn with_art_url(mut self, art_url: Option<String>) -> Self {
        self.art_url = art_url;
        self
    }

    /// The MPRIS metadata map. Keys without a value are left out rather than sent empty.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert(
            String::from("mpris:trackid"),
            Value::ObjectPath(String::from(TRACK_ID)),
        );

        let mut insert = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(String::from(key), value);
            }
        };
        insert("mpris:length", self.length_in_microseconds.map(Value::I64));
        insert("xesam:url", self.url.clone().map(Value::String));
        insert("xesam:title", self.title.clone().map(Value::String));
        insert(
            "xesam:artist",
            self.artist.clone().map(|artist| Value::Strings(vec![artist])),
        );
        insert("xesam:album", self.album.clone().map(Value::String));
        insert("mpris:artUrl", self.art_url.clone().map(Value::String));

        map
    }
}

impl From<Metadata> for Value {
    fn from(metadata: Metadata) -> Self {
        Value::Map(metadata.to_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_maps_status_fields_to_mpris_keys() {
        let status = RawStatus::parse(
            "State: PLAY\nFile: /m/a.ogg\nSongTitle: Song\nArtist: Band\nAlbum: Record\nTotalSec: 195\n",
        );
        let map = Metadata::from_status(&status)
            .with_art_url(Some(String::from("http://art/1.jpg")))
            .to_map();

        assert_eq!(
            map.get("mpris:trackid"),
            Some(&Value::ObjectPath(String::from(TRACK_ID)))
        );
        assert_eq!(map.get("mpris:length"), Some(&Value::I64(195_000_000)));
        assert_eq!(map.get("xesam:url"), Some(&Value::from("/m/a.ogg")));
        assert_eq!(map.get("xesam:title"), Some(&Value::from("Song")));
        assert_eq!(
            map.get("xesam:artist"),
            Some(&Value::Strings(vec![String::from("Band")]))
        );
        assert_eq!(map.get("xesam:album"), Some(&Value::from("Record")));
        assert_eq!(map.get("mpris:artUrl"), Some(&Value::from("http://art/1.jpg")));
    }

    #[test]
    fn it_omits_missing_fields() {
        let status = RawStatus::parse("State: PLAY\nSongTitle: Song\nArtist: \n");
        let map = Metadata::from_status(&status).to_map();

        assert!(!map.contains_key("xesam:artist"));
        assert!(!map.contains_key("xesam:album"));
        assert!(!map.contains_key("mpris:length"));
        assert!(!map.contains_key("mpris:artUrl"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn it_always_has_a_track_id() {
        let map = Metadata::default().to_map();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("mpris:trackid"));
    }
}
