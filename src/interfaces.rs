//! Registration of the `org.mpris.MediaPlayer2` and `org.mpris.MediaPlayer2.Player` properties.
//!
//! See the [MPRIS2 specification](https://specifications.freedesktop.org/mpris-spec/latest/).

use tracing::debug;

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::mixer::volume_to_percent;
use crate::property::{Getter, Interface, InterfaceProperties, PropertyTable, SetOutcome};
use crate::target::ConnectionTarget;
use crate::value::Value;

pub(crate) const CAN_QUIT: bool = true;
pub(crate) const CAN_RAISE: bool = true;

/// The only playback rate MOC knows.
const RATE: f64 = 1.0;

/// Build the property table served by a bridge for `target`.
///
/// `TrackList` and `Playlists` are not implemented and stay unregistered.
pub fn table(target: &ConnectionTarget) -> PropertyTable<Bridge> {
    PropertyTable::new()
        .with_interface(Interface::Root, root(target))
        .with_interface(Interface::Player, player())
}

fn root(target: &ConnectionTarget) -> InterfaceProperties<Bridge> {
    InterfaceProperties::<Bridge>::new()
        .constant("CanQuit", CAN_QUIT)
        .constant("Fullscreen", false)
        .constant("CanSetFullscreen", false)
        .constant("CanRaise", CAN_RAISE)
        .constant("HasTrackList", false)
        .constant("Identity", target.identity())
        .constant("SupportedUriSchemes", Value::Strings(Vec::new()))
        .constant("SupportedMimeTypes", Value::Strings(Vec::new()))
}

fn player() -> InterfaceProperties<Bridge> {
    InterfaceProperties::<Bridge>::new()
        .computed("PlaybackStatus", |bridge| {
            Value::from(bridge.playback_status().as_str())
        })
        .constant("LoopStatus", "None")
        .writable("Rate", Getter::Constant(Value::F64(RATE)), set_rate)
        .constant("Shuffle", false)
        .computed("Metadata", |bridge| Value::from(bridge.metadata()))
        .writable(
            "Volume",
            Getter::Computed(|bridge| Value::F64(bridge.volume())),
            set_volume,
        )
        .computed("Position", |bridge| {
            Value::I64(bridge.position_in_microseconds())
        })
        .constant("MinimumRate", RATE)
        .constant("MaximumRate", RATE)
        .computed("CanGoNext", |bridge| Value::Bool(bridge.can_go_next()))
        .computed("CanGoPrevious", |bridge| {
            Value::Bool(bridge.can_go_previous())
        })
        .computed("CanPlay", |bridge| Value::Bool(bridge.can_play()))
        .computed("CanPause", |bridge| Value::Bool(bridge.can_pause()))
        .computed("CanSeek", |bridge| Value::Bool(bridge.can_seek()))
        .computed("CanControl", |bridge| Value::Bool(bridge.can_control()))
}

fn expect_f64(name: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| Error::InvalidValue {
        name: name.to_string(),
        expected: "a double",
    })
}

/// A rate of zero means pause. Any other rate is ignored.
fn set_rate(bridge: &mut Bridge, value: Value) -> Result<SetOutcome> {
    let rate = expect_f64("Rate", &value)?;
    if !bridge.can_control() || rate != 0.0 {
        return Ok(SetOutcome::Skipped);
    }
    bridge.pause()?;
    Ok(SetOutcome::Applied)
}

fn set_volume(bridge: &mut Bridge, value: Value) -> Result<SetOutcome> {
    let volume = expect_f64("Volume", &value)?;
    if !bridge.can_control() {
        return Ok(SetOutcome::Skipped);
    }
    match volume_to_percent(volume) {
        Some(percent) => {
            bridge.send_volume(percent);
            Ok(SetOutcome::Applied)
        }
        None => {
            debug!("ignoring a volume that is not a number");
            Ok(SetOutcome::Skipped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PLAYER_INTERFACE, ROOT_INTERFACE};

    fn names(table: &PropertyTable<Bridge>, interface: Interface) -> Vec<&'static str> {
        table
            .interface(interface)
            .unwrap()
            .iter()
            .map(|p| p.name())
            .collect()
    }

    #[test]
    fn it_registers_the_root_interface() {
        let table = table(&ConnectionTarget::remote(None, "jukebox"));
        assert_eq!(
            names(&table, Interface::Root),
            vec![
                "CanQuit",
                "Fullscreen",
                "CanSetFullscreen",
                "CanRaise",
                "HasTrackList",
                "Identity",
                "SupportedUriSchemes",
                "SupportedMimeTypes",
            ]
        );
        assert!(matches!(
            table.descriptor(Interface::Root, "Identity").unwrap().getter(),
            Getter::Constant(Value::String(identity)) if identity == "MOC (jukebox)"
        ));
    }

    #[test]
    fn it_only_lets_rate_and_volume_be_written() {
        let table = table(&ConnectionTarget::local());
        let writable: Vec<_> = table
            .interface(Interface::Player)
            .unwrap()
            .iter()
            .filter(|p| p.is_writable())
            .map(|p| p.name())
            .collect();
        assert_eq!(writable, vec!["Rate", "Volume"]);
        assert!(table
            .interface(Interface::Root)
            .unwrap()
            .iter()
            .all(|p| !p.is_writable()));
    }

    #[test]
    fn it_leaves_track_list_and_playlists_unregistered() {
        let table = table(&ConnectionTarget::local());
        assert!(table.has_interface(ROOT_INTERFACE.parse().unwrap()));
        assert!(table.has_interface(PLAYER_INTERFACE.parse().unwrap()));
        assert!(!table.has_interface(Interface::TrackList));
        assert!(!table.has_interface(Interface::Playlists));
    }
}
