use std::fmt;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::art::ArtLookup;
use crate::diff::{ChangeSet, SnapshotCache, POSITION};
use crate::error::{Error, Result, TransportError};
use crate::interfaces;
use crate::metadata::{Metadata, TRACK_ID};
use crate::property::{Interface, PropertyTable, SetOutcome, Snapshot};
use crate::schedule::PollScheduler;
use crate::status::RawStatus;
use crate::target::ConnectionTarget;
use crate::transport::Transport;
use crate::value::Value;
use crate::PlaybackStatus;

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;

/// Tunables of a [`Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// The player's control program.
    pub player_command: String,
    /// The mixer control whose level is reported as `Volume`.
    pub mixer_control: String,
    /// Terminal emulator used by `Raise`.
    pub terminal: String,
    /// Time quantum of the poll scheduler.
    pub poll_interval: Duration,
    /// How long to wait after `Next`/`Previous` before reading the player's state again.
    pub settle_delay: Duration,
    /// Consecutive failed status queries after which the player is considered gone.
    pub max_failed_refreshes: u32,
    /// Value of `CanControl`; when `false` every control command and setter is a no-op.
    pub can_control: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        BridgeOptions {
            player_command: String::from("mocp"),
            mixer_control: String::from("Digital"),
            terminal: String::from("xterm"),
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(500),
            max_failed_refreshes: 3,
            can_control: true,
        }
    }
}

/// Lifecycle of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, first status query not done yet.
    Disconnected,
    /// Serving queries and commands.
    Connected,
    /// Quit was requested or the player went away. Nothing is served any more.
    Terminated,
}

/// A bus signal the bridge wants emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// `org.freedesktop.DBus.Properties.PropertiesChanged`
    PropertiesChanged {
        /// Interface the properties belong to.
        interface: Interface,
        /// Properties that changed, with their new values.
        changed: ChangeSet,
    },
    /// `org.mpris.MediaPlayer2.Player.Seeked`, with the new position in microseconds.
    Seeked(i64),
}

/// The remote-control object: property table, player state and the commands that drive it.
///
/// All calls are expected on one thread. Signals produced by any call are queued and handed out
/// by [`Bridge::take_signals`].
pub struct Bridge {
    target: ConnectionTarget,
    options: BridgeOptions,
    transport: Box<dyn Transport>,
    art: Box<dyn ArtLookup>,
    table: PropertyTable<Bridge>,
    status: RawStatus,
    snapshots: SnapshotCache,
    scheduler: PollScheduler,
    state: ConnectionState,
    failed_refreshes: u32,
    signals: Vec<Signal>,
}

impl Bridge {
    /// Create a bridge for the player at `target`. Call [`Bridge::connect`] before serving.
    pub fn new(
        target: ConnectionTarget,
        options: BridgeOptions,
        transport: Box<dyn Transport>,
        art: Box<dyn ArtLookup>,
    ) -> Self {
        let table = interfaces::table(&target);
        let scheduler = PollScheduler::new(options.poll_interval);
        Bridge {
            target,
            options,
            transport,
            art,
            table,
            status: RawStatus::default(),
            snapshots: SnapshotCache::new(),
            scheduler,
            state: ConnectionState::Disconnected,
            failed_refreshes: 0,
            signals: Vec::new(),
        }
    }

    /// Perform the first status query and start serving.
    ///
    /// Fails with [`Error::UnreachablePlayer`] when the player cannot be queried at all. An idle
    /// player is fine.
    pub fn connect(&mut self, now: SystemTime) -> Result<()> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Terminated => return Err(Error::Terminated),
            ConnectionState::Disconnected => {}
        }

        let active = self.refresh_status().map_err(Error::UnreachablePlayer)?;
        self.scheduler.mark(now);
        for interface in [Interface::Root, Interface::Player] {
            let snapshot = self.table.get_all(interface, self)?;
            self.snapshots.prime(interface, snapshot);
        }
        self.state = ConnectionState::Connected;
        info!(player = %self.target, playing = active, "connected to player");
        Ok(())
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// `true` once the bridge has shut down.
    pub fn is_terminated(&self) -> bool {
        self.state == ConnectionState::Terminated
    }

    /// Returns the player target.
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Returns the options the bridge runs with.
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Returns the most recent status dump.
    pub fn status(&self) -> &RawStatus {
        &self.status
    }

    /// Returns the property table.
    pub fn table(&self) -> &PropertyTable<Bridge> {
        &self.table
    }

    /// How long the caller may wait for bus traffic before the next poll tick is due.
    pub fn until_next_tick(&self, now: SystemTime) -> Duration {
        self.scheduler.until_next(now)
    }

    /// Drain the queued signals.
    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// Periodic refresh. Does nothing unless a new time quantum started since the last one.
    pub fn tick(&mut self, now: SystemTime) {
        if self.state != ConnectionState::Connected || !self.scheduler.poll(now) {
            return;
        }
        self.update(true);
    }

    /// `org.freedesktop.DBus.Properties.Get`
    ///
    /// Reading `Position` refreshes the player state first when the current time quantum has not
    /// been refreshed yet, so position reads stay accurate between ticks.
    pub fn get(&mut self, interface: Interface, name: &str, now: SystemTime) -> Result<Value> {
        self.ensure_connected()?;
        if interface == Interface::Player && name == POSITION && self.scheduler.poll(now) {
            self.update(true);
        }
        self.table.get(interface, name, self)
    }

    /// `org.freedesktop.DBus.Properties.GetAll`
    pub fn get_all(&self, interface: Interface) -> Result<Snapshot> {
        self.ensure_connected()?;
        self.table.get_all(interface, self)
    }

    /// `org.freedesktop.DBus.Properties.Set`
    ///
    /// A setter refused by its capability check is a silent no-op; otherwise the new value is
    /// announced together with anything else that changed.
    pub fn set(&mut self, interface: Interface, name: &str, value: Value) -> Result<()> {
        self.ensure_connected()?;
        let (name, setter) = self.table.setter(interface, name)?;
        match setter(self, value)? {
            SetOutcome::Skipped => {
                debug!(%interface, name, "setting property not allowed");
            }
            SetOutcome::Applied => {
                let snapshot = self.table.get_all(interface, self)?;
                let current = snapshot.get(name).cloned();
                let mut changed = self.snapshots.diff(interface, snapshot, true);
                if let Some(current) = current {
                    changed.insert(name, current);
                }
                self.emit_changes(interface, changed);
            }
        }
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Quit`
    pub fn quit(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.control(&["-x"]);
        self.state = ConnectionState::Terminated;
        info!("quit requested, bridge terminated");
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Raise`: open the player's interface in a terminal.
    pub fn raise(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_raise() {
            debug!("Raise not allowed");
            return Ok(());
        }

        let mut argv = vec![
            self.options.terminal.clone(),
            String::from("-e"),
            self.options.player_command.clone(),
            String::from("-m"),
        ];
        let folder = Metadata::from_status(&self.status)
            .url
            .as_deref()
            .and_then(|url| std::path::Path::new(url).parent())
            .map(|folder| folder.to_string_lossy().into_owned())
            .filter(|folder| !folder.is_empty());
        if let Some(folder) = folder {
            argv.push(String::from("-O"));
            argv.push(format!("MusicDir={}", folder));
        }

        if let Err(error) = self.transport.launch(&argv) {
            warn!(%error, "could not raise the player");
        }
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.Next`
    pub fn next(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_go_next() {
            debug!("Next not allowed");
            return Ok(());
        }
        self.control(&["--next"]);
        self.settle();
        self.update(false);
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.Previous`
    pub fn previous(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_go_previous() {
            debug!("Previous not allowed");
            return Ok(());
        }
        self.control(&["--previous"]);
        self.settle();
        self.update(false);
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.Pause`
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_pause() {
            debug!("Pause not allowed");
            return Ok(());
        }
        self.control(&["--pause"]);
        self.update(false);
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.PlayPause`
    pub fn play_pause(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.update(false);
        if !self.can_pause() {
            debug!("PlayPause not allowed");
            return Ok(());
        }
        match self.playback_status() {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused | PlaybackStatus::Stopped => self.play(),
        }
    }

    /// `org.mpris.MediaPlayer2.Player.Stop`
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_control() {
            debug!("Stop not allowed");
            return Ok(());
        }
        self.control(&["--stop"]);
        self.update(false);
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.Play`
    pub fn play(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_play() {
            debug!("Play not allowed");
            return Ok(());
        }
        self.control(&["--unpause"]);
        self.update(false);
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.Seek`, by a signed offset in microseconds.
    pub fn seek(&mut self, offset_in_microseconds: i64) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_seek() {
            debug!("Seek not allowed");
            return Ok(());
        }
        // mocp seeks by whole seconds
        let seconds =
            (offset_in_microseconds as f64 / MICROSECONDS_PER_SECOND as f64).round() as i64;
        if seconds != 0 {
            self.control(&["--seek", &seconds.to_string()]);
        }

        let target = self
            .position_in_microseconds()
            .saturating_add(seconds.saturating_mul(MICROSECONDS_PER_SECOND))
            .max(0);
        self.signals.push(Signal::Seeked(target));
        self.update(true);
        Ok(())
    }

    /// `org.mpris.MediaPlayer2.Player.SetPosition`, to an absolute position in microseconds.
    ///
    /// Ignored when `track_id` is not the current track, or the position lies outside of it.
    pub fn set_position(&mut self, track_id: &str, position_in_microseconds: i64) -> Result<()> {
        self.ensure_connected()?;
        if !self.can_seek() {
            debug!("SetPosition not allowed");
            return Ok(());
        }
        if track_id != TRACK_ID {
            debug!(track_id, "SetPosition for a track that is not playing");
            return Ok(());
        }
        let length = Metadata::from_status(&self.status).length_in_microseconds;
        if position_in_microseconds < 0
            || length.map_or(false, |length| position_in_microseconds > length)
        {
            debug!(position_in_microseconds, "SetPosition outside of the track");
            return Ok(());
        }

        let seconds = position_in_microseconds / MICROSECONDS_PER_SECOND;
        self.control(&["--jump", &format!("{}s", seconds)]);
        self.signals.push(Signal::Seeked(seconds * MICROSECONDS_PER_SECOND));
        self.update(true);
        Ok(())
    }

    /// `CanControl`
    pub fn can_control(&self) -> bool {
        self.options.can_control
    }

    /// `CanGoNext`
    pub fn can_go_next(&self) -> bool {
        self.can_control() && self.has_track()
    }

    /// `CanGoPrevious`
    pub fn can_go_previous(&self) -> bool {
        self.can_control() && self.has_track()
    }

    /// `CanPlay`
    pub fn can_play(&self) -> bool {
        self.can_control() && self.has_track()
    }

    /// `CanPause`
    pub fn can_pause(&self) -> bool {
        self.can_control()
    }

    /// `CanSeek`
    pub fn can_seek(&self) -> bool {
        self.can_control()
    }

    /// `CanQuit`
    pub fn can_quit(&self) -> bool {
        interfaces::CAN_QUIT
    }

    /// `CanRaise`
    pub fn can_raise(&self) -> bool {
        interfaces::CAN_RAISE
    }

    /// `PlaybackStatus`
    pub fn playback_status(&self) -> PlaybackStatus {
        PlaybackStatus::from(self.status.state())
    }

    /// `Position`, as of the last status refresh.
    pub fn position_in_microseconds(&self) -> i64 {
        self.status
            .seconds("CurrentSec")
            .and_then(|seconds| i64::try_from(seconds).ok())
            .map_or(0, |seconds| seconds.saturating_mul(MICROSECONDS_PER_SECOND))
    }

    /// `Volume`, read from the mixer. Reads as `0.0` when the mixer cannot be queried.
    pub fn volume(&self) -> f64 {
        let argv = vec![
            String::from("amixer"),
            String::from("get"),
            self.options.mixer_control.clone(),
        ];
        match self.transport.execute(&argv) {
            Ok(report) => crate::mixer::parse_percentage(&report)
                .map_or(0.0, crate::mixer::percent_to_volume),
            Err(error) => {
                warn!(%error, "could not read the mixer");
                0.0
            }
        }
    }

    /// Set the player volume to `percent`.
    pub(crate) fn send_volume(&mut self, percent: u8) {
        self.control(&["--volume", &percent.to_string()]);
    }

    /// `Metadata` of the current track, with album art when it can be found.
    pub fn metadata(&self) -> Metadata {
        let metadata = Metadata::from_status(&self.status);
        let art_url = match (&metadata.artist, &metadata.album) {
            (Some(artist), Some(album)) => self.art.lookup(artist, album),
            _ => None,
        };
        metadata.with_art_url(art_url)
    }

    fn has_track(&self) -> bool {
        // untagged files report a blank title
        !self.status.is_idle() && self.status.get("SongTitle").is_some()
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected => Err(Error::NotConnected),
            ConnectionState::Terminated => Err(Error::Terminated),
        }
    }

    fn player_argv(&self, args: &[&str]) -> Vec<String> {
        std::iter::once(self.options.player_command.clone())
            .chain(args.iter().map(|arg| String::from(*arg)))
            .collect()
    }

    /// Send a control command. Failures are logged; the next refresh shows what really happened.
    fn control(&mut self, args: &[&str]) {
        let argv = self.player_argv(args);
        if let Err(error) = self.transport.execute(&argv) {
            warn!(%error, "control command failed");
        }
    }

    fn settle(&self) {
        if !self.options.settle_delay.is_zero() {
            thread::sleep(self.options.settle_delay);
        }
    }

    /// Replace the status dump. Returns whether the player is playing or paused.
    fn refresh_status(&mut self) -> Result<bool, TransportError> {
        let argv = self.player_argv(&["-i"]);
        match self.transport.execute(&argv) {
            Ok(dump) => {
                self.status = RawStatus::parse(&dump);
                self.failed_refreshes = 0;
                Ok(!self.status.is_idle())
            }
            Err(error) => {
                self.status = RawStatus::default();
                self.failed_refreshes += 1;
                Err(error)
            }
        }
    }

    /// Refresh the player state and announce what changed on the Player interface.
    fn update(&mut self, suppress_position: bool) {
        if let Err(error) = self.refresh_status() {
            warn!(%error, failures = self.failed_refreshes, "status query failed");
            if self.state == ConnectionState::Connected
                && self.failed_refreshes >= self.options.max_failed_refreshes
            {
                info!("player is gone, bridge terminated");
                self.state = ConnectionState::Terminated;
                return;
            }
        }

        match self.table.get_all(Interface::Player, self) {
            Ok(snapshot) => {
                let changed = self
                    .snapshots
                    .diff(Interface::Player, snapshot, suppress_position);
                self.emit_changes(Interface::Player, changed);
            }
            Err(error) => warn!(%error, "could not evaluate player properties"),
        }
    }

    fn emit_changes(&mut self, interface: Interface, changed: ChangeSet) {
        if changed.is_empty() {
            return;
        }
        debug!(%interface, properties = ?changed.keys().collect::<Vec<_>>(), "properties changed");
        self.signals
            .push(Signal::PropertiesChanged { interface, changed });
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("failed_refreshes", &self.failed_refreshes)
            .field("pending_signals", &self.signals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::UNIX_EPOCH;

    use super::*;
    use crate::art::NoArt;
    use crate::transport::testing::MockTransport;

    const PLAYING: &str = "\
State: PLAY
File: /music/Band/Record/01.ogg
SongTitle: Song
Artist: Band
Album: Record
TotalSec: 200
CurrentSec: 10
";

    const AMIXER: &str = "  Front Left: Playback 130 [50%] [-38.50dB]\n";

    fn at(millis: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(millis)
    }

    fn options() -> BridgeOptions {
        BridgeOptions {
            settle_delay: Duration::ZERO,
            ..BridgeOptions::default()
        }
    }

    fn bridge_with(options: BridgeOptions, status: &str) -> (Bridge, Rc<MockTransport>) {
        let transport = MockTransport::new();
        transport.respond(&["mocp", "-i"], status);
        transport.respond(&["amixer", "get", "Digital"], AMIXER);
        let mut bridge = Bridge::new(
            ConnectionTarget::local(),
            options,
            Box::new(transport.clone()),
            Box::new(NoArt),
        );
        bridge.connect(at(0)).unwrap();
        transport.clear();
        (bridge, transport)
    }

    fn bridge(status: &str) -> (Bridge, Rc<MockTransport>) {
        bridge_with(options(), status)
    }

    fn read_only() -> BridgeOptions {
        BridgeOptions {
            can_control: false,
            ..options()
        }
    }

    fn changed_properties(signals: &[Signal]) -> Vec<&'static str> {
        signals
            .iter()
            .flat_map(|signal| match signal {
                Signal::PropertiesChanged { changed, .. } => changed.keys().copied().collect(),
                Signal::Seeked(_) => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn it_fails_to_connect_to_an_unreachable_player() {
        let transport = MockTransport::new();
        transport.fail(&["mocp", "-i"]);
        let mut bridge = Bridge::new(
            ConnectionTarget::local(),
            options(),
            Box::new(transport),
            Box::new(NoArt),
        );
        assert!(matches!(bridge.connect(at(0)), Err(Error::UnreachablePlayer(_))));
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn it_connects_to_an_idle_player() {
        let (bridge, _) = bridge("State: STOP\n");
        assert_eq!(bridge.state(), ConnectionState::Connected);
        assert_eq!(bridge.playback_status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn it_refuses_calls_before_connecting() {
        let mut bridge = Bridge::new(
            ConnectionTarget::local(),
            options(),
            Box::new(MockTransport::new()),
            Box::new(NoArt),
        );
        assert!(matches!(
            bridge.get(Interface::Player, "Volume", at(0)),
            Err(Error::NotConnected)
        ));
        assert!(matches!(bridge.next(), Err(Error::NotConnected)));
    }

    #[test]
    fn it_serves_properties_from_the_table() {
        let (mut bridge, _) = bridge(PLAYING);
        assert_eq!(
            bridge.get(Interface::Player, "PlaybackStatus", at(0)).unwrap(),
            Value::from("Playing")
        );
        assert_eq!(
            bridge.get(Interface::Player, "Volume", at(0)).unwrap(),
            Value::F64(0.5)
        );
        assert_eq!(
            bridge.get(Interface::Root, "Identity", at(0)).unwrap(),
            Value::from("MOC (local)")
        );
        assert!(matches!(
            bridge.get(Interface::TrackList, "Tracks", at(0)),
            Err(Error::UnknownInterface(_))
        ));
        assert!(matches!(
            bridge.get(Interface::Player, "Nope", at(0)),
            Err(Error::UnknownProperty { .. })
        ));
    }

    #[test]
    fn it_emits_nothing_when_nothing_changed() {
        let (mut bridge, _) = bridge(PLAYING);
        bridge.tick(at(1_000));
        assert!(bridge.take_signals().is_empty());
        bridge.tick(at(2_000));
        assert!(bridge.take_signals().is_empty());
    }

    #[test]
    fn it_emits_only_what_changed_on_a_tick() {
        let (mut bridge, transport) = bridge(PLAYING);
        transport.respond(
            &["mocp", "-i"],
            &PLAYING.replace("State: PLAY", "State: PAUSE").replace("CurrentSec: 10", "CurrentSec: 11"),
        );

        bridge.tick(at(1_000));
        assert_eq!(changed_properties(&bridge.take_signals()), vec!["PlaybackStatus"]);
    }

    #[test]
    fn it_polls_once_per_quantum() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.tick(at(1_100));
        bridge.tick(at(1_500));
        bridge.tick(at(1_999));
        let status_queries = transport
            .calls()
            .iter()
            .filter(|call| call[..] == ["mocp", "-i"])
            .count();
        assert_eq!(status_queries, 1);
    }

    #[test]
    fn it_refreshes_before_answering_position_reads() {
        let (mut bridge, transport) = bridge(PLAYING);
        transport.respond(&["mocp", "-i"], &PLAYING.replace("CurrentSec: 10", "CurrentSec: 42"));

        // same quantum as the connection: the cached position is served
        assert_eq!(
            bridge.get(Interface::Player, POSITION, at(500)).unwrap(),
            Value::I64(10_000_000)
        );
        assert_eq!(
            bridge.get(Interface::Player, POSITION, at(1_200)).unwrap(),
            Value::I64(42_000_000)
        );
        assert!(changed_properties(&bridge.take_signals()).is_empty());
    }

    #[test]
    fn it_degrades_to_stopped_when_a_refresh_fails() {
        let (mut bridge, transport) = bridge(PLAYING);
        transport.fail(&["mocp", "-i"]);

        bridge.tick(at(1_000));
        assert_eq!(bridge.state(), ConnectionState::Connected);
        assert_eq!(bridge.playback_status(), PlaybackStatus::Stopped);
        assert!(changed_properties(&bridge.take_signals()).contains(&"PlaybackStatus"));
    }

    #[test]
    fn it_terminates_after_repeated_refresh_failures() {
        let (mut bridge, transport) = bridge(PLAYING);
        transport.fail(&["mocp", "-i"]);

        bridge.tick(at(1_000));
        bridge.tick(at(2_000));
        assert_eq!(bridge.state(), ConnectionState::Connected);
        bridge.tick(at(3_000));
        assert_eq!(bridge.state(), ConnectionState::Terminated);
        assert!(matches!(bridge.play(), Err(Error::Terminated)));
    }

    #[test]
    fn it_recovers_when_the_player_answers_again() {
        let (mut bridge, transport) = bridge(PLAYING);
        transport.fail(&["mocp", "-i"]);
        bridge.tick(at(1_000));
        bridge.tick(at(2_000));
        transport.respond(&["mocp", "-i"], PLAYING);
        bridge.tick(at(3_000));
        transport.fail(&["mocp", "-i"]);
        bridge.tick(at(4_000));
        assert_eq!(bridge.state(), ConnectionState::Connected);
    }

    #[test]
    fn it_clamps_volumes_before_sending_them() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.set(Interface::Player, "Volume", Value::F64(-0.5)).unwrap();
        bridge.set(Interface::Player, "Volume", Value::F64(1.7)).unwrap();
        bridge.set(Interface::Player, "Volume", Value::F64(0.42)).unwrap();
        assert_eq!(
            transport.control_calls(),
            vec![
                vec!["mocp", "--volume", "0"],
                vec!["mocp", "--volume", "100"],
                vec!["mocp", "--volume", "42"],
            ]
        );
    }

    #[test]
    fn it_announces_a_successful_set() {
        let (mut bridge, _) = bridge(PLAYING);
        bridge.set(Interface::Player, "Volume", Value::F64(0.5)).unwrap();
        assert_eq!(
            bridge.take_signals(),
            vec![Signal::PropertiesChanged {
                interface: Interface::Player,
                changed: [("Volume", Value::F64(0.5))].into_iter().collect(),
            }]
        );
    }

    #[test]
    fn it_rejects_writes_to_read_only_properties() {
        let (mut bridge, transport) = bridge(PLAYING);
        assert!(matches!(
            bridge.set(Interface::Player, "Position", Value::I64(0)),
            Err(Error::ReadOnlyProperty { .. })
        ));
        assert!(matches!(
            bridge.set(Interface::Root, "Fullscreen", Value::Bool(true)),
            Err(Error::ReadOnlyProperty { .. })
        ));
        assert!(matches!(
            bridge.set(Interface::Player, "Volume", Value::from("loud")),
            Err(Error::InvalidValue { .. })
        ));
        assert!(transport.calls().is_empty());
        assert!(bridge.take_signals().is_empty());
    }

    #[test]
    fn it_pauses_when_the_rate_is_set_to_zero() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.set(Interface::Player, "Rate", Value::F64(0.0)).unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--pause"]]);

        transport.clear();
        bridge.set(Interface::Player, "Rate", Value::F64(2.0)).unwrap();
        assert!(transport.control_calls().is_empty());
    }

    #[test]
    fn it_ignores_control_without_the_control_capability() {
        let (mut bridge, transport) = bridge_with(read_only(), PLAYING);

        bridge.seek(5_000_000).unwrap();
        bridge.set_position(TRACK_ID, 5_000_000).unwrap();
        bridge.stop().unwrap();
        bridge.set(Interface::Player, "Volume", Value::F64(0.3)).unwrap();
        bridge.set(Interface::Player, "Rate", Value::F64(0.0)).unwrap();

        assert!(transport.calls().is_empty());
        assert!(bridge.take_signals().is_empty());
        assert_eq!(
            bridge.get(Interface::Player, "CanControl", at(0)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn it_skips_next_and_previous_without_a_track() {
        let (mut bridge, transport) = bridge("State: STOP\n");
        bridge.next().unwrap();
        bridge.previous().unwrap();
        bridge.play().unwrap();
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn it_refreshes_after_next() {
        let (mut bridge, transport) = bridge(PLAYING);
        transport.respond(&["mocp", "-i"], &PLAYING.replace("SongTitle: Song", "SongTitle: Other"));

        bridge.next().unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--next"]]);
        assert_eq!(changed_properties(&bridge.take_signals()), vec!["Metadata"]);
    }

    #[test]
    fn it_toggles_between_play_and_pause() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.play_pause().unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--pause"]]);

        transport.respond(&["mocp", "-i"], &PLAYING.replace("State: PLAY", "State: PAUSE"));
        transport.clear();
        bridge.play_pause().unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--unpause"]]);
    }

    #[test]
    fn it_seeks_relative_and_announces_the_new_position() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.seek(-15_000_000).unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--seek", "-15"]]);
        assert_eq!(bridge.take_signals().first(), Some(&Signal::Seeked(0)));

        transport.clear();
        bridge.seek(5_500_000).unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--seek", "6"]]);
        assert_eq!(bridge.take_signals().first(), Some(&Signal::Seeked(16_000_000)));
    }

    #[test]
    fn it_rounds_sub_second_seeks_to_what_mocp_can_do() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.seek(-900_000).unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--seek", "-1"]]);
        assert_eq!(bridge.take_signals().first(), Some(&Signal::Seeked(9_000_000)));

        transport.clear();
        bridge.seek(400_000).unwrap();
        assert!(transport.control_calls().is_empty());
        assert_eq!(bridge.take_signals().first(), Some(&Signal::Seeked(10_000_000)));
    }

    #[test]
    fn it_jumps_to_absolute_positions_within_the_current_track() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.set_position(TRACK_ID, 61_900_000).unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--jump", "61s"]]);
        assert_eq!(bridge.take_signals().first(), Some(&Signal::Seeked(61_000_000)));

        transport.clear();
        bridge.set_position("/some/other/track", 1_000_000).unwrap();
        bridge.set_position(TRACK_ID, -1).unwrap();
        bridge.set_position(TRACK_ID, 201_000_000).unwrap();
        assert!(transport.control_calls().is_empty());
        assert!(bridge.take_signals().is_empty());
    }

    #[test]
    fn it_terminates_on_quit() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.quit().unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "-x"]]);
        assert!(bridge.is_terminated());
        assert!(matches!(bridge.get_all(Interface::Root), Err(Error::Terminated)));
    }

    #[test]
    fn it_raises_the_player_in_the_music_folder() {
        let (mut bridge, transport) = bridge(PLAYING);
        bridge.raise().unwrap();
        assert_eq!(
            transport.launched(),
            vec![vec![
                "xterm",
                "-e",
                "mocp",
                "-m",
                "-O",
                "MusicDir=/music/Band/Record"
            ]]
        );
    }

    #[test]
    fn it_skips_garbage_in_the_status_dump() {
        let (bridge, _) = bridge("State: PLAY\ngarbage\nArtist: Test\n");
        assert_eq!(bridge.status().len(), 2);
        assert_eq!(bridge.status().get("Artist"), Some("Test"));
        assert_eq!(
            bridge.get_all(Interface::Player).unwrap()["PlaybackStatus"],
            Value::from("Playing")
        );
    }

    #[test]
    fn it_leaves_unknown_metadata_out() {
        let (bridge, _) = bridge(&PLAYING.replace("Artist: Band\n", ""));
        let metadata = bridge.get_all(Interface::Player).unwrap()["Metadata"]
            .clone()
            .into_map()
            .unwrap();
        assert!(!metadata.contains_key("xesam:artist"));
        assert!(!metadata.contains_key("mpris:artUrl"));
        assert_eq!(metadata["xesam:album"], Value::from("Record"));
    }

    #[test]
    fn it_allows_skipping_untagged_tracks() {
        let (mut bridge, transport) = bridge(&PLAYING.replace("SongTitle: Song", "SongTitle: "));
        let player = bridge.get_all(Interface::Player).unwrap();
        assert_eq!(player["CanGoNext"], Value::Bool(true));
        assert_eq!(player["CanPlay"], Value::Bool(true));

        bridge.next().unwrap();
        assert_eq!(transport.control_calls(), vec![vec!["mocp", "--next"]]);
    }

    #[test]
    fn it_reports_a_stopped_player_as_not_controllable_by_track() {
        let (bridge, _) = bridge("State: STOP\n");
        let player = bridge.get_all(Interface::Player).unwrap();
        assert_eq!(player["PlaybackStatus"], Value::from("Stopped"));
        assert_eq!(player["CanGoNext"], Value::Bool(false));
        assert_eq!(player["CanGoPrevious"], Value::Bool(false));
        assert_eq!(player["CanPlay"], Value::Bool(false));
        assert_eq!(player["CanPause"], Value::Bool(true));
    }
}
