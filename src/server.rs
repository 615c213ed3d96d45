//! Puts a [`Bridge`] on the session bus.
//!
//! Method calls are read straight off the connection's message stream and dispatched by hand, so
//! every `Get`, `GetAll` and `Set` goes through the bridge's property table. Signals the bridge
//! queues are emitted after every call and every poll tick.

use std::collections::HashMap;
use std::time::SystemTime;

use futures_util::stream::StreamExt;
use tracing::{debug, info, trace, warn};
use zbus::fdo;
use zbus::names::BusName;
use zbus::zvariant::{self, OwnedObjectPath, OwnedValue};
use zbus::{Connection, Message, MessageStream, MessageType};

use crate::bridge::{Bridge, Signal};
use crate::error::{Error, Result};
use crate::property::{Interface, PLAYER_INTERFACE, ROOT_INTERFACE};
use crate::value::Value;
use crate::{BUS_NAME, OBJECT_PATH};

const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";
const PEER_INTERFACE: &str = "org.freedesktop.DBus.Peer";

/// Introspection data of the bridge object.
const INTROSPECTION: &str = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
 "http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
  <interface name="org.freedesktop.DBus.Introspectable">
    <method name="Introspect">
      <arg name="data" type="s" direction="out"/>
    </method>
  </interface>
  <interface name="org.freedesktop.DBus.Peer">
    <method name="Ping"/>
  </interface>
  <interface name="org.freedesktop.DBus.Properties">
    <method name="Get">
      <arg name="interface_name" type="s" direction="in"/>
      <arg name="property_name" type="s" direction="in"/>
      <arg name="value" type="v" direction="out"/>
    </method>
    <method name="GetAll">
      <arg name="interface_name" type="s" direction="in"/>
      <arg name="properties" type="a{sv}" direction="out"/>
    </method>
    <method name="Set">
      <arg name="interface_name" type="s" direction="in"/>
      <arg name="property_name" type="s" direction="in"/>
      <arg name="value" type="v" direction="in"/>
    </method>
    <signal name="PropertiesChanged">
      <arg name="interface_name" type="s"/>
      <arg name="changed_properties" type="a{sv}"/>
      <arg name="invalidated_properties" type="as"/>
    </signal>
  </interface>
  <interface name="org.mpris.MediaPlayer2">
    <method name="Raise"/>
    <method name="Quit"/>
    <property name="CanQuit" type="b" access="read"/>
    <property name="Fullscreen" type="b" access="read"/>
    <property name="CanSetFullscreen" type="b" access="read"/>
    <property name="CanRaise" type="b" access="read"/>
    <property name="HasTrackList" type="b" access="read"/>
    <property name="Identity" type="s" access="read"/>
    <property name="SupportedUriSchemes" type="as" access="read"/>
    <property name="SupportedMimeTypes" type="as" access="read"/>
  </interface>
  <interface name="org.mpris.MediaPlayer2.Player">
    <method name="Next"/>
    <method name="Previous"/>
    <method name="Pause"/>
    <method name="PlayPause"/>
    <method name="Stop"/>
    <method name="Play"/>
    <method name="Seek">
      <arg name="Offset" type="x" direction="in"/>
    </method>
    <method name="SetPosition">
      <arg name="TrackId" type="o" direction="in"/>
      <arg name="Position" type="x" direction="in"/>
    </method>
    <method name="OpenUri">
      <arg name="Uri" type="s" direction="in"/>
    </method>
    <signal name="Seeked">
      <arg name="Position" type="x"/>
    </signal>
    <property name="PlaybackStatus" type="s" access="read"/>
    <property name="LoopStatus" type="s" access="read"/>
    <property name="Rate" type="d" access="readwrite"/>
    <property name="Shuffle" type="b" access="read"/>
    <property name="Metadata" type="a{sv}" access="read"/>
    <property name="Volume" type="d" access="readwrite"/>
    <property name="Position" type="x" access="read"/>
    <property name="MinimumRate" type="d" access="read"/>
    <property name="MaximumRate" type="d" access="read"/>
    <property name="CanGoNext" type="b" access="read"/>
    <property name="CanGoPrevious" type="b" access="read"/>
    <property name="CanPlay" type="b" access="read"/>
    <property name="CanPause" type="b" access="read"/>
    <property name="CanSeek" type="b" access="read"/>
    <property name="CanControl" type="b" access="read"/>
  </interface>
</node>
"#;

// Message bodies, as declared in the introspection data.
type GetArgs = (String, String);
type GetAllArgs = String;
type SetArgs = (String, String, OwnedValue);
type SeekArgs = i64;
type SetPositionArgs = (OwnedObjectPath, i64);
type PropertiesChangedBody<'a> = (&'a str, HashMap<&'a str, zvariant::Value<'a>>, Vec<&'a str>);
type SeekedBody = i64;

/// Map a bridge error onto the standard D-Bus error it is reported as.
pub fn dbus_error(error: &Error) -> fdo::Error {
    let message = error.to_string();
    match error {
        Error::UnknownInterface(_) => fdo::Error::UnknownInterface(message),
        Error::UnknownProperty { .. } => fdo::Error::UnknownProperty(message),
        Error::ReadOnlyProperty { .. } => fdo::Error::PropertyReadOnly(message),
        Error::InvalidValue { .. } => fdo::Error::InvalidArgs(message),
        Error::UnreachablePlayer(_)
        | Error::NotConnected
        | Error::Terminated
        | Error::Transport(_)
        | Error::DBus(_) => fdo::Error::Failed(message),
    }
}

/// Introspection data for `path`: the full object, or the chain of nodes leading to it.
pub fn introspect(path: &str) -> String {
    if path == OBJECT_PATH {
        return String::from(INTROSPECTION);
    }

    let prefix = if path == "/" {
        String::from("/")
    } else {
        format!("{}/", path)
    };
    let child = OBJECT_PATH
        .strip_prefix(&prefix)
        .and_then(|rest| rest.split('/').next());
    match child {
        Some(child) => format!("<node>\n  <node name=\"{}\"/>\n</node>\n", child),
        None => String::from("<node/>\n"),
    }
}

/// What a method call answers with.
#[derive(Debug)]
enum Reply {
    Empty,
    Text(String),
    Variant(zvariant::Value<'static>),
    Properties(HashMap<String, zvariant::Value<'static>>),
}

/// Serves one bridge on one bus connection.
#[derive(Debug)]
pub struct Server {
    connection: Connection,
    bridge: Bridge,
}

impl Server {
    /// Wrap an already connected bridge.
    pub fn new(connection: Connection, bridge: Bridge) -> Self {
        Server { connection, bridge }
    }

    /// Returns the bridge being served.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Claim the well-known name and serve until the bridge terminates or the bus goes away.
    pub async fn run(mut self) -> Result<()> {
        // subscribe before claiming the name so no early call is missed
        let mut stream = MessageStream::from(&self.connection);
        self.connection.request_name(BUS_NAME).await?;
        info!(name = BUS_NAME, path = OBJECT_PATH, "serving on the session bus");

        while !self.bridge.is_terminated() {
            let wait = self.bridge.until_next_tick(SystemTime::now());
            match async_std::future::timeout(wait, stream.next()).await {
                Ok(Some(Ok(message))) => {
                    if let Err(error) = self.handle(&message).await {
                        warn!(%error, "could not answer a method call");
                    }
                }
                Ok(Some(Err(error))) => warn!(%error, "could not read a message"),
                Ok(None) => {
                    info!("bus connection closed");
                    break;
                }
                Err(_) => trace!("poll tick"),
            }

            self.bridge.tick(SystemTime::now());
            self.flush().await?;
        }

        if let Err(error) = self.connection.release_name(BUS_NAME).await {
            debug!(%error, "could not release the bus name");
        }
        Ok(())
    }

    async fn handle(&mut self, message: &Message) -> Result<()> {
        let header = message.header()?;
        if !matches!(header.message_type(), Ok(MessageType::MethodCall)) {
            return Ok(());
        }

        let path = header.path().ok().flatten().map(|p| p.as_str().to_string());
        let interface = header.interface().ok().flatten().map(|i| i.as_str().to_string());
        let member = header.member().ok().flatten().map(|m| m.as_str().to_string());
        let (path, member) = match (path, member) {
            (Some(path), Some(member)) => (path, member),
            _ => return Ok(()),
        };
        trace!(%path, ?interface, %member, "method call");

        match self.dispatch(&path, interface.as_deref(), &member, message) {
            Ok(Reply::Empty) => self.connection.reply(message, &()).await?,
            Ok(Reply::Text(text)) => self.connection.reply(message, &text).await?,
            Ok(Reply::Variant(value)) => self.connection.reply(message, &value).await?,
            Ok(Reply::Properties(properties)) => {
                self.connection.reply(message, &properties).await?
            }
            Err(error) => {
                debug!(%error, %member, "method call failed");
                self.connection.reply_dbus_error(&header, error).await?
            }
        };
        Ok(())
    }

    fn dispatch(
        &mut self,
        path: &str,
        interface: Option<&str>,
        member: &str,
        message: &Message,
    ) -> Result<Reply, fdo::Error> {
        match (interface, member) {
            (Some(INTROSPECTABLE_INTERFACE), "Introspect") => {
                return Ok(Reply::Text(introspect(path)))
            }
            (Some(PEER_INTERFACE), "Ping") => return Ok(Reply::Empty),
            _ => {}
        }

        if path != OBJECT_PATH {
            return Err(fdo::Error::UnknownObject(format!("no object at {}", path)));
        }

        match interface {
            Some(PROPERTIES_INTERFACE) => self.properties(member, message),
            Some(ROOT_INTERFACE) => self.root(member),
            Some(PLAYER_INTERFACE) => self.player(member, message),
            Some(other) => Err(fdo::Error::UnknownInterface(format!(
                "unknown interface {}",
                other
            ))),
            None => Err(fdo::Error::UnknownMethod(format!(
                "method {} needs an interface",
                member
            ))),
        }
    }

    fn properties(&mut self, member: &str, message: &Message) -> Result<Reply, fdo::Error> {
        match member {
            "Get" => {
                let (interface, name) = message
                    .body::<GetArgs>()
                    .map_err(invalid_args)?;
                let interface = parse_interface(&interface)?;
                let value = self
                    .bridge
                    .get(interface, &name, SystemTime::now())
                    .map_err(|e| dbus_error(&e))?;
                Ok(Reply::Variant(value.to_variant()))
            }
            "GetAll" => {
                let interface = message.body::<GetAllArgs>().map_err(invalid_args)?;
                let interface = parse_interface(&interface)?;
                let snapshot = self.bridge.get_all(interface).map_err(|e| dbus_error(&e))?;
                Ok(Reply::Properties(
                    snapshot
                        .iter()
                        .map(|(name, value)| (name.to_string(), value.to_variant()))
                        .collect(),
                ))
            }
            "Set" => {
                let (interface, name, value) = message
                    .body::<SetArgs>()
                    .map_err(invalid_args)?;
                let interface = parse_interface(&interface)?;
                let value = Value::from_variant(&value).ok_or_else(|| {
                    fdo::Error::InvalidArgs(format!("unsupported value for {}", name))
                })?;
                self.bridge
                    .set(interface, &name, value)
                    .map_err(|e| dbus_error(&e))?;
                Ok(Reply::Empty)
            }
            other => Err(unknown_method(PROPERTIES_INTERFACE, other)),
        }
    }

    fn root(&mut self, member: &str) -> Result<Reply, fdo::Error> {
        let result = match member {
            "Raise" => self.bridge.raise(),
            "Quit" => self.bridge.quit(),
            other => return Err(unknown_method(ROOT_INTERFACE, other)),
        };
        result.map(|_| Reply::Empty).map_err(|e| dbus_error(&e))
    }

    fn player(&mut self, member: &str, message: &Message) -> Result<Reply, fdo::Error> {
        let result = match member {
            "Next" => self.bridge.next(),
            "Previous" => self.bridge.previous(),
            "Pause" => self.bridge.pause(),
            "PlayPause" => self.bridge.play_pause(),
            "Stop" => self.bridge.stop(),
            "Play" => self.bridge.play(),
            "Seek" => {
                let offset = message.body::<SeekArgs>().map_err(invalid_args)?;
                self.bridge.seek(offset)
            }
            "SetPosition" => {
                let (track_id, position) = message
                    .body::<SetPositionArgs>()
                    .map_err(invalid_args)?;
                self.bridge.set_position(track_id.as_str(), position)
            }
            "OpenUri" => {
                return Err(fdo::Error::NotSupported(String::from(
                    "opening URIs is not supported",
                )))
            }
            other => return Err(unknown_method(PLAYER_INTERFACE, other)),
        };
        result.map(|_| Reply::Empty).map_err(|e| dbus_error(&e))
    }

    /// Emit every signal the bridge queued.
    async fn flush(&mut self) -> Result<()> {
        for signal in self.bridge.take_signals() {
            match signal {
                Signal::PropertiesChanged { interface, changed } => {
                    let changed: HashMap<&str, zvariant::Value<'_>> = changed
                        .iter()
                        .map(|(name, value)| (*name, value.to_variant()))
                        .collect();
                    let body: PropertiesChangedBody<'_> = (interface.name(), changed, Vec::new());
                    self.connection
                        .emit_signal(
                            None::<BusName<'_>>,
                            OBJECT_PATH,
                            PROPERTIES_INTERFACE,
                            "PropertiesChanged",
                            &body,
                        )
                        .await?;
                }
                Signal::Seeked(position) => {
                    let body: SeekedBody = position;
                    self.connection
                        .emit_signal(
                            None::<BusName<'_>>,
                            OBJECT_PATH,
                            PLAYER_INTERFACE,
                            "Seeked",
                            &body,
                        )
                        .await?;
                }
            }
        }
        Ok(())
    }
}

fn invalid_args(error: zbus::Error) -> fdo::Error {
    fdo::Error::InvalidArgs(error.to_string())
}

fn parse_interface(name: &str) -> Result<Interface, fdo::Error> {
    name.parse::<Interface>().map_err(|e| dbus_error(&e))
}

fn unknown_method(interface: &str, member: &str) -> fdo::Error {
    fdo::Error::UnknownMethod(format!("unknown method {}.{}", interface, member))
}
