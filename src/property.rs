//! The property table: per-interface registries of getters and optional setters.
//!
//! The table is generic over the context `C` its getters read from and its setters act on, so the
//! same machinery serves the bridge and can be exercised on its own in tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::Value;

/// `org.mpris.MediaPlayer2`
pub const ROOT_INTERFACE: &str = "org.mpris.MediaPlayer2";
/// `org.mpris.MediaPlayer2.Player`
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";
/// `org.mpris.MediaPlayer2.TrackList`
pub const TRACK_LIST_INTERFACE: &str = "org.mpris.MediaPlayer2.TrackList";
/// `org.mpris.MediaPlayer2.Playlists`
pub const PLAYLISTS_INTERFACE: &str = "org.mpris.MediaPlayer2.Playlists";

/// A named group of properties on the bridge object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interface {
    /// `org.mpris.MediaPlayer2`
    Root,
    /// `org.mpris.MediaPlayer2.Player`
    Player,
    /// `org.mpris.MediaPlayer2.TrackList` (known, never registered)
    TrackList,
    /// `org.mpris.MediaPlayer2.Playlists` (known, never registered)
    Playlists,
}

impl Interface {
    /// The D-Bus interface name.
    pub fn name(self) -> &'static str {
        match self {
            Interface::Root => ROOT_INTERFACE,
            Interface::Player => PLAYER_INTERFACE,
            Interface::TrackList => TRACK_LIST_INTERFACE,
            Interface::Playlists => PLAYLISTS_INTERFACE,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interface {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            ROOT_INTERFACE => Ok(Interface::Root),
            PLAYER_INTERFACE => Ok(Interface::Player),
            TRACK_LIST_INTERFACE => Ok(Interface::TrackList),
            PLAYLISTS_INTERFACE => Ok(Interface::Playlists),
            other => Err(Error::UnknownInterface(other.to_string())),
        }
    }
}

/// Full evaluation of one interface's properties at one instant.
pub type Snapshot = BTreeMap<&'static str, Value>;

/// What a setter did with the value it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was applied; a change notification should follow.
    Applied,
    /// The capability check refused it (or it was meaningless); nothing happened.
    Skipped,
}

/// Where a property's value comes from.
pub enum Getter<C> {
    /// A fixed value.
    Constant(Value),
    /// Computed from the context each time it is read.
    Computed(fn(&C) -> Value),
}

impl<C> Getter<C> {
    /// Evaluate the getter against `context`.
    pub fn read(&self, context: &C) -> Value {
        match self {
            Getter::Constant(value) => value.clone(),
            Getter::Computed(getter) => getter(context),
        }
    }
}

impl<C> fmt::Debug for Getter<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Getter::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Getter::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// Applies a written value to the context, with side effects on the player.
pub type Setter<C> = fn(&mut C, Value) -> Result<SetOutcome>;

/// A getter and an optional setter, exposed under a name.
pub struct PropertyDescriptor<C> {
    name: &'static str,
    getter: Getter<C>,
    setter: Option<Setter<C>>,
}

impl<C> PropertyDescriptor<C> {
    /// Returns the property name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the getter.
    pub fn getter(&self) -> &Getter<C> {
        &self.getter
    }

    /// Returns the setter, `None` for read-only properties.
    pub fn setter(&self) -> Option<Setter<C>> {
        self.setter
    }

    /// `true` if the property can be written.
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

impl<C> fmt::Debug for PropertyDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("getter", &self.getter)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Properties registered for one interface, in registration order.
pub struct InterfaceProperties<C> {
    properties: Vec<PropertyDescriptor<C>>,
}

impl<C> InterfaceProperties<C> {
    /// Start an empty registry.
    pub fn new() -> Self {
        InterfaceProperties {
            properties: Vec::new(),
        }
    }

    /// Register a constant, read-only property.
    pub fn constant<V: Into<Value>>(self, name: &'static str, value: V) -> Self {
        self.register(name, Getter::Constant(value.into()), None)
    }

    /// Register a computed, read-only property.
    pub fn computed(self, name: &'static str, getter: fn(&C) -> Value) -> Self {
        self.register(name, Getter::Computed(getter), None)
    }

    /// Register a writable property.
    pub fn writable(self, name: &'static str, getter: Getter<C>, setter: Setter<C>) -> Self {
        self.register(name, getter, Some(setter))
    }

    /// Register a property. A name registered twice replaces the earlier registration.
    pub fn register(
        mut self,
        name: &'static str,
        getter: Getter<C>,
        setter: Option<Setter<C>>,
    ) -> Self {
        let descriptor = PropertyDescriptor {
            name,
            getter,
            setter,
        };
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = descriptor,
            None => self.properties.push(descriptor),
        }
        self
    }

    /// Look up a property by name.
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor<C>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterate the properties in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor<C>> {
        self.properties.iter()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<C> Default for InterfaceProperties<C> {
    fn default() -> Self {
        InterfaceProperties::new()
    }
}

impl<C> fmt::Debug for InterfaceProperties<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.properties.iter()).finish()
    }
}

/// Registry of every interface's properties.
pub struct PropertyTable<C> {
    interfaces: HashMap<Interface, InterfaceProperties<C>>,
}

impl<C> PropertyTable<C> {
    /// An empty table.
    pub fn new() -> Self {
        PropertyTable {
            interfaces: HashMap::new(),
        }
    }

    /// Register (or replace) the properties of an interface.
    pub fn with_interface(mut self, interface: Interface, properties: InterfaceProperties<C>) -> Self {
        self.interfaces.insert(interface, properties);
        self
    }

    /// `true` if `interface` has been registered.
    pub fn has_interface(&self, interface: Interface) -> bool {
        self.interfaces.contains_key(&interface)
    }

    /// The registered properties of `interface`.
    pub fn interface(&self, interface: Interface) -> Result<&InterfaceProperties<C>> {
        self.interfaces
            .get(&interface)
            .ok_or_else(|| Error::UnknownInterface(interface.name().to_string()))
    }

    /// Look up one property.
    pub fn descriptor(&self, interface: Interface, name: &str) -> Result<&PropertyDescriptor<C>> {
        self.interface(interface)?
            .get(name)
            .ok_or_else(|| Error::UnknownProperty {
                interface,
                name: name.to_string(),
            })
    }

    /// Evaluate one property's getter.
    pub fn get(&self, interface: Interface, name: &str, context: &C) -> Result<Value> {
        Ok(self.descriptor(interface, name)?.getter().read(context))
    }

    /// Evaluate every getter of `interface`.
    pub fn get_all(&self, interface: Interface, context: &C) -> Result<Snapshot> {
        Ok(self
            .interface(interface)?
            .iter()
            .map(|p| (p.name(), p.getter().read(context)))
            .collect())
    }

    /// Find the setter of a property, failing for read-only ones.
    ///
    /// The setter is returned rather than invoked so the caller can release its borrow of the
    /// table before handing the context over mutably.
    pub fn setter(&self, interface: Interface, name: &str) -> Result<(&'static str, Setter<C>)> {
        let descriptor = self.descriptor(interface, name)?;
        match descriptor.setter() {
            Some(setter) => Ok((descriptor.name(), setter)),
            None => Err(Error::ReadOnlyProperty {
                interface,
                name: name.to_string(),
            }),
        }
    }
}

impl<C> Default for PropertyTable<C> {
    fn default() -> Self {
        PropertyTable::new()
    }
}

impl<C> fmt::Debug for PropertyTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.interfaces.iter()).finish()
    }
}
