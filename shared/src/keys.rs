//! Keyboard → directional intent tracking.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::animation::ClipId;
use crate::intent::{Direction, DirectionalIntentSet};

/// Anything usable as a key code: a raw `u32` code, Bevy's `KeyCode`, ...
pub trait KeyCodeLike: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static> KeyCodeLike for T {}

pub type KeyCallback = Box<dyn FnMut() + Send + Sync>;

/// A one-shot binding fired on the press edge of `key`.
pub struct AlternateBinding<K> {
    pub key: K,
    callback: KeyCallback,
}

impl<K: fmt::Debug> fmt::Debug for AlternateBinding<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlternateBinding").field("key", &self.key).finish_non_exhaustive()
    }
}

impl<K> AlternateBinding<K> {
    pub fn new(key: K, callback: impl FnMut() + Send + Sync + 'static) -> Self {
        Self {
            key,
            callback: Box::new(callback),
        }
    }
}

/// Movement keys plus any number of alternate one-shot bindings.
#[derive(Debug)]
pub struct KeyMapping<K> {
    pub forward: K,
    pub backward: K,
    pub left: K,
    pub right: K,
    pub alternates: Vec<AlternateBinding<K>>,
}

impl<K: KeyCodeLike> KeyMapping<K> {
    pub fn new(forward: K, backward: K, left: K, right: K) -> Self {
        Self {
            forward,
            backward,
            left,
            right,
            alternates: Vec::new(),
        }
    }

    pub fn with_alternate(mut self, key: K, callback: impl FnMut() + Send + Sync + 'static) -> Self {
        self.alternates.push(AlternateBinding::new(key, callback));
        self
    }

    fn movement(&self) -> [(K, Direction); 4] {
        [
            (self.forward, Direction::Forward),
            (self.backward, Direction::Backward),
            (self.left, Direction::Left),
            (self.right, Direction::Right),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMappingError {
    /// Two movement directions share the same key.
    DuplicateMovementKey(String),
    /// An alternate binding reuses a movement key.
    AlternateShadowsMovementKey(String),
    /// The same key is bound to two alternate callbacks.
    DuplicateAlternate(String),
}

impl fmt::Display for KeyMappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMappingError::DuplicateMovementKey(key) => {
                write!(f, "key {key} is bound to more than one movement direction")
            }
            KeyMappingError::AlternateShadowsMovementKey(key) => {
                write!(f, "alternate binding on {key} collides with a movement key")
            }
            KeyMappingError::DuplicateAlternate(key) => {
                write!(f, "key {key} has more than one alternate binding")
            }
        }
    }
}

impl std::error::Error for KeyMappingError {}

/// Keeps a [`DirectionalIntentSet`] in sync with raw key transitions.
pub struct KeyIntentTracker<K> {
    movement: HashMap<K, Direction>,
    alternates: HashMap<K, KeyCallback>,
    /// Keys whose press edge was already consumed; cleared on key up.
    pressed: HashSet<K>,
    intents: DirectionalIntentSet,
}

impl<K: KeyCodeLike> KeyIntentTracker<K> {
    pub fn new(mapping: KeyMapping<K>) -> Result<Self, KeyMappingError> {
        let mut movement = HashMap::new();
        for (key, direction) in mapping.movement() {
            if movement.insert(key, direction).is_some() {
                return Err(KeyMappingError::DuplicateMovementKey(format!("{key:?}")));
            }
        }

        let mut alternates = HashMap::new();
        for binding in mapping.alternates {
            if movement.contains_key(&binding.key) {
                return Err(KeyMappingError::AlternateShadowsMovementKey(format!(
                    "{:?}",
                    binding.key
                )));
            }
            if alternates.insert(binding.key, binding.callback).is_some() {
                return Err(KeyMappingError::DuplicateAlternate(format!("{:?}", binding.key)));
            }
        }

        Ok(Self {
            movement,
            alternates,
            pressed: HashSet::new(),
            intents: DirectionalIntentSet::default(),
        })
    }

    pub fn intents(&self) -> &DirectionalIntentSet {
        &self.intents
    }

    pub fn is_movement_key(&self, key: K) -> bool {
        self.movement.contains_key(&key)
    }

    /// Returns the clip the avatar should switch to, if `key` is a movement key.
    pub fn key_down(&mut self, key: K) -> Option<ClipId> {
        let direction = *self.movement.get(&key)?;
        self.intents.set(direction, 1.0);
        Some(match direction {
            Direction::Left => ClipId::MoveLeft,
            Direction::Right => ClipId::MoveRight,
            Direction::Forward | Direction::Backward => ClipId::Run,
        })
    }

    /// Returns `Some(ClipId::Idle)` when the last held movement key is released.
    pub fn key_up(&mut self, key: K) -> Option<ClipId> {
        self.pressed.remove(&key);
        let direction = *self.movement.get(&key)?;
        self.intents.clear(direction);
        if self.intents.any_active() {
            None
        } else {
            Some(ClipId::Idle)
        }
    }

    /// Fire the alternate callback bound to `key`, at most once until the key is released.
    pub fn key_press(&mut self, key: K) -> bool {
        let Some(callback) = self.alternates.get_mut(&key) else {
            return false;
        };
        if !self.pressed.insert(key) {
            return false;
        }
        callback();
        true
    }

    /// Forget every held key (window focus lost).
    pub fn release_all(&mut self) {
        self.pressed.clear();
        self.intents.clear_all();
    }
}
