use crate::models::{ArrowDirection, GridPosition, Key, ModifierKey, Shortcut, WindowAction};
use crate::{GridSnapError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Event emitted when a bound shortcut is pressed
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardEvent {
    pub shortcut: Shortcut,
    pub action: WindowAction,
}

/// Callback invoked for every dispatched event
pub type KeyboardObserver = Box<dyn Fn(&KeyboardEvent) + Send + Sync>;

/// Metrics for keyboard handler operations
#[derive(Debug, Default, Clone)]
pub struct KeyboardHandlerMetrics {
    pub registered_bindings: usize,
    pub triggered_events: u64,
    pub unmatched_events: u64,
    pub conflicts_prevented: u64,
}

/// Maps global shortcuts to window actions and fans dispatched actions out to
/// observers
pub struct KeyboardHandler {
    bindings: Arc<RwLock<HashMap<Shortcut, WindowAction>>>,
    observers: Arc<RwLock<Vec<KeyboardObserver>>>,
    metrics: Arc<RwLock<KeyboardHandlerMetrics>>,
    reserved_shortcuts: HashSet<Shortcut>,
}

impl KeyboardHandler {
    /// Create a handler with no bindings. Shortcuts in `reserved_shortcuts`
    /// are refused so system combinations are never shadowed.
    pub fn new(reserved_shortcuts: HashSet<Shortcut>) -> Self {
        Self {
            bindings: Arc::new(RwLock::new(HashMap::new())),
            observers: Arc::new(RwLock::new(Vec::new())),
            metrics: Arc::new(RwLock::new(KeyboardHandlerMetrics::default())),
            reserved_shortcuts,
        }
    }

    /// Handler pre-loaded with the stock table from `default_bindings`
    pub async fn with_default_bindings() -> Result<Self> {
        let handler = Self::new(reserved_shortcuts());
        for (shortcut, action) in default_bindings() {
            handler.register_binding(shortcut, action).await?;
        }
        Ok(handler)
    }

    /// Bind `shortcut` to `action`. Fails if the shortcut is reserved or
    /// already bound.
    pub async fn register_binding(&self, shortcut: Shortcut, action: WindowAction) -> Result<()> {
        if self.reserved_shortcuts.contains(&shortcut) {
            warn!(shortcut = %shortcut, "Shortcut conflicts with macOS reserved combination");
            self.metrics.write().await.conflicts_prevented += 1;
            return Err(GridSnapError::ValidationError(format!(
                "Shortcut {shortcut} is reserved by the system"
            ))
            .into());
        }

        let mut bindings = self.bindings.write().await;
        if let Some(existing) = bindings.get(&shortcut) {
            let message = format!("Shortcut {shortcut} is already bound to {}", existing.label());
            drop(bindings);
            self.metrics.write().await.conflicts_prevented += 1;
            return Err(GridSnapError::ValidationError(message).into());
        }

        debug!(shortcut = %shortcut, action = %action.label(), "Registered shortcut");
        bindings.insert(shortcut, action);
        self.metrics.write().await.registered_bindings = bindings.len();
        Ok(())
    }

    /// Remove a binding, returning the action it triggered
    pub async fn unregister_binding(&self, shortcut: &Shortcut) -> Option<WindowAction> {
        let mut bindings = self.bindings.write().await;
        let removed = bindings.remove(shortcut);
        if removed.is_some() {
            self.metrics.write().await.registered_bindings = bindings.len();
        }
        removed
    }

    /// Apply user overrides: each action loses its previous shortcut, and a
    /// shortcut taken by another action is moved to the overriding one.
    /// Returns the number of overrides applied.
    pub async fn apply_overrides(&self, overrides: Vec<(Shortcut, WindowAction)>) -> Result<usize> {
        let mut applied = 0;
        for (shortcut, action) in overrides {
            {
                let mut bindings = self.bindings.write().await;
                bindings.retain(|_, bound| *bound != action);
                if let Some(previous) = bindings.remove(&shortcut) {
                    warn!(
                        shortcut = %shortcut,
                        previous = %previous.label(),
                        action = %action.label(),
                        "Override replaces an existing binding"
                    );
                }
            }

            self.register_binding(shortcut, action).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Register a callback for every dispatched event
    pub async fn subscribe(&self, observer: KeyboardObserver) {
        self.observers.write().await.push(observer);
    }

    /// Dispatch a pressed shortcut. Returns the event when a binding matches,
    /// after every observer has seen it.
    pub async fn handle_shortcut(&self, shortcut: &Shortcut) -> Option<KeyboardEvent> {
        let action = self.bindings.read().await.get(shortcut).copied();

        let Some(action) = action else {
            self.metrics.write().await.unmatched_events += 1;
            debug!(shortcut = %shortcut, "No binding for shortcut");
            return None;
        };

        let event = KeyboardEvent {
            shortcut: shortcut.clone(),
            action,
        };
        for observer in self.observers.read().await.iter() {
            observer(&event);
        }

        self.metrics.write().await.triggered_events += 1;
        Some(event)
    }

    pub async fn action_for(&self, shortcut: &Shortcut) -> Option<WindowAction> {
        self.bindings.read().await.get(shortcut).copied()
    }

    pub async fn shortcut_for(&self, action: WindowAction) -> Option<Shortcut> {
        self.bindings
            .read()
            .await
            .iter()
            .find(|(_, bound)| **bound == action)
            .map(|(shortcut, _)| shortcut.clone())
    }

    /// Snapshot all bindings, ordered by shortcut text
    pub async fn bindings(&self) -> Vec<(Shortcut, WindowAction)> {
        let mut bindings: Vec<_> = self
            .bindings
            .read()
            .await
            .iter()
            .map(|(shortcut, action)| (shortcut.clone(), *action))
            .collect();
        bindings.sort_by_key(|(shortcut, _)| shortcut.to_string());
        bindings
    }

    pub async fn metrics(&self) -> KeyboardHandlerMetrics {
        self.metrics.read().await.clone()
    }
}

/// Combinations macOS keeps for itself
pub fn reserved_shortcuts() -> HashSet<Shortcut> {
    [
        Shortcut::new(vec![ModifierKey::Command], Key::Tab),
        Shortcut::new(vec![ModifierKey::Command], Key::Space),
        Shortcut::new(vec![ModifierKey::Command], Key::Letter('q')),
        Shortcut::new(vec![ModifierKey::Command, ModifierKey::Option], Key::Escape),
    ]
    .into_iter()
    .collect()
}

/// Stock shortcut table: everything on control+option
pub fn default_bindings() -> Vec<(Shortcut, WindowAction)> {
    let hyper = |key| Shortcut::new(vec![ModifierKey::Control, ModifierKey::Option], key);
    let snap = WindowAction::Snap;

    vec![
        (hyper(Key::Arrow(ArrowDirection::Left)), snap(GridPosition::LeftHalf)),
        (hyper(Key::Arrow(ArrowDirection::Right)), snap(GridPosition::RightHalf)),
        (hyper(Key::Arrow(ArrowDirection::Up)), snap(GridPosition::TopHalf)),
        (hyper(Key::Arrow(ArrowDirection::Down)), snap(GridPosition::BottomHalf)),
        (hyper(Key::Letter('u')), snap(GridPosition::TopLeft)),
        (hyper(Key::Letter('i')), snap(GridPosition::TopRight)),
        (hyper(Key::Letter('j')), snap(GridPosition::BottomLeft)),
        (hyper(Key::Letter('k')), snap(GridPosition::BottomRight)),
        (hyper(Key::Letter('d')), snap(GridPosition::LeftThird)),
        (hyper(Key::Letter('f')), snap(GridPosition::CenterThird)),
        (hyper(Key::Letter('g')), snap(GridPosition::RightThird)),
        (hyper(Key::Letter('e')), snap(GridPosition::LeftTwoThirds)),
        (hyper(Key::Letter('t')), snap(GridPosition::RightTwoThirds)),
        (hyper(Key::Return), snap(GridPosition::Maximize)),
        (hyper(Key::Letter('c')), snap(GridPosition::Center)),
        (hyper(Key::Letter('z')), WindowAction::Undo),
        (
            Shortcut::new(
                vec![ModifierKey::Control, ModifierKey::Option, ModifierKey::Shift],
                Key::Letter('z'),
            ),
            WindowAction::Redo,
        ),
        (hyper(Key::Letter('n')), WindowAction::NextScreen),
    ]
}
