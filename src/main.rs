//! GridSnap - keyboard-driven window snapping for macOS
//!
//! Background agent: captures global shortcuts, snaps the focused window to
//! grid positions, applies per-application rules and restores saved layouts.

use chrono::Utc;
use clap::Parser;
use gridsnap::{
    config::{CustomPositionStore, JsonStore, LayoutStore, PersistenceConfig, Settings},
    logging::{init_logging, LogConfig, LogLevel},
    macos::{
        open_accessibility_settings, prompt_accessibility_permission, spawn_listener,
        AccessibilityProvider, PermissionStatus, SystemAccessibilityProvider,
        SystemDisplayProvider,
    },
    services::{
        KeyboardHandler, LayoutManager, SnapOrchestrator, SnapOrchestratorBuilder, WindowManager,
    },
    GridSnapError, Result, Shortcut, WindowAction,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{
    signal,
    sync::{broadcast, mpsc},
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "gridsnap", version, about = "Keyboard-driven window snapping for macOS")]
pub struct Args {
    /// Settings file (defaults to ~/.config/gridsnap/settings.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding saved positions, rules and layouts
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log level, overriding GRIDSNAP_LOG_LEVEL
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Print the default settings as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

/// Running agent state
pub struct GridSnapApp {
    accessibility: Arc<dyn AccessibilityProvider>,
    window_manager: Arc<WindowManager>,
    keyboard_handler: Arc<KeyboardHandler>,
    orchestrator: SnapOrchestrator,
    positions: Arc<CustomPositionStore>,
    shortcut_rx: Option<mpsc::UnboundedReceiver<Shortcut>>,
    permission_status: PermissionStatus,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl GridSnapApp {
    #[instrument(skip_all)]
    pub async fn new(args: &Args) -> Result<Self> {
        let mut log_config = LogConfig::from_env();
        if let Some(level) = args.log_level {
            log_config.level = level;
        }
        init_logging(&log_config).map_err(|e| {
            GridSnapError::ConfigurationError(format!("Failed to initialize logging: {e}"))
        })?;

        info!("GridSnap v{}", env!("CARGO_PKG_VERSION"));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let settings_path = args.config.clone().unwrap_or_else(Settings::default_path);
        let settings = Settings::load(&settings_path)
            .map_err(|e| GridSnapError::ConfigurationError(e.to_string()))?;
        debug!(path = %settings_path.display(), "Settings loaded");

        let persistence = match &args.data_dir {
            Some(dir) => PersistenceConfig::in_dir(dir),
            None => PersistenceConfig::default(),
        };
        let store = Arc::new(
            JsonStore::open(&persistence)
                .map_err(|e| GridSnapError::PersistenceError(e.to_string()))?,
        );
        let positions = Arc::new(CustomPositionStore::new(store.clone()));
        let layouts = Arc::new(LayoutStore::new(store));
        debug!(path = %persistence.file_path().display(), "Store opened");

        let accessibility: Arc<dyn AccessibilityProvider> =
            Arc::new(SystemAccessibilityProvider::new());
        let permission_status = Self::check_initial_permissions(accessibility.as_ref());

        let window_manager = Arc::new(
            WindowManager::new(
                accessibility.clone(),
                Arc::new(SystemDisplayProvider),
                &settings,
            )
            .with_position_store(positions.clone()),
        );

        let keyboard_handler = Arc::new(Self::init_keyboard_handler(&settings, &positions).await?);
        let layout_manager = Arc::new(LayoutManager::new(accessibility.clone(), layouts));

        let orchestrator = SnapOrchestratorBuilder::new()
            .window_manager(window_manager.clone())
            .keyboard_handler(keyboard_handler.clone())
            .layout_manager(layout_manager)
            .build()?;

        info!("All services initialized");

        Ok(Self {
            accessibility,
            window_manager,
            keyboard_handler,
            orchestrator,
            positions,
            shortcut_rx: None,
            permission_status,
            shutdown_tx,
            shutdown_rx,
        })
    }

    #[instrument(skip_all)]
    pub async fn run(&mut self) -> Result<()> {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::setup_signal_handlers(shutdown_tx).await {
                error!("Failed to setup signal handlers: {}", e);
            }
        });

        self.start_hotkey_listener();
        self.apply_startup_rules().await;

        info!("GridSnap is ready");

        let mut health = interval(HEALTH_CHECK_INTERVAL);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        health.tick().await;

        let mut shortcut_rx = self.shortcut_rx.take();
        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(shortcut) = next_shortcut(&mut shortcut_rx) => {
                    // failures are logged and counted by the orchestrator
                    if let Ok(Some(action)) = self.orchestrator.handle_shortcut(&shortcut).await {
                        debug!(shortcut = %shortcut, action = %action.label(), "Shortcut handled");
                    }
                }

                _ = health.tick() => {
                    self.perform_health_check().await;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        let window_metrics = self.window_manager.metrics().await;
        let keyboard_metrics = self.keyboard_handler.metrics().await;
        let orchestrator_metrics = self.orchestrator.metrics().await;
        info!(
            snaps = window_metrics.snap_count,
            undos = window_metrics.undo_count,
            redos = window_metrics.redo_count,
            shortcuts = keyboard_metrics.triggered_events,
            failed_actions = orchestrator_metrics.actions_failed,
            "GridSnap shutdown complete"
        );
    }

    fn check_initial_permissions(accessibility: &dyn AccessibilityProvider) -> PermissionStatus {
        info!("Checking accessibility permission...");

        let status = accessibility.permission_status();
        if status == PermissionStatus::Granted {
            info!("Accessibility permission granted");
            return status;
        }

        match prompt_accessibility_permission() {
            Ok(true) => return PermissionStatus::Granted,
            Ok(false) => {}
            Err(e) => warn!("Permission prompt failed: {}", e),
        }

        warn!("Accessibility permission not granted; window actions will fail until it is enabled");
        if let Err(e) = open_accessibility_settings() {
            warn!("Could not open System Settings: {}", e);
        }
        PermissionStatus::Denied
    }

    async fn init_keyboard_handler(
        settings: &Settings,
        positions: &CustomPositionStore,
    ) -> Result<KeyboardHandler> {
        let handler = KeyboardHandler::with_default_bindings().await?;

        let overrides = settings
            .shortcut_overrides()
            .map_err(|e| GridSnapError::ConfigurationError(e.to_string()))?;
        let applied = handler.apply_overrides(overrides).await?;
        if applied > 0 {
            info!(count = applied, "Applied shortcut overrides");
        }

        for position in positions.positions() {
            let Some(shortcut) = position.shortcut.clone() else {
                continue;
            };
            let action = WindowAction::CustomPosition(position.id);
            if let Err(e) = handler.register_binding(shortcut, action).await {
                warn!(position = %position.name, "Skipping custom position shortcut: {}", e);
            }
        }

        handler
            .subscribe(Box::new(|event| {
                debug!(shortcut = %event.shortcut, action = %event.action.label(), "Shortcut triggered");
            }))
            .await;

        debug!(bindings = handler.bindings().await.len(), "Keyboard handler initialized");
        Ok(handler)
    }

    fn start_hotkey_listener(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        match spawn_listener(tx) {
            Ok(_) => self.shortcut_rx = Some(rx),
            Err(e) => error!("Global shortcuts unavailable: {}", e),
        }
    }

    async fn apply_startup_rules(&self) {
        let rules = self.positions.rules();
        if rules.rules.is_empty() {
            return;
        }

        let applied = match self.window_manager.apply_app_rules(&rules).await {
            Ok(applied) => applied,
            Err(e) => {
                warn!("Failed to apply application rules: {}", e);
                return;
            }
        };
        info!(count = applied.len(), "Applied application rules");
        if applied.is_empty() {
            return;
        }

        let mut rules = rules;
        let now = Utc::now();
        for application in &applied {
            rules.mark_used(application.rule_id, now);
        }
        if let Err(e) = self.positions.save_rules(&rules) {
            warn!("Failed to record rule use: {}", e);
        }
    }

    async fn perform_health_check(&mut self) {
        debug!("Performing health check...");

        let status = self.accessibility.permission_status();
        if status != self.permission_status {
            match status {
                PermissionStatus::Granted => info!("Accessibility permission granted"),
                _ => warn!(?status, "Accessibility permission lost"),
            }
            self.permission_status = status;
        }

        let metrics = self.orchestrator.metrics().await;
        if metrics.actions_failed > 0 {
            debug!(
                dispatched = metrics.actions_dispatched,
                failed = metrics.actions_failed,
                "Action failure count"
            );
        }
    }

    async fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => {
                    match res {
                        Ok(_) => info!("Received SIGINT (Ctrl+C)"),
                        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
                    }
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
            }
        }

        #[cfg(not(unix))]
        {
            match signal::ctrl_c().await {
                Ok(_) => info!("Received Ctrl+C"),
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            }
        }

        if shutdown_tx.send(()).is_err() {
            warn!("Failed to send shutdown signal - no receivers");
        }

        Ok(())
    }
}

/// Next captured shortcut; pending forever when no listener is running
async fn next_shortcut(rx: &mut Option<mpsc::UnboundedReceiver<Shortcut>>) -> Option<Shortcut> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        let toml = Settings::default()
            .to_toml_string()
            .map_err(|e| GridSnapError::ConfigurationError(e.to_string()))?;
        print!("{toml}");
        return Ok(());
    }

    let mut app = GridSnapApp::new(&args).await?;

    if let Err(e) = app.run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
