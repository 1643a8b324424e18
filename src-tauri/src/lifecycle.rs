use std::time::Duration;

use tokio::{sync::mpsc::UnboundedReceiver, time};

use crate::{
    backend_runtime::{BackendService, BackendStart},
    errors::BackendStartError,
    surfaces::{ExitHook, MainSurface, SplashSurface, SurfaceFactory},
    DesktopError, Endpoint, ExitReason, LifecycleEvent, LifecycleState, StartupConfig,
    STATUS_CREATING_MAIN, STATUS_INITIALIZING, STATUS_LOADING, STATUS_STARTING_ENGINE,
};

pub(crate) struct LifecycleController<B, F, H, L>
where
    B: BackendService,
    F: SurfaceFactory,
    H: ExitHook,
    L: Fn(&str) + Send,
{
    state: LifecycleState,
    backend: B,
    surfaces: F,
    exit_hook: H,
    log: L,
    splash: Option<F::Splash>,
    main: Option<F::Main>,
    first_render_ready: bool,
    loaded_endpoint: Option<Endpoint>,
    main_shown: bool,
    exit_reason: Option<ExitReason>,
    exit_code: Option<i32>,
    shutdown_timeout: Duration,
}

impl<B, F, H, L> LifecycleController<B, F, H, L>
where
    B: BackendService,
    F: SurfaceFactory,
    H: ExitHook,
    L: Fn(&str) + Send,
{
    pub(crate) fn new(
        backend: B,
        surfaces: F,
        exit_hook: H,
        shutdown_timeout: Duration,
        log: L,
    ) -> Self {
        Self {
            state: LifecycleState::Idle,
            backend,
            surfaces,
            exit_hook,
            log,
            splash: None,
            main: None,
            first_render_ready: false,
            loaded_endpoint: None,
            main_shown: false,
            exit_reason: None,
            exit_code: None,
            shutdown_timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> LifecycleState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    fn transition(&mut self, next: LifecycleState) -> bool {
        if !self.state.can_transition_to(next) {
            (self.log)(&format!(
                "rejected lifecycle transition {} -> {}",
                self.state, next
            ));
            return false;
        }
        (self.log)(&format!("lifecycle {} -> {}", self.state, next));
        self.state = next;
        true
    }

    fn set_status(&mut self, text: &str) {
        if let Some(splash) = self.splash.as_mut() {
            splash.set_status(text);
        }
    }

    fn close_splash(&mut self) {
        if let Some(mut splash) = self.splash.take() {
            splash.close();
            (self.log)("splash closed");
        }
    }

    fn report(&mut self, error: &DesktopError) {
        (self.log)(&format!("{}: {error}", error.dialog_title()));
        self.surfaces
            .report_error(error.dialog_title(), &error.to_string());
    }

    pub(crate) async fn run(
        mut self,
        config: StartupConfig,
        mut events: UnboundedReceiver<LifecycleEvent>,
    ) -> i32 {
        let mut pending_start = match self.begin_startup(&config) {
            Ok(start) => Some(start),
            Err(reason) => {
                self.shutdown(reason).await;
                None
            }
        };

        loop {
            if let Some(code) = self.exit_code {
                return code;
            }

            tokio::select! {
                result = async {
                    match pending_start.as_mut() {
                        Some(start) => start.await,
                        None => std::future::pending().await,
                    }
                } => {
                    pending_start = None;
                    let result = result
                        .unwrap_or_else(|_| Err(BackendStartError::Abandoned.into()));
                    self.on_start_result(result).await;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        (self.log)("lifecycle event channel closed");
                        self.shutdown(ExitReason::Normal).await;
                    }
                },
            }
        }
    }

    fn begin_startup(&mut self, config: &StartupConfig) -> Result<BackendStart, ExitReason> {
        let splash = match self.surfaces.create_splash() {
            Ok(splash) => splash,
            Err(error) => {
                self.report(&error);
                return Err(ExitReason::RendererFault);
            }
        };
        self.splash = Some(splash);
        self.transition(LifecycleState::SplashShown);
        self.set_status(STATUS_LOADING);

        self.transition(LifecycleState::BackendInitializing);
        self.set_status(STATUS_INITIALIZING);
        if let Err(error) = self.backend.init(config) {
            self.report(&error);
            self.transition(LifecycleState::BackendInitFailed);
            return Err(ExitReason::BackendInitFailed);
        }

        self.transition(LifecycleState::MainCreated);
        self.set_status(STATUS_CREATING_MAIN);
        let main = match self.surfaces.create_main() {
            Ok(main) => main,
            Err(error) => {
                self.report(&error);
                return Err(ExitReason::RendererFault);
            }
        };
        self.main = Some(main);

        self.transition(LifecycleState::BackendStarting);
        self.set_status(STATUS_STARTING_ENGINE);
        Ok(self.backend.start())
    }

    async fn on_start_result(&mut self, result: Result<Endpoint, DesktopError>) {
        if self.state.is_shutting_down() {
            return;
        }

        let endpoint = match result {
            Ok(endpoint) => endpoint,
            Err(error) => {
                self.report(&error);
                self.transition(LifecycleState::BackendStartFailed);
                self.shutdown(ExitReason::BackendStartFailed).await;
                return;
            }
        };

        self.transition(LifecycleState::Running);
        (self.log)(&format!("backend running at {endpoint}"));
        match self.main.as_mut() {
            Some(main) => main.load(&endpoint),
            None => (self.log)("main surface is gone; skipping load"),
        }
        self.loaded_endpoint = Some(endpoint);
        self.reveal_main_if_ready();
    }

    fn reveal_main_if_ready(&mut self) {
        if self.main_shown
            || !self.first_render_ready
            || self.loaded_endpoint.is_none()
            || self.state != LifecycleState::Running
        {
            return;
        }
        if let Some(main) = self.main.as_mut() {
            main.show();
            self.main_shown = true;
            (self.log)("main surface shown");
        }
        self.close_splash();
    }

    async fn handle_event(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::FirstRenderReady => {
                if !self.first_render_ready {
                    self.first_render_ready = true;
                    (self.log)("main surface finished its first render");
                }
                self.reveal_main_if_ready();
            }
            LifecycleEvent::Unresponsive => (self.log)("main surface became unresponsive"),
            LifecycleEvent::Responsive => (self.log)("main surface became responsive again"),
            LifecycleEvent::ContentFault { killed } => {
                (self.log)(&format!(
                    "renderer process {}; exiting application",
                    if killed { "was killed" } else { "crashed" }
                ));
                self.shutdown(ExitReason::RendererFault).await;
            }
            LifecycleEvent::GpuFault { killed } => {
                (self.log)(&format!(
                    "GPU process {}; exiting application",
                    if killed { "was killed" } else { "crashed" }
                ));
                self.shutdown(ExitReason::GpuFault).await;
            }
            LifecycleEvent::MainClosed => {
                self.main = None;
                (self.log)("main surface closed");
                self.shutdown(ExitReason::WindowsAllClosed).await;
            }
            LifecycleEvent::AllWindowsClosed => {
                self.shutdown(ExitReason::WindowsAllClosed).await;
            }
            LifecycleEvent::QuitRequested => {
                self.shutdown(ExitReason::Normal).await;
            }
            LifecycleEvent::UncaughtFault(description) => {
                (self.log)(&format!("uncaught fault:\n{description}"));
                self.shutdown(ExitReason::UncaughtFault).await;
            }
            LifecycleEvent::Interrupt => {
                (self.log)("interrupt signal received");
                self.shutdown(ExitReason::InterruptSignal).await;
            }
        }
    }

    /// Single exit path. Later calls are no-ops, so back-to-back faults never
    /// stop the backend twice or terminate twice.
    pub(crate) async fn shutdown(&mut self, reason: ExitReason) -> Option<i32> {
        if self.state.is_shutting_down() {
            (self.log)(&format!(
                "shutdown ({reason}) ignored: lifecycle already {}",
                self.state
            ));
            return None;
        }

        self.exit_reason = Some(reason);
        self.transition(LifecycleState::ShuttingDown);
        (self.log)(&format!("shutting down: reason={reason}"));
        self.close_splash();

        if self.backend.is_live() {
            match time::timeout(self.shutdown_timeout, self.backend.stop()).await {
                Ok(Ok(())) => (self.log)("backend stopped"),
                Ok(Err(error)) => (self.log)(&format!("backend stop failed: {error}")),
                Err(_) => (self.log)(&format!(
                    "backend did not stop within {}ms; terminating anyway",
                    self.shutdown_timeout.as_millis()
                )),
            }
        }

        self.main = None;
        self.transition(LifecycleState::Terminated);
        let code = reason.exit_code();
        (self.log)(&format!("terminating with exit code {code}"));
        self.exit_code = Some(code);
        self.exit_hook.terminate(code);
        Some(code)
    }
}
