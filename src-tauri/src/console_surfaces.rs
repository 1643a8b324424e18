use tokio::sync::mpsc::UnboundedSender;

use crate::{
    append_desktop_log, append_shutdown_log, append_startup_log,
    surfaces::{ExitHook, MainSurface, SplashSurface, SurfaceFactory},
    system_browser, DesktopError, Endpoint, LifecycleEvent, APP_DISPLAY_NAME,
};

#[derive(Debug)]
pub(crate) struct ConsoleSplash {
    open: bool,
    last_status: Option<String>,
}

impl SplashSurface for ConsoleSplash {
    fn set_status(&mut self, text: &str) {
        if !self.open {
            return;
        }
        eprintln!("[{APP_DISPLAY_NAME}] {text}");
        append_startup_log(&format!("splash status: {text}"));
        self.last_status = Some(text.to_string());
    }

    fn close(&mut self) {
        self.open = false;
    }
}

#[derive(Debug)]
pub(crate) struct ConsoleMain {
    open_browser: bool,
    endpoint: Option<Endpoint>,
    visible: bool,
}

impl MainSurface for ConsoleMain {
    fn load(&mut self, endpoint: &Endpoint) {
        append_desktop_log(&format!("main surface loading {endpoint}"));
        self.endpoint = Some(endpoint.clone());
    }

    fn show(&mut self) {
        if self.visible {
            return;
        }
        let Some(endpoint) = &self.endpoint else {
            append_desktop_log("show skipped: nothing loaded yet");
            return;
        };
        self.visible = true;
        println!("{APP_DISPLAY_NAME} is running at {endpoint}");
        if self.open_browser {
            if let Err(error) = system_browser::open_endpoint(endpoint) {
                append_desktop_log(&format!("failed to open browser: {error}"));
            }
        }
    }
}

pub(crate) struct ConsoleSurfaces {
    events: UnboundedSender<LifecycleEvent>,
    open_browser: bool,
}

impl ConsoleSurfaces {
    pub(crate) fn new(events: UnboundedSender<LifecycleEvent>, open_browser: bool) -> Self {
        Self {
            events,
            open_browser,
        }
    }
}

impl SurfaceFactory for ConsoleSurfaces {
    type Splash = ConsoleSplash;
    type Main = ConsoleMain;

    fn create_splash(&mut self) -> Result<ConsoleSplash, DesktopError> {
        Ok(ConsoleSplash {
            open: true,
            last_status: None,
        })
    }

    fn create_main(&mut self) -> Result<ConsoleMain, DesktopError> {
        // A terminal has nothing to render, so it is ready immediately.
        self.events
            .send(LifecycleEvent::FirstRenderReady)
            .map_err(|_| DesktopError::SurfaceFault("lifecycle channel closed".to_string()))?;
        Ok(ConsoleMain {
            open_browser: self.open_browser,
            endpoint: None,
            visible: false,
        })
    }

    fn report_error(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
    }
}

#[derive(Debug, Default)]
pub(crate) struct ConsoleExit;

impl ExitHook for ConsoleExit {
    fn terminate(&mut self, code: i32) {
        append_shutdown_log(&format!("console shell exiting with code {code}"));
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn splash_ignores_status_after_close() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let mut surfaces = ConsoleSurfaces::new(sender, false);
        let mut splash = surfaces.create_splash().expect("splash");

        splash.set_status("Loading...");
        assert_eq!(splash.last_status.as_deref(), Some("Loading..."));

        splash.close();
        splash.close();
        splash.set_status("Starting Node-RED engine...");
        assert_eq!(splash.last_status.as_deref(), Some("Loading..."));
    }

    #[test]
    fn main_reports_first_render_on_creation() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut surfaces = ConsoleSurfaces::new(sender, false);

        surfaces.create_main().expect("main");
        assert_eq!(receiver.try_recv().ok(), Some(LifecycleEvent::FirstRenderReady));
    }

    #[test]
    fn main_show_requires_a_loaded_endpoint() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let mut surfaces = ConsoleSurfaces::new(sender, false);
        let mut main = surfaces.create_main().expect("main");

        main.show();
        assert!(!main.visible);

        main.load(&Endpoint::parse("http://127.0.0.1:1880/").expect("endpoint"));
        main.show();
        assert!(main.visible);
    }

    #[test]
    fn create_main_fails_once_the_controller_is_gone() {
        let (sender, receiver) = mpsc::unbounded_channel();
        drop(receiver);
        let mut surfaces = ConsoleSurfaces::new(sender, false);
        assert!(matches!(
            surfaces.create_main(),
            Err(DesktopError::SurfaceFault(_))
        ));
    }
}
