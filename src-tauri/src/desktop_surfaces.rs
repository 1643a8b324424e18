use std::sync::{
    atomic::{AtomicBool, AtomicI32, Ordering},
    Arc, Mutex,
};

use tauri::{
    webview::PageLoadEvent, AppHandle, RunEvent, Url, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, WindowEvent,
};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tokio::sync::mpsc;

use crate::{
    append_desktop_log, append_lifecycle_log, append_shutdown_log,
    app_runtime::{await_controller, shutdown_timeout_from_env},
    backend_runtime::ProcessBackend,
    exit_events,
    exit_state::{EXIT_CODE_FAULT, EXIT_CODE_SUCCESS},
    fault_watch,
    lifecycle::LifecycleController,
    surfaces::{ExitHook, MainSurface, SplashSurface, SurfaceFactory},
    DesktopError, Endpoint, LifecycleEvent, StartupConfig, APP_DISPLAY_NAME, MAIN_WINDOW_LABEL,
    SPLASH_WINDOW_LABEL,
};

const SPLASH_PAGE: &str = "splash.html";
const MAIN_PAGE: &str = "main.html";

pub(crate) fn splash_status_script(text: &str) -> String {
    format!(
        "window.setSplashStatus && window.setSplashStatus({});",
        serde_json::Value::from(text)
    )
}

#[derive(Debug, Default)]
pub(crate) struct PageState {
    splash_status: Mutex<Option<String>>,
    endpoint_origin: Mutex<Option<String>>,
}

impl PageState {
    fn remember_splash_status(&self, text: &str) {
        if let Ok(mut status) = self.splash_status.lock() {
            *status = Some(text.to_string());
        }
    }

    fn splash_status(&self) -> Option<String> {
        self.splash_status.lock().ok().and_then(|guard| guard.clone())
    }

    fn endpoint_origin(&self) -> Option<String> {
        self.endpoint_origin.lock().ok().and_then(|guard| guard.clone())
    }
}

/// Only a finished load of the backend's own page counts as the main
/// window's first render; the bundled placeholder page never does.
pub(crate) fn decide_main_page_load(
    endpoint_origin: Option<&str>,
    page_url: &Url,
) -> Option<LifecycleEvent> {
    let origin = endpoint_origin?;
    (page_url.origin().ascii_serialization() == origin).then_some(LifecycleEvent::FirstRenderReady)
}

pub(crate) struct TauriSplash {
    window: Option<WebviewWindow>,
    pages: Arc<PageState>,
}

impl SplashSurface for TauriSplash {
    fn set_status(&mut self, text: &str) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        // Replayed on page load; evals before splash.html is ready are lost.
        self.pages.remember_splash_status(text);
        if let Err(error) = window.eval(&splash_status_script(text)) {
            append_desktop_log(&format!("failed to update splash status: {error}"));
        }
    }

    fn close(&mut self) {
        if let Some(window) = self.window.take() {
            if let Err(error) = window.destroy() {
                append_desktop_log(&format!("failed to close splash window: {error}"));
            }
        }
    }
}

pub(crate) struct TauriMain {
    window: WebviewWindow,
    pages: Arc<PageState>,
}

impl MainSurface for TauriMain {
    fn load(&mut self, endpoint: &Endpoint) {
        if let Ok(mut origin) = self.pages.endpoint_origin.lock() {
            *origin = Some(endpoint.url().origin().ascii_serialization());
        }
        if let Err(error) = self.window.navigate(endpoint.url().clone()) {
            append_desktop_log(&format!("failed to navigate main window: {error}"));
        }
    }

    fn show(&mut self) {
        if let Err(error) = self.window.show() {
            append_desktop_log(&format!("failed to show main window: {error}"));
            return;
        }
        if let Err(error) = self.window.set_focus() {
            append_desktop_log(&format!("failed to focus main window: {error}"));
        }
    }
}

pub(crate) struct TauriSurfaces {
    app_handle: AppHandle,
    pages: Arc<PageState>,
}

impl SurfaceFactory for TauriSurfaces {
    type Splash = TauriSplash;
    type Main = TauriMain;

    fn create_splash(&mut self) -> Result<TauriSplash, DesktopError> {
        let window = WebviewWindowBuilder::new(
            &self.app_handle,
            SPLASH_WINDOW_LABEL,
            WebviewUrl::App(SPLASH_PAGE.into()),
        )
        .title(APP_DISPLAY_NAME)
        .inner_size(640.0, 480.0)
        .resizable(false)
        .decorations(false)
        .center()
        .build()
        .map_err(|error| {
            DesktopError::SurfaceFault(format!("Failed to create splash window: {error}"))
        })?;
        Ok(TauriSplash {
            window: Some(window),
            pages: Arc::clone(&self.pages),
        })
    }

    fn create_main(&mut self) -> Result<TauriMain, DesktopError> {
        let window = WebviewWindowBuilder::new(
            &self.app_handle,
            MAIN_WINDOW_LABEL,
            WebviewUrl::App(MAIN_PAGE.into()),
        )
        .title(APP_DISPLAY_NAME)
        .inner_size(1280.0, 800.0)
        .min_inner_size(800.0, 600.0)
        .visible(false)
        .build()
        .map_err(|error| {
            DesktopError::SurfaceFault(format!("Failed to create main window: {error}"))
        })?;
        Ok(TauriMain {
            window,
            pages: Arc::clone(&self.pages),
        })
    }

    fn report_error(&mut self, title: &str, message: &str) {
        self.app_handle
            .dialog()
            .message(message)
            .title(title)
            .kind(MessageDialogKind::Error)
            .blocking_show();
    }
}

pub(crate) struct TauriExit {
    app_handle: AppHandle,
    exit_allowed: Arc<AtomicBool>,
    exit_code: Arc<AtomicI32>,
}

impl ExitHook for TauriExit {
    fn terminate(&mut self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
        self.exit_allowed.store(true, Ordering::SeqCst);
        append_shutdown_log(&format!("exiting desktop shell with code {code}"));
        self.app_handle.exit(code);
    }
}

pub(crate) fn run_desktop(config: StartupConfig) -> i32 {
    let (sender, receiver) = mpsc::unbounded_channel();
    fault_watch::install_panic_hook(sender.clone());

    let exit_allowed = Arc::new(AtomicBool::new(false));
    let exit_code = Arc::new(AtomicI32::new(EXIT_CODE_SUCCESS));

    let pages = Arc::new(PageState::default());
    let page_state = Arc::clone(&pages);
    let page_events = sender.clone();
    let window_events = sender.clone();
    let run_events = sender.clone();
    let setup_exit_allowed = Arc::clone(&exit_allowed);
    let setup_exit_code = Arc::clone(&exit_code);
    let run_exit_allowed = Arc::clone(&exit_allowed);

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .on_page_load(move |webview, payload| {
            if !matches!(payload.event(), PageLoadEvent::Finished) {
                return;
            }
            match webview.label() {
                SPLASH_WINDOW_LABEL => {
                    if let Some(status) = page_state.splash_status() {
                        if let Err(error) = webview.eval(&splash_status_script(&status)) {
                            append_desktop_log(&format!("failed to replay splash status: {error}"));
                        }
                    }
                }
                MAIN_WINDOW_LABEL => {
                    append_desktop_log(&format!("main page-load finished: {}", payload.url()));
                    let origin = page_state.endpoint_origin();
                    if let Some(event) = decide_main_page_load(origin.as_deref(), payload.url()) {
                        let _ = page_events.send(event);
                    }
                }
                _ => {}
            }
        })
        .on_window_event(move |window, event| {
            if window.label() == MAIN_WINDOW_LABEL && matches!(event, WindowEvent::Destroyed) {
                let _ = window_events.send(LifecycleEvent::MainClosed);
            }
        })
        .setup(move |app| {
            let app_handle = app.handle().clone();
            let controller = LifecycleController::new(
                ProcessBackend::from_env(),
                TauriSurfaces {
                    app_handle: app_handle.clone(),
                    pages,
                },
                TauriExit {
                    app_handle: app_handle.clone(),
                    exit_allowed: Arc::clone(&setup_exit_allowed),
                    exit_code: Arc::clone(&setup_exit_code),
                },
                shutdown_timeout_from_env(),
                append_lifecycle_log,
            );

            tauri::async_runtime::spawn(async move {
                fault_watch::spawn_signal_listener(sender);
                let code = await_controller(tokio::spawn(controller.run(config, receiver))).await;
                // The exit hook did not run if the controller died early.
                if !setup_exit_allowed.swap(true, Ordering::SeqCst) {
                    setup_exit_code.store(code, Ordering::SeqCst);
                    app_handle.exit(code);
                }
            });
            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(error) => {
            append_desktop_log(&format!("failed to build desktop shell: {error}"));
            return EXIT_CODE_FAULT;
        }
    };

    app.run(move |_app_handle, event| {
        if let RunEvent::ExitRequested { code, api, .. } = &event {
            exit_events::handle_exit_requested(api, *code, &run_exit_allowed, &run_events);
        }
    });
    exit_code.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("url")
    }

    #[test]
    fn page_state_keeps_only_the_latest_splash_status() {
        let pages = PageState::default();
        assert_eq!(pages.splash_status(), None);

        pages.remember_splash_status("Loading...");
        pages.remember_splash_status("Initializing Node-RED...");
        assert_eq!(pages.splash_status().as_deref(), Some("Initializing Node-RED..."));
    }

    #[test]
    fn placeholder_page_never_counts_as_first_render() {
        assert_eq!(decide_main_page_load(None, &url("tauri://localhost/main.html")), None);
        assert_eq!(
            decide_main_page_load(None, &url("http://tauri.localhost/main.html")),
            None
        );
        assert_eq!(
            decide_main_page_load(
                Some("http://127.0.0.1:1880"),
                &url("http://tauri.localhost/main.html")
            ),
            None
        );
    }

    #[test]
    fn finished_load_of_the_endpoint_is_the_first_render() {
        assert_eq!(
            decide_main_page_load(
                Some("http://127.0.0.1:1880"),
                &url("http://127.0.0.1:1880/#flow/1")
            ),
            Some(LifecycleEvent::FirstRenderReady)
        );
        assert_eq!(
            decide_main_page_load(Some("http://127.0.0.1:1880"), &url("http://127.0.0.1:1881/")),
            None
        );
    }

    #[test]
    fn splash_status_script_escapes_the_text() {
        assert_eq!(
            splash_status_script("Starting \"Node-RED\"..."),
            "window.setSplashStatus && window.setSplashStatus(\"Starting \\\"Node-RED\\\"...\");"
        );
    }
}
