use crate::{DesktopError, Endpoint};

pub(crate) trait SplashSurface: Send {
    fn set_status(&mut self, text: &str);

    /// Releases the surface. Safe to call any number of times.
    fn close(&mut self);
}

pub(crate) trait MainSurface: Send {
    fn load(&mut self, endpoint: &Endpoint);

    fn show(&mut self);
}

pub(crate) trait SurfaceFactory: Send {
    type Splash: SplashSurface;
    type Main: MainSurface;

    fn create_splash(&mut self) -> Result<Self::Splash, DesktopError>;

    fn create_main(&mut self) -> Result<Self::Main, DesktopError>;

    fn report_error(&mut self, title: &str, message: &str);
}

/// Ends the process. The controller calls it exactly once.
pub(crate) trait ExitHook: Send {
    fn terminate(&mut self, code: i32);
}
