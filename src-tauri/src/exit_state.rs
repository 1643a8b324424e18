use std::fmt;

pub(crate) const EXIT_CODE_SUCCESS: i32 = 0;
pub(crate) const EXIT_CODE_FAULT: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleState {
    Idle,
    SplashShown,
    BackendInitializing,
    BackendInitFailed,
    MainCreated,
    BackendStarting,
    BackendStartFailed,
    Running,
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::SplashShown => "splash_shown",
            LifecycleState::BackendInitializing => "backend_initializing",
            LifecycleState::BackendInitFailed => "backend_init_failed",
            LifecycleState::MainCreated => "main_created",
            LifecycleState::BackendStarting => "backend_starting",
            LifecycleState::BackendStartFailed => "backend_start_failed",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Terminated => "terminated",
        }
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        matches!(self, LifecycleState::ShuttingDown | LifecycleState::Terminated)
    }

    /// Every state may fall into `ShuttingDown` except the two already past it.
    pub(crate) fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        if next == ShuttingDown {
            return !self.is_shutting_down();
        }

        matches!(
            (self, next),
            (Idle, SplashShown)
                | (SplashShown, BackendInitializing)
                | (BackendInitializing, BackendInitFailed)
                | (BackendInitializing, MainCreated)
                | (MainCreated, BackendStarting)
                | (BackendStarting, BackendStartFailed)
                | (BackendStarting, Running)
                | (ShuttingDown, Terminated)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitReason {
    Normal,
    WindowsAllClosed,
    BackendInitFailed,
    BackendStartFailed,
    GpuFault,
    RendererFault,
    UncaughtFault,
    InterruptSignal,
}

impl ExitReason {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Normal => "normal",
            ExitReason::WindowsAllClosed => "windows_all_closed",
            ExitReason::BackendInitFailed => "backend_init_failed",
            ExitReason::BackendStartFailed => "backend_start_failed",
            ExitReason::GpuFault => "gpu_fault",
            ExitReason::RendererFault => "renderer_fault",
            ExitReason::UncaughtFault => "uncaught_fault",
            ExitReason::InterruptSignal => "interrupt_signal",
        }
    }

    pub(crate) fn is_fault(&self) -> bool {
        !matches!(
            self,
            ExitReason::Normal | ExitReason::WindowsAllClosed | ExitReason::InterruptSignal
        )
    }

    pub(crate) fn exit_code(&self) -> i32 {
        if self.is_fault() {
            EXIT_CODE_FAULT
        } else {
            EXIT_CODE_SUCCESS
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
