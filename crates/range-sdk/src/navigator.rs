use std::sync::Mutex;
use tracing::debug;

/// Route of the admin login surface.
pub const LOGIN_PATH: &str = "/admin/login";

/// Route the console lands on after a successful login.
pub const HOME_PATH: &str = "/admin/overview";

/// Current-location and navigation seam of the hosting front end.
pub trait Navigator: Send + Sync {
    fn location(&self) -> String;
    fn navigate(&self, path: &str);

    fn is_on_login(&self) -> bool {
        self.location() == LOGIN_PATH
    }
}

#[derive(Debug, Default)]
struct RouterState {
    location: String,
    history: Vec<String>,
}

/// In-process navigator that records every navigation.
#[derive(Debug, Default)]
pub struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(RouterState {
                location: initial.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Paths navigated to since construction, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    pub fn visits(&self, path: &str) -> usize {
        self.lock().history.iter().filter(|p| p.as_str() == path).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for Router {
    fn location(&self) -> String {
        self.lock().location.clone()
    }

    fn navigate(&self, path: &str) {
        let mut state = self.lock();
        debug!(from = %state.location, to = %path, "Navigating");
        state.location = path.to_string();
        state.history.push(path.to_string());
    }
}
