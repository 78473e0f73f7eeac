//! The application container: everything the board and the CLI share, built
//! once from [`Config`] and passed around explicitly.

use chrono::Utc;
use std::sync::Arc;

use crate::api::{HttpApi, LocalApi, RemoteApi};
use crate::config::Config;
use crate::drag::DropOutcome;
use crate::error::{ApiError, AppError, TokenError};
use crate::kanban_board::KanbanBoard;
use crate::local_store::LocalStore;
use crate::meeting::MeetingNotes;
use crate::realtime::RealtimeEvent;
use crate::session::{AuthStatus, SessionStore, TokenClaims};
use crate::settings::Preferences;
use crate::store::TaskStore;
use crate::task::{fallback_tasks, NewTask, TaskFilters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Board,
    Login,
}

pub struct AppState {
    pub config: Config,
    pub local: LocalStore,
    pub session: Arc<SessionStore>,
    pub tasks: TaskStore,
    pub board: KanbanBoard,
    pub meeting: MeetingNotes,
    pub preferences: Preferences,
    pub filters: TaskFilters,
    pub screen: Screen,
    pub last_error: Option<String>,
    pub notice: Option<String>,
}

impl AppState {
    /// Opens the data directory and wires the backend the config asks for:
    /// the REST client when remote is enabled, the local slot otherwise.
    pub fn open(config: Config) -> Result<Self, AppError> {
        let local = LocalStore::open(&config.data_dir)?;
        let session = Arc::new(SessionStore::new(local.clone(), config.tenant_slug.clone()));
        let api: Box<dyn RemoteApi> = if config.remote_enabled {
            Box::new(HttpApi::new(
                &config.api_base_url,
                config.tenant_slug.clone(),
                config.timeout(),
                Arc::clone(&session),
            )?)
        } else {
            tracing::info!("remote disabled, using the local task list");
            Box::new(LocalApi::new(local.clone()))
        };
        Ok(Self::with_api(config, local, session, api))
    }

    pub fn with_api(
        config: Config,
        local: LocalStore,
        session: Arc<SessionStore>,
        api: Box<dyn RemoteApi>,
    ) -> Self {
        let screen = if config.remote_enabled {
            match session.status(Utc::now().timestamp()) {
                AuthStatus::Authenticated(_) => Screen::Board,
                AuthStatus::LoginRequired => Screen::Login,
            }
        } else {
            Screen::Board
        };
        Self {
            tasks: TaskStore::new(api, config.read_policy, fallback_tasks()),
            meeting: MeetingNotes::open(&local),
            preferences: Preferences::open(&local),
            board: KanbanBoard::new(),
            filters: TaskFilters::default(),
            screen,
            last_error: None,
            notice: None,
            config,
            local,
            session,
        }
    }

    /// Records a failed call for the status line. A rejected session sends
    /// the user back to login.
    pub fn handle_api_error(&mut self, err: &ApiError) {
        if err.is_unauthorized() {
            self.screen = Screen::Login;
            self.board.drag.cancel();
        }
        self.last_error = Some(err.to_string());
    }

    fn report<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                self.handle_api_error(&err);
                Err(err)
            }
        }
    }

    pub fn refresh(&mut self) -> Result<(), ApiError> {
        let result = self.board.refresh(&self.tasks, &self.filters);
        self.report(result)
    }

    /// Moves the selected task one column and refetches so the board shows
    /// what the server now holds.
    pub fn move_selected(&mut self, direction: isize) -> Result<(), ApiError> {
        let result = self.board.move_selected(&self.tasks, direction);
        self.report(result)?;
        self.refresh()
    }

    pub fn drop_task(&mut self, outcome: &DropOutcome) -> Result<(), ApiError> {
        let result = self.board.apply_drop(&self.tasks, outcome);
        self.report(result)
    }

    pub fn add_task(&mut self, task: NewTask) -> Result<(), ApiError> {
        let result = self.board.add_task(&self.tasks, &task).map(|t| t.id.clone());
        let id = self.report(result)?;
        self.notice = Some(format!("created {id}"));
        Ok(())
    }

    pub fn delete_selected(&mut self) -> Result<(), ApiError> {
        let Some(id) = self.board.selected().map(|t| t.id.clone()) else {
            return Ok(());
        };
        let result = self.board.delete_task(&self.tasks, &id);
        self.report(result)?;
        self.notice = Some(format!("deleted {id}"));
        Ok(())
    }

    pub fn complete_login(&mut self, redirect: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.session.complete_login(redirect, Utc::now().timestamp())?;
        self.screen = Screen::Board;
        self.last_error = None;
        Ok(claims)
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.screen = Screen::Login;
    }

    /// Applies a pushed event. Ignored unless realtime is enabled; returns
    /// whether the event changed anything.
    pub fn apply_event(&mut self, event: RealtimeEvent) -> bool {
        if !self.config.realtime_enabled {
            return false;
        }
        match event {
            RealtimeEvent::TaskUpdated(task) => {
                tracing::debug!(task_id = %task.id, "task pushed");
                self.board.upsert(task);
            }
            RealtimeEvent::ProjectCreated(project) => {
                self.notice = Some(format!("project created: {}", project.display_title()));
            }
            RealtimeEvent::ProcessingStatus { kind, message, progress } => {
                self.notice = Some(match progress {
                    Some(p) => format!("{kind}: {message} ({p}%)"),
                    None => format!("{kind}: {message}"),
                });
            }
        }
        true
    }

    pub fn shutdown(&mut self) {
        self.board.drag.cancel();
        tracing::info!(tasks = self.board.tasks.len(), "shutting down");
    }
}
