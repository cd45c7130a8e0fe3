//! Screen controller: drives a `SearchSession` with background loads.
//!
//! # Design
//! Each load runs fetch + parse on its own short-lived worker thread and
//! sends `(token, page)` back over a channel. Nothing but `poll`/`wait`
//! touches the session, so the result store is only ever mutated on the
//! thread that owns the controller. Superseded loads are never cancelled;
//! they finish, report back, and are rejected by token in
//! `SearchSession::complete`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::fetch::{fetch_body, Transport};
use crate::parse::decode_volumes;
use crate::session::{Completion, PageRequest, RequestToken, SearchSession, ViewState};
use crate::types::VolumePage;

/// "Is the device online" probe consulted before any request is issued.
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

/// Connectivity probe for hosts without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

struct LoadResult {
    token: RequestToken,
    page: Option<VolumePage>,
}

pub struct SearchController<T, C> {
    session: SearchSession,
    transport: Arc<T>,
    connectivity: C,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl<T, C> SearchController<T, C>
where
    T: Transport + 'static,
    C: Connectivity,
{
    pub fn new(config: &SearchConfig, transport: T, connectivity: C) -> Self {
        Self::with_session(SearchSession::new(config), transport, connectivity)
    }

    /// Wrap an existing session, e.g. one restored from a snapshot. Loads
    /// are parsed with the session's own fault policy.
    pub fn with_session(session: SearchSession, transport: T, connectivity: C) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            session,
            transport: Arc::new(transport),
            connectivity,
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SearchSession {
        &mut self.session
    }

    pub fn into_session(self) -> SearchSession {
        self.session
    }

    /// Start a new search. Blank input does nothing; no connectivity clears
    /// the list and shows the offline state without touching the network.
    pub fn search(&mut self, text: &str) -> ViewState {
        if text.trim().is_empty() {
            return self.session.view_state();
        }
        if !self.connectivity.is_online() {
            info!("no connectivity, search not sent");
            self.session.mark_offline();
            return self.session.view_state();
        }
        if let Ok(request) = self.session.submit(text) {
            self.spawn(request);
        }
        self.session.view_state()
    }

    /// Scroll callback. Returns whether a page load was started.
    pub fn scrolled(&mut self, first_visible: usize, visible_count: usize) -> bool {
        if !self.connectivity.is_online() {
            return false;
        }
        match self.session.on_scroll(first_visible, visible_count) {
            Some(request) => {
                self.spawn(request);
                true
            }
            None => false,
        }
    }

    /// Request the next page regardless of scroll position.
    pub fn load_more(&mut self) -> bool {
        if !self.connectivity.is_online() {
            return false;
        }
        match self.session.load_more() {
            Some(request) => {
                self.spawn(request);
                true
            }
            None => false,
        }
    }

    /// Apply every load that has finished, without blocking.
    pub fn poll(&mut self) -> Vec<Completion> {
        let mut applied = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            applied.push(self.session.complete(result.token, result.page));
        }
        applied
    }

    /// Block up to `timeout` for the next finished load and apply it.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(self.session.complete(result.token, result.page)),
            Err(RecvTimeoutError::Timeout) => None,
            // The controller holds a sender, so the channel never disconnects.
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn spawn(&mut self, request: PageRequest) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let faults = self.session.client().record_faults();
        let token = request.token;
        debug!(token = token.value(), url = %request.request.url, "starting background load");

        let spawned = thread::Builder::new()
            .name("booklist-load".to_string())
            .spawn(move || {
                let page = fetch_body(transport.as_ref(), Some(&request.request)).and_then(
                    |body| match decode_volumes(&body, faults) {
                        Ok(page) => Some(page),
                        Err(err) => {
                            warn!(token = token.value(), "unusable volumes response: {err}");
                            None
                        }
                    },
                );
                // The receiver is gone only if the controller was dropped.
                let _ = tx.send(LoadResult {
                    token: request.token,
                    page,
                });
            });

        if let Err(err) = spawned {
            error!("could not start background load: {err}");
            self.session.complete(token, None);
        }
    }
}
