use crate::corpus::{Corpus, Difficulty};
use crate::history::{BlobStore, HistoryStore};
use crate::render::RenderModel;
use crate::runtime::Action;
use crate::session::{Clock, Session, TestResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

/// Wires one session to the score history and the presentation triggers
#[derive(Debug)]
pub struct App<S: BlobStore, C: Clock + Clone> {
    session: Session<C>,
    history: HistoryStore<S>,
    // last loaded copy of the stored scores, refreshed only when they change
    past_results: Vec<TestResult>,
    difficulty: Difficulty,
    last_result: Option<TestResult>,
    clock: C,
    rng: StdRng,
}

impl<S: BlobStore, C: Clock + Clone> App<S, C> {
    pub fn new(history: HistoryStore<S>, difficulty: Difficulty, clock: C) -> Self {
        Self::with_rng(history, difficulty, clock, StdRng::from_entropy())
    }

    pub fn with_rng(
        history: HistoryStore<S>,
        difficulty: Difficulty,
        clock: C,
        mut rng: StdRng,
    ) -> Self {
        let target = Corpus::embedded().pick(difficulty, &mut rng).to_string();
        let past_results = history.read_all();
        Self {
            session: Session::new(target, difficulty, clock.clone()),
            history,
            past_results,
            difficulty,
            last_result: None,
            clock,
            rng,
        }
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn last_result(&self) -> Option<&TestResult> {
        self.last_result.as_ref()
    }

    /// Stored results, newest first.
    pub fn history(&self) -> &[TestResult] {
        &self.past_results
    }

    pub fn history_store(&self) -> &HistoryStore<S> {
        &self.history
    }

    pub fn render_model(&self) -> RenderModel {
        RenderModel::from_session(&self.session, self.last_result.as_ref())
    }

    /// Replace the session with a fresh one on a newly picked paragraph.
    pub fn start_new(&mut self) {
        let target = Corpus::embedded()
            .pick(self.difficulty, &mut self.rng)
            .to_string();
        self.session = Session::new(target, self.difficulty, self.clock.clone());
        self.last_result = None;
        info!(difficulty = %self.difficulty, "new typing test");
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.start_new();
    }

    /// Abandon the current attempt. A finished test is replaced by a new one.
    pub fn reset(&mut self) {
        if !self.session.reset() {
            self.start_new();
        }
    }

    pub fn on_input(&mut self, value: &str) {
        if let Some(result) = self.session.record_input(value) {
            self.complete(result);
        }
    }

    pub fn type_char(&mut self, c: char) {
        let mut value = self.session.typed().to_string();
        value.push(c);
        self.on_input(&value);
    }

    pub fn backspace(&mut self) {
        let mut value = self.session.typed().to_string();
        if value.pop().is_some() {
            self.on_input(&value);
        }
    }

    pub fn on_submit(&mut self) {
        if let Some(result) = self.session.submit() {
            self.complete(result);
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(handle) = self.session.timer() {
            if let Some(result) = self.session.tick(handle) {
                self.complete(result);
            }
        }
    }

    /// Finish the current test early, recording whatever has been typed.
    pub fn finish(&mut self) {
        if let Some(result) = self.session.finish() {
            self.complete(result);
        }
    }

    pub fn clear_history(&mut self) {
        if let Err(e) = self.history.clear() {
            error!(error = %e, "failed to clear score history");
        }
        self.past_results = self.history.read_all();
    }

    /// Apply a key action. Returns false once the user asked to quit.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Type(c) => self.type_char(c),
            Action::Backspace => self.backspace(),
            Action::Submit => self.on_submit(),
            Action::NewTest => self.start_new(),
            Action::Reset => self.reset(),
            Action::NextDifficulty => self.set_difficulty(self.difficulty.next()),
            Action::PrevDifficulty => self.set_difficulty(self.difficulty.prev()),
            Action::ClearHistory => self.clear_history(),
            Action::Quit => return false,
        }
        true
    }

    fn complete(&mut self, result: TestResult) {
        if let Err(e) = self.history.append(result.clone()) {
            warn!(error = %e, "failed to save result to history");
        }
        self.past_results = self.history.read_all();
        self.last_result = Some(result);
    }
}
