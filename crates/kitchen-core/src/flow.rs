//! Screen-to-screen flow around a session.
//!
//! The front end owns scene loading; [`SceneFlow`] only decides which scene
//! comes next and starts sessions at the right moments. Each trigger returns
//! the scene to load, or `None` when the trigger does not apply to the
//! current scene.
//!
//! ```text
//! FeedbackSelection --human/npc--> IntroLoader --5 s--> PressToStart --> Game
//!                                               \--(npc)------------------^
//! Controls --continue--> Game
//! Game --feedback exit--> FeedbackSelection
//! ```

use crate::clock::GameMode;
use crate::fixed::{Seconds, secs};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scene {
    FeedbackSelection,
    IntroLoader,
    PressToStart,
    Controls,
    Game,
}

#[derive(Debug, Clone)]
pub struct SceneFlow {
    scene: Scene,
    npc_flow: bool,
    intro_delay: Seconds,
    intro_left: Seconds,
}

impl Default for SceneFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneFlow {
    pub fn new() -> Self {
        Self::with_intro_delay(secs(5))
    }

    pub fn with_intro_delay(delay: Seconds) -> Self {
        Self {
            scene: Scene::FeedbackSelection,
            npc_flow: false,
            intro_delay: delay,
            intro_left: delay,
        }
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    /// True once the NPC option was picked on the selection screen.
    pub fn npc_flow(&self) -> bool {
        self.npc_flow
    }

    /// Start from the controls screen instead of the selection screen.
    pub fn enter_controls(&mut self) -> Scene {
        self.go(Scene::Controls)
    }

    /// Human player picked: tutorial first.
    pub fn select_human(&mut self, session: &mut Session) -> Option<Scene> {
        self.select(false, GameMode::Tutorial, session)
    }

    /// NPC option picked: skip the tutorial.
    pub fn select_npc(&mut self, session: &mut Session) -> Option<Scene> {
        self.select(true, GameMode::Standard, session)
    }

    fn select(&mut self, npc: bool, mode: GameMode, session: &mut Session) -> Option<Scene> {
        if self.scene != Scene::FeedbackSelection {
            return None;
        }
        self.npc_flow = npc;
        session.start_session(mode, npc);
        self.intro_left = self.intro_delay;
        Some(self.go(Scene::IntroLoader))
    }

    /// Advance the intro loader. Both flows arm a standard session when the
    /// delay runs out; only the human flow stops at the press-to-start
    /// screen.
    pub fn tick(&mut self, dt: Seconds, session: &mut Session) -> Option<Scene> {
        if self.scene != Scene::IntroLoader {
            return None;
        }
        self.intro_left -= dt;
        if self.intro_left > Seconds::ZERO {
            return None;
        }
        session.start_session(GameMode::Standard, self.npc_flow);
        let next = if self.npc_flow {
            Scene::Game
        } else {
            Scene::PressToStart
        };
        Some(self.go(next))
    }

    pub fn press_start(&mut self, session: &mut Session) -> Option<Scene> {
        if self.scene != Scene::PressToStart {
            return None;
        }
        session.start_session(GameMode::Standard, self.npc_flow);
        Some(self.go(Scene::Game))
    }

    /// Leave the controls screen for the game. No session is started here.
    pub fn continue_from_controls(&mut self) -> Option<Scene> {
        (self.scene == Scene::Controls).then(|| self.go(Scene::Game))
    }

    /// The clock asked to leave a finished tutorial.
    pub fn feedback_exit(&mut self) -> Option<Scene> {
        (self.scene == Scene::Game).then(|| self.go(Scene::FeedbackSelection))
    }

    fn go(&mut self, scene: Scene) -> Scene {
        tracing::debug!(from = ?self.scene, to = ?scene, "scene change");
        self.scene = scene;
        scene
    }
}
