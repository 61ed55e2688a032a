//! Desktop mascot engine: loads Shimeji-style XML catalogues, evaluates
//! their embedded guard scripts, and drives mascots through a tick-based
//! action state machine with weighted behavior selection.
//!
//! The crate is host-agnostic. A host owns the window and input loop,
//! feeds cursor and work-area updates into [`Environment`], ticks a
//! [`Manager`], and draws the [`Frame`] each mascot reports.

pub mod action;
pub mod behavior;
pub mod catalogue;
pub mod environment;
pub mod manager;
pub mod mascot;
pub mod math;
pub mod script;
pub mod util;

pub use action::{ActionEvent, BreedRequest};
pub use catalogue::{Catalogue, ParseError};
pub use environment::Environment;
pub use manager::Manager;
pub use mascot::{Frame, Mascot};
pub use math::{Rect, Vec2};
pub use script::{EvalContext, Script};
